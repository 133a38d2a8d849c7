// 日誌輸出 - 把 log 巨集的訊息寫入 logs/emulator.log

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};

pub const DEFAULT_LOG_PATH: &str = "logs/emulator.log";

#[derive(Debug)]
struct FileLogger {
    level: LevelFilter,
    // 全域 log 檔案鎖，避免多執行緒寫入衝突
    file: Mutex<Option<File>>,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format!(
            "[{:<5}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );

        // 警告與錯誤同時印到 stderr
        if record.level() <= Level::Warn {
            eprintln!("{line}");
        }

        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = writeln!(file, "{line}");
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

fn open_log_file(path: &Path) -> Option<File> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            let _ = std::fs::create_dir_all(dir);
        }
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// 安裝全域 logger；log 檔案打不開時只輸出到 stderr
pub fn init(level: LevelFilter, path: Option<PathBuf>) {
    let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH));
    let file = open_log_file(&path);
    let missing_file = file.is_none();

    let logger = FileLogger {
        level,
        file: Mutex::new(file),
    };

    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level);
        if missing_file {
            log::warn!("無法開啟日誌檔 {}，只輸出到 stderr", path.display());
        }
    }
}
