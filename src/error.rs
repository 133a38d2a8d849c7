// 錯誤型別 - 模擬器對外回報的所有錯誤

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("無法讀取 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ROM 太小 ({0} bytes)，至少需要 0x150 bytes 的標頭")]
    RomTooSmall(usize),

    #[error("存檔格式錯誤: {0}")]
    InvalidSave(String),

    #[error("操作碼表解析失敗: {0}")]
    Opcodes(#[from] serde_json::Error),

    /// 模擬器本身的缺陷，不是遊戲程式的錯誤
    #[error("模擬器內部錯誤 ({file}:{line}): {message}")]
    Emulator {
        message: String,
        file: &'static str,
        line: u32,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// 建立帶有原始碼位置的內部錯誤
#[macro_export]
macro_rules! emulator_bug {
    ($($arg:tt)*) => {
        $crate::error::Error::Emulator {
            message: format!($($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emulator_bug_carries_location() {
        let err = crate::emulator_bug!("unexpected mode {}", 7);
        match &err {
            Error::Emulator { message, file, line } => {
                assert_eq!(message, "unexpected mode 7");
                assert!(file.ends_with("error.rs"));
                assert!(*line > 0);
            }
            other => panic!("wrong variant: {other:?}"),
        }
        assert!(err.to_string().contains("error.rs"));
    }

    #[test]
    fn io_error_mentions_path() {
        let err = Error::io(
            "missing.gb",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("missing.gb"));
    }
}
