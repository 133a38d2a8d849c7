// 機器設定 - 由命令列組合而成，不寫入任何設定檔

use std::path::Path;

/// 主機型號
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    Dmg,
    Cgb,
}

impl Console {
    pub fn is_cgb(self) -> bool {
        self == Console::Cgb
    }
}

#[derive(Debug, Clone, Default)]
pub struct MachineConfig {
    /// None 代表依卡帶標頭自動選擇
    pub console: Option<Console>,
    pub bootrom: Option<Vec<u8>>,
    pub disassemble: bool,
    pub pacing: bool,
}

impl MachineConfig {
    pub fn new() -> Self {
        MachineConfig {
            console: None,
            bootrom: None,
            disassemble: false,
            pacing: true,
        }
    }

    /// 載入開機 ROM；檔案不存在或大小不對時回到開機後狀態
    pub fn with_bootrom_file(mut self, path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(data) if data.len() == 0x100 || data.len() == 0x900 => {
                log::info!("已載入開機 ROM: {} ({} bytes)", path.display(), data.len());
                self.bootrom = Some(data);
            }
            Ok(data) => {
                log::warn!(
                    "開機 ROM {} 大小不正確 ({} bytes)，直接進入開機後狀態",
                    path.display(),
                    data.len()
                );
            }
            Err(err) => {
                log::warn!("無法讀取開機 ROM {}: {}，直接進入開機後狀態", path.display(), err);
            }
        }
        self
    }
}
