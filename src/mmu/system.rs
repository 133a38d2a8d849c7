// 系統控制 - KEY0/KEY1 (0xFF4C-0xFF4D)、開機 ROM 映射 (0xFF50)、速度與停止狀態

use super::Mapping;
use crate::config::Console;

#[derive(Debug)]
pub struct SystemControl {
    pub console: Console,
    /// CGB 雙倍速
    pub double_speed: bool,
    /// KEY1 bit 0
    pub prepare_switch: bool,
    /// STOP 模式 (等待按鍵)
    pub stopped: bool,
    key0: u8,
    bootrom: Option<Vec<u8>>,
}

impl SystemControl {
    pub fn new(console: Console, bootrom: Option<Vec<u8>>) -> Self {
        SystemControl {
            console,
            double_speed: false,
            prepare_switch: false,
            stopped: false,
            key0: if console.is_cgb() { 0x80 } else { 0x04 },
            bootrom,
        }
    }

    pub fn is_cgb(&self) -> bool {
        self.console.is_cgb()
    }

    pub fn bootrom_mapped(&self) -> bool {
        self.bootrom.is_some()
    }

    /// 開機 ROM 覆蓋 0x0000-0x00FF，CGB 另外覆蓋 0x0200-0x08FF
    pub fn bootrom_byte(&self, address: u16) -> Option<u8> {
        let rom = self.bootrom.as_ref()?;
        let covered = address < 0x0100 || (0x0200..0x0900).contains(&address);
        if covered {
            rom.get(address as usize).copied()
        } else {
            None
        }
    }

    /// 寫入非零值後永久解除映射
    pub fn write_bootrom_disable(&mut self, value: u8) {
        if value != 0 && self.bootrom.take().is_some() {
            log::info!("開機 ROM 解除映射");
        }
    }

    pub fn read_bootrom_disable(&self) -> u8 {
        if self.bootrom.is_some() { 0xFE } else { 0xFF }
    }

    /// STOP 切換速度
    pub fn switch_speed(&mut self) {
        self.double_speed = !self.double_speed;
        self.prepare_switch = false;
        log::debug!("切換為{}速", if self.double_speed { "雙倍" } else { "一般" });
    }
}

/// offset 0 = KEY0，1 = KEY1
impl Mapping for SystemControl {
    fn get(&self, offset: u16) -> u8 {
        match offset {
            0 => self.key0,
            _ => {
                0x7E | if self.double_speed { 0x80 } else { 0 }
                    | if self.prepare_switch { 0x01 } else { 0 }
            }
        }
    }

    fn set(&mut self, offset: u16, value: u8) {
        match offset {
            // KEY0 只有開機 ROM 還在時能寫
            0 if self.bootrom_mapped() => self.key0 = value,
            0 => {}
            _ => self.prepare_switch = value & 0x01 != 0,
        }
    }
}
