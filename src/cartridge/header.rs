// 卡帶標頭解析 (0x0100-0x014F)

use crate::config::Console;
use crate::error::{Error, Result};

pub const HEADER_END: usize = 0x150;

/// 記憶體控制器種類 (0x0147)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    RomOnly,
    Mbc1,
    Mbc2,
    Mbc3 { rtc: bool },
    Mbc5,
}

#[derive(Debug, Clone)]
pub struct CartridgeHeader {
    pub title: String,
    pub cgb_flag: u8,
    pub cartridge_type: u8,
    pub rom_size: u8,
    pub ram_size: u8,
}

impl CartridgeHeader {
    pub fn parse(rom_data: &[u8]) -> Result<Self> {
        if rom_data.len() < HEADER_END {
            return Err(Error::RomTooSmall(rom_data.len()));
        }

        let title_bytes: Vec<u8> = rom_data[0x0134..0x0143]
            .iter()
            .copied()
            .take_while(|&b| b != 0)
            .filter(|b| b.is_ascii_graphic() || *b == b' ')
            .collect();

        Ok(CartridgeHeader {
            title: String::from_utf8_lossy(&title_bytes).trim().to_string(),
            cgb_flag: rom_data[0x0143],
            cartridge_type: rom_data[0x0147],
            rom_size: rom_data[0x0148],
            ram_size: rom_data[0x0149],
        })
    }

    /// 標頭偏好的主機型號
    pub fn preferred_console(&self) -> Console {
        match self.cgb_flag {
            0x80 | 0xC0 => Console::Cgb,
            _ => Console::Dmg,
        }
    }

    pub fn controller(&self) -> ControllerKind {
        match self.cartridge_type {
            0x00 | 0x08 | 0x09 => ControllerKind::RomOnly,
            0x01..=0x03 => ControllerKind::Mbc1,
            0x05 | 0x06 => ControllerKind::Mbc2,
            0x0F | 0x10 => ControllerKind::Mbc3 { rtc: true },
            0x11..=0x13 => ControllerKind::Mbc3 { rtc: false },
            0x19..=0x1E => ControllerKind::Mbc5,
            other => {
                log::warn!("不支援的卡帶種類 {other:02X}，當作純 ROM 處理");
                ControllerKind::RomOnly
            }
        }
    }

    /// 外部 RAM 大小 (bytes)
    pub fn ram_bytes(&self) -> usize {
        match self.ram_size {
            0x01 => 2 * 1024,
            0x02 => 8 * 1024,
            0x03 => 32 * 1024,
            0x04 => 128 * 1024,
            0x05 => 64 * 1024,
            _ => 0,
        }
    }

    /// 卡帶是否有電池 (需要存檔)
    pub fn has_battery(&self) -> bool {
        matches!(
            self.cartridge_type,
            0x03 | 0x06 | 0x09 | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_with(cart_type: u8, ram: u8, cgb: u8) -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0134..0x0139].copy_from_slice(b"TESTS");
        rom[0x0143] = cgb;
        rom[0x0147] = cart_type;
        rom[0x0149] = ram;
        rom
    }

    #[test]
    fn parses_title_and_kind() {
        let header = CartridgeHeader::parse(&rom_with(0x13, 0x03, 0x00)).unwrap();
        assert_eq!(header.title, "TESTS");
        assert_eq!(header.controller(), ControllerKind::Mbc3 { rtc: false });
        assert_eq!(header.ram_bytes(), 32 * 1024);
        assert!(header.has_battery());
        assert_eq!(header.preferred_console(), Console::Dmg);
    }

    #[test]
    fn cgb_flag_selects_console() {
        let header = CartridgeHeader::parse(&rom_with(0x00, 0, 0x80)).unwrap();
        assert_eq!(header.preferred_console(), Console::Cgb);
        let header = CartridgeHeader::parse(&rom_with(0x00, 0, 0xC0)).unwrap();
        assert_eq!(header.preferred_console(), Console::Cgb);
    }

    #[test]
    fn unknown_type_falls_back_to_rom_only() {
        let header = CartridgeHeader::parse(&rom_with(0xFC, 0, 0)).unwrap();
        assert_eq!(header.controller(), ControllerKind::RomOnly);
    }

    #[test]
    fn short_rom_is_rejected() {
        assert!(matches!(
            CartridgeHeader::parse(&[0u8; 0x100]),
            Err(Error::RomTooSmall(0x100))
        ));
    }
}
