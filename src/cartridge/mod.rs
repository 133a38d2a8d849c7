// 卡帶 - ROM/RAM 分頁控制器與電池存檔

mod header;
mod mbc1;
mod mbc2;
mod mbc3;
mod mbc5;

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub use header::{CartridgeHeader, ControllerKind};

use crate::error::{Error, Result};
use mbc1::Mbc1;
use mbc2::Mbc2;
use mbc3::Mbc3;
use mbc5::Mbc5;

/// 分頁控制器共同介面，偏移量都相對於所屬區域起點
pub trait BankController: fmt::Debug + Send {
    /// 0x0000-0x7FFF
    fn read_rom(&self, offset: u16) -> u8;
    /// 寫入 0x0000-0x7FFF 的控制暫存器
    fn write_control(&mut self, offset: u16, value: u8);
    /// 0xA000-0xBFFF
    fn read_ram(&self, offset: u16) -> u8;
    /// 回傳是否真的改到需要存檔的內容
    fn write_ram(&mut self, offset: u16, value: u8) -> bool;
    fn ram(&self) -> &[u8];
    fn ram_mut(&mut self) -> &mut [u8];

    fn tick(&mut self, _double_speed: bool) {}

    /// RAM 之後附加的存檔資料
    fn save_extra(&self) -> Vec<u8> {
        Vec::new()
    }

    fn load_extra(&mut self, _data: &[u8]) {}
}

pub(crate) fn bank_offset(bank: usize, bank_size: usize, offset: u16) -> usize {
    bank * bank_size + offset as usize
}

#[derive(Debug)]
struct RomOnly {
    rom: Vec<u8>,
    ram: Vec<u8>,
}

impl BankController for RomOnly {
    fn read_rom(&self, offset: u16) -> u8 {
        self.rom.get(offset as usize).copied().unwrap_or(0xFF)
    }

    fn write_control(&mut self, offset: u16, value: u8) {
        log::trace!("純 ROM 卡帶忽略控制寫入 {offset:04X} <- {value:02X}");
    }

    fn read_ram(&self, offset: u16) -> u8 {
        self.ram.get(offset as usize).copied().unwrap_or(0xFF)
    }

    fn write_ram(&mut self, offset: u16, value: u8) -> bool {
        match self.ram.get_mut(offset as usize) {
            Some(byte) => {
                *byte = value;
                true
            }
            None => false,
        }
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }

    fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }
}

pub struct Cartridge {
    pub header: CartridgeHeader,
    controller: Box<dyn BankController>,
    save_path: Option<PathBuf>,
    dirty: bool,
}

impl fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cartridge")
            .field("title", &self.header.title)
            .field("controller", &self.header.controller())
            .field("save_path", &self.save_path)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Cartridge {
    pub fn new(rom: Vec<u8>) -> Result<Self> {
        let header = CartridgeHeader::parse(&rom)?;
        let ram_bytes = header.ram_bytes();
        let controller: Box<dyn BankController> = match header.controller() {
            ControllerKind::RomOnly => Box::new(RomOnly {
                rom,
                ram: vec![0xFF; ram_bytes.min(0x2000)],
            }),
            ControllerKind::Mbc1 => Box::new(Mbc1::new(rom, ram_bytes)),
            ControllerKind::Mbc2 => Box::new(Mbc2::new(rom)),
            ControllerKind::Mbc3 { rtc } => Box::new(Mbc3::new(rom, ram_bytes, rtc)),
            ControllerKind::Mbc5 => Box::new(Mbc5::new(rom, ram_bytes)),
        };
        log::info!(
            "載入卡帶 \"{}\" 種類 {:02X} ({:?}) RAM {} bytes",
            header.title,
            header.cartridge_type,
            header.controller(),
            controller.ram().len()
        );
        Ok(Cartridge {
            header,
            controller,
            save_path: None,
            dirty: false,
        })
    }

    pub fn read_rom(&self, offset: u16) -> u8 {
        self.controller.read_rom(offset)
    }

    pub fn write_rom(&mut self, offset: u16, value: u8) {
        self.controller.write_control(offset, value);
    }

    pub fn read_ram(&self, offset: u16) -> u8 {
        self.controller.read_ram(offset)
    }

    pub fn write_ram(&mut self, offset: u16, value: u8) {
        if self.controller.write_ram(offset, value) {
            self.dirty = true;
        }
    }

    pub fn tick(&mut self, double_speed: bool) {
        self.controller.tick(double_speed);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 讀入存檔；檔案不存在時 RAM 維持 0xFF 並記警告。沒有電池的卡帶不讀也不寫存檔
    pub fn attach_save(&mut self, path: PathBuf) -> Result<()> {
        if !self.header.has_battery() {
            log::info!("卡帶種類 {:02X} 沒有電池，不使用存檔", self.header.cartridge_type);
            return Ok(());
        }
        match fs::read(&path) {
            Ok(data) => {
                if let Err(e) = self.load_save_data(&data) {
                    log::warn!("{e}，RAM 以 0xFF 開始");
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("找不到存檔 {}，RAM 以 0xFF 開始", path.display());
            }
            Err(e) => return Err(Error::io(&path, e)),
        }
        self.save_path = Some(path);
        Ok(())
    }

    pub fn load_save_data(&mut self, data: &[u8]) -> Result<()> {
        let ram = self.controller.ram_mut();
        let ram_len = ram.len();
        if data.is_empty() && ram_len > 0 {
            return Err(Error::InvalidSave("存檔是空的".to_string()));
        }
        let loaded = data.len().min(ram_len);
        if loaded < ram_len {
            log::warn!("存檔只有 {} bytes，RAM 需要 {} bytes", data.len(), ram_len);
        }
        ram[..loaded].copy_from_slice(&data[..loaded]);
        if data.len() > ram_len {
            self.controller.load_extra(&data[ram_len..]);
        }
        self.dirty = false;
        Ok(())
    }

    pub fn save_data(&self) -> Vec<u8> {
        let mut data = self.controller.ram().to_vec();
        data.extend(self.controller.save_extra());
        data
    }

    /// 把 RAM 與 RTC 寫回存檔
    pub fn save(&mut self) -> Result<()> {
        let Some(path) = &self.save_path else {
            return Ok(());
        };
        let data = self.save_data();
        if data.is_empty() {
            return Ok(());
        }
        fs::write(path, &data).map_err(|e| Error::io(path, e))?;
        log::info!("已寫入存檔 {} ({} bytes)", path.display(), data.len());
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom(cart_type: u8, ram_size: u8) -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0147] = cart_type;
        rom[0x0149] = ram_size;
        rom[0x4000] = 0xAB;
        rom
    }

    #[test]
    fn rom_only_ignores_control_writes() {
        let mut cart = Cartridge::new(rom(0x00, 0)).unwrap();
        cart.write_rom(0x2000, 0x02);
        assert_eq!(cart.read_rom(0x4000), 0xAB);
        assert_eq!(cart.read_ram(0x0000), 0xFF);
        assert!(!cart.is_dirty());
    }

    #[test]
    fn ram_writes_mark_dirty() {
        let mut cart = Cartridge::new(rom(0x03, 0x02)).unwrap();
        cart.write_ram(0x0000, 0x12);
        assert!(!cart.is_dirty());
        cart.write_rom(0x0000, 0x0A);
        cart.write_ram(0x0000, 0x12);
        assert!(cart.is_dirty());
        assert_eq!(cart.save_data()[0], 0x12);
    }

    #[test]
    fn short_save_loads_prefix() {
        let mut cart = Cartridge::new(rom(0x03, 0x02)).unwrap();
        cart.load_save_data(&[0x5A; 16]).unwrap();
        let data = cart.save_data();
        assert_eq!(data[15], 0x5A);
        assert_eq!(data[16], 0xFF);
    }

    #[test]
    fn empty_save_is_rejected() {
        let mut cart = Cartridge::new(rom(0x03, 0x02)).unwrap();
        assert!(matches!(
            cart.load_save_data(&[]),
            Err(Error::InvalidSave(_))
        ));
    }

    fn temp_save(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("rust_gb_cycle_{}_{name}.sav", std::process::id()));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn cart_without_battery_writes_no_save() {
        // MBC1 + RAM，沒有電池
        let mut cart = Cartridge::new(rom(0x02, 0x02)).unwrap();
        let path = temp_save("no_battery");
        fs::write(&path, [0x77; 0x2000]).unwrap();
        cart.attach_save(path.clone()).unwrap();
        // 既有的檔案不會被載入
        cart.write_rom(0x0000, 0x0A);
        assert_eq!(cart.read_ram(0x0000), 0xFF);
        fs::remove_file(&path).unwrap();

        cart.write_ram(0x0000, 0x42);
        assert!(cart.is_dirty());
        cart.save().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn battery_cart_writes_save() {
        let mut cart = Cartridge::new(rom(0x03, 0x02)).unwrap();
        let path = temp_save("battery");
        cart.attach_save(path.clone()).unwrap();
        cart.write_rom(0x0000, 0x0A);
        cart.write_ram(0x0000, 0x42);
        cart.save().unwrap();
        let data = fs::read(&path).unwrap();
        assert_eq!(data[0], 0x42);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rtc_cart_appends_footer() {
        let cart = Cartridge::new(rom(0x10, 0x03)).unwrap();
        assert_eq!(cart.save_data().len(), 32 * 1024 + 28);
    }
}
