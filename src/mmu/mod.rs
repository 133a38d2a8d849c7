// MMU - 共用匯流排，依記憶體映射表把位址分派給各周邊

mod memory_map;
mod ram;
mod system;

pub use memory_map::MemoryMap;
pub use ram::{HighRam, WorkRam};
pub use system::SystemControl;

use crate::apu::AudioRegisters;
use crate::cartridge::Cartridge;
use crate::config::Console;
use crate::dma::{DmaBus, Hdma, OamDma};
use crate::error::Result;
use crate::interrupts::{Interrupt, Interrupts};
use crate::joypad::{Button, Joypad};
use crate::ppu::{CgbPalettes, LcdRegisters, VideoMemory};
use crate::serial::Serial;
use crate::timer::Timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableState {
    Enabled,
    Disabled,
}

/// 以相對偏移存取的暫存器區塊
pub trait Mapping {
    fn get(&self, offset: u16) -> u8;
    fn set(&mut self, offset: u16, value: u8);
}

/// 記憶體映射表中的周邊代號
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    CartridgeRom,
    Vram,
    CartridgeRam,
    WorkRam,
    Oam,
    OamUnused,
    Joypad,
    Serial,
    Timer,
    InterruptFlags,
    Audio,
    WaveRam,
    Lcd,
    OamDma,
    /// BGP 以後的 LCD 暫存器，偏移要加 7
    LcdUpper,
    SpeedControl,
    VramBank,
    BootRom,
    Hdma,
    Palettes,
    ObjectPriority,
    WramBank,
    HighRam,
    InterruptEnable,
}

#[derive(Debug)]
pub struct Bus {
    pub cartridge: Cartridge,
    pub video: VideoMemory,
    pub lcd: LcdRegisters,
    pub palettes: CgbPalettes,
    pub wram: WorkRam,
    pub hram: HighRam,
    pub timer: Timer,
    pub joypad: Joypad,
    pub serial: Serial,
    pub interrupts: Interrupts,
    pub audio: AudioRegisters,
    pub oam_dma: OamDma,
    pub hdma: Hdma,
    pub system: SystemControl,
    /// OPRI (0xFF6C) bit 0：1 = 以 X 座標決定物件優先權
    pub object_priority: u8,
    map: MemoryMap<Port>,
}

impl Bus {
    pub fn new(console: Console, cartridge: Cartridge, bootrom: Option<Vec<u8>>) -> Result<Self> {
        let cgb = console.is_cgb();
        let mut map = MemoryMap::new();
        map.register(0x0000, 0x7FFF, Port::CartridgeRom);
        map.register(0x8000, 0x9FFF, Port::Vram);
        map.register(0xA000, 0xBFFF, Port::CartridgeRam);
        map.register(0xC000, 0xDFFF, Port::WorkRam);
        map.register(0xE000, 0xFDFF, Port::WorkRam);
        map.register(0xFE00, 0xFE9F, Port::Oam);
        map.register(0xFEA0, 0xFEFF, Port::OamUnused);
        map.register(0xFF00, 0xFF00, Port::Joypad);
        map.register(0xFF01, 0xFF02, Port::Serial);
        map.register(0xFF04, 0xFF07, Port::Timer);
        map.register(0xFF0F, 0xFF0F, Port::InterruptFlags);
        map.register(0xFF10, 0xFF26, Port::Audio);
        map.register(0xFF30, 0xFF3F, Port::WaveRam);
        map.register(0xFF40, 0xFF45, Port::Lcd);
        map.register(0xFF46, 0xFF46, Port::OamDma);
        map.register(0xFF47, 0xFF4B, Port::LcdUpper);
        map.register(0xFF50, 0xFF50, Port::BootRom);
        if cgb {
            map.register(0xFF4C, 0xFF4D, Port::SpeedControl);
            map.register(0xFF4F, 0xFF4F, Port::VramBank);
            map.register(0xFF51, 0xFF55, Port::Hdma);
            map.register(0xFF68, 0xFF6B, Port::Palettes);
            map.register(0xFF6C, 0xFF6C, Port::ObjectPriority);
            map.register(0xFF70, 0xFF70, Port::WramBank);
        }
        map.register(0xFF80, 0xFFFE, Port::HighRam);
        map.register(0xFFFF, 0xFFFF, Port::InterruptEnable);
        map.build()?;
        log::debug!("記憶體映射 ({} 個區間): {:?}", map.len(), map);

        Ok(Bus {
            cartridge,
            video: VideoMemory::new(cgb),
            lcd: LcdRegisters::new(),
            palettes: CgbPalettes::new(),
            wram: WorkRam::new(cgb),
            hram: HighRam::new(),
            timer: Timer::new(if cgb { 0x1EA0 } else { 0xABCC }),
            joypad: Joypad::new(),
            serial: Serial::new(cgb),
            interrupts: Interrupts::new(),
            audio: AudioRegisters::new(),
            oam_dma: OamDma::new(),
            hdma: Hdma::new(),
            system: SystemControl::new(console, bootrom),
            object_priority: if cgb { 0 } else { 1 },
            map,
        })
    }

    pub fn is_cgb(&self) -> bool {
        self.system.is_cgb()
    }

    /// 不考慮 DMA 衝突的讀取
    pub fn read(&self, address: u16) -> u8 {
        if let Some(byte) = self.system.bootrom_byte(address) {
            return byte;
        }
        let Some((port, offset)) = self.map.lookup(address) else {
            log::trace!("讀取未映射的位址 {address:04X}");
            return 0xFF;
        };
        match port {
            Port::CartridgeRom => self.cartridge.read_rom(offset),
            Port::Vram => self.video.read_vram(offset),
            Port::CartridgeRam => self.cartridge.read_ram(offset),
            Port::WorkRam => self.wram.get(offset),
            Port::Oam => self.video.read_oam(offset),
            Port::OamUnused => self.video.read_unused(offset),
            Port::Joypad => self.joypad.get(offset),
            Port::Serial => self.serial.get(offset),
            Port::Timer => self.timer.get(offset),
            Port::InterruptFlags => self.interrupts.read_flags(),
            Port::Audio => self.audio.get(offset),
            Port::WaveRam => self.audio.read_wave(offset),
            Port::Lcd => self.lcd.get(offset),
            Port::OamDma => self.oam_dma.get(offset),
            Port::LcdUpper => self.lcd.get(offset + 7),
            Port::SpeedControl => self.system.get(offset),
            Port::VramBank => self.video.read_bank_select(),
            Port::BootRom => self.system.read_bootrom_disable(),
            Port::Hdma => self.hdma.get(offset),
            Port::Palettes => self.palettes.get(offset),
            Port::ObjectPriority => 0xFE | self.object_priority,
            Port::WramBank => self.wram.read_bank_select(),
            Port::HighRam => self.hram.get(offset),
            Port::InterruptEnable => self.interrupts.read_enable(),
        }
    }

    /// 不考慮 DMA 衝突的寫入
    pub fn write(&mut self, address: u16, value: u8) {
        let Some((port, offset)) = self.map.lookup(address) else {
            log::trace!("忽略寫入未映射的位址 {address:04X} <- {value:02X}");
            return;
        };
        match port {
            Port::CartridgeRom => self.cartridge.write_rom(offset, value),
            Port::Vram => self.video.write_vram(offset, value),
            Port::CartridgeRam => self.cartridge.write_ram(offset, value),
            Port::WorkRam => self.wram.set(offset, value),
            Port::Oam => self.video.write_oam(offset, value),
            Port::OamUnused => {}
            Port::Joypad => self.joypad.set(offset, value),
            Port::Serial => self.serial.set(offset, value),
            Port::Timer => self.timer.set(offset, value),
            Port::InterruptFlags => self.interrupts.write_flags(value),
            Port::Audio => self.audio.set(offset, value),
            Port::WaveRam => self.audio.write_wave(offset, value),
            Port::Lcd => self.write_lcd(offset, value),
            Port::OamDma => self.oam_dma.set(offset, value),
            Port::LcdUpper => self.lcd.set(offset + 7, value),
            Port::SpeedControl => self.system.set(offset, value),
            Port::VramBank => self.video.write_bank_select(value),
            Port::BootRom => self.system.write_bootrom_disable(value),
            Port::Hdma => self.hdma.set(offset, value),
            Port::Palettes => self.palettes.set(offset, value),
            Port::ObjectPriority => self.object_priority = value & 0x01,
            Port::WramBank => self.wram.write_bank_select(value),
            Port::HighRam => self.hram.set(offset, value),
            Port::InterruptEnable => self.interrupts.write_enable(value),
        }
    }

    fn write_lcd(&mut self, offset: u16, value: u8) {
        self.lcd.set(offset, value);
        if !self.lcd.lcd_enabled() {
            // LCD 關閉時記憶體全部開放
            self.video.set_access(true, true);
            self.palettes.accessible = true;
        } else if offset == 1 || offset == 5 {
            self.lcd.update_stat(&mut self.interrupts);
        }
    }

    /// OAM DMA 進行中與 DMA 同一條匯流排的存取會衝突
    fn dma_conflict(&self, address: u16) -> bool {
        if !self.oam_dma.is_transferring() {
            return false;
        }
        if (0xFE00..=0xFEFF).contains(&address) {
            return true;
        }
        DmaBus::of(address).is_some() && DmaBus::of(address) == self.oam_dma.source_bus()
    }

    pub fn cpu_read(&self, address: u16) -> u8 {
        if self.dma_conflict(address) {
            if (0xFE00..=0xFEFF).contains(&address) {
                return 0xFF;
            }
            return self.oam_dma.last_byte;
        }
        self.read(address)
    }

    pub fn cpu_write(&mut self, address: u16, value: u8) {
        if self.dma_conflict(address) {
            log::trace!("DMA 進行中，忽略寫入 {address:04X} <- {value:02X}");
            return;
        }
        self.write(address, value);
    }

    /// DMA 讀取來源，不受 PPU 模式鎖影響
    pub fn dma_read(&self, address: u16) -> u8 {
        match address {
            0x8000..=0x9FFF => self.video.dma_read_vram(address - 0x8000),
            _ => self.read(address),
        }
    }

    /// 每個時間量子推進計時器、序列埠與卡帶時鐘
    pub fn update(&mut self) {
        self.timer.tick(&mut self.interrupts);
        self.serial.tick(&mut self.interrupts);
        self.cartridge.tick(self.system.double_speed);
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        if self.joypad.set_button(button, pressed) {
            self.interrupts.request(Interrupt::Joypad);
        }
    }

    pub fn read_word(&self, address: u16) -> u16 {
        u16::from_le_bytes([self.read(address), self.read(address.wrapping_add(1))])
    }
}
