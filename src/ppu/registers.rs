// LCD 暫存器 - LCDC/STAT/SCY/SCX/LY/LYC (0xFF40-0xFF45) 與 BGP/OBP0/OBP1/WY/WX (0xFF47-0xFF4B)

use crate::interrupts::{Interrupt, Interrupts};
use crate::mmu::Mapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LcdMode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    Drawing = 3,
}

/// Tile 數據定址模式 (LCDC bit 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileAddressingMode {
    /// 0x8000-0x8FFF，無符號索引
    Mode8000,
    /// 0x8800-0x97FF，帶符號索引，基址 0x9000
    Mode8800,
}

impl TileAddressingMode {
    /// tile 資料在 VRAM 內的偏移
    pub fn tile_offset(self, tile_index: u8) -> u16 {
        match self {
            TileAddressingMode::Mode8000 => tile_index as u16 * 16,
            TileAddressingMode::Mode8800 => (0x1000i32 + (tile_index as i8 as i32) * 16) as u16,
        }
    }
}

/// 背景/視窗地圖在 VRAM 內的偏移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileMapAddress {
    Map9800,
    Map9C00,
}

impl TileMapAddress {
    pub fn offset(self) -> u16 {
        match self {
            TileMapAddress::Map9800 => 0x1800,
            TileMapAddress::Map9C00 => 0x1C00,
        }
    }
}

#[derive(Debug)]
pub struct LcdRegisters {
    pub lcdc: u8,
    stat: u8, // 只保存 bit 3-6
    pub scy: u8,
    pub scx: u8,
    pub ly: u8,
    pub lyc: u8,
    pub bgp: u8,
    pub obp0: u8,
    pub obp1: u8,
    pub wy: u8,
    pub wx: u8,
    pub mode: LcdMode,
    stat_line: bool,
}

impl LcdRegisters {
    pub fn new() -> Self {
        LcdRegisters {
            lcdc: 0x91,
            stat: 0,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            bgp: 0xFC,
            obp0: 0xFF,
            obp1: 0xFF,
            wy: 0,
            wx: 0,
            mode: LcdMode::HBlank,
            stat_line: false,
        }
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcdc & 0x80 != 0
    }

    pub fn window_map(&self) -> TileMapAddress {
        if self.lcdc & 0x40 != 0 {
            TileMapAddress::Map9C00
        } else {
            TileMapAddress::Map9800
        }
    }

    pub fn window_enabled(&self) -> bool {
        self.lcdc & 0x20 != 0
    }

    pub fn tile_addressing(&self) -> TileAddressingMode {
        if self.lcdc & 0x10 != 0 {
            TileAddressingMode::Mode8000
        } else {
            TileAddressingMode::Mode8800
        }
    }

    pub fn background_map(&self) -> TileMapAddress {
        if self.lcdc & 0x08 != 0 {
            TileMapAddress::Map9C00
        } else {
            TileMapAddress::Map9800
        }
    }

    pub fn sprite_height(&self) -> u8 {
        if self.lcdc & 0x04 != 0 { 16 } else { 8 }
    }

    pub fn sprites_enabled(&self) -> bool {
        self.lcdc & 0x02 != 0
    }

    /// DMG: 背景與視窗開關；CGB: 背景優先權總開關
    pub fn background_enabled(&self) -> bool {
        self.lcdc & 0x01 != 0
    }

    /// 重新計算 STAT 中斷線，只在升緣時請求中斷
    pub fn update_stat(&mut self, interrupts: &mut Interrupts) {
        let line = (self.stat & 0x40 != 0 && self.ly == self.lyc)
            || match self.mode {
                LcdMode::HBlank => self.stat & 0x08 != 0,
                LcdMode::VBlank => self.stat & 0x10 != 0,
                LcdMode::OamScan => self.stat & 0x20 != 0,
                LcdMode::Drawing => false,
            };
        if line && !self.stat_line {
            interrupts.request(Interrupt::LcdStat);
        }
        self.stat_line = line;
    }

    pub fn change_mode(&mut self, mode: LcdMode, interrupts: &mut Interrupts) {
        self.mode = mode;
        self.update_stat(interrupts);
    }

    /// 關閉 LCD 時 LY 與模式歸零
    pub fn reset_for_lcd_off(&mut self) {
        self.ly = 0;
        self.mode = LcdMode::HBlank;
        self.stat_line = false;
    }
}

impl Default for LcdRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapping for LcdRegisters {
    fn get(&self, offset: u16) -> u8 {
        match offset {
            0x0 => self.lcdc,
            0x1 => {
                let coincidence = if self.ly == self.lyc { 0x04 } else { 0 };
                0x80 | self.stat | coincidence | self.mode as u8
            }
            0x2 => self.scy,
            0x3 => self.scx,
            0x4 => self.ly,
            0x5 => self.lyc,
            0x7 => self.bgp,
            0x8 => self.obp0,
            0x9 => self.obp1,
            0xA => self.wy,
            0xB => self.wx,
            _ => 0xFF,
        }
    }

    fn set(&mut self, offset: u16, value: u8) {
        match offset {
            0x0 => {
                let was_on = self.lcd_enabled();
                self.lcdc = value;
                if was_on && !self.lcd_enabled() {
                    self.reset_for_lcd_off();
                }
            }
            0x1 => self.stat = value & 0x78,
            0x2 => self.scy = value,
            0x3 => self.scx = value,
            0x4 => log::trace!("忽略寫入唯讀的 LY ({value:02X})"),
            0x5 => self.lyc = value,
            0x7 => self.bgp = value,
            0x8 => self.obp0 = value,
            0x9 => self.obp1 = value,
            0xA => self.wy = value,
            0xB => self.wx = value,
            _ => {}
        }
    }
}
