// 調色盤 - DMG 灰階與 CGB 調色盤 RAM (0xFF68-0xFF6B)

use crate::mmu::Mapping;

/// DMG 四階灰 (RGB555)
pub const DMG_COLORS: [u16; 4] = [0x6318, 0x4A52, 0x2108, 0x18C6];

/// DMG 下 BG 關閉時顯示的空白色
pub const BLANK_COLOR: u16 = 0x7FFF;

/// 依 BGP/OBP0/OBP1 把 2 位元色號轉成顏色
pub fn dmg_color(palette: u8, color: u8) -> u16 {
    DMG_COLORS[((palette >> (color * 2)) & 0x03) as usize]
}

#[derive(Debug)]
struct PaletteRam {
    data: [u8; 64],
    index: u8,
    auto_increment: bool,
}

impl PaletteRam {
    fn new() -> Self {
        // 每個顏色初始為白色 0x7FFF (小端)
        let mut data = [0u8; 64];
        for pair in data.chunks_exact_mut(2) {
            pair[0] = 0xFF;
            pair[1] = 0x7F;
        }
        PaletteRam {
            data,
            index: 0,
            auto_increment: false,
        }
    }

    fn read_index(&self) -> u8 {
        let increment = if self.auto_increment { 0x80 } else { 0 };
        0x40 | increment | self.index
    }

    fn write_index(&mut self, value: u8) {
        self.index = value & 0x3F;
        self.auto_increment = value & 0x80 != 0;
    }

    fn write_data(&mut self, value: u8, accessible: bool) {
        if accessible {
            self.data[self.index as usize] = value;
        }
        if self.auto_increment {
            self.index = (self.index + 1) & 0x3F;
        }
    }

    fn color(&self, palette: u8, color: u8) -> u16 {
        let base = (palette as usize & 0x07) * 8 + (color as usize & 0x03) * 2;
        u16::from_le_bytes([self.data[base], self.data[base + 1]]) & 0x7FFF
    }
}

#[derive(Debug)]
pub struct CgbPalettes {
    background: PaletteRam,
    object: PaletteRam,
    /// 模式 3 期間 CPU 無法存取
    pub accessible: bool,
}

impl CgbPalettes {
    pub fn new() -> Self {
        CgbPalettes {
            background: PaletteRam::new(),
            object: PaletteRam::new(),
            accessible: true,
        }
    }

    pub fn background_color(&self, palette: u8, color: u8) -> u16 {
        self.background.color(palette, color)
    }

    pub fn object_color(&self, palette: u8, color: u8) -> u16 {
        self.object.color(palette, color)
    }
}

impl Default for CgbPalettes {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapping for CgbPalettes {
    fn get(&self, offset: u16) -> u8 {
        match offset {
            0 => self.background.read_index(),
            1 if self.accessible => self.background.data[self.background.index as usize],
            2 => self.object.read_index(),
            3 if self.accessible => self.object.data[self.object.index as usize],
            _ => 0xFF,
        }
    }

    fn set(&mut self, offset: u16, value: u8) {
        match offset {
            0 => self.background.write_index(value),
            1 => self.background.write_data(value, self.accessible),
            2 => self.object.write_index(value),
            _ => self.object.write_data(value, self.accessible),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dmg_palette_lookup() {
        // BGP = 0xE4: 色號 n 對應灰階 n
        for color in 0..4 {
            assert_eq!(dmg_color(0xE4, color), DMG_COLORS[color as usize]);
        }
        assert_eq!(dmg_color(0x1B, 0), DMG_COLORS[3]);
    }

    #[test]
    fn auto_increment_writes_consecutive_bytes() {
        let mut pals = CgbPalettes::new();
        pals.set(0, 0x80 | 0x08); // 調色盤 1 色 0
        pals.set(1, 0x1F);
        pals.set(1, 0x00);
        assert_eq!(pals.background_color(1, 0), 0x001F);
        assert_eq!(pals.get(0), 0xC0 | 0x0A);
        assert_eq!(pals.background_color(0, 0), 0x7FFF);
    }

    #[test]
    fn locked_during_drawing() {
        let mut pals = CgbPalettes::new();
        pals.accessible = false;
        pals.set(2, 0x80);
        pals.set(3, 0x12);
        assert_eq!(pals.get(3), 0xFF);
        pals.accessible = true;
        pals.set(2, 0x00);
        assert_eq!(pals.get(3), 0xFF);
        // 寫入被忽略但索引仍然前進
        pals.set(2, 0x01);
        assert_eq!(pals.get(3), 0x7F);
    }
}
