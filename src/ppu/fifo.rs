// 像素佇列與背景/視窗 tile 抓取器

use std::collections::VecDeque;

use crate::mmu::Bus;

/// 一次抓取的像素數
pub const TILE_WIDTH: usize = 8;
/// 背景抓取器一個 tile 的點數 (tile 編號、低位元組、高位元組各 2 點)
const FETCH_DOTS: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelSource {
    Background,
    /// OAM 中的物件編號 (0-39)
    Object(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixel {
    /// 2 位元色號，0 為透明
    pub color: u8,
    /// DMG 物件: 0 = OBP0, 1 = OBP1；CGB: 調色盤 0-7
    pub palette: u8,
    pub source: PixelSource,
    /// 背景: CGB 屬性 bit 7；物件: 屬性 bit 7 (在背景色 1-3 之後)
    pub priority: bool,
}

impl Pixel {
    pub fn transparent_object(index: u8) -> Self {
        Pixel {
            color: 0,
            palette: 0,
            source: PixelSource::Object(index),
            priority: false,
        }
    }

    fn object_index(&self) -> u8 {
        match self.source {
            PixelSource::Object(index) => index,
            PixelSource::Background => u8::MAX,
        }
    }
}

/// 把一列 tile 資料 (低/高位元組) 解成 8 個色號，左邊像素在前
pub fn decode_row(low: u8, high: u8, flip_x: bool) -> [u8; TILE_WIDTH] {
    let mut colors = [0u8; TILE_WIDTH];
    for (i, color) in colors.iter_mut().enumerate() {
        let bit = if flip_x { i } else { 7 - i };
        *color = (((high >> bit) & 1) << 1) | ((low >> bit) & 1);
    }
    colors
}

#[derive(Debug, Default)]
pub struct PixelFifo {
    pixels: VecDeque<Pixel>,
}

impl PixelFifo {
    pub fn new() -> Self {
        PixelFifo {
            pixels: VecDeque::with_capacity(TILE_WIDTH * 2),
        }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn clear(&mut self) {
        self.pixels.clear();
    }

    pub fn pop(&mut self) -> Option<Pixel> {
        self.pixels.pop_front()
    }

    pub fn push_row(&mut self, row: &[Pixel]) {
        self.pixels.extend(row.iter().copied());
    }

    /// 物件像素疊進佇列。已有不透明像素時：
    /// lower_index_wins 為假 (DMG / OPRI=1) 先到者保留，為真 (CGB OPRI=0) 比 OAM 編號
    pub fn merge_objects(&mut self, row: &[Pixel], lower_index_wins: bool) {
        for (i, incoming) in row.iter().enumerate() {
            match self.pixels.get_mut(i) {
                None => self.pixels.push_back(*incoming),
                Some(existing) => {
                    if incoming.color == 0 {
                        continue;
                    }
                    let replace = existing.color == 0
                        || (lower_index_wins && incoming.object_index() < existing.object_index());
                    if replace {
                        *existing = *incoming;
                    }
                }
            }
        }
    }
}

/// 背景/視窗抓取器，每 2 點完成一次 VRAM 讀取
#[derive(Debug, Default)]
pub struct Fetcher {
    dots: u8,
    /// 這一行已抓取的 tile 數
    tile_column: u8,
    window: bool,
    map_offset: u16,
    attributes: u8,
    tile_index: u8,
    low: u8,
    high: u8,
}

impl Fetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 從指定 tile 欄重新開始抓取
    pub fn restart(&mut self, window: bool, tile_column: u8) {
        *self = Fetcher {
            window,
            tile_column,
            ..Fetcher::default()
        };
    }

    pub fn is_window(&self) -> bool {
        self.window
    }

    /// 推進一點；資料備妥且佇列已空時回傳 8 個背景像素
    pub fn step(
        &mut self,
        bus: &Bus,
        ly: u8,
        window_line: u8,
        fifo_empty: bool,
    ) -> Option<[Pixel; TILE_WIDTH]> {
        if self.dots < FETCH_DOTS {
            self.dots += 1;
            match self.dots {
                2 => self.fetch_tile_number(bus, ly, window_line),
                4 => self.low = self.fetch_tile_data(bus, ly, window_line, 0),
                6 => self.high = self.fetch_tile_data(bus, ly, window_line, 1),
                _ => {}
            }
        }
        if self.dots < FETCH_DOTS || !fifo_empty {
            return None;
        }

        self.dots = 0;
        self.tile_column = self.tile_column.wrapping_add(1);
        let colors = decode_row(self.low, self.high, self.attributes & 0x20 != 0);
        let palette = if bus.is_cgb() { self.attributes & 0x07 } else { 0 };
        let priority = bus.is_cgb() && self.attributes & 0x80 != 0;
        Some(colors.map(|color| Pixel {
            color,
            palette,
            source: PixelSource::Background,
            priority,
        }))
    }

    fn fetch_tile_number(&mut self, bus: &Bus, ly: u8, window_line: u8) {
        let lcd = &bus.lcd;
        let (map, column, row) = if self.window {
            (lcd.window_map(), self.tile_column, window_line)
        } else {
            (
                lcd.background_map(),
                (lcd.scx >> 3).wrapping_add(self.tile_column),
                ly.wrapping_add(lcd.scy),
            )
        };
        self.map_offset = map.offset() + (row as u16 / 8) * 32 + (column & 0x1F) as u16;
        self.tile_index = bus.video.vram_byte(0, self.map_offset);
        self.attributes = if bus.is_cgb() {
            bus.video.vram_byte(1, self.map_offset)
        } else {
            0
        };
    }

    fn fetch_tile_data(&self, bus: &Bus, ly: u8, window_line: u8, plane: u16) -> u8 {
        let lcd = &bus.lcd;
        // SCY 在每次抓取時重新讀取
        let row = if self.window {
            window_line
        } else {
            ly.wrapping_add(lcd.scy)
        };
        let mut fine_y = (row & 0x07) as u16;
        if self.attributes & 0x40 != 0 {
            fine_y = 7 - fine_y;
        }
        let bank = (self.attributes >> 3) & 0x01;
        let offset = lcd.tile_addressing().tile_offset(self.tile_index) + fine_y * 2 + plane;
        bus.video.vram_byte(bank, offset)
    }
}
