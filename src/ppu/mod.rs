// PPU (Picture Processing Unit) - 每個時間量子推進一點 (dot)
// 每行 456 點：OAM 掃描 80 點、像素傳輸 (長度不定)、HBlank 補滿；第 144-153 行為 VBlank

mod fifo;
mod object;
mod palette;
mod registers;
mod video;

pub use fifo::{Fetcher, Pixel, PixelFifo, PixelSource, decode_row};
pub use object::{MAX_OBJECTS_PER_LINE, OBJECT_COUNT, Object, ObjectFlags};
pub use palette::{BLANK_COLOR, CgbPalettes, DMG_COLORS, dmg_color};
pub use registers::{LcdMode, LcdRegisters, TileAddressingMode, TileMapAddress};
pub use video::{OAM_SIZE, VRAM_BANK_SIZE, VideoMemory};

use crate::interrupts::Interrupt;
use crate::mmu::Bus;
use crate::scheduler::Component;

pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;
pub const DOTS_PER_LINE: u16 = 456;
pub const LINES_PER_FRAME: u8 = 154;
pub const DOTS_PER_FRAME: u32 = DOTS_PER_LINE as u32 * LINES_PER_FRAME as u32;

const OAM_SCAN_DOTS: u16 = 80;
/// 模式 3 開頭丟棄的第一次抓取
const STARTUP_DOTS: u8 = 6;
const OBJECT_FETCH_DOTS: u8 = 6;

/// RGB555 畫面
pub type FrameBuffer = [u16; SCREEN_WIDTH * SCREEN_HEIGHT];

#[derive(Debug)]
pub struct Ppu {
    /// LCD 關閉後為假，重新開啟時從第 0 行開始
    running: bool,
    dot: u16,
    objects: Vec<Object>,

    // 像素傳輸
    x: u8,
    discard: u8,
    startup: u8,
    object_fetch: Option<usize>,
    object_penalty: u8,
    fetcher: Fetcher,
    background: PixelFifo,
    sprites: PixelFifo,

    // 視窗
    window_line: u8,
    window_y_hit: bool,
    window_drawn: bool,

    back: Box<FrameBuffer>,
    front: Box<FrameBuffer>,
    frame_ready: bool,
    frames: u64,
}

impl Ppu {
    pub fn new() -> Self {
        Ppu {
            running: false,
            dot: 0,
            objects: Vec::with_capacity(MAX_OBJECTS_PER_LINE),
            x: 0,
            discard: 0,
            startup: 0,
            object_fetch: None,
            object_penalty: 0,
            fetcher: Fetcher::new(),
            background: PixelFifo::new(),
            sprites: PixelFifo::new(),
            window_line: 0,
            window_y_hit: false,
            window_drawn: false,
            back: Box::new([BLANK_COLOR; SCREEN_WIDTH * SCREEN_HEIGHT]),
            front: Box::new([BLANK_COLOR; SCREEN_WIDTH * SCREEN_HEIGHT]),
            frame_ready: false,
            frames: 0,
        }
    }

    /// 最近一個完成的畫面
    pub fn pixels(&self) -> &FrameBuffer {
        &self.front
    }

    /// 自上次呼叫後是否完成了新畫面
    pub fn take_frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// 目前這一行 OAM 掃描選中的物件，依 OAM 順序
    pub fn line_objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn dot(&self) -> u16 {
        self.dot
    }

    fn turn_on(&mut self, bus: &mut Bus) {
        log::debug!("LCD 開啟");
        self.running = true;
        self.dot = 0;
        bus.lcd.ly = 0;
        self.start_frame();
        self.start_line(bus);
    }

    fn turn_off(&mut self, bus: &mut Bus) {
        log::debug!("LCD 關閉於第 {} 點", self.dot);
        self.running = false;
        self.dot = 0;
        self.objects.clear();
        self.object_fetch = None;
        self.object_penalty = 0;
        self.background.clear();
        self.sprites.clear();
        bus.lcd.reset_for_lcd_off();
        bus.video.set_access(true, true);
        bus.palettes.accessible = true;
        self.front.fill(BLANK_COLOR);
    }

    fn start_frame(&mut self) {
        self.window_line = 0;
        self.window_y_hit = false;
    }

    fn start_line(&mut self, bus: &mut Bus) {
        self.objects.clear();
        self.window_drawn = false;
        if bus.lcd.ly == bus.lcd.wy {
            self.window_y_hit = true;
        }
        bus.lcd.change_mode(LcdMode::OamScan, &mut bus.interrupts);
        bus.video.set_access(true, false);
    }

    fn oam_scan_dot(&mut self, bus: &mut Bus) {
        // 兩點檢查一個 OAM 項目，滿 10 個後不再選取
        if self.dot % 2 == 0 && self.objects.len() < MAX_OBJECTS_PER_LINE {
            let index = (self.dot / 2) as usize;
            let height = bus.lcd.sprite_height();
            if let Some(object) = Object::scan(&bus.video, index, bus.lcd.ly, height) {
                self.objects.push(object);
            }
        }
        if self.dot == OAM_SCAN_DOTS - 1 {
            self.start_drawing(bus);
        }
    }

    fn start_drawing(&mut self, bus: &mut Bus) {
        bus.lcd.change_mode(LcdMode::Drawing, &mut bus.interrupts);
        bus.video.set_access(false, false);
        bus.palettes.accessible = false;
        self.x = 0;
        self.discard = bus.lcd.scx & 0x07;
        self.startup = STARTUP_DOTS;
        self.object_fetch = None;
        self.object_penalty = 0;
        self.fetcher.restart(false, 0);
        self.background.clear();
        self.sprites.clear();
    }

    fn drawing_dot(&mut self, bus: &mut Bus) {
        if self.x as usize == SCREEN_WIDTH {
            self.enter_hblank(bus);
            return;
        }
        if self.startup > 0 {
            self.startup -= 1;
            return;
        }
        if self.object_penalty > 0 {
            self.object_penalty -= 1;
            if self.object_penalty == 0 {
                self.fetch_object(bus);
            }
            return;
        }

        self.check_window(bus);
        let ly = bus.lcd.ly;
        if let Some(row) = self
            .fetcher
            .step(bus, ly, self.window_line, self.background.is_empty())
        {
            self.background.push_row(&row);
        }
        if self.background.is_empty() {
            return;
        }
        if self.discard > 0 {
            // SCX 低 3 位元的像素直接丟掉
            self.background.pop();
            self.discard -= 1;
            return;
        }
        if self.start_object_fetch(bus) {
            return;
        }
        self.emit_pixel(bus);
    }

    /// 視窗開始或中途關閉時清空背景佇列並重新抓取
    fn check_window(&mut self, bus: &Bus) {
        let lcd = &bus.lcd;
        let enabled = lcd.window_enabled() && (bus.is_cgb() || lcd.background_enabled());
        if self.fetcher.is_window() {
            if !enabled {
                self.background.clear();
                let column = (self.x as u16 + (lcd.scx & 0x07) as u16) / 8;
                self.fetcher.restart(false, column as u8);
            }
            return;
        }
        if enabled && self.window_y_hit && self.discard == 0 && self.x as u16 + 7 >= lcd.wx as u16 {
            self.background.clear();
            self.fetcher.restart(true, 0);
            self.window_drawn = true;
            // WX < 7：視窗最左邊 7 - WX 個像素在螢幕外
            if self.x == 0 {
                self.discard = 7u8.saturating_sub(lcd.wx);
            }
        }
    }

    /// 目前欄位碰到尚未抓取的物件時開始物件抓取
    fn start_object_fetch(&mut self, bus: &Bus) -> bool {
        if !bus.lcd.sprites_enabled() {
            return false;
        }
        let column = self.x as u16 + 8;
        let by_x = bus.object_priority & 0x01 != 0;
        let candidate = self
            .objects
            .iter()
            .enumerate()
            .filter(|(_, object)| !object.fetched && object.x as u16 <= column)
            .min_by_key(|(slot, object)| if by_x { (object.x, *slot) } else { (0, *slot) })
            .map(|(slot, _)| slot);
        let Some(slot) = candidate else {
            return false;
        };
        self.objects[slot].fetched = true;
        self.object_fetch = Some(slot);
        // 這一點算在懲罰內
        self.object_penalty = OBJECT_FETCH_DOTS - 1;
        true
    }

    fn fetch_object(&mut self, bus: &Bus) {
        let Some(slot) = self.object_fetch.take() else {
            return;
        };
        let Some(object) = self.objects.get(slot).copied() else {
            return;
        };
        let video = &bus.video;
        let cgb = bus.is_cgb();
        let flags = object.flags(video);
        let height = bus.lcd.sprite_height() as u16;

        let mut row = (bus.lcd.ly as u16 + 16).wrapping_sub(object.y as u16) & (height - 1);
        if flags.y_flip() {
            row = height - 1 - row;
        }
        let mut tile = object.tile(video);
        if height == 16 {
            tile &= 0xFE;
        }
        let bank = if cgb { flags.cgb_bank() } else { 0 };
        let offset = tile as u16 * 16 + row * 2;
        let colors = decode_row(
            video.vram_byte(bank, offset),
            video.vram_byte(bank, offset + 1),
            flags.x_flip(),
        );

        let palette = if cgb {
            flags.cgb_palette()
        } else {
            flags.dmg_palette()
        };
        // 左邊超出螢幕的部分
        let hidden = 8usize.saturating_sub(object.x as usize);
        let pixels: Vec<Pixel> = colors
            .iter()
            .skip(hidden)
            .map(|&color| Pixel {
                color,
                palette,
                source: PixelSource::Object(object.index),
                priority: flags.behind_background(),
            })
            .collect();
        let lower_index_wins = cgb && bus.object_priority & 0x01 == 0;
        self.sprites.merge_objects(&pixels, lower_index_wins);
    }

    fn emit_pixel(&mut self, bus: &Bus) {
        let Some(background) = self.background.pop() else {
            return;
        };
        let object = self.sprites.pop();
        let color = resolve_color(bus, background, object);
        let index = bus.lcd.ly as usize * SCREEN_WIDTH + self.x as usize;
        if let Some(slot) = self.back.get_mut(index) {
            *slot = color;
        }
        self.x += 1;
    }

    fn enter_hblank(&mut self, bus: &mut Bus) {
        bus.lcd.change_mode(LcdMode::HBlank, &mut bus.interrupts);
        bus.video.set_access(true, true);
        bus.palettes.accessible = true;
        bus.hdma.hblank_pending = true;
        if self.window_drawn {
            self.window_line = self.window_line.wrapping_add(1);
        }
    }

    fn enter_vblank(&mut self, bus: &mut Bus) {
        bus.lcd.change_mode(LcdMode::VBlank, &mut bus.interrupts);
        bus.interrupts.request(Interrupt::VBlank);
        std::mem::swap(&mut self.back, &mut self.front);
        self.frame_ready = true;
        self.frames += 1;
    }

    fn next_line(&mut self, bus: &mut Bus) {
        if bus.lcd.mode == LcdMode::Drawing {
            log::warn!("第 {} 行的像素傳輸超過一行的時間", bus.lcd.ly);
            self.enter_hblank(bus);
        }
        let ly = if bus.lcd.ly + 1 >= LINES_PER_FRAME {
            0
        } else {
            bus.lcd.ly + 1
        };
        bus.lcd.ly = ly;
        match ly {
            0 => {
                self.start_frame();
                self.start_line(bus);
            }
            1..=143 => self.start_line(bus),
            144 => self.enter_vblank(bus),
            // VBlank 期間仍比較 LYC
            _ => bus.lcd.update_stat(&mut bus.interrupts),
        }
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

/// 依背景/物件優先權規則決定輸出顏色
fn resolve_color(bus: &Bus, background: Pixel, object: Option<Pixel>) -> u16 {
    let lcd = &bus.lcd;
    let cgb = bus.is_cgb();
    let background_enabled = lcd.background_enabled();
    // DMG 關閉背景時背景色號視為 0
    let background_color = if cgb || background_enabled {
        background.color
    } else {
        0
    };

    let winner = object.filter(|object| {
        if object.color == 0 || !lcd.sprites_enabled() {
            return false;
        }
        if cgb && !background_enabled {
            // CGB 的 LCDC bit 0 關閉所有背景優先權
            return true;
        }
        if background.priority && background_color != 0 {
            return false;
        }
        !(object.priority && background_color != 0)
    });

    match winner {
        Some(object) if cgb => bus.palettes.object_color(object.palette, object.color),
        Some(object) => {
            let palette = if object.palette == 1 { lcd.obp1 } else { lcd.obp0 };
            dmg_color(palette, object.color)
        }
        None if cgb => bus.palettes.background_color(background.palette, background.color),
        None if !background_enabled => BLANK_COLOR,
        None => dmg_color(lcd.bgp, background.color),
    }
}

impl Component for Ppu {
    fn skip(&self, bus: &Bus) -> bool {
        !bus.lcd.lcd_enabled() && !self.running
    }

    fn tick(&mut self, bus: &mut Bus) {
        if !bus.lcd.lcd_enabled() {
            if self.running {
                self.turn_off(bus);
            }
            return;
        }
        if !self.running {
            self.turn_on(bus);
        }

        match bus.lcd.mode {
            LcdMode::OamScan => self.oam_scan_dot(bus),
            LcdMode::Drawing => self.drawing_dot(bus),
            LcdMode::HBlank | LcdMode::VBlank => {}
        }

        self.dot += 1;
        if self.dot == DOTS_PER_LINE {
            self.dot = 0;
            self.next_line(bus);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::Cartridge;
    use crate::config::Console;

    fn machine(console: Console) -> (Ppu, Bus) {
        let cartridge = Cartridge::new(vec![0u8; 0x8000]).unwrap();
        let mut bus = Bus::new(console, cartridge, None).unwrap();
        bus.interrupts.write_flags(0);
        (Ppu::new(), bus)
    }

    /// 推進到條件成立，回傳花費的點數
    fn run_until(ppu: &mut Ppu, bus: &mut Bus, mut done: impl FnMut(&Ppu, &Bus) -> bool) -> u32 {
        let mut dots = 0;
        while !done(ppu, bus) {
            ppu.tick(bus);
            dots += 1;
            assert!(dots < 2 * DOTS_PER_FRAME, "條件一直沒有成立");
        }
        dots
    }

    fn vblank_requested(bus: &Bus) -> bool {
        bus.interrupts.read_flags() & 0x01 != 0
    }

    /// 下一個 VBlank 之間的點數
    fn measure_frame(ppu: &mut Ppu, bus: &mut Bus) -> u32 {
        run_until(ppu, bus, |_, bus| vblank_requested(bus));
        bus.interrupts.write_flags(0);
        run_until(ppu, bus, |_, bus| vblank_requested(bus))
    }

    fn place_object(bus: &mut Bus, index: usize, y: u8, x: u8, tile: u8, flags: u8) {
        for (i, value) in [y, x, tile, flags].into_iter().enumerate() {
            bus.video.dma_write_oam(index * 4 + i, value);
        }
    }

    /// 每列 tile 資料都一樣
    fn fill_tile(bus: &mut Bus, tile: u16, low: u8, high: u8) {
        for row in 0..8 {
            bus.video.dma_write_vram(tile * 16 + row * 2, low);
            bus.video.dma_write_vram(tile * 16 + row * 2 + 1, high);
        }
    }

    /// 一行之中模式 3 持續的點數
    fn drawing_length(ppu: &mut Ppu, bus: &mut Bus) -> u32 {
        run_until(ppu, bus, |_, bus| bus.lcd.mode == LcdMode::Drawing);
        run_until(ppu, bus, |_, bus| bus.lcd.mode != LcdMode::Drawing)
    }

    #[test]
    fn frame_takes_154_lines_of_456_dots() {
        let (mut ppu, mut bus) = machine(Console::Dmg);
        assert_eq!(measure_frame(&mut ppu, &mut bus), 70224);
        assert_eq!(DOTS_PER_FRAME, 70224);
    }

    #[test]
    fn frame_length_does_not_depend_on_content() {
        let (mut ppu, mut bus) = machine(Console::Dmg);
        for i in 0..40 {
            place_object(&mut bus, i, 16 + (i as u8 % 4) * 4, 8 + i as u8 * 3, 0, 0);
        }
        bus.lcd.scx = 7;
        bus.lcd.wy = 20;
        bus.lcd.wx = 50;
        bus.lcd.lcdc = 0xF3;
        assert_eq!(measure_frame(&mut ppu, &mut bus), 70224);
    }

    #[test]
    fn drawing_length_grows_with_scroll_and_objects() {
        let (mut ppu, mut bus) = machine(Console::Dmg);
        bus.lcd.lcdc = 0x93;
        assert_eq!(drawing_length(&mut ppu, &mut bus), 172);

        bus.lcd.scx = 3;
        assert_eq!(drawing_length(&mut ppu, &mut bus), 175);

        bus.lcd.scx = 0;
        // 下一行 (LY 1 以後) 有一個物件
        place_object(&mut bus, 0, 16, 48, 0, 0);
        bus.video.dma_write_oam(0, 100);
        run_until(&mut ppu, &mut bus, |_, bus| bus.lcd.mode == LcdMode::HBlank);
        let line = bus.lcd.ly + 1;
        bus.video.dma_write_oam(0, line + 16);
        assert_eq!(drawing_length(&mut ppu, &mut bus), 178);
    }

    #[test]
    fn scan_selects_first_ten_objects_in_oam_order() {
        let (mut ppu, mut bus) = machine(Console::Dmg);
        bus.lcd.lcdc = 0x93;
        for i in 0..12 {
            place_object(&mut bus, i * 2, 16, 20 + i as u8, 0, 0);
        }
        // 第 0 行的掃描結束
        run_until(&mut ppu, &mut bus, |_, bus| bus.lcd.mode == LcdMode::Drawing);
        let indices: Vec<u8> = ppu.line_objects().iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18]);
    }

    #[test]
    fn background_and_object_pixels() {
        let (mut ppu, mut bus) = machine(Console::Dmg);
        bus.lcd.lcdc = 0x93;
        bus.lcd.bgp = 0xE4;
        bus.lcd.obp0 = 0xE4;
        fill_tile(&mut bus, 0, 0xFF, 0x00); // 背景色號 1
        fill_tile(&mut bus, 1, 0xF0, 0xF0); // 物件左半色號 3
        place_object(&mut bus, 0, 16 + 10, 8 + 20, 1, 0);
        // 背景色號非 0 時被蓋住的物件
        place_object(&mut bus, 1, 16 + 10, 8 + 40, 1, 0x80);

        measure_frame(&mut ppu, &mut bus);
        assert!(ppu.take_frame_ready());
        let pixels = ppu.pixels();
        assert_eq!(pixels[0], DMG_COLORS[1]);
        assert_eq!(pixels[10 * SCREEN_WIDTH + 20], DMG_COLORS[3]);
        assert_eq!(pixels[10 * SCREEN_WIDTH + 24], DMG_COLORS[1]);
        assert_eq!(pixels[10 * SCREEN_WIDTH + 40], DMG_COLORS[1]);
        assert_eq!(pixels[9 * SCREEN_WIDTH + 20], DMG_COLORS[1]);
    }

    #[test]
    fn dmg_background_disabled_is_blank() {
        let (mut ppu, mut bus) = machine(Console::Dmg);
        bus.lcd.lcdc = 0x92;
        bus.lcd.bgp = 0xE4;
        fill_tile(&mut bus, 0, 0xFF, 0xFF);
        measure_frame(&mut ppu, &mut bus);
        assert!(ppu.pixels().iter().all(|&p| p == BLANK_COLOR));
    }

    #[test]
    fn window_covers_background_from_wx() {
        let (mut ppu, mut bus) = machine(Console::Dmg);
        // 背景用 0x9800 (tile 0)，視窗用 0x9C00 (tile 2)
        bus.lcd.lcdc = 0xF1;
        bus.lcd.bgp = 0xE4;
        bus.lcd.wy = 8;
        bus.lcd.wx = 7 + 80;
        fill_tile(&mut bus, 2, 0xFF, 0xFF);
        for i in 0..0x400 {
            bus.video.dma_write_vram(0x1C00 + i, 2);
        }
        measure_frame(&mut ppu, &mut bus);
        let pixels = ppu.pixels();
        assert_eq!(pixels[7 * SCREEN_WIDTH + 100], DMG_COLORS[0]);
        assert_eq!(pixels[8 * SCREEN_WIDTH + 79], DMG_COLORS[0]);
        assert_eq!(pixels[8 * SCREEN_WIDTH + 80], DMG_COLORS[3]);
        assert_eq!(pixels[143 * SCREEN_WIDTH + 159], DMG_COLORS[3]);
    }

    #[test]
    fn window_left_of_seven_is_clipped() {
        let (mut ppu, mut bus) = machine(Console::Dmg);
        bus.lcd.lcdc = 0xF1;
        bus.lcd.bgp = 0xE4;
        bus.lcd.wy = 0;
        bus.lcd.wx = 3;
        // 視窗 tile：左 4 點色號 0，右 4 點色號 1
        fill_tile(&mut bus, 2, 0x0F, 0x00);
        for i in 0..0x400 {
            bus.video.dma_write_vram(0x1C00 + i, 2);
        }
        measure_frame(&mut ppu, &mut bus);
        let pixels = ppu.pixels();
        for line in [0, 10] {
            let row = line * SCREEN_WIDTH;
            assert_eq!(pixels[row], DMG_COLORS[1]);
            assert_eq!(pixels[row + 3], DMG_COLORS[1]);
            assert_eq!(pixels[row + 4], DMG_COLORS[0]);
            assert_eq!(pixels[row + 8], DMG_COLORS[1]);
        }
    }

    #[test]
    fn vram_and_oam_locked_while_drawing() {
        let (mut ppu, mut bus) = machine(Console::Dmg);
        bus.video.dma_write_vram(0, 0x42);
        bus.video.dma_write_oam(0, 0x24);
        run_until(&mut ppu, &mut bus, |_, bus| bus.lcd.mode == LcdMode::OamScan);
        assert_eq!(bus.read(0xFE00), 0xFF);
        assert_eq!(bus.read(0x8000), 0x42);
        run_until(&mut ppu, &mut bus, |_, bus| bus.lcd.mode == LcdMode::Drawing);
        assert_eq!(bus.read(0x8000), 0xFF);
        run_until(&mut ppu, &mut bus, |_, bus| bus.lcd.mode == LcdMode::HBlank);
        assert_eq!(bus.read(0x8000), 0x42);
        assert_eq!(bus.read(0xFE00), 0x24);
        assert!(bus.hdma.hblank_pending);
    }

    #[test]
    fn lyc_interrupt_fires_on_vblank_lines_too() {
        let (mut ppu, mut bus) = machine(Console::Dmg);
        bus.write(0xFF41, 0x40);
        bus.write(0xFF45, 150);
        bus.interrupts.write_flags(0);
        run_until(&mut ppu, &mut bus, |_, bus| bus.lcd.ly == 150);
        assert_ne!(bus.interrupts.read_flags() & 0x02, 0);
    }

    #[test]
    fn lcd_off_resets_and_idles() {
        let (mut ppu, mut bus) = machine(Console::Dmg);
        run_until(&mut ppu, &mut bus, |_, bus| bus.lcd.ly == 5 && bus.lcd.mode == LcdMode::Drawing);
        bus.write(0xFF40, 0x11);
        ppu.tick(&mut bus);
        assert!(ppu.skip(&bus));
        assert_eq!(bus.read(0xFF44), 0);
        assert_eq!(bus.read(0xFF41) & 0x03, 0);
        assert!(bus.video.vram_accessible && bus.video.oam_accessible);

        bus.write(0xFF40, 0x91);
        assert!(!ppu.skip(&bus));
        ppu.tick(&mut bus);
        assert_eq!(bus.lcd.ly, 0);
        assert_eq!(bus.lcd.mode, LcdMode::OamScan);
        assert_eq!(ppu.dot(), 1);
    }

    #[test]
    fn cgb_lower_oam_index_wins_overlap() {
        let (mut ppu, mut bus) = machine(Console::Cgb);
        bus.lcd.lcdc = 0x93;
        // 物件調色盤 1 / 2 的色號 1
        for (index, color) in [(0x8A, 0x001Fu16), (0x92, 0x03E0)] {
            bus.write(0xFF6A, index);
            let [lo, hi] = color.to_le_bytes();
            bus.write(0xFF6B, lo);
            bus.write(0xFF6B, hi);
        }
        fill_tile(&mut bus, 1, 0xFF, 0x00);
        // 物件 3 在左邊，但重疊處由 OAM 編號較小的物件 1 顯示
        place_object(&mut bus, 3, 16, 8, 1, 0x01);
        place_object(&mut bus, 1, 16, 12, 1, 0x02);
        measure_frame(&mut ppu, &mut bus);
        let pixels = ppu.pixels();
        assert_eq!(pixels[0], 0x001F);
        assert_eq!(pixels[3], 0x001F);
        assert_eq!(pixels[4], 0x03E0);
        assert_eq!(pixels[11], 0x03E0);
        assert_eq!(pixels[12], 0x7FFF);
        assert_eq!(ppu.frame_count(), 2);
    }

    #[test]
    fn dmg_lower_x_wins_overlap() {
        let (mut ppu, mut bus) = machine(Console::Dmg);
        bus.lcd.lcdc = 0x93;
        bus.lcd.obp0 = 0xE4;
        bus.lcd.obp1 = 0x1B;
        fill_tile(&mut bus, 1, 0xFF, 0x00);
        // 物件 1 的 X 較小，即使 OAM 編號較大也優先
        place_object(&mut bus, 0, 16, 12, 1, 0x00);
        place_object(&mut bus, 1, 16, 8, 1, 0x10);
        measure_frame(&mut ppu, &mut bus);
        let pixels = ppu.pixels();
        assert_eq!(pixels[0], dmg_color(0x1B, 1));
        assert_eq!(pixels[7], dmg_color(0x1B, 1));
        assert_eq!(pixels[8], dmg_color(0xE4, 1));
    }
}
