// DMA - OAM DMA (0xFF46) 與 CGB VRAM DMA (0xFF51-0xFF55)

use crate::mmu::{Bus, Mapping};
use crate::scheduler::Component;

/// OAM DMA 以哪條匯流排讀取來源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaBus {
    /// 0x8000-0x9FFF
    Video,
    /// 0x0000-0x7FFF、0xA000-0xFDFF
    External,
}

impl DmaBus {
    pub fn of(address: u16) -> Option<DmaBus> {
        match address {
            0x8000..=0x9FFF => Some(DmaBus::Video),
            0x0000..=0x7FFF | 0xA000..=0xFDFF => Some(DmaBus::External),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OamDmaState {
    Idle,
    /// 寫入 0xFF46 後等一個 M-cycle 才開始
    Starting,
    Transferring,
}

#[derive(Debug)]
pub struct OamDma {
    register: u8,
    source: u16,
    state: OamDmaState,
    /// 最近一次搬運的值，CPU 衝突讀取時看到這個
    pub last_byte: u8,
}

impl OamDma {
    pub fn new() -> Self {
        OamDma {
            register: 0xFF,
            source: 0,
            state: OamDmaState::Idle,
            last_byte: 0xFF,
        }
    }

    pub fn is_transferring(&self) -> bool {
        self.state == OamDmaState::Transferring
    }

    pub fn source_bus(&self) -> Option<DmaBus> {
        DmaBus::of(self.source)
    }
}

impl Default for OamDma {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapping for OamDma {
    fn get(&self, _offset: u16) -> u8 {
        self.register
    }

    fn set(&mut self, _offset: u16, value: u8) {
        self.register = value;
        self.source = (value as u16) << 8;
        self.state = OamDmaState::Starting;
        log::trace!("OAM DMA 從 {:04X} 開始", self.source);
    }
}

/// OAM DMA 執行單元，在 CPU 時脈域每個 M-cycle 搬一個位元組
#[derive(Debug, Default)]
pub struct DmaController;

impl DmaController {
    pub fn new() -> Self {
        DmaController
    }
}

impl Component for DmaController {
    fn skip(&self, bus: &Bus) -> bool {
        bus.oam_dma.state == OamDmaState::Idle
    }

    fn tick(&mut self, bus: &mut Bus) {
        match bus.oam_dma.state {
            OamDmaState::Idle => {}
            OamDmaState::Starting => bus.oam_dma.state = OamDmaState::Transferring,
            OamDmaState::Transferring => {
                let source = bus.oam_dma.source;
                let index = (source & 0xFF) as usize;
                // 0xE000 以上讀的是 WRAM 鏡像
                let read_from = if source >= 0xE000 { source - 0x2000 } else { source };
                let value = bus.dma_read(read_from);
                bus.video.dma_write_oam(index, value);
                bus.oam_dma.last_byte = value;
                if index + 1 >= 0xA0 {
                    bus.oam_dma.state = OamDmaState::Idle;
                } else {
                    bus.oam_dma.source = source + 1;
                }
            }
        }
    }
}

/// CGB VRAM DMA 描述子；實際搬運由 CPU 在指令邊界竊取週期完成
#[derive(Debug)]
pub struct Hdma {
    pub source: u16,
    pub destination: u16,
    /// 剩下幾個 16 位元組區塊
    pub blocks: u8,
    pub hblank_mode: bool,
    pub active: bool,
    /// CPU 中途停止了 HBlank 傳輸
    pub paused: bool,
    /// PPU 進入 HBlank 時設定，CPU 搬完一個區塊後清除
    pub hblank_pending: bool,
}

impl Hdma {
    pub fn new() -> Self {
        Hdma {
            source: 0,
            destination: 0x8000,
            blocks: 0,
            hblank_mode: false,
            active: false,
            paused: false,
            hblank_pending: false,
        }
    }

    /// 此刻 CPU 是否應該搬一個區塊
    pub fn wants_block(&self) -> bool {
        self.active && !self.paused && (!self.hblank_mode || self.hblank_pending)
    }

    /// 區塊搬完後推進位址
    pub fn finish_block(&mut self) {
        self.source = self.source.wrapping_add(0x10);
        self.destination = 0x8000 | (self.destination.wrapping_add(0x10) & 0x1FF0);
        self.blocks = self.blocks.saturating_sub(1);
        self.hblank_pending = false;
        if self.blocks == 0 {
            self.active = false;
        }
    }
}

impl Default for Hdma {
    fn default() -> Self {
        Self::new()
    }
}

/// offset 0-4 對應 HDMA1-HDMA5
impl Mapping for Hdma {
    fn get(&self, offset: u16) -> u8 {
        match offset {
            4 => {
                let remaining = self.blocks.wrapping_sub(1) & 0x7F;
                if self.active && !self.paused {
                    remaining
                } else {
                    0x80 | remaining
                }
            }
            _ => 0xFF,
        }
    }

    fn set(&mut self, offset: u16, value: u8) {
        match offset {
            0 => {
                let high = if value & 0xE0 == 0xE0 {
                    0xA0 | (value & 0x1F)
                } else {
                    value
                };
                self.source = ((high as u16) << 8) | (self.source & 0x00F0);
            }
            1 => self.source = (self.source & 0xFF00) | (value as u16 & 0xF0),
            2 => self.destination = 0x8000 | ((value as u16 & 0x1F) << 8) | (self.destination & 0x00F0),
            3 => self.destination = (self.destination & 0xFF00) | (value as u16 & 0xF0),
            _ => {
                if self.active && self.hblank_mode && value & 0x80 == 0 {
                    self.paused = true;
                    self.active = false;
                    log::trace!("HBlank DMA 中止，剩 {} 區塊", self.blocks);
                    return;
                }
                self.blocks = (value & 0x7F) + 1;
                self.hblank_mode = value & 0x80 != 0;
                self.active = true;
                self.paused = false;
                self.hblank_pending = false;
                log::trace!(
                    "VRAM DMA {:04X} -> {:04X}，{} 區塊 ({})",
                    self.source,
                    self.destination,
                    self.blocks,
                    if self.hblank_mode { "HBlank" } else { "一般" }
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_classification() {
        assert_eq!(DmaBus::of(0x8123), Some(DmaBus::Video));
        assert_eq!(DmaBus::of(0x4000), Some(DmaBus::External));
        assert_eq!(DmaBus::of(0xC000), Some(DmaBus::External));
        assert_eq!(DmaBus::of(0xFF80), None);
    }

    #[test]
    fn hdma_registers() {
        let mut hdma = Hdma::new();
        hdma.set(0, 0xC1);
        hdma.set(1, 0x2F);
        hdma.set(2, 0xFF);
        hdma.set(3, 0x3F);
        assert_eq!(hdma.source, 0xC120);
        assert_eq!(hdma.destination, 0x9F30);
        assert_eq!(hdma.get(4), 0xFF);
        hdma.set(4, 0x81);
        assert!(hdma.active && hdma.hblank_mode);
        assert_eq!(hdma.get(4), 0x01);
        assert!(!hdma.wants_block());
        hdma.hblank_pending = true;
        assert!(hdma.wants_block());
    }

    #[test]
    fn hblank_transfer_can_be_stopped() {
        let mut hdma = Hdma::new();
        hdma.set(4, 0x83);
        hdma.set(4, 0x00);
        assert!(!hdma.active);
        assert_eq!(hdma.get(4), 0x83);
    }

    #[test]
    fn finishing_last_block_deactivates() {
        let mut hdma = Hdma::new();
        hdma.set(4, 0x00);
        assert!(hdma.wants_block());
        hdma.finish_block();
        assert!(!hdma.active);
        assert_eq!(hdma.get(4), 0xFF);
    }
}
