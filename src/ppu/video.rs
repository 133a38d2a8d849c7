// 影像記憶體 - VRAM (0x8000-0x9FFF，CGB 兩個 bank) 與 OAM (0xFE00-0xFE9F)

pub const VRAM_BANK_SIZE: usize = 0x2000;
pub const OAM_SIZE: usize = 0xA0;

#[derive(Debug)]
pub struct VideoMemory {
    vram: Vec<u8>,
    bank: u8, // VBK (0xFF4F)
    oam: [u8; OAM_SIZE],
    cgb: bool,
    /// 由 PPU 依模式設定：模式 3 鎖 VRAM，模式 2/3 鎖 OAM
    pub vram_accessible: bool,
    pub oam_accessible: bool,
}

impl VideoMemory {
    pub fn new(cgb: bool) -> Self {
        let banks = if cgb { 2 } else { 1 };
        VideoMemory {
            vram: vec![0; VRAM_BANK_SIZE * banks],
            bank: 0,
            oam: [0; OAM_SIZE],
            cgb,
            vram_accessible: true,
            oam_accessible: true,
        }
    }

    pub fn set_access(&mut self, vram: bool, oam: bool) {
        self.vram_accessible = vram;
        self.oam_accessible = oam;
    }

    fn vram_index(&self, offset: u16) -> usize {
        self.bank as usize * VRAM_BANK_SIZE + (offset as usize & 0x1FFF)
    }

    // ---- CPU 端 ----

    pub fn read_vram(&self, offset: u16) -> u8 {
        if !self.vram_accessible {
            return 0xFF;
        }
        self.vram[self.vram_index(offset)]
    }

    pub fn write_vram(&mut self, offset: u16, value: u8) {
        if self.vram_accessible {
            let index = self.vram_index(offset);
            self.vram[index] = value;
        }
    }

    pub fn read_oam(&self, offset: u16) -> u8 {
        if !self.oam_accessible {
            return 0xFF;
        }
        self.oam[offset as usize % OAM_SIZE]
    }

    pub fn write_oam(&mut self, offset: u16, value: u8) {
        if self.oam_accessible {
            self.oam[offset as usize % OAM_SIZE] = value;
        }
    }

    /// 0xFEA0-0xFEFF 未使用區域；offset 相對於 0xFEA0
    pub fn read_unused(&self, offset: u16) -> u8 {
        if !self.cgb {
            return 0x00;
        }
        let nibble = (((offset + 0xA0) >> 4) & 0x0F) as u8;
        nibble | (nibble << 4)
    }

    pub fn read_bank_select(&self) -> u8 {
        0xFE | self.bank
    }

    pub fn write_bank_select(&mut self, value: u8) {
        if self.cgb {
            self.bank = value & 0x01;
        }
    }

    // ---- PPU 與 DMA 端，不受存取鎖影響 ----

    pub fn vram_byte(&self, bank: u8, offset: u16) -> u8 {
        self.vram[(bank as usize & 0x01) * VRAM_BANK_SIZE % self.vram.len() + (offset as usize & 0x1FFF)]
    }

    pub fn oam_byte(&self, index: usize) -> u8 {
        self.oam[index % OAM_SIZE]
    }

    pub fn dma_write_oam(&mut self, index: usize, value: u8) {
        self.oam[index % OAM_SIZE] = value;
    }

    pub fn dma_read_vram(&self, offset: u16) -> u8 {
        self.vram[self.vram_index(offset)]
    }

    /// HDMA 寫入目前選擇的 bank
    pub fn dma_write_vram(&mut self, offset: u16, value: u8) {
        let index = self.vram_index(offset);
        self.vram[index] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_vram_reads_ff_and_drops_writes() {
        let mut video = VideoMemory::new(false);
        video.write_vram(0x0010, 0x42);
        video.set_access(false, true);
        assert_eq!(video.read_vram(0x0010), 0xFF);
        video.write_vram(0x0010, 0x99);
        video.set_access(true, true);
        assert_eq!(video.read_vram(0x0010), 0x42);
        assert_eq!(video.vram_byte(0, 0x0010), 0x42);
    }

    #[test]
    fn cgb_bank_switch() {
        let mut video = VideoMemory::new(true);
        video.write_vram(0x0000, 0x11);
        video.write_bank_select(0x01);
        assert_eq!(video.read_bank_select(), 0xFF);
        video.write_vram(0x0000, 0x22);
        assert_eq!(video.vram_byte(0, 0), 0x11);
        assert_eq!(video.vram_byte(1, 0), 0x22);
    }

    #[test]
    fn dmg_ignores_bank_select() {
        let mut video = VideoMemory::new(false);
        video.write_bank_select(0x01);
        assert_eq!(video.read_bank_select(), 0xFE);
        assert_eq!(video.vram_byte(1, 0x1234), video.vram_byte(0, 0x1234));
    }

    #[test]
    fn unused_oam_area() {
        let dmg = VideoMemory::new(false);
        assert_eq!(dmg.read_unused(0x00), 0x00);
        let cgb = VideoMemory::new(true);
        assert_eq!(cgb.read_unused(0x00), 0xAA); // 0xFEA0
        assert_eq!(cgb.read_unused(0x5F), 0xFF); // 0xFEFF
        assert_eq!(cgb.read_unused(0x10), 0xBB); // 0xFEB0
    }
}
