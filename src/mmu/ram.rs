// 工作 RAM (0xC000-0xDFFF，CGB 以 SVBK 切換 bank 1-7) 與高位 RAM (0xFF80-0xFFFE)

use super::Mapping;

const WRAM_BANK_SIZE: usize = 0x1000;

#[derive(Debug)]
pub struct WorkRam {
    data: Vec<u8>,
    bank: u8, // SVBK (0xFF70)，0 視為 1
    cgb: bool,
}

impl WorkRam {
    pub fn new(cgb: bool) -> Self {
        let banks = if cgb { 8 } else { 2 };
        WorkRam {
            data: vec![0; WRAM_BANK_SIZE * banks],
            bank: 1,
            cgb,
        }
    }

    pub fn read_bank_select(&self) -> u8 {
        0xF8 | self.bank
    }

    pub fn write_bank_select(&mut self, value: u8) {
        if self.cgb {
            self.bank = (value & 0x07).max(1);
        }
    }

    fn index(&self, offset: u16) -> usize {
        let offset = offset as usize & 0x1FFF;
        if offset < WRAM_BANK_SIZE {
            offset
        } else {
            self.bank as usize * WRAM_BANK_SIZE + (offset - WRAM_BANK_SIZE)
        }
    }
}

impl Mapping for WorkRam {
    fn get(&self, offset: u16) -> u8 {
        self.data[self.index(offset)]
    }

    fn set(&mut self, offset: u16, value: u8) {
        let index = self.index(offset);
        self.data[index] = value;
    }
}

#[derive(Debug)]
pub struct HighRam {
    data: [u8; 0x7F],
}

impl HighRam {
    pub fn new() -> Self {
        HighRam { data: [0; 0x7F] }
    }
}

impl Default for HighRam {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapping for HighRam {
    fn get(&self, offset: u16) -> u8 {
        self.data[offset as usize % 0x7F]
    }

    fn set(&mut self, offset: u16, value: u8) {
        self.data[offset as usize % 0x7F] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svbk_switches_upper_half() {
        let mut wram = WorkRam::new(true);
        wram.set(0x1000, 0x11);
        wram.write_bank_select(0x03);
        wram.set(0x1000, 0x33);
        wram.write_bank_select(0x00);
        assert_eq!(wram.read_bank_select(), 0xF9);
        assert_eq!(wram.get(0x1000), 0x11);
        wram.write_bank_select(0x03);
        assert_eq!(wram.get(0x1000), 0x33);
    }

    #[test]
    fn dmg_has_fixed_bank() {
        let mut wram = WorkRam::new(false);
        wram.write_bank_select(0x05);
        wram.set(0x1FFF, 0xAA);
        assert_eq!(wram.get(0x1FFF), 0xAA);
        assert_eq!(wram.read_bank_select(), 0xF9);
    }
}
