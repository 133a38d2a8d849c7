// MBC5 - 9 位元 ROM bank，最多 16 個 RAM bank

use super::{BankController, bank_offset};
use crate::mmu::EnableState;

#[derive(Debug)]
pub struct Mbc5 {
    rom: Vec<u8>,
    ram: Vec<u8>,
    ram_state: EnableState,
    rom_bank: u16,
    ram_bank: u8,
}

impl Mbc5 {
    pub fn new(rom: Vec<u8>, ram_bytes: usize) -> Self {
        Mbc5 {
            rom,
            ram: vec![0xFF; ram_bytes],
            ram_state: EnableState::Disabled,
            rom_bank: 1,
            ram_bank: 0,
        }
    }

    fn ram_address(&self, offset: u16) -> Option<usize> {
        if self.ram_state == EnableState::Disabled || self.ram.is_empty() {
            return None;
        }
        Some(bank_offset(self.ram_bank as usize, 0x2000, offset) % self.ram.len())
    }
}

impl BankController for Mbc5 {
    fn read_rom(&self, offset: u16) -> u8 {
        // MBC5 的 bank 0 可以映射到 0x4000 區域
        let bank = if offset < 0x4000 { 0 } else { self.rom_bank as usize };
        let address = bank_offset(bank, 0x4000, offset & 0x3FFF);
        self.rom[address % self.rom.len()]
    }

    fn write_control(&mut self, offset: u16, value: u8) {
        match offset {
            0x0000..=0x1FFF => {
                self.ram_state = if (value & 0x0F) == 0x0A {
                    EnableState::Enabled
                } else {
                    EnableState::Disabled
                };
            }
            0x2000..=0x2FFF => self.rom_bank = (self.rom_bank & 0x100) | value as u16,
            0x3000..=0x3FFF => self.rom_bank = (self.rom_bank & 0xFF) | ((value as u16 & 1) << 8),
            0x4000..=0x5FFF => self.ram_bank = value & 0x0F,
            _ => {}
        }
    }

    fn read_ram(&self, offset: u16) -> u8 {
        self.ram_address(offset).map_or(0xFF, |address| self.ram[address])
    }

    fn write_ram(&mut self, offset: u16, value: u8) -> bool {
        match self.ram_address(offset) {
            Some(address) => {
                self.ram[address] = value;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nine_bit_rom_bank() {
        let mut rom = vec![0u8; 512 * 0x4000];
        rom[0x101 * 0x4000] = 0x5A;
        rom[0] = 0x11;
        let mut mbc = Mbc5::new(rom, 0);
        mbc.write_control(0x2000, 0x01);
        mbc.write_control(0x3000, 0x01);
        assert_eq!(mbc.read_rom(0x4000), 0x5A);
        mbc.write_control(0x2000, 0x00);
        mbc.write_control(0x3000, 0x00);
        assert_eq!(mbc.read_rom(0x4000), 0x11);
    }

    #[test]
    fn ram_banks() {
        let mut mbc = Mbc5::new(vec![0; 0x8000], 4 * 0x2000);
        mbc.write_control(0x0000, 0x0A);
        mbc.write_control(0x4000, 0x02);
        assert!(mbc.write_ram(0x0000, 0x77));
        mbc.write_control(0x4000, 0x00);
        assert_eq!(mbc.read_ram(0x0000), 0xFF);
        mbc.write_control(0x4000, 0x02);
        assert_eq!(mbc.read_ram(0x0000), 0x77);
    }
}
