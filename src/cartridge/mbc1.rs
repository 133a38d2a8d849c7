// MBC1 - 最多 2MB ROM / 32KB RAM

use super::{BankController, bank_offset};
use crate::mmu::EnableState;

#[derive(Debug)]
pub struct Mbc1 {
    rom: Vec<u8>,
    ram: Vec<u8>,
    ram_state: EnableState,
    bank_low: u8,     // 0x2000-0x3FFF，5 位元，0 視為 1
    bank_high: u8,    // 0x4000-0x5FFF，2 位元
    banking_mode: u8, // 0 = ROM banking, 1 = RAM banking
}

impl Mbc1 {
    pub fn new(rom: Vec<u8>, ram_bytes: usize) -> Self {
        Mbc1 {
            rom,
            ram: vec![0xFF; ram_bytes],
            ram_state: EnableState::Disabled,
            bank_low: 1,
            bank_high: 0,
            banking_mode: 0,
        }
    }

    fn ram_address(&self, offset: u16) -> Option<usize> {
        if self.ram_state == EnableState::Disabled || self.ram.is_empty() {
            return None;
        }
        let bank = if self.banking_mode == 1 { self.bank_high } else { 0 };
        Some(bank_offset(bank as usize, 0x2000, offset) % self.ram.len())
    }
}

impl BankController for Mbc1 {
    fn read_rom(&self, offset: u16) -> u8 {
        let bank = if offset < 0x4000 {
            if self.banking_mode == 1 {
                (self.bank_high as usize) << 5
            } else {
                0
            }
        } else {
            ((self.bank_high as usize) << 5) | self.bank_low as usize
        };
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
            0x2000..=0x3FFF => {
                self.bank_low = (value & 0x1F).max(1);
                log::trace!("MBC1 ROM bank -> {:02X}", self.bank_low);
            }
            0x4000..=0x5FFF => self.bank_high = value & 0x03,
            _ => self.banking_mode = value & 0x01,
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

    fn banked_rom(banks: usize) -> Vec<u8> {
        let mut rom = vec![0u8; banks * 0x4000];
        for bank in 0..banks {
            rom[bank * 0x4000] = bank as u8;
        }
        rom
    }

    #[test]
    fn bank_zero_maps_to_one() {
        let mut mbc = Mbc1::new(banked_rom(8), 0);
        mbc.write_control(0x2000, 0x00);
        assert_eq!(mbc.read_rom(0x4000), 1);
        mbc.write_control(0x2000, 0x05);
        assert_eq!(mbc.read_rom(0x4000), 5);
        assert_eq!(mbc.read_rom(0x0000), 0);
    }

    #[test]
    fn upper_bits_select_large_banks() {
        let mut mbc = Mbc1::new(banked_rom(128), 0);
        mbc.write_control(0x2000, 0x02);
        mbc.write_control(0x4000, 0x01);
        assert_eq!(mbc.read_rom(0x4000), 0x22);
        // 模式 1 時 0x0000 區域也受高位元影響
        mbc.write_control(0x6000, 0x01);
        assert_eq!(mbc.read_rom(0x0000), 0x20);
    }

    #[test]
    fn ram_requires_enable() {
        let mut mbc = Mbc1::new(banked_rom(2), 0x2000);
        assert!(!mbc.write_ram(0x0010, 0x42));
        assert_eq!(mbc.read_ram(0x0010), 0xFF);
        mbc.write_control(0x0000, 0x0A);
        assert!(mbc.write_ram(0x0010, 0x42));
        assert_eq!(mbc.read_ram(0x0010), 0x42);
    }
}
