// MBC2 - 內建 512 x 4 位元 RAM

use super::{BankController, bank_offset};
use crate::mmu::EnableState;

const MBC2_RAM_SIZE: usize = 0x200;

#[derive(Debug)]
pub struct Mbc2 {
    rom: Vec<u8>,
    ram: Vec<u8>,
    ram_state: EnableState,
    rom_bank: u8,
}

impl Mbc2 {
    pub fn new(rom: Vec<u8>) -> Self {
        Mbc2 {
            rom,
            ram: vec![0xFF; MBC2_RAM_SIZE],
            ram_state: EnableState::Disabled,
            rom_bank: 1,
        }
    }
}

impl BankController for Mbc2 {
    fn read_rom(&self, offset: u16) -> u8 {
        let bank = if offset < 0x4000 { 0 } else { self.rom_bank as usize };
        let address = bank_offset(bank, 0x4000, offset & 0x3FFF);
        self.rom[address % self.rom.len()]
    }

    fn write_control(&mut self, offset: u16, value: u8) {
        if offset >= 0x4000 {
            return;
        }
        // 位址位元 8 決定是 RAM 啟用還是 ROM bank
        if offset & 0x0100 == 0 {
            self.ram_state = if (value & 0x0F) == 0x0A {
                EnableState::Enabled
            } else {
                EnableState::Disabled
            };
        } else {
            self.rom_bank = (value & 0x0F).max(1);
        }
    }

    fn read_ram(&self, offset: u16) -> u8 {
        if self.ram_state == EnableState::Disabled {
            return 0xFF;
        }
        self.ram[offset as usize % MBC2_RAM_SIZE] | 0xF0
    }

    fn write_ram(&mut self, offset: u16, value: u8) -> bool {
        if self.ram_state == EnableState::Disabled {
            return false;
        }
        self.ram[offset as usize % MBC2_RAM_SIZE] = value & 0x0F;
        true
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }

    fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }
}
