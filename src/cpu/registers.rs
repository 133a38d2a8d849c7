// CPU 暫存器 - 8 位元暫存器依 B C D E H L F A 排列，另有 SP 與 PC

use crate::config::Console;

pub const FLAG_Z: u8 = 0x80;
pub const FLAG_N: u8 = 0x40;
pub const FLAG_H: u8 = 0x20;
pub const FLAG_C: u8 = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg8 {
    B = 0,
    C = 1,
    D = 2,
    E = 3,
    H = 4,
    L = 5,
    F = 6,
    A = 7,
}

impl Reg8 {
    /// 指令編碼中的 3 位元暫存器欄位，6 代表 [HL]
    pub fn from_code(code: u8) -> Option<Reg8> {
        match code & 0x07 {
            0 => Some(Reg8::B),
            1 => Some(Reg8::C),
            2 => Some(Reg8::D),
            3 => Some(Reg8::E),
            4 => Some(Reg8::H),
            5 => Some(Reg8::L),
            6 => None,
            _ => Some(Reg8::A),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg16 {
    BC,
    DE,
    HL,
    SP,
    AF,
}

impl Reg16 {
    /// 0x01/0x11/0x21/0x31 系列的暫存器對
    pub fn from_pair_code(code: u8) -> Reg16 {
        match (code >> 4) & 0x03 {
            0 => Reg16::BC,
            1 => Reg16::DE,
            2 => Reg16::HL,
            _ => Reg16::SP,
        }
    }

    /// PUSH/POP 使用 AF 取代 SP
    pub fn from_stack_code(code: u8) -> Reg16 {
        match Reg16::from_pair_code(code) {
            Reg16::SP => Reg16::AF,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    r: [u8; 8],
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    /// 有開機 ROM 時從全零開始
    pub fn zeroed() -> Self {
        Registers {
            r: [0; 8],
            sp: 0,
            pc: 0,
        }
    }

    /// 跳過開機 ROM 時的開機後狀態
    pub fn post_boot(console: Console) -> Self {
        let (a, f, b, c, d, e, h, l) = match console {
            Console::Dmg => (0x01, 0xB0, 0x00, 0x13, 0x00, 0xD8, 0x01, 0x4D),
            Console::Cgb => (0x11, 0x80, 0x00, 0x00, 0xFF, 0x56, 0x00, 0x0D),
        };
        Registers {
            r: [b, c, d, e, h, l, f, a],
            sp: 0xFFFE,
            pc: 0x0100,
        }
    }

    pub fn get(&self, reg: Reg8) -> u8 {
        self.r[reg as usize]
    }

    pub fn set(&mut self, reg: Reg8, value: u8) {
        // F 的低 4 位元永遠為 0
        let value = if reg == Reg8::F { value & 0xF0 } else { value };
        self.r[reg as usize] = value;
    }

    pub fn a(&self) -> u8 {
        self.get(Reg8::A)
    }

    pub fn f(&self) -> u8 {
        self.get(Reg8::F)
    }

    pub fn set_a(&mut self, value: u8) {
        self.set(Reg8::A, value);
    }

    pub fn set_f(&mut self, value: u8) {
        self.set(Reg8::F, value);
    }

    pub fn flag(&self, mask: u8) -> bool {
        self.f() & mask != 0
    }

    pub fn pair(&self, reg: Reg16) -> u16 {
        let join = |hi: Reg8, lo: Reg8| u16::from_be_bytes([self.get(hi), self.get(lo)]);
        match reg {
            Reg16::BC => join(Reg8::B, Reg8::C),
            Reg16::DE => join(Reg8::D, Reg8::E),
            Reg16::HL => join(Reg8::H, Reg8::L),
            Reg16::AF => join(Reg8::A, Reg8::F),
            Reg16::SP => self.sp,
        }
    }

    pub fn set_pair(&mut self, reg: Reg16, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        let (high, low) = match reg {
            Reg16::BC => (Reg8::B, Reg8::C),
            Reg16::DE => (Reg8::D, Reg8::E),
            Reg16::HL => (Reg8::H, Reg8::L),
            Reg16::AF => (Reg8::A, Reg8::F),
            Reg16::SP => {
                self.sp = value;
                return;
            }
        };
        self.set(high, hi);
        self.set(low, lo);
    }

    pub fn hl(&self) -> u16 {
        self.pair(Reg16::HL)
    }

    pub fn set_hl(&mut self, value: u16) {
        self.set_pair(Reg16::HL, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_boot_dmg() {
        let regs = Registers::post_boot(Console::Dmg);
        assert_eq!(regs.pair(Reg16::AF), 0x01B0);
        assert_eq!(regs.pair(Reg16::BC), 0x0013);
        assert_eq!(regs.pair(Reg16::DE), 0x00D8);
        assert_eq!(regs.pair(Reg16::HL), 0x014D);
        assert_eq!(regs.sp, 0xFFFE);
        assert_eq!(regs.pc, 0x0100);
    }

    #[test]
    fn post_boot_cgb() {
        let regs = Registers::post_boot(Console::Cgb);
        assert_eq!(regs.pair(Reg16::AF), 0x1180);
        assert_eq!(regs.pair(Reg16::DE), 0xFF56);
        assert_eq!(regs.pair(Reg16::HL), 0x000D);
    }

    #[test]
    fn flag_low_nibble_is_masked() {
        let mut regs = Registers::zeroed();
        regs.set_pair(Reg16::AF, 0x12FF);
        assert_eq!(regs.pair(Reg16::AF), 0x12F0);
    }

    #[test]
    fn pair_codes() {
        assert_eq!(Reg16::from_pair_code(0x31), Reg16::SP);
        assert_eq!(Reg16::from_stack_code(0xF5), Reg16::AF);
        // LD B,[HL]：目的欄位是 B，來源欄位 6 代表 [HL]
        assert_eq!(Reg8::from_code(0x46 >> 3), Some(Reg8::B));
        assert_eq!(Reg8::from_code(0x46), None);
        assert_eq!(Reg8::from_code(0x7F), Some(Reg8::A));
    }
}
