// 指令執行 - 每個 (操作碼, 階段) 對應一個 M-cycle，每個階段最多一次匯流排存取

use super::alu;
use super::registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z, Reg8, Reg16};
use super::{Cpu, CpuState, Flow, InterruptMasterState, SPEED_SWITCH_STALL};
use crate::mmu::Bus;

use Flow::{Done, Next};

impl Cpu {
    /// 條件碼 (bit 3-4)：NZ, Z, NC, C
    fn condition(&self, opcode: u8) -> bool {
        match (opcode >> 3) & 0x03 {
            0 => !self.regs.flag(FLAG_Z),
            1 => self.regs.flag(FLAG_Z),
            2 => !self.regs.flag(FLAG_C),
            _ => self.regs.flag(FLAG_C),
        }
    }

    /// LD [rr],A 與 LD A,[rr] 的位址，HL+ / HL- 順便更新 HL
    fn indirect_address(&mut self, opcode: u8) -> u16 {
        match (opcode >> 4) & 0x03 {
            0 => self.regs.pair(Reg16::BC),
            1 => self.regs.pair(Reg16::DE),
            2 => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_add(1));
                hl
            }
            _ => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_sub(1));
                hl
            }
        }
    }

    fn alu_a(&mut self, opcode: u8, value: u8) {
        let (result, flags) = alu::apply(opcode >> 3, self.regs.a(), value, self.regs.f());
        self.regs.set_a(result);
        self.regs.set_f(flags);
    }

    fn halt(&mut self, bus: &Bus) {
        if self.ime == InterruptMasterState::Enabled || bus.interrupts.pending().is_none() {
            self.state = CpuState::Halted;
        } else {
            // IME 關閉且已有中斷：不停機，下一次預取不遞增 PC
            self.halt_bug = true;
        }
    }

    fn stop(&mut self, bus: &mut Bus) {
        // STOP 後面的位元組不讀取直接跳過
        self.regs.pc = self.regs.pc.wrapping_add(1);
        if bus.joypad.any_line_low() {
            return;
        }
        if bus.system.is_cgb() && bus.system.prepare_switch && bus.interrupts.pending().is_none()
        {
            bus.system.switch_speed();
            bus.timer.reset_divider();
            self.stall = SPEED_SWITCH_STALL;
        } else {
            log::debug!("STOP 於 {:04X}，等待按鍵", self.opcode_address);
            bus.system.stopped = true;
            bus.timer.reset_divider();
        }
    }

    fn lock(&mut self) {
        log::warn!(
            "未定義的操作碼 {:02X} 於 {:04X}，CPU 停止",
            self.opcode,
            self.opcode_address
        );
        self.state = CpuState::Locked;
    }

    pub(super) fn execute(&mut self, bus: &mut Bus) -> Flow {
        let op = self.opcode;
        let stage = self.stage;
        match op {
            0x00 => Done,

            // LD rr,n16
            0x01 | 0x11 | 0x21 | 0x31 => match stage {
                0 => {
                    self.lo = self.read_pc(bus);
                    Next
                }
                1 => {
                    self.hi = self.read_pc(bus);
                    Next
                }
                _ => {
                    self.regs.set_pair(Reg16::from_pair_code(op), self.word());
                    Done
                }
            },

            // LD [rr],A
            0x02 | 0x12 | 0x22 | 0x32 => match stage {
                0 => {
                    let address = self.indirect_address(op);
                    bus.cpu_write(address, self.regs.a());
                    Next
                }
                _ => Done,
            },

            // LD A,[rr]
            0x0A | 0x1A | 0x2A | 0x3A => match stage {
                0 => {
                    let address = self.indirect_address(op);
                    self.data = bus.cpu_read(address);
                    Next
                }
                _ => {
                    self.regs.set_a(self.data);
                    Done
                }
            },

            // INC rr / DEC rr
            0x03 | 0x13 | 0x23 | 0x33 | 0x0B | 0x1B | 0x2B | 0x3B => match stage {
                0 => {
                    let reg = Reg16::from_pair_code(op);
                    let value = self.regs.pair(reg);
                    let value = if op & 0x08 == 0 {
                        value.wrapping_add(1)
                    } else {
                        value.wrapping_sub(1)
                    };
                    self.regs.set_pair(reg, value);
                    Next
                }
                _ => Done,
            },

            // INC [HL] / DEC [HL]
            0x34 | 0x35 => match stage {
                0 => {
                    self.data = bus.cpu_read(self.regs.hl());
                    Next
                }
                1 => {
                    let (result, flags) = if op == 0x34 {
                        alu::inc(self.data, self.regs.f())
                    } else {
                        alu::dec(self.data, self.regs.f())
                    };
                    bus.cpu_write(self.regs.hl(), result);
                    self.regs.set_f(flags);
                    Next
                }
                _ => Done,
            },

            // INC r / DEC r
            _ if op & 0xC6 == 0x04 => {
                let Some(reg) = Reg8::from_code(op >> 3) else {
                    return Done;
                };
                let (result, flags) = if op & 0x01 == 0 {
                    alu::inc(self.regs.get(reg), self.regs.f())
                } else {
                    alu::dec(self.regs.get(reg), self.regs.f())
                };
                self.regs.set(reg, result);
                self.regs.set_f(flags);
                Done
            }

            // LD r,n8 / LD [HL],n8
            _ if op & 0xC7 == 0x06 => match (stage, Reg8::from_code(op >> 3)) {
                (0, _) => {
                    self.data = self.read_pc(bus);
                    Next
                }
                (1, None) => {
                    bus.cpu_write(self.regs.hl(), self.data);
                    Next
                }
                (1, Some(reg)) => {
                    self.regs.set(reg, self.data);
                    Done
                }
                _ => Done,
            },

            // RLCA / RRCA / RLA / RRA
            0x07 | 0x0F | 0x17 | 0x1F => {
                let (result, flags) = alu::rotate_a(op >> 3, self.regs.a(), self.regs.f());
                self.regs.set_a(result);
                self.regs.set_f(flags);
                Done
            }

            // LD [a16],SP
            0x08 => match stage {
                0 => {
                    self.lo = self.read_pc(bus);
                    Next
                }
                1 => {
                    self.hi = self.read_pc(bus);
                    Next
                }
                2 => {
                    bus.cpu_write(self.word(), self.regs.sp as u8);
                    Next
                }
                3 => {
                    bus.cpu_write(self.word().wrapping_add(1), (self.regs.sp >> 8) as u8);
                    Next
                }
                _ => Done,
            },

            // ADD HL,rr
            0x09 | 0x19 | 0x29 | 0x39 => match stage {
                0 => {
                    let value = self.regs.pair(Reg16::from_pair_code(op));
                    let (result, flags) = alu::add16(self.regs.hl(), value, self.regs.f());
                    self.regs.set_hl(result);
                    self.regs.set_f(flags);
                    Next
                }
                _ => Done,
            },

            0x10 => {
                self.stop(bus);
                Done
            }

            // JR e8
            0x18 => match stage {
                0 => {
                    self.data = self.read_pc(bus);
                    Next
                }
                1 => {
                    self.regs.pc = self.regs.pc.wrapping_add(self.data as i8 as u16);
                    Next
                }
                _ => Done,
            },

            // JR cc,e8
            0x20 | 0x28 | 0x30 | 0x38 => match stage {
                0 => {
                    self.data = self.read_pc(bus);
                    Next
                }
                1 if self.condition(op) => {
                    self.regs.pc = self.regs.pc.wrapping_add(self.data as i8 as u16);
                    Next
                }
                _ => Done,
            },

            0x27 => {
                let (result, flags) = alu::daa(self.regs.a(), self.regs.f());
                self.regs.set_a(result);
                self.regs.set_f(flags);
                Done
            }
            0x2F => {
                self.regs.set_a(!self.regs.a());
                self.regs.set_f(self.regs.f() | FLAG_N | FLAG_H);
                Done
            }
            0x37 => {
                self.regs.set_f((self.regs.f() & FLAG_Z) | FLAG_C);
                Done
            }
            0x3F => {
                let carry = if self.regs.flag(FLAG_C) { 0 } else { FLAG_C };
                self.regs.set_f((self.regs.f() & FLAG_Z) | carry);
                Done
            }

            0x76 => {
                self.halt(bus);
                Done
            }

            // LD r,r' / LD r,[HL] / LD [HL],r
            0x40..=0x7F => {
                let destination = Reg8::from_code(op >> 3);
                let source = Reg8::from_code(op);
                match (stage, destination, source) {
                    (0, Some(d), Some(s)) => {
                        self.regs.set(d, self.regs.get(s));
                        Done
                    }
                    (0, Some(_), None) => {
                        self.data = bus.cpu_read(self.regs.hl());
                        Next
                    }
                    (0, None, Some(s)) => {
                        bus.cpu_write(self.regs.hl(), self.regs.get(s));
                        Next
                    }
                    (_, Some(d), None) => {
                        self.regs.set(d, self.data);
                        Done
                    }
                    _ => Done,
                }
            }

            // ALU A,r / ALU A,[HL]
            0x80..=0xBF => match (stage, Reg8::from_code(op)) {
                (0, Some(reg)) => {
                    self.alu_a(op, self.regs.get(reg));
                    Done
                }
                (0, None) => {
                    self.data = bus.cpu_read(self.regs.hl());
                    Next
                }
                _ => {
                    self.alu_a(op, self.data);
                    Done
                }
            },

            // RET cc
            0xC0 | 0xC8 | 0xD0 | 0xD8 => match stage {
                0 => Next,
                1 if !self.condition(op) => Done,
                1 => {
                    self.lo = self.pop(bus);
                    Next
                }
                2 => {
                    self.hi = self.pop(bus);
                    Next
                }
                3 => {
                    self.regs.pc = self.word();
                    Next
                }
                _ => Done,
            },

            // POP rr
            0xC1 | 0xD1 | 0xE1 | 0xF1 => match stage {
                0 => {
                    self.lo = self.pop(bus);
                    Next
                }
                1 => {
                    self.hi = self.pop(bus);
                    Next
                }
                _ => {
                    self.regs.set_pair(Reg16::from_stack_code(op), self.word());
                    Done
                }
            },

            // JP a16 / JP cc,a16
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xC3 => match stage {
                0 => {
                    self.lo = self.read_pc(bus);
                    Next
                }
                1 => {
                    self.hi = self.read_pc(bus);
                    Next
                }
                2 if op == 0xC3 || self.condition(op) => {
                    self.regs.pc = self.word();
                    Next
                }
                _ => Done,
            },

            // CALL a16 / CALL cc,a16
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xCD => match stage {
                0 => {
                    self.lo = self.read_pc(bus);
                    Next
                }
                1 => {
                    self.hi = self.read_pc(bus);
                    Next
                }
                2 if op == 0xCD || self.condition(op) => {
                    self.regs.sp = self.regs.sp.wrapping_sub(1);
                    Next
                }
                2 => Done,
                3 => {
                    bus.cpu_write(self.regs.sp, (self.regs.pc >> 8) as u8);
                    self.regs.sp = self.regs.sp.wrapping_sub(1);
                    Next
                }
                4 => {
                    bus.cpu_write(self.regs.sp, self.regs.pc as u8);
                    self.regs.pc = self.word();
                    Next
                }
                _ => Done,
            },

            // PUSH rr / RST n
            0xC5 | 0xD5 | 0xE5 | 0xF5 | 0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                let value = if op & 0x0F == 0x05 {
                    self.regs.pair(Reg16::from_stack_code(op))
                } else {
                    self.regs.pc
                };
                match stage {
                    0 => {
                        self.regs.sp = self.regs.sp.wrapping_sub(1);
                        Next
                    }
                    1 => {
                        bus.cpu_write(self.regs.sp, (value >> 8) as u8);
                        self.regs.sp = self.regs.sp.wrapping_sub(1);
                        Next
                    }
                    2 => {
                        bus.cpu_write(self.regs.sp, value as u8);
                        if op & 0x0F != 0x05 {
                            self.regs.pc = (op & 0x38) as u16;
                        }
                        Next
                    }
                    _ => Done,
                }
            }

            // ALU A,n8
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => match stage {
                0 => {
                    self.data = self.read_pc(bus);
                    Next
                }
                _ => {
                    self.alu_a(op, self.data);
                    Done
                }
            },

            // RET / RETI
            0xC9 | 0xD9 => match stage {
                0 => {
                    self.lo = self.pop(bus);
                    Next
                }
                1 => {
                    self.hi = self.pop(bus);
                    Next
                }
                2 => {
                    self.regs.pc = self.word();
                    if op == 0xD9 {
                        self.ime = InterruptMasterState::Enabled;
                    }
                    Next
                }
                _ => Done,
            },

            0xCB => match stage {
                0 => {
                    self.cb_opcode = self.read_pc(bus);
                    Next
                }
                _ => self.execute_prefixed(bus),
            },

            // LDH [a8],A
            0xE0 => match stage {
                0 => {
                    self.data = self.read_pc(bus);
                    Next
                }
                1 => {
                    bus.cpu_write(0xFF00 | self.data as u16, self.regs.a());
                    Next
                }
                _ => Done,
            },

            // LDH A,[a8]
            0xF0 => match stage {
                0 => {
                    self.lo = self.read_pc(bus);
                    Next
                }
                1 => {
                    self.data = bus.cpu_read(0xFF00 | self.lo as u16);
                    Next
                }
                _ => {
                    self.regs.set_a(self.data);
                    Done
                }
            },

            // LDH [C],A
            0xE2 => match stage {
                0 => {
                    let address = 0xFF00 | self.regs.get(Reg8::C) as u16;
                    bus.cpu_write(address, self.regs.a());
                    Next
                }
                _ => Done,
            },

            // LDH A,[C]
            0xF2 => match stage {
                0 => {
                    self.data = bus.cpu_read(0xFF00 | self.regs.get(Reg8::C) as u16);
                    Next
                }
                _ => {
                    self.regs.set_a(self.data);
                    Done
                }
            },

            // ADD SP,e8
            0xE8 => match stage {
                0 => {
                    self.data = self.read_pc(bus);
                    Next
                }
                1 => Next,
                2 => {
                    let (result, flags) = alu::add_sp(self.regs.sp, self.data);
                    self.regs.sp = result;
                    self.regs.set_f(flags);
                    Next
                }
                _ => Done,
            },

            // JP HL
            0xE9 => {
                self.regs.pc = self.regs.hl();
                Done
            }

            // LD [a16],A / LD A,[a16]
            0xEA | 0xFA => match stage {
                0 => {
                    self.lo = self.read_pc(bus);
                    Next
                }
                1 => {
                    self.hi = self.read_pc(bus);
                    Next
                }
                2 if op == 0xEA => {
                    bus.cpu_write(self.word(), self.regs.a());
                    Next
                }
                2 => {
                    self.data = bus.cpu_read(self.word());
                    Next
                }
                _ => {
                    if op == 0xFA {
                        self.regs.set_a(self.data);
                    }
                    Done
                }
            },

            0xF3 => {
                self.ime = InterruptMasterState::Disabled;
                Done
            }
            0xFB => {
                if self.ime == InterruptMasterState::Disabled {
                    self.ime = InterruptMasterState::Pending;
                }
                Done
            }

            // LD HL,SP+e8
            0xF8 => match stage {
                0 => {
                    self.data = self.read_pc(bus);
                    Next
                }
                1 => {
                    let (result, flags) = alu::add_sp(self.regs.sp, self.data);
                    self.regs.set_hl(result);
                    self.regs.set_f(flags);
                    Next
                }
                _ => Done,
            },

            // LD SP,HL
            0xF9 => match stage {
                0 => {
                    self.regs.sp = self.regs.hl();
                    Next
                }
                _ => Done,
            },

            // D3 DB DD E3 E4 EB EC ED F4 FC FD
            _ => {
                self.lock();
                Done
            }
        }
    }

    /// CB 前綴指令，階段 1 起；暫存器版本 2 個 M-cycle，[HL] 版本 3 (BIT) 或 4 個
    fn execute_prefixed(&mut self, bus: &mut Bus) -> Flow {
        let cb = self.cb_opcode;
        let index = (cb >> 3) & 0x07;
        let group = cb >> 6;

        let Some(reg) = Reg8::from_code(cb) else {
            return match self.stage {
                1 => {
                    self.data = bus.cpu_read(self.regs.hl());
                    Next
                }
                2 if group == 1 => {
                    self.regs.set_f(alu::test_bit(index, self.data, self.regs.f()));
                    Done
                }
                2 => {
                    let result = self.prefixed_result(group, index, self.data);
                    bus.cpu_write(self.regs.hl(), result);
                    Next
                }
                _ => Done,
            };
        };

        let value = self.regs.get(reg);
        if group == 1 {
            self.regs.set_f(alu::test_bit(index, value, self.regs.f()));
        } else {
            let result = self.prefixed_result(group, index, value);
            self.regs.set(reg, result);
        }
        Done
    }

    /// RLC..SRL / RES / SET 的結果；旋轉類同時更新旗標
    fn prefixed_result(&mut self, group: u8, index: u8, value: u8) -> u8 {
        match group {
            0 => {
                let (result, flags) = alu::rotate(index, value, self.regs.f());
                self.regs.set_f(flags);
                result
            }
            2 => value & !(1 << index),
            _ => value | (1 << index),
        }
    }
}
