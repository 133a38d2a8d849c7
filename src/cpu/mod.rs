// CPU (SM83) - 以 M-cycle 為單位的狀態機，指令最後一個週期同時預取下一個操作碼

pub mod alu;
pub mod disasm;
mod execute;
pub mod registers;

use crate::config::Console;
use crate::interrupts::Interrupt;
use crate::mmu::Bus;
use crate::scheduler::Component;
use registers::Registers;

/// STOP 切換速度後 CPU 停頓的 M-cycle 數
pub const SPEED_SWITCH_STALL: u32 = 2050;
/// 每個 VRAM DMA 區塊的位元組數，每個 M-cycle 搬 2 個
const HDMA_BLOCK_BYTES: u8 = 16;

/// CPU 運行狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    Running,
    Halted,
    /// 遇到未定義操作碼，永久停止
    Locked,
}

/// 中斷主啟用狀態 (IME)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptMasterState {
    Disabled,
    /// EI 之後要再過一個指令邊界才生效
    Pending,
    Enabled,
}

/// 一個階段執行完後的走向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    /// 指令結束，這個 M-cycle 同時預取下一個操作碼
    Done,
}

#[derive(Debug)]
pub struct Cpu {
    pub regs: Registers,
    pub ime: InterruptMasterState,
    pub state: CpuState,
    opcode: u8,
    opcode_address: u16,
    stage: u8,
    // 多週期指令的暫存值
    lo: u8,
    hi: u8,
    data: u8,
    cb_opcode: u8,
    halt_bug: bool,
    dispatching: Option<Interrupt>,
    hdma_progress: u8,
    stall: u32,
    disassemble: bool,
    instr_count: u64,
}

impl Cpu {
    /// 沒有開機 ROM 時以開機後暫存器啟動
    pub fn new(console: Console, bootrom: bool, disassemble: bool) -> Self {
        let regs = if bootrom {
            Registers::zeroed()
        } else {
            Registers::post_boot(console)
        };
        Cpu {
            opcode_address: regs.pc,
            regs,
            ime: InterruptMasterState::Disabled,
            state: CpuState::Running,
            // 第一個週期當作 NOP 結束，用來預取第一條指令
            opcode: 0x00,
            stage: 0,
            lo: 0,
            hi: 0,
            data: 0,
            cb_opcode: 0,
            halt_bug: false,
            dispatching: None,
            hdma_progress: 0,
            stall: 0,
            disassemble,
            instr_count: 0,
        }
    }

    /// 正在指令邊界上 (下一個 M-cycle 開始執行預取的操作碼)
    pub fn at_boundary(&self) -> bool {
        self.stage == 0 && self.dispatching.is_none() && self.hdma_progress == 0
    }

    pub fn instruction_count(&self) -> u64 {
        self.instr_count
    }

    /// 目前預取的操作碼所在位址
    pub fn current_address(&self) -> u16 {
        self.opcode_address
    }

    fn prefetch(&mut self, bus: &Bus) {
        self.opcode_address = self.regs.pc;
        self.opcode = bus.cpu_read(self.regs.pc);
        if self.halt_bug {
            self.halt_bug = false;
        } else {
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }
        self.stage = 0;
        self.instr_count += 1;
        if self.disassemble {
            let (text, _) = disasm::disassemble(bus, self.opcode_address);
            log::info!("{:04X}: {}", self.opcode_address, text);
        }
    }

    fn read_pc(&mut self, bus: &Bus) -> u8 {
        let value = bus.cpu_read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    fn pop(&mut self, bus: &Bus) -> u8 {
        let value = bus.cpu_read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        value
    }

    fn word(&self) -> u16 {
        u16::from_le_bytes([self.lo, self.hi])
    }

    /// 中斷分派：兩個閒置週期、推入返回位址、跳到向量，共 5 個 M-cycle
    fn dispatch_step(&mut self, bus: &mut Bus, interrupt: Interrupt) {
        // 返回位址是被丟棄的預取操作碼所在位址
        let return_address = self.regs.pc.wrapping_sub(1);
        match self.stage {
            0 => self.stage = 1,
            1 => {
                self.regs.sp = self.regs.sp.wrapping_sub(1);
                self.stage = 2;
            }
            2 => {
                bus.cpu_write(self.regs.sp, (return_address >> 8) as u8);
                self.regs.sp = self.regs.sp.wrapping_sub(1);
                self.stage = 3;
            }
            3 => {
                bus.cpu_write(self.regs.sp, return_address as u8);
                self.regs.pc = interrupt.vector();
                self.stage = 4;
            }
            _ => {
                self.dispatching = None;
                self.prefetch(bus);
            }
        }
    }

    /// 在指令邊界替 VRAM DMA 搬 2 個位元組
    fn hdma_step(&mut self, bus: &mut Bus) {
        for _ in 0..2 {
            let offset = self.hdma_progress as u16;
            let source = bus.hdma.source.wrapping_add(offset);
            // 來源落在 VRAM 時讀不到有效資料
            let value = if (0x8000..=0x9FFF).contains(&source) {
                0xFF
            } else {
                bus.dma_read(source)
            };
            let destination = bus.hdma.destination.wrapping_add(offset).wrapping_sub(0x8000);
            bus.video.dma_write_vram(destination & 0x1FFF, value);
            self.hdma_progress += 1;
        }
        if self.hdma_progress >= HDMA_BLOCK_BYTES {
            self.hdma_progress = 0;
            bus.hdma.finish_block();
        }
    }

    /// 指令邊界：先用目前的 IME 檢查中斷，再讓 EI 的延遲生效
    fn boundary(&mut self, bus: &mut Bus) -> bool {
        let dispatched = if self.ime == InterruptMasterState::Enabled {
            match bus.interrupts.pending() {
                Some(interrupt) => {
                    bus.interrupts.acknowledge(interrupt);
                    self.ime = InterruptMasterState::Disabled;
                    self.dispatching = Some(interrupt);
                    log::trace!("分派中斷 {:?} -> {:04X}", interrupt, interrupt.vector());
                    true
                }
                None => false,
            }
        } else {
            false
        };
        if self.ime == InterruptMasterState::Pending {
            self.ime = InterruptMasterState::Enabled;
        }
        dispatched
    }
}

impl Component for Cpu {
    fn skip(&self, _bus: &Bus) -> bool {
        self.state == CpuState::Locked
    }

    fn tick(&mut self, bus: &mut Bus) {
        if self.state == CpuState::Locked {
            return;
        }
        if self.stall > 0 {
            self.stall -= 1;
            return;
        }

        if self.state == CpuState::Halted {
            // 被喚醒的這個週期什麼都不做
            if bus.interrupts.pending().is_some() {
                self.state = CpuState::Running;
            }
            return;
        }

        if let Some(interrupt) = self.dispatching {
            self.dispatch_step(bus, interrupt);
            return;
        }

        if self.stage == 0 {
            if self.hdma_progress > 0 || bus.hdma.wants_block() {
                self.hdma_step(bus);
                return;
            }
            if self.boundary(bus) {
                if let Some(interrupt) = self.dispatching {
                    self.dispatch_step(bus, interrupt);
                }
                return;
            }
        }

        match self.execute(bus) {
            Flow::Next => self.stage += 1,
            Flow::Done => {
                if self.state != CpuState::Locked {
                    self.prefetch(bus);
                }
            }
        }
    }
}
