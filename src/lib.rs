//! Game Boy / Game Boy Color 週期精確模擬核心
//!
//! 每個時間量子由 [`scheduler::Scheduler`] 依固定順序推進 CPU、OAM DMA、PPU 與 APU，
//! 所有周邊暫存器都掛在 [`mmu::Bus`] 上。

pub mod apu;
pub mod cartridge;
pub mod config;
pub mod cpu;
pub mod dma;
pub mod error;
pub mod gameboy;
pub mod interrupts;
pub mod joypad;
pub mod logger;
pub mod mmu;
pub mod ppu;
pub mod scheduler;
pub mod serial;
pub mod timer;

pub use config::{Console, MachineConfig};
pub use error::{Error, Result};
pub use gameboy::GameBoy;
pub use joypad::Button;
