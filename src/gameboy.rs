// Game Boy 模擬器主結構 - 匯流排擁有所有周邊，排程器依固定順序推進 CPU、DMA、PPU、APU

use std::path::PathBuf;

use crate::apu::{Apu, AudioError};
use crate::cartridge::Cartridge;
use crate::config::{Console, MachineConfig};
use crate::cpu::{Cpu, CpuState};
use crate::dma::DmaController;
use crate::error::Result;
use crate::joypad::Button;
use crate::mmu::Bus;
use crate::ppu::{FrameBuffer, Ppu};
use crate::scheduler::{Scheduler, Units};

/// 有修改時每隔多少畫面寫回存檔
pub const AUTOSAVE_FRAMES: u64 = 3600;

#[derive(Debug)]
pub struct GameBoy {
    pub bus: Bus,
    pub cpu: Cpu,
    pub ppu: Ppu,
    dma: DmaController,
    apu: Apu,
    scheduler: Scheduler,
    frames: u64,
}

impl GameBoy {
    /// 未指定主機型號時依卡帶標頭的 CGB 旗標選擇
    pub fn new(rom: Vec<u8>, save: Option<PathBuf>, config: MachineConfig) -> Result<Self> {
        let mut cartridge = Cartridge::new(rom)?;
        if let Some(path) = save {
            cartridge.attach_save(path)?;
        }
        let console = config
            .console
            .unwrap_or_else(|| cartridge.header.preferred_console());
        log::info!("硬體模式: {console:?}");

        let has_bootrom = config.bootrom.is_some();
        let bus = Bus::new(console, cartridge, config.bootrom)?;
        Ok(GameBoy {
            bus,
            cpu: Cpu::new(console, has_bootrom, config.disassemble),
            ppu: Ppu::new(),
            dma: DmaController::new(),
            apu: Apu::new(),
            scheduler: Scheduler::new(config.pacing),
            frames: 0,
        })
    }

    pub fn console(&self) -> Console {
        self.bus.system.console
    }

    pub fn step_quantum(&mut self) {
        self.scheduler.advance(
            &mut self.bus,
            Units {
                cpu: &mut self.cpu,
                dma: &mut self.dma,
                ppu: &mut self.ppu,
                audio: &mut self.apu,
            },
        );
    }

    /// 推進一個畫面的時間 (154 x 456 點)，不論 LCD 是否開啟
    pub fn run_frame(&mut self) -> Result<()> {
        let quanta = Scheduler::frame_quanta(self.bus.system.double_speed);
        for _ in 0..quanta {
            self.step_quantum();
        }
        self.frames += 1;
        if self.frames % AUTOSAVE_FRAMES == 0 && self.bus.cartridge.is_dirty() {
            self.bus.cartridge.save()?;
        }
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn quanta(&self) -> u64 {
        self.scheduler.quanta()
    }

    pub fn pixels(&self) -> &FrameBuffer {
        self.ppu.pixels()
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.bus.set_button(button, pressed);
    }

    pub fn samples(&self) -> std::result::Result<Vec<i16>, AudioError> {
        self.apu.samples()
    }

    /// 序列埠送出的所有位元組 (測試 ROM 的輸出)
    pub fn serial_output(&self) -> &str {
        self.bus.serial.output()
    }

    /// 取出序列埠輸出，之後 serial_output() 從空字串重新累積
    pub fn take_serial_output(&mut self) -> String {
        self.bus.serial.take_output()
    }

    /// CPU 遇到未定義操作碼後永久停止
    pub fn is_locked(&self) -> bool {
        self.cpu.state == CpuState::Locked
    }

    pub fn save(&mut self) -> Result<()> {
        self.bus.cartridge.save()
    }
}
