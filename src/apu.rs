// APU - 音訊暫存器 (0xFF10-0xFF26)、波形 RAM (0xFF30-0xFF3F) 與取樣輸出佇列
//
// 聲道合成尚未實作，輸出固定為靜音，但取樣節奏與緩衝區交付和真實硬體相同。

use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};

use crate::mmu::{Bus, Mapping};
use crate::scheduler::Component;

/// 輸出取樣率 (Hz)
pub const SAMPLE_RATE: u32 = 32_768;
/// 每個緩衝區的立體聲取樣數
pub const FRAMES_PER_BUFFER: usize = 512;
/// 音訊時脈域 2 MiHz，每 64 步產生一個取樣
const STEPS_PER_SAMPLE: u32 = 2_097_152 / SAMPLE_RATE;
const QUEUE_DEPTH: usize = 8;

const NR52: usize = 0x16;

/// 讀取時強制為 1 的位元，索引為 0xFF10 起的偏移
const READ_MASKS: [u8; 0x17] = [
    0x80, 0x3F, 0x00, 0xFF, 0xBF, // NR10-NR14
    0xFF, 0x3F, 0x00, 0xFF, 0xBF, // 0xFF15, NR21-NR24
    0x7F, 0xFF, 0x9F, 0xFF, 0xBF, // NR30-NR34
    0xFF, 0xFF, 0x00, 0x00, 0xBF, // 0xFF1F, NR41-NR44
    0x00, 0x00, 0x70, // NR50-NR52
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AudioError {
    #[error("音訊資料不足")]
    NotEnoughData,
}

#[derive(Debug)]
pub struct AudioRegisters {
    registers: [u8; 0x17],
    wave: [u8; 16],
    powered: bool,
    /// NR52 bit 0-3，觸發後設定，關機時清除
    channels_on: u8,
}

impl AudioRegisters {
    pub fn new() -> Self {
        let mut registers = [0u8; 0x17];
        // 開機後狀態
        registers[0x00] = 0x80;
        registers[0x01] = 0xBF;
        registers[0x02] = 0xF3;
        registers[0x14] = 0x77;
        registers[0x15] = 0xF3;
        AudioRegisters {
            registers,
            wave: [0; 16],
            powered: true,
            channels_on: 0x01,
        }
    }

    pub fn powered(&self) -> bool {
        self.powered
    }

    pub fn read_wave(&self, offset: u16) -> u8 {
        self.wave[offset as usize & 0x0F]
    }

    pub fn write_wave(&mut self, offset: u16, value: u8) {
        self.wave[offset as usize & 0x0F] = value;
    }
}

impl Default for AudioRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapping for AudioRegisters {
    fn get(&self, offset: u16) -> u8 {
        let index = offset as usize;
        if index == NR52 {
            return 0x70 | if self.powered { 0x80 } else { 0 } | self.channels_on;
        }
        self.registers.get(index).map_or(0xFF, |value| value | READ_MASKS[index])
    }

    fn set(&mut self, offset: u16, value: u8) {
        let index = offset as usize;
        if index == NR52 {
            let power = value & 0x80 != 0;
            if self.powered && !power {
                // 關機清除所有聲音暫存器
                self.registers = [0; 0x17];
                self.channels_on = 0;
            }
            self.powered = power;
            return;
        }
        if !self.powered || index >= self.registers.len() {
            return;
        }
        self.registers[index] = value;
        // NRx4 bit 7 觸發聲道
        if value & 0x80 != 0 {
            let channel = match index {
                0x04 => Some(0),
                0x09 => Some(1),
                0x0E => Some(2),
                0x13 => Some(3),
                _ => None,
            };
            if let Some(channel) = channel {
                self.channels_on |= 1 << channel;
            }
        }
    }
}

/// 音訊輸出單元，以固定取樣率把立體聲緩衝區送進佇列
#[derive(Debug)]
pub struct Apu {
    sender: Sender<Vec<i16>>,
    receiver: Receiver<Vec<i16>>,
    buffer: Vec<i16>,
    step: u32,
}

impl Apu {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(QUEUE_DEPTH);
        Apu {
            sender,
            receiver,
            buffer: Vec::with_capacity(FRAMES_PER_BUFFER * 2),
            step: 0,
        }
    }

    /// 取出一個完整的緩衝區 (左右交錯)
    pub fn samples(&self) -> Result<Vec<i16>, AudioError> {
        self.receiver
            .try_recv()
            .map_err(|_| AudioError::NotEnoughData)
    }

    fn push_frame(&mut self, left: i16, right: i16) {
        self.buffer.push(left);
        self.buffer.push(right);
        if self.buffer.len() < FRAMES_PER_BUFFER * 2 {
            return;
        }
        let full = std::mem::replace(&mut self.buffer, Vec::with_capacity(FRAMES_PER_BUFFER * 2));
        // 沒人取用時丟棄，不阻塞模擬
        if let Err(TrySendError::Full(_)) = self.sender.try_send(full) {
            log::trace!("音訊佇列已滿，丟棄一個緩衝區");
        }
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Apu {
    fn tick(&mut self, _bus: &mut Bus) {
        self.step += 1;
        if self.step < STEPS_PER_SAMPLE {
            return;
        }
        self.step = 0;
        self.push_frame(0, 0);
    }
}
