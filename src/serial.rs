// 序列埠 - SB (0xFF01) / SC (0xFF02)，沒有連線對象，移入的位元全為 1

use crate::interrupts::{Interrupt, Interrupts};
use crate::mmu::Mapping;

/// 內部時脈 8192 Hz，一個位元 512 個量子
const QUANTA_PER_BIT: u32 = 512;
/// CGB 高速時脈 (SC bit 1)
const QUANTA_PER_BIT_FAST: u32 = 16;
/// 保留的輸出上限，超過時丟掉最舊的部分
pub const OUTPUT_LIMIT: usize = 64 * 1024;

#[derive(Debug)]
pub struct Serial {
    data: u8,
    control: u8,
    cgb: bool,
    bits_left: u8,
    countdown: u32,
    /// 傳送出去的可見字元 (測試 ROM 用)
    output: String,
}

impl Serial {
    pub fn new(cgb: bool) -> Self {
        Serial {
            data: 0,
            control: 0,
            cgb,
            bits_left: 0,
            countdown: 0,
            output: String::new(),
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// 取出目前累積的輸出並清空
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    fn bit_period(&self) -> u32 {
        if self.cgb && self.control & 0x02 != 0 {
            QUANTA_PER_BIT_FAST
        } else {
            QUANTA_PER_BIT
        }
    }

    fn capture(&mut self, byte: u8) {
        if (0x20..0x7F).contains(&byte) {
            self.output.push(byte as char);
        } else if byte == 0x0A {
            self.output.push('\n');
        } else {
            return;
        }
        // 只收 ASCII，可以直接以位元組切
        if self.output.len() > OUTPUT_LIMIT {
            let excess = self.output.len() - OUTPUT_LIMIT;
            self.output.drain(..excess);
        }
    }

    pub fn tick(&mut self, interrupts: &mut Interrupts) {
        if self.bits_left == 0 {
            return;
        }
        self.countdown -= 1;
        if self.countdown > 0 {
            return;
        }
        self.data = (self.data << 1) | 0x01;
        self.bits_left -= 1;
        if self.bits_left == 0 {
            // 傳輸完成：清除 bit 7 並觸發 Serial 中斷
            self.control &= 0x7F;
            interrupts.request(Interrupt::Serial);
        } else {
            self.countdown = self.bit_period();
        }
    }
}

impl Mapping for Serial {
    fn get(&self, offset: u16) -> u8 {
        match offset {
            0 => self.data,
            _ if self.cgb => self.control | 0x7C,
            _ => self.control | 0x7E,
        }
    }

    fn set(&mut self, offset: u16, value: u8) {
        if offset == 0 {
            self.data = value;
            return;
        }
        self.control = value;
        // 只有內部時脈能自己完成傳輸
        if value & 0x81 == 0x81 {
            self.capture(self.data);
            self.bits_left = 8;
            self.countdown = self.bit_period();
        } else {
            self.bits_left = 0;
        }
    }
}
