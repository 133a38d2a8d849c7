// Timer (計時器) - DIV/TIMA/TMA/TAC，每個時間量子推進一次內部計數器

use crate::interrupts::{Interrupt, Interrupts};
use crate::mmu::Mapping;

/// TIMA 溢位後延遲幾個量子才重載並觸發中斷
const RELOAD_DELAY: u8 = 4;

#[derive(Debug)]
pub struct Timer {
    counter: u16, // 內部分頻器，高 8 位元即 DIV (0xFF04)
    tima: u8,     // 0xFF05
    tma: u8,      // 0xFF06
    tac: u8,      // 0xFF07，只保留低 3 位元
    reload_in: Option<u8>,
}

impl Timer {
    pub fn new(counter: u16) -> Self {
        Timer {
            counter,
            tima: 0,
            tma: 0,
            tac: 0,
            reload_in: None,
        }
    }

    /// 目前 TAC 選擇的計數器位元，計時器關閉時視為 0
    fn selected_bit(&self) -> bool {
        if self.tac & 0x04 == 0 {
            return false;
        }
        let bit = match self.tac & 0x03 {
            0 => 9, // 4096 Hz
            1 => 3, // 262144 Hz
            2 => 5, // 65536 Hz
            _ => 7, // 16384 Hz
        };
        (self.counter >> bit) & 0x01 != 0
    }

    fn increment_tima(&mut self) {
        let (value, overflow) = self.tima.overflowing_add(1);
        self.tima = value;
        if overflow {
            self.reload_in = Some(RELOAD_DELAY);
        }
    }

    /// 每個時間量子呼叫一次
    pub fn tick(&mut self, interrupts: &mut Interrupts) {
        if let Some(remaining) = self.reload_in {
            if remaining <= 1 {
                self.reload_in = None;
                self.tima = self.tma;
                interrupts.request(Interrupt::Timer);
            } else {
                self.reload_in = Some(remaining - 1);
            }
        }

        let before = self.selected_bit();
        self.counter = self.counter.wrapping_add(1);
        if before && !self.selected_bit() {
            self.increment_tima();
        }
    }

    /// STOP 指令與寫入 DIV 都會把計數器歸零，可能造成一次下降緣
    pub fn reset_divider(&mut self) {
        let before = self.selected_bit();
        self.counter = 0;
        if before {
            self.increment_tima();
        }
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }
}

impl Mapping for Timer {
    fn get(&self, offset: u16) -> u8 {
        match offset {
            0 => (self.counter >> 8) as u8,
            1 => self.tima,
            2 => self.tma,
            _ => self.tac | 0xF8,
        }
    }

    fn set(&mut self, offset: u16, value: u8) {
        match offset {
            0 => self.reset_divider(),
            1 => {
                // 溢位延遲期間寫入 TIMA 會取消重載
                self.reload_in = None;
                self.tima = value;
            }
            2 => self.tma = value,
            _ => {
                let before = self.selected_bit();
                self.tac = value & 0x07;
                if before && !self.selected_bit() {
                    self.increment_tima();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(timer: &mut Timer, irq: &mut Interrupts, quanta: u32) {
        for _ in 0..quanta {
            timer.tick(irq);
        }
    }

    #[test]
    fn div_is_counter_high_byte() {
        let mut timer = Timer::new(0);
        let mut irq = Interrupts::new();
        run(&mut timer, &mut irq, 256 * 3);
        assert_eq!(timer.get(0), 3);
        timer.set(0, 0x55);
        assert_eq!(timer.get(0), 0);
    }

    #[test]
    fn fastest_rate_counts_every_sixteen() {
        let mut timer = Timer::new(0);
        let mut irq = Interrupts::new();
        timer.set(3, 0x05);
        run(&mut timer, &mut irq, 16 * 10);
        assert_eq!(timer.get(1), 10);
    }

    #[test]
    fn overflow_reloads_after_delay() {
        let mut timer = Timer::new(0);
        let mut irq = Interrupts::new();
        irq.write_flags(0);
        timer.set(2, 0xF0);
        timer.set(1, 0xFF);
        timer.set(3, 0x05);
        run(&mut timer, &mut irq, 16);
        assert_eq!(timer.get(1), 0x00);
        assert_eq!(irq.read_flags() & 0x04, 0);
        run(&mut timer, &mut irq, RELOAD_DELAY as u32);
        assert_eq!(timer.get(1), 0xF0);
        assert_ne!(irq.read_flags() & 0x04, 0);
    }

    #[test]
    fn tima_write_cancels_pending_reload() {
        let mut timer = Timer::new(0);
        let mut irq = Interrupts::new();
        irq.write_flags(0);
        timer.set(1, 0xFF);
        timer.set(3, 0x05);
        run(&mut timer, &mut irq, 16);
        timer.set(1, 0x10);
        run(&mut timer, &mut irq, RELOAD_DELAY as u32);
        assert_eq!(timer.get(1), 0x10);
        assert_eq!(irq.read_flags() & 0x04, 0);
    }

    #[test]
    fn div_reset_with_bit_set_ticks_tima() {
        let mut timer = Timer::new(0x0200);
        timer.set(3, 0x04);
        timer.set(0, 0);
        assert_eq!(timer.get(1), 1);
    }

    #[test]
    fn tac_reads_upper_bits_set() {
        let mut timer = Timer::new(0);
        timer.set(3, 0x01);
        assert_eq!(timer.get(3), 0xF9);
    }
}
