// 時脈排程 - 每個時間量子依固定順序推進各硬體單元，並可依實際時間節流

use std::fmt;
use std::time::{Duration, Instant};

use crate::mmu::Bus;
use crate::ppu::DOTS_PER_FRAME;

/// 一般速度下每秒的時間量子數 (4.194304 MHz)
pub const QUANTA_PER_SECOND: u64 = 4_194_304;
/// 節流以多少量子為一個區塊
pub const PACING_BLOCK: u32 = 4096;
/// 落後太多時不再追趕
const MAX_LAG_SECONDS: f64 = 0.1;
const MIN_SLEEP_SECONDS: f64 = 0.001;

/// 可被排程器推進的硬體單元
pub trait Component: fmt::Debug {
    /// 這個量子沒有可觀察的效果時回傳真，排程器就不呼叫 tick
    fn skip(&self, _bus: &Bus) -> bool {
        false
    }

    fn tick(&mut self, bus: &mut Bus);
}

/// 一個量子內依序推進的單元
#[derive(Debug)]
pub struct Units<'a> {
    pub cpu: &'a mut dyn Component,
    pub dma: &'a mut dyn Component,
    pub ppu: &'a mut dyn Component,
    pub audio: &'a mut dyn Component,
}

fn resume(unit: &mut dyn Component, bus: &mut Bus) {
    if !unit.skip(bus) {
        unit.tick(bus);
    }
}

/// 每個區塊比較預期與實際經過的時間，累積的誤差超過 1ms 才睡
#[derive(Debug)]
struct Pacer {
    enabled: bool,
    block_start: Instant,
    quanta: u32,
    /// 秒；正值代表模擬跑在實際時間前面
    reserve: f64,
}

impl Pacer {
    fn new(enabled: bool) -> Self {
        Pacer {
            enabled,
            block_start: Instant::now(),
            quanta: 0,
            reserve: 0.0,
        }
    }

    fn quantum(&mut self, double_speed: bool) {
        if !self.enabled {
            return;
        }
        self.quanta += 1;
        if self.quanta < PACING_BLOCK {
            return;
        }
        self.quanta = 0;

        let rate = QUANTA_PER_SECOND * if double_speed { 2 } else { 1 };
        let expected = PACING_BLOCK as f64 / rate as f64;
        let now = Instant::now();
        let measured = now.duration_since(self.block_start).as_secs_f64();
        self.reserve += expected - measured;
        self.block_start = now;

        if self.reserve >= MIN_SLEEP_SECONDS {
            std::thread::sleep(Duration::from_secs_f64(self.reserve));
            let slept = now.elapsed().as_secs_f64();
            self.reserve -= slept;
            self.block_start = Instant::now();
        } else if self.reserve < -MAX_LAG_SECONDS {
            log::trace!("落後實際時間 {:.1} ms，放棄追趕", -self.reserve * 1000.0);
            self.reserve = -MAX_LAG_SECONDS;
        }
    }
}

#[derive(Debug)]
pub struct Scheduler {
    sequence: u16,
    quanta: u64,
    pacer: Pacer,
}

impl Scheduler {
    pub fn new(pacing: bool) -> Self {
        Scheduler {
            sequence: 0,
            quanta: 0,
            pacer: Pacer::new(pacing),
        }
    }

    /// 一個畫面的量子數；倍速模式下 PPU 隔一個量子才走一點
    pub fn frame_quanta(double_speed: bool) -> u32 {
        if double_speed {
            DOTS_PER_FRAME * 2
        } else {
            DOTS_PER_FRAME
        }
    }

    pub fn quanta(&self) -> u64 {
        self.quanta
    }

    /// 推進一個時間量子：CPU、OAM DMA、PPU、APU，最後是匯流排上的計時周邊
    pub fn advance(&mut self, bus: &mut Bus, units: Units<'_>) {
        let seq = self.sequence;
        let double_speed = bus.system.double_speed;

        if seq & 3 == 0 {
            if !bus.system.stopped {
                resume(units.cpu, bus);
                resume(units.dma, bus);
            } else if bus.joypad.any_line_low() {
                log::debug!("按鍵離開 STOP 模式");
                bus.system.stopped = false;
            }
        }
        if !double_speed || seq & 1 == 0 {
            resume(units.ppu, bus);
        }
        let audio_mask = if double_speed { 3 } else { 1 };
        if seq & audio_mask == 0 {
            resume(units.audio, bus);
        }
        bus.update();

        self.sequence = seq.wrapping_add(1);
        self.quanta += 1;
        self.pacer.quantum(double_speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::Cartridge;
    use crate::config::Console;
    use crate::joypad::Button;

    #[derive(Debug, Default)]
    struct Counter {
        ticks: u32,
        idle: bool,
    }

    impl Component for Counter {
        fn skip(&self, _bus: &Bus) -> bool {
            self.idle
        }

        fn tick(&mut self, _bus: &mut Bus) {
            self.ticks += 1;
        }
    }

    #[derive(Debug, Default)]
    struct Machine {
        cpu: Counter,
        dma: Counter,
        ppu: Counter,
        audio: Counter,
    }

    impl Machine {
        fn run(&mut self, scheduler: &mut Scheduler, bus: &mut Bus, quanta: u32) {
            for _ in 0..quanta {
                scheduler.advance(
                    bus,
                    Units {
                        cpu: &mut self.cpu,
                        dma: &mut self.dma,
                        ppu: &mut self.ppu,
                        audio: &mut self.audio,
                    },
                );
            }
        }
    }

    fn bus(console: Console) -> Bus {
        let cartridge = Cartridge::new(vec![0u8; 0x8000]).unwrap();
        Bus::new(console, cartridge, None).unwrap()
    }

    #[test]
    fn normal_speed_ratios() {
        let mut bus = bus(Console::Dmg);
        let mut scheduler = Scheduler::new(false);
        let mut machine = Machine::default();
        machine.run(&mut scheduler, &mut bus, 400);
        assert_eq!(machine.cpu.ticks, 100);
        assert_eq!(machine.dma.ticks, 100);
        assert_eq!(machine.ppu.ticks, 400);
        assert_eq!(machine.audio.ticks, 200);
        assert_eq!(scheduler.quanta(), 400);
    }

    #[test]
    fn double_speed_ratios() {
        let mut bus = bus(Console::Cgb);
        bus.system.double_speed = true;
        let mut scheduler = Scheduler::new(false);
        let mut machine = Machine::default();
        machine.run(&mut scheduler, &mut bus, 400);
        assert_eq!(machine.cpu.ticks, 100);
        assert_eq!(machine.ppu.ticks, 200);
        assert_eq!(machine.audio.ticks, 100);
        assert_eq!(Scheduler::frame_quanta(true), 140448);
    }

    #[test]
    fn skipped_units_are_not_ticked() {
        let mut bus = bus(Console::Dmg);
        let mut scheduler = Scheduler::new(false);
        let mut machine = Machine::default();
        machine.dma.idle = true;
        machine.run(&mut scheduler, &mut bus, 16);
        assert_eq!(machine.cpu.ticks, 4);
        assert_eq!(machine.dma.ticks, 0);
    }

    #[test]
    fn stop_mode_freezes_cpu_until_button() {
        let mut bus = bus(Console::Dmg);
        let mut scheduler = Scheduler::new(false);
        let mut machine = Machine::default();
        bus.system.stopped = true;
        bus.write(0xFF00, 0x20); // 選方向鍵
        machine.run(&mut scheduler, &mut bus, 64);
        assert_eq!(machine.cpu.ticks, 0);
        assert_eq!(machine.ppu.ticks, 64);

        bus.set_button(Button::Down, true);
        machine.run(&mut scheduler, &mut bus, 4);
        assert!(!bus.system.stopped);
        assert_eq!(machine.cpu.ticks, 0);
        machine.run(&mut scheduler, &mut bus, 4);
        assert_eq!(machine.cpu.ticks, 1);
    }

    #[test]
    fn peripherals_tick_every_quantum() {
        let mut bus = bus(Console::Dmg);
        let mut scheduler = Scheduler::new(false);
        let mut machine = Machine::default();
        bus.write(0xFF04, 0);
        machine.run(&mut scheduler, &mut bus, 256);
        assert_eq!(bus.read(0xFF04), 1);
    }

    #[test]
    fn pacing_slows_to_real_time() {
        let mut bus = bus(Console::Dmg);
        let mut scheduler = Scheduler::new(true);
        let mut machine = Machine::default();
        let start = Instant::now();
        machine.run(&mut scheduler, &mut bus, PACING_BLOCK * 2);
        // 兩個區塊約 1.95ms
        assert!(start.elapsed() >= Duration::from_millis(1));
    }
}
