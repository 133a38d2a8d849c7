// MBC3 - 7 位元 ROM bank、4 個 RAM bank，部分型號帶即時時鐘 (RTC)

use std::time::{SystemTime, UNIX_EPOCH};

use super::{BankController, bank_offset};
use crate::mmu::EnableState;

/// 一般速度下每秒的時間量子數
const QUANTA_PER_SECOND: u32 = 4_194_304;
const RTC_SAVE_LEN: usize = 5 * 4 + 8;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ClockTime {
    seconds: u8,
    minutes: u8,
    hours: u8,
    days: u16,
    halted: bool,
    carry: bool,
}

impl ClockTime {
    fn register(&self, select: u8) -> u8 {
        match select {
            0x08 => self.seconds,
            0x09 => self.minutes,
            0x0A => self.hours,
            0x0B => self.days as u8,
            _ => {
                ((self.days >> 8) as u8 & 0x01)
                    | if self.halted { 0x40 } else { 0 }
                    | if self.carry { 0x80 } else { 0 }
            }
        }
    }

    fn set_register(&mut self, select: u8, value: u8) {
        match select {
            0x08 => self.seconds = value & 0x3F,
            0x09 => self.minutes = value & 0x3F,
            0x0A => self.hours = value & 0x1F,
            0x0B => self.days = (self.days & 0x100) | value as u16,
            _ => {
                self.days = (self.days & 0xFF) | ((value as u16 & 0x01) << 8);
                self.halted = value & 0x40 != 0;
                self.carry = value & 0x80 != 0;
            }
        }
    }

    fn advance_second(&mut self) {
        self.seconds = (self.seconds + 1) & 0x3F;
        if self.seconds != 60 {
            return;
        }
        self.seconds = 0;
        self.minutes = (self.minutes + 1) & 0x3F;
        if self.minutes != 60 {
            return;
        }
        self.minutes = 0;
        self.hours = (self.hours + 1) & 0x1F;
        if self.hours != 24 {
            return;
        }
        self.hours = 0;
        self.days += 1;
        if self.days > 0x1FF {
            self.days = 0;
            self.carry = true;
        }
    }

    /// 讀檔時補上離線經過的秒數
    fn fast_forward(&mut self, elapsed: u64) {
        if self.halted || elapsed == 0 {
            return;
        }
        let seconds = self.seconds.min(59) as u64;
        let minutes = self.minutes.min(59) as u64;
        let hours = self.hours.min(23) as u64;
        let total = self.days as u64 * 86_400 + hours * 3_600 + minutes * 60 + seconds + elapsed;

        self.seconds = (total % 60) as u8;
        self.minutes = (total / 60 % 60) as u8;
        self.hours = (total / 3_600 % 24) as u8;
        let days = total / 86_400;
        if days > 0x1FF {
            self.carry = true;
        }
        self.days = (days & 0x1FF) as u16;
    }
}

#[derive(Debug)]
pub struct Mbc3 {
    rom: Vec<u8>,
    ram: Vec<u8>,
    ram_state: EnableState,
    rom_bank: u8,
    ram_select: u8, // 0x00-0x03 RAM bank，0x08-0x0C RTC 暫存器
    has_rtc: bool,
    live: ClockTime,
    latched: ClockTime,
    latch_armed: bool,
    subsecond: u32,
}

impl Mbc3 {
    pub fn new(rom: Vec<u8>, ram_bytes: usize, has_rtc: bool) -> Self {
        Mbc3 {
            rom,
            ram: vec![0xFF; ram_bytes],
            ram_state: EnableState::Disabled,
            rom_bank: 1,
            ram_select: 0,
            has_rtc,
            live: ClockTime::default(),
            latched: ClockTime::default(),
            latch_armed: false,
            subsecond: 0,
        }
    }

    fn rtc_selected(&self) -> bool {
        self.has_rtc && (0x08..=0x0C).contains(&self.ram_select)
    }

    fn ram_address(&self, offset: u16) -> Option<usize> {
        if self.ram_state == EnableState::Disabled || self.ram.is_empty() || self.ram_select > 0x03
        {
            return None;
        }
        Some(bank_offset(self.ram_select as usize, 0x2000, offset) % self.ram.len())
    }
}

impl BankController for Mbc3 {
    fn read_rom(&self, offset: u16) -> u8 {
        let bank = if offset < 0x4000 { 0 } else { self.rom_bank as usize };
        let address = bank_offset(bank, 0x4000, offset & 0x3FFF);
        self.rom[address % self.rom.len()]
    }

    fn write_control(&mut self, offset: u16, value: u8) {
        match offset {
            0x0000..=0x1FFF => {
                self.ram_state = if (value & 0x0F) == 0x0A {
                    EnableState::Enabled
                } else {
                    EnableState::Disabled
                };
            }
            0x2000..=0x3FFF => self.rom_bank = (value & 0x7F).max(1),
            0x4000..=0x5FFF => self.ram_select = value & 0x0F,
            _ => {
                // 寫入 0 再寫 1 才鎖存
                if self.latch_armed && value == 0x01 {
                    self.latched = self.live;
                }
                self.latch_armed = value == 0x00;
            }
        }
    }

    fn read_ram(&self, offset: u16) -> u8 {
        if self.rtc_selected() {
            if self.ram_state == EnableState::Disabled {
                return 0xFF;
            }
            return self.latched.register(self.ram_select);
        }
        self.ram_address(offset).map_or(0xFF, |address| self.ram[address])
    }

    fn write_ram(&mut self, offset: u16, value: u8) -> bool {
        if self.rtc_selected() {
            if self.ram_state == EnableState::Disabled {
                return false;
            }
            // 只改運行中的時鐘，鎖存值等下次鎖存才更新
            if self.ram_select == 0x08 {
                self.subsecond = 0;
            }
            self.live.set_register(self.ram_select, value);
            return true;
        }
        match self.ram_address(offset) {
            Some(address) => {
                self.ram[address] = value;
                true
            }
            None => false,
        }
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }

    fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    fn tick(&mut self, double_speed: bool) {
        if !self.has_rtc || self.live.halted {
            return;
        }
        let per_second = if double_speed {
            QUANTA_PER_SECOND * 2
        } else {
            QUANTA_PER_SECOND
        };
        self.subsecond += 1;
        if self.subsecond >= per_second {
            self.subsecond = 0;
            self.live.advance_second();
        }
    }

    fn save_extra(&self) -> Vec<u8> {
        if !self.has_rtc {
            return Vec::new();
        }
        let mut data = Vec::with_capacity(RTC_SAVE_LEN);
        for select in 0x08..=0x0C {
            data.extend_from_slice(&(self.live.register(select) as u32).to_le_bytes());
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        data.extend_from_slice(&now.to_le_bytes());
        data
    }

    fn load_extra(&mut self, data: &[u8]) {
        if !self.has_rtc {
            return;
        }
        if data.len() < RTC_SAVE_LEN {
            log::warn!("存檔缺少 RTC 資料 ({} bytes)，時鐘從零開始", data.len());
            return;
        }
        for (index, select) in (0x08..=0x0C).enumerate() {
            let word = &data[index * 4..index * 4 + 4];
            let value = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            self.live.set_register(select, value as u8);
        }
        let mut stamp = [0u8; 8];
        stamp.copy_from_slice(&data[20..28]);
        let saved_at = u64::from_le_bytes(stamp);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(saved_at);
        self.live.fast_forward(now.saturating_sub(saved_at));
        self.latched = self.live;
        log::info!(
            "RTC 還原 {} 天 {:02}:{:02}:{:02}",
            self.live.days,
            self.live.hours,
            self.live.minutes,
            self.live.seconds
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rtc_cart() -> Mbc3 {
        let mut mbc = Mbc3::new(vec![0; 0x8000], 0x2000, true);
        mbc.write_control(0x0000, 0x0A);
        mbc
    }

    fn latch(mbc: &mut Mbc3) {
        mbc.write_control(0x6000, 0x00);
        mbc.write_control(0x6000, 0x01);
    }

    #[test]
    fn latch_needs_zero_then_one() {
        let mut mbc = rtc_cart();
        mbc.write_control(0x4000, 0x08);
        mbc.write_ram(0, 42);
        // 寫入只影響運行中的時鐘
        assert_eq!(mbc.read_ram(0), 0);
        mbc.write_control(0x6000, 0x01);
        assert_eq!(mbc.read_ram(0), 0);
        latch(&mut mbc);
        assert_eq!(mbc.read_ram(0), 42);
    }

    #[test]
    fn seconds_roll_into_minutes() {
        let mut mbc = rtc_cart();
        mbc.write_control(0x4000, 0x08);
        mbc.write_ram(0, 59);
        for _ in 0..QUANTA_PER_SECOND {
            mbc.tick(false);
        }
        latch(&mut mbc);
        assert_eq!(mbc.read_ram(0), 0);
        mbc.write_control(0x4000, 0x09);
        assert_eq!(mbc.read_ram(0), 1);
    }

    #[test]
    fn halted_clock_does_not_advance() {
        let mut mbc = rtc_cart();
        mbc.write_control(0x4000, 0x0C);
        mbc.write_ram(0, 0x40);
        for _ in 0..QUANTA_PER_SECOND {
            mbc.tick(false);
        }
        latch(&mut mbc);
        mbc.write_control(0x4000, 0x08);
        assert_eq!(mbc.read_ram(0), 0);
    }

    #[test]
    fn day_counter_overflow_sets_carry() {
        let mut time = ClockTime {
            days: 0x1FF,
            hours: 23,
            minutes: 59,
            seconds: 59,
            ..ClockTime::default()
        };
        time.advance_second();
        assert_eq!(time.days, 0);
        assert!(time.carry);
    }

    #[test]
    fn save_footer_round_trips_and_fast_forwards() {
        let mut mbc = rtc_cart();
        mbc.write_control(0x4000, 0x0A);
        mbc.write_ram(0, 5);
        let mut extra = mbc.save_extra();
        assert_eq!(extra.len(), RTC_SAVE_LEN);
        // 假裝存檔是 90 秒前寫的
        let mut stamp = [0u8; 8];
        stamp.copy_from_slice(&extra[20..28]);
        let earlier = u64::from_le_bytes(stamp) - 90;
        extra[20..28].copy_from_slice(&earlier.to_le_bytes());

        let mut restored = Mbc3::new(vec![0; 0x8000], 0x2000, true);
        restored.load_extra(&extra);
        assert_eq!(restored.live.hours, 5);
        assert_eq!(restored.live.minutes, 1);
        assert!(restored.live.seconds >= 30);
    }
}
