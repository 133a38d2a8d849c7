// 中斷控制 - IF (0xFF0F) 與 IE (0xFFFF)

/// 五條中斷線，數字越小優先級越高
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank = 0,
    LcdStat = 1,
    Timer = 2,
    Serial = 3,
    Joypad = 4,
}

impl Interrupt {
    pub const ALL: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::LcdStat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    pub fn mask(self) -> u8 {
        1 << (self as u8)
    }

    pub fn vector(self) -> u16 {
        0x0040 + 8 * (self as u16)
    }
}

#[derive(Debug)]
pub struct Interrupts {
    pub flags: u8,  // 0xFF0F - 請求位元
    pub enable: u8, // 0xFFFF - 啟用位元 (高 3 位元照存)
}

impl Interrupts {
    pub fn new() -> Self {
        Interrupts {
            flags: 0x01,
            enable: 0x00,
        }
    }

    pub fn request(&mut self, interrupt: Interrupt) {
        self.flags |= interrupt.mask();
    }

    pub fn acknowledge(&mut self, interrupt: Interrupt) {
        self.flags &= !interrupt.mask();
    }

    /// 同時啟用且請求的最高優先級中斷
    pub fn pending(&self) -> Option<Interrupt> {
        let active = self.enable & self.flags & 0x1F;
        if active == 0 {
            return None;
        }
        Interrupt::ALL
            .into_iter()
            .find(|interrupt| active & interrupt.mask() != 0)
    }

    pub fn read_flags(&self) -> u8 {
        self.flags | 0xE0
    }

    pub fn write_flags(&mut self, value: u8) {
        self.flags = value & 0x1F;
    }

    pub fn read_enable(&self) -> u8 {
        self.enable
    }

    pub fn write_enable(&mut self, value: u8) {
        self.enable = value;
    }
}

impl Default for Interrupts {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_line_wins() {
        let mut irq = Interrupts::new();
        irq.write_flags(0);
        irq.write_enable(0x1F);
        irq.request(Interrupt::Joypad);
        irq.request(Interrupt::Timer);
        irq.request(Interrupt::LcdStat);
        assert_eq!(irq.pending(), Some(Interrupt::LcdStat));
        irq.acknowledge(Interrupt::LcdStat);
        assert_eq!(irq.pending(), Some(Interrupt::Timer));
    }

    #[test]
    fn request_without_enable_is_not_pending() {
        let mut irq = Interrupts::new();
        irq.write_flags(0x1F);
        irq.write_enable(0);
        assert_eq!(irq.pending(), None);
    }

    #[test]
    fn flag_register_upper_bits_read_set() {
        let mut irq = Interrupts::new();
        irq.write_flags(0x00);
        assert_eq!(irq.read_flags(), 0xE0);
        irq.write_flags(0xFF);
        assert_eq!(irq.read_flags(), 0xFF);
    }

    #[test]
    fn vectors() {
        assert_eq!(Interrupt::VBlank.vector(), 0x40);
        assert_eq!(Interrupt::LcdStat.vector(), 0x48);
        assert_eq!(Interrupt::Timer.vector(), 0x50);
        assert_eq!(Interrupt::Serial.vector(), 0x58);
        assert_eq!(Interrupt::Joypad.vector(), 0x60);
    }
}
