// Joypad (按鍵輸入) - JOYP (0xFF00)

use crate::mmu::Mapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Right,
    Left,
    Up,
    Down,
}

impl Button {
    /// (是否為方向鍵, 對應位元)
    fn line(self) -> (bool, u8) {
        match self {
            Button::A => (false, 0x01),
            Button::B => (false, 0x02),
            Button::Select => (false, 0x04),
            Button::Start => (false, 0x08),
            Button::Right => (true, 0x01),
            Button::Left => (true, 0x02),
            Button::Up => (true, 0x04),
            Button::Down => (true, 0x08),
        }
    }
}

#[derive(Debug)]
pub struct Joypad {
    // 0 代表按下
    action_keys: u8,
    direction_keys: u8,
    // Bit 4: 方向鍵, Bit 5: 功能鍵，0 代表選取
    select: u8,
}

impl Joypad {
    pub fn new() -> Self {
        Joypad {
            action_keys: 0x0F,
            direction_keys: 0x0F,
            select: 0x30,
        }
    }

    fn lines(&self) -> u8 {
        let mut keys = 0x0F;
        if self.select & 0x10 == 0 {
            keys &= self.direction_keys;
        }
        if self.select & 0x20 == 0 {
            keys &= self.action_keys;
        }
        keys
    }

    /// 是否有任何輸入線被拉低 (STOP 判斷用)
    pub fn any_line_low(&self) -> bool {
        self.lines() < 0x0F
    }

    /// 更新按鍵狀態，回傳是否出現下降緣 (需要 Joypad 中斷)
    pub fn set_button(&mut self, button: Button, pressed: bool) -> bool {
        let before = self.lines();
        let (direction, bit) = button.line();
        let keys = if direction {
            &mut self.direction_keys
        } else {
            &mut self.action_keys
        };
        if pressed {
            *keys &= !bit;
        } else {
            *keys |= bit;
        }
        before & !self.lines() & 0x0F != 0
    }
}

impl Default for Joypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapping for Joypad {
    fn get(&self, _offset: u16) -> u8 {
        0xC0 | self.select | self.lines()
    }

    fn set(&mut self, _offset: u16, value: u8) {
        self.select = value & 0x30;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unselected_reads_all_released() {
        let mut pad = Joypad::new();
        pad.set_button(Button::A, true);
        assert_eq!(pad.get(0), 0xFF);
        assert!(!pad.any_line_low());
    }

    #[test]
    fn press_on_selected_group_is_falling_edge() {
        let mut pad = Joypad::new();
        pad.set(0, 0x20); // 選方向鍵
        assert!(pad.set_button(Button::Down, true));
        assert_eq!(pad.get(0), 0xE7);
        assert!(pad.any_line_low());
        // 未選取的功能鍵不產生中斷
        assert!(!pad.set_button(Button::Start, true));
        assert!(!pad.set_button(Button::Down, false));
    }
}
