//! 物件 (精靈) 屬性與每行的 OAM 掃描結果

use super::video::VideoMemory;

/// 一行最多顯示的物件數
pub const MAX_OBJECTS_PER_LINE: usize = 10;
/// OAM 中的物件數
pub const OBJECT_COUNT: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectFlags(u8);

impl ObjectFlags {
    pub fn new(value: u8) -> Self {
        ObjectFlags(value)
    }
    /// 在背景色 1-3 之後
    pub fn behind_background(&self) -> bool {
        (self.0 & 0x80) != 0
    }
    pub fn y_flip(&self) -> bool {
        (self.0 & 0x40) != 0
    }
    pub fn x_flip(&self) -> bool {
        (self.0 & 0x20) != 0
    }
    /// DMG: OBP0 / OBP1
    pub fn dmg_palette(&self) -> u8 {
        (self.0 >> 4) & 0x01
    }
    pub fn cgb_bank(&self) -> u8 {
        (self.0 >> 3) & 0x01
    }
    pub fn cgb_palette(&self) -> u8 {
        self.0 & 0x07
    }
}

/// OAM 掃描選中的物件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Object {
    pub index: u8,
    /// OAM 原始座標 (螢幕位置 + 16 / + 8)
    pub y: u8,
    pub x: u8,
    pub fetched: bool,
}

impl Object {
    /// 檢查 OAM 第 index 個物件是否落在 ly 這一行
    pub fn scan(video: &VideoMemory, index: usize, ly: u8, height: u8) -> Option<Object> {
        let y = video.oam_byte(index * 4);
        let x = video.oam_byte(index * 4 + 1);
        let top = y as i16 - 16;
        let line = ly as i16;
        (line >= top && line < top + height as i16).then_some(Object {
            index: index as u8,
            y,
            x,
            fetched: false,
        })
    }

    pub fn tile(&self, video: &VideoMemory) -> u8 {
        video.oam_byte(self.index as usize * 4 + 2)
    }

    pub fn flags(&self, video: &VideoMemory) -> ObjectFlags {
        ObjectFlags::new(video.oam_byte(self.index as usize * 4 + 3))
    }
}
