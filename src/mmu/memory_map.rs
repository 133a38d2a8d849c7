// 記憶體映射表 - 啟動時登記位址區間，build() 之後以二分搜尋查表

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Range<K> {
    start: u16,
    end: u16, // 包含
    key: K,
}

/// 16 位元位址空間到周邊代號的對應
///
/// 區間在 `build()` 之前登記，之後凍結；查詢回傳周邊代號與相對於區間起點的偏移。
pub struct MemoryMap<K> {
    ranges: Vec<Range<K>>,
    built: bool,
}

impl<K: Copy + fmt::Debug> MemoryMap<K> {
    pub fn new() -> Self {
        MemoryMap {
            ranges: Vec::new(),
            built: false,
        }
    }

    pub fn register(&mut self, start: u16, end: u16, key: K) {
        debug_assert!(!self.built, "memory map already frozen");
        debug_assert!(start <= end, "inverted range {start:04X}-{end:04X}");
        self.ranges.push(Range { start, end, key });
    }

    /// 依起始位址排序並檢查區間互不重疊
    pub fn build(&mut self) -> crate::error::Result<()> {
        self.ranges.sort_by_key(|range| range.start);
        for pair in self.ranges.windows(2) {
            if pair[1].start <= pair[0].end {
                return Err(crate::emulator_bug!(
                    "overlapping ranges {:04X}-{:04X} ({:?}) and {:04X}-{:04X} ({:?})",
                    pair[0].start,
                    pair[0].end,
                    pair[0].key,
                    pair[1].start,
                    pair[1].end,
                    pair[1].key
                ));
            }
        }
        self.built = true;
        Ok(())
    }

    pub fn lookup(&self, address: u16) -> Option<(K, u16)> {
        // 第一個 start > address 的區間之前那一個才可能包含 address
        let index = self.ranges.partition_point(|range| range.start <= address);
        let range = self.ranges.get(index.checked_sub(1)?)?;
        (address <= range.end).then(|| (range.key, address - range.start))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl<K: Copy + fmt::Debug> Default for MemoryMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug> fmt::Debug for MemoryMap<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for range in &self.ranges {
            list.entry(&format_args!(
                "{:04X}-{:04X} {:?}",
                range.start, range.end, range.key
            ));
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_every_address() {
        let ranges = [
            (0x0000u16, 0x7FFFu16, 'r'),
            (0xA000, 0xBFFF, 'x'),
            (0xC000, 0xDFFF, 'w'),
            (0xE000, 0xFDFF, 'w'),
            (0xFF00, 0xFF00, 'j'),
            (0xFF80, 0xFFFE, 'h'),
        ];
        let mut map = MemoryMap::new();
        // 故意打亂登記順序
        for &(start, end, key) in ranges.iter().rev() {
            map.register(start, end, key);
        }
        map.build().unwrap();

        for address in 0..=0xFFFFu16 {
            let expected = ranges
                .iter()
                .find(|(start, end, _)| (*start..=*end).contains(&address))
                .map(|&(start, _, key)| (key, address - start));
            assert_eq!(map.lookup(address), expected, "address {address:04X}");
        }
    }

    #[test]
    fn echo_ranges_share_offsets() {
        let mut map = MemoryMap::new();
        map.register(0xC000, 0xDFFF, 1u8);
        map.register(0xE000, 0xFDFF, 1u8);
        map.build().unwrap();
        assert_eq!(map.lookup(0xC123), Some((1, 0x0123)));
        assert_eq!(map.lookup(0xE123), Some((1, 0x0123)));
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        let mut map = MemoryMap::new();
        map.register(0x0000, 0x00FF, 0u8);
        map.register(0x0080, 0x0180, 1u8);
        assert!(map.build().is_err());
    }

    #[test]
    fn empty_map_has_no_owner() {
        let mut map: MemoryMap<u8> = MemoryMap::new();
        map.build().unwrap();
        assert!(map.is_empty());
        assert_eq!(map.lookup(0x1234), None);
    }
}
