// 算術邏輯單元 - 純函式，回傳 (結果, 新旗標)

use super::registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z};

fn z(value: u8) -> u8 {
    if value == 0 { FLAG_Z } else { 0 }
}

fn bit(condition: bool, mask: u8) -> u8 {
    if condition { mask } else { 0 }
}

pub fn add(a: u8, value: u8, carry_in: bool) -> (u8, u8) {
    let c = carry_in as u16;
    let sum = a as u16 + value as u16 + c;
    let result = sum as u8;
    let half = (a & 0x0F) as u16 + (value & 0x0F) as u16 + c > 0x0F;
    (result, z(result) | bit(half, FLAG_H) | bit(sum > 0xFF, FLAG_C))
}

pub fn sub(a: u8, value: u8, carry_in: bool) -> (u8, u8) {
    let c = carry_in as u16;
    let result = (a as u16).wrapping_sub(value as u16).wrapping_sub(c) as u8;
    let half = ((a & 0x0F) as u16) < (value & 0x0F) as u16 + c;
    let carry = (a as u16) < value as u16 + c;
    (result, z(result) | FLAG_N | bit(half, FLAG_H) | bit(carry, FLAG_C))
}

pub fn and(a: u8, value: u8) -> (u8, u8) {
    let result = a & value;
    (result, z(result) | FLAG_H)
}

pub fn xor(a: u8, value: u8) -> (u8, u8) {
    let result = a ^ value;
    (result, z(result))
}

pub fn or(a: u8, value: u8) -> (u8, u8) {
    let result = a | value;
    (result, z(result))
}

/// ALU 指令群 (0x80-0xBF 與 0xC6-0xFE)，op 為 3 位元運算碼；CP 不改 A
pub fn apply(op: u8, a: u8, value: u8, flags: u8) -> (u8, u8) {
    let carry = flags & FLAG_C != 0;
    match op & 0x07 {
        0 => add(a, value, false),
        1 => add(a, value, carry),
        2 => sub(a, value, false),
        3 => sub(a, value, carry),
        4 => and(a, value),
        5 => xor(a, value),
        6 => or(a, value),
        _ => (a, sub(a, value, false).1),
    }
}

/// INC 保留 C 旗標
pub fn inc(value: u8, flags: u8) -> (u8, u8) {
    let result = value.wrapping_add(1);
    let half = (result & 0x0F) < (value & 0x0F);
    (result, z(result) | bit(half, FLAG_H) | (flags & FLAG_C))
}

/// DEC 保留 C 旗標
pub fn dec(value: u8, flags: u8) -> (u8, u8) {
    let result = value.wrapping_sub(1);
    let half = (result & 0x0F) > (value & 0x0F);
    (result, z(result) | FLAG_N | bit(half, FLAG_H) | (flags & FLAG_C))
}

/// ADD HL,rr 保留 Z 旗標
pub fn add16(hl: u16, value: u16, flags: u8) -> (u16, u8) {
    let result = hl.wrapping_add(value);
    let half = (result & 0x0FFF) < (hl & 0x0FFF);
    (
        result,
        (flags & FLAG_Z) | bit(half, FLAG_H) | bit(result < hl, FLAG_C),
    )
}

/// ADD SP,e 與 LD HL,SP+e：旗標由低位元組無號相加決定
pub fn add_sp(sp: u16, offset: u8) -> (u16, u8) {
    let result = sp.wrapping_add(offset as i8 as u16);
    let half = (sp & 0x0F) + (offset as u16 & 0x0F) > 0x0F;
    let carry = (sp & 0xFF) + offset as u16 > 0xFF;
    (result, bit(half, FLAG_H) | bit(carry, FLAG_C))
}

pub fn daa(a: u8, flags: u8) -> (u8, u8) {
    let mut adjust = 0u8;
    let mut carry = flags & FLAG_C != 0;
    let subtract = flags & FLAG_N != 0;
    if flags & FLAG_H != 0 || (!subtract && a & 0x0F > 0x09) {
        adjust |= 0x06;
    }
    if carry || (!subtract && a > 0x99) {
        adjust |= 0x60;
        carry = true;
    }
    let result = if subtract {
        a.wrapping_sub(adjust)
    } else {
        a.wrapping_add(adjust)
    };
    (result, z(result) | (flags & FLAG_N) | bit(carry, FLAG_C))
}

/// CB 前綴的旋轉/位移 (op 為 0-7)，Z 依結果設定
pub fn rotate(op: u8, value: u8, flags: u8) -> (u8, u8) {
    let carry_in = flags & FLAG_C != 0;
    let (result, carry) = match op & 0x07 {
        0 => (value.rotate_left(1), value & 0x80 != 0),
        1 => (value.rotate_right(1), value & 0x01 != 0),
        2 => ((value << 1) | carry_in as u8, value & 0x80 != 0),
        3 => ((value >> 1) | ((carry_in as u8) << 7), value & 0x01 != 0),
        4 => (value << 1, value & 0x80 != 0),
        5 => ((value >> 1) | (value & 0x80), value & 0x01 != 0),
        6 => (value.rotate_left(4), false),
        _ => (value >> 1, value & 0x01 != 0),
    };
    (result, z(result) | bit(carry, FLAG_C))
}

/// RLCA/RRCA/RLA/RRA：和 CB 版本相同但 Z 永遠清除
pub fn rotate_a(op: u8, a: u8, flags: u8) -> (u8, u8) {
    let (result, new_flags) = rotate(op, a, flags);
    (result, new_flags & FLAG_C)
}

/// BIT b,r 保留 C 旗標
pub fn test_bit(index: u8, value: u8, flags: u8) -> u8 {
    z(value & (1 << index)) | FLAG_H | (flags & FLAG_C)
}
