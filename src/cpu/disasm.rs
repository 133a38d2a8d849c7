// 反組譯 - 以內嵌的 opcodes.json 描述指令格式與時序

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::mmu::Bus;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Operand {
    pub name: String,
    #[serde(default)]
    pub bytes: Option<u8>,
    #[serde(default)]
    pub immediate: Option<bool>,
    #[serde(default)]
    pub increment: Option<bool>,
    #[serde(default)]
    pub decrement: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "UPPERCASE")]
pub struct Flags {
    pub z: String,
    pub n: String,
    pub h: String,
    pub c: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Opcode {
    pub mnemonic: String,
    pub bytes: u8,
    /// T-cycle；條件指令為 [成立, 不成立]
    pub cycles: Vec<u8>,
    pub operands: Vec<Operand>,
    #[serde(default)]
    pub immediate: bool,
    pub flags: Flags,
}

#[derive(Debug, Default)]
pub struct Opcodes {
    pub unprefixed: Vec<Option<Opcode>>,
    pub cbprefixed: Vec<Option<Opcode>>,
}

impl Opcodes {
    pub fn parse(json: &str) -> crate::error::Result<Self> {
        #[derive(Deserialize)]
        struct RawOpcodes {
            unprefixed: HashMap<String, Opcode>,
            cbprefixed: HashMap<String, Opcode>,
        }

        let raw: RawOpcodes = serde_json::from_str(json)?;
        Ok(Opcodes {
            unprefixed: index_table(raw.unprefixed),
            cbprefixed: index_table(raw.cbprefixed),
        })
    }

    pub fn lookup(&self, prefixed: bool, code: u8) -> Option<&Opcode> {
        let table = if prefixed {
            &self.cbprefixed
        } else {
            &self.unprefixed
        };
        table.get(code as usize)?.as_ref()
    }
}

fn index_table(raw: HashMap<String, Opcode>) -> Vec<Option<Opcode>> {
    let mut table: Vec<Option<Opcode>> = vec![None; 256];
    for (key, opcode) in raw {
        match u8::from_str_radix(key.trim_start_matches("0x"), 16) {
            Ok(code) => table[code as usize] = Some(opcode),
            Err(_) => log::warn!("操作碼表中無效的鍵 {key}"),
        }
    }
    table
}

pub static OPCODES: LazyLock<Opcodes> = LazyLock::new(|| {
    Opcodes::parse(include_str!("opcodes.json")).unwrap_or_else(|err| {
        log::error!("{err}");
        Opcodes::default()
    })
});

/// 反組譯 address 處的一條指令，回傳 (文字, 長度)
pub fn disassemble(bus: &Bus, address: u16) -> (String, u16) {
    let code = bus.read(address);
    let (prefixed, code, operand_start) = if code == 0xCB {
        (true, bus.read(address.wrapping_add(1)), address.wrapping_add(2))
    } else {
        (false, code, address.wrapping_add(1))
    };
    let Some(opcode) = OPCODES.lookup(prefixed, code) else {
        return (format!("DB ${code:02X}"), 1);
    };

    let relative = opcode.mnemonic == "JR";
    let mut operands = Vec::with_capacity(opcode.operands.len());
    let mut sp_offset = false;
    for operand in &opcode.operands {
        match operand.name.as_str() {
            // LD HL,SP+e8 的 e8 已併入 SP
            "e8" if sp_offset => {}
            "SP" if operand.increment == Some(true) => {
                sp_offset = true;
                operands.push(format!("SP{:+}", bus.read(operand_start) as i8));
            }
            _ => operands.push(format_operand(bus, operand, operand_start, address, relative)),
        }
    }

    let text = if operands.is_empty() {
        opcode.mnemonic.clone()
    } else {
        format!("{} {}", opcode.mnemonic, operands.join(", "))
    };
    (text, opcode.bytes as u16)
}

fn format_operand(bus: &Bus, operand: &Operand, at: u16, address: u16, relative: bool) -> String {
    let value = match operand.name.as_str() {
        "n8" => format!("${:02X}", bus.read(at)),
        "a8" => format!("$FF{:02X}", bus.read(at)),
        "n16" | "a16" => format!("${:04X}", bus.read_word(at)),
        "e8" if relative => {
            // 相對跳躍直接顯示目標位址
            let offset = bus.read(at) as i8;
            format!("${:04X}", address.wrapping_add(2).wrapping_add(offset as u16))
        }
        "e8" => format!("{:+}", bus.read(at) as i8),
        "C" if operand.immediate == Some(false) => "$FF00+C".to_string(),
        name => name.to_string(),
    };
    let value = if operand.increment == Some(true) {
        format!("{value}+")
    } else if operand.decrement == Some(true) {
        format!("{value}-")
    } else {
        value
    };
    if operand.immediate == Some(false) {
        format!("[{value}]")
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_complete() {
        for code in 0..=255u8 {
            assert!(OPCODES.lookup(false, code).is_some(), "{code:02X}");
            assert!(OPCODES.lookup(true, code).is_some(), "CB {code:02X}");
        }
        let ld = OPCODES.lookup(false, 0x01).unwrap();
        assert_eq!(ld.mnemonic, "LD");
        assert_eq!(ld.bytes, 3);
        assert_eq!(ld.cycles, vec![12]);
    }

    #[test]
    fn timing_entries_for_conditionals() {
        assert_eq!(OPCODES.lookup(false, 0xC4).unwrap().cycles, vec![24, 12]);
        assert_eq!(OPCODES.lookup(false, 0x20).unwrap().cycles, vec![12, 8]);
        assert_eq!(OPCODES.lookup(true, 0x46).unwrap().cycles, vec![12]);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(Opcodes::parse("{").is_err());
    }
}
