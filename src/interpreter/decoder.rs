//! Instruction decoding and disassembly
//!
//! An instruction word packs an opcode in its two low decimal digits and one
//! mode digit per parameter above that:
//!
//! ```text
//!   1002  →  0 1 0 02
//!            │ │ │ └─ opcode 2 (mul)
//!            │ │ └─── mode of parameter 1 (position)
//!            │ └───── mode of parameter 2 (immediate)
//!            └─────── mode of parameter 3 (position, implied)
//! ```
//!
//! [`decode`] never rejects a word. Unknown opcodes are caught at dispatch and
//! unsupported mode digits only fault when the parameter is used.

use crate::memory::{Memory, ParamMode};
use std::fmt;

/// The fixed opcode table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Add,
    Mul,
    Input,
    Output,
    JumpIfTrue,
    JumpIfFalse,
    LessThan,
    Equals,
    AdjustBase,
    Halt,
}

impl Opcode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Opcode::Add),
            2 => Some(Opcode::Mul),
            3 => Some(Opcode::Input),
            4 => Some(Opcode::Output),
            5 => Some(Opcode::JumpIfTrue),
            6 => Some(Opcode::JumpIfFalse),
            7 => Some(Opcode::LessThan),
            8 => Some(Opcode::Equals),
            9 => Some(Opcode::AdjustBase),
            99 => Some(Opcode::Halt),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Opcode::Add => 1,
            Opcode::Mul => 2,
            Opcode::Input => 3,
            Opcode::Output => 4,
            Opcode::JumpIfTrue => 5,
            Opcode::JumpIfFalse => 6,
            Opcode::LessThan => 7,
            Opcode::Equals => 8,
            Opcode::AdjustBase => 9,
            Opcode::Halt => 99,
        }
    }

    /// Number of parameters following the instruction word
    pub fn arity(self) -> usize {
        match self {
            Opcode::Add | Opcode::Mul | Opcode::LessThan | Opcode::Equals => 3,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => 2,
            Opcode::Input | Opcode::Output | Opcode::AdjustBase => 1,
            Opcode::Halt => 0,
        }
    }

    /// Index of the parameter this opcode writes to, if any
    pub fn write_param(self) -> Option<usize> {
        match self {
            Opcode::Add | Opcode::Mul | Opcode::LessThan | Opcode::Equals => Some(2),
            Opcode::Input => Some(0),
            _ => None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Mul => "mul",
            Opcode::Input => "in",
            Opcode::Output => "out",
            Opcode::JumpIfTrue => "jnz",
            Opcode::JumpIfFalse => "jz",
            Opcode::LessThan => "lt",
            Opcode::Equals => "eq",
            Opcode::AdjustBase => "arb",
            Opcode::Halt => "hlt",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Raw opcode (word modulo 100); may not be in the opcode table
    pub opcode: i64,
    /// Mode of parameters 1, 2 and 3, in that order
    pub modes: [ParamMode; 3],
}

impl Instruction {
    pub fn op(&self) -> Option<Opcode> {
        Opcode::from_code(self.opcode)
    }
}

/// Split an instruction word into opcode and parameter modes
pub fn decode(word: i64) -> Instruction {
    let opcode = word % 100;
    let mut rest = (word / 100).unsigned_abs();
    let mut modes = [ParamMode::Position; 3];
    for mode in &mut modes {
        *mode = ParamMode::from_digit((rest % 10) as u8);
        rest /= 10;
    }
    Instruction { opcode, modes }
}

/// One disassembled instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disassembly {
    pub address: usize,
    /// Words covered by this entry (1 for raw data)
    pub width: usize,
    pub text: String,
}

fn format_operand(operand: i64, mode: ParamMode) -> String {
    match mode {
        ParamMode::Position => format!("[{}]", operand),
        ParamMode::Immediate => format!("#{}", operand),
        ParamMode::Relative if operand < 0 => format!("[rb-{}]", operand.unsigned_abs()),
        ParamMode::Relative => format!("[rb+{}]", operand),
        ParamMode::Unsupported(d) => format!("?{}:{}", d, operand),
    }
}

/// Disassemble the instruction starting at `address`
pub fn disassemble(memory: &Memory, address: usize) -> Disassembly {
    let word = memory.load(address);
    let instruction = decode(word);

    let Some(op) = instruction.op() else {
        return Disassembly {
            address,
            width: 1,
            text: format!(".word {}", word),
        };
    };

    let mut operands: Vec<String> = (0..op.arity())
        .map(|i| format_operand(memory.load(address + 1 + i), instruction.modes[i]))
        .collect();

    // Show the destination with an arrow: `add [1], #2 -> [3]`
    let text = match op.write_param() {
        Some(index) if index > 0 => {
            let dest = operands.remove(index);
            format!("{} {} -> {}", op.mnemonic(), operands.join(", "), dest)
        }
        _ if operands.is_empty() => op.mnemonic().to_string(),
        _ => format!("{} {}", op.mnemonic(), operands.join(", ")),
    };

    Disassembly {
        address,
        width: 1 + op.arity(),
        text,
    }
}

/// Words listed on either side of an anchor that lies outside dense memory
pub const LISTING_WINDOW: usize = 32;

/// Linear sweep of `start..end`, re-synchronised at `anchor`
///
/// An instruction that would straddle `anchor` is emitted as raw words so the
/// entry for `anchor` itself always starts on its own line. Returns the
/// address after the last entry.
fn sweep(
    memory: &Memory,
    start: usize,
    end: usize,
    anchor: usize,
    entries: &mut Vec<Disassembly>,
) -> usize {
    let mut address = start;
    while address < end {
        let entry = disassemble(memory, address);
        if address < anchor && address + entry.width > anchor {
            for a in address..anchor {
                entries.push(Disassembly {
                    address: a,
                    width: 1,
                    text: format!(".word {}", memory.load(a)),
                });
            }
            address = anchor;
            continue;
        }
        address += entry.width;
        entries.push(entry);
    }
    address
}

/// Listing of the dense region plus a window around a far `anchor`
///
/// Far sparse words outside the window are listed one per line as raw words,
/// so the listing stays proportional to the words actually stored.
pub fn listing(memory: &Memory, anchor: usize) -> Vec<Disassembly> {
    let dense_end = memory.dense().len();
    let mut entries = Vec::new();
    let swept = sweep(memory, 0, dense_end, anchor, &mut entries);

    let window = if anchor >= dense_end {
        let start = anchor.saturating_sub(LISTING_WINDOW).max(swept);
        let end = anchor.saturating_add(LISTING_WINDOW);
        sweep(memory, start, end, anchor, &mut entries);
        start..end
    } else {
        0..0
    };

    for (address, value) in memory.sparse_entries() {
        if !window.contains(&address) {
            entries.push(Disassembly {
                address,
                width: 1,
                text: format!(".word {}", value),
            });
        }
    }

    entries.sort_by_key(|entry| entry.address);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use ParamMode::*;

    #[test]
    fn test_decode_examples() {
        assert_eq!(
            decode(1002),
            Instruction {
                opcode: 2,
                modes: [Position, Immediate, Position]
            }
        );
        assert_eq!(
            decode(3),
            Instruction {
                opcode: 3,
                modes: [Position, Position, Position]
            }
        );
        assert_eq!(
            decode(11101),
            Instruction {
                opcode: 1,
                modes: [Immediate, Immediate, Immediate]
            }
        );
        assert_eq!(
            decode(21209),
            Instruction {
                opcode: 9,
                modes: [Relative, Immediate, Relative]
            }
        );
    }

    #[test]
    fn test_decode_never_rejects() {
        let instruction = decode(98765);
        assert_eq!(instruction.opcode, 65);
        assert_eq!(instruction.modes, [Unsupported(7), Unsupported(8), Unsupported(9)]);
        assert!(instruction.op().is_none());
    }

    #[test]
    fn test_disassemble() {
        let memory = Memory::new(vec![1101, 2, 3, 5, 204, -4, 99, 42]);
        assert_eq!(disassemble(&memory, 0).text, "add #2, #3 -> [5]");
        assert_eq!(disassemble(&memory, 4).text, "out [rb-4]");
        assert_eq!(disassemble(&memory, 6).text, "hlt");
        assert_eq!(disassemble(&memory, 7).text, ".word 42");
    }

    #[test]
    fn test_listing_resyncs_at_anchor() {
        // Jumping into the middle of the first instruction
        let memory = Memory::new(vec![1, 104, 7, 99, 0]);
        let entries = listing(&memory, 1);
        assert_eq!(entries[0].text, ".word 1");
        assert_eq!(entries[1].address, 1);
        assert_eq!(entries[1].text, "out #7");
        assert_eq!(entries[2].text, "hlt");
    }

    #[test]
    fn test_listing_skips_the_gap_before_far_words() {
        let mut memory = Memory::new(vec![99]);
        memory.store(5_000_000, 1);

        let entries = listing(&memory, 0);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "hlt");
        assert_eq!(entries[1].address, 5_000_000);
        assert_eq!(entries[1].text, ".word 1");
    }

    #[test]
    fn test_listing_windows_a_far_anchor() {
        let mut memory = Memory::new(vec![99]);
        memory.store(5_000_000, 1);

        let entries = listing(&memory, 5_000_000);
        assert!(entries.len() <= 1 + 2 * LISTING_WINDOW);
        assert_eq!(entries[0].text, "hlt");
        let current = entries
            .iter()
            .find(|entry| entry.address == 5_000_000)
            .unwrap();
        assert_eq!(current.text, "add [0], [0] -> [0]");
        assert!(entries.windows(2).all(|pair| pair[0].address < pair[1].address));
    }
}
