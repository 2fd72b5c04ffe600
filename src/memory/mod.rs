//! Memory model for the integer machine
//!
//! A [`Memory`] is a logically infinite array of `i64` words. Every address at
//! or beyond the loaded image reads as zero and may be written.
//!
//! # Layout
//!
//! Words live in two places:
//! - a dense vector holding the loaded image plus any growth that stays close
//!   to its end (within [`DENSE_GROWTH_WINDOW`] words)
//! - a sparse map for writes far past the end, so a single store to a huge
//!   address does not materialise the gap
//!
//! When the dense region grows over an address previously held in the sparse
//! map, that word migrates into the vector.
//!
//! # Addressing Modes
//!
//! Parameters are resolved through a [`ParamMode`]:
//! ```text
//! position   operand           → memory[operand]
//! immediate  operand           → operand (never writable)
//! relative   operand + base    → memory[base + operand]
//! ```

use rustc_hash::FxHashMap;
use std::fmt;
use thiserror::Error;

/// Largest gap past the dense region that is filled in rather than stored sparsely
pub const DENSE_GROWTH_WINDOW: usize = 1 << 16;

/// Interpretation rule for a single instruction parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamMode {
    Position,
    Immediate,
    Relative,
    /// A mode digit outside 0..=2; only faults when the parameter is used
    Unsupported(u8),
}

impl ParamMode {
    pub fn from_digit(digit: u8) -> Self {
        match digit {
            0 => ParamMode::Position,
            1 => ParamMode::Immediate,
            2 => ParamMode::Relative,
            other => ParamMode::Unsupported(other),
        }
    }

    pub fn digit(self) -> u8 {
        match self {
            ParamMode::Position => 0,
            ParamMode::Immediate => 1,
            ParamMode::Relative => 2,
            ParamMode::Unsupported(d) => d,
        }
    }
}

impl fmt::Display for ParamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamMode::Position => write!(f, "position"),
            ParamMode::Immediate => write!(f, "immediate"),
            ParamMode::Relative => write!(f, "relative"),
            ParamMode::Unsupported(d) => write!(f, "unsupported({})", d),
        }
    }
}

/// Memory access failures. Converted to `RuntimeError` at the engine boundary,
/// where the program counter and opcode are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryFault {
    #[error("negative address {0}")]
    NegativeAddress(i64),

    #[error("illegal write target: immediate-mode parameter")]
    ImmediateWrite,

    #[error("unsupported parameter mode {0}")]
    UnsupportedMode(u8),
}

/// Growable word-addressed memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<i64>,
    sparse: FxHashMap<usize, i64>,
}

impl Memory {
    /// Create a memory whose first words are `image`
    pub fn new(image: Vec<i64>) -> Self {
        Memory {
            cells: image,
            sparse: FxHashMap::default(),
        }
    }

    /// Read the word at a physical address. Unwritten addresses are zero.
    pub fn load(&self, address: usize) -> i64 {
        match self.cells.get(address) {
            Some(&value) => value,
            None => self.sparse.get(&address).copied().unwrap_or(0),
        }
    }

    /// Write the word at a physical address, extending memory as needed
    pub fn store(&mut self, address: usize, value: i64) {
        let len = self.cells.len();
        if address < len {
            self.cells[address] = value;
            return;
        }

        if address - len < DENSE_GROWTH_WINDOW {
            self.cells.resize(address + 1, 0);
            if !self.sparse.is_empty() {
                let cells = &mut self.cells;
                let new_len = cells.len();
                self.sparse.retain(|&a, v| {
                    if a < new_len {
                        cells[a] = *v;
                        false
                    } else {
                        true
                    }
                });
            }
            self.cells[address] = value;
        } else {
            self.sparse.insert(address, value);
        }
    }

    /// Resolve a writable parameter to a physical address
    pub fn address_of(
        operand: i64,
        mode: ParamMode,
        relative_base: i64,
    ) -> Result<usize, MemoryFault> {
        let raw = match mode {
            ParamMode::Position => operand,
            ParamMode::Relative => relative_base.saturating_add(operand),
            ParamMode::Immediate => return Err(MemoryFault::ImmediateWrite),
            ParamMode::Unsupported(d) => return Err(MemoryFault::UnsupportedMode(d)),
        };
        usize::try_from(raw).map_err(|_| MemoryFault::NegativeAddress(raw))
    }

    /// Read a parameter according to its mode
    pub fn read(
        &self,
        operand: i64,
        mode: ParamMode,
        relative_base: i64,
    ) -> Result<i64, MemoryFault> {
        if mode == ParamMode::Immediate {
            return Ok(operand);
        }
        let address = Self::address_of(operand, mode, relative_base)?;
        Ok(self.load(address))
    }

    /// Write through a parameter. Returns the physical address written.
    pub fn write(
        &mut self,
        operand: i64,
        mode: ParamMode,
        value: i64,
        relative_base: i64,
    ) -> Result<usize, MemoryFault> {
        let address = Self::address_of(operand, mode, relative_base)?;
        self.store(address, value);
        Ok(address)
    }

    /// One past the highest materialised address
    pub fn len(&self) -> usize {
        let sparse_end = self.sparse.keys().max().map_or(0, |&a| a + 1);
        self.cells.len().max(sparse_end)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The dense region, starting at address 0
    pub fn dense(&self) -> &[i64] {
        &self.cells
    }

    /// Words stored outside the dense region, sorted by address
    pub fn sparse_entries(&self) -> Vec<(usize, i64)> {
        let mut entries: Vec<_> = self.sparse.iter().map(|(&a, &v)| (a, v)).collect();
        entries.sort_unstable_by_key(|&(a, _)| a);
        entries
    }

    /// Materialise every word up to [`Memory::len`]
    pub fn to_vec(&self) -> Vec<i64> {
        let mut words = self.cells.clone();
        if !self.sparse.is_empty() {
            words.resize(self.len(), 0);
            for (&address, &value) in &self.sparse {
                words[address] = value;
            }
        }
        words
    }

    /// Rough byte footprint, used by the snapshot budget
    pub fn estimated_size(&self) -> usize {
        self.cells.len() * std::mem::size_of::<i64>()
            + self.sparse.len() * (std::mem::size_of::<usize>() + std::mem::size_of::<i64>())
    }
}

impl From<Vec<i64>> for Memory {
    fn from(image: Vec<i64>) -> Self {
        Memory::new(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_past_end_are_zero() {
        let memory = Memory::new(vec![1, 2, 3]);
        assert_eq!(memory.load(3), 0);
        assert_eq!(memory.load(1_000_000), 0);
        assert_eq!(memory.len(), 3);
    }

    #[test]
    fn test_store_at_end_extends_dense_region() {
        let mut memory = Memory::new(vec![1, 2, 3]);
        memory.store(3, 4);
        memory.store(10, 11);
        assert_eq!(memory.dense(), &[1, 2, 3, 4, 0, 0, 0, 0, 0, 0, 11]);
        assert!(memory.sparse_entries().is_empty());
    }

    #[test]
    fn test_far_store_is_sparse() {
        let mut memory = Memory::new(vec![7]);
        let far = 1 + DENSE_GROWTH_WINDOW * 4;
        memory.store(far, 42);
        assert_eq!(memory.dense().len(), 1);
        assert_eq!(memory.load(far), 42);
        assert_eq!(memory.len(), far + 1);
        assert_eq!(memory.sparse_entries(), vec![(far, 42)]);
    }

    #[test]
    fn test_sparse_word_migrates_when_dense_region_grows() {
        let mut memory = Memory::new(Vec::new());
        let far = DENSE_GROWTH_WINDOW + 10;
        memory.store(far, 5);
        assert_eq!(memory.sparse_entries().len(), 1);

        // Grow the dense region in steps until it covers `far`
        let mut address = 0;
        while address < far {
            address += DENSE_GROWTH_WINDOW / 2;
            memory.store(address.min(far + 1), 1);
        }

        assert!(memory.sparse_entries().is_empty());
        assert_eq!(memory.load(far), 5);
    }

    #[test]
    fn test_modes() {
        let mut memory = Memory::new(vec![10, 20, 30, 40]);
        assert_eq!(memory.read(2, ParamMode::Position, 0), Ok(30));
        assert_eq!(memory.read(2, ParamMode::Immediate, 0), Ok(2));
        assert_eq!(memory.read(-1, ParamMode::Relative, 2), Ok(20));

        assert_eq!(memory.write(1, ParamMode::Relative, 99, 2), Ok(3));
        assert_eq!(memory.load(3), 99);
        assert_eq!(
            memory.write(0, ParamMode::Immediate, 1, 0),
            Err(MemoryFault::ImmediateWrite)
        );
    }

    #[test]
    fn test_negative_addresses_fault() {
        let mut memory = Memory::new(vec![0; 4]);
        assert_eq!(
            memory.read(-1, ParamMode::Position, 0),
            Err(MemoryFault::NegativeAddress(-1))
        );
        assert_eq!(
            memory.write(-3, ParamMode::Relative, 1, 1),
            Err(MemoryFault::NegativeAddress(-2))
        );
    }

    #[test]
    fn test_unsupported_mode_faults_on_use() {
        let memory = Memory::new(vec![0; 4]);
        assert_eq!(
            memory.read(0, ParamMode::from_digit(7), 0),
            Err(MemoryFault::UnsupportedMode(7))
        );
    }

    #[test]
    fn test_to_vec_merges_sparse_words() {
        let mut memory = Memory::new(vec![1]);
        let far = DENSE_GROWTH_WINDOW + 5;
        memory.store(far, 9);
        let words = memory.to_vec();
        assert_eq!(words.len(), far + 1);
        assert_eq!(words[0], 1);
        assert_eq!(words[far], 9);
    }
}
