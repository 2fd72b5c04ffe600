// Property-based tests for instruction decoding and arithmetic

use intcode::interpreter::decoder::{decode, Opcode};
use intcode::interpreter::engine::execute;
use intcode::interpreter::io::Channel;
use intcode::memory::ParamMode;
use proptest::prelude::*;

/// Operand cells live after the code of the position-mode program
const DATA_BASE: usize = 9;
const DATA_WORDS: usize = 16;

fn opcode_strategy() -> impl Strategy<Value = Opcode> {
    prop_oneof![
        Just(Opcode::Add),
        Just(Opcode::Mul),
        Just(Opcode::Input),
        Just(Opcode::Output),
        Just(Opcode::JumpIfTrue),
        Just(Opcode::JumpIfFalse),
        Just(Opcode::LessThan),
        Just(Opcode::Equals),
        Just(Opcode::AdjustBase),
        Just(Opcode::Halt),
    ]
}

proptest! {
    /// Property: mode digits come back in parameter order
    #[test]
    fn decode_recovers_opcode_and_modes(
        op in opcode_strategy(),
        m1 in 0u8..10,
        m2 in 0u8..10,
        m3 in 0u8..10,
    ) {
        let word = op.code()
            + 100 * i64::from(m1)
            + 1_000 * i64::from(m2)
            + 10_000 * i64::from(m3);
        let instruction = decode(word);

        prop_assert_eq!(instruction.op(), Some(op));
        prop_assert_eq!(instruction.modes[0].digit(), m1);
        prop_assert_eq!(instruction.modes[1].digit(), m2);
        prop_assert_eq!(instruction.modes[2].digit(), m3);
    }

    /// Property: the opcode is always the word modulo 100
    #[test]
    fn decode_opcode_is_low_two_digits(word in 0i64..10_000_000) {
        prop_assert_eq!(decode(word).opcode, word % 100);
    }

    /// Property: immediate add and multiply match wrapping arithmetic
    #[test]
    fn immediate_arithmetic_matches_host(a in any::<i64>(), b in any::<i64>()) {
        let program = vec![1101, a, b, 13, 1102, a, b, 14, 4, 13, 4, 14, 99, 0, 0];
        let execution = execute(program, [], &mut Channel::buffered()).unwrap();
        prop_assert_eq!(execution.output, vec![a.wrapping_add(b), a.wrapping_mul(b)]);
    }

    /// Property: position-mode add and multiply read and write the addressed cells
    #[test]
    fn position_arithmetic_matches_host(
        a in any::<i64>(),
        b in any::<i64>(),
        cells in prop::sample::subsequence((0..DATA_WORDS).collect::<Vec<usize>>(), 4)
            .prop_shuffle(),
    ) {
        let at = |i: usize| (DATA_BASE + cells[i]) as i64;
        let mut program = vec![1, at(0), at(1), at(2), 2, at(0), at(1), at(3), 99];
        program.resize(DATA_BASE + DATA_WORDS, 0);
        program[DATA_BASE + cells[0]] = a;
        program[DATA_BASE + cells[1]] = b;

        let memory = execute(program, [], &mut Channel::buffered()).unwrap().memory;
        prop_assert_eq!(memory.load(DATA_BASE + cells[0]), a);
        prop_assert_eq!(memory.load(DATA_BASE + cells[1]), b);
        prop_assert_eq!(memory.load(DATA_BASE + cells[2]), a.wrapping_add(b));
        prop_assert_eq!(memory.load(DATA_BASE + cells[3]), a.wrapping_mul(b));
    }

    /// Property: comparisons produce 0 or 1
    #[test]
    fn comparisons_are_boolean(a in any::<i64>(), b in any::<i64>()) {
        let program = vec![1107, a, b, 13, 1108, a, b, 14, 4, 13, 4, 14, 99, 0, 0];
        let execution = execute(program, [], &mut Channel::buffered()).unwrap();
        prop_assert_eq!(execution.output, vec![i64::from(a < b), i64::from(a == b)]);
    }
}

#[test]
fn test_decode_reference_words() {
    let instruction = decode(1002);
    assert_eq!(instruction.op(), Some(Opcode::Mul));
    assert_eq!(
        instruction.modes,
        [ParamMode::Position, ParamMode::Immediate, ParamMode::Position]
    );

    assert_eq!(decode(3).modes, [ParamMode::Position; 3]);
    assert_eq!(decode(11101).modes, [ParamMode::Immediate; 3]);
    assert_eq!(decode(99).op(), Some(Opcode::Halt));
    assert_eq!(decode(98).op(), None);
}
