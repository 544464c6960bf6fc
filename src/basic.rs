use tracing::trace;

use crate::dialect::{Dialect, Io, Step, drive};
use crate::error::Fault;
use crate::tape::{cell, read, write};

/// The basic instruction set: Add, Multiply and Halt.
///
/// Each Add/Multiply instruction occupies four cells: the opcode, two source
/// addresses and a destination address. Addressing is positional, so operand
/// values are indices into the tape rather than immediate values:
///
///   tape[dest] = tape[a] + tape[b]   (opcode 1)
///   tape[dest] = tape[a] * tape[b]   (opcode 2)
///
/// Halt (opcode 99) occupies one cell. The instruction pointer only ever moves
/// forward, so a program without a reachable Halt runs off the end of the
/// tape and faults with [`Fault::OutOfBounds`].
pub struct Basic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add = 1,
    Multiply = 2,
    Halt = 99,
}

impl Opcode {
    fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Multiply => "MUL",
            Opcode::Halt => "HALT",
        }
    }
}

impl TryFrom<i64> for Opcode {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, i64> {
        match value {
            1 => Ok(Opcode::Add),
            2 => Ok(Opcode::Multiply),
            99 => Ok(Opcode::Halt),
            other => Err(other),
        }
    }
}

fn basic_step(tape: &mut [i64], ip: usize) -> Result<Step, Fault> {
    let value = cell(tape, ip)?;
    let op = Opcode::try_from(value).map_err(|value| Fault::UnknownOpcode {
        value,
        position: ip,
    })?;

    let combine: fn(i64, i64) -> Option<i64> = match op {
        Opcode::Halt => {
            trace!(ip, "halt");
            return Ok(Step::Halt);
        }
        Opcode::Add => i64::checked_add,
        Opcode::Multiply => i64::checked_mul,
    };

    let a = cell(tape, ip + 1)?;
    let b = cell(tape, ip + 2)?;
    let dest = cell(tape, ip + 3)?;
    trace!(ip, op = op.mnemonic(), a, b, dest, "step");

    let result = combine(read(tape, a)?, read(tape, b)?)
        .ok_or(Fault::Overflow { position: ip })?;
    write(tape, dest, result)?;

    Ok(Step::Continue(ip + 4))
}

impl Dialect for Basic {
    const NAME: &'static str = "basic";

    fn execute(tape: &mut [i64], _io: &mut Io, step_limit: usize) -> Result<usize, Fault> {
        drive(Self::NAME, step_limit, |ip| basic_step(tape, ip))
    }

    fn disassemble(tape: &[i64]) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        let mut pc = 0;
        while pc < tape.len() {
            match Opcode::try_from(tape[pc]) {
                Ok(Opcode::Halt) => {
                    let _ = writeln!(out, "{pc:04}: HALT");
                    pc += 1;
                }
                Ok(op) if pc + 3 < tape.len() => {
                    let (a, b, c) = (tape[pc + 1], tape[pc + 2], tape[pc + 3]);
                    let _ = writeln!(out, "{pc:04}: {:<4} [{a}] [{b}] -> [{c}]", op.mnemonic());
                    pc += 4;
                }
                _ => {
                    let _ = writeln!(out, "{pc:04}: DATA {}", tape[pc]);
                    pc += 1;
                }
            }
        }
        out
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn basic_never_panics(tape_data in prop::collection::vec(-5i64..120, 0..128)) {
            let mut tape = tape_data;
            let _ = Basic::execute(&mut tape, &mut Io::default(), 8192);
        }

        #[test]
        fn basic_preserves_tape_length(tape_data in prop::collection::vec(any::<i64>(), 0..128)) {
            let original_len = tape_data.len();
            let mut tape = tape_data;
            let _ = Basic::execute(&mut tape, &mut Io::default(), 8192);
            prop_assert_eq!(tape.len(), original_len);
        }

        #[test]
        fn basic_always_terminates(tape_data in prop::collection::vec(0i64..16, 1..128)) {
            // The pointer advances by 4 per instruction, so a tape of n cells
            // needs at most n / 4 + 1 steps before halting or faulting.
            let limit = tape_data.len() / 4 + 1;
            let mut tape = tape_data;
            let result = Basic::execute(&mut tape, &mut Io::default(), limit);
            prop_assert!(
                !matches!(result, Err(Fault::StepLimit { .. })),
                "hit step limit: {:?}",
                result
            );
        }

        #[test]
        fn basic_deterministic(tape_data in prop::collection::vec(-2i64..100, 1..64)) {
            let mut first = tape_data.clone();
            let mut second = tape_data;
            let r1 = Basic::execute(&mut first, &mut Io::default(), 8192);
            let r2 = Basic::execute(&mut second, &mut Io::default(), 8192);
            prop_assert_eq!(r1, r2);
            prop_assert_eq!(first, second);
        }
    }
}
