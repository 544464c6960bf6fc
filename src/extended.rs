use tracing::trace;

use crate::dialect::{Dialect, Io, Step, drive};
use crate::error::Fault;
use crate::tape::{cell, read, write};

/// The extended instruction set: the basic set plus parameter modes,
/// input/output, conditional jumps and comparisons.
///
/// The instruction word at the pointer encodes the opcode in its two lowest
/// decimal digits and one parameter mode per operand in the digits above:
///
///   word = ABCDE  ->  opcode DE, mode of param 1 = C, param 2 = B, param 3 = A
///
/// Mode 0 reads the operand positionally (`tape[p]`), mode 1 uses it as an
/// immediate value. Destination operands are always positional.
///
/// | code | instruction   | effect                     | cells |
/// |------|---------------|----------------------------|-------|
/// | 1    | add a b c     | [c] = a + b                | 4     |
/// | 2    | mul a b c     | [c] = a * b                | 4     |
/// | 3    | in c          | [c] = next input           | 2     |
/// | 4    | out a         | emit a                     | 2     |
/// | 5    | jt a b        | if a != 0 { ip = b }       | 3     |
/// | 6    | jf a b        | if a == 0 { ip = b }       | 3     |
/// | 7    | lt a b c      | [c] = (a < b) as i64       | 4     |
/// | 8    | eq a b c      | [c] = (a == b) as i64      | 4     |
/// | 99   | halt          |                            | 1     |
///
/// Jumps make infinite loops possible, so the step limit matters here.
pub struct Extended;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Multiply,
    Input,
    Output,
    JumpIfTrue,
    JumpIfFalse,
    LessThan,
    Equals,
    Halt,
}

impl Op {
    fn decode(code: i64) -> Option<Self> {
        Some(match code {
            1 => Op::Add,
            2 => Op::Multiply,
            3 => Op::Input,
            4 => Op::Output,
            5 => Op::JumpIfTrue,
            6 => Op::JumpIfFalse,
            7 => Op::LessThan,
            8 => Op::Equals,
            99 => Op::Halt,
            _ => return None,
        })
    }

    /// Number of operand cells following the instruction word.
    fn arity(self) -> usize {
        match self {
            Op::Add | Op::Multiply | Op::LessThan | Op::Equals => 3,
            Op::JumpIfTrue | Op::JumpIfFalse => 2,
            Op::Input | Op::Output => 1,
            Op::Halt => 0,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            Op::Add => "ADD",
            Op::Multiply => "MUL",
            Op::Input => "IN",
            Op::Output => "OUT",
            Op::JumpIfTrue => "JT",
            Op::JumpIfFalse => "JF",
            Op::LessThan => "LT",
            Op::Equals => "EQ",
            Op::Halt => "HALT",
        }
    }

    /// Whether the last operand is a destination address.
    fn writes(self) -> bool {
        matches!(
            self,
            Op::Add | Op::Multiply | Op::Input | Op::LessThan | Op::Equals
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Position,
    Immediate,
}

/// A decoded instruction word.
struct Word {
    op: Op,
    modes: [Mode; 3],
}

fn decode(word: i64, position: usize) -> Result<Word, Fault> {
    let unknown = Fault::UnknownOpcode {
        value: word,
        position,
    };
    if word < 0 {
        return Err(unknown);
    }
    let op = Op::decode(word % 100).ok_or(unknown)?;

    // Input ignores its mode digits; Halt has none. Every other instruction
    // validates all three digits, used or not.
    let checked = match op {
        Op::Input | Op::Halt => 0,
        _ => 3,
    };
    let mut modes = [Mode::Position; 3];
    let mut digits = word / 100;
    for mode in modes.iter_mut().take(checked) {
        *mode = match digits % 10 {
            0 => Mode::Position,
            1 => Mode::Immediate,
            other => {
                return Err(Fault::InvalidMode {
                    mode: other,
                    position,
                });
            }
        };
        digits /= 10;
    }
    Ok(Word { op, modes })
}

fn jump_target(tape: &[i64], target: i64) -> Result<usize, Fault> {
    usize::try_from(target).map_err(|_| Fault::OutOfBounds {
        index: target,
        len: tape.len(),
    })
}

fn extended_step(tape: &mut [i64], io: &mut Io, ip: usize) -> Result<Step, Fault> {
    let Word { op, modes } = decode(cell(tape, ip)?, ip)?;
    trace!(ip, op = op.mnemonic(), "step");

    // Resolve operand `n` (1-based) to its value according to its mode.
    let param = |tape: &[i64], n: usize| -> Result<i64, Fault> {
        let raw = cell(tape, ip + n)?;
        match modes[n - 1] {
            Mode::Position => read(tape, raw),
            Mode::Immediate => Ok(raw),
        }
    };
    let next = ip + 1 + op.arity();

    match op {
        Op::Add | Op::Multiply | Op::LessThan | Op::Equals => {
            let a = param(tape, 1)?;
            let b = param(tape, 2)?;
            let dest = cell(tape, ip + 3)?;
            let result = match op {
                Op::Add => a.checked_add(b),
                Op::Multiply => a.checked_mul(b),
                Op::LessThan => Some((a < b) as i64),
                _ => Some((a == b) as i64),
            }
            .ok_or(Fault::Overflow { position: ip })?;
            write(tape, dest, result)?;
        }
        Op::Input => {
            let dest = cell(tape, ip + 1)?;
            let value = io
                .input
                .pop_front()
                .ok_or(Fault::InputExhausted { position: ip })?;
            write(tape, dest, value)?;
        }
        Op::Output => {
            let value = param(tape, 1)?;
            io.output.push(value);
        }
        Op::JumpIfTrue | Op::JumpIfFalse => {
            let cond = param(tape, 1)?;
            let target = param(tape, 2)?;
            if (cond != 0) == (op == Op::JumpIfTrue) {
                return Ok(Step::Continue(jump_target(tape, target)?));
            }
        }
        Op::Halt => return Ok(Step::Halt),
    }

    Ok(Step::Continue(next))
}

impl Dialect for Extended {
    const NAME: &'static str = "extended";

    fn execute(tape: &mut [i64], io: &mut Io, step_limit: usize) -> Result<usize, Fault> {
        drive(Self::NAME, step_limit, |ip| extended_step(tape, io, ip))
    }

    fn disassemble(tape: &[i64]) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        let mut pc = 0;
        while pc < tape.len() {
            let decoded = decode(tape[pc], pc)
                .ok()
                .filter(|w| pc + w.op.arity() < tape.len());
            let Some(Word { op, modes }) = decoded else {
                let _ = writeln!(out, "{pc:04}: DATA {}", tape[pc]);
                pc += 1;
                continue;
            };

            let arity = op.arity();
            let operands: Vec<String> = (1..=arity)
                .map(|n| {
                    let raw = tape[pc + n];
                    match modes[n - 1] {
                        Mode::Immediate if !(op.writes() && n == arity) => format!("#{raw}"),
                        _ => format!("[{raw}]"),
                    }
                })
                .collect();

            let line = match (op.writes(), operands.split_last()) {
                (true, Some((dest, srcs))) if !srcs.is_empty() => {
                    format!("{:<4} {} -> {dest}", op.mnemonic(), srcs.join(" "))
                }
                (true, Some((dest, _))) => format!("{:<4} -> {dest}", op.mnemonic()),
                _ if operands.is_empty() => op.mnemonic().to_string(),
                _ => format!("{:<4} {}", op.mnemonic(), operands.join(" ")),
            };
            let _ = writeln!(out, "{pc:04}: {line}");
            pc += 1 + arity;
        }
        out
    }
}
