//! Errors raised while decoding or executing a tape.

use std::num::ParseIntError;

use thiserror::Error;

/// A terminal condition raised during interpretation.
///
/// Every fault aborts the run. The tape is left in whatever state the
/// instructions executed before the fault put it in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// The cell at the instruction pointer is not a known opcode.
    #[error("unknown opcode {value} at position {position}")]
    UnknownOpcode { value: i64, position: usize },

    /// An operand or the instruction pointer addressed a cell outside the tape.
    #[error("address {index} is out of bounds for a tape of length {len}")]
    OutOfBounds { index: i64, len: usize },

    /// Add or Multiply produced a value that does not fit in an `i64`.
    #[error("arithmetic overflow in instruction at position {position}")]
    Overflow { position: usize },

    /// The step limit was reached before a Halt.
    #[error("step limit of {limit} reached without halting")]
    StepLimit { limit: usize },

    /// A parameter mode digit other than 0 (position) or 1 (immediate).
    #[error("invalid parameter mode {mode} in instruction at position {position}")]
    InvalidMode { mode: i64, position: usize },

    /// An Input instruction ran with no queued input.
    #[error("input exhausted at position {position}")]
    InputExhausted { position: usize },
}

/// Failure to decode the comma-separated program text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("program text is empty")]
    Empty,

    #[error("field {index} ({field:?}) is not an integer: {source}")]
    InvalidInteger {
        index: usize,
        field: String,
        #[source]
        source: ParseIntError,
    },
}
