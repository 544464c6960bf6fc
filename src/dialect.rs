use std::collections::VecDeque;

use tracing::debug;

use crate::basic::Basic;
use crate::error::Fault;

/// Step cap used when the caller has no better bound. Only the extended
/// dialect can loop; the basic dialect always runs off the end or halts.
pub const DEFAULT_STEP_LIMIT: usize = 1 << 20;

/// Input queue and output sink for instructions that talk to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Io {
    pub input: VecDeque<i64>,
    pub output: Vec<i64>,
}

impl Io {
    pub fn new(input: impl IntoIterator<Item = i64>) -> Self {
        Self {
            input: input.into_iter().collect(),
            output: Vec::new(),
        }
    }
}

/// An instruction set that executes programs encoded in an integer tape.
///
/// The tape is both program and memory. Search and the CLI are generic over
/// `Dialect`, so adding an instruction set only requires implementing this
/// trait.
pub trait Dialect {
    /// Name used on the command line and in logs.
    const NAME: &'static str;

    /// Execute the program in `tape` from position 0 until it halts.
    ///
    /// The tape is modified in place. Returns the number of executed
    /// instructions, counting the final Halt. Faults with
    /// [`Fault::StepLimit`] if `step_limit` instructions run without a Halt.
    fn execute(tape: &mut [i64], io: &mut Io, step_limit: usize) -> Result<usize, Fault>;

    /// Pretty-print a disassembly of the tape for human inspection.
    fn disassemble(tape: &[i64]) -> String;
}

/// Outcome of decoding and executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Continue at the given instruction pointer.
    Continue(usize),
    Halt,
}

/// Drive `step` from position 0 until it halts, faults or exhausts the
/// step limit. Returns the number of executed instructions.
pub(crate) fn drive(
    name: &str,
    step_limit: usize,
    mut step: impl FnMut(usize) -> Result<Step, Fault>,
) -> Result<usize, Fault> {
    let mut ip = 0;
    let mut steps = 0;
    loop {
        if steps >= step_limit {
            debug!(dialect = name, steps, ip, "step limit reached");
            return Err(Fault::StepLimit { limit: step_limit });
        }
        steps += 1;
        match step(ip) {
            Ok(Step::Continue(next)) => ip = next,
            Ok(Step::Halt) => {
                debug!(dialect = name, steps, "halted");
                return Ok(steps);
            }
            Err(fault) => {
                debug!(dialect = name, steps, ip, %fault, "faulted");
                return Err(fault);
            }
        }
    }
}

/// Run a basic-dialect program to completion.
///
/// The result is observed through the mutated tape, usually `tape[0]`.
pub fn run(tape: &mut [i64]) -> Result<(), Fault> {
    Basic::execute(tape, &mut Io::default(), usize::MAX).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_immediate_halt() {
        let mut tape = vec![99];
        assert_eq!(run(&mut tape), Ok(()));
        assert_eq!(tape, vec![99]);
    }

    #[test]
    fn test_run_scenarios() {
        let mut tape = vec![1, 0, 0, 0, 99];
        run(&mut tape).unwrap();
        assert_eq!(tape, vec![2, 0, 0, 0, 99]);

        let mut tape = vec![2, 3, 0, 3, 99];
        run(&mut tape).unwrap();
        assert_eq!(tape, vec![2, 3, 0, 6, 99]);

        let mut tape = vec![1, 1, 1, 4, 99, 5, 6, 0, 99];
        run(&mut tape).unwrap();
        assert_eq!(tape[0], 30);
    }

    #[test]
    fn test_run_unknown_opcode() {
        let mut tape = vec![77, 0, 0, 0];
        assert_eq!(
            run(&mut tape),
            Err(Fault::UnknownOpcode {
                value: 77,
                position: 0
            })
        );
    }

    #[test]
    fn test_run_off_the_end() {
        let mut tape = vec![1, 0, 0, 0];
        assert_eq!(
            run(&mut tape),
            Err(Fault::OutOfBounds { index: 4, len: 4 })
        );
    }

    #[test]
    fn test_drive_step_limit() {
        let result = drive("test", 3, |ip| Ok(Step::Continue(ip)));
        assert_eq!(result, Err(Fault::StepLimit { limit: 3 }));
    }

    #[test]
    fn test_drive_counts_halt() {
        let result = drive("test", 10, |ip| {
            if ip == 2 {
                Ok(Step::Halt)
            } else {
                Ok(Step::Continue(ip + 1))
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn test_io_new() {
        let io = Io::new([1, 2, 3]);
        assert_eq!(io.input, VecDeque::from(vec![1, 2, 3]));
        assert!(io.output.is_empty());
    }
}
