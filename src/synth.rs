use rand::Rng;
use rand::rngs::SmallRng;

use crate::basic::Opcode;

/// Largest value (exclusive) placed in a generated data cell.
const DATA_VALUE_LIMIT: i64 = 10;

/// Generate a well-formed basic-dialect program.
///
/// Layout: `instructions` Add/Multiply instructions, one Halt, then
/// `data_len` data cells (at least one). Every operand addresses the data
/// section, so the code is never overwritten and the program always reaches
/// its Halt unless an intermediate result overflows.
pub fn random_program(rng: &mut SmallRng, instructions: usize, data_len: usize) -> Vec<i64> {
    let data_len = data_len.max(1);
    let data_start = instructions * 4 + 1;
    let mut tape = Vec::with_capacity(data_start + data_len);

    for _ in 0..instructions {
        let op = if rng.r#gen::<bool>() {
            Opcode::Add
        } else {
            Opcode::Multiply
        };
        tape.push(op as i64);
        for _ in 0..3 {
            tape.push((data_start + rng.gen_range(0..data_len)) as i64);
        }
    }
    tape.push(Opcode::Halt as i64);
    tape.extend((0..data_len).map(|_| rng.gen_range(0..DATA_VALUE_LIMIT)));
    tape
}
