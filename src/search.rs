use std::ops::RangeInclusive;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::dialect::{DEFAULT_STEP_LIMIT, Dialect, Io};
use crate::error::Fault;
use crate::tape::write;

/// Cells overwritten with the candidate parameters before each trial.
pub const PARAM_CELLS: (i64, i64) = (1, 2);

/// Configuration for a parameter search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Value `tape[0]` must hold after the run.
    pub target: i64,
    /// Candidates written to `tape[1]`.
    pub range_a: RangeInclusive<i64>,
    /// Candidates written to `tape[2]`.
    pub range_b: RangeInclusive<i64>,
    /// Max instructions per trial.
    pub step_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            target: 19_690_720,
            range_a: 0..=99,
            range_b: 0..=99,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }
}

/// Clone `base` and write the candidate parameters into cells 1 and 2.
pub fn patched(base: &[i64], a: i64, b: i64) -> Result<Vec<i64>, Fault> {
    let mut tape = base.to_vec();
    write(&mut tape, PARAM_CELLS.0, a)?;
    write(&mut tape, PARAM_CELLS.1, b)?;
    Ok(tape)
}

/// Combined answer encoding for a found parameter pair, `100 * a + b`.
/// `None` if the encoding does not fit in an `i64`.
pub fn answer(a: i64, b: i64) -> Option<i64> {
    a.checked_mul(100)?.checked_add(b)
}

/// Run one trial on a private copy of `base`. Returns `tape[0]` on halt.
fn trial<D: Dialect>(base: &[i64], a: i64, b: i64, step_limit: usize) -> Result<i64, Fault> {
    let mut tape = patched(base, a, b)?;
    D::execute(&mut tape, &mut Io::default(), step_limit)?;
    Ok(tape[0])
}

fn is_match<D: Dialect>(base: &[i64], config: &SearchConfig, a: i64, b: i64) -> bool {
    match trial::<D>(base, a, b, config.step_limit) {
        Ok(value) => value == config.target,
        Err(fault) => {
            trace!(a, b, %fault, "trial faulted");
            false
        }
    }
}

/// Find the first `(a, b)` in row-major order (a outer, b inner) for which
/// the program, patched with `tape[1] = a` and `tape[2] = b`, halts with
/// `tape[0] == config.target`.
///
/// Each trial runs on its own clone; `base` is never modified. Trials that
/// fault are skipped.
pub fn search<D: Dialect>(base: &[i64], config: &SearchConfig) -> Option<(i64, i64)> {
    let found = config
        .range_a
        .clone()
        .flat_map(|a| config.range_b.clone().map(move |b| (a, b)))
        .find(|&(a, b)| is_match::<D>(base, config, a, b));
    debug!(dialect = D::NAME, target = config.target, ?found, "search finished");
    found
}

/// Parallel version of [`search`].
///
/// Trials are spread over the rayon pool. `find_first` returns the same pair
/// the sequential search would and stops scheduling later candidates once a
/// match is known.
pub fn par_search<D: Dialect>(base: &[i64], config: &SearchConfig) -> Option<(i64, i64)> {
    let range_b = config.range_b.clone();
    let found = config
        .range_a
        .clone()
        .into_par_iter()
        .flat_map_iter(|a| range_b.clone().map(move |b| (a, b)))
        .find_first(|&(a, b)| is_match::<D>(base, config, a, b));
    debug!(dialect = D::NAME, target = config.target, ?found, "parallel search finished");
    found
}
