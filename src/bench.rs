use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rayon::prelude::*;
use tracing::info;

use crate::dialect::{DEFAULT_STEP_LIMIT, Dialect, Io};
use crate::synth::random_program;

/// Configuration for a throughput benchmark over generated programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// Random seed for reproducibility.
    pub seed: u64,
    /// Number of programs to generate and execute.
    pub programs: usize,
    /// Add/Multiply instructions per program.
    pub instructions: usize,
    /// Data cells per program.
    pub data_len: usize,
    /// Max instructions per program execution.
    pub step_limit: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            programs: 1 << 16,
            instructions: 64,
            data_len: 32,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchReport {
    pub programs: usize,
    pub halted: usize,
    pub faulted: usize,
    /// Instructions executed across all programs that halted.
    pub steps: u64,
    pub elapsed: Duration,
}

/// Generate `config.programs` programs sequentially from the seed, then
/// execute them all in parallel via rayon.
pub fn run_bench<D: Dialect>(config: &BenchConfig) -> BenchReport {
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let mut tapes: Vec<Vec<i64>> = (0..config.programs)
        .map(|_| random_program(&mut rng, config.instructions, config.data_len))
        .collect();

    let step_limit = config.step_limit;
    let start = Instant::now();
    let results: Vec<Option<usize>> = tapes
        .par_iter_mut()
        .map(|tape| D::execute(tape, &mut Io::default(), step_limit).ok())
        .collect();
    let elapsed = start.elapsed();

    let halted = results.iter().filter(|r| r.is_some()).count();
    let steps = results.iter().flatten().map(|&s| s as u64).sum();
    let report = BenchReport {
        programs: config.programs,
        halted,
        faulted: config.programs - halted,
        steps,
        elapsed,
    };
    info!(
        dialect = D::NAME,
        programs = report.programs,
        halted = report.halted,
        "benchmark finished in {elapsed:.2?}"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::Basic;
    use crate::extended::Extended;

    fn small() -> BenchConfig {
        BenchConfig {
            seed: 42,
            programs: 256,
            instructions: 8,
            data_len: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_bench_counts_add_up() {
        let report = run_bench::<Basic>(&small());
        assert_eq!(report.programs, 256);
        assert_eq!(report.halted + report.faulted, 256);
        // Every halted program executes its 8 instructions plus the Halt.
        assert_eq!(report.steps, report.halted as u64 * 9);
    }

    #[test]
    fn test_bench_deterministic_outcome() {
        let a = run_bench::<Basic>(&small());
        let b = run_bench::<Basic>(&small());
        assert_eq!((a.halted, a.steps), (b.halted, b.steps));
    }

    #[test]
    fn test_bench_dialects_agree() {
        let a = run_bench::<Basic>(&small());
        let b = run_bench::<Extended>(&small());
        assert_eq!((a.halted, a.steps), (b.halted, b.steps));
    }

    #[test]
    fn test_bench_empty() {
        let report = run_bench::<Basic>(&BenchConfig {
            programs: 0,
            ..small()
        });
        assert_eq!(report.halted, 0);
        assert_eq!(report.steps, 0);
    }
}
