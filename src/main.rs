use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tapevm::basic::Basic;
use tapevm::bench::{BenchConfig, run_bench};
use tapevm::dialect::{DEFAULT_STEP_LIMIT, Dialect, Io};
use tapevm::extended::Extended;
use tapevm::search::{SearchConfig, answer, par_search, search};
use tapevm::tape::{format_program, parse_program, write};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tapevm", about = "Run integer-tape programs")]
struct Cli {
    /// Which instruction set to use (basic, extended).
    #[arg(long, global = true, default_value = "basic")]
    dialect: String,

    /// Max instructions per execution.
    #[arg(long, global = true, default_value_t = DEFAULT_STEP_LIMIT)]
    step_limit: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a program and print cell 0 (or the program's output).
    Run {
        /// File holding the comma-separated program.
        program: PathBuf,

        /// Overwrite a cell before running, as INDEX=VALUE. Repeatable.
        #[arg(long = "patch", value_parser = parse_patch)]
        patches: Vec<(i64, i64)>,

        /// Value fed to Input instructions. Repeatable.
        #[arg(long = "input", allow_negative_numbers = true)]
        inputs: Vec<i64>,

        /// Print the whole final tape instead of cell 0.
        #[arg(long)]
        dump: bool,
    },

    /// Find the values of cells 1 and 2 that make cell 0 equal the target.
    Search {
        program: PathBuf,

        #[arg(long, default_value_t = 19_690_720, allow_negative_numbers = true)]
        target: i64,

        /// Smallest candidate for each cell.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        min: i64,

        /// Largest candidate for each cell.
        #[arg(long, default_value_t = 99, allow_negative_numbers = true)]
        max: i64,

        /// Run trials on all cores.
        #[arg(long)]
        parallel: bool,
    },

    /// Print a disassembly of a program.
    Disasm { program: PathBuf },

    /// Execute randomly generated programs and report throughput.
    Bench {
        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long, default_value_t = 1 << 16)]
        programs: usize,

        #[arg(long, default_value_t = 64)]
        instructions: usize,

        #[arg(long, default_value_t = 32)]
        data_len: usize,
    },
}

/// Parse an "INDEX=VALUE" patch specification.
fn parse_patch(s: &str) -> Result<(i64, i64), String> {
    let (index, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid patch '{s}', expected INDEX=VALUE (e.g. 1=12)"))?;
    let index = index
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("Invalid patch index: {e}"))?;
    let value = value
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("Invalid patch value: {e}"))?;
    Ok((index, value))
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tapevm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.dialect.as_str() {
        "basic" => dispatch::<Basic>(&cli),
        "extended" => dispatch::<Extended>(&cli),
        other => {
            error!("Unknown dialect: {other}. Available: basic, extended");
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn load_program(path: &Path) -> Result<Vec<i64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let tape = parse_program(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    info!("Loaded {} cells from {}", tape.len(), path.display());
    Ok(tape)
}

fn dispatch<D: Dialect>(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Run {
            program,
            patches,
            inputs,
            dump,
        } => run_program::<D>(program, patches, inputs, *dump, cli.step_limit),
        Command::Search {
            program,
            target,
            min,
            max,
            parallel,
        } => {
            let config = SearchConfig {
                target: *target,
                range_a: *min..=*max,
                range_b: *min..=*max,
                step_limit: cli.step_limit,
            };
            run_search::<D>(program, &config, *parallel)
        }
        Command::Disasm { program } => {
            let tape = load_program(program)?;
            print!("{}", D::disassemble(&tape));
            Ok(())
        }
        Command::Bench {
            seed,
            programs,
            instructions,
            data_len,
        } => {
            let config = BenchConfig {
                seed: *seed,
                programs: *programs,
                instructions: *instructions,
                data_len: *data_len,
                step_limit: cli.step_limit,
            };
            print_bench::<D>(&config);
            Ok(())
        }
    }
}

fn run_program<D: Dialect>(
    path: &Path,
    patches: &[(i64, i64)],
    inputs: &[i64],
    dump: bool,
    step_limit: usize,
) -> Result<()> {
    let tape = load_program(path)?;
    let (tape, io) = execute_patched::<D>(tape, patches, inputs, step_limit)?;

    if dump {
        println!("{}", format_program(&tape));
    } else if !io.output.is_empty() {
        for value in &io.output {
            println!("{value}");
        }
    } else {
        println!("{}", tape[0]);
    }
    Ok(())
}

/// Apply the patches, then execute the program with the given inputs.
fn execute_patched<D: Dialect>(
    mut tape: Vec<i64>,
    patches: &[(i64, i64)],
    inputs: &[i64],
    step_limit: usize,
) -> Result<(Vec<i64>, Io)> {
    for &(index, value) in patches {
        write(&mut tape, index, value).with_context(|| format!("cannot patch cell {index}"))?;
    }

    let mut io = Io::new(inputs.iter().copied());
    let steps = D::execute(&mut tape, &mut io, step_limit)
        .with_context(|| format!("{} program faulted", D::NAME))?;
    info!("Halted after {steps} instructions");
    Ok((tape, io))
}

fn run_search<D: Dialect>(path: &Path, config: &SearchConfig, parallel: bool) -> Result<()> {
    let tape = load_program(path)?;
    let found = if parallel {
        par_search::<D>(&tape, config)
    } else {
        search::<D>(&tape, config)
    };

    match found {
        Some((a, b)) => {
            let Some(combined) = answer(a, b) else {
                anyhow::bail!("found a={a} b={b}, but 100 * a + b overflows an i64");
            };
            println!("a={a} b={b} answer={combined}");
            Ok(())
        }
        None => anyhow::bail!(
            "no parameters in {:?} x {:?} produce {}",
            config.range_a,
            config.range_b,
            config.target
        ),
    }
}

fn print_bench<D: Dialect>(config: &BenchConfig) {
    let report = run_bench::<D>(config);
    let secs = report.elapsed.as_secs_f64();
    let programs_per_sec = report.programs as f64 / secs;
    let steps_per_sec = report.steps as f64 / secs;

    eprintln!("Benchmark results ({}):", D::NAME);
    eprintln!("  Programs:          {}", report.programs);
    eprintln!("  Halted:            {}", report.halted);
    eprintln!("  Faulted:           {}", report.faulted);
    eprintln!("  Instructions:      {}", report.steps);
    eprintln!("  Elapsed:           {:.2?}", report.elapsed);
    eprintln!("  Programs/sec:      {programs_per_sec:.0}");
    eprintln!("  Instructions/sec:  {steps_per_sec:.0}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_patch() {
        assert_eq!(parse_patch("1=12"), Ok((1, 12)));
        assert_eq!(parse_patch(" 2 = -3 "), Ok((2, -3)));
        assert!(parse_patch("1:12").is_err());
        assert!(parse_patch("a=1").is_err());
        assert!(parse_patch("1=").is_err());
    }

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::try_parse_from([
            "tapevm", "search", "prog.txt", "--target", "3500", "--max", "11", "--parallel",
        ])
        .unwrap();
        assert_eq!(cli.dialect, "basic");
        match cli.command {
            Command::Search {
                target,
                min,
                max,
                parallel,
                ..
            } => {
                assert_eq!((target, min, max, parallel), (3500, 0, 11, true));
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_cli_parses_run_patches() {
        let cli = Cli::try_parse_from([
            "tapevm", "--dialect", "extended", "run", "prog.txt", "--patch", "1=12", "--patch",
            "2=2", "--input", "5",
        ])
        .unwrap();
        assert_eq!(cli.dialect, "extended");
        match cli.command {
            Command::Run {
                patches, inputs, ..
            } => {
                assert_eq!(patches, vec![(1, 12), (2, 2)]);
                assert_eq!(inputs, vec![5]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_with_patches_reproduces_example() {
        let path = std::env::temp_dir().join(format!("tapevm-run-{}.txt", std::process::id()));
        std::fs::write(&path, "1,0,0,3,2,3,11,0,99,30,40,50\n").unwrap();

        let path_arg = path.to_string_lossy().into_owned();
        let cli = Cli::try_parse_from([
            "tapevm", "run", path_arg.as_str(), "--patch", "1=9", "--patch", "2=10",
        ])
        .unwrap();
        let Command::Run {
            program,
            patches,
            inputs,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };

        let tape = load_program(&program).unwrap();
        std::fs::remove_file(&path).unwrap();
        let (tape, io) =
            execute_patched::<Basic>(tape, &patches, &inputs, cli.step_limit).unwrap();
        assert_eq!(tape, vec![3500, 9, 10, 70, 2, 3, 11, 0, 99, 30, 40, 50]);
        assert!(io.output.is_empty());
    }

    #[test]
    fn test_run_patch_out_of_bounds() {
        let result = execute_patched::<Basic>(vec![99], &[(5, 1)], &[], DEFAULT_STEP_LIMIT);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_extended_with_input() {
        let (tape, io) =
            execute_patched::<Extended>(vec![3, 0, 4, 0, 99], &[], &[-4], DEFAULT_STEP_LIMIT)
                .unwrap();
        assert_eq!(tape[0], -4);
        assert_eq!(io.output, vec![-4]);
    }
}
