use std::fmt::Debug;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{arg, crate_authors, crate_name, crate_version, value_parser, ArgMatches, Command};
use log::{error, info};

use crate::coverage::WindowSize;
use crate::error::Error;
use crate::execution::{ExecutionOutcome, InstrumentedRunner, Target, TargetRunner};
use crate::fuzzer::{start, FuzzInput, FuzzerConfig};

fn create_app() -> Command {
    Command::new(crate_name!())
        .version(crate::MAYBE_GIT_REF.unwrap_or(crate_version!()))
        .author(crate_authors!())
        .about("Path-sensitive greybox fuzzing of an instrumented target")
        .arg(arg!(-c --config [file] "Loads the fuzzer settings from a TOML file").global(true))
        .arg(arg!(-i --"max-iters" [i] "Maximum iterations to do")
            .value_parser(value_parser!(u64))
            .global(true))
        .arg(arg!(-t --timeout [secs] "Stops the session after this many seconds")
            .value_parser(value_parser!(u64))
            .global(true))
        .arg(arg!(-s --seed [n] "Seeds the random number generator for a reproducible session")
            .value_parser(value_parser!(u64))
            .global(true))
        .arg(arg!(-w --window [n] "Number of most recent steps digested into one signature")
            .value_parser(value_parser!(u64))
            .global(true))
        .arg(arg!(-e --exponent [x] "Exponent of the AFLFast power schedule")
            .value_parser(value_parser!(f64))
            .global(true))
        .arg(arg!(--"stats-file" [file] "Writes the session stats as JSON to this file").global(true))
        .arg(arg!(--"log-file" [file] "Mirrors the log into this file").global(true))
        .arg(arg!(--"stop-on-crash" "Ends the session at the first crash").global(true))
        .subcommands(vec![
            Command::new("fuzz").about("Starts a fuzzing session. This is the default."),
            Command::new("execute")
                .about("Executes a single input under instrumentation and prints its outcome")
                .arg(arg!(<input> "The input to execute")),
            Command::new("seeds").about("Prints the initial corpus of the target"),
        ])
}

/// Settings from `--config` with the command line flags applied on top.
fn config_from_matches(matches: &ArgMatches) -> Result<FuzzerConfig, Error> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => FuzzerConfig::from_toml_file(path)?,
        None => FuzzerConfig::default(),
    };

    if let Some(max_iters) = matches.get_one::<u64>("max-iters") {
        config.max_iters = Some(*max_iters);
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        config.timeout = Some(*timeout);
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.static_seed = Some(*seed);
    }
    if let Some(window) = matches.get_one::<u64>("window") {
        let window = usize::try_from(*window)
            .map_err(|_| Error::Config(format!("window size {} is out of range", window)))?;
        config.coverage.window_size = WindowSize::new(window)?;
    }
    if let Some(exponent) = matches.get_one::<f64>("exponent") {
        config.exponent = *exponent;
    }
    if let Some(stats_file) = matches.get_one::<String>("stats-file") {
        config.stats_file = Some(PathBuf::from(stats_file));
    }
    if let Some(log_file) = matches.get_one::<String>("log-file") {
        config.log_file = Some(PathBuf::from(log_file));
    }
    if matches.get_flag("stop-on-crash") {
        config.stop_on_crash = true;
    }

    Ok(config)
}

pub fn main<T>(target: T) -> ExitCode
where
    T: Target,
    T::Input: FuzzInput,
    T::Output: Debug,
{
    let handle = match crate::log::config_default().and_then(crate::log::init) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("Failed to init logging: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let matches = create_app().get_matches();

    info!("Git Version: {}", crate::GIT_REF);

    let config = match config_from_matches(&matches) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    if let Some(matches) = matches.subcommand_matches("execute") {
        let input: &String = match matches.get_one("input") {
            Some(input) => input,
            None => return ExitCode::FAILURE,
        };
        execute(target, &config, &<T::Input as FuzzInput>::from_arg(input))
    } else if matches.subcommand_matches("seeds").is_some() {
        for seed in target.initial_corpus() {
            println!("{:?}", seed);
        }
        ExitCode::SUCCESS
    } else {
        match start(target, &config, Some(&handle)) {
            Ok(session) => {
                for crash in &session.crashes {
                    info!("Crashing input {:?}: {}", crash.input, crash.message);
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("Fuzzing failed: {}", err);
                ExitCode::FAILURE
            }
        }
    }
}

/// Exits with failure if the target crashed on `input`.
fn execute<T>(target: T, config: &FuzzerConfig, input: &T::Input) -> ExitCode
where
    T: Target,
    T::Output: Debug,
{
    let runner = InstrumentedRunner::new(target, config.coverage.window_size);
    let execution = match runner.run(input) {
        Ok(execution) => execution,
        Err(err) => {
            error!("Failed to execute input: {}", err);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "{} signatures, {} steps",
        execution.coverage.len(),
        execution.coverage.total_hits()
    );
    match execution.outcome {
        ExecutionOutcome::Success(output) => {
            println!("Success: {:?}", output);
            ExitCode::SUCCESS
        }
        ExecutionOutcome::Failure(failure) => {
            println!("Crash: {}", failure);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn config(args: &[&str]) -> Result<FuzzerConfig, Error> {
        let matches = create_app()
            .try_get_matches_from(std::iter::once("greypuffin").chain(args.iter().copied()))
            .unwrap();
        config_from_matches(&matches)
    }

    #[test_log::test]
    fn test_app_is_valid() {
        create_app().debug_assert();
    }

    #[test_log::test]
    fn test_flags_without_subcommand() {
        let config = config(&["--max-iters", "10", "--seed", "4", "--stop-on-crash"]).unwrap();

        assert_eq!(config.max_iters, Some(10));
        assert_eq!(config.static_seed, Some(4));
        assert!(config.stop_on_crash);
        assert_eq!(config.coverage.window_size, WindowSize::default());
    }

    #[test_log::test]
    fn test_flags_after_subcommand() {
        let config = config(&["fuzz", "--window", "8", "--exponent", "1.5"]).unwrap();

        assert_eq!(config.coverage.window_size.get(), 8);
        assert_eq!(config.exponent, 1.5);
    }

    #[test_log::test]
    fn test_zero_window_is_rejected() {
        assert!(matches!(config(&["--window", "0"]), Err(Error::Config(_))));
    }

    #[test_log::test]
    fn test_oversized_window_is_rejected() {
        let too_large = (WindowSize::MAX + 1).to_string();
        assert!(matches!(
            config(&["--window", &too_large]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config(&["--window", &u64::MAX.to_string()]),
            Err(Error::Config(_))
        ));
    }

    #[test_log::test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_iters = 5\ntimeout = 30\n[coverage]\nwindow_size = 3").unwrap();
        let path = file.path().to_str().unwrap();

        let config = config(&["--config", path, "--max-iters", "7"]).unwrap();

        assert_eq!(config.max_iters, Some(7));
        assert_eq!(config.timeout, Some(30));
        assert_eq!(config.coverage.window_size.get(), 3);
    }

    #[test_log::test]
    fn test_execute_subcommand() {
        let matches = create_app()
            .try_get_matches_from(["greypuffin", "execute", "17"])
            .unwrap();
        let input: &String = matches
            .subcommand_matches("execute")
            .unwrap()
            .get_one("input")
            .unwrap();

        assert_eq!(input, "17");
    }
}
