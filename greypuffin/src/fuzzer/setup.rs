use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use log4rs::Handle;
use serde::Deserialize;

use crate::coverage::WindowSize;
use crate::error::Error;
use crate::execution::{InstrumentedRunner, Target};
use crate::fuzzer::greybox::{Budget, Crash, GreyboxFuzzer};
use crate::fuzzer::mutations::FuzzInput;
use crate::fuzzer::schedule::AflFastSchedule;
use crate::fuzzer::stats::FuzzerStats;

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverageConfig {
    pub window_size: WindowSize,
}

/// Settings of one fuzzing session. Can be read from a TOML file, every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FuzzerConfig {
    pub static_seed: Option<u64>,
    pub max_iters: Option<u64>,
    /// Session timeout in seconds
    pub timeout: Option<u64>,
    /// Exponent of the AFLFast power schedule
    pub exponent: f64,
    pub stop_on_crash: bool,
    pub stats_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub coverage: CoverageConfig,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        Self {
            static_seed: None,
            max_iters: None,
            timeout: None,
            exponent: AflFastSchedule::DEFAULT_EXPONENT,
            stop_on_crash: false,
            stats_file: None,
            log_file: None,
            coverage: CoverageConfig::default(),
        }
    }
}

impl FuzzerConfig {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, Error> {
        Ok(toml::from_str(content)?)
    }

    pub fn budget(&self) -> Budget {
        Budget {
            max_iters: self.max_iters,
            max_duration: self.timeout.map(Duration::from_secs),
            stop_on_crash: self.stop_on_crash,
        }
    }
}

/// Outcome of a finished session.
#[derive(Debug)]
pub struct Session<I> {
    pub stats: FuzzerStats,
    pub crashes: Vec<Crash<I>>,
}

/// Fuzzes `target` with the AFLFast schedule until the budget of `config` is exhausted.
///
/// If a log `handle` is passed and a log file is configured, logging is switched to the fuzzing
/// configuration first. Panics of the target are logged at debug level instead of being printed
/// while the session runs.
pub fn start<T>(
    target: T,
    config: &FuzzerConfig,
    handle: Option<&Handle>,
) -> Result<Session<T::Input>, Error>
where
    T: Target,
    T::Input: FuzzInput,
{
    if let (Some(handle), Some(log_file)) = (handle, &config.log_file) {
        handle.set_config(crate::log::config_fuzzing(log_file)?);
    }

    info!(
        "Running greypuffin version {}: {}",
        crate::GIT_REF,
        crate::GIT_MSG
    );
    info!(
        "Window size {}, schedule exponent {}",
        config.coverage.window_size.get(),
        config.exponent
    );

    let seeds = target.initial_corpus();
    let runner = InstrumentedRunner::new(target, config.coverage.window_size);
    let mut fuzzer = GreyboxFuzzer::new(
        seeds,
        <<T::Input as FuzzInput>::Mutator as Default>::default(),
        AflFastSchedule::new(config.exponent)?,
        config.static_seed,
    )?;

    // The hook cannot be swapped while unwinding, so the loop is caught first and its panic
    // resumed once the previous hook is back.
    let previous_hook = panic::take_hook();
    panic::set_hook(Box::new(|info| debug!("Target panicked: {}", info)));
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        fuzzer.fuzz_loop(&runner, &config.budget())
    }));
    panic::set_hook(previous_hook);
    let stats = match result {
        Ok(stats) => stats?,
        Err(payload) => panic::resume_unwind(payload),
    };

    if let Some(stats_file) = &config.stats_file {
        stats.write_json(stats_file)?;
        info!("Wrote stats to {}", stats_file.display());
    }

    Ok(Session {
        stats,
        crashes: fuzzer.into_crashes(),
    })
}
