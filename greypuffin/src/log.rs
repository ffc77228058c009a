use std::env;
use std::path::Path;

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::{self, Config, Handle};

use crate::error::Error;

const LEVEL_VAR: &str = "RUST_LOG";

const CONSOLE: &str = "console";
const LOG_FILE: &str = "logfile";

/// Per-step logging of the coverage collector. Only ever written to the log file.
const STEP_LOGGER: &str = "greypuffin::coverage";

/// Logs to stderr only.
pub fn config_default() -> Result<Config, Error> {
    let level = level_from_env();

    Config::builder()
        .appender(console())
        .build(Root::builder().appender(CONSOLE).build(level))
        .map_err(invalid_config)
}

/// Logs to stderr and mirrors everything into `path`. The log file also carries the thread and
/// module of each record, and is the only destination of the coverage collector's logging.
pub fn config_fuzzing<P>(path: P) -> Result<Config, Error>
where
    P: AsRef<Path>,
{
    let level = level_from_env();

    Config::builder()
        .appender(console())
        .appender(log_file(path)?)
        .logger(
            Logger::builder()
                .appender(LOG_FILE)
                .additive(false)
                .build(STEP_LOGGER, level),
        )
        .build(
            Root::builder()
                .appenders([CONSOLE, LOG_FILE])
                .build(level),
        )
        .map_err(invalid_config)
}

pub fn init(config: Config) -> Result<Handle, Error> {
    log4rs::init_config(config)
        .map_err(|err| Error::Config(format!("failed to init logging: {}", err)))
}

fn invalid_config(err: log4rs::config::runtime::ConfigErrors) -> Error {
    Error::Config(format!("invalid log configuration: {}", err))
}

fn console() -> Appender {
    let encoder = PatternEncoder::new("{h({d(%H:%M:%S)} {l:<5} {m})}{n}");

    Appender::builder().build(
        CONSOLE,
        Box::new(
            ConsoleAppender::builder()
                .target(Target::Stderr)
                .encoder(Box::new(encoder))
                .build(),
        ),
    )
}

fn log_file<P>(path: P) -> Result<Appender, Error>
where
    P: AsRef<Path>,
{
    let encoder = PatternEncoder::new("{d(%Y-%m-%dT%H:%M:%S%.3f)}\t{l}\t{T}\t{M}\t{m}{n}");
    let file = FileAppender::builder()
        .encoder(Box::new(encoder))
        .build(path)?;

    Ok(Appender::builder().build(LOG_FILE, Box::new(file)))
}

/// Level named by `RUST_LOG`, `info` if unset or not a plain level name.
fn level_from_env() -> LevelFilter {
    match env::var(LEVEL_VAR) {
        Ok(value) => value.trim().parse().unwrap_or(LevelFilter::Info),
        Err(_) => LevelFilter::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_builds() {
        let config = config_default().unwrap();
        assert_eq!(config.appenders().len(), 1);
    }

    #[test]
    fn test_config_fuzzing_routes_steps_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fuzzing.log");

        let config = config_fuzzing(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.appenders().len(), 2);
        let step_logger = config
            .loggers()
            .iter()
            .find(|logger| logger.name() == STEP_LOGGER)
            .unwrap();
        assert_eq!(step_logger.appenders().to_vec(), vec![LOG_FILE.to_string()]);
        assert!(!step_logger.additive());
    }
}
