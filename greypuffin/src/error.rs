use std::{fmt, fmt::Formatter, io};

/// Errors raised by the engine itself.
///
/// A crash of the fuzzed target is never an [`Error`]: it is reported as
/// [`ExecutionOutcome::Failure`](crate::execution::ExecutionOutcome::Failure) together with the
/// coverage of the failing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid setup, detected before any execution happens
    Config(String),
    /// The tracing or runner machinery malfunctioned. The coverage of the affected execution must
    /// not be trusted.
    Engine(String),
    /// The power schedule could not pick a seed
    Schedule(String),
    /// Reading or writing configuration, corpus or stats files failed
    IO(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(err) => write!(f, "invalid configuration: {}", err),
            Error::Engine(err) => write!(f, "internal engine error: {}", err),
            Error::Schedule(err) => write!(f, "error in the power schedule: {}", err),
            Error::IO(err) => write!(f, "error in io: {}", err),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::IO(err.to_string())
    }
}
