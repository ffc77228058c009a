//! Path-sensitive greybox fuzzing.
//!
//! Targets report their observable steps with [`step!`]. The [`execution::InstrumentedRunner`]
//! collects the n-gram coverage of every execution, and the [`fuzzer`] turns that feedback into a
//! growing population of interesting inputs.

pub mod cli;
pub mod coverage;
pub mod error;
pub mod execution;
pub mod fuzzer;
pub mod log;
mod macros;
pub mod test_utils;

pub const GIT_REF: &str = match option_env!("GIT_REF") {
    Some(env) => env,
    None => "undefined",
};

pub const MAYBE_GIT_REF: Option<&str> = option_env!("GIT_REF");

pub const GIT_MSG: &str = match option_env!("GIT_MSG") {
    Some(env) => env,
    None => "undefined",
};
