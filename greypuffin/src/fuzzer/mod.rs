//! The fuzzer module sets up the greybox loop. It picks inputs from the population through a power
//! schedule, mutates them and admits those which exercised a new set of coverage signatures.

pub mod greybox;
// Public for benchmarks
pub mod mutations;
pub mod schedule;
mod setup;
pub mod stats;

pub use greybox::{Budget, Crash, GreyboxFuzzer, RunReport};
pub use mutations::{BytesMutator, FuzzInput, HasLen, Mutator, StringMutator};
pub use schedule::{AflFastSchedule, PowerSchedule, Seed, UniformSchedule};
pub use setup::{start, CoverageConfig, FuzzerConfig, Session};
pub use stats::FuzzerStats;
