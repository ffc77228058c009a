use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::coverage::tracer::HookScope;
use crate::coverage::{CoverageFact, NGramCoverage, WindowSize};
use crate::error::Error;

/// The program under test.
pub trait Target {
    type Input;
    type Output;

    /// Runs the target once. Crashes are signalled by returning an error or by panicking.
    fn entrypoint(&self, input: &Self::Input) -> Result<Self::Output, anyhow::Error>;

    /// Seed inputs, never empty.
    fn initial_corpus(&self) -> Vec<Self::Input>;
}

impl<T: Target + ?Sized> Target for &T {
    type Input = T::Input;
    type Output = T::Output;

    fn entrypoint(&self, input: &Self::Input) -> Result<Self::Output, anyhow::Error> {
        (**self).entrypoint(input)
    }

    fn initial_corpus(&self) -> Vec<Self::Input> {
        (**self).initial_corpus()
    }
}

/// Payload of a panic caught while running the target.
pub struct PanicPayload(Box<dyn Any + Send + 'static>);

impl PanicPayload {
    pub fn message(&self) -> &str {
        if let Some(msg) = self.0.downcast_ref::<&'static str>() {
            msg
        } else if let Some(msg) = self.0.downcast_ref::<String>() {
            msg.as_str()
        } else {
            "panic with a non-string payload"
        }
    }

    pub fn into_inner(self) -> Box<dyn Any + Send + 'static> {
        self.0
    }
}

impl fmt::Debug for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PanicPayload").field(&self.message()).finish()
    }
}

/// Why a target execution crashed. The original error or panic payload is kept.
#[derive(Debug)]
pub enum TargetFailure {
    Error(anyhow::Error),
    Panic(PanicPayload),
}

impl TargetFailure {
    pub fn message(&self) -> String {
        match self {
            TargetFailure::Error(err) => format!("{:#}", err),
            TargetFailure::Panic(payload) => payload.message().to_string(),
        }
    }

    /// Hands the failure back to the caller's control flow: panics resume unwinding, errors are
    /// returned.
    pub fn resume(self) -> anyhow::Error {
        match self {
            TargetFailure::Error(err) => err,
            TargetFailure::Panic(payload) => panic::resume_unwind(payload.into_inner()),
        }
    }
}

impl fmt::Display for TargetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetFailure::Error(err) => write!(f, "target returned an error: {:#}", err),
            TargetFailure::Panic(payload) => write!(f, "target panicked: {}", payload.message()),
        }
    }
}

#[derive(Debug)]
pub enum ExecutionOutcome<O> {
    Success(O),
    Failure(TargetFailure),
}

impl<O> ExecutionOutcome<O> {
    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionOutcome::Failure(_))
    }

    pub fn status(&self) -> ExecutionStatus {
        match self {
            ExecutionOutcome::Success(_) => ExecutionStatus::Success,
            ExecutionOutcome::Failure(_) => ExecutionStatus::Crashed,
        }
    }

    pub fn into_result(self) -> Result<O, TargetFailure> {
        match self {
            ExecutionOutcome::Success(value) => Ok(value),
            ExecutionOutcome::Failure(failure) => Err(failure),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Success,
    Crashed,
}

/// Result of one instrumented run. The coverage is present for crashes too.
#[derive(Debug)]
pub struct Execution<O> {
    pub outcome: ExecutionOutcome<O>,
    pub coverage: CoverageFact,
}

pub trait TargetRunner {
    type Input;
    type Output;

    /// Executes one input. `Err` is reserved for malfunctions of the runner itself; crashes of
    /// the target are reported through [`Execution::outcome`].
    fn run(&self, input: &Self::Input) -> Result<Execution<Self::Output>, Error>;
}

/// Runs a [`Target`] under a fresh [`NGramCoverage`] hook per execution.
#[derive(Debug, Clone)]
pub struct InstrumentedRunner<T> {
    target: T,
    window_size: WindowSize,
}

impl<T: Target> InstrumentedRunner<T> {
    pub fn new(target: T, window_size: WindowSize) -> Self {
        Self {
            target,
            window_size,
        }
    }

    fn run_with(
        &self,
        coverage: Rc<NGramCoverage>,
        input: &T::Input,
    ) -> Result<Execution<T::Output>, Error> {
        let scope = HookScope::install(coverage.clone());

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.target.entrypoint(input)));

        // Both are evaluated before either error is propagated, so the hook is always restored
        let snapshot = coverage.snapshot();
        let released = scope.release();
        released?;
        let coverage = snapshot?;

        let outcome = match result {
            Ok(Ok(value)) => ExecutionOutcome::Success(value),
            Ok(Err(err)) => ExecutionOutcome::Failure(TargetFailure::Error(err)),
            Err(payload) => ExecutionOutcome::Failure(TargetFailure::Panic(PanicPayload(payload))),
        };

        if let ExecutionOutcome::Failure(failure) = &outcome {
            debug!("{} ({} signatures covered)", failure, coverage.len());
        } else {
            trace!("Execution finished with {} signatures", coverage.len());
        }

        Ok(Execution { outcome, coverage })
    }
}

impl<T: Target> TargetRunner for InstrumentedRunner<T> {
    type Input = T::Input;
    type Output = T::Output;

    fn run(&self, input: &Self::Input) -> Result<Execution<Self::Output>, Error> {
        self.run_with(Rc::new(NGramCoverage::new(self.window_size)), input)
    }
}
