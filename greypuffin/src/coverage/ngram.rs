use std::cell::RefCell;

use log::warn;

use crate::coverage::tracer::StepHook;
use crate::coverage::{CoverageFact, CoverageMap, SignatureWindow, StepLocation, WindowSize};
use crate::error::Error;

/// Contexts of the engine's own instrumentation scope. Steps reported from there never count
/// towards the coverage of the target.
const ENGINE_CONTEXTS: [&str; 2] = ["greypuffin::coverage", "greypuffin::execution"];

pub fn is_engine_step(step: &StepLocation) -> bool {
    ENGINE_CONTEXTS
        .iter()
        .any(|context| step.context.starts_with(context))
}

struct Collector {
    window: SignatureWindow,
    map: CoverageMap,
}

/// N-gram coverage of one execution: every reported step is folded into the window, and the
/// window signature after the step is tallied.
pub struct NGramCoverage {
    collector: RefCell<Collector>,
    fault: RefCell<Option<String>>,
}

impl NGramCoverage {
    pub fn new(window_size: WindowSize) -> Self {
        Self {
            collector: RefCell::new(Collector {
                window: SignatureWindow::new(window_size),
                map: CoverageMap::new(),
            }),
            fault: RefCell::new(None),
        }
    }

    /// Coverage recorded so far. Fails if recording broke down at some step, because the
    /// coverage would be incomplete.
    pub fn snapshot(&self) -> Result<CoverageFact, Error> {
        if let Some(fault) = self.fault.borrow().as_ref() {
            return Err(Error::Engine(fault.clone()));
        }

        self.collector
            .try_borrow()
            .map(|collector| collector.map.snapshot())
            .map_err(|_| Error::Engine("coverage is still being recorded".into()))
    }

    /// Blocks recording until the guard is dropped, as a step reported from inside the hook would.
    #[cfg(test)]
    pub(crate) fn hold_recording(&self) -> impl Sized + '_ {
        self.collector.borrow_mut()
    }

    /// Keeps the first fault only, so a broken run is reported once instead of per step.
    fn latch_fault(&self, step: &StepLocation) {
        if let Ok(mut fault) = self.fault.try_borrow_mut() {
            if fault.is_none() {
                warn!("Coverage recording failed at step {}", step);
                *fault = Some(format!("re-entrant coverage recording at step {}", step));
            }
        }
    }
}

impl StepHook for NGramCoverage {
    fn on_step(&self, step: &StepLocation) {
        if is_engine_step(step) {
            return;
        }

        match self.collector.try_borrow_mut() {
            Ok(mut collector) => {
                let signature = collector.window.push(*step);
                collector.map.record(signature);
            }
            Err(_) => self.latch_fault(step),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::coverage::tracer::HookScope;
    use crate::coverage::Signature;

    fn f(line: u32) -> StepLocation {
        StepLocation::new("f", line)
    }

    #[test_log::test]
    fn test_one_signature_per_step() {
        let coverage = NGramCoverage::new(WindowSize::new(3).unwrap());
        for line in 1..=4 {
            coverage.on_step(&f(line));
        }

        let fact = coverage.snapshot().unwrap();
        assert_eq!(fact.total_hits(), 4);
        assert!(fact.contains(&Signature::of(&[f(1)])));
        assert!(fact.contains(&Signature::of(&[f(1), f(2)])));
        assert!(fact.contains(&Signature::of(&[f(1), f(2), f(3)])));
        assert!(fact.contains(&Signature::of(&[f(2), f(3), f(4)])));
    }

    #[test_log::test]
    fn test_repeated_window_is_counted() {
        let coverage = NGramCoverage::new(WindowSize::new(1).unwrap());
        for _ in 0..5 {
            coverage.on_step(&f(1));
        }

        let fact = coverage.snapshot().unwrap();
        assert_eq!(fact.len(), 1);
        assert_eq!(fact.count(&Signature::of(&[f(1)])), 5);
    }

    #[test_log::test]
    fn test_engine_steps_are_ignored() {
        let coverage = NGramCoverage::new(WindowSize::default());
        coverage.on_step(&StepLocation::new("greypuffin::execution", 10));
        coverage.on_step(&StepLocation::new("greypuffin::coverage::tracer", 11));
        coverage.on_step(&f(1));

        let fact = coverage.snapshot().unwrap();
        assert_eq!(fact.total_hits(), 1);
        assert!(fact.contains(&Signature::of(&[f(1)])));
    }

    /// Reports another step while the collector is recording
    struct Reentrant {
        coverage: Rc<NGramCoverage>,
    }

    impl StepHook for Reentrant {
        fn on_step(&self, step: &StepLocation) {
            let _guard = self.coverage.collector.borrow_mut();
            self.coverage.on_step(step);
        }
    }

    #[test_log::test]
    fn test_reentrant_recording_is_latched() {
        let coverage = Rc::new(NGramCoverage::new(WindowSize::default()));
        let scope = HookScope::install(Rc::new(Reentrant {
            coverage: coverage.clone(),
        }));

        crate::step!("f", 1);
        crate::step!("f", 2);
        scope.release().unwrap();

        let err = coverage.snapshot().unwrap_err();
        assert!(matches!(err, Error::Engine(msg) if msg.contains("f:1")));
    }
}
