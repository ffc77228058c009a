use greypuffin::coverage::tracer;
use greypuffin::coverage::{Signature, StepLocation, WindowSize};
use greypuffin::execution::{ExecutionOutcome, InstrumentedRunner, Target, TargetRunner};
use greypuffin::fuzzer::{AflFastSchedule, GreyboxFuzzer, PowerSchedule, StringMutator};
use greypuffin::test_utils::{BranchTarget, DisjointTarget, PanicTarget, ReplayTarget};

#[test_log::test]
fn test_disjoint_paths_have_disjoint_coverage() {
    let runner = InstrumentedRunner::new(DisjointTarget, WindowSize::default());
    let left = runner.run(&0).unwrap().coverage;
    let right = runner.run(&1).unwrap().coverage;
    let left_again = runner.run(&2).unwrap().coverage;

    assert!(left.is_disjoint(&right));
    assert_eq!(left, left_again);
}

#[test_log::test]
fn test_no_tracer_outlives_a_run() {
    let runner = InstrumentedRunner::new(BranchTarget, WindowSize::default());
    runner.run(&"3".to_string()).unwrap();
    runner.run(&"not a number".to_string()).unwrap();
    assert!(!tracer::is_active());

    // Direct calls are not traced
    assert_eq!(BranchTarget.entrypoint(&"3".to_string()).unwrap(), 10);
    assert!(!tracer::is_active());
}

#[test_log::test]
fn test_always_crashing_target_still_has_coverage() {
    let runner = InstrumentedRunner::new(PanicTarget, WindowSize::default());
    for input in ["", "a", "abc"] {
        let execution = runner.run(&input.to_string()).unwrap();
        assert!(execution.outcome.is_failure());
        assert_eq!(execution.coverage.total_hits(), 2);
    }
}

#[test_log::test]
fn test_odd_input_is_ranked_as_new_coverage() {
    let runner = InstrumentedRunner::new(BranchTarget, WindowSize::default());
    let mut fuzzer = GreyboxFuzzer::new(
        vec!["0".to_string(), "1".to_string(), "2".to_string()],
        StringMutator,
        AflFastSchedule::default(),
        Some(0),
    )
    .unwrap();

    let even = fuzzer.run(&runner).unwrap();
    let odd = fuzzer.run(&runner).unwrap();
    let even_again = fuzzer.run(&runner).unwrap();

    assert!(matches!(odd.outcome, ExecutionOutcome::Success(4)));
    assert!(odd.new_coverage);
    assert!(odd.new_signatures > 0);
    assert!(!even_again.new_coverage);
    assert!(odd
        .coverage
        .signatures()
        .any(|signature| !even.coverage.contains(signature)));

    // The even path was exercised twice, so the odd input carries more energy
    let mut population = fuzzer.population().to_vec();
    fuzzer.schedule().assign_energy(&mut population);
    assert_eq!(population.len(), 2);
    assert_eq!(population[1].data, "1");
    assert!(population[1].energy > population[0].energy);
}

#[test_log::test]
fn test_window_of_three_steps() {
    let f = |line| StepLocation::new("f", line);
    let runner = InstrumentedRunner::new(
        ReplayTarget {
            steps: vec![("f", 1), ("f", 2), ("f", 3), ("f", 4)],
        },
        WindowSize::new(3).unwrap(),
    );

    let coverage = runner.run(&()).unwrap().coverage;

    let after_three = Signature::of(&[f(1), f(2), f(3)]);
    let after_four = Signature::of(&[f(2), f(3), f(4)]);
    assert_ne!(after_three, after_four);
    assert!(coverage.contains(&after_three));
    assert!(coverage.contains(&after_four));
    assert!(!coverage.contains(&Signature::of(&[f(1), f(2), f(3), f(4)])));
    assert_eq!(coverage.len(), 4);
}
