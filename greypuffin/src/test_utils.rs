//! Small instrumented targets used by the tests and benchmarks.

use anyhow::Context;

use crate::execution::Target;
use crate::step;

/// Parses an integer and takes one branch for even and another for odd values. Inputs that are
/// not integers fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchTarget;

fn even(x: i64) -> i64 {
    step!("even");
    x / 2
}

fn odd(x: i64) -> i64 {
    step!("odd");
    let y = x * 3;
    step!("odd");
    y + 1
}

impl Target for BranchTarget {
    type Input = String;
    type Output = i64;

    fn entrypoint(&self, input: &String) -> Result<i64, anyhow::Error> {
        step!();
        let x: i64 = input.trim().parse().context("input is not an integer")?;
        step!();
        if x % 2 == 0 {
            step!();
            Ok(even(x))
        } else {
            step!();
            Ok(odd(x))
        }
    }

    fn initial_corpus(&self) -> Vec<String> {
        vec!["0".to_string()]
    }
}

/// Like [`BranchTarget`], but the two branches share no step at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisjointTarget;

impl Target for DisjointTarget {
    type Input = u64;
    type Output = ();

    fn entrypoint(&self, input: &u64) -> Result<(), anyhow::Error> {
        if input % 2 == 0 {
            step!("left", 1);
            step!("left", 2);
        } else {
            step!("right", 1);
            step!("right", 2);
            step!("right", 3);
        }
        Ok(())
    }

    fn initial_corpus(&self) -> Vec<u64> {
        vec![0, 1]
    }
}

/// Takes a few steps and then panics on every input.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicTarget;

impl Target for PanicTarget {
    type Input = String;
    type Output = ();

    fn entrypoint(&self, input: &String) -> Result<(), anyhow::Error> {
        step!();
        step!();
        panic!("unconditional crash on {:?}", input);
    }

    fn initial_corpus(&self) -> Vec<String> {
        vec!["seed".to_string()]
    }
}

/// Reports a fixed sequence of steps, independent of the input.
#[derive(Debug, Clone, Default)]
pub struct ReplayTarget {
    pub steps: Vec<(&'static str, u32)>,
}

impl Target for ReplayTarget {
    type Input = ();
    type Output = usize;

    fn entrypoint(&self, _input: &()) -> Result<usize, anyhow::Error> {
        for (context, position) in &self.steps {
            step!(*context, *position);
        }
        Ok(self.steps.len())
    }

    fn initial_corpus(&self) -> Vec<()> {
        vec![()]
    }
}
