use std::cmp;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::coverage::{CoverageFact, PathId, Signature};
use crate::error::Error;
use crate::execution::{ExecutionOutcome, TargetRunner};
use crate::fuzzer::mutations::{HasLen, Mutator};
use crate::fuzzer::schedule::{PowerSchedule, Seed};
use crate::fuzzer::stats::FuzzerStats;

/// Executions between two periodic stats lines
const STATS_INTERVAL: u64 = 5000;

/// A crashing input kept for later inspection. Only the first crash per path is kept.
#[derive(Debug, Clone)]
pub struct Crash<I> {
    pub input: I,
    pub message: String,
    pub coverage: CoverageFact,
}

/// What a single fuzzing step produced.
#[derive(Debug)]
pub struct RunReport<I, O> {
    pub input: I,
    pub outcome: ExecutionOutcome<O>,
    pub coverage: CoverageFact,
    /// The set of signatures was never observed before and the input joined the population
    pub new_coverage: bool,
    /// Signatures observed for the first time in this session
    pub new_signatures: usize,
}

/// Limits of a fuzzing session. Whichever is reached first ends it.
#[derive(Debug, Clone, Default)]
pub struct Budget {
    pub max_iters: Option<u64>,
    pub max_duration: Option<Duration>,
    pub stop_on_crash: bool,
}

impl Budget {
    fn exhausted(&self, iters: u64, started: Instant) -> bool {
        self.max_iters.map_or(false, |max| iters >= max)
            || self
                .max_duration
                .map_or(false, |max| started.elapsed() >= max)
    }
}

/// Counting greybox fuzzer: runs the seeds first, then mutates population entries picked by the
/// power schedule. An input joins the population when the set of signatures it covered is new.
pub struct GreyboxFuzzer<I, M, S> {
    seeds: Vec<I>,
    seed_index: usize,
    mutator: M,
    schedule: S,
    rng: StdRng,
    population: Vec<Seed<I>>,
    coverages_seen: HashSet<PathId>,
    signatures_seen: HashSet<Signature>,
    crash_paths: HashSet<PathId>,
    crashes: Vec<Crash<I>>,
    stats: FuzzerStats,
    started: Instant,
}

impl<I, M, S> GreyboxFuzzer<I, M, S>
where
    I: Clone + HasLen,
    M: Mutator<I>,
    S: PowerSchedule,
{
    pub fn new(
        seeds: Vec<I>,
        mutator: M,
        schedule: S,
        static_seed: Option<u64>,
    ) -> Result<Self, Error> {
        if seeds.is_empty() {
            return Err(Error::Config("the initial corpus is empty".into()));
        }

        let rng = match static_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            seeds,
            seed_index: 0,
            mutator,
            schedule,
            rng,
            population: Vec::new(),
            coverages_seen: HashSet::new(),
            signatures_seen: HashSet::new(),
            crash_paths: HashSet::new(),
            crashes: Vec::new(),
            stats: FuzzerStats::default(),
            started: Instant::now(),
        })
    }

    pub fn population(&self) -> &[Seed<I>] {
        &self.population
    }

    pub fn crashes(&self) -> &[Crash<I>] {
        &self.crashes
    }

    pub fn schedule(&self) -> &S {
        &self.schedule
    }

    pub fn into_crashes(self) -> Vec<Crash<I>> {
        self.crashes
    }

    pub fn signatures_seen(&self) -> &HashSet<Signature> {
        &self.signatures_seen
    }

    /// Stats as of the last [`GreyboxFuzzer::refresh_stats`]. The execution counters are always
    /// current.
    pub fn stats(&self) -> &FuzzerStats {
        &self.stats
    }

    pub fn refresh_stats(&mut self) {
        self.stats.population = self.population.len();
        self.stats.paths = self.schedule.path_frequency().len();
        self.stats.signatures = self.signatures_seen.len();
        self.stats.set_elapsed(self.started.elapsed());
    }

    /// Next input to execute: the seeds in order, then mutated population entries.
    pub fn fuzz(&mut self) -> Result<I, Error> {
        if let Some(seed) = self.seeds.get(self.seed_index) {
            self.seed_index += 1;
            return Ok(seed.clone());
        }
        self.create_candidate()
    }

    fn create_candidate(&mut self) -> Result<I, Error> {
        let mut candidate = if self.population.is_empty() {
            // Every seed hit an engine error, so nothing has been admitted yet
            let index = self.rng.gen_range(0..self.seeds.len());
            self.seeds[index].clone()
        } else {
            let index = self.schedule.choose(&mut self.rng, &mut self.population)?;
            self.population[index].data.clone()
        };

        let max_trials = 1usize << self.rng.gen_range(1..=5u32);
        let trials = cmp::max(1, cmp::min(candidate.len(), max_trials));
        for _ in 0..trials {
            candidate = self.mutator.mutate(&mut self.rng, &candidate);
        }
        Ok(candidate)
    }

    /// Produces one input, executes it and updates the population.
    pub fn run<R>(&mut self, runner: &R) -> Result<RunReport<I, R::Output>, Error>
    where
        R: TargetRunner<Input = I>,
    {
        let input = self.fuzz()?;
        let execution = match runner.run(&input) {
            Ok(execution) => execution,
            Err(err) => {
                self.stats.engine_errors += 1;
                return Err(err);
            }
        };
        let coverage = execution.coverage;
        let outcome = execution.outcome;

        self.stats.executions += 1;
        self.stats.steps.update(coverage.total_hits());
        self.stats.coverage.update(coverage.len() as u64);
        self.schedule.observe(&coverage);

        let new_signatures = coverage.unseen(&self.signatures_seen).count();
        if new_signatures > 0 {
            self.signatures_seen.extend(coverage.signatures().copied());
        }

        let new_coverage = self.coverages_seen.insert(coverage.path_id());
        if new_coverage {
            debug!(
                "New coverage: {} signatures, {} seen for the first time",
                coverage.len(),
                new_signatures
            );
            self.population.push(Seed::new(input.clone(), coverage.clone()));
        }

        if let ExecutionOutcome::Failure(failure) = &outcome {
            self.stats.crashes += 1;
            if self.crash_paths.insert(coverage.path_id()) {
                info!("Found crash #{}: {}", self.crashes.len() + 1, failure);
                self.crashes.push(Crash {
                    input: input.clone(),
                    message: failure.message(),
                    coverage: coverage.clone(),
                });
            }
        }

        Ok(RunReport {
            input,
            outcome,
            coverage,
            new_coverage,
            new_signatures,
        })
    }

    /// Runs until the budget is exhausted. Engine errors skip the affected input, every other
    /// error ends the session.
    pub fn fuzz_loop<R>(&mut self, runner: &R, budget: &Budget) -> Result<FuzzerStats, Error>
    where
        R: TargetRunner<Input = I>,
    {
        let started = Instant::now();
        let mut iters = 0;

        while !budget.exhausted(iters, started) {
            iters += 1;

            match self.run(runner) {
                Ok(report) => {
                    if budget.stop_on_crash && report.outcome.is_failure() {
                        info!("Stopping after the first crash");
                        break;
                    }
                }
                Err(Error::Engine(msg)) => {
                    warn!("Skipping input after engine error: {}", msg);
                }
                Err(err) => return Err(err),
            }

            if iters % STATS_INTERVAL == 0 {
                self.refresh_stats();
                self.stats.log("heartbeat");
            }
        }

        self.refresh_stats();
        self.stats.log("done");
        Ok(self.stats.clone())
    }
}
