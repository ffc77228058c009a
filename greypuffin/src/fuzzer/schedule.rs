use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::coverage::{CoverageFact, PathId};
use crate::error::Error;

/// A corpus entry together with the coverage it exercised when it was added.
#[derive(Debug, Clone)]
pub struct Seed<I> {
    pub data: I,
    pub coverage: CoverageFact,
    pub energy: f64,
    path: PathId,
}

impl<I> Seed<I> {
    pub fn new(data: I, coverage: CoverageFact) -> Self {
        let path = coverage.path_id();
        Self {
            data,
            coverage,
            energy: 0.0,
            path,
        }
    }

    pub fn path(&self) -> PathId {
        self.path
    }
}

/// How often each path was exercised during the session.
#[derive(Debug, Default, Clone)]
pub struct PathFrequency {
    counts: HashMap<PathId, u64>,
}

impl PathFrequency {
    pub fn increment(&mut self, path: PathId) -> u64 {
        let count = self.counts.entry(path).or_insert(0);
        *count += 1;
        *count
    }

    pub fn get(&self, path: &PathId) -> u64 {
        self.counts.get(path).copied().unwrap_or(0)
    }

    /// Number of distinct paths
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Energies scaled to sum up to one.
pub fn normalized_energy<I>(population: &[Seed<I>]) -> Result<Vec<f64>, Error> {
    let sum: f64 = population.iter().map(|seed| seed.energy).sum();
    if !(sum.is_finite() && sum > 0.0) {
        return Err(Error::Schedule(format!(
            "total energy of {} seeds is {}",
            population.len(),
            sum
        )));
    }
    Ok(population.iter().map(|seed| seed.energy / sum).collect())
}

/// Decides which corpus entry is mutated next.
pub trait PowerSchedule {
    fn path_frequency(&self) -> &PathFrequency;

    fn path_frequency_mut(&mut self) -> &mut PathFrequency;

    fn assign_energy<I>(&self, population: &mut [Seed<I>]);

    /// Records that one more execution exercised the path of `coverage`.
    fn observe(&mut self, coverage: &CoverageFact) -> u64 {
        self.path_frequency_mut().increment(coverage.path_id())
    }

    /// Picks the index of the next seed, proportionally to its energy.
    fn choose<I, R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        population: &mut [Seed<I>],
    ) -> Result<usize, Error> {
        if population.is_empty() {
            return Err(Error::Schedule("population is empty".into()));
        }
        self.assign_energy(population);
        let weights = normalized_energy(population)?;
        let distribution =
            WeightedIndex::new(&weights).map_err(|err| Error::Schedule(err.to_string()))?;
        Ok(distribution.sample(rng))
    }
}

/// Every seed gets the same energy.
#[derive(Debug, Default, Clone)]
pub struct UniformSchedule {
    frequency: PathFrequency,
}

impl PowerSchedule for UniformSchedule {
    fn path_frequency(&self) -> &PathFrequency {
        &self.frequency
    }

    fn path_frequency_mut(&mut self) -> &mut PathFrequency {
        &mut self.frequency
    }

    fn assign_energy<I>(&self, population: &mut [Seed<I>]) {
        for seed in population {
            seed.energy = 1.0;
        }
    }
}

/// AFLFast-style exponential schedule: energy is `1 / frequency(path)^exponent`, so seeds on
/// rarely exercised paths are picked far more often.
#[derive(Debug, Clone)]
pub struct AflFastSchedule {
    exponent: f64,
    frequency: PathFrequency,
}

impl AflFastSchedule {
    pub const DEFAULT_EXPONENT: f64 = 5.0;

    pub fn new(exponent: f64) -> Result<Self, Error> {
        if !exponent.is_finite() || exponent < 0.0 {
            return Err(Error::Config(format!(
                "schedule exponent must be a non-negative number, got {}",
                exponent
            )));
        }
        Ok(Self {
            exponent,
            frequency: PathFrequency::default(),
        })
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    pub fn energy_of(&self, path: &PathId) -> f64 {
        // A seed always belongs to at least one execution, so 0 only shows up for foreign seeds
        let frequency = self.frequency.get(path).max(1) as f64;
        1.0 / frequency.powf(self.exponent)
    }
}

impl Default for AflFastSchedule {
    fn default() -> Self {
        Self {
            exponent: Self::DEFAULT_EXPONENT,
            frequency: PathFrequency::default(),
        }
    }
}

impl PowerSchedule for AflFastSchedule {
    fn path_frequency(&self) -> &PathFrequency {
        &self.frequency
    }

    fn path_frequency_mut(&mut self) -> &mut PathFrequency {
        &mut self.frequency
    }

    fn assign_energy<I>(&self, population: &mut [Seed<I>]) {
        for seed in population {
            seed.energy = self.energy_of(&seed.path);
        }
    }
}
