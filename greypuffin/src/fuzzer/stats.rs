use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

use log::info;
use serde::Serialize;

use crate::error::Error;

/// Smallest, largest and mean value of an observed quantity.
#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq)]
pub struct MinMaxMean {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    #[serde(skip)]
    samples: u64,
}

impl MinMaxMean {
    pub fn update(&mut self, value: u64) {
        if self.samples == 0 {
            self.min = value;
            self.max = value;
            self.mean = value as f64;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
            self.mean += (value as f64 - self.mean) / (self.samples + 1) as f64;
        }
        self.samples += 1;
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}

/// Counters of a fuzzing session. Serialized as one JSON object into the stats file.
#[derive(Debug, Default, Clone, Serialize)]
pub struct FuzzerStats {
    pub executions: u64,
    pub crashes: u64,
    pub engine_errors: u64,
    pub population: usize,
    pub paths: usize,
    pub signatures: usize,
    /// Seconds since the session started
    pub elapsed: f64,
    pub execs_per_sec: f64,
    /// Steps recorded per execution
    pub steps: MinMaxMean,
    /// Distinct signatures per execution
    pub coverage: MinMaxMean,
}

impl FuzzerStats {
    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed.as_secs_f64();
        self.execs_per_sec = if self.elapsed > 0.0 {
            self.executions as f64 / self.elapsed
        } else {
            0.0
        };
    }

    pub fn log(&self, event: &str) {
        info!(
            "[{}] executions: {}, exec/s: {:.1}, population: {}, paths: {}, signatures: {}, crashes: {}, engine errors: {}",
            event,
            self.executions,
            self.execs_per_sec,
            self.population,
            self.paths,
            self.signatures,
            self.crashes,
            self.engine_errors,
        );
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
