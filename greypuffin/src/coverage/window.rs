use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::coverage::{Signature, StepLocation};
use crate::error::Error;

/// Number of steps summarized by one signature. Between 1 and [`WindowSize::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct WindowSize(usize);

impl WindowSize {
    pub const DEFAULT: usize = 200;
    /// Every execution allocates a ring of this many steps up front
    pub const MAX: usize = 1 << 16;

    pub fn new(size: usize) -> Result<Self, Error> {
        if size == 0 {
            return Err(Error::Config(
                "window size must be at least 1, a window of 0 steps yields no feedback".into(),
            ));
        }
        if size > Self::MAX {
            return Err(Error::Config(format!(
                "window size {} exceeds the maximum of {} steps",
                size,
                Self::MAX
            )));
        }
        Ok(Self(size))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<usize> for WindowSize {
    type Error = Error;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        Self::new(size)
    }
}

impl From<WindowSize> for usize {
    fn from(size: WindowSize) -> Self {
        size.0
    }
}

/// Bounded FIFO over the most recent steps of one execution.
///
/// The ring is allocated once with the window capacity and never grows. Every push yields the
/// signature of the window contents after the push, also while the window is still filling up.
#[derive(Debug, Clone)]
pub struct SignatureWindow {
    entries: VecDeque<StepLocation>,
    capacity: usize,
}

impl SignatureWindow {
    pub fn new(size: WindowSize) -> Self {
        Self {
            entries: VecDeque::with_capacity(size.get()),
            capacity: size.get(),
        }
    }

    pub fn push(&mut self, step: StepLocation) -> Signature {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(step);

        Signature::of(&self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
