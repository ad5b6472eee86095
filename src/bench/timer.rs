//! Timed operation runner
//!
//! Wall-clock timing on the monotonic clock, for a single operation or
//! for N repetitions of one.

use crate::Result;
use std::time::{Duration, Instant};

/// Value produced by a timed operation together with how long it took
#[derive(Debug, Clone)]
pub struct Timed<T> {
    pub value: T,
    pub elapsed: Duration,
}

/// Run `op` once and measure it
pub fn time<T, F>(op: F) -> Result<Timed<T>>
where
    F: FnOnce() -> Result<T>,
{
    let start = Instant::now();
    let value = op()?;
    Ok(Timed {
        value,
        elapsed: start.elapsed(),
    })
}

/// Run `op` `repetitions` times, timing each call separately.
/// `op` receives the zero-based repetition index. Stops at the first error.
pub fn run_timed<T, F>(repetitions: usize, mut op: F) -> Result<Vec<Timed<T>>>
where
    F: FnMut(usize) -> Result<T>,
{
    let mut results = Vec::with_capacity(repetitions);
    for i in 0..repetitions {
        results.push(time(|| op(i))?);
    }
    Ok(results)
}

/// Per-operation latency recorder for loops that time many tiny I/Os
#[derive(Debug, Default)]
pub struct LatencyRecorder {
    samples: Vec<Duration>,
}

impl LatencyRecorder {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            samples: Vec::with_capacity(n),
        }
    }

    /// Time one operation and keep the sample
    pub fn record<T, F>(&mut self, op: F) -> std::io::Result<T>
    where
        F: FnOnce() -> std::io::Result<T>,
    {
        let start = Instant::now();
        let value = op()?;
        self.samples.push(start.elapsed());
        Ok(value)
    }

    pub fn samples(&self) -> &[Duration] {
        &self.samples
    }
}
