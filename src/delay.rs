use rand::{
    distributions::{Distribution, Uniform},
    rngs::ThreadRng,
    thread_rng,
};

use std::{thread, time::Duration};

use crate::{Params, Region};

/// Source of service and idle times.
pub trait Delay {
    fn sample(&mut self, which: Region) -> Duration;

    fn sleep(&mut self, which: Region) {
        let d = self.sample(which);
        if !d.is_zero() {
            thread::sleep(d);
        }
    }
}

/// Exponentially distributed delays with means `muCS` and `muRem`
/// (milliseconds), drawn by inverse transform of a uniform sample.
pub struct Exponential {
    u: Uniform<f64>,
    rng: ThreadRng,
    mu_cs: f64,
    mu_rem: f64,
}

impl Exponential {
    pub fn new(params: &Params) -> Self {
        Self {
            u: Uniform::new(0.0, 1.0),
            rng: thread_rng(),
            mu_cs: params.mean(Region::In),
            mu_rem: params.mean(Region::Out),
        }
    }
}

impl Delay for Exponential {
    fn sample(&mut self, which: Region) -> Duration {
        let mean = match which {
            Region::In => self.mu_cs,
            Region::Out => self.mu_rem,
        };
        // 1 - u is in (0, 1], so the log stays finite.
        let ms = -(1.0 - self.u.sample(&mut self.rng)).ln() * mean;
        Duration::from_micros((ms * 1000.0) as u64)
    }
}

/// A fixed delay, the same on both sides of the critical section.
#[cfg(test)]
impl Delay for Duration {
    fn sample(&mut self, _: Region) -> Duration {
        *self
    }
}
