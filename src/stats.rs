use crate::model::{Agent, Status};
use serde::{Deserialize, Serialize};

/// Compartment counts for a single simulated day.
///
/// `exposed` is a sub-count of `susceptible`: SEIR-exposed agents keep the
/// `Susceptible` status, so `susceptible + infected + recovered + deceased`
/// always equals the population size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub day: usize,
    pub susceptible: usize,
    pub exposed: usize,
    pub infected: usize,
    pub recovered: usize,
    pub deceased: usize,
}

impl DayRecord {
    pub fn population(&self) -> usize {
        self.susceptible + self.infected + self.recovered + self.deceased
    }
}

/// Count the population by status.
pub fn census(day: usize, agents: &[Agent]) -> DayRecord {
    let mut record = DayRecord {
        day,
        susceptible: 0,
        exposed: 0,
        infected: 0,
        recovered: 0,
        deceased: 0,
    };

    for agent in agents {
        match agent.status() {
            Status::Susceptible => record.susceptible += 1,
            Status::Infected => record.infected += 1,
            Status::Recovered => record.recovered += 1,
            Status::Deceased => record.deceased += 1,
        }
        if agent.exposed() {
            record.exposed += 1;
        }
    }

    record
}

/// Streaming mean and standard deviation (Welford).
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: self.mean,
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}
