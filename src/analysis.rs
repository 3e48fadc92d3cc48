use crate::stats::{Accumulator, DayRecord};
use anyhow::{Context, Result};
use rmp_serde::decode;
use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind},
    path::Path,
};

/// An observable computed over the stream of saved day records.
pub trait Obs {
    fn update(&mut self, record: &DayRecord) -> Result<()>;
    fn report(&self) -> serde_json::Value;
}

/// Highest infected count seen, and the day it occurred.
pub struct PeakInfected {
    peak: usize,
    day: usize,
}

impl PeakInfected {
    pub fn new() -> Self {
        Self { peak: 0, day: 0 }
    }
}

impl Obs for PeakInfected {
    fn update(&mut self, record: &DayRecord) -> Result<()> {
        if record.infected > self.peak {
            self.peak = record.infected;
            self.day = record.day;
        }
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "peak_infected": { "count": self.peak, "day": self.day } })
    }
}

/// Mean fraction of the population infected across the run.
pub struct MeanPrevalence {
    acc: Accumulator,
}

impl MeanPrevalence {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for MeanPrevalence {
    fn update(&mut self, record: &DayRecord) -> Result<()> {
        self.acc
            .add(record.infected as f64 / record.population() as f64);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "mean_prevalence": self.acc.report() })
    }
}

/// Compartment counts on the last recorded day.
pub struct FinalToll {
    last: Option<DayRecord>,
}

impl FinalToll {
    pub fn new() -> Self {
        Self { last: None }
    }
}

impl Obs for FinalToll {
    fn update(&mut self, record: &DayRecord) -> Result<()> {
        self.last = Some(*record);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        match &self.last {
            Some(record) => serde_json::json!({ "final_toll": record }),
            None => serde_json::json!({ "final_toll": null }),
        }
    }
}

/// Runs every observable over the trajectory files of a run.
pub struct Analyzer {
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new() -> Self {
        let mut obs_ptr_vec: Vec<Box<dyn Obs>> = Vec::new();
        obs_ptr_vec.push(Box::new(PeakInfected::new()));
        obs_ptr_vec.push(Box::new(MeanPrevalence::new()));
        obs_ptr_vec.push(Box::new(FinalToll::new()));
        Self { obs_ptr_vec }
    }

    /// Feed every day record in a trajectory file to the observables.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        loop {
            match decode::from_read::<_, DayRecord>(&mut reader) {
                Ok(record) => {
                    for obs in &mut self.obs_ptr_vec {
                        obs.update(&record).context("failed to update observable")?;
                    }
                }
                Err(decode::Error::InvalidMarkerRead(err))
                    if err.kind() == ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(err) => return Err(err).context("failed to read day record"),
            }
        }
        Ok(())
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);

        let reports: Vec<_> = self.obs_ptr_vec.iter().map(|obs| obs.report()).collect();
        serde_json::to_writer_pretty(writer, &reports)?;
        Ok(())
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: usize, infected: usize) -> DayRecord {
        DayRecord {
            day,
            susceptible: 100 - infected,
            exposed: 0,
            infected,
            recovered: 0,
            deceased: 0,
        }
    }

    #[test]
    fn peak_tracks_the_first_maximum() {
        let mut obs = PeakInfected::new();
        for (day, infected) in [(0, 1), (1, 40), (2, 40), (3, 12)] {
            obs.update(&record(day, infected)).unwrap();
        }

        assert_eq!(
            obs.report(),
            serde_json::json!({ "peak_infected": { "count": 40, "day": 1 } })
        );
    }
}
