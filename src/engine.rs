use crate::algorithms;
use crate::config::{Algorithm, Config};
use crate::model::{Agent, MovePattern, State};
use crate::stats::{self, DayRecord};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Uniform, weighted::WeightedIndex};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    f64::consts::TAU,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Index distance covered by the local neighborhood of the contact graph.
const NEIGHBORHOOD_SPAN: usize = 5;

/// Share of `contacts_per_day` turned into random long-range links.
const LONG_RANGE_FRACTION: f64 = 0.3;

const MOVE_PATTERNS: [MovePattern; 3] =
    [MovePattern::Normal, MovePattern::Static, MovePattern::Explorer];
const MOVE_PATTERN_WEIGHTS: [f64; 3] = [0.7, 0.15, 0.15];

/// Simulation engine.
///
/// Holds the configuration, current state, and random number generator, and
/// provides methods to initialize, step, run, save, and load simulations.
/// One call to [`Engine::step`] is one atomic simulated day: movement first,
/// then the selected transition rule, then a statistics append.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    state: State,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` with the given configuration and a randomized
    /// initial population.
    pub fn generate_initial_condition(cfg: Config) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;

        let mut rng = match cfg.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let x_dist = Uniform::new(0.0, cfg.arena_width)?;
        let y_dist = Uniform::new(0.0, cfg.arena_height)?;
        let speed_dist = Uniform::new(0.5, 2.0)?;
        let heading_dist = Uniform::new(0.0, TAU)?;
        let pattern_dist = WeightedIndex::new(MOVE_PATTERN_WEIGHTS)?;

        let mut agents = Vec::with_capacity(cfg.population_size);
        for id in 0..cfg.population_size {
            agents.push(Agent::new(
                id,
                x_dist.sample(&mut rng),
                y_dist.sample(&mut rng),
                speed_dist.sample(&mut rng),
                heading_dist.sample(&mut rng),
                MOVE_PATTERNS[pattern_dist.sample(&mut rng)],
            ));
        }

        let all_ids: Vec<usize> = (0..agents.len()).collect();
        for &id in all_ids.choose_multiple(&mut rng, cfg.initial_infected) {
            if cfg.algorithm == Algorithm::Seir {
                agents[id].exposed = true;
                agents[id].exposure_days = 0;
            } else {
                agents[id].infect();
            }
        }

        if cfg.algorithm == Algorithm::Network {
            build_contact_network(&cfg, &mut agents, &mut rng);
        }

        let history = vec![stats::census(0, &agents)];
        let state = State {
            day: 0,
            agents,
            history,
        };

        Ok(Self { cfg, state, rng })
    }

    /// Advance exactly one simulated day and return its statistics record.
    pub fn step(&mut self) -> DayRecord {
        let bounds = self.cfg.arena();
        for agent in &mut self.state.agents {
            agent.step(bounds, &mut self.rng);
        }

        algorithms::run_day(&self.cfg, &mut self.state.agents, &mut self.rng);

        self.state.day += 1;
        let record = stats::census(self.state.day, &self.state.agents);
        self.state.history.push(record);
        record
    }

    /// Advance `days` days and return the full ordered history.
    pub fn run(&mut self, days: usize) -> &[DayRecord] {
        for _ in 0..days {
            self.step();
        }
        &self.state.history
    }

    /// Perform one invocation's worth of days and append each day's record
    /// to a trajectory file.
    ///
    /// The first invocation of a run also writes the day-0 snapshot.
    pub fn perform_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        if self.state.day == 0 {
            encode::write(&mut writer, &self.state.history[0])
                .context("failed to serialize day record")?;
        }

        for i_day in 0..self.cfg.simulation_days {
            let record = self.step();
            encode::write(&mut writer, &record).context("failed to serialize day record")?;

            let progress = 100.0 * (i_day + 1) as f64 / self.cfg.simulation_days as f64;
            log::info!("completed {progress:06.2}%");
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    /// Mutable configuration handle for an external controller.
    ///
    /// The intervention fields are read fresh on every day step, so changes
    /// made between days take effect on the next step.
    pub fn cfg_mut(&mut self) -> &mut Config {
        &mut self.cfg
    }

    /// Read-only view of the live population.
    pub fn agents(&self) -> &[Agent] {
        &self.state.agents
    }

    /// The per-day statistics history, day 0 first.
    pub fn history(&self) -> &[DayRecord] {
        &self.state.history
    }

    pub fn day(&self) -> usize {
        self.state.day
    }
}

/// Connect each agent to its index neighborhood plus a few random
/// long-range contacts (a small-world graph). Long-range links are mirrored
/// onto both endpoints; the graph never changes after construction.
fn build_contact_network<R: Rng>(cfg: &Config, agents: &mut [Agent], rng: &mut R) {
    let n = agents.len();

    for i in 0..n {
        let lo = i.saturating_sub(NEIGHBORHOOD_SPAN);
        let hi = (i + NEIGHBORHOOD_SPAN).min(n - 1);
        for j in lo..=hi {
            if j != i {
                agents[i].connections.push(j);
            }
        }
    }

    let long_range = (LONG_RANGE_FRACTION * cfg.contacts_per_day as f64) as usize;
    if long_range == 0 {
        return;
    }

    for i in 0..n {
        let candidates: Vec<usize> = (0..n)
            .filter(|&j| j != i && !agents[i].connections.contains(&j))
            .collect();

        let chosen: Vec<usize> = candidates.choose_multiple(rng, long_range).copied().collect();
        for j in chosen {
            agents[i].connections.push(j);
            if !agents[j].connections.contains(&i) {
                agents[j].connections.push(i);
            }
        }
    }
}
