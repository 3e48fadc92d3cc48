use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Daily transition rule applied to the population.
///
/// Selected once at construction by name; unknown names fall back to
/// [`Algorithm::Standard`] rather than failing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Algorithm {
    #[default]
    Standard,
    Sir,
    Seir,
    Network,
}

impl Algorithm {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "standard" => Self::Standard,
            "sir" => Self::Sir,
            "seir" => Self::Seir,
            "network" => Self::Network,
            _ => {
                log::warn!("unknown algorithm {name:?}, falling back to \"standard\"");
                Self::Standard
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Sir => "SIR",
            Self::Seir => "SEIR",
            Self::Network => "network",
        }
    }
}

impl From<String> for Algorithm {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<Algorithm> for String {
    fn from(algorithm: Algorithm) -> Self {
        algorithm.name().to_string()
    }
}

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use; see
/// [`Config::from_file`]. The intervention fields (`social_distancing`,
/// `quarantine_infected`, `vaccination_rate`) may be mutated between days by
/// an external controller; the engine reads them fresh on every pass.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of agents in the population.
    pub population_size: usize,
    /// Number of agents infected (exposed, under SEIR) at day 0.
    pub initial_infected: usize,

    /// Probability of infection on contact, before the distance falloff.
    pub infection_rate: f64,
    /// Daily recovery probability while infected.
    pub recovery_rate: f64,
    /// Daily death probability while infected.
    pub mortality_rate: f64,
    /// Days of immunity after recovery.
    pub immunity_period: u32,

    /// Mean number of daily contacts per agent.
    pub contacts_per_day: usize,
    #[serde(default)]
    pub social_distancing: bool,
    #[serde(default)]
    pub quarantine_infected: bool,

    /// Percentage of the susceptible population offered a vaccine each day.
    #[serde(default)]
    pub vaccination_rate: f64,
    /// Probability that an offered dose takes.
    #[serde(default)]
    pub vaccination_effectiveness: f64,

    #[serde(default)]
    pub algorithm: Algorithm,

    /// Days simulated per run invocation.
    pub simulation_days: usize,

    #[serde(default = "default_arena_dim")]
    pub arena_width: f64,
    #[serde(default = "default_arena_dim")]
    pub arena_height: f64,

    /// Seed for reproducible runs; seeded from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_arena_dim() -> f64 {
    100.0
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized, or if the
    /// configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Validate the population and day counts.
    ///
    /// The rate fields are conventionally in 0..1 but deliberately not
    /// enforced; out-of-range values saturate in the probability draws.
    pub fn validate(&self) -> Result<()> {
        check_num(self.population_size, 1..1_000_000).context("invalid population size")?;
        check_num(self.initial_infected, 0..=self.population_size)
            .context("invalid initial infected count")?;
        check_num(self.simulation_days, 1..1_000_000).context("invalid number of days")?;
        check_num(self.contacts_per_day, 0..100_000).context("invalid contacts per day")?;
        check_num(self.arena_width, 1.0..1e6).context("invalid arena width")?;
        check_num(self.arena_height, 1.0..1e6).context("invalid arena height")?;

        Ok(())
    }

    pub fn arena(&self) -> (f64, f64) {
        (self.arena_width, self.arena_height)
    }

    /// Whether `other` agrees on every field that is fixed for the lifetime
    /// of a run. The intervention fields are exempt: they are meant to be
    /// toggled between days.
    pub fn core_matches(&self, other: &Config) -> bool {
        let mut aligned = self.clone();
        aligned.adopt_interventions(other);
        aligned == *other
    }

    /// Copy the externally mutable intervention fields from `other`.
    pub fn adopt_interventions(&mut self, other: &Config) {
        self.social_distancing = other.social_distancing;
        self.quarantine_infected = other.quarantine_infected;
        self.vaccination_rate = other.vaccination_rate;
        self.vaccination_effectiveness = other.vaccination_effectiveness;
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
