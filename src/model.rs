use crate::stats::DayRecord;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Number of immunity days granted by a successful vaccination.
///
/// Large enough to outlast any realistic run, so vaccine immunity is
/// effectively durable while still flowing through the ordinary waning
/// countdown.
pub const VACCINE_IMMUNITY_DAYS: u32 = 10_000;

/// Disease status of an agent.
///
/// Exactly one status holds at any time. `Deceased` is terminal. The SEIR
/// exposed sub-state is not a status: it is a flag layered on `Susceptible`
/// (see [`Agent::exposed`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Susceptible,
    Infected,
    Recovered,
    Deceased,
}

/// Movement pattern of an agent, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovePattern {
    Normal,
    Static,
    Explorer,
}

impl MovePattern {
    /// Probability of picking a fresh heading on a given tick.
    pub(crate) fn turn_probability(self) -> f64 {
        match self {
            Self::Normal => 0.10,
            Self::Static => 0.02,
            Self::Explorer => 0.30,
        }
    }

    /// Scale applied to the base speed drawn at creation.
    pub(crate) fn speed_factor(self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::Static => 0.3,
            Self::Explorer => 1.5,
        }
    }
}

/// Agent of the simulation.
///
/// Each agent carries its disease status and timers plus a position and
/// movement profile inside the arena. The `connections` adjacency list is
/// populated only when the network algorithm is selected and holds agent ids
/// into the population vector, never references.
#[derive(Clone, Serialize, Deserialize)]
pub struct Agent {
    id: usize,

    pub(crate) status: Status,
    pub(crate) exposed: bool,
    pub(crate) exposure_days: u32,
    pub(crate) days_infected: u32,
    pub(crate) immune_days: u32,

    pub(crate) x: f64,
    pub(crate) y: f64,
    speed: f64,
    heading: f64,
    pattern: MovePattern,

    pub(crate) connections: Vec<usize>,
}

impl Agent {
    pub(crate) fn new(
        id: usize,
        x: f64,
        y: f64,
        speed: f64,
        heading: f64,
        pattern: MovePattern,
    ) -> Self {
        Self {
            id,
            status: Status::Susceptible,
            exposed: false,
            exposure_days: 0,
            days_infected: 0,
            immune_days: 0,
            x,
            y,
            speed: speed * pattern.speed_factor(),
            heading,
            pattern,
            connections: Vec::new(),
        }
    }

    /// Advance the position by one tick.
    ///
    /// Deceased agents never move. The heading changes stochastically with a
    /// pattern-dependent probability; the step decomposes along the heading
    /// with a uniform length jitter and independent additive noise per axis.
    /// Infected agents move at 0.6 of their usual speed.
    ///
    /// Boundary handling clamps to the arena and reflects the heading with
    /// `pi - heading` on the x walls and `-heading` on the y walls. The
    /// resulting bounce is not a physically exact reflection; downstream
    /// behavior depends on this exact asymmetry.
    pub(crate) fn step<R: Rng>(&mut self, bounds: (f64, f64), rng: &mut R) {
        if self.status == Status::Deceased {
            return;
        }

        if rng.random::<f64>() < self.pattern.turn_probability() {
            self.heading = rng.random_range(0.0..TAU);
        }

        let slowdown = if self.status == Status::Infected { 0.6 } else { 1.0 };
        let step = self.speed * slowdown * rng.random_range(0.8..1.2);

        self.x += step * self.heading.cos() + rng.random_range(-0.2..0.2);
        self.y += step * self.heading.sin() + rng.random_range(-0.2..0.2);

        if self.x < 0.0 {
            self.x = 0.0;
            self.heading = PI - self.heading;
        } else if self.x > bounds.0 {
            self.x = bounds.0;
            self.heading = PI - self.heading;
        }

        if self.y < 0.0 {
            self.y = 0.0;
            self.heading = -self.heading;
        } else if self.y > bounds.1 {
            self.y = bounds.1;
            self.heading = -self.heading;
        }
    }

    /// Switch to `Infected` and reset the disease timers.
    pub(crate) fn infect(&mut self) {
        self.status = Status::Infected;
        self.days_infected = 0;
        self.exposed = false;
        self.exposure_days = 0;
    }

    pub(crate) fn distance_to(&self, other: &Agent) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn exposed(&self) -> bool {
        self.exposed
    }

    pub fn exposure_days(&self) -> u32 {
        self.exposure_days
    }

    pub fn days_infected(&self) -> u32 {
        self.days_infected
    }

    pub fn immune_days(&self) -> u32 {
        self.immune_days
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn connections(&self) -> &[usize] {
        &self.connections
    }
}

/// State of the simulation.
///
/// Contains the day counter, all agents (index = id), and the append-only
/// statistics history, with the day-0 snapshot at index 0.
#[derive(Serialize, Deserialize)]
pub struct State {
    pub day: usize,
    pub agents: Vec<Agent>,
    pub history: Vec<DayRecord>,
}
