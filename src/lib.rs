//! Agent-based simulation of epidemic spread through a mobile population.
//!
//! The engine advances a fixed population one day at a time: every agent
//! moves, one of four interchangeable transition rules (contact-distance,
//! SIR, SEIR, or a fixed contact network) applies the day's disease
//! dynamics, and a compartment census is appended to the run history. An
//! external renderer or controller can step the [`engine::Engine`] one day
//! at a time, read the live agent list, and toggle the intervention fields
//! between days.

mod algorithms;

pub mod analysis;
pub mod config;
pub mod engine;
pub mod manager;
pub mod model;
pub mod stats;
