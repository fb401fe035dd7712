//! Pressure Blobs - grid blobs that move as emergent groups
//!
//! Core modules:
//! - `sim`: Deterministic simulation (particles, blobs, tick driver)
//! - `config`: Immutable tunables
//! - `command`: Input commands applied between ticks
//! - `render`: GPU-ready snapshot of particle positions
//! - `scenario`: Seeded scripted commands for headless runs

pub mod command;
pub mod config;
pub mod render;
pub mod scenario;
pub mod sim;

pub use command::{Command, CommandOutcome};
pub use config::SimConfig;
pub use render::ParticleInstance;
pub use scenario::Scenario;
pub use sim::{SimEvent, SimState};

/// Run defaults
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Arena dimensions in cells
    pub const ARENA_WIDTH: u32 = 160;
    pub const ARENA_HEIGHT: u32 = 90;

    /// Seed radius of each player's starting blob
    pub const START_BLOB_RADIUS: f32 = 8.0;

    /// Headless run length and command cadence
    pub const DEFAULT_TICKS: u64 = 600;
    pub const RETARGET_INTERVAL: u64 = 120;
}
