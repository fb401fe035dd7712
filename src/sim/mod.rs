//! Deterministic blob simulation
//!
//! All movement logic lives here. This module must stay pure and deterministic:
//! - Caller-supplied timestep only
//! - No RNG
//! - Stable iteration order (player id, then particle id)
//! - No rendering or platform dependencies

pub mod blob;
pub mod blob_state;
pub mod events;
pub mod geometry;
pub mod particle;
pub mod state;
pub mod tick;

pub use blob::{Blob, MoveOutcome};
pub use blob_state::BlobState;
pub use events::SimEvent;
pub use geometry::{Direction, GridVec};
pub use particle::{Particle, ParticleId, Target};
pub use state::{PlayerId, Selection, SimState};
pub use tick::tick;
