//! Per-tick resolution log

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::geometry::Direction;
use super::particle::ParticleId;
use super::state::PlayerId;

/// One move or collision resolved during a tick, in the order it happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Moved {
        player: PlayerId,
        particle: ParticleId,
        from: IVec2,
        direction: Direction,
    },
    /// Moved and left stranded neighbors following it
    Led {
        player: PlayerId,
        particle: ParticleId,
        from: IVec2,
        direction: Direction,
        followers: Vec<ParticleId>,
    },
    /// Ran into its own blob and passed pressure forward
    Pushed {
        player: PlayerId,
        particle: ParticleId,
        blocker: ParticleId,
        direction: Direction,
    },
    WallCollision {
        player: PlayerId,
        particle: ParticleId,
        direction: Direction,
    },
    HostileCollision {
        player: PlayerId,
        particle: ParticleId,
        hostile_player: PlayerId,
        hostile_particle: ParticleId,
        direction: Direction,
    },
}

impl SimEvent {
    /// The acting particle
    pub fn actor(&self) -> (PlayerId, ParticleId) {
        match *self {
            SimEvent::Moved { player, particle, .. }
            | SimEvent::Led { player, particle, .. }
            | SimEvent::Pushed { player, particle, .. }
            | SimEvent::WallCollision { player, particle, .. }
            | SimEvent::HostileCollision { player, particle, .. } => (player, particle),
        }
    }

    /// True if the actor changed cell
    pub fn is_move(&self) -> bool {
        matches!(self, SimEvent::Moved { .. } | SimEvent::Led { .. })
    }
}
