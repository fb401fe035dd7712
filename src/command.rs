//! Input commands
//!
//! The input layer turns device events into these and hands them to
//! `SimState::apply` between ticks.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::sim::PlayerId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Stop the run
    Exit,
    /// Move the selection circle
    SelectParticles { center: Vec2 },
    /// Send a player's blob toward `position`; `None` uses the configured default pressure
    SetTarget {
        player: PlayerId,
        position: IVec2,
        pressure: Option<f32>,
    },
    /// Grow or shrink the selection circle
    ChangeSelectionRadius { delta: f32 },
}

/// Whether the caller should keep running after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Exit,
}
