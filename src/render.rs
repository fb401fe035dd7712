//! Render snapshot
//!
//! Flattens the simulation into per-particle instance records a GPU renderer
//! can upload as-is. Read-only; call between ticks.

use bytemuck::{Pod, Zeroable};

use crate::sim::{PlayerId, SimState};

/// One particle as drawn: grid cell, player color, health and selection flag
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub player: u32,
    pub health: f32,
    /// 1 if inside the selection circle
    pub selected: u32,
}

/// Player colors, cycled by id
pub mod colors {
    pub const PLAYERS: [[f32; 4]; 6] = [
        [0.2, 0.8, 0.4, 1.0],
        [0.9, 0.3, 0.3, 1.0],
        [0.3, 0.5, 1.0, 1.0],
        [0.95, 0.8, 0.2, 1.0],
        [0.7, 0.35, 0.9, 1.0],
        [0.2, 0.85, 0.85, 1.0],
    ];
}

pub fn player_color(player: PlayerId) -> [f32; 4] {
    colors::PLAYERS[player as usize % colors::PLAYERS.len()]
}

impl SimState {
    /// Every particle of every blob, in player then particle id order
    pub fn instances(&self) -> Vec<ParticleInstance> {
        let radius_sq = self.selection.radius * self.selection.radius;
        let mut instances = Vec::with_capacity(self.particle_count());
        for (player, blob) in self.blobs() {
            let color = player_color(player);
            for particle in blob.state().iter() {
                let position = particle.position().as_vec2();
                let selected = (position - self.selection.center).length_squared() <= radius_sq;
                instances.push(ParticleInstance {
                    position: position.to_array(),
                    color,
                    player,
                    health: particle.health_fraction(),
                    selected: selected as u32,
                });
            }
        }
        instances
    }

    /// `instances()` as raw bytes for a vertex/instance buffer
    pub fn instance_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.instances()).to_vec()
    }
}
