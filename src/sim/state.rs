//! Simulation state: every player's blob plus the arena
//!
//! Commands and blob creation go through here between ticks; `advance` runs a
//! tick (see `tick.rs`).

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use glam::{IVec2, Vec2};

use super::blob::Blob;
use super::events::SimEvent;
use super::particle::ParticleId;
use crate::command::{Command, CommandOutcome};
use crate::config::SimConfig;

pub type PlayerId = u32;

/// UI selection circle, in grid units. Has no effect on the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub center: Vec2,
    pub radius: f32,
}

/// Complete simulation state (deterministic, no RNG)
#[derive(Debug, Clone)]
pub struct SimState {
    pub(super) config: SimConfig,
    pub(super) width: u32,
    pub(super) height: u32,
    /// Ordered by player id for deterministic iteration
    pub(super) blobs: BTreeMap<PlayerId, Blob>,
    pub selection: Selection,
    pub(super) tick_count: u64,
}

impl SimState {
    /// Empty arena of `width` x `height` cells
    ///
    /// # Panics
    /// If either dimension is zero or `config` fails `SimConfig::validate`.
    pub fn new(width: u32, height: u32, config: SimConfig) -> Self {
        assert!(width > 0 && height > 0, "arena must be non-empty, got {width}x{height}");
        if let Err(err) = config.validate() {
            panic!("invalid config: {err:#}");
        }
        let selection = Selection {
            center: Vec2::new(width as f32, height as f32) / 2.0,
            radius: config.selection_radius,
        };
        Self {
            config,
            width,
            height,
            blobs: BTreeMap::new(),
            selection,
            tick_count: 0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn in_bounds(&self, position: IVec2) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as u32) < self.width
            && (position.y as u32) < self.height
    }

    /// Create an empty blob for `player`, replacing any existing one
    pub fn emplace_blob(&mut self, player: PlayerId) -> &mut Blob {
        let blob = Blob::new(self.config.max_health);
        self.insert_blob(player, blob)
    }

    /// Create a disc-seeded blob for `player`, replacing any existing one.
    ///
    /// Cells already held by other players are left out.
    pub fn emplace_blob_circle(&mut self, player: PlayerId, center: IVec2, radius: f32) -> &mut Blob {
        let blob = Blob::circle_where(
            center,
            radius,
            self.width,
            self.height,
            self.config.max_health,
            |cell| {
                !self
                    .blobs
                    .iter()
                    .any(|(&other, blob)| other != player && blob.state().is_occupied(cell))
            },
        );
        self.insert_blob(player, blob)
    }

    fn insert_blob(&mut self, player: PlayerId, blob: Blob) -> &mut Blob {
        log::info!("Player {player} blob created with {} particles", blob.len());
        match self.blobs.entry(player) {
            Entry::Occupied(mut entry) => {
                log::warn!("Player {player} already had a blob; replacing it");
                entry.insert(blob);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(blob),
        }
    }

    pub fn blob(&self, player: PlayerId) -> Option<&Blob> {
        self.blobs.get(&player)
    }

    pub fn blob_mut(&mut self, player: PlayerId) -> Option<&mut Blob> {
        self.blobs.get_mut(&player)
    }

    /// Read-only view for renderers, in player id order
    pub fn blobs(&self) -> impl Iterator<Item = (PlayerId, &Blob)> {
        self.blobs.iter().map(|(&player, blob)| (player, blob))
    }

    pub fn particle_count(&self) -> usize {
        self.blobs.values().map(Blob::len).sum()
    }

    /// Send `player`'s whole blob toward `position`. False if the player has no blob.
    pub fn set_target(&mut self, player: PlayerId, position: IVec2, pressure: f32) -> bool {
        match self.blobs.get_mut(&player) {
            Some(blob) => {
                blob.set_target(position, pressure);
                log::debug!("Player {player} target set to {position} at pressure {pressure}");
                true
            }
            None => {
                log::warn!("Ignoring target for unknown player {player}");
                false
            }
        }
    }

    /// Particle of any player on `position`
    pub fn occupant(&self, position: IVec2) -> Option<(PlayerId, ParticleId)> {
        self.blobs
            .iter()
            .find_map(|(&player, blob)| blob.state().particle_at(position).map(|id| (player, id)))
    }

    /// Particle on `position` that does not belong to `player`
    pub fn hostile_at(&self, player: PlayerId, position: IVec2) -> Option<(PlayerId, ParticleId)> {
        self.blobs
            .iter()
            .filter(|&(&other, _)| other != player)
            .find_map(|(&other, blob)| blob.state().particle_at(position).map(|id| (other, id)))
    }

    pub fn select(&mut self, center: Vec2) {
        self.selection.center = center;
    }

    pub fn change_selection_radius(&mut self, delta: f32) {
        self.selection.radius = self
            .config
            .clamp_selection_radius(self.selection.radius + delta);
    }

    /// `player`'s particles inside the selection circle
    pub fn selected_particles(&self, player: PlayerId) -> Vec<ParticleId> {
        self.blobs
            .get(&player)
            .map(|blob| {
                blob.state()
                    .particles_in_radius(self.selection.center, self.selection.radius)
            })
            .unwrap_or_default()
    }

    /// Apply one input command. Must not be called mid-tick (enforced by `&mut self`).
    pub fn apply(&mut self, command: Command) -> CommandOutcome {
        log::debug!("Applying {command:?}");
        match command {
            Command::Exit => return CommandOutcome::Exit,
            Command::SelectParticles { center } => self.select(center),
            Command::SetTarget {
                player,
                position,
                pressure,
            } => {
                let pressure = pressure.unwrap_or(self.config.default_target_pressure);
                self.set_target(player, position, pressure);
            }
            Command::ChangeSelectionRadius { delta } => self.change_selection_radius(delta),
        }
        CommandOutcome::Continue
    }

    /// Run one tick; events are returned in resolution order
    pub fn advance(&mut self, dt: f32) -> Vec<SimEvent> {
        super::tick::tick(self, dt)
    }

    /// Check every blob's graph and that no two players share a cell
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen: BTreeMap<(i32, i32), PlayerId> = BTreeMap::new();
        for (&player, blob) in &self.blobs {
            blob.state().validate()?;
            for position in blob.state().positions() {
                if let Some(other) = seen.insert((position.x, position.y), player) {
                    anyhow::bail!("players {other} and {player} both occupy {position}");
                }
            }
        }
        Ok(())
    }
}
