//! Particle: a single grid cell of a blob
//!
//! Particles never hold references to each other. Neighbor, leader and
//! follower links are `ParticleId` handles resolved through the owning
//! `BlobState`, so any operation touching more than one particle lives there.

use std::collections::BTreeSet;

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use super::geometry::Direction;

/// Stable handle of a particle within its blob. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleId(pub u32);

impl ParticleId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Commanded destination and the pressure magnitude to push toward it with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub position: IVec2,
    pub pressure: f32,
}

#[derive(Debug, Clone)]
pub struct Particle {
    id: ParticleId,
    pub(crate) position: IVec2,
    pub(crate) pressure: Vec2,
    target: Option<Target>,
    /// Indexed by `Direction::index`
    pub(crate) neighbors: [Option<ParticleId>; 4],
    pub(crate) leaders: BTreeSet<ParticleId>,
    pub(crate) followers: BTreeSet<ParticleId>,
    /// Side the current followers are expected to close the gap from
    pub(crate) bubble_direction: Option<Direction>,
    health: u32,
    max_health: u32,
}

impl Particle {
    pub(crate) fn new(id: ParticleId, position: IVec2, max_health: u32) -> Self {
        Self {
            id,
            position,
            pressure: Vec2::ZERO,
            target: None,
            neighbors: [None; 4],
            leaders: BTreeSet::new(),
            followers: BTreeSet::new(),
            bubble_direction: None,
            health: max_health,
            max_health,
        }
    }

    pub fn id(&self) -> ParticleId {
        self.id
    }

    pub fn position(&self) -> IVec2 {
        self.position
    }

    pub fn pressure(&self) -> Vec2 {
        self.pressure
    }

    pub fn target(&self) -> Option<Target> {
        self.target
    }

    pub fn neighbor(&self, direction: Direction) -> Option<ParticleId> {
        self.neighbors[direction.index()]
    }

    pub fn neighbors(&self) -> &[Option<ParticleId>; 4] {
        &self.neighbors
    }

    pub fn has_neighbor(&self) -> bool {
        self.neighbors.iter().any(Option::is_some)
    }

    pub fn leaders(&self) -> &BTreeSet<ParticleId> {
        &self.leaders
    }

    pub fn followers(&self) -> &BTreeSet<ParticleId> {
        &self.followers
    }

    pub fn bubble_direction(&self) -> Option<Direction> {
        self.bubble_direction
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Health in [0, 1] for rendering
    pub fn health_fraction(&self) -> f32 {
        self.health as f32 / self.max_health.max(1) as f32
    }

    /// Record a destination; takes effect on the next `advance`
    pub fn set_target(&mut self, position: IVec2, pressure: f32) {
        self.target = Some(Target { position, pressure });
    }

    pub fn clear_target(&mut self) {
        self.target = None;
    }

    pub(crate) fn add_pressure(&mut self, pressure: Vec2) {
        self.pressure += pressure;
    }

    /// Raw pressure gained toward the target over `dt`, before sharing with followers.
    ///
    /// Zero without a target or when already on it.
    pub fn target_increment(&self, dt: f32) -> Vec2 {
        let Some(target) = self.target else {
            return Vec2::ZERO;
        };
        let delta = target.position.as_vec2() - self.position.as_vec2();
        let distance = delta.length();
        if distance == 0.0 {
            return Vec2::ZERO;
        }
        delta * (target.pressure / distance) * dt
    }

    /// Portion of its own increment a particle keeps, given its follower count.
    ///
    /// Followers get `1 / (share + n)` each, the leader `share / (share + n)`.
    pub fn leader_share(&self, target_pressure_share: f32) -> f32 {
        target_pressure_share / (target_pressure_share + self.followers.len() as f32)
    }

    pub fn follower_share(&self, target_pressure_share: f32) -> f32 {
        1.0 / (target_pressure_share + self.followers.len() as f32)
    }

    /// Pressure on the stronger axis
    pub fn dominant_pressure(&self) -> f32 {
        self.pressure.x.abs().max(self.pressure.y.abs())
    }

    /// Ranking key for move priority
    pub fn mobility(&self) -> f32 {
        self.pressure.length()
    }

    /// Enough directed pressure, and no followers still closing a bubble behind it
    pub fn can_move(&self, min_directed_movement_pressure: f32) -> bool {
        self.followers.is_empty() && self.dominant_pressure() >= min_directed_movement_pressure
    }

    pub fn pressure_direction(&self) -> Direction {
        Direction::dominant(self.pressure)
    }

    /// Step one cell and spend a unit of pressure. Does not touch the neighbor graph.
    pub(crate) fn apply_move(&mut self, direction: Direction) {
        self.position += direction.vector();
        self.pressure -= direction.unit();
    }

    /// Zero the component pushing toward `direction`, leaving the opposite sign alone
    pub fn kill_pressure_in_direction(&mut self, direction: Direction) {
        match direction {
            Direction::East if self.pressure.x > 0.0 => self.pressure.x = 0.0,
            Direction::West if self.pressure.x < 0.0 => self.pressure.x = 0.0,
            Direction::South if self.pressure.y > 0.0 => self.pressure.y = 0.0,
            Direction::North if self.pressure.y < 0.0 => self.pressure.y = 0.0,
            _ => {}
        }
    }

    /// Remove `fraction` of the forward component and return it
    pub(crate) fn take_forward_pressure(&mut self, direction: Direction, fraction: f32) -> Vec2 {
        let unit = direction.unit();
        let forward = self.pressure.dot(unit);
        if forward <= 0.0 {
            return Vec2::ZERO;
        }
        let passed = unit * (forward * fraction);
        self.pressure -= passed;
        passed
    }

    /// Saturating; a particle at zero health stays registered
    pub fn damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
    }

    pub fn heal(&mut self, amount: u32) {
        self.health = self.health.saturating_add(amount).min(self.max_health);
    }
}
