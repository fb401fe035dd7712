//! Blob movement policy
//!
//! A blob never translates as a rigid body. Each particle steps on its own;
//! when a step would strand a neighbor, the neighbor is made a follower of the
//! moving particle and the leader waits until the gap behind it is closed.

use glam::IVec2;

use super::blob_state::BlobState;
use super::geometry::Direction;
use super::particle::ParticleId;
use crate::config::SimConfig;

/// What `handle_particle` did with a step request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Stepped without stranding anyone
    Moved,
    /// Stepped and left these former neighbors following it
    Led { followers: Vec<ParticleId> },
    /// Forward cell held by a particle of the same blob; pressure was passed on
    Pushed { blocker: ParticleId },
}

#[derive(Debug, Clone)]
pub struct Blob {
    state: BlobState,
}

impl Blob {
    pub fn new(max_health: u32) -> Self {
        Self {
            state: BlobState::new(max_health),
        }
    }

    /// Seed a disc of particles.
    ///
    /// Cells with `dx² + dy² <= radius²` inside `[0, width) x [0, height)` are
    /// filled. A non-positive radius or a center outside the arena gives an
    /// empty blob.
    pub fn circle(center: IVec2, radius: f32, width: u32, height: u32, max_health: u32) -> Self {
        Self::circle_where(center, radius, width, height, max_health, |_| true)
    }

    /// [`Blob::circle`], skipping cells `free` rejects (e.g. held by another blob)
    pub fn circle_where(
        center: IVec2,
        radius: f32,
        width: u32,
        height: u32,
        max_health: u32,
        free: impl Fn(IVec2) -> bool,
    ) -> Self {
        let mut blob = Self::new(max_health);
        let (w, h) = (width as i32, height as i32);
        let outside = center.x < 0 || center.y < 0 || center.x >= w || center.y >= h;
        if radius <= 0.0 || outside {
            return blob;
        }

        // Anything past the arena extent is clipped anyway
        let reach = radius.ceil().min(w.max(h) as f32) as i32;
        let radius_sq = radius * radius;
        let min_y = (center.y - reach).max(0);
        let max_y = (center.y + reach).min(h - 1);
        let min_x = (center.x - reach).max(0);
        let max_x = (center.x + reach).min(w - 1);
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let cell = IVec2::new(x, y);
                if (cell - center).length_squared() as f32 <= radius_sq && free(cell) {
                    blob.state.add_particle(cell);
                }
            }
        }
        blob
    }

    pub fn state(&self) -> &BlobState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BlobState {
        &mut self.state
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Point every particle at `position`
    pub fn set_target(&mut self, position: IVec2, pressure: f32) {
        for particle in self.state.iter_mut() {
            particle.set_target(position, pressure);
        }
    }

    /// Point only `ids` at `position`; unknown ids are skipped. Returns how many were retargeted.
    pub fn set_target_for(&mut self, ids: &[ParticleId], position: IVec2, pressure: f32) -> usize {
        let mut count = 0;
        for &id in ids {
            if let Some(particle) = self.state.get_mut(id) {
                particle.set_target(position, pressure);
                count += 1;
            }
        }
        count
    }

    /// Resolve one step of `id` toward `direction` inside the blob.
    ///
    /// The caller has already ruled out walls and hostile particles.
    pub fn handle_particle(
        &mut self,
        id: ParticleId,
        direction: Direction,
        config: &SimConfig,
    ) -> MoveOutcome {
        if let Some(blocker) = self.state.particle(id).neighbor(direction) {
            self.state
                .collide_particles(id, blocker, direction, config.collision_pass_on);
            return MoveOutcome::Pushed { blocker };
        }

        let stranded = self.stranded_neighbors(id, direction);
        self.state.move_particle(id, direction);
        if stranded.is_empty() {
            return MoveOutcome::Moved;
        }

        self.state.add_particle_followers(
            id,
            &stranded,
            config.boost_fraction,
            direction.opposite(),
        );
        MoveOutcome::Led {
            followers: stranded,
        }
    }

    /// Neighbors that would lose contact with `id` once it steps `direction`.
    ///
    /// A side neighbor keeps contact if the cell ahead of it is filled. The rear
    /// neighbor keeps contact if either side offers a filled detour around the
    /// vacated cell up to the new position.
    fn stranded_neighbors(&self, id: ParticleId, direction: Direction) -> Vec<ParticleId> {
        let particle = self.state.particle(id);
        let (right, left, rear) = (direction.right(), direction.left(), direction.opposite());
        let mut stranded = Vec::new();

        for side in [right, left] {
            if let Some(neighbor) = particle.neighbor(side) {
                if !self.state.has_path(id, &[side, direction]) {
                    stranded.push(neighbor);
                }
            }
        }

        if let Some(neighbor) = particle.neighbor(rear) {
            let bridged = self.state.has_path(id, &[rear, right, direction, direction])
                || self.state.has_path(id, &[rear, left, direction, direction]);
            if !bridged {
                stranded.push(neighbor);
            }
        }

        stranded
    }

    /// Arena edge ahead: drop the pressure pushing into it
    pub fn collide_particle_with_wall(&mut self, id: ParticleId, direction: Direction) {
        self.state.particle_mut(id).kill_pressure_in_direction(direction);
    }

    /// Enemy particle ahead: drop the pressure pushing into it and take damage
    pub fn collide_particle_with_hostile(&mut self, id: ParticleId, direction: Direction, damage: u32) {
        let particle = self.state.particle_mut(id);
        particle.kill_pressure_in_direction(direction);
        particle.damage(damage);
    }
}
