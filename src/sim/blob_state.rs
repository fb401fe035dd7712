//! Particle registry for a single blob
//!
//! Owns every particle of the blob in an id-indexed list and keeps a
//! packed-position index beside it. All neighbor and leader/follower links
//! are maintained here; particles only store the ids.

use std::collections::{HashMap, VecDeque};

use anyhow::{bail, ensure};
use glam::{IVec2, Vec2};

use super::geometry::{Direction, GridVec};
use super::particle::{Particle, ParticleId};

#[derive(Debug, Clone)]
pub struct BlobState {
    /// Slot `i` holds the particle with id `i`; removed slots stay `None`
    particles: Vec<Option<Particle>>,
    /// Packed position -> occupant
    index: HashMap<u64, ParticleId>,
    live: usize,
    max_health: u32,
}

impl BlobState {
    pub fn new(max_health: u32) -> Self {
        Self {
            particles: Vec::new(),
            index: HashMap::new(),
            live: 0,
            max_health,
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ParticleId) -> Option<&mut Particle> {
        self.particles.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ParticleId) -> bool {
        self.get(id).is_some()
    }

    /// Lookup for ids the caller guarantees are registered
    pub fn particle(&self, id: ParticleId) -> &Particle {
        self.get(id)
            .unwrap_or_else(|| panic!("particle {id:?} is not registered in this blob"))
    }

    pub(crate) fn particle_mut(&mut self, id: ParticleId) -> &mut Particle {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("particle {id:?} is not registered in this blob"))
    }

    pub fn particle_at(&self, position: IVec2) -> Option<ParticleId> {
        self.index.get(&position.pack()).copied()
    }

    pub fn is_occupied(&self, position: IVec2) -> bool {
        self.index.contains_key(&position.pack())
    }

    /// Live particles in id (creation) order
    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().flatten()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Particle> {
        self.particles.iter_mut().flatten()
    }

    pub fn ids(&self) -> Vec<ParticleId> {
        self.iter().map(Particle::id).collect()
    }

    pub fn positions(&self) -> impl Iterator<Item = IVec2> + '_ {
        self.iter().map(Particle::position)
    }

    /// Add a particle, or `None` if the cell is already taken
    pub fn try_add_particle(&mut self, position: IVec2) -> Option<ParticleId> {
        if self.is_occupied(position) {
            return None;
        }
        let id = ParticleId(self.particles.len() as u32);
        self.particles
            .push(Some(Particle::new(id, position, self.max_health)));
        self.index.insert(position.pack(), id);
        self.live += 1;
        self.link_neighbors(id);
        Some(id)
    }

    /// Add a particle on a free cell.
    ///
    /// # Panics
    /// If `position` is already occupied.
    pub fn add_particle(&mut self, position: IVec2) -> ParticleId {
        self.try_add_particle(position)
            .unwrap_or_else(|| panic!("add_particle: {position} is already occupied"))
    }

    /// Unregister a particle. Its id is never reused; leader/follower entries
    /// naming it are pruned on the next `advance_particles`.
    pub fn remove_particle(&mut self, id: ParticleId) -> Option<Particle> {
        let position = self.get(id)?.position;
        self.unlink_neighbors(id);
        self.index.remove(&position.pack());
        self.live -= 1;
        self.particles[id.index()].take()
    }

    /// Point `id` at whatever occupies its four adjacent cells, and back
    fn link_neighbors(&mut self, id: ParticleId) {
        let position = self.particle(id).position;
        for direction in Direction::ALL {
            let other = self.particle_at(position + direction.vector());
            self.particle_mut(id).neighbors[direction.index()] = other;
            if let Some(other) = other {
                self.particle_mut(other).neighbors[direction.opposite().index()] = Some(id);
            }
        }
    }

    /// Clear `id`'s links and every back-reference to it
    fn unlink_neighbors(&mut self, id: ParticleId) {
        let neighbors = std::mem::take(&mut self.particle_mut(id).neighbors);
        for direction in Direction::ALL {
            if let Some(other) = neighbors[direction.index()] {
                let slot = &mut self.particle_mut(other).neighbors[direction.opposite().index()];
                if *slot == Some(id) {
                    *slot = None;
                }
            }
        }
    }

    /// Step a particle one cell and repair the neighbor graph around both cells.
    ///
    /// A particle that moves has closed its leaders' bubble, so it is released
    /// from all of them.
    ///
    /// # Panics
    /// If the particle is unknown or the destination is occupied.
    pub fn move_particle(&mut self, id: ParticleId, direction: Direction) {
        let from = self.particle(id).position;
        let to = from + direction.vector();
        assert!(
            !self.is_occupied(to),
            "move_particle: {id:?} cannot move {direction:?} from {from} onto occupied {to}"
        );

        self.unlink_neighbors(id);
        self.index.remove(&from.pack());
        self.particle_mut(id).apply_move(direction);
        self.index.insert(to.pack(), id);
        self.link_neighbors(id);
        self.release_from_leaders(id);
    }

    fn release_from_leaders(&mut self, id: ParticleId) {
        let leaders = std::mem::take(&mut self.particle_mut(id).leaders);
        for leader in leaders {
            if let Some(leader) = self.get_mut(leader) {
                leader.followers.remove(&id);
                if leader.followers.is_empty() {
                    leader.bubble_direction = None;
                }
            }
        }
    }

    /// Friendly collision of `a` into `b` travelling `direction`.
    ///
    /// `a` hands `pass_on` of its forward pressure to `b`. Each leader waiting
    /// on `a` now waits on `b` instead, unless that would loop the chain back
    /// on itself (`b` is the leader, or leads it), in which case it is dropped.
    pub fn collide_particles(
        &mut self,
        a: ParticleId,
        b: ParticleId,
        direction: Direction,
        pass_on: f32,
    ) {
        assert_ne!(a, b, "collide_particles: a particle cannot collide with itself");
        let passed = self.particle_mut(a).take_forward_pressure(direction, pass_on);
        self.particle_mut(b).add_pressure(passed);

        let leaders = std::mem::take(&mut self.particle_mut(a).leaders);
        for leader in leaders {
            if !self.contains(leader) {
                continue;
            }
            let keep = leader != b && !self.leads_transitively(b, leader);
            let leader_particle = self.particle_mut(leader);
            leader_particle.followers.remove(&a);
            if keep {
                leader_particle.followers.insert(b);
                self.particle_mut(b).leaders.insert(leader);
            } else if leader_particle.followers.is_empty() {
                leader_particle.bubble_direction = None;
            }
        }
    }

    /// True if `candidate` is a follower of `root`, directly or down the chain
    fn leads_transitively(&self, root: ParticleId, candidate: ParticleId) -> bool {
        let mut queue = VecDeque::from([root]);
        let mut seen = vec![root];
        while let Some(id) = queue.pop_front() {
            let Some(particle) = self.get(id) else {
                continue;
            };
            for &follower in &particle.followers {
                if follower == candidate {
                    return true;
                }
                if !seen.contains(&follower) {
                    seen.push(follower);
                    queue.push_back(follower);
                }
            }
        }
        false
    }

    /// Make `followers` wait on `leader`.
    ///
    /// Hands `boost_fraction` of the leader's pressure magnitude to the
    /// followers, split evenly, each pushed from its own cell toward the leader.
    pub fn add_particle_followers(
        &mut self,
        leader: ParticleId,
        followers: &[ParticleId],
        boost_fraction: f32,
        bubble_direction: Direction,
    ) {
        if followers.is_empty() {
            return;
        }
        let (leader_position, magnitude) = {
            let p = self.particle(leader);
            (p.position, p.pressure.length())
        };
        let boost = magnitude * boost_fraction / followers.len() as f32;

        for &follower in followers {
            assert_ne!(follower, leader, "add_particle_followers: a particle cannot follow itself");
            let p = self.particle_mut(follower);
            let toward = (leader_position - p.position).as_vec2().normalize_or_zero();
            p.pressure += toward * boost;
            p.leaders.insert(leader);
        }

        let p = self.particle_mut(leader);
        p.pressure *= 1.0 - boost_fraction;
        p.followers.extend(followers.iter().copied());
        p.bubble_direction = Some(bubble_direction);
    }

    /// Follow neighbor links from `id`; an empty path always exists
    pub fn has_path(&self, id: ParticleId, path: &[Direction]) -> bool {
        let mut current = self.particle(id);
        for &direction in path {
            match current.neighbor(direction).and_then(|next| self.get(next)) {
                Some(next) => current = next,
                None => return false,
            }
        }
        true
    }

    /// Movable particle with the largest pressure norm.
    ///
    /// Ties go to the lowest `(x, y)`, x compared first.
    pub fn highest_mobility_particle(&self, min_directed_movement_pressure: f32) -> Option<ParticleId> {
        let mut best: Option<&Particle> = None;
        for particle in self.iter() {
            if !particle.can_move(min_directed_movement_pressure) {
                continue;
            }
            best = match best {
                None => Some(particle),
                Some(current) => {
                    let (m, bm) = (particle.mobility(), current.mobility());
                    let lower = (particle.position.x, particle.position.y)
                        < (current.position.x, current.position.y);
                    if m > bm || (m == bm && lower) {
                        Some(particle)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        best.map(Particle::id)
    }

    /// Particles with `|position - center|² <= radius²`
    pub fn particles_in_radius(&self, center: Vec2, radius: f32) -> Vec<ParticleId> {
        let radius_sq = radius * radius;
        self.iter()
            .filter(|p| (p.position.as_vec2() - center).length_squared() <= radius_sq)
            .map(Particle::id)
            .collect()
    }

    /// Integrate target pressure into every particle.
    ///
    /// Increments are computed against the state at the start of the call, so
    /// iteration order cannot leak into the result.
    pub fn advance_particles(&mut self, dt: f32, target_pressure_share: f32) {
        self.prune_stale_relations();

        let mut increments: Vec<(ParticleId, Vec2)> = Vec::new();
        for particle in self.iter() {
            let increment = particle.target_increment(dt);
            if increment == Vec2::ZERO {
                continue;
            }
            increments.push((particle.id(), increment * particle.leader_share(target_pressure_share)));
            let follower_increment = increment * particle.follower_share(target_pressure_share);
            for &follower in &particle.followers {
                increments.push((follower, follower_increment));
            }
        }

        for (id, increment) in increments {
            self.particle_mut(id).add_pressure(increment);
        }
    }

    /// Drop leader/follower ids whose particle was removed
    fn prune_stale_relations(&mut self) {
        let alive: Vec<bool> = self.particles.iter().map(Option::is_some).collect();
        let is_alive = |id: &ParticleId| alive.get(id.index()).copied().unwrap_or(false);
        for particle in self.iter_mut() {
            particle.leaders.retain(is_alive);
            particle.followers.retain(is_alive);
            if particle.followers.is_empty() {
                particle.bubble_direction = None;
            }
        }
    }

    /// Check every structural invariant of the registry
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.index.len() == self.live && self.iter().count() == self.live,
            "index holds {} entries, list holds {} particles, live count {}",
            self.index.len(),
            self.iter().count(),
            self.live
        );
        for (slot, particle) in self.particles.iter().enumerate() {
            let Some(particle) = particle else {
                continue;
            };
            let id = particle.id();
            ensure!(id.index() == slot, "{id:?} stored in slot {slot}");
            ensure!(
                self.particle_at(particle.position) == Some(id),
                "{id:?} at {} missing from the position index",
                particle.position
            );
            for direction in Direction::ALL {
                let expected = self.particle_at(particle.position + direction.vector());
                let actual = particle.neighbor(direction);
                if actual != expected {
                    bail!("{id:?} {direction:?} neighbor is {actual:?}, cell holds {expected:?}");
                }
                if let Some(other) = actual {
                    let back = self.particle(other).neighbor(direction.opposite());
                    ensure!(back == Some(id), "{other:?} does not link back to {id:?}");
                }
            }
            for leader in particle.leaders.iter().filter_map(|&l| self.get(l)) {
                ensure!(
                    leader.followers.contains(&id),
                    "{:?} leads {id:?} without listing it as a follower",
                    leader.id()
                );
            }
            for follower in particle.followers.iter().filter_map(|&f| self.get(f)) {
                ensure!(
                    follower.leaders.contains(&id),
                    "{:?} follows {id:?} without listing it as a leader",
                    follower.id()
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(state: &mut BlobState, y: i32, xs: std::ops::Range<i32>) -> Vec<ParticleId> {
        xs.map(|x| state.add_particle(IVec2::new(x, y))).collect()
    }

    #[test]
    fn test_add_links_neighbors_both_ways() {
        let mut state = BlobState::new(10);
        let a = state.add_particle(IVec2::new(0, 0));
        let b = state.add_particle(IVec2::new(1, 0));
        let c = state.add_particle(IVec2::new(0, 1));

        assert_eq!(state.particle(a).neighbor(Direction::East), Some(b));
        assert_eq!(state.particle(b).neighbor(Direction::West), Some(a));
        assert_eq!(state.particle(a).neighbor(Direction::South), Some(c));
        assert_eq!(state.particle(c).neighbor(Direction::North), Some(a));
        assert_eq!(state.particle(b).neighbor(Direction::South), None);
        state.validate().unwrap();
    }

    #[test]
    #[should_panic(expected = "already occupied")]
    fn test_add_on_occupied_cell_panics() {
        let mut state = BlobState::new(10);
        state.add_particle(IVec2::new(3, 3));
        state.add_particle(IVec2::new(3, 3));
    }

    #[test]
    fn test_try_add_on_occupied_cell() {
        let mut state = BlobState::new(10);
        assert!(state.try_add_particle(IVec2::new(3, 3)).is_some());
        assert!(state.try_add_particle(IVec2::new(3, 3)).is_none());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_move_translates_and_relinks() {
        let mut state = BlobState::new(10);
        let ids = line(&mut state, 0, 0..3);
        let above = state.add_particle(IVec2::new(3, -1));

        state.move_particle(ids[2], Direction::East);

        let moved = state.particle(ids[2]);
        assert_eq!(moved.position(), IVec2::new(3, 0));
        assert_eq!(moved.neighbor(Direction::West), None);
        assert_eq!(moved.neighbor(Direction::North), Some(above));
        assert_eq!(state.particle(ids[1]).neighbor(Direction::East), None);
        assert_eq!(state.particle(above).neighbor(Direction::South), Some(ids[2]));
        assert_eq!(state.particle_at(IVec2::new(2, 0)), None);
        assert_eq!(state.particle_at(IVec2::new(3, 0)), Some(ids[2]));
        state.validate().unwrap();
    }

    #[test]
    #[should_panic(expected = "occupied")]
    fn test_move_onto_occupied_cell_panics() {
        let mut state = BlobState::new(10);
        let ids = line(&mut state, 0, 0..2);
        state.move_particle(ids[0], Direction::East);
    }

    #[test]
    fn test_collision_passes_on_forward_pressure() {
        let mut state = BlobState::new(10);
        let ids = line(&mut state, 0, 0..2);
        state.get_mut(ids[0]).unwrap().pressure = Vec2::new(4.0, 0.0);
        state.get_mut(ids[1]).unwrap().pressure = Vec2::new(1.0, 0.5);

        state.collide_particles(ids[0], ids[1], Direction::East, 0.5);

        assert_eq!(state.particle(ids[0]).pressure(), Vec2::new(2.0, 0.0));
        assert_eq!(state.particle(ids[1]).pressure(), Vec2::new(3.0, 0.5));
        // Neighbor graph untouched
        state.validate().unwrap();
    }

    #[test]
    fn test_collision_hands_leaders_forward() {
        let mut state = BlobState::new(10);
        let ids = line(&mut state, 0, 0..3);
        let (leader, collider, blocker) = (ids[2], ids[0], ids[1]);
        state.add_particle_followers(leader, &[collider], 0.5, Direction::West);

        state.collide_particles(collider, blocker, Direction::East, 0.5);

        assert!(state.particle(collider).leaders().is_empty());
        assert!(state.particle(blocker).leaders().contains(&leader));
        assert!(state.particle(leader).followers().contains(&blocker));
        assert!(!state.particle(leader).followers().contains(&collider));
        state.validate().unwrap();
    }

    #[test]
    fn test_collision_into_own_leader_drops_it() {
        let mut state = BlobState::new(10);
        let ids = line(&mut state, 0, 0..2);
        state.add_particle_followers(ids[1], &[ids[0]], 0.5, Direction::West);

        state.collide_particles(ids[0], ids[1], Direction::East, 0.5);

        assert!(state.particle(ids[0]).leaders().is_empty());
        assert!(state.particle(ids[1]).followers().is_empty());
        assert!(state.particle(ids[1]).leaders().is_empty());
        assert_eq!(state.particle(ids[1]).bubble_direction(), None);
    }

    #[test]
    fn test_followers_get_boost_toward_leader() {
        let mut state = BlobState::new(10);
        let leader = state.add_particle(IVec2::new(1, 0));
        let west = state.add_particle(IVec2::new(0, 0));
        let south = state.add_particle(IVec2::new(1, 1));
        state.get_mut(leader).unwrap().pressure = Vec2::new(4.0, 0.0);

        state.add_particle_followers(leader, &[west, south], 0.5, Direction::West);

        assert_eq!(state.particle(leader).pressure(), Vec2::new(2.0, 0.0));
        assert_eq!(state.particle(west).pressure(), Vec2::new(1.0, 0.0));
        assert_eq!(state.particle(south).pressure(), Vec2::new(0.0, -1.0));
        assert_eq!(state.particle(leader).bubble_direction(), Some(Direction::West));
        assert!(!state.particle(leader).can_move(1.0));
        state.validate().unwrap();
    }

    #[test]
    fn test_moving_follower_releases_leader() {
        let mut state = BlobState::new(10);
        let leader = state.add_particle(IVec2::new(2, 0));
        let follower = state.add_particle(IVec2::new(0, 0));
        state.add_particle_followers(leader, &[follower], 0.5, Direction::West);

        state.move_particle(follower, Direction::East);

        assert!(state.particle(leader).followers().is_empty());
        assert!(state.particle(follower).leaders().is_empty());
        assert_eq!(state.particle(leader).bubble_direction(), None);
    }

    #[test]
    fn test_has_path() {
        let mut state = BlobState::new(10);
        let ids = line(&mut state, 0, 0..3);
        state.add_particle(IVec2::new(2, 1));

        assert!(state.has_path(ids[0], &[]));
        assert!(state.has_path(ids[0], &[Direction::East, Direction::East, Direction::South]));
        assert!(!state.has_path(ids[0], &[Direction::South]));
        assert!(!state.has_path(ids[0], &[Direction::East, Direction::South]));
    }

    #[test]
    fn test_highest_mobility_particle() {
        let mut state = BlobState::new(10);
        let ids = line(&mut state, 0, 0..3);
        assert_eq!(state.highest_mobility_particle(1.0), None);

        state.get_mut(ids[0]).unwrap().pressure = Vec2::new(2.0, 0.0);
        state.get_mut(ids[1]).unwrap().pressure = Vec2::new(0.0, 3.0);
        state.get_mut(ids[2]).unwrap().pressure = Vec2::new(0.9, 0.9);
        assert_eq!(state.highest_mobility_particle(1.0), Some(ids[1]));

        // Blocked by a follower
        state.get_mut(ids[1]).unwrap().followers.insert(ids[2]);
        assert_eq!(state.highest_mobility_particle(1.0), Some(ids[0]));
    }

    #[test]
    fn test_highest_mobility_tie_breaks_on_lowest_position() {
        let mut state = BlobState::new(10);
        let far = state.add_particle(IVec2::new(5, 0));
        let near = state.add_particle(IVec2::new(1, 9));
        state.get_mut(far).unwrap().pressure = Vec2::new(2.0, 0.0);
        state.get_mut(near).unwrap().pressure = Vec2::new(0.0, -2.0);
        assert_eq!(state.highest_mobility_particle(1.0), Some(near));
    }

    #[test]
    fn test_particles_in_radius_is_inclusive() {
        let mut state = BlobState::new(10);
        let inside = state.add_particle(IVec2::new(3, 0));
        let edge = state.add_particle(IVec2::new(0, 4));
        state.add_particle(IVec2::new(4, 4));

        let mut found = state.particles_in_radius(Vec2::ZERO, 4.0);
        found.sort();
        assert_eq!(found, vec![inside, edge]);
    }

    #[test]
    fn test_advance_splits_increment_with_followers() {
        let mut state = BlobState::new(10);
        let leader = state.add_particle(IVec2::new(0, 0));
        let follower = state.add_particle(IVec2::new(-1, 0));
        state.add_particle_followers(leader, &[follower], 0.0, Direction::West);
        state.get_mut(leader).unwrap().set_target(IVec2::new(10, 0), 3.0);

        state.advance_particles(1.0, 2.0);

        // share 2 vs 1: leader keeps 2/3, follower gets 1/3
        assert!((state.particle(leader).pressure() - Vec2::new(2.0, 0.0)).length() < 1e-5);
        assert!((state.particle(follower).pressure() - Vec2::new(1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_advance_is_deterministic() {
        let mut a = BlobState::new(10);
        for x in 0..4 {
            for y in 0..3 {
                a.add_particle(IVec2::new(x, y));
            }
        }
        for p in a.iter_mut() {
            p.set_target(IVec2::new(20, 7), 2.5);
        }
        let mut b = a.clone();
        a.advance_particles(0.1, 2.0);
        b.advance_particles(0.1, 2.0);
        let pa: Vec<Vec2> = a.iter().map(Particle::pressure).collect();
        let pb: Vec<Vec2> = b.iter().map(Particle::pressure).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_remove_unlinks_and_prunes_relations() {
        let mut state = BlobState::new(10);
        let ids = line(&mut state, 0, 0..3);
        state.add_particle_followers(ids[1], &[ids[2]], 0.5, Direction::East);

        let removed = state.remove_particle(ids[2]).unwrap();
        assert_eq!(removed.id(), ids[2]);
        assert_eq!(state.len(), 2);
        assert_eq!(state.particle(ids[1]).neighbor(Direction::East), None);
        assert!(state.particle(ids[1]).followers().contains(&ids[2]));
        state.validate().unwrap();

        state.advance_particles(1.0, 2.0);
        assert!(state.particle(ids[1]).followers().is_empty());
        assert_eq!(state.particle(ids[1]).bubble_direction(), None);

        // Freed cell can be reused, the id is not
        let fresh = state.add_particle(IVec2::new(2, 0));
        assert_ne!(fresh, ids[2]);
        assert!(state.remove_particle(ids[2]).is_none());
        state.validate().unwrap();
    }

    proptest! {
        #[test]
        fn prop_graph_invariants_hold_under_random_moves(
            cells in proptest::collection::vec((0i32..8, 0i32..8), 1..40),
            moves in proptest::collection::vec((0usize..40, 0usize..4), 0..60),
        ) {
            let mut state = BlobState::new(10);
            for (x, y) in cells {
                let _ = state.try_add_particle(IVec2::new(x, y));
            }
            prop_assert!(state.validate().is_ok(), "{:?}", state.validate());
            let ids = state.ids();
            for (pick, dir) in moves {
                let id = ids[pick % ids.len()];
                let direction = Direction::from_index(dir);
                let from = state.particle(id).position();
                if state.is_occupied(from + direction.vector()) {
                    continue;
                }
                state.move_particle(id, direction);
                prop_assert_eq!(state.particle(id).position(), from + direction.vector());
                prop_assert!(state.validate().is_ok(), "{:?}", state.validate());
            }
            let mut positions: Vec<(i32, i32)> = state.positions().map(|p| (p.x, p.y)).collect();
            let count = positions.len();
            positions.sort();
            positions.dedup();
            prop_assert_eq!(positions.len(), count);
        }
    }
}
