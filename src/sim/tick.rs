//! Fixed timestep simulation tick
//!
//! A tick integrates pressure into every particle, then drains movable
//! particles one at a time, always the most pressured one across all blobs.
//! Every resolution sees the state left by the previous one.

use std::collections::BTreeMap;

use super::blob::{Blob, MoveOutcome};
use super::events::SimEvent;
use super::particle::ParticleId;
use super::state::{PlayerId, SimState};

/// Advance the simulation by one step of `dt` seconds
pub fn tick(state: &mut SimState, dt: f32) -> Vec<SimEvent> {
    state.tick_count += 1;

    let share = state.config.target_pressure_share;
    for blob in state.blobs.values_mut() {
        blob.state_mut().advance_particles(dt, share);
    }

    let min_pressure = state.config.min_directed_movement_pressure;
    let max_resolutions = state.config.max_resolutions_per_tick;
    let mut events = Vec::new();

    while let Some((player, actor)) = select_actor(&state.blobs, min_pressure) {
        if events.len() >= max_resolutions {
            log::warn!(
                "Tick {} hit the resolution cap ({max_resolutions}); leaving remaining pressure for next tick",
                state.tick_count
            );
            break;
        }

        let Some(event) = resolve(state, player, actor) else {
            break;
        };
        log::trace!("{event:?}");
        events.push(event);
    }

    if cfg!(debug_assertions) {
        if let Err(err) = state.validate() {
            panic!("particle graph inconsistent after tick {}: {err:#}", state.tick_count);
        }
    }

    log::debug!(
        "Tick {}: {} resolutions, {} moves",
        state.tick_count,
        events.len(),
        events.iter().filter(|e| e.is_move()).count()
    );
    events
}

/// The blob whose best movable particle has the highest pressure norm.
///
/// Ties go to the lowest player id.
fn select_actor(blobs: &BTreeMap<PlayerId, Blob>, min_pressure: f32) -> Option<(PlayerId, ParticleId)> {
    let mut best: Option<(PlayerId, ParticleId, f32)> = None;
    for (&player, blob) in blobs {
        let Some(id) = blob.state().highest_mobility_particle(min_pressure) else {
            continue;
        };
        let mobility = blob.state().particle(id).mobility();
        if best.is_none_or(|(_, _, best_mobility)| mobility > best_mobility) {
            best = Some((player, id, mobility));
        }
    }
    best.map(|(player, id, _)| (player, id))
}

/// Resolve one step of `actor` against the arena, hostile blobs, then its own blob
fn resolve(state: &mut SimState, player: PlayerId, actor: ParticleId) -> Option<SimEvent> {
    let (from, direction) = {
        let particle = state.blobs.get(&player)?.state().particle(actor);
        (particle.position(), particle.pressure_direction())
    };
    let to = from + direction.vector();

    if !state.in_bounds(to) {
        state
            .blobs
            .get_mut(&player)?
            .collide_particle_with_wall(actor, direction);
        return Some(SimEvent::WallCollision {
            player,
            particle: actor,
            direction,
        });
    }

    if let Some((hostile_player, hostile_particle)) = state.hostile_at(player, to) {
        // Both sides back off so neither can step into the other this tick
        let damage = state.config.hostile_collision_damage;
        state
            .blobs
            .get_mut(&player)?
            .collide_particle_with_hostile(actor, direction, damage);
        state
            .blobs
            .get_mut(&hostile_player)?
            .collide_particle_with_hostile(hostile_particle, direction.opposite(), damage);
        return Some(SimEvent::HostileCollision {
            player,
            particle: actor,
            hostile_player,
            hostile_particle,
            direction,
        });
    }

    let config = &state.config;
    let blob = state.blobs.get_mut(&player)?;
    let event = match blob.handle_particle(actor, direction, config) {
        MoveOutcome::Moved => SimEvent::Moved {
            player,
            particle: actor,
            from,
            direction,
        },
        MoveOutcome::Led { followers } => SimEvent::Led {
            player,
            particle: actor,
            from,
            direction,
            followers,
        },
        MoveOutcome::Pushed { blocker } => SimEvent::Pushed {
            player,
            particle: actor,
            blocker,
            direction,
        },
    };
    Some(event)
}
