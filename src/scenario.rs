//! Scripted command source for headless runs
//!
//! Stands in for the input layer: every `retarget_interval` ticks each player
//! gets a fresh random target. Seeded, so equal seeds replay identically.

use glam::IVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::command::Command;
use crate::sim::PlayerId;

#[derive(Debug, Clone)]
pub struct Scenario {
    rng: Pcg32,
    players: Vec<PlayerId>,
    width: u32,
    height: u32,
    retarget_interval: u64,
    /// `None` lets the simulation use its configured default
    pressure: Option<f32>,
}

impl Scenario {
    pub fn new(seed: u64, players: Vec<PlayerId>, width: u32, height: u32, retarget_interval: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            players,
            width,
            height,
            retarget_interval: retarget_interval.max(1),
            pressure: None,
        }
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure);
        self
    }

    /// Commands to apply before running tick number `tick` (0-based)
    pub fn commands_for_tick(&mut self, tick: u64) -> Vec<Command> {
        if tick % self.retarget_interval != 0 {
            return Vec::new();
        }
        let mut commands = Vec::with_capacity(self.players.len());
        for &player in &self.players {
            let position = IVec2::new(
                self.rng.random_range(0..self.width as i32),
                self.rng.random_range(0..self.height as i32),
            );
            commands.push(Command::SetTarget {
                player,
                position,
                pressure: self.pressure,
            });
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_commands() {
        let mut a = Scenario::new(42, vec![1, 2], 50, 30, 10);
        let mut b = Scenario::new(42, vec![1, 2], 50, 30, 10);
        for tick in 0..100 {
            assert_eq!(a.commands_for_tick(tick), b.commands_for_tick(tick));
        }
    }

    #[test]
    fn test_retarget_interval_and_bounds() {
        let mut scenario = Scenario::new(7, vec![1, 2, 3], 20, 10, 5).with_pressure(2.5);
        assert!(scenario.commands_for_tick(3).is_empty());

        let commands = scenario.commands_for_tick(5);
        assert_eq!(commands.len(), 3);
        for command in commands {
            match command {
                Command::SetTarget { position, pressure, .. } => {
                    assert!(position.x >= 0 && position.x < 20);
                    assert!(position.y >= 0 && position.y < 10);
                    assert_eq!(pressure, Some(2.5));
                }
                other => panic!("unexpected command {other:?}"),
            }
        }
    }
}
