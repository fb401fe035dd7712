//! Simulation tunables
//!
//! Passed into `SimState::new` and never mutated afterwards. Loadable from JSON;
//! missing fields fall back to the defaults.

use std::path::Path;

use anyhow::{Context, ensure};
use serde::{Deserialize, Serialize};

/// Immutable simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Pressure ===
    /// Leader's share of its own target increment, relative to one follower's share
    pub target_pressure_share: f32,
    /// Fraction of forward pressure handed to the particle ahead on a friendly collision
    pub collision_pass_on: f32,
    /// Fraction of a leader's pressure handed out to new followers
    pub boost_fraction: f32,
    /// Dominant-axis pressure needed before a particle may move
    pub min_directed_movement_pressure: f32,
    /// Pressure magnitude used by commands that do not carry one
    pub default_target_pressure: f32,

    // === Health ===
    pub max_health: u32,
    /// Damage dealt to both sides of a hostile collision
    pub hostile_collision_damage: u32,

    // === Tick ===
    /// Upper bound on move/collision resolutions in a single tick
    pub max_resolutions_per_tick: usize,

    // === Selection (UI only) ===
    pub selection_radius: f32,
    pub min_selection_radius: f32,
    pub max_selection_radius: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            target_pressure_share: 2.0,
            collision_pass_on: 0.5,
            boost_fraction: 0.5,
            min_directed_movement_pressure: 1.0,
            default_target_pressure: 4.0,

            max_health: 100,
            hostile_collision_damage: 1,

            max_resolutions_per_tick: 100_000,

            selection_radius: 5.0,
            min_selection_radius: 1.0,
            max_selection_radius: 50.0,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_json(&json)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize config")
    }

    /// Reject tunables that would stall or corrupt the tick loop
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.target_pressure_share > 0.0,
            "target_pressure_share must be positive, got {}",
            self.target_pressure_share
        );
        // A zero pass-on lets a blocked particle collide forever
        ensure!(
            self.collision_pass_on > 0.0 && self.collision_pass_on <= 1.0,
            "collision_pass_on must be in (0, 1], got {}",
            self.collision_pass_on
        );
        ensure!(
            (0.0..1.0).contains(&self.boost_fraction),
            "boost_fraction must be in [0, 1), got {}",
            self.boost_fraction
        );
        // Each move must strictly shrink pressure
        ensure!(
            self.min_directed_movement_pressure > 0.5,
            "min_directed_movement_pressure must exceed 0.5, got {}",
            self.min_directed_movement_pressure
        );
        ensure!(self.max_health > 0, "max_health must be positive");
        ensure!(
            self.max_resolutions_per_tick > 0,
            "max_resolutions_per_tick must be positive"
        );
        ensure!(
            self.min_selection_radius >= 0.0
                && self.min_selection_radius <= self.max_selection_radius,
            "selection radius bounds are inverted"
        );
        Ok(())
    }

    /// Clamp a selection radius to the configured bounds
    pub fn clamp_selection_radius(&self, radius: f32) -> f32 {
        radius.clamp(self.min_selection_radius, self.max_selection_radius)
    }
}
