//! Pressure Blobs headless entry point
//!
//! Seeds two opposing blobs, drives them with scripted targets and logs how
//! the run went. Usage: `pressure-blobs [config.json] [ticks] [seed]`

use anyhow::Context;
use glam::IVec2;

use pressure_blobs::consts::*;
use pressure_blobs::{CommandOutcome, Scenario, SimConfig, SimState};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    log::info!("Pressure Blobs (headless) starting...");

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) if path != "-" => SimConfig::load(&path)?,
        _ => SimConfig::default(),
    };
    let ticks: u64 = match args.next() {
        Some(arg) => arg.parse().with_context(|| format!("invalid tick count {arg:?}"))?,
        None => DEFAULT_TICKS,
    };
    let seed: u64 = match args.next() {
        Some(arg) => arg.parse().with_context(|| format!("invalid seed {arg:?}"))?,
        None => 12345,
    };

    let mut state = SimState::new(ARENA_WIDTH, ARENA_HEIGHT, config);
    let mid_y = ARENA_HEIGHT as i32 / 2;
    state.emplace_blob_circle(1, IVec2::new(ARENA_WIDTH as i32 / 4, mid_y), START_BLOB_RADIUS);
    state.emplace_blob_circle(2, IVec2::new(3 * ARENA_WIDTH as i32 / 4, mid_y), START_BLOB_RADIUS);

    let mut scenario = Scenario::new(seed, vec![1, 2], ARENA_WIDTH, ARENA_HEIGHT, RETARGET_INTERVAL);

    let mut total_moves = 0usize;
    let mut total_resolutions = 0usize;
    'run: for tick in 0..ticks {
        for command in scenario.commands_for_tick(tick) {
            if state.apply(command) == CommandOutcome::Exit {
                log::info!("Exit requested at tick {tick}");
                break 'run;
            }
        }

        let events = state.advance(SIM_DT);
        total_resolutions += events.len();
        total_moves += events.iter().filter(|e| e.is_move()).count();

        if (tick + 1) % 60 == 0 {
            for (player, blob) in state.blobs() {
                let count = blob.len().max(1) as f32;
                let centroid = blob
                    .state()
                    .positions()
                    .fold(glam::Vec2::ZERO, |acc, p| acc + p.as_vec2())
                    / count;
                log::info!(
                    "tick {:>5} player {player}: {} particles, centroid ({:.1}, {:.1})",
                    tick + 1,
                    blob.len(),
                    centroid.x,
                    centroid.y
                );
            }
        }
    }

    state.validate().context("simulation ended in an inconsistent state")?;
    log::info!(
        "Finished {} ticks: {total_moves} moves out of {total_resolutions} resolutions, {} particles, {} instance bytes",
        state.tick_count(),
        state.particle_count(),
        state.instance_bytes().len()
    );
    Ok(())
}
