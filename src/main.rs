//! One Man Army headless runner
//!
//! Loads a level, lets the autopilot play it at the fixed timestep and
//! prints the run statistics as JSON.
//!
//! Usage: `one-man-army [settings.json] [level.txt]`

use std::process::ExitCode;

use one_man_army::consts::SIM_DT;
use one_man_army::sim::{GameEvent, TickInput, World, load_ascii_level, tick};
use one_man_army::{Result, Settings, Tuning};

/// Seconds the runner waits before bringing a dead player back
const RESPAWN_DELAY: f32 = 3.0;

/// Built-in level used when no level file is given
const TRAINING_GROUND: &str = r"
    ....................................................................
    ......H..................H...................H..................H...
    ....................................................................
    ....................................................................
    ...............---------..................---------.................
    ....................................................................
    ..T....P..............T...../XX\.................T..............T...
    XXXXXXXXXXXXXXX#########XXXXXXXXXXXXXXXXXXXXXXX#####XXXXXXXXXXXXXXXX
    XXXXXXXXXXXXXX###########XXXXXXXXXXXXXXXXXXXXX#######XXXXXXXXXXXXXXX
    XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX
";

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => Settings::load_from(path)?,
        None => Settings::default(),
    };
    let level = match args.next() {
        Some(path) => load_ascii_level(&std::fs::read_to_string(path)?)?,
        None => load_ascii_level(TRAINING_GROUND)?,
    };

    log::info!(
        "{} run, seed {:#x}, {} frames",
        settings.mode().as_str(),
        settings.seed,
        settings.frames
    );

    let mut world = World::new(level, Tuning::builtin(), &settings)?;
    let input = TickInput {
        idle_mode: true,
        ..Default::default()
    };

    let mut dead_for = 0.0;
    for _ in 0..settings.frames {
        tick(&mut world, &input, SIM_DT);

        for event in world.drain_events() {
            match event {
                GameEvent::WaveAdvanced { wave } => log::info!("Wave {wave}"),
                GameEvent::PlayerKilled { .. } => log::info!("Player down"),
                GameEvent::RunComplete => log::info!("Campaign complete"),
                other => log::trace!("{other:?}"),
            }
        }

        if world.player.is_alive() {
            dead_for = 0.0;
        } else {
            dead_for += SIM_DT;
            if dead_for >= RESPAWN_DELAY {
                world.respawn_player();
            }
        }

        if world.is_finished() {
            break;
        }
    }

    log::info!(
        "Stopped on wave {} ({}) after {} frames",
        world.waves.wave,
        world.time_of_day().as_str(),
        world.frame
    );
    println!("{}", world.stats.to_json()?);
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> ExitCode {
    env_logger::init();
    log::info!("One Man Army (headless) starting...");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() -> ExitCode {
    // The runner is native only; the library is the wasm surface
    let _ = run;
    ExitCode::SUCCESS
}
