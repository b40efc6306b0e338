//! Fixed timestep simulation tick
//!
//! Latches player input and advances the world deterministically.

use glam::Vec2;

use super::enemy::EnemyState;
use super::state::World;

/// Autopilot keeps roughly this far from its target
const AUTOPILOT_RANGE: (f32, f32) = (250.0, 550.0);

/// Autopilot opens fire inside this distance
const AUTOPILOT_FIRE_RANGE: f32 = 900.0;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    /// Horizontal movement, -1 (left) to 1 (right)
    pub movement: f32,
    pub jump: bool,
    pub crouch: bool,
    pub fire: bool,
    /// Cycle to the next weapon
    pub switch_weapon: bool,
    /// Trigger rage mode when the meter is full
    pub activate_special: bool,
    /// Desired aim direction; the arm turns toward it at a capped rate
    pub aim: Option<Vec2>,
    /// Idle/demo mode - AI plays the game
    pub idle_mode: bool,
}

/// Advance the world by one fixed timestep
pub fn tick(world: &mut World, input: &TickInput, dt: f32) {
    if world.is_finished() {
        return;
    }

    let input = if input.idle_mode {
        autopilot(world)
    } else {
        input.clone()
    };

    let has_control = world.player_has_control();
    if let Some(event) = world.player.handle_input(&input, has_control) {
        world.push_event(event);
    }

    world.update(dt);
}

/// Simple AI: face the nearest live enemy, hold a comfortable distance,
/// shoot when in range and hop when stuck.
pub fn autopilot(world: &World) -> TickInput {
    let player = &world.player;
    let arm = player.arm_position();

    let target = world
        .enemies
        .iter()
        .filter(|e| e.state == EnemyState::Alive)
        .map(|e| (e.center(), e.center().distance(arm)))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    let Some((target, distance)) = target else {
        // Nothing to shoot: drift back toward the start
        let offset = world.player_start.x - player.pos.x;
        return TickInput {
            movement: if offset.abs() > 64.0 { offset.signum() } else { 0.0 },
            activate_special: player.rage_full(),
            ..Default::default()
        };
    };

    let side = (target.x - player.pos.x).signum();
    let movement = if distance > AUTOPILOT_RANGE.1 {
        side
    } else if distance < AUTOPILOT_RANGE.0 {
        -side
    } else {
        0.0
    };

    // Stuck against a wall: tap jump, releasing every other half second
    let stalled = movement != 0.0 && player.last_frame_velocity().x.abs() < 1.0;
    let jump = stalled && player.on_ground() && (world.frame / 30) % 2 == 0;

    // Out of ammo on the current weapon: cycle back toward the pistol
    let empty = player
        .current_weapon()
        .is_some_and(|w| !w.unlimited() && w.ammo == 0);

    TickInput {
        movement,
        jump,
        fire: distance < AUTOPILOT_FIRE_RANGE,
        switch_weapon: empty && world.frame % 10 == 0,
        activate_special: player.rage_full(),
        aim: Some((target - arm).normalize_or(Vec2::X)),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::settings::Settings;
    use crate::sim::level::load_ascii_level;
    use crate::sim::state::GameEvent;
    use crate::sim::waves::GamePhase;
    use crate::tuning::Tuning;

    const FIELD: &str = "
        ......................................
        ..................H.............H.....
        ......................................
        ...........--.........................
        .P..........................T.....T...
        XXXXXXXX##XXXXXXXXXXXXXXXXXXXXXXXXXXXX
        XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX
    ";

    fn world(seed: u64) -> World {
        let level = load_ascii_level(FIELD).expect("level");
        let settings = Settings {
            seed,
            ..Default::default()
        };
        World::new(level, Tuning::builtin(), &settings).expect("world")
    }

    #[test]
    fn test_tick_moves_player() {
        let mut world = world(12345);
        for _ in 0..30 {
            tick(&mut world, &TickInput::default(), SIM_DT);
        }
        let start = world.player.pos;

        let input = TickInput {
            movement: 1.0,
            ..Default::default()
        };
        for _ in 0..30 {
            tick(&mut world, &input, SIM_DT);
        }
        assert!(world.player.pos.x > start.x);
        assert_eq!(world.frame, 60);
    }

    #[test]
    fn test_tick_fire_spends_bullets() {
        let mut world = world(12345);
        let input = TickInput {
            fire: true,
            aim: Some(Vec2::X),
            ..Default::default()
        };
        for _ in 0..30 {
            tick(&mut world, &input, SIM_DT);
        }
        let events = world.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::ProjectileFired { .. })));
        assert_eq!(
            world.bullets.live_count() + world.bullets.free_count(),
            world.bullets.capacity()
        );
    }

    #[test]
    fn test_tick_idle_mode_runs_waves() {
        let mut world = world(7);
        let input = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        let mut phases = Vec::new();
        for _ in 0..60 * 20 {
            tick(&mut world, &input, SIM_DT);
            for event in world.drain_events() {
                if let GameEvent::PhaseChanged { to, .. } = event {
                    phases.push(to);
                }
            }
            assert_eq!(
                world.bullets.live_count() + world.bullets.free_count(),
                world.bullets.capacity()
            );
        }
        assert!(phases.contains(&GamePhase::InGame));
        assert!(world.stats.time_played > 19.0);
    }

    #[test]
    fn test_determinism() {
        // Two worlds with same seed should produce identical results
        let mut world1 = world(99999);
        let mut world2 = world(99999);

        let inputs = [
            TickInput {
                movement: 1.0,
                ..Default::default()
            },
            TickInput {
                jump: true,
                fire: true,
                aim: Some(Vec2::new(1.0, -0.5)),
                ..Default::default()
            },
            TickInput {
                idle_mode: true,
                ..Default::default()
            },
            TickInput::default(),
        ];

        for input in inputs.iter().cycle().take(60 * 15) {
            tick(&mut world1, input, SIM_DT);
            tick(&mut world2, input, SIM_DT);
        }

        assert_eq!(world1.stats, world2.stats);
        assert_eq!(world1.enemies.len(), world2.enemies.len());
        assert_eq!(world1.player.pos, world2.player.pos);
        assert_eq!(world1.bullets.live_count(), world2.bullets.live_count());
        assert_eq!(world1.drain_events(), world2.drain_events());
    }
}
