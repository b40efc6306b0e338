//! One Man Army - simulation core for a tile-based side-scrolling shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (collision, tile world, entities, waves)
//! - `tuning`: Data-driven entity stat tables
//! - `settings`: Run settings (mode, seed, pool sizing)
//! - `stats`: Cumulative run statistics handed to save/load collaborators
//! - `error`: Load-time error types

pub mod error;
pub mod settings;
pub mod sim;
pub mod stats;
pub mod tuning;

pub use error::{LoadError, Result};
pub use settings::{GameMode, Settings};
pub use stats::RunStats;
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Tile dimensions in world units
    pub const TILE_WIDTH: f32 = 64.0;
    pub const TILE_HEIGHT: f32 = 48.0;

    /// Width of the visible play area, used for spawn distances and supply drops
    pub const VIEWPORT_WIDTH: f32 = 1280.0;

    /// Maximum outstanding bullets across both factions
    pub const BULLET_POOL_CAPACITY: usize = 2000;

    /// Player movement
    pub const PLAYER_MOVE_ACCELERATION: f32 = 14000.0;
    pub const PLAYER_MAX_MOVE_SPEED: f32 = 2000.0;
    pub const PLAYER_AIR_DRAG: f32 = 20.0;
    pub const PLAYER_MAX_JUMP_TIME: f32 = 0.35;
    pub const PLAYER_JUMP_LAUNCH_VELOCITY: f32 = -1000.0;
    pub const PLAYER_GRAVITY: f32 = 5000.0;
    pub const PLAYER_MAX_FALL_SPEED: f32 = 1000.0;

    /// Player collision box
    pub const PLAYER_WIDTH: f32 = 32.0;
    pub const PLAYER_HEIGHT: f32 = 80.0;
    pub const PLAYER_CROUCH_HEIGHT: f32 = 48.0;

    /// Gravity shared by tanks, power-ups and arcing bullets (units/s²)
    pub const GRAVITY: f32 = 500.0;
    pub const MAX_FALL_SPEED: f32 = 1000.0;

    /// Seconds an enemy spends materialising before it can act or be hurt
    pub const ENEMY_SPAWN_TIME: f32 = 1.0;

    /// Homing bullets only consider enemies inside this radius
    pub const HOMING_RADIUS: f32 = 500.0;

    /// Power-up lifetime in seconds
    pub const POWERUP_LIFETIME: f32 = 30.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Heading of a vector in radians (screen space, +y down)
#[inline]
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Turn `current` toward `target` by at most `max_angle` radians along the shortest arc.
///
/// Both inputs are treated as directions; the result is a unit vector. When the
/// remaining angle fits inside `max_angle` the normalized target is returned
/// exactly, so callers can compare headings for equality.
pub fn rotate_toward(current: Vec2, target: Vec2, max_angle: f32) -> Vec2 {
    let target = target.normalize_or_zero();
    let current = current.normalize_or_zero();
    if target == Vec2::ZERO {
        return current;
    }
    if current == Vec2::ZERO {
        return target;
    }

    let delta = normalize_angle(heading(target) - heading(current));
    if delta.abs() <= max_angle {
        return target;
    }
    Vec2::from_angle(heading(current) + max_angle * delta.signum())
}

/// Convert a turn rate in the authored units (2000 per full turn per second) to radians/s
#[inline]
pub fn turn_rate_to_radians(rate: f32) -> f32 {
    rate * std::f32::consts::TAU / 2000.0
}

/// Angle in radians between two directions, in [0, π]
#[inline]
pub fn angle_between(a: Vec2, b: Vec2) -> f32 {
    normalize_angle(heading(b) - heading(a)).abs()
}
