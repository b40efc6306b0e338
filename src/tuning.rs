//! Data-driven game balance
//!
//! Stat tables for weapons, tanks and helicopters. The simulation treats
//! them as immutable inputs read at entity construction. Tables loaded from
//! JSON are validated before use.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, Result};
use crate::sim::bullet::BulletMotion;
use crate::sim::collision::point_in_polygon;
use crate::sim::geometry::Polygon;

/// Weapon stat record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub name: String,
    /// Seconds between shots
    pub fire_rate: f32,
    /// 1.0 fires dead straight, 0.0 spreads up to 45° either side
    pub accuracy: f32,
    /// Bullet speed (units/s)
    pub velocity: f32,
    pub damage: f32,
    pub bullets_per_shot: u32,
    /// Rounds per clip, 0 for unlimited
    pub ammo_per_clip: u32,
    pub motion: BulletMotion,
    pub bullet_radius: f32,
    /// Splash radius applied on impact
    pub damage_radius: f32,
}

/// Tank stat record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankStats {
    pub max_health: f32,
    /// Shots fired per stop before moving again
    pub shots_per_pause: u32,
    pub move_speed: f32,
    /// Preferred horizontal distance from the player
    pub optimum_distance: f32,
    pub max_overheat: f32,
    pub overheat_factor: f32,
    /// Sprite frame size; the solid footprint is the lower 65% of it
    pub size: [f32; 2],
    /// Collision hull relative to the tank's foot (bottom centre)
    pub hull: Vec<[f32; 2]>,
    pub weapon: WeaponStats,
}

/// Helicopter stat record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeliStats {
    pub max_health: f32,
    pub acceleration: f32,
    pub max_move_speed: f32,
    pub max_vertical_speed: f32,
    pub max_overheat: f32,
    pub overheat_factor: f32,
    /// Keeps flying in its current direction until the cannon overheats
    #[serde(default)]
    pub strafes: bool,
    /// Sprite frame size
    pub size: [f32; 2],
    /// Collision hull relative to the helicopter's centre
    pub hull: Vec<[f32; 2]>,
    pub weapon: WeaponStats,
}

/// All stat tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    /// Player arsenal, ordered by tier; entry 0 is the starting weapon
    pub player_weapons: Vec<WeaponStats>,
    pub tanks: Vec<TankStats>,
    pub helis: Vec<HeliStats>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Build a collision hull from stat-table points
pub fn hull_polygon(points: &[[f32; 2]]) -> Polygon {
    Polygon::new(points.iter().map(|p| Vec2::from_array(*p)).collect())
}

fn box_hull(half_width: f32, top: f32, bottom: f32) -> Vec<[f32; 2]> {
    vec![
        [-half_width, top],
        [half_width, top],
        [half_width, bottom],
        [-half_width, bottom],
    ]
}

#[allow(clippy::too_many_arguments)]
fn weapon(
    name: &str,
    fire_rate: f32,
    accuracy: f32,
    velocity: f32,
    damage: f32,
    bullets_per_shot: u32,
    ammo_per_clip: u32,
    motion: BulletMotion,
    bullet_radius: f32,
    damage_radius: f32,
) -> WeaponStats {
    WeaponStats {
        name: name.to_string(),
        fire_rate,
        accuracy,
        velocity,
        damage,
        bullets_per_shot,
        ammo_per_clip,
        motion,
        bullet_radius,
        damage_radius,
    }
}

impl Tuning {
    /// Default balance
    pub fn builtin() -> Self {
        use BulletMotion::*;

        let player_weapons = vec![
            weapon("Pistol", 0.25, 0.95, 900.0, 0.35, 1, 0, Straight, 3.0, 3.0),
            weapon("Machine Gun", 0.08, 0.85, 1000.0, 0.2, 1, 150, Straight, 3.0, 3.0),
            weapon("Shotgun", 0.6, 0.6, 850.0, 0.3, 6, 30, Straight, 3.0, 3.0),
            weapon("Grenade Launcher", 0.7, 0.9, 700.0, 1.0, 1, 20, ParabolicArc, 5.0, 60.0),
            weapon("Homing Missiles", 0.5, 0.9, 600.0, 0.8, 1, 25, Homing, 5.0, 40.0),
            weapon("Rocket Launcher", 0.9, 0.95, 800.0, 1.5, 1, 15, Straight, 6.0, 80.0),
            weapon("Swarm Launcher", 0.8, 0.5, 600.0, 0.7, 3, 30, Homing, 5.0, 40.0),
        ];

        let tanks = vec![
            TankStats {
                max_health: 3.0,
                shots_per_pause: 3,
                move_speed: 120.0,
                optimum_distance: 500.0,
                max_overheat: 3.0,
                overheat_factor: 0.5,
                size: [96.0, 64.0],
                hull: box_hull(44.0, -40.0, 0.0),
                weapon: weapon("Tank Cannon", 1.0, 0.97, 700.0, 0.1, 1, 0, Straight, 4.0, 12.0),
            },
            TankStats {
                max_health: 4.5,
                shots_per_pause: 4,
                move_speed: 100.0,
                optimum_distance: 650.0,
                max_overheat: 4.0,
                overheat_factor: 0.5,
                size: [112.0, 72.0],
                hull: box_hull(52.0, -46.0, 0.0),
                weapon: weapon("Mortar", 1.4, 0.9, 650.0, 0.15, 1, 0, ParabolicArc, 5.0, 40.0),
            },
            TankStats {
                max_health: 6.0,
                shots_per_pause: 5,
                move_speed: 80.0,
                optimum_distance: 800.0,
                max_overheat: 5.0,
                overheat_factor: 0.6,
                size: [128.0, 80.0],
                hull: box_hull(60.0, -52.0, 0.0),
                weapon: weapon("Missile Rack", 1.6, 0.95, 450.0, 0.15, 1, 0, Homing, 5.0, 30.0),
            },
        ];

        let helis = vec![
            HeliStats {
                max_health: 2.0,
                acceleration: 400.0,
                max_move_speed: 300.0,
                max_vertical_speed: 150.0,
                max_overheat: 3.0,
                overheat_factor: 0.4,
                strafes: false,
                size: [128.0, 64.0],
                hull: box_hull(56.0, -20.0, 24.0),
                weapon: weapon("Chain Gun", 0.5, 0.9, 750.0, 0.06, 1, 0, Straight, 3.0, 3.0),
            },
            HeliStats {
                max_health: 3.0,
                acceleration: 350.0,
                max_move_speed: 260.0,
                max_vertical_speed: 130.0,
                max_overheat: 3.0,
                overheat_factor: 0.5,
                strafes: false,
                size: [136.0, 68.0],
                hull: box_hull(60.0, -22.0, 26.0),
                weapon: weapon("Bomb Bay", 1.0, 0.95, 300.0, 0.2, 1, 0, ParabolicArc, 6.0, 50.0),
            },
            HeliStats {
                max_health: 3.5,
                acceleration: 450.0,
                max_move_speed: 340.0,
                max_vertical_speed: 160.0,
                max_overheat: 4.0,
                overheat_factor: 0.5,
                strafes: true,
                size: [144.0, 72.0],
                hull: box_hull(64.0, -24.0, 28.0),
                weapon: weapon("Rocket Pods", 0.8, 0.9, 650.0, 0.12, 1, 0, Straight, 5.0, 30.0),
            },
        ];

        Self {
            player_weapons,
            tanks,
            helis,
        }
    }

    /// Parse and validate stat tables from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load stat tables from a JSON file
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject tables the simulation cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.player_weapons.is_empty() {
            return Err(LoadError::stats("player weapon table is empty"));
        }
        if self.tanks.is_empty() || self.helis.is_empty() {
            return Err(LoadError::stats("every enemy kind needs at least one variant"));
        }
        for w in &self.player_weapons {
            validate_weapon(w)?;
        }
        for (i, t) in self.tanks.iter().enumerate() {
            validate_weapon(&t.weapon)?;
            validate_hull(&format!("tank {i}"), &t.hull)?;
            if t.max_health <= 0.0 || t.move_speed < 0.0 || t.shots_per_pause == 0 {
                return Err(LoadError::stats(format!("tank {i} has invalid stats")));
            }
        }
        for (i, h) in self.helis.iter().enumerate() {
            validate_weapon(&h.weapon)?;
            validate_hull(&format!("heli {i}"), &h.hull)?;
            if h.max_health <= 0.0 || h.max_move_speed <= 0.0 || h.max_vertical_speed <= 0.0 {
                return Err(LoadError::stats(format!("heli {i} has invalid stats")));
            }
        }
        Ok(())
    }
}

fn validate_weapon(w: &WeaponStats) -> Result<()> {
    if w.fire_rate <= 0.0 || w.velocity <= 0.0 {
        return Err(LoadError::stats(format!(
            "{}: fire rate and velocity must be positive",
            w.name
        )));
    }
    if !(0.0..=1.0).contains(&w.accuracy) {
        return Err(LoadError::stats(format!("{}: accuracy outside [0, 1]", w.name)));
    }
    if w.bullets_per_shot == 0 {
        return Err(LoadError::stats(format!("{}: fires no bullets", w.name)));
    }
    if w.bullet_radius <= 0.0 || w.damage_radius < 0.0 {
        return Err(LoadError::stats(format!("{}: invalid radii", w.name)));
    }
    Ok(())
}

/// A hull needs three vertices and must enclose its own centroid
fn validate_hull(owner: &str, hull: &[[f32; 2]]) -> Result<()> {
    if hull.len() < 3 {
        return Err(LoadError::stats(format!(
            "{owner}: hull needs at least 3 vertices, got {}",
            hull.len()
        )));
    }
    let verts: Vec<Vec2> = hull.iter().map(|p| Vec2::from_array(*p)).collect();
    let centroid = verts.iter().copied().sum::<Vec2>() / verts.len() as f32;
    if !point_in_polygon(centroid, &verts) {
        return Err(LoadError::stats(format!("{owner}: hull is degenerate")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_validate() {
        let tuning = Tuning::builtin();
        assert!(tuning.validate().is_ok());
        assert_eq!(tuning.player_weapons[0].ammo_per_clip, 0);
    }

    #[test]
    fn test_json_roundtrip_preserves_tables() {
        let tuning = Tuning::builtin();
        let json = tuning.to_json().expect("serializes");
        let back = Tuning::from_json(&json).expect("parses");
        assert_eq!(back, tuning);
    }

    #[test]
    fn test_short_hull_rejected() {
        let mut tuning = Tuning::builtin();
        tuning.tanks[0].hull.truncate(2);
        assert!(matches!(tuning.validate(), Err(LoadError::MalformedStats(_))));
    }

    #[test]
    fn test_collinear_hull_rejected() {
        let mut tuning = Tuning::builtin();
        tuning.helis[0].hull = vec![[0.0, 0.0], [10.0, 0.0], [20.0, 0.0]];
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_bad_accuracy_rejected() {
        let mut tuning = Tuning::builtin();
        tuning.player_weapons[1].accuracy = 1.5;
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_garbage_json_is_error() {
        assert!(matches!(Tuning::from_json("{"), Err(LoadError::Json(_))));
    }
}
