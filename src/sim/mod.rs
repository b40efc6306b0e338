//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (spawn order for entities, slot order for bullets)
//! - No rendering, audio or platform dependencies

pub mod bullet;
pub mod collision;
pub mod combat;
pub mod enemy;
pub mod geometry;
pub mod heli;
pub mod level;
pub mod player;
pub mod powerup;
pub mod state;
pub mod tank;
pub mod tick;
pub mod tile;
pub mod waves;
pub mod weapon;

pub use bullet::{Bullet, BulletId, BulletMotion, BulletPool, Faction};
pub use collision::{point_in_polygon, shapes_intersect};
pub use enemy::{Enemy, EnemyId, EnemyKind, EnemyState};
pub use geometry::{Aabb, Circle, Polygon, Shape};
pub use level::{Level, LevelImage, SpawnPoint, load_ascii_level, load_level};
pub use player::Player;
pub use powerup::{PowerUp, PowerUpKind, PowerUpQueue};
pub use state::{DamageTarget, GameEvent, World};
pub use tick::{TickInput, autopilot, tick};
pub use tile::{Tile, TileKind, TileWorld};
pub use waves::{GamePhase, TimeOfDay, WaveScheduler};
pub use weapon::Weapon;
