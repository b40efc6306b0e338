//! Weapons
//!
//! A weapon turns one trigger pull into one or more bullets drawn from the
//! pool, spread according to its accuracy.

use glam::Vec2;
use rand::Rng;

use super::bullet::{Bullet, BulletPool, Faction};
use super::tile::{TileKind, TileWorld};
use crate::heading;
use crate::tuning::WeaponStats;

/// An owned weapon instance
#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    pub stats: WeaponStats,
    /// Damage per bullet after wave scaling
    pub damage: f32,
    /// Rounds left; unused when the clip is unlimited
    pub ammo: u32,
    /// False once a limited clip runs dry
    pub active: bool,
}

impl Weapon {
    pub fn new(stats: WeaponStats) -> Self {
        Self {
            damage: stats.damage,
            ammo: stats.ammo_per_clip,
            active: true,
            stats,
        }
    }

    /// Weapon whose per-bullet damage is multiplied by `scale`
    pub fn scaled(stats: WeaponStats, scale: f32) -> Self {
        let mut weapon = Self::new(stats);
        weapon.damage *= scale;
        weapon
    }

    pub fn unlimited(&self) -> bool {
        self.stats.ammo_per_clip == 0
    }

    /// Top up by one clip, holding at most three. Returns false if nothing changed.
    pub fn add_clip(&mut self) -> bool {
        if self.unlimited() || self.ammo >= self.stats.ammo_per_clip * 3 {
            return false;
        }
        self.ammo = (self.ammo + self.stats.ammo_per_clip).min(self.stats.ammo_per_clip * 3);
        self.active = true;
        true
    }

    /// Pull the trigger once.
    ///
    /// Bullets leave `origin` fanned around `dir`; each gets a fixed slot in
    /// the fan plus random jitter of up to `(1 - accuracy) * 45°`. Returns
    /// the number of bullets spawned. Nothing is fired (and no ammo spent)
    /// when the muzzle is inside solid ground or the pool cannot hold the
    /// whole volley.
    pub fn fire(
        &mut self,
        origin: Vec2,
        dir: Vec2,
        faction: Faction,
        tiles: &TileWorld,
        rng: &mut impl Rng,
        pool: &mut BulletPool,
    ) -> usize {
        if !self.active || tiles.collision_at(origin) == TileKind::Impassable {
            return 0;
        }
        let count = self.stats.bullets_per_shot as usize;
        if pool.free_count() < count {
            log::debug!("Bullet pool exhausted, {} shot skipped", self.stats.name);
            return 0;
        }

        if !self.unlimited() {
            self.ammo = self.ammo.saturating_sub(1);
        }

        let max_deviation = (1.0 - self.stats.accuracy) * std::f32::consts::FRAC_PI_4;
        let half = (count / 2) as f32;
        let base = heading(dir);
        for i in 0..count {
            let slot = (i as f32 - half) * max_deviation * 2.0;
            let jitter = rng.random::<f32>() * 2.0 * max_deviation - max_deviation;
            let bullet_dir = Vec2::from_angle(base + slot + jitter);
            pool.spawn(Bullet::new(faction, origin, bullet_dir, &self.stats, self.damage));
        }

        if !self.unlimited() && self.ammo == 0 {
            self.active = false;
        }
        count
    }
}
