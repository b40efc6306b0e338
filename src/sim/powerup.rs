//! Power-ups and the drop queue
//!
//! Drops are rolled ahead of time into a queue so the next pickup is known
//! before it appears. Killed enemies occasionally release the head of the
//! queue; supply drops replace the queue with five distinct items.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::polygon_vs_rect;
use super::geometry::Aabb;
use super::tile::{TileKind, TileWorld, ramp_surface_y, tile_coords};
use crate::consts::{GRAVITY, MAX_FALL_SPEED, POWERUP_LIFETIME};

/// Power-up sprite size
pub const POWERUP_SIZE: f32 = 32.0;

/// Items per supply drop
pub const SUPPLY_DROP_SIZE: usize = 5;

/// Weapons are grouped into this many tiers for drop selection
const WEAPON_TIERS: i32 = 3;

/// Duplicate rolls allowed before a duplicate is accepted
const MAX_REROLLS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    HealthPack,
    Ammo,
    Repair,
    /// Index into the player arsenal
    Weapon(usize),
    HealthIncrease,
}

/// A pickup lying in (or falling into) the level
#[derive(Debug, Clone, PartialEq)]
pub struct PowerUp {
    pub kind: PowerUpKind,
    /// Bottom centre
    pub pos: Vec2,
    pub vel_y: f32,
    pub life_remaining: f32,
    pub on_ground: bool,
}

impl PowerUp {
    pub fn new(kind: PowerUpKind, pos: Vec2, on_ground: bool) -> Self {
        Self {
            kind,
            pos,
            vel_y: 0.0,
            life_remaining: POWERUP_LIFETIME,
            on_ground,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life_remaining > 0.0
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_foot(self.pos.round(), POWERUP_SIZE, POWERUP_SIZE)
    }

    /// Age, fall, and settle on whatever tile is under the foot point
    pub fn update(&mut self, dt: f32, tiles: &TileWorld) {
        self.life_remaining -= dt;

        self.vel_y = (self.vel_y + GRAVITY * dt).clamp(-MAX_FALL_SPEED, MAX_FALL_SPEED);
        self.pos.y += self.vel_y * dt;

        let tile = tile_coords(self.pos);
        let kind = tiles.collision(tile.x, tile.y);
        if kind.is_slanted() {
            if polygon_vs_rect(&tiles.tile_polygon(tile.x, tile.y), &self.bounds()) {
                if let Some(surface) = ramp_surface_y(kind, tile.x, tile.y, self.pos.x) {
                    self.land(surface);
                }
            }
        } else if kind != TileKind::Passable {
            self.land(tiles.tile_bounds(tile.x, tile.y).top());
        }
    }

    fn land(&mut self, y: f32) {
        self.pos.y = y;
        self.on_ground = true;
        self.vel_y = 0.0;
    }
}

/// Pick a weapon index for a drop, biased toward the newest tier unlocked
/// by the current wave and period. `None` if the arsenal has only the
/// starting weapon.
pub fn roll_weapon(rng: &mut impl Rng, wave: u32, period: u32, arsenal_len: usize) -> Option<usize> {
    let n = arsenal_len as i32;
    if n < 2 {
        return None;
    }
    let (wave, period) = (wave as i32, period as i32);
    let cap = (wave - period * 2).min((period + 1) * 4).max(1);
    let k = rng.random_range(0..cap) + 1;
    let floor = cap.min(n - 1) - n / WEAPON_TIERS + 1;
    let k = k.min(n - 1).max(floor).clamp(1, n - 1);
    Some(k as usize)
}

/// Roll one drop. Supply drops never contain a plain health pack.
pub fn roll_power_up(
    rng: &mut impl Rng,
    wave: u32,
    period: u32,
    arsenal_len: usize,
    supply: bool,
) -> PowerUpKind {
    let mut r = rng.random_range(0..6);
    if supply {
        r = r.max(1);
    }
    match r {
        0 => PowerUpKind::HealthPack,
        1 => PowerUpKind::Ammo,
        2 => PowerUpKind::Repair,
        _ => roll_weapon(rng, wave, period, arsenal_len)
            .map(PowerUpKind::Weapon)
            .unwrap_or(PowerUpKind::Ammo),
    }
}

/// Upcoming drops in release order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerUpQueue {
    queue: VecDeque<PowerUpKind>,
}

impl PowerUpQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn peek(&self) -> Option<PowerUpKind> {
        self.queue.front().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PowerUpKind> {
        self.queue.iter()
    }

    /// Roll and append one drop, or replace the queue with a supply drop.
    ///
    /// New entries never duplicate the head of the queue or each other; a
    /// supply drop holds one guaranteed health increase.
    pub fn enqueue(
        &mut self,
        rng: &mut impl Rng,
        wave: u32,
        period: u32,
        arsenal_len: usize,
        supply: bool,
    ) {
        let count = if supply { SUPPLY_DROP_SIZE } else { 1 };
        let boost_slot = if supply {
            self.queue.clear();
            Some(rng.random_range(0..4))
        } else {
            None
        };

        let mut seen: Vec<PowerUpKind> = self.queue.front().copied().into_iter().collect();
        for i in 0..count {
            if Some(i) == boost_slot {
                self.queue.push_back(PowerUpKind::HealthIncrease);
                continue;
            }
            let mut kind = roll_power_up(rng, wave, period, arsenal_len, supply);
            for _ in 0..MAX_REROLLS {
                if !seen.contains(&kind) {
                    break;
                }
                kind = roll_power_up(rng, wave, period, arsenal_len, supply);
            }
            seen.push(kind);
            self.queue.push_back(kind);
        }
    }

    /// Take the next drop, rolling one first if the queue ran dry
    pub fn pop(&mut self, rng: &mut impl Rng, wave: u32, period: u32, arsenal_len: usize) -> PowerUpKind {
        if self.queue.is_empty() {
            self.enqueue(rng, wave, period, arsenal_len, false);
        }
        self.queue.pop_front().unwrap_or(PowerUpKind::Ammo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{TILE_HEIGHT, TILE_WIDTH};
    use crate::sim::tile::Tile;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn world() -> TileWorld {
        // Floor on row 5, one up-ramp at (3, 4)
        let (w, h) = (8, 7);
        let mut tiles = vec![Tile::EMPTY; w * h];
        for x in 0..w {
            tiles[5 * w + x] = Tile::new(TileKind::Impassable, false);
            tiles[6 * w + x] = Tile::new(TileKind::Impassable, false);
        }
        tiles[4 * w + 3] = Tile::new(TileKind::SlantedUp, false);
        TileWorld::new(w, h, tiles)
    }

    #[test]
    fn test_falls_onto_floor() {
        let tiles = world();
        let mut pup = PowerUp::new(PowerUpKind::Ammo, Vec2::new(40.0, 0.0), false);
        for _ in 0..240 {
            pup.update(1.0 / 60.0, &tiles);
        }
        assert!(pup.on_ground);
        assert_eq!(pup.pos.y, 5.0 * TILE_HEIGHT);
    }

    #[test]
    fn test_settles_on_ramp_surface() {
        let tiles = world();
        let x = 3.5 * TILE_WIDTH;
        let mut pup = PowerUp::new(PowerUpKind::Repair, Vec2::new(x, 0.0), false);
        for _ in 0..240 {
            pup.update(1.0 / 60.0, &tiles);
        }
        assert!(pup.on_ground);
        let expected = ramp_surface_y(TileKind::SlantedUp, 3, 4, x).expect("ramp");
        assert!((pup.pos.y - expected).abs() < 1e-3);
    }

    #[test]
    fn test_expires_after_lifetime() {
        let tiles = world();
        let mut pup = PowerUp::new(PowerUpKind::Ammo, Vec2::new(40.0, 240.0), true);
        for _ in 0..(POWERUP_LIFETIME * 60.0) as usize - 1 {
            pup.update(1.0 / 60.0, &tiles);
        }
        assert!(pup.is_alive());
        pup.update(2.0 / 60.0, &tiles);
        assert!(!pup.is_alive());
    }

    #[test]
    fn test_supply_drop_contents() {
        let mut rng = Pcg32::seed_from_u64(42);
        // Wave 1 only unlocks one weapon, too few kinds for five distinct items
        for wave in 2..25 {
            let mut queue = PowerUpQueue::new();
            queue.enqueue(&mut rng, wave, wave / 6, 7, false);
            queue.enqueue(&mut rng, wave, wave / 6, 7, true);
            assert_eq!(queue.len(), SUPPLY_DROP_SIZE);

            let items: Vec<PowerUpKind> = queue.iter().copied().collect();
            let boosts = items.iter().filter(|k| **k == PowerUpKind::HealthIncrease).count();
            assert_eq!(boosts, 1);
            assert!(!items.contains(&PowerUpKind::HealthPack));
            for (i, a) in items.iter().enumerate() {
                assert!(items[i + 1..].iter().all(|b| b != a), "duplicate {a:?}");
            }
        }
    }

    #[test]
    fn test_weapon_rolls_stay_in_arsenal() {
        let mut rng = Pcg32::seed_from_u64(7);
        for wave in 1..40 {
            for _ in 0..20 {
                let k = roll_weapon(&mut rng, wave, (wave / 6).min(4), 7).expect("weapon");
                assert!((1..7).contains(&k));
            }
        }
        assert_eq!(roll_weapon(&mut rng, 5, 0, 1), None);
    }

    #[test]
    fn test_pop_refills_empty_queue() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut queue = PowerUpQueue::new();
        let _ = queue.pop(&mut rng, 1, 0, 7);
        assert!(queue.is_empty());
    }
}
