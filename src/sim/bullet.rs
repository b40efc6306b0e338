//! Bullets and the bullet pool
//!
//! Bullets live in a fixed-capacity arena. Spawning pops a free slot and
//! initializes it in place; despawning marks the slot inactive and pushes
//! its index back. Each faction keeps its live slots in firing order so the
//! update pass is deterministic.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::enemy::{Enemy, EnemyId, EnemyState};
use super::geometry::Circle;
use crate::consts::{GRAVITY, HOMING_RADIUS};
use crate::tuning::WeaponStats;
use crate::{angle_between, rotate_toward, turn_rate_to_radians};

/// How a bullet moves after leaving the barrel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulletMotion {
    /// Constant velocity
    Straight,
    /// Ballistic drop under gravity
    ParabolicArc,
    /// Turns toward a target at a bounded rate
    Homing,
}

/// Who fired a bullet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Enemy,
}

/// Slot index into the bullet pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BulletId(pub usize);

/// A single projectile
#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub active: bool,
    pub faction: Faction,
    pub pos: Vec2,
    /// Position at the start of the current frame
    pub last_pos: Vec2,
    pub vel: Vec2,
    pub speed: f32,
    pub damage: f32,
    pub radius: f32,
    pub damage_radius: f32,
    pub motion: BulletMotion,
    /// Homing target, validated every frame
    pub target: Option<EnemyId>,
}

impl Default for Bullet {
    fn default() -> Self {
        Self {
            active: false,
            faction: Faction::Player,
            pos: Vec2::ZERO,
            last_pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            speed: 0.0,
            damage: 0.0,
            radius: 0.0,
            damage_radius: 0.0,
            motion: BulletMotion::Straight,
            target: None,
        }
    }
}

impl Bullet {
    /// Bullet leaving `pos` along unit `dir`
    pub fn new(faction: Faction, pos: Vec2, dir: Vec2, stats: &WeaponStats, damage: f32) -> Self {
        Self {
            active: true,
            faction,
            pos,
            last_pos: pos,
            vel: dir * stats.velocity,
            speed: stats.velocity,
            damage,
            radius: stats.bullet_radius,
            damage_radius: stats.damage_radius,
            motion: stats.motion,
            target: None,
        }
    }

    /// Collision circle at the current position
    pub fn circle(&self) -> Circle {
        Circle::new(self.pos, self.radius)
    }

    /// Collision circle at the previous position
    pub fn last_circle(&self) -> Circle {
        Circle::new(self.last_pos, self.radius)
    }

    /// Area damaged on impact
    pub fn damage_circle(&self) -> Circle {
        Circle::new(self.pos, self.damage_radius)
    }

    /// Whether the impact is an explosion rather than a plain hit
    pub fn explodes(&self) -> bool {
        self.damage_radius > self.radius
    }

    /// Steer (for arcing and homing bullets) and move one step.
    ///
    /// `player_aim` is where enemy homing bullets chase; player homing
    /// bullets pick from `enemies`. With nothing to chase a homing bullet
    /// keeps flying straight.
    pub fn update(&mut self, dt: f32, player_aim: Vec2, enemies: &[Enemy]) {
        match self.motion {
            BulletMotion::Straight => {}
            BulletMotion::ParabolicArc => {
                self.vel.y += GRAVITY * dt;
            }
            BulletMotion::Homing => self.steer(dt, player_aim, enemies),
        }
        self.last_pos = self.pos;
        self.pos += self.vel * dt;
    }

    fn steer(&mut self, dt: f32, player_aim: Vec2, enemies: &[Enemy]) {
        let max_turn = homing_turn_rate(self.speed) * dt;
        match self.faction {
            Faction::Enemy => {
                self.vel = rotate_toward(self.vel, player_aim - self.pos, max_turn) * self.speed;
            }
            Faction::Player => {
                if enemies.is_empty() {
                    return;
                }
                let alive = |id: EnemyId| {
                    enemies
                        .iter()
                        .find(|e| e.id == id && e.state == EnemyState::Alive)
                };
                if self.target.and_then(alive).is_none() {
                    let candidates = enemies
                        .iter()
                        .filter(|e| e.state == EnemyState::Alive)
                        .map(|e| (e.id, e.center()));
                    self.target = pick_target(self.pos, self.vel, candidates);
                }
                if let Some(target) = self.target.and_then(alive) {
                    self.vel =
                        rotate_toward(self.vel, target.center() - self.pos, max_turn) * self.speed;
                }
            }
        }
    }
}

/// Homing turn rate in radians per second; faster bullets turn harder
pub fn homing_turn_rate(speed: f32) -> f32 {
    turn_rate_to_radians(250.0 + speed)
}

/// Half-angle of the acquisition cone at `distance`: 90° at the muzzle,
/// narrowing linearly to 30° at the edge of the homing radius
pub fn cone_half_angle(distance: f32) -> f32 {
    std::f32::consts::FRAC_PI_2 * (1.0 - (2.0 / 3.0) * (distance / HOMING_RADIUS))
}

/// Choose the nearest candidate inside the homing radius whose bearing lies
/// within the distance-scaled cone around `heading`
pub fn pick_target(
    pos: Vec2,
    heading: Vec2,
    candidates: impl Iterator<Item = (EnemyId, Vec2)>,
) -> Option<EnemyId> {
    let mut in_range: Vec<(f32, EnemyId, Vec2)> = candidates
        .map(|(id, center)| (pos.distance(center), id, center))
        .filter(|(d, _, _)| *d <= HOMING_RADIUS)
        .collect();
    in_range.sort_by(|a, b| a.0.total_cmp(&b.0));

    in_range
        .into_iter()
        .find(|(d, _, center)| angle_between(heading, *center - pos) < cone_half_angle(*d))
        .map(|(_, id, _)| id)
}

/// Fixed-capacity bullet arena with a free-index stack
#[derive(Debug, Clone)]
pub struct BulletPool {
    slots: Vec<Bullet>,
    free: Vec<usize>,
    player: Vec<usize>,
    enemy: Vec<usize>,
}

impl BulletPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Bullet::default(); capacity],
            // Reversed so the lowest slot is handed out first
            free: (0..capacity).rev().collect(),
            player: Vec::new(),
            enemy: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn live_count(&self) -> usize {
        self.player.len() + self.enemy.len()
    }

    /// Claim a slot for `bullet`; `None` when the pool is exhausted
    pub fn spawn(&mut self, bullet: Bullet) -> Option<BulletId> {
        let idx = self.free.pop()?;
        let faction = bullet.faction;
        self.slots[idx] = Bullet {
            active: true,
            ..bullet
        };
        self.live_list_mut(faction).push(idx);
        Some(BulletId(idx))
    }

    /// Live slots of one faction in firing order
    pub fn live(&self, faction: Faction) -> &[usize] {
        match faction {
            Faction::Player => &self.player,
            Faction::Enemy => &self.enemy,
        }
    }

    fn live_list_mut(&mut self, faction: Faction) -> &mut Vec<usize> {
        match faction {
            Faction::Player => &mut self.player,
            Faction::Enemy => &mut self.enemy,
        }
    }

    pub fn get(&self, id: BulletId) -> &Bullet {
        &self.slots[id.0]
    }

    pub fn get_mut(&mut self, id: BulletId) -> &mut Bullet {
        &mut self.slots[id.0]
    }

    /// Live bullets of every faction
    pub fn iter(&self) -> impl Iterator<Item = &Bullet> {
        self.player
            .iter()
            .chain(self.enemy.iter())
            .map(|&i| &self.slots[i])
    }

    /// Return the bullet at position `index` of a faction's live list.
    ///
    /// Later entries shift down one place, so the caller re-reads the same
    /// index to visit the next bullet.
    pub fn despawn_at(&mut self, faction: Faction, index: usize) {
        let idx = self.live_list_mut(faction).remove(index);
        self.slots[idx].active = false;
        self.slots[idx].target = None;
        self.free.push(idx);
    }

    /// Return every live bullet to the pool
    pub fn clear(&mut self) {
        for faction in [Faction::Player, Faction::Enemy] {
            while !self.live(faction).is_empty() {
                let last = self.live(faction).len() - 1;
                self.despawn_at(faction, last);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;
    use proptest::prelude::*;

    fn pistol() -> WeaponStats {
        Tuning::builtin().player_weapons[0].clone()
    }

    fn bullet(faction: Faction) -> Bullet {
        Bullet::new(faction, Vec2::ZERO, Vec2::X, &pistol(), 1.0)
    }

    #[test]
    fn test_homing_cone_scenario() {
        let heading = Vec2::X;
        let offset = Vec2::from_angle(40f32.to_radians());

        let near = [(EnemyId(7), offset * 250.0)];
        assert_eq!(pick_target(Vec2::ZERO, heading, near.into_iter()), Some(EnemyId(7)));

        let far = [(EnemyId(7), offset * 700.0)];
        assert_eq!(pick_target(Vec2::ZERO, heading, far.into_iter()), None);
    }

    #[test]
    fn test_cone_narrows_with_distance() {
        assert!((cone_half_angle(0.0).to_degrees() - 90.0).abs() < 1e-4);
        assert!((cone_half_angle(250.0).to_degrees() - 60.0).abs() < 1e-4);
        assert!((cone_half_angle(500.0).to_degrees() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_pick_target_prefers_nearest_inside_cone() {
        let heading = Vec2::X;
        let candidates = [
            // Closest but behind the bullet
            (EnemyId(1), Vec2::new(-50.0, 0.0)),
            (EnemyId(2), Vec2::new(300.0, 20.0)),
            (EnemyId(3), Vec2::new(200.0, 10.0)),
        ];
        assert_eq!(
            pick_target(Vec2::ZERO, heading, candidates.into_iter()),
            Some(EnemyId(3))
        );
    }

    #[test]
    fn test_parabolic_bullet_drops() {
        let mut stats = pistol();
        stats.motion = BulletMotion::ParabolicArc;
        let mut b = Bullet::new(Faction::Enemy, Vec2::ZERO, Vec2::X, &stats, 1.0);
        b.update(0.1, Vec2::ZERO, &[]);
        assert!(b.vel.y > 0.0);
        assert!(b.pos.x > 0.0);
        assert_eq!(b.last_pos, Vec2::ZERO);
    }

    #[test]
    fn test_enemy_homing_turns_gradually_toward_player() {
        let mut stats = pistol();
        stats.motion = BulletMotion::Homing;
        let mut b = Bullet::new(Faction::Enemy, Vec2::ZERO, Vec2::X, &stats, 1.0);
        let player = Vec2::new(0.0, 1000.0);
        b.update(1.0 / 60.0, player, &[]);
        // Turned toward +y but nowhere near a full quarter turn in one frame
        assert!(b.vel.y > 0.0);
        assert!(b.vel.x > b.vel.y);
        assert!((b.vel.length() - stats.velocity).abs() < 1e-2);
    }

    #[test]
    fn test_player_homing_without_enemies_flies_straight() {
        let mut stats = pistol();
        stats.motion = BulletMotion::Homing;
        let mut b = Bullet::new(Faction::Player, Vec2::ZERO, Vec2::X, &stats, 1.0);
        b.update(0.5, Vec2::ZERO, &[]);
        assert_eq!(b.vel, Vec2::X * stats.velocity);
        assert_eq!(b.target, None);
    }

    #[test]
    fn test_pool_exhaustion_returns_none() {
        let mut pool = BulletPool::new(2);
        assert!(pool.spawn(bullet(Faction::Player)).is_some());
        assert!(pool.spawn(bullet(Faction::Enemy)).is_some());
        assert!(pool.spawn(bullet(Faction::Player)).is_none());
        assert_eq!(pool.live_count(), 2);
    }

    #[test]
    fn test_despawn_mid_iteration_keeps_order() {
        let mut pool = BulletPool::new(4);
        for i in 0..3 {
            let mut b = bullet(Faction::Player);
            b.damage = i as f32;
            pool.spawn(b);
        }
        pool.despawn_at(Faction::Player, 0);
        let remaining: Vec<f32> = pool
            .live(Faction::Player)
            .iter()
            .map(|&i| pool.get(BulletId(i)).damage)
            .collect();
        assert_eq!(remaining, vec![1.0, 2.0]);
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn test_clear_returns_everything() {
        let mut pool = BulletPool::new(8);
        for _ in 0..5 {
            pool.spawn(bullet(Faction::Enemy));
        }
        pool.clear();
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.free_count(), 8);
    }

    proptest! {
        #[test]
        fn test_pool_conservation(ops in proptest::collection::vec((any::<bool>(), any::<bool>(), 0usize..16), 0..200)) {
            let capacity = 24;
            let mut pool = BulletPool::new(capacity);
            for (fire, player, pick) in ops {
                let faction = if player { Faction::Player } else { Faction::Enemy };
                if fire {
                    pool.spawn(bullet(faction));
                } else if !pool.live(faction).is_empty() {
                    let index = pick % pool.live(faction).len();
                    pool.despawn_at(faction, index);
                }
                prop_assert_eq!(pool.live_count() + pool.free_count(), capacity);
            }
        }
    }
}
