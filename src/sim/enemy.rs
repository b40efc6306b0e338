//! Enemies
//!
//! Tanks and helicopters share one state machine and damage model; their
//! steering lives in [`TankBrain`] and [`HeliBrain`], dispatched through the
//! closed [`Brain`] enum.
//!
//! Damage is buffered: `take_damage` only adds to a pending amount, and the
//! next `update` subtracts it and checks for death. A lethal hit therefore
//! leaves the enemy Alive for exactly one more frame (the hit-flash frame).

use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::bullet::{BulletPool, Faction};
use super::geometry::{Aabb, Polygon};
use super::heli::HeliBrain;
use super::state::GameEvent;
use super::tank::TankBrain;
use super::tile::TileWorld;
use super::weapon::Weapon;
use crate::consts::ENEMY_SPAWN_TIME;
use crate::tuning::{HeliStats, TankStats, hull_polygon};

/// Closed set of enemy kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Tank,
    Heli,
}

impl EnemyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnemyKind::Tank => "tank",
            EnemyKind::Heli => "heli",
        }
    }
}

/// Stable enemy handle; lookups validate it against the live list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnemyId(pub u32);

/// Enemy lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyState {
    /// Materialising; cannot act
    Spawning,
    Alive,
    /// Awaiting removal by the world
    Dead,
}

/// What enemies know about the player this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerView {
    /// Foot position (bottom centre)
    pub pos: Vec2,
    /// Shoulder the enemies aim at
    pub arm: Vec2,
    /// Measured displacement over the last frame
    pub velocity: Vec2,
    pub alive: bool,
}

/// Shared world access for an enemy update
pub struct EnemyContext<'a> {
    pub tiles: &'a TileWorld,
    pub player: PlayerView,
    pub pool: &'a mut BulletPool,
    pub rng: &'a mut Pcg32,
    pub events: &'a mut Vec<GameEvent>,
}

/// Cannon heat: each shot adds heat, and reaching the limit locks the
/// cannon until it has fully cooled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overheat {
    pub heat: f32,
    pub max: f32,
    pub factor: f32,
    pub locked: bool,
}

impl Overheat {
    pub fn new(max: f32, factor: f32) -> Self {
        Self {
            heat: 0.0,
            max,
            factor,
            locked: false,
        }
    }

    pub fn add_shot(&mut self, fire_rate: f32) {
        self.heat += fire_rate * self.factor;
        if self.heat >= self.max {
            self.locked = true;
        }
    }

    pub fn cool(&mut self, dt: f32) {
        self.heat = (self.heat - dt).max(0.0);
        if self.heat <= 0.0 {
            self.locked = false;
        }
    }
}

/// Body, cannon and motion state common to every enemy
#[derive(Debug, Clone, PartialEq)]
pub struct Chassis {
    /// Tanks: foot position. Helicopters: centre.
    pub pos: Vec2,
    pub vel: Vec2,
    /// Sprite frame size
    pub size: Vec2,
    pub hull: Polygon,
    pub cannon: Weapon,
    pub cannon_pos: Vec2,
    pub cannon_dir: Vec2,
    /// Seconds since the last shot
    pub fire_time: f32,
    pub overheat: Overheat,
}

impl Chassis {
    /// Fire the cannon from `muzzle` units along its heading.
    ///
    /// Returns true if any bullet left the barrel.
    pub fn fire(&mut self, muzzle: f32, ctx: &mut EnemyContext<'_>) -> bool {
        let origin = self.cannon_pos + self.cannon_dir * muzzle;
        let fired = self.cannon.fire(
            origin,
            self.cannon_dir,
            Faction::Enemy,
            ctx.tiles,
            ctx.rng,
            ctx.pool,
        );
        if fired == 0 {
            return false;
        }
        ctx.events.push(GameEvent::ProjectileFired {
            faction: Faction::Enemy,
            weapon: self.cannon.stats.name.clone(),
            pos: origin,
            dir: self.cannon_dir,
        });
        self.overheat.add_shot(self.cannon.stats.fire_rate);
        true
    }
}

/// Per-kind steering state
#[derive(Debug, Clone, PartialEq)]
pub enum Brain {
    Tank(TankBrain),
    Heli(HeliBrain),
}

/// A tank or helicopter
#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub id: EnemyId,
    /// Row in the stat table for this kind
    pub variant: usize,
    /// Index of the spawn point this enemy occupies
    pub spawn_point: usize,
    pub state: EnemyState,
    pub health: f32,
    pub max_health: f32,
    pending_damage: f32,
    spawn_timer: f32,
    pub chassis: Chassis,
    pub brain: Brain,
}

/// Stat multiplier for tanks: grows at half speed once the variant is "due"
pub fn tank_wave_factor(wave: u32, variant: usize) -> f32 {
    let mut factor = (wave as i32 - variant as i32 * 3 - 6) as f32 / 10.0;
    if factor > 0.0 {
        factor *= 0.5;
    }
    (factor + 1.0).max(0.5)
}

/// Stat multiplier for helicopters: square-root damped after the first period
pub fn heli_wave_factor(wave: u32, variant: usize) -> f32 {
    let (wave, variant) = (wave as i32, variant as i32);
    let mut factor = 1.0 + (wave - variant * 3 - 6) as f32 / 10.0;
    if factor > 1.0 {
        factor = 1.0 + (wave - (wave / 6) * 2 - variant * 3 - 6) as f32 / 10.0;
        factor = factor.max(0.0).sqrt();
    }
    factor.max(0.5)
}

impl Enemy {
    /// Tank standing at `pos` (foot position)
    pub fn tank(
        id: EnemyId,
        variant: usize,
        stats: &TankStats,
        spawn_point: usize,
        pos: Vec2,
        wave: u32,
        player: &PlayerView,
    ) -> Self {
        let factor = tank_wave_factor(wave, variant);
        let cannon = Weapon::scaled(stats.weapon.clone(), factor);
        let fire_rate = cannon.stats.fire_rate;
        let size = Vec2::from_array(stats.size);
        let mut hull = hull_polygon(&stats.hull);
        hull.set_position(pos);
        let cannon_pos = TankBrain::cannon_mount(pos, size);

        Self {
            id,
            variant,
            spawn_point,
            state: EnemyState::Spawning,
            health: stats.max_health * factor,
            max_health: stats.max_health * factor,
            pending_damage: 0.0,
            spawn_timer: 0.0,
            chassis: Chassis {
                pos,
                vel: Vec2::ZERO,
                size,
                hull,
                cannon_pos,
                cannon_dir: (player.pos - pos).normalize_or(Vec2::NEG_X),
                fire_time: fire_rate - fire_rate / 3.0,
                overheat: Overheat::new(stats.max_overheat, stats.overheat_factor),
                cannon,
            },
            brain: Brain::Tank(TankBrain::new(stats, fire_rate)),
        }
    }

    /// Helicopter hovering at `pos` (centre)
    pub fn heli(
        id: EnemyId,
        variant: usize,
        stats: &HeliStats,
        spawn_point: usize,
        pos: Vec2,
        wave: u32,
        player: &PlayerView,
    ) -> Self {
        let factor = heli_wave_factor(wave, variant);
        let cannon = Weapon::scaled(stats.weapon.clone(), factor);
        let size = Vec2::from_array(stats.size);
        let mut hull = hull_polygon(&stats.hull);
        hull.set_position(pos);
        let brain = HeliBrain::new(stats);
        let cannon_pos = HeliBrain::cannon_mount(pos, size, 0.0);

        let mut chassis = Chassis {
            pos,
            vel: Vec2::ZERO,
            size,
            hull,
            cannon_pos,
            cannon_dir: Vec2::NEG_X,
            fire_time: 1.0,
            overheat: Overheat::new(stats.max_overheat, stats.overheat_factor),
            cannon,
        };
        chassis.cannon_dir = HeliBrain::aim_direction(&chassis, player);

        Self {
            id,
            variant,
            spawn_point,
            state: EnemyState::Spawning,
            health: stats.max_health * factor,
            max_health: stats.max_health * factor,
            pending_damage: 0.0,
            spawn_timer: 0.0,
            chassis,
            brain: Brain::Heli(brain),
        }
    }

    pub fn kind(&self) -> EnemyKind {
        match self.brain {
            Brain::Tank(_) => EnemyKind::Tank,
            Brain::Heli(_) => EnemyKind::Heli,
        }
    }

    pub fn is_tank(&self) -> bool {
        matches!(self.brain, Brain::Tank(_))
    }

    pub fn pos(&self) -> Vec2 {
        self.chassis.pos
    }

    pub fn hull(&self) -> &Polygon {
        &self.chassis.hull
    }

    pub fn pending_damage(&self) -> f32 {
        self.pending_damage
    }

    /// Visual and targeting centre
    pub fn center(&self) -> Vec2 {
        match self.brain {
            Brain::Tank(_) => self.inner_bounds().center(),
            Brain::Heli(_) => self.chassis.hull.center(),
        }
    }

    /// Solid footprint: the lower 65% of a tank's frame, or a helicopter's hull box
    pub fn inner_bounds(&self) -> Aabb {
        match self.brain {
            Brain::Tank(_) => TankBrain::inner_bounds(self.chassis.pos, self.chassis.size),
            Brain::Heli(_) => self.chassis.hull.bounding_box(),
        }
    }

    /// Full sprite frame, used for AI spacing
    pub fn outer_bounds(&self) -> Aabb {
        match self.brain {
            Brain::Tank(_) => TankBrain::outer_bounds(self.chassis.pos, self.chassis.size),
            Brain::Heli(_) => self.chassis.hull.bounding_box(),
        }
    }

    /// Airborne tanks crush whatever they land on
    pub fn on_ground(&self) -> bool {
        match &self.brain {
            Brain::Tank(t) => t.on_ground,
            Brain::Heli(_) => false,
        }
    }

    /// Buffer damage; it lands on the next update
    pub fn take_damage(&mut self, amount: f32) {
        self.pending_damage += amount;
    }

    /// Advance one frame: apply buffered damage, progress spawning, then steer
    pub fn update(&mut self, dt: f32, neighbours: Neighbours<'_>, ctx: &mut EnemyContext<'_>) {
        self.health -= self.pending_damage;
        self.pending_damage = 0.0;
        if self.health <= 0.0 {
            self.state = EnemyState::Dead;
        }

        if self.state == EnemyState::Spawning {
            self.spawn_timer += dt;
            if self.spawn_timer >= ENEMY_SPAWN_TIME {
                self.state = EnemyState::Alive;
            }
        }

        if self.state == EnemyState::Alive {
            match &mut self.brain {
                Brain::Tank(brain) => brain.update(&mut self.chassis, dt, neighbours, ctx),
                Brain::Heli(brain) => brain.update(&mut self.chassis, dt, neighbours, ctx),
            }
        }

        self.chassis.overheat.cool(dt);
    }
}

/// Every enemy except the one being updated, in list order
#[derive(Debug, Clone, Copy)]
pub struct Neighbours<'a> {
    before: &'a [Enemy],
    after: &'a [Enemy],
}

impl<'a> Neighbours<'a> {
    pub const NONE: Neighbours<'static> = Neighbours {
        before: &[],
        after: &[],
    };

    pub fn iter(&self) -> impl Iterator<Item = &'a Enemy> + use<'a> {
        self.before.iter().chain(self.after.iter())
    }

    pub fn tanks(&self) -> impl Iterator<Item = &'a Enemy> + use<'a> {
        self.iter().filter(|e| e.is_tank())
    }

    pub fn helis(&self) -> impl Iterator<Item = &'a Enemy> + use<'a> {
        self.iter().filter(|e| !e.is_tank())
    }
}

/// Borrow enemy `index` mutably alongside read access to the rest.
///
/// `None` once `index` runs past the end of the list.
pub fn split_neighbours(enemies: &mut [Enemy], index: usize) -> Option<(&mut Enemy, Neighbours<'_>)> {
    if index >= enemies.len() {
        return None;
    }
    let (before, rest) = enemies.split_at_mut(index);
    let (current, after) = rest.split_first_mut()?;
    Some((
        current,
        Neighbours {
            before: &*before,
            after: &*after,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tile::Tile;
    use crate::tuning::Tuning;
    use rand::SeedableRng;

    fn player_far() -> PlayerView {
        PlayerView {
            pos: Vec2::new(5000.0, 480.0),
            arm: Vec2::new(5000.0, 430.0),
            velocity: Vec2::ZERO,
            alive: true,
        }
    }

    fn flat_world() -> TileWorld {
        let mut tiles = vec![Tile::EMPTY; 40 * 12];
        for x in 0..40 {
            tiles[10 * 40 + x] = Tile::new(super::super::tile::TileKind::Impassable, false);
        }
        TileWorld::new(40, 12, tiles)
    }

    fn run_update(enemy: &mut Enemy, dt: f32) {
        let tiles = flat_world();
        let mut pool = BulletPool::new(64);
        let mut rng = Pcg32::seed_from_u64(9);
        let mut events = Vec::new();
        let mut ctx = EnemyContext {
            tiles: &tiles,
            player: player_far(),
            pool: &mut pool,
            rng: &mut rng,
            events: &mut events,
        };
        enemy.update(dt, Neighbours::NONE, &mut ctx);
    }

    fn spawned_tank() -> Enemy {
        let tuning = Tuning::builtin();
        Enemy::tank(
            EnemyId(1),
            0,
            &tuning.tanks[0],
            0,
            Vec2::new(640.0, 480.0),
            1,
            &player_far(),
        )
    }

    #[test]
    fn test_spawning_becomes_alive_after_spawn_time() {
        let mut tank = spawned_tank();
        assert_eq!(tank.state, EnemyState::Spawning);
        run_update(&mut tank, 0.5);
        assert_eq!(tank.state, EnemyState::Spawning);
        run_update(&mut tank, 0.5);
        assert_eq!(tank.state, EnemyState::Alive);
    }

    #[test]
    fn test_damage_death_lag() {
        let mut tank = spawned_tank();
        run_update(&mut tank, ENEMY_SPAWN_TIME);
        assert_eq!(tank.state, EnemyState::Alive);

        tank.health = 1.0;
        tank.take_damage(1.0);
        // Still alive until the next update applies the buffer
        assert_eq!(tank.state, EnemyState::Alive);
        assert_eq!(tank.health, 1.0);
        assert_eq!(tank.pending_damage(), 1.0);

        run_update(&mut tank, 1.0 / 60.0);
        assert_eq!(tank.state, EnemyState::Dead);
        assert_eq!(tank.pending_damage(), 0.0);
    }

    #[test]
    fn test_wave_factors() {
        assert_eq!(tank_wave_factor(6, 0), 1.0);
        assert_eq!(tank_wave_factor(16, 0), 1.5);
        assert_eq!(tank_wave_factor(1, 2), 0.5);
        assert_eq!(heli_wave_factor(6, 0), 1.0);
        assert!(heli_wave_factor(1, 0) >= 0.5);
        // Past the first period growth is square-root damped
        let late = heli_wave_factor(20, 0);
        assert!(late > 1.0 && late < 1.0 + (20.0 - 6.0) / 10.0);
    }

    #[test]
    fn test_overheat_locks_until_cool() {
        let mut heat = Overheat::new(1.0, 0.5);
        heat.add_shot(1.0);
        assert!(!heat.locked);
        heat.add_shot(1.0);
        assert!(heat.locked);
        heat.cool(0.5);
        assert!(heat.locked);
        heat.cool(0.6);
        assert!(!heat.locked);
    }

    #[test]
    fn test_split_neighbours_excludes_self() {
        let mut enemies = vec![spawned_tank(), spawned_tank(), spawned_tank()];
        enemies[1].id = EnemyId(2);
        enemies[2].id = EnemyId(3);
        let (me, others) = split_neighbours(&mut enemies, 1).expect("in range");
        assert_eq!(me.id, EnemyId(2));
        let ids: Vec<u32> = others.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_split_neighbours_past_end() {
        let mut enemies = vec![spawned_tank()];
        assert!(split_neighbours(&mut enemies, 1).is_none());
        assert!(split_neighbours(&mut [], 0).is_none());
    }
}
