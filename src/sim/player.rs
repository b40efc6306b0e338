//! Player character
//!
//! Physics run in a fixed order each frame: gravity, the jump curve,
//! horizontal acceleration with drag, then collision resolution against
//! tanks and tiles. Ramps snap the feet onto the slope; platforms only
//! catch the player when the previous frame's feet were above them.

use glam::Vec2;
use rand_pcg::Pcg32;

use super::bullet::{BulletPool, Faction};
use super::collision::polygon_vs_polygon;
use super::enemy::{Enemy, EnemyId, PlayerView};
use super::geometry::{Aabb, Polygon};
use super::powerup::PowerUpKind;
use super::state::GameEvent;
use super::tick::TickInput;
use super::tile::{TileEdge, TileKind, TileWorld, ramp_surface_y};
use super::weapon::Weapon;
use crate::consts::*;
use crate::tuning::WeaponStats;
use crate::{rotate_toward, turn_rate_to_radians};

/// Aim turn speed applied per input sample (turn-rate units)
const AIM_TURN_RATE: f32 = 125.0;

/// Muzzle distance from the shoulder
const MUZZLE_LENGTH: f32 = 56.0;

/// Below this horizontal speed the player stops dead
const MIN_MOVE_SPEED: f32 = 5.0;

/// Seconds without damage before health regenerates
const HEALTH_REGEN_DELAY: f32 = 3.0;

/// Health regained per second while regenerating
const HEALTH_REGEN_RATE: f32 = 0.6;

/// The current-max cap drops in these steps
const MAX_HEALTH_STEP: f32 = 0.25;

/// Health this far under the current-max cap pulls the cap down
const MAX_HEALTH_SLACK: f32 = 0.5;

/// Health at or below this is death
const DEATH_THRESHOLD: f32 = 0.001;

/// Rage holds for this long after the last gain before decaying
const RAGE_GRACE_TIME: f32 = 1.0;

const RAGE_DECAY_RATE: f32 = 0.15;

/// Decay multiplier while rage mode is active
const RAGE_MODE_DECAY_FACTOR: f32 = 0.35;

/// Everything the player touches during an update
pub struct PlayerContext<'a> {
    pub tiles: &'a TileWorld,
    pub enemies: &'a [Enemy],
    pub pool: &'a mut BulletPool,
    pub rng: &'a mut Pcg32,
    pub events: &'a mut Vec<GameEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Foot position (bottom centre)
    pub pos: Vec2,
    pub vel: Vec2,
    last_frame_velocity: Vec2,
    alive: bool,

    health: f32,
    max_health: f32,
    /// Regeneration stops here; ratchets down as damage accumulates
    current_max_health: f32,
    regen_time: f32,

    on_ground: bool,
    on_ramp: bool,
    crouching: bool,
    standing_on: Option<EnemyId>,
    previous_bottom: f32,
    jump_time: f32,

    movement: f32,
    jumping: bool,
    jump_held: bool,
    firing: bool,

    aim: Vec2,
    weapons: Vec<Weapon>,
    current_weapon: usize,
    fire_time: f32,

    rage: f32,
    rage_mode: bool,
    rage_full: bool,
    rage_grace: f32,

    hull: Polygon,
}

/// Max health for a player entering `wave`
pub fn max_health_for_wave(wave: u32) -> f32 {
    1.0 + (wave / 3) as f32 * 0.25
}

impl Player {
    pub fn new(pos: Vec2, wave: u32, starting_weapon: WeaponStats) -> Self {
        let max_health = max_health_for_wave(wave);
        let mut player = Self {
            pos,
            vel: Vec2::ZERO,
            last_frame_velocity: Vec2::ZERO,
            alive: true,
            health: max_health,
            max_health,
            current_max_health: max_health,
            regen_time: 0.0,
            on_ground: false,
            on_ramp: false,
            crouching: false,
            standing_on: None,
            previous_bottom: pos.y,
            jump_time: 0.0,
            movement: 0.0,
            jumping: false,
            jump_held: false,
            firing: false,
            aim: Vec2::X,
            weapons: vec![Weapon::new(starting_weapon)],
            current_weapon: 0,
            fire_time: 0.0,
            rage: 0.0,
            rage_mode: false,
            rage_full: false,
            rage_grace: 0.0,
            hull: Polygon::rectangle(PLAYER_WIDTH, PLAYER_HEIGHT),
        };
        player.sync_hull();
        player
    }

    /// Bring the player back at `pos` with full health for `wave`.
    ///
    /// The weapon inventory is kept.
    pub fn reset(&mut self, pos: Vec2, wave: u32) {
        self.pos = pos;
        self.vel = Vec2::ZERO;
        self.last_frame_velocity = Vec2::ZERO;
        self.alive = true;
        self.firing = false;
        self.max_health = max_health_for_wave(wave);
        self.health = self.max_health;
        self.current_max_health = self.max_health;
        self.previous_bottom = pos.y;
        self.sync_hull();
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn current_max_health(&self) -> f32 {
        self.current_max_health
    }

    pub fn on_ground(&self) -> bool {
        self.on_ground
    }

    pub fn on_ramp(&self) -> bool {
        self.on_ramp
    }

    pub fn is_crouching(&self) -> bool {
        self.crouching
    }

    pub fn standing_on(&self) -> Option<EnemyId> {
        self.standing_on
    }

    /// Displacement over the last frame divided by its duration
    pub fn last_frame_velocity(&self) -> Vec2 {
        self.last_frame_velocity
    }

    pub fn aim(&self) -> Vec2 {
        self.aim
    }

    pub fn weapons(&self) -> &[Weapon] {
        &self.weapons
    }

    pub fn current_weapon(&self) -> Option<&Weapon> {
        self.weapons.get(self.current_weapon)
    }

    pub fn rage(&self) -> f32 {
        self.rage
    }

    pub fn rage_mode(&self) -> bool {
        self.rage_mode
    }

    pub fn rage_full(&self) -> bool {
        self.rage_full
    }

    pub fn hull(&self) -> &Polygon {
        &self.hull
    }

    fn height(&self) -> f32 {
        if self.crouching {
            PLAYER_CROUCH_HEIGHT
        } else {
            PLAYER_HEIGHT
        }
    }

    /// Collision box standing on the rounded foot position
    pub fn bounds(&self) -> Aabb {
        Aabb::from_foot(self.pos.round(), PLAYER_WIDTH, self.height())
    }

    /// Shoulder the weapon is held at
    pub fn arm_position(&self) -> Vec2 {
        Vec2::new(self.pos.x, self.pos.y - PLAYER_HEIGHT * 2.0 / 3.0)
    }

    /// Snapshot handed to enemies
    pub fn view(&self) -> PlayerView {
        PlayerView {
            pos: self.pos,
            arm: self.arm_position(),
            velocity: self.last_frame_velocity,
            alive: self.alive,
        }
    }

    fn sync_hull(&mut self) {
        let bounds = self.bounds();
        if self.hull.bounding_box().size() != bounds.size() {
            self.hull = Polygon::from_aabb(&bounds);
        } else {
            self.hull.set_position(bounds.center());
        }
    }

    pub fn kill(&mut self) {
        self.alive = false;
    }

    /// Latch this frame's input.
    ///
    /// A jump starts only on a fresh press while grounded; holding the
    /// button extends it while airborne. Without control the player can
    /// still aim and switch weapons but not move, jump or fire.
    pub fn handle_input(&mut self, input: &TickInput, has_control: bool) -> Option<GameEvent> {
        if !self.alive {
            self.movement = 0.0;
            self.jumping = false;
            self.firing = false;
            return None;
        }

        self.movement = input.movement.clamp(-1.0, 1.0);
        let pressed = input.jump && !self.jump_held;
        self.jumping = if self.on_ground { pressed } else { input.jump };
        self.jump_held = input.jump;

        self.crouching = input.crouch && !self.jumping;

        if input.switch_weapon && !self.weapons.is_empty() {
            self.current_weapon = (self.current_weapon + 1) % self.weapons.len();
        }

        if let Some(dir) = input.aim {
            self.aim = rotate_toward(self.aim, dir, turn_rate_to_radians(AIM_TURN_RATE));
        }

        self.firing = input.fire;

        let mut event = None;
        if self.rage_full && input.activate_special {
            self.rage_mode = true;
            self.rage_full = false;
            event = Some(GameEvent::RageActivated);
        }

        if !has_control {
            self.movement = 0.0;
            self.jumping = false;
            self.firing = false;
        }
        event
    }

    /// Advance one frame. Rage mode runs the player at double speed.
    pub fn update(&mut self, dt: f32, ctx: &mut PlayerContext<'_>) {
        let dt = if self.rage_mode { dt * 2.0 } else { dt };

        self.apply_physics(dt, ctx.tiles, ctx.enemies);

        if self.alive {
            self.fire(dt, ctx);

            if self.current_weapon().is_some_and(|w| !w.active) {
                self.weapons.remove(self.current_weapon);
                if self.current_weapon >= self.weapons.len() {
                    self.current_weapon = 0;
                }
            }

            self.regen_time += dt;
            if self.regen_time >= HEALTH_REGEN_DELAY {
                self.health = (self.health + HEALTH_REGEN_RATE * dt).min(self.current_max_health);
            }

            self.decay_rage(dt);
        }

        self.movement = 0.0;
        self.jumping = false;
        self.firing = false;
    }

    fn apply_physics(&mut self, dt: f32, tiles: &TileWorld, enemies: &[Enemy]) {
        let previous = self.pos;

        self.vel.y = (self.vel.y + PLAYER_GRAVITY * dt)
            .clamp(-PLAYER_MAX_FALL_SPEED, PLAYER_MAX_FALL_SPEED);
        self.vel.y = self.do_jump(self.vel.y, dt);
        self.pos.y += self.vel.y * dt;

        self.vel.x += self.movement * PLAYER_MOVE_ACCELERATION * dt;
        self.vel.x -= PLAYER_AIR_DRAG * self.vel.x * dt;
        self.vel.x = self.vel.x.clamp(-PLAYER_MAX_MOVE_SPEED, PLAYER_MAX_MOVE_SPEED);
        self.pos.x += self.vel.x * dt;

        if let Some(tank) = self
            .standing_on
            .and_then(|id| enemies.iter().find(|e| e.id == id))
        {
            self.pos.x += tank.chassis.vel.x * dt;
        }

        self.resolve_collisions(tiles, enemies);

        let stalled = (self.vel.x * dt).abs() > 1.0 && self.pos.x as i32 == previous.x as i32;
        if self.vel.x.abs() < MIN_MOVE_SPEED || stalled {
            self.vel.x = 0.0;
        }

        if dt > 0.0 {
            self.last_frame_velocity = (self.pos - previous) / dt;
        }
        self.sync_hull();
    }

    /// Jump curve: while the button is held within the jump window the
    /// vertical velocity is overridden by a linearly decaying launch speed
    fn do_jump(&mut self, vel_y: f32, dt: f32) -> f32 {
        if !self.jumping {
            self.jump_time = 0.0;
            return vel_y;
        }
        if self.on_ground || self.jump_time > 0.0 {
            self.jump_time += dt;
        }
        if self.jump_time > 0.0 && self.jump_time <= PLAYER_MAX_JUMP_TIME {
            PLAYER_JUMP_LAUNCH_VELOCITY * (1.0 - self.jump_time / PLAYER_MAX_JUMP_TIME)
        } else {
            self.jump_time = 0.0;
            vel_y
        }
    }

    /// Push the player out of tanks and tiles.
    ///
    /// Tanks are solid boxes; landing on one carries the player along with
    /// it, and a tank dropping onto a grounded player crushes them.
    pub fn resolve_collisions(&mut self, tiles: &TileWorld, enemies: &[Enemy]) {
        let mut bounds = self.bounds();
        let left = (bounds.left() / TILE_WIDTH).floor() as i32;
        let right = (bounds.right() / TILE_WIDTH).ceil() as i32 - 1;
        let top = (bounds.top() / TILE_HEIGHT).floor() as i32;
        let bottom = (bounds.bottom() / TILE_HEIGHT).ceil() as i32 - 1;

        let was_on_ramp = self.on_ramp;
        let was_on_ground = self.on_ground;
        self.on_ground = false;
        self.on_ramp = false;
        self.standing_on = None;

        for tank in enemies.iter().filter(|e| e.is_tank()) {
            let inner = tank.inner_bounds();
            let depth = bounds.intersection_depth(&inner);
            if depth == Vec2::ZERO {
                continue;
            }
            if depth.y.abs() < depth.x.abs() {
                if self.previous_bottom <= inner.top() {
                    self.standing_on = Some(tank.id);
                    self.on_ground = true;
                    self.vel.y = 0.0;
                    self.pos.y = self.pos.y.round();
                }
                if !tank.on_ground() && was_on_ground && depth.y > 0.0 {
                    self.kill();
                }
                self.pos.y += depth.y;
            } else {
                self.pos.x += depth.x;
            }
            bounds = self.bounds();
        }

        for y in top..=bottom {
            for x in left..=right {
                let kind = tiles.collision(x, y);
                if kind == TileKind::Passable {
                    continue;
                }
                let tile = tiles.tile_bounds(x, y);
                let depth = bounds.intersection_depth(&tile);
                let edges = tiles.collidable_edges(x, y);

                let feet_over_ramp = (x as f32 * TILE_WIDTH..=(x + 1) as f32 * TILE_WIDTH)
                    .contains(&self.pos.x);
                if kind.is_slanted()
                    && feet_over_ramp
                    && self.vel.y >= 0.0
                    && edges.contains(TileEdge::Top)
                    && polygon_vs_polygon(&Polygon::from_aabb(&bounds), &tiles.tile_polygon(x, y))
                {
                    if let Some(surface) = ramp_surface_y(kind, x, y, self.pos.x) {
                        self.pos.y = surface;
                        self.on_ground = true;
                        self.on_ramp = true;
                        self.vel.y = 0.0;
                        bounds = self.bounds();
                    }
                    continue;
                }

                let vertical = depth.y.abs() < depth.x.abs()
                    || kind == TileKind::Platform
                    || (!edges.contains(TileEdge::Left) && depth.x < 0.0)
                    || (!edges.contains(TileEdge::Right) && depth.x > 0.0);

                if vertical && !self.on_ramp && !kind.is_slanted() {
                    if self.previous_bottom <= tile.top() || (was_on_ramp && !self.jumping) {
                        self.on_ground = true;
                        self.pos.y = self.pos.y.round();
                    }
                    if kind == TileKind::Impassable
                        || (self.on_ground && edges.contains(TileEdge::Top))
                    {
                        self.pos.y += depth.y;
                        self.vel.y = 0.0;
                        bounds = self.bounds();
                    }
                } else if kind == TileKind::Impassable
                    && ((depth.x < 0.0 && edges.contains(TileEdge::Left))
                        || (depth.x > 0.0 && edges.contains(TileEdge::Right)))
                {
                    self.pos.x += depth.x;
                    bounds = self.bounds();
                }
            }
        }

        self.previous_bottom = bounds.bottom();
    }

    fn fire(&mut self, dt: f32, ctx: &mut PlayerContext<'_>) {
        let Some(weapon) = self.weapons.get_mut(self.current_weapon) else {
            return;
        };
        let rate = weapon.stats.fire_rate;
        self.fire_time += dt;
        if !self.firing || self.fire_time < rate {
            return;
        }
        self.fire_time -= rate;
        while self.fire_time >= dt && dt > 0.0 {
            self.fire_time -= dt;
        }

        let origin = Vec2::new(self.pos.x, self.pos.y - PLAYER_HEIGHT * 2.0 / 3.0)
            + self.aim * MUZZLE_LENGTH;
        let fired = weapon.fire(origin, self.aim, Faction::Player, ctx.tiles, ctx.rng, ctx.pool);
        if fired > 0 {
            ctx.events.push(GameEvent::ProjectileFired {
                faction: Faction::Player,
                weapon: weapon.stats.name.clone(),
                pos: origin,
                dir: self.aim,
            });
        }
    }

    /// Apply incoming damage and return the amount actually taken
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        if !self.alive {
            return 0.0;
        }
        let amount = if self.rage_mode { amount * 0.5 } else { amount };
        self.health = (self.health - amount).max(0.0);
        self.regen_time = 0.0;

        if self.health <= DEATH_THRESHOLD {
            self.kill();
        } else {
            while self.health < self.current_max_health - MAX_HEALTH_SLACK {
                self.current_max_health -= MAX_HEALTH_STEP;
            }
        }
        amount
    }

    /// Fill the rage meter; later waves fill it more slowly
    pub fn add_rage(&mut self, amount: f32, wave: u32) {
        if !self.rage_mode && !self.rage_full {
            self.rage_grace = 0.0;
            self.rage += amount / (wave.max(1) as f32).sqrt();
        }
        if self.rage >= 1.0 {
            self.rage_full = true;
            self.rage = 1.0;
        }
    }

    fn decay_rage(&mut self, dt: f32) {
        if !self.rage_full && self.rage_grace > RAGE_GRACE_TIME {
            let factor = if self.rage_mode { RAGE_MODE_DECAY_FACTOR } else { 1.0 };
            self.rage -= dt * RAGE_DECAY_RATE * factor;
        } else {
            self.rage_grace += dt;
        }
        if self.rage <= 0.0 {
            self.rage = 0.0;
            self.rage_mode = false;
        }
    }

    /// Apply a power-up effect. Returns false when it would do nothing, in
    /// which case the pickup stays in the world.
    ///
    /// Repair only reports success; restoring the terrain is the world's job.
    pub fn apply_power_up(&mut self, kind: PowerUpKind, arsenal: &[WeaponStats]) -> bool {
        match kind {
            PowerUpKind::Weapon(index) => match arsenal.get(index) {
                Some(stats) => {
                    self.add_weapon(stats);
                    true
                }
                None => false,
            },
            PowerUpKind::HealthPack => {
                if self.health < self.max_health {
                    self.health = self.max_health;
                    self.current_max_health = self.max_health;
                    true
                } else {
                    false
                }
            }
            PowerUpKind::Repair => true,
            PowerUpKind::Ammo => self
                .weapons
                .get_mut(self.current_weapon)
                .is_some_and(|w| w.add_clip()),
            PowerUpKind::HealthIncrease => {
                self.max_health += MAX_HEALTH_STEP;
                self.current_max_health = self.max_health;
                self.health = self.max_health;
                true
            }
        }
    }

    /// Pick up a weapon: extra clips if already owned, otherwise equip it
    fn add_weapon(&mut self, stats: &WeaponStats) {
        if let Some(owned) = self.weapons.iter_mut().find(|w| w.stats.name == stats.name) {
            owned.add_clip();
            return;
        }
        self.weapons.push(Weapon::new(stats.clone()));
        self.current_weapon = self.weapons.len() - 1;
    }
}
