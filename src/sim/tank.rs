//! Tank steering
//!
//! Tanks patrol toward a stand-off distance from the player, stop there to
//! fire a volley, and turn around at walls, cliffs and other tanks. Edge
//! detection uses point probes at the corners of the footprint.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::enemy::{Chassis, EnemyContext, Neighbours};
use super::geometry::Aabb;
use super::tile::{TileKind, TileWorld};
use crate::consts::{GRAVITY, MAX_FALL_SPEED, TILE_HEIGHT, TILE_WIDTH, VIEWPORT_WIDTH};
use crate::tuning::TankStats;
use crate::{angle_between, rotate_toward, turn_rate_to_radians};

/// Cannon traverse speed (turn-rate units)
pub const TANK_CANNON_TURN_RATE: f32 = 400.0;

/// Distance from the cannon pivot to the muzzle
const MUZZLE_LENGTH: f32 = 44.0;

/// Probe inset from the footprint corners
const EDGE_BUFFER: f32 = 5.0;

/// Half-width of the "close enough" band around the optimum distance
const OPTIMUM_TOLERANCE: f32 = 5.0;

/// Cannon stays still this long after each shot
const CANNON_SETTLE_TIME: f32 = 0.5;

/// Headings closer than this count as aligned
const AIM_TOLERANCE: f32 = 1e-3;

/// Observable tank behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TankMode {
    Patrolling,
    WaitingAndFiring,
    OffGround,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TankBrain {
    pub move_speed: f32,
    pub optimum_distance: f32,
    /// Length of a firing stop
    pub max_wait_time: f32,
    pub wait_time: f32,
    /// +1 right, -1 left
    pub facing: f32,
    pub on_ground: bool,
    off_left_edge: bool,
    off_right_edge: bool,
    /// Cannon heading the tank wants; firing waits until it is reached
    dir_to_player: Vec2,
}

/// Which way to face for a signed distance `dist = tank.x - player.x`.
///
/// Inside the optimum distance the tank backs away; outside it closes in.
/// `None` exactly on the boundary.
pub fn face_for_distance(dist: f32, optimum: f32) -> Option<f32> {
    if (0.0..optimum).contains(&dist) || dist < -optimum {
        Some(1.0)
    } else if (dist > -optimum && dist < 0.0) || dist > optimum {
        Some(-1.0)
    } else {
        None
    }
}

fn is_floor(kind: TileKind) -> bool {
    matches!(kind, TileKind::Platform | TileKind::Impassable)
}

impl TankBrain {
    pub fn new(stats: &TankStats, fire_rate: f32) -> Self {
        Self {
            move_speed: stats.move_speed,
            optimum_distance: stats.optimum_distance,
            max_wait_time: stats.shots_per_pause as f32 * fire_rate,
            wait_time: 0.0,
            facing: -1.0,
            on_ground: true,
            off_left_edge: false,
            off_right_edge: false,
            dir_to_player: Vec2::NEG_X,
        }
    }

    pub fn mode(&self) -> TankMode {
        if !self.on_ground {
            TankMode::OffGround
        } else if self.wait_time > 0.0 {
            TankMode::WaitingAndFiring
        } else {
            TankMode::Patrolling
        }
    }

    /// Lower 65% of the frame, standing on `foot`
    pub fn inner_bounds(foot: Vec2, size: Vec2) -> Aabb {
        Aabb::from_foot(foot, size.x, size.y * 0.65)
    }

    pub fn outer_bounds(foot: Vec2, size: Vec2) -> Aabb {
        Aabb::from_foot(foot, size.x, size.y)
    }

    /// Turret pivot above the foot
    pub fn cannon_mount(foot: Vec2, size: Vec2) -> Vec2 {
        Vec2::new(foot.x, foot.y - size.y * 13.0 / 16.0)
    }

    pub fn update(
        &mut self,
        chassis: &mut Chassis,
        dt: f32,
        neighbours: Neighbours<'_>,
        ctx: &mut EnemyContext<'_>,
    ) {
        chassis.vel.x = 0.0;
        let dist = chassis.pos.x - ctx.player.pos.x;

        if self.on_ground {
            let has_to_face = self.check_for_collisions(chassis, neighbours, ctx.tiles);

            if self.wait_time > 0.0 && has_to_face == 0.0 {
                if dist.abs() <= VIEWPORT_WIDTH {
                    self.fire(chassis, dt, ctx);
                } else {
                    self.wait_time += dt;
                }

                self.wait_time = (self.wait_time - dt).max(0.0);
                if self.wait_time <= 0.0 {
                    if let Some(facing) = face_for_distance(dist, self.optimum_distance) {
                        self.facing = facing;
                    }
                }
            } else if has_to_face != 0.0 {
                self.facing = has_to_face;
                self.wait_time = 0.0;
            } else if dist.abs() > self.optimum_distance - OPTIMUM_TOLERANCE
                && dist.abs() <= self.optimum_distance + OPTIMUM_TOLERANCE
            {
                let rate = chassis.cannon.stats.fire_rate;
                chassis.fire_time = rate - rate / 3.0;
                self.wait_time = self.max_wait_time;
            } else {
                if let Some(facing) = face_for_distance(dist, self.optimum_distance) {
                    self.facing = facing;
                }
                let blocked = (self.facing > 0.0 && self.off_right_edge)
                    || (self.facing < 0.0 && self.off_left_edge);
                if !blocked {
                    chassis.vel = Vec2::new(self.facing * self.move_speed, 0.0);
                }
            }
        }

        if !self.on_ground {
            self.fall(chassis, dt, ctx.tiles);
        }

        chassis.pos.x += chassis.vel.x * dt;
        chassis.pos = chassis.pos.round();

        self.dir_to_player = (ctx.player.arm - chassis.cannon_pos).normalize_or(chassis.cannon_dir);
        if chassis.fire_time > CANNON_SETTLE_TIME {
            chassis.cannon_dir = rotate_toward(
                chassis.cannon_dir,
                self.dir_to_player,
                turn_rate_to_radians(TANK_CANNON_TURN_RATE) * dt,
            );
        }

        chassis.hull.set_position(chassis.pos);
        chassis.cannon_pos = Self::cannon_mount(chassis.pos, chassis.size);
    }

    /// Gravity until any tile under the frame is a floor
    fn fall(&mut self, chassis: &mut Chassis, dt: f32, tiles: &TileWorld) {
        chassis.vel.y = (chassis.vel.y + GRAVITY * dt).clamp(-MAX_FALL_SPEED, MAX_FALL_SPEED);
        chassis.pos.y += chassis.vel.y * dt;

        let bounds = Self::outer_bounds(chassis.pos, chassis.size);
        let left = (bounds.left() / TILE_WIDTH).floor() as i32;
        let right = (bounds.right() / TILE_WIDTH).ceil() as i32 - 1;
        let tile_y = (chassis.pos.y / TILE_HEIGHT).floor() as i32;

        if (left..=right).any(|x| is_floor(tiles.collision(x, tile_y))) {
            self.on_ground = true;
            chassis.pos.y = tile_y as f32 * TILE_HEIGHT;
            chassis.vel.y = 0.0;
        }
    }

    /// Fire once the cannon has reached its aim; otherwise extend the stop
    fn fire(&mut self, chassis: &mut Chassis, dt: f32, ctx: &mut EnemyContext<'_>) {
        chassis.fire_time += dt;
        if chassis.fire_time < chassis.cannon.stats.fire_rate || chassis.overheat.locked {
            return;
        }
        if angle_between(chassis.cannon_dir, self.dir_to_player) < AIM_TOLERANCE {
            chassis.fire_time = 0.0;
            chassis.fire(MUZZLE_LENGTH, ctx);
        } else {
            self.wait_time += dt;
        }
    }

    /// Probe the footprint edges.
    ///
    /// Returns the direction the tank is forced to face (+1 or -1) when
    /// exactly one side is blocked, or 0 when it is free to decide.
    fn check_for_collisions(
        &mut self,
        chassis: &mut Chassis,
        neighbours: Neighbours<'_>,
        tiles: &TileWorld,
    ) -> f32 {
        let was_off_left = self.off_left_edge;
        let was_off_right = self.off_right_edge;
        self.off_left_edge = false;
        self.off_right_edge = false;

        let pos = chassis.pos;
        let half_width = chassis.size.x / 2.0;
        let dir = self.facing;

        let tile_x = ((pos.x + half_width * dir) / TILE_WIDTH).floor() as i32 - dir as i32;
        let tile_y = (pos.y / TILE_HEIGHT).floor() as i32;

        let left_buffer = if was_off_left && dir > 0.0 { 0.0 } else { EDGE_BUFFER };
        let right_buffer = if was_off_right && dir < 0.0 { 0.0 } else { EDGE_BUFFER };

        let left_x = pos.x - half_width + left_buffer;
        let right_x = pos.x + half_width - right_buffer;
        let left_bottom = Vec2::new(left_x, pos.y + 1.0);
        let right_bottom = Vec2::new(right_x, pos.y + 1.0);
        let left_side = Vec2::new(left_x, pos.y - 1.0);
        let right_side = Vec2::new(right_x, pos.y - 1.0);
        let front_side = Vec2::new(pos.x + half_width * dir + dir, pos.y - 1.0);

        for other in neighbours.tanks() {
            let inner = other.inner_bounds();
            if inner.contains_point(left_side) {
                self.off_left_edge = true;
            }
            if inner.contains_point(right_side) {
                self.off_right_edge = true;
            }
        }

        if !is_floor(tiles.collision_at(left_bottom))
            || tiles.collision_at(left_side) != TileKind::Passable
        {
            self.off_left_edge = true;
        }
        if !is_floor(tiles.collision_at(right_bottom))
            || tiles.collision_at(right_side) != TileKind::Passable
        {
            self.off_right_edge = true;
        }

        if self.off_left_edge && self.off_right_edge {
            if is_floor(tiles.collision_at(pos + Vec2::Y)) {
                self.on_ground = true;
                if self.wait_time <= 0.0 {
                    self.wait_time = self.max_wait_time;
                }
            } else {
                self.on_ground = false;
            }
            return 0.0;
        }

        if self.off_left_edge || self.off_right_edge {
            chassis.vel = Vec2::new(dir * self.move_speed, 0.0);
            return if self.off_left_edge { 1.0 } else { -1.0 };
        }

        let step = dir as i32;
        let wall_ahead = tiles.collision(tile_x + step, tile_y - 1) != TileKind::Passable
            || !is_floor(tiles.collision(tile_x + step, tile_y));
        let tank_ahead = neighbours
            .tanks()
            .any(|other| other.outer_bounds().contains_point(front_side));

        if (wall_ahead || tank_ahead) && self.wait_time <= 0.0 {
            let rate = chassis.cannon.stats.fire_rate;
            chassis.fire_time = rate - rate / 3.0;
            self.wait_time = self.max_wait_time;
            if dir > 0.0 {
                self.off_right_edge = true;
            } else {
                self.off_left_edge = true;
            }
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::bullet::BulletPool;
    use crate::sim::enemy::{Brain, Enemy, EnemyId, EnemyState, PlayerView, split_neighbours};
    use crate::sim::tile::Tile;
    use crate::tuning::Tuning;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const FLOOR_Y: f32 = 10.0 * TILE_HEIGHT;

    /// 60 tiles wide with a solid floor from row 10 down
    fn flat_world() -> TileWorld {
        let (w, h) = (60, 12);
        let mut tiles = vec![Tile::EMPTY; w * h];
        for y in 10..h {
            for x in 0..w {
                tiles[y * w + x] = Tile::new(TileKind::Impassable, false);
            }
        }
        TileWorld::new(w, h, tiles)
    }

    fn player_at(x: f32) -> PlayerView {
        PlayerView {
            pos: Vec2::new(x, FLOOR_Y),
            arm: Vec2::new(x, FLOOR_Y - 56.0),
            velocity: Vec2::ZERO,
            alive: true,
        }
    }

    fn alive_tank(x: f32, player: &PlayerView) -> Enemy {
        let tuning = Tuning::builtin();
        let mut tank = Enemy::tank(
            EnemyId(1),
            0,
            &tuning.tanks[0],
            0,
            Vec2::new(x, FLOOR_Y),
            1,
            player,
        );
        tank.state = EnemyState::Alive;
        tank
    }

    fn brain(enemy: &Enemy) -> &TankBrain {
        match &enemy.brain {
            Brain::Tank(brain) => brain,
            Brain::Heli(_) => panic!("not a tank"),
        }
    }

    fn step(enemy: &mut Enemy, tiles: &TileWorld, player: PlayerView, pool: &mut BulletPool) {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut events = Vec::new();
        let mut ctx = EnemyContext {
            tiles,
            player,
            pool,
            rng: &mut rng,
            events: &mut events,
        };
        enemy.update(1.0 / 60.0, Neighbours::NONE, &mut ctx);
    }

    fn step_among(enemies: &mut [Enemy], index: usize, tiles: &TileWorld, player: PlayerView, pool: &mut BulletPool) {
        let (enemy, neighbours) = split_neighbours(enemies, index).expect("in range");
        let mut rng = Pcg32::seed_from_u64(5);
        let mut events = Vec::new();
        let mut ctx = EnemyContext {
            tiles,
            player,
            pool,
            rng: &mut rng,
            events: &mut events,
        };
        enemy.update(1.0 / 60.0, neighbours, &mut ctx);
    }

    /// Patrolling tank at 640 and a second tank standing at `x`
    fn convoy(x: f32, player: &PlayerView) -> Vec<Enemy> {
        let mut other = alive_tank(x, player);
        other.id = EnemyId(2);
        vec![alive_tank(640.0, player), other]
    }

    #[test]
    fn test_face_for_distance() {
        assert_eq!(face_for_distance(100.0, 500.0), Some(1.0));
        assert_eq!(face_for_distance(-900.0, 500.0), Some(1.0));
        assert_eq!(face_for_distance(-100.0, 500.0), Some(-1.0));
        assert_eq!(face_for_distance(900.0, 500.0), Some(-1.0));
        assert_eq!(face_for_distance(500.0, 500.0), None);
    }

    #[test]
    fn test_patrols_toward_distant_player() {
        let tiles = flat_world();
        let player = player_at(2000.0);
        let mut tank = alive_tank(640.0, &player);
        let mut pool = BulletPool::new(16);
        step(&mut tank, &tiles, player, &mut pool);

        assert_eq!(brain(&tank).mode(), TankMode::Patrolling);
        assert_eq!(brain(&tank).facing, 1.0);
        assert_eq!(tank.pos().x, 642.0);
        assert_eq!(tank.hull().position(), tank.pos());
    }

    #[test]
    fn test_stops_at_optimum_distance() {
        let tiles = flat_world();
        let player = player_at(1140.0);
        let mut tank = alive_tank(640.0, &player);
        let mut pool = BulletPool::new(16);
        step(&mut tank, &tiles, player, &mut pool);

        assert_eq!(brain(&tank).mode(), TankMode::WaitingAndFiring);
        assert_eq!(tank.pos().x, 640.0);
        assert_eq!(brain(&tank).wait_time, brain(&tank).max_wait_time);
    }

    #[test]
    fn test_waits_and_eventually_fires() {
        let tiles = flat_world();
        let player = player_at(1140.0);
        let mut tank = alive_tank(640.0, &player);
        let mut pool = BulletPool::new(16);
        for _ in 0..240 {
            step(&mut tank, &tiles, player, &mut pool);
            if pool.live_count() > 0 {
                break;
            }
        }
        assert!(pool.live_count() > 0);
    }

    #[test]
    fn test_airborne_tank_lands_on_floor() {
        let tiles = flat_world();
        let player = player_at(3000.0);
        let mut tank = alive_tank(640.0, &player);
        tank.chassis.pos.y = FLOOR_Y - 200.0;
        if let Brain::Tank(brain) = &mut tank.brain {
            brain.on_ground = false;
        }
        let mut pool = BulletPool::new(16);
        for _ in 0..180 {
            step(&mut tank, &tiles, player, &mut pool);
        }
        assert!(brain(&tank).on_ground);
        assert_eq!(tank.pos().y, FLOOR_Y);
    }

    #[test]
    fn test_turns_at_cliff() {
        // Floor ends at tile 12; everything right of it is a drop
        let (w, h) = (30, 12);
        let mut cells = vec![Tile::EMPTY; w * h];
        for y in 10..h {
            for x in 0..13 {
                cells[y * w + x] = Tile::new(TileKind::Impassable, false);
            }
        }
        let tiles = TileWorld::new(w, h, cells);
        let player = player_at(1800.0);
        let mut tank = alive_tank(640.0, &player);
        let mut pool = BulletPool::new(64);
        for _ in 0..600 {
            step(&mut tank, &tiles, player, &mut pool);
        }
        // Never drives off the edge
        assert!(brain(&tank).on_ground);
        assert!(tank.inner_bounds().right() <= 13.0 * TILE_WIDTH + 2.0);
    }

    #[test]
    fn test_waits_behind_tank_ahead() {
        let tiles = flat_world();
        // Out of firing range, so the stop never ends on its own
        let player = player_at(2000.0);
        // Front probe lands one unit inside the other tank's frame
        let mut tanks = convoy(737.0, &player);
        let mut pool = BulletPool::new(16);

        for _ in 0..120 {
            step_among(&mut tanks, 0, &tiles, player, &mut pool);
            assert_eq!(tanks[0].pos().x, 640.0);
            assert_eq!(brain(&tanks[0]).mode(), TankMode::WaitingAndFiring);
        }
        assert!(!tanks[0].outer_bounds().overlaps(&tanks[1].outer_bounds()));
    }

    #[test]
    fn test_reverses_out_of_overlapping_tank() {
        let tiles = flat_world();
        let player = player_at(2000.0);
        // Right side probe starts inside the other tank's hull
        let mut tanks = convoy(720.0, &player);
        let mut pool = BulletPool::new(16);

        step_among(&mut tanks, 0, &tiles, player, &mut pool);
        assert_eq!(brain(&tanks[0]).facing, -1.0);

        for _ in 0..120 {
            step_among(&mut tanks, 0, &tiles, player, &mut pool);
        }
        assert!(tanks[0].pos().x < 640.0);
        assert!(tanks[0].outer_bounds().right() <= tanks[1].outer_bounds().left());
        assert_eq!(brain(&tanks[0]).mode(), TankMode::WaitingAndFiring);
    }
}
