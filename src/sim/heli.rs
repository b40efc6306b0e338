//! Helicopter steering
//!
//! Helicopters hold an altitude band above the player, chase it
//! horizontally (or strafe past it), and lead their shots using the
//! player's last-frame velocity.

use glam::Vec2;
use std::f32::consts::FRAC_PI_8;

use super::bullet::BulletMotion;
use super::enemy::{Chassis, EnemyContext, Neighbours, PlayerView};
use super::tile::tile_coords;
use crate::consts::VIEWPORT_WIDTH;
use crate::{rotate_toward, turn_rate_to_radians};
use crate::tuning::HeliStats;

/// Cannon traverse speed (turn-rate units)
pub const HELI_CANNON_TURN_RATE: f32 = 600.0;

/// Preferred height above the player
const HOVER_HEIGHT: f32 = 250.0;

/// Half-width of the hover band
const HOVER_BAND: f32 = 25.0;

/// Never descend closer than this to the bottom of the level
const MIN_ELEVATION: f32 = 480.0;

const MUZZLE_LENGTH: f32 = 36.0;

/// Helicopters aim this far above the player's feet
const AIM_HEIGHT: f32 = 50.0;

/// Lead prediction overestimates the player's speed by this factor
const LEAD_FACTOR: f32 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct HeliBrain {
    pub acceleration: f32,
    pub max_move_speed: f32,
    pub max_vertical_speed: f32,
    /// Keep flying in the current direction until the cannon overheats
    pub strafes: bool,
    /// Hull tilt in radians, proportional to horizontal speed
    pub rotation: f32,
}

/// Smallest non-negative time at which a bullet of speed `bullet_speed`
/// meets a target at distance `distance` moving at `target_speed`, where
/// `cos_angle` is the cosine between the line of sight and the target's
/// heading.
///
/// Solves `(c² - b²)t² - 2ab·cosθ·t - a² = 0`. `None` when the bullet can
/// never catch up.
pub fn intercept_time(distance: f32, target_speed: f32, bullet_speed: f32, cos_angle: f32) -> Option<f32> {
    let (a, b, c) = (distance, target_speed, bullet_speed);
    let qa = c * c - b * b;
    let qb = -2.0 * a * b * cos_angle;
    let qc = -a * a;

    if qa.abs() < 1e-6 {
        if qb.abs() < 1e-6 {
            return None;
        }
        let t = -qc / qb;
        return (t >= 0.0).then_some(t);
    }

    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let t1 = (-qb - root) / (2.0 * qa);
    let t2 = (-qb + root) / (2.0 * qa);
    [t1, t2]
        .into_iter()
        .filter(|t| *t >= 0.0)
        .min_by(|a, b| a.total_cmp(b))
}

impl HeliBrain {
    pub fn new(stats: &HeliStats) -> Self {
        Self {
            acceleration: stats.acceleration,
            max_move_speed: stats.max_move_speed,
            max_vertical_speed: stats.max_vertical_speed,
            strafes: stats.strafes,
            rotation: 0.0,
        }
    }

    /// Gun pivot below the rotor, tilted with the hull
    pub fn cannon_mount(center: Vec2, size: Vec2, rotation: f32) -> Vec2 {
        center + Vec2::from_angle(rotation).rotate(Vec2::new(0.0, size.y * 0.25))
    }

    /// Where the cannon should point.
    ///
    /// Bomb-style cannons drop along the direction of travel; everything
    /// else leads the player.
    pub fn aim_direction(chassis: &Chassis, player: &PlayerView) -> Vec2 {
        if chassis.cannon.stats.motion == BulletMotion::ParabolicArc {
            return if chassis.vel.x > 0.0 { Vec2::X } else { Vec2::NEG_X };
        }

        let target = player.pos - Vec2::new(0.0, AIM_HEIGHT);
        let mut to_target = target - chassis.cannon_pos;
        to_target -= to_target.normalize_or_zero() * MUZZLE_LENGTH;

        let vx = player.velocity.x;
        let cos_angle = if vx == 0.0 {
            0.0
        } else {
            to_target.normalize_or_zero().x * vx.signum()
        };
        let lead = intercept_time(
            to_target.length(),
            (vx * LEAD_FACTOR).abs(),
            chassis.cannon.stats.velocity,
            cos_angle,
        );

        let future = match lead {
            Some(t) => Vec2::new(target.x + vx * t, target.y),
            None => target,
        };
        (future - chassis.cannon_pos).normalize_or(chassis.cannon_dir)
    }

    pub fn update(
        &mut self,
        chassis: &mut Chassis,
        dt: f32,
        neighbours: Neighbours<'_>,
        ctx: &mut EnemyContext<'_>,
    ) {
        let player = ctx.player;
        let dist = chassis.pos - player.pos;
        let toward_player = if dist.x < 0.0 { 1.0 } else { -1.0 };

        let mut dir = if self.strafes {
            if chassis.overheat.locked {
                toward_player
            } else if chassis.vel.x > 0.0 {
                1.0
            } else {
                -1.0
            }
        } else {
            let mut dir = toward_player;
            let center = chassis.hull.center();
            let reach = Vec2::new(chassis.hull.radius(), 0.0);
            for other in neighbours.helis() {
                let bounds = other.hull().bounding_box();
                if bounds.contains_point(center - reach) {
                    dir = 1.0;
                }
                if bounds.contains_point(center + reach) {
                    dir = -1.0;
                }
            }
            dir
        };

        let tile_x = tile_coords(chassis.pos).x;
        if tile_x < 0 {
            dir = 1.0;
        }
        if tile_x > ctx.tiles.width() {
            dir = -1.0;
        }

        let step = self.acceleration * dt;
        chassis.vel.x += dir * step;

        let floor = ctx.tiles.bounds().bottom() - MIN_ELEVATION - 50.0;
        if dist.y < -HOVER_HEIGHT - HOVER_BAND && chassis.pos.y < floor {
            chassis.vel.y += step;
        } else if dist.y > -HOVER_HEIGHT + HOVER_BAND {
            chassis.vel.y -= step;
        } else if chassis.vel.y.abs() <= step {
            chassis.vel.y = 0.0;
        } else {
            chassis.vel.y -= step * chassis.vel.y.signum();
        }

        chassis.vel.x = chassis.vel.x.clamp(-self.max_move_speed, self.max_move_speed);
        chassis.vel.y = chassis.vel.y.clamp(-self.max_vertical_speed, self.max_vertical_speed);
        chassis.pos += chassis.vel * dt;

        self.rotation = chassis.vel.x / self.max_move_speed * FRAC_PI_8;
        chassis
            .hull
            .set_transform(chassis.pos, self.rotation, chassis.vel.x < 0.0);

        chassis.cannon_pos = Self::cannon_mount(chassis.pos, chassis.size, self.rotation);
        let aim = Self::aim_direction(chassis, &player);
        chassis.cannon_dir = rotate_toward(
            chassis.cannon_dir,
            aim,
            turn_rate_to_radians(HELI_CANNON_TURN_RATE) * dt,
        );

        if dist.x.abs() < VIEWPORT_WIDTH {
            chassis.fire_time += dt;
            if chassis.fire_time >= chassis.cannon.stats.fire_rate && !chassis.overheat.locked {
                chassis.fire_time = 0.0;
                chassis.fire(MUZZLE_LENGTH, ctx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::bullet::BulletPool;
    use crate::sim::enemy::{Brain, Enemy, EnemyId, EnemyState, split_neighbours};
    use crate::sim::tile::{Tile, TileWorld};
    use crate::tuning::Tuning;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn sky() -> TileWorld {
        TileWorld::new(60, 20, vec![Tile::EMPTY; 60 * 20])
    }

    fn player(pos: Vec2, velocity: Vec2) -> PlayerView {
        PlayerView {
            pos,
            arm: pos - Vec2::new(0.0, 56.0),
            velocity,
            alive: true,
        }
    }

    fn heli(variant: usize, pos: Vec2, view: &PlayerView) -> Enemy {
        let tuning = Tuning::builtin();
        let mut heli = Enemy::heli(EnemyId(2), variant, &tuning.helis[variant], 0, pos, 6, view);
        heli.state = EnemyState::Alive;
        heli
    }

    fn step(enemy: &mut Enemy, tiles: &TileWorld, view: PlayerView, pool: &mut BulletPool) {
        let mut rng = Pcg32::seed_from_u64(11);
        let mut events = Vec::new();
        let mut ctx = EnemyContext {
            tiles,
            player: view,
            pool,
            rng: &mut rng,
            events: &mut events,
        };
        enemy.update(1.0 / 60.0, Neighbours::NONE, &mut ctx);
    }

    /// Step `enemies[index]` with the rest of the list as neighbours
    fn step_among(enemies: &mut [Enemy], index: usize, tiles: &TileWorld, view: PlayerView, pool: &mut BulletPool) {
        let (enemy, neighbours) = split_neighbours(enemies, index).expect("in range");
        let mut rng = Pcg32::seed_from_u64(11);
        let mut events = Vec::new();
        let mut ctx = EnemyContext {
            tiles,
            player: view,
            pool,
            rng: &mut rng,
            events: &mut events,
        };
        enemy.update(1.0 / 60.0, neighbours, &mut ctx);
    }

    #[test]
    fn test_intercept_stationary_target() {
        let t = intercept_time(300.0, 0.0, 600.0, 0.0).expect("root");
        assert!((t - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_intercept_receding_target() {
        // Target runs directly away at half bullet speed: meets at t = 2
        let t = intercept_time(100.0, 50.0, 100.0, 1.0).expect("root");
        assert!((t - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_intercept_uncatchable_target() {
        assert_eq!(intercept_time(100.0, 200.0, 100.0, 1.0), None);
    }

    #[test]
    fn test_intercept_equal_speed_linear_case() {
        // Head-on at equal speed: the gap closes at 2c
        let t = intercept_time(100.0, 50.0, 50.0, -1.0).expect("root");
        assert!((t - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_lead_aims_ahead_of_moving_player() {
        let still = player(Vec2::new(1000.0, 800.0), Vec2::ZERO);
        let running = player(Vec2::new(1000.0, 800.0), Vec2::new(300.0, 0.0));
        let h = heli(0, Vec2::new(600.0, 500.0), &still);

        let direct = HeliBrain::aim_direction(&h.chassis, &still);
        let led = HeliBrain::aim_direction(&h.chassis, &running);
        assert!(led.x > direct.x);
        assert!((led.length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_bomber_aims_along_travel() {
        let view = player(Vec2::new(1000.0, 800.0), Vec2::ZERO);
        let mut h = heli(1, Vec2::new(600.0, 500.0), &view);
        h.chassis.vel.x = 50.0;
        assert_eq!(HeliBrain::aim_direction(&h.chassis, &view), Vec2::X);
        h.chassis.vel.x = -50.0;
        assert_eq!(HeliBrain::aim_direction(&h.chassis, &view), Vec2::NEG_X);
    }

    #[test]
    fn test_climbs_when_too_low_and_chases_player() {
        let tiles = sky();
        let view = player(Vec2::new(2000.0, 700.0), Vec2::ZERO);
        // Level with the player: well under the hover band
        let mut h = heli(0, Vec2::new(1000.0, 700.0), &view);
        let mut pool = BulletPool::new(64);
        for _ in 0..30 {
            step(&mut h, &tiles, view, &mut pool);
        }
        assert!(h.chassis.vel.y < 0.0);
        assert!(h.chassis.vel.x > 0.0);
        assert!(h.pos().y < 700.0);
        assert_eq!(h.hull().position(), h.pos());
    }

    #[test]
    fn test_speed_is_clamped() {
        let tiles = sky();
        let view = player(Vec2::new(3500.0, 900.0), Vec2::ZERO);
        let mut h = heli(0, Vec2::new(200.0, 200.0), &view);
        let mut pool = BulletPool::new(64);
        for _ in 0..600 {
            step(&mut h, &tiles, view, &mut pool);
        }
        let stats = &Tuning::builtin().helis[0];
        assert!(h.chassis.vel.x.abs() <= stats.max_move_speed);
        assert!(h.chassis.vel.y.abs() <= stats.max_vertical_speed);
    }

    #[test]
    fn test_helis_push_apart() {
        let tiles = sky();
        // Player far to the right: alone, the heli would chase it
        let view = player(Vec2::new(2000.0, 700.0), Vec2::ZERO);
        let mut pool = BulletPool::new(64);

        let mut alone = vec![heli(0, Vec2::new(1000.0, 500.0), &view)];
        step_among(&mut alone, 0, &tiles, view, &mut pool);
        assert!(alone[0].chassis.vel.x > 0.0);

        // A second heli overlapping its right-hand probe turns it back
        let mut pair = vec![
            heli(0, Vec2::new(1000.0, 500.0), &view),
            heli(0, Vec2::new(1030.0, 500.0), &view),
        ];
        pair[1].id = EnemyId(3);
        let reach = pair[0].hull().center() + Vec2::new(pair[0].hull().radius(), 0.0);
        assert!(pair[1].hull().bounding_box().contains_point(reach));

        step_among(&mut pair, 0, &tiles, view, &mut pool);
        assert!(pair[0].chassis.vel.x < 0.0);

        // The neighbour on the left is pushed the other way despite the chase
        let view = player(Vec2::new(0.0, 700.0), Vec2::ZERO);
        step_among(&mut pair, 1, &tiles, view, &mut pool);
        assert!(pair[1].chassis.vel.x > 0.0);
    }

    #[test]
    fn test_strafing_heli_ignores_neighbours() {
        let tiles = sky();
        let view = player(Vec2::new(0.0, 700.0), Vec2::ZERO);
        let mut pool = BulletPool::new(64);

        let mut pair = vec![
            heli(2, Vec2::new(1000.0, 500.0), &view),
            heli(0, Vec2::new(1030.0, 500.0), &view),
        ];
        assert!(matches!(&pair[0].brain, Brain::Heli(brain) if brain.strafes));
        pair[0].chassis.vel.x = 50.0;
        let reach = pair[0].hull().center() + Vec2::new(pair[0].hull().radius(), 0.0);
        assert!(pair[1].hull().bounding_box().contains_point(reach));

        step_among(&mut pair, 0, &tiles, view, &mut pool);
        // Keeps flying right: past the player and into the neighbour
        assert!(pair[0].chassis.vel.x > 50.0);
    }
}
