//! Combat resolution
//!
//! Bullets are moved and hit-tested first; every hit returns its bullet to
//! the pool and leaves an [`Impact`]. Impacts are then resolved as splash
//! damage: everything whose hull touches the damage circle takes the full
//! damage, with no falloff.

use glam::Vec2;

use super::bullet::{Bullet, BulletId, BulletPool, Faction};
use super::collision::{circle_vs_rect, polygon_vs_circle};
use super::enemy::{Enemy, EnemyState};
use super::geometry::{Circle, Polygon};
use super::player::Player;
use super::state::{DamageTarget, GameEvent};
use super::tile::{TileKind, TileWorld, tile_bounds, tile_coords};
use crate::consts::{TILE_HEIGHT, TILE_WIDTH};
use crate::stats::RunStats;

/// Enemy homing bullets chase a point this far above the player's feet
const HOMING_AIM_HEIGHT: f32 = 50.0;

/// A bullet hit awaiting damage resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub faction: Faction,
    /// Everything touching this circle is damaged
    pub area: Circle,
    pub damage: f32,
    pub explodes: bool,
}

/// Read-only view of what bullets can hit
pub struct BulletTargets<'a> {
    pub tiles: &'a TileWorld,
    pub enemies: &'a [Enemy],
    pub player_hull: &'a Polygon,
    pub player_pos: Vec2,
}

/// Mutable view of everything impacts can damage
pub struct CombatTargets<'a> {
    pub tiles: &'a mut TileWorld,
    pub enemies: &'a mut [Enemy],
    pub player: &'a mut Player,
    pub stats: &'a mut RunStats,
    pub wave: u32,
    pub events: &'a mut Vec<GameEvent>,
}

/// Whether a bullet touches solid terrain in the 3×3 block around its tile.
///
/// Platforms only stop bullets falling onto them from above: the bullet must
/// be moving down and have been in the tile above on the previous frame.
pub fn bullet_hits_level(bullet: &Bullet, tiles: &TileWorld) -> bool {
    let center = tile_coords(bullet.pos);
    let circle = bullet.circle();

    for y in (center.y - 1)..=(center.y + 1) {
        for x in (center.x - 1)..=(center.x + 1) {
            match tiles.collision(x, y) {
                TileKind::Passable => {}
                TileKind::Platform => {
                    if bullet.vel.y > 0.0
                        && circle_vs_rect(&circle, &tile_bounds(x, y))
                        && circle_vs_rect(&bullet.last_circle(), &tile_bounds(x, y - 1))
                    {
                        return true;
                    }
                }
                TileKind::Impassable | TileKind::SlantedUp | TileKind::SlantedDown => {
                    if polygon_vs_circle(&tiles.tile_polygon(x, y), &circle) {
                        return true;
                    }
                }
            }
        }
    }
    false
}

/// Whether a player bullet touches any enemy hull
pub fn bullet_hits_enemy(bullet: &Bullet, enemies: &[Enemy]) -> bool {
    let circle = bullet.circle();
    enemies
        .iter()
        .any(|e| e.state != EnemyState::Dead && polygon_vs_circle(e.hull(), &circle))
}

/// Advance every live bullet and collect this frame's impacts.
///
/// Player bullets are processed before enemy bullets, each in firing order.
/// Bullets that hit are returned to the pool immediately.
pub fn update_bullets(pool: &mut BulletPool, dt: f32, targets: &BulletTargets<'_>) -> Vec<Impact> {
    let player_aim = targets.player_pos - Vec2::new(0.0, HOMING_AIM_HEIGHT);
    let mut impacts = Vec::new();

    for faction in [Faction::Player, Faction::Enemy] {
        let mut i = 0;
        while i < pool.live(faction).len() {
            let id = BulletId(pool.live(faction)[i]);
            let bullet = pool.get_mut(id);
            bullet.update(dt, player_aim, targets.enemies);

            let hit = bullet_hits_level(bullet, targets.tiles)
                || match faction {
                    Faction::Player => bullet_hits_enemy(bullet, targets.enemies),
                    Faction::Enemy => polygon_vs_circle(targets.player_hull, &bullet.circle()),
                };
            if hit {
                impacts.push(Impact {
                    faction,
                    area: bullet.damage_circle(),
                    damage: bullet.damage,
                    explodes: bullet.explodes(),
                });
                pool.despawn_at(faction, i);
            } else {
                i += 1;
            }
        }
    }
    impacts
}

/// Apply impacts in order: enemies (or the player) first, then terrain
pub fn resolve_impacts(impacts: &[Impact], targets: &mut CombatTargets<'_>) {
    for impact in impacts {
        if impact.explodes {
            targets.events.push(GameEvent::Explosion {
                pos: impact.area.center,
                radius: impact.area.radius,
            });
        }

        match impact.faction {
            Faction::Player => {
                for enemy in targets.enemies.iter_mut() {
                    if enemy.state != EnemyState::Alive || !polygon_vs_circle(enemy.hull(), &impact.area) {
                        continue;
                    }
                    enemy.take_damage(impact.damage);
                    targets.player.add_rage(impact.damage, targets.wave);
                    targets.stats.damage_dealt += impact.damage;
                    targets.events.push(GameEvent::DamageApplied {
                        target: DamageTarget::Enemy(enemy.id),
                        amount: impact.damage,
                        pos: enemy.center(),
                    });
                }
            }
            Faction::Enemy => {
                if polygon_vs_circle(targets.player.hull(), &impact.area) {
                    let taken = targets.player.take_damage(impact.damage);
                    if taken > 0.0 {
                        targets.stats.damage_taken += taken;
                        targets.events.push(GameEvent::DamageApplied {
                            target: DamageTarget::Player,
                            amount: taken,
                            pos: targets.player.pos,
                        });
                    }
                }
            }
        }

        damage_tiles(targets.tiles, &impact.area, impact.damage, targets.events);
    }
}

/// Damage every destructible tile the circle touches
pub fn damage_tiles(tiles: &mut TileWorld, area: &Circle, damage: f32, events: &mut Vec<GameEvent>) {
    let bounds = area.bounding_box();
    let left = ((bounds.left() / TILE_WIDTH).floor() as i32).max(0);
    let right = ((bounds.right() / TILE_WIDTH).ceil() as i32 - 1).min(tiles.width() - 1);
    let top = ((bounds.top() / TILE_HEIGHT).floor() as i32).max(0);
    let bottom = ((bounds.bottom() / TILE_HEIGHT).ceil() as i32 - 1).min(tiles.height() - 1);

    for y in top..=bottom {
        for x in left..=right {
            if tiles.collision(x, y) == TileKind::Passable
                || !polygon_vs_circle(&tiles.tile_polygon(x, y), area)
            {
                continue;
            }
            if let Some(destroyed) = tiles.take_damage(x, y, damage) {
                log::debug!("Tile ({}, {}) destroyed", destroyed.x, destroyed.y);
                events.push(GameEvent::TileDestroyed {
                    x: destroyed.x,
                    y: destroyed.y,
                    pos: destroyed.center,
                });
            }
        }
    }
}
