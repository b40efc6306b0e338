//! World state and per-frame orchestration
//!
//! The `World` owns every entity plus the seeded RNG. One call to
//! [`World::update`] advances enemies, pickups, bullets, the player and the
//! wave schedule in a fixed order, queueing [`GameEvent`]s for whatever
//! presentation layer sits on top.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::bullet::{BulletPool, Faction};
use super::combat::{BulletTargets, CombatTargets, resolve_impacts, update_bullets};
use super::enemy::{Enemy, EnemyContext, EnemyId, EnemyKind, EnemyState, split_neighbours};
use super::level::{Level, SpawnPoint};
use super::player::{Player, PlayerContext};
use super::powerup::{PowerUp, PowerUpKind, PowerUpQueue};
use super::tile::{TileKind, TileWorld};
use super::waves::{GamePhase, TimeOfDay, WaveScheduler, filter_spawn_candidates};
use crate::consts::{TILE_HEIGHT, VIEWPORT_WIDTH};
use crate::settings::Settings;
use crate::stats::{MAX_RECORDED_WAVE, RunStats};
use crate::tuning::Tuning;
use crate::Result;

/// Tanks need ground this far below their spawn point
const TANK_GROUND_PROBE: f32 = 32.0;

/// Who took damage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageTarget {
    Player,
    Enemy(EnemyId),
}

/// Notifications for audio, particles and UI. The simulation never reads
/// these back.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    EntitySpawned { kind: EnemyKind, id: EnemyId, pos: Vec2 },
    EntityKilled { kind: EnemyKind, id: EnemyId, pos: Vec2 },
    TileDestroyed { x: i32, y: i32, pos: Vec2 },
    ProjectileFired { faction: Faction, weapon: String, pos: Vec2, dir: Vec2 },
    DamageApplied { target: DamageTarget, amount: f32, pos: Vec2 },
    Explosion { pos: Vec2, radius: f32 },
    WaveAdvanced { wave: u32 },
    PhaseChanged { from: GamePhase, to: GamePhase },
    PeriodAdvanced { period: u32 },
    /// Every live bullet was removed at once
    BulletsCleared,
    PowerUpSpawned { kind: PowerUpKind, pos: Vec2 },
    PowerUpCollected { kind: PowerUpKind, pos: Vec2 },
    RageActivated,
    PlayerKilled { pos: Vec2 },
    /// The campaign's final stand is over
    RunComplete,
}

/// Complete simulation state for one level
#[derive(Debug, Clone)]
pub struct World {
    pub tiles: TileWorld,
    pub spawn_points: Vec<SpawnPoint>,
    pub player_start: Vec2,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub bullets: BulletPool,
    pub power_ups: Vec<PowerUp>,
    pub power_up_queue: PowerUpQueue,
    pub waves: WaveScheduler,
    pub stats: RunStats,
    pub tuning: Tuning,
    /// Frames simulated so far
    pub frame: u64,
    rng: Pcg32,
    events: Vec<GameEvent>,
    last_phase: GamePhase,
    player_was_alive: bool,
    finished: bool,
    next_id: u32,
}

impl World {
    /// Build a world for `level` and start the first wave after
    /// `settings.start_wave`.
    pub fn new(level: Level, tuning: Tuning, settings: &Settings) -> Result<Self> {
        tuning.validate()?;

        let mut rng = Pcg32::seed_from_u64(settings.seed);
        let mut waves = WaveScheduler::new(settings.start_wave, settings.survival_mode);
        let mut power_up_queue = PowerUpQueue::new();
        power_up_queue.enqueue(
            &mut rng,
            waves.wave,
            waves.period,
            tuning.player_weapons.len(),
            false,
        );
        waves.load_next_wave(&mut rng);

        let player = Player::new(level.player_start, waves.wave, tuning.player_weapons[0].clone());
        let mut stats = RunStats::new();
        stats.enter_wave(waves.wave);

        log::info!(
            "World ready: {}x{} tiles, {} spawn points, {} mode from wave {}",
            level.tiles.width(),
            level.tiles.height(),
            level.spawn_points.len(),
            settings.mode().as_str(),
            waves.wave
        );

        Ok(Self {
            tiles: level.tiles,
            spawn_points: level.spawn_points,
            player_start: level.player_start,
            player,
            enemies: Vec::new(),
            bullets: BulletPool::new(settings.bullet_pool_capacity),
            power_ups: Vec::new(),
            power_up_queue,
            last_phase: waves.phase(),
            waves,
            stats,
            tuning,
            frame: 0,
            rng,
            events: Vec::new(),
            player_was_alive: true,
            finished: false,
            next_id: 1,
        })
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EnemyId {
        let id = self.next_id;
        self.next_id += 1;
        EnemyId(id)
    }

    pub fn phase(&self) -> GamePhase {
        self.waves.phase()
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        self.waves.time_of_day()
    }

    pub fn player_has_control(&self) -> bool {
        self.waves.player_has_control()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Hand queued events to the caller
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Left edge of the view, following the player and clamped to the level
    pub fn camera_left(&self) -> f32 {
        let level_width = self.tiles.bounds().width();
        let max_left = (level_width - VIEWPORT_WIDTH).max(0.0);
        (self.player.pos.x - VIEWPORT_WIDTH / 2.0).clamp(0.0, max_left)
    }

    /// Start a new life at the level start. The wave carries on.
    pub fn respawn_player(&mut self) {
        self.player.reset(self.player_start, self.waves.wave);
        self.player_was_alive = true;
        log::info!("Player respawned on wave {}", self.waves.wave);
    }

    /// Advance one frame.
    ///
    /// Rage mode and a dead player both slow the world to half speed. While
    /// the player is dead the wave schedule is frozen.
    pub fn update(&mut self, dt: f32) {
        if self.finished {
            return;
        }
        self.frame += 1;
        self.stats.time_played += dt as f64;

        if self.player.is_alive() {
            let dt = if self.player.rage_mode() { dt * 0.5 } else { dt };

            let level_bottom = self.tiles.height() as f32 * TILE_HEIGHT;
            if self.player.bounds().top() >= level_bottom {
                log::debug!("Player fell out of the level");
                self.player.kill();
            }

            self.update_enemies(dt);
            self.update_power_ups(dt);
            self.update_bullets(dt);
            self.update_player(dt);
            self.update_waves(dt);

            let phase = self.phase();
            if phase != self.last_phase {
                self.events.push(GameEvent::PhaseChanged {
                    from: self.last_phase,
                    to: phase,
                });
                self.last_phase = phase;
            }
        } else {
            let dt = dt * 0.5;
            self.update_enemies(dt);
            self.update_power_ups(dt);
            self.update_bullets(dt);
            self.update_player(dt);
        }

        if self.player_was_alive && !self.player.is_alive() {
            self.stats.deaths += 1;
            self.events.push(GameEvent::PlayerKilled { pos: self.player.pos });
            log::info!("Player killed on wave {}", self.waves.wave);
        }
        self.player_was_alive = self.player.is_alive();
    }

    fn update_enemies(&mut self, dt: f32) {
        let view = self.player.view();
        let mut i = 0;
        while let Some((enemy, neighbours)) = split_neighbours(&mut self.enemies, i) {
            let mut ctx = EnemyContext {
                tiles: &self.tiles,
                player: view,
                pool: &mut self.bullets,
                rng: &mut self.rng,
                events: &mut self.events,
            };
            enemy.update(dt, neighbours, &mut ctx);

            if enemy.state == EnemyState::Dead {
                let enemy = self.enemies.remove(i);
                self.on_enemy_killed(&enemy);
                continue;
            }
            i += 1;
        }
    }

    /// Credit a kill, advance the wave if the quota is met and maybe drop a pickup
    fn on_enemy_killed(&mut self, enemy: &Enemy) {
        let kind = enemy.kind();
        match kind {
            EnemyKind::Tank => self.stats.tanks_killed += 1,
            EnemyKind::Heli => self.stats.helis_killed += 1,
        }
        self.player.add_rage(enemy.max_health * 0.5, self.waves.wave);

        if self.waves.record_kill(kind, enemy.variant) {
            self.waves.load_next_wave(&mut self.rng);
            self.events.push(GameEvent::WaveAdvanced { wave: self.waves.wave });
            self.stats.enter_wave(self.waves.wave);
        }

        if let Some(point) = self.spawn_points.get_mut(enemy.spawn_point) {
            point.active = false;
        }

        if self.rng.random_range(0..2) == 0 {
            self.power_up_queue.enqueue(
                &mut self.rng,
                self.waves.wave,
                self.waves.period,
                self.tuning.player_weapons.len(),
                false,
            );
            self.spawn_power_up(enemy.pos(), enemy.is_tank());
        }

        log::debug!("{} {:?} destroyed", kind.as_str(), enemy.id);
        self.events.push(GameEvent::EntityKilled {
            kind,
            id: enemy.id,
            pos: enemy.center(),
        });
    }

    /// Release the head of the drop queue at `pos`
    pub fn spawn_power_up(&mut self, pos: Vec2, on_ground: bool) {
        let kind = self.power_up_queue.pop(
            &mut self.rng,
            self.waves.wave,
            self.waves.period,
            self.tuning.player_weapons.len(),
        );
        self.power_ups.push(PowerUp::new(kind, pos, on_ground));
        self.events.push(GameEvent::PowerUpSpawned { kind, pos });
    }

    fn update_power_ups(&mut self, dt: f32) {
        let player_bounds = self.player.bounds();
        let mut i = 0;
        while i < self.power_ups.len() {
            self.power_ups[i].update(dt, &self.tiles);
            let power_up = &self.power_ups[i];
            if !power_up.is_alive() {
                self.power_ups.remove(i);
                continue;
            }

            let (kind, pos) = (power_up.kind, power_up.pos);
            if self.player.is_alive()
                && player_bounds.overlaps(&power_up.bounds())
                && self.player.apply_power_up(kind, &self.tuning.player_weapons)
            {
                if kind == PowerUpKind::Repair {
                    self.tiles.repair_all();
                }
                self.power_ups.remove(i);
                self.events.push(GameEvent::PowerUpCollected { kind, pos });
                continue;
            }
            i += 1;
        }
    }

    fn update_bullets(&mut self, dt: f32) {
        let impacts = update_bullets(
            &mut self.bullets,
            dt,
            &BulletTargets {
                tiles: &self.tiles,
                enemies: &self.enemies,
                player_hull: self.player.hull(),
                player_pos: self.player.pos,
            },
        );
        resolve_impacts(
            &impacts,
            &mut CombatTargets {
                tiles: &mut self.tiles,
                enemies: &mut self.enemies,
                player: &mut self.player,
                stats: &mut self.stats,
                wave: self.waves.wave,
                events: &mut self.events,
            },
        );
    }

    fn update_player(&mut self, dt: f32) {
        let mut ctx = PlayerContext {
            tiles: &self.tiles,
            enemies: &self.enemies,
            pool: &mut self.bullets,
            rng: &mut self.rng,
            events: &mut self.events,
        };
        self.player.update(dt, &mut ctx);
    }

    fn update_waves(&mut self, dt: f32) {
        let actions = self.waves.update(dt, self.last_phase, &mut self.rng);

        if actions.start_cutscene {
            log::info!("Final stand over, clearing the field");
            self.clear_bullets();
            self.clear_enemies();
        }
        if actions.complete && !self.finished {
            self.finished = true;
            self.stats.max_wave = self.stats.max_wave.max(MAX_RECORDED_WAVE);
            self.events.push(GameEvent::RunComplete);
            log::info!("Run complete after {:.1}s", self.stats.time_played);
        }

        if actions.roll_supply_drop {
            self.power_up_queue.enqueue(
                &mut self.rng,
                self.waves.wave,
                self.waves.period,
                self.tuning.player_weapons.len(),
                true,
            );
        }
        if actions.clear_bullets {
            self.clear_bullets();
        }
        if actions.period_advanced {
            self.tiles.repair_all();
            if self.power_up_queue.is_empty() {
                self.power_up_queue.enqueue(
                    &mut self.rng,
                    self.waves.wave,
                    self.waves.period,
                    self.tuning.player_weapons.len(),
                    false,
                );
            }
            self.events.push(GameEvent::PeriodAdvanced { period: self.waves.period });
            self.stats.enter_wave(self.waves.wave);
        }
        if let Some(slot) = actions.supply_slot {
            let x = self.camera_left() + VIEWPORT_WIDTH / 6.0 * slot;
            self.spawn_power_up(Vec2::new(x, 0.0), false);
        }
        if actions.spawn_enemies {
            self.spawn_enemies();
        }
    }

    /// Remove every bullet, detonating explosives where they are
    pub fn clear_bullets(&mut self) {
        if self.bullets.live_count() == 0 {
            return;
        }
        for bullet in self.bullets.iter() {
            if bullet.explodes() {
                let area = bullet.damage_circle();
                self.events.push(GameEvent::Explosion {
                    pos: area.center,
                    radius: area.radius,
                });
            }
        }
        self.bullets.clear();
        self.events.push(GameEvent::BulletsCleared);
    }

    /// Remove every enemy without crediting kills
    fn clear_enemies(&mut self) {
        for enemy in self.enemies.drain(..) {
            self.events.push(GameEvent::EntityKilled {
                kind: enemy.kind(),
                id: enemy.id,
                pos: enemy.center(),
            });
        }
        for point in &mut self.spawn_points {
            point.active = false;
        }
    }

    /// Try to place one tank and one heli at free spawn points
    pub fn spawn_enemies(&mut self) {
        for kind in [EnemyKind::Tank, EnemyKind::Heli] {
            let on_map = self.enemies.iter().filter(|e| e.kind() == kind).count();
            if !self.waves.can_spawn(kind, on_map) {
                continue;
            }

            let candidates: Vec<(usize, f32)> = self
                .spawn_points
                .iter()
                .enumerate()
                .filter(|(_, point)| point.kind == kind && !point.active)
                .filter(|(_, point)| {
                    kind == EnemyKind::Heli
                        || self.tiles.collision_at(point.position + Vec2::new(0.0, TANK_GROUND_PROBE))
                            != TileKind::Passable
                })
                .map(|(i, point)| (i, point.position.distance(self.player.pos)))
                .collect();

            let picks = filter_spawn_candidates(&candidates);
            if picks.is_empty() {
                log::warn!("No free {} spawn point", kind.as_str());
                continue;
            }
            let index = picks[self.rng.random_range(0..picks.len())];

            let Some(variant) = self.waves.next_variant(kind) else {
                log::debug!("{} roster empty", kind.as_str());
                continue;
            };

            let id = self.next_entity_id();
            let pos = self.spawn_points[index].position;
            let view = self.player.view();
            let wave = self.waves.wave;
            let enemy = match kind {
                EnemyKind::Tank => {
                    let stats = &self.tuning.tanks[variant.min(self.tuning.tanks.len() - 1)];
                    Enemy::tank(id, variant, stats, index, pos, wave, &view)
                }
                EnemyKind::Heli => {
                    let stats = &self.tuning.helis[variant.min(self.tuning.helis.len() - 1)];
                    Enemy::heli(id, variant, stats, index, pos, wave, &view)
                }
            };

            self.spawn_points[index].active = true;
            log::debug!("Spawned {} {:?} variant {} at {:?}", kind.as_str(), id, variant, pos);
            self.events.push(GameEvent::EntitySpawned { kind, id, pos });
            self.enemies.push(enemy);
        }
    }
}
