//! Wave and spawn scheduling
//!
//! One countdown drives everything. The game phase is never stored: it is
//! recomputed from the countdown, the wave, the period and the final-wave
//! timer every time it is asked for.
//!
//! Countdown landmarks:
//! - `<= 3`: in game; enemies spawn each time it reaches zero
//! - `(3, 5]`: between waves
//! - `>= 5` in the current period: supply drop (power-ups fall at each whole second below 10)
//! - first wave of a new period: transition; bullets clear at 12, the period advances at 10

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::enemy::EnemyKind;

/// Countdown reset after each spawn attempt
pub const WAVE_TIME: f32 = 3.0;

/// Countdown at the start of a wave
pub const BETWEEN_WAVES_TIME: f32 = 5.0;

/// Extra countdown added every third wave (supply drops) and for transitions
pub const SUPPLY_DROP_TIME: f32 = 5.0;

/// Countdown value at which a supply drop is rolled
pub const SUPPLY_DROP_START: f32 = 10.0;

/// Bullets are cleared when a transition countdown crosses this
pub const TRANSITION_CLEAR_TIME: f32 = 12.0;

/// The period advances when a transition countdown crosses this
pub const TRANSITION_SWITCH_TIME: f32 = 10.0;

pub const WAVES_PER_PERIOD: u32 = 6;

/// Periods before survival mode cycles back to dawn
pub const SURVIVAL_PERIODS: u32 = 4;

/// Last campaign wave; its quotas are unlimited and it runs on a timer
pub const FINAL_WAVE: u32 = 25;

/// Length of the final campaign wave
pub const FINAL_WAVE_TIME: f32 = 60.0;

/// Time between the final cutscene and the end of the run
pub const CUTSCENE_TIME: f32 = 5.0;

/// Spawn points closer than this are avoided
pub const SPAWN_MIN_DISTANCE: f32 = 400.0;

/// Spawn points farther than this are avoided
pub const SPAWN_MAX_DISTANCE: f32 = 1280.0;

/// Derived game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    InGame,
    InBetweenWaves,
    InSupplyDrop,
    InTransition,
    InCutscene,
}

/// Background period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeOfDay {
    Dawn,
    Midday,
    Dusk,
    Night,
    /// Second dawn, reached only by the end of the campaign
    Dawn2,
}

impl TimeOfDay {
    pub fn from_index(index: u32) -> Self {
        match index {
            0 => TimeOfDay::Dawn,
            1 => TimeOfDay::Midday,
            2 => TimeOfDay::Dusk,
            3 => TimeOfDay::Night,
            _ => TimeOfDay::Dawn2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Dawn => "dawn",
            TimeOfDay::Midday => "midday",
            TimeOfDay::Dusk => "dusk",
            TimeOfDay::Night => "night",
            TimeOfDay::Dawn2 => "dawn2",
        }
    }
}

/// Kills still required of one enemy kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quota {
    Limited(i32),
    Unlimited,
}

impl Quota {
    pub fn is_met(&self) -> bool {
        matches!(self, Quota::Limited(n) if *n <= 0)
    }

    /// Whether `on_map` enemies are fewer than the kills still needed
    pub fn allows(&self, on_map: usize) -> bool {
        match self {
            Quota::Limited(n) => (on_map as i32) < *n,
            Quota::Unlimited => true,
        }
    }

    pub fn record_kill(&mut self) {
        if let Quota::Limited(n) = self {
            *n -= 1;
        }
    }
}

/// Phase as a pure function of the scheduler's stored values
pub fn phase_for(countdown: f32, wave: u32, period: u32, final_timer: f32) -> GamePhase {
    if final_timer <= 0.0 {
        return GamePhase::InCutscene;
    }
    if countdown <= WAVE_TIME {
        return GamePhase::InGame;
    }
    if countdown <= WAVE_TIME + 2.0 {
        return GamePhase::InBetweenWaves;
    }
    if period == wave / WAVES_PER_PERIOD {
        return GamePhase::InSupplyDrop;
    }
    if wave % WAVES_PER_PERIOD == 1 {
        return GamePhase::InTransition;
    }
    GamePhase::InGame
}

/// Narrow spawn candidates `(index, distance to player)` by distance.
///
/// Points nearer than [`SPAWN_MIN_DISTANCE`] are dropped if anything lies
/// beyond it; points farther than [`SPAWN_MAX_DISTANCE`] are then dropped if
/// anything lies within it. Neither filter can empty a non-empty set.
pub fn filter_spawn_candidates(candidates: &[(usize, f32)]) -> Vec<usize> {
    let mut kept: Vec<(usize, f32)> = candidates.to_vec();

    if kept.iter().any(|(_, d)| *d > SPAWN_MIN_DISTANCE) {
        kept.retain(|(_, d)| *d >= SPAWN_MIN_DISTANCE);
    }
    if kept.iter().any(|(_, d)| *d < SPAWN_MAX_DISTANCE) {
        kept.retain(|(_, d)| *d <= SPAWN_MAX_DISTANCE);
    }
    kept.into_iter().map(|(i, _)| i).collect()
}

/// Side effects the world must carry out after a scheduler step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaveActions {
    /// Roll a fresh supply drop into the power-up queue
    pub roll_supply_drop: bool,
    pub clear_bullets: bool,
    /// The period advanced and a new wave was loaded
    pub period_advanced: bool,
    /// Release one supply-drop item in this screen slot (1..=5)
    pub supply_slot: Option<f32>,
    pub spawn_enemies: bool,
    /// The final timer just ran out
    pub start_cutscene: bool,
    /// The run is over
    pub complete: bool,
}

/// Wave progression, quotas, and the spawn countdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveScheduler {
    pub survival: bool,
    pub wave: u32,
    /// Raw period index, `wave / 6` as of the last period load
    pub period: u32,
    pub countdown: f32,
    pub last_countdown: f32,
    pub final_timer: f32,
    pub tank_quota: Quota,
    pub heli_quota: Quota,
    pub max_tanks: usize,
    pub max_helis: usize,
    /// Variants waiting to be spawned, in order
    pub tank_roster: VecDeque<usize>,
    pub heli_roster: VecDeque<usize>,
}

impl WaveScheduler {
    /// Scheduler positioned after `start_wave` completed waves. Call
    /// [`load_next_wave`](Self::load_next_wave) to begin.
    pub fn new(start_wave: u32, survival: bool) -> Self {
        Self {
            survival,
            wave: start_wave,
            period: start_wave / WAVES_PER_PERIOD,
            countdown: BETWEEN_WAVES_TIME,
            last_countdown: BETWEEN_WAVES_TIME,
            final_timer: FINAL_WAVE_TIME,
            tank_quota: Quota::Limited(0),
            heli_quota: Quota::Limited(0),
            max_tanks: 0,
            max_helis: 0,
            tank_roster: VecDeque::new(),
            heli_roster: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> GamePhase {
        phase_for(self.countdown, self.wave, self.period, self.final_timer)
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        if self.survival {
            TimeOfDay::from_index(self.period % SURVIVAL_PERIODS)
        } else {
            TimeOfDay::from_index(self.period)
        }
    }

    /// False during the blackout before a new period
    pub fn player_has_control(&self) -> bool {
        !(self.countdown > TRANSITION_SWITCH_TIME && self.countdown <= TRANSITION_CLEAR_TIME)
    }

    /// Campaign difficulty eases off at the start of each period
    pub fn scaled_wave(&self) -> i32 {
        let wave = self.wave as i32;
        if self.survival {
            wave
        } else {
            wave - (wave / WAVES_PER_PERIOD as i32) * 2
        }
    }

    pub fn is_final_wave(&self) -> bool {
        !self.survival && self.wave >= FINAL_WAVE
    }

    /// Advance to the next wave: population caps, quotas, roster and countdown
    pub fn load_next_wave(&mut self, rng: &mut impl Rng) {
        self.wave += 1;
        let scaled = self.scaled_wave();

        self.max_tanks = (1 + (scaled + 2) / 6).clamp(1, 3) as usize;
        self.max_helis = (1 + (scaled - 1) / 5).clamp(1, 2) as usize;
        let tank_variants = (1 + scaled / 3).clamp(1, 3);
        let heli_variants = (1 + scaled / 3).clamp(1, 3);

        if self.is_final_wave() {
            self.tank_quota = Quota::Unlimited;
            self.heli_quota = Quota::Unlimited;
        } else {
            self.tank_quota = Quota::Limited(4 + (2 * scaled) / 3 - self.max_tanks as i32 * 2);
            self.heli_quota = Quota::Limited(3 + scaled / 2 - self.max_helis as i32 * 2);
        }

        for _ in 0..self.max_tanks {
            self.tank_roster.push_back(rng.random_range(0..tank_variants) as usize);
        }
        for _ in 0..self.max_helis {
            self.heli_roster.push_back(rng.random_range(0..heli_variants) as usize);
        }

        self.countdown = BETWEEN_WAVES_TIME;
        if self.wave > 1 && (self.wave - 1) % 3 == 0 {
            self.countdown += SUPPLY_DROP_TIME;
        }

        log::info!(
            "Wave {} loaded: {:?} tanks, {:?} helis, at most {}/{} on map",
            self.wave,
            self.tank_quota,
            self.heli_quota,
            self.max_tanks,
            self.max_helis
        );
    }

    /// Count a kill. Returns true when both quotas are met.
    pub fn record_kill(&mut self, kind: EnemyKind, variant: usize) -> bool {
        match kind {
            EnemyKind::Tank => {
                self.tank_quota.record_kill();
                self.tank_roster.push_back(variant);
            }
            EnemyKind::Heli => {
                self.heli_quota.record_kill();
                self.heli_roster.push_back(variant);
            }
        }
        self.tank_quota.is_met() && self.heli_quota.is_met()
    }

    /// Whether another enemy of `kind` may be spawned with `on_map` present
    pub fn can_spawn(&self, kind: EnemyKind, on_map: usize) -> bool {
        match kind {
            EnemyKind::Tank => on_map < self.max_tanks && self.tank_quota.allows(on_map),
            EnemyKind::Heli => on_map < self.max_helis && self.heli_quota.allows(on_map),
        }
    }

    pub fn next_variant(&mut self, kind: EnemyKind) -> Option<usize> {
        match kind {
            EnemyKind::Tank => self.tank_roster.pop_front(),
            EnemyKind::Heli => self.heli_roster.pop_front(),
        }
    }

    /// Step the countdowns by `dt`.
    ///
    /// `last_phase` is the phase at the end of the previous frame; supply
    /// items keep falling for one frame after the phase ends.
    pub fn update(&mut self, dt: f32, last_phase: GamePhase, rng: &mut impl Rng) -> WaveActions {
        let mut actions = WaveActions::default();

        let last_timer = self.final_timer;
        if (self.is_final_wave() && self.phase() == GamePhase::InGame) || self.final_timer < 0.0 {
            self.final_timer -= dt;
        }
        if self.final_timer <= 0.0 && last_timer > 0.0 {
            self.tank_quota = Quota::Limited(0);
            self.heli_quota = Quota::Limited(0);
            actions.start_cutscene = true;
        }
        if self.final_timer <= -CUTSCENE_TIME {
            actions.complete = true;
        }

        if self.countdown == SUPPLY_DROP_START {
            actions.roll_supply_drop = true;
            if self.phase() == GamePhase::InTransition && self.last_countdown < self.countdown {
                self.countdown += SUPPLY_DROP_TIME;
            }
        }

        self.last_countdown = self.countdown;
        self.countdown -= dt;

        if self.phase() == GamePhase::InTransition
            && self.countdown <= TRANSITION_CLEAR_TIME
            && self.last_countdown > TRANSITION_CLEAR_TIME
        {
            actions.clear_bullets = true;
        }

        if self.phase() == GamePhase::InTransition
            && self.countdown <= TRANSITION_SWITCH_TIME
            && self.last_countdown > TRANSITION_SWITCH_TIME
        {
            self.wave -= 1;
            self.period = self.wave / WAVES_PER_PERIOD;
            self.load_next_wave(rng);
            actions.period_advanced = true;
            log::info!("Period advanced to {}", self.time_of_day().as_str());
        }

        if self.phase() == GamePhase::InSupplyDrop || last_phase == GamePhase::InSupplyDrop {
            let whole = self.last_countdown.floor();
            if self.last_countdown.rem_euclid(1.0) < self.countdown.rem_euclid(1.0)
                && self.last_countdown < SUPPLY_DROP_START
            {
                actions.supply_slot = Some(SUPPLY_DROP_START - whole);
            }
        }

        if self.countdown <= 0.0 {
            self.countdown = WAVE_TIME;
            actions.spawn_enemies = true;
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn run(sched: &mut WaveScheduler, seconds: f32, rng: &mut Pcg32) -> Vec<WaveActions> {
        let dt = 1.0 / 60.0;
        let mut out = Vec::new();
        let mut last = sched.phase();
        for _ in 0..(seconds / dt).round() as usize {
            out.push(sched.update(dt, last, rng));
            last = sched.phase();
        }
        out
    }

    #[test]
    fn test_spawn_distance_filters() {
        let candidates: Vec<(usize, f32)> = [100.0, 200.0, 500.0, 900.0, 1500.0]
            .into_iter()
            .enumerate()
            .collect();
        assert_eq!(filter_spawn_candidates(&candidates), vec![2, 3]);
    }

    #[test]
    fn test_spawn_filters_never_empty_the_set() {
        assert_eq!(filter_spawn_candidates(&[(0, 100.0), (1, 300.0)]), vec![0, 1]);
        assert_eq!(filter_spawn_candidates(&[(0, 1500.0), (1, 2000.0)]), vec![0, 1]);
        assert!(filter_spawn_candidates(&[]).is_empty());
    }

    #[test]
    fn test_phase_boundaries() {
        // Wave 2, period 0
        assert_eq!(phase_for(3.0, 2, 0, 60.0), GamePhase::InGame);
        assert_eq!(phase_for(3.01, 2, 0, 60.0), GamePhase::InBetweenWaves);
        assert_eq!(phase_for(5.0, 2, 0, 60.0), GamePhase::InBetweenWaves);
        assert_eq!(phase_for(5.01, 2, 0, 60.0), GamePhase::InSupplyDrop);
        // Wave 7 still in period 0: transition
        assert_eq!(phase_for(10.0, 7, 0, 60.0), GamePhase::InTransition);
        assert_eq!(phase_for(10.0, 7, 1, 60.0), GamePhase::InSupplyDrop);
        // Out-of-period wave that does not open a period
        assert_eq!(phase_for(8.0, 8, 0, 60.0), GamePhase::InGame);
        assert_eq!(phase_for(1.0, 25, 4, 0.0), GamePhase::InCutscene);
    }

    #[test]
    fn test_first_wave_quotas() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut sched = WaveScheduler::new(0, false);
        sched.load_next_wave(&mut rng);
        assert_eq!(sched.wave, 1);
        assert_eq!((sched.max_tanks, sched.max_helis), (1, 1));
        assert_eq!(sched.tank_quota, Quota::Limited(2));
        assert_eq!(sched.heli_quota, Quota::Limited(1));
        assert_eq!(sched.countdown, BETWEEN_WAVES_TIME);
        assert_eq!(sched.phase(), GamePhase::InBetweenWaves);
        assert_eq!(sched.tank_roster.len(), 1);
        assert_eq!(sched.heli_roster.len(), 1);
    }

    #[test]
    fn test_final_wave_is_unlimited() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut sched = WaveScheduler::new(24, false);
        sched.load_next_wave(&mut rng);
        assert_eq!(sched.tank_quota, Quota::Unlimited);
        assert!(!sched.record_kill(EnemyKind::Tank, 0));

        let mut survival = WaveScheduler::new(24, true);
        survival.load_next_wave(&mut rng);
        assert!(matches!(survival.tank_quota, Quota::Limited(_)));
    }

    #[test]
    fn test_kills_complete_wave() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut sched = WaveScheduler::new(0, false);
        sched.load_next_wave(&mut rng);
        assert!(!sched.record_kill(EnemyKind::Tank, 0));
        assert!(!sched.record_kill(EnemyKind::Heli, 0));
        assert!(sched.record_kill(EnemyKind::Tank, 0));
    }

    #[test]
    fn test_spawn_cadence() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut sched = WaveScheduler::new(0, false);
        sched.load_next_wave(&mut rng);
        let actions = run(&mut sched, 11.5, &mut rng);
        // First spawn at 5 s, then every 3 s
        let spawns = actions.iter().filter(|a| a.spawn_enemies).count();
        assert_eq!(spawns, 3);
        assert!(actions.iter().all(|a| a.supply_slot.is_none()));
    }

    #[test]
    fn test_supply_drop_every_third_wave() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut sched = WaveScheduler::new(3, false);
        sched.load_next_wave(&mut rng);
        assert_eq!(sched.wave, 4);
        assert_eq!(sched.countdown, SUPPLY_DROP_START);
        assert_eq!(sched.phase(), GamePhase::InSupplyDrop);

        let actions = run(&mut sched, 6.0, &mut rng);
        assert!(actions[0].roll_supply_drop);
        let slots: Vec<f32> = actions.iter().filter_map(|a| a.supply_slot).collect();
        assert_eq!(slots, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_period_transition() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut sched = WaveScheduler::new(6, false);
        // Wave 7 loaded by a kill while still in period 0
        sched.period = 0;
        sched.load_next_wave(&mut rng);
        sched.last_countdown = 2.0;
        assert_eq!(sched.phase(), GamePhase::InTransition);

        let actions = run(&mut sched, 6.0, &mut rng);
        assert_eq!(actions.iter().filter(|a| a.clear_bullets).count(), 1);
        assert_eq!(actions.iter().filter(|a| a.period_advanced).count(), 1);
        assert_eq!(sched.period, 1);
        assert_eq!(sched.wave, 7);
        assert_eq!(sched.time_of_day(), TimeOfDay::Midday);
        // After the switch the countdown restarts at the supply drop
        assert_eq!(sched.phase(), GamePhase::InSupplyDrop);
        assert!(actions.iter().filter(|a| a.roll_supply_drop).count() >= 2);
    }

    #[test]
    fn test_control_blackout_window() {
        let mut sched = WaveScheduler::new(0, false);
        sched.countdown = 11.0;
        assert!(!sched.player_has_control());
        sched.countdown = 12.0;
        assert!(!sched.player_has_control());
        sched.countdown = 10.0;
        assert!(sched.player_has_control());
    }

    #[test]
    fn test_final_wave_timer_and_cutscene() {
        let mut rng = Pcg32::seed_from_u64(6);
        let mut sched = WaveScheduler::new(24, false);
        sched.load_next_wave(&mut rng);
        sched.countdown = WAVE_TIME;
        let actions = run(&mut sched, FINAL_WAVE_TIME + CUTSCENE_TIME + 0.5, &mut rng);
        assert_eq!(actions.iter().filter(|a| a.start_cutscene).count(), 1);
        assert!(actions.last().is_some_and(|a| a.complete));
        assert_eq!(sched.phase(), GamePhase::InCutscene);
    }

    #[test]
    fn test_survival_time_of_day_cycles() {
        let mut sched = WaveScheduler::new(0, true);
        sched.period = 5;
        assert_eq!(sched.time_of_day(), TimeOfDay::Midday);
        sched.survival = false;
        sched.period = 4;
        assert_eq!(sched.time_of_day(), TimeOfDay::Dawn2);
    }
}
