//! Bounded enemy producer.
//!
//! The spawner is a component on its own entity. It never waits itself: the
//! game asks it for a [`plan`](Spawner::plan), schedules a
//! `SpawnerWake` timer with the returned delay, and calls back into the
//! spawner when the timer fires.

use crate::config::SpawnerConfig;
use crate::math::Vec2;

/// What a spawner does when its wait ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnStep {
    Spawn,
    /// The cap was reached when the wait began; look again.
    Recheck,
}

#[derive(Clone, Debug)]
pub struct Spawner {
    base_min_interval: f32,
    base_max_interval: f32,
    min_interval: f32,
    max_interval: f32,
    min_floor: f32,
    max_floor: f32,
    max_enemies: u32,
    recheck_interval: f32,
    live: u32,
    active: bool,
    spawn_points: Vec<Vec2>,
}

impl Spawner {
    pub fn new(config: &SpawnerConfig, spawn_points: Vec<Vec2>) -> Self {
        Self {
            base_min_interval: config.min_spawn_time,
            base_max_interval: config.max_spawn_time,
            min_interval: config.min_spawn_time,
            max_interval: config.max_spawn_time,
            min_floor: config.min_spawn_floor,
            max_floor: config.max_spawn_floor,
            max_enemies: config.max_enemies,
            recheck_interval: config.recheck_interval,
            live: 0,
            active: true,
            spawn_points,
        }
    }

    /// Next wait: a jittered interval below the cap, the recheck interval at it.
    pub fn plan(&self, rng: &mut fastrand::Rng) -> (f32, SpawnStep) {
        if self.is_full() {
            (self.recheck_interval, SpawnStep::Recheck)
        } else {
            (self.random_interval(rng), SpawnStep::Spawn)
        }
    }

    /// Uniform in `[min, max)`.
    pub fn random_interval(&self, rng: &mut fastrand::Rng) -> f32 {
        let span = self.max_interval - self.min_interval;
        if span <= 0.0 {
            self.min_interval
        } else {
            self.min_interval + rng.f32() * span
        }
    }

    /// A random spawn point, or `None` if the level defines none.
    pub fn pick_point(&self, rng: &mut fastrand::Rng) -> Option<Vec2> {
        if self.spawn_points.is_empty() {
            return None;
        }
        Some(self.spawn_points[rng.usize(..self.spawn_points.len())])
    }

    /// Count a newly created enemy. Refuses (returns false) at the cap.
    pub fn register_enemy(&mut self) -> bool {
        if self.is_full() {
            return false;
        }
        self.live += 1;
        true
    }

    pub fn enemy_destroyed(&mut self) {
        self.live = self.live.saturating_sub(1);
    }

    /// Shrink both interval bounds by `multiplier`, never below their floors.
    pub fn adjust_spawn_rate(&mut self, multiplier: f32) {
        if multiplier <= 0.0 {
            return;
        }
        self.min_interval = (self.base_min_interval / multiplier).max(self.min_floor);
        self.max_interval = (self.base_max_interval / multiplier).max(self.max_floor);
        log::debug!(
            "Spawn interval now {:.2}..{:.2}s (x{:.1})",
            self.min_interval,
            self.max_interval,
            multiplier
        );
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_full(&self) -> bool {
        self.live >= self.max_enemies
    }

    pub fn live_count(&self) -> u32 {
        self.live
    }

    pub fn max_enemies(&self) -> u32 {
        self.max_enemies
    }

    pub fn interval(&self) -> (f32, f32) {
        (self.min_interval, self.max_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawner(max_enemies: u32) -> Spawner {
        let config = SpawnerConfig {
            max_enemies,
            ..SpawnerConfig::default()
        };
        Spawner::new(&config, vec![Vec2::new(1.0, 1.0), Vec2::new(5.0, 1.0)])
    }

    #[test]
    fn never_exceeds_cap() {
        let mut s = spawner(3);
        let accepted = (0..10).filter(|_| s.register_enemy()).count();
        assert_eq!(accepted, 3);
        assert_eq!(s.live_count(), 3);
        assert!(s.is_full());
    }

    #[test]
    fn destroyed_count_floors_at_zero() {
        let mut s = spawner(3);
        s.register_enemy();
        s.enemy_destroyed();
        s.enemy_destroyed();
        assert_eq!(s.live_count(), 0);
    }

    #[test]
    fn plan_below_and_at_cap() {
        let mut rng = fastrand::Rng::with_seed(5);
        let mut s = spawner(1);
        for _ in 0..50 {
            let (delay, step) = s.plan(&mut rng);
            assert_eq!(step, SpawnStep::Spawn);
            assert!((3.0..8.0).contains(&delay), "delay {delay}");
        }
        s.register_enemy();
        assert_eq!(s.plan(&mut rng), (1.0, SpawnStep::Recheck));
    }

    #[test]
    fn spawn_rate_multiplier_respects_floors() {
        let mut s = spawner(10);
        s.adjust_spawn_rate(1.4);
        let (min, max) = s.interval();
        assert!((min - 3.0 / 1.4).abs() < 1e-5);
        assert!((max - 8.0 / 1.4).abs() < 1e-5);

        s.adjust_spawn_rate(10.0);
        assert_eq!(s.interval(), (1.0, 3.0));

        // Multipliers apply to the base interval, not compounded.
        s.adjust_spawn_rate(1.0);
        assert_eq!(s.interval(), (3.0, 8.0));
    }

    #[test]
    fn pick_point_uses_level_points() {
        let mut rng = fastrand::Rng::with_seed(11);
        let s = spawner(2);
        for _ in 0..20 {
            let p = s.pick_point(&mut rng).unwrap();
            assert!(p == Vec2::new(1.0, 1.0) || p == Vec2::new(5.0, 1.0));
        }
        let empty = Spawner::new(&SpawnerConfig::default(), Vec::new());
        assert_eq!(empty.pick_point(&mut rng), None);
    }
}
