//! Cancellable timers driven by the game tick.
//!
//! Multi-frame waits (spawner delays, chest cooldowns, the question
//! countdown, post-death removal) are timers owned by an entity or by the
//! question panel. Cancelling an owner drops every timer it scheduled, which
//! is how a panel closed early or a disabled spawner stops its wait.

use crate::spawner::SpawnStep;
use crate::world::EntityId;

/// Which clock a timer runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Clock {
    /// Gameplay time: advances by `dt * time_scale`, frozen while paused.
    Scaled,
    /// Wall time: advances by `dt` even while gameplay is frozen.
    Unscaled,
}

/// Owner key used for cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerOwner {
    Entity(EntityId),
    QuestionPanel,
}

/// What happens when a timer fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    SpawnerWake(SpawnStep),
    ChestReopen,
    EnemyStrike,
    EnemyRemove,
    ProjectileExpire,
    QuestionTimeout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// A timer that came due during [`Scheduler::advance`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FiredTimer {
    pub id: TimerId,
    pub owner: TimerOwner,
    pub event: TimerEvent,
}

#[derive(Clone, Debug)]
struct Timer {
    id: TimerId,
    owner: TimerOwner,
    clock: Clock,
    deadline: f64,
    event: TimerEvent,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    scaled_now: f64,
    unscaled_now: f64,
    timers: Vec<Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current reading of a clock, in seconds since the scheduler was created.
    pub fn now(&self, clock: Clock) -> f64 {
        match clock {
            Clock::Scaled => self.scaled_now,
            Clock::Unscaled => self.unscaled_now,
        }
    }

    /// Schedule `event` to fire `delay` seconds from now on `clock`.
    pub fn schedule(&mut self, owner: TimerOwner, clock: Clock, delay: f32, event: TimerEvent) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let deadline = self.now(clock) + f64::from(delay.max(0.0));
        self.timers.push(Timer {
            id,
            owner,
            clock,
            deadline,
            event,
        });
        id
    }

    /// Cancel a single timer. Returns whether it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    /// Cancel every timer scheduled by `owner`. Returns how many were dropped.
    pub fn cancel_owner(&mut self, owner: TimerOwner) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| t.owner != owner);
        before - self.timers.len()
    }

    pub fn is_scheduled(&self, owner: TimerOwner) -> bool {
        self.timers.iter().any(|t| t.owner == owner)
    }

    /// Seconds left on the earliest timer of `owner`.
    pub fn remaining(&self, owner: TimerOwner) -> Option<f32> {
        self.timers
            .iter()
            .filter(|t| t.owner == owner)
            .map(|t| (t.deadline - self.now(t.clock)).max(0.0))
            .min_by(|a, b| a.total_cmp(b))
            .map(|r| r as f32)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Drop every timer. Clocks keep running.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Advance both clocks and return the timers that came due, earliest
    /// first; ties fire in scheduling order.
    pub fn advance(&mut self, dt: f32, time_scale: f32) -> Vec<FiredTimer> {
        self.unscaled_now += f64::from(dt.max(0.0));
        self.scaled_now += f64::from((dt * time_scale).max(0.0));

        let (scaled_now, unscaled_now) = (self.scaled_now, self.unscaled_now);
        let is_due = |t: &Timer| match t.clock {
            Clock::Scaled => t.deadline <= scaled_now,
            Clock::Unscaled => t.deadline <= unscaled_now,
        };

        let mut due: Vec<Timer> = Vec::new();
        let mut pending = Vec::with_capacity(self.timers.len());
        for timer in self.timers.drain(..) {
            if is_due(&timer) {
                due.push(timer);
            } else {
                pending.push(timer);
            }
        }
        self.timers = pending;

        // Lateness orders timers across the two clocks.
        due.sort_by(|a, b| {
            let late_a = self.now(a.clock) - a.deadline;
            let late_b = self.now(b.clock) - b.deadline;
            late_b.total_cmp(&late_a).then(a.id.cmp(&b.id))
        });

        due.into_iter()
            .map(|t| FiredTimer {
                id: t.id,
                owner: t.owner,
                event: t.event,
            })
            .collect()
    }
}
