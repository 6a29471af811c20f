//! Central run state: health, score, level, the question flow and time scale.
//!
//! One `Coordinator` is owned by each [`Game`](crate::game::Game). Gameplay
//! objects never hold it; the game calls into it and applies the outcomes
//! it returns (bullets to the player, spawn rate to the spawner).

use crate::config::RulesConfig;
use crate::hud::{Hud, HudLayer};
use crate::question::{DifficultyTier, PendingQuestion, Question, QuestionGenerator};
use crate::scheduler::{Clock, Scheduler, TimerEvent, TimerOwner};

/// Result of a submitted answer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnswerOutcome {
    pub correct: bool,
    /// Bullets the player should receive (0 unless correct).
    pub bullets_awarded: u32,
    pub level_up: Option<LevelUp>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelUp {
    pub level: u32,
    pub spawn_rate_multiplier: f32,
}

/// Result of [`Coordinator::apply_damage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Already game over; nothing changed.
    Ignored,
    Damaged { health: u32 },
    /// Health reached zero just now. Spawning must stop.
    GameOver { final_score: u32 },
}

pub struct Coordinator<U: Hud = HudLayer> {
    rules: RulesConfig,
    hud: U,
    generator: QuestionGenerator,
    health: u32,
    correct_answers: u32,
    level: u32,
    current: Option<Question>,
    pending: Option<PendingQuestion>,
    game_over: bool,
    time_scale: f32,
}

impl<U: Hud> Coordinator<U> {
    pub fn new(rules: RulesConfig, hud: U, generator: QuestionGenerator) -> Self {
        let health = rules.starting_health;
        Self {
            rules,
            hud,
            generator,
            health,
            correct_answers: 0,
            level: 1,
            current: None,
            pending: None,
            game_over: false,
            time_scale: 1.0,
        }
    }

    /// Reset the run and refresh every HUD display.
    pub fn initialize(&mut self) {
        self.health = self.rules.starting_health;
        self.correct_answers = 0;
        self.level = 1;
        self.current = None;
        self.pending = None;
        self.game_over = false;
        self.time_scale = 1.0;

        self.hud.update_health(self.health);
        self.hud.update_bullet_count(0);
        self.hud.update_level(self.level);
        self.hud.hide_question();
        self.hud.hide_game_over();
        log::info!("Run initialized with {} health", self.health);
    }

    pub fn difficulty(&self) -> DifficultyTier {
        DifficultyTier::from_correct_answers(
            self.correct_answers,
            self.rules.medium_threshold,
            self.rules.hard_threshold,
        )
    }

    /// Start generating a question unless one is already pending or shown.
    /// Returns whether a request was made.
    pub fn request_question(&mut self) -> bool {
        if self.game_over || self.pending.is_some() || self.current.is_some() {
            log::debug!("Question request ignored");
            return false;
        }
        let tier = self.difficulty();
        log::debug!("Requesting {:?} question", tier);
        self.pending = Some(self.generator.generate(tier));
        true
    }

    /// Show the pending question if it has arrived. Returns whether one was shown.
    pub fn poll_question(&mut self, scheduler: &mut Scheduler) -> bool {
        let Some(question) = self.pending.as_ref().and_then(PendingQuestion::try_take) else {
            return false;
        };
        self.pending = None;

        if self.game_over {
            log::debug!("Discarding question that arrived after game over");
            return false;
        }

        log::info!("Question: {}", question.prompt);
        let limit = self.rules.question_time_limit;
        self.hud.show_question(&question, limit);
        scheduler.cancel_owner(TimerOwner::QuestionPanel);
        scheduler.schedule(
            TimerOwner::QuestionPanel,
            Clock::Unscaled,
            limit,
            TimerEvent::QuestionTimeout,
        );
        self.current = Some(question);
        self.time_scale = 0.0;
        true
    }

    /// Check `selected` against the current question.
    ///
    /// Returns `None` when no question is shown.
    pub fn submit_answer(&mut self, selected: &str, scheduler: &mut Scheduler) -> Option<AnswerOutcome> {
        let question = self.current.take()?;
        let correct = question.is_correct(selected);

        let mut outcome = AnswerOutcome {
            correct,
            bullets_awarded: 0,
            level_up: None,
        };

        if correct {
            self.correct_answers += 1;
            outcome.bullets_awarded = self.rules.bullets_per_correct_answer;
            outcome.level_up = self.recompute_level();
            log::info!("Correct answer ({} so far)", self.correct_answers);
        } else {
            log::info!("Wrong answer {:?}, expected {:?}", selected, question.correct_answer);
        }

        self.close_question(scheduler);
        Some(outcome)
    }

    /// Submit the option shown at `index`.
    pub fn select_answer(&mut self, index: usize, scheduler: &mut Scheduler) -> Option<AnswerOutcome> {
        let selected = self.hud.option_at(index)?;
        self.submit_answer(&selected, scheduler)
    }

    /// Time ran out: close without reward. Returns whether a question was shown.
    pub fn on_question_timeout(&mut self, scheduler: &mut Scheduler) -> bool {
        if self.current.take().is_none() {
            return false;
        }
        log::info!("Question timed out");
        self.close_question(scheduler);
        true
    }

    /// Push the panel countdown to the HUD while a question is shown.
    pub fn refresh_countdown(&mut self, scheduler: &Scheduler) {
        if self.current.is_none() {
            return;
        }
        if let Some(remaining) = scheduler.remaining(TimerOwner::QuestionPanel) {
            self.hud
                .update_countdown(remaining, self.rules.question_time_limit);
        }
    }

    pub fn apply_damage(&mut self, amount: u32) -> DamageOutcome {
        if self.game_over {
            return DamageOutcome::Ignored;
        }

        self.health = self.health.saturating_sub(amount);
        self.hud.update_health(self.health);

        if self.health > 0 {
            log::debug!("Player took {} damage, {} health left", amount, self.health);
            return DamageOutcome::Damaged {
                health: self.health,
            };
        }

        self.game_over = true;
        self.time_scale = 0.0;
        self.hud.show_game_over(self.correct_answers);
        log::info!("Game over, final score {}", self.correct_answers);
        DamageOutcome::GameOver {
            final_score: self.correct_answers,
        }
    }

    pub fn update_bullet_count(&mut self, count: u32) {
        self.hud.update_bullet_count(count);
    }

    /// The level was rebuilt under a running coordinator.
    ///
    /// The question bound to the old level is dropped. Counters, health, the
    /// game-over flag and the time scale carry over unchanged; use
    /// [`initialize`](Self::initialize) for a fresh run.
    pub fn on_scene_reloaded(&mut self) {
        self.current = None;
        self.pending = None;
        self.hud.hide_question();
        self.hud.update_health(self.health);
        self.hud.update_level(self.level);
    }

    /// Multiplier applied to the spawn rate for the current level.
    pub fn spawn_rate_multiplier(&self) -> f32 {
        1.0 + self.rules.difficulty_step * self.level as f32
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// 0 while a question or the game-over panel is up, 1 otherwise.
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    pub fn is_question_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    pub fn hud(&self) -> &U {
        &self.hud
    }

    pub fn hud_mut(&mut self) -> &mut U {
        &mut self.hud
    }

    fn close_question(&mut self, scheduler: &mut Scheduler) {
        scheduler.cancel_owner(TimerOwner::QuestionPanel);
        self.hud.hide_question();
        if !self.game_over {
            self.time_scale = 1.0;
        }
    }

    fn recompute_level(&mut self) -> Option<LevelUp> {
        let per_level = self.rules.answers_per_level.max(1);
        let new_level = 1 + self.correct_answers / per_level;
        if new_level <= self.level {
            return None;
        }
        self.level = new_level;
        self.hud.update_level(new_level);
        let multiplier = self.spawn_rate_multiplier();
        log::info!("Level up: {} (spawn rate x{:.1})", new_level, multiplier);
        Some(LevelUp {
            level: new_level,
            spawn_rate_multiplier: multiplier,
        })
    }
}
