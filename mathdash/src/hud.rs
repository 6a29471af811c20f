//! Screen-space UI model.
//!
//! The coordinator talks to the UI only through the setter-style [`Hud`]
//! trait. [`HudLayer`] is the headless implementation: it keeps the text a
//! renderer would draw, laid out in screen pixels (0,0 = top-left).

use crate::math::Vec2;
use crate::question::Question;

/// UI callbacks used by the coordinator.
pub trait Hud {
    fn update_health(&mut self, health: u32);
    fn update_bullet_count(&mut self, bullets: u32);
    fn update_level(&mut self, level: u32);
    /// Show the question panel with shuffled options and a full timer.
    fn show_question(&mut self, question: &Question, time_limit: f32);
    fn update_countdown(&mut self, remaining: f32, time_limit: f32);
    fn hide_question(&mut self);
    fn show_game_over(&mut self, final_score: u32);
    fn hide_game_over(&mut self);
    /// Text of the option button at `index`, if the panel is showing.
    fn option_at(&self, index: usize) -> Option<String>;
}

/// Text element in screen-space HUD coordinates (pixels).
#[derive(Clone, Debug, PartialEq)]
pub struct HudText {
    pub text: String,
    pub position: Vec2,
    pub visible: bool,
}

impl HudText {
    fn new(text: impl Into<String>, position: Vec2) -> Self {
        Self {
            text: text.into(),
            position,
            visible: true,
        }
    }
}

/// Bar drawn as a rectangle whose width is `fill` of `size.x`.
#[derive(Clone, Debug, PartialEq)]
pub struct HudBar {
    pub position: Vec2,
    pub size: Vec2,
    pub fill: f32,
}

#[derive(Clone, Debug)]
pub struct QuestionPanel {
    pub visible: bool,
    pub prompt: HudText,
    pub options: Vec<HudText>,
    pub timer: HudText,
    pub timer_bar: HudBar,
}

#[derive(Clone, Debug)]
pub struct GameOverPanel {
    pub visible: bool,
    pub final_score: HudText,
}

/// Headless HUD: stat texts, question panel, game-over panel.
pub struct HudLayer {
    health: HudText,
    bullets: HudText,
    level: HudText,
    question: QuestionPanel,
    game_over: GameOverPanel,
    rng: fastrand::Rng,
}

impl HudLayer {
    /// HUD whose option shuffling is seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(fastrand::Rng::new())
    }

    /// HUD with deterministic option shuffling.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(fastrand::Rng::with_seed(seed))
    }

    fn with_rng(rng: fastrand::Rng) -> Self {
        Self {
            health: HudText::new("Health: 0", Vec2::new(16.0, 16.0)),
            bullets: HudText::new("Bullets: 0", Vec2::new(16.0, 44.0)),
            level: HudText::new("Level: 1", Vec2::new(16.0, 72.0)),
            question: QuestionPanel {
                visible: false,
                prompt: HudText::new("", Vec2::new(240.0, 160.0)),
                options: Vec::new(),
                timer: HudText::new("", Vec2::new(560.0, 160.0)),
                timer_bar: HudBar {
                    position: Vec2::new(240.0, 132.0),
                    size: Vec2::new(360.0, 12.0),
                    fill: 0.0,
                },
            },
            game_over: GameOverPanel {
                visible: false,
                final_score: HudText::new("", Vec2::new(320.0, 240.0)),
            },
            rng,
        }
    }

    pub fn health_text(&self) -> &str {
        &self.health.text
    }

    pub fn bullets_text(&self) -> &str {
        &self.bullets.text
    }

    pub fn level_text(&self) -> &str {
        &self.level.text
    }

    pub fn question_panel(&self) -> &QuestionPanel {
        &self.question
    }

    pub fn is_question_visible(&self) -> bool {
        self.question.visible
    }

    /// Option texts in display order.
    pub fn options(&self) -> Vec<&str> {
        self.question.options.iter().map(|o| o.text.as_str()).collect()
    }

    pub fn timer_text(&self) -> &str {
        &self.question.timer.text
    }

    pub fn timer_fill(&self) -> f32 {
        self.question.timer_bar.fill
    }

    pub fn is_game_over_visible(&self) -> bool {
        self.game_over.visible
    }

    pub fn final_score_text(&self) -> &str {
        &self.game_over.final_score.text
    }

    /// Visible HUD as plain text, top to bottom.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            self.health.text.clone(),
            self.bullets.text.clone(),
            self.level.text.clone(),
        ];
        if self.question.visible {
            lines.push(format!("Q: {} [{}]", self.question.prompt.text, self.question.timer.text));
            for (i, option) in self.question.options.iter().enumerate() {
                lines.push(format!("  {}) {}", i + 1, option.text));
            }
        }
        if self.game_over.visible {
            lines.push("GAME OVER".to_string());
            lines.push(self.game_over.final_score.text.clone());
        }
        lines
    }

    fn shuffled_options(&mut self, question: &Question) -> Vec<String> {
        let mut options = question.options.clone();
        if !question.contains_answer() {
            match options.first_mut() {
                Some(first) => *first = question.correct_answer.clone(),
                None => options.push(question.correct_answer.clone()),
            }
        }
        let len = options.len();
        for i in 0..len {
            let j = self.rng.usize(i..len);
            options.swap(i, j);
        }
        options
    }
}

impl Default for HudLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Hud for HudLayer {
    fn update_health(&mut self, health: u32) {
        self.health.text = format!("Health: {}", health);
    }

    fn update_bullet_count(&mut self, bullets: u32) {
        self.bullets.text = format!("Bullets: {}", bullets);
    }

    fn update_level(&mut self, level: u32) {
        self.level.text = format!("Level: {}", level);
    }

    fn show_question(&mut self, question: &Question, time_limit: f32) {
        let options = self.shuffled_options(question);
        let origin = self.question.prompt.position;
        self.question.prompt.text = question.prompt.clone();
        self.question.options = options
            .into_iter()
            .enumerate()
            .map(|(i, text)| HudText::new(text, origin + Vec2::new(0.0, 40.0 * (i as f32 + 1.0))))
            .collect();
        self.question.visible = true;
        self.update_countdown(time_limit, time_limit);
    }

    fn update_countdown(&mut self, remaining: f32, time_limit: f32) {
        let remaining = remaining.max(0.0);
        self.question.timer.text = format!("{}s", remaining.ceil() as u32);
        self.question.timer_bar.fill = if time_limit > 0.0 {
            (remaining / time_limit).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    fn hide_question(&mut self) {
        self.question.visible = false;
        self.question.options.clear();
    }

    fn show_game_over(&mut self, final_score: u32) {
        self.game_over.final_score.text = format!("Final Score: {}", final_score);
        self.game_over.visible = true;
    }

    fn hide_game_over(&mut self) {
        self.game_over.visible = false;
    }

    fn option_at(&self, index: usize) -> Option<String> {
        if !self.question.visible {
            return None;
        }
        self.question.options.get(index).map(|o| o.text.clone())
    }
}
