//! Fixed questions served whenever generation fails.

use super::{DifficultyTier, Question};

/// The fixed question for `tier`.
pub fn fallback_question(tier: DifficultyTier) -> Question {
    match tier {
        DifficultyTier::Easy => Question::new("What is 7 + 8?", "15", ["14", "15", "16", "17"]),
        DifficultyTier::Medium => Question::new("What is 8 × 7?", "56", ["54", "56", "58", "63"]),
        DifficultyTier::Hard => Question::new("What is 2³ + 5 × 3?", "23", ["21", "23", "25", "27"]),
    }
}
