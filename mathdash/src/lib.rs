//! MathDash - headless gameplay core for a 2D side-scroller where answering
//! math questions earns ammunition.
//!
//! Questions come from a chat-completion service on a worker thread and fall
//! back to built-in questions whenever the service is unavailable.

pub mod animation;
pub mod camera;
pub mod chest;
pub mod config;
pub mod coordinator;
pub mod enemy;
pub mod error;
pub mod game;
pub mod hud;
pub mod input;
pub mod level;
pub mod math;
pub mod physics;
pub mod player;
pub mod projectile;
pub mod question;
pub mod scheduler;
pub mod spawner;
pub mod world;

pub use crate::camera::{CameraFollow, ParallaxLayer};
pub use crate::config::GameConfig;
pub use crate::coordinator::{AnswerOutcome, Coordinator, DamageOutcome, LevelUp};
pub use crate::error::QuestionError;
pub use crate::game::{Game, GameEvent};
pub use crate::hud::{Hud, HudLayer};
pub use crate::input::{Action, InputState};
pub use crate::level::LevelLayout;
pub use crate::math::Vec2;
pub use crate::question::{DifficultyTier, Question, QuestionGenerator};
pub use crate::world::{EntityId, Tag, World};
