//! Tunable values for a run, loadable from JSON.
//!
//! Every section is `#[serde(default)]`, so a config file only needs the
//! values it changes.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Environment variable consulted when the config carries no API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub player: PlayerConfig,
    pub rules: RulesConfig,
    pub spawner: SpawnerConfig,
    pub enemy: EnemyConfig,
    pub chest: ChestConfig,
    pub projectile: ProjectileConfig,
    pub physics: PhysicsConfig,
    pub camera: CameraConfig,
    pub question_service: QuestionServiceConfig,
    /// Seed for gameplay randomness; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Player controller tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub move_speed: f32,
    pub jump_force: f32,
    pub slide_speed: f32,
    pub slide_duration: f32,
    pub ground_check_radius: f32,
    pub half_extents: Vec2,
    /// Offset of the muzzle from the player's center when facing right.
    pub fire_offset: Vec2,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            jump_force: 10.0,
            slide_speed: 8.0,
            slide_duration: 0.5,
            ground_check_radius: 0.2,
            half_extents: Vec2::new(0.4, 0.9),
            fire_offset: Vec2::new(0.7, 0.2),
        }
    }
}

/// Health, rewards, question timing and the difficulty curve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub starting_health: u32,
    pub bullets_per_correct_answer: u32,
    pub question_time_limit: f32,
    /// Correct answers needed before questions become Medium.
    pub medium_threshold: u32,
    /// Correct answers needed before questions become Hard.
    pub hard_threshold: u32,
    pub answers_per_level: u32,
    /// Spawn-rate multiplier gained per level: `1 + step * level`.
    pub difficulty_step: f32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            starting_health: 3,
            bullets_per_correct_answer: 5,
            question_time_limit: 10.0,
            medium_threshold: 3,
            hard_threshold: 7,
            answers_per_level: 3,
            difficulty_step: 0.2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub min_spawn_time: f32,
    pub max_spawn_time: f32,
    pub min_spawn_floor: f32,
    pub max_spawn_floor: f32,
    pub max_enemies: u32,
    pub recheck_interval: f32,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            min_spawn_time: 3.0,
            max_spawn_time: 8.0,
            min_spawn_floor: 1.0,
            max_spawn_floor: 3.0,
            max_enemies: 10,
            recheck_interval: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub move_speed: f32,
    pub health: u32,
    pub damage: u32,
    pub detection_range: f32,
    pub attack_range: f32,
    /// Delay between the attack cue and the damage check.
    pub attack_windup: f32,
    /// Time a dead enemy stays in the world before removal.
    pub removal_delay: f32,
    pub half_extents: Vec2,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            health: 1,
            damage: 1,
            detection_range: 10.0,
            attack_range: 1.5,
            attack_windup: 0.6,
            removal_delay: 1.0,
            half_extents: Vec2::new(0.4, 0.5),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChestConfig {
    pub cooldown: f32,
    pub half_extents: Vec2,
}

impl Default for ChestConfig {
    fn default() -> Self {
        Self {
            cooldown: 30.0,
            half_extents: Vec2::new(0.5, 0.4),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    pub speed: f32,
    pub lifetime: f32,
    pub radius: f32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            speed: 10.0,
            lifetime: 3.0,
            radius: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: Vec2,
    pub fixed_timestep: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.81),
            fixed_timestep: 1.0 / 60.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub offset: Vec2,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            offset: Vec2::new(0.0, 2.0),
        }
    }
}

/// Where questions come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionServiceConfig {
    pub api_url: String,
    pub model: String,
    /// Bearer token; falls back to [`API_KEY_ENV`] when absent.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for QuestionServiceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".into(),
            model: "gpt-3.5-turbo".into(),
            api_key: None,
            timeout_secs: 15,
        }
    }
}

impl QuestionServiceConfig {
    /// The configured key, or the environment's, ignoring blank values.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = GameConfig::from_json(
            r#"{ "rules": { "starting_health": 5 }, "spawner": { "max_enemies": 2 }, "seed": 7 }"#,
        )
        .unwrap();

        assert_eq!(config.rules.starting_health, 5);
        assert_eq!(config.rules.bullets_per_correct_answer, 5);
        assert_eq!(config.spawner.max_enemies, 2);
        assert_eq!(config.spawner.min_spawn_time, 3.0);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.chest.cooldown, 30.0);
    }

    #[test]
    fn json_round_trip_preserves_values() {
        let mut config = GameConfig::default();
        config.enemy.detection_range = 12.5;
        let parsed = GameConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let service = QuestionServiceConfig {
            api_key: Some("sk-test".into()),
            ..QuestionServiceConfig::default()
        };
        assert_eq!(service.resolve_api_key().as_deref(), Some("sk-test"));

        let blank = QuestionServiceConfig {
            api_key: Some("   ".into()),
            ..QuestionServiceConfig::default()
        };
        // A blank configured key is not replaced by the environment.
        assert_eq!(blank.resolve_api_key(), None);
    }
}
