//! Headless MathDash runner.
//!
//! Plays a level with a simple autopilot and logs what happens. Useful for
//! checking tuning changes and the question service without a renderer.
//!
//! Usage:
//!   mathdash_sim [OPTIONS]
//!
//! Options:
//!   --config FILE   Game config JSON (default: built-in values)
//!   --level FILE    Level layout JSON (default: built-in level)
//!   --seconds N     Simulated seconds to run (default: 120)
//!   --seed N        RNG seed, overrides the config's

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use dotenv::dotenv;
use mathdash::{Action, Game, GameConfig, GameEvent, HudLayer, LevelLayout, QuestionGenerator};

const TICKS_PER_SECOND: u32 = 60;
/// Ticks the autopilot "reads" a question before answering.
const THINK_TICKS: u32 = 90;
/// Every this many questions the autopilot answers wrong on purpose.
const WRONG_EVERY: u32 = 5;
const JUMP_EVERY: u32 = 75;
const SHOOT_EVERY: u32 = 15;
const SHOOT_RANGE: f32 = 9.0;

struct SimArgs {
    config: Option<PathBuf>,
    level: Option<PathBuf>,
    seconds: f32,
    seed: Option<u64>,
}

impl Default for SimArgs {
    fn default() -> Self {
        Self {
            config: None,
            level: None,
            seconds: 120.0,
            seed: None,
        }
    }
}

fn parse_args() -> Result<SimArgs> {
    let mut args = SimArgs::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => args.config = Some(value(&mut iter, "--config")?.into()),
            "--level" => args.level = Some(value(&mut iter, "--level")?.into()),
            "--seconds" => {
                args.seconds = value(&mut iter, "--seconds")?
                    .parse()
                    .context("--seconds requires a number")?;
            }
            "--seed" => {
                args.seed = Some(
                    value(&mut iter, "--seed")?
                        .parse()
                        .context("--seed requires a number")?,
                );
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                print_usage();
                return Err(anyhow!("unknown argument: {}", other));
            }
        }
    }
    Ok(args)
}

fn value(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    iter.next().ok_or_else(|| anyhow!("{} requires a value", flag))
}

fn print_usage() {
    eprintln!(
        "MathDash headless runner\n\
         \n\
         Usage: mathdash_sim [OPTIONS]\n\
         \n\
         Options:\n\
         \x20 --config FILE   Game config JSON\n\
         \x20 --level FILE    Level layout JSON\n\
         \x20 --seconds N     Simulated seconds to run (default: 120)\n\
         \x20 --seed N        RNG seed\n\
         \x20 --help, -h      Show this help"
    );
}

/// Drives the player the way a distracted but decent player would.
#[derive(Default)]
struct Autopilot {
    tick: u32,
    reading: u32,
    questions_answered: u32,
}

impl Autopilot {
    fn drive(&mut self, game: &mut Game) {
        self.tick += 1;

        if game.hud().is_question_visible() {
            game.input_mut().release_all();
            self.reading += 1;
            if self.reading >= THINK_TICKS {
                self.answer(game);
            }
            return;
        }
        self.reading = 0;

        // Wait at the chest for a slow question service.
        if game.coordinator().is_question_pending() {
            game.input_mut().release_all();
            return;
        }

        let input = game.input_mut();
        input.press(Action::MoveRight);
        if self.tick % JUMP_EVERY == 0 {
            input.tap(Action::Jump);
        }

        if self.tick % SHOOT_EVERY == 0 && game.player_ammo() > 0 && enemy_in_range(game) {
            game.input_mut().tap(Action::Shoot);
        }
    }

    fn answer(&mut self, game: &mut Game) {
        let Some(correct) = game
            .coordinator()
            .current_question()
            .map(|q| q.correct_answer.clone())
        else {
            return;
        };
        let options: Vec<String> = game.hud().options().into_iter().map(str::to_owned).collect();
        self.questions_answered += 1;

        let want_correct = self.questions_answered % WRONG_EVERY != 0;
        let index = options
            .iter()
            .position(|option| (option.trim() == correct.trim()) == want_correct)
            .unwrap_or(0);
        log::debug!("Autopilot picks option {} of {:?}", index + 1, options);
        game.select_answer(index);
    }
}

fn enemy_in_range(game: &Game) -> bool {
    let Some(player) = game.player_position() else {
        return false;
    };
    game.enemies().into_iter().any(|id| {
        let alive = game.enemy(id).map_or(false, |enemy| !enemy.is_dead());
        let ahead = game
            .physics()
            .body_position(id)
            .map_or(false, |pos| pos.x > player.x && pos.distance(player) <= SHOOT_RANGE);
        alive && ahead
    })
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::QuestionShown { .. }
        | GameEvent::AnswerSubmitted { .. }
        | GameEvent::QuestionTimedOut
        | GameEvent::LevelUp { .. }
        | GameEvent::ChestOpened { .. }
        | GameEvent::PlayerDamaged { .. }
        | GameEvent::GameOver { .. }
        | GameEvent::Restarted => log::info!("{:?}", event),
        _ => log::debug!("{:?}", event),
    }
}

fn main() -> Result<()> {
    // A missing .env file is fine; the key may come from the environment.
    let _ = dotenv();
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    let args = parse_args()?;

    let mut config = match &args.config {
        Some(path) => GameConfig::load_from_file(path)?,
        None => GameConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    let layout = match &args.level {
        Some(path) => LevelLayout::load_from_file(path)?,
        None => LevelLayout::default(),
    };

    let generator = QuestionGenerator::from_config(&config.question_service);
    let hud = match config.seed {
        Some(seed) => HudLayer::with_seed(seed),
        None => HudLayer::new(),
    };
    let mut game = Game::new(config, layout, hud, generator)?;
    let mut autopilot = Autopilot::default();

    let dt = 1.0 / TICKS_PER_SECOND as f32;
    let ticks = (args.seconds.max(0.0) * TICKS_PER_SECOND as f32).round() as u64;
    log::info!("Simulating {:.0}s ({} ticks)", args.seconds, ticks);

    for _ in 0..ticks {
        autopilot.drive(&mut game);
        game.update(dt)?;
        for event in game.drain_events() {
            log_event(&event);
        }
        if game.coordinator().is_game_over() {
            break;
        }
    }

    let coordinator = game.coordinator();
    log::info!(
        "Finished: level {}, {} correct answers, {} health",
        coordinator.level(),
        coordinator.correct_answers(),
        coordinator.health()
    );
    for line in game.hud().lines() {
        println!("{}", line);
    }
    Ok(())
}
