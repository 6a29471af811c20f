use mathdash::config::GameConfig;
use mathdash::game::{Game, GameEvent};
use mathdash::hud::HudLayer;
use mathdash::input::Action;
use mathdash::level::LevelLayout;
use mathdash::math::Vec2;
use mathdash::question::{DifficultyTier, QuestionGenerator};

const DT: f32 = 1.0 / 60.0;

fn config() -> GameConfig {
    GameConfig {
        seed: Some(11),
        ..GameConfig::default()
    }
}

fn level_with_chest(x: f32) -> LevelLayout {
    let mut layout = LevelLayout::flat(100.0);
    layout.chests.push(Vec2::new(x, 0.4));
    layout
}

fn new_game(config: GameConfig, layout: LevelLayout) -> Game {
    Game::new(config, layout, HudLayer::with_seed(5), QuestionGenerator::offline()).unwrap()
}

fn run(game: &mut Game, seconds: f32) -> Vec<GameEvent> {
    let frames = (seconds / DT).round() as usize;
    for _ in 0..frames {
        game.update(DT).unwrap();
    }
    game.drain_events()
}

fn open_question(game: &mut Game) {
    game.input_mut().press(Action::MoveRight);
    for _ in 0..120 {
        game.update(DT).unwrap();
        if game.coordinator().current_question().is_some() {
            break;
        }
    }
    game.input_mut().release_all();
    assert!(game.coordinator().current_question().is_some(), "no question after walking into the chest");
}

#[test]
fn walking_into_chest_freezes_time_and_shows_question() {
    let mut game = new_game(config(), level_with_chest(2.0));
    open_question(&mut game);

    assert_eq!(game.coordinator().time_scale(), 0.0);
    assert!(game.hud().is_question_visible());
    assert_eq!(game.hud().options().len(), 4);
    assert!(game.hud().options().contains(&"15"));

    let frozen_at = game.player_position().unwrap();
    game.input_mut().press(Action::MoveRight);
    run(&mut game, 0.5);
    assert_eq!(game.player_position().unwrap(), frozen_at);
    assert_eq!(game.hud().timer_text(), "10s");
}

#[test]
fn correct_answer_awards_bullets_and_resumes_time() {
    let mut game = new_game(config(), level_with_chest(2.0));
    open_question(&mut game);
    game.drain_events();

    let outcome = game.submit_answer("15").unwrap();
    assert!(outcome.correct);
    assert_eq!(outcome.bullets_awarded, 5);
    assert_eq!(game.player_ammo(), 5);
    assert_eq!(game.hud().bullets_text(), "Bullets: 5");
    assert!(!game.hud().is_question_visible());
    assert_eq!(game.coordinator().time_scale(), 1.0);
    assert_eq!(game.coordinator().correct_answers(), 1);

    game.input_mut().tap(Action::Shoot);
    let events = run(&mut game, DT);
    assert!(events.iter().any(|e| matches!(e, GameEvent::BulletFired { ammo_left: 4, .. })));
    assert_eq!(game.hud().bullets_text(), "Bullets: 4");
}

#[test]
fn wrong_answer_gives_nothing() {
    let mut game = new_game(config(), level_with_chest(2.0));
    open_question(&mut game);

    let outcome = game.submit_answer("14").unwrap();
    assert!(!outcome.correct);
    assert_eq!(game.player_ammo(), 0);
    assert_eq!(game.coordinator().correct_answers(), 0);
    assert_eq!(game.coordinator().time_scale(), 1.0);
    assert!(game.submit_answer("15").is_none(), "question already closed");
}

#[test]
fn unanswered_question_times_out_on_wall_time() {
    let mut game = new_game(config(), level_with_chest(2.0));
    open_question(&mut game);
    game.drain_events();

    let events = run(&mut game, 9.5);
    assert!(!events.contains(&GameEvent::QuestionTimedOut));
    assert_eq!(game.hud().timer_text(), "1s");

    let events = run(&mut game, 1.0);
    assert!(events.contains(&GameEvent::QuestionTimedOut));
    assert!(!game.hud().is_question_visible());
    assert_eq!(game.coordinator().time_scale(), 1.0);
    assert_eq!(game.player_ammo(), 0);
}

#[test]
fn three_correct_answers_raise_level_and_spawn_rate() {
    let mut config = config();
    config.chest.cooldown = 0.1;
    let mut game = new_game(config, level_with_chest(40.0));
    let chest = game.chests()[0];
    let (base_min, base_max) = game.spawner().unwrap().interval();

    for _ in 0..3 {
        assert!(game.activate_chest(chest));
        run(&mut game, DT);
        let answer = game.coordinator().current_question().unwrap().correct_answer.clone();
        assert!(game.submit_answer(&answer).unwrap().correct);
        run(&mut game, 0.2);
    }

    assert_eq!(game.coordinator().level(), 2);
    assert_eq!(game.hud().level_text(), "Level: 2");
    assert_eq!(game.coordinator().difficulty(), DifficultyTier::Medium);
    assert_eq!(game.player_ammo(), 15);

    let (min, max) = game.spawner().unwrap().interval();
    assert!((min - base_min / 1.4).abs() < 1e-4);
    assert!((max - base_max / 1.4).abs() < 1e-4);

    assert!(game.activate_chest(chest));
    run(&mut game, DT);
    assert_eq!(game.coordinator().current_question().unwrap().prompt, "What is 8 × 7?");
}

#[test]
fn enemy_strikes_until_game_over() {
    let mut game = new_game(config(), LevelLayout::flat(100.0));
    run(&mut game, 1.0);
    game.spawn_enemy(Vec2::new(1.2, 1.0)).unwrap().unwrap();

    let events = run(&mut game, 6.0);
    let hits: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::PlayerDamaged { health, .. } => Some(*health),
            _ => None,
        })
        .collect();
    assert_eq!(hits, vec![2, 1, 0]);
    assert!(events.contains(&GameEvent::GameOver { final_score: 0 }));

    assert!(game.coordinator().is_game_over());
    assert_eq!(game.coordinator().time_scale(), 0.0);
    assert!(game.hud().is_game_over_visible());
    assert_eq!(game.hud().final_score_text(), "Final Score: 0");
    assert!(!game.spawner().unwrap().is_active());

    let events = run(&mut game, 2.0);
    assert!(events.iter().all(|e| !matches!(e, GameEvent::PlayerDamaged { .. })));
}

#[test]
fn restart_rebuilds_level_but_keeps_run_state() {
    let mut game = new_game(config(), level_with_chest(2.0));
    open_question(&mut game);
    game.submit_answer("15").unwrap();
    assert_eq!(game.player_ammo(), 5);
    let old_player = game.player();

    game.restart().unwrap();
    assert_ne!(game.player(), old_player);
    assert_eq!(game.player_ammo(), 0);
    assert_eq!(game.hud().bullets_text(), "Bullets: 0");
    assert_eq!(game.coordinator().correct_answers(), 1);
    assert_eq!(game.coordinator().health(), 3);
    assert!(game.chest(game.chests()[0]).unwrap().is_active());
    assert!(game.drain_events().contains(&GameEvent::Restarted));

    game.new_run().unwrap();
    assert_eq!(game.coordinator().correct_answers(), 0);
    assert_eq!(game.hud().level_text(), "Level: 1");
}

#[test]
fn restart_after_game_over_stays_frozen_until_new_run() {
    let mut game = new_game(config(), LevelLayout::flat(100.0));
    run(&mut game, 1.0);
    game.spawn_enemy(Vec2::new(1.2, 1.0)).unwrap();
    run(&mut game, 6.0);
    assert!(game.coordinator().is_game_over());

    game.restart().unwrap();
    assert!(game.coordinator().is_game_over());
    assert_eq!(game.coordinator().time_scale(), 0.0);
    assert_eq!(game.coordinator().health(), 0);

    game.new_run().unwrap();
    assert!(!game.coordinator().is_game_over());
    assert_eq!(game.coordinator().time_scale(), 1.0);
    assert_eq!(game.hud().health_text(), "Health: 3");
    assert!(!game.hud().is_game_over_visible());
}

#[test]
fn spawner_loop_respects_enemy_cap() {
    let mut config = config();
    config.spawner.min_spawn_time = 0.1;
    config.spawner.max_spawn_time = 0.2;
    config.spawner.max_enemies = 2;
    config.spawner.recheck_interval = 0.1;
    let mut layout = LevelLayout::flat(100.0);
    layout.spawn_points = vec![Vec2::new(60.0, 1.0), Vec2::new(70.0, 1.0)];
    let mut game = new_game(config, layout);

    let mut spawned = 0;
    for _ in 0..600 {
        game.update(DT).unwrap();
        spawned += game
            .drain_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::EnemySpawned { .. }))
            .count();
        assert!(game.spawner().unwrap().live_count() <= 2);
        assert!(game.enemies().len() <= 2);
    }

    assert_eq!(spawned, 2);
    assert_eq!(game.spawner().unwrap().live_count(), 2);
}

#[test]
fn strike_misses_once_player_leaves_range() {
    let mut game = new_game(config(), LevelLayout::flat(100.0));
    run(&mut game, 1.0);
    game.spawn_enemy(Vec2::new(-1.2, 1.0)).unwrap().unwrap();

    // Player outruns the enemy before the 0.6 s wind-up ends.
    game.input_mut().press(Action::MoveRight);
    let events = run(&mut game, 1.5);

    let attacks = events
        .iter()
        .filter(|e| matches!(e, GameEvent::EnemyAttacked { .. }))
        .count();
    assert_eq!(attacks, 1);
    assert!(events.iter().all(|e| !matches!(e, GameEvent::PlayerDamaged { .. })));
    assert_eq!(game.coordinator().health(), 3);
}
