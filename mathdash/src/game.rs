//! The tick loop and the wiring between gameplay objects.
//!
//! `Game` owns everything a running level needs. Each call to
//! [`Game::update`] is one frame:
//!
//! 1. pick up a question that finished generating
//! 2. advance the scheduler and dispatch fired timers
//! 3. while gameplay time runs: player control, enemy AI, fixed-step
//!    physics with collision routing, transform sync, camera
//! 4. refresh the question countdown
//! 5. clear per-frame input edges and move fired animation triggers into
//!    the event log

use anyhow::Result;

use crate::animation::{self, cues, Animator};
use crate::camera::{CameraFollow, ParallaxLayer};
use crate::chest::MathChest;
use crate::config::GameConfig;
use crate::coordinator::{AnswerOutcome, Coordinator, DamageOutcome};
use crate::enemy::{spawn_enemy, DamageResult, Enemy};
use crate::hud::{Hud, HudLayer};
use crate::input::InputState;
use crate::level::{LevelLayout, LoadedLevel};
use crate::math::Vec2;
use crate::physics::{PhysicsEvent, PhysicsWorld};
use crate::player::{probe_ground, PlayerController};
use crate::projectile::{destroyed_by_contact, spawn_projectile, Projectile};
use crate::question::QuestionGenerator;
use crate::scheduler::{Clock, FiredTimer, Scheduler, TimerEvent, TimerOwner};
use crate::spawner::{SpawnStep, Spawner};
use crate::world::{EntityId, Tag, Transform, World};

/// Something that happened during a frame, for logs and tests.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    ChestOpened { chest: EntityId, question_requested: bool },
    ChestReopened { chest: EntityId },
    QuestionShown { prompt: String },
    AnswerSubmitted { correct: bool, bullets_awarded: u32 },
    QuestionTimedOut,
    LevelUp { level: u32, spawn_rate_multiplier: f32 },
    EnemySpawned { enemy: EntityId, position: Vec2 },
    EnemyAttacked { enemy: EntityId },
    EnemyDied { enemy: EntityId },
    EnemyRemoved { enemy: EntityId },
    BulletFired { bullet: EntityId, ammo_left: u32 },
    BulletDestroyed { bullet: EntityId },
    PlayerDamaged { amount: u32, health: u32 },
    GameOver { final_score: u32 },
    Restarted,
    /// A one-shot animation trigger fired on `entity` this frame.
    AnimationCue { entity: EntityId, cue: &'static str },
}

pub struct Game<U: Hud = HudLayer> {
    config: GameConfig,
    layout: LevelLayout,
    world: World,
    physics: PhysicsWorld,
    scheduler: Scheduler,
    coordinator: Coordinator<U>,
    rng: fastrand::Rng,
    input: InputState,
    camera: CameraFollow,
    parallax: Vec<ParallaxLayer>,
    level: LoadedLevel,
    fixed_time_accumulator: f32,
    events: Vec<GameEvent>,
}

impl<U: Hud> Game<U> {
    /// Build the level, start a fresh run and start the spawner.
    pub fn new(config: GameConfig, layout: LevelLayout, hud: U, generator: QuestionGenerator) -> Result<Self> {
        layout.validate()?;

        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let mut world = World::new();
        let mut physics = PhysicsWorld::with_gravity(config.physics.gravity);
        let level = layout.build(&mut world, &mut physics, &config)?;
        let camera = CameraFollow::new(config.camera.offset).follow_entity(level.player);
        let parallax = level.parallax.clone();
        let coordinator = Coordinator::new(config.rules.clone(), hud, generator);

        let mut game = Self {
            config,
            layout,
            world,
            physics,
            scheduler: Scheduler::new(),
            coordinator,
            rng,
            input: InputState::new(),
            camera,
            parallax,
            level,
            fixed_time_accumulator: 0.0,
            events: Vec::new(),
        };

        game.coordinator.initialize();
        game.schedule_spawner_wake();
        game.update_camera();
        Ok(game)
    }

    /// Advance the game by `dt` seconds of wall time.
    pub fn update(&mut self, dt: f32) -> Result<()> {
        if self.coordinator.poll_question(&mut self.scheduler) {
            if let Some(question) = self.coordinator.current_question() {
                self.events.push(GameEvent::QuestionShown {
                    prompt: question.prompt.clone(),
                });
            }
        }

        let fired = self.scheduler.advance(dt, self.coordinator.time_scale());
        for timer in fired {
            self.dispatch_timer(timer)?;
        }

        let time_scale = self.coordinator.time_scale();
        if time_scale > 0.0 {
            let scaled_dt = dt * time_scale;
            self.update_player(scaled_dt)?;
            self.update_enemies();
            self.update_projectiles();

            let fixed_dt = self.config.physics.fixed_timestep;
            self.fixed_time_accumulator += scaled_dt;
            while fixed_dt > 0.0 && self.fixed_time_accumulator >= fixed_dt {
                self.fixed_time_accumulator -= fixed_dt;
                self.physics.step(fixed_dt);
                for event in self.physics.drain_events() {
                    self.handle_physics_event(event)?;
                }
            }

            self.sync_transforms();
            self.update_camera();
        }

        self.coordinator.refresh_countdown(&self.scheduler);
        self.input.begin_frame();
        self.collect_cues();
        Ok(())
    }

    /// Route a physics event to the gameplay objects it concerns.
    pub fn handle_physics_event(&mut self, event: PhysicsEvent) -> Result<()> {
        match event {
            PhysicsEvent::CollisionEnter { a, b } => {
                self.bullet_contact(a, b);
                self.bullet_contact(b, a);
            }
            PhysicsEvent::TriggerEnter { a, b } => {
                self.trigger_enter(a, b);
                self.trigger_enter(b, a);
            }
            PhysicsEvent::TriggerExit { a, b } => {
                self.trigger_exit(a, b);
                self.trigger_exit(b, a);
            }
            PhysicsEvent::CollisionExit { .. } => {}
        }
        Ok(())
    }

    /// Pick the answer button at `index` of the question panel.
    pub fn select_answer(&mut self, index: usize) -> Option<AnswerOutcome> {
        let outcome = self.coordinator.select_answer(index, &mut self.scheduler)?;
        self.apply_answer(outcome);
        Some(outcome)
    }

    /// Submit an answer by its text.
    pub fn submit_answer(&mut self, selected: &str) -> Option<AnswerOutcome> {
        let outcome = self.coordinator.submit_answer(selected, &mut self.scheduler)?;
        self.apply_answer(outcome);
        Some(outcome)
    }

    /// Open a chest as if the player touched it. Returns whether it opened.
    pub fn activate_chest(&mut self, chest: EntityId) -> bool {
        let Some(state) = self.world.get_mut::<MathChest>(chest) else {
            return false;
        };
        if !state.activate() {
            log::debug!("Chest {} is cooling down", chest.to_u32());
            return false;
        }
        let cooldown = state.cooldown();

        animation::set_trigger(&mut self.world, chest, cues::OPEN);
        let question_requested = self.coordinator.request_question();
        self.scheduler.schedule(
            TimerOwner::Entity(chest),
            Clock::Scaled,
            cooldown,
            TimerEvent::ChestReopen,
        );
        log::info!("Chest {} opened", chest.to_u32());
        self.events.push(GameEvent::ChestOpened {
            chest,
            question_requested,
        });
        true
    }

    /// Spawn an enemy registered with the level's spawner.
    ///
    /// Returns `None` when the spawner is at its cap.
    pub fn spawn_enemy(&mut self, position: Vec2) -> Result<Option<EntityId>> {
        let spawner_id = self.level.spawner;
        match self.world.get::<Spawner>(spawner_id) {
            Some(spawner) if spawner.is_full() => return Ok(None),
            _ => {}
        }

        let enemy = spawn_enemy(
            &mut self.world,
            &mut self.physics,
            &self.config.enemy,
            position,
            Some(spawner_id),
        )?;
        if let Some(spawner) = self.world.get_mut::<Spawner>(spawner_id) {
            spawner.register_enemy();
        }
        self.events.push(GameEvent::EnemySpawned { enemy, position });
        Ok(Some(enemy))
    }

    /// Reload the level under the running coordinator.
    ///
    /// Everything the level owns (entities, bodies, timers, ammunition) is
    /// rebuilt. The coordinator's run state is not reset; see
    /// [`Coordinator::on_scene_reloaded`].
    pub fn restart(&mut self) -> Result<()> {
        self.world.clear();
        self.physics.clear();
        self.scheduler.clear();
        self.fixed_time_accumulator = 0.0;

        self.level = self.layout.build(&mut self.world, &mut self.physics, &self.config)?;
        self.parallax = self.level.parallax.clone();
        self.camera = CameraFollow::new(self.config.camera.offset).follow_entity(self.level.player);

        self.coordinator.on_scene_reloaded();
        self.coordinator.update_bullet_count(self.player_ammo());
        self.schedule_spawner_wake();
        self.update_camera();

        log::info!("Level reloaded");
        self.events.push(GameEvent::Restarted);
        Ok(())
    }

    /// Reload the level and reset the run.
    pub fn new_run(&mut self) -> Result<()> {
        self.restart()?;
        self.coordinator.initialize();
        Ok(())
    }

    /// Events since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn coordinator(&self) -> &Coordinator<U> {
        &self.coordinator
    }

    pub fn hud(&self) -> &U {
        self.coordinator.hud()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn camera(&self) -> &CameraFollow {
        &self.camera
    }

    pub fn parallax(&self) -> &[ParallaxLayer] {
        &self.parallax
    }

    pub fn player(&self) -> EntityId {
        self.level.player
    }

    pub fn player_position(&self) -> Option<Vec2> {
        self.physics.body_position(self.level.player)
    }

    pub fn player_controller(&self) -> Option<&PlayerController> {
        self.world.get::<PlayerController>(self.level.player)
    }

    pub fn player_ammo(&self) -> u32 {
        self.player_controller().map_or(0, PlayerController::ammo)
    }

    pub fn spawner(&self) -> Option<&Spawner> {
        self.world.get::<Spawner>(self.level.spawner)
    }

    pub fn chests(&self) -> &[EntityId] {
        &self.level.chests
    }

    pub fn chest(&self, id: EntityId) -> Option<&MathChest> {
        self.world.get::<MathChest>(id)
    }

    pub fn enemies(&self) -> Vec<EntityId> {
        self.world.with_tag(Tag::Enemy)
    }

    pub fn enemy(&self, id: EntityId) -> Option<&Enemy> {
        self.world.get::<Enemy>(id)
    }

    fn dispatch_timer(&mut self, timer: FiredTimer) -> Result<()> {
        match (timer.owner, timer.event) {
            (TimerOwner::QuestionPanel, TimerEvent::QuestionTimeout) => {
                if self.coordinator.on_question_timeout(&mut self.scheduler) {
                    self.events.push(GameEvent::QuestionTimedOut);
                }
            }
            (TimerOwner::Entity(id), TimerEvent::SpawnerWake(step)) => self.spawner_wake(id, step)?,
            (TimerOwner::Entity(id), TimerEvent::ChestReopen) => self.reopen_chest(id),
            (TimerOwner::Entity(id), TimerEvent::EnemyStrike) => self.enemy_strike(id),
            (TimerOwner::Entity(id), TimerEvent::EnemyRemove) => {
                if self.despawn(id) {
                    self.events.push(GameEvent::EnemyRemoved { enemy: id });
                }
            }
            (TimerOwner::Entity(id), TimerEvent::ProjectileExpire) => {
                if self.despawn(id) {
                    self.events.push(GameEvent::BulletDestroyed { bullet: id });
                }
            }
            (owner, event) => log::warn!("Timer {:?} fired for unexpected owner {:?}", event, owner),
        }
        Ok(())
    }

    fn schedule_spawner_wake(&mut self) {
        let id = self.level.spawner;
        let Some(spawner) = self.world.get::<Spawner>(id) else {
            return;
        };
        if !spawner.is_active() {
            return;
        }
        let (delay, step) = spawner.plan(&mut self.rng);
        self.scheduler.schedule(
            TimerOwner::Entity(id),
            Clock::Scaled,
            delay,
            TimerEvent::SpawnerWake(step),
        );
    }

    fn spawner_wake(&mut self, id: EntityId, step: SpawnStep) -> Result<()> {
        let Some(spawner) = self.world.get::<Spawner>(id) else {
            return Ok(());
        };
        if !spawner.is_active() {
            return Ok(());
        }
        if step == SpawnStep::Spawn {
            match spawner.pick_point(&mut self.rng) {
                Some(point) => {
                    self.spawn_enemy(point)?;
                }
                None => log::debug!("Spawner {} has no spawn points", id.to_u32()),
            }
        }
        self.schedule_spawner_wake();
        Ok(())
    }

    fn stop_spawner(&mut self) {
        let id = self.level.spawner;
        if let Some(spawner) = self.world.get_mut::<Spawner>(id) {
            spawner.set_active(false);
        }
        self.scheduler.cancel_owner(TimerOwner::Entity(id));
    }

    fn reopen_chest(&mut self, id: EntityId) {
        let Some(chest) = self.world.get_mut::<MathChest>(id) else {
            return;
        };
        if chest.reactivate() {
            animation::set_trigger(&mut self.world, id, cues::CLOSE);
            log::debug!("Chest {} ready again", id.to_u32());
            self.events.push(GameEvent::ChestReopened { chest: id });
        }
    }

    fn enemy_strike(&mut self, id: EntityId) {
        let own = self.physics.body_position(id);
        let player = self.player_position();
        let Some(enemy) = self.world.get_mut::<Enemy>(id) else {
            return;
        };
        let Some(damage) = enemy.finish_attack() else {
            return;
        };
        let in_range = match (own, player) {
            (Some(own), Some(player)) => enemy.in_attack_range(own, player),
            _ => false,
        };
        if in_range {
            self.damage_player(damage);
        }
    }

    fn damage_player(&mut self, amount: u32) {
        match self.coordinator.apply_damage(amount) {
            DamageOutcome::Ignored => {}
            DamageOutcome::Damaged { health } => {
                self.events.push(GameEvent::PlayerDamaged { amount, health });
            }
            DamageOutcome::GameOver { final_score } => {
                self.events.push(GameEvent::PlayerDamaged { amount, health: 0 });
                self.stop_spawner();
                self.events.push(GameEvent::GameOver { final_score });
            }
        }
    }

    fn damage_enemy(&mut self, id: EntityId, amount: u32) {
        let Some(enemy) = self.world.get_mut::<Enemy>(id) else {
            return;
        };
        match enemy.take_damage(amount) {
            DamageResult::Ignored => {}
            DamageResult::Hit => animation::set_trigger(&mut self.world, id, cues::HIT),
            DamageResult::Died => {
                let spawner = enemy.spawner();
                self.physics.remove_body(id);
                self.scheduler.cancel_owner(TimerOwner::Entity(id));
                if let Some(spawner_id) = spawner {
                    if let Some(spawner) = self.world.get_mut::<Spawner>(spawner_id) {
                        spawner.enemy_destroyed();
                    }
                }
                animation::set_bool(&mut self.world, id, cues::IS_MOVING, false);
                animation::set_trigger(&mut self.world, id, cues::DIE);
                self.scheduler.schedule(
                    TimerOwner::Entity(id),
                    Clock::Scaled,
                    self.config.enemy.removal_delay,
                    TimerEvent::EnemyRemove,
                );
                log::debug!("Enemy {} died", id.to_u32());
                self.events.push(GameEvent::EnemyDied { enemy: id });
            }
        }
    }

    fn bullet_contact(&mut self, bullet: EntityId, other: EntityId) {
        if self.world.tag(bullet) != Some(Tag::Bullet) {
            return;
        }
        let other_tag = self.world.tag(other);
        if other_tag == Some(Tag::Enemy) {
            self.damage_enemy(other, 1);
        }
        if destroyed_by_contact(other_tag) && self.despawn(bullet) {
            self.events.push(GameEvent::BulletDestroyed { bullet });
        }
    }

    fn trigger_enter(&mut self, player: EntityId, chest: EntityId) {
        if self.world.tag(player) != Some(Tag::Player) || self.world.tag(chest) != Some(Tag::MathChest) {
            return;
        }
        if let Some(state) = self.world.get_mut::<MathChest>(chest) {
            state.on_proximity_enter();
        }
        self.activate_chest(chest);
    }

    fn trigger_exit(&mut self, player: EntityId, chest: EntityId) {
        if self.world.tag(player) != Some(Tag::Player) {
            return;
        }
        if let Some(state) = self.world.get_mut::<MathChest>(chest) {
            state.on_proximity_exit();
        }
    }

    fn update_player(&mut self, dt: f32) -> Result<()> {
        let id = self.level.player;
        let Some(position) = self.physics.body_position(id) else {
            return Ok(());
        };
        let velocity = self.physics.linear_velocity(id).unwrap_or_default();
        let grounded = probe_ground(&self.physics, &self.config.player, position);

        let Some(controller) = self.world.get_mut::<PlayerController>(id) else {
            return Ok(());
        };
        // Bullets leave from where the player faced when the frame started.
        let muzzle = controller.fire_point(&self.config.player, position);
        let direction = controller.facing_sign();
        let frame = controller.control(&self.config.player, &self.input, grounded, velocity, dt);
        let facing_right = controller.facing_right();
        let ammo_left = controller.ammo();

        self.physics.set_linear_velocity(id, frame.velocity);
        if let Some(transform) = self.world.get_mut::<Transform>(id) {
            transform.flip_x = !facing_right;
        }

        if frame.jumped {
            animation::set_trigger(&mut self.world, id, cues::JUMP);
        }
        if frame.slide_started {
            animation::set_bool(&mut self.world, id, cues::IS_SLIDING, true);
        }
        if frame.slide_ended {
            animation::set_bool(&mut self.world, id, cues::IS_SLIDING, false);
        }
        animation::set_bool(&mut self.world, id, cues::IS_GROUNDED, grounded);
        animation::set_float(&mut self.world, id, cues::SPEED, frame.speed);

        if frame.fired {
            let bullet = spawn_projectile(
                &mut self.world,
                &mut self.physics,
                &mut self.scheduler,
                &self.config.projectile,
                muzzle,
                direction,
            )?;
            self.coordinator.update_bullet_count(ammo_left);
            self.events.push(GameEvent::BulletFired { bullet, ammo_left });
        }
        Ok(())
    }

    fn update_enemies(&mut self) {
        let player = self.player_position();
        for id in self.world.entities_with::<Enemy>() {
            let Some(own) = self.physics.body_position(id) else {
                continue;
            };
            let Some(enemy) = self.world.get_mut::<Enemy>(id) else {
                continue;
            };
            let intent = enemy.think(own, player);
            let starts_attack = intent.attack && enemy.begin_attack();

            self.physics.set_linear_velocity(id, intent.velocity);
            if let (Some(flip_x), Some(transform)) = (intent.flip_x, self.world.get_mut::<Transform>(id)) {
                transform.flip_x = flip_x;
            }
            animation::set_bool(&mut self.world, id, cues::IS_MOVING, intent.moving);

            if starts_attack {
                animation::set_trigger(&mut self.world, id, cues::ATTACK);
                self.scheduler.schedule(
                    TimerOwner::Entity(id),
                    Clock::Scaled,
                    self.config.enemy.attack_windup,
                    TimerEvent::EnemyStrike,
                );
                self.events.push(GameEvent::EnemyAttacked { enemy: id });
            }
        }
    }

    fn apply_answer(&mut self, outcome: AnswerOutcome) {
        self.events.push(GameEvent::AnswerSubmitted {
            correct: outcome.correct,
            bullets_awarded: outcome.bullets_awarded,
        });

        if outcome.bullets_awarded > 0 {
            let player = self.level.player;
            if let Some(controller) = self.world.get_mut::<PlayerController>(player) {
                let total = controller.add_bullets(outcome.bullets_awarded);
                self.coordinator.update_bullet_count(total);
            }
        }

        if let Some(level_up) = outcome.level_up {
            if let Some(spawner) = self.world.get_mut::<Spawner>(self.level.spawner) {
                spawner.adjust_spawn_rate(level_up.spawn_rate_multiplier);
            }
            self.events.push(GameEvent::LevelUp {
                level: level_up.level,
                spawn_rate_multiplier: level_up.spawn_rate_multiplier,
            });
        }
    }

    fn collect_cues(&mut self) {
        for id in self.world.entities_with::<Animator>() {
            if let Some(animator) = self.world.get_mut::<Animator>(id) {
                for cue in animator.drain_triggers() {
                    self.events.push(GameEvent::AnimationCue { entity: id, cue });
                }
            }
        }
    }

    /// Bullets fly straight; a brush against the player must not bend them.
    fn update_projectiles(&mut self) {
        for id in self.world.entities_with::<Projectile>() {
            if let Some(projectile) = self.world.get::<Projectile>(id) {
                self.physics.set_linear_velocity(id, projectile.velocity);
            }
        }
    }

    fn sync_transforms(&mut self) {
        for id in self.physics.entities_with_bodies() {
            if let (Some(position), Some(transform)) =
                (self.physics.body_position(id), self.world.get_mut::<Transform>(id))
            {
                transform.position = position;
            }
        }
    }

    fn update_camera(&mut self) {
        self.camera.update(self.player_position());
        let camera_x = self.camera.position.x;
        for layer in &mut self.parallax {
            layer.update(camera_x);
        }
    }

    /// Remove an entity, its body and its timers. Returns whether it was alive.
    fn despawn(&mut self, id: EntityId) -> bool {
        self.physics.remove_body(id);
        self.scheduler.cancel_owner(TimerOwner::Entity(id));
        let removed = self.world.despawn(id);
        if removed {
            log::debug!("Despawned entity {}", id.to_u32());
        }
        removed
    }
}
