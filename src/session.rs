//! Gameplay state machine
//!
//! A [`GameSession`] owns one run at a time: the player, the obstacle pool,
//! the difficulty curve and the current lane set. The host calls
//! [`GameSession::update`] once per frame; everything inside a tick is
//! synchronous. The only async work (score save, presence, high score fetch)
//! is handed to a [`TaskSpawner`] and tagged with the run's generation so a
//! late completion can never touch a newer run.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{SessionError, TickError};
use crate::persistence::{SaveOutcome, ScoreGateway, TaskSpawner};
use crate::presentation::PresentationSink;
use crate::settings::Settings;
use crate::sim::collision;
use crate::sim::{
    DifficultyState, LaneLevel, LaneSet, Notification, NotificationTimers, Obstacle, ObstaclePool,
    Player, lanes_for_level, next_level,
};

/// Run phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Running,
    GameOver,
}

/// Discrete player intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    MoveLeft,
    MoveRight,
    /// Only honoured after game over
    Restart,
}

/// What a call to [`GameSession::update`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Run is over; nothing simulated
    Idle,
    Advanced,
    /// This tick ended the run
    GameOver { final_score: u64 },
}

/// State shared with in-flight async completions
#[derive(Debug, Default)]
struct RunTracker {
    generation: Cell<u64>,
    /// Generation whose score save has not completed yet
    save_in_flight: Cell<Option<u64>>,
    /// Best score the backend is known to hold for this identity
    stored_high_score: Cell<u64>,
    /// High score to beat for the current run
    baseline: Cell<u64>,
}

impl RunTracker {
    /// Start a new generation and return it
    fn begin_run(&self, local_best: u64) -> u64 {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.baseline.set(self.stored_high_score.get().max(local_best));
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.get() == generation
    }

    fn record_stored(&self, score: u64) {
        if score > self.stored_high_score.get() {
            self.stored_high_score.set(score);
        }
    }

    /// Apply a fetched high score to the run that asked for it
    fn raise_baseline(&self, generation: u64, score: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        if score > self.baseline.get() {
            self.baseline.set(score);
        }
        true
    }

    /// Clear the in-flight slot if it still belongs to `generation`
    fn finish_save(&self, generation: u64) {
        if self.save_in_flight.get() == Some(generation) {
            self.save_in_flight.set(None);
        }
    }
}

/// Read-only view of a session, for HUDs and debugging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub phase: Phase,
    pub score: u64,
    pub lane_level: LaneLevel,
    pub lane_count: usize,
    pub player: Player,
    pub obstacles: Vec<Obstacle>,
    pub difficulty: DifficultyState,
    pub time_since_last_spawn: f32,
    pub last_milestone: u64,
    pub high_score_notified: bool,
    pub high_score_baseline: u64,
    pub elapsed: f32,
}

/// Builder for [`GameSession`]; every collaborator is required
#[derive(Default)]
pub struct SessionBuilder {
    identity: Option<String>,
    sink: Option<Box<dyn PresentationSink>>,
    gateway: Option<Rc<dyn ScoreGateway>>,
    spawner: Option<Rc<dyn TaskSpawner>>,
    settings: Settings,
    seed: u64,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Player identity; overrides the name in settings
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn sink(mut self, sink: impl PresentationSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn gateway(mut self, gateway: impl ScoreGateway + 'static) -> Self {
        self.gateway = Some(Rc::new(gateway));
        self
    }

    pub fn spawner(mut self, spawner: impl TaskSpawner + 'static) -> Self {
        self.spawner = Some(Rc::new(spawner));
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Base RNG seed; each run uses `seed + generation`
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate wiring and start the first run
    pub fn build(self) -> Result<GameSession, SessionError> {
        let sink = self.sink.ok_or(SessionError::MissingSink)?;
        let gateway = self.gateway.ok_or(SessionError::MissingGateway)?;
        let spawner = self.spawner.ok_or(SessionError::MissingSpawner)?;
        let raw = self
            .identity
            .unwrap_or_else(|| self.settings.player_name.clone());
        let identity = raw.trim();
        if identity.is_empty() {
            return Err(SessionError::InvalidIdentity { identity: raw });
        }

        let lanes = lanes_for_level(LaneLevel::Three);
        let mut session = GameSession {
            identity: identity.to_string(),
            sink,
            gateway,
            spawner,
            tracker: Rc::new(RunTracker::default()),
            seed: self.seed,
            high_score_banner_secs: self.settings.high_score_banner_secs,
            milestone_banner_secs: self.settings.milestone_banner_secs,
            phase: Phase::Running,
            score: 0,
            local_best: 0,
            lanes,
            player: Player::new(lanes),
            pool: ObstaclePool::new(lanes, self.seed),
            difficulty: DifficultyState::default(),
            time_since_last_spawn: 0.0,
            last_milestone: 0,
            high_score_notified: false,
            banners: NotificationTimers::new(),
            elapsed: 0.0,
        };
        session.begin_run();
        log::info!("Session started for {}", session.identity);
        Ok(session)
    }
}

/// The running game
pub struct GameSession {
    identity: String,
    sink: Box<dyn PresentationSink>,
    gateway: Rc<dyn ScoreGateway>,
    spawner: Rc<dyn TaskSpawner>,
    tracker: Rc<RunTracker>,
    seed: u64,
    high_score_banner_secs: f32,
    milestone_banner_secs: f32,

    phase: Phase,
    score: u64,
    /// Best final score of any run in this session
    local_best: u64,
    lanes: LaneSet,
    player: Player,
    pool: ObstaclePool,
    difficulty: DifficultyState,
    time_since_last_spawn: f32,
    last_milestone: u64,
    high_score_notified: bool,
    banners: NotificationTimers,
    /// Seconds of active play this run
    elapsed: f32,
}

impl GameSession {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn lane_level(&self) -> LaneLevel {
        self.lanes.level()
    }

    pub fn lanes(&self) -> LaneSet {
        self.lanes
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn pool(&self) -> &ObstaclePool {
        &self.pool
    }

    #[cfg(test)]
    pub(crate) fn pool_mut(&mut self) -> &mut ObstaclePool {
        &mut self.pool
    }

    pub fn difficulty(&self) -> DifficultyState {
        self.difficulty
    }

    pub fn generation(&self) -> u64 {
        self.tracker.generation.get()
    }

    pub fn save_in_flight(&self) -> bool {
        self.tracker.save_in_flight.get().is_some()
    }

    /// Score this run has to beat for the high score banner
    pub fn high_score_baseline(&self) -> u64 {
        self.tracker.baseline.get()
    }

    pub fn stored_high_score(&self) -> u64 {
        self.tracker.stored_high_score.get()
    }

    pub fn banner_visible(&self, kind: Notification) -> bool {
        self.banners.is_visible(kind)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            generation: self.generation(),
            phase: self.phase,
            score: self.score,
            lane_level: self.lanes.level(),
            lane_count: self.lanes.len(),
            player: self.player.clone(),
            obstacles: self.pool.active().to_vec(),
            difficulty: self.difficulty,
            time_since_last_spawn: self.time_since_last_spawn,
            last_milestone: self.last_milestone,
            high_score_notified: self.high_score_notified,
            high_score_baseline: self.high_score_baseline(),
            elapsed: self.elapsed,
        }
    }

    /// Apply a player intent. Returns whether anything happened.
    pub fn handle_intent(&mut self, intent: Intent) -> bool {
        match (intent, self.phase) {
            (Intent::MoveLeft, Phase::Running) => self.player.move_left(),
            (Intent::MoveRight, Phase::Running) => self.player.move_right(),
            (Intent::Restart, Phase::GameOver) => {
                self.reset();
                true
            }
            _ => false,
        }
    }

    /// Advance the run by `dt` seconds
    ///
    /// Order within a tick: lane expansion, player, difficulty, obstacles,
    /// spawn, collision, score, banners. A collision ends the tick before any
    /// score is added. Obstacle motion and scoring use the speed in effect at
    /// the start of the tick.
    pub fn update(&mut self, dt: f32) -> Result<TickOutcome, TickError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(TickError::InvalidDelta { dt });
        }
        if self.phase == Phase::GameOver {
            return Ok(TickOutcome::Idle);
        }

        self.apply_lane_expansion()?;

        self.player.tick(dt);

        let frame_speed = self.difficulty.speed;
        self.difficulty = self.difficulty.advance(dt);

        self.pool.tick(dt, frame_speed);

        self.time_since_last_spawn += dt;
        if self.time_since_last_spawn >= self.difficulty.spawn_interval {
            self.pool.spawn();
            self.time_since_last_spawn = 0.0;
        }

        if collision::check(&self.player, self.pool.active()) {
            self.end_run();
            return Ok(TickOutcome::GameOver {
                final_score: self.score,
            });
        }

        self.score += (dt * frame_speed).round() as u64;
        self.elapsed += dt;
        self.sink.on_score_changed(self.score);

        for kind in self.banners.tick(dt) {
            self.sink.on_notification_dismissed(kind);
        }
        self.check_high_score();
        self.check_milestone();

        Ok(TickOutcome::Advanced)
    }

    /// Throw away the current run and start a fresh one
    pub fn reset(&mut self) {
        self.begin_run();
        self.sink.on_reset();
        log::info!("Run {} started", self.generation());
    }

    /// Mark the player as no longer playing (page unload, quit)
    pub fn leave(&self) {
        self.dispatch_presence(false);
    }

    fn begin_run(&mut self) {
        let generation = self.tracker.begin_run(self.local_best);
        self.lanes = lanes_for_level(LaneLevel::Three);
        self.player.reset(self.lanes);
        self.pool.reset(self.lanes, self.seed.wrapping_add(generation));
        self.difficulty = DifficultyState::default();
        self.phase = Phase::Running;
        self.score = 0;
        self.elapsed = 0.0;
        // First obstacle arrives on the first tick
        self.time_since_last_spawn = self.difficulty.spawn_interval;
        self.last_milestone = 0;
        self.high_score_notified = false;
        self.banners.cancel_all();

        self.dispatch_baseline_fetch(generation);
        self.dispatch_presence(true);
    }

    fn apply_lane_expansion(&mut self) -> Result<(), TickError> {
        let current = self.lanes.level();
        let target = next_level(current, self.score);
        if target != current {
            // Assign first, then hand the same set to both consumers
            self.lanes = lanes_for_level(target);
            self.player.update_lanes(self.lanes);
            self.pool.update_lanes(self.lanes);
            log::info!(
                "Score {} reached, expanding to {} lanes",
                self.score,
                self.lanes.len()
            );
            self.sink.on_lane_expansion(self.lanes.len());
        }

        if self.player.lanes() != self.pool.lanes() {
            return Err(TickError::LaneDesync {
                player_lanes: self.player.lanes().len(),
                pool_lanes: self.pool.lanes().len(),
            });
        }
        Ok(())
    }

    fn check_high_score(&mut self) {
        let baseline = self.tracker.baseline.get();
        if !self.high_score_notified && baseline > 0 && self.score > baseline {
            self.high_score_notified = true;
            log::info!("New high score: {} beats {}", self.score, baseline);
            self.sink.on_high_score_achieved();
            self.banners
                .show(Notification::HighScore, self.high_score_banner_secs);
        }
    }

    fn check_milestone(&mut self) {
        let reached = self.score / MILESTONE_STEP;
        if reached > self.last_milestone {
            self.last_milestone = reached;
            self.sink.on_milestone_reached(reached * MILESTONE_STEP);
            self.banners
                .show(Notification::Milestone, self.milestone_banner_secs);
        }
    }

    fn end_run(&mut self) {
        self.phase = Phase::GameOver;
        self.banners.cancel_all();
        self.local_best = self.local_best.max(self.score);
        log::info!(
            "Game over: run {} scored {} after {:.1}s",
            self.generation(),
            self.score,
            self.elapsed
        );
        self.sink.on_game_over(self.score);
        self.dispatch_save();
        self.dispatch_presence(false);
    }

    /// Save this run's score, at most once per run
    ///
    /// The in-flight slot is keyed by generation, so a new run may save while
    /// an older run's save is still pending. Each completion clears the slot
    /// only if it still owns it.
    fn dispatch_save(&self) {
        let generation = self.generation();
        if self.tracker.save_in_flight.get() == Some(generation) {
            log::warn!("Score save for run {} already in flight", generation);
            return;
        }
        let score = self.score;
        if score == 0 {
            log::debug!("Nothing to save for run {}", generation);
            return;
        }

        self.tracker.save_in_flight.set(Some(generation));
        let tracker = self.tracker.clone();
        let save = self.gateway.save_score_if_higher(&self.identity, score);
        self.spawner.spawn_local(Box::pin(async move {
            match save.await {
                Ok(SaveOutcome::Written) => {
                    log::info!("Score {} saved", score);
                    tracker.record_stored(score);
                }
                Ok(SaveOutcome::Unchanged { stored }) => {
                    log::info!("Score {} not above stored {}, kept", score, stored);
                    tracker.record_stored(stored);
                }
                Err(e) => log::warn!("Could not save score {}: {}", score, e),
            }
            tracker.finish_save(generation);
        }));
    }

    fn dispatch_baseline_fetch(&self, generation: u64) {
        let tracker = self.tracker.clone();
        let fetch = self.gateway.high_score(&self.identity);
        self.spawner.spawn_local(Box::pin(async move {
            match fetch.await {
                Ok(score) => {
                    tracker.record_stored(score);
                    if !tracker.raise_baseline(generation, score) {
                        log::debug!("Dropping high score fetch for stale run {}", generation);
                    }
                }
                Err(e) => log::warn!("Could not fetch high score, assuming 0: {}", e),
            }
        }));
    }

    fn dispatch_presence(&self, active: bool) {
        let update = self.gateway.set_presence(&self.identity, active);
        self.spawner.spawn_local(Box::pin(async move {
            if let Err(e) = update.await {
                log::warn!("Could not set presence to {}: {}", active, e);
            }
        }));
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("identity", &self.identity)
            .field("generation", &self.generation())
            .field("phase", &self.phase)
            .field("score", &self.score)
            .field("lane_level", &self.lanes.level())
            .field("obstacles", &self.pool.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{InMemoryGateway, LocalFuture};
    use crate::presentation::{EventLog, SessionEvent};
    use futures::executor::{LocalPool, LocalSpawner};
    use glam::Vec2;
    use proptest::prelude::*;
    use std::cell::RefCell;

    /// Pool spawner that counts what it was handed
    struct CountingSpawner {
        inner: LocalSpawner,
        spawned: Rc<Cell<usize>>,
    }

    impl TaskSpawner for CountingSpawner {
        fn spawn_local(&self, task: LocalFuture<()>) {
            self.spawned.set(self.spawned.get() + 1);
            TaskSpawner::spawn_local(&self.inner, task);
        }
    }

    struct Rig {
        pool: RefCell<LocalPool>,
        spawned: Rc<Cell<usize>>,
        gateway: InMemoryGateway,
        log: EventLog,
    }

    impl Rig {
        fn new() -> Self {
            Self::with_gateway(InMemoryGateway::new())
        }

        fn with_gateway(gateway: InMemoryGateway) -> Self {
            Self {
                pool: RefCell::new(LocalPool::new()),
                spawned: Rc::new(Cell::new(0)),
                gateway,
                log: EventLog::new(),
            }
        }

        fn spawner(&self) -> CountingSpawner {
            CountingSpawner {
                inner: self.pool.borrow().spawner(),
                spawned: self.spawned.clone(),
            }
        }

        /// Tasks handed to the spawner so far
        fn spawned(&self) -> usize {
            self.spawned.get()
        }

        /// Run background work until nothing can progress
        fn drain(&self) {
            self.pool.borrow_mut().run_until_stalled();
        }

        fn build(&self) -> GameSession {
            GameSession::builder()
                .identity("ada")
                .sink(self.log.clone())
                .gateway(self.gateway.clone())
                .spawner(self.spawner())
                .seed(7)
                .build()
                .unwrap()
        }

        /// Build and let the start-of-run requests land
        fn start(&self) -> GameSession {
            let session = self.build();
            self.drain();
            session
        }
    }

    /// Put an obstacle right on top of the player
    fn block_player(session: &mut GameSession) {
        let x = session.player.current_x;
        session.pool.push(Obstacle::at(Vec2::new(x, PLAYER_Z), 0.7));
    }

    /// Remove every obstacle so long scripted runs cannot crash
    fn clear_track(session: &mut GameSession) {
        session.pool.reset(session.lanes, 0);
    }

    fn crash_at(session: &mut GameSession, score: u64) -> TickOutcome {
        session.score = score;
        block_player(session);
        session.update(0.0).unwrap()
    }

    #[test]
    fn test_first_second_of_play() {
        let rig = Rig::new();
        let mut session = rig.start();

        assert_eq!(session.update(1.0), Ok(TickOutcome::Advanced));
        assert_eq!(session.score(), 30);
        assert_eq!(session.difficulty().speed, 31.0);
        assert!((session.difficulty().spawn_interval - 0.685).abs() < 1e-5);
        assert_eq!(session.pool().len(), 1);
        assert_eq!(session.pool().active()[0].z(), OBSTACLE_SPAWN_Z);
        assert_eq!(rig.log.snapshot(), vec![SessionEvent::ScoreChanged(30)]);
    }

    #[test]
    fn test_expansion_keeps_player_lane() {
        let rig = Rig::new();
        let mut session = rig.start();
        assert_eq!(session.player().lane_index(), 1);

        session.score = 700;
        session.update(0.0).unwrap();

        assert_eq!(session.lane_level(), LaneLevel::Five);
        assert_eq!(session.player().lanes().len(), 5);
        assert_eq!(session.pool().lanes().len(), 5);
        assert_eq!(session.player().lane_index(), 2);
        assert_eq!(session.player().target_x(), 0.0);
        assert_eq!(rig.log.count(|e| *e == SessionEvent::LaneExpansion(5)), 1);

        // A second tick at the same score does nothing new
        session.update(0.0).unwrap();
        assert_eq!(rig.log.count(|e| matches!(e, SessionEvent::LaneExpansion(_))), 1);
    }

    #[test]
    fn test_expansion_from_left_lane() {
        let rig = Rig::new();
        let mut session = rig.start();
        assert!(session.handle_intent(Intent::MoveLeft));
        let before = session.player().current_x;

        session.score = 700;
        session.update(0.0).unwrap();

        assert_eq!(session.player().lane_index(), 1);
        let target = session.player().target_x();
        assert_eq!(target, -LANE_WIDTH);
        // Expansion never teleports: one ease step from where the player was
        let eased = before + (target - before) * LANE_APPROACH_FACTOR;
        assert!((session.player().current_x - eased).abs() < 1e-6);
        assert_ne!(session.player().current_x, target);
    }

    #[test]
    fn test_large_score_jumps_straight_to_widest() {
        let rig = Rig::new();
        let mut session = rig.start();
        session.score = 5000;
        session.update(0.0).unwrap();
        assert_eq!(session.lane_level(), LaneLevel::Nine);
        assert_eq!(
            rig.log.count(|e| matches!(e, SessionEvent::LaneExpansion(_))),
            1
        );
        assert_eq!(rig.log.count(|e| *e == SessionEvent::LaneExpansion(9)), 1);
    }

    #[test]
    fn test_collision_ends_run_without_scoring() {
        let rig = Rig::new();
        let mut session = rig.start();
        session.update(0.5).unwrap();
        let score = session.score();

        // Lands on the player after this tick's movement
        let x = session.player.current_x;
        session.pool.push(Obstacle::at(Vec2::new(x, -1.5), 0.7));
        assert_eq!(
            session.update(0.05),
            Ok(TickOutcome::GameOver { final_score: score })
        );
        assert!(session.is_game_over());
        assert_eq!(session.score(), score);
        assert_eq!(rig.log.count(|e| *e == SessionEvent::GameOver(score)), 1);

        // Game over freezes everything
        assert_eq!(session.update(1.0), Ok(TickOutcome::Idle));
        assert_eq!(session.score(), score);
        assert!(!session.handle_intent(Intent::MoveLeft));
        assert!(!session.handle_intent(Intent::MoveRight));
    }

    #[test]
    fn test_lower_score_does_not_overwrite() {
        let rig = Rig::with_gateway(InMemoryGateway::new().with_score("ada", 1000));
        let mut session = rig.start();
        assert_eq!(session.high_score_baseline(), 1000);

        assert_eq!(
            crash_at(&mut session, 500),
            TickOutcome::GameOver { final_score: 500 }
        );
        assert!(session.save_in_flight());
        rig.drain();

        assert!(!session.save_in_flight());
        assert_eq!(rig.gateway.score_writes(), 0);
        assert_eq!(rig.gateway.stored_score("ada"), 1000);
        assert_eq!(rig.log.count(|e| *e == SessionEvent::HighScoreAchieved), 0);
    }

    #[test]
    fn test_higher_score_is_saved() {
        let rig = Rig::with_gateway(InMemoryGateway::new().with_score("ada", 300));
        let mut session = rig.start();

        crash_at(&mut session, 500);
        rig.drain();

        assert_eq!(rig.gateway.score_writes(), 1);
        assert_eq!(rig.gateway.stored_score("ada"), 500);
        assert_eq!(session.stored_high_score(), 500);
    }

    #[test]
    fn test_presence_follows_run() {
        let rig = Rig::new();
        let mut session = rig.start();
        assert!(rig.gateway.is_active("ada"));

        crash_at(&mut session, 10);
        rig.drain();
        assert!(!rig.gateway.is_active("ada"));

        assert!(session.handle_intent(Intent::Restart));
        rig.drain();
        assert!(rig.gateway.is_active("ada"));

        session.leave();
        rig.drain();
        assert!(!rig.gateway.is_active("ada"));
    }

    #[test]
    fn test_duplicate_save_is_not_dispatched() {
        let rig = Rig::new();
        let mut session = rig.start();
        crash_at(&mut session, 500);

        let spawned = rig.spawned();
        session.dispatch_save();
        assert_eq!(rig.spawned(), spawned);

        rig.drain();
        assert_eq!(rig.gateway.score_writes(), 1);
    }

    #[test]
    fn test_zero_score_is_not_saved() {
        let rig = Rig::new();
        let mut session = rig.start();
        crash_at(&mut session, 0);
        assert!(!session.save_in_flight());
    }

    #[test]
    fn test_stale_save_does_not_clear_newer_run() {
        let rig = Rig::new();
        let mut session = rig.start();

        crash_at(&mut session, 500);
        session.reset();
        // Old run's save is still pending
        assert!(session.save_in_flight());
        assert_eq!(session.score(), 0);

        crash_at(&mut session, 800);
        assert_eq!(session.tracker.save_in_flight.get(), Some(session.generation()));

        rig.drain();
        assert!(!session.save_in_flight());
        assert_eq!(rig.gateway.score_writes(), 2);
        assert_eq!(rig.gateway.stored_score("ada"), 800);
    }

    #[test]
    fn test_tracker_ignores_stale_generations() {
        let tracker = RunTracker::default();
        let first = tracker.begin_run(0);
        tracker.save_in_flight.set(Some(first));
        let second = tracker.begin_run(0);

        assert!(!tracker.raise_baseline(first, 5000));
        assert_eq!(tracker.baseline.get(), 0);
        assert!(tracker.raise_baseline(second, 40));
        assert_eq!(tracker.baseline.get(), 40);

        tracker.save_in_flight.set(Some(second));
        tracker.finish_save(first);
        assert_eq!(tracker.save_in_flight.get(), Some(second));
        tracker.finish_save(second);
        assert_eq!(tracker.save_in_flight.get(), None);

        // Stored score only moves up
        tracker.record_stored(90);
        tracker.record_stored(10);
        assert_eq!(tracker.stored_high_score.get(), 90);
    }

    #[test]
    fn test_baseline_includes_session_best() {
        let rig = Rig::new();
        let mut session = rig.start();
        crash_at(&mut session, 400);
        // Save still pending when the next run starts
        session.reset();
        assert_eq!(session.high_score_baseline(), 400);
    }

    #[test]
    fn test_high_score_banner_once_per_run() {
        let rig = Rig::with_gateway(InMemoryGateway::new().with_score("ada", 100));
        let mut session = rig.start();

        session.score = 90;
        session.update(1.0).unwrap();
        assert_eq!(rig.log.count(|e| *e == SessionEvent::HighScoreAchieved), 1);
        assert!(session.banner_visible(Notification::HighScore));

        clear_track(&mut session);
        session.update(1.0).unwrap();
        assert_eq!(rig.log.count(|e| *e == SessionEvent::HighScoreAchieved), 1);
    }

    #[test]
    fn test_no_high_score_banner_without_prior_score() {
        let rig = Rig::new();
        let mut session = rig.start();
        session.score = 90;
        session.update(1.0).unwrap();
        assert_eq!(rig.log.count(|e| *e == SessionEvent::HighScoreAchieved), 0);
    }

    #[test]
    fn test_milestones_fire_once_and_dismiss() {
        let rig = Rig::new();
        let mut session = rig.start();

        session.score = 999;
        session.update(0.1).unwrap();
        assert_eq!(rig.log.count(|e| *e == SessionEvent::MilestoneReached(1000)), 1);
        assert!(session.banner_visible(Notification::Milestone));

        for _ in 0..5 {
            clear_track(&mut session);
            session.update(0.5).unwrap();
        }
        assert_eq!(rig.log.count(|e| matches!(e, SessionEvent::MilestoneReached(_))), 1);
        assert_eq!(
            rig.log
                .count(|e| *e == SessionEvent::NotificationDismissed(Notification::Milestone)),
            1
        );
        assert!(!session.banner_visible(Notification::Milestone));
    }

    #[test]
    fn test_reset_cancels_banners() {
        let rig = Rig::new();
        let mut session = rig.start();
        session.score = 999;
        session.update(0.1).unwrap();
        assert!(session.banner_visible(Notification::Milestone));

        session.reset();
        assert!(!session.banner_visible(Notification::Milestone));
        rig.log.clear();
        for _ in 0..30 {
            session.update(0.1).unwrap();
        }
        assert_eq!(
            rig.log
                .count(|e| matches!(e, SessionEvent::NotificationDismissed(_))),
            0
        );
    }

    #[test]
    fn test_game_over_cancels_banners() {
        let rig = Rig::new();
        let mut session = rig.start();
        session.score = 999;
        session.update(0.1).unwrap();
        assert!(session.banner_visible(Notification::Milestone));

        let score = session.score();
        assert_eq!(
            crash_at(&mut session, score),
            TickOutcome::GameOver { final_score: score }
        );
        assert!(!session.banner_visible(Notification::Milestone));

        rig.log.clear();
        for _ in 0..30 {
            session.update(0.1).unwrap();
        }
        assert_eq!(
            rig.log
                .count(|e| matches!(e, SessionEvent::NotificationDismissed(_))),
            0
        );
    }

    #[test]
    fn test_reset_is_idempotent() {
        let rig = Rig::new();
        let mut session = rig.start();
        session.score = 1300;
        session.update(0.3).unwrap();
        session.handle_intent(Intent::MoveRight);

        session.reset();
        let first = session.snapshot();
        session.reset();
        let second = session.snapshot();

        assert_eq!(second.generation, first.generation + 1);
        for snap in [&first, &second] {
            assert_eq!(snap.phase, Phase::Running);
            assert_eq!(snap.score, 0);
            assert_eq!(snap.lane_level, LaneLevel::Three);
            assert_eq!(snap.player.lane_index(), 1);
            assert!(snap.obstacles.is_empty());
            assert_eq!(snap.difficulty, DifficultyState::default());
            assert_eq!(snap.time_since_last_spawn, SPAWN_INTERVAL_INITIAL);
            assert_eq!(snap.last_milestone, 0);
            assert!(!snap.high_score_notified);
        }
        assert_eq!(rig.log.count(|e| *e == SessionEvent::Reset), 2);
    }

    #[test]
    fn test_restart_ignored_while_running() {
        let rig = Rig::new();
        let mut session = rig.start();
        let generation = session.generation();
        assert!(!session.handle_intent(Intent::Restart));
        assert_eq!(session.generation(), generation);
    }

    #[test]
    fn test_invalid_delta_is_rejected() {
        let rig = Rig::new();
        let mut session = rig.start();
        assert!(matches!(
            session.update(f32::NAN),
            Err(TickError::InvalidDelta { .. })
        ));
        assert_eq!(
            session.update(-0.5),
            Err(TickError::InvalidDelta { dt: -0.5 })
        );
        assert!(session.update(f32::INFINITY).is_err());
        assert_eq!(session.score(), 0);
        assert!(session.pool().is_empty());
    }

    #[test]
    fn test_lane_desync_is_reported() {
        let rig = Rig::new();
        let mut session = rig.start();
        session.pool.update_lanes(lanes_for_level(LaneLevel::Seven));
        assert_eq!(
            session.update(0.1),
            Err(TickError::LaneDesync {
                player_lanes: 3,
                pool_lanes: 7
            })
        );
    }

    #[test]
    fn test_offline_backend_does_not_stop_play() {
        let gateway = InMemoryGateway::new().with_score("ada", 50);
        gateway.set_offline(true);
        let rig = Rig::with_gateway(gateway);
        let mut session = rig.start();
        assert_eq!(session.high_score_baseline(), 0);

        session.update(0.2).unwrap();
        crash_at(&mut session, 500);
        rig.drain();
        assert!(!session.save_in_flight());
        assert_eq!(rig.gateway.stored_score("ada"), 50);
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let log = EventLog::new();
        let gateway = InMemoryGateway::new();
        let pool = LocalPool::new();

        assert_eq!(
            GameSession::builder().identity("ada").build().err(),
            Some(SessionError::MissingSink)
        );
        assert_eq!(
            GameSession::builder()
                .identity("ada")
                .sink(log.clone())
                .build()
                .err(),
            Some(SessionError::MissingGateway)
        );
        assert_eq!(
            GameSession::builder()
                .identity("ada")
                .sink(log.clone())
                .gateway(gateway.clone())
                .build()
                .err(),
            Some(SessionError::MissingSpawner)
        );
        assert!(matches!(
            GameSession::builder()
                .identity("   ")
                .sink(log.clone())
                .gateway(gateway.clone())
                .spawner(pool.spawner())
                .build(),
            Err(SessionError::InvalidIdentity { .. })
        ));
    }

    #[test]
    fn test_identity_from_settings() {
        let rig = Rig::new();
        let settings = Settings {
            player_name: " grace ".to_string(),
            ..Default::default()
        };
        let session = GameSession::builder()
            .settings(settings)
            .sink(rig.log.clone())
            .gateway(rig.gateway.clone())
            .spawner(rig.spawner())
            .build()
            .unwrap();
        assert_eq!(session.identity(), "grace");
    }

    #[test]
    fn test_snapshot_serializes() {
        let rig = Rig::new();
        let mut session = rig.start();
        session.update(0.5).unwrap();
        let json = serde_json::to_string(&session.snapshot()).unwrap();
        let back: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.score, session.score());
        assert_eq!(back.obstacles.len(), session.pool().len());
    }

    proptest! {
        #[test]
        fn prop_score_monotonic_and_lanes_in_sync(
            steps in prop::collection::vec((0.0f32..0.1, 0u8..3), 1..300)
        ) {
            let rig = Rig::new();
            let mut session = rig.start();
            let mut last_score = 0;

            for (dt, input) in steps {
                match input {
                    0 => { session.handle_intent(Intent::MoveLeft); }
                    1 => { session.handle_intent(Intent::MoveRight); }
                    _ => {}
                }
                session.update(dt).unwrap();

                prop_assert!(session.score() >= last_score);
                last_score = session.score();
                let lanes = session.lanes();
                prop_assert_eq!(session.player().lanes(), lanes);
                prop_assert_eq!(session.pool().lanes(), lanes);
                prop_assert!(session.player().lane_index() < lanes.len());
                for obstacle in session.pool().active() {
                    prop_assert!(obstacle.z() <= OBSTACLE_DESPAWN_Z);
                }
            }
        }
    }
}
