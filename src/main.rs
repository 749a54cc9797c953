//! Wireframe Runner entry point
//!
//! The web build wires the session to the DOM and runs it from
//! `requestAnimationFrame`. The native build plays a few headless runs with an
//! autopilot against the in-memory backend.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, KeyboardEvent, TouchEvent};

    use wireframe_runner::leaderboard::{Leaderboard, RankLimit, format_row};
    use wireframe_runner::persistence::{
        LocalStorageGateway, ScoreGateway, TaskSpawner, WasmSpawner,
    };
    use wireframe_runner::platform::{intent_for_key, intent_for_touch};
    use wireframe_runner::sim::Notification;
    use wireframe_runner::{FrameLoop, GameSession, Intent, PresentationSink, Settings};

    fn document() -> Option<Document> {
        web_sys::window().and_then(|w| w.document())
    }

    fn set_text(id: &str, text: &str) {
        if let Some(el) = document().and_then(|d| d.get_element_by_id(id)) {
            el.set_text_content(Some(text));
        }
    }

    fn set_visible(id: &str, visible: bool) {
        if let Some(el) = document().and_then(|d| d.get_element_by_id(id)) {
            let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
        }
    }

    fn banner_id(kind: Notification) -> &'static str {
        match kind {
            Notification::HighScore => "high-score-banner",
            Notification::Milestone => "milestone-banner",
        }
    }

    /// Writes session events into the page's HUD elements
    struct DomSink {
        expansion_flash: bool,
    }

    impl PresentationSink for DomSink {
        fn on_score_changed(&mut self, score: u64) {
            set_text("score", &format!("Score: {}", score));
        }

        fn on_lane_expansion(&mut self, lane_count: usize) {
            log::info!("Track widened to {} lanes", lane_count);
            if self.expansion_flash {
                if let Some(el) = document().and_then(|d| d.get_element_by_id("hud")) {
                    let _ = el.set_attribute("class", "lane-flash");
                }
            }
        }

        fn on_game_over(&mut self, final_score: u64) {
            set_visible(banner_id(Notification::HighScore), false);
            set_visible(banner_id(Notification::Milestone), false);
            set_visible("game-over", true);
            set_text("final-score", &format!("Final Score: {}", final_score));
        }

        fn on_high_score_achieved(&mut self) {
            set_text(banner_id(Notification::HighScore), "New High Score!");
            set_visible(banner_id(Notification::HighScore), true);
        }

        fn on_milestone_reached(&mut self, milestone: u64) {
            set_text(banner_id(Notification::Milestone), &format!("{} points!", milestone));
            set_visible(banner_id(Notification::Milestone), true);
        }

        fn on_reset(&mut self) {
            set_text("score", "Score: 0");
            set_visible("game-over", false);
            set_visible("instructions", true);
            set_visible(banner_id(Notification::HighScore), false);
            set_visible(banner_id(Notification::Milestone), false);
        }

        fn on_notification_dismissed(&mut self, kind: Notification) {
            set_visible(banner_id(kind), false);
        }
    }

    fn render_leaderboard(board: &Leaderboard, identity: &str, limit: RankLimit) {
        let Some(document) = document() else { return };
        let Some(list) = document.get_element_by_id("leaderboard") else {
            return;
        };
        if board.is_empty() {
            list.set_text_content(Some("No scores yet"));
            return;
        }
        let text: Vec<String> = board
            .top(limit)
            .iter()
            .enumerate()
            .map(|(i, entry)| format_row(i + 1, entry, Some(identity)))
            .collect();
        list.set_text_content(Some(&text.join("\n")));
        set_text("online-count", &format!("{} playing", board.online_count()));
        if let Some(best) = board.top_score() {
            set_text("top-score", &format!("Best: {}", best));
        }
        match board.rank_of(identity) {
            Some(rank) => set_text("your-rank", &format!("Your rank: #{}", rank)),
            None => set_text("your-rank", ""),
        }
    }

    fn refresh_leaderboard(gateway: &LocalStorageGateway, identity: String, limit: RankLimit) {
        let fetch = gateway.fetch_ranked(limit);
        WasmSpawner.spawn_local(Box::pin(async move {
            match fetch.await {
                Ok(rows) => render_leaderboard(&Leaderboard::from_rows(rows), &identity, limit),
                Err(e) => log::warn!("Leaderboard unavailable: {}", e),
            }
        }));
    }

    /// Settings with a player name, generating one on first launch
    fn load_settings() -> Settings {
        let mut settings = Settings::load();
        if settings.identity().is_none() {
            settings.player_name = format!("runner-{}", rand::random_range(1000..10000));
            settings.save();
            log::info!("Assigned player name {}", settings.player_name);
        }
        settings
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Wireframe Runner starting...");

        let settings = load_settings();
        let identity = settings.player_name.trim().to_string();
        let limit = settings.leaderboard_limit;
        let gateway = LocalStorageGateway::new();
        let seed = js_sys::Date::now() as u64;

        let session = GameSession::builder()
            .settings(settings.clone())
            .sink(DomSink {
                expansion_flash: settings.effective_expansion_flash(),
            })
            .gateway(gateway.clone())
            .spawner(WasmSpawner)
            .seed(seed)
            .build();
        let session = match session {
            Ok(session) => session,
            Err(e) => {
                log::error!("Could not start session: {}", e);
                set_text("score", &format!("Error: {}", e));
                return;
            }
        };
        log::info!("Session ready with seed: {}", seed);

        if let Some(loading) = document().and_then(|d| d.get_element_by_id("loading")) {
            let _ = loading.set_attribute("class", "hidden");
        }

        // Keep the leaderboard live
        {
            let watched = gateway.clone();
            let identity = identity.clone();
            gateway.subscribe(Box::new(move || {
                refresh_leaderboard(&watched, identity.clone(), limit);
            }));
        }
        gateway.watch_other_tabs();
        refresh_leaderboard(&gateway, identity, limit);

        let game = Rc::new(RefCell::new(FrameLoop::new(session)));
        setup_input_handlers(game.clone());
        setup_unload(game.clone());
        request_animation_frame(game);

        log::info!("Wireframe Runner running!");
    }

    fn apply_intent(game: &Rc<RefCell<FrameLoop>>, intent: Intent) {
        let accepted = game.borrow_mut().handle_intent(intent);
        if accepted && intent != Intent::Restart {
            set_visible("instructions", false);
        }
    }

    fn setup_input_handlers(game: Rc<RefCell<FrameLoop>>) {
        let Some(window) = web_sys::window() else { return };

        // Keyboard
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if let Some(intent) = intent_for_key(&event.key()) {
                    apply_intent(&game, intent);
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch: left/right half of the screen, any tap restarts
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                let Some(touch) = event.touches().get(0) else { return };
                let width = web_sys::window()
                    .and_then(|w| w.inner_width().ok())
                    .and_then(|w| w.as_f64())
                    .unwrap_or(0.0) as f32;
                let game_over = {
                    let g = game.borrow();
                    g.session().is_game_over() || g.is_halted()
                };
                if !game_over {
                    // Keep the page from scrolling or zooming
                    event.prevent_default();
                }
                apply_intent(&game, intent_for_touch(touch.client_x() as f32, width, game_over));
            });
            let _ = window
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_unload(game: Rc<RefCell<FrameLoop>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            game.borrow().session().leave();
        });
        let _ = window
            .add_event_listener_with_callback("beforeunload", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<FrameLoop>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<FrameLoop>>, time: f64) {
        game.borrow_mut().frame(time);
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use wireframe_runner::consts::*;
    use wireframe_runner::driver::FrameStatus;
    use wireframe_runner::leaderboard::{Leaderboard, RankLimit, format_row};
    use futures::FutureExt;
    use futures::executor::LocalPool;
    use wireframe_runner::persistence::{InMemoryGateway, ScoreGateway};
    use wireframe_runner::presentation::LogSink;
    use wireframe_runner::{FrameLoop, GameSession, Intent, Settings, TickOutcome};

    const RUNS: usize = 3;
    /// Give up on a run after this much simulated time
    const MAX_RUN_SECS: f32 = 120.0;
    /// How far ahead the autopilot looks
    const LOOKAHEAD_Z: f32 = -20.0;

    /// Dodge whatever is coming down the current lane
    fn autopilot(session: &GameSession) -> Option<Intent> {
        let lanes = session.lanes();
        let obstacles = session.pool().active();
        let blocked = |lane: usize| {
            let Some(x) = lanes.offset(lane) else {
                return true;
            };
            obstacles.iter().any(|o| {
                (o.pos.x - x).abs() < LANE_WIDTH / 2.0 && o.z() > LOOKAHEAD_Z && o.z() < PLAYER_Z + 2.0
            })
        };

        let current = session.player().lane_index();
        if !blocked(current) {
            return None;
        }
        if current > 0 && !blocked(current - 1) {
            Some(Intent::MoveLeft)
        } else if current < lanes.last_index() && !blocked(current + 1) {
            Some(Intent::MoveRight)
        } else {
            None
        }
    }

    pub fn run() {
        let settings = Settings::load();
        let identity = settings.identity().unwrap_or("autopilot").to_string();
        let seed = std::env::var("RUNNER_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(42);

        let gateway = InMemoryGateway::new();
        let mut pool = LocalPool::new();
        let session = GameSession::builder()
            .settings(settings)
            .identity(identity.clone())
            .sink(LogSink)
            .gateway(gateway.clone())
            .spawner(pool.spawner())
            .seed(seed)
            .build();
        let session = match session {
            Ok(session) => session,
            Err(e) => {
                log::error!("Could not start session: {}", e);
                return;
            }
        };
        pool.run_until_stalled();

        let mut game = FrameLoop::new(session);
        for run in 1..=RUNS {
            let mut elapsed = 0.0;
            while elapsed < MAX_RUN_SECS {
                if let Some(intent) = autopilot(game.session()) {
                    game.handle_intent(intent);
                }
                match game.step(FIRST_FRAME_DT) {
                    FrameStatus::Ticked(TickOutcome::Advanced) => elapsed += FIRST_FRAME_DT,
                    FrameStatus::Ticked(_) | FrameStatus::Halted => break,
                }
                pool.run_until_stalled();
            }
            let score = game.session().score();
            println!("Run {}: {} points in {:.1}s", run, score, elapsed);
            pool.run_until_stalled();

            if run < RUNS {
                game.handle_intent(Intent::Restart);
                pool.run_until_stalled();
            }
        }

        match serde_json::to_string_pretty(&game.session().snapshot()) {
            Ok(json) => println!("\nFinal state:\n{}", json),
            Err(e) => log::warn!("Could not serialize snapshot: {}", e),
        }

        match gateway.fetch_ranked(RankLimit::All).now_or_never() {
            Some(Ok(rows)) => {
                let board = Leaderboard::from_rows(rows);
                if board.is_empty() {
                    println!("\nLeaderboard is empty");
                    return;
                }
                println!("\nLeaderboard:");
                for (i, entry) in board.top(RankLimit::All).iter().enumerate() {
                    println!("{}", format_row(i + 1, entry, Some(&identity)));
                }
                if let (Some(best), Some(rank)) = (board.top_score(), board.rank_of(&identity)) {
                    println!("Best: {}  Your rank: #{}", best, rank);
                }
            }
            Some(Err(e)) => log::warn!("Leaderboard unavailable: {}", e),
            None => log::warn!("Leaderboard fetch did not complete"),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Wireframe Runner (native) starting...");
    log::info!("Native mode runs headless - build for wasm32 to play in the browser");

    headless::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
