//! Events the session pushes to rendering and UI
//!
//! The session never touches the DOM. It calls a [`PresentationSink`], which
//! the browser build implements on top of web-sys and tests implement with
//! [`EventLog`].

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::sim::Notification;

/// Receiver for session events (fire-and-forget)
pub trait PresentationSink {
    fn on_score_changed(&mut self, _score: u64) {}
    fn on_lane_expansion(&mut self, _lane_count: usize) {}
    fn on_game_over(&mut self, _final_score: u64) {}
    fn on_high_score_achieved(&mut self) {}
    fn on_milestone_reached(&mut self, _milestone: u64) {}
    fn on_reset(&mut self) {}
    /// A banner's display time ran out
    fn on_notification_dismissed(&mut self, _kind: Notification) {}
}

/// Every event the session can emit, as data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    ScoreChanged(u64),
    LaneExpansion(usize),
    GameOver(u64),
    HighScoreAchieved,
    MilestoneReached(u64),
    Reset,
    NotificationDismissed(Notification),
}

/// Sink that records events; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<SessionEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: SessionEvent) {
        self.events.borrow_mut().push(event);
    }

    pub fn snapshot(&self) -> Vec<SessionEvent> {
        self.events.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&SessionEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl PresentationSink for EventLog {
    fn on_score_changed(&mut self, score: u64) {
        self.push(SessionEvent::ScoreChanged(score));
    }

    fn on_lane_expansion(&mut self, lane_count: usize) {
        self.push(SessionEvent::LaneExpansion(lane_count));
    }

    fn on_game_over(&mut self, final_score: u64) {
        self.push(SessionEvent::GameOver(final_score));
    }

    fn on_high_score_achieved(&mut self) {
        self.push(SessionEvent::HighScoreAchieved);
    }

    fn on_milestone_reached(&mut self, milestone: u64) {
        self.push(SessionEvent::MilestoneReached(milestone));
    }

    fn on_reset(&mut self) {
        self.push(SessionEvent::Reset);
    }

    fn on_notification_dismissed(&mut self, kind: Notification) {
        self.push(SessionEvent::NotificationDismissed(kind));
    }
}

/// Sink that only logs lifecycle events (native demo)
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl PresentationSink for LogSink {
    fn on_lane_expansion(&mut self, lane_count: usize) {
        log::info!("Lanes expanded to {}", lane_count);
    }

    fn on_game_over(&mut self, final_score: u64) {
        log::info!("Game over, final score {}", final_score);
    }

    fn on_high_score_achieved(&mut self) {
        log::info!("New high score!");
    }

    fn on_milestone_reached(&mut self, milestone: u64) {
        log::info!("Milestone reached: {}", milestone);
    }
}
