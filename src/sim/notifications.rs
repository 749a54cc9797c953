//! Time-boxed banner notifications
//!
//! Banners are dismissed by simulation time, not wall-clock timers, so they
//! can never fire after the run that raised them has been reset.

use serde::{Deserialize, Serialize};

/// Kinds of transient banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notification {
    HighScore,
    Milestone,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Pending {
    kind: Notification,
    remaining: f32,
}

/// Dismissal timers for visible banners (at most one per kind)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationTimers {
    pending: Vec<Pending>,
}

impl NotificationTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a banner for `duration` seconds, restarting its timer if visible
    pub fn show(&mut self, kind: Notification, duration: f32) {
        self.pending.retain(|p| p.kind != kind);
        self.pending.push(Pending {
            kind,
            remaining: duration.max(0.0),
        });
    }

    pub fn is_visible(&self, kind: Notification) -> bool {
        self.pending.iter().any(|p| p.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Count down and return the banners whose time ran out
    pub fn tick(&mut self, dt: f32) -> Vec<Notification> {
        let mut expired = Vec::new();
        self.pending.retain_mut(|p| {
            p.remaining -= dt;
            if p.remaining <= 0.0 {
                expired.push(p.kind);
                false
            } else {
                true
            }
        });
        expired
    }

    /// Drop every pending dismissal without reporting it
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }
}
