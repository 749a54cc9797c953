//! Per-frame loop
//!
//! Turns host timestamps into clamped deltas and feeds them to the session.
//! A tick error halts the loop until the player restarts.

use crate::consts::*;
use crate::error::TickError;
use crate::session::{GameSession, Intent, TickOutcome};

/// Result of one host frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Ticked(TickOutcome),
    /// A previous tick failed; nothing runs until a restart
    Halted,
}

#[derive(Debug)]
pub struct FrameLoop {
    session: GameSession,
    last_time_ms: Option<f64>,
    halted: Option<TickError>,
}

impl FrameLoop {
    pub fn new(session: GameSession) -> Self {
        Self {
            session,
            last_time_ms: None,
            halted: None,
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// The error that stopped the loop, if any
    pub fn halt_reason(&self) -> Option<&TickError> {
        self.halted.as_ref()
    }

    /// Drive one frame from a host timestamp in milliseconds
    /// (`requestAnimationFrame` time on the web)
    pub fn frame(&mut self, now_ms: f64) -> FrameStatus {
        if self.halted.is_some() {
            return FrameStatus::Halted;
        }

        let dt = match self.last_time_ms {
            Some(last) => {
                let raw = ((now_ms - last) / 1000.0) as f32;
                // Non-finite deltas go through so the session can reject them
                if raw.is_finite() {
                    raw.clamp(0.0, MAX_FRAME_DT)
                } else {
                    raw
                }
            }
            None => FIRST_FRAME_DT,
        };
        self.last_time_ms = Some(now_ms);
        self.step(dt)
    }

    /// Drive one frame with an explicit delta (seconds)
    pub fn step(&mut self, dt: f32) -> FrameStatus {
        if self.halted.is_some() {
            return FrameStatus::Halted;
        }
        match self.session.update(dt) {
            Ok(outcome) => FrameStatus::Ticked(outcome),
            Err(e) => {
                log::error!("Tick failed, halting: {}", e);
                self.halted = Some(e);
                FrameStatus::Halted
            }
        }
    }

    /// Route an intent to the session. Restart also clears a halt.
    pub fn handle_intent(&mut self, intent: Intent) -> bool {
        if intent == Intent::Restart && self.halted.take().is_some() {
            log::info!("Restarting after halt");
            self.session.reset();
            self.last_time_ms = None;
            return true;
        }
        let accepted = self.session.handle_intent(intent);
        if accepted && intent == Intent::Restart {
            // Time spent on the game over screen is not play time
            self.last_time_ms = None;
        }
        accepted
    }
}
