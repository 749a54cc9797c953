//! Player settings and preferences
//!
//! Persisted in LocalStorage, separately from the score table.

use serde::{Deserialize, Serialize};

use crate::leaderboard::RankLimit;

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name scores and presence are recorded under
    pub player_name: String,

    // === Banners ===
    /// Seconds the "New High Score!" banner stays up
    pub high_score_banner_secs: f32,
    /// Seconds a milestone banner stays up
    pub milestone_banner_secs: f32,

    // === Leaderboard ===
    /// Rows shown in the in-game leaderboard
    pub leaderboard_limit: RankLimit,

    // === Accessibility ===
    /// Skip the lane-expansion flash
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            player_name: String::new(),
            high_score_banner_secs: 3.0,
            milestone_banner_secs: 2.0,
            leaderboard_limit: RankLimit::default(),
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Trimmed player name, `None` if unset
    pub fn identity(&self) -> Option<&str> {
        let name = self.player_name.trim();
        if name.is_empty() { None } else { Some(name) }
    }

    /// Whether the lane-expansion flash should play
    pub fn effective_expansion_flash(&self) -> bool {
        !self.reduced_motion
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "wireframe_runner_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match serde_json::from_str(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring unreadable settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                if storage.set_item(Self::STORAGE_KEY, &json).is_err() {
                    log::warn!("Settings could not be saved");
                } else {
                    log::info!("Settings saved");
                }
            }
        }
    }

    /// Native: settings come from the environment
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let mut settings = Self::default();
        if let Ok(name) = std::env::var("RUNNER_PLAYER") {
            settings.player_name = name;
        }
        settings
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
