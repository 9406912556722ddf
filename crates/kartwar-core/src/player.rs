use serde::{Deserialize, Serialize};

use crate::game_trait::PlayerId;

/// A driver taking part in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    /// Driven by an AI controller instead of external input.
    pub is_bot: bool,
    pub is_spectator: bool,
}

impl Player {
    pub fn human(id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            is_bot: false,
            is_spectator: false,
        }
    }

    pub fn bot(id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            is_bot: true,
            is_spectator: false,
        }
    }
}
