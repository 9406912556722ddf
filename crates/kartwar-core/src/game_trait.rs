use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::events::SoundCue;

/// Unique identifier for a vehicle's driver (human or AI).
pub type PlayerId = u64;

/// Core trait implemented by a tick-driven simulation.
///
/// The host owns the frame loop, input polling and presentation;
/// the simulation only advances its world and reports what happened.
pub trait Simulation: Send + Sync {
    /// Metadata for the host's selection screen.
    fn metadata(&self) -> SimulationMetadata;

    /// Called once when the match starts.
    fn init(&mut self, players: &[super::player::Player], config: &GameConfig);

    /// Advance the world by `dt` seconds. Returns the events emitted this tick.
    fn update(&mut self, dt: f32, inputs: &PlayerInputs) -> Vec<GameEvent>;

    /// Serialize the full world snapshot for the rendering surface.
    fn serialize_state(&self) -> Vec<u8>;

    /// Replace the world with a previously serialized snapshot.
    fn apply_state(&mut self, state: &[u8]);

    /// Queue an encoded input snapshot for the next tick.
    fn apply_input(&mut self, player_id: PlayerId, input: &[u8]);

    /// Called when a new driver joins mid-match.
    fn player_joined(&mut self, player: &super::player::Player);

    /// Called when a driver leaves.
    fn player_left(&mut self, player_id: PlayerId);

    /// Simulation tick rate in Hz.
    fn tick_rate(&self) -> f32 {
        60.0
    }

    fn pause(&mut self);

    fn resume(&mut self);

    /// Whether the match is over.
    fn is_round_complete(&self) -> bool;

    /// Final standings for the match.
    fn round_results(&self) -> Vec<PlayerScore>;
}

/// Metadata describing a simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationMetadata {
    pub name: String,
    pub description: String,
    pub min_players: u8,
    pub max_players: u8,
    pub estimated_round_duration: Duration,
}

/// Configuration for a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub round_count: u8,
    pub round_duration: Duration,
    pub custom: HashMap<String, serde_json::Value>,
}

/// Encoded inputs from all human drivers for a single tick.
pub struct PlayerInputs {
    pub inputs: HashMap<PlayerId, Vec<u8>>,
}

/// Events emitted by a simulation during update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ScoreUpdate {
        player_id: PlayerId,
        score: i32,
    },
    Kill {
        killer: Option<PlayerId>,
        victim: PlayerId,
    },
    Respawn {
        player_id: PlayerId,
    },
    /// Fire-and-forget audio trigger at a world position.
    Sound {
        cue: SoundCue,
        x: f32,
        y: f32,
    },
    RoundComplete,
}

/// Score entry for a driver at the end of a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerScore {
    pub player_id: PlayerId,
    pub score: i32,
}

/// Generates the boilerplate `Simulation` methods shared by every simulation:
/// `serialize_state`, `apply_state`, `pause`, `resume`, `is_round_complete`.
///
/// Requires the implementing struct to have `state: $StateType` and `paused: bool` fields,
/// and `$StateType` to have a `round_complete: bool` field. The optional
/// `after_apply_state` method runs whenever a snapshot replaces the state.
#[macro_export]
macro_rules! simulation_boilerplate {
    (state_type: $StateType:ty, after_apply_state: $hook:ident) => {
        fn apply_state(&mut self, state: &[u8]) {
            match rmp_serde::from_slice::<$StateType>(state) {
                Ok(s) => {
                    self.state = s;
                    self.$hook();
                },
                Err(e) => tracing::debug!(error = %e, "Dropped malformed world snapshot"),
            }
        }

        $crate::simulation_boilerplate!(@shared);
    };
    (state_type: $StateType:ty) => {
        fn apply_state(&mut self, state: &[u8]) {
            match rmp_serde::from_slice::<$StateType>(state) {
                Ok(s) => self.state = s,
                Err(e) => tracing::debug!(error = %e, "Dropped malformed world snapshot"),
            }
        }

        $crate::simulation_boilerplate!(@shared);
    };
    (@shared) => {
        fn serialize_state(&self) -> Vec<u8> {
            rmp_serde::to_vec(&self.state).expect("world snapshot serialization must succeed")
        }

        fn pause(&mut self) {
            self.paused = true;
        }

        fn resume(&mut self) {
            self.paused = false;
        }

        fn is_round_complete(&self) -> bool {
            self.state.round_complete
        }
    };
}
