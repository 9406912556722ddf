pub mod error;
pub mod events;
pub mod game_trait;
pub mod player;
pub mod powerup;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::HashMap;
    use std::time::Duration;

    use crate::game_trait::{GameConfig, GameEvent, PlayerId, PlayerInputs, PlayerScore, Simulation};
    use crate::player::Player;

    /// Create `n` human test drivers with sequential IDs starting at 1.
    pub fn make_players(n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| Player::human(i as PlayerId + 1, format!("Player{}", i + 1)))
            .collect()
    }

    /// Create one human driver (ID 1) followed by `bots` AI drivers.
    pub fn make_human_and_bots(bots: usize) -> Vec<Player> {
        let mut players = vec![Player::human(1, "Player1")];
        players.extend((0..bots).map(|i| Player::bot(i as PlayerId + 2, format!("Bot{}", i + 1))));
        players
    }

    /// Create a default GameConfig with the given round duration in seconds.
    pub fn default_config(round_duration_secs: u64) -> GameConfig {
        GameConfig {
            round_count: 1,
            round_duration: Duration::from_secs(round_duration_secs),
            custom: HashMap::new(),
        }
    }

    /// Run N ticks with empty inputs, returning all accumulated events.
    pub fn run_game_ticks(game: &mut dyn Simulation, n: usize, dt: f32) -> Vec<GameEvent> {
        let empty = PlayerInputs {
            inputs: HashMap::new(),
        };
        let mut all_events = Vec::new();
        for _ in 0..n {
            all_events.extend(game.update(dt, &empty));
        }
        all_events
    }

    // ================================================================
    // Simulation Contract Tests
    // ================================================================
    // Generic checks every Simulation implementation must pass. Crates
    // call them from their own #[cfg(test)] modules.

    /// After init() with N players, serialize_state() must return non-empty bytes.
    pub fn contract_init_creates_player_state(game: &mut dyn Simulation, player_count: usize) {
        let players = make_players(player_count);
        let config = default_config(90);
        game.init(&players, &config);
        let state = game.serialize_state();
        assert!(
            !state.is_empty(),
            "serialize_state() must return non-empty bytes after init"
        );
    }

    /// apply_input() with valid data followed by update() must change state.
    pub fn contract_apply_input_changes_state(
        game: &mut dyn Simulation,
        valid_input: &[u8],
        player_id: PlayerId,
    ) {
        let before = game.serialize_state();
        game.apply_input(player_id, valid_input);
        let empty = PlayerInputs {
            inputs: HashMap::new(),
        };
        game.update(0.1, &empty);
        let after = game.serialize_state();
        assert_ne!(
            before, after,
            "State must change after apply_input + update"
        );
    }

    /// update() with dt>0 must advance the match clock.
    pub fn contract_update_advances_time(game: &mut dyn Simulation) {
        let before = game.serialize_state();
        let empty = PlayerInputs {
            inputs: HashMap::new(),
        };
        game.update(1.0, &empty);
        let after = game.serialize_state();
        assert_ne!(before, after, "update(dt>0) must advance the world");
    }

    /// Running update() enough times must eventually complete the match.
    pub fn contract_round_eventually_completes(game: &mut dyn Simulation, max_ticks: usize) {
        let empty = PlayerInputs {
            inputs: HashMap::new(),
        };
        for _ in 0..max_ticks {
            game.update(1.0, &empty);
            if game.is_round_complete() {
                return;
            }
        }
        assert!(
            game.is_round_complete(),
            "Match must complete after {max_ticks} ticks of 1s each"
        );
    }

    /// serialize → apply → serialize must be stable after one roundtrip.
    pub fn contract_state_roundtrip_preserves(game: &mut dyn Simulation) {
        let state_a = game.serialize_state();
        game.apply_state(&state_a);
        let state_b = game.serialize_state();
        game.apply_state(&state_b);
        let state_c = game.serialize_state();
        assert_eq!(
            state_b, state_c,
            "State must be stable after serialize→apply→serialize roundtrip"
        );
    }

    /// pause() must freeze the world, resume() must unfreeze it.
    pub fn contract_pause_stops_updates(game: &mut dyn Simulation) {
        game.pause();
        let before = game.serialize_state();
        let empty = PlayerInputs {
            inputs: HashMap::new(),
        };
        game.update(1.0, &empty);
        let during_pause = game.serialize_state();
        assert_eq!(before, during_pause, "State must not change while paused");

        game.resume();
        game.update(1.0, &empty);
        let after_resume = game.serialize_state();
        assert_ne!(during_pause, after_resume, "State must change after resume");
    }

    /// player_left() must remove the driver from state and standings.
    pub fn contract_player_left_cleanup(
        game: &mut dyn Simulation,
        player_id: PlayerId,
        player_count: usize,
    ) {
        let before = game.serialize_state();
        game.player_left(player_id);
        let after = game.serialize_state();
        assert_ne!(before, after, "player_left must change state");
        let results = game.round_results();
        assert_eq!(
            results.len(),
            player_count - 1,
            "round_results should have {} entries after removing player",
            player_count - 1
        );
    }

    /// round_results() must return an entry for each active driver.
    pub fn contract_round_results_complete(
        game: &dyn Simulation,
        expected_players: usize,
    ) -> Vec<PlayerScore> {
        let results = game.round_results();
        assert_eq!(
            results.len(),
            expected_players,
            "round_results must have one entry per active player"
        );
        results
    }
}
