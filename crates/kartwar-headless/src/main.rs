use std::collections::HashMap;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use kartwar_combat::KartArena;
use kartwar_core::game_trait::{GameConfig, GameEvent, PlayerId, PlayerInputs, Simulation};
use kartwar_core::player::Player;

/// Value of a `--name=value` flag anywhere on the command line.
fn flag<T: std::str::FromStr>(name: &str) -> Option<T> {
    let prefix = format!("--{name}=");
    std::env::args()
        .skip(1)
        .find_map(|a| a.strip_prefix(&prefix).map(String::from))
        .and_then(|v| v.parse().ok())
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let bots: usize = flag("bots").unwrap_or(6).clamp(2, 8);
    let seconds: u64 = flag("seconds").unwrap_or(120);
    let seed: Option<u64> = flag("seed");
    let difficulty: String = flag("difficulty").unwrap_or_else(|| "medium".to_string());
    let arena: String = flag("arena").unwrap_or_else(|| "default".to_string());

    let players: Vec<Player> = (1..=bots as PlayerId)
        .map(|id| Player::bot(id, format!("Bot{id}")))
        .collect();

    let mut custom = HashMap::new();
    custom.insert("ai_difficulty".to_string(), serde_json::json!(difficulty));
    custom.insert("arena_size".to_string(), serde_json::json!(arena));
    if let Some(seed) = seed {
        custom.insert("seed".to_string(), serde_json::json!(seed));
    }
    let config = GameConfig {
        round_count: 1,
        round_duration: Duration::from_secs(seconds),
        custom,
    };

    let mut game = KartArena::new();
    game.init(&players, &config);

    let dt = 1.0 / game.tick_rate();
    let empty = PlayerInputs {
        inputs: HashMap::new(),
    };
    let mut ticks: u64 = 0;
    let mut kills = 0usize;
    // Hard stop in case the round never reports completion
    let max_ticks = (seconds as f32 * game.tick_rate()) as u64 + 1;
    while !game.is_round_complete() && ticks <= max_ticks {
        let events = game.update(dt, &empty);
        kills += events
            .iter()
            .filter(|e| matches!(e, GameEvent::Kill { .. }))
            .count();
        ticks += 1;
    }

    tracing::info!(
        ticks,
        kills,
        snapshot_bytes = game.serialize_state().len(),
        "Match finished"
    );
    for (rank, score) in game.round_results().iter().enumerate() {
        let Some(kart) = game.state().kart(score.player_id) else {
            continue;
        };
        tracing::info!(
            rank = rank + 1,
            name = %kart.name,
            kills = kart.stats.kills,
            deaths = kart.stats.deaths,
            damage = kart.stats.damage_dealt,
            "Standing"
        );
    }
}
