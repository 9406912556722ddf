//! Kart combat simulation: vehicles, weapons, power-ups, arena geometry and
//! AI drivers, coordinated by the [`KartArena`] match orchestrator.

pub mod ai;
pub mod arena;
pub mod combat;
pub mod config;
pub mod explosion;
pub mod kart;
pub mod math;
pub mod mine;
pub mod pickup;
pub mod powerups;
pub mod projectile;
pub mod scoring;
pub mod weapons;

use std::collections::HashMap;
use std::f32::consts::PI;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use kartwar_core::events::SoundCue;
use kartwar_core::game_trait::{
    GameConfig, GameEvent, PlayerId, PlayerInputs, PlayerScore, Simulation, SimulationMetadata,
};
use kartwar_core::player::Player;
use kartwar_core::simulation_boilerplate;

use ai::{AiController, AiView, Difficulty};
use arena::{Arena, ArenaSize, load_arena};
use config::CombatConfig;
use explosion::Explosion;
use kart::{Kart, KartInput};
use math::{Vec2, pick_random};
use mine::Mine;
use pickup::{Pickup, PickupKind};
use powerups::{PowerUpKind, apply_power_up, select_power_up};
use projectile::Projectile;
use weapons::{EntityIds, WeaponKind};

/// The whole world, as handed to the rendering surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KartArenaState {
    pub karts: Vec<Kart>,
    pub projectiles: Vec<Projectile>,
    pub mines: Vec<Mine>,
    pub explosions: Vec<Explosion>,
    pub pickups: Vec<Pickup>,
    pub arena: Arena,
    pub round_timer: f32,
    pub round_duration: f32,
    pub round_complete: bool,
    /// Kills that end the match early (0 disables).
    pub kill_limit: u32,
    pub pickup_timer: f32,
    pub ids: EntityIds,
}

impl KartArenaState {
    fn empty(arena: Arena, round_duration: f32, kill_limit: u32) -> Self {
        Self {
            karts: Vec::new(),
            projectiles: Vec::new(),
            mines: Vec::new(),
            explosions: Vec::new(),
            pickups: Vec::new(),
            arena,
            round_timer: 0.0,
            round_duration,
            round_complete: false,
            kill_limit,
            pickup_timer: 0.0,
            ids: EntityIds::default(),
        }
    }

    pub fn kart(&self, id: PlayerId) -> Option<&Kart> {
        self.karts.iter().find(|k| k.id == id)
    }

    pub fn kart_mut(&mut self, id: PlayerId) -> Option<&mut Kart> {
        self.karts.iter_mut().find(|k| k.id == id)
    }
}

/// Free-for-all vehicular combat match.
pub struct KartArena {
    state: KartArenaState,
    config: CombatConfig,
    ai: HashMap<PlayerId, AiController>,
    difficulty: Difficulty,
    rng: StdRng,
    pending_inputs: HashMap<PlayerId, KartInput>,
    paused: bool,
}

impl KartArena {
    pub fn new() -> Self {
        Self::with_config(CombatConfig::load())
    }

    /// Create a match with explicit configuration.
    pub fn with_config(config: CombatConfig) -> Self {
        let arena = load_arena(config.arena_size, config.seed);
        Self {
            state: KartArenaState::empty(arena, config.round_duration_secs, config.kill_limit),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            ai: HashMap::new(),
            difficulty: Difficulty::default(),
            pending_inputs: HashMap::new(),
            paused: false,
        }
    }

    pub fn state(&self) -> &KartArenaState {
        &self.state
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn ai_controller(&self, id: PlayerId) -> Option<&AiController> {
        self.ai.get(&id)
    }

    pub fn alive_count(&self) -> usize {
        self.state.karts.iter().filter(|k| k.alive).count()
    }

    /// The only surviving kart, if all others are down.
    pub fn last_kart_standing(&self) -> Option<PlayerId> {
        if self.state.karts.len() < 2 || self.alive_count() != 1 {
            return None;
        }
        self.state.karts.iter().find(|k| k.alive).map(|k| k.id)
    }

    /// Drivers ranked best-first.
    pub fn standings(&self) -> Vec<PlayerId> {
        let entries: Vec<(PlayerId, kart::KartStats)> =
            self.state.karts.iter().map(|k| (k.id, k.stats)).collect();
        scoring::rank(&entries)
    }

    /// Hand a weapon to a kart by catalog name. Unknown names are a logged
    /// no-op.
    pub fn grant_weapon_by_name(&mut self, id: PlayerId, name: &str) -> bool {
        let kind = match WeaponKind::from_name(name) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::debug!(player_id = id, error = %e, "Ignored weapon grant");
                return false;
            },
        };
        match self.state.kart_mut(id) {
            Some(kart) if kart.alive => {
                kart.equip(kind);
                true
            },
            _ => false,
        }
    }

    /// Apply a power-up to a kart by catalog name. Unknown names are a
    /// logged no-op.
    pub fn grant_power_up_by_name(&mut self, id: PlayerId, name: &str) -> bool {
        let kind = match PowerUpKind::from_name(name) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::debug!(player_id = id, error = %e, "Ignored power-up grant");
                return false;
            },
        };
        let kart_config = &self.config.kart;
        match self.state.karts.iter_mut().find(|k| k.id == id) {
            Some(kart) => {
                apply_power_up(kart, kind, kart_config) != powerups::PowerUpApplied::Ignored
            },
            None => false,
        }
    }

    /// Respawn a dead kart immediately, skipping its remaining timer.
    pub fn respawn_now(&mut self, id: PlayerId) -> bool {
        let Some(idx) = combat::kart_index(&self.state.karts, id) else {
            return false;
        };
        if self.state.karts[idx].alive {
            return false;
        }
        self.respawn_kart(idx);
        true
    }

    /// Spawn point farthest from every living opponent of `idx`.
    fn respawn_point(&mut self, idx: usize) -> (Vec2, f32) {
        let me = self.state.karts.get(idx).map(|k| k.id);
        let opponents: Vec<Vec2> = self
            .state
            .karts
            .iter()
            .filter(|k| k.alive && Some(k.id) != me)
            .map(|k| k.pos)
            .collect();
        let spawns = &self.state.arena.vehicle_spawns;
        if spawns.is_empty() {
            let arena = &self.state.arena;
            return (Vec2::new(arena.width / 2.0, arena.height / 2.0), 0.0);
        }
        if opponents.is_empty() {
            let pick = self.rng.random_range(0..spawns.len());
            return (spawns[pick].position(), spawns[pick].angle);
        }
        let clearance = |pos: Vec2| {
            opponents
                .iter()
                .map(|o| o.distance(pos))
                .fold(f32::INFINITY, f32::min)
        };
        let best = spawns
            .iter()
            .max_by(|a, b| clearance(a.position()).total_cmp(&clearance(b.position())))
            .copied()
            .unwrap_or(spawns[0]);
        (best.position(), best.angle)
    }

    fn respawn_kart(&mut self, idx: usize) {
        let (pos, _) = self.respawn_point(idx);
        let heading = self.rng.random_range(-PI..PI);
        let protection = self.config.spawn_protection;
        let kart = &mut self.state.karts[idx];
        kart.respawn(pos, heading, protection);
        tracing::debug!(player_id = kart.id, x = pos.x, y = pos.y, "Kart respawned");
    }

    fn add_kart(&mut self, player: &Player, slot: usize) {
        let (pos, angle) = match self.state.arena.vehicle_spawns.get(
            slot % self.state.arena.vehicle_spawns.len().max(1),
        ) {
            Some(spawn) => (spawn.position(), spawn.angle),
            None => (
                Vec2::new(self.state.arena.width / 2.0, self.state.arena.height / 2.0),
                0.0,
            ),
        };
        let mut kart = Kart::new(
            player.id,
            player.display_name.clone(),
            player.is_bot,
            pos,
            angle,
            &self.config.kart,
        );
        kart.respawn_delay = self.config.respawn_delay;
        self.state.karts.push(kart);
        if player.is_bot {
            self.ai.insert(
                player.id,
                AiController::new(player.id, self.difficulty, self.config.seed),
            );
        }
    }

    /// Match AI controllers to the bots in the current world, e.g. after a
    /// snapshot replaced it.
    fn sync_controllers(&mut self) {
        let karts = &self.state.karts;
        self.ai
            .retain(|id, _| karts.iter().any(|k| k.id == *id && k.is_bot));
        for kart in karts.iter().filter(|k| k.is_bot) {
            self.ai
                .entry(kart.id)
                .or_insert_with(|| AiController::new(kart.id, self.difficulty, self.config.seed));
        }
    }

    /// Put one weapon or power-up pickup on a free spawn point, if the cap
    /// allows. Returns whether one was placed.
    fn spawn_pickup(&mut self, weapon: bool) -> bool {
        let (cap, spawns) = if weapon {
            (self.config.max_weapon_pickups, &self.state.arena.weapon_spawns)
        } else {
            (self.config.max_powerup_pickups, &self.state.arena.powerup_spawns)
        };
        let live = self
            .state
            .pickups
            .iter()
            .filter(|p| p.active && p.is_weapon() == weapon);
        if live.clone().count() >= cap {
            return false;
        }
        let free: Vec<usize> = (0..spawns.len())
            .filter(|slot| !live.clone().any(|p| p.spawn_slot == *slot))
            .collect();
        let Some(&slot) = pick_random(&free, &mut self.rng) else {
            return false;
        };
        let pos = spawns[slot];
        let kind = if weapon {
            let kind = pick_random(&WeaponKind::ALL, &mut self.rng)
                .copied()
                .unwrap_or(WeaponKind::MachineGun);
            PickupKind::Weapon(kind)
        } else {
            PickupKind::PowerUp(select_power_up(&mut self.rng))
        };
        let id = self.state.ids.next_id();
        self.state
            .pickups
            .push(Pickup::new(id, pos, kind, self.config.pickup_radius, slot));
        true
    }

    fn fill_pickups(&mut self) {
        while self.spawn_pickup(true) {}
        while self.spawn_pickup(false) {}
    }

    /// Drop finished entities, bring back the dead and top up pickups.
    fn cleanup(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        for event in events.iter() {
            if let GameEvent::Kill { victim, .. } = event {
                if let Some(ai) = self.ai.get_mut(victim) {
                    ai.cancel_pending();
                }
                self.pending_inputs.remove(victim);
            }
        }

        for kart in self.state.karts.iter_mut().filter(|k| k.alive) {
            kart.tick_spawn_protection(dt);
        }
        for idx in 0..self.state.karts.len() {
            if !self.state.karts[idx].ready_to_respawn() {
                continue;
            }
            self.respawn_kart(idx);
            let kart = &self.state.karts[idx];
            events.push(GameEvent::Respawn { player_id: kart.id });
            events.push(GameEvent::Sound {
                cue: SoundCue::Respawn,
                x: kart.pos.x,
                y: kart.pos.y,
            });
        }

        for explosion in &mut self.state.explosions {
            explosion.update(dt);
        }
        self.state.explosions.retain(|e| !e.is_finished());
        self.state.projectiles.retain(|p| p.active);
        self.state.mines.retain(Mine::is_active);
        self.state.pickups.retain(|p| p.active);
        self.state.arena.cleanup(dt);

        self.state.pickup_timer += dt;
        if self.state.pickup_timer >= self.config.pickup_spawn_interval {
            self.state.pickup_timer = 0.0;
            self.spawn_pickup(true);
            self.spawn_pickup(false);
        }
    }

    fn check_round_end(&mut self, events: &mut Vec<GameEvent>) {
        let timed_out = self.state.round_timer >= self.state.round_duration;
        let limit = self.state.kill_limit;
        let limit_reached = limit > 0 && self.state.karts.iter().any(|k| k.stats.kills >= limit);
        if !timed_out && !limit_reached {
            return;
        }
        self.state.round_complete = true;
        events.push(GameEvent::RoundComplete);
        tracing::info!(
            winner = ?self.standings().first(),
            elapsed = self.state.round_timer,
            kill_limit_reached = limit_reached,
            "Match complete"
        );
    }
}

impl Default for KartArena {
    fn default() -> Self {
        Self::with_config(CombatConfig::default())
    }
}

impl Simulation for KartArena {
    fn metadata(&self) -> SimulationMetadata {
        SimulationMetadata {
            name: "Kart War".to_string(),
            description: "Free-for-all kart combat with weapons, power-ups and AI rivals."
                .to_string(),
            min_players: 2,
            max_players: 8,
            estimated_round_duration: Duration::from_secs_f32(self.config.round_duration_secs),
        }
    }

    fn tick_rate(&self) -> f32 {
        self.config.tick_rate_hz
    }

    fn init(&mut self, players: &[Player], config: &GameConfig) {
        let custom = &config.custom;
        let arena_size = custom
            .get("arena_size")
            .and_then(|v| v.as_str())
            .map(ArenaSize::from_name)
            .unwrap_or(self.config.arena_size);
        self.difficulty = custom
            .get("ai_difficulty")
            .and_then(|v| v.as_str())
            .map(Difficulty::from_name)
            .unwrap_or_default();
        if let Some(seed) = custom.get("seed").and_then(|v| v.as_u64()) {
            self.config.seed = seed;
        }
        if let Some(limit) = custom.get("kill_limit").and_then(|v| v.as_u64()) {
            self.config.kill_limit = u32::try_from(limit).unwrap_or(u32::MAX);
        }
        let round_duration = if config.round_duration.is_zero() {
            self.config.round_duration_secs
        } else {
            config.round_duration.as_secs_f32()
        };

        self.rng = StdRng::seed_from_u64(self.config.seed);
        let arena = load_arena(arena_size, self.config.seed);
        self.state = KartArenaState::empty(arena, round_duration, self.config.kill_limit);
        self.ai.clear();
        self.pending_inputs.clear();
        self.paused = false;

        let active: Vec<&Player> = players.iter().filter(|p| !p.is_spectator).collect();
        for (slot, player) in active.into_iter().enumerate() {
            self.add_kart(player, slot);
        }
        self.fill_pickups();

        tracing::info!(
            karts = self.state.karts.len(),
            bots = self.ai.len(),
            arena = %self.state.arena.name,
            seed = self.config.seed,
            "Match started"
        );
    }

    fn update(&mut self, dt: f32, inputs: &PlayerInputs) -> Vec<GameEvent> {
        if self.paused || self.state.round_complete {
            return Vec::new();
        }
        for (&player_id, data) in &inputs.inputs {
            self.apply_input(player_id, data);
        }

        self.state.round_timer += dt;
        let mut events = Vec::new();

        // AI decisions, then the human inputs queued since the last tick
        let view = AiView {
            karts: &self.state.karts,
            projectiles: &self.state.projectiles,
            mines: &self.state.mines,
            pickups: &self.state.pickups,
            arena: &self.state.arena,
        };
        let mut tick_inputs: Vec<KartInput> = Vec::with_capacity(view.karts.len());
        for kart in view.karts {
            let input = match self.ai.get_mut(&kart.id) {
                Some(ai) => ai.update(dt, &view, &self.config),
                None => self.pending_inputs.remove(&kart.id).unwrap_or_default(),
            };
            tick_inputs.push(input);
        }

        for (kart, input) in self.state.karts.iter_mut().zip(&tick_inputs) {
            if input.fire {
                combat::fire_weapon(
                    kart,
                    &mut self.state.ids,
                    &mut self.rng,
                    &mut self.state.projectiles,
                    &mut self.state.mines,
                    &mut events,
                );
            }
        }

        for (kart, input) in self.state.karts.iter_mut().zip(&tick_inputs) {
            if let Some(cue) = kart.update(dt, input, &self.config.kart) {
                events.push(GameEvent::Sound {
                    cue,
                    x: kart.pos.x,
                    y: kart.pos.y,
                });
            }
        }
        for projectile in &mut self.state.projectiles {
            projectile.update(dt);
        }
        for mine in &mut self.state.mines {
            if mine.update(dt) {
                events.push(GameEvent::Sound {
                    cue: SoundCue::MineArmed,
                    x: mine.pos.x,
                    y: mine.pos.y,
                });
            }
        }

        combat::resolve(&mut self.state, &self.config, &mut events);
        self.cleanup(dt, &mut events);
        self.check_round_end(&mut events);

        events
    }

    simulation_boilerplate!(state_type: KartArenaState, after_apply_state: sync_controllers);

    fn apply_input(&mut self, player_id: PlayerId, input: &[u8]) {
        match rmp_serde::from_slice::<KartInput>(input) {
            Err(e) => {
                tracing::debug!(player_id, error = %e, "Dropped malformed kart input");
            },
            Ok(ki) => {
                // Held controls take the latest snapshot; fire and boost are
                // edge-triggered and must survive until the next tick.
                if let Some(existing) = self.pending_inputs.get_mut(&player_id) {
                    let fire = existing.fire || ki.fire;
                    let boost = existing.boost || ki.boost;
                    *existing = ki;
                    existing.fire = fire;
                    existing.boost = boost;
                } else {
                    self.pending_inputs.insert(player_id, ki);
                }
            },
        }
    }

    fn player_joined(&mut self, player: &Player) {
        if player.is_spectator || self.state.kart(player.id).is_some() {
            return;
        }
        let slot = self.state.karts.len();
        self.add_kart(player, slot);
        let idx = self.state.karts.len() - 1;
        let (pos, angle) = self.respawn_point(idx);
        let kart = &mut self.state.karts[idx];
        kart.pos = pos;
        kart.rotation = angle;
        tracing::info!(player_id = player.id, is_bot = player.is_bot, "Driver joined");
    }

    fn player_left(&mut self, player_id: PlayerId) {
        self.state.karts.retain(|k| k.id != player_id);
        self.ai.remove(&player_id);
        self.pending_inputs.remove(&player_id);
        tracing::info!(player_id, "Driver left");
    }

    fn round_results(&self) -> Vec<PlayerScore> {
        self.standings()
            .into_iter()
            .filter_map(|id| self.state.kart(id))
            .map(|k| PlayerScore {
                player_id: k.id,
                score: scoring::ffa_score(&k.stats),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kartwar_core::test_helpers::{
        self, default_config, make_human_and_bots, make_players, run_game_ticks,
    };

    const DT: f32 = 1.0 / 60.0;

    fn started(players: &[Player]) -> KartArena {
        let mut game = KartArena::default();
        game.init(players, &default_config(180));
        game
    }

    fn encode(input: &KartInput) -> Vec<u8> {
        rmp_serde::to_vec(input).unwrap()
    }

    fn no_inputs() -> PlayerInputs {
        PlayerInputs {
            inputs: HashMap::new(),
        }
    }

    #[test]
    fn init_places_every_kart_on_its_own_spawn() {
        let game = started(&make_players(4));
        assert_eq!(game.state.karts.len(), 4);
        for (i, a) in game.state.karts.iter().enumerate() {
            assert!(a.alive);
            for b in &game.state.karts[i + 1..] {
                assert!(a.pos.distance(b.pos) > 1.0, "{} and {} share a spawn", a.id, b.id);
            }
        }
    }

    #[test]
    fn bots_get_controllers_humans_do_not() {
        let game = started(&make_human_and_bots(3));
        assert_eq!(game.ai.len(), 3);
        assert!(game.ai_controller(1).is_none());
        assert!(game.ai_controller(2).is_some());
    }

    #[test]
    fn spectators_are_skipped() {
        let mut players = make_players(3);
        players[2].is_spectator = true;
        let game = started(&players);
        assert_eq!(game.state.karts.len(), 2);
    }

    #[test]
    fn custom_settings_override_config() {
        let mut config = default_config(60);
        config
            .custom
            .insert("arena_size".to_string(), serde_json::json!("small"));
        config
            .custom
            .insert("ai_difficulty".to_string(), serde_json::json!("hard"));
        config.custom.insert("kill_limit".to_string(), serde_json::json!(3));
        config.custom.insert("seed".to_string(), serde_json::json!(99));

        let mut game = KartArena::default();
        game.init(&make_human_and_bots(1), &config);
        assert_eq!(game.state.arena.width, 1200.0);
        assert_eq!(game.state.kill_limit, 3);
        assert_eq!(game.state.round_duration, 60.0);
        assert_eq!(game.config.seed, 99);
        assert_eq!(game.ai[&2].difficulty, Difficulty::hard());
    }

    #[test]
    fn oversized_kill_limit_saturates() {
        let mut config = default_config(60);
        config
            .custom
            .insert("kill_limit".to_string(), serde_json::json!(1u64 << 32));
        let mut game = KartArena::default();
        game.init(&make_human_and_bots(1), &config);
        assert_eq!(game.state.kill_limit, u32::MAX, "Must not wrap to disabled");
    }

    #[test]
    fn loaded_snapshot_brings_its_own_bots() {
        let source = started(&make_human_and_bots(2));
        let snapshot = source.serialize_state();

        let mut game = started(&[Player::human(1, "Player1"), Player::bot(9, "Bot9")]);
        assert!(game.ai_controller(9).is_some());
        game.apply_state(&snapshot);

        assert!(game.ai_controller(2).is_some());
        assert!(game.ai_controller(3).is_some());
        assert!(game.ai_controller(9).is_none(), "Kart 9 is gone");
        assert!(game.ai_controller(1).is_none());

        // Bots drive off their new controllers
        let before: Vec<Vec2> = game.state.karts.iter().map(|k| k.pos).collect();
        for _ in 0..60 {
            game.update(DT, &no_inputs());
        }
        let moved = game
            .state
            .karts
            .iter()
            .zip(&before)
            .filter(|(k, p)| k.is_bot && k.pos.distance(**p) > 1.0)
            .count();
        assert!(moved > 0);
    }

    #[test]
    fn malformed_snapshot_keeps_controllers() {
        let mut game = started(&make_human_and_bots(2));
        game.apply_state(&[0xc1, 0x00]);
        assert_eq!(game.ai.len(), 2);
        assert_eq!(game.state.karts.len(), 3);
    }

    #[test]
    fn pickups_fill_to_caps_and_stay_within_them() {
        let mut game = started(&make_human_and_bots(3));
        let count = |g: &KartArena, weapon: bool| {
            g.state
                .pickups
                .iter()
                .filter(|p| p.active && p.is_weapon() == weapon)
                .count()
        };
        assert!(count(&game, true) > 0);
        assert!(count(&game, false) > 0);
        for _ in 0..600 {
            game.update(DT, &no_inputs());
            assert!(count(&game, true) <= game.config.max_weapon_pickups);
            assert!(count(&game, false) <= game.config.max_powerup_pickups);
        }
    }

    #[test]
    fn malformed_input_is_dropped() {
        let mut game = started(&make_players(2));
        game.apply_input(1, &[0xc1, 0xff, 0x00]);
        assert!(game.pending_inputs.is_empty());
    }

    #[test]
    fn fire_survives_a_later_snapshot() {
        let mut game = started(&make_players(2));
        let press = KartInput {
            accelerate: true,
            fire: true,
            ..Default::default()
        };
        let release = KartInput {
            steer_left: true,
            ..Default::default()
        };
        game.apply_input(1, &encode(&press));
        game.apply_input(1, &encode(&release));
        let pending = game.pending_inputs[&1];
        assert!(pending.fire, "Fire must not be lost to the next snapshot");
        assert!(pending.steer_left);
        assert!(!pending.accelerate, "Held controls take the latest value");
    }

    #[test]
    fn human_fire_spawns_projectiles() {
        let mut game = started(&make_players(2));
        assert!(game.grant_weapon_by_name(1, "machine_gun"));
        let input = KartInput {
            fire: true,
            ..Default::default()
        };
        game.apply_input(1, &encode(&input));
        let events = game.update(DT, &no_inputs());
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::Sound {
                cue: SoundCue::Fire,
                ..
            }
        )));
        assert_eq!(
            game.state.kart(1).map(|k| k.ammo),
            Some(WeaponKind::MachineGun.def().ammo - 1)
        );
    }

    #[test]
    fn inputs_passed_to_update_are_applied() {
        let mut game = started(&make_players(2));
        let start = game.state.karts[0].pos;
        let throttle = encode(&KartInput {
            accelerate: true,
            ..Default::default()
        });
        for _ in 0..30 {
            let inputs = PlayerInputs {
                inputs: HashMap::from([(1, throttle.clone())]),
            };
            game.update(DT, &inputs);
        }
        assert!(game.state.karts[0].pos.distance(start) > 1.0);
    }

    #[test]
    fn unknown_catalog_names_are_noops() {
        let mut game = started(&make_players(2));
        assert!(!game.grant_weapon_by_name(1, "flamethrower"));
        assert!(!game.grant_power_up_by_name(1, "jetpack"));
        assert_eq!(game.state.karts[0].weapon, None);
        assert!(game.state.karts[0].active_powerups.is_empty());
        assert!(game.grant_power_up_by_name(1, "shield"));
        assert!(game.state.karts[0].modifiers.has_shield);
    }

    #[test]
    fn dead_kart_respawns_with_protection() {
        let mut game = started(&make_players(2));
        game.state.karts[1].die();
        game.state.karts[1].respawn_timer = 0.0;
        assert_eq!(game.alive_count(), 1);
        assert_eq!(game.last_kart_standing(), Some(1));

        let events = game.update(DT, &no_inputs());
        let kart = &game.state.karts[1];
        assert!(kart.alive);
        assert_eq!(kart.health, kart.max_health);
        assert!(kart.spawn_protection > 0.0);
        assert!(kart.is_invincible());
        assert!(events.contains(&GameEvent::Respawn { player_id: 2 }));
        assert_eq!(game.last_kart_standing(), None);
    }

    #[test]
    fn respawn_picks_spawn_farthest_from_opponents() {
        let mut game = started(&make_players(2));
        let anchor = game.state.arena.vehicle_spawns[0].position();
        game.state.karts[0].pos = anchor;
        game.state.karts[1].die();
        let (chosen, _) = game.respawn_point(1);
        for spawn in &game.state.arena.vehicle_spawns {
            assert!(chosen.distance(anchor) >= spawn.position().distance(anchor));
        }
    }

    #[test]
    fn explicit_respawn_skips_timer() {
        let mut game = started(&make_players(2));
        assert!(!game.respawn_now(2), "Living karts are left alone");
        game.state.karts[1].die();
        assert!(game.respawn_now(2));
        assert!(game.state.karts[1].alive);
    }

    #[test]
    fn kill_limit_ends_the_match() {
        let mut game = started(&make_players(2));
        game.state.kill_limit = 1;
        game.state.karts[0].stats.kills = 1;
        let events = game.update(DT, &no_inputs());
        assert!(game.is_round_complete());
        assert!(events.contains(&GameEvent::RoundComplete));
        assert!(game.update(DT, &no_inputs()).is_empty(), "Finished matches stop ticking");
    }

    #[test]
    fn results_follow_standings() {
        let mut game = started(&make_players(3));
        game.state.karts[2].stats.kills = 4;
        game.state.karts[0].stats.kills = 1;
        let results = game.round_results();
        let order: Vec<PlayerId> = results.iter().map(|r| r.player_id).collect();
        assert_eq!(order, vec![3, 1, 2]);
        assert_eq!(results[0].score, 4);
    }

    #[test]
    fn same_seed_same_match() {
        let players = make_human_and_bots(3);
        let mut a = started(&players);
        let mut b = started(&players);
        run_game_ticks(&mut a, 300, DT);
        run_game_ticks(&mut b, 300, DT);
        assert_eq!(a.serialize_state(), b.serialize_state());
    }

    #[test]
    fn player_joined_mid_match() {
        let mut game = started(&make_players(2));
        game.player_joined(&Player::bot(9, "Late"));
        game.player_joined(&Player::bot(9, "Late"));
        assert_eq!(game.state.karts.len(), 3);
        assert!(game.ai_controller(9).is_some());
    }

    // ================================================================
    // Simulation contract
    // ================================================================

    #[test]
    fn contract_init_creates_player_state() {
        let mut game = KartArena::default();
        test_helpers::contract_init_creates_player_state(&mut game, 4);
    }

    #[test]
    fn contract_apply_input_changes_state() {
        let mut game = started(&make_players(2));
        let input = encode(&KartInput {
            accelerate: true,
            ..Default::default()
        });
        test_helpers::contract_apply_input_changes_state(&mut game, &input, 1);
    }

    #[test]
    fn contract_update_advances_time() {
        let mut game = started(&make_players(2));
        test_helpers::contract_update_advances_time(&mut game);
    }

    #[test]
    fn contract_round_eventually_completes() {
        let mut game = KartArena::default();
        game.init(&make_human_and_bots(3), &default_config(90));
        test_helpers::contract_round_eventually_completes(&mut game, 100);
    }

    #[test]
    fn contract_state_roundtrip_preserves() {
        let mut game = started(&make_human_and_bots(2));
        run_game_ticks(&mut game, 60, DT);
        test_helpers::contract_state_roundtrip_preserves(&mut game);
    }

    #[test]
    fn contract_pause_stops_updates() {
        let mut game = started(&make_players(2));
        test_helpers::contract_pause_stops_updates(&mut game);
    }

    #[test]
    fn contract_player_left_cleanup() {
        let mut game = started(&make_players(3));
        test_helpers::contract_player_left_cleanup(&mut game, 2, 3);
        assert!(game.state.kart(2).is_none());
    }

    #[test]
    fn contract_round_results_complete() {
        let game = started(&make_players(4));
        test_helpers::contract_round_results_complete(&game, 4);
    }
}
