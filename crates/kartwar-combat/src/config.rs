use serde::{Deserialize, Serialize};

use kartwar_core::error::SimError;

use crate::arena::ArenaSize;

/// Kart handling and durability parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KartConfig {
    /// Collision radius (units).
    pub radius: f32,
    /// Base top speed before multipliers (units/s).
    pub max_speed: f32,
    /// Forward thrust (units/s²).
    pub acceleration: f32,
    /// Braking deceleration (units/s²).
    pub brake_deceleration: f32,
    /// Forward speed below which braking turns into reverse thrust.
    pub reverse_floor: f32,
    /// Fraction of effective top speed allowed in reverse.
    pub reverse_speed_fraction: f32,
    /// Turn rate at standstill (rad/s).
    pub turn_speed: f32,
    /// Maximum turn-rate reduction at top speed (0.3 = 30% slower).
    pub turn_speed_falloff: f32,
    /// Turn rate multiplier while drifting.
    pub drift_turn_multiplier: f32,
    /// Fraction of sideways velocity removed per tick.
    pub lateral_grip: f32,
    /// Fraction of sideways velocity removed per tick while drifting.
    pub drift_grip: f32,
    /// Exponential longitudinal friction rate when coasting (1/s).
    pub friction: f32,
    /// Speed fraction of effective top speed required to start a drift.
    pub drift_min_speed_fraction: f32,
    /// Drift meter gain per second of drifting.
    pub drift_charge_rate: f32,
    /// Drift meter cap (seconds of charge).
    pub drift_charge_max: f32,
    /// Drift meter needed on release to earn a boost.
    pub drift_boost_threshold: f32,
    /// Speed multiplier granted by a drift boost.
    pub drift_boost_multiplier: f32,
    /// Boost resource cap.
    pub boost_charge_max: f32,
    /// Boost resource regained per second while not boosting.
    pub boost_recharge_rate: f32,
    /// Speed multiplier of a full-charge boost.
    pub boost_multiplier: f32,
    /// Duration of a full-charge boost (s).
    pub boost_duration: f32,
    /// Minimum speed for drift tire marks (fraction of effective top speed).
    pub tire_mark_speed_fraction: f32,
    /// Tire marks kept per kart.
    pub max_tire_marks: usize,
    /// Lifetime of a tire mark (s).
    pub tire_mark_lifetime: f32,
    pub max_health: f32,
    /// Closing speed above which a kart-kart collision deals ram damage.
    pub ram_speed_threshold: f32,
    /// Ram damage per unit of closing speed.
    pub ram_damage_factor: f32,
    /// Restitution of kart-kart collisions.
    pub collision_elasticity: f32,
}

impl Default for KartConfig {
    fn default() -> Self {
        Self {
            radius: 20.0,
            max_speed: 320.0,
            acceleration: 420.0,
            brake_deceleration: 700.0,
            reverse_floor: 10.0,
            reverse_speed_fraction: 0.4,
            turn_speed: 3.2,
            turn_speed_falloff: 0.3,
            drift_turn_multiplier: 1.5,
            lateral_grip: 0.9,
            drift_grip: 0.35,
            friction: 1.8,
            drift_min_speed_fraction: 0.5,
            drift_charge_rate: 1.0,
            drift_charge_max: 2.0,
            drift_boost_threshold: 0.5,
            drift_boost_multiplier: 1.3,
            boost_charge_max: 100.0,
            boost_recharge_rate: 10.0,
            boost_multiplier: 1.5,
            boost_duration: 1.5,
            tire_mark_speed_fraction: 0.3,
            max_tire_marks: 64,
            tire_mark_lifetime: 2.0,
            max_health: 100.0,
            ram_speed_threshold: 150.0,
            ram_damage_factor: 0.05,
            collision_elasticity: 0.6,
        }
    }
}

/// AI driver tuning shared by every difficulty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Seconds between behavior re-evaluations.
    pub decision_interval: f32,
    /// Danger level at or above which the driver evades.
    pub evade_threshold: f32,
    /// Health fraction under which a timid driver flees.
    pub flee_health_fraction: f32,
    /// Aggressiveness under which a hurt driver flees instead of fighting.
    pub flee_aggressiveness: f32,
    /// How far a driver can see opponents and pickups.
    pub sight_range: f32,
    /// Distance at which a visible opponent is chased.
    pub chase_range: f32,
    /// Radius in which incoming projectiles add danger.
    pub projectile_danger_radius: f32,
    /// Radius in which armed mines add danger.
    pub mine_danger_radius: f32,
    /// Bearing dead-zone where no steering is applied (rad).
    pub steer_dead_zone: f32,
    /// Bearing error above which the driver reverses instead (rad).
    pub reverse_bearing: f32,
    /// Distance a fleeing driver tries to open up.
    pub flee_distance: f32,
    /// A health pickup closer than this diverts a fleeing driver.
    pub flee_health_detour: f32,
    /// Maximum aim error at zero accuracy (rad).
    pub max_aim_error: f32,
    /// Base facing tolerance before a shot is queued (rad).
    pub fire_tolerance: f32,
    /// Distance at which a wander waypoint counts as reached.
    pub waypoint_radius: f32,
    /// Margin from the arena edge treated as a wall by avoidance.
    pub edge_margin: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            decision_interval: 0.25,
            evade_threshold: 0.7,
            flee_health_fraction: 0.3,
            flee_aggressiveness: 0.5,
            sight_range: 650.0,
            chase_range: 700.0,
            projectile_danger_radius: 300.0,
            mine_danger_radius: 150.0,
            steer_dead_zone: 0.05,
            reverse_bearing: 2.2,
            flee_distance: 300.0,
            flee_health_detour: 250.0,
            max_aim_error: 0.35,
            fire_tolerance: 0.15,
            waypoint_radius: 80.0,
            edge_margin: 60.0,
        }
    }
}

/// Top-level match configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub kart: KartConfig,
    pub ai: AiConfig,
    pub round_duration_secs: f32,
    pub tick_rate_hz: f32,
    /// Seconds a destroyed kart waits before respawning.
    pub respawn_delay: f32,
    /// Invincibility window after a respawn (s).
    pub spawn_protection: f32,
    /// Kills needed to end the match early (0 disables).
    pub kill_limit: u32,
    pub max_weapon_pickups: usize,
    pub max_powerup_pickups: usize,
    /// Seconds between pickup spawn attempts.
    pub pickup_spawn_interval: f32,
    pub pickup_radius: f32,
    /// Seconds a destroyed obstacle lingers before removal.
    pub obstacle_grace: f32,
    pub arena_size: ArenaSize,
    pub seed: u64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            kart: KartConfig::default(),
            ai: AiConfig::default(),
            round_duration_secs: 180.0,
            tick_rate_hz: 60.0,
            respawn_delay: 3.0,
            spawn_protection: 2.0,
            kill_limit: 10,
            max_weapon_pickups: 4,
            max_powerup_pickups: 4,
            pickup_spawn_interval: 5.0,
            pickup_radius: 18.0,
            obstacle_grace: 0.5,
            arena_size: ArenaSize::Default,
            seed: 0x6b61_7274,
        }
    }
}

impl CombatConfig {
    /// Load config from `KARTWAR_CONFIG` or `config/kartwar.toml`. Falls back to
    /// defaults if the file is missing or unparseable.
    pub fn load() -> Self {
        let path =
            std::env::var("KARTWAR_CONFIG").unwrap_or_else(|_| "config/kartwar.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => match Self::from_toml(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    Self::default()
                },
            },
            Err(_) => Self::default(),
        }
    }

    /// Parse and sanity-check a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, SimError> {
        let cfg: Self =
            toml::from_str(content).map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that would stall or destabilize the tick loop.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.tick_rate_hz <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "tick_rate_hz must be positive, got {}",
                self.tick_rate_hz
            )));
        }
        if self.kart.radius <= 0.0 || self.kart.max_speed <= 0.0 {
            return Err(SimError::InvalidConfig(
                "kart radius and max_speed must be positive".to_string(),
            ));
        }
        if self.kart.max_health <= 0.0 {
            return Err(SimError::InvalidConfig(
                "kart max_health must be positive".to_string(),
            ));
        }
        if self.ai.decision_interval <= 0.0 {
            return Err(SimError::InvalidConfig(
                "ai decision_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(CombatConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = CombatConfig::from_toml(
            r#"
            kill_limit = 3

            [kart]
            max_speed = 400.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.kill_limit, 3);
        assert!((cfg.kart.max_speed - 400.0).abs() < f32::EPSILON);
        assert!((cfg.kart.radius - KartConfig::default().radius).abs() < f32::EPSILON);
        assert!((cfg.ai.evade_threshold - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn invalid_tick_rate_rejected() {
        let err = CombatConfig::from_toml("tick_rate_hz = 0.0").unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn garbage_toml_rejected() {
        assert!(CombatConfig::from_toml("kart = 5").is_err());
    }

    #[test]
    fn arena_size_parses_lowercase() {
        let cfg = CombatConfig::from_toml(r#"arena_size = "large""#).unwrap();
        assert_eq!(cfg.arena_size, ArenaSize::Large);
    }
}
