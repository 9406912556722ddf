use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use kartwar_core::events::SoundCue;
use kartwar_core::game_trait::PlayerId;

use crate::config::KartConfig;
use crate::math::{Vec2, normalize_angle};
use crate::powerups::{ActivePowerUp, PowerUpKind};
use crate::weapons::WeaponKind;

/// How long the hit flash lasts after taking damage.
pub const HIT_FLASH_DURATION: f32 = 0.15;

/// Per-tick control snapshot, from a human or synthesized by the AI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KartInput {
    pub accelerate: bool,
    pub brake: bool,
    pub steer_left: bool,
    pub steer_right: bool,
    pub drift: bool,
    pub fire: bool,
    pub boost: bool,
}

impl KartInput {
    /// -1 for left, +1 for right, 0 when neither or both are held.
    pub fn steer_axis(&self) -> f32 {
        f32::from(i8::from(self.steer_right) - i8::from(self.steer_left))
    }
}

/// Stat modifiers derived from active power-up effects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    pub speed_multiplier: f32,
    pub damage_multiplier: f32,
    pub fire_rate_multiplier: f32,
    pub damage_reduction: f32,
    pub has_shield: bool,
    pub invincible: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            damage_multiplier: 1.0,
            fire_rate_multiplier: 1.0,
            damage_reduction: 0.0,
            has_shield: false,
            invincible: false,
        }
    }
}

impl Modifiers {
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

/// Boost resource and the currently applied boost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostState {
    pub charge: f32,
    pub multiplier: f32,
    /// Seconds of boost left; zero when not boosting.
    pub remaining: f32,
}

impl BoostState {
    fn idle(charge: f32) -> Self {
        Self {
            charge,
            multiplier: 1.0,
            remaining: 0.0,
        }
    }

    pub fn is_boosting(&self) -> bool {
        self.remaining > 0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftState {
    pub engaged: bool,
    /// Accumulated drift-boost meter.
    pub charge: f32,
}

/// A skid point left while drifting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TireMark {
    pub pos: Vec2,
    pub age: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KartStats {
    pub kills: u32,
    pub deaths: u32,
    pub damage_dealt: f32,
}

/// Result of [`Kart::take_damage`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Dead or invincible; nothing happened.
    Ignored,
    /// A shield absorbed the hit and was consumed.
    Blocked,
    /// Health reduced by the contained amount.
    Damaged(f32),
    /// The contained amount was lethal; the kart is now dead.
    Killed(f32),
}

/// A combat vehicle, driven by a human or an AI controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kart {
    pub id: PlayerId,
    pub name: String,
    pub is_bot: bool,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Heading in radians, normalized to (-π, π].
    pub rotation: f32,
    pub radius: f32,
    pub alive: bool,
    pub health: f32,
    pub max_health: f32,
    pub respawn_timer: f32,
    pub respawn_delay: f32,
    pub weapon: Option<WeaponKind>,
    pub ammo: u32,
    pub fire_cooldown: f32,
    pub active_powerups: Vec<ActivePowerUp>,
    pub modifiers: Modifiers,
    pub boost: BoostState,
    pub drift: DriftState,
    pub tire_marks: VecDeque<TireMark>,
    pub hit_flash: f32,
    /// Post-respawn invulnerability, lifted by the orchestrator.
    pub spawn_protection: f32,
    pub stats: KartStats,
}

impl Kart {
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        is_bot: bool,
        pos: Vec2,
        rotation: f32,
        config: &KartConfig,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            is_bot,
            pos,
            vel: Vec2::ZERO,
            rotation: normalize_angle(rotation),
            radius: config.radius,
            alive: true,
            health: config.max_health,
            max_health: config.max_health,
            respawn_timer: 0.0,
            respawn_delay: 3.0,
            weapon: None,
            ammo: 0,
            fire_cooldown: 0.0,
            active_powerups: Vec::new(),
            modifiers: Modifiers::default(),
            boost: BoostState::idle(config.boost_charge_max),
            drift: DriftState::default(),
            tire_marks: VecDeque::new(),
            hit_flash: 0.0,
            spawn_protection: 0.0,
            stats: KartStats::default(),
        }
    }

    pub fn forward(&self) -> Vec2 {
        Vec2::from_angle(self.rotation)
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Signed speed along the heading; negative while reversing.
    pub fn forward_speed(&self) -> f32 {
        self.vel.dot(self.forward())
    }

    /// Base top speed scaled by the speed and boost multipliers.
    pub fn effective_max_speed(&self, config: &KartConfig) -> f32 {
        config.max_speed * self.modifiers.speed_multiplier * self.boost.multiplier
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    pub fn is_invincible(&self) -> bool {
        self.modifiers.invincible || self.spawn_protection > 0.0
    }

    pub fn ready_to_respawn(&self) -> bool {
        !self.alive && self.respawn_timer <= 0.0
    }

    pub fn has_effect(&self, kind: PowerUpKind) -> bool {
        self.active_powerups
            .iter()
            .any(|fx| fx.active && fx.kind == kind)
    }

    /// Advance one tick. Dead karts only count down their respawn timer.
    ///
    /// Returns the sound cue for a boost that started this tick, if any.
    pub fn update(&mut self, dt: f32, input: &KartInput, config: &KartConfig) -> Option<SoundCue> {
        if !self.alive {
            self.respawn_timer = (self.respawn_timer - dt).max(0.0);
            return None;
        }
        let mut cue = None;
        self.fire_cooldown = (self.fire_cooldown - dt).max(0.0);

        // 1. Timed effects
        self.tick_effects(dt);

        // 2-3. Boost duration, then passive recharge
        if self.boost.is_boosting() {
            self.boost.remaining -= dt;
            if self.boost.remaining <= 0.0 {
                self.boost.remaining = 0.0;
                self.boost.multiplier = 1.0;
            }
        } else {
            self.boost.charge = (self.boost.charge + config.boost_recharge_rate * dt)
                .min(config.boost_charge_max);
        }
        if input.boost && self.try_boost(config) {
            cue = Some(SoundCue::Boost);
        }

        // 4. Effective top speed
        let max_speed = self.effective_max_speed(config);
        let speed_fraction = if max_speed > 0.0 {
            (self.speed() / max_speed).min(1.0)
        } else {
            0.0
        };

        // 5. Turning
        let mut turn_rate = config.turn_speed * (1.0 - config.turn_speed_falloff * speed_fraction);
        if self.drift.engaged {
            turn_rate *= config.drift_turn_multiplier;
        }
        self.rotation = normalize_angle(self.rotation + input.steer_axis() * turn_rate * dt);
        let forward = self.forward();

        // 6. Throttle
        if input.accelerate {
            self.vel += forward * (config.acceleration * dt);
        }

        // 7. Brake, or reverse thrust once nearly stopped
        if input.brake {
            let fs = self.vel.dot(forward);
            if fs > config.reverse_floor {
                let slowed = (fs - config.brake_deceleration * dt).max(0.0);
                self.vel += forward * (slowed - fs);
            } else {
                self.vel -= forward * (config.acceleration * 0.5 * dt);
            }
        }

        // 8. Drift entry, charge and release
        if input.drift {
            if !self.drift.engaged && self.speed() >= config.drift_min_speed_fraction * max_speed
            {
                self.drift.engaged = true;
                self.drift.charge = 0.0;
            }
            if self.drift.engaged {
                self.drift.charge =
                    (self.drift.charge + config.drift_charge_rate * dt).min(config.drift_charge_max);
            }
        } else if self.drift.engaged {
            self.drift.engaged = false;
            if self.drift.charge > config.drift_boost_threshold {
                self.boost.multiplier = self.boost.multiplier.max(config.drift_boost_multiplier);
                self.boost.remaining = self.boost.remaining.max(self.drift.charge * 0.5);
                cue = cue.or(Some(SoundCue::DriftBoost));
            }
            self.drift.charge = 0.0;
        }

        // 9. Lateral grip
        let along = forward * self.vel.dot(forward);
        let lateral = self.vel - along;
        let grip = if self.drift.engaged {
            config.drift_grip
        } else {
            config.lateral_grip
        };
        self.vel -= lateral * grip;

        // 10. Rolling friction when coasting
        if !input.accelerate && !input.brake {
            self.vel = self.vel * (-config.friction * dt).exp();
        }

        // 11. Speed caps; the drift release above may have raised the boost
        let max_speed = self.effective_max_speed(config);
        if self.vel.dot(forward) < 0.0 {
            self.vel = self.vel.clamp_length(max_speed * config.reverse_speed_fraction);
        } else {
            self.vel = self.vel.clamp_length(max_speed);
        }

        // 12. Integrate
        self.pos += self.vel * dt;

        // 13. Skid trail
        for mark in &mut self.tire_marks {
            mark.age += dt;
        }
        while self
            .tire_marks
            .front()
            .is_some_and(|m| m.age >= config.tire_mark_lifetime)
        {
            self.tire_marks.pop_front();
        }
        if self.drift.engaged && self.speed() > config.tire_mark_speed_fraction * max_speed {
            self.tire_marks.push_back(TireMark {
                pos: self.pos,
                age: 0.0,
            });
            while self.tire_marks.len() > config.max_tire_marks {
                self.tire_marks.pop_front();
            }
        }

        // 14. Hit flash
        self.hit_flash = (self.hit_flash - dt).max(0.0);

        cue
    }

    /// Spend a full boost charge. Returns `false` if not charged or already boosting.
    pub fn try_boost(&mut self, config: &KartConfig) -> bool {
        if !self.alive || self.boost.is_boosting() || self.boost.charge < config.boost_charge_max {
            return false;
        }
        self.boost.charge = 0.0;
        self.boost.multiplier = config.boost_multiplier;
        self.boost.remaining = config.boost_duration;
        true
    }

    /// Count effects down, reverting each one exactly once as it expires.
    fn tick_effects(&mut self, dt: f32) {
        for fx in &mut self.active_powerups {
            if fx.tick(dt) {
                fx.kind.deactivate(&mut self.modifiers);
            }
        }
        self.active_powerups.retain(|fx| fx.active);
    }

    /// Force-expire every active effect and drop them.
    pub fn clear_effects(&mut self) {
        for fx in &mut self.active_powerups {
            if fx.expire() {
                fx.kind.deactivate(&mut self.modifiers);
            }
        }
        self.active_powerups.clear();
    }

    /// Apply incoming damage after armor. Dead and invincible karts ignore
    /// it; a shield absorbs the whole hit and is used up.
    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.alive || self.is_invincible() {
            return DamageOutcome::Ignored;
        }
        if self.modifiers.has_shield {
            for fx in &mut self.active_powerups {
                if fx.kind == PowerUpKind::Shield && fx.expire() {
                    fx.kind.deactivate(&mut self.modifiers);
                }
            }
            self.active_powerups.retain(|fx| fx.active);
            // A shield flag without a backing effect is cleared all the same
            self.modifiers.has_shield = false;
            return DamageOutcome::Blocked;
        }

        let applied = amount * (1.0 - self.modifiers.damage_reduction).max(0.0);
        self.health -= applied;
        self.hit_flash = HIT_FLASH_DURATION;
        if self.health <= 0.0 {
            self.die();
            return DamageOutcome::Killed(applied);
        }
        DamageOutcome::Damaged(applied)
    }

    /// Transition to dead. Returns `false` if already dead.
    ///
    /// Every active effect is force-expired and the modifiers end neutral,
    /// so nothing carries over into the next life.
    pub fn die(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        self.health = 0.0;
        self.stats.deaths += 1;
        self.clear_effects();
        self.modifiers = Modifiers::default();
        self.vel = Vec2::ZERO;
        self.fire_cooldown = 0.0;
        self.boost.multiplier = 1.0;
        self.boost.remaining = 0.0;
        self.drift = DriftState::default();
        self.spawn_protection = 0.0;
        self.respawn_timer = self.respawn_delay;
        true
    }

    /// A kill always credits the victim's full max health as damage dealt.
    pub fn credit_kill(&mut self, victim_max_health: f32) {
        self.stats.kills += 1;
        self.stats.damage_dealt += victim_max_health;
    }

    pub fn credit_damage(&mut self, amount: f32) {
        self.stats.damage_dealt += amount;
    }

    /// Bring the kart back at `pos`, unarmed, with full health and a window
    /// of spawn protection.
    pub fn respawn(&mut self, pos: Vec2, heading: f32, protection: f32) {
        self.clear_effects();
        self.modifiers = Modifiers::default();
        self.alive = true;
        self.health = self.max_health;
        self.pos = pos;
        self.vel = Vec2::ZERO;
        self.rotation = normalize_angle(heading);
        self.respawn_timer = 0.0;
        self.weapon = None;
        self.ammo = 0;
        self.fire_cooldown = 0.0;
        self.drift = DriftState::default();
        self.tire_marks.clear();
        self.hit_flash = 0.0;
        self.spawn_protection = protection;
    }

    /// Count down spawn protection. Returns `true` on the tick it lifts.
    pub fn tick_spawn_protection(&mut self, dt: f32) -> bool {
        if self.spawn_protection <= 0.0 {
            return false;
        }
        self.spawn_protection -= dt;
        if self.spawn_protection <= 0.0 {
            self.spawn_protection = 0.0;
            return true;
        }
        false
    }

    /// Pull the trigger. Returns the weapon fired, or `None` when dead,
    /// unarmed or still cooling down. The weapon is dropped when its last
    /// round is spent.
    pub fn fire(&mut self) -> Option<WeaponKind> {
        if !self.alive || self.fire_cooldown > 0.0 {
            return None;
        }
        let kind = self.weapon?;
        if self.ammo == 0 {
            self.weapon = None;
            return None;
        }
        self.ammo -= 1;
        self.fire_cooldown = kind.cooldown(self.modifiers.fire_rate_multiplier);
        if self.ammo == 0 {
            self.weapon = None;
        }
        Some(kind)
    }

    /// Replace the held weapon with a full load of `kind`.
    pub fn equip(&mut self, kind: WeaponKind) {
        self.weapon = Some(kind);
        self.ammo = kind.def().ammo;
    }
}

#[cfg(test)]
pub(crate) fn test_kart(id: PlayerId, pos: Vec2, config: &KartConfig) -> Kart {
    Kart::new(id, format!("Kart{id}"), false, pos, 0.0, config)
}
