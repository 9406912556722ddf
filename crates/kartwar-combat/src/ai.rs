//! AI drivers.
//!
//! Each bot owns an [`AiController`] that re-decides its behavior state on a
//! fixed cadence and synthesizes a [`KartInput`] every tick. Targets and
//! pickups are held as ids and revalidated against the live world before
//! every use.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::f32::consts::FRAC_PI_2;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use kartwar_core::game_trait::PlayerId;

use crate::arena::Arena;
use crate::config::{AiConfig, CombatConfig};
use crate::kart::{Kart, KartInput};
use crate::math::{Vec2, normalize_angle};
use crate::mine::Mine;
use crate::pickup::{Pickup, PickupKind};
use crate::powerups::PowerUpKind;
use crate::projectile::Projectile;
use crate::weapons::WeaponKind;

/// Distance at which a bot drops a mine on a pursuer.
const MINE_DROP_RANGE: f32 = 180.0;
/// How far ahead of itself a dodging bot aims.
const DODGE_DISTANCE: f32 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiState {
    Wander,
    Chase,
    Attack,
    Flee,
    Collect,
    Evade,
}

/// Skill profile of an AI driver. All factors are in [0, 1] except
/// `reaction_time`, which is in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    pub accuracy: f32,
    pub reaction_time: f32,
    pub aggressiveness: f32,
    pub prediction_accuracy: f32,
    pub avoidance_skill: f32,
    pub pickup_priority: f32,
}

impl Difficulty {
    pub fn easy() -> Self {
        Self {
            accuracy: 0.4,
            reaction_time: 0.6,
            aggressiveness: 0.3,
            prediction_accuracy: 0.2,
            avoidance_skill: 0.4,
            pickup_priority: 0.5,
        }
    }

    pub fn medium() -> Self {
        Self {
            accuracy: 0.7,
            reaction_time: 0.35,
            aggressiveness: 0.6,
            prediction_accuracy: 0.6,
            avoidance_skill: 0.7,
            pickup_priority: 0.7,
        }
    }

    pub fn hard() -> Self {
        Self {
            accuracy: 0.92,
            reaction_time: 0.18,
            aggressiveness: 0.85,
            prediction_accuracy: 0.9,
            avoidance_skill: 0.95,
            pickup_priority: 0.8,
        }
    }

    /// Preset by name; anything unrecognized is medium.
    pub fn from_name(name: &str) -> Self {
        match name {
            "easy" => Self::easy(),
            "hard" => Self::hard(),
            _ => Self::medium(),
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::medium()
    }
}

/// Read-only slice of the world an AI driver reasons about.
pub struct AiView<'a> {
    pub karts: &'a [Kart],
    pub projectiles: &'a [Projectile],
    pub mines: &'a [Mine],
    pub pickups: &'a [Pickup],
    pub arena: &'a Arena,
}

impl AiView<'_> {
    fn kart(&self, id: PlayerId) -> Option<&Kart> {
        self.karts.iter().find(|k| k.id == id && k.alive)
    }

    fn pickup(&self, id: u64) -> Option<&Pickup> {
        self.pickups.iter().find(|p| p.id == id && p.active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AiAction {
    Fire,
}

/// An action waiting out the driver's reaction time.
#[derive(Debug, Clone, Copy)]
struct PendingAction {
    due: f32,
    action: AiAction,
}

impl PartialEq for PendingAction {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingAction {}

impl PartialOrd for PendingAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingAction {
    // Reversed so the max-heap yields the earliest due time first
    fn cmp(&self, other: &Self) -> Ordering {
        other.due.total_cmp(&self.due)
    }
}

/// Situational analysis from one decision cycle.
#[derive(Debug, Clone, Copy, Default)]
struct Assessment {
    nearest_hostile: Option<(PlayerId, f32)>,
    wanted_pickup: Option<(u64, f32)>,
    danger: f32,
    threat_dir: Vec2,
}

/// Decision state for one AI driver.
#[derive(Debug, Clone)]
pub struct AiController {
    pub kart_id: PlayerId,
    pub difficulty: Difficulty,
    pub state: AiState,
    pub state_entered: f32,
    pub decision_timer: f32,
    pub target: Option<PlayerId>,
    pub pickup_target: Option<u64>,
    pub waypoint: Option<Vec2>,
    pub danger_level: f32,
    threat_dir: Vec2,
    aim_offset: f32,
    evade_side: f32,
    pending: BinaryHeap<PendingAction>,
    clock: f32,
    rng: StdRng,
}

impl AiController {
    pub fn new(kart_id: PlayerId, difficulty: Difficulty, seed: u64) -> Self {
        Self {
            kart_id,
            difficulty,
            state: AiState::Wander,
            state_entered: 0.0,
            decision_timer: 0.0,
            target: None,
            pickup_target: None,
            waypoint: None,
            danger_level: 0.0,
            threat_dir: Vec2::ZERO,
            aim_offset: 0.0,
            evade_side: 1.0,
            pending: BinaryHeap::new(),
            clock: 0.0,
            rng: StdRng::seed_from_u64(seed ^ kart_id.wrapping_mul(0x9e37_79b9_7f4a_7c15)),
        }
    }

    pub fn pending_actions(&self) -> usize {
        self.pending.len()
    }

    /// Drop every queued action, e.g. when the kart dies.
    pub fn cancel_pending(&mut self) {
        self.pending.clear();
    }

    /// Advance the controller and produce this tick's input.
    pub fn update(&mut self, dt: f32, view: &AiView<'_>, config: &CombatConfig) -> KartInput {
        self.clock += dt;
        let Some(me) = view.karts.iter().find(|k| k.id == self.kart_id) else {
            return KartInput::default();
        };
        if !me.alive {
            self.cancel_pending();
            self.enter(AiState::Wander);
            self.target = None;
            self.pickup_target = None;
            return KartInput::default();
        }

        self.decision_timer -= dt;
        if self.decision_timer <= 0.0 {
            self.decision_timer = config.ai.decision_interval;
            let assessment = self.assess(me, view, &config.ai);
            self.decide(me, view, &assessment, &config.ai);
        }
        self.revalidate(view);

        let mut input = match self.state {
            AiState::Wander => self.wander(me, view.arena, &config.ai),
            AiState::Chase => self.chase(me, view, &config.ai),
            AiState::Attack => self.attack(me, view, &config.ai),
            AiState::Flee => self.flee(me, view, &config.ai),
            AiState::Collect => self.collect(me, view, &config.ai),
            AiState::Evade => self.evade(me, config),
        };
        self.avoid_walls(me, view.arena, &config.ai, &mut input);

        while self.pending.peek().is_some_and(|a| a.due <= self.clock) {
            if let Some(PendingAction {
                action: AiAction::Fire,
                ..
            }) = self.pending.pop()
            {
                input.fire = true;
            }
        }
        input
    }

    /// Aggregate threat score in [0, 1].
    ///
    /// Incoming projectiles count by how squarely they are headed at us and
    /// how close they are; armed mines count at half weight by proximity.
    pub fn danger_level(
        me: &Kart,
        projectiles: &[Projectile],
        mines: &[Mine],
        config: &AiConfig,
    ) -> (f32, Vec2) {
        let mut danger = 0.0;
        let mut threat = Vec2::ZERO;
        for p in projectiles.iter().filter(|p| p.active && p.owner != me.id) {
            let dist = p.pos.distance(me.pos);
            if dist >= config.projectile_danger_radius {
                continue;
            }
            let toward = (me.pos - p.pos).normalize_or_zero();
            let alignment = p.direction().dot(toward);
            if alignment <= 0.0 {
                continue;
            }
            let weight = alignment * (1.0 - dist / config.projectile_danger_radius);
            danger += weight;
            threat += p.direction() * weight;
        }
        for mine in mines.iter().filter(|m| m.is_armed() && m.owner != me.id) {
            let dist = mine.pos.distance(me.pos);
            if dist >= config.mine_danger_radius {
                continue;
            }
            let weight = 0.5 * (1.0 - dist / config.mine_danger_radius);
            danger += weight;
            threat += (me.pos - mine.pos).normalize_or_zero() * weight;
        }
        (f32::min(danger, 1.0), threat)
    }

    fn assess(&self, me: &Kart, view: &AiView<'_>, config: &AiConfig) -> Assessment {
        let nearest_hostile = view
            .karts
            .iter()
            .filter(|k| k.alive && k.id != me.id)
            .map(|k| (k.id, k.pos.distance(me.pos), k.pos))
            .filter(|&(_, d, pos)| d <= config.sight_range && view.arena.line_of_sight(me.pos, pos))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, d, _)| (id, d));

        let wanted_pickup = view
            .pickups
            .iter()
            .filter(|p| p.active && wants(me, p))
            .map(|p| (p.id, p.pos.distance(me.pos), p.pos))
            .filter(|&(_, d, pos)| {
                d <= config.sight_range * self.difficulty.pickup_priority
                    && view.arena.line_of_sight(me.pos, pos)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, d, _)| (id, d));

        let (danger, threat_dir) = Self::danger_level(me, view.projectiles, view.mines, config);
        Assessment {
            nearest_hostile,
            wanted_pickup,
            danger,
            threat_dir,
        }
    }

    /// Priority-ordered transition.
    fn decide(&mut self, me: &Kart, view: &AiView<'_>, a: &Assessment, config: &AiConfig) {
        self.danger_level = a.danger;
        self.threat_dir = a.threat_dir;
        self.target = a.nearest_hostile.map(|(id, _)| id);
        self.pickup_target = a.wanted_pickup.map(|(id, _)| id);

        let next = if a.danger >= config.evade_threshold {
            AiState::Evade
        } else if a.nearest_hostile.is_some()
            && me.health_fraction() < config.flee_health_fraction
            && self.difficulty.aggressiveness < config.flee_aggressiveness
        {
            AiState::Flee
        } else if let (Some(weapon), Some((_, dist))) = (me.weapon, a.nearest_hostile)
            && dist <= engagement_range(weapon)
        {
            AiState::Attack
        } else if a.wanted_pickup.is_some() {
            AiState::Collect
        } else if a
            .nearest_hostile
            .is_some_and(|(_, dist)| dist <= config.chase_range)
        {
            AiState::Chase
        } else {
            AiState::Wander
        };
        self.enter(next);
        if next == AiState::Wander && self.waypoint.is_none() {
            self.waypoint = Some(self.random_waypoint(me, view.arena, config));
        }
    }

    fn enter(&mut self, next: AiState) {
        if next == self.state {
            return;
        }
        if self.state == AiState::Attack {
            self.cancel_pending();
        }
        self.state = next;
        self.state_entered = self.clock;
        match next {
            AiState::Attack => {
                let spread = 1.0 - self.difficulty.accuracy;
                self.aim_offset = self.rng.random_range(-1.0..=1.0) * spread;
            },
            AiState::Evade => {
                self.evade_side = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
            },
            _ => {},
        }
    }

    /// Drop stale references; a vanished target sends us back to wandering.
    fn revalidate(&mut self, view: &AiView<'_>) {
        if self.target.is_some_and(|id| view.kart(id).is_none()) {
            self.target = None;
            if matches!(self.state, AiState::Chase | AiState::Attack | AiState::Flee) {
                self.enter(AiState::Wander);
            }
        }
        if self.pickup_target.is_some_and(|id| view.pickup(id).is_none()) {
            self.pickup_target = None;
            if self.state == AiState::Collect {
                self.enter(AiState::Wander);
            }
        }
    }

    fn random_waypoint(&mut self, me: &Kart, arena: &Arena, config: &AiConfig) -> Vec2 {
        let margin = config.edge_margin + me.radius * 2.0;
        let x = self.rng.random_range(0.0..=arena.width);
        let y = self.rng.random_range(0.0..=arena.height);
        arena.clamp_inside(Vec2::new(x, y), margin)
    }

    fn wander(&mut self, me: &Kart, arena: &Arena, config: &AiConfig) -> KartInput {
        let reached = self
            .waypoint
            .is_none_or(|w| w.distance(me.pos) < config.waypoint_radius);
        if reached {
            self.waypoint = Some(self.random_waypoint(me, arena, config));
        }
        let goal = self.waypoint.unwrap_or(me.pos);
        steer_toward(me, goal, config)
    }

    fn chase(&mut self, me: &Kart, view: &AiView<'_>, config: &AiConfig) -> KartInput {
        match self.target.and_then(|id| view.kart(id)) {
            Some(target) => steer_toward(me, target.pos, config),
            None => self.wander(me, view.arena, config),
        }
    }

    fn attack(&mut self, me: &Kart, view: &AiView<'_>, config: &AiConfig) -> KartInput {
        let (Some(target), Some(weapon)) = (self.target.and_then(|id| view.kart(id)), me.weapon)
        else {
            return self.wander(me, view.arena, config);
        };
        let dist = target.pos.distance(me.pos);
        let def = weapon.def();

        if weapon == WeaponKind::Mine {
            // Mines are dropped behind; run ahead and release when close
            let away = me.pos + (me.pos - target.pos).normalize_or_zero() * config.flee_distance;
            let input = steer_toward(me, view.arena.clamp_inside(away, config.edge_margin), config);
            if dist <= MINE_DROP_RANGE {
                self.queue_fire(me);
            }
            return input;
        }

        let lead = if def.projectile_speed > 0.0 {
            target.vel * (dist / def.projectile_speed * self.difficulty.prediction_accuracy)
        } else {
            Vec2::ZERO
        };
        let predicted = target.pos + lead;
        let aim = (predicted - me.pos).angle() + self.aim_offset * config.max_aim_error;
        let aim_point = me.pos + Vec2::from_angle(aim) * dist.max(1.0);

        let mut input = steer_toward(me, aim_point, config);
        if dist < def.range * 0.4 {
            input.accelerate = false;
        }
        let bearing = normalize_angle(aim - me.rotation).abs();
        if bearing <= config.fire_tolerance {
            self.queue_fire(me);
        }
        input
    }

    fn queue_fire(&mut self, me: &Kart) {
        if me.fire_cooldown > 0.0 || !self.pending.is_empty() {
            return;
        }
        let jitter = self.rng.random_range(0.5..=1.5);
        self.pending.push(PendingAction {
            due: self.clock + self.difficulty.reaction_time * jitter,
            action: AiAction::Fire,
        });
    }

    fn flee(&mut self, me: &Kart, view: &AiView<'_>, config: &AiConfig) -> KartInput {
        let health_nearby = view
            .pickups
            .iter()
            .filter(|p| p.active && p.kind == PickupKind::PowerUp(PowerUpKind::Health))
            .map(|p| (p.pos, p.pos.distance(me.pos)))
            .filter(|&(_, d)| d < config.flee_health_detour)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((pos, _)) = health_nearby {
            return steer_toward(me, pos, config);
        }
        let Some(threat) = self.target.and_then(|id| view.kart(id)) else {
            return self.wander(me, view.arena, config);
        };
        let away = me.pos + (me.pos - threat.pos).normalize_or_zero() * config.flee_distance;
        steer_toward(me, view.arena.clamp_inside(away, config.edge_margin), config)
    }

    fn collect(&mut self, me: &Kart, view: &AiView<'_>, config: &AiConfig) -> KartInput {
        match self.pickup_target.and_then(|id| view.pickup(id)) {
            Some(pickup) => steer_toward(me, pickup.pos, config),
            None => self.wander(me, view.arena, config),
        }
    }

    fn evade(&mut self, me: &Kart, config: &CombatConfig) -> KartInput {
        let threat = if self.threat_dir.length_squared() > 0.0 {
            self.threat_dir.normalize_or_zero()
        } else {
            me.forward()
        };
        let dodge = threat.perp() * self.evade_side;
        let mut input = steer_toward(me, me.pos + dodge * DODGE_DISTANCE, &config.ai);
        input.accelerate = true;
        input.brake = false;
        let fast_enough =
            me.speed() >= config.kart.drift_min_speed_fraction * me.effective_max_speed(&config.kart);
        input.drift = fast_enough;
        input
    }

    /// Override steering when about to run into the arena edge or geometry.
    fn avoid_walls(&self, me: &Kart, arena: &Arena, config: &AiConfig, input: &mut KartInput) {
        let skill = self.difficulty.avoidance_skill;
        let look = me.radius + config.edge_margin * (0.5 + skill) + me.speed() * 0.3 * skill;
        let probe = me.pos + me.forward() * look;
        let near_edge = !arena
            .bounds()
            .contains(probe)
            || probe.x < config.edge_margin
            || probe.y < config.edge_margin
            || probe.x > arena.width - config.edge_margin
            || probe.y > arena.height - config.edge_margin;
        let blocked = arena.wall_overlap(probe, me.radius * 0.5).is_some()
            || arena.obstacle_overlap(probe, me.radius * 0.5).is_some();
        if !near_edge && !blocked {
            return;
        }
        let center = Vec2::new(arena.width / 2.0, arena.height / 2.0);
        let err = normalize_angle((center - me.pos).angle() - me.rotation);
        input.steer_left = err < 0.0;
        input.steer_right = err >= 0.0;
        if err.abs() > FRAC_PI_2 {
            input.accelerate = false;
            input.brake = me.forward_speed() > 0.0;
        }
    }
}

/// Whether a bot would go out of its way for this pickup.
fn wants(me: &Kart, pickup: &Pickup) -> bool {
    match pickup.kind {
        PickupKind::Weapon(_) => me.weapon.is_none(),
        PickupKind::PowerUp(PowerUpKind::Health) => me.health < me.max_health,
        PickupKind::PowerUp(PowerUpKind::AmmoRefill) => me.weapon.is_some(),
        PickupKind::PowerUp(kind) => !me.has_effect(kind),
    }
}

/// Distance at which a bot holding `weapon` starts an attack run.
fn engagement_range(weapon: WeaponKind) -> f32 {
    match weapon {
        WeaponKind::Mine => MINE_DROP_RANGE * 2.0,
        other => other.def().range * 0.8,
    }
}

/// Turn a goal point into throttle and steering.
///
/// Small bearing errors inside the dead-zone drive straight; large ones
/// ease off the throttle, and a goal far enough behind is reached by
/// braking into reverse.
pub fn steer_toward(me: &Kart, goal: Vec2, config: &AiConfig) -> KartInput {
    let to_goal = goal - me.pos;
    if to_goal.length_squared() < 1.0 {
        return KartInput::default();
    }
    let err = normalize_angle(to_goal.angle() - me.rotation);
    let mut input = KartInput::default();

    if err.abs() > config.reverse_bearing {
        // Backing up: steer the tail toward the goal
        input.brake = true;
        input.steer_left = err > 0.0;
        input.steer_right = err < 0.0;
        return input;
    }
    if err > config.steer_dead_zone {
        input.steer_right = true;
    } else if err < -config.steer_dead_zone {
        input.steer_left = true;
    }
    input.accelerate = err.abs() < FRAC_PI_2 || me.forward_speed() < 60.0;
    input
}
