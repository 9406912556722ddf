//! Consolidated collision and combat resolution.
//!
//! Everything here runs inside one pass of the orchestrator tick, after
//! physics integration. Damage is idempotent per (projectile, target) via
//! hit-sets and per explosion via the damage latch, so the order of the
//! sub-passes only decides who sees a death first, never how often damage
//! lands.

use rand::Rng;
use smallvec::SmallVec;

use kartwar_core::events::SoundCue;
use kartwar_core::game_trait::{GameEvent, PlayerId};

use crate::KartArenaState;
use crate::arena::{Arena, ExplosionRequest, ObstacleHit};
use crate::config::{CombatConfig, KartConfig};
use crate::explosion::{Explosion, falloff};
use crate::kart::{DamageOutcome, Kart};
use crate::math::Vec2;
use crate::mine::Mine;
use crate::pickup::{Pickup, PickupKind};
use crate::powerups::apply_power_up;
use crate::projectile::Projectile;
use crate::scoring::ffa_score;
use crate::weapons::{EntityIds, Shot, spawn_shot};

fn sound(cue: SoundCue, at: Vec2) -> GameEvent {
    GameEvent::Sound {
        cue,
        x: at.x,
        y: at.y,
    }
}

pub fn kart_index(karts: &[Kart], id: PlayerId) -> Option<usize> {
    karts.iter().position(|k| k.id == id)
}

/// Damage the kart at `victim` and settle credit.
///
/// A hit that lands credits the applied damage to the attacker. A lethal hit
/// instead credits the kill plus the victim's full max health, and emits the
/// kill and score events. Self-inflicted damage is never credited.
pub fn apply_damage(
    karts: &mut [Kart],
    victim: usize,
    amount: f32,
    attacker: Option<PlayerId>,
    events: &mut Vec<GameEvent>,
) -> DamageOutcome {
    let Some(target) = karts.get_mut(victim) else {
        return DamageOutcome::Ignored;
    };
    let victim_id = target.id;
    let victim_max_health = target.max_health;
    let at = target.pos;
    let outcome = target.take_damage(amount);

    let credited = attacker
        .filter(|&id| id != victim_id)
        .and_then(|id| kart_index(karts, id));

    match outcome {
        DamageOutcome::Ignored => {},
        DamageOutcome::Blocked => events.push(sound(SoundCue::ShieldBlock, at)),
        DamageOutcome::Damaged(applied) => {
            events.push(sound(SoundCue::Hit, at));
            if let Some(idx) = credited {
                karts[idx].credit_damage(applied);
            }
        },
        DamageOutcome::Killed(_) => {
            events.push(sound(SoundCue::Death, at));
            let killer = credited.map(|idx| {
                let k = &mut karts[idx];
                k.credit_kill(victim_max_health);
                events.push(GameEvent::ScoreUpdate {
                    player_id: k.id,
                    score: ffa_score(&k.stats),
                });
                k.id
            });
            tracing::info!(victim = victim_id, ?killer, "Kart destroyed");
            events.push(GameEvent::Kill {
                killer,
                victim: victim_id,
            });
        },
    }
    outcome
}

/// Pull the kart's trigger and put the resulting shot into the world.
pub fn fire_weapon<R: Rng + ?Sized>(
    kart: &mut Kart,
    ids: &mut EntityIds,
    rng: &mut R,
    projectiles: &mut Vec<Projectile>,
    mines: &mut Vec<Mine>,
    events: &mut Vec<GameEvent>,
) -> bool {
    let Some(kind) = kart.fire() else {
        return false;
    };
    match spawn_shot(kart, kind, ids, rng) {
        Shot::Projectiles(shots) => {
            events.push(sound(SoundCue::Fire, kart.pos));
            projectiles.extend(shots);
        },
        Shot::Mine(mine) => {
            events.push(sound(SoundCue::MineDeployed, mine.pos));
            mines.push(mine);
        },
    }
    true
}

/// Circle-circle separation between every pair of living karts.
///
/// Overlap is split evenly, the closing velocity partially reflects along
/// the contact normal, and a hard enough impact rams both karts.
pub fn resolve_kart_collisions(
    karts: &mut [Kart],
    config: &KartConfig,
    events: &mut Vec<GameEvent>,
) {
    for j in 1..karts.len() {
        for i in 0..j {
            let (left, right) = karts.split_at_mut(j);
            let (a, b) = (&mut left[i], &mut right[0]);
            if !a.alive || !b.alive {
                continue;
            }
            let delta = b.pos - a.pos;
            let dist = delta.length();
            let reach = a.radius + b.radius;
            if dist >= reach {
                continue;
            }
            let normal = if dist > 1e-4 {
                delta * (1.0 / dist)
            } else {
                Vec2::new(1.0, 0.0)
            };
            let push = normal * ((reach - dist) * 0.5);
            a.pos -= push;
            b.pos += push;

            let closing = (a.vel - b.vel).dot(normal);
            if closing <= 0.0 {
                continue;
            }
            let impulse = normal * ((1.0 + config.collision_elasticity) * closing * 0.5);
            a.vel -= impulse;
            b.vel += impulse;

            if closing > config.ram_speed_threshold {
                let damage = closing * config.ram_damage_factor;
                let (a_id, b_id) = (a.id, b.id);
                let contact = a.pos + normal * a.radius;
                events.push(sound(SoundCue::Crash, contact));
                apply_damage(karts, i, damage, Some(b_id), events);
                apply_damage(karts, j, damage, Some(a_id), events);
            }
        }
    }
}

/// Keep living karts out of walls and live obstacles.
pub fn resolve_arena_collisions(karts: &mut [Kart], arena: &Arena) {
    for kart in karts.iter_mut().filter(|k| k.alive) {
        arena.resolve_wall_collisions(&mut kart.pos, &mut kart.vel, kart.radius);
        arena.resolve_obstacle_collisions(&mut kart.pos, &mut kart.vel, kart.radius);
        kart.pos = arena.clamp_inside(kart.pos, kart.radius);
    }
}

/// Projectiles against walls, obstacles and karts.
pub fn resolve_projectiles(
    projectiles: &mut [Projectile],
    karts: &mut [Kart],
    arena: &mut Arena,
    grace: f32,
    requests: &mut Vec<ExplosionRequest>,
    events: &mut Vec<GameEvent>,
) {
    for p in projectiles.iter_mut().filter(|p| p.active) {
        if arena.wall_overlap(p.pos, p.size).is_some() {
            requests.extend(p.impact_explosion());
            p.active = false;
            continue;
        }

        let touching: SmallVec<[usize; 4]> = arena.obstacles_overlapping(p.pos, p.size).collect();
        for idx in touching {
            let id = arena.obstacles[idx].id;
            if !p.register_obstacle_hit(id) {
                continue;
            }
            let center = arena.obstacles[idx].rect.center();
            let hit = arena.damage_obstacle(idx, p.damage, Some(p.owner), grace, requests);
            if hit == ObstacleHit::Destroyed {
                events.push(sound(SoundCue::ObstacleDestroyed, center));
            }
            requests.extend(p.impact_explosion());
            if !p.penetrating {
                p.active = false;
                break;
            }
        }
        if !p.active {
            continue;
        }

        for victim in 0..karts.len() {
            let target = &karts[victim];
            if !target.alive || target.id == p.owner || !p.overlaps(target.pos, target.radius) {
                continue;
            }
            if !p.register_hit(target.id) {
                continue;
            }
            let outcome = apply_damage(karts, victim, p.damage, Some(p.owner), events);
            if outcome != DamageOutcome::Ignored {
                karts[victim].vel += p.direction() * p.knockback;
            }
            if !p.penetrating {
                requests.extend(p.impact_explosion());
                p.active = false;
                break;
            }
        }
    }
}

/// Armed mines against every living kart except their owner.
pub fn resolve_mines(mines: &mut [Mine], karts: &[Kart], requests: &mut Vec<ExplosionRequest>) {
    for mine in mines.iter_mut().filter(|m| m.is_armed()) {
        for kart in karts.iter().filter(|k| k.alive) {
            if let Some(request) = mine.try_trigger(kart.id, kart.pos, kart.radius) {
                requests.push(request);
                break;
            }
        }
    }
}

/// Spawn requested explosions and settle their area damage. Destroyed
/// explosive obstacles feed new requests back in until the chain settles.
pub fn resolve_explosions(
    state: &mut KartArenaState,
    requests: &mut Vec<ExplosionRequest>,
    grace: f32,
    events: &mut Vec<GameEvent>,
) {
    loop {
        for request in requests.drain(..) {
            events.push(sound(SoundCue::Explosion, request.origin));
            let id = state.ids.next_id();
            state.explosions.push(Explosion::from_request(id, &request));
        }
        for idx in 0..state.explosions.len() {
            if !state.explosions[idx].claim_damage() {
                continue;
            }
            let blast = state.explosions[idx].clone();
            apply_explosion(&blast, &mut state.karts, &mut state.arena, grace, requests, events);
        }
        if requests.is_empty() {
            break;
        }
    }
}

/// One-time area damage with linear falloff to every living kart in range,
/// the owner included. The owner only decides who is credited.
pub fn apply_explosion(
    blast: &Explosion,
    karts: &mut [Kart],
    arena: &mut Arena,
    grace: f32,
    requests: &mut Vec<ExplosionRequest>,
    events: &mut Vec<GameEvent>,
) {
    for victim in 0..karts.len() {
        let target = &karts[victim];
        if !target.alive {
            continue;
        }
        let factor = blast.falloff_at(target.pos, target.radius);
        if factor <= 0.0 {
            continue;
        }
        let away = (target.pos - blast.origin).normalize_or_zero();
        let outcome = apply_damage(karts, victim, blast.damage * factor, blast.owner, events);
        if outcome != DamageOutcome::Ignored {
            karts[victim].vel += away * (blast.knockback * factor);
        }
    }

    for idx in 0..arena.obstacles.len() {
        let obstacle = &arena.obstacles[idx];
        if !obstacle.is_live() || !obstacle.destructible {
            continue;
        }
        let nearest = obstacle.rect.closest_point(blast.origin);
        let factor = falloff(blast.origin.distance(nearest), blast.radius, 0.0);
        if factor <= 0.0 {
            continue;
        }
        let center = obstacle.rect.center();
        let hit = arena.damage_obstacle(idx, blast.damage * factor, blast.owner, grace, requests);
        if hit == ObstacleHit::Destroyed {
            events.push(sound(SoundCue::ObstacleDestroyed, center));
        }
    }
}

/// Hand pickups to the first living kart touching them. Bots pass over
/// weapons while they still hold one; humans always swap.
pub fn collect_pickups(
    pickups: &mut [Pickup],
    karts: &mut [Kart],
    config: &KartConfig,
    events: &mut Vec<GameEvent>,
) {
    for pickup in pickups.iter_mut().filter(|p| p.active) {
        for kart in karts.iter_mut().filter(|k| k.alive) {
            if !pickup.overlaps(kart.pos, kart.radius) {
                continue;
            }
            if pickup.is_weapon() && kart.is_bot && kart.weapon.is_some() {
                continue;
            }
            if !pickup.collect() {
                break;
            }
            match pickup.kind {
                PickupKind::Weapon(weapon) => {
                    kart.equip(weapon);
                    events.push(sound(SoundCue::WeaponCollected, pickup.pos));
                },
                PickupKind::PowerUp(kind) => {
                    apply_power_up(kart, kind, config);
                    events.push(sound(SoundCue::PowerupCollected, pickup.pos));
                },
            }
            tracing::debug!(kart = kart.id, kind = ?pickup.kind, "Pickup collected");
            break;
        }
    }
}

/// The consolidated collision and combat pass for one tick.
pub fn resolve(state: &mut KartArenaState, config: &CombatConfig, events: &mut Vec<GameEvent>) {
    let grace = config.obstacle_grace;
    let mut requests = Vec::new();

    resolve_kart_collisions(&mut state.karts, &config.kart, events);
    resolve_arena_collisions(&mut state.karts, &state.arena);
    resolve_projectiles(
        &mut state.projectiles,
        &mut state.karts,
        &mut state.arena,
        grace,
        &mut requests,
        events,
    );
    resolve_mines(&mut state.mines, &state.karts, &mut requests);
    resolve_explosions(state, &mut requests, grace, events);
    collect_pickups(&mut state.pickups, &mut state.karts, &config.kart, events);
}
