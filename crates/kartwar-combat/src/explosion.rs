use serde::{Deserialize, Serialize};

use kartwar_core::game_trait::PlayerId;

use crate::arena::ExplosionRequest;
use crate::math::Vec2;

/// How long an explosion stays in the world for presentation.
pub const EXPLOSION_DURATION: f32 = 0.5;

/// A short-lived area-damage event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explosion {
    pub id: u64,
    pub origin: Vec2,
    pub radius: f32,
    pub damage: f32,
    pub knockback: f32,
    pub owner: Option<PlayerId>,
    pub age: f32,
    pub duration: f32,
    /// Latched once area damage has been resolved.
    pub damage_applied: bool,
}

impl Explosion {
    pub fn from_request(id: u64, request: &ExplosionRequest) -> Self {
        Self {
            id,
            origin: request.origin,
            radius: request.radius,
            damage: request.damage,
            knockback: request.knockback,
            owner: request.owner,
            age: 0.0,
            duration: EXPLOSION_DURATION,
            damage_applied: false,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.age += dt;
    }

    pub fn is_finished(&self) -> bool {
        self.age >= self.duration
    }

    /// Claim the right to apply area damage. Only the first call returns `true`.
    pub fn claim_damage(&mut self) -> bool {
        if self.damage_applied {
            return false;
        }
        self.damage_applied = true;
        true
    }

    /// Falloff factor for a target of `target_radius` centered at `target`.
    pub fn falloff_at(&self, target: Vec2, target_radius: f32) -> f32 {
        falloff(self.origin.distance(target), self.radius, target_radius)
    }
}

/// Linear falloff `1 - d / (R + r)`, zero outside the combined radius.
pub fn falloff(distance: f32, explosion_radius: f32, target_radius: f32) -> f32 {
    let reach = explosion_radius + target_radius;
    if reach <= 0.0 || distance >= reach {
        return 0.0;
    }
    (1.0 - distance / reach).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blast() -> Explosion {
        Explosion::from_request(
            1,
            &ExplosionRequest {
                origin: Vec2::new(0.0, 0.0),
                radius: 80.0,
                damage: 40.0,
                knockback: 100.0,
                owner: Some(3),
            },
        )
    }

    #[test]
    fn falloff_is_linear_and_clamped() {
        assert!((falloff(0.0, 80.0, 20.0) - 1.0).abs() < 1e-6);
        assert!((falloff(50.0, 80.0, 20.0) - 0.5).abs() < 1e-6);
        assert_eq!(falloff(100.0, 80.0, 20.0), 0.0);
        assert_eq!(falloff(150.0, 80.0, 20.0), 0.0);
    }

    #[test]
    fn damage_claim_latches() {
        let mut e = blast();
        assert!(e.claim_damage());
        for _ in 0..10 {
            e.update(0.016);
            assert!(!e.claim_damage());
        }
    }

    #[test]
    fn explosion_finishes_after_duration() {
        let mut e = blast();
        e.update(EXPLOSION_DURATION * 0.5);
        assert!(!e.is_finished());
        e.update(EXPLOSION_DURATION);
        assert!(e.is_finished());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn falloff_stays_in_unit_range(
                distance in 0.0f32..500.0,
                radius in 1.0f32..200.0,
                target_radius in 0.0f32..50.0,
            ) {
                let f = falloff(distance, radius, target_radius);
                prop_assert!((0.0..=1.0).contains(&f));
                if distance >= radius + target_radius {
                    prop_assert_eq!(f, 0.0);
                }
            }

            #[test]
            fn falloff_never_grows_with_distance(
                a in 0.0f32..300.0,
                b in 0.0f32..300.0,
            ) {
                let (near, far) = if a < b { (a, b) } else { (b, a) };
                prop_assert!(falloff(near, 100.0, 20.0) >= falloff(far, 100.0, 20.0));
            }
        }
    }
}
