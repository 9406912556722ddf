use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use kartwar_core::game_trait::PlayerId;

use crate::arena::ExplosionRequest;
use crate::math::{Vec2, circles_overlap};
use crate::weapons::WeaponKind;

/// A traveling shot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u64,
    /// Excluded from hits; credited with damage and kills.
    pub owner: PlayerId,
    pub weapon: WeaponKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub rotation: f32,
    pub damage: f32,
    pub knockback: f32,
    pub size: f32,
    pub range: f32,
    /// Distance covered so far.
    pub traveled: f32,
    pub explosion_radius: Option<f32>,
    pub penetrating: bool,
    /// Targets already struck; each target is damaged at most once.
    pub hit_set: SmallVec<[PlayerId; 4]>,
    /// Obstacle ids already struck.
    pub obstacles_hit: SmallVec<[u32; 4]>,
    pub active: bool,
}

impl Projectile {
    /// Advance along the velocity and burn out once the range is spent.
    pub fn update(&mut self, dt: f32) {
        if !self.active {
            return;
        }
        let step = self.vel * dt;
        self.pos += step;
        self.traveled += step.length();
        if self.traveled >= self.range {
            self.active = false;
        }
    }

    /// Center distance below projectile size plus target radius.
    pub fn overlaps(&self, center: Vec2, radius: f32) -> bool {
        circles_overlap(self.pos, self.size, center, radius)
    }

    /// Record a hit on `target`. Returns `false` if it was already struck.
    pub fn register_hit(&mut self, target: PlayerId) -> bool {
        if self.hit_set.contains(&target) {
            return false;
        }
        self.hit_set.push(target);
        true
    }

    /// Record a hit on obstacle `id`. Returns `false` if it was already struck.
    pub fn register_obstacle_hit(&mut self, id: u32) -> bool {
        if self.obstacles_hit.contains(&id) {
            return false;
        }
        self.obstacles_hit.push(id);
        true
    }

    /// Blast to spawn at the current position, if this shot is explosive.
    pub fn impact_explosion(&self) -> Option<ExplosionRequest> {
        self.explosion_radius.map(|radius| ExplosionRequest {
            origin: self.pos,
            radius,
            damage: self.damage,
            knockback: self.knockback,
            owner: Some(self.owner),
        })
    }

    /// Unit direction of travel.
    pub fn direction(&self) -> Vec2 {
        self.vel.normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::KartConfig;
    use crate::kart::test_kart;
    use crate::weapons::{EntityIds, Shot, spawn_shot};

    fn shot(kind: WeaponKind) -> Projectile {
        let kart = test_kart(1, Vec2::new(100.0, 100.0), &KartConfig::default());
        let mut ids = EntityIds::default();
        let mut rng = StdRng::seed_from_u64(0);
        match spawn_shot(&kart, kind, &mut ids, &mut rng) {
            Shot::Projectiles(mut v) => v.remove(0),
            Shot::Mine(_) => panic!("expected a projectile"),
        }
    }

    #[test]
    fn projectile_burns_out_at_range() {
        let mut p = shot(WeaponKind::Rocket);
        let dt = 0.1;
        let mut ticks = 0;
        while p.active {
            p.update(dt);
            ticks += 1;
            assert!(ticks < 1000);
        }
        assert!(p.traveled >= p.range);
        // 1000 range at 550 units/s takes a little under 2s
        assert!((18..=19).contains(&ticks), "took {ticks} ticks");
    }

    #[test]
    fn hit_set_rejects_repeat_targets() {
        let mut p = shot(WeaponKind::Railgun);
        assert!(p.register_hit(2));
        assert!(p.register_hit(3));
        assert!(!p.register_hit(2));
        assert_eq!(p.hit_set.len(), 2);
    }

    #[test]
    fn overlap_uses_size_plus_radius() {
        let mut p = shot(WeaponKind::MachineGun);
        p.pos = Vec2::new(0.0, 0.0);
        assert!(p.overlaps(Vec2::new(23.0, 0.0), 20.0));
        assert!(!p.overlaps(Vec2::new(24.0, 0.0), 20.0));
    }

    #[test]
    fn only_explosive_shots_request_blasts() {
        assert!(shot(WeaponKind::Rocket).impact_explosion().is_some());
        assert!(shot(WeaponKind::MachineGun).impact_explosion().is_none());
        let blast = shot(WeaponKind::Rocket).impact_explosion().unwrap();
        assert_eq!(blast.owner, Some(1));
        assert!((blast.radius - 90.0).abs() < f32::EPSILON);
    }
}
