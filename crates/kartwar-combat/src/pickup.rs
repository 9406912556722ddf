use serde::{Deserialize, Serialize};

use crate::math::{Vec2, circles_overlap};
use crate::powerups::PowerUpKind;
use crate::weapons::WeaponKind;

/// What a pickup grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    Weapon(WeaponKind),
    PowerUp(PowerUpKind),
}

/// A collectible lying on an arena spawn point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub id: u64,
    pub pos: Vec2,
    pub kind: PickupKind,
    pub radius: f32,
    /// Index into the arena's weapon or power-up spawn table.
    pub spawn_slot: usize,
    pub active: bool,
}

impl Pickup {
    pub fn new(id: u64, pos: Vec2, kind: PickupKind, radius: f32, spawn_slot: usize) -> Self {
        Self {
            id,
            pos,
            kind,
            radius,
            spawn_slot,
            active: true,
        }
    }

    pub fn is_weapon(&self) -> bool {
        matches!(self.kind, PickupKind::Weapon(_))
    }

    pub fn overlaps(&self, center: Vec2, radius: f32) -> bool {
        self.active && circles_overlap(self.pos, self.radius, center, radius)
    }

    /// Mark collected. Only the first call returns `true`.
    pub fn collect(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_is_one_shot() {
        let mut p = Pickup::new(
            1,
            Vec2::new(10.0, 10.0),
            PickupKind::PowerUp(PowerUpKind::Shield),
            18.0,
            0,
        );
        assert!(p.overlaps(Vec2::new(30.0, 10.0), 20.0));
        assert!(p.collect());
        assert!(!p.collect());
        assert!(!p.overlaps(Vec2::new(30.0, 10.0), 20.0), "Collected pickups are inert");
    }

    #[test]
    fn weapon_pickups_are_flagged() {
        let p = Pickup::new(2, Vec2::ZERO, PickupKind::Weapon(WeaponKind::Rocket), 18.0, 3);
        assert!(p.is_weapon());
    }
}
