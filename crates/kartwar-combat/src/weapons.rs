use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use kartwar_core::error::SimError;

use crate::kart::Kart;
use crate::math::Vec2;
use crate::mine::Mine;
use crate::projectile::Projectile;

/// Gap between a kart's hull and a freshly spawned projectile or mine.
const MUZZLE_GAP: f32 = 2.0;
/// Extra distance behind the kart where mines are dropped.
const MINE_DROP_GAP: f32 = 15.0;

/// Weapon catalog keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    MachineGun,
    Shotgun,
    Rocket,
    Railgun,
    Mine,
}

/// How a deployable weapon behaves once placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deployable {
    Mine { arm_time: f32, lifetime: f32 },
}

/// Static catalog entry for a weapon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponDef {
    pub damage: f32,
    /// Ammo granted on pickup.
    pub ammo: u32,
    /// Shots per second.
    pub fire_rate: f32,
    pub projectile_speed: f32,
    /// Projectile (or mine trigger) radius.
    pub projectile_size: f32,
    /// Total spread angle in radians.
    pub spread: f32,
    pub projectile_count: u8,
    /// Maximum travel distance.
    pub range: f32,
    pub knockback: f32,
    pub explosion_radius: Option<f32>,
    pub penetrating: bool,
    pub deployable: Option<Deployable>,
}

const MACHINE_GUN: WeaponDef = WeaponDef {
    damage: 8.0,
    ammo: 40,
    fire_rate: 10.0,
    projectile_speed: 900.0,
    projectile_size: 4.0,
    spread: 0.05,
    projectile_count: 1,
    range: 700.0,
    knockback: 20.0,
    explosion_radius: None,
    penetrating: false,
    deployable: None,
};

const SHOTGUN: WeaponDef = WeaponDef {
    damage: 9.0,
    ammo: 12,
    fire_rate: 1.5,
    projectile_speed: 750.0,
    projectile_size: 4.0,
    spread: 0.5,
    projectile_count: 6,
    range: 400.0,
    knockback: 60.0,
    explosion_radius: None,
    penetrating: false,
    deployable: None,
};

const ROCKET: WeaponDef = WeaponDef {
    damage: 35.0,
    ammo: 4,
    fire_rate: 1.2,
    projectile_speed: 550.0,
    projectile_size: 8.0,
    spread: 0.0,
    projectile_count: 1,
    range: 1000.0,
    knockback: 150.0,
    explosion_radius: Some(90.0),
    penetrating: false,
    deployable: None,
};

const RAILGUN: WeaponDef = WeaponDef {
    damage: 45.0,
    ammo: 5,
    fire_rate: 0.8,
    projectile_speed: 1600.0,
    projectile_size: 5.0,
    spread: 0.0,
    projectile_count: 1,
    range: 1400.0,
    knockback: 80.0,
    explosion_radius: None,
    penetrating: true,
    deployable: None,
};

const MINE: WeaponDef = WeaponDef {
    damage: 50.0,
    ammo: 3,
    fire_rate: 1.0,
    projectile_speed: 0.0,
    projectile_size: 12.0,
    spread: 0.0,
    projectile_count: 1,
    range: 0.0,
    knockback: 200.0,
    explosion_radius: Some(110.0),
    penetrating: false,
    deployable: Some(Deployable::Mine {
        arm_time: 1.0,
        lifetime: 30.0,
    }),
};

impl WeaponKind {
    pub const ALL: [WeaponKind; 5] = [
        WeaponKind::MachineGun,
        WeaponKind::Shotgun,
        WeaponKind::Rocket,
        WeaponKind::Railgun,
        WeaponKind::Mine,
    ];

    pub fn def(self) -> &'static WeaponDef {
        match self {
            WeaponKind::MachineGun => &MACHINE_GUN,
            WeaponKind::Shotgun => &SHOTGUN,
            WeaponKind::Rocket => &ROCKET,
            WeaponKind::Railgun => &RAILGUN,
            WeaponKind::Mine => &MINE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WeaponKind::MachineGun => "machine_gun",
            WeaponKind::Shotgun => "shotgun",
            WeaponKind::Rocket => "rocket",
            WeaponKind::Railgun => "railgun",
            WeaponKind::Mine => "mine",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, SimError> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| SimError::UnknownWeapon(name.to_string()))
    }

    /// Seconds between shots at the given fire-rate multiplier.
    pub fn cooldown(self, fire_rate_multiplier: f32) -> f32 {
        1.0 / (self.def().fire_rate * fire_rate_multiplier)
    }
}

/// What a single trigger pull puts into the world.
#[derive(Debug, Clone)]
pub enum Shot {
    Projectiles(SmallVec<[Projectile; 8]>),
    Mine(Mine),
}

/// Monotonic id source for spawned entities.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EntityIds {
    next: u64,
}

impl EntityIds {
    pub fn next_id(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}

/// Spawn the projectiles (or mine) for one shot of `kind` from `kart`.
///
/// Multi-projectile weapons fan out evenly across their spread; a single
/// projectile with spread gets a uniform random offset within ±spread.
/// Damage is scaled by the kart's damage multiplier at the moment of firing.
pub fn spawn_shot<R: Rng + ?Sized>(
    kart: &Kart,
    kind: WeaponKind,
    ids: &mut EntityIds,
    rng: &mut R,
) -> Shot {
    let def = kind.def();
    let damage = def.damage * kart.modifiers.damage_multiplier;

    if let Some(Deployable::Mine { arm_time, lifetime }) = def.deployable {
        let behind = kart.pos - kart.forward() * (kart.radius + def.projectile_size + MINE_DROP_GAP);
        return Shot::Mine(Mine::new(
            ids.next_id(),
            kart.id,
            behind,
            damage,
            def.projectile_size,
            def.explosion_radius.unwrap_or(def.projectile_size),
            def.knockback,
            arm_time,
            lifetime,
        ));
    }

    let count = def.projectile_count.max(1);
    let nose = kart.pos + kart.forward() * (kart.radius + def.projectile_size + MUZZLE_GAP);
    let offsets: SmallVec<[f32; 8]> = if count > 1 {
        let step = def.spread / f32::from(count - 1);
        (0..count)
            .map(|i| -def.spread / 2.0 + step * f32::from(i))
            .collect()
    } else if def.spread > 0.0 {
        SmallVec::from_elem(rng.random_range(-def.spread..=def.spread), 1)
    } else {
        SmallVec::from_elem(0.0, 1)
    };

    let projectiles = offsets
        .into_iter()
        .map(|offset| {
            let heading = kart.rotation + offset;
            Projectile {
                id: ids.next_id(),
                owner: kart.id,
                weapon: kind,
                pos: nose,
                vel: Vec2::from_angle(heading) * def.projectile_speed,
                rotation: heading,
                damage,
                knockback: def.knockback,
                size: def.projectile_size,
                range: def.range,
                traveled: 0.0,
                explosion_radius: def.explosion_radius,
                penetrating: def.penetrating,
                hit_set: SmallVec::new(),
                obstacles_hit: SmallVec::new(),
                active: true,
            }
        })
        .collect();
    Shot::Projectiles(projectiles)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::KartConfig;
    use crate::kart::test_kart;

    #[test]
    fn catalog_names_roundtrip() {
        for kind in WeaponKind::ALL {
            assert_eq!(WeaponKind::from_name(kind.name()), Ok(kind));
        }
    }

    #[test]
    fn unknown_weapon_is_an_error() {
        assert_eq!(
            WeaponKind::from_name("flamethrower"),
            Err(SimError::UnknownWeapon("flamethrower".to_string()))
        );
    }

    #[test]
    fn only_mines_are_deployable() {
        for kind in WeaponKind::ALL {
            assert_eq!(
                kind.def().deployable.is_some(),
                kind == WeaponKind::Mine,
                "{kind:?}"
            );
        }
    }

    #[test]
    fn cooldown_scales_with_fire_rate_multiplier() {
        assert!((WeaponKind::MachineGun.cooldown(1.0) - 0.1).abs() < 1e-6);
        assert!((WeaponKind::MachineGun.cooldown(2.0) - 0.05).abs() < 1e-6);
    }

    #[test]
    fn shotgun_fans_evenly_across_spread() {
        let kart = test_kart(1, Vec2::new(500.0, 500.0), &KartConfig::default());
        let mut ids = EntityIds::default();
        let mut rng = StdRng::seed_from_u64(3);
        let Shot::Projectiles(shots) = spawn_shot(&kart, WeaponKind::Shotgun, &mut ids, &mut rng)
        else {
            panic!("shotgun must fire projectiles");
        };
        assert_eq!(shots.len(), 6);
        let first = shots.first().unwrap().rotation;
        let last = shots.last().unwrap().rotation;
        assert!((first - (kart.rotation - 0.25)).abs() < 1e-5);
        assert!((last - (kart.rotation + 0.25)).abs() < 1e-5);
        let step = shots[1].rotation - shots[0].rotation;
        for pair in shots.windows(2) {
            assert!((pair[1].rotation - pair[0].rotation - step).abs() < 1e-5);
        }
    }

    #[test]
    fn single_shot_spread_stays_within_bounds() {
        let kart = test_kart(1, Vec2::new(500.0, 500.0), &KartConfig::default());
        let mut ids = EntityIds::default();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let Shot::Projectiles(shots) =
                spawn_shot(&kart, WeaponKind::MachineGun, &mut ids, &mut rng)
            else {
                panic!("machine gun must fire projectiles");
            };
            assert_eq!(shots.len(), 1);
            let offset = shots[0].rotation - kart.rotation;
            assert!(offset.abs() <= MACHINE_GUN.spread + 1e-6);
        }
    }

    #[test]
    fn projectiles_spawn_in_front_and_inherit_weapon() {
        let mut kart = test_kart(4, Vec2::new(300.0, 300.0), &KartConfig::default());
        kart.modifiers.damage_multiplier = 1.5;
        let mut ids = EntityIds::default();
        let mut rng = StdRng::seed_from_u64(1);
        let Shot::Projectiles(shots) = spawn_shot(&kart, WeaponKind::Railgun, &mut ids, &mut rng)
        else {
            panic!("railgun must fire projectiles");
        };
        let p = &shots[0];
        assert_eq!(p.owner, 4);
        assert!(p.penetrating);
        assert!((p.damage - 45.0 * 1.5).abs() < 1e-4);
        let ahead = (p.pos - kart.pos).dot(kart.forward());
        assert!(ahead > kart.radius, "Projectile must start past the nose");
    }

    #[test]
    fn mine_drops_behind_kart() {
        let kart = test_kart(2, Vec2::new(300.0, 300.0), &KartConfig::default());
        let mut ids = EntityIds::default();
        let mut rng = StdRng::seed_from_u64(1);
        let Shot::Mine(mine) = spawn_shot(&kart, WeaponKind::Mine, &mut ids, &mut rng) else {
            panic!("mine weapon must deploy a mine");
        };
        assert_eq!(mine.owner, 2);
        let behind = (mine.pos - kart.pos).dot(kart.forward());
        assert!(behind < -kart.radius);
        assert!(!mine.is_armed());
    }
}
