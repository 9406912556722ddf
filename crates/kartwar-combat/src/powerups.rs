use rand::Rng;
use serde::{Deserialize, Serialize};

use kartwar_core::error::SimError;
use kartwar_core::powerup::PowerUpKind as _;

use crate::config::KartConfig;
use crate::kart::{Kart, Modifiers};
use crate::math::pick_random;

/// Health restored by a health pickup.
pub const HEALTH_RESTORE: f32 = 50.0;

/// Power-up catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    Health,
    AmmoRefill,
    Nitro,
    SpeedBoost,
    DamageBoost,
    RapidFire,
    Armor,
    Shield,
    Invincibility,
}

/// A timed power-up effect on a kart.
pub type ActivePowerUp = kartwar_core::powerup::ActivePowerUp<PowerUpKind>;

impl kartwar_core::powerup::PowerUpKind for PowerUpKind {
    fn duration(&self) -> f32 {
        match self {
            PowerUpKind::Health | PowerUpKind::AmmoRefill | PowerUpKind::Nitro => 0.0,
            PowerUpKind::SpeedBoost => 6.0,
            PowerUpKind::DamageBoost => 8.0,
            PowerUpKind::RapidFire => 6.0,
            PowerUpKind::Armor => 8.0,
            PowerUpKind::Shield => 12.0,
            PowerUpKind::Invincibility => 4.0,
        }
    }
}

/// Spawn-weight tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
}

impl Rarity {
    pub const ALL: [Rarity; 3] = [Rarity::Common, Rarity::Uncommon, Rarity::Rare];

    pub fn weight(self) -> u32 {
        match self {
            Rarity::Common => 60,
            Rarity::Uncommon => 30,
            Rarity::Rare => 10,
        }
    }
}

/// How [`apply_power_up`] handled a pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpApplied {
    /// Dead karts take nothing.
    Ignored,
    /// One-shot effect ran and was discarded.
    Instant,
    Activated,
    /// An effect of the same kind was already running; its timer was reset.
    Refreshed,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 9] = [
        PowerUpKind::Health,
        PowerUpKind::AmmoRefill,
        PowerUpKind::Nitro,
        PowerUpKind::SpeedBoost,
        PowerUpKind::DamageBoost,
        PowerUpKind::RapidFire,
        PowerUpKind::Armor,
        PowerUpKind::Shield,
        PowerUpKind::Invincibility,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PowerUpKind::Health => "health",
            PowerUpKind::AmmoRefill => "ammo_refill",
            PowerUpKind::Nitro => "nitro",
            PowerUpKind::SpeedBoost => "speed_boost",
            PowerUpKind::DamageBoost => "damage_boost",
            PowerUpKind::RapidFire => "rapid_fire",
            PowerUpKind::Armor => "armor",
            PowerUpKind::Shield => "shield",
            PowerUpKind::Invincibility => "invincibility",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, SimError> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| SimError::UnknownPowerUp(name.to_string()))
    }

    pub fn rarity(self) -> Rarity {
        match self {
            PowerUpKind::Health | PowerUpKind::AmmoRefill | PowerUpKind::SpeedBoost => {
                Rarity::Common
            },
            PowerUpKind::Nitro
            | PowerUpKind::DamageBoost
            | PowerUpKind::RapidFire
            | PowerUpKind::Armor => Rarity::Uncommon,
            PowerUpKind::Shield | PowerUpKind::Invincibility => Rarity::Rare,
        }
    }

    pub fn is_instant(self) -> bool {
        self.duration() <= 0.0
    }

    /// Apply this effect's modifier change.
    pub fn activate(self, m: &mut Modifiers) {
        match self {
            PowerUpKind::SpeedBoost => m.speed_multiplier *= 1.5,
            PowerUpKind::DamageBoost => m.damage_multiplier *= 1.5,
            PowerUpKind::RapidFire => m.fire_rate_multiplier *= 2.0,
            PowerUpKind::Armor => m.damage_reduction += 0.5,
            PowerUpKind::Shield => m.has_shield = true,
            PowerUpKind::Invincibility => m.invincible = true,
            PowerUpKind::Health | PowerUpKind::AmmoRefill | PowerUpKind::Nitro => {},
        }
    }

    /// Exact inverse of [`PowerUpKind::activate`].
    pub fn deactivate(self, m: &mut Modifiers) {
        match self {
            PowerUpKind::SpeedBoost => m.speed_multiplier /= 1.5,
            PowerUpKind::DamageBoost => m.damage_multiplier /= 1.5,
            PowerUpKind::RapidFire => m.fire_rate_multiplier /= 2.0,
            PowerUpKind::Armor => m.damage_reduction -= 0.5,
            PowerUpKind::Shield => m.has_shield = false,
            PowerUpKind::Invincibility => m.invincible = false,
            PowerUpKind::Health | PowerUpKind::AmmoRefill | PowerUpKind::Nitro => {},
        }
    }
}

/// Apply a collected power-up to `kart`.
///
/// Instant kinds run once. A timed kind already running on the kart has its
/// timer reset to full instead of stacking a second instance.
pub fn apply_power_up(kart: &mut Kart, kind: PowerUpKind, config: &KartConfig) -> PowerUpApplied {
    if !kart.alive {
        return PowerUpApplied::Ignored;
    }
    match kind {
        PowerUpKind::Health => {
            kart.health = (kart.health + HEALTH_RESTORE).min(kart.max_health);
            return PowerUpApplied::Instant;
        },
        PowerUpKind::AmmoRefill => {
            if let Some(weapon) = kart.weapon {
                kart.ammo = weapon.def().ammo;
            }
            return PowerUpApplied::Instant;
        },
        PowerUpKind::Nitro => {
            kart.boost.charge = config.boost_charge_max;
            return PowerUpApplied::Instant;
        },
        _ => {},
    }

    if let Some(fx) = kart
        .active_powerups
        .iter_mut()
        .find(|fx| fx.active && fx.kind == kind)
    {
        fx.refresh();
        return PowerUpApplied::Refreshed;
    }
    kind.activate(&mut kart.modifiers);
    kart.active_powerups.push(ActivePowerUp::new(kind));
    PowerUpApplied::Activated
}

/// Roll a rarity tier by weight, then pick uniformly within it.
pub fn select_power_up<R: Rng + ?Sized>(rng: &mut R) -> PowerUpKind {
    let total: u32 = Rarity::ALL.iter().map(|r| r.weight()).sum();
    let mut roll = rng.random_range(0..total);
    let mut tier = Rarity::Common;
    for rarity in Rarity::ALL {
        if roll < rarity.weight() {
            tier = rarity;
            break;
        }
        roll -= rarity.weight();
    }
    let candidates: Vec<PowerUpKind> = PowerUpKind::ALL
        .into_iter()
        .filter(|k| k.rarity() == tier)
        .collect();
    pick_random(&candidates, rng)
        .copied()
        .unwrap_or(PowerUpKind::Health)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::kart::test_kart;
    use crate::math::Vec2;
    use crate::weapons::WeaponKind;

    fn setup() -> (Kart, KartConfig) {
        let config = KartConfig::default();
        (test_kart(1, Vec2::ZERO, &config), config)
    }

    #[test]
    fn names_roundtrip() {
        for kind in PowerUpKind::ALL {
            assert_eq!(PowerUpKind::from_name(kind.name()), Ok(kind));
        }
        assert!(matches!(
            PowerUpKind::from_name("jetpack"),
            Err(SimError::UnknownPowerUp(_))
        ));
    }

    #[test]
    fn every_tier_has_members() {
        for rarity in Rarity::ALL {
            assert!(PowerUpKind::ALL.iter().any(|k| k.rarity() == rarity));
        }
    }

    #[test]
    fn activate_then_deactivate_is_neutral() {
        for kind in PowerUpKind::ALL {
            let mut m = Modifiers::default();
            kind.activate(&mut m);
            kind.deactivate(&mut m);
            assert!(m.is_neutral(), "{kind:?} leaked {m:?}");
        }
    }

    #[test]
    fn health_is_instant_and_capped() {
        let (mut kart, config) = setup();
        kart.health = 30.0;
        assert_eq!(
            apply_power_up(&mut kart, PowerUpKind::Health, &config),
            PowerUpApplied::Instant
        );
        assert_eq!(kart.health, 80.0);
        apply_power_up(&mut kart, PowerUpKind::Health, &config);
        assert_eq!(kart.health, kart.max_health);
        assert!(kart.active_powerups.is_empty());
    }

    #[test]
    fn ammo_refill_restores_current_weapon() {
        let (mut kart, config) = setup();
        kart.equip(WeaponKind::Shotgun);
        kart.ammo = 1;
        apply_power_up(&mut kart, PowerUpKind::AmmoRefill, &config);
        assert_eq!(kart.ammo, WeaponKind::Shotgun.def().ammo);
    }

    #[test]
    fn nitro_fills_boost() {
        let (mut kart, config) = setup();
        kart.boost.charge = 0.0;
        apply_power_up(&mut kart, PowerUpKind::Nitro, &config);
        assert_eq!(kart.boost.charge, config.boost_charge_max);
    }

    #[test]
    fn repeat_pickup_refreshes_instead_of_stacking() {
        let (mut kart, config) = setup();
        assert_eq!(
            apply_power_up(&mut kart, PowerUpKind::SpeedBoost, &config),
            PowerUpApplied::Activated
        );
        kart.active_powerups[0].tick(4.0);
        assert_eq!(
            apply_power_up(&mut kart, PowerUpKind::SpeedBoost, &config),
            PowerUpApplied::Refreshed
        );
        assert_eq!(kart.active_powerups.len(), 1);
        assert_eq!(kart.active_powerups[0].remaining, 6.0);
        assert_eq!(kart.modifiers.speed_multiplier, 1.5);
    }

    #[test]
    fn timed_effect_reverts_on_expiry() {
        let (mut kart, config) = setup();
        apply_power_up(&mut kart, PowerUpKind::RapidFire, &config);
        assert_eq!(kart.modifiers.fire_rate_multiplier, 2.0);
        let idle = crate::kart::KartInput::default();
        for _ in 0..7 {
            kart.update(1.0, &idle, &config);
        }
        assert!(kart.active_powerups.is_empty());
        assert!(kart.modifiers.is_neutral());
    }

    #[test]
    fn dead_kart_takes_nothing() {
        let (mut kart, config) = setup();
        kart.die();
        assert_eq!(
            apply_power_up(&mut kart, PowerUpKind::Armor, &config),
            PowerUpApplied::Ignored
        );
        assert!(kart.active_powerups.is_empty());
    }

    #[test]
    fn selection_is_deterministic_for_a_seed() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            assert_eq!(select_power_up(&mut a), select_power_up(&mut b));
        }
    }

    #[test]
    fn common_tier_dominates_selection() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0u32; 3];
        for _ in 0..3000 {
            let idx = match select_power_up(&mut rng).rarity() {
                Rarity::Common => 0,
                Rarity::Uncommon => 1,
                Rarity::Rare => 2,
            };
            counts[idx] += 1;
        }
        assert!(counts[0] > counts[1], "{counts:?}");
        assert!(counts[1] > counts[2], "{counts:?}");
        assert!(counts[2] > 0, "{counts:?}");
    }
}
