use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Trait for game-specific power-up kind enums.
pub trait PowerUpKind: Clone + Copy + PartialEq + Serialize + DeserializeOwned {
    /// Duration in seconds. `0.0` means the effect is instantaneous and is
    /// never tracked; `f32::INFINITY` means it only ends when forced.
    fn duration(&self) -> f32;
}

/// A live, timed instance of a power-up on a vehicle, generic over the kind enum.
///
/// `active` is a latch: it goes false exactly once, either through
/// [`ActivePowerUp::tick`] reaching zero or through [`ActivePowerUp::expire`].
/// Whoever observes the `true` return from either call owns running the
/// expiry reversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ActivePowerUp<K: PowerUpKind> {
    pub kind: K,
    pub duration: f32,
    pub remaining: f32,
    pub active: bool,
}

impl<K: PowerUpKind> ActivePowerUp<K> {
    pub fn new(kind: K) -> Self {
        let duration = kind.duration();
        Self {
            kind,
            duration,
            remaining: duration,
            active: true,
        }
    }

    /// Count down. Returns `true` on the tick the effect runs out.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.active {
            return false;
        }
        if self.remaining.is_finite() {
            self.remaining -= dt;
        }
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            self.active = false;
            return true;
        }
        false
    }

    /// Force the effect to end. Returns `true` only if it was still active.
    pub fn expire(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.remaining = 0.0;
        true
    }

    /// Reset the remaining time to the full duration.
    pub fn refresh(&mut self) {
        if self.active {
            self.remaining = self.duration;
        }
    }

    pub fn is_expired(&self) -> bool {
        !self.active
    }
}
