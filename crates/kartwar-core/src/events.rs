use serde::{Deserialize, Serialize};

/// Named audio triggers emitted by the simulation.
///
/// The audio subsystem plays these fire-and-forget; the simulation never
/// waits on playback or queries audio state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundCue {
    Fire,
    Hit,
    ShieldBlock,
    Explosion,
    MineDeployed,
    MineArmed,
    WeaponCollected,
    PowerupCollected,
    ObstacleDestroyed,
    Crash,
    Boost,
    DriftBoost,
    Death,
    Respawn,
}

impl SoundCue {
    /// The wire name of this cue (matches the serde representation).
    pub fn name(self) -> &'static str {
        match self {
            SoundCue::Fire => "fire",
            SoundCue::Hit => "hit",
            SoundCue::ShieldBlock => "shield-block",
            SoundCue::Explosion => "explosion",
            SoundCue::MineDeployed => "mine-deployed",
            SoundCue::MineArmed => "mine-armed",
            SoundCue::WeaponCollected => "weapon-collected",
            SoundCue::PowerupCollected => "powerup-collected",
            SoundCue::ObstacleDestroyed => "obstacle-destroyed",
            SoundCue::Crash => "crash",
            SoundCue::Boost => "boost",
            SoundCue::DriftBoost => "drift-boost",
            SoundCue::Death => "death",
            SoundCue::Respawn => "respawn",
        }
    }
}
