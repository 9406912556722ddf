/// Errors surfaced by catalog lookups and configuration parsing.
///
/// Nothing in the simulation is fatal: callers log these and fall back
/// to a no-op or to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    UnknownWeapon(String),
    UnknownPowerUp(String),
    InvalidConfig(String),
    InvalidArena(String),
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownWeapon(name) => write!(f, "unknown weapon type: {name}"),
            Self::UnknownPowerUp(name) => write!(f, "unknown power-up type: {name}"),
            Self::InvalidConfig(m) => write!(f, "invalid config: {m}"),
            Self::InvalidArena(m) => write!(f, "invalid arena: {m}"),
        }
    }
}

impl std::error::Error for SimError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offender() {
        let e = SimError::UnknownWeapon("flamethrower".to_string());
        assert_eq!(e.to_string(), "unknown weapon type: flamethrower");
    }
}
