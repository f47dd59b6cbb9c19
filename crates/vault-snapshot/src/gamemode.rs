//! Gamemode dimension of snapshot separation.

use std::fmt;
use std::str::FromStr;

/// A gameplay mode. Together with the world group it identifies one
/// snapshot slot per player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GameMode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl GameMode {
    /// All gamemodes, in a stable order.
    pub const ALL: [Self; 4] = [
        Self::Survival,
        Self::Creative,
        Self::Adventure,
        Self::Spectator,
    ];

    /// The canonical mode used when per-gamemode separation is disabled.
    pub const CANONICAL: Self = Self::Survival;

    /// Uppercase name as used in snapshot file names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Survival => "SURVIVAL",
            Self::Creative => "CREATIVE",
            Self::Adventure => "ADVENTURE",
            Self::Spectator => "SPECTATOR",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SURVIVAL" => Ok(Self::Survival),
            "CREATIVE" => Ok(Self::Creative),
            "ADVENTURE" => Ok(Self::Adventure),
            "SPECTATOR" => Ok(Self::Spectator),
            _ => Err(()),
        }
    }
}
