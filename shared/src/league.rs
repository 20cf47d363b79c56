use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::ConfigError;

pub use strum::IntoEnumIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum League {
    Gold,
    Silver,
    Bronze,
    Rookie,
}

impl League {
    pub fn label(&self) -> &'static str {
        match self {
            League::Gold => "Gold League",
            League::Silver => "Silver League",
            League::Bronze => "Bronze League",
            League::Rookie => "Rookie",
        }
    }
}

/// Minimum score, inclusive, required for each tier. Everything below
/// `bronze` is [`League::Rookie`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueTable {
    pub gold: u32,
    pub silver: u32,
    pub bronze: u32,
}

impl Default for LeagueTable {
    fn default() -> Self {
        Self::xp()
    }
}

impl LeagueTable {
    /// Scale used by the contributors page: more than 150/75/30 points.
    pub const fn points() -> Self {
        Self {
            gold: 151,
            silver: 76,
            bronze: 31,
        }
    }

    /// Scale used by the homepage widget.
    pub const fn xp() -> Self {
        Self {
            gold: 15_000,
            silver: 7_500,
            bronze: 3_000,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gold > self.silver && self.silver > self.bronze {
            Ok(())
        } else {
            Err(ConfigError::LeagueOrder(*self))
        }
    }

    pub fn classify(&self, score: u32) -> League {
        if score >= self.gold {
            League::Gold
        } else if score >= self.silver {
            League::Silver
        } else if score >= self.bronze {
            League::Bronze
        } else {
            League::Rookie
        }
    }

    /// Inclusive lower bound of a tier.
    pub fn lower_bound(&self, league: League) -> u32 {
        match league {
            League::Gold => self.gold,
            League::Silver => self.silver,
            League::Bronze => self.bronze,
            League::Rookie => 0,
        }
    }
}
