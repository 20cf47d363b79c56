use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Complexity, GithubHandle, LeagueTable};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("league thresholds must satisfy gold > silver > bronze, got {0:?}")]
    LeagueOrder(LeagueTable),
    #[error("owner login must not be empty")]
    EmptyOwner,
    #[error("top limit must be greater than zero")]
    ZeroLimit,
}

/// Points awarded for one merged pull request, by complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrPoints {
    pub level3: u32,
    pub level2: u32,
    pub level1: u32,
    pub standard: u32,
}

impl Default for PrPoints {
    fn default() -> Self {
        Self {
            level3: 11,
            level2: 5,
            level1: 2,
            standard: 1,
        }
    }
}

impl PrPoints {
    pub fn for_complexity(&self, complexity: Complexity) -> u32 {
        match complexity {
            Complexity::Level3 => self.level3,
            Complexity::Level2 => self.level2,
            Complexity::Level1 => self.level1,
            Complexity::Standard => self.standard,
        }
    }
}

/// Who makes it onto the ranked list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionPolicy {
    /// Anyone with a merged pull request or an attended event.
    #[default]
    IncludeAttendanceOnly,
    /// Only users with at least one merged pull request.
    RequireMergedPr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub owner: GithubHandle,
    pub pr_points: PrPoints,
    pub event_points: u32,
    pub inclusion: InclusionPolicy,
    pub leagues: LeagueTable,
    pub top: Option<usize>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            owner: "sayeeg-11".to_string(),
            pr_points: PrPoints::default(),
            event_points: 50,
            inclusion: InclusionPolicy::default(),
            leagues: LeagueTable::default(),
            top: None,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.trim().is_empty() {
            return Err(ConfigError::EmptyOwner);
        }
        if self.top == Some(0) {
            return Err(ConfigError::ZeroLimit);
        }
        self.leagues.validate()
    }

    pub fn is_owner(&self, login: &str) -> bool {
        login.eq_ignore_ascii_case(self.owner.trim())
    }
}
