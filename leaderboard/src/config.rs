use std::path::{Path, PathBuf};

use serde::Deserialize;
use shared::ScoringConfig;

const HOUR_MS: i64 = 60 * 60 * 1000;

/// Process environment, loaded with `envy` after `.env` is applied.
#[derive(Debug, Deserialize)]
pub struct Env {
    pub github_token: Option<String>,
    #[serde(default = "default_repo_owner")]
    pub repo_owner: String,
    #[serde(default = "default_repo_name")]
    pub repo_name: String,
    #[serde(default = "default_attendance_source")]
    pub attendance_source: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    pub scoring_file: Option<PathBuf>,
    pub refresh_interval_in_minutes: Option<u64>,
}

fn default_repo_owner() -> String {
    "sayeeg-11".to_string()
}

fn default_repo_name() -> String {
    "Pixel_Phantoms".to_string()
}

fn default_attendance_source() -> String {
    "data/attendance.csv".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".cache/leaderboard")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub max_pages: u32,
    pub per_page: u8,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            per_page: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    pub key: String,
    pub max_age_in_hours: u32,
    /// Serve an expired entry before falling back to mock data.
    pub allow_stale: bool,
    pub use_mock_fallback: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            key: "leaderboardData".to_string(),
            max_age_in_hours: 24,
            allow_stale: false,
            use_mock_fallback: true,
        }
    }
}

impl CachePolicy {
    pub fn max_age_ms(&self) -> i64 {
        self.max_age_in_hours as i64 * HOUR_MS
    }
}

/// Everything that shapes one leaderboard computation. Loaded from TOML:
///
/// ```toml
/// [scoring]
/// event_points = 250
/// inclusion = "require_merged_pr"
/// top = 5
///
/// [scoring.leagues]
/// gold = 15000
/// silver = 7500
/// bronze = 3000
///
/// [fetch]
/// max_pages = 3
///
/// [cache]
/// allow_stale = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    pub scoring: ScoringConfig,
    pub fetch: FetchConfig,
    pub cache: CachePolicy,
}

impl LeaderboardConfig {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.scoring.validate()?;
        anyhow::ensure!(self.fetch.max_pages > 0, "fetch.max_pages must be at least 1");
        anyhow::ensure!(
            (1..=100).contains(&self.fetch.per_page),
            "fetch.per_page must be between 1 and 100"
        );
        anyhow::ensure!(!self.cache.key.is_empty(), "cache.key must not be empty");
        anyhow::ensure!(self.cache.max_age_in_hours > 0, "cache.max_age_in_hours must be at least 1");
        Ok(())
    }
}
