use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{ProjectTotals, RankedContributor, RepositoryStats};

use crate::pipeline::{DataSource, LeaderboardSnapshot, Stage};

pub const RETRY_PATH: &str = "/leaderboard/refresh";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub contributors: Vec<RankedContributor>,
    pub totals: ProjectTotals,
    pub repository: Option<RepositoryStats>,
    pub source: DataSource,
    pub generated_at: DateTime<Utc>,
    pub cached_at: Option<DateTime<Utc>>,
    /// Inputs that failed during a `partial` refresh.
    pub degraded: Vec<Stage>,
    /// Human readable notice for anything but complete live data.
    pub notice: Option<String>,
    /// Where to POST for a manual retry when the data is unavailable.
    pub retry: Option<String>,
}

impl LeaderboardResponse {
    pub fn new(snapshot: LeaderboardSnapshot, limit: Option<usize>) -> Self {
        let notice = match snapshot.source {
            DataSource::Live => None,
            DataSource::Partial => Some(format!(
                "Partial data - {} unavailable",
                snapshot
                    .degraded
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" and ")
            )),
            DataSource::Cached | DataSource::Stale => {
                Some("Showing cached data - latest data unavailable".to_string())
            }
            DataSource::Mock => Some("Demo mode: displaying sample data".to_string()),
            DataSource::Unavailable => Some("Data unavailable".to_string()),
        };
        let retry = (!snapshot.is_available()).then(|| RETRY_PATH.to_string());

        let mut contributors = snapshot.contributors;
        if let Some(limit) = limit {
            contributors.truncate(limit);
        }

        Self {
            contributors,
            totals: snapshot.totals,
            repository: snapshot.repository,
            source: snapshot.source,
            generated_at: snapshot.generated_at,
            cached_at: snapshot.cached_at,
            degraded: snapshot.degraded,
            notice,
            retry,
        }
    }
}
