use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    calculate_scores, mock_contributors, mock_repository_stats, rank, top_contributors,
    AttendanceMap, ContributorScore, ProjectTotals, RankedContributor, RepositoryStats,
};
use strum::Display;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::{
    api::{prometheus::PrometheusClient, AttendanceSource, FetchError, PullRequestSource},
    cache::{now_ms, CacheStore},
    config::LeaderboardConfig,
    pulls::fetch_merged_pulls,
};

/// Everything one leaderboard computation needs, built once by the caller.
#[derive(Clone)]
pub struct Context {
    pub pulls: Arc<dyn PullRequestSource>,
    pub attendance: Arc<dyn AttendanceSource>,
    pub cache: Arc<CacheStore>,
    pub config: Arc<LeaderboardConfig>,
    pub prometheus: Arc<PrometheusClient>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no source could be fetched (pull requests: {pulls}; attendance: {attendance})")]
    AllSourcesFailed {
        pulls: FetchError,
        attendance: FetchError,
    },
}

/// Input stage of a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[strum(to_string = "pull requests")]
    PullRequests,
    #[strum(to_string = "attendance")]
    Attendance,
}

/// Scores of one computation, with the stages that failed and were scored as empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Computed {
    pub scores: Vec<ContributorScore>,
    pub degraded: Vec<Stage>,
    pub repository: Option<RepositoryStats>,
}

impl Computed {
    pub fn is_complete(&self) -> bool {
        self.degraded.is_empty()
    }
}

/// Where the served leaderboard came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DataSource {
    Live,
    /// Computed live, but one of the inputs could not be fetched.
    Partial,
    Cached,
    Stale,
    Mock,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    pub contributors: Vec<RankedContributor>,
    pub totals: ProjectTotals,
    pub source: DataSource,
    pub generated_at: DateTime<Utc>,
    /// When the served data was originally computed, for cached data.
    pub cached_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub degraded: Vec<Stage>,
    /// Only known for live data and the demo leaderboard.
    #[serde(default)]
    pub repository: Option<RepositoryStats>,
}

impl LeaderboardSnapshot {
    fn new(
        scores: Vec<ContributorScore>,
        source: DataSource,
        cached_at: Option<DateTime<Utc>>,
        config: &LeaderboardConfig,
    ) -> Self {
        Self {
            contributors: rank(&scores, &config.scoring.leagues),
            totals: ProjectTotals::from_scores(&scores),
            source,
            generated_at: Utc::now(),
            cached_at,
            degraded: Vec::new(),
            repository: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.source != DataSource::Unavailable
    }
}

/// Fetches pull requests and attendance concurrently and scores them.
///
/// Either source may fail on its own and is then scored as empty and reported
/// in [`Computed::degraded`]; the run only fails when both do.
#[instrument(skip(context))]
pub async fn compute(context: &Context) -> Result<Computed, PipelineError> {
    let config = &context.config;
    let (pulls, csv, repository) = tokio::join!(
        fetch_merged_pulls(
            context.pulls.as_ref(),
            config.fetch.max_pages,
            config.fetch.per_page
        ),
        context.attendance.fetch_csv(),
        context.pulls.repository_stats()
    );
    let repository = repository.unwrap_or_else(|e| {
        warn!("Repository stats unavailable: {e}");
        None
    });

    let (pulls, csv) = match (pulls, csv) {
        (Err(pulls), Err(attendance)) => {
            return Err(PipelineError::AllSourcesFailed { pulls, attendance })
        }
        results => results,
    };

    let mut degraded = Vec::new();
    let pulls = match pulls {
        Ok(pulls) => pulls,
        Err(e) => {
            warn!("Pull requests unavailable, scoring attendance only: {e}");
            degraded.push(Stage::PullRequests);
            Vec::new()
        }
    };
    let attendance = match csv {
        Ok(text) => AttendanceMap::from_csv(&text),
        Err(e) => {
            warn!("Attendance unavailable, scoring pull requests only: {e}");
            degraded.push(Stage::Attendance);
            AttendanceMap::default()
        }
    };

    let scores = calculate_scores(&pulls, &attendance, &config.scoring);
    Ok(Computed {
        scores: top_contributors(scores, config.scoring.top),
        degraded,
        repository,
    })
}

/// Computes a fresh leaderboard, falling back to the cache and then to mock
/// data. Never fails: the worst case is an empty `Unavailable` snapshot.
///
/// Only complete runs are cached. A `Partial` run is served but leaves the
/// last complete entry in place.
#[instrument(skip(context))]
pub async fn refresh(context: &Context) -> LeaderboardSnapshot {
    let started = Instant::now();
    let config = &context.config;

    let snapshot = match compute(context).await {
        Ok(computed) if computed.is_complete() => {
            context.cache.save(&config.cache.key, &computed.scores);
            info!("Leaderboard refreshed with {} contributors", computed.scores.len());
            LeaderboardSnapshot {
                repository: computed.repository,
                ..LeaderboardSnapshot::new(computed.scores, DataSource::Live, None, config)
            }
        }
        Ok(Computed {
            scores,
            degraded,
            repository,
        }) => {
            warn!("Leaderboard refreshed without {degraded:?}, keeping the cached entry");
            LeaderboardSnapshot {
                degraded,
                repository,
                ..LeaderboardSnapshot::new(scores, DataSource::Partial, None, config)
            }
        }
        Err(e) => {
            error!("Leaderboard sync failed: {e}");
            let (scores, source, cached_at) = fallback(context);
            let repository = (source == DataSource::Mock).then(mock_repository_stats);
            LeaderboardSnapshot {
                repository,
                ..LeaderboardSnapshot::new(scores, source, cached_at, config)
            }
        }
    };

    context.prometheus.record_refresh(
        snapshot.source,
        snapshot.contributors.len(),
        started.elapsed(),
    );
    snapshot
}

fn fallback(context: &Context) -> (Vec<ContributorScore>, DataSource, Option<DateTime<Utc>>) {
    let policy = &context.config.cache;

    if let Some(entry) =
        context
            .cache
            .load_entry::<Vec<ContributorScore>>(&policy.key, policy.max_age_ms(), now_ms())
    {
        info!("Serving cached leaderboard");
        let cached_at = entry.written_at();
        return (entry.payload, DataSource::Cached, cached_at);
    }

    if policy.allow_stale {
        if let Some(entry) = context.cache.load_stale::<Vec<ContributorScore>>(&policy.key) {
            let cached_at = entry.written_at();
            warn!("Serving stale leaderboard from {cached_at:?}");
            return (entry.payload, DataSource::Stale, cached_at);
        }
    }

    if policy.use_mock_fallback {
        warn!("Switching to mock leaderboard data");
        return (mock_contributors(), DataSource::Mock, None);
    }

    error!("Leaderboard data unavailable");
    (Vec::new(), DataSource::Unavailable, None)
}
