use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    AttendanceMap, GithubHandle, InclusionPolicy, League, LeagueTable, PullRequestRecord,
    ScoringConfig,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorScore {
    pub login: GithubHandle,
    pub experience_points: u32,
    pub pull_request_count: u32,
    pub events_attended: u32,
}

impl ContributorScore {
    fn new(login: GithubHandle) -> Self {
        Self {
            login,
            experience_points: 0,
            pull_request_count: 0,
            events_attended: 0,
        }
    }
}

/// Folds merged pull requests and event attendance into per-user scores.
///
/// The result is sorted by descending experience points. The sort is stable,
/// so ties keep first-seen order: pull request authors in input order, then
/// attendance-only users in sheet order.
pub fn calculate_scores(
    pulls: &[PullRequestRecord],
    attendance: &AttendanceMap,
    config: &ScoringConfig,
) -> Vec<ContributorScore> {
    let mut scores: Vec<ContributorScore> = Vec::new();
    let mut index: HashMap<GithubHandle, usize> = HashMap::new();
    let mut position = |scores: &mut Vec<ContributorScore>, login: &str| -> usize {
        *index.entry(login.to_string()).or_insert_with(|| {
            scores.push(ContributorScore::new(login.to_string()));
            scores.len() - 1
        })
    };

    for pr in pulls.iter().filter(|pr| pr.is_merged()) {
        if config.is_owner(&pr.author) {
            continue;
        }
        let points = config.pr_points.for_complexity(pr.complexity());
        let at = position(&mut scores, &pr.author);
        let score = &mut scores[at];
        score.experience_points = score.experience_points.saturating_add(points);
        score.pull_request_count += 1;
    }

    for attendee in attendance.iter() {
        if config.is_owner(&attendee.username) {
            continue;
        }
        let events = attendee.events.len() as u32;
        let at = position(&mut scores, &attendee.username);
        let score = &mut scores[at];
        score.events_attended = events;
        score.experience_points = score
            .experience_points
            .saturating_add(events.saturating_mul(config.event_points));
    }

    scores.retain(|score| match config.inclusion {
        InclusionPolicy::IncludeAttendanceOnly => {
            score.pull_request_count > 0 || score.events_attended > 0
        }
        InclusionPolicy::RequireMergedPr => score.pull_request_count > 0,
    });
    scores.sort_by(|a, b| b.experience_points.cmp(&a.experience_points));

    debug!("Calculated scores for {} contributors", scores.len());
    scores
}

/// Keeps the first `limit` entries of an already sorted list.
pub fn top_contributors(mut scores: Vec<ContributorScore>, limit: Option<usize>) -> Vec<ContributorScore> {
    if let Some(limit) = limit {
        scores.truncate(limit);
    }
    scores
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedContributor {
    pub rank: u32,
    pub login: GithubHandle,
    pub total_score: u32,
    pub pull_request_count: u32,
    pub events_attended: u32,
    pub league: League,
}

/// Attaches 1-based ranks and leagues. Leagues are derived on every call and
/// never stored.
pub fn rank(scores: &[ContributorScore], leagues: &LeagueTable) -> Vec<RankedContributor> {
    scores
        .iter()
        .enumerate()
        .map(|(place, score)| RankedContributor {
            rank: place as u32 + 1,
            login: score.login.clone(),
            total_score: score.experience_points,
            pull_request_count: score.pull_request_count,
            events_attended: score.events_attended,
            league: leagues.classify(score.experience_points),
        })
        .collect()
}

/// Project-wide counters shown next to the leaderboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTotals {
    pub contributors: u32,
    pub merged_pull_requests: u32,
    pub events_attended: u32,
    pub total_points: u64,
}

impl ProjectTotals {
    pub fn from_scores(scores: &[ContributorScore]) -> Self {
        scores.iter().fold(Self::default(), |mut totals, score| {
            totals.contributors += 1;
            totals.merged_pull_requests += score.pull_request_count;
            totals.events_attended += score.events_attended;
            totals.total_points += score.experience_points as u64;
            totals
        })
    }
}

/// Repository counters shown next to the contributor totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub stars: u32,
    pub forks: u32,
    /// `None` when the commit count could not be read.
    pub commits: Option<u32>,
}
