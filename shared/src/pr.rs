use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::GithubHandle;

/// Pull request object as returned by the GitHub REST API.
///
/// Only the fields the leaderboard reads are declared, and all of them are
/// optional. Pages are decoded one record at a time, so a record with a
/// badly typed field is dropped on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawPullRequest {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Option<Vec<RawLabel>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawUser {
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawLabel {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrValidationError {
    #[error("pull request #{0} has no author login")]
    MissingAuthor(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PullRequestRecord {
    pub number: u64,
    pub author: GithubHandle,
    pub merged_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
}

impl PullRequestRecord {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    pub fn complexity(&self) -> Complexity {
        Complexity::from_labels(&self.labels)
    }
}

impl TryFrom<RawPullRequest> for PullRequestRecord {
    type Error = PrValidationError;

    fn try_from(pr: RawPullRequest) -> Result<Self, Self::Error> {
        let number = pr.number.unwrap_or_default();
        let author = pr
            .user
            .and_then(|user| user.login)
            .map(|login| login.trim().to_string())
            .filter(|login| !login.is_empty())
            .ok_or(PrValidationError::MissingAuthor(number))?;

        Ok(Self {
            number,
            author,
            merged_at: pr.merged_at,
            labels: pr
                .labels
                .unwrap_or_default()
                .into_iter()
                .filter_map(|label| label.name)
                .collect(),
        })
    }
}

/// Complexity tier of a pull request, taken from its `level N` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Complexity {
    Level3,
    Level2,
    Level1,
    Standard,
}

impl Complexity {
    /// Highest tier present among the labels wins. Matching is a
    /// case-insensitive substring search for `level N` or `level-N`.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let labels: Vec<String> = labels.iter().map(|l| l.as_ref().to_lowercase()).collect();
        let has_level = |level: u8| {
            let spaced = format!("level {level}");
            let hyphenated = format!("level-{level}");
            labels
                .iter()
                .any(|label| label.contains(&spaced) || label.contains(&hyphenated))
        };

        if has_level(3) {
            Complexity::Level3
        } else if has_level(2) {
            Complexity::Level2
        } else if has_level(1) {
            Complexity::Level1
        } else {
            Complexity::Standard
        }
    }
}
