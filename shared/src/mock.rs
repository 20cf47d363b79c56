use crate::{ContributorScore, RepositoryStats};

const SAMPLE_CONTRIBUTORS: [(&str, u32, u32); 8] = [
    ("Satoshi_Nakamoto", 250, 20),
    ("Ada_Lovelace", 180, 15),
    ("Alan_Turing", 120, 10),
    ("Grace_Hopper", 90, 8),
    ("Linus_Torvalds", 60, 5),
    ("Margaret_Hamilton", 40, 3),
    ("Tim_Berners_Lee", 20, 2),
    ("Pixel_Admin", 10, 1),
];

/// Static demo leaderboard served when neither live data nor a cache entry is available.
pub fn mock_contributors() -> Vec<ContributorScore> {
    SAMPLE_CONTRIBUTORS
        .iter()
        .map(|&(login, experience_points, pull_request_count)| ContributorScore {
            login: login.to_string(),
            experience_points,
            pull_request_count,
            events_attended: 0,
        })
        .collect()
}

/// Repository counters that go with the demo leaderboard.
pub fn mock_repository_stats() -> RepositoryStats {
    RepositoryStats {
        stars: 128,
        forks: 45,
        commits: Some(310),
    }
}
