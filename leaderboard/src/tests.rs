use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rocket::{http::Status, local::asynchronous::Client};
use shared::{
    mock_repository_stats, ContributorScore, League, RawLabel, RawPullRequest, RawUser,
    RepositoryStats,
};

use crate::{
    api::{prometheus::PrometheusClient, AttendanceSource, FetchError, PullRequestSource},
    cache::{now_ms, CacheStore},
    config::LeaderboardConfig,
    entrypoints::{self, types::LeaderboardResponse},
    pipeline::{self, compute, Context, DataSource, PipelineError, Stage},
    state::LeaderboardState,
};

const HOUR_MS: i64 = 60 * 60 * 1000;

pub fn raw_pr(number: u64, login: &str, merged: bool, labels: &[&str]) -> RawPullRequest {
    RawPullRequest {
        number: Some(number),
        user: Some(RawUser {
            login: Some(login.to_string()),
        }),
        merged_at: merged.then(chrono::Utc::now),
        created_at: None,
        labels: Some(
            labels
                .iter()
                .map(|name| RawLabel {
                    name: Some(name.to_string()),
                })
                .collect(),
        ),
    }
}

/// Serves canned pages; `Err(status)` simulates an HTTP failure.
pub struct StaticPulls {
    pages: Vec<Result<Vec<RawPullRequest>, u16>>,
    stats: Option<RepositoryStats>,
    requests: Mutex<Vec<(u32, u8)>>,
}

impl StaticPulls {
    pub fn new(pages: Vec<Result<Vec<RawPullRequest>, u16>>) -> Self {
        Self {
            pages,
            stats: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_stats(mut self, stats: RepositoryStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn failing(status: u16) -> Self {
        Self::new(vec![Err(status)])
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.requests.lock().unwrap().iter().map(|(page, _)| *page).collect()
    }

    pub fn per_page_values(&self) -> Vec<u8> {
        self.requests.lock().unwrap().iter().map(|(_, per_page)| *per_page).collect()
    }
}

#[async_trait]
impl PullRequestSource for StaticPulls {
    async fn fetch_page(&self, page: u32, per_page: u8) -> Result<Vec<RawPullRequest>, FetchError> {
        self.requests.lock().unwrap().push((page, per_page));
        // Suspend like a real request would
        tokio::task::yield_now().await;
        match self.pages.get(page as usize - 1).cloned() {
            Some(Ok(pulls)) => Ok(pulls),
            Some(Err(status)) => Err(FetchError::from_status(status)),
            None => Ok(Vec::new()),
        }
    }

    async fn repository_stats(&self) -> Result<Option<RepositoryStats>, FetchError> {
        Ok(self.stats)
    }
}

pub struct StaticAttendance(pub Option<&'static str>);

#[async_trait]
impl AttendanceSource for StaticAttendance {
    async fn fetch_csv(&self) -> Result<String, FetchError> {
        self.0
            .map(ToString::to_string)
            .ok_or(FetchError::Status(404))
    }
}

const ATTENDANCE: &str = "\
username,date,event
alice,2025-01-01,Hackathon
alice,2025-02-01,Hackathon
bob,2025-01-05,Workshop
sayeeg-11,2025-01-05,Workshop
";

fn pull_pages() -> Vec<Result<Vec<RawPullRequest>, u16>> {
    vec![Ok(vec![
        raw_pr(1, "alice", true, &["level 2", "level 3"]),
        raw_pr(2, "carol", true, &["level 1"]),
        raw_pr(3, "carol", false, &["level 3"]),
        raw_pr(4, "Sayeeg-11", true, &["level 3"]),
        raw_pr(5, "bob", true, &[]),
    ])]
}

fn context(
    pulls: StaticPulls,
    attendance: StaticAttendance,
    cache: Arc<CacheStore>,
    config: LeaderboardConfig,
) -> Context {
    Context {
        pulls: Arc::new(pulls),
        attendance: Arc::new(attendance),
        cache,
        config: config.into(),
        prometheus: Arc::new(PrometheusClient::default()),
    }
}

fn failing_context(cache: Arc<CacheStore>, config: LeaderboardConfig) -> Context {
    context(StaticPulls::failing(403), StaticAttendance(None), cache, config)
}

fn cached_scores() -> Vec<ContributorScore> {
    vec![ContributorScore {
        login: "cached-user".to_string(),
        experience_points: 42,
        pull_request_count: 4,
        events_attended: 0,
    }]
}

const STATS: RepositoryStats = RepositoryStats {
    stars: 12,
    forks: 3,
    commits: Some(240),
};

#[tokio::test]
async fn live_run_merges_pulls_and_attendance() {
    let cache = Arc::new(CacheStore::in_memory());
    let context = context(
        StaticPulls::new(pull_pages()).with_stats(STATS),
        StaticAttendance(Some(ATTENDANCE)),
        cache.clone(),
        LeaderboardConfig::default(),
    );

    let snapshot = pipeline::refresh(&context).await;
    assert_eq!(snapshot.source, DataSource::Live);
    assert!(snapshot.degraded.is_empty());
    assert_eq!(snapshot.repository, Some(STATS));

    let rows: Vec<_> = snapshot
        .contributors
        .iter()
        .map(|c| (c.rank, c.login.as_str(), c.total_score, c.pull_request_count, c.events_attended))
        .collect();
    assert_eq!(
        rows,
        [
            (1, "alice", 11 + 50, 1, 1),
            (2, "bob", 1 + 50, 1, 1),
            (3, "carol", 2, 1, 0),
        ]
    );
    assert!(snapshot.contributors.iter().all(|c| c.league == League::Rookie));
    assert_eq!(snapshot.totals.merged_pull_requests, 3);

    let cached: Vec<ContributorScore> = cache.load("leaderboardData", HOUR_MS).unwrap();
    assert_eq!(cached.len(), 3);
    assert_eq!(cached[0].login, "alice");
}

#[tokio::test]
async fn one_failing_source_does_not_abort() {
    let cache = Arc::new(CacheStore::in_memory());
    let only_attendance = context(
        StaticPulls::failing(403),
        StaticAttendance(Some(ATTENDANCE)),
        cache.clone(),
        LeaderboardConfig::default(),
    );
    let computed = compute(&only_attendance).await.unwrap();
    let logins: Vec<_> = computed.scores.iter().map(|s| s.login.as_str()).collect();
    assert_eq!(logins, ["alice", "bob"]);
    assert_eq!(computed.degraded, [Stage::PullRequests]);
    assert!(!computed.is_complete());

    let only_pulls = context(
        StaticPulls::new(pull_pages()),
        StaticAttendance(None),
        cache,
        LeaderboardConfig::default(),
    );
    let computed = compute(&only_pulls).await.unwrap();
    assert_eq!(computed.scores[0].login, "alice");
    assert_eq!(computed.scores[0].experience_points, 11);
    assert_eq!(computed.degraded, [Stage::Attendance]);
}

#[tokio::test]
async fn partial_run_is_served_but_not_cached() {
    let cache = Arc::new(CacheStore::in_memory());
    cache.save("leaderboardData", &cached_scores());
    let context = context(
        StaticPulls::failing(403),
        StaticAttendance(Some(ATTENDANCE)),
        cache.clone(),
        LeaderboardConfig::default(),
    );

    let snapshot = pipeline::refresh(&context).await;
    assert_eq!(snapshot.source, DataSource::Partial);
    assert_eq!(snapshot.degraded, [Stage::PullRequests]);
    assert_eq!(snapshot.contributors[0].login, "alice");
    assert!(snapshot.is_available());

    let cached: Vec<ContributorScore> = cache.load("leaderboardData", HOUR_MS).unwrap();
    assert_eq!(cached, cached_scores());
}

#[tokio::test]
async fn both_sources_failing_is_an_error() {
    let context = failing_context(Arc::new(CacheStore::in_memory()), LeaderboardConfig::default());
    let result = compute(&context).await;
    assert!(matches!(
        result,
        Err(PipelineError::AllSourcesFailed {
            pulls: FetchError::RateLimited,
            attendance: FetchError::Status(404),
        })
    ));
}

#[tokio::test]
async fn top_limit_applies_to_live_and_cached_payload() {
    let cache = Arc::new(CacheStore::in_memory());
    let mut config = LeaderboardConfig::default();
    config.scoring.top = Some(2);
    let context = context(
        StaticPulls::new(pull_pages()),
        StaticAttendance(Some(ATTENDANCE)),
        cache.clone(),
        config,
    );

    let snapshot = pipeline::refresh(&context).await;
    assert_eq!(snapshot.contributors.len(), 2);
    let cached: Vec<ContributorScore> = cache.load("leaderboardData", HOUR_MS).unwrap();
    assert_eq!(cached.len(), 2);
}

#[tokio::test]
async fn failure_serves_fresh_cache() {
    let cache = Arc::new(CacheStore::in_memory());
    cache.save("leaderboardData", &cached_scores());
    let context = failing_context(cache, LeaderboardConfig::default());

    let snapshot = pipeline::refresh(&context).await;
    assert_eq!(snapshot.source, DataSource::Cached);
    assert_eq!(snapshot.contributors[0].login, "cached-user");
    assert!(snapshot.cached_at.is_some());
}

#[tokio::test]
async fn expired_cache_falls_back_to_mock() {
    let cache = Arc::new(CacheStore::in_memory());
    cache.save_at("leaderboardData", &cached_scores(), now_ms() - 25 * HOUR_MS);
    let context = failing_context(cache, LeaderboardConfig::default());

    let snapshot = pipeline::refresh(&context).await;
    assert_eq!(snapshot.source, DataSource::Mock);
    assert_eq!(snapshot.contributors.len(), 8);
    assert_eq!(snapshot.contributors[0].login, "Satoshi_Nakamoto");
    assert_eq!(snapshot.repository, Some(mock_repository_stats()));
}

#[tokio::test]
async fn expired_cache_is_served_when_stale_allowed() {
    let cache = Arc::new(CacheStore::in_memory());
    cache.save_at("leaderboardData", &cached_scores(), now_ms() - 25 * HOUR_MS);
    let mut config = LeaderboardConfig::default();
    config.cache.allow_stale = true;
    let context = failing_context(cache, config);

    let snapshot = pipeline::refresh(&context).await;
    assert_eq!(snapshot.source, DataSource::Stale);
    assert_eq!(snapshot.contributors[0].login, "cached-user");
}

#[tokio::test]
async fn nothing_left_is_unavailable() {
    let mut config = LeaderboardConfig::default();
    config.cache.use_mock_fallback = false;
    let context = failing_context(Arc::new(CacheStore::in_memory()), config);

    let snapshot = pipeline::refresh(&context).await;
    assert_eq!(snapshot.source, DataSource::Unavailable);
    assert!(snapshot.contributors.is_empty());
    assert!(!snapshot.is_available());
}

#[tokio::test]
async fn fallback_does_not_overwrite_cache() {
    let cache = Arc::new(CacheStore::in_memory());
    let context = failing_context(cache.clone(), LeaderboardConfig::default());

    pipeline::refresh(&context).await;
    assert!(cache.load_stale::<Vec<ContributorScore>>("leaderboardData").is_none());
}

#[tokio::test]
async fn waiting_reader_reuses_running_refresh() {
    let pulls = Arc::new(StaticPulls::new(pull_pages()));
    let state = LeaderboardState::new(Context {
        pulls: pulls.clone(),
        attendance: Arc::new(StaticAttendance(Some(ATTENDANCE))),
        cache: Arc::new(CacheStore::in_memory()),
        config: Arc::new(LeaderboardConfig::default()),
        prometheus: Arc::new(PrometheusClient::default()),
    });

    let (refreshed, read) = tokio::join!(state.refresh(), state.current_or_refresh());
    assert_eq!(refreshed, read);
    assert_eq!(pulls.requested_pages(), [1, 2]);
}

async fn client(context: Context) -> Client {
    let state = Arc::new(LeaderboardState::new(context));
    let rocket = rocket::build().manage(state).attach(entrypoints::stage());
    Client::tracked(rocket).await.unwrap()
}

#[rocket::async_test]
async fn leaderboard_route_serves_limited_snapshot() {
    let client = client(context(
        StaticPulls::new(pull_pages()),
        StaticAttendance(Some(ATTENDANCE)),
        Arc::new(CacheStore::in_memory()),
        LeaderboardConfig::default(),
    ))
    .await;

    let response = client.get("/leaderboard?limit=1").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: LeaderboardResponse = response.into_json().await.unwrap();
    assert_eq!(body.source, DataSource::Live);
    assert_eq!(body.contributors.len(), 1);
    assert_eq!(body.contributors[0].login, "alice");
    assert!(body.notice.is_none());
    assert!(body.retry.is_none());
}

#[rocket::async_test]
async fn partial_response_names_missing_input() {
    let client = client(context(
        StaticPulls::new(pull_pages()),
        StaticAttendance(None),
        Arc::new(CacheStore::in_memory()),
        LeaderboardConfig::default(),
    ))
    .await;

    let response = client.get("/leaderboard").dispatch().await;
    let body: LeaderboardResponse = response.into_json().await.unwrap();
    assert_eq!(body.source, DataSource::Partial);
    assert_eq!(body.degraded, [Stage::Attendance]);
    assert_eq!(body.notice.as_deref(), Some("Partial data - attendance unavailable"));
    assert!(body.retry.is_none());
}

#[rocket::async_test]
async fn unavailable_response_offers_retry() {
    let mut config = LeaderboardConfig::default();
    config.cache.use_mock_fallback = false;
    let client = client(failing_context(Arc::new(CacheStore::in_memory()), config)).await;

    let response = client.post("/leaderboard/refresh").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: LeaderboardResponse = response.into_json().await.unwrap();
    assert_eq!(body.source, DataSource::Unavailable);
    assert_eq!(body.notice.as_deref(), Some("Data unavailable"));
    assert_eq!(body.retry.as_deref(), Some("/leaderboard/refresh"));
}

#[rocket::async_test]
async fn metrics_route_reports_refreshes() {
    let client = client(failing_context(
        Arc::new(CacheStore::in_memory()),
        LeaderboardConfig::default(),
    ))
    .await;

    client.post("/leaderboard/refresh").dispatch().await;
    let response = client.get("/metrics").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().await.unwrap();
    assert!(body.contains("leaderboard_refresh_total{outcome=\"Mock\"} 1"));
}
