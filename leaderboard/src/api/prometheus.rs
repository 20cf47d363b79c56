use std::time::Duration;

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

use crate::pipeline::DataSource;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum RefreshOutcome {
    Live,
    Partial,
    Cached,
    Stale,
    Mock,
    Unavailable,
}

impl From<DataSource> for RefreshOutcome {
    fn from(source: DataSource) -> Self {
        match source {
            DataSource::Live => RefreshOutcome::Live,
            DataSource::Partial => RefreshOutcome::Partial,
            DataSource::Cached => RefreshOutcome::Cached,
            DataSource::Stale => RefreshOutcome::Stale,
            DataSource::Mock => RefreshOutcome::Mock,
            DataSource::Unavailable => RefreshOutcome::Unavailable,
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RefreshRecord {
    pub outcome: RefreshOutcome,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PageRecord {
    pub success: u32,
}

pub struct PrometheusClient {
    registry: Registry,
    refresh: Family<RefreshRecord, Counter>,
    refresh_duration: Histogram,
    github_page_requests: Family<PageRecord, Counter>,
    ranked_contributors: Gauge,

    // Read from the rate-limit endpoint whenever metrics are scraped
    github_api_read_requests: Gauge,
}

impl Default for PrometheusClient {
    fn default() -> Self {
        let mut registry = Registry::default();
        let refresh = Family::default();
        let refresh_duration =
            Histogram::new([0.1, 0.5, 1., 2., 5., 10., 30., 60., f64::INFINITY].into_iter());
        let github_page_requests = Family::default();
        let ranked_contributors = Gauge::default();
        let github_api_read_requests = Gauge::default();

        registry.register(
            "leaderboard_refresh",
            "Leaderboard refreshes by the data source that was served",
            refresh.clone(),
        );
        registry.register(
            "leaderboard_refresh_duration_seconds",
            "Time spent computing the leaderboard",
            refresh_duration.clone(),
        );
        registry.register(
            "github_page_requests",
            "Pull request pages requested from GitHub",
            github_page_requests.clone(),
        );
        registry.register(
            "leaderboard_ranked_contributors",
            "Contributors on the latest leaderboard",
            ranked_contributors.clone(),
        );
        registry.register(
            "github_api_read_requests",
            "Display used github read requests at a metric time",
            github_api_read_requests.clone(),
        );

        Self {
            registry,
            refresh,
            refresh_duration,
            github_page_requests,
            ranked_contributors,
            github_api_read_requests,
        }
    }
}

impl PrometheusClient {
    pub fn record_refresh(&self, source: DataSource, contributors: usize, elapsed: Duration) {
        self.refresh
            .get_or_create(&RefreshRecord {
                outcome: source.into(),
            })
            .inc();
        self.refresh_duration.observe(elapsed.as_secs_f64());
        self.ranked_contributors.set(contributors as i64);
    }

    pub fn add_page_request(&self, success: bool) {
        self.github_page_requests
            .get_or_create(&PageRecord {
                success: success as u32,
            })
            .inc();
    }

    pub fn set_read_requests(&self, value: i64) {
        self.github_api_read_requests.set(value);
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}
