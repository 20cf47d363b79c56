use std::{sync::Arc, time::Duration};

use pixel_phantoms_leaderboard::{
    api::{attendance_source, prometheus::PrometheusClient, GithubClient},
    cache::CacheStore,
    config::{Env, LeaderboardConfig},
    entrypoints,
    pipeline::Context,
    state::LeaderboardState,
};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;

    // octocrab talks TLS through rustls, which needs a process-wide crypto provider
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let env = envy::from_env::<Env>()?;
    let mut config = match &env.scoring_file {
        Some(path) => LeaderboardConfig::load_from_file(path)?,
        None => LeaderboardConfig::default(),
    };
    config.scoring.owner = env.repo_owner.clone();
    config.validate()?;

    let prometheus: Arc<PrometheusClient> = Default::default();
    let github = GithubClient::new(
        env.github_token,
        env.repo_owner,
        env.repo_name,
        prometheus.clone(),
    )?;
    let context = Context {
        pulls: Arc::new(github),
        attendance: attendance_source(&env.attendance_source),
        cache: CacheStore::open(&env.cache_dir).into(),
        config: config.into(),
        prometheus,
    };
    let state = Arc::new(LeaderboardState::new(context));
    let refresh_interval =
        Duration::from_secs(env.refresh_interval_in_minutes.unwrap_or(10).max(1) * 60);

    tokio::select! {
        _ = run(state.clone(), refresh_interval) => {
        }
        _ = signal::ctrl_c() => {
            tracing::warn!("Received SIGINT. Exiting.");
        }
        _ = rocket::build()
            .manage(state)
            .attach(entrypoints::stage())
            .launch() => {
            }
    }
    tracing::warn!("Exiting leaderboard service...");

    Ok(())
}

async fn run(state: Arc<LeaderboardState>, refresh_interval: Duration) {
    tracing::warn!("Starting leaderboard refresh loop...");

    let mut interval = tokio::time::interval(refresh_interval);
    loop {
        interval.tick().await;
        let snapshot = state.refresh().await;
        info!(
            "Published leaderboard from {} with {} contributors",
            snapshot.source,
            snapshot.contributors.len()
        );
    }
}
