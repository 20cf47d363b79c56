use std::sync::Arc;

use rocket::{fairing::AdHoc, http::ContentType, response::content::RawHtml, State};
use tracing::error;

use crate::state::LeaderboardState;

pub mod leaderboard;
pub mod types;

#[rocket::get("/metrics")]
async fn metrics(state: &State<Arc<LeaderboardState>>) -> Option<(ContentType, RawHtml<String>)> {
    let context = &state.context;
    match context.pulls.rate_limit_used().await {
        Ok(Some(used)) => context.prometheus.set_read_requests(used as i64),
        Ok(None) => {}
        Err(e) => error!("Failed to get rate limits: {e}"),
    }

    let metrics = match context.prometheus.encode() {
        Ok(metrics) => metrics,
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            return None;
        }
    };
    Some((
        ContentType::new("application/openmetrics-text", " version=1.0.0; charset=utf-8"),
        RawHtml(metrics),
    ))
}

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("Installing entrypoints", |rocket| async {
        rocket
            .mount("/", rocket::routes![metrics])
            .attach(leaderboard::stage())
    })
}
