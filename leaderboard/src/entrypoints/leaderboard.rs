use std::sync::Arc;

use rocket::{serde::json::Json, State};
use tracing::info;

use crate::state::LeaderboardState;

use super::types::LeaderboardResponse;

#[rocket::get("/?<limit>")]
async fn get_leaderboard(
    state: &State<Arc<LeaderboardState>>,
    limit: Option<usize>,
) -> Json<LeaderboardResponse> {
    let snapshot = state.current_or_refresh().await;
    Json(LeaderboardResponse::new(snapshot, limit))
}

#[rocket::post("/refresh")]
async fn refresh_leaderboard(state: &State<Arc<LeaderboardState>>) -> Json<LeaderboardResponse> {
    info!("Manual leaderboard refresh requested");
    let snapshot = state.refresh().await;
    Json(LeaderboardResponse::new(snapshot, None))
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing leaderboard entrypoints", |rocket| async {
        rocket.mount(
            "/leaderboard",
            rocket::routes![get_leaderboard, refresh_leaderboard],
        )
    })
}
