use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::pipeline::{self, Context, LeaderboardSnapshot};

/// Latest published leaderboard, shared between the refresh loop and the
/// HTTP handlers.
pub struct LeaderboardState {
    pub context: Context,
    snapshot: RwLock<Option<LeaderboardSnapshot>>,
    refreshing: Mutex<()>,
}

impl LeaderboardState {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            snapshot: RwLock::new(None),
            refreshing: Mutex::new(()),
        }
    }

    /// Runs the pipeline and publishes the result. Refreshes never overlap.
    pub async fn refresh(&self) -> LeaderboardSnapshot {
        let _guard = self.refreshing.lock().await;
        self.publish().await
    }

    async fn publish(&self) -> LeaderboardSnapshot {
        let snapshot = pipeline::refresh(&self.context).await;
        *self.snapshot.write().await = Some(snapshot.clone());
        snapshot
    }

    pub async fn current(&self) -> Option<LeaderboardSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Latest snapshot, computing the first one on demand. A caller that waited
    /// on a running refresh gets its result instead of starting another.
    pub async fn current_or_refresh(&self) -> LeaderboardSnapshot {
        if let Some(snapshot) = self.current().await {
            return snapshot;
        }

        let _guard = self.refreshing.lock().await;
        if let Some(snapshot) = self.current().await {
            return snapshot;
        }
        debug!("No leaderboard published yet, refreshing");
        self.publish().await
    }
}
