use shared::PullRequestRecord;
use tracing::{debug, info, instrument, warn};

use crate::api::{FetchError, PullRequestSource};

/// Collects merged pull requests from up to `max_pages` pages.
///
/// Pagination stops at the first empty page. A failing page ends pagination
/// too: the error is returned when nothing was collected yet, otherwise the
/// pages gathered so far are kept. Pages are requested once, without retries.
#[instrument(skip(source))]
pub async fn fetch_merged_pulls(
    source: &dyn PullRequestSource,
    max_pages: u32,
    per_page: u8,
) -> Result<Vec<PullRequestRecord>, FetchError> {
    let mut raw = Vec::new();

    for page in 1..=max_pages {
        match source.fetch_page(page, per_page).await {
            Ok(pulls) if pulls.is_empty() => {
                debug!("Page {page} is empty, stopping");
                break;
            }
            Ok(mut pulls) => raw.append(&mut pulls),
            Err(e) if page == 1 => return Err(e),
            Err(e) => {
                warn!(
                    "Failed to fetch page {page} of pull requests, keeping {} already fetched: {e}",
                    raw.len()
                );
                break;
            }
        }
    }

    let total = raw.len();
    let merged: Vec<PullRequestRecord> = raw
        .into_iter()
        .filter_map(|pr| {
            PullRequestRecord::try_from(pr)
                .map_err(|e| warn!("Dropping pull request: {e}"))
                .ok()
        })
        .filter(PullRequestRecord::is_merged)
        .collect();

    info!("Received {total} pull requests, {} merged", merged.len());
    Ok(merged)
}
