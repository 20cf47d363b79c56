use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{AttendanceSource, FetchError};

/// Picks an HTTP source for `http(s)://` locations and a file source otherwise.
pub fn attendance_source(location: &str) -> Arc<dyn AttendanceSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Arc::new(HttpAttendance::new(location.to_string()))
    } else {
        Arc::new(FileAttendance::new(location))
    }
}

fn non_empty(text: String) -> Result<String, FetchError> {
    if text.trim().is_empty() {
        Err(FetchError::EmptyPayload)
    } else {
        Ok(text)
    }
}

pub struct HttpAttendance {
    client: Client,
    url: String,
}

impl HttpAttendance {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl AttendanceSource for HttpAttendance {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_csv(&self) -> Result<String, FetchError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16()));
        }
        let text = response.text().await?;
        debug!("Fetched {} bytes of attendance data", text.len());
        non_empty(text)
    }
}

pub struct FileAttendance {
    path: PathBuf,
}

impl FileAttendance {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AttendanceSource for FileAttendance {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch_csv(&self) -> Result<String, FetchError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        non_empty(text)
    }
}
