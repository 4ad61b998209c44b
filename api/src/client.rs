use crate::sportradar::ScheduleResponse;
use reqwest::Client;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

/// Client for the tournament schedule feed.
#[derive(Debug, Clone)]
pub struct NcaaApi {
    client: Client,
    timeout: Duration,
    schedule_url: String,
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    NotFound(String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl NcaaApi {
    /// `schedule_url` is the full URL of the season's schedule document
    /// (API key included, if the provider needs one).
    pub fn new(schedule_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent("bracket-keeper/0.1 (tournament reconciler)")
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_secs(10),
            schedule_url: schedule_url.into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch the season schedule document.
    ///
    /// A 4xx answer yields an empty document (no segments), which callers
    /// treat as "results not published yet".
    pub async fn fetch_schedule(&self) -> ApiResult<ScheduleResponse> {
        if self.schedule_url.trim().is_empty() {
            return Err(ApiError::NotFound("schedule url is not configured".into()));
        }
        self.get::<ScheduleResponse>(&self.schedule_url).await
    }

    async fn get<T: Default + serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, redact(url)))?;

        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, redact(url))),
            Err(e) => {
                if e.status().map(|s| s.is_client_error()).unwrap_or(false) {
                    log::warn!("schedule feed answered {:?} for {}", e.status(), redact(url));
                    Ok(T::default())
                } else {
                    Err(ApiError::Api(e, redact(url)))
                }
            }
        }
    }
}

/// Strip the query string so API keys never reach the logs.
fn redact(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{base}?…"),
        None => url.to_owned(),
    }
}
