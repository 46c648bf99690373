use crate::error::{ExportError, Result};
use crate::types::{Comment, CommentsPage, Task, TasksPage};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Page size of the ClickUp list-tasks endpoint. Fixed by the API.
pub const PAGE_SIZE: usize = 100;

/// Backoff policy applied to HTTP 429 responses: sleep, double the delay,
/// retry, up to `max_attempts` requests total.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
        }
    }
}

pub struct ClickUpClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl ClickUpClient {
    pub fn new(base_url: &str, token: String, retry: RetryPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            retry,
        }
    }

    /// GET `url` with the authorization header and deserialize the JSON body.
    ///
    /// Only 429 triggers the backoff loop; any other non-success status is
    /// terminal on the first occurrence.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut delay = self.retry.initial_delay;

        for attempt in 1..=self.retry.max_attempts {
            let resp = self
                .http
                .get(url)
                .header("Authorization", &self.token)
                .send()
                .await?;
            let status = resp.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(
                    url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "hit rate limit (429), backing off"
                );
                println!(
                    "⚠️  Hit rate limit (429). Retrying in {:.1} seconds...",
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ExportError::Api {
                    message: format!("GET {} failed ({}): {}", url, status, body),
                });
            }

            let body = resp.text().await?;
            return Ok(serde_json::from_str(&body)?);
        }

        Err(ExportError::RateLimitExhausted {
            attempts: self.retry.max_attempts,
        })
    }

    /// Fetch every task in a list, page by page.
    ///
    /// The endpoint exposes no authoritative has-more flag, so an empty or
    /// short page is treated as the last one. A final page of exactly
    /// [`PAGE_SIZE`] tasks costs one extra request that returns empty.
    #[instrument(skip(self))]
    pub async fn fetch_all_tasks(&self, list_id: &str) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        let mut page: u32 = 0;

        loop {
            let url = format!(
                "{}/list/{}/task?archived=false&page={}",
                self.base_url, list_id, page
            );
            let batch: TasksPage = self.get_json(&url).await?;
            let count = batch.tasks.len();
            debug!(page, count, "fetched task page");
            tasks.extend(batch.tasks);

            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        info!(total = tasks.len(), pages = page + 1, "fetched all tasks");
        Ok(tasks)
    }

    /// Fetch all comments for a task in a single request. The endpoint is
    /// assumed to return the complete set unpaginated.
    #[instrument(skip(self))]
    pub async fn fetch_comments(&self, task_id: &str) -> Result<Vec<Comment>> {
        let url = format!("{}/task/{}/comment", self.base_url, task_id);
        let page: CommentsPage = self.get_json(&url).await?;
        Ok(page.comments)
    }
}
