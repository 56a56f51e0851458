//! Gmail API client with rate limiting and retry logic

use async_trait::async_trait;
use google_gmail1::api::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::auth::{GmailHub, READONLY_SCOPE};
use crate::error::{ExportError, Result};
use crate::models::{LabelInfo, MessageHeader, MessagePage};

/// Read-only view of the mail service used by the export
#[async_trait]
pub trait MailClient: Send + Sync {
    /// List all labels in the account
    async fn list_labels(&self) -> Result<Vec<LabelInfo>>;

    /// List one page of message IDs, optionally restricted to a label
    async fn list_messages(
        &self,
        label_id: Option<String>,
        page_token: Option<String>,
        max_results: u32,
    ) -> Result<MessagePage>;

    /// Fetch the payload headers of one message
    async fn get_message_headers(&self, message_id: &str) -> Result<Vec<MessageHeader>>;
}

/// Production Gmail client with rate limiting and retry logic
///
/// - Semaphore bounds in-flight requests
/// - Transient failures (429, 5xx, network) back off exponentially
/// - Every call is wrapped in a timeout
pub struct ProductionGmailClient {
    hub: GmailHub,
    user_id: String,
    rate_limiter: Arc<Semaphore>,
    max_retries: u32,
}

impl ProductionGmailClient {
    /// Create a client for the authenticated user (`"me"`)
    pub fn new(hub: GmailHub, max_concurrent: usize, max_retries: u32) -> Self {
        Self::with_user(hub, "me", max_concurrent, max_retries)
    }

    pub fn with_user(
        hub: GmailHub,
        user_id: impl Into<String>,
        max_concurrent: usize,
        max_retries: u32,
    ) -> Self {
        Self {
            hub,
            user_id: user_id.into(),
            rate_limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            max_retries,
        }
    }

    async fn acquire_permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.rate_limiter.acquire().await.map_err(|e| {
            ExportError::Unknown(format!("Failed to acquire rate limit permit: {}", e))
        })
    }

    /// Check if an error is retryable
    fn should_retry(error: &ExportError) -> bool {
        error.is_transient()
    }

    /// Execute an async operation with exponential backoff retry
    async fn with_retry<T, F, Fut>(operation_name: &str, max_retries: u32, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = Duration::from_millis(500);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if Self::should_retry(&e) && attempts <= max_retries => {
                    let wait = match &e {
                        ExportError::RateLimitExceeded { retry_after } => {
                            std::cmp::max(delay, Duration::from_secs(*retry_after))
                        }
                        _ => delay,
                    };
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempts,
                        max_retries + 1,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Run an API call under a 30 second timeout
    async fn with_timeout<T, E, Fut>(operation_name: &str, api_call: Fut) -> Result<T>
    where
        Fut: std::future::Future<Output = std::result::Result<T, E>>,
        ExportError: From<E>,
    {
        let timeout_duration = Duration::from_secs(30);
        match tokio::time::timeout(timeout_duration, api_call).await {
            Ok(result) => result.map_err(ExportError::from),
            Err(_) => {
                warn!("Gmail API {} call timed out after {:?}", operation_name, timeout_duration);
                Err(ExportError::NetworkError(format!(
                    "API call timed out after {:?}",
                    timeout_duration
                )))
            }
        }
    }
}

/// Pull the payload headers out of a Gmail API message
pub fn message_headers(msg: Message) -> Result<Vec<MessageHeader>> {
    let headers = msg
        .payload
        .and_then(|p| p.headers)
        .ok_or_else(|| ExportError::InvalidMessageFormat("Missing payload headers".to_string()))?;

    Ok(headers
        .into_iter()
        .filter_map(|h| match (h.name, h.value) {
            (Some(name), Some(value)) => Some(MessageHeader { name, value }),
            _ => None,
        })
        .collect())
}

#[async_trait]
impl MailClient for ProductionGmailClient {
    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        Self::with_retry("list_labels", self.max_retries, || async {
            let _permit = self.acquire_permit().await?;
            debug!("Calling Gmail API to list labels...");
            let api_call = self
                .hub
                .users()
                .labels_list(&self.user_id)
                .add_scope(READONLY_SCOPE)
                .doit();
            let (_, response) = Self::with_timeout("list_labels", api_call).await?;

            let labels: Vec<LabelInfo> = response
                .labels
                .unwrap_or_default()
                .into_iter()
                .filter_map(|label| match (label.id, label.name) {
                    (Some(id), Some(name)) => Some(LabelInfo { id, name }),
                    _ => None,
                })
                .collect();

            debug!("Successfully parsed {} labels", labels.len());
            Ok(labels)
        })
        .await
    }

    async fn list_messages(
        &self,
        label_id: Option<String>,
        page_token: Option<String>,
        max_results: u32,
    ) -> Result<MessagePage> {
        Self::with_retry("list_messages", self.max_retries, || async {
            let _permit = self.acquire_permit().await?;

            let mut call = self
                .hub
                .users()
                .messages_list(&self.user_id)
                .max_results(max_results);

            if let Some(label) = label_id.as_deref() {
                call = call.add_label_ids(label);
            }
            if let Some(token) = page_token.as_deref() {
                call = call.page_token(token);
            }

            let api_call = call.add_scope(READONLY_SCOPE).doit();
            let (_, response) = Self::with_timeout("list_messages", api_call).await?;

            let message_ids = response
                .messages
                .unwrap_or_default()
                .into_iter()
                .filter_map(|m| m.id)
                .collect();

            Ok(MessagePage {
                message_ids,
                next_page_token: response.next_page_token,
            })
        })
        .await
    }

    async fn get_message_headers(&self, message_id: &str) -> Result<Vec<MessageHeader>> {
        Self::with_retry("get_message", self.max_retries, || async {
            let _permit = self.acquire_permit().await?;

            let api_call = self
                .hub
                .users()
                .messages_get(&self.user_id, message_id)
                .format("full")
                .add_scope(READONLY_SCOPE)
                .doit();
            let (_, msg) = Self::with_timeout("get_message", api_call).await?;

            message_headers(msg)
        })
        .await
    }
}

// Implement MailClient for Arc<T> to allow shared ownership
#[async_trait]
impl<T: MailClient + ?Sized> MailClient for Arc<T> {
    async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        self.as_ref().list_labels().await
    }

    async fn list_messages(
        &self,
        label_id: Option<String>,
        page_token: Option<String>,
        max_results: u32,
    ) -> Result<MessagePage> {
        self.as_ref()
            .list_messages(label_id, page_token, max_results)
            .await
    }

    async fn get_message_headers(&self, message_id: &str) -> Result<Vec<MessageHeader>> {
        self.as_ref().get_message_headers(message_id).await
    }
}
