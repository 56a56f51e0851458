//! Label scanner: paginates message listings, fetches headers concurrently
//! and turns them into export rows

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::address::parse_address;
use crate::client::MailClient;
use crate::config::{ExportConfig, MAX_PAGE_SIZE};
use crate::error::Result;
use crate::exclusions::ExclusionFilter;
use crate::models::{LabelInfo, MessageHeader, MessageRecord, Row};

/// Scanner settings
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// `maxResults` per listing call
    pub page_size: u32,
    /// Upper bound on in-flight message fetches
    pub concurrent_fetches: usize,
    /// Repeat the label filter on continuation pages
    pub label_filter_on_every_page: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            concurrent_fetches: 40,
            label_filter_on_every_page: true,
        }
    }
}

impl From<&ExportConfig> for ScanConfig {
    fn from(config: &ExportConfig) -> Self {
        Self {
            page_size: config.page_size,
            concurrent_fetches: config.max_concurrent_requests,
            label_filter_on_every_page: config.label_filter_on_every_page,
        }
    }
}

/// Build a record from message headers.
///
/// Only the exact names `Date`, `From` and `To` are read; a repeated header
/// keeps its last value. Missing headers become empty fields.
pub fn extract_record(headers: &[MessageHeader]) -> MessageRecord {
    let mut record = MessageRecord::default();

    for header in headers {
        match header.name.as_str() {
            "Date" => record.date = header.value.clone(),
            "From" => record.from = parse_address(&header.value),
            "To" => record.to = header.value.clone(),
            _ => {}
        }
    }

    record
}

/// Fetch one message and extract its record.
///
/// Failures are logged and yield `None` so one bad message never aborts a batch.
pub async fn fetch_detail<C>(client: &C, message_id: &str) -> Option<MessageRecord>
where
    C: MailClient + ?Sized,
{
    info!("Reading message {}", message_id);

    match client.get_message_headers(message_id).await {
        Ok(headers) => Some(extract_record(&headers)),
        Err(e) => {
            warn!("Failed to read message {}: {}", message_id, e);
            None
        }
    }
}

/// Keep a record only when its sender is known and not excluded
pub fn filter_record(record: MessageRecord, filter: &ExclusionFilter) -> Option<Row> {
    let email = record.from_email();
    if email.is_empty() || filter.is_excluded(email) {
        info!("Ignore email from {} to {}", email, record.to);
        return None;
    }
    Row::from_record(record)
}

/// Apply the exclusion filter to a batch of fetched records
pub fn filter_records<I>(records: I, filter: &ExclusionFilter) -> Vec<Row>
where
    I: IntoIterator<Item = MessageRecord>,
{
    records
        .into_iter()
        .filter_map(|record| filter_record(record, filter))
        .collect()
}

/// Drives the per-label export over a [`MailClient`]
pub struct ExportScanner<C> {
    client: C,
    filter: ExclusionFilter,
    config: ScanConfig,
}

impl<C> ExportScanner<C>
where
    C: MailClient,
{
    pub fn new(client: C, filter: ExclusionFilter, config: ScanConfig) -> Self {
        Self {
            client,
            filter,
            config,
        }
    }

    /// Fetch every id concurrently, wait for all of them, then filter.
    ///
    /// Row order follows completion order, not input order.
    pub async fn fetch_and_filter(&self, message_ids: Vec<String>) -> Vec<Row> {
        let total = message_ids.len();
        let concurrency = self.config.concurrent_fetches.max(1);
        debug!(
            "Fetching {} messages with {} concurrent workers",
            total, concurrency
        );

        let records: Vec<Option<MessageRecord>> = stream::iter(message_ids)
            .map(|id| {
                let client = &self.client;
                async move { fetch_detail(client, &id).await }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let fetched: Vec<MessageRecord> = records.into_iter().flatten().collect();
        if fetched.len() < total {
            warn!("Failed to fetch {} of {} messages", total - fetched.len(), total);
        }

        filter_records(fetched, &self.filter)
    }

    /// Collect rows for one label, following `nextPageToken` to the end
    pub async fn collect_rows(&self, label: &LabelInfo) -> Result<Vec<Row>> {
        info!("Start getting messages from label {}", label.name);

        let page_size = self.config.page_size;
        let first = self
            .client
            .list_messages(Some(label.id.clone()), None, page_size)
            .await?;

        if first.message_ids.is_empty() {
            info!("No messages in label {}", label.name);
            return Ok(Vec::new());
        }

        let mut rows = self.fetch_and_filter(first.message_ids).await;
        info!("... first page of {}: totally {} rows", label.name, rows.len());

        let mut page_token = first.next_page_token;
        while let Some(token) = page_token {
            let label_filter = if self.config.label_filter_on_every_page {
                Some(label.id.clone())
            } else {
                warn!(
                    "Listing continuation page without label filter; results may include other labels"
                );
                None
            };

            let page = self
                .client
                .list_messages(label_filter, Some(token.clone()), page_size)
                .await?;

            let page_len = page.message_ids.len();
            rows.extend(self.fetch_and_filter(page.message_ids).await);

            info!(
                "... total {} emails on next page [page token: {}]. Totally {}",
                page_len,
                token,
                rows.len()
            );

            page_token = page.next_page_token;
        }

        Ok(rows)
    }

    /// Collect rows for every label in order and concatenate them
    pub async fn collect_labels(&self, labels: &[LabelInfo]) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for label in labels {
            rows.extend(self.collect_rows(label).await?);
        }
        info!("Collected {} rows from {} labels", rows.len(), labels.len());
        Ok(rows)
    }
}
