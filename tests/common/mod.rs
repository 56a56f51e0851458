//! Common test utilities and fixtures
#![allow(dead_code)]

use gmail_export::client::MailClient;
use gmail_export::config::Config;
use gmail_export::error::Result;
use gmail_export::models::{LabelInfo, MessageHeader, MessagePage};
use mockall::mock;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

mock! {
    pub MailClient {}

    #[async_trait::async_trait]
    impl MailClient for MailClient {
        async fn list_labels(&self) -> Result<Vec<LabelInfo>>;
        async fn list_messages(
            &self,
            label_id: Option<String>,
            page_token: Option<String>,
            max_results: u32,
        ) -> Result<MessagePage>;
        async fn get_message_headers(&self, message_id: &str) -> Result<Vec<MessageHeader>>;
    }
}

pub fn label(id: &str, name: &str) -> LabelInfo {
    LabelInfo {
        id: id.to_string(),
        name: name.to_string(),
    }
}

pub fn page(ids: &[&str], next_page_token: Option<&str>) -> MessagePage {
    MessagePage {
        message_ids: ids.iter().map(|id| id.to_string()).collect(),
        next_page_token: next_page_token.map(String::from),
    }
}

/// Date/From/To header triple as returned for one message
pub fn headers(from: &str, to: &str) -> Vec<MessageHeader> {
    vec![
        MessageHeader::new("Date", "Mon, 1 Jan 2024 10:00:00 -0800"),
        MessageHeader::new("Subject", "Hello"),
        MessageHeader::new("From", from),
        MessageHeader::new("To", to),
    ]
}

/// Sequential ids `m0..mN`
pub fn message_ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}{}", prefix, i)).collect()
}

/// Default config writing to `output`, with a small fan-out
pub fn test_config(output: &Path) -> Config {
    let mut config = Config::default();
    config.export.output_path = output.to_path_buf();
    config.export.max_concurrent_requests = 4;
    config
}

/// Collects formatted log output from the current thread
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Route this thread's tracing events into the capture until the guard drops
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_target(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
