//! Sender exclusion filter
//!
//! Drops automated senders (newsletters, noreply, notification robots) by
//! substring match on the sender email. Tokens are matched literally; the
//! default list carries both "info" and "Info" because matching is
//! case-sensitive unless `case_insensitive` is set.

use regex::{Regex, RegexBuilder};

use crate::config::FilterConfig;
use crate::error::{ExportError, Result};

/// Tokens that mark an automated sender
pub const DEFAULT_EXCLUDE_TOKENS: &[&str] = &[
    "info",
    "Info",
    "noreply",
    "newsletter",
    "Newsletter",
    "notifications",
];

/// Predicate over sender emails
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    tokens: Vec<String>,
    pattern: Option<Regex>,
}

impl ExclusionFilter {
    /// Build a filter from literal tokens
    pub fn new<I, S>(tokens: I, case_insensitive: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| !t.is_empty())
            .collect();

        let pattern = if tokens.is_empty() {
            None
        } else {
            let alternation = tokens
                .iter()
                .map(|t| format!("({})", regex::escape(t)))
                .collect::<Vec<_>>()
                .join("|");
            let regex = RegexBuilder::new(&alternation)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|e| {
                    ExportError::ConfigError(format!("Invalid exclusion pattern: {}", e))
                })?;
            Some(regex)
        };

        Ok(Self { tokens, pattern })
    }

    /// Filter with the built-in token list and literal case matching
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_EXCLUDE_TOKENS.iter().copied(), false)
            .expect("default exclusion tokens form a valid pattern")
    }

    /// Build from the `[filter]` config section
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        Self::new(config.exclude_tokens.iter().cloned(), config.case_insensitive)
    }

    /// True when any token occurs in `email`
    pub fn is_excluded(&self, email: &str) -> bool {
        self.pattern
            .as_ref()
            .map(|p| p.is_match(email))
            .unwrap_or(false)
    }

    /// Tokens this filter matches on
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::with_defaults()
    }
}
