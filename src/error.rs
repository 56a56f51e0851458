use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Result with ExportError
pub type Result<T> = std::result::Result<T, ExportError>;

/// Error types for the Gmail export pipeline
#[derive(Error, Debug)]
pub enum ExportError {
    /// Gmail API returned an error
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Rate limit exceeded - should retry after specified seconds
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found (404)
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Message came back without the parts we read
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    /// Destination file is already there; we never overwrite
    #[error("Output file {0:?} already exists. Please delete it before running the export.")]
    OutputExists(PathBuf),

    /// Spreadsheet writer failed
    #[error("Failed to write spreadsheet: {0}")]
    SinkError(String),

    /// Label selection string could not be understood
    #[error("Invalid label selection: {0}")]
    InvalidSelection(String),

    /// User cancelled operation
    #[error("Operation cancelled: {0}")]
    OperationCancelled(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic catch-all error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ExportError {
    /// Check if the error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ExportError::RateLimitExceeded { .. }
                | ExportError::ServerError { .. }
                | ExportError::NetworkError(_)
        )
    }
}

impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        ExportError::SinkError(error.to_string())
    }
}

impl From<csv::Error> for ExportError {
    fn from(error: csv::Error) -> Self {
        ExportError::SinkError(error.to_string())
    }
}

/// Parse the Retry-After header from an HTTP response
///
/// Accepts both delay-seconds ("120") and HTTP-date forms. Falls back to
/// 5 seconds when the header is missing, invalid or in the past.
fn parse_retry_after_header<B>(response: &hyper::Response<B>) -> u64 {
    const DEFAULT_RETRY_AFTER: u64 = 5;

    if let Some(retry_after_value) = response.headers().get("retry-after") {
        if let Ok(retry_after_str) = retry_after_value.to_str() {
            if let Ok(seconds) = retry_after_str.parse::<u64>() {
                return seconds;
            }

            if let Ok(http_date) = httpdate::parse_http_date(retry_after_str) {
                let now = std::time::SystemTime::now();
                if let Ok(duration) = http_date.duration_since(now) {
                    return duration.as_secs();
                }
            }
        }
    }

    DEFAULT_RETRY_AFTER
}

impl From<google_gmail1::Error> for ExportError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                let status_code = status.as_u16();
                let message = format!(
                    "HTTP {}: {}",
                    status_code,
                    status.canonical_reason().unwrap_or("Unknown")
                );

                match status_code {
                    429 => {
                        let retry_after = parse_retry_after_header(response);
                        ExportError::RateLimitExceeded { retry_after }
                    }
                    401 => ExportError::AuthError(message),
                    404 => ExportError::MessageNotFound("Resource not found".to_string()),
                    400 => ExportError::BadRequest(message),
                    403 => ExportError::Forbidden(message),
                    500..=599 => ExportError::ServerError {
                        status: status_code,
                        message,
                    },
                    _ => ExportError::ApiError(message),
                }
            }
            google_gmail1::Error::BadRequest(ref err) => ExportError::BadRequest(format!("{}", err)),
            google_gmail1::Error::MissingToken(ref err) => {
                ExportError::AuthError(format!("Missing token: {}", err))
            }
            google_gmail1::Error::HttpError(ref err) => {
                ExportError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => ExportError::NetworkError(err.to_string()),
            _ => ExportError::ApiError(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        let rate_limit = ExportError::RateLimitExceeded { retry_after: 5 };
        assert!(rate_limit.is_transient());

        let server_error = ExportError::ServerError {
            status: 503,
            message: "Service unavailable".to_string(),
        };
        assert!(server_error.is_transient());

        let network_error = ExportError::NetworkError("Connection timeout".to_string());
        assert!(network_error.is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(!ExportError::BadRequest("Invalid query".to_string()).is_transient());
        assert!(!ExportError::MessageNotFound("msg123".to_string()).is_transient());
        assert!(!ExportError::Forbidden("Access denied".to_string()).is_transient());
        assert!(!ExportError::OutputExists(PathBuf::from("emails.xlsx")).is_transient());
        assert!(!ExportError::SinkError("disk full".to_string()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let error = ExportError::RateLimitExceeded { retry_after: 10 };
        let display = format!("{}", error);
        assert!(display.contains("Rate limit exceeded"));
        assert!(display.contains("10 seconds"));

        let exists = ExportError::OutputExists(PathBuf::from("emails.xlsx"));
        let display = format!("{}", exists);
        assert!(display.contains("emails.xlsx"));
        assert!(display.contains("already exists"));
    }

    #[test]
    fn test_parse_retry_after_header_integer() {
        let mut response = hyper::Response::builder().status(429).body(()).unwrap();
        response.headers_mut().insert(
            "retry-after",
            hyper::header::HeaderValue::from_static("120"),
        );

        assert_eq!(parse_retry_after_header(&response), 120);
    }

    #[test]
    fn test_parse_retry_after_header_missing() {
        let response = hyper::Response::builder().status(429).body(()).unwrap();
        assert_eq!(parse_retry_after_header(&response), 5);
    }

    #[test]
    fn test_parse_retry_after_header_invalid() {
        let mut response = hyper::Response::builder().status(429).body(()).unwrap();
        response.headers_mut().insert(
            "retry-after",
            hyper::header::HeaderValue::from_static("invalid"),
        );

        assert_eq!(parse_retry_after_header(&response), 5);
    }

    #[test]
    fn test_parse_retry_after_header_http_date() {
        let mut response = hyper::Response::builder().status(429).body(()).unwrap();

        let future_time = std::time::SystemTime::now() + std::time::Duration::from_secs(60);
        let http_date = httpdate::fmt_http_date(future_time);

        response.headers_mut().insert(
            "retry-after",
            hyper::header::HeaderValue::from_str(&http_date).unwrap(),
        );

        let retry_after = parse_retry_after_header(&response);
        assert!(
            (58..=61).contains(&retry_after),
            "Expected ~60, got {}",
            retry_after
        );
    }

    #[test]
    fn test_parse_retry_after_header_past_http_date() {
        let mut response = hyper::Response::builder().status(429).body(()).unwrap();

        let past_time = std::time::SystemTime::now() - std::time::Duration::from_secs(60);
        let http_date = httpdate::fmt_http_date(past_time);

        response.headers_mut().insert(
            "retry-after",
            hyper::header::HeaderValue::from_str(&http_date).unwrap(),
        );

        assert_eq!(parse_retry_after_header(&response), 5);
    }
}
