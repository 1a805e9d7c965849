use thiserror::Error;

/// Type alias for Result with RetentionError
pub type Result<T> = std::result::Result<T, RetentionError>;

/// Error types for the retention engine and its Gmail collaborator
#[derive(Error, Debug)]
pub enum RetentionError {
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

    /// Invalid message format or parsing error
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    /// Listing the messages of a managed label failed part-way
    #[error("Failed to list messages for label '{label}': {message}")]
    ListingFailed { label: String, message: String },

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RetentionError {
    /// Check if the error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RetentionError::RateLimitExceeded { .. }
                | RetentionError::ServerError { .. }
                | RetentionError::NetworkError(_)
        )
    }

    /// Check if the error is permanent and should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

/// Parse the Retry-After header from an HTTP response
///
/// Accepts both delay-seconds ("120") and HTTP-date forms. Missing, invalid
/// or past values fall back to 5 seconds.
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

impl From<google_gmail1::Error> for RetentionError {
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
                        RetentionError::RateLimitExceeded { retry_after }
                    }
                    404 => RetentionError::MessageNotFound("Resource not found".to_string()),
                    400 => RetentionError::BadRequest(message),
                    403 => RetentionError::Forbidden(message),
                    500..=599 => RetentionError::ServerError {
                        status: status_code,
                        message,
                    },
                    _ => RetentionError::ApiError(message),
                }
            }
            google_gmail1::Error::BadRequest(ref err) => {
                RetentionError::BadRequest(format!("{}", err))
            }
            google_gmail1::Error::HttpError(ref err) => {
                RetentionError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => RetentionError::NetworkError(err.to_string()),
            _ => RetentionError::ApiError(error.to_string()),
        }
    }
}
