//! Mail-service collaborator: the narrow Gmail interface the engine consumes

use async_trait::async_trait;
use google_gmail1::api::Message;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::GmailHub;
use crate::config::{ClientConfig, DeletionMode};
use crate::error::{RetentionError, Result};
use crate::headers::HeaderKey;
use crate::models::{HeaderField, Label, MessagePage, MessageRecord};

/// Progress callback type for per-message operations
pub type ProgressCallback = Arc<dyn Fn() + Send + Sync>;

/// Scope for permanent deletion (messages.delete)
pub const FULL_ACCESS_SCOPE: &str = "https://mail.google.com/";

/// Scope for listing, reading metadata and trashing
pub const MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// Largest page size messages.list accepts
const PAGE_SIZE: u32 = 500;

/// Operations the retention engine needs from a mail account
#[async_trait]
pub trait MailService: Send + Sync {
    /// List all labels in the account
    async fn list_labels(&self) -> Result<Vec<Label>>;

    /// List one page of message ids under a label
    async fn list_message_ids_page(
        &self,
        label_id: &str,
        page_token: Option<String>,
    ) -> Result<MessagePage>;

    /// Get delivery timestamp and headers of a message
    async fn get_message(&self, id: &str) -> Result<MessageRecord>;

    /// Delete a message by id
    async fn delete_message(&self, id: &str) -> Result<()>;
}

/// Gmail API client with retry logic and per-call timeouts
pub struct ProductionGmailClient {
    hub: GmailHub,
    user_id: String,
    deletion_mode: DeletionMode,
    max_retries: u32,
    request_timeout: Duration,
}

impl ProductionGmailClient {
    pub fn new(
        hub: GmailHub,
        user_id: impl Into<String>,
        deletion_mode: DeletionMode,
        client_config: &ClientConfig,
    ) -> Self {
        Self {
            hub,
            user_id: user_id.into(),
            deletion_mode,
            max_retries: client_config.max_retries,
            request_timeout: Duration::from_secs(client_config.request_timeout_secs),
        }
    }

    /// Scope used for read calls; the full scope also covers reads
    fn read_scope(&self) -> &'static str {
        match self.deletion_mode {
            DeletionMode::Permanent => FULL_ACCESS_SCOPE,
            DeletionMode::Trash => MODIFY_SCOPE,
        }
    }

    /// Check if an error is retryable
    fn should_retry(error: &RetentionError) -> bool {
        error.is_transient()
    }

    /// Run an API call bounded by the configured timeout
    async fn with_timeout<T, Fut>(&self, operation_name: &str, call: Fut) -> Result<T>
    where
        Fut: Future<Output = std::result::Result<T, google_gmail1::Error>>,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result.map_err(RetentionError::from),
            Err(_) => {
                warn!(
                    "Gmail API {} call timed out after {:?}",
                    operation_name, self.request_timeout
                );
                Err(RetentionError::NetworkError(format!(
                    "API call timed out after {:?}",
                    self.request_timeout
                )))
            }
        }
    }

    /// Execute an async operation with exponential backoff retry
    async fn with_retry<T, F, Fut>(
        operation_name: &str,
        max_retries: u32,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = Duration::from_secs(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if Self::should_retry(&e) && attempts <= max_retries => {
                    let wait = match e {
                        RetentionError::RateLimitExceeded { retry_after } => {
                            std::cmp::max(delay, Duration::from_secs(retry_after))
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

    /// Retry a delete. A 404 on a retry means an earlier attempt was applied
    /// before its response was lost, so it counts as success.
    async fn with_delete_retry<F, Fut>(
        operation_name: &str,
        max_retries: u32,
        mut operation: F,
    ) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut attempted = false;
        Self::with_retry(operation_name, max_retries, || {
            let is_retry = attempted;
            attempted = true;
            let call = operation();
            async move {
                match call.await {
                    Err(RetentionError::MessageNotFound(msg)) if is_retry => {
                        debug!("{} already applied: {}", operation_name, msg);
                        Ok(())
                    }
                    other => other,
                }
            }
        })
        .await
    }
}

/// Convert a Gmail API message into a [`MessageRecord`]
fn parse_message_record(id: &str, msg: Message) -> Result<MessageRecord> {
    let internal_date_ms = msg.internal_date.ok_or_else(|| {
        RetentionError::InvalidMessageFormat(format!("Message {} has no internal date", id))
    })?;

    let headers = msg
        .payload
        .and_then(|p| p.headers)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|h| match (h.name, h.value) {
            (Some(name), Some(value)) => Some(HeaderField { name, value }),
            _ => None,
        })
        .collect();

    Ok(MessageRecord {
        id: msg.id.unwrap_or_else(|| id.to_string()),
        internal_date_ms,
        headers,
    })
}

#[async_trait]
impl MailService for ProductionGmailClient {
    async fn list_labels(&self) -> Result<Vec<Label>> {
        Self::with_retry("list_labels", self.max_retries, || async {
            debug!("Calling Gmail API to list labels...");
            let call = self
                .hub
                .users()
                .labels_list(&self.user_id)
                .add_scope(self.read_scope())
                .doit();
            let (_, response) = self.with_timeout("list_labels", call).await?;

            let labels: Vec<Label> = response
                .labels
                .unwrap_or_default()
                .into_iter()
                .filter_map(|label| match (label.id, label.name) {
                    (Some(id), Some(name)) => Some(Label { id, name }),
                    _ => None,
                })
                .collect();

            debug!("Successfully parsed {} labels", labels.len());
            Ok(labels)
        })
        .await
    }

    async fn list_message_ids_page(
        &self,
        label_id: &str,
        page_token: Option<String>,
    ) -> Result<MessagePage> {
        Self::with_retry("list_message_ids", self.max_retries, || async {
            let mut call = self
                .hub
                .users()
                .messages_list(&self.user_id)
                .add_label_ids(label_id)
                .max_results(PAGE_SIZE);

            if let Some(token) = page_token.as_deref() {
                call = call.page_token(token);
            }

            let (_, response) = self
                .with_timeout("list_message_ids", call.add_scope(self.read_scope()).doit())
                .await?;

            let ids = response
                .messages
                .unwrap_or_default()
                .into_iter()
                .filter_map(|msg_ref| msg_ref.id)
                .collect();

            Ok(MessagePage {
                ids,
                next_page_token: response.next_page_token,
            })
        })
        .await
    }

    async fn get_message(&self, id: &str) -> Result<MessageRecord> {
        Self::with_retry("get_message", self.max_retries, || async {
            let mut call = self
                .hub
                .users()
                .messages_get(&self.user_id, id)
                .format("metadata");

            for key in HeaderKey::ALL {
                call = call.add_metadata_headers(key.as_str());
            }

            let (_, msg) = self
                .with_timeout("get_message", call.add_scope(self.read_scope()).doit())
                .await?;

            parse_message_record(id, msg)
        })
        .await
    }

    async fn delete_message(&self, id: &str) -> Result<()> {
        Self::with_delete_retry("delete_message", self.max_retries, || async {
            match self.deletion_mode {
                DeletionMode::Permanent => {
                    let call = self
                        .hub
                        .users()
                        .messages_delete(&self.user_id, id)
                        .add_scope(FULL_ACCESS_SCOPE)
                        .doit();
                    self.with_timeout("delete_message", call).await?;
                }
                DeletionMode::Trash => {
                    let call = self
                        .hub
                        .users()
                        .messages_trash(&self.user_id, id)
                        .add_scope(MODIFY_SCOPE)
                        .doit();
                    self.with_timeout("trash_message", call).await?;
                }
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use google_gmail1::api::{MessagePart, MessagePartHeader};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn gmail_message(internal_date: Option<i64>, headers: Vec<(&str, &str)>) -> Message {
        Message {
            id: Some("18c2f".to_string()),
            internal_date,
            payload: Some(MessagePart {
                headers: Some(
                    headers
                        .into_iter()
                        .map(|(name, value)| MessagePartHeader {
                            name: Some(name.to_string()),
                            value: Some(value.to_string()),
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_should_retry_transient_errors() {
        assert!(ProductionGmailClient::should_retry(&RetentionError::ServerError {
            status: 500,
            message: "Internal error".to_string(),
        }));
        assert!(ProductionGmailClient::should_retry(
            &RetentionError::NetworkError("connection reset".to_string())
        ));
        assert!(!ProductionGmailClient::should_retry(
            &RetentionError::AuthError("invalid token".to_string())
        ));
        assert!(!ProductionGmailClient::should_retry(
            &RetentionError::MessageNotFound("gone".to_string())
        ));
    }

    #[test]
    fn test_parse_message_record() {
        let msg = gmail_message(
            Some(1_704_124_800_000),
            vec![("From", "news@example.com"), ("Subject", "Weekly")],
        );

        let record = parse_message_record("18c2f", msg).unwrap();
        assert_eq!(record.id, "18c2f");
        assert_eq!(record.internal_date_ms, 1_704_124_800_000);
        assert_eq!(record.headers.len(), 2);
        assert_eq!(record.headers[0], HeaderField::new("From", "news@example.com"));
    }

    #[test]
    fn test_parse_message_record_without_payload() {
        let msg = Message {
            internal_date: Some(0),
            ..Default::default()
        };

        let record = parse_message_record("abc", msg).unwrap();
        assert_eq!(record.id, "abc");
        assert!(record.headers.is_empty());
    }

    #[test]
    fn test_parse_message_record_missing_internal_date() {
        let msg = gmail_message(None, vec![("From", "news@example.com")]);
        let result = parse_message_record("18c2f", msg);
        assert!(matches!(result, Err(RetentionError::InvalidMessageFormat(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_succeeds_after_transient_error() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = Arc::clone(&attempt_count);

        let result = ProductionGmailClient::with_retry("test_op", 3, || {
            let count = Arc::clone(&attempt_count_clone);
            async move {
                if count.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RetentionError::NetworkError("Connection timeout".to_string()))
                } else {
                    Ok("success".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_fails_on_permanent_error() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = Arc::clone(&attempt_count);

        let result = ProductionGmailClient::with_retry("test_op", 3, || {
            let count = Arc::clone(&attempt_count_clone);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(RetentionError::Forbidden("Insufficient scope".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_exhausts_all_retries() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = Arc::clone(&attempt_count);

        let result = ProductionGmailClient::with_retry("test_op", 2, || {
            let count = Arc::clone(&attempt_count_clone);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(RetentionError::RateLimitExceeded { retry_after: 1 })
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(RetentionError::RateLimitExceeded { .. })
        ));
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_zero_retries_is_single_attempt() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = Arc::clone(&attempt_count);

        let result = ProductionGmailClient::with_retry("test_op", 0, || {
            let count = Arc::clone(&attempt_count_clone);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(RetentionError::NetworkError("down".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_retry_treats_not_found_after_timeout_as_deleted() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = Arc::clone(&attempt_count);

        let result = ProductionGmailClient::with_delete_retry("delete_message", 3, || {
            let count = Arc::clone(&attempt_count_clone);
            async move {
                if count.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(RetentionError::NetworkError("timed out".to_string()))
                } else {
                    Err(RetentionError::MessageNotFound("m1".to_string()))
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delete_retry_not_found_on_first_attempt_fails() {
        let result = ProductionGmailClient::with_delete_retry("delete_message", 3, || async {
            Err(RetentionError::MessageNotFound("m1".to_string()))
        })
        .await;

        assert!(matches!(result, Err(RetentionError::MessageNotFound(_))));
    }
}
