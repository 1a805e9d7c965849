//! Common test utilities and fixtures
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use gmail_retention::client::MailService;
use gmail_retention::error::Result;
use gmail_retention::models::{HeaderField, Label, MessagePage, MessageRecord};
use mockall::mock;

/// Fixed evaluation instant so KeepDays boundaries are exact
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Millisecond delivery timestamp `days` days before [`test_now`]
pub fn days_ago_ms(days: i64) -> i64 {
    (test_now() - Duration::days(days)).timestamp_millis()
}

/// Millisecond delivery timestamp `minutes` minutes before [`test_now`]
pub fn minutes_ago_ms(minutes: i64) -> i64 {
    (test_now() - Duration::minutes(minutes)).timestamp_millis()
}

pub fn create_test_label(id: &str, name: &str) -> Label {
    Label::new(id, name)
}

/// Create a provider message record with From and Subject headers
pub fn create_record(id: &str, from: &str, internal_date_ms: i64) -> MessageRecord {
    MessageRecord {
        id: id.to_string(),
        internal_date_ms,
        headers: vec![
            HeaderField::new("From", from),
            HeaderField::new("Subject", format!("Message {}", id)),
        ],
    }
}

/// Create one listing page
pub fn page(ids: &[&str], next_page_token: Option<&str>) -> MessagePage {
    MessagePage {
        ids: ids.iter().map(|id| id.to_string()).collect(),
        next_page_token: next_page_token.map(str::to_string),
    }
}

/// Expect a single-page listing of `ids` under `label_id`
pub fn expect_single_page(mock: &mut MockMailService, label_id: &'static str, ids: &[&str]) {
    let listed = page(ids, None);
    mock.expect_list_message_ids_page()
        .withf(move |id, token| id == label_id && token.is_none())
        .times(1)
        .returning(move |_, _| Ok(listed.clone()));
}

/// Serve `get_message` from a fixed set of records
pub fn expect_records(mock: &mut MockMailService, records: Vec<MessageRecord>) {
    mock.expect_get_message().returning(move |id| {
        records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| gmail_retention::error::RetentionError::MessageNotFound(id.to_string()))
    });
}

mock! {
    pub MailService {}

    #[async_trait::async_trait]
    impl MailService for MailService {
        async fn list_labels(&self) -> Result<Vec<Label>>;
        async fn list_message_ids_page(
            &self,
            label_id: &str,
            page_token: Option<String>,
        ) -> Result<MessagePage>;
        async fn get_message(&self, id: &str) -> Result<MessageRecord>;
        async fn delete_message(&self, id: &str) -> Result<()>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_record() {
        let record = create_record("m1", "a@example.com", 1_000);
        assert_eq!(record.id, "m1");
        assert_eq!(record.headers[0], HeaderField::new("From", "a@example.com"));
    }

    #[test]
    fn test_days_ago_ms() {
        assert_eq!(days_ago_ms(0), test_now().timestamp_millis());
        assert_eq!(days_ago_ms(1) + 86_400_000, days_ago_ms(0));
    }
}
