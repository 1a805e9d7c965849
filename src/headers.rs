//! Header extraction: turns a raw provider message into a [`MessageHeader`]

use chrono::{DateTime, Utc};

use crate::error::{RetentionError, Result};
use crate::models::{HeaderField, MessageHeader, MessageRecord};

/// Header names the engine reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKey {
    Subject,
    From,
}

impl HeaderKey {
    pub const ALL: [HeaderKey; 2] = [HeaderKey::Subject, HeaderKey::From];

    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderKey::Subject => "Subject",
            HeaderKey::From => "From",
        }
    }
}

/// First value whose name matches exactly, or "" when absent
pub fn header_value<'a>(headers: &'a [HeaderField], name: &str) -> &'a str {
    headers
        .iter()
        .find(|h| h.name == name)
        .map(|h| h.value.as_str())
        .unwrap_or("")
}

/// Convert a millisecond delivery timestamp to whole seconds in UTC
pub fn timestamp_from_millis(millis: i64) -> Result<DateTime<Utc>> {
    let seconds = millis.div_euclid(1000);
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        RetentionError::InvalidMessageFormat(format!(
            "internal date {} ms is out of range",
            millis
        ))
    })
}

pub fn extract_message_header(record: &MessageRecord) -> Result<MessageHeader> {
    Ok(MessageHeader {
        id: record.id.clone(),
        subject: header_value(&record.headers, HeaderKey::Subject.as_str()).to_string(),
        from: header_value(&record.headers, HeaderKey::From.as_str()).to_string(),
        time: timestamp_from_millis(record.internal_date_ms)?,
        message_id: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(headers: Vec<HeaderField>) -> MessageRecord {
        MessageRecord {
            id: "18c2f".to_string(),
            internal_date_ms: 1_704_124_800_999,
            headers,
        }
    }

    #[test]
    fn test_extracts_subject_and_from() {
        let record = record(vec![
            HeaderField::new("Date", "Mon, 1 Jan 2024 10:00:00 -0800"),
            HeaderField::new("From", "Investing Insights <insights@example.com>"),
            HeaderField::new("Subject", "Inflation: Persistently Transitory"),
        ]);

        let header = extract_message_header(&record).unwrap();
        assert_eq!(header.id, "18c2f");
        assert_eq!(header.from, "Investing Insights <insights@example.com>");
        assert_eq!(header.subject, "Inflation: Persistently Transitory");
        assert_eq!(header.message_id, "");
    }

    #[test]
    fn test_timestamp_floors_to_seconds() {
        let header = extract_message_header(&record(vec![])).unwrap();
        assert_eq!(header.time, Utc.timestamp_opt(1_704_124_800, 0).unwrap());
    }

    #[test]
    fn test_negative_timestamp_floors_down() {
        let time = timestamp_from_millis(-1).unwrap();
        assert_eq!(time.timestamp(), -1);
    }

    #[test]
    fn test_out_of_range_timestamp_is_an_error() {
        let result = timestamp_from_millis(i64::MAX);
        assert!(matches!(
            result,
            Err(RetentionError::InvalidMessageFormat(_))
        ));
    }

    #[test]
    fn test_missing_headers_are_empty() {
        let header = extract_message_header(&record(vec![HeaderField::new("To", "me@example.com")]))
            .unwrap();
        assert_eq!(header.subject, "");
        assert_eq!(header.from, "");
    }

    #[test]
    fn test_lookup_is_case_sensitive_first_match() {
        let headers = vec![
            HeaderField::new("from", "lower@example.com"),
            HeaderField::new("From", "first@example.com"),
            HeaderField::new("From", "second@example.com"),
        ];

        assert_eq!(header_value(&headers, "From"), "first@example.com");
        assert_eq!(header_value(&headers, "FROM"), "");
    }

    #[test]
    fn test_header_keys() {
        let names: Vec<_> = HeaderKey::ALL.iter().map(HeaderKey::as_str).collect();
        assert_eq!(names, vec!["Subject", "From"]);
    }
}
