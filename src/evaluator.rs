//! Retention evaluation: decides which messages under a label violate its rule

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::models::{MessageHeader, RetentionRule};

/// Ids of messages that violate `rule`
pub fn evaluate(rule: &RetentionRule, headers: &[MessageHeader], now: DateTime<Utc>) -> Vec<String> {
    match *rule {
        RetentionRule::KeepLast { count } => select_keep_last(headers, count),
        RetentionRule::KeepDays { days } => select_keep_days(headers, days, now),
    }
}

/// Select everything beyond the `count` most recent messages of each sender.
///
/// Messages are ordered newest first with a stable sort, so equal timestamps
/// keep their fetch order. Senders are compared on the raw `From` value.
pub fn select_keep_last(headers: &[MessageHeader], count: u32) -> Vec<String> {
    let mut ordered: Vec<&MessageHeader> = headers.iter().collect();
    ordered.sort_by(|a, b| b.time.cmp(&a.time));

    let mut seen: HashMap<&str, u32> = HashMap::new();
    let mut selected = Vec::new();

    for header in ordered {
        let seen_count = seen.entry(header.from.as_str()).or_insert(0);
        *seen_count += 1;
        if *seen_count > count {
            selected.push(header.id.clone());
        }
    }

    selected
}

/// Cutoff instant for a KeepDays rule, `None` if it is before the representable range
pub fn keep_days_cutoff(days: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
}

/// Select messages delivered strictly before `now - days`
pub fn select_keep_days(headers: &[MessageHeader], days: u32, now: DateTime<Utc>) -> Vec<String> {
    let Some(cutoff) = keep_days_cutoff(days, now) else {
        return Vec::new();
    };

    headers
        .iter()
        .filter(|h| h.time < cutoff)
        .map(|h| h.id.clone())
        .collect()
}

/// Number of distinct senders among the headers
pub fn distinct_senders(headers: &[MessageHeader]) -> usize {
    let mut senders: Vec<&str> = headers.iter().map(|h| h.from.as_str()).collect();
    senders.sort_unstable();
    senders.dedup();
    senders.len()
}
