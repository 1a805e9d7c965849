//! Label classification: finds the labels whose names carry retention rules
//!
//! A label named `<prefix>/KeepLast<N>` keeps the N most recent messages of
//! every sender; `<prefix>/KeepDays<D>` keeps messages from the last D days.
//! Every other label is ignored.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{Label, ManagedLabel, RetentionRule};

/// Default label prefix for managed labels
pub const DEFAULT_PREFIX: &str = "ManagedLabels";

const KEEP_LAST: &str = "KeepLast";
const KEEP_DAYS: &str = "KeepDays";

/// Labels split into rule buckets, each in account listing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedLabels {
    pub keep_last: Vec<ManagedLabel>,
    pub keep_days: Vec<ManagedLabel>,
}

impl ClassifiedLabels {
    pub fn is_empty(&self) -> bool {
        self.keep_last.is_empty() && self.keep_days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keep_last.len() + self.keep_days.len()
    }

    /// All managed labels, KeepLast bucket first
    pub fn iter(&self) -> impl Iterator<Item = &ManagedLabel> {
        self.keep_last.iter().chain(self.keep_days.iter())
    }

    /// Human-readable warnings for rules whose parameter is zero
    pub fn warnings(&self) -> Vec<String> {
        self.iter().filter_map(degenerate_rule_warning).collect()
    }
}

fn degenerate_rule_warning(managed: &ManagedLabel) -> Option<String> {
    if !managed.rule.is_degenerate() {
        return None;
    }

    let cause = if managed.parameter_parsed {
        "has a zero parameter"
    } else {
        "has no numeric suffix, parameter defaults to 0"
    };
    let effect = match managed.rule {
        RetentionRule::KeepLast { .. } => "every message under it will be deleted",
        RetentionRule::KeepDays { .. } => "every message older than now will be deleted",
    };

    Some(format!("Label '{}' {}: {}", managed.label.name, cause, effect))
}

/// Parse a rule suffix as a base-10 integer, falling back to 0.
///
/// An all-digit suffix too large for `u32` saturates to `u32::MAX`.
fn parse_parameter(suffix: &str) -> (u32, bool) {
    let digits = suffix.strip_prefix('+').unwrap_or(suffix);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return (0, false);
    }

    (digits.parse::<u32>().unwrap_or(u32::MAX), true)
}

/// Classify a single label, `None` when it is not managed
pub fn classify_label(label: &Label, prefix: &str) -> Option<ManagedLabel> {
    let rest = label.name.strip_prefix(prefix)?.strip_prefix('/')?;

    let (rule, parameter_parsed) = if let Some(suffix) = rest.strip_prefix(KEEP_LAST) {
        let (count, parsed) = parse_parameter(suffix);
        (RetentionRule::KeepLast { count }, parsed)
    } else if let Some(suffix) = rest.strip_prefix(KEEP_DAYS) {
        let (days, parsed) = parse_parameter(suffix);
        (RetentionRule::KeepDays { days }, parsed)
    } else {
        return None;
    };

    let managed = ManagedLabel {
        label: label.clone(),
        rule,
        parameter_parsed,
    };

    if let Some(warning) = degenerate_rule_warning(&managed) {
        warn!("{}", warning);
    }

    Some(managed)
}

/// Partition account labels into KeepLast and KeepDays rules
pub fn classify_labels(labels: &[Label], prefix: &str) -> ClassifiedLabels {
    let mut classified = ClassifiedLabels::default();

    for label in labels {
        match classify_label(label, prefix) {
            Some(managed) => {
                debug!("Managed label '{}': {}", label.name, managed.rule);
                match managed.rule {
                    RetentionRule::KeepLast { .. } => classified.keep_last.push(managed),
                    RetentionRule::KeepDays { .. } => classified.keep_days.push(managed),
                }
            }
            None => debug!("Ignoring label '{}'", label.name),
        }
    }

    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::evaluate;
    use crate::models::MessageHeader;
    use chrono::{Duration, Utc};

    fn labels(names: &[&str]) -> Vec<Label> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Label::new(format!("Label_{}", i), *name))
            .collect()
    }

    #[test]
    fn test_keep_last_label() {
        let classified = classify_labels(&labels(&["ManagedLabels/KeepLast7"]), DEFAULT_PREFIX);

        assert_eq!(classified.keep_last.len(), 1);
        assert!(classified.keep_days.is_empty());
        assert_eq!(classified.keep_last[0].rule, RetentionRule::KeepLast { count: 7 });
        assert!(classified.keep_last[0].parameter_parsed);
        assert_eq!(classified.keep_last[0].label.id, "Label_0");
    }

    #[test]
    fn test_keep_days_label() {
        let classified = classify_labels(&labels(&["ManagedLabels/KeepDays30"]), DEFAULT_PREFIX);

        assert!(classified.keep_last.is_empty());
        assert_eq!(classified.keep_days[0].rule, RetentionRule::KeepDays { days: 30 });
    }

    #[test]
    fn test_unmanaged_labels_are_dropped() {
        let classified = classify_labels(
            &labels(&[
                "INBOX",
                "Receipts",
                "ManagedLabels",
                "ManagedLabels/Archive",
                "managedlabels/KeepLast3",
                "Other/ManagedLabels/KeepLast3",
                "ManagedLabelsX/KeepLast3",
            ]),
            DEFAULT_PREFIX,
        );

        assert!(classified.is_empty());
        assert!(classified.warnings().is_empty());
    }

    #[test]
    fn test_bucket_order_follows_label_order() {
        let classified = classify_labels(
            &labels(&[
                "ManagedLabels/KeepDays90",
                "ManagedLabels/KeepLast2",
                "Work",
                "ManagedLabels/KeepDays7",
                "ManagedLabels/KeepLast5",
            ]),
            DEFAULT_PREFIX,
        );

        let last: Vec<_> = classified.keep_last.iter().map(|m| m.rule.parameter()).collect();
        let days: Vec<_> = classified.keep_days.iter().map(|m| m.rule.parameter()).collect();
        assert_eq!(last, vec![2, 5]);
        assert_eq!(days, vec![90, 7]);
        assert_eq!(classified.len(), 4);
    }

    #[test]
    fn test_missing_suffix_defaults_to_zero_with_warning() {
        let classified = classify_labels(&labels(&["ManagedLabels/KeepLast"]), DEFAULT_PREFIX);

        let managed = &classified.keep_last[0];
        assert_eq!(managed.rule, RetentionRule::KeepLast { count: 0 });
        assert!(!managed.parameter_parsed);

        let warnings = classified.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("no numeric suffix"));
        assert!(warnings[0].contains("every message under it"));
    }

    #[test]
    fn test_non_numeric_suffix_defaults_to_zero() {
        let classified = classify_labels(
            &labels(&[
                "ManagedLabels/KeepDaysabc",
                "ManagedLabels/KeepLast-3",
                "ManagedLabels/KeepLast5/Newsletters",
            ]),
            DEFAULT_PREFIX,
        );

        assert_eq!(classified.keep_days[0].rule, RetentionRule::KeepDays { days: 0 });
        assert_eq!(classified.keep_last[0].rule, RetentionRule::KeepLast { count: 0 });
        assert_eq!(classified.keep_last[1].rule, RetentionRule::KeepLast { count: 0 });
        assert_eq!(classified.warnings().len(), 3);
    }

    #[test]
    fn test_explicit_zero_is_parsed_but_flagged() {
        let classified = classify_labels(&labels(&["ManagedLabels/KeepDays0"]), DEFAULT_PREFIX);

        assert!(classified.keep_days[0].parameter_parsed);
        let warnings = classified.warnings();
        assert!(warnings[0].contains("zero parameter"));
        assert!(warnings[0].contains("older than now"));
    }

    #[test]
    fn test_overflowing_suffix_saturates() {
        let classified = classify_labels(
            &labels(&[
                "ManagedLabels/KeepLast5000000000",
                "ManagedLabels/KeepDays99999999999999999999",
            ]),
            DEFAULT_PREFIX,
        );

        let last = &classified.keep_last[0];
        assert_eq!(last.rule, RetentionRule::KeepLast { count: u32::MAX });
        assert!(last.parameter_parsed);
        assert_eq!(classified.keep_days[0].rule, RetentionRule::KeepDays { days: u32::MAX });
        assert!(classified.warnings().is_empty());
    }

    #[test]
    fn test_overflowing_keep_last_deletes_nothing() {
        let now = Utc::now();
        let headers: Vec<MessageHeader> = (0..3)
            .map(|i| MessageHeader {
                id: format!("m{}", i),
                subject: String::new(),
                from: "a@example.com".to_string(),
                time: now - Duration::minutes(i),
                message_id: String::new(),
            })
            .collect();

        let managed =
            classify_label(&Label::new("L", "ManagedLabels/KeepLast5000000000"), DEFAULT_PREFIX)
                .unwrap();
        assert!(evaluate(&managed.rule, &headers, now).is_empty());

        let managed =
            classify_label(&Label::new("L", "ManagedLabels/KeepDays5000000000"), DEFAULT_PREFIX)
                .unwrap();
        assert!(evaluate(&managed.rule, &headers, now).is_empty());
    }

    #[test]
    fn test_plus_sign_is_accepted() {
        let managed =
            classify_label(&Label::new("L", "ManagedLabels/KeepLast+4"), DEFAULT_PREFIX).unwrap();
        assert_eq!(managed.rule, RetentionRule::KeepLast { count: 4 });
        assert!(managed.parameter_parsed);
    }

    #[test]
    fn test_custom_prefix() {
        let classified = classify_labels(
            &labels(&["Retention/KeepLast1", "ManagedLabels/KeepLast4"]),
            "Retention",
        );

        assert_eq!(classified.keep_last.len(), 1);
        assert_eq!(classified.keep_last[0].label.name, "Retention/KeepLast1");
    }

    #[test]
    fn test_classify_label_single() {
        let label = Label::new("Label_9", "ManagedLabels/KeepLast12");
        let managed = classify_label(&label, DEFAULT_PREFIX).unwrap();
        assert_eq!(managed.rule, RetentionRule::KeepLast { count: 12 });

        assert!(classify_label(&Label::new("INBOX", "INBOX"), DEFAULT_PREFIX).is_none());
    }
}
