//! Run reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::executor::DeletionReport;
use crate::models::RetentionRule;

/// What one managed label contributed to the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub label_id: String,
    pub label_name: String,
    pub rule: RetentionRule,
    pub parameter_parsed: bool,
    pub messages_fetched: usize,
    pub failed_ids: Vec<String>,
    pub senders: usize,
    pub selected: usize,
}

/// A managed label whose listing failed under the skip-label policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedLabel {
    pub label_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub dry_run: bool,
    pub rules: Vec<RuleOutcome>,
    pub skipped_labels: Vec<SkippedLabel>,
    pub warnings: Vec<String>,
    /// Length of the deletion set, duplicates included
    pub selected_total: usize,
    pub selected_unique: usize,
    pub deletion: DeletionReport,
}

impl RunReport {
    pub fn duration_seconds(&self) -> i64 {
        (self.completed_at - self.started_at).num_seconds()
    }

    pub fn messages_fetched(&self) -> usize {
        self.rules.iter().map(|r| r.messages_fetched).sum()
    }

    pub fn resolution_failures(&self) -> usize {
        self.rules.iter().map(|r| r.failed_ids.len()).sum()
    }

    /// Short plain-text summary for the terminal
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Run ID: {}", self.run_id),
            format!("Duration: {} seconds", self.duration_seconds()),
            format!("Managed labels processed: {}", self.rules.len()),
            format!("Messages fetched: {}", self.messages_fetched()),
            format!("Messages unreadable: {}", self.resolution_failures()),
            format!(
                "Messages selected: {} ({} unique)",
                self.selected_total, self.selected_unique
            ),
        ];

        if self.dry_run {
            lines.push(format!(
                "Messages that would be deleted: {}",
                self.deletion.attempted
            ));
        } else {
            lines.push(format!("Messages deleted: {}", self.deletion.deleted));
            lines.push(format!("Deletions failed: {}", self.deletion.failed_count()));
        }

        if !self.skipped_labels.is_empty() {
            lines.push(format!("Labels skipped: {}", self.skipped_labels.len()));
        }

        lines
    }

    /// Generate Markdown report
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        if self.dry_run {
            md.push_str("# Retention Report (DRY RUN)\n\n");
            md.push_str("> **DRY RUN MODE** - No messages were deleted.\n\n");
        } else {
            md.push_str("# Retention Report\n\n");
        }
        md.push_str(&format!(
            "Generated: {}\n\n",
            self.completed_at.format("%Y-%m-%d %H:%M:%S")
        ));

        md.push_str("## Summary\n\n");
        for line in self.summary_lines() {
            md.push_str(&format!("- {}\n", line));
        }
        md.push('\n');

        if !self.warnings.is_empty() {
            md.push_str("## Warnings\n\n");
            for warning in &self.warnings {
                md.push_str(&format!("- {}\n", warning));
            }
            md.push('\n');
        }

        md.push_str("## Rules\n\n");
        if self.rules.is_empty() {
            md.push_str("No managed labels found.\n\n");
        } else {
            md.push_str("| Label | Rule | Fetched | Unreadable | Senders | Selected |\n");
            md.push_str("|-------|------|---------|------------|---------|----------|\n");
            for rule in &self.rules {
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} |\n",
                    rule.label_name,
                    rule.rule,
                    rule.messages_fetched,
                    rule.failed_ids.len(),
                    rule.senders,
                    rule.selected
                ));
            }
            md.push('\n');
        }

        if !self.skipped_labels.is_empty() {
            md.push_str("## Skipped Labels\n\n");
            for skipped in &self.skipped_labels {
                md.push_str(&format!("- **{}**: {}\n", skipped.label_name, skipped.reason));
            }
            md.push('\n');
        }

        if !self.deletion.failed.is_empty() {
            md.push_str("## Failed Deletions\n\n");
            for failed in &self.deletion.failed {
                md.push_str(&format!("- `{}`: {}\n", failed.id, failed.reason));
            }
            md.push('\n');
        }

        md
    }

    pub async fn save_markdown(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.to_markdown()).await?;
        tracing::info!("Saved report to {:?}", path);
        Ok(())
    }

    pub async fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        tracing::info!("Saved JSON report to {:?}", path);
        Ok(())
    }
}
