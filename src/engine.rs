//! Retention run orchestration
//!
//! Labels are classified, then every KeepLast label and every KeepDays label
//! is fetched and evaluated in turn. Selections are appended to a single
//! [`DeletionSet`] owned by the plan, which the deletion executor consumes.
//! Every step runs strictly in sequence.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::classifier::{classify_labels, ClassifiedLabels, DEFAULT_PREFIX};
use crate::client::{MailService, ProgressCallback};
use crate::config::{Config, ListingErrorPolicy};
use crate::error::{RetentionError, Result};
use crate::evaluator::{distinct_senders, evaluate};
use crate::executor::execute_deletions;
use crate::fetcher::fetch_label_messages;
use crate::models::{DeletionSet, ManagedLabel};
use crate::report::{RuleOutcome, RunReport, SkippedLabel};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub label_prefix: String,
    pub dry_run: bool,
    pub on_listing_error: ListingErrorPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            label_prefix: DEFAULT_PREFIX.to_string(),
            dry_run: false,
            on_listing_error: ListingErrorPolicy::Abort,
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            label_prefix: config.labels.prefix.clone(),
            dry_run: config.execution.dry_run,
            on_listing_error: config.execution.on_listing_error,
        }
    }
}

/// Everything decided before any message is deleted
#[derive(Debug, Clone)]
pub struct RetentionPlan {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<RuleOutcome>,
    pub skipped_labels: Vec<SkippedLabel>,
    pub warnings: Vec<String>,
    pub deletion_set: DeletionSet,
}

pub struct RetentionEngine {
    service: Box<dyn MailService>,
    options: EngineOptions,
}

impl RetentionEngine {
    pub fn new(service: Box<dyn MailService>, options: EngineOptions) -> Self {
        Self { service, options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// List the account's labels and classify them into rules
    pub async fn classify(&self) -> Result<ClassifiedLabels> {
        let labels = self.service.list_labels().await?;
        let classified = classify_labels(&labels, &self.options.label_prefix);
        info!(
            "Found {} labels, {} KeepLast and {} KeepDays rules",
            labels.len(),
            classified.keep_last.len(),
            classified.keep_days.len()
        );
        Ok(classified)
    }

    /// Fetch and evaluate one managed label
    async fn process_label(
        &self,
        managed: &ManagedLabel,
        now: DateTime<Utc>,
    ) -> Result<(RuleOutcome, Vec<String>)> {
        info!("Processing '{}' ({})", managed.label.name, managed.rule);

        let fetched = fetch_label_messages(self.service.as_ref(), &managed.label).await?;
        let selected = evaluate(&managed.rule, &fetched.headers, now);

        info!(
            "'{}': {} of {} messages selected for deletion",
            managed.label.name,
            selected.len(),
            fetched.headers.len()
        );

        let outcome = RuleOutcome {
            label_id: managed.label.id.clone(),
            label_name: managed.label.name.clone(),
            rule: managed.rule,
            parameter_parsed: managed.parameter_parsed,
            messages_fetched: fetched.headers.len(),
            failed_ids: fetched.failed_ids,
            senders: distinct_senders(&fetched.headers),
            selected: selected.len(),
        };

        Ok((outcome, selected))
    }

    /// Decide which messages to delete, as of `now`
    pub async fn plan(&self, now: DateTime<Utc>) -> Result<RetentionPlan> {
        let classified = self.classify().await?;

        let mut plan = RetentionPlan {
            started_at: now,
            outcomes: Vec::with_capacity(classified.len()),
            skipped_labels: Vec::new(),
            warnings: classified.warnings(),
            deletion_set: DeletionSet::new(),
        };

        for managed in classified.iter() {
            match self.process_label(managed, now).await {
                Ok((outcome, selected)) => {
                    plan.deletion_set.append(selected);
                    plan.outcomes.push(outcome);
                }
                Err(e @ RetentionError::ListingFailed { .. })
                    if self.options.on_listing_error == ListingErrorPolicy::SkipLabel =>
                {
                    warn!("Skipping '{}': {}", managed.label.name, e);
                    plan.skipped_labels.push(SkippedLabel {
                        label_name: managed.label.name.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    error!("Aborting run: {}", e);
                    return Err(e);
                }
            }
        }

        info!(
            "Plan complete: {} messages selected ({} unique)",
            plan.deletion_set.len(),
            plan.deletion_set.unique_count()
        );
        Ok(plan)
    }

    /// Run the deletion executor over a plan
    pub async fn execute(
        &self,
        plan: RetentionPlan,
        on_progress: Option<ProgressCallback>,
    ) -> RunReport {
        let deletion = execute_deletions(
            self.service.as_ref(),
            &plan.deletion_set,
            self.options.dry_run,
            on_progress,
        )
        .await;

        RunReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: plan.started_at,
            completed_at: Utc::now(),
            dry_run: self.options.dry_run,
            rules: plan.outcomes,
            skipped_labels: plan.skipped_labels,
            warnings: plan.warnings,
            selected_total: plan.deletion_set.len(),
            selected_unique: plan.deletion_set.unique_count(),
            deletion,
        }
    }

    /// Plan as of now and execute
    pub async fn run(&self, on_progress: Option<ProgressCallback>) -> Result<RunReport> {
        let plan = self.plan(Utc::now()).await?;
        Ok(self.execute(plan, on_progress).await)
    }
}
