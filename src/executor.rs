//! Deletion execution: one delete call per selected id, failures reported and skipped

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::{MailService, ProgressCallback};
use crate::models::DeletionSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDeletion {
    pub id: String,
    pub reason: String,
}

/// Outcome of executing a deletion set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub attempted: usize,
    pub deleted: usize,
    pub failed: Vec<FailedDeletion>,
    pub dry_run: bool,
}

impl DeletionReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Delete every id in set order.
///
/// In dry-run mode nothing is sent to the service.
pub async fn execute_deletions(
    service: &dyn MailService,
    set: &DeletionSet,
    dry_run: bool,
    on_progress: Option<ProgressCallback>,
) -> DeletionReport {
    let mut report = DeletionReport {
        dry_run,
        ..Default::default()
    };

    for id in set {
        report.attempted += 1;

        if dry_run {
            debug!("Would delete message {}", id);
        } else {
            match service.delete_message(id).await {
                Ok(()) => {
                    report.deleted += 1;
                    debug!("Deleted message {}", id);
                }
                Err(e) => {
                    warn!("Failed to delete message {}: {}", id, e);
                    report.failed.push(FailedDeletion {
                        id: id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if let Some(callback) = &on_progress {
            callback();
        }
    }

    if dry_run {
        info!("Dry run: {} messages would be deleted", report.attempted);
    } else {
        info!(
            "Deleted {} of {} messages ({} failed)",
            report.deleted,
            report.attempted,
            report.failed_count()
        );
    }

    report
}
