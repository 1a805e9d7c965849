//! Message fetching for one label: full pagination, then per-message header resolution

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::client::MailService;
use crate::error::{RetentionError, Result};
use crate::headers::extract_message_header;
use crate::models::{Label, MessageHeader};

/// Headers fetched under one label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedLabel {
    /// Resolved headers, in provider listing order
    pub headers: Vec<MessageHeader>,
    /// Ids whose metadata could not be resolved
    pub failed_ids: Vec<String>,
}

impl FetchedLabel {
    pub fn listed_count(&self) -> usize {
        self.headers.len() + self.failed_ids.len()
    }
}

/// List every message id under a label, following continuation tokens.
///
/// Any page failure fails the whole listing, as does a token seen before.
pub async fn list_all_message_ids(service: &dyn MailService, label: &Label) -> Result<Vec<String>> {
    let listing_failed = |message: String| RetentionError::ListingFailed {
        label: label.name.clone(),
        message,
    };

    let mut all_ids = Vec::new();
    let mut page_token: Option<String> = None;
    let mut seen_tokens: HashSet<String> = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = service
            .list_message_ids_page(&label.id, page_token.clone())
            .await
            .map_err(|e| listing_failed(e.to_string()))?;
        pages += 1;

        debug!(
            "Label '{}' page {}: {} message ids",
            label.name,
            pages,
            page.ids.len()
        );
        all_ids.extend(page.ids);

        match page.next_page_token {
            Some(next) if !seen_tokens.insert(next.clone()) => {
                return Err(listing_failed(format!(
                    "provider repeated page token '{}'",
                    next
                )));
            }
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    debug!(
        "Listed {} message ids for '{}' across {} pages",
        all_ids.len(),
        label.name,
        pages
    );
    Ok(all_ids)
}

/// Fetch the headers of every message under a label
pub async fn fetch_label_messages(service: &dyn MailService, label: &Label) -> Result<FetchedLabel> {
    let ids = list_all_message_ids(service, label).await?;
    let mut fetched = FetchedLabel {
        headers: Vec::with_capacity(ids.len()),
        failed_ids: Vec::new(),
    };

    for id in ids {
        let resolved = match service.get_message(&id).await {
            Ok(record) => extract_message_header(&record),
            Err(e) => Err(e),
        };

        match resolved {
            Ok(header) => fetched.headers.push(header),
            Err(e) => {
                warn!("Failed to get message {} under '{}': {}", id, label.name, e);
                fetched.failed_ids.push(id);
            }
        }
    }

    info!(
        "Fetched {} messages under '{}' ({} failed)",
        fetched.headers.len(),
        label.name,
        fetched.failed_ids.len()
    );
    Ok(fetched)
}
