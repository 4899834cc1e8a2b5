//! Removing every post an account has made
//!
//! Useful after posting something wrong. Dedup state is left alone; delete
//! the account's `.cache` file as well to re-import the whole feed.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::platforms::{Pagination, Publisher};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrashReport {
    pub deleted: usize,
    pub failed: usize,
}

/// Delete all posts of the named account, page by page.
///
/// # Errors
///
/// Fails when the account is unknown, when authentication fails, or when a
/// timeline page cannot be listed. Individual failed deletes are only counted.
pub async fn trash_account(
    config: &Config,
    publisher: &dyn Publisher,
    name: &str,
) -> Result<TrashReport> {
    let account = config.account(name)?;
    info!("Trashing account {}", account.name);

    let session = publisher.authenticate(&account.credentials()).await?;

    let mut report = TrashReport::default();
    let mut cursor = Pagination::default();

    loop {
        debug!("Fetching timeline, max_id={:?}", cursor.max_id);
        let page = session.list_timeline(&cursor).await?;

        for post in page.posts.iter().rev() {
            match session.delete_post(&post.id).await {
                Ok(()) => {
                    debug!("Deleted {}", post.id);
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!("Deleting {} failed: {}", post.id, e);
                    report.failed += 1;
                }
            }
        }

        match page.next {
            Some(next) => cursor = next,
            None => break,
        }
    }

    info!(
        deleted = report.deleted,
        failed = report.failed,
        "Trashing complete"
    );
    Ok(report)
}
