//! Per-account synchronization: feed in, new items posted exactly once
//!
//! A run moves through loading the dedup record, fetching (and archiving)
//! the feed, parsing it, replaying items oldest first, and persisting the
//! record. Failing to load, fetch, archive or parse ends the run before
//! anything is posted. Authentication and posting failures only skip the
//! item at hand, which stays unmarked and is retried on the next run.

use std::path::PathBuf;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::cache::DedupStore;
use crate::config::Config;
use crate::error::Result;
use crate::feed::{archive_raw, parse_feed, FeedSource};
use crate::platforms::{Publisher, Session};
use crate::text::normalize;
use crate::types::{Account, RunOptions};

/// What happened during one account's run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub account: String,
    /// Items listed in the feed
    pub items: usize,
    /// Items skipped because the dedup record already had them
    pub already_seen: usize,
    pub posted: usize,
    /// Items left unmarked after an authentication or posting failure
    pub failed: usize,
    /// Items only logged because of dry-run
    pub previewed: usize,
    pub dry_run: bool,
}

/// Outcome of one account within a batch
#[derive(Debug)]
pub struct AccountRun {
    pub account: String,
    pub outcome: Result<SyncReport>,
}

impl AccountRun {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Drives the sync pipeline for one account at a time
pub struct AccountProcessor<'a> {
    store: &'a DedupStore,
    source: &'a dyn FeedSource,
    publisher: &'a dyn Publisher,
    options: RunOptions,
}

impl<'a> AccountProcessor<'a> {
    pub fn new(
        store: &'a DedupStore,
        source: &'a dyn FeedSource,
        publisher: &'a dyn Publisher,
        options: RunOptions,
    ) -> Self {
        Self {
            store,
            source,
            publisher,
            options,
        }
    }

    /// Where the raw feed of an account is archived
    pub fn archive_path(&self, account: &Account) -> PathBuf {
        self.store.dir().join(format!("{}.feed", account.name))
    }

    /// Synchronize one account.
    ///
    /// # Errors
    ///
    /// Storage, fetch, archive, parse and configuration errors end the
    /// account's run and are returned. Per-item platform errors are logged and
    /// counted in [`SyncReport::failed`] instead.
    pub async fn process(&self, account: &Account) -> Result<SyncReport> {
        let span = info_span!("account", name = %account.name);
        self.sync(account).instrument(span).await
    }

    async fn sync(&self, account: &Account) -> Result<SyncReport> {
        let mut record = self.store.load(&account.name)?;

        debug!("Fetching from {}", account.feed_url);
        let raw = self.source.fetch(&account.feed_url).await?;
        archive_raw(&raw, &self.archive_path(account))?;

        let items = parse_feed(&raw)?;
        let mut report = SyncReport {
            account: account.name.clone(),
            items: items.len(),
            dry_run: self.options.dry_run,
            ..Default::default()
        };

        // Authenticated on the first item that needs posting
        let mut session: Option<Box<dyn Session>> = None;

        // Feeds list newest first; replay oldest first
        for item in items.iter().rev() {
            if record.contains(&item.id) {
                report.already_seen += 1;
                continue;
            }

            let field = account.post_field()?;
            let text = normalize(&field.select(item));

            if self.options.dry_run {
                info!(
                    id = %item.id,
                    position = item.position,
                    "Would post:\n8<-------------\n{}\n------------>8",
                    text
                );
                report.previewed += 1;
                continue;
            }
            debug!(
                id = %item.id,
                position = item.position,
                "New entry:\n8<-------------\n{}\n------------>8",
                text
            );

            if session.is_none() {
                match self.publisher.authenticate(&account.credentials()).await {
                    Ok(authenticated) => session = Some(authenticated),
                    Err(e) if e.is_per_item() => {
                        warn!("Authentication failed: {}", e);
                        report.failed += 1;
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }
            let Some(active) = session.as_deref() else {
                continue;
            };

            match active.post(&text).await {
                Ok(post_id) => {
                    // Marked before the next item so nothing is posted twice
                    record.mark_seen(item.id.clone());
                    report.posted += 1;
                    info!(id = %item.id, post_id = %post_id, "Posted");
                }
                Err(e) if e.is_per_item() => {
                    warn!("Posting {} failed: {}", item.id, e);
                    report.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if self.options.dry_run {
            debug!("Dry-run, leaving cache untouched");
        } else {
            self.store.save(&account.name, &record)?;
        }

        info!(
            items = report.items,
            seen = report.already_seen,
            posted = report.posted,
            failed = report.failed,
            previewed = report.previewed,
            "Account done"
        );
        Ok(report)
    }
}

/// Process accounts one after another; a failed account never stops the rest
pub async fn run_accounts(
    processor: &AccountProcessor<'_>,
    accounts: &[&Account],
) -> Vec<AccountRun> {
    let mut runs = Vec::with_capacity(accounts.len());

    for account in accounts {
        let outcome = processor.process(account).await;
        if let Err(e) = &outcome {
            error!("Account {} failed: {}", account.name, e);
        }
        runs.push(AccountRun {
            account: account.name.clone(),
            outcome,
        });
    }

    runs
}

/// Select accounts from the configuration and synchronize them.
///
/// # Errors
///
/// Only fails before any account runs: unknown single-account filter or an
/// unresolvable cache directory.
pub async fn sync_all(
    config: &Config,
    options: RunOptions,
    source: &dyn FeedSource,
    publisher: &dyn Publisher,
) -> Result<Vec<AccountRun>> {
    let accounts = config.select_accounts(options.only_account.as_deref())?;
    let store = DedupStore::new(config.cache_path()?);

    if accounts.is_empty() {
        info!("No active accounts to process");
    }

    let processor = AccountProcessor::new(&store, source, publisher, options);
    Ok(run_accounts(&processor, &accounts).await)
}
