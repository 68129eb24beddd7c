use super::diagnostic;
use super::failure_ledger::{FailureLedger, LedgerEntry};
use crate::Result;
use crate::resolution::Refresher;
use core::fmt::{Display, Formatter};
use std::collections::BTreeSet;

const LOG_TARGET: &str = "  recovery";

/// Counts reported by a recovery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    /// Entities whose failed families all resolved
    pub recovered: usize,

    /// Entities with some families still failing
    pub partial: usize,

    /// Entries kept unchanged because they could not be retried
    pub carried_over: usize,

    /// Entries removed because their entity no longer exists
    pub dropped: usize,
}

impl RecoverySummary {
    /// Number of entries left in the ledger.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.partial + self.carried_over
    }
}

impl Display for RecoverySummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} recovered, {} partially recovered, {} carried over, {} dropped",
            self.recovered, self.partial, self.carried_over, self.dropped
        )
    }
}

/// Replays the failure ledger.
#[derive(Debug)]
pub struct RecoveryRunner<'a> {
    refresher: &'a Refresher,
    ledger: &'a FailureLedger,
}

impl<'a> RecoveryRunner<'a> {
    #[must_use]
    pub const fn new(refresher: &'a Refresher, ledger: &'a FailureLedger) -> Self {
        Self { refresher, ledger }
    }

    /// Re-resolve the families named by every ledger entry, then rewrite the ledger.
    ///
    /// The ledger lock is held for the whole pass. Entities that fully recover leave
    /// the ledger, others stay with only their still-failing families, and the ledger
    /// file is removed when nothing is left.
    pub async fn run(&self) -> Result<RecoverySummary> {
        let _guard = self.ledger.lock().await?;
        let entries = self.ledger.load()?;
        log::info!(target: LOG_TARGET, "Recovering {} ledger entry(ies)", entries.len());

        let mut summary = RecoverySummary::default();
        let mut remaining = Vec::new();

        for entry in entries {
            let families: BTreeSet<_> = entry.failed_families().into_keys().collect();
            if families.is_empty() {
                log::warn!(target: LOG_TARGET, "Ledger entry for '{}' names no known family, keeping it: {}", entry.entity, entry.diagnostic);
                summary.carried_over += 1;
                remaining.push(entry);
                continue;
            }

            match self.refresher.store().get_entity(&entry.entity).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    log::warn!(target: LOG_TARGET, "Dropping ledger entry for '{}': entity no longer exists", entry.entity);
                    summary.dropped += 1;
                    continue;
                }
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Could not look up '{}', keeping its entry: {e:#}", entry.entity);
                    summary.carried_over += 1;
                    remaining.push(entry);
                    continue;
                }
            }

            let report = match self.refresher.refresh(&entry.entity, &families).await {
                Ok(report) if report.persisted() => report,
                Ok(_) => {
                    log::warn!(target: LOG_TARGET, "Results for '{}' were not stored, keeping its entry", entry.entity);
                    summary.carried_over += 1;
                    remaining.push(entry);
                    continue;
                }
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Could not refresh '{}', keeping its entry: {e:#}", entry.entity);
                    summary.carried_over += 1;
                    remaining.push(entry);
                    continue;
                }
            };

            if let Some(still_failing) = diagnostic::compose(&report.failures()) {
                log::info!(target: LOG_TARGET, "'{}' partially recovered", entry.entity);
                summary.partial += 1;
                remaining.push(LedgerEntry::new(entry.entity, still_failing));
            } else {
                log::info!(target: LOG_TARGET, "'{}' fully recovered", entry.entity);
                summary.recovered += 1;
            }
        }

        self.ledger.replace_all(&remaining)?;
        log::info!(target: LOG_TARGET, "Recovery finished: {summary}");
        Ok(summary)
    }
}
