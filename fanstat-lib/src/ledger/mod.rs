//! Durable record of failed resolutions and the recovery pass that replays them
//!
//! After a refresh leaves families unresolved, the entity and a diagnostic naming
//! those families are written to the [`FailureLedger`]. A later
//! [`RecoveryRunner`] pass re-resolves only the named families and rewrites the
//! ledger with whatever still fails.

pub mod diagnostic;
mod failure_ledger;
mod recovery;

pub use failure_ledger::{FailureLedger, LedgerEntry};
pub use recovery::{RecoveryRunner, RecoverySummary};
