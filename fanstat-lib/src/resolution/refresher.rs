use super::outcome::ResolutionOutcome;
use super::resolver::MetricResolver;
use crate::Result;
use crate::ledger::{FailureLedger, LedgerEntry, diagnostic};
use crate::metrics::{MetricFamily, Source};
use crate::store::EntityStore;
use ohno::{EnrichableExt, bail};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const LOG_TARGET: &str = " refresher";

/// What a refresh of one entity did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub entity: String,

    /// Outcome of every requested family, in family order
    pub outcomes: BTreeMap<MetricFamily, ResolutionOutcome>,

    /// The diagnostic written to the store, `None` when every family resolved
    pub diagnostic: Option<String>,

    /// Why the results could not be stored, if they could not
    pub persist_error: Option<String>,
}

impl RefreshReport {
    #[must_use]
    pub const fn persisted(&self) -> bool {
        self.persist_error.is_none()
    }

    /// Values of the families that resolved.
    #[must_use]
    pub fn resolved(&self) -> BTreeMap<MetricFamily, u64> {
        self.outcomes.iter().filter_map(|(family, outcome)| Some((*family, outcome.value()?))).collect()
    }

    /// Families that did not resolve, with their reasons.
    #[must_use]
    pub fn failures(&self) -> BTreeMap<MetricFamily, String> {
        self.outcomes
            .iter()
            .filter_map(|(family, outcome)| Some((*family, outcome.failure_reason()?)))
            .collect()
    }

    /// Families to record in the failure ledger.
    ///
    /// When nothing could be stored every requested family has to be retried, even
    /// the ones that resolved.
    #[must_use]
    pub fn ledger_failures(&self) -> BTreeMap<MetricFamily, String> {
        match &self.persist_error {
            None => self.failures(),
            Some(e) => {
                let mut failures = self.failures();
                for family in self.outcomes.keys() {
                    let _ = failures.entry(*family).or_insert_with(|| format!("not saved: {e}"));
                }
                failures
            }
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.persisted() && self.outcomes.values().all(ResolutionOutcome::is_resolved)
    }
}

/// Runs the resolver over a set of families for one entity and stores the results.
#[derive(Debug)]
pub struct Refresher {
    resolver: MetricResolver,
    store: Arc<dyn EntityStore>,
}

impl Refresher {
    #[must_use]
    pub fn new(resolver: MetricResolver, store: Arc<dyn EntityStore>) -> Self {
        Self { resolver, store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Resolve `families` for the entity called `name` and persist what was found.
    ///
    /// Families are resolved one after the other in family order. A session failure
    /// stops the run: the family being resolved and every later one are marked
    /// failed, and whatever resolved before it is still stored.
    ///
    /// # Errors
    ///
    /// Fails when the entity is unknown or cannot be read. Failing to store the
    /// results is reported in [`RefreshReport::persist_error`] instead.
    pub async fn refresh(&self, name: &str, families: &BTreeSet<MetricFamily>) -> Result<RefreshReport> {
        let Some(mut entity) = self
            .store
            .get_entity(name)
            .await
            .map_err(|e| e.enrich_with(|| format!("could not look up entity '{name}'")))?
        else {
            bail!("entity '{name}' not found");
        };
        let known_identifiers = entity.identifiers.clone();

        log::info!(target: LOG_TARGET, "Refreshing {} family(ies) for '{name}'", families.len());

        let mut outcomes = BTreeMap::new();
        let mut fatal = None;

        for family in families {
            if let Some(cause) = &fatal {
                let _ = outcomes.insert(*family, ResolutionOutcome::Failed(format!("session failure: {cause}")));
                continue;
            }

            match self.resolver.resolve(&mut entity, *family).await {
                Ok(outcome) => {
                    let _ = outcomes.insert(*family, outcome);
                }
                Err(e) => {
                    log::error!(target: LOG_TARGET, "Session failure while resolving {family} for '{name}': {e:#}");
                    let cause = e.to_string();
                    let _ = outcomes.insert(*family, ResolutionOutcome::Failed(format!("session failure: {cause}")));
                    fatal = Some(cause);
                }
            }
        }

        if families.iter().any(|family| family.source() == Source::Spotify)
            && let Some(genre) = self.resolver.spotify_genre(&entity).await
            && entity.genre.as_deref() != Some(genre.as_str())
            && let Err(e) = self.store.update_genre(name, &genre).await
        {
            log::warn!(target: LOG_TARGET, "Could not store genre for '{name}': {e:#}");
        }

        let discovered: BTreeMap<Source, String> = entity
            .identifiers
            .iter()
            .filter(|(source, id)| known_identifiers.get(source) != Some(id))
            .map(|(source, id)| (*source, id.clone()))
            .collect();

        if !discovered.is_empty()
            && let Err(e) = self.store.update_identifiers(name, &discovered).await
        {
            log::warn!(target: LOG_TARGET, "Could not store discovered identifiers for '{name}': {e:#}");
        }

        let mut report = RefreshReport {
            entity: name.to_string(),
            outcomes,
            diagnostic: None,
            persist_error: None,
        };
        report.diagnostic = diagnostic::compose(&report.failures());

        if let Err(e) = self.store.update_metrics(name, &report.resolved(), report.diagnostic.as_deref()).await {
            log::error!(target: LOG_TARGET, "Could not store results for '{name}': {e:#}");
            report.persist_error = Some(e.to_string());
        }

        Ok(report)
    }

    /// [`Self::refresh`], then record any failed family in `ledger`.
    pub async fn refresh_and_record(&self, name: &str, families: &BTreeSet<MetricFamily>, ledger: &FailureLedger) -> Result<RefreshReport> {
        let report = self.refresh(name, families).await?;

        if let Some(diagnostic) = diagnostic::compose(&report.ledger_failures()) {
            log::info!(target: LOG_TARGET, "Recording failures for '{name}' in the ledger");
            ledger.append(LedgerEntry::new(name, diagnostic)).await?;
        }

        Ok(report)
    }
}
