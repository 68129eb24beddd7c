use super::Host;
use super::common::{Common, CommonArgs, CredentialArgs};
use crate::Result;
use crate::ledger::FailureLedger;
use crate::metrics::MetricFamily;
use crate::resolution::{RefreshReport, Refresher};
use clap::Parser;
use std::collections::BTreeSet;
use std::io::Write;

const LOG_TARGET: &str = "   resolve";

#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Name of the entity to resolve
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Resolve only this family
    #[arg(long, short = 'f', value_name = "FAMILY")]
    pub family: Option<MetricFamily>,

    /// With --family, do not fall back to resolving every family when it fails
    #[arg(long, requires = "family")]
    pub no_fallback: bool,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

/// Refresh one entity, either every family or just `family`.
///
/// A single-family refresh that does not fully succeed is followed by a refresh of
/// every family unless `fallback` is off. Only the last refresh is recorded in the
/// ledger. Returns the reports of every refresh made, in order.
pub async fn refresh_entity(
    refresher: &Refresher,
    ledger: &FailureLedger,
    name: &str,
    family: Option<MetricFamily>,
    fallback: bool,
) -> Result<Vec<RefreshReport>> {
    let all: BTreeSet<_> = MetricFamily::all().collect();

    let Some(family) = family else {
        return Ok(vec![refresher.refresh_and_record(name, &all, ledger).await?]);
    };

    let single = BTreeSet::from([family]);
    if !fallback {
        return Ok(vec![refresher.refresh_and_record(name, &single, ledger).await?]);
    }

    let first = refresher.refresh(name, &single).await?;
    if first.is_complete() {
        return Ok(vec![first]);
    }

    log::info!(target: LOG_TARGET, "{family} did not resolve for '{name}', falling back to every family");
    let full = refresher.refresh_and_record(name, &all, ledger).await?;
    Ok(vec![first, full])
}

pub async fn resolve_entity<H: Host>(host: &mut H, args: &ResolveArgs) -> Result<()> {
    let common = Common::new(&args.common)?;
    let caps = common.capabilities(&args.credentials)?;
    let refresher = common.refresher(&caps);

    let reports = refresh_entity(&refresher, &common.ledger, &args.name, args.family, !args.no_fallback).await?;

    for (index, report) in reports.iter().enumerate() {
        if index > 0 {
            let _ = writeln!(host.output(), "Falling back to every family");
        }

        let _ = writeln!(host.output(), "{}", report.entity);
        for (family, outcome) in &report.outcomes {
            let _ = writeln!(host.output(), "{}", common.outcome_line(*family, outcome));
        }

        if let Some(e) = &report.persist_error {
            let _ = writeln!(host.error(), "Could not store results for '{}': {e}", report.entity);
        }
    }

    if let Some(last) = reports.last()
        && !last.is_complete()
    {
        let _ = writeln!(
            host.output(),
            "Unresolved families were recorded in '{}'",
            common.ledger.path().display()
        );
    }

    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::metrics::{Source, ValidRange};
    use crate::resolution::strategies::{Strategy, Target};
    use crate::resolution::{MetricResolver, ResolutionOutcome, SourceLookupResolver};
    use crate::sources::{SourceError, WebSearch};
    use crate::store::{EntityStore, JsonEntityStore};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Value(Option<u64>);

    #[async_trait]
    impl Strategy for Value {
        fn name(&self) -> &str {
            "value"
        }

        async fn attempt(&self, _target: &Target<'_>) -> core::result::Result<Option<u64>, SourceError> {
            Ok(self.0)
        }
    }

    #[derive(Debug)]
    struct NoSearch;

    #[async_trait]
    impl WebSearch for NoSearch {
        async fn first_result(&self, _query: &str) -> core::result::Result<Option<String>, SourceError> {
            Ok(None)
        }
    }

    async fn setup(dir: &tempfile::TempDir, instagram: Option<u64>) -> (Refresher, FailureLedger) {
        let store = Arc::new(JsonEntityStore::new(dir.path().join("entities.json")));
        let ids = BTreeMap::from([
            (Source::Instagram, "novaofficial".to_string()),
            (Source::Twitter, "nova".to_string()),
        ]);
        let _ = store.upsert("Nova", &ids).await.unwrap();

        let range = ValidRange::new(1, 1_000_000);
        let resolver = MetricResolver::with_lookup(SourceLookupResolver::new(Arc::new(NoSearch), None))
            .with_chain(MetricFamily::InstagramFollowers, range, vec![Box::new(Value(instagram)) as Box<dyn Strategy>])
            .with_chain(MetricFamily::TwitterFollowers, range, vec![Box::new(Value(Some(2_000))) as Box<dyn Strategy>]);

        (
            Refresher::new(resolver, store as Arc<dyn EntityStore>),
            FailureLedger::new(dir.path().join("failed.csv")),
        )
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn single_family_success_needs_no_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let (refresher, ledger) = setup(&dir, Some(154_200)).await;

        let reports = refresh_entity(&refresher, &ledger, "Nova", Some(MetricFamily::InstagramFollowers), true)
            .await
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcomes.len(), 1);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn failed_single_family_falls_back_to_all() {
        let dir = tempfile::tempdir().unwrap();
        let (refresher, ledger) = setup(&dir, None).await;

        let reports = refresh_entity(&refresher, &ledger, "Nova", Some(MetricFamily::InstagramFollowers), true)
            .await
            .unwrap();
        assert_eq!(reports.len(), 2);

        let full = &reports[1];
        assert_eq!(full.outcomes.len(), MetricFamily::all().count());
        assert_eq!(full.outcomes[&MetricFamily::TwitterFollowers], ResolutionOutcome::Resolved(2_000));

        let entries = ledger.load().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].failed_families().contains_key(&MetricFamily::InstagramFollowers));
        assert!(!entries[0].failed_families().contains_key(&MetricFamily::TwitterFollowers));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn no_fallback_records_single_family() {
        let dir = tempfile::tempdir().unwrap();
        let (refresher, ledger) = setup(&dir, None).await;

        let reports = refresh_entity(&refresher, &ledger, "Nova", Some(MetricFamily::InstagramFollowers), false)
            .await
            .unwrap();
        assert_eq!(reports.len(), 1);

        let entries = ledger.load().unwrap();
        assert_eq!(
            entries[0].failed_families().into_keys().collect::<Vec<_>>(),
            [MetricFamily::InstagramFollowers]
        );
    }
}
