use super::lookup::SourceLookupResolver;
use super::outcome::{ResolutionOutcome, SessionFatal};
use super::sampler::SamplerSettings;
use super::strategies::{Strategy, Target, chain_for};
use crate::metrics::{MetricFamily, Source, ValidRange};
use crate::sources::{Capabilities, SourceError, SpotifyClient};
use crate::store::Entity;
use std::collections::BTreeMap;
use std::sync::Arc;

const LOG_TARGET: &str = "  resolver";

/// Knobs that shape how families are resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverSettings {
    pub sampler: SamplerSettings,

    /// Per-family overrides of [`MetricFamily::default_range`]
    pub ranges: BTreeMap<MetricFamily, ValidRange>,
}

impl ResolverSettings {
    /// The valid range in effect for `family`.
    #[must_use]
    pub fn range(&self, family: MetricFamily) -> ValidRange {
        self.ranges.get(&family).copied().unwrap_or_else(|| family.default_range())
    }
}

#[derive(Debug)]
struct FamilyPlan {
    range: ValidRange,
    chain: Vec<Box<dyn Strategy>>,
}

/// Resolves one family of one entity by walking that family's strategy chain.
#[derive(Debug)]
pub struct MetricResolver {
    lookup: SourceLookupResolver,
    plans: BTreeMap<MetricFamily, FamilyPlan>,
    spotify: Option<Arc<SpotifyClient>>,
}

impl MetricResolver {
    /// Build the chains of every family from the configured capabilities.
    #[must_use]
    pub fn new(caps: &Capabilities, settings: &ResolverSettings) -> Self {
        let lookup = SourceLookupResolver::new(Arc::clone(&caps.search), caps.spotify.clone());
        let plans = MetricFamily::all()
            .map(|family| {
                let plan = FamilyPlan {
                    range: settings.range(family),
                    chain: chain_for(family, caps, &settings.sampler),
                };
                (family, plan)
            })
            .collect();

        Self {
            lookup,
            plans,
            spotify: caps.spotify.clone(),
        }
    }

    /// A resolver with no chains; add them with [`Self::with_chain`].
    #[must_use]
    pub const fn with_lookup(lookup: SourceLookupResolver) -> Self {
        Self {
            lookup,
            plans: BTreeMap::new(),
            spotify: None,
        }
    }

    /// Use `client` for artist attributes beyond the family values.
    #[must_use]
    pub fn with_spotify(mut self, client: Arc<SpotifyClient>) -> Self {
        self.spotify = Some(client);
        self
    }

    /// Replace the chain and range used for `family`.
    #[must_use]
    pub fn with_chain(mut self, family: MetricFamily, range: ValidRange, chain: Vec<Box<dyn Strategy>>) -> Self {
        let _ = self.plans.insert(family, FamilyPlan { range, chain });
        self
    }

    /// Resolve `family` for `entity`.
    ///
    /// An identifier discovered along the way is stored on `entity` so later
    /// families of the same source reuse it. Strategy errors never escape: the last
    /// one becomes the `Failed` reason when no later strategy finds a value. Only a
    /// session-fatal error is returned as `Err`.
    pub async fn resolve(&self, entity: &mut Entity, family: MetricFamily) -> Result<ResolutionOutcome, SessionFatal> {
        let Some(identifier) = self.lookup.resolve_identifier(entity, family).await? else {
            log::info!(target: LOG_TARGET, "{family} for '{}': no {} identifier", entity.name, family.source().display_name());
            return Ok(ResolutionOutcome::NotFound);
        };

        if entity.identifier(family.source()) != Some(identifier.as_str()) {
            let _ = entity.identifiers.insert(family.source(), identifier.clone());
        }

        let Some(plan) = self.plans.get(&family) else {
            log::debug!(target: LOG_TARGET, "No strategies configured for {family}");
            return Ok(ResolutionOutcome::NotFound);
        };

        let target = Target {
            entity_name: &entity.name,
            identifier: &identifier,
        };

        let mut last_error = None;
        for strategy in &plan.chain {
            log::debug!(target: LOG_TARGET, "{family} for '{}': trying {}", entity.name, strategy.name());

            match strategy.attempt(&target).await {
                Ok(Some(value)) if plan.range.contains(value) => {
                    log::info!(target: LOG_TARGET, "{family} for '{}' = {value} (from {})", entity.name, strategy.name());
                    return Ok(ResolutionOutcome::Resolved(value));
                }
                Ok(Some(value)) => {
                    log::debug!(target: LOG_TARGET, "{}: {value} is outside {}", strategy.name(), plan.range);
                }
                Ok(None) => {
                    log::debug!(target: LOG_TARGET, "{}: no value", strategy.name());
                }
                Err(SourceError::SessionFatal(e)) => {
                    log::warn!(target: LOG_TARGET, "{}: session failure: {e:#}", strategy.name());
                    return Err(SessionFatal(e));
                }
                Err(SourceError::Transient(e)) => {
                    log::debug!(target: LOG_TARGET, "{}: {e:#}", strategy.name());
                    last_error = Some(format!("{}: {e}", strategy.name()));
                }
            }
        }

        let outcome = last_error.map_or(ResolutionOutcome::NotFound, ResolutionOutcome::Failed);
        log::info!(target: LOG_TARGET, "{family} for '{}': {outcome}", entity.name);
        Ok(outcome)
    }

    /// The primary genre of the entity's Spotify artist.
    ///
    /// Served from the artist document the Spotify families already fetched when
    /// there is one. Failures only cost the genre and are logged.
    pub async fn spotify_genre(&self, entity: &Entity) -> Option<String> {
        let spotify = self.spotify.as_ref()?;
        let id = entity.identifier(Source::Spotify)?;

        match spotify.artist(id).await {
            Ok(artist) => artist?.primary_genre().map(ToString::to_string),
            Err(e) => {
                log::debug!(target: LOG_TARGET, "No genre for '{}': {e:#}", entity.name);
                None
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::sources::WebSearch;
    use async_trait::async_trait;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use ohno::app_err;

    #[derive(Debug)]
    enum Step {
        Fail,
        Fatal,
        Nothing,
        Value(u64),
    }

    #[derive(Debug)]
    struct Counted {
        step: Step,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Strategy for Counted {
        fn name(&self) -> &str {
            "stub"
        }

        async fn attempt(&self, _target: &Target<'_>) -> Result<Option<u64>, SourceError> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.step {
                Step::Fail => Err(SourceError::Transient(app_err!("HTTP 503"))),
                Step::Fatal => Err(SourceError::SessionFatal(app_err!("browser gone"))),
                Step::Nothing => Ok(None),
                Step::Value(v) => Ok(Some(v)),
            }
        }
    }

    #[derive(Debug)]
    struct NoSearch;

    #[async_trait]
    impl WebSearch for NoSearch {
        async fn first_result(&self, _query: &str) -> Result<Option<String>, SourceError> {
            Ok(None)
        }
    }

    const RANGE: ValidRange = ValidRange::new(1, 1_000_000);
    const FAMILY: MetricFamily = MetricFamily::InstagramFollowers;

    fn build(steps: Vec<Step>) -> (MetricResolver, Vec<Arc<AtomicUsize>>) {
        let counters: Vec<_> = steps.iter().map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let chain = steps
            .into_iter()
            .zip(&counters)
            .map(|(step, calls)| {
                Box::new(Counted {
                    step,
                    calls: Arc::clone(calls),
                }) as Box<dyn Strategy>
            })
            .collect();

        let lookup = SourceLookupResolver::new(Arc::new(NoSearch), None);
        (MetricResolver::with_lookup(lookup).with_chain(FAMILY, RANGE, chain), counters)
    }

    fn calls(counters: &[Arc<AtomicUsize>]) -> Vec<usize> {
        counters.iter().map(|c| c.load(Ordering::SeqCst)).collect()
    }

    fn nova() -> Entity {
        Entity::new("Nova").with_identifier(Source::Instagram, "novaofficial")
    }

    #[tokio::test]
    async fn stops_at_first_value() {
        let (resolver, counters) = build(vec![Step::Fail, Step::Fail, Step::Value(42), Step::Value(7)]);

        let outcome = resolver.resolve(&mut nova(), FAMILY).await.unwrap();
        assert_eq!(outcome, ResolutionOutcome::Resolved(42));
        assert_eq!(calls(&counters), [1, 1, 1, 0]);
    }

    #[tokio::test]
    async fn error_beats_not_found() {
        let (resolver, _) = build(vec![Step::Fail]);
        let outcome = resolver.resolve(&mut nova(), FAMILY).await.unwrap();
        assert!(matches!(&outcome, ResolutionOutcome::Failed(reason) if reason.starts_with("stub: HTTP 503")));

        let (resolver, _) = build(vec![Step::Fail, Step::Nothing]);
        let outcome = resolver.resolve(&mut nova(), FAMILY).await.unwrap();
        assert!(matches!(outcome, ResolutionOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn out_of_range_counts_as_no_value() {
        let (resolver, counters) = build(vec![Step::Value(0), Step::Value(5_000_000), Step::Nothing]);

        let outcome = resolver.resolve(&mut nova(), FAMILY).await.unwrap();
        assert_eq!(outcome, ResolutionOutcome::NotFound);
        assert_eq!(calls(&counters), [1, 1, 1]);
    }

    #[tokio::test]
    async fn missing_identifier_is_not_found() {
        let (resolver, counters) = build(vec![Step::Value(42)]);

        let outcome = resolver.resolve(&mut Entity::new("Nova"), FAMILY).await.unwrap();
        assert_eq!(outcome, ResolutionOutcome::NotFound);
        assert_eq!(calls(&counters), [0]);
    }

    #[tokio::test]
    async fn session_failure_propagates() {
        let (resolver, counters) = build(vec![Step::Fatal, Step::Value(42)]);

        let err = resolver.resolve(&mut nova(), FAMILY).await.unwrap_err();
        assert!(err.to_string().contains("browser gone"));
        assert_eq!(calls(&counters), [1, 0]);
    }

    #[test]
    fn configured_range_overrides_default() {
        let mut settings = ResolverSettings::default();
        let _ = settings.ranges.insert(MetricFamily::TwitterFollowers, ValidRange::new(10, 20));

        assert_eq!(settings.range(MetricFamily::TwitterFollowers), ValidRange::new(10, 20));
        assert_eq!(settings.range(MetricFamily::StubhubFavorites), MetricFamily::StubhubFavorites.default_range());
    }
}
