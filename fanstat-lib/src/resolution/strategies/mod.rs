//! One-shot extraction strategies and the per-family chains built from them
//!
//! A strategy makes a single attempt to read a value from one concrete place:
//! an official API, a live-counter aggregator site, the platform's own page, or
//! a language-model estimate. It reports a value, "no value" (`Ok(None)`), or a
//! [`SourceError`]. [`chain_for`] lists the strategies for a family in the order
//! the resolver tries them.

mod estimate;
mod live_counter;
mod official_api;
mod page_scrape;

pub use estimate::Estimate;
pub use live_counter::LiveCounter;
pub use official_api::{InstagramApi, SpotifyApi, SpotifyField};
pub use page_scrape::{PageScrape, StubhubPerformerPage};

use super::sampler::{SamplerSettings, StabilizationSampler};
use crate::metrics::MetricFamily;
use crate::sources::{Capabilities, SourceError};
use async_trait::async_trait;
use core::fmt::Debug;
use std::sync::Arc;

/// What a strategy is asked to read.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub entity_name: &'a str,

    /// Source identifier (username, artist ID, performer path)
    pub identifier: &'a str,
}

#[async_trait]
pub trait Strategy: Send + Sync + Debug {
    /// Short name used in logs and diagnostics.
    fn name(&self) -> &str;

    async fn attempt(&self, target: &Target<'_>) -> Result<Option<u64>, SourceError>;
}

/// The ordered strategies for `family`, leaving out those whose capability is not configured.
#[must_use]
pub fn chain_for(family: MetricFamily, caps: &Capabilities, sampler: &SamplerSettings) -> Vec<Box<dyn Strategy>> {
    let stabilizer = StabilizationSampler::from_settings(sampler);
    let browser = &caps.browser;
    let mut chain: Vec<Box<dyn Strategy>> = Vec::new();

    match family {
        MetricFamily::InstagramFollowers => {
            if let Some(instagram) = &caps.instagram {
                chain.push(Box::new(InstagramApi::new(Arc::clone(instagram))));
            }
            chain.push(Box::new(LiveCounter::livecounts_instagram(Arc::clone(browser), stabilizer, sampler.initial_delay)));
            chain.push(Box::new(LiveCounter::instastatistics(Arc::clone(browser), stabilizer, sampler.initial_delay)));
            chain.push(Box::new(PageScrape::instagram_profile(Arc::clone(browser))));
        }

        MetricFamily::TwitterFollowers => {
            chain.push(Box::new(PageScrape::twitter_verified(Arc::clone(browser))));
            chain.push(Box::new(LiveCounter::livecounts_twitter(Arc::clone(browser), stabilizer, sampler.initial_delay)));
            chain.push(Box::new(LiveCounter::livecounts_io_twitter(Arc::clone(browser), stabilizer, sampler.initial_delay)));
            chain.push(Box::new(PageScrape::twitter_profile(Arc::clone(browser))));
            chain.push(Box::new(PageScrape::twitter_search_snippet(Arc::clone(browser))));
        }

        MetricFamily::SpotifyFollowers | MetricFamily::SpotifyPopularity => {
            if let Some(spotify) = &caps.spotify {
                let field = if family == MetricFamily::SpotifyFollowers {
                    SpotifyField::Followers
                } else {
                    SpotifyField::Popularity
                };
                chain.push(Box::new(SpotifyApi::new(Arc::clone(spotify), field)));
            }
        }

        MetricFamily::SpotifyListeners => {
            chain.push(Box::new(PageScrape::spotify_artist(Arc::clone(&caps.http))));
            chain.push(Box::new(PageScrape::spotify_artist_rendered(Arc::clone(browser))));
        }

        MetricFamily::StubhubFavorites => {
            chain.push(Box::new(StubhubPerformerPage::new(Arc::clone(browser))));
        }
    }

    if let Some(generator) = &caps.generator
        && let Some(estimate) = Estimate::for_family(family, Arc::clone(generator))
    {
        chain.push(Box::new(estimate));
    }

    chain
}
