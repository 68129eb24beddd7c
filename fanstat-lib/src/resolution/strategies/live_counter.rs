use super::{Strategy, Target};
use crate::metrics::ValidRange;
use crate::resolution::html::widget_text;
use crate::resolution::sampler::StabilizationSampler;
use crate::sources::{PageFetcher, SourceError};
use async_trait::async_trait;
use core::time::Duration;
use std::sync::Arc;

const LOG_TARGET: &str = "      live";

/// Readings outside these bounds are animation frames or unrelated numbers.
const INSTAGRAM_SAMPLE_RANGE: ValidRange = ValidRange::new(1_001, 999_999_999);
const TWITTER_SAMPLE_RANGE: ValidRange = ValidRange::new(1_001, 299_999_999);

const INSTAGRAM_WIDGETS: &[&str] = &["odometer-inside", "odometer"];
const TWITTER_WIDGETS: &[&str] = &["odometer-inside", "followers-odometer", "odometer"];

/// Reads an animated follower counter on a third-party live-count site.
///
/// The page is rendered once per reading and the counter widget's text is fed to
/// the [`StabilizationSampler`].
#[derive(Debug)]
pub struct LiveCounter {
    name: &'static str,
    url_template: &'static str,
    widget_classes: &'static [&'static str],
    sample_range: ValidRange,
    fetcher: Arc<dyn PageFetcher>,
    sampler: StabilizationSampler,
    initial_delay: Duration,
}

impl LiveCounter {
    /// `url_template` contains `{id}`, replaced by the source identifier.
    #[must_use]
    pub fn new(
        name: &'static str,
        url_template: &'static str,
        widget_classes: &'static [&'static str],
        sample_range: ValidRange,
        fetcher: Arc<dyn PageFetcher>,
        sampler: StabilizationSampler,
        initial_delay: Duration,
    ) -> Self {
        Self {
            name,
            url_template,
            widget_classes,
            sample_range,
            fetcher,
            sampler,
            initial_delay,
        }
    }

    #[must_use]
    pub fn livecounts_instagram(fetcher: Arc<dyn PageFetcher>, sampler: StabilizationSampler, initial_delay: Duration) -> Self {
        Self::new(
            "livecounts.nl",
            "https://livecounts.nl/instagram-realtime/?u={id}",
            INSTAGRAM_WIDGETS,
            INSTAGRAM_SAMPLE_RANGE,
            fetcher,
            sampler,
            initial_delay,
        )
    }

    #[must_use]
    pub fn instastatistics(fetcher: Arc<dyn PageFetcher>, sampler: StabilizationSampler, initial_delay: Duration) -> Self {
        Self::new(
            "instastatistics.com",
            "https://instastatistics.com/{id}",
            INSTAGRAM_WIDGETS,
            INSTAGRAM_SAMPLE_RANGE,
            fetcher,
            sampler,
            initial_delay,
        )
    }

    #[must_use]
    pub fn livecounts_twitter(fetcher: Arc<dyn PageFetcher>, sampler: StabilizationSampler, initial_delay: Duration) -> Self {
        Self::new(
            "livecounts.nl",
            "https://livecounts.nl/twitter-realtime/?u={id}",
            TWITTER_WIDGETS,
            TWITTER_SAMPLE_RANGE,
            fetcher,
            sampler,
            initial_delay,
        )
    }

    #[must_use]
    pub fn livecounts_io_twitter(fetcher: Arc<dyn PageFetcher>, sampler: StabilizationSampler, initial_delay: Duration) -> Self {
        Self::new(
            "livecounts.io",
            "https://livecounts.io/twitter-live-follower-counter/{id}",
            TWITTER_WIDGETS,
            TWITTER_SAMPLE_RANGE,
            fetcher,
            sampler,
            initial_delay,
        )
    }
}

#[async_trait]
impl Strategy for LiveCounter {
    fn name(&self) -> &str {
        self.name
    }

    async fn attempt(&self, target: &Target<'_>) -> Result<Option<u64>, SourceError> {
        let url = self.url_template.replace("{id}", target.identifier);
        log::debug!(target: LOG_TARGET, "Sampling {url}");

        if !self.initial_delay.is_zero() {
            tokio::time::sleep(self.initial_delay).await;
        }

        let url = url.as_str();
        let fetcher = &*self.fetcher;
        let classes = self.widget_classes;

        self.sampler
            .sample(self.sample_range, move || async move {
                fetcher.fetch(url).await.map(|html| widget_text(&html, classes))
            })
            .await
    }
}
