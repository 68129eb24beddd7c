use super::{Strategy, Target};
use crate::metrics::MetricFamily;
use crate::resolution::normalize::first_integer;
use crate::sources::{SourceError, TextGenerator};
use async_trait::async_trait;
use std::sync::Arc;

const LOG_TARGET: &str = "  estimate";

/// Ask a language model for the count and take the first integer of its answer.
///
/// Only ever the last link of a chain: the answer is a guess, used when every
/// deterministic source has failed.
#[derive(Debug)]
pub struct Estimate {
    generator: Arc<dyn TextGenerator>,
    platform: &'static str,
}

impl Estimate {
    /// The estimate for `family`, or `None` for families where a guess is not worth recording.
    #[must_use]
    pub fn for_family(family: MetricFamily, generator: Arc<dyn TextGenerator>) -> Option<Self> {
        let platform = match family {
            MetricFamily::InstagramFollowers => "Instagram",
            MetricFamily::TwitterFollowers => "Twitter",
            MetricFamily::SpotifyFollowers
            | MetricFamily::SpotifyListeners
            | MetricFamily::SpotifyPopularity
            | MetricFamily::StubhubFavorites => return None,
        };

        Some(Self { generator, platform })
    }

    fn prompt(&self, target: &Target<'_>) -> String {
        format!(
            "Current {} follower count for {} (@{})? Reply with ONE integer only.",
            self.platform, target.entity_name, target.identifier
        )
    }
}

#[async_trait]
impl Strategy for Estimate {
    fn name(&self) -> &str {
        "estimate"
    }

    async fn attempt(&self, target: &Target<'_>) -> Result<Option<u64>, SourceError> {
        let answer = self.generator.generate(&self.prompt(target)).await?;
        let value = first_integer(&answer);
        if value.is_none() {
            log::debug!(target: LOG_TARGET, "No number in estimate '{}'", answer.trim());
        }
        Ok(value)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct CannedAnswer {
        answer: &'static str,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for CannedAnswer {
        async fn generate(&self, prompt: &str) -> crate::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.answer.to_string())
        }
    }

    fn generator(answer: &'static str) -> Arc<CannedAnswer> {
        Arc::new(CannedAnswer {
            answer,
            prompts: Mutex::default(),
        })
    }

    const TARGET: Target<'static> = Target {
        entity_name: "Nova",
        identifier: "novaofficial",
    };

    #[tokio::test]
    async fn parses_first_integer_of_answer() {
        let canned = generator("Approximately 1,250,000 followers (as of 2024: 1,300,000)");
        let estimate = Estimate::for_family(MetricFamily::InstagramFollowers, Arc::clone(&canned) as Arc<dyn TextGenerator>).unwrap();

        assert_eq!(estimate.attempt(&TARGET).await.unwrap(), Some(1_250_000));
        let prompts = canned.prompts.lock().unwrap();
        assert_eq!(
            prompts.as_slice(),
            ["Current Instagram follower count for Nova (@novaofficial)? Reply with ONE integer only."]
        );
    }

    #[tokio::test]
    async fn answer_without_number_is_no_value() {
        let estimate = Estimate::for_family(MetricFamily::TwitterFollowers, generator("I cannot know that.")).unwrap();
        assert_eq!(estimate.attempt(&TARGET).await.unwrap(), None);
    }

    #[test]
    fn not_offered_for_spotify_or_stubhub() {
        assert!(Estimate::for_family(MetricFamily::SpotifyListeners, generator("1")).is_none());
        assert!(Estimate::for_family(MetricFamily::StubhubFavorites, generator("1")).is_none());
    }
}
