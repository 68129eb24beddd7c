use super::normalize::normalize;
use crate::metrics::ValidRange;
use crate::sources::SourceError;
use core::time::Duration;
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "   sampler";

/// Tuning for reading animated counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerSettings {
    /// Maximum number of widget reads per page
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait once after opening a counter page, before the first read
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Wait before each read
    #[serde(default = "default_settle_delay", with = "humantime_serde")]
    pub settle_delay: Duration,

    /// Two consecutive readings closer than this fraction of the latter are considered stable
    #[serde(default = "default_tolerance_fraction")]
    pub tolerance_fraction: f64,
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_initial_delay() -> Duration {
    Duration::from_secs(7)
}

const fn default_settle_delay() -> Duration {
    Duration::from_secs(2)
}

const fn default_tolerance_fraction() -> f64 {
    0.01
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            settle_delay: default_settle_delay(),
            tolerance_fraction: default_tolerance_fraction(),
        }
    }
}

/// Polls a live-updating counter until two consecutive readings agree.
///
/// Live counters animate toward their value and sometimes jitter around it, so a
/// single read can land mid-animation. Readings are collected into a window;
/// as soon as the last two are within tolerance the last one is returned. If the
/// attempts run out first, the truncated mean of every valid reading is used.
#[derive(Debug, Clone, Copy)]
pub struct StabilizationSampler {
    max_attempts: u32,
    settle_delay: Duration,
    tolerance_fraction: f64,
}

impl StabilizationSampler {
    #[must_use]
    pub const fn new(max_attempts: u32, settle_delay: Duration, tolerance_fraction: f64) -> Self {
        Self {
            max_attempts,
            settle_delay,
            tolerance_fraction,
        }
    }

    #[must_use]
    pub const fn from_settings(settings: &SamplerSettings) -> Self {
        Self::new(settings.max_attempts, settings.settle_delay, settings.tolerance_fraction)
    }

    /// Sample `read` until the readings stabilize.
    ///
    /// `read` returns the widget text, or `None` when the widget is not on the page.
    /// Readings that normalize outside `valid_range` are discarded. A transient read
    /// error only costs its attempt; a session-fatal one ends sampling.
    pub async fn sample<F, Fut>(&self, valid_range: ValidRange, mut read: F) -> Result<Option<u64>, SourceError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<Option<String>, SourceError>> + Send,
    {
        let mut window = Vec::with_capacity(self.max_attempts as usize);

        for attempt in 1..=self.max_attempts {
            if !self.settle_delay.is_zero() {
                tokio::time::sleep(self.settle_delay).await;
            }

            let text = match read().await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    log::debug!(target: LOG_TARGET, "Attempt {attempt}: counter widget not present");
                    continue;
                }
                Err(fatal @ SourceError::SessionFatal(_)) => return Err(fatal),
                Err(e) => {
                    log::debug!(target: LOG_TARGET, "Attempt {attempt}: read failed: {e:#}");
                    continue;
                }
            };

            let value = normalize(&text);
            if !valid_range.contains(value) {
                log::debug!(target: LOG_TARGET, "Attempt {attempt}: discarding '{text}' ({value} outside {valid_range})");
                continue;
            }

            log::trace!(target: LOG_TARGET, "Attempt {attempt}: read {value}");
            window.push(value);

            if let [.., previous, last] = window.as_slice()
                && is_stable(*previous, *last, self.tolerance_fraction)
            {
                log::debug!(target: LOG_TARGET, "Counter settled at {last} after {attempt} attempt(s)");
                return Ok(Some(*last));
            }
        }

        let mean = truncated_mean(&window);
        if let Some(mean) = mean {
            log::debug!(target: LOG_TARGET, "Counter never settled, using mean {mean} of {} reading(s)", window.len());
        }
        Ok(mean)
    }
}

#[expect(clippy::cast_precision_loss, reason = "counts are far below f64's exact integer limit")]
fn is_stable(previous: u64, last: u64, tolerance_fraction: f64) -> bool {
    (last.abs_diff(previous) as f64) < tolerance_fraction * last as f64
}

fn truncated_mean(window: &[u64]) -> Option<u64> {
    if window.is_empty() {
        return None;
    }

    let sum: u128 = window.iter().map(|v| u128::from(*v)).sum();
    u64::try_from(sum / window.len() as u128).ok()
}
