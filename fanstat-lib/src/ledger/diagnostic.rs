//! The free-text diagnostic shared by the store and the failure ledger.
//!
//! A diagnostic lists failing families as `<family_key>: <reason>` segments joined
//! with `"; "`, in family order. Reasons may themselves contain the separator; a
//! segment that does not start with a family key belongs to the previous reason.

use crate::metrics::MetricFamily;
use std::collections::BTreeMap;

const SEPARATOR: &str = "; ";

/// Render failing families, or `None` when nothing failed.
#[must_use]
pub fn compose(failures: &BTreeMap<MetricFamily, String>) -> Option<String> {
    if failures.is_empty() {
        return None;
    }

    let segments: Vec<String> = failures
        .iter()
        .map(|(family, reason)| format!("{family}: {}", single_line(reason)))
        .collect();
    Some(segments.join(SEPARATOR))
}

/// Recover the failing families named by a diagnostic.
///
/// Text before the first recognizable family key is ignored.
#[must_use]
pub fn parse(diagnostic: &str) -> BTreeMap<MetricFamily, String> {
    let mut failures = BTreeMap::new();
    let mut current: Option<MetricFamily> = None;

    for segment in diagnostic.split(SEPARATOR) {
        if let Some((key, reason)) = segment.split_once(':')
            && let Some(family) = MetricFamily::from_key(key)
        {
            let _ = failures.insert(family, reason.trim().to_string());
            current = Some(family);
        } else if let Some(family) = current
            && let Some(reason) = failures.get_mut(&family)
        {
            reason.push_str(SEPARATOR);
            reason.push_str(segment);
        }
    }

    failures
}

fn single_line(reason: &str) -> String {
    reason.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_in_family_order() {
        let failures = BTreeMap::from([
            (MetricFamily::StubhubFavorites, "not found".to_string()),
            (MetricFamily::InstagramFollowers, "livecounts.nl: HTTP 503\nretry later".to_string()),
        ]);

        assert_eq!(
            compose(&failures).as_deref(),
            Some("instagram_followers: livecounts.nl: HTTP 503 retry later; stubhub_favorites: not found")
        );
        assert_eq!(compose(&BTreeMap::new()), None);
    }

    #[test]
    fn parse_keeps_separators_inside_reasons() {
        let parsed = parse("twitter_followers: search snippet: a; b; spotify_listeners: not found");
        assert_eq!(
            parsed,
            BTreeMap::from([
                (MetricFamily::TwitterFollowers, "search snippet: a; b".to_string()),
                (MetricFamily::SpotifyListeners, "not found".to_string()),
            ])
        );
    }

    #[test]
    fn parse_ignores_unknown_text() {
        assert!(parse("something went wrong").is_empty());
        assert!(parse("").is_empty());
    }
}
