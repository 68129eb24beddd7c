//! The metrics fanstat knows how to resolve
//!
//! A [`MetricFamily`] is one category of count for one platform (Instagram
//! followers, Spotify monthly listeners, ...). Every family belongs to exactly one
//! [`Source`], and families sharing a source share the source identifier stored on
//! the entity (a username, an artist ID, a performer URL).
//!
//! Each family carries a plausible numeric range ([`ValidRange`]). Values outside
//! of it are treated as misreads (a page's unrelated number, an animation frame)
//! and never reach the store.
//!
//! The declaration order of [`MetricFamily`] is significant: it is the order
//! families are resolved in and the order they are listed in diagnostics.

mod metric_family;
mod source;
mod valid_range;

pub use metric_family::MetricFamily;
pub use source::Source;
pub use valid_range::ValidRange;
