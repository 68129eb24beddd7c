//! The metric-resolution pipeline
//!
//! For one entity and one [`MetricFamily`](crate::metrics::MetricFamily) the
//! [`MetricResolver`] first makes sure the entity has an identifier on the
//! family's source ([`SourceLookupResolver`]), then walks the family's strategy
//! chain until one strategy produces a value inside the family's valid range.
//! Live counters are read through the [`StabilizationSampler`].
//!
//! The [`Refresher`] runs the resolver over a set of families for one entity,
//! persists the results and, when asked to, records failures in the failure
//! ledger.

pub mod html;
mod lookup;
pub mod normalize;
mod outcome;
mod refresher;
mod resolver;
mod sampler;
pub mod strategies;

pub use lookup::{SourceLookupResolver, identifier_from_url, search_query};
pub use outcome::{ResolutionOutcome, SessionFatal};
pub use refresher::{RefreshReport, Refresher};
pub use resolver::{MetricResolver, ResolverSettings};
pub use sampler::{SamplerSettings, StabilizationSampler};
