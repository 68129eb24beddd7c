#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for fanstat
//!
//! This library holds all functionality of the fanstat tool, which resolves public
//! follower, listener and favorite counts for named entities from a set of
//! unreliable third-party web sources.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`resolution`]: Identifier lookup, strategy chains, counter sampling and per-entity refreshes
//! - [`ledger`]: Failure ledger and recovery runs
//! - [`sources`]: Page fetchers, web search and API clients
//! - [`store`]: Entity persistence
//! - [`metrics`]: Metric families and their valid ranges

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

#[cfg(any(debug_assertions, test))]
pub mod file_lock;
#[cfg(not(any(debug_assertions, test)))]
mod file_lock;

#[cfg(any(debug_assertions, test))]
pub mod ledger;
#[cfg(not(any(debug_assertions, test)))]
mod ledger;

#[cfg(any(debug_assertions, test))]
pub mod metrics;
#[cfg(not(any(debug_assertions, test)))]
mod metrics;

#[cfg(any(debug_assertions, test))]
pub mod resolution;
#[cfg(not(any(debug_assertions, test)))]
mod resolution;

#[cfg(any(debug_assertions, test))]
pub mod sources;
#[cfg(not(any(debug_assertions, test)))]
mod sources;

#[cfg(any(debug_assertions, test))]
pub mod store;
#[cfg(not(any(debug_assertions, test)))]
mod store;

pub use crate::commands::{Host, run};
