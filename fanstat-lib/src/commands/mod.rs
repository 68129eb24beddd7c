//! Command-line interface for fanstat
//!
//! Each subcommand lives in its own module and follows the same shape: parse its
//! arguments, build a [`common::Common`] from the shared flags (logging, data
//! directory, configuration), wire the store, ledger and capabilities together,
//! and write human-readable results through the [`Host`].
//!
//! ## Commands
//!
//! - **resolve**: refresh every family of one entity, or a single family with a
//!   fallback to every family when it fails
//! - **recover**: replay the failure ledger
//! - **add** / **list**: manage the entity store
//! - **init**: write the default configuration file

mod add;
mod common;
mod config;
mod host;
mod init;
mod list;
mod recover;
mod resolve;
mod run;

pub use add::{AddArgs, add_entity};
pub use common::{ColorMode, CommonArgs, CredentialArgs, LogLevel};
pub use config::{Config, Endpoints};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use list::{ListArgs, list_entities};
pub use recover::{RecoverArgs, recover_failures};
pub use resolve::{ResolveArgs, refresh_entity, resolve_entity};
pub use run::run;
