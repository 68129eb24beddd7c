//! Command dispatch logic for fanstat

use super::{AddArgs, InitArgs, ListArgs, RecoverArgs, ResolveArgs, add_entity, init_config, list_entities, recover_failures, resolve_entity};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "fanstat", version, author, long_about = None)]
#[command(about = "Resolve follower, listener and favorite counts from unreliable web sources")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: FanstatSubcommand,
}

#[derive(Subcommand, Debug)]
enum FanstatSubcommand {
    /// Resolve the metrics of one entity
    Resolve(Box<ResolveArgs>),
    /// Retry the families recorded in the failure ledger
    Recover(Box<RecoverArgs>),
    /// Register an entity or update its identifiers
    Add(Box<AddArgs>),
    /// Show every entity with its stored metrics
    List(ListArgs),
    /// Generate a default configuration file
    Init(InitArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the corresponding
/// subcommand. It's designed to be called from main.rs with the program arguments.
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    match &Cli::parse_from(args).command {
        FanstatSubcommand::Resolve(resolve_args) => resolve_entity(host, resolve_args).await,
        FanstatSubcommand::Recover(recover_args) => recover_failures(host, recover_args).await,
        FanstatSubcommand::Add(add_args) => add_entity(host, add_args).await,
        FanstatSubcommand::List(list_args) => list_entities(host, list_args).await,
        FanstatSubcommand::Init(init_args) => init_config(host, init_args),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::commands::host::TestHost;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn add_then_list() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = tmp.path().to_str().unwrap();
        let mut host = TestHost::new();

        run(&mut host, ["fanstat", "add", "Nova", "--instagram", "@novaofficial", "--data-dir", data_dir])
            .await
            .unwrap();
        run(&mut host, ["fanstat", "add", "Nova", "--spotify", "4abc", "--data-dir", data_dir])
            .await
            .unwrap();
        run(&mut host, ["fanstat", "list", "--data-dir", data_dir]).await.unwrap();

        let output = host.output_text();
        assert!(output.contains("Added entity 'Nova'"));
        assert!(output.contains("Updated entity 'Nova'"));
        assert!(output.contains("novaofficial"));
        assert!(!output.contains("@novaofficial"));
        assert!(output.contains("4abc"));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn list_shows_stored_genre() {
        use crate::store::{EntityStore, JsonEntityStore};

        let tmp = tempfile::tempdir().unwrap();
        let data_dir = tmp.path().to_str().unwrap();
        let mut host = TestHost::new();

        run(&mut host, ["fanstat", "add", "Nova", "--spotify", "4abc", "--data-dir", data_dir])
            .await
            .unwrap();
        JsonEntityStore::new(tmp.path().join("entities.json"))
            .update_genre("Nova", "dream pop")
            .await
            .unwrap();
        run(&mut host, ["fanstat", "list", "--data-dir", data_dir]).await.unwrap();

        assert!(host.output_text().contains("dream pop"));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn recover_with_empty_ledger() {
        let tmp = tempfile::tempdir().unwrap();
        let mut host = TestHost::new();

        run(&mut host, ["fanstat", "recover", "--data-dir", tmp.path().to_str().unwrap()])
            .await
            .unwrap();
        assert!(host.output_text().contains("No failed resolutions to recover"));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn init_writes_loadable_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("fanstat.toml");
        let mut host = TestHost::new();

        run(&mut host, ["fanstat", "init", path.to_str().unwrap()]).await.unwrap();
        assert!(host.output_text().contains("Generated default configuration file"));

        // the generated file is picked up from the data directory
        run(&mut host, ["fanstat", "list", "--data-dir", tmp.path().to_str().unwrap()])
            .await
            .unwrap();
        assert!(host.output_text().contains("No entities"));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn resolve_unknown_entity_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut host = TestHost::new();

        let err = run(&mut host, ["fanstat", "resolve", "Ghost", "--data-dir", tmp.path().to_str().unwrap()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
