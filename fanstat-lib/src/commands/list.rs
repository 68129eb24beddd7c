use super::Host;
use super::common::{Common, CommonArgs};
use crate::Result;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

pub async fn list_entities<H: Host>(host: &mut H, args: &ListArgs) -> Result<()> {
    let common = Common::new(&args.common)?;
    let entities = common.store.list().await?;

    if entities.is_empty() {
        let _ = writeln!(host.output(), "No entities in '{}'", common.store.path().display());
        return Ok(());
    }

    for entity in entities {
        let _ = writeln!(host.output(), "{}", entity.name);

        for (source, id) in &entity.identifiers {
            let _ = writeln!(host.output(), "  {:<20} {id}", source.display_name());
        }

        for (family, value) in &entity.metrics {
            let _ = writeln!(host.output(), "  {:<20} {value}", family.key());
        }

        if let Some(genre) = &entity.genre {
            let _ = writeln!(host.output(), "  {:<20} {genre}", "genre");
        }

        if let Some(updated_at) = entity.updated_at {
            let _ = writeln!(host.output(), "  {:<20} {}", "updated", updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }

        if let Some(error) = &entity.last_error {
            let _ = writeln!(host.output(), "  {:<20} {error}", "last error");
        }
    }

    Ok(())
}
