use super::Host;
use super::common::{Common, CommonArgs};
use crate::Result;
use crate::metrics::Source;
use clap::Parser;
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Name of the entity
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Instagram username
    #[arg(long, value_name = "USERNAME")]
    pub instagram: Option<String>,

    /// Twitter/X username
    #[arg(long, value_name = "USERNAME")]
    pub twitter: Option<String>,

    /// Spotify artist ID
    #[arg(long, value_name = "ID")]
    pub spotify: Option<String>,

    /// StubHub performer path or URL
    #[arg(long, value_name = "PATH")]
    pub stubhub: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl AddArgs {
    fn identifiers(&self) -> BTreeMap<Source, String> {
        [
            (Source::Instagram, &self.instagram),
            (Source::Twitter, &self.twitter),
            (Source::Spotify, &self.spotify),
            (Source::Stubhub, &self.stubhub),
        ]
        .into_iter()
        .filter_map(|(source, id)| {
            let id = id.as_deref()?.trim().trim_start_matches('@');
            (!id.is_empty()).then(|| (source, id.to_string()))
        })
        .collect()
    }
}

pub async fn add_entity<H: Host>(host: &mut H, args: &AddArgs) -> Result<()> {
    let common = Common::new(&args.common)?;
    let created = common.store.upsert(&args.name, &args.identifiers()).await?;

    let verb = if created { "Added" } else { "Updated" };
    let _ = writeln!(host.output(), "{verb} entity '{}'", args.name.trim());
    Ok(())
}
