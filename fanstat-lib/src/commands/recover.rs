use super::Host;
use super::common::{Common, CommonArgs, CredentialArgs};
use crate::Result;
use crate::ledger::RecoveryRunner;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct RecoverArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

pub async fn recover_failures<H: Host>(host: &mut H, args: &RecoverArgs) -> Result<()> {
    let common = Common::new(&args.common)?;

    if common.ledger.load()?.is_empty() {
        let _ = writeln!(host.output(), "No failed resolutions to recover");
        return Ok(());
    }

    let caps = common.capabilities(&args.credentials)?;
    let refresher = common.refresher(&caps);
    let summary = RecoveryRunner::new(&refresher, &common.ledger).run().await?;

    let _ = writeln!(host.output(), "Recovery finished: {summary}");
    if summary.remaining() > 0 {
        let _ = writeln!(
            host.output(),
            "{} entity(ies) still listed in '{}'",
            summary.remaining(),
            common.ledger.path().display()
        );
    }

    Ok(())
}
