//! Balance lookup through the dispatch core.

use super::{output, BalanceArgs};
use crate::application::DispatchCore;
use crate::error::Result;

pub async fn execute(args: &BalanceArgs) -> Result<()> {
    let config = super::load_config(&args.config)?;
    let core = DispatchCore::from_config(config)?;
    core.queue().start();

    let result = core.get_balance(&args.address).await;
    core.queue().shutdown().await;
    let value = result?;

    output::key_value("Address", &args.address);
    match value.get("value") {
        Some(lamports) => output::key_value("Balance", lamports),
        None => output::key_value("Result", &value),
    }
    Ok(())
}
