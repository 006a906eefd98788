//! One-shot transaction submission.

use super::{output, SubmitArgs};
use crate::application::DispatchCore;
use crate::domain::{SubmitParams, TransactionId};
use crate::error::Result;

pub async fn execute(args: &SubmitArgs) -> Result<()> {
    let config = super::load_config(&args.config)?;
    let core = DispatchCore::from_config(config)?;

    let mut params = SubmitParams::new(
        args.source.as_str(),
        args.destination.as_str(),
        args.amount,
        args.wallet.as_str(),
    )
    .with_slippage(args.slippage);
    params.is_simulation = args.simulation();
    let id = args
        .id
        .as_deref()
        .map_or_else(TransactionId::generate, TransactionId::new);

    core.start();
    output::key_value("Transaction", &id);
    output::key_value("Route", core.supervisor().route());
    if params.simulation(core.config().simulation) {
        output::note("Simulation only, nothing will be sent");
    }
    let result = core.submit_as(id, params).await;
    core.shutdown().await;

    match result {
        Ok(signature) => {
            output::ok("Transaction confirmed");
            output::key_value("Signature", signature);
            Ok(())
        }
        Err(e) => {
            output::error(&format!("Transaction failed [{}]", e.code()));
            Err(e)
        }
    }
}
