use clap::Parser;
use switchyard::cli::{self, Cli};
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tokio::select! {
        result = cli::run(cli) => {
            if let Err(e) = result {
                return Err(anyhow::Error::new(e).context("switchyard failed"));
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
