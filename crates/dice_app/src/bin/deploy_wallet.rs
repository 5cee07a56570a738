use std::process::ExitCode;

use anyhow::Result;
use tracing::info;

use dice_app::{VERSION, build_session, finish, print_progress, start};
use dice_chain::{WalletProvisioner, to_nano};
use dice_core::DeployConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let (config, _log_guard) = match start() {
        Ok(ready) => ready,
        Err(e) => return finish(Err(e)),
    };
    info!("Starting dice-deploy-wallet v{VERSION}");

    finish(run(&config).await)
}

async fn run(config: &DeployConfig) -> Result<()> {
    let session = build_session(config)?;
    let funding = to_nano(config.wallet_funding_tokens)?;

    let address = WalletProvisioner::new(session)
        .with_funding(funding)
        .on_progress(print_progress)
        .provision(&config.signer_id)
        .await?;

    info!(address = %address, signer = %config.signer_id, "wallet provisioned");
    Ok(())
}
