use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{info, warn};

use dice_app::{VERSION, build_session, finish, print_progress, resume_hint, start};
use dice_chain::{Address, OwnershipTransferor, TransferAborted, to_nano};
use dice_core::DeployConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let (config, _log_guard) = match start() {
        Ok(ready) => ready,
        Err(e) => return finish(Err(e)),
    };
    info!("Starting dice-transfer-owner v{VERSION}");

    finish(run(&config).await)
}

async fn run(config: &DeployConfig) -> Result<()> {
    let session = build_session(config)?;
    let resource: Address = config
        .token_root_address
        .parse()
        .context("invalid token_root_address")?;

    let flow = OwnershipTransferor::new(session)
        .with_resource_template(config.resource_template.as_str())
        .with_values(
            to_nano(config.owner_deploy_tokens)?,
            to_nano(config.transfer_fee_tokens)?,
        )
        .on_progress(print_progress);

    let outcome = match &config.resume_owner_address {
        Some(raw) => {
            let owner: Address = raw.parse().context("invalid resume_owner_address")?;
            flow.resume_transfer(&config.signer_id, &resource, &owner)
                .await
        }
        None => {
            flow.transfer_ownership(&config.signer_id, &resource, &config.owner_template)
                .await
        }
    };
    let owner = outcome.inspect_err(report_abort)?;

    match flow.verify_owner(&resource, &owner).await {
        Ok(true) => info!(resource = %resource, owner = %owner, "owner verified"),
        Ok(false) => eprintln!("warning: {resource} does not report {owner} as its owner yet"),
        Err(e) => warn!("Could not read back owner of {resource}: {e}"),
    }
    Ok(())
}

fn report_abort(aborted: &TransferAborted) {
    if let Some(hint) = resume_hint(aborted) {
        eprintln!("{hint}");
    }
}
