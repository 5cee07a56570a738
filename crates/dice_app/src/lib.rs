// Shared bootstrap for the deployment binaries

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;

use dice_chain::{KeyStore, Progress, RpcConfig, Session, ToolkitClient, TransferAborted};
use dice_core::DeployConfig;
use dice_core::logging;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load the config and install logging. The guard must outlive the run.
pub fn start() -> Result<(DeployConfig, WorkerGuard)> {
    let config = DeployConfig::load().context("Failed to load config")?;
    let guard = logging::init_logging(&config)?;
    Ok((config, guard))
}

/// Wire the key store and the toolkit gateway into a session.
pub fn build_session(config: &DeployConfig) -> Result<Arc<Session>> {
    let keystore_path = config.keystore_file()?;
    let keys = KeyStore::load_from_file(&keystore_path)
        .with_context(|| format!("Failed to load key store {}", keystore_path.display()))?;

    let rpc = RpcConfig::new(config.rpc_url.clone(), config.rpc_timeout_secs)?;
    let client = ToolkitClient::new(rpc)?;

    Ok(Arc::new(
        Session::new(Arc::new(keys), Arc::new(client)).with_workchain(config.workchain),
    ))
}

/// Operator-facing progress line on stdout.
pub fn print_progress(progress: &Progress) {
    println!("{progress}");
}

/// Recovery hint for a transfer that stopped after the owner went live.
pub fn resume_hint(aborted: &TransferAborted) -> Option<String> {
    aborted.owner.map(|owner| {
        format!(
            "owner contract {owner} is already deployed; set resume_owner_address to \"{owner}\" and rerun"
        )
    })
}

/// Map the outcome of a run to a process exit code.
pub fn finish(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run failed: {e:#}");
            eprintln!("{e:?}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dice_chain::{DeployError, TransferStage};

    const OWNER: &str = "0:1111111111111111111111111111111111111111111111111111111111111111";

    #[test]
    fn build_session_with_missing_keystore_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let config = DeployConfig {
            keystore_path: Some(tmp.path().join("keys.json")),
            workchain: -1,
            ..DeployConfig::default()
        };

        let session = build_session(&config).unwrap();
        assert_eq!(session.workchain(), -1);
        assert!(matches!(session.signer("0"), Err(DeployError::KeyNotFound(_))));
    }

    #[test]
    fn build_session_rejects_bad_rpc_url() {
        let tmp = tempfile::tempdir().unwrap();
        let config = DeployConfig {
            keystore_path: Some(tmp.path().join("keys.json")),
            rpc_url: "not-a-url".into(),
            ..DeployConfig::default()
        };

        assert!(build_session(&config).is_err());
    }

    #[test]
    fn resume_hint_names_deployed_owner() {
        let aborted = TransferAborted {
            last_completed: TransferStage::OwnerDeployed,
            owner: Some(OWNER.parse().unwrap()),
            source: DeployError::Invocation("expired".into()),
        };
        let hint = resume_hint(&aborted).unwrap();
        assert!(hint.contains(OWNER));
        assert!(hint.contains("resume_owner_address"));
    }

    #[test]
    fn resume_hint_absent_before_owner_deploy() {
        let aborted = TransferAborted {
            last_completed: TransferStage::SenderRegistered,
            owner: None,
            source: DeployError::Deployment("rejected".into()),
        };
        assert!(resume_hint(&aborted).is_none());
    }
}
