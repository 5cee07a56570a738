use std::sync::Arc;

use tracing::{error, info};

use crate::address::Address;
use crate::error::DeployError;
use crate::network::FundingService;
use crate::progress::{self, Progress, ProgressFn};
use crate::session::Session;
use crate::units::NANO_PER_TOKEN;

/// Value sent to a freshly derived wallet: 10 whole tokens.
pub const DEFAULT_WALLET_FUNDING: u64 = 10 * NANO_PER_TOKEN;

/// Derives a signer's wallet address and tops it up from the giver.
///
/// Derivation is idempotent. Funding is not: every successful run adds
/// another funding amount to the wallet, so re-running acts as a top-up
/// rather than a safe retry.
pub struct WalletProvisioner {
    session: Arc<Session>,
    funding_nano: u64,
    progress: ProgressFn,
}

impl WalletProvisioner {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            funding_nano: DEFAULT_WALLET_FUNDING,
            progress: progress::silent(),
        }
    }

    /// Override the amount sent to the wallet, in nano-units.
    pub fn with_funding(mut self, funding_nano: u64) -> Self {
        self.funding_nano = funding_nano;
        self
    }

    /// Receive progress events as the flow advances.
    pub fn on_progress(mut self, f: impl Fn(&Progress) + Send + Sync + 'static) -> Self {
        self.progress = Box::new(f);
        self
    }

    /// Resolve `signer_id`, derive its wallet address and fund it.
    ///
    /// Fails with [`DeployError::KeyNotFound`] before any network call when
    /// the signer is unknown, with [`DeployError::Query`] when the network
    /// cannot resolve the wallet address, and with [`DeployError::Funding`] when the giver
    /// rejects or cannot be reached. In the latter case the address is still
    /// valid but holds no new balance.
    pub async fn provision(&self, signer_id: &str) -> Result<Address, DeployError> {
        let key = self.session.signer(signer_id)?;
        let address = self.session.wallet_address(&key).await?;
        info!(signer_id, address = %address, "wallet address derived");
        (self.progress)(&Progress::WalletDerived { address });

        let confirmation = self
            .session
            .network()
            .send_to(&address, self.funding_nano)
            .await
            .inspect_err(|e| error!(address = %address, error = %e, "wallet funding failed"))?;

        info!(
            address = %address,
            amount_nano = self.funding_nano,
            tx_id = %confirmation.tx_id,
            "wallet funded"
        );
        (self.progress)(&Progress::WalletFunded {
            address,
            amount_nano: self.funding_nano,
        });
        Ok(address)
    }
}
