//! Owner contract deployment and token-root ownership transfer.
//!
//! The flow walks `Start -> KeyResolved -> SenderRegistered -> OwnerDeployed
//! -> OwnershipTransferred`. A failure at any step aborts with the last stage
//! that completed. Nothing is rolled back: an owner contract deployed before a
//! failed transfer stays on-chain, and [`OwnershipTransferor::resume_transfer`]
//! retries only the transfer against it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::address::Address;
use crate::error::DeployError;
use crate::keystore::KeyMaterial;
use crate::network::{
    ChainReader, ContractDeployer, DeploymentSpec, SendOptions, TransferOwnershipRequest,
};
use crate::progress::{self, Progress, ProgressFn};
use crate::session::Session;
use crate::templates::{ANY_OWNER_TOKEN_ROOT_PARAM, TOKEN_ROOT_UPGRADEABLE};
use crate::units::NANO_PER_TOKEN;

/// Value attached to the owner contract deployment: 2 whole tokens.
pub const DEFAULT_OWNER_DEPLOY_VALUE: u64 = 2 * NANO_PER_TOKEN;

/// Value attached to `transferOwnership`: 2 whole tokens.
pub const DEFAULT_TRANSFER_VALUE: u64 = 2 * NANO_PER_TOKEN;

/// Stages of the ownership transfer flow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum TransferStage {
    Start,
    KeyResolved,
    SenderRegistered,
    OwnerDeployed,
    OwnershipTransferred,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Start => "start",
            Self::KeyResolved => "key resolved",
            Self::SenderRegistered => "sender registered",
            Self::OwnerDeployed => "owner deployed",
            Self::OwnershipTransferred => "ownership transferred",
        };
        f.write_str(label)
    }
}

/// The flow stopped before reaching [`TransferStage::OwnershipTransferred`].
#[derive(Debug, thiserror::Error)]
#[error("ownership transfer aborted after stage `{last_completed}`: {source}")]
pub struct TransferAborted {
    pub last_completed: TransferStage,
    /// Owner contract deployed by this run, if any. It is not cleaned up.
    pub owner: Option<Address>,
    pub source: DeployError,
}

/// Tracks the furthest stage reached so aborts can report it.
struct Tracker {
    stage: TransferStage,
    owner: Option<Address>,
}

impl Tracker {
    fn new() -> Self {
        Self {
            stage: TransferStage::Start,
            owner: None,
        }
    }

    fn advance(&mut self, stage: TransferStage) {
        info!(stage = %stage, "ownership transfer stage completed");
        self.stage = stage;
    }

    fn abort(&self, source: DeployError) -> TransferAborted {
        error!(
            last_completed = %self.stage,
            owner = ?self.owner.map(|a| a.to_string()),
            error = %source,
            kind = source.kind(),
            "ownership transfer aborted"
        );
        TransferAborted {
            last_completed: self.stage,
            owner: self.owner,
            source,
        }
    }
}

/// Deploys an owner contract for a resource and hands the resource to it.
///
/// The sender is the signer's derived wallet, which must already be funded;
/// this flow never funds it.
pub struct OwnershipTransferor {
    session: Arc<Session>,
    resource_template: String,
    deploy_value: u64,
    transfer_value: u64,
    progress: ProgressFn,
}

impl OwnershipTransferor {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            resource_template: TOKEN_ROOT_UPGRADEABLE.to_string(),
            deploy_value: DEFAULT_OWNER_DEPLOY_VALUE,
            transfer_value: DEFAULT_TRANSFER_VALUE,
            progress: progress::silent(),
        }
    }

    /// Template of the resource whose ownership is transferred.
    pub fn with_resource_template(mut self, template: impl Into<String>) -> Self {
        self.resource_template = template.into();
        self
    }

    /// Values attached to the deployment and to the transfer, in nano-units.
    pub fn with_values(mut self, deploy_value: u64, transfer_value: u64) -> Self {
        self.deploy_value = deploy_value;
        self.transfer_value = transfer_value;
        self
    }

    pub fn on_progress(mut self, f: impl Fn(&Progress) + Send + Sync + 'static) -> Self {
        self.progress = Box::new(f);
        self
    }

    /// Deploy a `contract_template` owner bound to `resource_address` and make
    /// it the resource's owner. Returns the owner contract's address.
    ///
    /// Not idempotent: every run deploys again. Owner addresses depend only
    /// on template, key and resource, so a second run for the same resource
    /// collides with the first deployment and is rejected by the network;
    /// use [`Self::resume_transfer`] to finish an interrupted run instead.
    pub async fn transfer_ownership(
        &self,
        signer_id: &str,
        resource_address: &Address,
        contract_template: &str,
    ) -> Result<Address, TransferAborted> {
        let mut tracker = Tracker::new();

        let (key, wallet) = self.resolve_sender(signer_id, &mut tracker).await?;

        let owner = self
            .deploy_owner(&key, resource_address, contract_template)
            .await
            .map_err(|e| tracker.abort(e))?;
        tracker.owner = Some(owner);
        tracker.advance(TransferStage::OwnerDeployed);
        (self.progress)(&Progress::OwnerDeployed { address: owner });

        self.send_transfer(wallet, resource_address, owner)
            .await
            .map_err(|e| tracker.abort(e))?;
        tracker.advance(TransferStage::OwnershipTransferred);
        (self.progress)(&Progress::OwnershipTransferred {
            resource: *resource_address,
            owner,
        });
        Ok(owner)
    }

    /// Re-run only the transfer step against an owner contract that an
    /// earlier run already deployed.
    pub async fn resume_transfer(
        &self,
        signer_id: &str,
        resource_address: &Address,
        owner: &Address,
    ) -> Result<Address, TransferAborted> {
        let mut tracker = Tracker::new();
        tracker.owner = Some(*owner);

        let (_, wallet) = self.resolve_sender(signer_id, &mut tracker).await?;

        let deployed = self
            .session
            .network()
            .is_deployed(owner)
            .await
            .map_err(|e| tracker.abort(e))?;
        if !deployed {
            return Err(tracker.abort(DeployError::Invocation(format!(
                "owner contract {owner} is not deployed"
            ))));
        }
        tracker.advance(TransferStage::OwnerDeployed);
        info!(owner = %owner, "resuming transfer to existing owner contract");

        self.send_transfer(wallet, resource_address, *owner)
            .await
            .map_err(|e| tracker.abort(e))?;
        tracker.advance(TransferStage::OwnershipTransferred);
        (self.progress)(&Progress::OwnershipTransferred {
            resource: *resource_address,
            owner: *owner,
        });
        Ok(*owner)
    }

    /// Read the resource's owner back and compare it with `expected`.
    pub async fn verify_owner(
        &self,
        resource_address: &Address,
        expected: &Address,
    ) -> Result<bool, DeployError> {
        let current = self
            .session
            .network()
            .owner_of(resource_address, &self.resource_template)
            .await?;
        let matches = current.as_ref() == Some(expected);
        if !matches {
            warn!(
                resource = %resource_address,
                expected = %expected,
                current = ?current.map(|a| a.to_string()),
                "resource owner differs from deployed owner contract"
            );
        }
        Ok(matches)
    }

    /// Steps 1 and 2: signer lookup, wallet derivation, sender registration.
    async fn resolve_sender(
        &self,
        signer_id: &str,
        tracker: &mut Tracker,
    ) -> Result<(KeyMaterial, Address), TransferAborted> {
        let key = self
            .session
            .signer(signer_id)
            .map_err(|e| tracker.abort(e))?;
        let wallet = self
            .session
            .wallet_address(&key)
            .await
            .map_err(|e| tracker.abort(e))?;
        tracker.advance(TransferStage::KeyResolved);

        self.session.accounts().add_account(wallet);
        tracker.advance(TransferStage::SenderRegistered);
        (self.progress)(&Progress::SenderRegistered { address: wallet });
        Ok((key, wallet))
    }

    async fn deploy_owner(
        &self,
        key: &KeyMaterial,
        resource_address: &Address,
        contract_template: &str,
    ) -> Result<Address, DeployError> {
        let mut init_params = BTreeMap::new();
        init_params.insert(
            ANY_OWNER_TOKEN_ROOT_PARAM.to_string(),
            serde_json::json!(resource_address),
        );
        let spec = DeploymentSpec {
            contract_template: contract_template.to_string(),
            init_params,
            constructor_params: BTreeMap::new(),
            funding_amount: self.deploy_value,
            deployer_key: key.clone(),
        };

        let deployed = self.session.network().deploy(spec).await?;
        info!(
            address = %deployed.address,
            template = %deployed.template,
            tx_id = %deployed.tx_id,
            "owner contract deployed"
        );
        Ok(deployed.address)
    }

    async fn send_transfer(
        &self,
        wallet: Address,
        resource_address: &Address,
        owner: Address,
    ) -> Result<(), DeployError> {
        let request = TransferOwnershipRequest {
            resource_address: *resource_address,
            new_owner: owner,
            gas_refund_recipient: wallet,
            callbacks: Vec::new(),
        };
        let options = SendOptions {
            from: wallet,
            amount_nano: self.transfer_value,
        };

        let call = request.into_call(&self.resource_template)?;
        let confirmation = self.session.send_from(call, options).await?;
        info!(
            resource = %resource_address,
            owner = %owner,
            tx_id = %confirmation.tx_id,
            "ownership transferred"
        );
        Ok(())
    }
}
