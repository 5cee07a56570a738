//! Collaborator traits for the network side of the flows, and the request
//! types they exchange.
//!
//! Every call here is a network round-trip that resolves once the toolkit
//! has observed the resulting transaction (or its failure). None of them are
//! retried locally.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::DeployError;
use crate::keystore::{KeyMaterial, PublicKey};
use crate::templates::TRANSFER_OWNERSHIP;

/// Acknowledgment that a transaction was accepted and processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub tx_id: String,
}

/// One contract instantiation request. Consumed by [`ContractDeployer::deploy`].
#[derive(Debug, Clone)]
pub struct DeploymentSpec {
    pub contract_template: String,
    pub init_params: BTreeMap<String, serde_json::Value>,
    pub constructor_params: BTreeMap<String, serde_json::Value>,
    /// Value attached to the deployment, in nano-units.
    pub funding_amount: u64,
    pub deployer_key: KeyMaterial,
}

/// A contract instance the network accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContract {
    pub address: Address,
    pub template: String,
    pub tx_id: String,
}

/// An external method call against a deployed contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCall {
    pub address: Address,
    /// Template of the target, used to pick the ABI for encoding.
    pub template: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// Sender and attached value of an internal message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub from: Address,
    pub amount_nano: u64,
}

/// Notification the resource sends to a callback address after the transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipCallback {
    /// Value forwarded with the notification, in nano-units.
    pub value: u64,
    /// Base64 BOC cell.
    pub payload: String,
}

/// Arguments of `transferOwnership` on an ownership-capable resource.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOwnershipRequest {
    pub resource_address: Address,
    pub new_owner: Address,
    pub gas_refund_recipient: Address,
    /// Encoded in this order. The resource keeps them in a map keyed by
    /// address, so each address may appear only once.
    pub callbacks: Vec<(Address, OwnershipCallback)>,
}

impl TransferOwnershipRequest {
    /// Encode as a call against a resource of the given template.
    ///
    /// `callbacks` becomes the ABI `map(address,tuple(uint128,cell))` as a
    /// list of `[address, {value, payload}]` entries.
    pub fn into_call(self, template: &str) -> Result<ContractCall, DeployError> {
        let mut seen = BTreeSet::new();
        let mut callbacks = Vec::with_capacity(self.callbacks.len());
        for (address, callback) in &self.callbacks {
            if !seen.insert(*address) {
                return Err(DeployError::Invocation(format!(
                    "callback address {address} appears more than once"
                )));
            }
            callbacks.push(serde_json::json!([
                address,
                {
                    "value": callback.value.to_string(),
                    "payload": callback.payload,
                }
            ]));
        }

        Ok(ContractCall {
            address: self.resource_address,
            template: template.to_string(),
            method: TRANSFER_OWNERSHIP.to_string(),
            params: serde_json::json!({
                "newOwner": self.new_owner,
                "remainingGasTo": self.gas_refund_recipient,
                "callbacks": callbacks,
            }),
        })
    }
}

/// Resolves the address of a signer's wallet contract.
#[async_trait]
pub trait AddressDeriver: Send + Sync {
    /// Wallet address owned by `public_key` on `workchain`. The same inputs
    /// always yield the same address, and the account need not exist yet.
    async fn wallet_address(
        &self,
        public_key: &PublicKey,
        workchain: i8,
    ) -> Result<Address, DeployError>;
}

/// Giver account that tops up balances.
#[async_trait]
pub trait FundingService: Send + Sync {
    /// Transfer `amount_nano` to `address`. Each call adds to the balance.
    async fn send_to(&self, address: &Address, amount_nano: u64)
    -> Result<Confirmation, DeployError>;
}

#[async_trait]
pub trait ContractDeployer: Send + Sync {
    /// Deploy a contract and return the address the network assigned to it.
    async fn deploy(&self, spec: DeploymentSpec) -> Result<DeployedContract, DeployError>;
}

#[async_trait]
pub trait ContractInvoker: Send + Sync {
    /// Send `call` as an internal message from `options.from`.
    async fn send(&self, call: ContractCall, options: SendOptions)
    -> Result<Confirmation, DeployError>;
}

/// Read-only account queries.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Whether an active contract exists at `address`.
    async fn is_deployed(&self, address: &Address) -> Result<bool, DeployError>;

    /// Current owner of an ownership-capable resource of the given template.
    async fn owner_of(&self, resource: &Address, template: &str)
    -> Result<Option<Address>, DeployError>;
}

/// Everything a session needs from the network.
pub trait Network:
    AddressDeriver + FundingService + ContractDeployer + ContractInvoker + ChainReader
{
}

impl<T> Network for T where
    T: AddressDeriver + FundingService + ContractDeployer + ContractInvoker + ChainReader
{
}
