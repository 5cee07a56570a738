//! In-memory network used by tests and local rehearsals of the flows.
//!
//! Balances, deployed contracts and their owners live in a single locked
//! state. `transferOwnership` is enforced the way an ownership-capable token
//! root enforces it: only the current owner may call it, and the message must
//! carry enough value to cover fees.
//!
//! Addresses follow the local models in [`crate::address`], not on-chain
//! StateInit hashing.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::address::{
    Address, BASE_WORKCHAIN, derive_contract_address, derive_wallet_address,
};
use crate::error::DeployError;
use crate::keystore::PublicKey;
use crate::network::{
    AddressDeriver, ChainReader, Confirmation, ContractCall, ContractDeployer, ContractInvoker, DeployedContract,
    DeploymentSpec, FundingService, SendOptions,
};
use crate::templates::TRANSFER_OWNERSHIP;
use crate::units::from_nano;

/// Smallest value a deployment may carry.
pub const MIN_DEPLOY_VALUE: u64 = 100_000_000;

/// Smallest value `transferOwnership` accepts.
pub const MIN_TRANSFER_VALUE: u64 = 500_000_000;

/// Fee kept by the network for each accepted message; the rest of the
/// attached value goes to `remainingGasTo`.
pub const MESSAGE_FEE: u64 = 50_000_000;

/// A contract living on the mock network.
#[derive(Debug, Clone, PartialEq)]
pub struct MockContract {
    pub template: String,
    pub owner: Option<Address>,
    pub init_params: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Default)]
struct MockState {
    balances: HashMap<Address, u64>,
    contracts: HashMap<Address, MockContract>,
    funding_calls: Vec<(Address, u64)>,
    deployments: Vec<DeployedContract>,
    sent: Vec<(ContractCall, SendOptions)>,
    fail_funding: Option<String>,
    fail_next_derive: Option<String>,
    fail_next_deploy: Option<String>,
    fail_next_send: Option<String>,
    call_count: usize,
    tx_seq: u64,
}

impl MockState {
    fn next_tx(&mut self) -> String {
        self.tx_seq += 1;
        format!("mock-tx-{:04}", self.tx_seq)
    }

    fn credit(&mut self, address: Address, amount: u64) {
        let balance = self.balances.entry(address).or_default();
        *balance = balance.saturating_add(amount);
    }
}

#[derive(Debug, Default)]
pub struct MockNetwork {
    state: Mutex<MockState>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an existing contract on the network.
    pub fn install_contract(&self, address: Address, template: &str, owner: Option<Address>) {
        self.state.lock().contracts.insert(
            address,
            MockContract {
                template: template.to_string(),
                owner,
                init_params: BTreeMap::new(),
            },
        );
    }

    /// Add balance without going through the giver.
    pub fn credit(&self, address: Address, amount_nano: u64) {
        self.state.lock().credit(address, amount_nano);
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.state.lock().balances.get(address).copied().unwrap_or(0)
    }

    pub fn contract(&self, address: &Address) -> Option<MockContract> {
        self.state.lock().contracts.get(address).cloned()
    }

    /// Every accepted giver transfer, in order.
    pub fn funding_calls(&self) -> Vec<(Address, u64)> {
        self.state.lock().funding_calls.clone()
    }

    pub fn deployments(&self) -> Vec<DeployedContract> {
        self.state.lock().deployments.clone()
    }

    /// Every accepted message, in order.
    pub fn sent_calls(&self) -> Vec<(ContractCall, SendOptions)> {
        self.state.lock().sent.clone()
    }

    /// Number of state-touching calls received, accepted or not. Address
    /// derivation reads no state and is not counted.
    pub fn call_count(&self) -> usize {
        self.state.lock().call_count
    }

    /// Make the giver reject every transfer until [`Self::restore_funding`].
    pub fn fail_funding(&self, reason: &str) {
        self.state.lock().fail_funding = Some(reason.to_string());
    }

    pub fn restore_funding(&self) {
        self.state.lock().fail_funding = None;
    }

    pub fn fail_next_derive(&self, reason: &str) {
        self.state.lock().fail_next_derive = Some(reason.to_string());
    }

    pub fn fail_next_deploy(&self, reason: &str) {
        self.state.lock().fail_next_deploy = Some(reason.to_string());
    }

    pub fn fail_next_send(&self, reason: &str) {
        self.state.lock().fail_next_send = Some(reason.to_string());
    }
}

#[async_trait]
impl AddressDeriver for MockNetwork {
    async fn wallet_address(
        &self,
        public_key: &PublicKey,
        workchain: i8,
    ) -> Result<Address, DeployError> {
        if let Some(reason) = self.state.lock().fail_next_derive.take() {
            return Err(DeployError::Query(reason));
        }
        Ok(derive_wallet_address(public_key, workchain))
    }
}

#[async_trait]
impl FundingService for MockNetwork {
    async fn send_to(
        &self,
        address: &Address,
        amount_nano: u64,
    ) -> Result<Confirmation, DeployError> {
        let mut state = self.state.lock();
        state.call_count += 1;
        if let Some(reason) = &state.fail_funding {
            return Err(DeployError::Funding(reason.clone()));
        }

        state.funding_calls.push((*address, amount_nano));
        state.credit(*address, amount_nano);
        debug!(address = %address, amount_nano, "mock giver transfer");
        Ok(Confirmation {
            tx_id: state.next_tx(),
        })
    }
}

#[async_trait]
impl ContractDeployer for MockNetwork {
    async fn deploy(&self, spec: DeploymentSpec) -> Result<DeployedContract, DeployError> {
        let mut state = self.state.lock();
        state.call_count += 1;
        if let Some(reason) = state.fail_next_deploy.take() {
            return Err(DeployError::Deployment(reason));
        }
        if spec.funding_amount < MIN_DEPLOY_VALUE {
            return Err(DeployError::Deployment(format!(
                "insufficient value: {} tokens attached, {} required",
                from_nano(spec.funding_amount),
                from_nano(MIN_DEPLOY_VALUE)
            )));
        }

        let address = derive_contract_address(
            &spec.contract_template,
            &spec.deployer_key.public_key,
            &spec.init_params,
            BASE_WORKCHAIN,
        );
        if state.contracts.contains_key(&address) {
            return Err(DeployError::Deployment(format!(
                "contract already exists at {address}"
            )));
        }

        state.contracts.insert(
            address,
            MockContract {
                template: spec.contract_template.clone(),
                owner: None,
                init_params: spec.init_params,
            },
        );
        state.credit(address, spec.funding_amount);

        let deployed = DeployedContract {
            address,
            template: spec.contract_template,
            tx_id: state.next_tx(),
        };
        state.deployments.push(deployed.clone());
        debug!(address = %address, template = %deployed.template, "mock deployment");
        Ok(deployed)
    }
}

fn address_param(call: &ContractCall, name: &str) -> Result<Address, DeployError> {
    serde_json::from_value(call.params[name].clone())
        .map_err(|e| DeployError::Invocation(format!("bad `{name}` argument: {e}")))
}

#[async_trait]
impl ContractInvoker for MockNetwork {
    async fn send(
        &self,
        call: ContractCall,
        options: SendOptions,
    ) -> Result<Confirmation, DeployError> {
        let mut state = self.state.lock();
        state.call_count += 1;
        if let Some(reason) = state.fail_next_send.take() {
            return Err(DeployError::Invocation(reason));
        }

        let balance = state.balances.get(&options.from).copied().unwrap_or(0);
        if balance < options.amount_nano {
            return Err(DeployError::Invocation(format!(
                "sender {} holds {} tokens, {} needed",
                options.from,
                from_nano(balance),
                from_nano(options.amount_nano)
            )));
        }

        let current_owner = match state.contracts.get(&call.address) {
            Some(contract) => contract.owner,
            None => {
                return Err(DeployError::Invocation(format!(
                    "account {} does not exist",
                    call.address
                )));
            }
        };
        if call.method != TRANSFER_OWNERSHIP {
            return Err(DeployError::Invocation(format!(
                "method `{}` is not supported by {}",
                call.method, call.address
            )));
        }
        if current_owner != Some(options.from) {
            return Err(DeployError::Invocation(format!(
                "caller {} is not the owner of {}",
                options.from, call.address
            )));
        }
        if options.amount_nano < MIN_TRANSFER_VALUE {
            return Err(DeployError::Invocation(format!(
                "insufficient attached value: {} tokens, {} required",
                from_nano(options.amount_nano),
                from_nano(MIN_TRANSFER_VALUE)
            )));
        }

        let new_owner = address_param(&call, "newOwner")?;
        let refund_to = address_param(&call, "remainingGasTo")?;

        if let Some(balance) = state.balances.get_mut(&options.from) {
            *balance -= options.amount_nano;
        }
        if let Some(contract) = state.contracts.get_mut(&call.address) {
            contract.owner = Some(new_owner);
        }
        state.credit(refund_to, options.amount_nano.saturating_sub(MESSAGE_FEE));
        debug!(resource = %call.address, owner = %new_owner, "mock ownership transfer");

        state.sent.push((call, options));
        Ok(Confirmation {
            tx_id: state.next_tx(),
        })
    }
}

#[async_trait]
impl ChainReader for MockNetwork {
    async fn is_deployed(&self, address: &Address) -> Result<bool, DeployError> {
        let mut state = self.state.lock();
        state.call_count += 1;
        Ok(state.contracts.contains_key(address))
    }

    async fn owner_of(
        &self,
        resource: &Address,
        _template: &str,
    ) -> Result<Option<Address>, DeployError> {
        let mut state = self.state.lock();
        state.call_count += 1;
        state
            .contracts
            .get(resource)
            .map(|c| c.owner)
            .ok_or_else(|| DeployError::Query(format!("account {resource} does not exist")))
    }
}
