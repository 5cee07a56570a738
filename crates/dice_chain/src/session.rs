use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::address::{Address, BASE_WORKCHAIN};
use crate::error::DeployError;
use crate::keystore::{KeyMaterial, KeyProvider};
use crate::network::{
    AddressDeriver, Confirmation, ContractCall, ContractInvoker, Network, SendOptions,
};

/// Addresses allowed to act as message senders within this process.
///
/// Registration is a local capability grant; nothing is written on-chain.
#[derive(Debug, Default)]
pub struct AccountRegistry {
    accounts: RwLock<HashSet<Address>>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `address` as a sender. Returns `false` if it already was one.
    pub fn add_account(&self, address: Address) -> bool {
        let added = self.accounts.write().insert(address);
        if added {
            info!(address = %address, "account registered as sender");
        }
        added
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.accounts.read().contains(address)
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

/// Explicit context handed to each flow: key store, network client and the
/// local account registry.
pub struct Session {
    keys: Arc<dyn KeyProvider>,
    network: Arc<dyn Network>,
    accounts: AccountRegistry,
    workchain: i8,
}

impl Session {
    pub fn new(keys: Arc<dyn KeyProvider>, network: Arc<dyn Network>) -> Self {
        Self {
            keys,
            network,
            accounts: AccountRegistry::new(),
            workchain: BASE_WORKCHAIN,
        }
    }

    /// Use a workchain other than the base one for derived wallets.
    pub fn with_workchain(mut self, workchain: i8) -> Self {
        self.workchain = workchain;
        self
    }

    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    pub fn network(&self) -> &dyn Network {
        self.network.as_ref()
    }

    pub fn accounts(&self) -> &AccountRegistry {
        &self.accounts
    }

    /// Resolve a signer, failing with [`DeployError::KeyNotFound`].
    pub fn signer(&self, signer_id: &str) -> Result<KeyMaterial, DeployError> {
        self.keys
            .get_signer(signer_id)
            .ok_or_else(|| DeployError::KeyNotFound(signer_id.to_string()))
    }

    /// The wallet address owned by `key` on this session's workchain, as the
    /// network computes it.
    pub async fn wallet_address(&self, key: &KeyMaterial) -> Result<Address, DeployError> {
        self.network
            .wallet_address(&key.public_key, self.workchain)
            .await
    }

    /// Send `call` from a registered account.
    pub async fn send_from(
        &self,
        call: ContractCall,
        options: SendOptions,
    ) -> Result<Confirmation, DeployError> {
        if !self.accounts.contains(&options.from) {
            return Err(DeployError::Invocation(format!(
                "sender {} is not a registered account",
                options.from
            )));
        }
        debug!(
            from = %options.from,
            to = %call.address,
            method = %call.method,
            amount_nano = options.amount_nano,
            "sending message"
        );
        self.network.send(call, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::KeyStore;
    use crate::mock::MockNetwork;

    const KEY: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    fn session() -> (Session, Arc<MockNetwork>) {
        let mut keys = KeyStore::new();
        keys.add_signer("0", KEY.parse().unwrap()).unwrap();
        let network = Arc::new(MockNetwork::new());
        (Session::new(Arc::new(keys), network.clone()), network)
    }

    #[test]
    fn registry_add_is_idempotent() {
        let registry = AccountRegistry::new();
        let address = Address::new(0, [7; 32]);
        assert!(registry.add_account(address));
        assert!(!registry.add_account(address));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&address));
    }

    #[test]
    fn signer_lookup_failure_is_key_not_found() {
        let (session, _) = session();
        let err = session.signer("missing").unwrap_err();
        assert!(matches!(err, DeployError::KeyNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn wallet_address_follows_workchain() {
        let (session, _) = session();
        let key = session.signer("0").unwrap();
        let base = session.wallet_address(&key).await.unwrap();
        assert_eq!(base.workchain(), 0);

        let session = session.with_workchain(-1);
        let master = session.wallet_address(&key).await.unwrap();
        assert_eq!(master.workchain(), -1);
        assert_eq!(master.account(), base.account());
    }

    #[tokio::test]
    async fn wallet_address_comes_from_the_network() {
        let (session, network) = session();
        let key = session.signer("0").unwrap();
        network.fail_next_derive("gateway offline");

        let err = session.wallet_address(&key).await.unwrap_err();
        assert!(matches!(err, DeployError::Query(_)));
    }

    #[tokio::test]
    async fn send_from_unregistered_account_is_refused() {
        let (session, network) = session();
        let call = ContractCall {
            address: Address::new(0, [1; 32]),
            template: "TokenRootUpgradeable".into(),
            method: "transferOwnership".into(),
            params: serde_json::json!({}),
        };
        let options = SendOptions {
            from: Address::new(0, [2; 32]),
            amount_nano: 1,
        };

        let err = session.send_from(call, options).await.unwrap_err();
        assert!(matches!(err, DeployError::Invocation(_)));
        assert!(network.sent_calls().is_empty());
    }
}
