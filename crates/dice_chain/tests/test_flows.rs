use std::sync::Arc;

use dice_chain::templates::{ANY_OWNER, TOKEN_ROOT_UPGRADEABLE};
use dice_chain::*;

const SIGNER_KEY: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";
const SIGNER_WALLET: &str = "0:5624b04ea61065c8a72a49fdc3996ec4ce9e8a77c7174d3ad59032506b1bc4bc";
const TOKEN_ROOT: &str = "0:000ffdc692d7fa68534bab03e62e13fc2fb7b2be8aff1da94fdbf580290eb952";

fn key_store() -> KeyStore {
    let mut keys = KeyStore::new();
    keys.add_signer("0", SIGNER_KEY.parse().unwrap()).unwrap();
    keys
}

fn session_with(network: Arc<MockNetwork>) -> Arc<Session> {
    Arc::new(Session::new(Arc::new(key_store()), network))
}

fn token_root() -> Address {
    TOKEN_ROOT.parse().unwrap()
}

#[tokio::test]
async fn provision_signer_zero_yields_fixed_address_funded_once() {
    let network = Arc::new(MockNetwork::new());
    let session = session_with(network.clone());

    let address = WalletProvisioner::new(session).provision("0").await.unwrap();

    assert_eq!(address.to_string(), SIGNER_WALLET);
    assert_eq!(network.funding_calls(), vec![(address, 10_000_000_000)]);
}

#[tokio::test]
async fn provision_twice_same_address_cumulative_balance() {
    let network = Arc::new(MockNetwork::new());
    let provisioner = WalletProvisioner::new(session_with(network.clone()));

    let first = provisioner.provision("0").await.unwrap();
    let second = provisioner.provision("0").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(network.funding_calls().len(), 2);
    assert_eq!(network.balance(&first), 20_000_000_000);
}

#[tokio::test]
async fn provision_then_transfer_moves_ownership() {
    let network = Arc::new(MockNetwork::new());
    let session = session_with(network.clone());
    let resource = token_root();

    let wallet = WalletProvisioner::new(session.clone())
        .provision("0")
        .await
        .unwrap();
    network.install_contract(resource, TOKEN_ROOT_UPGRADEABLE, Some(wallet));

    let flow = OwnershipTransferor::new(session);
    let owner = flow
        .transfer_ownership("0", &resource, ANY_OWNER)
        .await
        .unwrap();

    let current = network
        .owner_of(&resource, TOKEN_ROOT_UPGRADEABLE)
        .await
        .unwrap();
    assert_eq!(current, Some(owner));
    assert_ne!(current, Some(wallet));
    assert!(flow.verify_owner(&resource, &owner).await.unwrap());
}

#[tokio::test]
async fn transfer_flow_reuses_provisioned_wallet_without_refunding() {
    let network = Arc::new(MockNetwork::new());
    let session = session_with(network.clone());
    let resource = token_root();

    let wallet = WalletProvisioner::new(session.clone())
        .provision("0")
        .await
        .unwrap();
    network.install_contract(resource, TOKEN_ROOT_UPGRADEABLE, Some(wallet));

    OwnershipTransferor::new(session.clone())
        .transfer_ownership("0", &resource, ANY_OWNER)
        .await
        .unwrap();

    assert_eq!(network.funding_calls().len(), 1);
    let (_, options) = &network.sent_calls()[0];
    assert_eq!(options.from, wallet);
}

#[tokio::test]
async fn missing_key_fails_both_flows_without_side_effects() {
    let network = Arc::new(MockNetwork::new());
    let session = session_with(network.clone());

    let err = WalletProvisioner::new(session.clone())
        .provision("missing")
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::KeyNotFound(_)));

    let aborted = OwnershipTransferor::new(session)
        .transfer_ownership("missing", &token_root(), ANY_OWNER)
        .await
        .unwrap_err();
    assert!(matches!(aborted.source, DeployError::KeyNotFound(_)));
    assert_eq!(aborted.last_completed, TransferStage::Start);

    assert_eq!(network.call_count(), 0);
    assert!(network.funding_calls().is_empty());
    assert!(network.deployments().is_empty());
}

#[tokio::test]
async fn failed_transfer_leaves_owner_deployed_and_resume_succeeds() {
    let network = Arc::new(MockNetwork::new());
    let session = session_with(network.clone());
    let resource = token_root();

    let wallet = WalletProvisioner::new(session.clone())
        .provision("0")
        .await
        .unwrap();
    network.install_contract(resource, TOKEN_ROOT_UPGRADEABLE, Some(wallet));
    network.fail_next_send("external message expired");

    let flow = OwnershipTransferor::new(session);
    let aborted = flow
        .transfer_ownership("0", &resource, ANY_OWNER)
        .await
        .unwrap_err();
    assert_eq!(aborted.last_completed, TransferStage::OwnerDeployed);
    let owner = aborted.owner.unwrap();
    assert!(network.is_deployed(&owner).await.unwrap());
    assert_eq!(network.contract(&resource).unwrap().owner, Some(wallet));

    let resumed = flow.resume_transfer("0", &resource, &owner).await.unwrap();
    assert_eq!(resumed, owner);
    assert_eq!(network.deployments().len(), 1);
    assert_eq!(network.contract(&resource).unwrap().owner, Some(owner));
}

#[tokio::test]
async fn key_store_file_drives_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.json");
    key_store().save_to_file(&path).unwrap();

    let keys = KeyStore::load_from_file(&path).unwrap();
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(Session::new(Arc::new(keys), network.clone()));

    let address = WalletProvisioner::new(session).provision("0").await.unwrap();
    assert_eq!(address.to_string(), SIGNER_WALLET);
}

#[tokio::test]
async fn wallet_address_is_resolved_by_the_network() {
    let key: PublicKey = SIGNER_KEY.parse().unwrap();
    let network = Arc::new(MockNetwork::new());
    let session = session_with(network.clone());
    let material = session.signer("0").unwrap();

    let first = session.wallet_address(&material).await.unwrap();
    let second = network.wallet_address(&key, 0).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), SIGNER_WALLET);
}

#[tokio::test]
async fn unresolvable_wallet_stops_provisioning_before_funding() {
    let network = Arc::new(MockNetwork::new());
    let session = session_with(network.clone());
    network.fail_next_derive("gateway offline");

    let err = WalletProvisioner::new(session.clone())
        .provision("0")
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Query(_)));
    assert!(network.funding_calls().is_empty());

    network.fail_next_derive("gateway offline");
    let aborted = OwnershipTransferor::new(session)
        .transfer_ownership("0", &token_root(), ANY_OWNER)
        .await
        .unwrap_err();
    assert_eq!(aborted.last_completed, TransferStage::Start);
    assert!(network.deployments().is_empty());
}
