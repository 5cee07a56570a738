// Wallet provisioning + owner contract deployment flows

pub mod address;
pub mod error;
pub mod keystore;
pub mod mock;
pub mod network;
pub mod ownership;
pub mod progress;
pub mod provision;
pub mod rpc;
pub mod rpc_config;
pub mod session;
pub mod templates;
pub mod units;

// Re-export primary types for convenient access.
pub use address::{Address, derive_contract_address, derive_wallet_address};
pub use error::DeployError;
pub use keystore::{KeyMaterial, KeyProvider, KeyStore, PublicKey};
pub use mock::{MockContract, MockNetwork};
pub use network::{
    AddressDeriver, ChainReader, Confirmation, ContractCall, ContractDeployer, ContractInvoker,
    DeployedContract, DeploymentSpec, FundingService, Network, OwnershipCallback, SendOptions,
    TransferOwnershipRequest,
};
pub use ownership::{OwnershipTransferor, TransferAborted, TransferStage};
pub use progress::Progress;
pub use provision::WalletProvisioner;
pub use rpc::ToolkitClient;
pub use rpc_config::{RpcConfig, validate_url};
pub use session::{AccountRegistry, Session};
pub use units::{from_nano, to_nano};
