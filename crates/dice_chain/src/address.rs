//! Account addresses, plus the local addressing model of the mock network.
//!
//! An address is a workchain id plus a 32-byte account id, rendered as
//! `<workchain>:<64 hex chars>`. On-chain account ids are StateInit
//! representation hashes, which only the toolkit computes; see
//! [`crate::network::AddressDeriver`]. The derivations below are sha256
//! stand-ins with the same determinism, used by [`crate::mock::MockNetwork`].
//! They are not on-chain addresses and must never be funded.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::DeployError;
use crate::keystore::PublicKey;
use crate::templates::EVER_WALLET_CODE_HASH;

/// Workchain that holds user wallets and application contracts.
pub const BASE_WORKCHAIN: i8 = 0;

const ACCOUNT_ID_LEN: usize = 32;

/// A blockchain account address scoped to a workchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    workchain: i8,
    account: [u8; ACCOUNT_ID_LEN],
}

impl Address {
    pub fn new(workchain: i8, account: [u8; ACCOUNT_ID_LEN]) -> Self {
        Self { workchain, account }
    }

    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    pub fn account(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.account
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.account))
    }
}

impl FromStr for Address {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (wc, account_hex) = s
            .split_once(':')
            .ok_or_else(|| DeployError::invalid_address(s, "missing `:` separator"))?;

        let workchain: i8 = wc
            .parse()
            .map_err(|_| DeployError::invalid_address(s, format!("bad workchain `{wc}`")))?;

        if account_hex.len() != ACCOUNT_ID_LEN * 2 {
            return Err(DeployError::invalid_address(
                s,
                format!(
                    "expected {} hex chars, got {}",
                    ACCOUNT_ID_LEN * 2,
                    account_hex.len()
                ),
            ));
        }

        let mut account = [0u8; ACCOUNT_ID_LEN];
        hex::decode_to_slice(account_hex, &mut account)
            .map_err(|e| DeployError::invalid_address(s, format!("hex decode failed: {e}")))?;

        Ok(Self { workchain, account })
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Local model of the wallet address owned by `public_key` on `workchain`.
///
/// Pure: the same key and workchain always yield the same address. This is
/// not the EverWallet StateInit hash.
pub fn derive_wallet_address(public_key: &PublicKey, workchain: i8) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(EVER_WALLET_CODE_HASH);
    hasher.update(public_key.as_bytes());
    // Wallet data also carries a zero deployment timestamp.
    hasher.update(0u64.to_be_bytes());
    Address::new(workchain, hasher.finalize().into())
}

/// Local model of the address a contract deployment lands on, given its
/// template, deployer key and static init params.
///
/// Init params are hashed in key order, so identical params always map to
/// the same address.
pub fn derive_contract_address(
    template: &str,
    public_key: &PublicKey,
    init_params: &BTreeMap<String, serde_json::Value>,
    workchain: i8,
) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(template.as_bytes());
    hasher.update([0u8]);
    hasher.update(public_key.as_bytes());
    for (name, value) in init_params {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.to_string().as_bytes());
        hasher.update([0u8]);
    }
    Address::new(workchain, hasher.finalize().into())
}
