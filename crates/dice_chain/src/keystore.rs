use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

const PUBLIC_KEY_LEN: usize = 32;

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PublicKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).context("public key is not valid hex")?;
        let arr: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            anyhow::anyhow!("expected {PUBLIC_KEY_LEN}-byte public key, got {} bytes", v.len())
        })?;
        Ok(Self(arr))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Key material for one signer: the identifier it was looked up by and its
/// public key. Secret halves stay with the deployment toolkit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMaterial {
    #[serde(rename = "id")]
    pub signer_id: String,
    pub public_key: PublicKey,
}

/// Lookup of signers by identifier.
pub trait KeyProvider: Send + Sync {
    /// Returns the key material for `id`, or `None` if no such signer exists.
    fn get_signer(&self, id: &str) -> Option<KeyMaterial>;
}

/// On-disk layout of the key store file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct KeyStoreFile {
    signers: Vec<KeyMaterial>,
}

/// Signers indexed by id, loaded from a JSON key store file.
///
/// Each id resolves to exactly one key; a file that lists the same id twice
/// is rejected on load.
#[derive(Debug, Default)]
pub struct KeyStore {
    signers: HashMap<String, KeyMaterial>,
}

impl KeyStore {
    /// Create an empty key store.
    pub fn new() -> Self {
        Self {
            signers: HashMap::new(),
        }
    }

    /// Add a signer. Fails if the id is already taken.
    pub fn add_signer(&mut self, signer_id: impl Into<String>, public_key: PublicKey) -> Result<()> {
        let signer_id = signer_id.into();
        if self.signers.contains_key(&signer_id) {
            anyhow::bail!("signer id `{signer_id}` appears more than once");
        }
        info!(signer_id = %signer_id, "signer added to key store");
        self.signers.insert(
            signer_id.clone(),
            KeyMaterial {
                signer_id,
                public_key,
            },
        );
        Ok(())
    }

    /// Number of signers in the store.
    pub fn len(&self) -> usize {
        self.signers.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    /// Persist the key store to a JSON file, signers sorted by id.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let mut signers: Vec<KeyMaterial> = self.signers.values().cloned().collect();
        signers.sort_by(|a, b| a.signer_id.cmp(&b.signer_id));
        let json = serde_json::to_string_pretty(&KeyStoreFile { signers })
            .context("failed to serialize key store")?;
        std::fs::write(path, json).context("failed to write key store file")?;
        info!(path = %path.display(), count = self.signers.len(), "key store saved");
        Ok(())
    }

    /// Load a key store from a JSON file. Returns an empty store if the file
    /// does not exist.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "key store file not found, starting empty");
            return Ok(Self::new());
        }
        let json = std::fs::read_to_string(path).context("failed to read key store file")?;
        let file: KeyStoreFile =
            serde_json::from_str(&json).context("failed to deserialize key store")?;

        let mut store = Self::new();
        for entry in file.signers {
            store
                .add_signer(entry.signer_id, entry.public_key)
                .with_context(|| format!("invalid key store {}", path.display()))?;
        }
        info!(path = %path.display(), count = store.len(), "key store loaded");
        Ok(store)
    }
}

impl KeyProvider for KeyStore {
    fn get_signer(&self, id: &str) -> Option<KeyMaterial> {
        self.signers.get(id).cloned()
    }
}
