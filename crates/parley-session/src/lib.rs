use std::fs;
use std::path::PathBuf;

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use parley_crypto::keys;

/// Single file slot for the session (burner) private key, stored as hex.
/// The disk analog of a browser local-storage entry: one named slot, no
/// history, cleared by deleting the file.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Restore a previously persisted session, if any. An absent slot is
    /// `None`, not an error; a corrupt slot is an error.
    pub fn restore(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let encoded = fs::read_to_string(&self.path)
            .with_context(|| format!("reading session key from {}", self.path.display()))?;
        let secret = keys::secret_from_hex(&encoded)
            .with_context(|| format!("corrupt session key in {}", self.path.display()))?;
        let session = Session::from_secret(secret)?;
        info!("session restored: {}", session.address());
        Ok(Some(session))
    }

    /// Create a fresh session, overwriting any existing key in the slot.
    /// The previous key, and any dust left on its address, is gone.
    pub fn create(&self) -> Result<Session> {
        let secret = keys::generate_session_key();
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
            }
        }
        fs::write(&self.path, keys::secret_to_hex(&secret))
            .with_context(|| format!("writing session key to {}", self.path.display()))?;
        let session = Session::from_secret(secret)?;
        info!("session created: {}", session.address());
        Ok(session)
    }
}

/// A live session: the burner signer plus its last known native balance.
pub struct Session {
    secret: [u8; 32],
    signer: PrivateKeySigner,
    balance: U256,
}

impl Session {
    pub fn from_secret(secret: [u8; 32]) -> Result<Self> {
        let signer = PrivateKeySigner::from_slice(&secret)
            .map_err(|e| anyhow!("session key rejected by signer: {e}"))?;
        Ok(Self {
            secret,
            signer,
            balance: U256::ZERO,
        })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    pub fn secret(&self) -> &[u8; 32] {
        &self.secret
    }

    /// The SEC1 public key string registered on-chain for this session.
    pub fn public_key_hex(&self) -> Result<String> {
        keys::public_key_hex(&self.secret)
    }

    pub fn balance(&self) -> U256 {
        self.balance
    }

    /// Refresh the cached native balance. RPC failure keeps the last known
    /// value; the chat view degrades to stale data.
    pub async fn update_balance<P: Provider>(&mut self, provider: &P) {
        match provider.get_balance(self.address()).await {
            Ok(balance) => self.balance = balance,
            Err(e) => warn!("balance refresh failed: {e}"),
        }
    }

    /// Hex of the raw private key, for sweeping dust off an abandoned
    /// session. Display it, never log it.
    pub fn reveal_private_key(&self) -> String {
        keys::secret_to_hex(&self.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_slot(tag: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("parley-session-test-{tag}-{}", std::process::id()));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn restore_on_empty_slot_is_none() {
        let store = SessionStore::new(temp_slot("empty"));
        assert!(store.restore().unwrap().is_none());
    }

    #[test]
    fn create_then_restore_yields_same_address() {
        let path = temp_slot("roundtrip");
        let store = SessionStore::new(&path);

        let created = store.create().unwrap();
        let restored = store.restore().unwrap().unwrap();
        assert_eq!(created.address(), restored.address());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn create_overwrites_the_previous_session() {
        let path = temp_slot("overwrite");
        let store = SessionStore::new(&path);

        let first = store.create().unwrap();
        let second = store.create().unwrap();
        assert_ne!(first.address(), second.address());

        // The slot now holds only the second key.
        let restored = store.restore().unwrap().unwrap();
        assert_eq!(restored.address(), second.address());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn signer_derivation_is_deterministic() {
        let secret = parley_crypto::keys::generate_session_key();
        let a = Session::from_secret(secret).unwrap();
        let b = Session::from_secret(secret).unwrap();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn corrupt_slot_is_an_error() {
        let path = temp_slot("corrupt");
        fs::write(&path, "definitely not a key").unwrap();

        let store = SessionStore::new(&path);
        assert!(store.restore().is_err());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn reveal_matches_the_persisted_slot() {
        let path = temp_slot("reveal");
        let store = SessionStore::new(&path);

        let session = store.create().unwrap();
        let on_disk = fs::read_to_string(&path).unwrap();
        assert_eq!(session.reveal_private_key(), on_disk.trim());

        let _ = fs::remove_file(&path);
    }
}
