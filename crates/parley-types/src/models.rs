use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A decrypted message as shown in the chat view.
/// The history is rebuilt from the event log on every poll cycle;
/// `id` is the hash of the transaction that carried the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub from: Address,
    pub text: String,
    /// Seconds since the epoch, as reported by the contract.
    pub timestamp: u64,
    pub id: B256,
}

impl ChatEntry {
    pub fn sent_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.timestamp as i64, 0).unwrap_or_default()
    }
}
