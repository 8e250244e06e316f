use alloy::primitives::{Address, B256};
use tracing::debug;

use parley_crypto::ecies::{self, Ciphertext};
use parley_types::ChatEntry;

/// A `MessageSent` event before decryption, paired with its position in
/// the chain.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub from: Address,
    pub to: Address,
    pub encrypted_content: String,
    pub timestamp: u64,
    pub block_number: u64,
    pub tx_hash: B256,
}

/// Turn a poll cycle's worth of raw events into chat entries, ordered by
/// block number. Anything that fails to parse or decrypt is dropped:
/// payloads sealed for someone else's session are expected here, since the
/// outbound filter returns messages this session encrypted *to* others.
pub fn decode_inbox(mut raw: Vec<RawMessage>, secret: &[u8; 32]) -> Vec<ChatEntry> {
    raw.sort_by_key(|m| m.block_number);
    raw.into_iter()
        .filter_map(|m| match decode_one(&m, secret) {
            Some(entry) => Some(entry),
            None => {
                debug!("dropping undecryptable payload in {}", m.tx_hash);
                None
            }
        })
        .collect()
}

fn decode_one(raw: &RawMessage, secret: &[u8; 32]) -> Option<ChatEntry> {
    let sealed = Ciphertext::from_hex(&raw.encrypted_content).ok()?;
    let plain = ecies::decrypt(secret, &sealed).ok()?;
    let text = String::from_utf8(plain).ok()?;
    Some(ChatEntry {
        from: raw.from,
        text,
        timestamp: raw.timestamp,
        id: raw.tx_hash,
    })
}
