use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use tracing::{debug, info};

use parley_crypto::ecies;
use parley_session::Session;
use parley_types::{ChainError, ChatEntry, Config};

use crate::contract::ParleyChat;
use crate::inbox::{RawMessage, decode_inbox};

/// Registration records shorter than this are treated as absent: dangling
/// entries from an older contract deployment, not usable keys.
pub const MIN_PLAUSIBLE_KEY_LEN: usize = 10;

/// Read calls and event queries go through one long-lived provider;
/// writes build a wallet-filled provider per call so the primary and the
/// session can each sign their own traffic.
pub struct ChainGateway {
    config: Config,
    provider: DynProvider,
}

impl ChainGateway {
    pub fn connect(config: Config) -> Result<Self, ChainError> {
        let url = config
            .rpc_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid RPC URL: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self { config, provider })
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    fn signed_provider(&self, signer: &PrivateKeySigner) -> Result<DynProvider, ChainError> {
        let url = self
            .config
            .rpc_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid RPC URL: {e}")))?;
        let wallet = EthereumWallet::from(signer.clone());
        Ok(ProviderBuilder::new().wallet(wallet).connect_http(url).erased())
    }

    /// Verify the endpoint serves the required network before accepting a
    /// primary identity. There is no switching a local signer to another
    /// chain, so a mismatch is terminal until the endpoint changes.
    pub async fn connect_primary(&self, signer: &PrivateKeySigner) -> Result<Address, ChainError> {
        let found = self
            .provider
            .get_chain_id()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        if found != self.config.chain_id {
            return Err(ChainError::WrongNetwork {
                expected: self.config.chain_id,
                found,
            });
        }
        info!("primary identity connected: {}", signer.address());
        Ok(signer.address())
    }

    /// Bind the session public key to the primary identity on-chain. The
    /// primary signs; the attached value pre-funds the session address in
    /// the same transaction. Waits for confirmation.
    pub async fn register_session(
        &self,
        primary: &PrivateKeySigner,
        session: &Session,
    ) -> Result<B256, ChainError> {
        let pub_key = session
            .public_key_hex()
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        debug!(
            "registering session {} for primary {}",
            session.address(),
            primary.address()
        );

        let provider = self.signed_provider(primary)?;
        let contract = ParleyChat::new(self.config.contract, provider);

        let pending = contract
            .registerSession(pub_key, session.address())
            .value(self.config.fund_amount)
            .gas(self.config.gas_limit)
            .send()
            .await
            .map_err(|e| ChainError::classify(e, session.address()))?;

        let tx_hash = pending
            .watch()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        info!("session registered in {tx_hash}");
        Ok(tx_hash)
    }

    /// Read the registration record for an address. Empty and implausibly
    /// short records both count as unregistered.
    pub async fn session_key_of(&self, user: Address) -> Result<Option<String>, ChainError> {
        let contract = ParleyChat::new(self.config.contract, self.provider.clone());
        let key = contract
            .userSessionKeys(user)
            .call()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(normalize_registration(key))
    }

    /// Encrypt and send one message, signed by the session. The recipient
    /// lookup happens first: with no usable registration record the send
    /// aborts before anything is encrypted or written.
    pub async fn send_message(
        &self,
        session: &Session,
        to: Address,
        plaintext: &str,
    ) -> Result<B256, ChainError> {
        let recipient_key = self
            .session_key_of(to)
            .await?
            .ok_or(ChainError::NotRegistered(to))?;

        let sealed = ecies::encrypt(&recipient_key, plaintext.as_bytes())
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .to_hex();

        let provider = self.signed_provider(session.signer())?;
        let contract = ParleyChat::new(self.config.contract, provider);

        let pending = contract
            .sendMessage(to, sealed)
            .gas(self.config.gas_limit)
            .send()
            .await
            .map_err(|e| ChainError::classify(e, session.address()))?;

        let tx_hash = pending
            .watch()
            .await
            .map_err(|e| ChainError::classify(e, session.address()))?;
        info!("message sent in {tx_hash}");
        Ok(tx_hash)
    }

    /// Fetch and decrypt the chat history for a primary identity over the
    /// trailing block window: events addressed to it merged with events it
    /// sent, ordered by block number. Rebuilt from scratch each call.
    pub async fn fetch_messages(
        &self,
        me: Address,
        secret: &[u8; 32],
    ) -> Result<Vec<ChatEntry>, ChainError> {
        let latest = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        let start = latest.saturating_sub(self.config.block_window);

        let contract = ParleyChat::new(self.config.contract, self.provider.clone());

        let inbound = contract
            .MessageSent_filter()
            .topic2(me.into_word())
            .from_block(start)
            .query()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        let outbound = contract
            .MessageSent_filter()
            .topic1(me.into_word())
            .from_block(start)
            .query()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        let raw: Vec<RawMessage> = inbound
            .into_iter()
            .chain(outbound)
            .filter_map(|(event, log)| {
                Some(RawMessage {
                    from: event.from,
                    to: event.to,
                    encrypted_content: event.encryptedContent,
                    timestamp: u64::try_from(event.timestamp).unwrap_or(0),
                    block_number: log.block_number?,
                    tx_hash: log.transaction_hash?,
                })
            })
            .collect();

        Ok(decode_inbox(raw, secret))
    }
}

/// Empty string means never registered; a short fragment means a record
/// from a stale deployment. Neither can encrypt a message.
fn normalize_registration(key: String) -> Option<String> {
    if key.len() < MIN_PLAUSIBLE_KEY_LEN {
        None
    } else {
        Some(key)
    }
}
