use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::{Address, U256, utils::parse_ether};
use anyhow::{Context, Result};

/// Deployed chat contract.
pub const DEFAULT_CONTRACT: &str = "0xf0961d0DFc53595A30cE7E1CDA4E70409C736f18";
pub const DEFAULT_RPC_URL: &str = "https://rpc.monad.fastlane.xyz";
/// Chain the contract lives on. Writes against any other network are refused.
pub const DEFAULT_CHAIN_ID: u64 = 143;

const DEFAULT_SESSION_KEY_PATH: &str = "parley-session.key";
const DEFAULT_POLL_SECS: u64 = 5;
/// Public RPC endpoints cap `eth_getLogs` ranges, so polling stays inside a
/// short trailing window of blocks.
const DEFAULT_BLOCK_WINDOW: u64 = 100;
/// Native tokens attached to registration to pre-fund the session address.
const DEFAULT_FUND_AMOUNT: &str = "0.05";
/// Fixed gas ceiling; public endpoints routinely fail estimation for
/// contract writes, so every write carries this override.
const DEFAULT_GAS_LIMIT: u64 = 500_000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Endpoint for read calls and session-signed writes. Editable at
    /// runtime via the `rpc` command.
    pub rpc_url: String,
    pub contract: Address,
    pub chain_id: u64,
    /// Single file slot holding the session private key as hex.
    pub session_key_path: PathBuf,
    pub poll_interval: Duration,
    pub block_window: u64,
    pub fund_amount: U256,
    pub gas_limit: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let rpc_url = std::env::var("PARLEY_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.into());

        let contract = std::env::var("PARLEY_CONTRACT")
            .unwrap_or_else(|_| DEFAULT_CONTRACT.into())
            .parse()
            .context("PARLEY_CONTRACT is not a valid address")?;

        let chain_id = match std::env::var("PARLEY_CHAIN_ID") {
            Ok(raw) => raw.parse().context("PARLEY_CHAIN_ID is not a number")?,
            Err(_) => DEFAULT_CHAIN_ID,
        };

        let session_key_path = PathBuf::from(
            std::env::var("PARLEY_SESSION_KEY").unwrap_or_else(|_| DEFAULT_SESSION_KEY_PATH.into()),
        );

        let poll_secs = match std::env::var("PARLEY_POLL_SECS") {
            Ok(raw) => raw.parse().context("PARLEY_POLL_SECS is not a number")?,
            Err(_) => DEFAULT_POLL_SECS,
        };

        let block_window = match std::env::var("PARLEY_BLOCK_WINDOW") {
            Ok(raw) => raw.parse().context("PARLEY_BLOCK_WINDOW is not a number")?,
            Err(_) => DEFAULT_BLOCK_WINDOW,
        };

        let fund_amount = parse_ether(
            &std::env::var("PARLEY_FUND_AMOUNT").unwrap_or_else(|_| DEFAULT_FUND_AMOUNT.into()),
        )
        .context("PARLEY_FUND_AMOUNT is not a valid token amount")?;

        Ok(Self {
            rpc_url,
            contract,
            chain_id,
            session_key_path,
            poll_interval: Duration::from_secs(poll_secs),
            block_window,
            fund_amount,
            gas_limit: DEFAULT_GAS_LIMIT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_contract_is_a_valid_address() {
        let addr: Address = DEFAULT_CONTRACT.parse().unwrap();
        assert_ne!(addr, Address::ZERO);
    }

    #[test]
    fn default_fund_amount_parses() {
        let amount = parse_ether(DEFAULT_FUND_AMOUNT).unwrap();
        assert_eq!(amount, U256::from(50_000_000_000_000_000u64));
    }
}
