use alloy::primitives::Address;
use thiserror::Error;

/// Failure taxonomy for every chain-facing operation. The client renders
/// each variant differently: `Cancelled` is a one-line status, not a
/// failure; `NotRegistered` and `InsufficientFunds` carry their own
/// instructions; `Rpc` surfaces the underlying reason verbatim.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("wrong network: endpoint reports chain id {found}, expected {expected}")]
    WrongNetwork { expected: u64, found: u64 },

    /// The user declined to sign. Never rendered as a failure.
    #[error("cancelled by user")]
    Cancelled,

    /// No usable registration record on the current contract. Send aborts
    /// before any encryption or write happens.
    #[error("{0} has not registered a session key on this contract")]
    NotRegistered(Address),

    #[error("session wallet is empty; send funds to {funding_address}")]
    InsufficientFunds { funding_address: Address },

    #[error("no active session; create one first")]
    NoSession,

    #[error("no primary identity connected")]
    NoPrimary,

    #[error("{0}")]
    Rpc(String),
}

impl ChainError {
    /// Map a raw provider/signer error into the taxonomy. Endpoints and
    /// signers differ in how they spell rejection and balance shortfalls,
    /// so classification goes by the reason text.
    pub fn classify(err: impl std::fmt::Display, session: Address) -> Self {
        let msg = err.to_string();
        let lower = msg.to_lowercase();
        if lower.contains("rejected") || lower.contains("denied") {
            ChainError::Cancelled
        } else if lower.contains("insufficient funds") || lower.contains("insufficient balance") {
            ChainError::InsufficientFunds {
                funding_address: session,
            }
        } else {
            ChainError::Rpc(msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Address {
        "0x00000000000000000000000000000000000000aa".parse().unwrap()
    }

    #[test]
    fn rejection_maps_to_cancelled() {
        let err = ChainError::classify("transaction rejected by signer", session());
        assert!(matches!(err, ChainError::Cancelled));
    }

    #[test]
    fn empty_wallet_names_the_funding_address() {
        let err = ChainError::classify(
            "server returned an error response: insufficient funds for gas * price + value",
            session(),
        );
        match err {
            ChainError::InsufficientFunds { funding_address } => {
                assert_eq!(funding_address, session());
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[test]
    fn everything_else_keeps_the_reason() {
        let err = ChainError::classify("nonce too low", session());
        match err {
            ChainError::Rpc(msg) => assert_eq!(msg, "nonce too low"),
            other => panic!("expected Rpc, got {other:?}"),
        }
    }
}
