use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use anyhow::{Result, anyhow};
use k256::SecretKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

/// Generate a random secp256k1 secret scalar for a new session.
pub fn generate_session_key() -> [u8; 32] {
    // Rejection-sample until the bytes land inside the curve order.
    loop {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        if SecretKey::from_slice(&bytes).is_ok() {
            return bytes;
        }
    }
}

/// Uncompressed SEC1 public key as hex. This is the string that goes into
/// the on-chain registration record.
pub fn public_key_hex(secret: &[u8; 32]) -> Result<String> {
    let key = SecretKey::from_slice(secret).map_err(|_| anyhow!("invalid secret key"))?;
    let point = key.public_key().to_encoded_point(false);
    Ok(hex::encode(point.as_bytes()))
}

/// Encode a secret key for the persistence slot.
pub fn secret_to_hex(secret: &[u8; 32]) -> String {
    hex::encode(secret)
}

/// Decode a persisted secret key, checking it is still a valid scalar.
pub fn secret_from_hex(encoded: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(encoded.trim().trim_start_matches("0x"))?;
    let secret: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow!("invalid secret key length"))?;
    SecretKey::from_slice(&secret).map_err(|_| anyhow!("secret key is not a valid scalar"))?;
    Ok(secret)
}
