use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use anyhow::{Result, anyhow};
use hkdf::Hkdf;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey, ecdh};
use sha2::Sha256;

const HKDF_INFO: &[u8] = b"parley-ecies-v1";
const EPHEMERAL_LEN: usize = 33;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// A sealed message payload: compressed ephemeral public key, AEAD nonce,
/// and the AES-256-GCM output (ciphertext plus tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    pub ephemeral_pub: [u8; EPHEMERAL_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub data: Vec<u8>,
}

impl Ciphertext {
    /// Serialize for event-log storage: ephemeral key, nonce, and AEAD
    /// output concatenated and hex encoded.
    pub fn to_hex(&self) -> String {
        let mut out = Vec::with_capacity(EPHEMERAL_LEN + NONCE_LEN + self.data.len());
        out.extend_from_slice(&self.ephemeral_pub);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.data);
        hex::encode(out)
    }

    pub fn from_hex(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded.trim())?;
        if bytes.len() < EPHEMERAL_LEN + NONCE_LEN + TAG_LEN {
            return Err(anyhow!("ciphertext too short"));
        }
        let mut ephemeral_pub = [0u8; EPHEMERAL_LEN];
        ephemeral_pub.copy_from_slice(&bytes[..EPHEMERAL_LEN]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[EPHEMERAL_LEN..EPHEMERAL_LEN + NONCE_LEN]);
        Ok(Self {
            ephemeral_pub,
            nonce,
            data: bytes[EPHEMERAL_LEN + NONCE_LEN..].to_vec(),
        })
    }
}

/// Seal a plaintext to a recipient's registered public key (SEC1 hex).
/// A fresh ephemeral key is drawn per message, so identical plaintexts
/// never produce identical ciphertexts.
pub fn encrypt(recipient_pub_hex: &str, plaintext: &[u8]) -> Result<Ciphertext> {
    let recipient_bytes = hex::decode(recipient_pub_hex.trim())
        .map_err(|_| anyhow!("recipient key is not valid hex"))?;
    let recipient = PublicKey::from_sec1_bytes(&recipient_bytes)
        .map_err(|_| anyhow!("recipient key is not a valid secp256k1 point"))?;

    let ephemeral = ecdh::EphemeralSecret::random(&mut OsRng);
    let ephemeral_pub: [u8; EPHEMERAL_LEN] = ephemeral
        .public_key()
        .to_encoded_point(true)
        .as_bytes()
        .try_into()
        .map_err(|_| anyhow!("unexpected ephemeral key encoding"))?;

    let shared = ephemeral.diffie_hellman(&recipient);
    let key = derive_aead_key(shared.raw_secret_bytes().as_slice())?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let data = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| anyhow!("encryption failed: {}", e))?;

    Ok(Ciphertext {
        ephemeral_pub,
        nonce,
        data,
    })
}

/// Open a sealed payload with the session secret. Any mismatch — wrong
/// key, tampered data, malformed ephemeral point — is an error, never a
/// wrong plaintext.
pub fn decrypt(secret: &[u8; 32], sealed: &Ciphertext) -> Result<Vec<u8>> {
    let secret = SecretKey::from_slice(secret).map_err(|_| anyhow!("invalid secret key"))?;
    let ephemeral = PublicKey::from_sec1_bytes(&sealed.ephemeral_pub)
        .map_err(|_| anyhow!("invalid ephemeral key"))?;

    let shared = ecdh::diffie_hellman(secret.to_nonzero_scalar(), ephemeral.as_affine());
    let key = derive_aead_key(shared.raw_secret_bytes().as_slice())?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    cipher
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.data.as_slice())
        .map_err(|e| anyhow!("decryption failed: {}", e))
}

fn derive_aead_key(shared: &[u8]) -> Result<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(None, shared);
    let mut key = [0u8; 32];
    hk.expand(HKDF_INFO, &mut key)
        .map_err(|_| anyhow!("HKDF expand failed"))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_session_key, public_key_hex};

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let secret = generate_session_key();
        let pub_hex = public_key_hex(&secret).unwrap();

        let sealed = encrypt(&pub_hex, b"hello").unwrap();
        assert_ne!(sealed.data.as_slice(), b"hello");

        let plain = decrypt(&secret, &sealed).unwrap();
        assert_eq!(plain, b"hello");
    }

    #[test]
    fn wrong_key_fails() {
        let recipient = generate_session_key();
        let eavesdropper = generate_session_key();
        let pub_hex = public_key_hex(&recipient).unwrap();

        let sealed = encrypt(&pub_hex, b"secret message").unwrap();
        assert!(decrypt(&eavesdropper, &sealed).is_err());
    }

    #[test]
    fn identical_plaintexts_seal_differently() {
        let secret = generate_session_key();
        let pub_hex = public_key_hex(&secret).unwrap();

        let a = encrypt(&pub_hex, b"same").unwrap();
        let b = encrypt(&pub_hex, b"same").unwrap();
        assert_ne!(a.to_hex(), b.to_hex());
    }

    #[test]
    fn hex_roundtrip() {
        let secret = generate_session_key();
        let pub_hex = public_key_hex(&secret).unwrap();

        let sealed = encrypt(&pub_hex, b"over the wire").unwrap();
        let parsed = Ciphertext::from_hex(&sealed.to_hex()).unwrap();
        assert_eq!(parsed, sealed);
        assert_eq!(decrypt(&secret, &parsed).unwrap(), b"over the wire");
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let secret = generate_session_key();
        let pub_hex = public_key_hex(&secret).unwrap();

        let mut sealed = encrypt(&pub_hex, b"hold still").unwrap();
        let last = sealed.data.len() - 1;
        sealed.data[last] ^= 0x01;
        assert!(decrypt(&secret, &sealed).is_err());
    }

    #[test]
    fn malformed_wire_input_is_rejected() {
        assert!(Ciphertext::from_hex("zzzz").is_err());
        assert!(Ciphertext::from_hex("").is_err());
        // Valid hex, but shorter than key + nonce + tag.
        assert!(Ciphertext::from_hex(&"ab".repeat(40)).is_err());
    }

    #[test]
    fn bad_recipient_key_is_rejected() {
        assert!(encrypt("not hex", b"x").is_err());
        // Valid hex that is not a curve point.
        assert!(encrypt(&"00".repeat(65), b"x").is_err());
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let secret = generate_session_key();
        let pub_hex = public_key_hex(&secret).unwrap();

        let sealed = encrypt(&pub_hex, b"").unwrap();
        assert_eq!(decrypt(&secret, &sealed).unwrap(), b"");
    }
}
