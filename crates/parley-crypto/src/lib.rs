/// Parley Crypto
///
/// One secp256k1 key pair backs both sides of a session: it signs the
/// session's transactions and it decrypts payloads sealed to the session's
/// registered public key. Sealing is ephemeral ECDH + HKDF-SHA256 +
/// AES-256-GCM; the serialized form is a plain hex string suitable for
/// event-log storage.
pub mod ecies;
pub mod keys;
