//! End-to-end message flow without a chain: a sender seals a message to a
//! recipient's registered session key, the payload rides through the event
//! representation, and the recipient's inbox decode recovers it.

use alloy::primitives::{Address, B256};
use parley_chain::inbox::{RawMessage, decode_inbox};
use parley_crypto::{ecies, keys};
use parley_session::Session;

fn event(from: Address, to: Address, content: String, block: u64) -> RawMessage {
    RawMessage {
        from,
        to,
        encrypted_content: content,
        timestamp: 1_700_000_000 + block,
        block_number: block,
        tx_hash: B256::with_last_byte(block as u8),
    }
}

#[test]
fn hello_reaches_a_registered_recipient() {
    // Recipient provisions a session; its public key hex is what the
    // registration record would hold.
    let recipient = Session::from_secret(keys::generate_session_key()).unwrap();
    let registered_key = recipient.public_key_hex().unwrap();

    let sender_primary = Address::repeat_byte(0x11);

    // Sender-side: read the registration record, seal, emit.
    let sealed = ecies::encrypt(&registered_key, b"hello").unwrap().to_hex();
    let log = event(sender_primary, Address::repeat_byte(0x22), sealed, 7);

    // Recipient-side poll cycle.
    let entries = decode_inbox(vec![log], recipient.secret());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "hello");
    assert_eq!(entries[0].from, sender_primary);
}

#[test]
fn own_outbound_messages_are_unreadable_dust() {
    // A sender polling its own outbound filter sees payloads sealed for
    // the other side. They must drop, not mis-decrypt.
    let me = Session::from_secret(keys::generate_session_key()).unwrap();
    let peer = Session::from_secret(keys::generate_session_key()).unwrap();

    let to_peer = ecies::encrypt(&peer.public_key_hex().unwrap(), b"for them")
        .unwrap()
        .to_hex();
    let entries = decode_inbox(
        vec![event(Address::repeat_byte(0x11), Address::repeat_byte(0x22), to_peer, 3)],
        me.secret(),
    );
    assert!(entries.is_empty());
}

#[test]
fn session_key_doubles_as_signer_and_decryption_key() {
    let secret = keys::generate_session_key();
    let session = Session::from_secret(secret).unwrap();

    // Same scalar signs transactions and opens sealed payloads.
    let sealed = ecies::encrypt(&session.public_key_hex().unwrap(), b"both hats").unwrap();
    assert_eq!(ecies::decrypt(&secret, &sealed).unwrap(), b"both hats");
    assert_eq!(
        Session::from_secret(secret).unwrap().address(),
        session.address()
    );
}
