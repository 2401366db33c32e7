use hmac::{Hmac, Mac};
use num_bigint::BigUint;
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::cipher::CbcContext;
use crate::dh::DhKeypair;
use crate::error::KeyError;

type HmacSha512 = Hmac<Sha512>;

fn derive_key_iv(hash: &[u8; 32]) -> ([u8; 32], [u8; 16]) {
    let mut iv = [0u8; 16];
    iv.copy_from_slice(&hash[16..32]);
    (*hash, iv)
}

/// Per-connection cryptographic state: a Diffie-Hellman keypair, the two
/// layered AES-256-CBC cipher contexts derived from it and from an
/// SRP session key, and HMAC generate/verify helpers used during login.
pub struct KeyHandler {
    keypair: DhKeypair,
    personal: Option<CbcContext>,
    counter: Option<CbcContext>,
    counter_key_set: bool,
}

impl Default for KeyHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyHandler {
    pub fn new() -> Self {
        KeyHandler {
            keypair: DhKeypair::generate(),
            personal: None,
            counter: None,
            counter_key_set: false,
        }
    }

    pub fn public_key(&self) -> &BigUint {
        self.keypair.public_key()
    }

    /// Installs the peer's DH public value, deriving the personal cipher.
    /// May only be called once.
    pub fn set_counter_key(&mut self, counter_key: &BigUint) -> Result<(), KeyError> {
        if self.counter_key_set {
            return Err(KeyError::AlreadySet);
        }
        let shared = self.keypair.shared_secret_bytes(counter_key);
        let hash: [u8; 32] = Sha256::digest(&shared).into();
        let (key, iv) = derive_key_iv(&hash);
        self.personal = Some(CbcContext::new(key, iv));
        self.counter_key_set = true;
        Ok(())
    }

    /// Installs the SRP-derived session key as the outer (counter) cipher.
    /// May only be called once.
    pub fn set_counter_cipher(&mut self, session_bytes: &[u8]) -> Result<(), KeyError> {
        if self.counter.is_some() {
            return Err(KeyError::AlreadySet);
        }
        let hash: [u8; 32] = Sha256::digest(session_bytes).into();
        let (key, iv) = derive_key_iv(&hash);
        self.counter = Some(CbcContext::new(key, iv));
        Ok(())
    }

    /// Encrypts `plaintext` under the personal cipher, then (if installed)
    /// the counter cipher. With no cipher installed at all this is the
    /// identity transform.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
        let inner = match &self.personal {
            Some(ctx) => ctx.encrypt_pkcs7(plaintext),
            None => return Ok(plaintext.to_vec()),
        };
        match &self.counter {
            Some(ctx) => ctx.encrypt_no_padding(&inner),
            None => Ok(inner),
        }
    }

    /// Inverts [`KeyHandler::encrypt`]: counter layer first, then personal.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KeyError> {
        let after_counter = match &self.counter {
            Some(ctx) => ctx.decrypt_no_padding(ciphertext)?,
            None => ciphertext.to_vec(),
        };
        match &self.personal {
            Some(ctx) => ctx.decrypt_pkcs7(&after_counter),
            None => Ok(after_counter),
        }
    }

    /// HMAC-SHA-512 over `msg` under `key`, base85-encoded for wire transport.
    ///
    /// Does not depend on any per-connection DH state, so it is exposed as
    /// an associated function: callers that only need to bind an identity
    /// to a shared secret (the SRP login handshake, for instance) do not
    /// need a constructed `KeyHandler` to use it.
    pub fn hmac_sign(msg: &[u8], key: &[u8]) -> String {
        let mut mac = HmacSha512::new_from_slice(key).expect("HMAC accepts any key length");
        mac.update(msg);
        wire::base85::encode(&mac.finalize().into_bytes())
    }

    /// Constant-time verification of a base85-encoded HMAC-SHA-512 tag.
    pub fn hmac_verify(tag_base85: &str, msg: &[u8], key: &[u8]) -> bool {
        let expected = match wire::base85::decode(tag_base85) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let mut mac = HmacSha512::new_from_slice(key).expect("HMAC accepts any key length");
        mac.update(msg);
        let actual = mac.finalize().into_bytes();
        actual.ct_eq(expected.as_slice()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_peers_derive_interoperable_ciphers() {
        let mut a = KeyHandler::new();
        let mut b = KeyHandler::new();

        a.set_counter_key(b.public_key()).unwrap();
        b.set_counter_key(a.public_key()).unwrap();

        let msg = b"a wire record payload, base85-wrapped JSON usually";
        let ct = a.encrypt(msg).unwrap();
        let pt = b.decrypt(&ct).unwrap();
        assert_eq!(pt, msg);
    }

    #[test]
    fn set_counter_key_twice_fails() {
        let mut a = KeyHandler::new();
        let b = KeyHandler::new();
        a.set_counter_key(b.public_key()).unwrap();
        assert!(matches!(
            a.set_counter_key(b.public_key()),
            Err(KeyError::AlreadySet)
        ));
    }

    #[test]
    fn set_counter_cipher_twice_fails() {
        let mut a = KeyHandler::new();
        a.set_counter_cipher(b"session-key-bytes").unwrap();
        assert!(matches!(
            a.set_counter_cipher(b"session-key-bytes"),
            Err(KeyError::AlreadySet)
        ));
    }

    #[test]
    fn encrypt_is_passthrough_with_no_cipher_installed() {
        let h = KeyHandler::new();
        let msg = b"untouched";
        assert_eq!(h.encrypt(msg).unwrap(), msg.to_vec());
        assert_eq!(h.decrypt(msg).unwrap(), msg.to_vec());
    }

    #[test]
    fn dual_layer_round_trips_once_both_ciphers_are_installed() {
        let mut a = KeyHandler::new();
        let mut b = KeyHandler::new();
        a.set_counter_key(b.public_key()).unwrap();
        b.set_counter_key(a.public_key()).unwrap();
        a.set_counter_cipher(b"shared-srp-session-key").unwrap();
        b.set_counter_cipher(b"shared-srp-session-key").unwrap();

        let msg = b"post-login datagram payload";
        let ct = a.encrypt(msg).unwrap();
        let pt = b.decrypt(&ct).unwrap();
        assert_eq!(pt, msg);
    }

    #[test]
    fn dual_layer_round_trips_a_payload_exactly_16kib_long() {
        // A full 16k payload lands exactly on a PKCS#7 block boundary, so
        // the inner layer must append a full extra pad block rather than
        // leaving the outer (no-padding) layer an input that isn't itself
        // block-aligned.
        let mut a = KeyHandler::new();
        let mut b = KeyHandler::new();
        a.set_counter_key(b.public_key()).unwrap();
        b.set_counter_key(a.public_key()).unwrap();
        a.set_counter_cipher(b"shared-srp-session-key").unwrap();
        b.set_counter_cipher(b"shared-srp-session-key").unwrap();

        let msg = vec![0x5au8; 16 * 1024];
        let ct = a.encrypt(&msg).unwrap();
        assert_eq!(ct.len(), msg.len() + 16);
        let pt = b.decrypt(&ct).unwrap();
        assert_eq!(pt, msg);
    }

    #[test]
    fn hmac_round_trips_and_rejects_tamper() {
        let key = b"hmac-key";
        let tag = KeyHandler::hmac_sign(b"hello", key);
        assert!(KeyHandler::hmac_verify(&tag, b"hello", key));
        assert!(!KeyHandler::hmac_verify(&tag, b"hellx", key));
    }
}
