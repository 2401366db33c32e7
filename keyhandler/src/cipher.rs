use aes::Aes256;
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::KeyError;

type Encryptor = cbc::Encryptor<Aes256>;
type Decryptor = cbc::Decryptor<Aes256>;

/// A fixed AES-256-CBC key/IV pair. Unlike a long-lived stream cipher, a
/// new `Encryptor`/`Decryptor` is built from this key and IV on every
/// single call: the reference implementation recreates its cipher context
/// on each property access rather than chaining state across messages, and
/// we reproduce that here.
#[derive(Clone)]
pub struct CbcContext {
    key: [u8; 32],
    iv: [u8; 16],
}

impl CbcContext {
    pub fn new(key: [u8; 32], iv: [u8; 16]) -> Self {
        CbcContext { key, iv }
    }

    pub fn encrypt_pkcs7(&self, plaintext: &[u8]) -> Vec<u8> {
        Encryptor::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    pub fn decrypt_pkcs7(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KeyError> {
        Decryptor::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| KeyError::BadPadding)
    }

    /// Used for the outer (counter) cipher layer, whose input is always a
    /// full multiple of the block size already (the inner layer's PKCS#7
    /// padding guarantees it), so no further padding is applied.
    pub fn encrypt_no_padding(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
        Encryptor::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<NoPadding>(plaintext)
            .map_err(|_| KeyError::BadPadding)
    }

    pub fn decrypt_no_padding(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KeyError> {
        Decryptor::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
            .map_err(|_| KeyError::BadPadding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CbcContext {
        CbcContext::new([7u8; 32], [9u8; 16])
    }

    #[test]
    fn pkcs7_round_trips_arbitrary_lengths() {
        for len in [0usize, 1, 15, 16, 17, 200] {
            let data = vec![0xabu8; len];
            let ct = ctx().encrypt_pkcs7(&data);
            let pt = ctx().decrypt_pkcs7(&ct).unwrap();
            assert_eq!(pt, data);
        }
    }

    #[test]
    fn no_padding_round_trips_block_aligned_data() {
        let data = vec![0x11u8; 32];
        let ct = ctx().encrypt_no_padding(&data).unwrap();
        let pt = ctx().decrypt_no_padding(&ct).unwrap();
        assert_eq!(pt, data);
    }

    #[test]
    fn bad_padding_is_rejected() {
        let garbage = vec![0xffu8; 16];
        assert!(ctx().decrypt_pkcs7(&garbage).is_err());
    }
}
