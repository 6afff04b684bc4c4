//! AES-256-GCM symmetric encryption with SHAKE-128 key stretching.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake128;

use super::{CipherText, SymmetricKey};
use crate::errors::{CryptoError, Result};

const NONCE_SIZE: usize = 12;

/// A symmetric key for pairwise encrypted channels.
///
/// The raw key material of any length is stretched to 32 bytes with
/// SHAKE-128 before keying the cipher. Every ciphertext carries a fresh
/// random nonce as its prefix.
#[derive(Clone)]
pub struct SymmetricAes {
    gcm: Aes256Gcm,
}

/// Creates a symmetric key for encryption/decryption from raw key material.
pub fn new_symmetric_key(key_material: &[u8]) -> SymmetricAes {
    let mut hkey = [0u8; 32];
    let mut hasher = Shake128::default();
    hasher.update(key_material);
    hasher.finalize_xof().read(&mut hkey);
    SymmetricAes {
        gcm: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&hkey)),
    }
}

impl SymmetricKey for SymmetricAes {
    fn encrypt(&self, msg: &[u8]) -> Result<CipherText> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);
        let mut out = nonce.to_vec();
        let sealed = self
            .gcm
            .encrypt(Nonce::from_slice(&nonce), msg)
            .map_err(|err| CryptoError::Backend(err.to_string()))?;
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(&self, ct: &[u8]) -> Result<Vec<u8>> {
        if ct.len() < NONCE_SIZE {
            return Err(CryptoError::MalformedCiphertext);
        }
        let (nonce, sealed) = ct.split_at(NONCE_SIZE);
        self.gcm
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::MalformedCiphertext)
    }
}
