//! Symmetric and asymmetric encryption used for key distribution.
//!
//! Two families live here:
//!
//! - [`SymmetricAes`]: AES-256-GCM keyed by SHAKE-128-stretched key
//!   material, used for the pairwise channels over which threshold shares
//!   are distributed.
//! - [`OaepEncryptionKey`] / [`OaepDecryptionKey`]: RSA-OAEP with text
//!   encodings, used where a committee member must publish an encryption
//!   key before any pairwise secret exists.
//!
//! The capability traits keep the consumers (TSS dealing, p2p) independent
//! of the concrete schemes.

mod aes;
mod rsa;

pub use self::aes::{new_symmetric_key, SymmetricAes};
pub use self::rsa::{generate_keys, new_decryption_key, new_encryption_key, OaepDecryptionKey, OaepEncryptionKey};

use crate::errors::Result;

/// Encrypted data.
pub type CipherText = Vec<u8>;

/// Used for encrypting messages.
pub trait EncryptionKey {
    /// Encrypts a message.
    fn encrypt(&self, msg: &[u8]) -> Result<CipherText>;
    /// Encodes the encryption key as text.
    fn encode(&self) -> String;
}

/// Used for decrypting ciphertexts encrypted with the corresponding
/// encryption key.
pub trait DecryptionKey {
    /// Decrypts a ciphertext.
    fn decrypt(&self, ct: &[u8]) -> Result<Vec<u8>>;
    /// Encodes the decryption key as text.
    fn encode(&self) -> String;
}

/// Used for both encrypting and decrypting messages.
pub trait SymmetricKey: Send + Sync {
    /// Encrypts a message.
    fn encrypt(&self, msg: &[u8]) -> Result<CipherText>;
    /// Decrypts a ciphertext that was encrypted with this key.
    fn decrypt(&self, ct: &[u8]) -> Result<Vec<u8>>;
}
