//! RSA-OAEP asymmetric encryption with text key encodings.
//!
//! Key text formats: an encryption key is `N#E` with `N` in base 36 and `E`
//! in decimal; a decryption key appends `#D#p*q[*...]`, all big integers in
//! base 36.

use num_traits::Num;
use rand::rngs::OsRng;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use super::{CipherText, DecryptionKey, EncryptionKey};
use crate::errors::{CryptoError, Result};

const KEY_BITS: usize = 2048;
const TEXT_RADIX: u32 = 36;

/// An OAEP encryption key.
#[derive(Clone, Debug)]
pub struct OaepEncryptionKey {
    key: RsaPublicKey,
}

/// An OAEP decryption key.
#[derive(Clone, Debug)]
pub struct OaepDecryptionKey {
    key: RsaPrivateKey,
}

/// Creates a fresh pair of keys for encryption/decryption.
pub fn generate_keys() -> Result<(OaepEncryptionKey, OaepDecryptionKey)> {
    let priv_key = RsaPrivateKey::new(&mut OsRng, KEY_BITS)
        .map_err(|err| CryptoError::Backend(err.to_string()))?;
    let pub_key = priv_key.to_public_key();
    Ok((
        OaepEncryptionKey { key: pub_key },
        OaepDecryptionKey { key: priv_key },
    ))
}

impl EncryptionKey for OaepEncryptionKey {
    fn encrypt(&self, msg: &[u8]) -> Result<CipherText> {
        self.key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), msg)
            .map_err(|err| CryptoError::Backend(err.to_string()))
    }

    fn encode(&self) -> String {
        format!(
            "{}#{}",
            self.key.n().to_str_radix(TEXT_RADIX),
            self.key.e()
        )
    }
}

impl DecryptionKey for OaepDecryptionKey {
    fn decrypt(&self, ct: &[u8]) -> Result<Vec<u8>> {
        self.key
            .decrypt(Oaep::new::<Sha256>(), ct)
            .map_err(|_| CryptoError::MalformedCiphertext)
    }

    fn encode(&self) -> String {
        let primes = self
            .key
            .primes()
            .iter()
            .map(|p| p.to_str_radix(TEXT_RADIX))
            .collect::<Vec<_>>()
            .join("*");
        format!(
            "{}#{}#{}#{}",
            self.key.n().to_str_radix(TEXT_RADIX),
            self.key.e(),
            self.key.d().to_str_radix(TEXT_RADIX),
            primes
        )
    }
}

fn parse_big(text: &str, radix: u32) -> Result<BigUint> {
    BigUint::from_str_radix(text, radix).map_err(|_| CryptoError::MalformedKey)
}

/// Creates an encryption key from its text representation.
pub fn new_encryption_key(text: &str) -> Result<OaepEncryptionKey> {
    let parts: Vec<&str> = text.split('#').collect();
    if parts.len() != 2 {
        return Err(CryptoError::MalformedKey);
    }
    let n = parse_big(parts[0], TEXT_RADIX)?;
    if n == BigUint::from(0u8) {
        return Err(CryptoError::MalformedKey);
    }
    let e = parse_big(parts[1], 10)?;
    let key = RsaPublicKey::new(n, e).map_err(|_| CryptoError::MalformedKey)?;
    Ok(OaepEncryptionKey { key })
}

/// Creates a decryption key from its text representation.
pub fn new_decryption_key(text: &str) -> Result<OaepDecryptionKey> {
    let parts: Vec<&str> = text.split('#').collect();
    if parts.len() != 4 {
        return Err(CryptoError::MalformedKey);
    }
    let n = parse_big(parts[0], TEXT_RADIX)?;
    let e = parse_big(parts[1], 10)?;
    let d = parse_big(parts[2], TEXT_RADIX)?;
    let prime_texts: Vec<&str> = parts[3].split('*').collect();
    if prime_texts.len() < 2 {
        return Err(CryptoError::MalformedKey);
    }
    let primes = prime_texts
        .iter()
        .map(|p| parse_big(p, TEXT_RADIX))
        .collect::<Result<Vec<_>>>()?;
    let key = RsaPrivateKey::from_components(n, e, d, primes)
        .map_err(|_| CryptoError::MalformedKey)?;
    key.validate().map_err(|_| CryptoError::MalformedKey)?;
    Ok(OaepDecryptionKey { key })
}
