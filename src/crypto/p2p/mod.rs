//! Pairwise symmetric keys from Diffie–Hellman on the pairing curve.
//!
//! Every process publishes `(g1*sk, g2*sk)`. The secret shared between
//! processes i and j is `g1*sk_i*sk_j`, which either side computes from its
//! own secret and the other's public key, and anyone can verify against the
//! two public keys with a single pairing equation. The shared element is
//! stretched into an AES key for the encrypted channel.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::{CryptoRng, RngCore};

use super::bn256::curve::{
    ct_eq, g1_gen, g2_gen, marshal_fr, marshal_g1, marshal_g2, pairing_bytes, random_scalar,
    unmarshal_fr, unmarshal_g1, unmarshal_g2, Fr, G1, G2,
};
use super::encrypt::{new_symmetric_key, SymmetricAes};
use crate::errors::{CryptoError, Result};

/// A secret key used to derive p2p keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretKey {
    key: Fr,
}

/// A public key used to derive p2p keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    g1: G1,
    g2: G2,
}

/// A secret shared between two peers.
///
/// It can be revealed when proving that the other party has sent
/// non-compliant messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedSecret {
    secret: G1,
}

/// Generates a fresh p2p keypair.
pub fn generate_keys<R: RngCore + CryptoRng>(rng: &mut R) -> (PublicKey, SecretKey) {
    let secret = random_scalar(rng);
    let sk = SecretKey::new(secret);
    (sk.public_key(), sk)
}

impl SecretKey {
    pub fn new(secret: Fr) -> Self {
        SecretKey { key: secret }
    }

    /// The public key associated with this secret key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            g1: g1_gen() * self.key,
            g2: g2_gen() * self.key,
        }
    }

    pub fn marshal(&self) -> Vec<u8> {
        marshal_fr(&self.key)
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let key = unmarshal_fr(data).ok_or(CryptoError::MalformedKey)?;
        Ok(SecretKey { key })
    }

    /// Encodes the key as a base64 string.
    pub fn encode(&self) -> String {
        BASE64.encode(self.marshal())
    }
}

impl PublicKey {
    /// Checks internal consistency of the two halves of the key.
    pub fn verify(&self) -> bool {
        let p1 = pairing_bytes(&self.g1, &g2_gen());
        let p2 = pairing_bytes(&g1_gen(), &self.g2);
        ct_eq(&p1, &p2)
    }

    pub fn marshal(&self) -> Vec<u8> {
        let g1m = marshal_g1(&self.g1);
        let g2m = marshal_g2(&self.g2);
        let mut out = Vec::with_capacity(4 + g1m.len() + g2m.len());
        out.extend_from_slice(&(g1m.len() as u32).to_le_bytes());
        out.extend_from_slice(&g1m);
        out.extend_from_slice(&g2m);
        out
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(CryptoError::MalformedKey);
        }
        let g1_len = u32::from_le_bytes(data[..4].try_into().expect("slice of length 4")) as usize;
        if data.len() < 4 + g1_len {
            return Err(CryptoError::MalformedKey);
        }
        let g1 = unmarshal_g1(&data[4..4 + g1_len]).ok_or(CryptoError::MalformedKey)?;
        let g2 = unmarshal_g2(&data[4 + g1_len..]).ok_or(CryptoError::MalformedKey)?;
        Ok(PublicKey { g1, g2 })
    }

    /// Encodes the key as a base64 string.
    pub fn encode(&self) -> String {
        BASE64.encode(self.marshal())
    }
}

/// Decodes a secret key from its base64 encoding.
pub fn decode_secret_key(enc: &str) -> Result<SecretKey> {
    let data = BASE64.decode(enc).map_err(|_| CryptoError::MalformedKey)?;
    SecretKey::unmarshal(&data)
}

/// Decodes a public key from its base64 encoding.
pub fn decode_public_key(enc: &str) -> Result<PublicKey> {
    let data = BASE64.decode(enc).map_err(|_| CryptoError::MalformedKey)?;
    PublicKey::unmarshal(&data)
}

/// Returns the secret this process shares with the owner of `pk2`.
pub fn new_shared_secret(sk1: &SecretKey, pk2: &PublicKey) -> SharedSecret {
    SharedSecret {
        secret: pk2.g1 * sk1.key,
    }
}

/// Checks whether the shared element comes from the given pair of keys.
pub fn verify_shared_secret(pk1: &PublicKey, pk2: &PublicKey, elem: &SharedSecret) -> bool {
    let p1 = pairing_bytes(&elem.secret, &g2_gen());
    let p2 = pairing_bytes(&pk1.g1, &pk2.g2);
    ct_eq(&p1, &p2)
}

impl SharedSecret {
    pub fn marshal(&self) -> Vec<u8> {
        marshal_g1(&self.secret)
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let secret = unmarshal_g1(data).ok_or(CryptoError::MalformedKey)?;
        Ok(SharedSecret { secret })
    }
}

/// Returns the symmetric key for communication between the two peers.
pub fn key(ss: &SharedSecret) -> SymmetricAes {
    new_symmetric_key(&ss.marshal())
}

/// Returns the symmetric keys for communication with each committee member.
pub fn keys(sk: &SecretKey, pks: &[PublicKey]) -> Vec<SymmetricAes> {
    pks.iter().map(|pk| key(&new_shared_secret(sk, pk))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::encrypt::SymmetricKey as _;
    use rand::rngs::OsRng;

    #[test]
    fn public_keys_verify() {
        let (pk, _) = generate_keys(&mut OsRng);
        assert!(pk.verify());
    }

    #[test]
    fn shared_secret_is_symmetric() {
        let (pk1, sk1) = generate_keys(&mut OsRng);
        let (pk2, sk2) = generate_keys(&mut OsRng);
        let s12 = new_shared_secret(&sk1, &pk2);
        let s21 = new_shared_secret(&sk2, &pk1);
        assert_eq!(s12, s21);
        assert!(verify_shared_secret(&pk1, &pk2, &s12));
        assert!(verify_shared_secret(&pk2, &pk1, &s21));
    }

    #[test]
    fn rejects_foreign_shared_secret() {
        let (pk1, _) = generate_keys(&mut OsRng);
        let (pk2, _) = generate_keys(&mut OsRng);
        let (pk3, sk3) = generate_keys(&mut OsRng);
        let bogus = new_shared_secret(&sk3, &pk3);
        assert!(!verify_shared_secret(&pk1, &pk2, &bogus));
    }

    #[test]
    fn derived_channels_agree() {
        let (pk1, sk1) = generate_keys(&mut OsRng);
        let (pk2, sk2) = generate_keys(&mut OsRng);
        let k12 = key(&new_shared_secret(&sk1, &pk2));
        let k21 = key(&new_shared_secret(&sk2, &pk1));
        let ct = k12.encrypt(b"hello peer").unwrap();
        assert_eq!(k21.decrypt(&ct).unwrap(), b"hello peer");
    }

    #[test]
    fn marshalling_round_trips() {
        let (pk, sk) = generate_keys(&mut OsRng);
        assert_eq!(PublicKey::unmarshal(&pk.marshal()).unwrap(), pk);
        assert_eq!(SecretKey::unmarshal(&sk.marshal()).unwrap(), sk);
        assert_eq!(decode_public_key(&pk.encode()).unwrap(), pk);
        assert_eq!(decode_secret_key(&sk.encode()).unwrap(), sk);
        assert!(PublicKey::unmarshal(&[1, 2]).is_err());
        let ss = new_shared_secret(&sk, &pk);
        assert_eq!(SharedSecret::unmarshal(&ss.marshal()).unwrap(), ss);
    }
}
