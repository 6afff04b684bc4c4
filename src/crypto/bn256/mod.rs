//! Keys and signatures on the BN-254 pairing curve.
//!
//! In addition to generating and using keypairs for signing, this module
//! contains the operations needed by the more involved schemes built on top
//! of it: threshold signatures and multisignatures. Secret keys are scalars,
//! verification keys live in G2, signatures in G1, and verification is the
//! pairing equation `e(sig, g2) == e(hash(msg), vk)` checked in constant
//! time over the marshalled GT elements.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::{CryptoRng, RngCore};

use crate::errors::{CryptoError, Result};

pub(crate) mod curve;
mod poly;

pub use curve::{Fr, G1, G2, SCALAR_LENGTH, SIGNATURE_LENGTH, VERIFICATION_KEY_LENGTH};
pub use poly::PolyVerifier;

use curve::{
    ct_eq, g1_gen, g2_gen, hash_to_g1, marshal_fr, marshal_g1, marshal_g2, pairing_bytes,
    unmarshal_fr, unmarshal_g1, unmarshal_g2,
};

/// Can be used to sign data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretKey {
    key: Fr,
}

/// Can verify the validity of signatures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationKey {
    key: G2,
}

/// Confirms some piece of information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    sgn: G1,
}

/// Generates a fresh keypair, with the secret uniform over the scalar field.
pub fn generate_keys<R: RngCore + CryptoRng>(rng: &mut R) -> (VerificationKey, SecretKey) {
    let secret = curve::random_scalar(rng);
    let sk = SecretKey::new(secret);
    (sk.verification_key(), sk)
}

impl SecretKey {
    /// Wraps the given scalar as a secret key.
    pub fn new(secret: Fr) -> Self {
        SecretKey { key: secret }
    }

    /// Returns a signature of `msg`.
    pub fn sign(&self, msg: &[u8]) -> Signature {
        Signature {
            sgn: hash_to_g1(msg) * self.key,
        }
    }

    /// The verification key associated with this secret key.
    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey::new(self.key)
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

impl VerificationKey {
    /// The verification key of the given secret scalar, `g2 * secret`.
    pub fn new(secret: Fr) -> Self {
        VerificationKey {
            key: g2_gen() * secret,
        }
    }

    /// Returns true if `sig` is a valid signature of `msg` under this key.
    pub fn verify(&self, sig: &Signature, msg: &[u8]) -> bool {
        let p1 = pairing_bytes(&sig.sgn, &g2_gen());
        let p2 = pairing_bytes(&hash_to_g1(msg), &self.key);
        ct_eq(&p1, &p2)
    }

    pub fn marshal(&self) -> Vec<u8> {
        marshal_g2(&self.key)
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let key = unmarshal_g2(data).ok_or(CryptoError::MalformedKey)?;
        Ok(VerificationKey { key })
    }

    /// Encodes the key as a base64 string.
    pub fn encode(&self) -> String {
        BASE64.encode(self.marshal())
    }

    pub(crate) fn point(&self) -> &G2 {
        &self.key
    }
}

impl Signature {
    pub fn marshal(&self) -> Vec<u8> {
        marshal_g1(&self.sgn)
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        let sgn = unmarshal_g1(data).ok_or(CryptoError::MalformedSignature)?;
        Ok(Signature { sgn })
    }
}

/// Decodes a secret key from its base64 encoding.
pub fn decode_secret_key(enc: &str) -> Result<SecretKey> {
    let data = BASE64.decode(enc).map_err(|_| CryptoError::MalformedKey)?;
    SecretKey::unmarshal(&data)
}

/// Decodes a verification key from its base64 encoding.
pub fn decode_verification_key(enc: &str) -> Result<VerificationKey> {
    let data = BASE64.decode(enc).map_err(|_| CryptoError::MalformedKey)?;
    VerificationKey::unmarshal(&data)
}

/// Returns the sum of the provided verification keys.
/// `None` is treated as the group identity.
pub fn add_verification_keys(
    vk1: Option<&VerificationKey>,
    vk2: &VerificationKey,
) -> VerificationKey {
    match vk1 {
        None => vk2.clone(),
        Some(vk1) => VerificationKey {
            key: vk1.key + vk2.key,
        },
    }
}

/// Returns the sum of the provided secret keys modulo the group order.
/// `None` is treated as zero.
pub fn add_secret_keys(sk1: Option<&SecretKey>, sk2: &SecretKey) -> SecretKey {
    match sk1 {
        None => sk2.clone(),
        Some(sk1) => SecretKey {
            key: sk1.key + sk2.key,
        },
    }
}

/// Returns the sum of the provided signatures.
/// `None` is treated as the group identity.
pub fn add_signatures(sgn1: Option<&Signature>, sgn2: &Signature) -> Signature {
    match sgn1 {
        None => sgn2.clone(),
        Some(sgn1) => Signature {
            sgn: sgn1.sgn + sgn2.sgn,
        },
    }
}

/// Returns the provided signature multiplied by the scalar.
/// `None` is treated as the G1 generator.
pub fn mul_signature(sgn: Option<&Signature>, n: &Fr) -> Signature {
    match sgn {
        None => Signature { sgn: g1_gen() * *n },
        Some(sgn) => Signature { sgn: sgn.sgn * *n },
    }
}

/// Checks whether the given secret and verification keys form a valid pair.
pub fn verify_keys(vk: &VerificationKey, sk: &SecretKey) -> bool {
    ct_eq(&vk.marshal(), &sk.verification_key().marshal())
}
