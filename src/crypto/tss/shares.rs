//! Creating, verifying, combining and marshalling signature shares.

use rayon::prelude::*;

use super::dealing::lagrange;
use super::{Share, Signature, ThresholdKey};
use crate::crypto::bn256::{self, PolyVerifier, SIGNATURE_LENGTH};
use crate::errors::{CryptoError, Result};

impl Share {
    /// Returns the byte representation: `owner:u16 LE` followed by the
    /// marshalled signature.
    pub fn marshal(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(2 + SIGNATURE_LENGTH);
        data.extend_from_slice(&self.owner.to_le_bytes());
        data.extend_from_slice(&self.sgn.marshal());
        data
    }

    /// Reads a share from its byte representation.
    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(CryptoError::MalformedSignature);
        }
        let owner = u16::from_le_bytes(data[..2].try_into().expect("slice of length 2"));
        let sgn = bn256::Signature::unmarshal(&data[2..])?;
        Ok(Share { owner, sgn })
    }
}

impl Signature {
    pub fn marshal(&self) -> Vec<u8> {
        self.sgn.marshal()
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self> {
        if data.len() != SIGNATURE_LENGTH {
            return Err(CryptoError::MalformedSignature);
        }
        let sgn = bn256::Signature::unmarshal(data)?;
        Ok(Signature { sgn })
    }
}

impl ThresholdKey {
    /// Creates this party's share of the signature over `msg`, or `None` if
    /// the owner's secret key is not available.
    pub fn create_share(&self, msg: &[u8]) -> Option<Share> {
        let sk = self.sk.as_ref()?;
        Some(Share {
            owner: self.owner,
            sgn: sk.sign(msg),
        })
    }

    /// Verifies whether the given share over `msg` is correct.
    pub fn verify_share(&self, share: &Share, msg: &[u8]) -> bool {
        self.vks[share.owner as usize].verify(&share.sgn, msg)
    }

    /// Combines the given shares into a signature under the global key.
    ///
    /// Takes the first `threshold` shares when given more; returns `None`
    /// when given fewer. Which `threshold` correct shares are used does not
    /// influence the result.
    pub fn combine_shares(&self, shares: &[Share]) -> Option<Signature> {
        let shares = if shares.len() > self.threshold as usize {
            &shares[..self.threshold as usize]
        } else {
            shares
        };
        if shares.len() != self.threshold as usize {
            return None;
        }
        let points: Vec<u16> = shares.iter().map(|sh| sh.owner).collect();

        let sum = shares
            .par_iter()
            .map(|sh| bn256::mul_signature(Some(&sh.sgn), &lagrange(&points, sh.owner)))
            .reduce_with(|one, two| bn256::add_signatures(Some(&one), &two))?;

        Some(Signature { sgn: sum })
    }

    /// Verifies whether the given signature over `msg` is correct.
    pub fn verify_signature(&self, s: &Signature, msg: &[u8]) -> bool {
        self.global_vk.verify(&s.sgn, msg)
    }

    /// Uses the given verifier to check that the verification keys form a
    /// polynomial sequence of bounded degree.
    pub fn poly_verify(&self, pv: &PolyVerifier) -> bool {
        pv.verify(&self.vks)
    }

    /// Checks if the owner's secret key matches its verification key.
    /// Returns the incorrect secret key for dispute raising, or `None` when
    /// the keys are valid.
    pub fn verify_secret_key(&self) -> Option<bn256::SecretKey> {
        let sk = self.sk.as_ref()?;
        if !bn256::verify_keys(&self.vks[self.owner as usize], sk) {
            return Some(sk.clone());
        }
        None
    }
}
