//! Dealer-distributed threshold signature scheme.
//!
//! A dealer samples a polynomial of degree `t-1` over the scalar field,
//! hands every party the evaluation at its point as a secret share, and
//! publishes the matching verification keys. Any `t` shares of a signature
//! combine through Lagrange interpolation into a signature under the global
//! key; fewer reveal nothing. Summing the keys of several dealers
//! ([`create_multikey`], [`WeakThresholdKey`]) removes the trust in any
//! single one of them.

mod dealing;
mod multi;
mod shares;

pub use dealing::decode;
pub use multi::{create_multikey, sum_shares, WeakThresholdKey};

use crate::crypto::bn256;
use crate::crypto::encrypt::CipherText;

/// The set of all raw threshold keys generated by a dealer for all parties.
pub struct Tss {
    pub(super) threshold: u16,
    pub(super) global_vk: bn256::VerificationKey,
    pub(super) vks: Vec<bn256::VerificationKey>,
    pub(super) sks: Vec<bn256::SecretKey>,
}

/// A single party's view of a dealt threshold key: encrypted secret keys of
/// all parties and the decrypted key of the owner.
#[derive(Clone)]
pub struct ThresholdKey {
    pub(super) owner: u16,
    pub(super) dealer: u16,
    pub(super) threshold: u16,
    pub(super) global_vk: bn256::VerificationKey,
    pub(super) vks: Vec<bn256::VerificationKey>,
    pub(super) enc_sks: Vec<CipherText>,
    pub(super) sk: Option<bn256::SecretKey>,
}

/// A share of a signature owned by one process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
    pub(super) owner: u16,
    pub(super) sgn: bn256::Signature,
}

/// The result of merging enough shares: a signature under the global key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub(super) sgn: bn256::Signature,
}

impl Tss {
    /// The number of shares needed to produce a signature.
    pub fn threshold(&self) -> u16 {
        self.threshold
    }
}

impl ThresholdKey {
    /// The number of shares needed to produce a signature.
    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    /// The identity of the dealer this key was obtained from.
    pub fn dealer(&self) -> u16 {
        self.dealer
    }

    /// The identity of the party owning this key.
    pub fn owner(&self) -> u16 {
        self.owner
    }

    /// The verification key of the jointly held secret.
    pub fn global_vk(&self) -> &bn256::VerificationKey {
        &self.global_vk
    }
}

impl Share {
    /// The identity of the party that created this share.
    pub fn owner(&self) -> u16 {
        self.owner
    }
}
