//! Multisignatures on the pairing curve.
//!
//! The kind of signatures implemented here is, in general, known to be
//! vulnerable to a rogue-key attack. The attack requires choosing one's
//! public key based on the public keys of other participants, so a simple
//! protection suffices: committee candidates submit a hash of the public key
//! they are going to use and reveal the key itself only once elected. FOR
//! SECURITY REASONS IT IS CRUCIAL THAT THIS OR SOME OTHER PROTECTION IS
//! USED.

use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::crypto::bn256;
use crate::errors::{CryptoError, Result};

/// The length of signatures created by this module.
pub const SIGNATURE_LENGTH: usize = bn256::SIGNATURE_LENGTH;

/// The set of keys used for the multisigning procedure.
pub struct Keychain {
    pubs: Vec<bn256::VerificationKey>,
    priv_key: bn256::SecretKey,
    pid: u16,
}

impl Keychain {
    /// Creates a new keychain using the provided keys. Our pid is located by
    /// comparing the private key against the public key ring.
    pub fn new(pubs: Vec<bn256::VerificationKey>, priv_key: bn256::SecretKey) -> Self {
        let our_pub = priv_key.verification_key().marshal();
        let pid = pubs
            .iter()
            .position(|p| bn256::curve::ct_eq(&p.marshal(), &our_pub))
            .unwrap_or(0) as u16;
        Keychain {
            pubs,
            priv_key,
            pid,
        }
    }

    /// Checks whether the slice consists of some data followed by a correct
    /// signature of that data by `pid`.
    pub fn verify(&self, pid: u16, data: &[u8]) -> bool {
        if data.len() < SIGNATURE_LENGTH {
            return false;
        }
        let data_end = data.len() - SIGNATURE_LENGTH;
        let signature = match bn256::Signature::unmarshal(&data[data_end..]) {
            Ok(sgn) => sgn,
            Err(_) => return false,
        };
        self.pubs[pid as usize].verify(&signature, &data[..data_end])
    }

    /// Returns a signature for the provided data.
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.priv_key.sign(data).marshal()
    }

    /// Verifies whether the provided multisignature contains correctly
    /// signed data.
    pub fn multi_verify(&self, s: &Signature) -> bool {
        let inner = s.inner.lock().unwrap();
        if inner.collected.len() < s.threshold as usize {
            return false;
        }
        let mut multi_key = None;
        for &pid in &inner.collected {
            multi_key = Some(bn256::add_verification_keys(
                multi_key.as_ref(),
                &self.pubs[pid as usize],
            ));
        }
        let (Some(multi_key), Some(sgn)) = (multi_key, &inner.sgn) else {
            return false;
        };
        multi_key.verify(sgn, &s.data)
    }

    /// The pid of the owner of the private key on this keychain.
    pub fn pid(&self) -> u16 {
        self.pid
    }

    /// How many public keys there are on this keychain.
    pub fn length(&self) -> u16 {
        self.pubs.len() as u16
    }
}

struct Aggregate {
    sgn: Option<bn256::Signature>,
    collected: BTreeSet<u16>,
}

/// A multisignature associated with a piece of data and a keychain.
pub struct Signature {
    threshold: u16,
    data: Vec<u8>,
    inner: Mutex<Aggregate>,
}

impl Signature {
    /// Creates a signature for the given data with the given threshold.
    /// At first it contains no partial signatures; they have to be
    /// aggregated.
    pub fn new(threshold: u16, data: Vec<u8>) -> Self {
        Signature {
            threshold,
            data,
            inner: Mutex::new(Aggregate {
                sgn: None,
                collected: BTreeSet::new(),
            }),
        }
    }

    /// Aggregates the given partial signature together with the others
    /// received so far. Returns whether the multisignature is complete.
    ///
    /// Once complete, further calls return `Ok(true)` without changing
    /// anything, so the transition to `true` is reported exactly once per
    /// contributing pid race. Malformed or duplicate contributions leave the
    /// instance unchanged. The partial signature should be verified
    /// beforehand.
    pub fn aggregate(&self, pid: u16, sgn_bytes: &[u8]) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.collected.len() >= self.threshold as usize {
            return Ok(true);
        }
        let sgn = bn256::Signature::unmarshal(sgn_bytes)?;
        if inner.collected.contains(&pid) {
            return Err(CryptoError::DuplicatePid(pid));
        }
        inner.sgn = Some(bn256::add_signatures(inner.sgn.as_ref(), &sgn));
        inner.collected.insert(pid);
        Ok(inner.collected.len() >= self.threshold as usize)
    }

    /// Whether enough partial signatures have been aggregated.
    pub fn is_complete(&self) -> bool {
        self.inner.lock().unwrap().collected.len() >= self.threshold as usize
    }

    /// Marshals the multisignature: the contributing pids as u16 LE followed
    /// by the aggregated signature.
    ///
    /// Only complete instances can be marshalled — the receiver reads
    /// exactly `threshold` pids, so marshalling fewer would misalign the
    /// stream.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        if inner.collected.len() != self.threshold as usize {
            return Err(CryptoError::IllegalState(
                "only complete multisignatures can be marshalled",
            ));
        }
        let sgn = inner
            .sgn
            .as_ref()
            .ok_or(CryptoError::IllegalState("empty multisignature"))?;
        let mut result = Vec::with_capacity(self.marshaled_length());
        for &pid in &inner.collected {
            result.extend_from_slice(&pid.to_le_bytes());
        }
        result.extend_from_slice(&sgn.marshal());
        Ok(result)
    }

    /// How long a marshalling of this multisignature is, in bytes.
    pub fn marshaled_length(&self) -> usize {
        self.threshold as usize * 2 + SIGNATURE_LENGTH
    }

    /// Unmarshals a multisignature into this instance, which has to carry
    /// the same data and threshold as the instance that was marshalled.
    /// Duplicate pids on the wire are rejected rather than silently
    /// de-duplicated into an incomplete instance.
    pub fn unmarshal(&self, data: &[u8]) -> Result<()> {
        if data.len() != self.marshaled_length() {
            return Err(CryptoError::MalformedSignature);
        }
        let mut collected = BTreeSet::new();
        for chunk in data[..self.threshold as usize * 2].chunks_exact(2) {
            let pid = u16::from_le_bytes(chunk.try_into().expect("chunk of length 2"));
            if !collected.insert(pid) {
                return Err(CryptoError::MalformedSignature);
            }
        }
        let sgn = bn256::Signature::unmarshal(&data[self.threshold as usize * 2..])?;
        let mut inner = self.inner.lock().unwrap();
        inner.collected = collected;
        inner.sgn = Some(sgn);
        Ok(())
    }

    /// The pids that have contributed so far.
    pub fn collected(&self) -> Vec<u16> {
        self.inner.lock().unwrap().collected.iter().copied().collect()
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Clone for Signature {
    fn clone(&self) -> Self {
        let inner = self.inner.lock().unwrap();
        Signature {
            threshold: self.threshold,
            data: self.data.clone(),
            inner: Mutex::new(Aggregate {
                sgn: inner.sgn.clone(),
                collected: inner.collected.clone(),
            }),
        }
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("Signature")
            .field("threshold", &self.threshold)
            .field("collected", &inner.collected)
            .finish_non_exhaustive()
    }
}
