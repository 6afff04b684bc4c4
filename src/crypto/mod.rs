//! Cryptographic primitives and trust assumptions of the committee.
//!
//! Less than one third of the committee can be byzantine, which fixes the
//! two subset sizes everything above builds on. The submodules provide the
//! layered cryptographic stack:
//!
//! ```text
//! crypto
//! ├── bn256       keys, signatures, PolyVerifier (BN-254 pairing)
//! ├── encrypt     AES-GCM symmetric + RSA-OAEP asymmetric encryption
//! ├── p2p         pairwise Diffie-Hellman channels
//! ├── tss         dealer-distributed threshold signatures
//! └── multi       BLS-style multisignatures
//! ```

pub mod bn256;
pub mod encrypt;
pub mod multi;
pub mod p2p;
pub mod tss;

/// The minimal possible size of a subset forming a quorum within
/// `n_processes`.
pub fn minimal_quorum(n_processes: u16) -> u16 {
    n_processes - n_processes / 3
}

/// The minimal size of a subset of `n_processes` that is guaranteed to
/// contain at least one honest process.
pub fn minimal_trusted(n_processes: u16) -> u16 {
    (n_processes - 1) / 3 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_constants() {
        assert_eq!(minimal_quorum(10), 7);
        assert_eq!(minimal_trusted(10), 4);
        assert_eq!(minimal_quorum(4), 3);
        assert_eq!(minimal_trusted(4), 2);
        assert_eq!(minimal_quorum(1), 1);
        assert_eq!(minimal_trusted(1), 1);
    }
}
