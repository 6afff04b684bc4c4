//! Cryptographic and reliable-multicast substrate for BFT committees.
//!
//! A committee of `n_proc` processes, indexed by a small integer identity
//! `pid`, uses this crate to jointly produce unforgeable signatures under a
//! (t,n) trust threshold, to reliably multicast payloads so that every
//! honest receiver either agrees on a unique value or learns none, and to
//! maintain an authenticated key-value store whose root hash commits to the
//! complete current state.
//!
//! # Subsystems
//!
//! ```text
//! quorum
//! ├── crypto      BN-254 signatures, threshold schemes, multisignatures,
//! │               pairwise channels, encryption primitives
//! ├── rmc         reliable multicast: threshold-signed certificates of
//! │               uniqueness per (sender, id)
//! ├── gonsai      staged, concurrent, authenticated radix trie
//! ├── core        preblocks, blocks, and the block hash
//! └── utils       observer pattern with safe removal
//! ```
//!
//! Transports, connection management and process lifecycle are external
//! collaborators: the protocol cores consume only `Read`/`Write` byte
//! streams per peer, a system random source, the committee size and our
//! pid.

pub mod core;
pub mod crypto;
pub mod errors;
pub mod gonsai;
pub mod rmc;
pub mod utils;

pub use crypto::{minimal_quorum, minimal_trusted};
pub use errors::{CryptoError, RmcError};
