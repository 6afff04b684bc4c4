//! Core data types produced and consumed by the consensus above the
//! substrate.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake128;

use crate::crypto::multi;

/// A packet of binary data embedded in a single unit.
pub type Data = Vec<u8>;

/// A set of data objects from units contained in one timing round, together
/// with the shared randomness of that round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Preblock {
    pub data: Vec<Data>,
    pub random_bytes: Vec<u8>,
}

/// Constructs a preblock from the given data and random bytes.
pub fn new_preblock(data: Vec<Data>, random_bytes: Vec<u8>) -> Preblock {
    Preblock { data, random_bytes }
}

/// A final element of the blockchain: a preblock promoted by a threshold
/// signature and indexed by a monotone id.
#[derive(Debug)]
pub struct Block {
    pub preblock: Preblock,
    pub id: u64,
    pub additional_data: Vec<Data>,
    pub signature: Option<multi::Signature>,
}

/// Creates a block from the given preblock and additional data. The
/// signature is left to be attached by the committee.
pub fn to_block(preblock: Preblock, id: u64, additional_data: Vec<Data>) -> Block {
    Block {
        preblock,
        id,
        additional_data,
        signature: None,
    }
}

/// Computes the hash of a block. For obvious reasons this does not include
/// the signature.
pub fn block_hash(block: &Block) -> Vec<u8> {
    let mut hasher = Shake128::default();
    hasher.update(&block.id.to_le_bytes());
    for data in &block.preblock.data {
        hasher.update(data);
    }
    hasher.update(&block.preblock.random_bytes);
    for data in &block.additional_data {
        hasher.update(data);
    }
    let mut result = vec![0u8; 32];
    hasher.finalize_xof().read(&mut result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        let pb = new_preblock(vec![b"tx1".to_vec(), b"tx2".to_vec()], vec![7; 16]);
        to_block(pb, 42, vec![b"aux".to_vec()])
    }

    #[test]
    fn hash_ignores_the_signature() {
        let mut block = sample_block();
        let before = block_hash(&block);
        block.signature = Some(multi::Signature::new(3, b"whatever".to_vec()));
        assert_eq!(block_hash(&block), before);
    }

    #[test]
    fn hash_depends_on_every_other_field() {
        let base = block_hash(&sample_block());

        let mut block = sample_block();
        block.id = 43;
        assert_ne!(block_hash(&block), base);

        let mut block = sample_block();
        block.preblock.random_bytes[0] ^= 1;
        assert_ne!(block_hash(&block), base);

        let mut block = sample_block();
        block.additional_data.clear();
        assert_ne!(block_hash(&block), base);

        let mut block = sample_block();
        block.preblock.data.pop();
        assert_ne!(block_hash(&block), base);
    }
}
