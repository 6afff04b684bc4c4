//! Proofs of presence and absence, and their external verification.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake128;

use super::{Hash, HASH_LEN};

/// What a node needs to know about a child to compute its own hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct Info {
    pub(super) name: Vec<u8>,
    pub(super) hash: Hash,
}

/// One level of a proof: the name of the child on the lookup path and the
/// `(name, hash)` pairs of its siblings. The innermost level carries the
/// hash of the leaf data on success, and the undivergeable remainder of the
/// key on failure.
#[derive(Clone, Debug)]
pub struct Proof {
    pub(super) name: Vec<u8>,
    pub(super) siblings: Vec<Info>,
    pub(super) next: Option<Box<Proof>>,
    pub(super) data_hash: Option<Hash>,
}

fn shake(data: &[u8]) -> Hash {
    let mut out = vec![0u8; HASH_LEN];
    let mut hasher = Shake128::default();
    hasher.update(data);
    hasher.finalize_xof().read(&mut out);
    out
}

/// The hash of a node with the given children, in ascending first-byte
/// order. The empty subtree hashes to the fixed constant `[0x00]`.
pub(super) fn hash_nodes(nodes: &[Info]) -> Hash {
    if nodes.is_empty() {
        return super::zero_hash();
    }
    let mut buf = Vec::new();
    for nd in nodes {
        buf.extend_from_slice(&nd.name);
        buf.extend_from_slice(&nd.hash);
    }
    shake(&buf)
}

/// The hash of a leaf's data.
pub(super) fn hash_data(data: &[u8]) -> Hash {
    shake(data)
}

/// Inserts the reconstructed entry among the siblings at its sorted
/// position.
fn with_entry(siblings: &[Info], entry: Info) -> Vec<Info> {
    let pos = siblings.partition_point(|sib| sib.name[0] < entry.name[0]);
    let mut infos = Vec::with_capacity(siblings.len() + 1);
    infos.extend_from_slice(&siblings[..pos]);
    infos.push(entry);
    infos.extend_from_slice(&siblings[pos..]);
    infos
}

/// Reconstructs `(data_hash, key, root)` from a proof.
///
/// If `data_hash` is empty, `root` is the hash of a tree in which `key` is
/// not present; otherwise it is the hash of a tree in which `key` stores a
/// value with that data hash. Comparing `root` against a known tree hash
/// verifies the claim without access to the tree.
pub fn parse(pr: &Proof) -> (Option<Hash>, Vec<u8>, Hash) {
    match (&pr.next, &pr.data_hash) {
        (None, None) => {
            // Proof of failure: all siblings of the divergence node.
            (None, pr.name.clone(), hash_nodes(&pr.siblings))
        }
        (None, Some(dh)) => {
            let infos = with_entry(
                &pr.siblings,
                Info {
                    name: pr.name.clone(),
                    hash: dh.clone(),
                },
            );
            (Some(dh.clone()), pr.name.clone(), hash_nodes(&infos))
        }
        (Some(next), _) => {
            let (dh, name, root) = parse(next);
            let infos = with_entry(
                &pr.siblings,
                Info {
                    name: pr.name.clone(),
                    hash: root,
                },
            );
            let mut full_name = pr.name.clone();
            full_name.extend_from_slice(&name);
            (dh, full_name, hash_nodes(&infos))
        }
    }
}
