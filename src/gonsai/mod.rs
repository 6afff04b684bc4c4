//! Gonsai: a staged, concurrent, authenticated radix trie.
//!
//! Values are stored under fixed-length byte keys in a path-compressed
//! radix trie whose root hash commits to the complete current contents.
//! Lookups return proofs of presence or absence that verify against the
//! root hash alone.
//!
//! Mutations are transactional: [`Storage::stage_insert`],
//! [`Storage::stage_update`] and [`Storage::stage_delete`] accumulate
//! changes in a stage zone invisible to readers until [`Storage::commit`]
//! promotes them, or [`Storage::reset`] discards them.
//!
//! # Concurrency
//!
//! The committed state is an immutable snapshot behind a read-write lock:
//! any number of concurrent [`Storage::find`]s are allowed and never see
//! staged changes. The stage zone is a copy-on-write working tree behind
//! its own mutex — staged mutations clone only the path they touch and
//! share every untouched subtree with the snapshot. `commit` computes the
//! staged hash first and then swaps the snapshot, blocking readers only
//! for the swap. Lock order is always stage mutex before tree lock.

mod node;
mod proofs;

pub use proofs::{parse, Proof};

use std::sync::{Arc, Mutex, RwLock};

use tracing::instrument;

use node::Node;

/// For longer hashes SHAKE-128 needs to be replaced with something
/// stronger.
const HASH_LEN: usize = 32;

/// A control hash of (part of) the trie contents.
pub type Hash = Vec<u8>;

pub(crate) fn zero_hash() -> Hash {
    vec![0]
}

/// An updater receives the current value and returns the new one.
pub type Updater<'a> = &'a dyn Fn(&[u8]) -> Vec<u8>;

/// Storing slices of bytes under fixed-length keys, with authenticated
/// lookups and staged transactions.
pub trait DataStorage: Send + Sync {
    /// The control hash of the current committed state.
    fn hash(&self) -> Hash;
    /// Looks for the value under the given key. Returns the proof for that
    /// value, or a proof that the key is not present. Ignores the stage
    /// zone.
    fn find(&self, key: &[u8]) -> (Option<Vec<u8>>, Proof);
    /// Stages an update of the given key with the supplied updater.
    /// Returns true if any change was applied to the stage zone.
    fn stage_update(&self, key: &[u8], upd: Updater<'_>) -> bool;
    /// Stages an insert of the given key-value pair, overwriting any
    /// previous value. Returns true if any change was applied to the stage
    /// zone.
    fn stage_insert(&self, key: &[u8], value: &[u8]) -> bool;
    /// Stages a deletion of the given key, if present. Returns true if any
    /// change was applied to the stage zone.
    fn stage_delete(&self, key: &[u8]) -> bool;
    /// The control hash of the committed state together with all currently
    /// staged changes.
    fn stage_hash(&self) -> Hash;
    /// Replaces the committed state with the contents of the stage zone.
    /// Finds are stopped only for the atomic promotion.
    fn commit(&self);
    /// Discards all changes present in the stage zone.
    fn reset(&self);
    /// The fixed key length.
    fn key_len(&self) -> usize;
}

/// The trie itself. See the module documentation.
pub struct Storage {
    key_len: usize,
    committed: RwLock<Arc<Node>>,
    staged: Mutex<Arc<Node>>,
}

impl Storage {
    /// Initializes an empty trie with the given key length.
    pub fn new(key_len: usize) -> Self {
        assert!(key_len > 0, "keys must be non-empty");
        let root = Arc::new(Node::new_root());
        Storage {
            key_len,
            committed: RwLock::new(root.clone()),
            staged: Mutex::new(root),
        }
    }

    fn check_key(&self, key: &[u8]) {
        assert_eq!(
            key.len(),
            self.key_len,
            "key length differs from the declared one"
        );
    }
}

impl DataStorage for Storage {
    fn key_len(&self) -> usize {
        self.key_len
    }

    fn hash(&self) -> Hash {
        let root = self.committed.read().unwrap();
        root.hash.clone().expect("the committed root always carries a hash")
    }

    fn find(&self, key: &[u8]) -> (Option<Vec<u8>>, Proof) {
        self.check_key(key);
        let root = self.committed.read().unwrap();
        root.find(key)
    }

    fn stage_update(&self, key: &[u8], upd: Updater<'_>) -> bool {
        self.check_key(key);
        let mut staged = self.staged.lock().unwrap();
        Arc::make_mut(&mut staged).stage_update(key, upd)
    }

    fn stage_insert(&self, key: &[u8], value: &[u8]) -> bool {
        self.check_key(key);
        let mut staged = self.staged.lock().unwrap();
        Arc::make_mut(&mut staged).stage_insert(key, value)
    }

    fn stage_delete(&self, key: &[u8]) -> bool {
        self.check_key(key);
        let mut staged = self.staged.lock().unwrap();
        let (changed, _) = Arc::make_mut(&mut staged).stage_delete(key);
        changed
    }

    fn stage_hash(&self) -> Hash {
        let mut staged = self.staged.lock().unwrap();
        Arc::make_mut(&mut staged).stage_hash()
    }

    #[instrument(level = "debug", skip(self))]
    fn commit(&self) {
        let mut staged = self.staged.lock().unwrap();
        Arc::make_mut(&mut staged).stage_hash();
        let mut committed = self.committed.write().unwrap();
        *committed = staged.clone();
    }

    fn reset(&self) {
        let mut staged = self.staged.lock().unwrap();
        *staged = self.committed.read().unwrap().clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> Storage {
        let ds = Storage::new(2);
        ds.stage_insert(&[0x00, 0x00], b"zero");
        ds.stage_insert(&[0x01, 0x00], b"one");
        ds.stage_insert(&[0x01, 0x01], b"one-one");
        ds.commit();
        ds
    }

    #[test]
    fn empty_tree_hashes_to_the_zero_constant() {
        let ds = Storage::new(2);
        assert_eq!(ds.hash(), vec![0]);
        let (value, proof) = ds.find(&[4, 2]);
        assert!(value.is_none());
        let (dh, k, root) = parse(&proof);
        assert!(dh.is_none());
        assert_eq!(k, vec![4, 2]);
        assert_eq!(root, ds.hash());
    }

    #[test]
    fn finds_committed_values_with_valid_proofs() {
        let ds = filled();
        for (k, v) in [
            ([0x00, 0x00], b"zero".to_vec()),
            ([0x01, 0x00], b"one".to_vec()),
            ([0x01, 0x01], b"one-one".to_vec()),
        ] {
            let (value, proof) = ds.find(&k);
            assert_eq!(value.as_ref(), Some(&v));
            let (dh, pk, root) = parse(&proof);
            assert_eq!(dh, Some(super::proofs::hash_data(&v)));
            assert_eq!(pk, k.to_vec());
            assert_eq!(root, ds.hash(), "root mismatch for key {k:02x?}");
        }
    }

    #[test]
    fn proof_of_absence_matches_root() {
        let ds = Storage::new(2);
        ds.stage_insert(&[0x00, 0x00], b"a");
        ds.stage_insert(&[0x01, 0x00], b"b");
        ds.commit();
        let (value, proof) = ds.find(&[0x02, 0x00]);
        assert!(value.is_none());
        let (dh, k, root) = parse(&proof);
        assert!(dh.is_none());
        assert_eq!(k, vec![0x02, 0x00]);
        assert_eq!(root, ds.hash());
    }

    #[test]
    fn absence_below_a_branch_matches_root() {
        let ds = filled();
        let (value, proof) = ds.find(&[0x01, 0x02]);
        assert!(value.is_none());
        let (dh, _, root) = parse(&proof);
        assert!(dh.is_none());
        assert_eq!(root, ds.hash());
    }

    #[test]
    fn finds_ignore_the_stage_zone() {
        let ds = filled();
        let before = ds.hash();
        assert!(ds.stage_insert(&[0x02, 0x02], b"stage only"));
        assert!(ds.stage_delete(&[0x00, 0x00]));
        let (value, _) = ds.find(&[0x02, 0x02]);
        assert!(value.is_none());
        let (value, _) = ds.find(&[0x00, 0x00]);
        assert_eq!(value, Some(b"zero".to_vec()));
        assert_eq!(ds.hash(), before);
    }

    #[test]
    fn hash_is_a_function_of_contents_only() {
        let one = Storage::new(2);
        one.stage_insert(&[0x00, 0x01], b"x");
        one.stage_insert(&[0x10, 0x01], b"y");
        one.stage_insert(&[0x10, 0x02], b"z");
        one.commit();

        // Same mapping, different history.
        let two = Storage::new(2);
        two.stage_insert(&[0x10, 0x02], b"z");
        two.stage_insert(&[0x00, 0x01], b"wrong");
        two.commit();
        two.stage_insert(&[0x10, 0x01], b"y");
        two.stage_insert(&[0x00, 0x01], b"x");
        two.stage_insert(&[0x44, 0x44], b"extra");
        two.commit();
        two.stage_delete(&[0x44, 0x44]);
        two.commit();

        assert_eq!(one.hash(), two.hash());
    }

    #[test]
    fn reset_discards_and_commit_promotes() {
        let ds = filled();
        let before = ds.hash();

        ds.stage_insert(&[0x03, 0x00], b"staged");
        let staged_hash = ds.stage_hash();
        assert_ne!(staged_hash, before);
        ds.reset();
        assert_eq!(ds.hash(), before);
        assert_eq!(ds.stage_hash(), before);

        ds.stage_insert(&[0x03, 0x00], b"staged");
        let staged_hash = ds.stage_hash();
        ds.commit();
        assert_eq!(ds.hash(), staged_hash);
        let (value, _) = ds.find(&[0x03, 0x00]);
        assert_eq!(value, Some(b"staged".to_vec()));
    }

    #[test]
    fn inserting_the_same_value_changes_nothing() {
        let ds = filled();
        assert!(!ds.stage_insert(&[0x00, 0x00], b"zero"));
        assert!(ds.stage_insert(&[0x00, 0x00], b"new zero"));
        assert!(ds.stage_insert(&[0x00, 0x00], b"zero"));
    }

    #[test]
    fn updates_only_touch_existing_keys() {
        let ds = filled();
        assert!(!ds.stage_update(&[0x07, 0x07], &|_| b"nope".to_vec()));
        assert!(!ds.stage_update(&[0x00, 0x00], &|d| d.to_vec()));
        assert!(ds.stage_update(&[0x00, 0x00], &|d| {
            let mut out = d.to_vec();
            out.push(b'!');
            out
        }));
        ds.commit();
        let (value, _) = ds.find(&[0x00, 0x00]);
        assert_eq!(value, Some(b"zero!".to_vec()));
    }

    #[test]
    fn deletion_contracts_paths() {
        let ds = filled();
        assert!(ds.stage_delete(&[0x01, 0x01]));
        assert!(!ds.stage_delete(&[0x01, 0x01]));
        ds.commit();
        let (value, _) = ds.find(&[0x01, 0x01]);
        assert!(value.is_none());
        let (value, proof) = ds.find(&[0x01, 0x00]);
        assert_eq!(value, Some(b"one".to_vec()));
        let (_, _, root) = parse(&proof);
        assert_eq!(root, ds.hash());

        // The contracted tree hashes like one built without the deleted key.
        let fresh = Storage::new(2);
        fresh.stage_insert(&[0x00, 0x00], b"zero");
        fresh.stage_insert(&[0x01, 0x00], b"one");
        fresh.commit();
        assert_eq!(ds.hash(), fresh.hash());
    }

    #[test]
    fn deleting_everything_restores_the_empty_hash() {
        let ds = filled();
        ds.stage_delete(&[0x00, 0x00]);
        ds.stage_delete(&[0x01, 0x00]);
        ds.stage_delete(&[0x01, 0x01]);
        ds.commit();
        assert_eq!(ds.hash(), vec![0]);
    }

    #[test]
    #[should_panic(expected = "key length differs")]
    fn wrong_key_length_is_a_contract_violation() {
        let ds = Storage::new(2);
        ds.find(&[1, 2, 3]);
    }

    #[test]
    fn concurrent_finds_during_staging() {
        use std::sync::Arc as StdArc;
        let ds = StdArc::new(filled());
        let expected = ds.hash();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let ds = ds.clone();
                let expected = expected.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let (value, proof) = ds.find(&[0x00, 0x00]);
                        assert_eq!(value, Some(b"zero".to_vec()));
                        let (_, _, root) = parse(&proof);
                        assert_eq!(root, expected);
                    }
                })
            })
            .collect();
        for i in 0..100u8 {
            ds.stage_insert(&[0xf0, i], &[i]);
            ds.stage_hash();
        }
        for reader in readers {
            reader.join().unwrap();
        }
        ds.reset();
        assert_eq!(ds.stage_hash(), expected);
    }
}
