//! Trie nodes and the staged operations on them.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::proofs::{hash_data, hash_nodes, Info, Proof};
use super::Hash;

/// A node of the radix trie.
///
/// Invariants:
/// - `data` is present iff the node is a leaf;
/// - a child stored under key byte `b` has a name beginning with `b`;
/// - every non-leaf non-root node has at least 2 children (path
///   compression);
/// - `hash` is present iff no change happened below since the last
///   [`Node::stage_hash`].
///
/// A node's hash covers its children's names but not its own, so renaming a
/// node (during splits and contractions) keeps its cached hash valid.
#[derive(Clone)]
pub(super) struct Node {
    pub(super) name: Vec<u8>,
    pub(super) data: Option<Vec<u8>>,
    pub(super) children: BTreeMap<u8, Arc<Node>>,
    pub(super) hash: Option<Hash>,
}

/// The length of the common prefix of two keys.
fn common_prefix(one: &[u8], two: &[u8]) -> usize {
    one.iter().zip(two).take_while(|(a, b)| a == b).count()
}

impl Node {
    pub(super) fn new_root() -> Self {
        Node {
            name: Vec::new(),
            data: None,
            children: BTreeMap::new(),
            hash: Some(super::zero_hash()),
        }
    }

    fn new_leaf(name: &[u8], data: &[u8]) -> Self {
        Node {
            name: name.to_vec(),
            data: Some(data.to_vec()),
            children: BTreeMap::new(),
            hash: None,
        }
    }

    fn committed_hash(&self) -> Hash {
        self.hash
            .clone()
            .expect("nodes of the committed snapshot always carry a hash")
    }

    fn sibling_infos(&self, exclude: Option<u8>) -> Vec<Info> {
        self.children
            .values()
            .filter(|ch| exclude != Some(ch.name[0]))
            .map(|ch| Info {
                name: ch.name.clone(),
                hash: ch.committed_hash(),
            })
            .collect()
    }

    /// Looks up `key` and builds the proof of presence or absence.
    pub(super) fn find(&self, key: &[u8]) -> (Option<Vec<u8>>, Proof) {
        if let Some(ch) = self.children.get(&key[0]) {
            let cp = common_prefix(key, &ch.name);
            if cp == key.len() {
                let proof = Proof {
                    name: ch.name.clone(),
                    siblings: self.sibling_infos(Some(ch.name[0])),
                    next: None,
                    data_hash: Some(ch.committed_hash()),
                };
                return (ch.data.clone(), proof);
            }
            if cp == ch.name.len() {
                let (res, sub) = ch.find(&key[cp..]);
                let proof = Proof {
                    name: ch.name.clone(),
                    siblings: self.sibling_infos(Some(ch.name[0])),
                    next: Some(Box::new(sub)),
                    data_hash: None,
                };
                return (res, proof);
            }
        }
        let proof = Proof {
            name: key.to_vec(),
            siblings: self.sibling_infos(None),
            next: None,
            data_hash: None,
        };
        (None, proof)
    }

    /// Stages an insert, splitting a child when the key diverges inside its
    /// name. Returns whether anything changed.
    pub(super) fn stage_insert(&mut self, key: &[u8], value: &[u8]) -> bool {
        if let Some(ch_arc) = self.children.get_mut(&key[0]) {
            let cp = common_prefix(key, &ch_arc.name);
            if cp == key.len() {
                // The key is already present, overwrite the value.
                if ch_arc.data.as_deref() == Some(value) {
                    return false;
                }
                let ch = Arc::make_mut(ch_arc);
                ch.data = Some(value.to_vec());
                ch.hash = None;
                self.hash = None;
                return true;
            }
            if cp == ch_arc.name.len() {
                // The child's name is a prefix of the key, go into the subtree.
                let changed = Arc::make_mut(ch_arc).stage_insert(&key[cp..], value);
                if changed {
                    self.hash = None;
                }
                return changed;
            }
            // A new branching point is needed.
            let mut moved = self
                .children
                .remove(&key[0])
                .expect("child checked above");
            {
                let m = Arc::make_mut(&mut moved);
                m.name = m.name[cp..].to_vec();
            }
            let moved_byte = moved.name[0];
            let mut branch = Node {
                name: key[..cp].to_vec(),
                data: None,
                children: BTreeMap::new(),
                hash: None,
            };
            branch
                .children
                .insert(key[cp], Arc::new(Node::new_leaf(&key[cp..], value)));
            branch.children.insert(moved_byte, moved);
            self.children.insert(key[0], Arc::new(branch));
            self.hash = None;
            return true;
        }
        self.children
            .insert(key[0], Arc::new(Node::new_leaf(key, value)));
        self.hash = None;
        true
    }

    /// Stages an update of an existing key. Returns whether anything
    /// changed; missing keys change nothing.
    pub(super) fn stage_update<F>(&mut self, key: &[u8], upd: F) -> bool
    where
        F: FnOnce(&[u8]) -> Vec<u8>,
    {
        let Some(ch_arc) = self.children.get_mut(&key[0]) else {
            return false;
        };
        let cp = common_prefix(key, &ch_arc.name);
        if cp == key.len() {
            let data = ch_arc.data.as_deref().unwrap_or_default();
            let new_data = upd(data);
            if data == new_data {
                return false;
            }
            let ch = Arc::make_mut(ch_arc);
            ch.data = Some(new_data);
            ch.hash = None;
            self.hash = None;
            return true;
        }
        if cp == ch_arc.name.len() {
            let changed = Arc::make_mut(ch_arc).stage_update(&key[cp..], upd);
            if changed {
                self.hash = None;
            }
            return changed;
        }
        false
    }

    /// Stages a deletion. When this node is left with a single child, that
    /// child is returned so the parent can splice it in place of this node,
    /// keeping the path compressed. The root is exempt and ignores the
    /// returned child.
    pub(super) fn stage_delete(&mut self, key: &[u8]) -> (bool, Option<Arc<Node>>) {
        let Some(ch_arc) = self.children.get(&key[0]) else {
            return (false, None);
        };
        let cp = common_prefix(key, &ch_arc.name);
        if cp == key.len() {
            self.children.remove(&key[0]);
            self.hash = None;
            if self.children.len() == 1 {
                let only = self
                    .children
                    .values()
                    .next()
                    .expect("exactly one child left")
                    .clone();
                return (true, Some(only));
            }
            return (true, None);
        }
        if cp == ch_arc.name.len() {
            let ch_name = ch_arc.name.clone();
            let ch = Arc::make_mut(self.children.get_mut(&key[0]).expect("child checked above"));
            let (changed, only_child) = ch.stage_delete(&key[cp..]);
            if let Some(mut only) = only_child {
                // Splice the grandchild in place of the contracted child.
                let spliced = Arc::make_mut(&mut only);
                spliced.name = [ch_name.as_slice(), &spliced.name].concat();
                self.children.insert(key[0], only);
                self.hash = None;
            }
            if changed {
                self.hash = None;
            }
            return (changed, None);
        }
        (false, None)
    }

    /// Recomputes missing hashes throughout the subtree in one traversal and
    /// returns this node's. Subtrees with a cached hash are left untouched.
    pub(super) fn stage_hash(&mut self) -> Hash {
        if let Some(h) = &self.hash {
            return h.clone();
        }
        let h = if let Some(data) = &self.data {
            hash_data(data)
        } else {
            let mut infos = Vec::with_capacity(self.children.len());
            for ch_arc in self.children.values_mut() {
                let hash = match &ch_arc.hash {
                    Some(h) => h.clone(),
                    None => Arc::make_mut(ch_arc).stage_hash(),
                };
                infos.push(Info {
                    name: ch_arc.name.clone(),
                    hash,
                });
            }
            hash_nodes(&infos)
        };
        self.hash = Some(h.clone());
        h
    }
}
