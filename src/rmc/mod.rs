//! Reliable multicast for arbitrary data.
//!
//! This protocol is based on reliable broadcast, but with slightly different
//! guarantees. Crucially, a piece of data multicast with a given id agrees
//! among all processes that received it, i.e. it is unique. The protocol has
//! no hard guarantees on pessimistic message complexity, but can be used in
//! tandem with gossip to disseminate data together with succinct proofs of
//! uniqueness.
//!
//! # Protocol
//!
//! ```text
//! sender                                each receiver
//!   │ send_data ───────────────────────→ accept_data
//!   │ accept_signature ←─────────────── send_signature
//!   │   (true at the quorum threshold)
//!   │ send_proof ──────────────────────→ accept_proof
//! ```
//!
//! All reading and writing happens on caller-provided byte streams; on an IO
//! error the method fails fast and no state beyond what was atomically
//! accepted is changed. The caller is expected to close the stream.

mod greeting;
mod instance;
mod status;

pub use greeting::{accept_greeting, greet};
pub use status::Status;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, RwLock};

use tracing::instrument;

use crate::crypto::bn256;
use crate::crypto::multi::{Keychain, Signature};
use crate::errors::RmcError;

use instance::{Incoming, Instance};

/// All the data related to one process's series of reliable multicasts.
pub struct Rmc {
    keys: Arc<Keychain>,
    incoming: RwLock<HashMap<u64, Arc<Incoming>>>,
    outgoing: RwLock<HashMap<u64, Arc<Instance>>>,
}

enum Handle {
    In(Arc<Incoming>),
    Out(Arc<Instance>),
}

impl Handle {
    fn instance(&self) -> &Instance {
        match self {
            Handle::In(incoming) => &incoming.instance,
            Handle::Out(instance) => instance,
        }
    }
}

impl Rmc {
    /// Creates a context for executing instances of the reliable multicast.
    pub fn new(pubs: Vec<bn256::VerificationKey>, priv_key: bn256::SecretKey) -> Self {
        Rmc {
            keys: Arc::new(Keychain::new(pubs, priv_key)),
            incoming: RwLock::new(HashMap::new()),
            outgoing: RwLock::new(HashMap::new()),
        }
    }

    /// Initiates raw signature gathering: no data is sent, the given bytes
    /// are used verbatim as the signed payload. This should only be used
    /// when all participants already know the data and only want to produce
    /// a proof that it is agreed between them.
    #[instrument(level = "debug", skip(self, data), fields(len = data.len()))]
    pub fn initiate_raw(&self, id: u64, data: &[u8]) -> Result<(), RmcError> {
        let mut outgoing = self.outgoing.write().unwrap();
        if outgoing.contains_key(&id) {
            return Err(RmcError::IllegalState("duplicate raw instance"));
        }
        outgoing.insert(id, Arc::new(Instance::new_raw(id, data, self.keys.clone())));
        Ok(())
    }

    /// Writes the data concatenated with the id and signed by us to `w`,
    /// creating the outgoing instance on first use.
    #[instrument(level = "debug", skip(self, data, w), fields(len = data.len()))]
    pub fn send_data<W: Write>(&self, id: u64, data: &[u8], w: &mut W) -> Result<(), RmcError> {
        if self.status(id) != Status::Unknown {
            let out = self.get_out(id)?;
            return out.send_data(w);
        }
        let out = self.new_outgoing_instance(id, data);
        out.send_data(w)
    }

    /// Reads the id-prefixed data and the sender's signature from `r`,
    /// verifies both, and returns the payload for protocol-independent
    /// verification.
    #[instrument(level = "debug", skip(self, r))]
    pub fn accept_data<R: Read>(&self, id: u64, pid: u16, r: &mut R) -> Result<Vec<u8>, RmcError> {
        let incoming = self.get_or_new_incoming(id, pid);
        incoming.accept_data(r)
    }

    /// Writes our signature over the data associated with `id` to `w`.
    pub fn send_signature<W: Write>(&self, id: u64, w: &mut W) -> Result<(), RmcError> {
        self.get(id)?.instance().send_signature(w)
    }

    /// Reads a signature from `r` and verifies it represents `pid` signing
    /// the data associated with `id`. Returns true when this is exactly the
    /// threshold-th signature gathered.
    #[instrument(level = "debug", skip(self, r))]
    pub fn accept_signature<R: Read>(
        &self,
        id: u64,
        pid: u16,
        r: &mut R,
    ) -> Result<bool, RmcError> {
        self.get(id)?.instance().accept_signature(pid, r)
    }

    /// Writes the proof associated with `id` to `w`.
    pub fn send_proof<W: Write>(&self, id: u64, w: &mut W) -> Result<(), RmcError> {
        self.get(id)?.instance().send_proof(w)
    }

    /// Reads a proof from `r` and verifies it is a proof that `id`
    /// succeeded.
    #[instrument(level = "debug", skip(self, r))]
    pub fn accept_proof<R: Read>(&self, id: u64, r: &mut R) -> Result<(), RmcError> {
        self.get(id)?.instance().accept_proof(r)
    }

    /// Writes the data and proof associated with `id` to `w`.
    pub fn send_finished<W: Write>(&self, id: u64, w: &mut W) -> Result<(), RmcError> {
        self.get(id)?.instance().send_finished(w)
    }

    /// Reads a pair of data and proof from `r` and verifies it corresponds
    /// to a successfully finished multicast, creating the incoming instance
    /// if absent.
    #[instrument(level = "debug", skip(self, r))]
    pub fn accept_finished<R: Read>(
        &self,
        id: u64,
        pid: u16,
        r: &mut R,
    ) -> Result<Vec<u8>, RmcError> {
        let incoming = self.get_or_new_incoming(id, pid);
        incoming.accept_finished(r)
    }

    /// The state corresponding to `id`; `Unknown` when no instance exists.
    pub fn status(&self, id: u64) -> Status {
        match self.get(id) {
            Ok(handle) => handle.instance().status(),
            Err(_) => Status::Unknown,
        }
    }

    /// The raw data corresponding to `id`. If the status differs from
    /// `Finished`, this data might be unreliable!
    pub fn data(&self, id: u64) -> Option<Vec<u8>> {
        self.get(id).ok().map(|handle| handle.instance().data())
    }

    /// The proof corresponding to `id`, or `None` before `Finished`.
    pub fn proof(&self, id: u64) -> Option<Signature> {
        self.get(id).ok().and_then(|handle| handle.instance().proof())
    }

    /// Removes all information concerning `id`. Afterwards the state is
    /// `Unknown` until any further calls with `id`.
    #[instrument(level = "debug", skip(self))]
    pub fn clear(&self, id: u64) {
        let mut incoming = self.incoming.write().unwrap();
        let mut outgoing = self.outgoing.write().unwrap();
        incoming.remove(&id);
        outgoing.remove(&id);
    }

    fn get_or_new_incoming(&self, id: u64, pid: u16) -> Arc<Incoming> {
        let mut incoming = self.incoming.write().unwrap();
        incoming
            .entry(id)
            .or_insert_with(|| Arc::new(Incoming::new(id, pid, self.keys.clone())))
            .clone()
    }

    fn new_outgoing_instance(&self, id: u64, data: &[u8]) -> Arc<Instance> {
        let mut outgoing = self.outgoing.write().unwrap();
        outgoing
            .entry(id)
            .or_insert_with(|| Arc::new(Instance::new_outgoing(id, data, self.keys.clone())))
            .clone()
    }

    fn get_in(&self, id: u64) -> Option<Arc<Incoming>> {
        self.incoming.read().unwrap().get(&id).cloned()
    }

    fn get_out(&self, id: u64) -> Result<Arc<Instance>, RmcError> {
        self.outgoing
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RmcError::UnknownInstance)
    }

    /// Instance lookup, with incoming taking priority.
    fn get(&self, id: u64) -> Result<Handle, RmcError> {
        if let Some(incoming) = self.get_in(id) {
            return Ok(Handle::In(incoming));
        }
        if let Ok(out) = self.get_out(id) {
            return Ok(Handle::Out(out));
        }
        Err(RmcError::UnknownInstance)
    }
}
