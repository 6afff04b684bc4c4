//! A single multicast instance and its state machine.

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use crate::crypto::multi::{Keychain, Signature, SIGNATURE_LENGTH};
use crate::crypto::minimal_quorum;
use crate::errors::RmcError;

use super::Status;

struct State {
    raw_len: u32,
    signed_data: Vec<u8>,
    proof: Option<Signature>,
    stat: Status,
}

pub(super) struct Instance {
    id: u64,
    keys: Arc<Keychain>,
    state: Mutex<State>,
}

pub(super) struct Incoming {
    pub(super) instance: Instance,
    pid: u16,
}

impl Instance {
    /// An outgoing instance: the id is prepended to the data, the whole
    /// thing signed, and our own signature aggregated right away.
    pub(super) fn new_outgoing(id: u64, data: &[u8], keys: Arc<Keychain>) -> Self {
        let raw_len = data.len() as u32;
        let mut buf = Vec::with_capacity(8 + data.len() + SIGNATURE_LENGTH);
        buf.extend_from_slice(&id.to_le_bytes());
        buf.extend_from_slice(data);
        let own_sig = keys.sign(&buf);
        buf.extend_from_slice(&own_sig);
        Instance::with_signed_data(id, raw_len, buf, keys)
    }

    /// A raw instance: the data is used verbatim, without the id prefix and
    /// the trailing signature. Only useful when all parties already know the
    /// data and only want a joint certificate.
    pub(super) fn new_raw(id: u64, data: &[u8], keys: Arc<Keychain>) -> Self {
        Instance::with_signed_data(id, data.len() as u32, data.to_vec(), keys)
    }

    fn with_signed_data(id: u64, raw_len: u32, signed_data: Vec<u8>, keys: Arc<Keychain>) -> Self {
        let proof = Signature::new(minimal_quorum(keys.length()), signed_data.clone());
        let _ = proof.aggregate(keys.pid(), &keys.sign(&signed_data));
        Instance {
            id,
            keys,
            state: Mutex::new(State {
                raw_len,
                signed_data,
                proof: Some(proof),
                stat: Status::Data,
            }),
        }
    }

    pub(super) fn send_data<W: Write>(&self, w: &mut W) -> Result<(), RmcError> {
        let state = self.state.lock().unwrap();
        w.write_all(&state.raw_len.to_le_bytes())?;
        w.write_all(&state.signed_data)?;
        Ok(())
    }

    pub(super) fn send_proof<W: Write>(&self, w: &mut W) -> Result<(), RmcError> {
        let state = self.state.lock().unwrap();
        if state.stat != Status::Finished {
            return Err(RmcError::IllegalState("no proof to send"));
        }
        let proof = state
            .proof
            .as_ref()
            .ok_or(RmcError::IllegalState("no proof to send"))?;
        w.write_all(&proof.marshal().map_err(RmcError::Crypto)?)?;
        Ok(())
    }

    pub(super) fn send_finished<W: Write>(&self, w: &mut W) -> Result<(), RmcError> {
        self.send_data(w)?;
        self.send_proof(w)
    }

    pub(super) fn send_signature<W: Write>(&self, w: &mut W) -> Result<(), RmcError> {
        let mut state = self.state.lock().unwrap();
        if state.stat == Status::Unknown {
            return Err(RmcError::IllegalState("cannot sign unknown data"));
        }
        let signature = self.keys.sign(&state.signed_data);
        w.write_all(&signature)?;
        if state.stat == Status::Data {
            state.stat = Status::Signed;
        }
        Ok(())
    }

    /// Reads and aggregates a signature by `pid` over the data of this
    /// instance. Returns true when this is exactly the signature that
    /// completed the proof.
    pub(super) fn accept_signature<R: Read>(&self, pid: u16, r: &mut R) -> Result<bool, RmcError> {
        let mut signature = [0u8; SIGNATURE_LENGTH];
        r.read_exact(&mut signature)?;
        let mut state = self.state.lock().unwrap();
        let mut signed = Vec::with_capacity(state.signed_data.len() + SIGNATURE_LENGTH);
        signed.extend_from_slice(&state.signed_data);
        signed.extend_from_slice(&signature);
        if !self.keys.verify(pid, &signed) {
            return Err(crate::errors::CryptoError::VerificationFailed.into());
        }
        if state.stat == Status::Finished {
            return Ok(false);
        }
        let proof = state
            .proof
            .as_ref()
            .ok_or(RmcError::IllegalState("no data accepted"))?;
        let done = proof.aggregate(pid, &signature).map_err(RmcError::Crypto)?;
        if done {
            state.stat = Status::Finished;
            return Ok(true);
        }
        Ok(false)
    }

    /// Reads a multisignature and verifies it proves that this instance
    /// succeeded.
    pub(super) fn accept_proof<R: Read>(&self, r: &mut R) -> Result<(), RmcError> {
        let mut state = self.state.lock().unwrap();
        if state.stat == Status::Unknown {
            return Err(RmcError::IllegalState("cannot accept proof of unknown data"));
        }
        let proof = Signature::new(
            minimal_quorum(self.keys.length()),
            state.signed_data.clone(),
        );
        let mut data = vec![0u8; proof.marshaled_length()];
        r.read_exact(&mut data)?;
        proof.unmarshal(&data).map_err(RmcError::Crypto)?;
        if !self.keys.multi_verify(&proof) {
            return Err(crate::errors::CryptoError::VerificationFailed.into());
        }
        if state.stat != Status::Finished {
            state.proof = Some(proof);
            state.stat = Status::Finished;
        }
        Ok(())
    }

    pub(super) fn data(&self) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        extract_data(&state)
    }

    pub(super) fn proof(&self) -> Option<Signature> {
        let state = self.state.lock().unwrap();
        if state.stat != Status::Finished {
            return None;
        }
        state.proof.clone()
    }

    pub(super) fn status(&self) -> Status {
        self.state.lock().unwrap().stat
    }
}

fn extract_data(state: &State) -> Vec<u8> {
    if state.raw_len as usize == state.signed_data.len() {
        return state.signed_data.clone();
    }
    state.signed_data[8..8 + state.raw_len as usize].to_vec()
}

impl Incoming {
    pub(super) fn new(id: u64, pid: u16, keys: Arc<Keychain>) -> Self {
        Incoming {
            instance: Instance {
                id,
                keys,
                state: Mutex::new(State {
                    raw_len: 0,
                    signed_data: Vec::new(),
                    proof: None,
                    stat: Status::Unknown,
                }),
            },
            pid,
        }
    }

    /// Reads the data frame: the length, the id-prefixed payload and the
    /// sender's signature over it. Verifies the id and the signature, and
    /// initializes the proof.
    ///
    /// Accepting the same data twice succeeds without changes; accepting
    /// different data under the same id is a conflict and is refused.
    pub(super) fn accept_data<R: Read>(&self, r: &mut R) -> Result<Vec<u8>, RmcError> {
        let mut len_buf = [0u8; 4];
        r.read_exact(&mut len_buf)?;
        let raw_len = u32::from_le_bytes(len_buf);
        let mut signed_data = vec![0u8; 8 + raw_len as usize + SIGNATURE_LENGTH];
        r.read_exact(&mut signed_data)?;
        let id = u64::from_le_bytes(signed_data[..8].try_into().expect("slice of length 8"));
        if id != self.instance.id {
            return Err(RmcError::IdMismatch);
        }
        if !self.instance.keys.verify(self.pid, &signed_data) {
            return Err(crate::errors::CryptoError::VerificationFailed.into());
        }
        let proof = Signature::new(
            minimal_quorum(self.instance.keys.length()),
            signed_data.clone(),
        );

        let mut state = self.instance.state.lock().unwrap();
        if state.stat != Status::Unknown {
            let this_data = &signed_data[8..8 + raw_len as usize];
            if this_data != extract_data(&state) {
                return Err(RmcError::DataConflict);
            }
            return Ok(extract_data(&state));
        }
        state.signed_data = signed_data;
        state.raw_len = raw_len;
        state.proof = Some(proof);
        state.stat = Status::Data;
        Ok(extract_data(&state))
    }

    pub(super) fn accept_finished<R: Read>(&self, r: &mut R) -> Result<Vec<u8>, RmcError> {
        let result = self.accept_data(r)?;
        self.instance.accept_proof(r)?;
        Ok(result)
    }
}
