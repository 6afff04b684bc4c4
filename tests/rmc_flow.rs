//! End-to-end reliable multicast between a committee of ten processes,
//! exchanging frames over in-memory byte streams.

use quorum::crypto::bn256;
use quorum::crypto::minimal_quorum;
use quorum::rmc::{Rmc, Status};
use quorum::RmcError;

use rand::rngs::OsRng;

const N_PROC: u16 = 10;

/// One Rmc context per committee member, all sharing the public key ring.
fn committee() -> Vec<Rmc> {
    let pairs: Vec<_> = (0..N_PROC)
        .map(|_| bn256::generate_keys(&mut OsRng))
        .collect();
    let pubs: Vec<_> = pairs.iter().map(|(vk, _)| vk.clone()).collect();
    pairs
        .into_iter()
        .map(|(_, sk)| Rmc::new(pubs.clone(), sk))
        .collect()
}

#[test]
fn full_multicast_flow() {
    let committee = committee();
    let (sender, peers) = committee.split_first().unwrap();
    let id = 17;
    let payload = b"some preblock contents";

    // Data phase: the sender multicasts, every peer accepts and signs back.
    let mut data_frame = Vec::new();
    sender.send_data(id, payload, &mut data_frame).unwrap();
    assert_eq!(sender.status(id), Status::Data);

    let mut finished_at = None;
    for (i, peer) in peers.iter().enumerate() {
        let pid = i as u16 + 1;
        let received = peer.accept_data(id, 0, &mut &data_frame[..]).unwrap();
        assert_eq!(received, payload);
        assert_eq!(peer.status(id), Status::Data);

        let mut sig_frame = Vec::new();
        peer.send_signature(id, &mut sig_frame).unwrap();
        assert_eq!(peer.status(id), Status::Signed);

        let done = sender.accept_signature(id, pid, &mut &sig_frame[..]).unwrap();
        if done {
            finished_at = Some(pid);
        }
    }

    // The sender's own signature counts, so the quorum completes with the
    // (threshold - 1)-th peer signature and never again afterwards.
    assert_eq!(finished_at, Some(minimal_quorum(N_PROC) - 1));
    assert_eq!(sender.status(id), Status::Finished);

    // Proof phase: every peer verifies the certificate.
    let mut proof_frame = Vec::new();
    sender.send_proof(id, &mut proof_frame).unwrap();
    for peer in peers {
        peer.accept_proof(id, &mut &proof_frame[..]).unwrap();
        assert_eq!(peer.status(id), Status::Finished);
        assert_eq!(peer.data(id).unwrap(), payload);
        assert!(peer.proof(id).is_some());
    }
    // Accepting the proof again is a no-op.
    peers[0].accept_proof(id, &mut &proof_frame[..]).unwrap();
    assert_eq!(peers[0].status(id), Status::Finished);
    assert_eq!(sender.data(id).unwrap(), payload);
}

#[test]
fn finished_instances_relay() {
    let committee = committee();
    let id = 4;
    let payload = b"relayed data";

    // Gather a full certificate between the sender and all peers but the
    // last one.
    let mut data_frame = Vec::new();
    committee[0].send_data(id, payload, &mut data_frame).unwrap();
    for pid in 1..N_PROC - 1 {
        let peer = &committee[pid as usize];
        peer.accept_data(id, 0, &mut &data_frame[..]).unwrap();
        let mut sig_frame = Vec::new();
        peer.send_signature(id, &mut sig_frame).unwrap();
        committee[0]
            .accept_signature(id, pid, &mut &sig_frame[..])
            .unwrap();
    }
    assert_eq!(committee[0].status(id), Status::Finished);

    // The last peer saw nothing yet and learns the result from one frame.
    let late = &committee[N_PROC as usize - 1];
    assert_eq!(late.status(id), Status::Unknown);
    let mut finished_frame = Vec::new();
    committee[0].send_finished(id, &mut finished_frame).unwrap();
    let data = late
        .accept_finished(id, 0, &mut &finished_frame[..])
        .unwrap();
    assert_eq!(data, payload);
    assert_eq!(late.status(id), Status::Finished);
    assert_eq!(late.data(id).unwrap(), payload);
}

#[test]
fn conflicting_data_is_refused() {
    let committee = committee();
    let id = 99;

    let mut first = Vec::new();
    committee[0].send_data(id, b"first payload", &mut first).unwrap();
    // An equivocating sender clears its instance and signs a different
    // payload under the same id.
    committee[0].clear(id);
    let mut second = Vec::new();
    committee[0].send_data(id, b"second payload", &mut second).unwrap();

    let peer = &committee[5];
    peer.accept_data(id, 0, &mut &first[..]).unwrap();
    // The same frame again is fine.
    peer.accept_data(id, 0, &mut &first[..]).unwrap();
    // A different payload under the same id is a conflict.
    match peer.accept_data(id, 0, &mut &second[..]) {
        Err(RmcError::DataConflict) => {}
        other => panic!("expected a data conflict, got {other:?}"),
    }
    assert_eq!(peer.data(id).unwrap(), b"first payload");
}

#[test]
fn signatures_of_strangers_are_rejected() {
    let committee = committee();
    let id = 7;
    let mut data_frame = Vec::new();
    committee[0].send_data(id, b"data", &mut data_frame).unwrap();
    committee[1].accept_data(id, 0, &mut &data_frame[..]).unwrap();

    // pid 2 signs, but the frame is presented as coming from pid 3.
    let mut sig_frame = Vec::new();
    committee[2].accept_data(id, 0, &mut &data_frame[..]).unwrap();
    committee[2].send_signature(id, &mut sig_frame).unwrap();
    assert!(committee[1]
        .accept_signature(id, 3, &mut &sig_frame[..])
        .is_err());
    // Under the right pid it aggregates.
    assert_eq!(
        committee[1]
            .accept_signature(id, 2, &mut &sig_frame[..])
            .unwrap(),
        false
    );
}

#[test]
fn raw_instances_certify_known_data() {
    let committee = committee();
    let id = 1234;
    let data = b"everyone already knows this";

    for rmc in &committee {
        rmc.initiate_raw(id, data).unwrap();
        assert_eq!(rmc.status(id), Status::Data);
        assert_eq!(rmc.data(id).unwrap(), data);
    }
    assert!(committee[0].initiate_raw(id, data).is_err());

    // Processes swap signatures; everyone finishes at the quorum.
    let threshold = minimal_quorum(N_PROC);
    let mut done_count = 0;
    for pid in 1..N_PROC {
        let mut sig_frame = Vec::new();
        committee[pid as usize]
            .send_signature(id, &mut sig_frame)
            .unwrap();
        let done = committee[0]
            .accept_signature(id, pid, &mut &sig_frame[..])
            .unwrap();
        if done {
            done_count += 1;
            assert_eq!(pid, threshold - 1);
        }
    }
    assert_eq!(done_count, 1);
    assert_eq!(committee[0].status(id), Status::Finished);

    // The certificate convinces the others through the proof phase.
    let mut proof_frame = Vec::new();
    committee[0].send_proof(id, &mut proof_frame).unwrap();
    committee[9].accept_proof(id, &mut &proof_frame[..]).unwrap();
    assert_eq!(committee[9].status(id), Status::Finished);
}

#[test]
fn clear_forgets_instances() {
    let committee = committee();
    let id = 3;
    let mut buf = Vec::new();
    committee[0].send_data(id, b"data", &mut buf).unwrap();
    assert_eq!(committee[0].status(id), Status::Data);
    committee[0].clear(id);
    assert_eq!(committee[0].status(id), Status::Unknown);
    assert!(committee[0].data(id).is_none());
    assert!(committee[0].send_signature(id, &mut buf).is_err());
}
