//! Summing threshold keys of multiple dealers.

use std::collections::HashSet;

use super::{Share, Signature, ThresholdKey};
use crate::crypto::bn256::{self, PolyVerifier};

/// Generates a multikey for the given threshold keys, i.e. a threshold key
/// corresponding to the sum of the polynomials defining the given keys.
///
/// Assumes the slice is non-empty, the thresholds agree, the keys were dealt
/// by different processes, and they have the same owner. The resulting key
/// has undefined dealer and encrypted secret keys.
pub fn create_multikey(tks: &[ThresholdKey]) -> ThresholdKey {
    let n_proc = tks[0].vks.len();
    let mut sk = None;
    let mut global_vk = None;
    let mut vks: Vec<Option<bn256::VerificationKey>> = vec![None; n_proc];
    for tk in tks {
        if let Some(own) = &tk.sk {
            sk = Some(bn256::add_secret_keys(sk.as_ref(), own));
        }
        global_vk = Some(bn256::add_verification_keys(global_vk.as_ref(), &tk.global_vk));
        for (acc, vk) in vks.iter_mut().zip(&tk.vks) {
            *acc = Some(bn256::add_verification_keys(acc.as_ref(), vk));
        }
    }
    ThresholdKey {
        owner: tks[0].owner,
        dealer: 0,
        threshold: tks[0].threshold,
        global_vk: global_vk.expect("the slice of summed keys is non-empty"),
        vks: vks
            .into_iter()
            .map(|vk| vk.expect("every key covers every party"))
            .collect(),
        enc_sks: Vec::new(),
        sk,
    }
}

/// Returns a share for a multikey given shares for the keys forming it.
/// All the shares have to be created by the same process and the slice has
/// to be non-empty.
pub fn sum_shares(shs: &[Share]) -> Share {
    let mut sum = None;
    for sh in shs {
        sum = Some(bn256::add_signatures(sum.as_ref(), &sh.sgn));
    }
    Share {
        owner: shs[0].owner,
        sgn: sum.expect("the slice of summed shares is non-empty"),
    }
}

/// A multikey together with the set of processes allowed to emit shares.
///
/// Dealt keys of byzantine dealers may be broken for some owners; restricting
/// share creation to the providers whose keys were verified keeps combining
/// sound.
#[derive(Clone)]
pub struct WeakThresholdKey {
    key: ThresholdKey,
    share_providers: HashSet<u16>,
}

impl WeakThresholdKey {
    /// Sums the given threshold keys and restricts share creation to the
    /// given providers.
    pub fn new(tks: &[ThresholdKey], share_providers: HashSet<u16>) -> Self {
        WeakThresholdKey {
            key: create_multikey(tks),
            share_providers,
        }
    }

    /// Creates this party's share, or `None` when it is not among the share
    /// providers or holds no valid secret key.
    pub fn create_share(&self, msg: &[u8]) -> Option<Share> {
        if !self.share_providers.contains(&self.key.owner) {
            return None;
        }
        self.key.create_share(msg)
    }

    pub fn verify_share(&self, share: &Share, msg: &[u8]) -> bool {
        self.key.verify_share(share, msg)
    }

    pub fn combine_shares(&self, shares: &[Share]) -> Option<Signature> {
        self.key.combine_shares(shares)
    }

    pub fn verify_signature(&self, s: &Signature, msg: &[u8]) -> bool {
        self.key.verify_signature(s, msg)
    }

    pub fn poly_verify(&self, pv: &PolyVerifier) -> bool {
        self.key.poly_verify(pv)
    }

    pub fn threshold(&self) -> u16 {
        self.key.threshold
    }

    pub fn share_providers(&self) -> &HashSet<u16> {
        &self.share_providers
    }
}

#[cfg(test)]
mod tests {
    use super::super::{decode, Tss};
    use super::*;
    use crate::crypto::encrypt::{new_symmetric_key, SymmetricAes};
    use rand::rngs::OsRng;

    const N: u16 = 7;
    const T: u16 = 3;

    fn pairwise_keys() -> Vec<SymmetricAes> {
        (0..N)
            .map(|i| new_symmetric_key(format!("pair {i}").as_bytes()))
            .collect()
    }

    // Keys of every owner, dealt by each of the given dealers.
    fn deal_all(dealers: &[u16], keys: &[SymmetricAes]) -> Vec<Vec<ThresholdKey>> {
        let encoded: Vec<Vec<u8>> = dealers
            .iter()
            .map(|_| Tss::new_random(N, T, &mut OsRng).encrypt(keys).unwrap().encode())
            .collect();
        (0..N)
            .map(|owner| {
                dealers
                    .iter()
                    .zip(&encoded)
                    .map(|(&dealer, enc)| {
                        let (tk, ok) = decode(enc, dealer, owner, &keys[owner as usize]).unwrap();
                        assert!(ok);
                        tk
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn multikey_signs_like_a_dealt_key() {
        let keys = pairwise_keys();
        let per_owner = deal_all(&[0, 1, 2], &keys);
        let multikeys: Vec<ThresholdKey> =
            per_owner.iter().map(|tks| create_multikey(tks)).collect();

        let shares: Vec<Share> = multikeys
            .iter()
            .take(T as usize)
            .map(|mk| mk.create_share(b"msg").unwrap())
            .collect();
        for share in &shares {
            assert!(multikeys[0].verify_share(share, b"msg"));
        }
        let sig = multikeys[0].combine_shares(&shares).unwrap();
        assert!(multikeys[0].verify_signature(&sig, b"msg"));
    }

    #[test]
    fn multikey_share_equals_summed_shares() {
        let keys = pairwise_keys();
        let per_owner = deal_all(&[0, 1], &keys);
        let mk = create_multikey(&per_owner[4]);
        let direct = mk.create_share(b"msg").unwrap();
        let summed = sum_shares(&[
            per_owner[4][0].create_share(b"msg").unwrap(),
            per_owner[4][1].create_share(b"msg").unwrap(),
        ]);
        assert_eq!(direct, summed);
    }

    #[test]
    fn wtk_restricts_share_providers() {
        let keys = pairwise_keys();
        let per_owner = deal_all(&[0, 1], &keys);
        let providers: HashSet<u16> = [0, 1, 2, 3].into_iter().collect();
        let wtks: Vec<WeakThresholdKey> = per_owner
            .iter()
            .map(|tks| WeakThresholdKey::new(tks, providers.clone()))
            .collect();

        assert!(wtks[6].create_share(b"msg").is_none());
        let shares: Vec<Share> = wtks[..T as usize]
            .iter()
            .map(|wtk| wtk.create_share(b"msg").unwrap())
            .collect();
        let sig = wtks[0].combine_shares(&shares).unwrap();
        assert!(wtks[0].verify_signature(&sig, b"msg"));
        assert!(wtks[6].verify_signature(&sig, b"msg"));
    }
}
