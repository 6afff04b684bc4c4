//! Dealing: polynomial sampling, share encryption, and the wire format.

use ark_ff::{Field, Zero};
use rand::{CryptoRng, RngCore};
use rayon::prelude::*;
use tracing::instrument;

use super::{ThresholdKey, Tss};
use crate::crypto::bn256::curve::random_scalar;
use crate::crypto::bn256::{self, Fr};
use crate::crypto::encrypt::{CipherText, SymmetricKey};
use crate::errors::{CryptoError, Result};

/// Evaluates the polynomial with the given coefficients at `x`.
/// Coefficients are ordered from the highest power down, so the shared
/// secret is the last one.
pub(super) fn poly(coeffs: &[Fr], x: Fr) -> Fr {
    let mut ans = Fr::zero();
    for c in coeffs {
        ans = ans * x + c;
    }
    ans
}

/// The Lagrange coefficient at zero for the share point of `x`, with the
/// evaluation points shifted by one (party `p` holds the evaluation at
/// `p + 1`).
pub(super) fn lagrange(points: &[u16], x: u16) -> Fr {
    let mut num = Fr::from(1u64);
    let mut den = Fr::from(1u64);
    for &p in points {
        if p == x {
            continue;
        }
        num *= -(Fr::from(p as u64) + Fr::from(1u64));
        den *= Fr::from(x as u64) - Fr::from(p as u64);
    }
    num * den.inverse().expect("share points are pairwise distinct")
}

impl Tss {
    /// Builds a threshold signature scheme from the given coefficients.
    /// The threshold is the number of coefficients and the shared secret is
    /// the constant term.
    pub fn new(n_proc: u16, coeffs: &[Fr]) -> Self {
        let threshold = coeffs.len() as u16;
        let secret = coeffs[coeffs.len() - 1];
        let global_vk = bn256::VerificationKey::new(secret);

        let keys: Vec<(bn256::SecretKey, bn256::VerificationKey)> = (0..n_proc)
            .into_par_iter()
            .map(|ind| {
                let secret = poly(coeffs, Fr::from(ind as u64 + 1));
                (bn256::SecretKey::new(secret), bn256::VerificationKey::new(secret))
            })
            .collect();
        let (sks, vks) = keys.into_iter().unzip();

        Tss {
            threshold,
            global_vk,
            vks,
            sks,
        }
    }

    /// Samples a random polynomial of degree `threshold - 1` and builds a
    /// scheme from it.
    pub fn new_random<R: RngCore + CryptoRng>(n_proc: u16, threshold: u16, rng: &mut R) -> Self {
        let coeffs: Vec<Fr> = (0..threshold).map(|_| random_scalar(rng)).collect();
        Tss::new(n_proc, &coeffs)
    }

    /// Encrypts the secret keys under the given per-party encryption keys
    /// and returns the resulting, not yet owned, threshold key.
    #[instrument(level = "debug", skip_all, fields(n_proc = encryption_keys.len(), threshold = self.threshold))]
    pub fn encrypt<K: SymmetricKey>(&self, encryption_keys: &[K]) -> Result<ThresholdKey> {
        let enc_sks = self
            .sks
            .iter()
            .zip(encryption_keys)
            .map(|(sk, key)| key.encrypt(&sk.marshal()))
            .collect::<Result<Vec<_>>>()?;

        Ok(ThresholdKey {
            owner: 0,
            dealer: 0,
            threshold: self.threshold,
            global_vk: self.global_vk.clone(),
            vks: self.vks.clone(),
            enc_sks,
            sk: None,
        })
    }
}

impl ThresholdKey {
    /// Returns the byte representation of this key:
    ///
    /// ```text
    /// [threshold:u16 LE]
    /// [len(globalVK):u32 LE][globalVK]
    /// [n:u32 LE]
    /// n x { [len(vk_i):u32 LE][vk_i] }
    /// n x { [len(encSK_i):u32 LE][encSK_i] }
    /// ```
    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&self.threshold.to_le_bytes());

        let gvk = self.global_vk.marshal();
        data.extend_from_slice(&(gvk.len() as u32).to_le_bytes());
        data.extend_from_slice(&gvk);

        data.extend_from_slice(&(self.vks.len() as u32).to_le_bytes());
        for vk in &self.vks {
            let vkm = vk.marshal();
            data.extend_from_slice(&(vkm.len() as u32).to_le_bytes());
            data.extend_from_slice(&vkm);
        }
        for enc_sk in &self.enc_sks {
            data.extend_from_slice(&(enc_sk.len() as u32).to_le_bytes());
            data.extend_from_slice(enc_sk);
        }
        data
    }

    /// Checks whether the encrypted secret key of the given pid decrypts
    /// correctly under the provided pairwise key.
    pub fn check_secret_key<K: SymmetricKey>(&self, pid: u16, decryption_key: &K) -> bool {
        decrypt_secret_key(
            &self.enc_sks[pid as usize],
            &self.vks[pid as usize],
            decryption_key,
        )
        .is_ok()
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.data.len() < self.pos + n {
            return Err(CryptoError::MalformedTss);
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn take_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().expect("slice of length 2")))
    }

    fn take_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().expect("slice of length 4")))
    }
}

/// Decodes a threshold key obtained from the dealer and decrypts the owner's
/// share with the given pairwise key.
///
/// Returns the key and whether the owner's secret key was correctly encoded
/// and matches the corresponding verification key. A broken owner share is
/// not fatal: the key remains usable for verification.
#[instrument(level = "debug", skip(data, decryption_key), fields(len = data.len()))]
pub fn decode<K: SymmetricKey>(
    data: &[u8],
    dealer: u16,
    owner: u16,
    decryption_key: &K,
) -> Result<(ThresholdKey, bool)> {
    let mut cur = Cursor { data, pos: 0 };

    let threshold = cur.take_u16()?;
    let gvk_len = cur.take_u32()? as usize;
    let global_vk =
        bn256::VerificationKey::unmarshal(cur.take(gvk_len)?).map_err(|_| CryptoError::MalformedTss)?;

    let n_proc = cur.take_u32()? as usize;
    if owner as usize >= n_proc {
        return Err(CryptoError::MalformedTss);
    }
    let mut vks = Vec::with_capacity(n_proc);
    for _ in 0..n_proc {
        let vk_len = cur.take_u32()? as usize;
        let vk = bn256::VerificationKey::unmarshal(cur.take(vk_len)?)
            .map_err(|_| CryptoError::MalformedTss)?;
        vks.push(vk);
    }
    let mut enc_sks: Vec<CipherText> = Vec::with_capacity(n_proc);
    for _ in 0..n_proc {
        let sk_len = cur.take_u32()? as usize;
        enc_sks.push(cur.take(sk_len)?.to_vec());
    }

    let sk = decrypt_secret_key(&enc_sks[owner as usize], &vks[owner as usize], decryption_key);
    let owner_valid = sk.is_ok();

    Ok((
        ThresholdKey {
            owner,
            dealer,
            threshold,
            global_vk,
            vks,
            enc_sks,
            sk: sk.ok(),
        },
        owner_valid,
    ))
}

fn decrypt_secret_key<K: SymmetricKey>(
    data: &CipherText,
    vk: &bn256::VerificationKey,
    decryption_key: &K,
) -> Result<bn256::SecretKey> {
    let decrypted = decryption_key.decrypt(data)?;
    let sk = bn256::SecretKey::unmarshal(&decrypted)?;
    if !bn256::verify_keys(vk, &sk) {
        return Err(CryptoError::VerificationFailed);
    }
    Ok(sk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::encrypt::new_symmetric_key;
    use rand::rngs::OsRng;

    fn committee_keys(n: usize) -> Vec<crate::crypto::encrypt::SymmetricAes> {
        (0..n)
            .map(|i| new_symmetric_key(format!("pairwise key {i}").as_bytes()))
            .collect()
    }

    #[test]
    fn encode_decode_round_trips() {
        let keys = committee_keys(10);
        let tss = Tss::new_random(10, 3, &mut OsRng);
        let tk = tss.encrypt(&keys).unwrap();
        let encoded = tk.encode();

        for owner in 0..10u16 {
            let (decoded, ok) = decode(&encoded, 5, owner, &keys[owner as usize]).unwrap();
            assert!(ok, "owner {owner} share should decrypt");
            assert_eq!(decoded.threshold(), 3);
            assert_eq!(decoded.dealer(), 5);
            assert_eq!(decoded.owner(), owner);
            assert_eq!(decoded.global_vk(), tk.global_vk());
        }
    }

    #[test]
    fn wrong_pairwise_key_is_not_fatal() {
        let keys = committee_keys(4);
        let tss = Tss::new_random(4, 2, &mut OsRng);
        let encoded = tss.encrypt(&keys).unwrap().encode();

        let intruder = new_symmetric_key(b"not the right key");
        let (decoded, ok) = decode(&encoded, 0, 1, &intruder).unwrap();
        assert!(!ok);
        // The key still verifies shares of parties with intact keys.
        let (full, _) = decode(&encoded, 0, 0, &keys[0]).unwrap();
        let share = full.create_share(b"msg").unwrap();
        assert!(decoded.verify_share(&share, b"msg"));
    }

    #[test]
    fn truncated_stream_is_malformed() {
        let keys = committee_keys(4);
        let tss = Tss::new_random(4, 2, &mut OsRng);
        let encoded = tss.encrypt(&keys).unwrap().encode();
        for cut in [0, 1, 5, encoded.len() / 2, encoded.len() - 1] {
            assert_eq!(
                decode(&encoded[..cut], 0, 0, &keys[0]).err(),
                Some(CryptoError::MalformedTss),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn check_secret_key_spots_good_and_bad_keys() {
        let keys = committee_keys(4);
        let tss = Tss::new_random(4, 2, &mut OsRng);
        let encoded = tss.encrypt(&keys).unwrap().encode();
        let (tk, _) = decode(&encoded, 0, 0, &keys[0]).unwrap();
        assert!(tk.check_secret_key(2, &keys[2]));
        assert!(!tk.check_secret_key(2, &keys[3]));
    }
}
