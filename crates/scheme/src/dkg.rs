// Path: crates/scheme/src/dkg.rs
//! Two-phase DKG ceremony driver.
//!
//! Phase A generates per-party auxiliary info (Paillier primes, the
//! expensive part: ~30-60 s per party unless primes are pregenerated).
//! Phase B generates the threshold ECDSA key shares. All parties run
//! locally via [`simulate`](crate::simulate); the caller distributes the
//! resulting shares to the signer, the server's share store, and the user.

use alloy_primitives::Address;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use cggmp24::key_share::AnyKeyShare;
use cggmp24::security_level::SecurityLevel128;
use cggmp24::supported_curves::Secp256k1;

use warden_crypto::address::address_from_compressed;
use warden_types::error::SchemeError;

use crate::simulate;

/// One party's key material from a ceremony, serialized and zeroizing.
pub struct DkgShare {
    /// Serialized core key share (serde_json).
    pub core_share: Zeroizing<Vec<u8>>,
    /// Serialized auxiliary info (serde_json).
    pub aux_info: Zeroizing<Vec<u8>>,
}

/// Output of a complete ceremony.
pub struct DkgOutput {
    /// One share per party, index 0..n (0 signer, 1 server, 2 user).
    pub shares: Vec<DkgShare>,
    /// The shared 33-byte compressed public key.
    pub public_key: [u8; 33],
    /// The Ethereum address the wallet lives at.
    pub address: Address,
}

/// Pre-generates one party's worth of Paillier primes. Call ahead of time
/// (background worker) and feed the results to [`run_with_primes`].
pub fn pregenerate_primes() -> Result<Zeroizing<Vec<u8>>, SchemeError> {
    let primes: cggmp24::PregeneratedPrimes<SecurityLevel128> =
        cggmp24::PregeneratedPrimes::generate(&mut OsRng);
    serde_json::to_vec(&primes)
        .map(Zeroizing::new)
        .map_err(|e| SchemeError::CreateSession(format!("serialize primes: {e}")))
}

/// Runs a full ceremony, generating primes inline.
pub fn run(eid: &[u8], n: u16, threshold: u16) -> Result<DkgOutput, SchemeError> {
    let mut primes = Vec::with_capacity(n as usize);
    for _ in 0..n {
        primes.push(cggmp24::PregeneratedPrimes::generate(&mut OsRng));
    }
    ceremony(eid, n, threshold, primes)
}

/// Runs a full ceremony from pregenerated primes (the fast path).
pub fn run_with_primes(
    eid: &[u8],
    n: u16,
    threshold: u16,
    serialized_primes: &[Zeroizing<Vec<u8>>],
) -> Result<DkgOutput, SchemeError> {
    if serialized_primes.len() < n as usize {
        return Err(SchemeError::CreateSession(format!(
            "need {} sets of primes, got {}",
            n,
            serialized_primes.len()
        )));
    }

    let mut primes = Vec::with_capacity(n as usize);
    for (i, bytes) in serialized_primes.iter().take(n as usize).enumerate() {
        let p: cggmp24::PregeneratedPrimes<SecurityLevel128> = serde_json::from_slice(bytes)
            .map_err(|e| SchemeError::CreateSession(format!("primes for party {i}: {e}")))?;
        primes.push(p);
    }
    ceremony(eid, n, threshold, primes)
}

fn ceremony(
    eid: &[u8],
    n: u16,
    threshold: u16,
    primes: Vec<cggmp24::PregeneratedPrimes<SecurityLevel128>>,
) -> Result<DkgOutput, SchemeError> {
    if n < 2 {
        return Err(SchemeError::CreateSession("n must be at least 2".into()));
    }
    if threshold < 2 || threshold > n {
        return Err(SchemeError::CreateSession(format!(
            "threshold must be in [2, {n}], got {threshold}"
        )));
    }

    // Phase A: auxiliary info generation.
    let mut aux_parties = Vec::new();
    for (i, party_primes) in primes.into_iter().enumerate() {
        let eid_owned = eid.to_vec();
        aux_parties.push(round_based::state_machine::wrap_protocol(
            move |party| async move {
                let mut rng = OsRng;
                let eid = cggmp24::ExecutionId::new(&eid_owned);
                cggmp24::aux_info_gen(eid, i as u16, n, party_primes)
                    .start(&mut rng, party)
                    .await
            },
        ));
    }

    let aux_results =
        simulate::run(aux_parties).map_err(|e| SchemeError::CreateSession(format!("aux_info_gen: {e}")))?;

    let mut aux_infos = Vec::new();
    for (i, result) in aux_results.into_iter().enumerate() {
        let aux = result.map_err(|e| {
            SchemeError::CreateSession(format!("aux_info_gen party {i} failed: {e:?}"))
        })?;
        aux_infos.push(aux);
    }

    // Phase B: key generation.
    let mut kg_parties = Vec::new();
    for i in 0..n {
        let eid_owned = eid.to_vec();
        kg_parties.push(round_based::state_machine::wrap_protocol(
            move |party| async move {
                let mut rng = OsRng;
                let eid = cggmp24::ExecutionId::new(&eid_owned);
                cggmp24::keygen::<Secp256k1>(eid, i, n)
                    .set_threshold(threshold)
                    .start(&mut rng, party)
                    .await
            },
        ));
    }

    let kg_results =
        simulate::run(kg_parties).map_err(|e| SchemeError::CreateSession(format!("keygen: {e}")))?;

    let mut core_shares = Vec::new();
    for (i, result) in kg_results.into_iter().enumerate() {
        let share = result
            .map_err(|e| SchemeError::CreateSession(format!("keygen party {i} failed: {e:?}")))?;
        core_shares.push(share);
    }

    // The shared public key is identical across parties.
    let point = core_shares[0].shared_public_key();
    let encoded = point.to_bytes(true);
    let mut public_key = [0u8; 33];
    public_key.copy_from_slice(encoded.as_bytes());

    let address = address_from_compressed(&public_key)
        .map_err(|e| SchemeError::CreateSession(format!("derive address: {e}")))?;

    let mut shares = Vec::with_capacity(n as usize);
    for i in 0..n as usize {
        let core = serde_json::to_vec(&core_shares[i])
            .map_err(|e| SchemeError::CreateSession(format!("serialize core share {i}: {e}")))?;
        let aux = serde_json::to_vec(&aux_infos[i])
            .map_err(|e| SchemeError::CreateSession(format!("serialize aux info {i}: {e}")))?;
        shares.push(DkgShare {
            core_share: Zeroizing::new(core),
            aux_info: Zeroizing::new(aux),
        });
    }

    Ok(DkgOutput {
        shares,
        public_key,
        address,
    })
}
