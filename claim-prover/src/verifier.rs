//! Claim proof verification
//!
//! A [`Verifier`] checks proofs for one circuit type. It recomputes the
//! public inputs from the claim parameters, so a proof only verifies for the
//! exact identifier, destination and chain it was generated for.
//! [`MultiVerifier`] dispatches by circuit type.
//!
//! Verifying keys travel as a [`VerifyingKeySet`]:
//!
//! ```text
//! "QBVK" | version u8 | count u8 | count × (u32 BE length | bundle)
//! bundle = circuit tag u8 | SRS fingerprint (32) | u32 BE length | JSON metadata | raw verifying key
//! ```

use halo2_base::{
    gates::circuit::{builder::BaseCircuitBuilder, BaseCircuitParams},
    halo2_proofs::{
        halo2curves::bn256::{Bn256, Fr, G1Affine},
        plonk::VerifyingKey,
        poly::kzg::commitment::ParamsKZG,
        SerdeFormat,
    },
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use claim_circuits::CircuitConfig;
use claim_core::{decode_proof, CircuitType, ClaimError, ClaimParams, Proof, Result};

use crate::backend::{self, byte_instances};
use crate::srs::{Srs, SrsOrigin};

const KEY_SET_MAGIC: &[u8; 4] = b"QBVK";
const KEY_SET_VERSION: u8 = 1;

fn malformed(msg: impl Into<String>) -> ClaimError {
    ClaimError::SetupIntegrityFailure(format!("verifying key: {}", msg.into()))
}

/// Cursor over a byte slice that fails instead of panicking when short
struct ByteReader<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteReader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < n {
            return Err(malformed(format!(
                "needed {n} more bytes, {} left",
                self.bytes.len()
            )));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.bytes)
    }
}

#[derive(Serialize, Deserialize)]
struct BundleMetadata {
    origin: SrsOrigin,
    config: CircuitConfig,
    circuit_params: BaseCircuitParams,
}

/// A verifying key plus what is needed to use it on its own
#[derive(Clone)]
pub struct VerifyingKeyBundle {
    circuit_type: CircuitType,
    config: CircuitConfig,
    circuit_params: BaseCircuitParams,
    origin: SrsOrigin,
    srs_fingerprint: [u8; 32],
    vk: VerifyingKey<G1Affine>,
}

impl VerifyingKeyBundle {
    pub fn new(
        circuit_type: CircuitType,
        config: CircuitConfig,
        circuit_params: BaseCircuitParams,
        vk: VerifyingKey<G1Affine>,
        srs: &Srs,
    ) -> Self {
        Self {
            circuit_type,
            config,
            circuit_params,
            origin: srs.origin(),
            srs_fingerprint: srs.fingerprint(),
            vk,
        }
    }

    pub fn circuit_type(&self) -> CircuitType {
        self.circuit_type
    }

    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    pub fn origin(&self) -> SrsOrigin {
        self.origin
    }

    pub fn srs_fingerprint(&self) -> &[u8; 32] {
        &self.srs_fingerprint
    }

    pub fn verifying_key(&self) -> &VerifyingKey<G1Affine> {
        &self.vk
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let metadata = serde_json::to_vec(&BundleMetadata {
            origin: self.origin,
            config: self.config,
            circuit_params: self.circuit_params.clone(),
        })
        .map_err(|e| malformed(e.to_string()))?;

        let mut out = vec![self.circuit_type.wire_tag()];
        out.extend_from_slice(&self.srs_fingerprint);
        out.extend_from_slice(&(metadata.len() as u32).to_be_bytes());
        out.extend_from_slice(&metadata);
        out.extend(self.vk.to_bytes(SerdeFormat::RawBytes));
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader { bytes };
        let circuit_type = CircuitType::from_wire_tag(reader.u8()?)
            .map_err(|e| malformed(e.to_string()))?;
        let mut srs_fingerprint = [0u8; 32];
        srs_fingerprint.copy_from_slice(reader.take(32)?);
        let metadata_len = reader.u32()? as usize;
        let metadata: BundleMetadata = serde_json::from_slice(reader.take(metadata_len)?)
            .map_err(|e| malformed(format!("metadata: {e}")))?;

        // Curve points are checked while reading
        let mut raw = reader.rest();
        let vk = VerifyingKey::<G1Affine>::read::<_, BaseCircuitBuilder<Fr>>(
            &mut raw,
            SerdeFormat::RawBytes,
            metadata.circuit_params.clone(),
        )
        .map_err(|e| malformed(format!("{circuit_type}: {e}")))?;
        if !raw.is_empty() {
            return Err(malformed(format!("{} trailing bytes", raw.len())));
        }

        Ok(Self {
            circuit_type,
            config: metadata.config,
            circuit_params: metadata.circuit_params,
            origin: metadata.origin,
            srs_fingerprint,
            vk,
        })
    }
}

/// Verifying keys for several circuit types, as loaded at genesis
#[derive(Clone, Default)]
pub struct VerifyingKeySet {
    bundles: BTreeMap<CircuitType, VerifyingKeyBundle>,
}

impl VerifyingKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bundle; each circuit type may appear once
    pub fn insert(&mut self, bundle: VerifyingKeyBundle) -> Result<()> {
        let circuit_type = bundle.circuit_type();
        if self.bundles.contains_key(&circuit_type) {
            return Err(malformed(format!("duplicate key for {circuit_type}")));
        }
        self.bundles.insert(circuit_type, bundle);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn circuit_types(&self) -> impl Iterator<Item = CircuitType> + '_ {
        self.bundles.keys().copied()
    }

    pub fn bundles(&self) -> impl Iterator<Item = &VerifyingKeyBundle> {
        self.bundles.values()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = KEY_SET_MAGIC.to_vec();
        out.push(KEY_SET_VERSION);
        out.push(self.bundles.len() as u8);
        for bundle in self.bundles.values() {
            let bytes = bundle.to_bytes()?;
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            out.extend(bytes);
        }
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader { bytes };
        if reader.take(4)? != KEY_SET_MAGIC {
            return Err(malformed("bad magic"));
        }
        let version = reader.u8()?;
        if version != KEY_SET_VERSION {
            return Err(malformed(format!("unsupported version {version}")));
        }
        let count = reader.u8()?;
        if count == 0 {
            return Err(malformed("empty key set"));
        }

        let mut set = Self::new();
        for _ in 0..count {
            let len = reader.u32()? as usize;
            set.insert(VerifyingKeyBundle::from_bytes(reader.take(len)?)?)?;
        }
        if !reader.rest().is_empty() {
            return Err(malformed("trailing bytes after key set"));
        }
        Ok(set)
    }

    pub fn to_hex(&self) -> Result<String> {
        Ok(hex::encode(self.to_bytes()?))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| malformed(format!("hex: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

/// Verifies claim proofs for one circuit type
#[derive(Clone)]
pub struct Verifier {
    circuit_type: CircuitType,
    vk: Arc<VerifyingKey<G1Affine>>,
    params: Arc<ParamsKZG<Bn256>>,
    origin: SrsOrigin,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("circuit_type", &self.circuit_type)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl Verifier {
    /// Pair a verifying key with the SRS it was generated against
    pub fn new(bundle: &VerifyingKeyBundle, srs: &Srs) -> Result<Self> {
        if srs.fingerprint() != bundle.srs_fingerprint {
            return Err(ClaimError::SetupIntegrityFailure(format!(
                "{} verifying key was generated with SRS {}, got {}",
                bundle.circuit_type,
                hex::encode(bundle.srs_fingerprint),
                hex::encode(srs.fingerprint())
            )));
        }
        if bundle.origin.is_insecure() || srs.origin().is_insecure() {
            tracing::warn!(
                "{} verifier uses an INSECURE test setup; proofs prove nothing",
                bundle.circuit_type
            );
        }
        Ok(Self {
            circuit_type: bundle.circuit_type,
            vk: Arc::new(bundle.vk.clone()),
            params: srs.shared_params(),
            origin: srs.origin(),
        })
    }

    pub fn circuit_type(&self) -> CircuitType {
        self.circuit_type
    }

    pub fn origin(&self) -> SrsOrigin {
        self.origin
    }

    /// Verify `proof` for the claim described by `params`
    pub fn verify(&self, proof: &Proof, params: &ClaimParams) -> Result<()> {
        if params.circuit_type() != self.circuit_type {
            return Err(ClaimError::VerificationMismatch(format!(
                "claim is for {}, verifier is for {}",
                params.circuit_type(),
                self.circuit_type
            )));
        }

        let expected = params.public_inputs();
        if proof.public_inputs() != expected.as_slice() {
            return Err(ClaimError::VerificationMismatch(
                "proof public inputs do not match the claim".into(),
            ));
        }

        backend::verify(
            &self.params,
            &self.vk,
            proof.proof_data(),
            &byte_instances(&expected),
        )?;
        tracing::info!(
            "Verified {} claim for destination {} on {}",
            self.circuit_type,
            params.destination,
            params.chain_id
        );
        Ok(())
    }

    /// Decode a framed proof and verify it
    pub fn verify_encoded(&self, bytes: &[u8], params: &ClaimParams) -> Result<()> {
        self.verify(&decode_proof(bytes)?, params)
    }
}

/// One [`Verifier`] per circuit type
#[derive(Debug, Clone, Default)]
pub struct MultiVerifier {
    verifiers: BTreeMap<CircuitType, Verifier>,
}

impl MultiVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build verifiers for every key in `set`
    pub fn from_key_set(set: &VerifyingKeySet, srs: &Srs) -> Result<Self> {
        let mut multi = Self::new();
        for bundle in set.bundles() {
            multi.insert(Verifier::new(bundle, srs)?);
        }
        Ok(multi)
    }

    pub fn insert(&mut self, verifier: Verifier) {
        self.verifiers.insert(verifier.circuit_type(), verifier);
    }

    pub fn get(&self, circuit_type: CircuitType) -> Option<&Verifier> {
        self.verifiers.get(&circuit_type)
    }

    pub fn circuit_types(&self) -> impl Iterator<Item = CircuitType> + '_ {
        self.verifiers.keys().copied()
    }

    pub fn verify(&self, circuit_type: CircuitType, proof: &Proof, params: &ClaimParams) -> Result<()> {
        self.get(circuit_type)
            .ok_or_else(|| {
                ClaimError::VerificationMismatch(format!("no verifying key for {circuit_type}"))
            })?
            .verify(proof, params)
    }

    pub fn verify_encoded(
        &self,
        circuit_type: CircuitType,
        bytes: &[u8],
        params: &ClaimParams,
    ) -> Result<()> {
        self.verify(circuit_type, &decode_proof(bytes)?, params)
    }

    /// P2PKH and P2WPKH claims
    pub fn verify_ecdsa(&self, proof: &Proof, params: &ClaimParams) -> Result<()> {
        self.verify(CircuitType::Ecdsa, proof, params)
    }

    /// P2TR claims
    pub fn verify_schnorr(&self, proof: &Proof, params: &ClaimParams) -> Result<()> {
        self.verify(CircuitType::Schnorr, proof, params)
    }

    /// P2SH-wrapped P2WPKH claims
    pub fn verify_p2sh(&self, proof: &Proof, params: &ClaimParams) -> Result<()> {
        self.verify(CircuitType::P2shP2wpkh, proof, params)
    }

    pub fn verify_p2pk(&self, proof: &Proof, params: &ClaimParams) -> Result<()> {
        self.verify(CircuitType::P2pk, proof, params)
    }

    /// Single-key P2WSH claims
    pub fn verify_p2wsh(&self, proof: &Proof, params: &ClaimParams) -> Result<()> {
        self.verify(CircuitType::P2wshSingleKey, proof, params)
    }
}

/// A bundle around the small multiplication circuit, for exercising key
/// transport without a secp256k1 keygen
#[cfg(test)]
pub(crate) fn test_bundle(circuit_type: CircuitType, srs: &Srs) -> VerifyingKeyBundle {
    use crate::backend::test_circuit;

    let (builder, circuit_params) = test_circuit::keygen_builder();
    let pk = backend::keygen(srs.params(), &builder).unwrap();
    VerifyingKeyBundle::new(
        circuit_type,
        CircuitConfig::new(test_circuit::K, 6),
        circuit_params,
        pk.get_vk().clone(),
        srs,
    )
}
