//! Proving and Verifying Key Generation
//!
//! Handles generation, caching, and loading of the per-circuit setup
//! artifacts: the constraint system description, the proving key and the
//! verifying key. The SRS itself is supplied by the caller.

use anyhow::{bail, Context};
use halo2_base::{
    gates::circuit::{
        builder::BaseCircuitBuilder, BaseCircuitParams, CircuitBuilderStage,
    },
    halo2_proofs::{
        halo2curves::bn256::{Fr, G1Affine},
        plonk::{ProvingKey, VerifyingKey},
        SerdeFormat,
    },
};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use claim_circuits::{CircuitConfig, ClaimCircuit};
use claim_core::{CircuitType, ClaimError, Result};

use crate::backend;
use crate::ceremony::{load_ceremony_srs, CeremonyConfig};
use crate::srs::Srs;
use crate::verifier::VerifyingKeyBundle;

/// Configuration for key generation
#[derive(Debug, Clone)]
pub struct SetupConfig {
    /// Circuit layout parameters
    pub circuit: CircuitConfig,
    /// Directory to cache keys
    pub cache_dir: PathBuf,
}

impl SetupConfig {
    pub fn new(circuit: CircuitConfig, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            circuit,
            cache_dir: cache_dir.into(),
        }
    }

    fn stem(&self, circuit_type: CircuitType) -> String {
        format!("{}_k{}", circuit_type.name(), self.circuit.k)
    }

    /// Get path to cached constraint system file
    fn cs_path(&self, circuit_type: CircuitType) -> PathBuf {
        self.cache_dir.join(format!("{}_cs.json", self.stem(circuit_type)))
    }

    /// Get path to cached verifying key file
    fn vk_path(&self, circuit_type: CircuitType) -> PathBuf {
        self.cache_dir.join(format!("{}_vk.bin", self.stem(circuit_type)))
    }

    /// Get path to cached proving key file
    fn pk_path(&self, circuit_type: CircuitType) -> PathBuf {
        self.cache_dir.join(format!("{}_pk.bin", self.stem(circuit_type)))
    }
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            circuit: CircuitConfig::default(),
            cache_dir: PathBuf::from(".cache/claim-keys"),
        }
    }
}

/// Everything needed to lay the circuit out again at proving time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSystem {
    pub circuit_type: CircuitType,
    pub config: CircuitConfig,
    pub circuit_params: BaseCircuitParams,
    pub break_points: Vec<Vec<usize>>,
    /// Hex SHA-256 fingerprint of the SRS the keys were generated with
    pub srs_fingerprint: String,
}

impl ConstraintSystem {
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| ClaimError::Backend(format!("constraint system encoding: {e}")))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| ClaimError::Backend(format!("constraint system decoding: {e}")))
    }
}

/// Setup artifacts for one circuit type
pub struct SetupResult {
    pub constraint_system: ConstraintSystem,
    pub proving_key: Arc<ProvingKey<G1Affine>>,
    pub srs: Srs,
}

impl std::fmt::Debug for SetupResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupResult")
            .field("constraint_system", &self.constraint_system)
            .field("srs", &self.srs)
            .finish_non_exhaustive()
    }
}

impl SetupResult {
    /// Load or generate keys based on configuration
    ///
    /// If cached keys exist and are valid, loads them from disk.
    /// Otherwise, generates new keys and caches them.
    pub fn load_or_generate(
        circuit_type: CircuitType,
        srs: &Srs,
        config: &SetupConfig,
    ) -> Result<Self> {
        if Self::cache_exists(circuit_type, config) {
            tracing::info!("Found cached {} keys, attempting to load...", circuit_type);
            match Self::load_from_cache(circuit_type, srs, config) {
                Ok(setup) => return Ok(setup),
                Err(e) => {
                    tracing::warn!("Failed to load cached keys: {:#}. Regenerating...", e);
                }
            }
        }

        let setup = Self::generate(circuit_type, srs, config)?;
        setup
            .save_to_cache(config)
            .context("Failed to cache generated keys")?;
        Ok(setup)
    }

    /// Generate new keys (bypasses cache)
    pub fn generate(circuit_type: CircuitType, srs: &Srs, config: &SetupConfig) -> Result<Self> {
        let circuit_config = config.circuit;
        circuit_config.validate()?;
        if srs.k() != circuit_config.k {
            return Err(ClaimError::SetupIntegrityFailure(format!(
                "SRS has k={}, circuit needs k={}",
                srs.k(),
                circuit_config.k
            )));
        }
        tracing::info!(
            "Generating {} keys for k={}, lookup_bits={} ({})",
            circuit_type,
            circuit_config.k,
            circuit_config.lookup_bits,
            srs.origin()
        );

        // Lay the circuit out with a fixed valid claim
        let circuit = ClaimCircuit::sample(circuit_type, circuit_config)?;
        let mut builder = BaseCircuitBuilder::<Fr>::from_stage(CircuitBuilderStage::Keygen)
            .use_k(circuit_config.k as usize)
            .use_lookup_bits(circuit_config.lookup_bits)
            .use_instance_columns(1);
        circuit.build(&mut builder)?;
        let circuit_params = builder.calculate_params(Some(9));
        tracing::debug!("Circuit parameters: {:?}", circuit_params);

        let proving_key = backend::keygen(srs.params(), &builder)?;
        let break_points = builder.break_points();

        tracing::info!("Key generation complete");
        Ok(Self {
            constraint_system: ConstraintSystem {
                circuit_type,
                config: circuit_config,
                circuit_params,
                break_points,
                srs_fingerprint: hex::encode(srs.fingerprint()),
            },
            proving_key: Arc::new(proving_key),
            srs: srs.clone(),
        })
    }

    /// Load keys from cache
    pub fn load_from_cache(
        circuit_type: CircuitType,
        srs: &Srs,
        config: &SetupConfig,
    ) -> anyhow::Result<Self> {
        tracing::info!("Loading keys from cache: {:?}", config.cache_dir);

        let cs_path = config.cs_path(circuit_type);
        let bytes = fs::read(&cs_path)
            .with_context(|| format!("Failed to read constraint system: {:?}", cs_path))?;
        let constraint_system = ConstraintSystem::from_json(&bytes)
            .with_context(|| format!("Failed to parse constraint system: {:?}", cs_path))?;

        if constraint_system.circuit_type != circuit_type {
            bail!(
                "cached constraint system is for {}, expected {}",
                constraint_system.circuit_type,
                circuit_type
            );
        }
        if constraint_system.config != config.circuit {
            bail!("cached constraint system was generated with a different circuit config");
        }
        if constraint_system.srs_fingerprint != hex::encode(srs.fingerprint()) {
            bail!("cached keys were generated with a different SRS");
        }

        let proving_key = load_pk(&config.pk_path(circuit_type), &constraint_system.circuit_params)
            .context("Failed to load proving key")?;

        tracing::info!("Successfully loaded {} keys from cache", circuit_type);
        Ok(Self {
            constraint_system,
            proving_key: Arc::new(proving_key),
            srs: srs.clone(),
        })
    }

    /// Save keys to cache
    pub fn save_to_cache(&self, config: &SetupConfig) -> anyhow::Result<()> {
        let circuit_type = self.circuit_type();
        fs::create_dir_all(&config.cache_dir).context("Failed to create cache directory")?;

        tracing::info!("Saving keys to cache: {:?}", config.cache_dir);

        let cs_path = config.cs_path(circuit_type);
        fs::write(&cs_path, self.constraint_system.to_json()?)
            .with_context(|| format!("Failed to write constraint system: {:?}", cs_path))?;

        let vk_path = config.vk_path(circuit_type);
        fs::write(&vk_path, self.verifying_key_bundle().to_bytes()?)
            .with_context(|| format!("Failed to write verifying key: {:?}", vk_path))?;

        save_pk(&self.proving_key, &config.pk_path(circuit_type))
            .context("Failed to save proving key")?;

        Ok(())
    }

    /// Check if cached keys exist for given configuration
    pub fn cache_exists(circuit_type: CircuitType, config: &SetupConfig) -> bool {
        config.cs_path(circuit_type).exists()
            && config.vk_path(circuit_type).exists()
            && config.pk_path(circuit_type).exists()
    }

    pub fn circuit_type(&self) -> CircuitType {
        self.constraint_system.circuit_type
    }

    pub fn verifying_key(&self) -> &VerifyingKey<G1Affine> {
        self.proving_key.get_vk()
    }

    /// Verifying key with the metadata a standalone verifier needs
    pub fn verifying_key_bundle(&self) -> VerifyingKeyBundle {
        VerifyingKeyBundle::new(
            self.circuit_type(),
            self.constraint_system.config,
            self.constraint_system.circuit_params.clone(),
            self.verifying_key().clone(),
            &self.srs,
        )
    }

    pub fn proving_key_bytes(&self) -> Vec<u8> {
        self.proving_key.to_bytes(SerdeFormat::RawBytesUnchecked)
    }

    pub fn verifying_key_bytes(&self) -> Result<Vec<u8>> {
        self.verifying_key_bundle().to_bytes()
    }

    pub fn verifying_key_hex(&self) -> Result<String> {
        Ok(hex::encode(self.verifying_key_bytes()?))
    }
}

/// Setup for `circuit_type` over a freshly sampled, INSECURE SRS
///
/// Nothing is cached: the keys only fit this one SRS.
pub fn insecure_test_setup(circuit_type: CircuitType, circuit: CircuitConfig) -> Result<SetupResult> {
    let srs = Srs::insecure_test(circuit.k);
    SetupResult::generate(circuit_type, &srs, &SetupConfig::new(circuit, PathBuf::new()))
}

/// Setup for `circuit_type` over a ceremony SRS, with keys cached in
/// `config.cache_dir`
pub fn ceremony_setup(
    circuit_type: CircuitType,
    ceremony: &CeremonyConfig,
    config: &SetupConfig,
) -> Result<SetupResult> {
    let srs = load_ceremony_srs(ceremony, 1usize << config.circuit.k)?;
    SetupResult::load_or_generate(circuit_type, &srs, config)
}

/// Load proving key from file
fn load_pk(path: &Path, circuit_params: &BaseCircuitParams) -> anyhow::Result<ProvingKey<G1Affine>> {
    let file = File::open(path).with_context(|| format!("Failed to open PK file: {:?}", path))?;
    let mut reader = BufReader::new(file);

    ProvingKey::<G1Affine>::read::<_, BaseCircuitBuilder<Fr>>(
        &mut reader,
        SerdeFormat::RawBytesUnchecked,
        circuit_params.clone(),
    )
    .with_context(|| format!("Failed to deserialize PK from {:?}", path))
}

/// Save proving key to file
fn save_pk(pk: &ProvingKey<G1Affine>, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create PK file: {:?}", path))?;
    let mut writer = BufWriter::new(file);

    pk.write(&mut writer, SerdeFormat::RawBytesUnchecked)
        .with_context(|| format!("Failed to serialize PK to {:?}", path))?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_config_default() {
        let config = SetupConfig::default();
        assert_eq!(config.circuit.k, 19);
        assert_eq!(config.cache_dir, PathBuf::from(".cache/claim-keys"));
    }

    #[test]
    fn test_setup_config_paths() {
        let config = SetupConfig::new(CircuitConfig::new(18, 17), "/tmp/test_keys");

        assert_eq!(
            config.cs_path(CircuitType::Ecdsa),
            PathBuf::from("/tmp/test_keys/ecdsa_k18_cs.json")
        );
        assert_eq!(
            config.vk_path(CircuitType::P2wshSingleKey),
            PathBuf::from("/tmp/test_keys/p2wsh_single_key_k18_vk.bin")
        );
        assert_eq!(
            config.pk_path(CircuitType::Schnorr),
            PathBuf::from("/tmp/test_keys/schnorr_k18_pk.bin")
        );
    }

    #[test]
    fn test_cache_exists_returns_false_for_nonexistent() {
        let dir = tempfile::tempdir().unwrap();
        let config = SetupConfig::new(CircuitConfig::default(), dir.path().join("missing"));
        assert!(!SetupResult::cache_exists(CircuitType::Ecdsa, &config));
    }

    #[test]
    fn test_generate_rejects_srs_size_mismatch() {
        let srs = Srs::insecure_test(10);
        let result = SetupResult::generate(CircuitType::Ecdsa, &srs, &SetupConfig::default());
        assert!(matches!(result, Err(ClaimError::SetupIntegrityFailure(_))));
    }

    #[test]
    fn test_constraint_system_json() {
        let cs = ConstraintSystem {
            circuit_type: CircuitType::P2pk,
            config: CircuitConfig::default(),
            circuit_params: BaseCircuitParams {
                k: 19,
                num_advice_per_phase: vec![4],
                num_fixed: 1,
                num_lookup_advice_per_phase: vec![1],
                lookup_bits: Some(18),
                num_instance_columns: 1,
            },
            break_points: vec![vec![1000, 2000]],
            srs_fingerprint: "00".repeat(32),
        };
        let decoded = ConstraintSystem::from_json(&cs.to_json().unwrap()).unwrap();
        assert_eq!(format!("{decoded:?}"), format!("{cs:?}"));
        assert!(ConstraintSystem::from_json(b"{}").is_err());
    }

    // Full secp256k1 keygen; exercised end to end in tests/claim_flow.rs
    #[test]
    #[ignore]
    fn test_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = SetupConfig::new(CircuitConfig::default(), dir.path());
        let srs = Srs::insecure_test(config.circuit.k);

        let generated = SetupResult::load_or_generate(CircuitType::Ecdsa, &srs, &config).unwrap();
        assert!(SetupResult::cache_exists(CircuitType::Ecdsa, &config));

        let loaded = SetupResult::load_from_cache(CircuitType::Ecdsa, &srs, &config).unwrap();
        assert_eq!(
            format!("{:?}", loaded.constraint_system),
            format!("{:?}", generated.constraint_system)
        );
        assert_eq!(
            loaded.verifying_key_bytes().unwrap(),
            generated.verifying_key_bytes().unwrap()
        );

        // a different SRS invalidates the cache
        let other = Srs::insecure_test(config.circuit.k);
        assert!(SetupResult::load_from_cache(CircuitType::Ecdsa, &other, &config).is_err());

        // a corrupt proving key falls back to regeneration
        fs::write(config.pk_path(CircuitType::Ecdsa), b"garbage").unwrap();
        let regenerated = SetupResult::load_or_generate(CircuitType::Ecdsa, &srs, &config).unwrap();
        assert_eq!(
            regenerated.constraint_system.break_points,
            generated.constraint_system.break_points
        );
    }
}
