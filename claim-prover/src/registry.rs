//! Write-once verifier registry
//!
//! The host chain loads its verifying keys once at genesis. After the first
//! successful registration every further attempt fails with
//! [`ClaimError::AlreadyInitialized`], including one with identical bytes.

use std::sync::{Arc, PoisonError, RwLock};

use claim_core::{ClaimError, Result};

use crate::srs::Srs;
use crate::verifier::{MultiVerifier, VerifyingKeySet};

/// Holds at most one [`MultiVerifier`] for the lifetime of the process
#[derive(Debug)]
pub struct VerifierRegistry {
    verifier: RwLock<Option<Arc<MultiVerifier>>>,
}

impl VerifierRegistry {
    pub const fn new() -> Self {
        Self {
            verifier: RwLock::new(None),
        }
    }

    /// Register a serialized [`VerifyingKeySet`]
    ///
    /// The check and the store happen under one write lock, so of two
    /// concurrent registrations exactly one succeeds.
    pub fn register(&self, vk_bytes: &[u8], srs: &Srs) -> Result<()> {
        let mut slot = self.verifier.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(ClaimError::AlreadyInitialized);
        }

        let set = VerifyingKeySet::from_bytes(vk_bytes)?;
        let verifier = MultiVerifier::from_key_set(&set, srs)?;
        tracing::info!(
            "Registered verifying keys for {:?} ({})",
            verifier.circuit_types().collect::<Vec<_>>(),
            srs.origin()
        );
        *slot = Some(Arc::new(verifier));
        Ok(())
    }

    /// Register the hex form of a [`VerifyingKeySet`], as found in genesis
    pub fn register_hex(&self, vk_hex: &str, srs: &Srs) -> Result<()> {
        let bytes = hex::decode(vk_hex.trim())
            .map_err(|e| ClaimError::SetupIntegrityFailure(format!("verifying key hex: {e}")))?;
        self.register(&bytes, srs)
    }

    pub fn get_verifier(&self) -> Option<Arc<MultiVerifier>> {
        self.verifier
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_registered(&self) -> bool {
        self.get_verifier().is_some()
    }

    #[cfg(test)]
    pub(crate) fn reset(&self) {
        *self.verifier.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Default for VerifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: VerifierRegistry = VerifierRegistry::new();

/// Register the process-wide verifying keys
pub fn register_verifier(vk_bytes: &[u8], srs: &Srs) -> Result<()> {
    REGISTRY.register(vk_bytes, srs)
}

/// The process-wide verifier, once registered
pub fn registered_verifier() -> Option<Arc<MultiVerifier>> {
    REGISTRY.get_verifier()
}

#[cfg(test)]
pub(crate) fn reset_registry() {
    REGISTRY.reset();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_circuit::K;
    use crate::verifier::test_bundle;
    use claim_core::CircuitType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key_set_bytes(srs: &Srs, types: &[CircuitType]) -> Vec<u8> {
        let mut set = VerifyingKeySet::new();
        for t in types {
            set.insert(test_bundle(*t, srs)).unwrap();
        }
        set.to_bytes().unwrap()
    }

    #[test]
    fn test_register_once() {
        let srs = Srs::insecure_test(K);
        let vk1 = key_set_bytes(&srs, &[CircuitType::Ecdsa]);
        let vk2 = key_set_bytes(&srs, &[CircuitType::Ecdsa, CircuitType::P2pk]);
        let registry = VerifierRegistry::new();

        assert!(registry.get_verifier().is_none());
        registry.register(&vk1, &srs).unwrap();

        assert!(matches!(registry.register(&vk2, &srs), Err(ClaimError::AlreadyInitialized)));
        assert!(matches!(registry.register(&vk1, &srs), Err(ClaimError::AlreadyInitialized)));
        assert!(matches!(
            registry.register_hex(&hex::encode(&vk1), &srs),
            Err(ClaimError::AlreadyInitialized)
        ));

        let verifier = registry.get_verifier().unwrap();
        assert_eq!(verifier.circuit_types().collect::<Vec<_>>(), vec![CircuitType::Ecdsa]);
    }

    #[test]
    fn test_failed_registration_leaves_registry_unset() {
        let srs = Srs::insecure_test(K);
        let registry = VerifierRegistry::new();

        assert!(registry.register(b"not a key set", &srs).is_err());
        assert!(registry.register_hex("zz", &srs).is_err());
        // keys generated against another SRS
        let other = Srs::insecure_test(K);
        assert!(matches!(
            registry.register(&key_set_bytes(&other, &[CircuitType::Ecdsa]), &srs),
            Err(ClaimError::SetupIntegrityFailure(_))
        ));
        assert!(!registry.is_registered());

        registry
            .register_hex(&hex::encode(key_set_bytes(&srs, &[CircuitType::Schnorr])), &srs)
            .unwrap();
        assert!(registry.is_registered());
    }

    #[test]
    fn test_concurrent_registration_has_one_winner() {
        let srs = Srs::insecure_test(K);
        let bytes = key_set_bytes(&srs, &[CircuitType::Ecdsa]);
        let registry = VerifierRegistry::new();
        let wins = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    if registry.register(&bytes, &srs).is_ok() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });
        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_is_test_only_escape_hatch() {
        let srs = Srs::insecure_test(K);
        let bytes = key_set_bytes(&srs, &[CircuitType::Ecdsa]);

        reset_registry();
        register_verifier(&bytes, &srs).unwrap();
        assert!(registered_verifier().is_some());
        assert!(matches!(register_verifier(&bytes, &srs), Err(ClaimError::AlreadyInitialized)));

        reset_registry();
        assert!(registered_verifier().is_none());
    }
}
