//! Oracle registry - reporter registration and index assignment.
//!
//! Each oracle pays a fixed fee and receives three distinct pseudo-random
//! indexes. A dispatched request carries one random index, so only the
//! unpredictable subset of oracles holding that index may answer it.

use std::collections::HashMap;
use std::sync::Arc;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::info;

use crate::config::OracleConfig;
use crate::random::EntropySource;
use crate::types::{ConsensusError, Oracle, Result};

/// Tracks registered oracles and their assigned index sets.
pub struct OracleRegistry {
    /// Configuration
    config: OracleConfig,
    /// Entropy mixed into index derivation
    entropy: Arc<dyn EntropySource>,
    /// Oracles by identity
    oracles: Arc<RwLock<HashMap<String, Oracle>>>,
    /// Monotonic registration counter, part of the derivation input
    registrations: Arc<RwLock<u64>>,
}

impl OracleRegistry {
    /// Create an empty registry.
    pub fn new(config: OracleConfig, entropy: Arc<dyn EntropySource>) -> Self {
        Self {
            config,
            entropy,
            oracles: Arc::new(RwLock::new(HashMap::new())),
            registrations: Arc::new(RwLock::new(0)),
        }
    }

    /// Register an oracle. Requires the registration fee; assigns the
    /// index set once, immutable thereafter.
    pub async fn register(&self, identity: &str, fee: u128) -> Result<[u8; 3]> {
        if fee < self.config.registration_fee {
            return Err(ConsensusError::InsufficientFee {
                amount: fee,
                required: self.config.registration_fee,
            });
        }

        let mut oracles = self.oracles.write().await;
        if oracles.contains_key(identity) {
            return Err(ConsensusError::AlreadyRegistered(identity.to_string()));
        }

        let counter = {
            let mut registrations = self.registrations.write().await;
            *registrations += 1;
            *registrations
        };

        let indexes = derive_indexes(
            self.entropy.seed(),
            counter,
            identity,
            self.config.index_range,
        );

        oracles.insert(
            identity.to_string(),
            Oracle {
                identity: identity.to_string(),
                indexes,
                registered_at: Utc::now(),
            },
        );

        info!(oracle = %identity, indexes = ?indexes, "Oracle registered");
        Ok(indexes)
    }

    /// Assigned index set of an oracle.
    pub async fn indexes(&self, identity: &str) -> Result<[u8; 3]> {
        self.oracles
            .read()
            .await
            .get(identity)
            .map(|o| o.indexes)
            .ok_or_else(|| ConsensusError::NotRegistered(identity.to_string()))
    }

    /// Whether the identity is a registered oracle.
    pub async fn is_registered(&self, identity: &str) -> bool {
        self.oracles.read().await.contains_key(identity)
    }

    /// Whether the oracle holds the given index. Fails `NotRegistered`
    /// for unknown oracles.
    pub async fn holds_index(&self, identity: &str, index: u8) -> Result<bool> {
        Ok(self.indexes(identity).await?.contains(&index))
    }

    /// Number of registered oracles.
    pub async fn count(&self) -> usize {
        self.oracles.read().await.len()
    }
}

/// Derive three distinct indexes in `0..range` from the seed, the
/// registration counter, and the oracle identity.
///
/// Successive hash rounds are drawn until three distinct values come out,
/// so the result is deterministic for a given input triple.
fn derive_indexes(seed: [u8; 32], counter: u64, identity: &str, range: u8) -> [u8; 3] {
    debug_assert!(range >= 3, "index range must admit three distinct values");

    let mut indexes = [0u8; 3];
    let mut found = 0;
    let mut round: u64 = 0;

    while found < 3 {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(counter.to_be_bytes());
        hasher.update(identity.as_bytes());
        hasher.update(round.to_be_bytes());
        let digest = hasher.finalize();

        for byte in digest {
            let candidate = byte % range;
            if !indexes[..found].contains(&candidate) {
                indexes[found] = candidate;
                found += 1;
                if found == 3 {
                    break;
                }
            }
        }
        round += 1;
    }

    indexes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedEntropy;
    use surety_ledger::WEI_PER_ETHER;

    fn registry() -> OracleRegistry {
        OracleRegistry::new(OracleConfig::default(), Arc::new(ScriptedEntropy::new()))
    }

    #[test]
    fn test_derived_indexes_distinct_and_in_range() {
        for counter in 0..50 {
            let indexes = derive_indexes([7u8; 32], counter, "oracle-x", 10);
            assert!(indexes.iter().all(|i| *i < 10));
            assert_ne!(indexes[0], indexes[1]);
            assert_ne!(indexes[0], indexes[2]);
            assert_ne!(indexes[1], indexes[2]);
        }
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_indexes([1u8; 32], 42, "oracle-x", 10);
        let b = derive_indexes([1u8; 32], 42, "oracle-x", 10);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_registration_requires_fee() {
        let registry = registry();

        let cheap = registry.register("o1", WEI_PER_ETHER - 1).await;
        assert!(matches!(cheap, Err(ConsensusError::InsufficientFee { .. })));
        assert!(!registry.is_registered("o1").await);

        let indexes = registry.register("o1", WEI_PER_ETHER).await.unwrap();
        assert_eq!(registry.indexes("o1").await.unwrap(), indexes);
    }

    #[tokio::test]
    async fn test_double_registration_rejected() {
        let registry = registry();
        registry.register("o1", WEI_PER_ETHER).await.unwrap();

        let again = registry.register("o1", WEI_PER_ETHER).await;
        assert!(matches!(again, Err(ConsensusError::AlreadyRegistered(_))));
    }

    #[tokio::test]
    async fn test_unknown_oracle_has_no_indexes() {
        let registry = registry();
        let missing = registry.indexes("ghost").await;
        assert!(matches!(missing, Err(ConsensusError::NotRegistered(_))));
    }
}
