//! Operational gate - the process-wide enable/disable switch.
//!
//! Every state-mutating operation checks this gate before touching any
//! other component. Read-only queries are unaffected.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::types::{LedgerError, Result};

/// Owner-controlled switch gating all mutating operations.
pub struct OperationalGate {
    /// Owner identity, the only account allowed to flip the switch
    owner: String,
    /// Whether operations are currently enabled
    operational: Arc<RwLock<bool>>,
}

impl OperationalGate {
    /// Create a gate owned by `owner`, initially operational.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            operational: Arc::new(RwLock::new(true)),
        }
    }

    /// Owner identity.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Whether mutating operations are currently allowed.
    pub async fn is_operational(&self) -> bool {
        *self.operational.read().await
    }

    /// Fail with `OperationsHalted` unless the gate is up.
    pub async fn ensure_operational(&self) -> Result<()> {
        if *self.operational.read().await {
            Ok(())
        } else {
            Err(LedgerError::OperationsHalted)
        }
    }

    /// Flip the switch. Owner only; works even while halted so the owner
    /// can always re-enable operations.
    pub async fn set_operating_status(&self, caller: &str, value: bool) -> Result<()> {
        if caller != self.owner {
            return Err(LedgerError::NotOwner(caller.to_string()));
        }

        let mut operational = self.operational.write().await;
        *operational = value;

        info!(operational = value, "Operating status changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gate_starts_operational() {
        let gate = OperationalGate::new("owner");
        assert!(gate.is_operational().await);
        assert!(gate.ensure_operational().await.is_ok());
    }

    #[tokio::test]
    async fn test_only_owner_can_flip() {
        let gate = OperationalGate::new("owner");

        let denied = gate.set_operating_status("mallory", false).await;
        assert!(matches!(denied, Err(LedgerError::NotOwner(_))));
        assert!(gate.is_operational().await);

        gate.set_operating_status("owner", false).await.unwrap();
        assert!(!gate.is_operational().await);
        assert!(matches!(
            gate.ensure_operational().await,
            Err(LedgerError::OperationsHalted)
        ));

        // Owner can re-enable while halted
        gate.set_operating_status("owner", true).await.unwrap();
        assert!(gate.is_operational().await);
    }
}
