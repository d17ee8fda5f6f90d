//! Account directory - maps participant identities to roles.
//!
//! Pure bookkeeping with no internal logic; populated as a side effect of
//! successful commands and consumed by the query surface.

use std::collections::HashMap;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Role a participant plays in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Contract owner, controls the operational gate
    Owner,
    /// Registered airline
    Airline,
    /// Insured passenger
    Passenger,
    /// Registered oracle
    Oracle,
}

/// Directory of known participants.
pub struct AccountDirectory {
    /// Recorded roles per identity
    roles: Arc<RwLock<HashMap<String, Role>>>,
}

impl AccountDirectory {
    /// Create a directory seeded with the owner.
    pub fn new(owner: impl Into<String>) -> Self {
        let mut roles = HashMap::new();
        roles.insert(owner.into(), Role::Owner);
        Self {
            roles: Arc::new(RwLock::new(roles)),
        }
    }

    /// Record a role for an identity. First recording wins; the owner
    /// entry is never overwritten.
    pub async fn record(&self, identity: &str, role: Role) {
        let mut roles = self.roles.write().await;
        roles.entry(identity.to_string()).or_insert(role);
    }

    /// Look up the role of an identity.
    pub async fn role_of(&self, identity: &str) -> Option<Role> {
        self.roles.read().await.get(identity).copied()
    }

    /// All identities holding a given role.
    pub async fn with_role(&self, role: Role) -> Vec<String> {
        self.roles
            .read()
            .await
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(id, _)| id.clone())
            .collect()
    }
}
