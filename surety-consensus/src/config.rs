//! Configuration for the consensus crate and the protocol as a whole.

use serde::{Deserialize, Serialize};

use surety_ledger::{GovernanceConfig, InsuranceConfig, WEI_PER_ETHER};

/// Oracle registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Fee an oracle must pay to register (wei)
    pub registration_fee: u128,
    /// Index values are drawn from 0..index_range
    pub index_range: u8,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            registration_fee: WEI_PER_ETHER,
            index_range: 10,
        }
    }
}

/// Consensus engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Matching responses required to finalize a status
    pub min_responses: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self { min_responses: 3 }
    }
}

/// Top-level configuration for a surety deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuretyConfig {
    /// Governance ledger settings
    pub governance: GovernanceConfig,
    /// Insurance ledger settings
    pub insurance: InsuranceConfig,
    /// Oracle registry settings
    pub oracle: OracleConfig,
    /// Consensus engine settings
    pub consensus: ConsensusConfig,
}

impl SuretyConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
