//! Configuration for the ledger components.

use serde::{Deserialize, Serialize};

use crate::types::WEI_PER_ETHER;

/// Governance ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Minimum stake an airline must deposit before it may register
    /// flights or vote (wei)
    pub funding_threshold: u128,
    /// Registered-airline count below which new airlines are registered
    /// immediately, without a vote
    pub bootstrap_count: usize,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            funding_threshold: 10 * WEI_PER_ETHER,
            bootstrap_count: 4,
        }
    }
}

/// Insurance ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceConfig {
    /// Maximum premium a passenger may pay for one policy (wei)
    pub premium_cap: u128,
    /// Payout as a percentage of the premium
    pub payout_percent: u32,
}

impl Default for InsuranceConfig {
    fn default() -> Self {
        Self {
            premium_cap: WEI_PER_ETHER,
            payout_percent: 150,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_constants() {
        let governance = GovernanceConfig::default();
        assert_eq!(governance.funding_threshold, 10 * WEI_PER_ETHER);
        assert_eq!(governance.bootstrap_count, 4);

        let insurance = InsuranceConfig::default();
        assert_eq!(insurance.premium_cap, WEI_PER_ETHER);
        assert_eq!(insurance.payout_percent, 150);
    }
}
