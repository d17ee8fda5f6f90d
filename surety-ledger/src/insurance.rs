//! Insurance ledger - passenger policies and withdrawable credits.

use std::collections::HashMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::InsuranceConfig;
use crate::types::{FlightKey, LedgerError, Result};

/// A passenger's policy on one flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsurancePolicy {
    /// Insured passenger
    pub passenger: String,
    /// Insured flight
    pub flight_key: FlightKey,
    /// Premium paid (wei)
    pub premium: u128,
    /// Whether the payout has been credited
    pub paid: bool,
    /// When the policy was bought
    pub bought_at: DateTime<Utc>,
}

/// Receipt for a completed withdrawal, the signal for the external
/// value transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Withdrawing passenger
    pub passenger: String,
    /// Amount transferred out (wei)
    pub amount: u128,
    /// Balance remaining after the debit (wei)
    pub remaining: u128,
}

/// Tracks policies per flight and withdrawable balances per passenger.
pub struct InsuranceLedger {
    /// Configuration
    config: InsuranceConfig,
    /// Policies grouped by flight key
    policies: Arc<RwLock<HashMap<FlightKey, Vec<InsurancePolicy>>>>,
    /// Withdrawable balances by passenger
    balances: Arc<RwLock<HashMap<String, u128>>>,
}

impl InsuranceLedger {
    /// Create an empty ledger with default configuration.
    pub fn new() -> Self {
        Self::with_config(InsuranceConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(config: InsuranceConfig) -> Self {
        Self {
            config,
            policies: Arc::new(RwLock::new(HashMap::new())),
            balances: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Buy a policy. Flight existence is checked by the caller against the
    /// flight registry; this ledger enforces the premium cap and the
    /// one-unpaid-policy-per-passenger rule.
    pub async fn buy(&self, passenger: &str, key: &FlightKey, amount: u128) -> Result<()> {
        if amount > self.config.premium_cap {
            return Err(LedgerError::PremiumExceedsCap {
                amount,
                cap: self.config.premium_cap,
            });
        }

        let mut policies = self.policies.write().await;
        let flight_policies = policies.entry(key.clone()).or_default();

        if flight_policies
            .iter()
            .any(|p| p.passenger == passenger && !p.paid)
        {
            return Err(LedgerError::AlreadyInsured(passenger.to_string()));
        }

        flight_policies.push(InsurancePolicy {
            passenger: passenger.to_string(),
            flight_key: key.clone(),
            premium: amount,
            paid: false,
            bought_at: Utc::now(),
        });

        info!(passenger = %passenger, key = %key, premium = amount, "Policy bought");
        Ok(())
    }

    /// Credit every unpaid policy on the flight with the configured payout
    /// rate. Idempotent per policy via the `paid` flag. Returns the number
    /// of policies credited.
    pub async fn credit_payout(&self, key: &FlightKey) -> usize {
        let mut policies = self.policies.write().await;
        let mut balances = self.balances.write().await;

        let mut credited = 0;
        if let Some(flight_policies) = policies.get_mut(key) {
            for policy in flight_policies.iter_mut().filter(|p| !p.paid) {
                let payout = policy.premium * u128::from(self.config.payout_percent) / 100;
                policy.paid = true;
                *balances.entry(policy.passenger.clone()).or_insert(0) += payout;
                credited += 1;

                debug!(
                    passenger = %policy.passenger,
                    premium = policy.premium,
                    payout = payout,
                    "Policy credited"
                );
            }
        }

        if credited > 0 {
            info!(key = %key, credited = credited, "Insurance payouts credited");
        }
        credited
    }

    /// Withdraw from a passenger's balance. The balance is debited before
    /// the transfer receipt is handed out, so a re-entrant caller can never
    /// withdraw the same credit twice.
    pub async fn withdraw(&self, passenger: &str, amount: u128) -> Result<Withdrawal> {
        let mut balances = self.balances.write().await;
        let available = balances.get(passenger).copied().unwrap_or(0);

        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        // Debit first; the receipt below is the transfer signal.
        let remaining = available - amount;
        balances.insert(passenger.to_string(), remaining);

        info!(passenger = %passenger, amount = amount, remaining = remaining, "Withdrawal");
        Ok(Withdrawal {
            passenger: passenger.to_string(),
            amount,
            remaining,
        })
    }

    /// Withdrawable balance of a passenger.
    pub async fn balance_of(&self, passenger: &str) -> u128 {
        self.balances.read().await.get(passenger).copied().unwrap_or(0)
    }

    /// Whether the passenger holds an unpaid policy on the flight.
    pub async fn is_insured(&self, passenger: &str, key: &FlightKey) -> bool {
        self.policies
            .read()
            .await
            .get(key)
            .map(|ps| ps.iter().any(|p| p.passenger == passenger && !p.paid))
            .unwrap_or(false)
    }

    /// All policies on a flight.
    pub async fn policies(&self, key: &FlightKey) -> Vec<InsurancePolicy> {
        self.policies.read().await.get(key).cloned().unwrap_or_default()
    }
}

impl Default for InsuranceLedger {
    fn default() -> Self {
        Self::new()
    }
}
