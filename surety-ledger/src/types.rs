//! Core types shared across the ledger components.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Wei per ether, for readable amounts in configs and tests.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Resolved status of a flight, as reported by oracles.
///
/// Codes match the wire values used by external reporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightStatus {
    /// No status resolved yet
    Unknown,
    /// Departed on time
    OnTime,
    /// Delayed, airline at fault
    LateAirline,
    /// Delayed due to weather
    LateWeather,
    /// Delayed for technical reasons
    LateTechnical,
    /// Delayed for any other reason
    LateOther,
}

impl FlightStatus {
    /// Numeric wire code for this status.
    pub fn code(&self) -> u8 {
        match self {
            FlightStatus::Unknown => 0,
            FlightStatus::OnTime => 10,
            FlightStatus::LateAirline => 20,
            FlightStatus::LateWeather => 30,
            FlightStatus::LateTechnical => 40,
            FlightStatus::LateOther => 50,
        }
    }

    /// Parse a wire code into a status.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(FlightStatus::Unknown),
            10 => Some(FlightStatus::OnTime),
            20 => Some(FlightStatus::LateAirline),
            30 => Some(FlightStatus::LateWeather),
            40 => Some(FlightStatus::LateTechnical),
            50 => Some(FlightStatus::LateOther),
            _ => None,
        }
    }
}

impl Default for FlightStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Canonical identifier for a flight, derived from the registering airline,
/// the flight designator, and the departure timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightKey(String);

impl FlightKey {
    /// Derive the key for (airline, designator, departure timestamp).
    ///
    /// Stable across calls: the same triple always yields the same key.
    pub fn derive(airline: &str, flight: &str, timestamp: i64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(airline.as_bytes());
        hasher.update([0u8]);
        hasher.update(flight.as_bytes());
        hasher.update([0u8]);
        hasher.update(timestamp.to_be_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Hex representation of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FlightKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The operational gate is down
    #[error("Operations are currently halted")]
    OperationsHalted,

    /// Caller is not the contract owner
    #[error("Caller {0} is not the owner")]
    NotOwner(String),

    /// Funding amount below the required threshold
    #[error("Insufficient funds: {amount} wei is below the {required} wei threshold")]
    InsufficientFunds { amount: u128, required: u128 },

    /// Airline has not provided funding
    #[error("Airline {0} is not funded")]
    NotFunded(String),

    /// Identity is not registered
    #[error("{0} is not registered")]
    NotRegistered(String),

    /// Identity or key already registered
    #[error("{0} is already registered")]
    AlreadyRegistered(String),

    /// Passenger already holds an unpaid policy on this flight
    #[error("Passenger {0} is already insured for this flight")]
    AlreadyInsured(String),

    /// Premium above the configured cap
    #[error("Premium {amount} wei exceeds the {cap} wei cap")]
    PremiumExceedsCap { amount: u128, cap: u128 },

    /// No flight registered under the given key
    #[error("Flight {0} is not registered")]
    FlightNotRegistered(String),

    /// Voter already voted on this proposal
    #[error("Airline {0} already voted for this candidate")]
    DuplicateVote(String),

    /// Withdrawal larger than the withdrawable balance
    #[error("Insufficient balance: requested {requested} wei, available {available} wei")]
    InsufficientBalance { requested: u128, available: u128 },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for status in [
            FlightStatus::Unknown,
            FlightStatus::OnTime,
            FlightStatus::LateAirline,
            FlightStatus::LateWeather,
            FlightStatus::LateTechnical,
            FlightStatus::LateOther,
        ] {
            assert_eq!(FlightStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(FlightStatus::from_code(25), None);
    }

    #[test]
    fn test_flight_key_is_stable() {
        let a = FlightKey::derive("airline-1", "ND1309", 1_609_459_200);
        let b = FlightKey::derive("airline-1", "ND1309", 1_609_459_200);
        assert_eq!(a, b);
    }

    #[test]
    fn test_flight_key_separates_fields() {
        // Field boundaries must matter: ("ab", "c") != ("a", "bc").
        let a = FlightKey::derive("ab", "c", 0);
        let b = FlightKey::derive("a", "bc", 0);
        assert_ne!(a, b);

        let c = FlightKey::derive("a", "b", 1);
        let d = FlightKey::derive("a", "b", 2);
        assert_ne!(c, d);
    }
}
