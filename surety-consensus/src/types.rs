//! Core types for the consensus crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use surety_ledger::{FlightKey, FlightStatus, LedgerError};

/// Identifier of one status request: a flight key tagged with the
/// dispatch index drawn when the request was issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey(String);

impl RequestKey {
    /// Derive the key for (dispatch index, flight key).
    pub fn derive(dispatch_index: u8, flight_key: &FlightKey) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([dispatch_index]);
        hasher.update(flight_key.as_str().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Hex representation of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Oracle {
    /// Oracle identity
    pub identity: String,
    /// Assigned index set, immutable after registration
    pub indexes: [u8; 3],
    /// When the oracle registered
    pub registered_at: DateTime<Utc>,
}

/// An open or finalized status request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    /// Request ID
    pub id: String,
    /// Request key (flight key + dispatch index)
    pub key: RequestKey,
    /// Dispatch index drawn for this request
    pub dispatch_index: u8,
    /// Flight under request
    pub flight_key: FlightKey,
    /// Registering airline
    pub airline: String,
    /// Flight designator
    pub flight: String,
    /// Scheduled departure (unix seconds)
    pub timestamp: i64,
    /// Whether the request is still accepting decisive responses
    pub open: bool,
    /// When the request was issued
    pub requested_at: DateTime<Utc>,
}

/// One oracle's answer to a status request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleResponse {
    /// Submitting oracle
    pub oracle: String,
    /// Request being answered
    pub request_key: RequestKey,
    /// Proposed status
    pub status: FlightStatus,
    /// When the response arrived
    pub submitted_at: DateTime<Utc>,
}

/// Outcome of a response submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Response recorded, quorum not yet reached
    Recorded {
        /// Matching responses for the submitted status so far
        tally: usize,
        /// Matching responses required to finalize
        needed: usize,
    },
    /// This response completed the quorum and finalized the request
    Finalized {
        /// The finalized status
        status: FlightStatus,
    },
    /// Request already finalized; response kept for bookkeeping only
    RecordedAfterFinalization,
}

/// Outbound notification to external collaborators (reporter feeder,
/// display layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Notification {
    /// A status request was dispatched; oracles holding the index may answer
    StatusRequested {
        /// Dispatch index oracles must hold to answer
        dispatch_index: u8,
        /// Registering airline
        airline: String,
        /// Flight designator
        flight: String,
        /// Scheduled departure (unix seconds)
        timestamp: i64,
    },
    /// A request reached quorum and the flight status is final
    StatusFinalized {
        /// Registering airline
        airline: String,
        /// Flight designator
        flight: String,
        /// Scheduled departure (unix seconds)
        timestamp: i64,
        /// Finalized status
        status: FlightStatus,
    },
}

/// Error types for consensus operations.
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    /// Registration fee below the required amount
    #[error("Insufficient fee: {amount} wei is below the {required} wei registration fee")]
    InsufficientFee { amount: u128, required: u128 },

    /// Oracle is not registered
    #[error("Oracle {0} is not registered")]
    NotRegistered(String),

    /// Oracle already registered
    #[error("Oracle {0} is already registered")]
    AlreadyRegistered(String),

    /// Submitted dispatch index is not in the oracle's assigned set
    #[error("Index {index} is not assigned to oracle {oracle}")]
    IndexMismatch { oracle: String, index: u8 },

    /// No open request matches the submission
    #[error("No open request for key {0}")]
    RequestClosed(String),

    /// Oracle already answered this request
    #[error("Oracle {0} already responded to this request")]
    DuplicateResponse(String),

    /// Ledger-side failure
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, ConsensusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_notification_wire_shape() {
        let notification = Notification::StatusRequested {
            dispatch_index: 7,
            airline: "a1".to_string(),
            flight: "ND1309".to_string(),
            timestamp: 1_609_459_200,
        };

        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["kind"], "status_requested");
        assert_eq!(value["dispatch_index"], 7);
        assert_eq!(value["airline"], "a1");
        assert_eq!(value["flight"], "ND1309");
        assert_eq!(value["timestamp"], 1_609_459_200);
    }

    #[test]
    fn test_request_key_depends_on_index() {
        let flight_key = FlightKey::derive("a1", "ND1309", 1_609_459_200);
        let a = RequestKey::derive(3, &flight_key);
        let b = RequestKey::derive(4, &flight_key);
        assert_ne!(a, b);
        assert_eq!(a, RequestKey::derive(3, &flight_key));
    }
}
