//! Flight registry - registered flights and their canonical keys.

use std::collections::HashMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::types::{FlightKey, FlightStatus, LedgerError, Result};

/// A registered flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    /// Canonical key
    pub key: FlightKey,
    /// Registering airline
    pub airline: String,
    /// Flight designator
    pub flight: String,
    /// Scheduled departure (unix seconds)
    pub timestamp: i64,
    /// Resolved status, Unknown until consensus finalizes one
    pub status: FlightStatus,
    /// When the flight was registered
    pub registered_at: DateTime<Utc>,
}

/// Tracks registered flights.
pub struct FlightRegistry {
    /// Flights by canonical key
    flights: Arc<RwLock<HashMap<FlightKey, Flight>>>,
}

impl FlightRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            flights: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a flight. Airline eligibility (funded, registered) is
    /// checked by the caller against the governance ledger; this registry
    /// enforces key uniqueness.
    pub async fn register(&self, airline: &str, flight: &str, timestamp: i64) -> Result<FlightKey> {
        let key = FlightKey::derive(airline, flight, timestamp);

        let mut flights = self.flights.write().await;
        if flights.contains_key(&key) {
            return Err(LedgerError::AlreadyRegistered(key.to_string()));
        }

        flights.insert(
            key.clone(),
            Flight {
                key: key.clone(),
                airline: airline.to_string(),
                flight: flight.to_string(),
                timestamp,
                status: FlightStatus::Unknown,
                registered_at: Utc::now(),
            },
        );

        info!(airline = %airline, flight = %flight, key = %key, "Flight registered");
        Ok(key)
    }

    /// Whether a flight exists under the given key.
    pub async fn is_registered(&self, key: &FlightKey) -> bool {
        self.flights.read().await.contains_key(key)
    }

    /// Resolved status of a flight.
    pub async fn status(&self, key: &FlightKey) -> Result<FlightStatus> {
        self.flights
            .read()
            .await
            .get(key)
            .map(|f| f.status)
            .ok_or_else(|| LedgerError::FlightNotRegistered(key.to_string()))
    }

    /// Full flight record.
    pub async fn get(&self, key: &FlightKey) -> Option<Flight> {
        self.flights.read().await.get(key).cloned()
    }

    /// Write the finalized status onto a flight. Consensus-engine write
    /// path; one write per finalized request.
    pub async fn set_status(&self, key: &FlightKey, status: FlightStatus) -> Result<()> {
        let mut flights = self.flights.write().await;
        let flight = flights
            .get_mut(key)
            .ok_or_else(|| LedgerError::FlightNotRegistered(key.to_string()))?;

        flight.status = status;
        info!(key = %key, status = ?status, "Flight status finalized");
        Ok(())
    }
}

impl Default for FlightRegistry {
    fn default() -> Self {
        Self::new()
    }
}
