//! Consensus engine - dispatches status requests, collects oracle
//! responses, and finalizes flight status by quorum.
//!
//! Per-request state machine: `Open -> (responses accumulate) -> Finalized`.
//! The first status value to collect `min_responses` matching responses
//! wins; ties are impossible because submissions are processed one at a
//! time under the request lock.

use std::collections::HashMap;
use std::sync::Arc;
use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use surety_ledger::{FlightKey, FlightRegistry, FlightStatus, InsuranceLedger, LedgerError};

use crate::config::ConsensusConfig;
use crate::oracles::OracleRegistry;
use crate::random::EntropySource;
use crate::types::{
    ConsensusError, Notification, OracleResponse, RequestKey, Result, StatusRequest,
    SubmissionOutcome,
};

/// Gathers oracle responses and finalizes flight statuses.
pub struct ConsensusEngine {
    /// Configuration
    config: ConsensusConfig,
    /// Dispatch indexes are drawn from 0..index_range
    index_range: u8,
    /// Entropy for dispatch index draws
    entropy: Arc<dyn EntropySource>,
    /// Oracle registry, consulted for registration and index checks
    oracles: Arc<OracleRegistry>,
    /// Flight registry, written to on finalization
    flights: Arc<FlightRegistry>,
    /// Insurance ledger, credited on LateAirline finalization
    insurance: Arc<InsuranceLedger>,
    /// Requests by key
    requests: Arc<RwLock<HashMap<RequestKey, StatusRequest>>>,
    /// Collected responses by request key
    responses: Arc<RwLock<HashMap<RequestKey, Vec<OracleResponse>>>>,
    /// Notification subscribers
    subscribers: Arc<RwLock<Vec<mpsc::UnboundedSender<Notification>>>>,
}

impl ConsensusEngine {
    /// Create an engine over the given registries and ledger.
    pub fn new(
        config: ConsensusConfig,
        index_range: u8,
        entropy: Arc<dyn EntropySource>,
        oracles: Arc<OracleRegistry>,
        flights: Arc<FlightRegistry>,
        insurance: Arc<InsuranceLedger>,
    ) -> Self {
        Self {
            config,
            index_range,
            entropy,
            oracles,
            flights,
            insurance,
            requests: Arc::new(RwLock::new(HashMap::new())),
            responses: Arc::new(RwLock::new(HashMap::new())),
            subscribers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Subscribe to outbound notifications.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<Notification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().await.push(tx);
        rx
    }

    /// Dispatch a status request for a registered flight.
    ///
    /// Draws a random dispatch index and emits one `StatusRequested`
    /// notification. Calling again while the same (flight, index) request
    /// is in flight re-announces it instead of creating duplicate state.
    pub async fn fetch_status(
        &self,
        airline: &str,
        flight: &str,
        timestamp: i64,
    ) -> Result<StatusRequest> {
        let flight_key = FlightKey::derive(airline, flight, timestamp);
        if !self.flights.is_registered(&flight_key).await {
            return Err(LedgerError::FlightNotRegistered(flight_key.to_string()).into());
        }

        let dispatch_index = self.entropy.dispatch_index(self.index_range);
        let key = RequestKey::derive(dispatch_index, &flight_key);

        let request = {
            let mut requests = self.requests.write().await;
            match requests.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let request = StatusRequest {
                        id: uuid::Uuid::new_v4().to_string(),
                        key: key.clone(),
                        dispatch_index,
                        flight_key,
                        airline: airline.to_string(),
                        flight: flight.to_string(),
                        timestamp,
                        open: true,
                        requested_at: Utc::now(),
                    };
                    requests.insert(key, request.clone());
                    request
                }
            }
        };

        info!(
            request_id = %request.id,
            dispatch_index = request.dispatch_index,
            airline = %airline,
            flight = %flight,
            "Status request dispatched"
        );

        self.notify(Notification::StatusRequested {
            dispatch_index: request.dispatch_index,
            airline: airline.to_string(),
            flight: flight.to_string(),
            timestamp,
        })
        .await;

        Ok(request)
    }

    /// Submit one oracle's answer to a dispatched request.
    ///
    /// A response to an already-finalized request is recorded for
    /// bookkeeping and returns `RecordedAfterFinalization` rather than an
    /// error: the oracle answered honestly before it could know the
    /// outcome.
    pub async fn submit_response(
        &self,
        oracle: &str,
        dispatch_index: u8,
        airline: &str,
        flight: &str,
        timestamp: i64,
        status: FlightStatus,
    ) -> Result<SubmissionOutcome> {
        if !self.oracles.holds_index(oracle, dispatch_index).await? {
            return Err(ConsensusError::IndexMismatch {
                oracle: oracle.to_string(),
                index: dispatch_index,
            });
        }

        let flight_key = FlightKey::derive(airline, flight, timestamp);
        let key = RequestKey::derive(dispatch_index, &flight_key);

        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&key)
            .ok_or_else(|| ConsensusError::RequestClosed(key.to_string()))?;

        let mut responses = self.responses.write().await;
        let request_responses = responses.entry(key.clone()).or_default();

        if request_responses.iter().any(|r| r.oracle == oracle) {
            return Err(ConsensusError::DuplicateResponse(oracle.to_string()));
        }

        request_responses.push(OracleResponse {
            oracle: oracle.to_string(),
            request_key: key.clone(),
            status,
            submitted_at: Utc::now(),
        });

        if !request.open {
            warn!(
                oracle = %oracle,
                request_id = %request.id,
                "Response received after finalization; recorded without effect"
            );
            return Ok(SubmissionOutcome::RecordedAfterFinalization);
        }

        let tally = request_responses
            .iter()
            .filter(|r| r.status == status)
            .count();

        debug!(
            oracle = %oracle,
            request_id = %request.id,
            status = ?status,
            tally = tally,
            needed = self.config.min_responses,
            "Oracle response recorded"
        );

        if tally < self.config.min_responses {
            return Ok(SubmissionOutcome::Recorded {
                tally,
                needed: self.config.min_responses,
            });
        }

        // Quorum reached: close the request before any side effects so no
        // later response can finalize a second time.
        request.open = false;
        let request = request.clone();
        drop(responses);
        drop(requests);

        self.finalize(&request, status).await?;
        Ok(SubmissionOutcome::Finalized { status })
    }

    /// Write the finalized status and trigger downstream effects.
    async fn finalize(&self, request: &StatusRequest, status: FlightStatus) -> Result<()> {
        self.flights.set_status(&request.flight_key, status).await?;

        info!(
            request_id = %request.id,
            flight = %request.flight,
            status = ?status,
            "Status request finalized by quorum"
        );

        if status == FlightStatus::LateAirline {
            self.insurance.credit_payout(&request.flight_key).await;
        }

        self.notify(Notification::StatusFinalized {
            airline: request.airline.clone(),
            flight: request.flight.clone(),
            timestamp: request.timestamp,
            status,
        })
        .await;

        Ok(())
    }

    /// Fan a notification out to all live subscribers.
    async fn notify(&self, notification: Notification) {
        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|tx| tx.send(notification.clone()).is_ok());
    }

    /// Look up a request by key.
    pub async fn request(&self, key: &RequestKey) -> Option<StatusRequest> {
        self.requests.read().await.get(key).cloned()
    }

    /// All responses collected for a request.
    pub async fn responses(&self, key: &RequestKey) -> Vec<OracleResponse> {
        self.responses.read().await.get(key).cloned().unwrap_or_default()
    }

    /// Requests still waiting for quorum.
    pub async fn open_requests(&self) -> Vec<StatusRequest> {
        self.requests
            .read()
            .await
            .values()
            .filter(|r| r.open)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OracleConfig;
    use crate::random::ScriptedEntropy;
    use surety_ledger::WEI_PER_ETHER;

    struct Harness {
        engine: ConsensusEngine,
        oracles: Arc<OracleRegistry>,
        flights: Arc<FlightRegistry>,
        insurance: Arc<InsuranceLedger>,
        entropy: Arc<ScriptedEntropy>,
    }

    async fn harness() -> Harness {
        let entropy = Arc::new(ScriptedEntropy::new());
        let oracles = Arc::new(OracleRegistry::new(
            OracleConfig::default(),
            entropy.clone(),
        ));
        let flights = Arc::new(FlightRegistry::new());
        let insurance = Arc::new(InsuranceLedger::new());

        let engine = ConsensusEngine::new(
            ConsensusConfig::default(),
            OracleConfig::default().index_range,
            entropy.clone(),
            oracles.clone(),
            flights.clone(),
            insurance.clone(),
        );

        flights.register("a1", "ND1309", 1_609_459_200).await.unwrap();

        Harness {
            engine,
            oracles,
            flights,
            insurance,
            entropy,
        }
    }

    /// Register oracles until at least `want` of them hold `index`,
    /// returning those that do.
    async fn oracles_holding(h: &Harness, index: u8, want: usize) -> Vec<String> {
        let mut holding = Vec::new();
        for n in 0..200 {
            if holding.len() >= want {
                break;
            }
            let identity = format!("oracle-{n}");
            let indexes = h.oracles.register(&identity, WEI_PER_ETHER).await.unwrap();
            if indexes.contains(&index) {
                holding.push(identity);
            }
        }
        assert!(holding.len() >= want, "not enough oracles drew index {index}");
        holding
    }

    #[tokio::test]
    async fn test_fetch_requires_registered_flight() {
        let h = harness().await;
        let missing = h.engine.fetch_status("a1", "XX0000", 0).await;
        assert!(matches!(
            missing,
            Err(ConsensusError::Ledger(LedgerError::FlightNotRegistered(_)))
        ));
    }

    #[tokio::test]
    async fn test_fetch_emits_notification() {
        let h = harness().await;
        let mut notifications = h.engine.subscribe().await;

        h.entropy.push_index(7);
        let request = h.engine.fetch_status("a1", "ND1309", 1_609_459_200).await.unwrap();
        assert_eq!(request.dispatch_index, 7);
        assert!(request.open);

        match notifications.recv().await.unwrap() {
            Notification::StatusRequested {
                dispatch_index,
                airline,
                flight,
                timestamp,
            } => {
                assert_eq!(dispatch_index, 7);
                assert_eq!(airline, "a1");
                assert_eq!(flight, "ND1309");
                assert_eq!(timestamp, 1_609_459_200);
            }
            other => panic!("unexpected notification: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unregistered_oracle_rejected() {
        let h = harness().await;
        h.entropy.push_index(3);
        h.engine.fetch_status("a1", "ND1309", 1_609_459_200).await.unwrap();

        let denied = h
            .engine
            .submit_response("ghost", 3, "a1", "ND1309", 1_609_459_200, FlightStatus::OnTime)
            .await;
        assert!(matches!(denied, Err(ConsensusError::NotRegistered(_))));
    }

    #[tokio::test]
    async fn test_index_mismatch_rejected() {
        let h = harness().await;
        h.entropy.push_index(3);
        h.engine.fetch_status("a1", "ND1309", 1_609_459_200).await.unwrap();

        // Find an oracle and an index it does not hold.
        let oracle = oracles_holding(&h, 3, 1).await.remove(0);
        let indexes = h.oracles.indexes(&oracle).await.unwrap();
        let foreign = (0..10).find(|i| !indexes.contains(i)).unwrap();

        let denied = h
            .engine
            .submit_response(&oracle, foreign, "a1", "ND1309", 1_609_459_200, FlightStatus::OnTime)
            .await;
        assert!(matches!(denied, Err(ConsensusError::IndexMismatch { .. })));
    }

    #[tokio::test]
    async fn test_response_without_request_rejected() {
        let h = harness().await;
        let oracle = oracles_holding(&h, 5, 1).await.remove(0);

        let closed = h
            .engine
            .submit_response(&oracle, 5, "a1", "ND1309", 1_609_459_200, FlightStatus::OnTime)
            .await;
        assert!(matches!(closed, Err(ConsensusError::RequestClosed(_))));
    }

    #[tokio::test]
    async fn test_duplicate_response_rejected() {
        let h = harness().await;
        let voters = oracles_holding(&h, 4, 1).await;

        h.entropy.push_index(4);
        h.engine.fetch_status("a1", "ND1309", 1_609_459_200).await.unwrap();

        h.engine
            .submit_response(&voters[0], 4, "a1", "ND1309", 1_609_459_200, FlightStatus::OnTime)
            .await
            .unwrap();

        let again = h
            .engine
            .submit_response(&voters[0], 4, "a1", "ND1309", 1_609_459_200, FlightStatus::OnTime)
            .await;
        assert!(matches!(again, Err(ConsensusError::DuplicateResponse(_))));
    }

    #[tokio::test]
    async fn test_quorum_finalizes_and_credits() {
        let h = harness().await;
        let voters = oracles_holding(&h, 6, 4).await;

        let flight_key = FlightKey::derive("a1", "ND1309", 1_609_459_200);
        h.insurance.buy("p1", &flight_key, WEI_PER_ETHER).await.unwrap();

        h.entropy.push_index(6);
        let request = h.engine.fetch_status("a1", "ND1309", 1_609_459_200).await.unwrap();
        let mut notifications = h.engine.subscribe().await;

        // Two matching responses: no quorum yet.
        for (n, voter) in voters[..2].iter().enumerate() {
            let outcome = h
                .engine
                .submit_response(voter, 6, "a1", "ND1309", 1_609_459_200, FlightStatus::LateAirline)
                .await
                .unwrap();
            assert_eq!(
                outcome,
                SubmissionOutcome::Recorded { tally: n + 1, needed: 3 }
            );
        }
        assert_eq!(h.flights.status(&flight_key).await.unwrap(), FlightStatus::Unknown);
        assert_eq!(h.insurance.balance_of("p1").await, 0);

        // Third matching response finalizes.
        let outcome = h
            .engine
            .submit_response(&voters[2], 6, "a1", "ND1309", 1_609_459_200, FlightStatus::LateAirline)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmissionOutcome::Finalized { status: FlightStatus::LateAirline }
        );
        assert_eq!(
            h.flights.status(&flight_key).await.unwrap(),
            FlightStatus::LateAirline
        );
        assert_eq!(h.insurance.balance_of("p1").await, WEI_PER_ETHER * 3 / 2);

        match notifications.recv().await.unwrap() {
            Notification::StatusFinalized { status, flight, .. } => {
                assert_eq!(status, FlightStatus::LateAirline);
                assert_eq!(flight, "ND1309");
            }
            other => panic!("unexpected notification: {other:?}"),
        }

        // A fourth honest response is accepted but changes nothing.
        let outcome = h
            .engine
            .submit_response(&voters[3], 6, "a1", "ND1309", 1_609_459_200, FlightStatus::LateAirline)
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::RecordedAfterFinalization);
        assert_eq!(h.insurance.balance_of("p1").await, WEI_PER_ETHER * 3 / 2);
        assert_eq!(h.engine.responses(&request.key).await.len(), 4);
    }

    #[tokio::test]
    async fn test_disagreeing_responses_do_not_finalize() {
        let h = harness().await;
        let voters = oracles_holding(&h, 2, 3).await;

        h.entropy.push_index(2);
        h.engine.fetch_status("a1", "ND1309", 1_609_459_200).await.unwrap();

        let statuses = [
            FlightStatus::OnTime,
            FlightStatus::LateWeather,
            FlightStatus::LateTechnical,
        ];
        for (voter, status) in voters.iter().zip(statuses) {
            let outcome = h
                .engine
                .submit_response(voter, 2, "a1", "ND1309", 1_609_459_200, status)
                .await
                .unwrap();
            assert_eq!(outcome, SubmissionOutcome::Recorded { tally: 1, needed: 3 });
        }

        let flight_key = FlightKey::derive("a1", "ND1309", 1_609_459_200);
        assert_eq!(h.flights.status(&flight_key).await.unwrap(), FlightStatus::Unknown);
        assert_eq!(h.engine.open_requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_refetch_reuses_open_request() {
        let h = harness().await;

        h.entropy.push_index(9);
        let first = h.engine.fetch_status("a1", "ND1309", 1_609_459_200).await.unwrap();
        h.entropy.push_index(9);
        let second = h.engine.fetch_status("a1", "ND1309", 1_609_459_200).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(h.engine.open_requests().await.len(), 1);
    }
}
