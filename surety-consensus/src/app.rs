//! SuretyApp - the protocol facade.
//!
//! Composes the operational gate, account directory, governance ledger,
//! flight registry, insurance ledger, oracle registry, and consensus
//! engine into the command/query surface external actors call. Every
//! mutating command checks the operational gate first; queries never do.

use std::sync::Arc;
use tracing::info;

use surety_ledger::{
    AccountDirectory, AirlineRegistry, FlightKey, FlightRegistry, FlightStatus, InsuranceLedger,
    OperationalGate, ProposalOutcome, Role, Withdrawal,
};
use tokio::sync::mpsc;

use crate::config::SuretyConfig;
use crate::engine::ConsensusEngine;
use crate::oracles::OracleRegistry;
use crate::random::{EntropySource, OsEntropy};
use crate::types::{Notification, Result, StatusRequest, SubmissionOutcome};

/// The flight surety protocol, assembled.
pub struct SuretyApp {
    /// Configuration
    config: SuretyConfig,
    /// Operational gate
    gate: OperationalGate,
    /// Participant directory
    directory: AccountDirectory,
    /// Governance ledger
    airlines: Arc<AirlineRegistry>,
    /// Flight registry
    flights: Arc<FlightRegistry>,
    /// Insurance ledger
    insurance: Arc<InsuranceLedger>,
    /// Oracle registry
    oracles: Arc<OracleRegistry>,
    /// Consensus engine
    engine: ConsensusEngine,
}

impl SuretyApp {
    /// Deploy with default configuration and OS entropy. The first
    /// airline is registered at genesis, unfunded.
    pub async fn deploy(owner: impl Into<String>, first_airline: &str) -> Result<Self> {
        Self::deploy_with(
            owner,
            first_airline,
            SuretyConfig::default(),
            Arc::new(OsEntropy),
        )
        .await
    }

    /// Deploy with custom configuration and entropy source.
    pub async fn deploy_with(
        owner: impl Into<String>,
        first_airline: &str,
        config: SuretyConfig,
        entropy: Arc<dyn EntropySource>,
    ) -> Result<Self> {
        let owner = owner.into();

        let airlines = Arc::new(AirlineRegistry::with_config(config.governance.clone()));
        let flights = Arc::new(FlightRegistry::new());
        let insurance = Arc::new(InsuranceLedger::with_config(config.insurance.clone()));
        let oracles = Arc::new(OracleRegistry::new(config.oracle.clone(), entropy.clone()));

        let engine = ConsensusEngine::new(
            config.consensus.clone(),
            config.oracle.index_range,
            entropy,
            oracles.clone(),
            flights.clone(),
            insurance.clone(),
        );

        let directory = AccountDirectory::new(owner.clone());

        airlines.register_first_airline(first_airline).await?;
        directory.record(first_airline, Role::Airline).await;

        info!(owner = %owner, first_airline = %first_airline, "Surety protocol deployed");

        Ok(Self {
            config,
            gate: OperationalGate::new(owner),
            directory,
            airlines,
            flights,
            insurance,
            oracles,
            engine,
        })
    }

    // ------------------------------------------------------------------
    // Command surface (gate-checked)
    // ------------------------------------------------------------------

    /// Enable or disable all mutating operations. Owner only.
    pub async fn set_operating_status(&self, caller: &str, value: bool) -> Result<()> {
        self.gate.set_operating_status(caller, value).await?;
        Ok(())
    }

    /// Deposit an airline's stake.
    pub async fn fund_airline(&self, identity: &str, amount: u128) -> Result<()> {
        self.gate.ensure_operational().await?;
        self.airlines.fund(identity, amount).await?;
        Ok(())
    }

    /// Nominate a candidate airline; registers directly during bootstrap,
    /// otherwise records the proposer's vote.
    pub async fn propose_airline(&self, candidate: &str, proposer: &str) -> Result<ProposalOutcome> {
        self.gate.ensure_operational().await?;
        let outcome = self.airlines.propose(candidate, proposer).await?;

        if outcome == ProposalOutcome::Registered {
            self.directory.record(candidate, Role::Airline).await;
        }
        Ok(outcome)
    }

    /// Register a flight. The airline must be registered and funded.
    pub async fn register_flight(
        &self,
        airline: &str,
        flight: &str,
        timestamp: i64,
    ) -> Result<FlightKey> {
        self.gate.ensure_operational().await?;

        if !self.airlines.is_funded(airline).await {
            return Err(surety_ledger::LedgerError::NotFunded(airline.to_string()).into());
        }

        let key = self.flights.register(airline, flight, timestamp).await?;
        Ok(key)
    }

    /// Buy an insurance policy on a registered flight.
    pub async fn buy_policy(&self, passenger: &str, key: &FlightKey, amount: u128) -> Result<()> {
        self.gate.ensure_operational().await?;

        if !self.flights.is_registered(key).await {
            return Err(surety_ledger::LedgerError::FlightNotRegistered(key.to_string()).into());
        }

        self.insurance.buy(passenger, key, amount).await?;
        self.directory.record(passenger, Role::Passenger).await;
        Ok(())
    }

    /// Withdraw credited payout. The balance is debited before the
    /// transfer receipt is returned.
    pub async fn withdraw(&self, passenger: &str, amount: u128) -> Result<Withdrawal> {
        self.gate.ensure_operational().await?;
        let receipt = self.insurance.withdraw(passenger, amount).await?;
        Ok(receipt)
    }

    /// Register an oracle and assign its index set.
    pub async fn register_oracle(&self, identity: &str, fee: u128) -> Result<[u8; 3]> {
        self.gate.ensure_operational().await?;
        let indexes = self.oracles.register(identity, fee).await?;
        self.directory.record(identity, Role::Oracle).await;
        Ok(indexes)
    }

    /// Dispatch a status request for a flight.
    pub async fn fetch_status(
        &self,
        airline: &str,
        flight: &str,
        timestamp: i64,
    ) -> Result<StatusRequest> {
        self.gate.ensure_operational().await?;
        self.engine.fetch_status(airline, flight, timestamp).await
    }

    /// Submit an oracle's response to a dispatched request.
    pub async fn submit_response(
        &self,
        oracle: &str,
        dispatch_index: u8,
        airline: &str,
        flight: &str,
        timestamp: i64,
        status: FlightStatus,
    ) -> Result<SubmissionOutcome> {
        self.gate.ensure_operational().await?;
        self.engine
            .submit_response(oracle, dispatch_index, airline, flight, timestamp, status)
            .await
    }

    // ------------------------------------------------------------------
    // Query surface (never gated)
    // ------------------------------------------------------------------

    /// Whether mutating operations are enabled.
    pub async fn is_operational(&self) -> bool {
        self.gate.is_operational().await
    }

    /// Canonical key for a flight.
    pub fn flight_key(&self, airline: &str, flight: &str, timestamp: i64) -> FlightKey {
        FlightKey::derive(airline, flight, timestamp)
    }

    /// Resolved status of a flight.
    pub async fn flight_status(&self, key: &FlightKey) -> Result<FlightStatus> {
        Ok(self.flights.status(key).await?)
    }

    /// Index set assigned to an oracle.
    pub async fn oracle_indexes(&self, identity: &str) -> Result<[u8; 3]> {
        self.oracles.indexes(identity).await
    }

    /// Whether an identity is a registered airline.
    pub async fn check_airline_registration(&self, identity: &str) -> bool {
        self.airlines.is_registered(identity).await
    }

    /// Whether an airline has deposited its stake.
    pub async fn is_airline_funded(&self, identity: &str) -> bool {
        self.airlines.is_funded(identity).await
    }

    /// Number of registered airlines.
    pub async fn airline_count(&self) -> usize {
        self.airlines.registered_count().await
    }

    /// A passenger's withdrawable balance.
    pub async fn passenger_balance(&self, passenger: &str) -> u128 {
        self.insurance.balance_of(passenger).await
    }

    /// Whether a passenger holds an unpaid policy on a flight.
    pub async fn is_insured(&self, passenger: &str, key: &FlightKey) -> bool {
        self.insurance.is_insured(passenger, key).await
    }

    /// Role recorded for an identity.
    pub async fn role_of(&self, identity: &str) -> Option<Role> {
        self.directory.role_of(identity).await
    }

    /// Subscribe to outbound notifications.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<Notification> {
        self.engine.subscribe().await
    }

    /// Active configuration.
    pub fn config(&self) -> &SuretyConfig {
        &self.config
    }
}
