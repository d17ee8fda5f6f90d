//! Governance ledger - airline membership, funding, and registration votes.
//!
//! The first airline is created at genesis. Until four airlines are
//! registered, any funded airline can register a new one directly; from
//! then on a candidate needs votes from at least half of the registered
//! airlines.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::GovernanceConfig;
use crate::types::{LedgerError, Result};

/// A member airline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airline {
    /// Airline identity
    pub identity: String,
    /// Whether the airline passed registration
    pub registered: bool,
    /// Whether the airline has deposited the minimum stake
    pub funded: bool,
    /// When the airline joined
    pub joined_at: DateTime<Utc>,
}

/// An open vote on a candidate airline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationProposal {
    /// Proposal ID
    pub id: String,
    /// Candidate identity
    pub candidate: String,
    /// Distinct airlines that voted so far
    pub voters: HashSet<String>,
    /// When the proposal was opened
    pub created_at: DateTime<Utc>,
}

/// Outcome of a registration proposal call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposalOutcome {
    /// Candidate became a registered (unfunded) airline
    Registered,
    /// Vote recorded, more votes still needed
    VoteRecorded {
        /// Votes collected so far
        votes: usize,
        /// Votes required to register the candidate
        needed: usize,
    },
}

/// Tracks airline membership and registration votes.
pub struct AirlineRegistry {
    /// Configuration
    config: GovernanceConfig,
    /// Registered airlines by identity
    airlines: Arc<RwLock<HashMap<String, Airline>>>,
    /// Open proposals by candidate identity
    proposals: Arc<RwLock<HashMap<String, RegistrationProposal>>>,
}

impl AirlineRegistry {
    /// Create an empty registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(GovernanceConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(config: GovernanceConfig) -> Self {
        Self {
            config,
            airlines: Arc::new(RwLock::new(HashMap::new())),
            proposals: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register the genesis airline. Callable exactly once: fails
    /// `AlreadyRegistered` when any airline already exists.
    pub async fn register_first_airline(&self, identity: &str) -> Result<()> {
        let mut airlines = self.airlines.write().await;
        if !airlines.is_empty() {
            return Err(LedgerError::AlreadyRegistered(identity.to_string()));
        }

        airlines.insert(
            identity.to_string(),
            Airline {
                identity: identity.to_string(),
                registered: true,
                funded: false,
                joined_at: Utc::now(),
            },
        );

        info!(airline = %identity, "First airline registered at genesis");
        Ok(())
    }

    /// Mark an airline funded. Requires the deposit to meet the funding
    /// threshold; idempotent once funded.
    pub async fn fund(&self, identity: &str, amount: u128) -> Result<()> {
        if amount < self.config.funding_threshold {
            return Err(LedgerError::InsufficientFunds {
                amount,
                required: self.config.funding_threshold,
            });
        }

        let mut airlines = self.airlines.write().await;
        let airline = airlines
            .get_mut(identity)
            .ok_or_else(|| LedgerError::NotRegistered(identity.to_string()))?;

        airline.funded = true;
        info!(airline = %identity, amount = amount, "Airline funded");
        Ok(())
    }

    /// Nominate a candidate airline.
    ///
    /// Below the bootstrap count the candidate is registered immediately.
    /// Otherwise the proposer's vote is added to the candidate's open
    /// proposal; the candidate is registered once distinct votes reach
    /// half of the current registered-airline count (rounded up), and the
    /// proposal is cleared.
    pub async fn propose(&self, candidate: &str, proposer: &str) -> Result<ProposalOutcome> {
        let mut airlines = self.airlines.write().await;

        let eligible = airlines
            .get(proposer)
            .map(|a| a.registered && a.funded)
            .unwrap_or(false);
        if !eligible {
            return Err(LedgerError::NotFunded(proposer.to_string()));
        }
        if airlines.contains_key(candidate) {
            return Err(LedgerError::AlreadyRegistered(candidate.to_string()));
        }

        let registered_count = airlines.len();

        // Bootstrap phase: no vote tally while the network is small.
        if registered_count < self.config.bootstrap_count {
            Self::admit(&mut airlines, candidate);
            info!(
                airline = %candidate,
                proposer = %proposer,
                registered_count = registered_count + 1,
                "Airline registered directly (bootstrap phase)"
            );
            return Ok(ProposalOutcome::Registered);
        }

        let needed = registered_count.div_ceil(2);

        let mut proposals = self.proposals.write().await;
        let proposal = proposals
            .entry(candidate.to_string())
            .or_insert_with(|| RegistrationProposal {
                id: uuid::Uuid::new_v4().to_string(),
                candidate: candidate.to_string(),
                voters: HashSet::new(),
                created_at: Utc::now(),
            });

        if !proposal.voters.insert(proposer.to_string()) {
            return Err(LedgerError::DuplicateVote(proposer.to_string()));
        }

        let votes = proposal.voters.len();
        debug!(
            candidate = %candidate,
            voter = %proposer,
            votes = votes,
            needed = needed,
            "Registration vote recorded"
        );

        if votes >= needed {
            proposals.remove(candidate);
            Self::admit(&mut airlines, candidate);
            info!(
                airline = %candidate,
                votes = votes,
                "Airline registered by majority vote"
            );
            return Ok(ProposalOutcome::Registered);
        }

        Ok(ProposalOutcome::VoteRecorded { votes, needed })
    }

    fn admit(airlines: &mut HashMap<String, Airline>, candidate: &str) {
        airlines.insert(
            candidate.to_string(),
            Airline {
                identity: candidate.to_string(),
                registered: true,
                funded: false,
                joined_at: Utc::now(),
            },
        );
    }

    /// Whether the identity is a registered airline.
    pub async fn is_registered(&self, identity: &str) -> bool {
        self.airlines
            .read()
            .await
            .get(identity)
            .map(|a| a.registered)
            .unwrap_or(false)
    }

    /// Whether the identity is a funded, registered airline.
    pub async fn is_funded(&self, identity: &str) -> bool {
        self.airlines
            .read()
            .await
            .get(identity)
            .map(|a| a.registered && a.funded)
            .unwrap_or(false)
    }

    /// Number of registered airlines.
    pub async fn registered_count(&self) -> usize {
        self.airlines.read().await.len()
    }

    /// Open proposal for a candidate, if any.
    pub async fn open_proposal(&self, candidate: &str) -> Option<RegistrationProposal> {
        self.proposals.read().await.get(candidate).cloned()
    }
}

impl Default for AirlineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
