//! Flight surety ledger - the shared state components of the protocol.
//!
//! Each component exclusively owns its records and exposes the operations
//! other components go through:
//!
//! - **Account directory**: participant roles, pure bookkeeping
//! - **Operational gate**: owner-controlled enable/disable switch
//! - **Governance ledger**: airline membership, funding, registration votes
//! - **Flight registry**: registered flights and canonical keys
//! - **Insurance ledger**: passenger policies and withdrawable credits
//!
//! The consensus engine (in `surety-consensus`) drives the flight-status
//! and payout write paths.

pub mod airlines;
pub mod config;
pub mod directory;
pub mod flights;
pub mod gate;
pub mod insurance;
pub mod types;

// Re-export main types
pub use airlines::{Airline, AirlineRegistry, ProposalOutcome, RegistrationProposal};
pub use config::{GovernanceConfig, InsuranceConfig};
pub use directory::{AccountDirectory, Role};
pub use flights::{Flight, FlightRegistry};
pub use gate::OperationalGate;
pub use insurance::{InsuranceLedger, InsurancePolicy, Withdrawal};
pub use types::{FlightKey, FlightStatus, LedgerError, Result, WEI_PER_ETHER};
