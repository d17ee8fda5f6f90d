//! Flight surety consensus - oracle registry, quorum engine, and the
//! protocol facade.
//!
//! Resolves the real-world status of a flight from multiple independent,
//! mutually-untrusted reporters:
//!
//! - **Oracle registry**: fee-gated registration, three pseudo-random
//!   indexes per oracle
//! - **Consensus engine**: dispatches index-tagged status requests and
//!   finalizes the first status to collect a quorum of matching responses
//! - **SuretyApp**: the full command/query surface over the ledger
//!   components in `surety-ledger`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       SuretyApp                          │
//! │                                                          │
//! │  ┌──────┐ ┌────────────┐ ┌─────────┐ ┌───────────┐      │
//! │  │ Gate │ │ Governance │ │ Flights │ │ Insurance │      │
//! │  └──────┘ └────────────┘ └────┬────┘ └─────┬─────┘      │
//! │                               │            │            │
//! │  ┌─────────┐          ┌───────▼────────────▼──┐         │
//! │  │ Oracles │──────────│   Consensus Engine    │──▶ notifications
//! │  └─────────┘          └───────────────────────┘         │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod config;
pub mod engine;
pub mod oracles;
pub mod random;
pub mod types;

// Re-export main types
pub use app::SuretyApp;
pub use config::{ConsensusConfig, OracleConfig, SuretyConfig};
pub use engine::ConsensusEngine;
pub use oracles::OracleRegistry;
pub use random::{EntropySource, OsEntropy, ScriptedEntropy};
pub use types::*;
