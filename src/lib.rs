//! Team Forge - Matchmaking and team formation for competitive events
//!
//! This crate provides pairwise compatibility scoring, directed match
//! requests with mutual-acceptance semantics, and team membership
//! management (capacity, uniqueness-per-event, leadership succession)
//! under concurrent access.

pub mod amqp;
pub mod config;
pub mod directory;
pub mod error;
pub mod matchmaker;
pub mod metrics;
pub mod request;
pub mod scoring;
pub mod service;
pub mod team;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{ErrorKind, MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use amqp::publisher::EventPublisher;
pub use directory::{EventStore, InMemoryDirectory, ProfileStore};
pub use matchmaker::{MatchmakingService, RankedCandidate};
pub use request::MatchRequestLedger;
pub use scoring::CompatibilityScorer;
pub use team::TeamRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
