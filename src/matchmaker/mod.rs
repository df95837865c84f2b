//! Matchmaking orchestration
//!
//! This module ties the scorer, the request ledger, and the team registry
//! together behind the engine's public operation surface.

pub mod service;

pub use service::{MatchmakingService, MatchmakingStats, RankedCandidate, RankingConfig};
