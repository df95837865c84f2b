//! Match request lifecycle for the engine
//!
//! Directed, event-scoped requests between participants, with
//! mutual-acceptance detection. The ledger owns every request record and
//! never deletes a resolved one.

pub mod ledger;

pub use ledger::{LedgerStats, MatchRequestLedger, NewMatchRequest, RequestFilter};
