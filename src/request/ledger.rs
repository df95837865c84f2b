//! Match request ledger implementation
//!
//! The ledger serializes every request mutation under one write lock.
//! Duplicate-check-then-insert is a single critical section, and the
//! composite accept-and-join holds the ledger lock across the team
//! registry call so no observer can see an Accepted request without the
//! membership it implies (or the reverse). Lock order is strictly
//! ledger -> registry; nothing in the registry calls back into the ledger.

use crate::error::{MatchmakingError, Result};
use crate::team::TeamRegistry;
use crate::types::{
    CompatibilityScore, Decision, EventId, MatchRequest, MutualMatch, RequestId, RequestKind,
    RequestStatus, TeamId, UserId,
};
use crate::utils::{current_timestamp, generate_request_id};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Parameters for creating a request. The score snapshot is computed by
/// the caller (the ledger does no profile I/O) and is immutable once
/// recorded.
#[derive(Debug, Clone)]
pub struct NewMatchRequest {
    pub requester: UserId,
    pub recipient: UserId,
    pub event_id: EventId,
    pub team_id: Option<TeamId>,
    pub message: Option<String>,
    pub score: CompatibilityScore,
}

/// Which side of a user's requests to list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFilter {
    Sent,
    Received,
    All,
}

/// Statistics about ledger operations
#[derive(Debug, Clone, Default)]
pub struct LedgerStats {
    pub requests_created: u64,
    pub requests_accepted: u64,
    pub requests_rejected: u64,
    pub requests_cancelled: u64,
    /// Currently pending requests
    pub pending_requests: usize,
}

struct LedgerState {
    by_id: HashMap<RequestId, MatchRequest>,
    /// Index of pending (requester, recipient, event) triples
    pending: HashSet<(UserId, UserId, EventId)>,
    stats: LedgerStats,
}

/// The match request ledger
#[derive(Clone)]
pub struct MatchRequestLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl Default for MatchRequestLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchRequestLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState {
                by_id: HashMap::new(),
                pending: HashSet::new(),
                stats: LedgerStats::default(),
            })),
        }
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire request ledger lock".to_string(),
            }
            .into())
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire request ledger lock".to_string(),
            }
            .into())
    }

    /// Create a pending request.
    ///
    /// At most one pending request may exist per ordered
    /// (requester, recipient, event) triple; the check and the insert
    /// share one write lock.
    pub fn create(&self, new: NewMatchRequest) -> Result<MatchRequest> {
        if new.requester == new.recipient {
            return Err(MatchmakingError::SelfRequest {
                user_id: new.requester,
            }
            .into());
        }

        let mut state = self.write_state()?;

        let triple = (
            new.requester.clone(),
            new.recipient.clone(),
            new.event_id.clone(),
        );
        if state.pending.contains(&triple) {
            return Err(MatchmakingError::DuplicateActiveRequest {
                requester: new.requester,
                recipient: new.recipient,
                event_id: new.event_id,
            }
            .into());
        }

        let kind = if new.team_id.is_some() {
            RequestKind::TeamInvite
        } else {
            RequestKind::DirectMatch
        };

        let request = MatchRequest {
            id: generate_request_id(),
            requester: new.requester,
            recipient: new.recipient,
            event_id: new.event_id,
            team_id: new.team_id,
            kind,
            message: new.message,
            score: new.score,
            status: RequestStatus::Pending,
            created_at: current_timestamp(),
            responded_at: None,
        };

        state.pending.insert(triple);
        state.by_id.insert(request.id, request.clone());
        state.stats.requests_created += 1;
        state.stats.pending_requests = state.pending.len();

        info!(
            "Created {:?} request {} from {} to {} for event {} (score {:.1})",
            request.kind,
            request.id,
            request.requester,
            request.recipient,
            request.event_id,
            request.score.total
        );
        Ok(request)
    }

    /// Resolve a pending request as the recipient.
    ///
    /// Accepting a team invite joins the recipient to the referenced team
    /// before the status flips; if the join fails (full, closed, already
    /// on a team) the error propagates and the request stays Pending.
    pub fn respond(
        &self,
        request_id: RequestId,
        acting_user: &str,
        decision: Decision,
        teams: &TeamRegistry,
    ) -> Result<MatchRequest> {
        let mut state = self.write_state()?;

        let request = state
            .by_id
            .get(&request_id)
            .ok_or_else(|| MatchmakingError::RequestNotFound {
                request_id: request_id.to_string(),
            })?;

        if request.recipient != acting_user {
            return Err(MatchmakingError::NotRecipient {
                request_id: request_id.to_string(),
            }
            .into());
        }

        if !request.status.is_pending() {
            return Err(MatchmakingError::AlreadyResolved {
                request_id: request_id.to_string(),
            }
            .into());
        }

        // Join first, flip second: the ledger lock is held across both,
        // so the pair is indivisible to every other engine operation.
        if decision == Decision::Accept {
            if let Some(team_id) = request.team_id {
                teams.add_member(team_id, request.recipient.clone())?;
            }
        }

        let request = state
            .by_id
            .get_mut(&request_id)
            .ok_or_else(|| MatchmakingError::InternalError {
                message: format!("Request {} vanished mid-respond", request_id),
            })?;

        request.status = match decision {
            Decision::Accept => RequestStatus::Accepted,
            Decision::Reject => RequestStatus::Rejected,
        };
        request.responded_at = Some(current_timestamp());
        let resolved = request.clone();

        let triple = (
            resolved.requester.clone(),
            resolved.recipient.clone(),
            resolved.event_id.clone(),
        );
        state.pending.remove(&triple);
        match decision {
            Decision::Accept => state.stats.requests_accepted += 1,
            Decision::Reject => state.stats.requests_rejected += 1,
        }
        state.stats.pending_requests = state.pending.len();

        info!(
            "Request {} resolved as {:?} by {}",
            request_id, resolved.status, acting_user
        );
        Ok(resolved)
    }

    /// Cancel a pending request as the requester.
    pub fn cancel(&self, request_id: RequestId, acting_user: &str) -> Result<MatchRequest> {
        let mut state = self.write_state()?;

        let request = state
            .by_id
            .get_mut(&request_id)
            .ok_or_else(|| MatchmakingError::RequestNotFound {
                request_id: request_id.to_string(),
            })?;

        if request.requester != acting_user {
            return Err(MatchmakingError::NotRequester {
                request_id: request_id.to_string(),
            }
            .into());
        }

        if !request.status.is_pending() {
            return Err(MatchmakingError::AlreadyResolved {
                request_id: request_id.to_string(),
            }
            .into());
        }

        request.status = RequestStatus::Cancelled;
        request.responded_at = Some(current_timestamp());
        let cancelled = request.clone();

        let triple = (
            cancelled.requester.clone(),
            cancelled.recipient.clone(),
            cancelled.event_id.clone(),
        );
        state.pending.remove(&triple);
        state.stats.requests_cancelled += 1;
        state.stats.pending_requests = state.pending.len();

        debug!("Request {} cancelled by {}", request_id, acting_user);
        Ok(cancelled)
    }

    /// Fetch a request by id
    pub fn get(&self, request_id: RequestId) -> Result<Option<MatchRequest>> {
        let state = self.read_state()?;
        Ok(state.by_id.get(&request_id).cloned())
    }

    /// All requests a user sent or received, optionally filtered by status,
    /// newest first.
    pub fn requests_for_user(
        &self,
        user_id: &str,
        filter: RequestFilter,
        status: Option<RequestStatus>,
    ) -> Result<Vec<MatchRequest>> {
        let state = self.read_state()?;

        let mut requests: Vec<MatchRequest> = state
            .by_id
            .values()
            .filter(|r| match filter {
                RequestFilter::Sent => r.requester == user_id,
                RequestFilter::Received => r.recipient == user_id,
                RequestFilter::All => r.requester == user_id || r.recipient == user_id,
            })
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();

        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Mutual matches for a user: pairs of independently Accepted requests
    /// (user -> other and other -> user) for the same event. The engine
    /// never auto-creates the reciprocal record; both acceptances must
    /// have happened on their own.
    pub fn find_mutual(&self, user_id: &str) -> Result<Vec<MutualMatch>> {
        let state = self.read_state()?;

        let sent_accepted: Vec<&MatchRequest> = state
            .by_id
            .values()
            .filter(|r| r.requester == user_id && r.status == RequestStatus::Accepted)
            .collect();

        let mut matches = Vec::new();
        for sent in sent_accepted {
            let reciprocal = state.by_id.values().find(|r| {
                r.requester == sent.recipient
                    && r.recipient == user_id
                    && r.event_id == sent.event_id
                    && r.status == RequestStatus::Accepted
            });

            if let Some(reciprocal) = reciprocal {
                // The match forms at the later of the two acceptances.
                let matched_at = sent
                    .responded_at
                    .max(reciprocal.responded_at)
                    .unwrap_or(sent.created_at);
                matches.push(MutualMatch {
                    user_id: sent.recipient.clone(),
                    event_id: sent.event_id.clone(),
                    matched_at,
                });
            }
        }

        matches.sort_by(|a, b| b.matched_at.cmp(&a.matched_at));
        Ok(matches)
    }

    /// Current ledger statistics
    pub fn stats(&self) -> Result<LedgerStats> {
        let state = self.read_state()?;
        Ok(state.stats.clone())
    }
}
