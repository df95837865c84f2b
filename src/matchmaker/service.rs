//! The matchmaking service: candidate ranking and the operation surface
//!
//! Every externally exposed operation lives here. The service resolves
//! collaborator lookups (profiles, events), enforces cross-entity
//! validation, delegates invariant-bearing mutations to the ledger and
//! the registry, and emits domain events and metrics afterwards. Event
//! publishing is fire-and-forget: a failed publish is logged and counted,
//! never surfaced as an operation failure.

use crate::amqp::messages::routing_key_for;
use crate::amqp::publisher::EventPublisher;
use crate::directory::{EventStore, ProfileStore};
use crate::error::{MatchmakingError, Result};
use crate::metrics::MetricsCollector;
use crate::request::{LedgerStats, MatchRequestLedger, NewMatchRequest, RequestFilter};
use crate::scoring::CompatibilityScorer;
use crate::team::{LeaveOutcome, TeamInstance, TeamRegistry, TeamRegistryStats};
use crate::types::{
    CompatibilityScore, Decision, EngineEvent, Event, MatchRequest, MemberJoined, MemberLeft,
    MutualMatch, Profile, RequestCreated, RequestId, RequestResolved, RequestStatus, TeamClosed,
    TeamDetails, TeamId, TeamStatus,
};
use crate::utils::current_timestamp;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Limits applied to candidate ranking
#[derive(Debug, Clone)]
pub struct RankingConfig {
    /// Minimum score used when the caller does not pass one
    pub default_min_score: f64,
    /// Hard cap on the number of candidates returned
    pub max_limit: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            default_min_score: 50.0,
            max_limit: 100,
        }
    }
}

/// A scored candidate returned by ranking
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub profile: Profile,
    pub score: CompatibilityScore,
}

/// Aggregated engine statistics
#[derive(Debug, Clone, Default)]
pub struct MatchmakingStats {
    /// Candidate rankings served since start
    pub rankings_served: u64,
    pub requests: LedgerStats,
    pub teams: TeamRegistryStats,
}

/// The matchmaking service
#[derive(Clone)]
pub struct MatchmakingService {
    profiles: Arc<dyn ProfileStore>,
    events: Arc<dyn EventStore>,
    scorer: CompatibilityScorer,
    ledger: MatchRequestLedger,
    teams: TeamRegistry,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<MetricsCollector>,
    ranking_config: RankingConfig,
    rankings_served: Arc<RwLock<u64>>,
}

impl MatchmakingService {
    /// Create a new service with default scorer, metrics, and limits
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        events: Arc<dyn EventStore>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let metrics = Arc::new(MetricsCollector::default());
        Self::with_metrics(profiles, events, publisher, metrics)
    }

    /// Create a new service with an explicit metrics collector
    pub fn with_metrics(
        profiles: Arc<dyn ProfileStore>,
        events: Arc<dyn EventStore>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            profiles,
            events,
            scorer: CompatibilityScorer::new(),
            ledger: MatchRequestLedger::new(),
            teams: TeamRegistry::new(),
            publisher,
            metrics,
            ranking_config: RankingConfig::default(),
            rankings_served: Arc::new(RwLock::new(0)),
        }
    }

    /// Override the ranking limits
    pub fn with_ranking_config(mut self, config: RankingConfig) -> Self {
        self.ranking_config = config;
        self
    }

    async fn require_profile(&self, user_id: &str) -> Result<Profile> {
        self.profiles
            .get_profile(user_id)
            .await?
            .ok_or_else(|| {
                MatchmakingError::ProfileNotFound {
                    user_id: user_id.to_string(),
                }
                .into()
            })
    }

    async fn require_event(&self, event_id: &str) -> Result<Event> {
        self.events
            .get_event(event_id)
            .await?
            .ok_or_else(|| {
                MatchmakingError::EventNotFound {
                    event_id: event_id.to_string(),
                }
                .into()
            })
    }

    async fn emit(&self, event: EngineEvent) {
        let routing_key = routing_key_for(&event);
        match self.publisher.publish(event).await {
            Ok(()) => self.metrics.record_amqp_publish(routing_key, true),
            Err(e) => {
                self.metrics.record_amqp_publish(routing_key, false);
                warn!("Failed to publish {} event: {}", routing_key, e);
            }
        }
    }

    /// Rank compatible candidates for a user within an event.
    ///
    /// Scores every eligible profile, filters by `min_score`, sorts by
    /// score descending with ascending user id as the stable tie-break,
    /// and truncates to `limit`. This is a full scan of the eligible
    /// pool; shard the profile store before the pool outgrows it.
    pub async fn candidates(
        &self,
        user_id: &str,
        event_id: &str,
        min_score: Option<f64>,
        limit: Option<usize>,
    ) -> Result<Vec<RankedCandidate>> {
        let timer = self.metrics.start_timer();

        let user_profile = self.require_profile(user_id).await?;
        let event = self.require_event(event_id).await?;

        let min_score = min_score.unwrap_or(self.ranking_config.default_min_score);
        let limit = limit
            .unwrap_or(self.ranking_config.max_limit)
            .min(self.ranking_config.max_limit);

        let pool = self.profiles.eligible_profiles(event_id).await?;
        let scored_count = pool.len();

        let mut candidates: Vec<RankedCandidate> = pool
            .into_iter()
            .filter(|p| p.user_id != user_id)
            .map(|p| {
                let score = self.scorer.score(&user_profile, &p, Some(&event));
                RankedCandidate { profile: p, score }
            })
            .filter(|c| c.score.total >= min_score)
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .total
                .partial_cmp(&a.score.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.profile.user_id.cmp(&b.profile.user_id))
        });
        candidates.truncate(limit);

        {
            let mut served =
                self.rankings_served
                    .write()
                    .map_err(|_| MatchmakingError::InternalError {
                        message: "Failed to acquire rankings counter lock".to_string(),
                    })?;
            *served += 1;
        }
        self.metrics.record_ranking(scored_count, timer.stop());

        debug!(
            "Ranked {} candidates for {} in event {} (min_score {:.1})",
            candidates.len(),
            user_id,
            event_id,
            min_score
        );
        Ok(candidates)
    }

    /// Send a match request, snapshotting the compatibility score.
    pub async fn match_request(
        &self,
        requester_id: &str,
        recipient_id: &str,
        event_id: &str,
        team_id: Option<TeamId>,
        message: Option<String>,
    ) -> Result<MatchRequest> {
        let requester = self.require_profile(requester_id).await?;
        let recipient = self.require_profile(recipient_id).await?;
        let event = self.require_event(event_id).await?;

        if !recipient.preferences.allow_matching {
            return Err(MatchmakingError::MatchingDisabled {
                user_id: recipient_id.to_string(),
            }
            .into());
        }

        // A team invite must reference a live team of this event, and the
        // requester must be on it.
        if let Some(team_id) = team_id {
            let team = self.teams.get_team(team_id)?.ok_or_else(|| {
                MatchmakingError::TeamNotFound {
                    team_id: team_id.to_string(),
                }
            })?;
            if team.event_id() != event_id {
                return Err(MatchmakingError::TeamNotFound {
                    team_id: team_id.to_string(),
                }
                .into());
            }
            if !team.is_member(requester_id) {
                return Err(MatchmakingError::NotMember {
                    user_id: requester_id.to_string(),
                    team_id: team_id.to_string(),
                }
                .into());
            }
        }

        let score = self.scorer.score(&requester, &recipient, Some(&event));

        let request = self
            .ledger
            .create(NewMatchRequest {
                requester: requester_id.to_string(),
                recipient: recipient_id.to_string(),
                event_id: event_id.to_string(),
                team_id,
                message,
                score,
            })
            .map_err(|e| {
                if let Some(err) = e.downcast_ref::<MatchmakingError>() {
                    let reason = match err {
                        MatchmakingError::DuplicateActiveRequest { .. } => "duplicate",
                        MatchmakingError::SelfRequest { .. } => "self_request",
                        _ => "other",
                    };
                    self.metrics.record_create_rejection(reason);
                }
                e
            })?;

        self.metrics
            .record_request_created(request.kind, request.score.total);
        self.emit(EngineEvent::RequestCreated(RequestCreated {
            request_id: request.id,
            requester: request.requester.clone(),
            recipient: request.recipient.clone(),
            event_id: request.event_id.clone(),
            kind: request.kind,
            score: request.score.total,
            timestamp: current_timestamp(),
        }))
        .await;

        Ok(request)
    }

    /// Respond to a pending request as its recipient.
    ///
    /// Accepting a team invite joins the recipient atomically with the
    /// status flip; a failed join leaves the request Pending and the
    /// error propagates to the caller.
    pub async fn respond_to_request(
        &self,
        request_id: RequestId,
        acting_user: &str,
        decision: Decision,
    ) -> Result<MatchRequest> {
        let resolved = self
            .ledger
            .respond(request_id, acting_user, decision, &self.teams)?;

        self.metrics.record_request_resolved(resolved.status);
        if resolved.status == RequestStatus::Accepted {
            if let Some(team_id) = resolved.team_id {
                self.metrics.record_member_joined();
                if let Some(team) = self.teams.get_team(team_id)? {
                    self.emit(EngineEvent::MemberJoined(MemberJoined {
                        team_id,
                        event_id: team.event_id().clone(),
                        user_id: resolved.recipient.clone(),
                        team_size: team.size(),
                        team_status: team.status(),
                        timestamp: current_timestamp(),
                    }))
                    .await;
                }
            }
        }

        self.emit(EngineEvent::RequestResolved(RequestResolved {
            request_id: resolved.id,
            requester: resolved.requester.clone(),
            recipient: resolved.recipient.clone(),
            event_id: resolved.event_id.clone(),
            status: resolved.status,
            timestamp: current_timestamp(),
        }))
        .await;

        Ok(resolved)
    }

    /// Cancel a pending request as its requester.
    pub async fn cancel_request(
        &self,
        request_id: RequestId,
        acting_user: &str,
    ) -> Result<MatchRequest> {
        let cancelled = self.ledger.cancel(request_id, acting_user)?;
        self.metrics.record_request_resolved(cancelled.status);

        self.emit(EngineEvent::RequestResolved(RequestResolved {
            request_id: cancelled.id,
            requester: cancelled.requester.clone(),
            recipient: cancelled.recipient.clone(),
            event_id: cancelled.event_id.clone(),
            status: cancelled.status,
            timestamp: current_timestamp(),
        }))
        .await;

        Ok(cancelled)
    }

    /// All mutual matches for a user
    pub fn mutual_matches(&self, user_id: &str) -> Result<Vec<MutualMatch>> {
        let matches = self.ledger.find_mutual(user_id)?;
        self.metrics
            .request()
            .mutual_matches_found_total
            .inc_by(matches.len() as u64);
        Ok(matches)
    }

    /// Requests a user sent or received
    pub fn requests_for_user(
        &self,
        user_id: &str,
        filter: RequestFilter,
        status: Option<RequestStatus>,
    ) -> Result<Vec<MatchRequest>> {
        self.ledger.requests_for_user(user_id, filter, status)
    }

    /// Fetch a single request
    pub fn get_request(&self, request_id: RequestId) -> Result<Option<MatchRequest>> {
        self.ledger.get(request_id)
    }

    /// Create a team with the acting user as leader.
    pub async fn create_team(
        &self,
        leader_id: &str,
        event_id: &str,
        max_members: usize,
        details: TeamDetails,
    ) -> Result<TeamInstance> {
        self.require_profile(leader_id).await?;
        let event = self.require_event(event_id).await?;

        let team = self
            .teams
            .create_team(leader_id.to_string(), &event, max_members, details)?;
        self.metrics.record_team_created();

        info!(
            "User {} created team {} for event {}",
            leader_id,
            team.id(),
            event_id
        );
        Ok(team)
    }

    /// Direct join on an open team (no request involved).
    pub async fn join_team(&self, team_id: TeamId, user_id: &str) -> Result<TeamInstance> {
        self.require_profile(user_id).await?;

        let team = match self.teams.add_member(team_id, user_id.to_string()) {
            Ok(team) => team,
            Err(e) => {
                if let Some(err) = e.downcast_ref::<MatchmakingError>() {
                    let reason = match err {
                        MatchmakingError::TeamFull { .. } => "team_full",
                        MatchmakingError::TeamNotOpen { .. } => "team_not_open",
                        MatchmakingError::AlreadyMember { .. } => "already_member",
                        MatchmakingError::AlreadyOnTeam { .. } => "already_on_team",
                        _ => "other",
                    };
                    self.metrics.record_join_rejection(reason);
                }
                return Err(e);
            }
        };

        self.metrics.record_member_joined();
        self.emit(EngineEvent::MemberJoined(MemberJoined {
            team_id,
            event_id: team.event_id().clone(),
            user_id: user_id.to_string(),
            team_size: team.size(),
            team_status: team.status(),
            timestamp: current_timestamp(),
        }))
        .await;

        Ok(team)
    }

    /// Leave a team. Returns the surviving team, or None if the departure
    /// disbanded it.
    pub async fn leave_team(&self, team_id: TeamId, user_id: &str) -> Result<Option<TeamInstance>> {
        let outcome = self.teams.remove_member(team_id, user_id)?;
        self.metrics.record_member_left();

        match outcome {
            LeaveOutcome::Remaining { team, new_leader } => {
                self.emit(EngineEvent::MemberLeft(MemberLeft {
                    team_id,
                    event_id: team.event_id().clone(),
                    user_id: user_id.to_string(),
                    new_leader,
                    remaining_members: team.size(),
                    timestamp: current_timestamp(),
                }))
                .await;
                Ok(Some(team))
            }
            LeaveOutcome::Disbanded { team } => {
                self.metrics.record_team_closed(TeamStatus::Disbanded);
                self.emit(EngineEvent::TeamClosed(TeamClosed {
                    team_id,
                    event_id: team.event_id().clone(),
                    status: TeamStatus::Disbanded,
                    timestamp: current_timestamp(),
                }))
                .await;
                Ok(None)
            }
        }
    }

    /// Leader-only: change team capacity.
    pub async fn update_team_capacity(
        &self,
        team_id: TeamId,
        acting_user: &str,
        new_max: usize,
    ) -> Result<TeamInstance> {
        self.teams.update_capacity(team_id, acting_user, new_max)
    }

    /// Leader-only: remove a member from the team.
    pub async fn remove_team_member(
        &self,
        team_id: TeamId,
        acting_user: &str,
        target_user: &str,
    ) -> Result<TeamInstance> {
        let team = self
            .teams
            .remove_specific_member(team_id, acting_user, target_user)?;
        self.metrics.record_member_left();

        self.emit(EngineEvent::MemberLeft(MemberLeft {
            team_id,
            event_id: team.event_id().clone(),
            user_id: target_user.to_string(),
            new_leader: None,
            remaining_members: team.size(),
            timestamp: current_timestamp(),
        }))
        .await;

        Ok(team)
    }

    /// Leader-only: archive the team as Disbanded.
    pub async fn disband_team(&self, team_id: TeamId, acting_user: &str) -> Result<TeamInstance> {
        self.close_team(team_id, acting_user, TeamStatus::Disbanded)
            .await
    }

    /// Leader-only: archive the team as Completed.
    pub async fn complete_team(&self, team_id: TeamId, acting_user: &str) -> Result<TeamInstance> {
        self.close_team(team_id, acting_user, TeamStatus::Completed)
            .await
    }

    async fn close_team(
        &self,
        team_id: TeamId,
        acting_user: &str,
        status: TeamStatus,
    ) -> Result<TeamInstance> {
        let team = self.teams.close_team(team_id, acting_user, status)?;
        self.metrics.record_team_closed(status);

        self.emit(EngineEvent::TeamClosed(TeamClosed {
            team_id,
            event_id: team.event_id().clone(),
            status,
            timestamp: current_timestamp(),
        }))
        .await;

        Ok(team)
    }

    /// Fetch a single active team
    pub fn get_team(&self, team_id: TeamId) -> Result<Option<TeamInstance>> {
        self.teams.get_team(team_id)
    }

    /// Active teams for an event
    pub fn teams_for_event(
        &self,
        event_id: &str,
        status: Option<TeamStatus>,
    ) -> Result<Vec<TeamInstance>> {
        self.teams.teams_for_event(event_id, status)
    }

    /// The team a user currently belongs to for an event
    pub fn team_for_user(&self, event_id: &str, user_id: &str) -> Result<Option<TeamInstance>> {
        self.teams.team_for_user(event_id, user_id)
    }

    /// Aggregated engine statistics
    pub fn get_stats(&self) -> Result<MatchmakingStats> {
        let rankings_served = *self
            .rankings_served
            .read()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire rankings counter lock".to_string(),
            })?;

        Ok(MatchmakingStats {
            rankings_served,
            requests: self.ledger.stats()?,
            teams: self.teams.stats()?,
        })
    }
}
