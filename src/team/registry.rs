//! Team registry implementation
//!
//! The registry owns all team state for the engine and serializes every
//! check-then-act sequence (capacity checks, per-event uniqueness scans)
//! under a single write lock, so concurrent joins can never overflow a
//! team and a participant can never end up on two teams for one event.

use crate::error::{MatchmakingError, Result};
use crate::team::instance::{LeaveOutcome, TeamInstance};
use crate::types::{Event, MemberRole, TeamDetails, TeamId, TeamStatus, UserId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Statistics about registry operations
#[derive(Debug, Clone, Default)]
pub struct TeamRegistryStats {
    /// Total number of teams created
    pub teams_created: u64,
    /// Total number of teams that reached a terminal status
    pub teams_closed: u64,
    /// Total members added across all teams (leaders included)
    pub members_joined: u64,
    /// Total members removed across all teams
    pub members_left: u64,
    /// Current number of non-terminal teams
    pub active_teams: usize,
}

struct RegistryState {
    /// Active (non-terminal) teams by id
    teams: HashMap<TeamId, TeamInstance>,
    /// Terminal teams, kept for auditability
    archive: Vec<TeamInstance>,
    stats: TeamRegistryStats,
}

/// The team registry
#[derive(Clone)]
pub struct TeamRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl Default for TeamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TeamRegistry {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState {
                teams: HashMap::new(),
                archive: Vec::new(),
                stats: TeamRegistryStats::default(),
            })),
        }
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, RegistryState>> {
        self.state
            .write()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire team registry lock".to_string(),
            }
            .into())
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, RegistryState>> {
        self.state
            .read()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire team registry lock".to_string(),
            }
            .into())
    }

    /// Create a new team with `leader` as its first member.
    ///
    /// Fails if the leader already belongs to a non-terminal team for the
    /// event, or if the requested capacity falls outside the event's
    /// team-size bounds.
    pub fn create_team(
        &self,
        leader: UserId,
        event: &Event,
        max_members: usize,
        details: TeamDetails,
    ) -> Result<TeamInstance> {
        if max_members < event.min_team_size.max(1) || max_members > event.max_team_size {
            return Err(MatchmakingError::InvalidCapacity {
                reason: format!(
                    "capacity {} outside event bounds {}..={}",
                    max_members, event.min_team_size, event.max_team_size
                ),
            }
            .into());
        }

        let mut state = self.write_state()?;

        if let Some(existing) = find_team_for_user(&state.teams, &event.event_id, &leader) {
            debug!(
                "User {} already on team {} for event {}",
                leader,
                existing.id(),
                event.event_id
            );
            return Err(MatchmakingError::AlreadyOnTeam {
                user_id: leader,
                event_id: event.event_id.clone(),
            }
            .into());
        }

        let team = TeamInstance::new(leader, event.event_id.clone(), max_members, details);
        let team_id = team.id();
        state.teams.insert(team_id, team.clone());

        state.stats.teams_created += 1;
        state.stats.members_joined += 1;
        state.stats.active_teams = state.teams.len();

        info!(
            "Created team {} for event {} (capacity {})",
            team_id, event.event_id, max_members
        );
        Ok(team)
    }

    /// Add a member to a team.
    ///
    /// The capacity check and the membership write happen under one write
    /// lock: of N concurrent joins racing for the last seat, exactly one
    /// succeeds and the rest observe `TeamFull`.
    pub fn add_member(&self, team_id: TeamId, user_id: UserId) -> Result<TeamInstance> {
        self.add_member_with_role(team_id, user_id, MemberRole::default())
    }

    pub fn add_member_with_role(
        &self,
        team_id: TeamId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<TeamInstance> {
        let mut state = self.write_state()?;

        let event_id = state
            .teams
            .get(&team_id)
            .ok_or_else(|| MatchmakingError::TeamNotFound {
                team_id: team_id.to_string(),
            })?
            .event_id()
            .clone();

        // Uniqueness-per-event scan under the same lock as the insert.
        if let Some(other) = find_team_for_user(&state.teams, &event_id, &user_id) {
            if other.id() != team_id {
                return Err(MatchmakingError::AlreadyOnTeam {
                    user_id,
                    event_id,
                }
                .into());
            }
        }

        let team = state
            .teams
            .get_mut(&team_id)
            .ok_or_else(|| MatchmakingError::TeamNotFound {
                team_id: team_id.to_string(),
            })?;

        team.add_member(user_id.clone(), role)?;
        let snapshot = team.clone();

        state.stats.members_joined += 1;

        debug!(
            "User {} joined team {} ({}/{})",
            user_id,
            team_id,
            snapshot.size(),
            snapshot.max_members()
        );
        Ok(snapshot)
    }

    /// Remove a member, handling leadership succession and disbanding.
    pub fn remove_member(&self, team_id: TeamId, user_id: &str) -> Result<LeaveOutcome> {
        let mut state = self.write_state()?;

        let team = state
            .teams
            .get_mut(&team_id)
            .ok_or_else(|| MatchmakingError::TeamNotFound {
                team_id: team_id.to_string(),
            })?;

        let outcome = team.remove_member(user_id)?;
        state.stats.members_left += 1;

        if let LeaveOutcome::Disbanded { .. } = outcome {
            if let Some(team) = state.teams.remove(&team_id) {
                state.stats.teams_closed += 1;
                state.archive.push(team);
            }
            state.stats.active_teams = state.teams.len();
            info!("Team {} disbanded (last member left)", team_id);
        } else {
            debug!("User {} left team {}", user_id, team_id);
        }

        Ok(outcome)
    }

    /// Leader-only: change team capacity.
    pub fn update_capacity(
        &self,
        team_id: TeamId,
        acting_user: &str,
        new_max: usize,
    ) -> Result<TeamInstance> {
        let mut state = self.write_state()?;

        let team = state
            .teams
            .get_mut(&team_id)
            .ok_or_else(|| MatchmakingError::TeamNotFound {
                team_id: team_id.to_string(),
            })?;

        if !team.is_leader(acting_user) {
            return Err(MatchmakingError::NotLeader {
                team_id: team_id.to_string(),
            }
            .into());
        }

        team.update_capacity(new_max)?;
        Ok(team.clone())
    }

    /// Leader-only: remove a specific member (never the leader).
    pub fn remove_specific_member(
        &self,
        team_id: TeamId,
        acting_user: &str,
        target_user: &str,
    ) -> Result<TeamInstance> {
        let mut state = self.write_state()?;

        let team = state
            .teams
            .get_mut(&team_id)
            .ok_or_else(|| MatchmakingError::TeamNotFound {
                team_id: team_id.to_string(),
            })?;

        if !team.is_leader(acting_user) {
            return Err(MatchmakingError::NotLeader {
                team_id: team_id.to_string(),
            }
            .into());
        }

        if team.is_leader(target_user) {
            return Err(MatchmakingError::CannotRemoveLeader {
                team_id: team_id.to_string(),
            }
            .into());
        }

        team.remove_member(target_user)?;
        let snapshot = team.clone();
        state.stats.members_left += 1;

        info!(
            "Leader {} removed {} from team {}",
            acting_user, target_user, team_id
        );
        Ok(snapshot)
    }

    /// Leader-only: move the team to a terminal status and archive it.
    pub fn close_team(
        &self,
        team_id: TeamId,
        acting_user: &str,
        status: TeamStatus,
    ) -> Result<TeamInstance> {
        if !status.is_terminal() {
            return Err(MatchmakingError::InternalError {
                message: format!("close_team called with non-terminal status {}", status),
            }
            .into());
        }

        let mut state = self.write_state()?;

        let team = state
            .teams
            .get_mut(&team_id)
            .ok_or_else(|| MatchmakingError::TeamNotFound {
                team_id: team_id.to_string(),
            })?;

        if !team.is_leader(acting_user) {
            return Err(MatchmakingError::NotLeader {
                team_id: team_id.to_string(),
            }
            .into());
        }

        team.close(status);
        let snapshot = team.clone();

        state.teams.remove(&team_id);
        state.archive.push(snapshot.clone());
        state.stats.teams_closed += 1;
        state.stats.active_teams = state.teams.len();

        info!("Team {} closed as {}", team_id, status);
        Ok(snapshot)
    }

    /// Get an active team by id
    pub fn get_team(&self, team_id: TeamId) -> Result<Option<TeamInstance>> {
        let state = self.read_state()?;
        Ok(state.teams.get(&team_id).cloned())
    }

    /// All active teams for an event, optionally filtered by status
    pub fn teams_for_event(
        &self,
        event_id: &str,
        status: Option<TeamStatus>,
    ) -> Result<Vec<TeamInstance>> {
        let state = self.read_state()?;
        Ok(state
            .teams
            .values()
            .filter(|t| t.event_id() == event_id)
            .filter(|t| status.map_or(true, |s| t.status() == s))
            .cloned()
            .collect())
    }

    /// The non-terminal team a user belongs to for an event, if any
    pub fn team_for_user(&self, event_id: &str, user_id: &str) -> Result<Option<TeamInstance>> {
        let state = self.read_state()?;
        Ok(find_team_for_user(&state.teams, event_id, user_id).cloned())
    }

    /// Current registry statistics
    pub fn stats(&self) -> Result<TeamRegistryStats> {
        let state = self.read_state()?;
        let mut stats = state.stats.clone();
        stats.active_teams = state.teams.len();
        Ok(stats)
    }
}

fn find_team_for_user<'a>(
    teams: &'a HashMap<TeamId, TeamInstance>,
    event_id: &str,
    user_id: &str,
) -> Option<&'a TeamInstance> {
    teams
        .values()
        .find(|t| t.event_id() == event_id && !t.status().is_terminal() && t.is_member(user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::Arc;

    fn test_event(id: &str) -> Event {
        Event {
            event_id: id.to_string(),
            title: format!("Event {}", id),
            min_team_size: 2,
            max_team_size: 10,
            registration_closes_at: None,
            formation_closes_at: None,
        }
    }

    fn matchmaking_err(err: &anyhow::Error) -> &MatchmakingError {
        err.downcast_ref::<MatchmakingError>().unwrap()
    }

    #[test]
    fn test_create_team() {
        let registry = TeamRegistry::new();
        let event = test_event("e1");

        let team = registry
            .create_team("leader".to_string(), &event, 4, TeamDetails::default())
            .unwrap();

        assert_eq!(team.size(), 1);
        assert_eq!(team.status(), TeamStatus::Forming);
        assert!(registry.get_team(team.id()).unwrap().is_some());
    }

    #[test]
    fn test_create_team_rejects_out_of_bounds_capacity() {
        let registry = TeamRegistry::new();
        let event = test_event("e1");

        let err = registry
            .create_team("leader".to_string(), &event, 11, TeamDetails::default())
            .unwrap_err();
        assert!(matches!(
            matchmaking_err(&err),
            MatchmakingError::InvalidCapacity { .. }
        ));
    }

    #[test]
    fn test_one_team_per_event() {
        let registry = TeamRegistry::new();
        let event = test_event("e1");

        registry
            .create_team("leader".to_string(), &event, 4, TeamDetails::default())
            .unwrap();

        let err = registry
            .create_team("leader".to_string(), &event, 4, TeamDetails::default())
            .unwrap_err();
        assert!(matches!(
            matchmaking_err(&err),
            MatchmakingError::AlreadyOnTeam { .. }
        ));

        // A different event is fine.
        let other_event = test_event("e2");
        assert!(registry
            .create_team("leader".to_string(), &other_event, 4, TeamDetails::default())
            .is_ok());
    }

    #[test]
    fn test_join_blocked_by_other_team_membership() {
        let registry = TeamRegistry::new();
        let event = test_event("e1");

        let team_a = registry
            .create_team("la".to_string(), &event, 4, TeamDetails::default())
            .unwrap();
        let team_b = registry
            .create_team("lb".to_string(), &event, 4, TeamDetails::default())
            .unwrap();

        registry.add_member(team_a.id(), "u1".to_string()).unwrap();

        let err = registry
            .add_member(team_b.id(), "u1".to_string())
            .unwrap_err();
        assert!(matches!(
            matchmaking_err(&err),
            MatchmakingError::AlreadyOnTeam { .. }
        ));
    }

    #[test]
    fn test_join_after_leaving_terminal_team() {
        let registry = TeamRegistry::new();
        let event = test_event("e1");

        let team_a = registry
            .create_team("la".to_string(), &event, 4, TeamDetails::default())
            .unwrap();
        registry.add_member(team_a.id(), "u1".to_string()).unwrap();

        // Leaving frees the user for another team in the same event.
        registry.remove_member(team_a.id(), "u1").unwrap();

        let team_b = registry
            .create_team("lb".to_string(), &event, 4, TeamDetails::default())
            .unwrap();
        assert!(registry.add_member(team_b.id(), "u1".to_string()).is_ok());
    }

    #[test]
    fn test_member_not_found_team() {
        let registry = TeamRegistry::new();
        let err = registry
            .add_member(uuid::Uuid::new_v4(), "u1".to_string())
            .unwrap_err();
        assert!(matches!(
            matchmaking_err(&err),
            MatchmakingError::TeamNotFound { .. }
        ));
    }

    #[test]
    fn test_leader_leaves_succession_and_disband() {
        let registry = TeamRegistry::new();
        let event = test_event("e1");

        let team = registry
            .create_team("leader".to_string(), &event, 4, TeamDetails::default())
            .unwrap();
        registry.add_member(team.id(), "u2".to_string()).unwrap();

        match registry.remove_member(team.id(), "leader").unwrap() {
            LeaveOutcome::Remaining { team, new_leader } => {
                assert_eq!(new_leader.as_deref(), Some("u2"));
                assert_eq!(team.leader(), "u2");
            }
            LeaveOutcome::Disbanded { .. } => panic!("team should survive"),
        }

        match registry.remove_member(team.id(), "u2").unwrap() {
            LeaveOutcome::Disbanded { team } => {
                assert_eq!(team.status(), TeamStatus::Disbanded);
            }
            LeaveOutcome::Remaining { .. } => panic!("team should disband"),
        }

        // Disbanded teams disappear from the active set.
        assert!(registry.get_team(team.id()).unwrap().is_none());
        let stats = registry.stats().unwrap();
        assert_eq!(stats.teams_closed, 1);
        assert_eq!(stats.active_teams, 0);
    }

    #[test]
    fn test_leader_only_operations() {
        let registry = TeamRegistry::new();
        let event = test_event("e1");

        let team = registry
            .create_team("leader".to_string(), &event, 4, TeamDetails::default())
            .unwrap();
        registry.add_member(team.id(), "u2".to_string()).unwrap();

        let err = registry
            .update_capacity(team.id(), "u2", 6)
            .unwrap_err();
        assert!(matches!(
            matchmaking_err(&err),
            MatchmakingError::NotLeader { .. }
        ));

        let err = registry
            .remove_specific_member(team.id(), "u2", "leader")
            .unwrap_err();
        assert!(matches!(
            matchmaking_err(&err),
            MatchmakingError::NotLeader { .. }
        ));

        let err = registry
            .remove_specific_member(team.id(), "leader", "leader")
            .unwrap_err();
        assert!(matches!(
            matchmaking_err(&err),
            MatchmakingError::CannotRemoveLeader { .. }
        ));

        let updated = registry
            .remove_specific_member(team.id(), "leader", "u2")
            .unwrap();
        assert_eq!(updated.size(), 1);
    }

    #[test]
    fn test_close_team() {
        let registry = TeamRegistry::new();
        let event = test_event("e1");

        let team = registry
            .create_team("leader".to_string(), &event, 4, TeamDetails::default())
            .unwrap();

        let err = registry
            .close_team(team.id(), "stranger", TeamStatus::Disbanded)
            .unwrap_err();
        assert!(matches!(
            matchmaking_err(&err),
            MatchmakingError::NotLeader { .. }
        ));

        let closed = registry
            .close_team(team.id(), "leader", TeamStatus::Completed)
            .unwrap();
        assert_eq!(closed.status(), TeamStatus::Completed);
        assert!(registry.get_team(team.id()).unwrap().is_none());

        // Leader is free for a new team in the same event.
        assert!(registry
            .create_team("leader".to_string(), &event, 4, TeamDetails::default())
            .is_ok());
    }

    #[test]
    fn test_teams_for_event_filtering() {
        let registry = TeamRegistry::new();
        let e1 = test_event("e1");
        let e2 = test_event("e2");

        let t1 = registry
            .create_team("l1".to_string(), &e1, 2, TeamDetails::default())
            .unwrap();
        registry
            .create_team("l2".to_string(), &e1, 4, TeamDetails::default())
            .unwrap();
        registry
            .create_team("l3".to_string(), &e2, 4, TeamDetails::default())
            .unwrap();

        registry.add_member(t1.id(), "u1".to_string()).unwrap();

        assert_eq!(registry.teams_for_event("e1", None).unwrap().len(), 2);
        assert_eq!(
            registry
                .teams_for_event("e1", Some(TeamStatus::Full))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(registry.teams_for_event("e2", None).unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_joins_never_overflow_capacity() {
        let registry = Arc::new(TeamRegistry::new());
        let event = test_event("e1");

        let team = registry
            .create_team("leader".to_string(), &event, 4, TeamDetails::default())
            .unwrap();
        let team_id = team.id();

        // 8 users race for the 3 remaining seats.
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry.add_member(team_id, format!("user-{}", i))
                })
            })
            .collect();

        let results: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let full_rejections = results
            .iter()
            .filter(|r| {
                r.as_ref().err().map_or(false, |e| {
                    matches!(
                        e.downcast_ref::<MatchmakingError>(),
                        Some(MatchmakingError::TeamFull { .. })
                    )
                })
            })
            .count();

        assert_eq!(successes, 3);
        assert_eq!(full_rejections, 5);

        let final_team = registry.get_team(team_id).unwrap().unwrap();
        assert_eq!(final_team.size(), 4);
        assert_eq!(final_team.status(), TeamStatus::Full);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_racing_joins_for_last_seat() {
        let registry = Arc::new(TeamRegistry::new());
        let event = test_event("e1");

        let team = registry
            .create_team("leader".to_string(), &event, 4, TeamDetails::default())
            .unwrap();
        let team_id = team.id();
        registry.add_member(team_id, "u2".to_string()).unwrap();
        registry.add_member(team_id, "u3".to_string()).unwrap();

        // Exactly one seat left, two distinct users racing.
        let a = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.add_member(team_id, "racer-a".to_string()) })
        };
        let b = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.add_member(team_id, "racer-b".to_string()) })
        };

        let (ra, rb) = (a.await.unwrap(), b.await.unwrap());
        assert!(ra.is_ok() != rb.is_ok(), "exactly one join must win");

        let loser = if ra.is_ok() { rb } else { ra };
        assert!(matches!(
            loser.unwrap_err().downcast_ref::<MatchmakingError>(),
            Some(MatchmakingError::TeamFull { .. })
        ));

        let final_team = registry.get_team(team_id).unwrap().unwrap();
        assert_eq!(final_team.size(), 4);
    }
}
