//! Team instance implementation and lifecycle management
//!
//! This module contains the core team logic: membership in join order,
//! capacity enforcement, leadership succession, and status transitions.
//! The registry serializes access; methods here assume exclusive access.

use crate::error::{MatchmakingError, Result};
use crate::types::{
    EventId, MemberRole, TeamDetails, TeamId, TeamMember, TeamStatus, UserId,
};
use crate::utils::{current_timestamp, generate_team_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of removing a member from a team
#[derive(Debug, Clone)]
pub enum LeaveOutcome {
    /// Members remain; leadership may have transferred
    Remaining {
        team: TeamInstance,
        new_leader: Option<UserId>,
    },
    /// The last member left; the team is disbanded
    Disbanded { team: TeamInstance },
}

/// Concrete team state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamInstance {
    id: TeamId,
    event_id: EventId,
    details: TeamDetails,
    leader: UserId,
    /// Members in join order; the leader is always present
    members: Vec<TeamMember>,
    max_members: usize,
    status: TeamStatus,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl TeamInstance {
    /// Create a new team with the creator as leader and sole member
    pub fn new(
        leader: UserId,
        event_id: EventId,
        max_members: usize,
        details: TeamDetails,
    ) -> Self {
        let now = current_timestamp();
        Self {
            id: generate_team_id(),
            event_id,
            details,
            leader: leader.clone(),
            members: vec![TeamMember {
                user_id: leader,
                role: MemberRole::default(),
                joined_at: now,
            }],
            max_members,
            status: TeamStatus::Forming,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn id(&self) -> TeamId {
        self.id
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn details(&self) -> &TeamDetails {
        &self.details
    }

    pub fn leader(&self) -> &UserId {
        &self.leader
    }

    pub fn members(&self) -> &[TeamMember] {
        &self.members
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn max_members(&self) -> usize {
        self.max_members
    }

    pub fn status(&self) -> TeamStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_members
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    pub fn is_leader(&self, user_id: &str) -> bool {
        self.leader == user_id
    }

    fn update_activity(&mut self) {
        self.last_activity = current_timestamp();
    }

    /// Recompute status from membership vs capacity. Status is derived,
    /// never independently stored, so it cannot drift. Terminal states
    /// are sticky.
    fn update_status(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = if self.members.len() >= self.max_members {
            TeamStatus::Full
        } else {
            TeamStatus::Open
        };
    }

    /// Add a member. The registry must already have verified event-level
    /// uniqueness; this checks the team-local invariants.
    pub fn add_member(&mut self, user_id: UserId, role: MemberRole) -> Result<()> {
        // Capacity before status: a team that is merely full reports
        // TeamFull, not TeamNotOpen.
        if self.is_full() {
            return Err(MatchmakingError::TeamFull {
                team_id: self.id.to_string(),
            }
            .into());
        }

        if !self.status.accepts_members() {
            return Err(MatchmakingError::TeamNotOpen {
                team_id: self.id.to_string(),
            }
            .into());
        }

        if self.is_member(&user_id) {
            return Err(MatchmakingError::AlreadyMember {
                user_id,
                team_id: self.id.to_string(),
            }
            .into());
        }

        self.members.push(TeamMember {
            user_id,
            role,
            joined_at: current_timestamp(),
        });

        self.update_activity();
        self.update_status();
        Ok(())
    }

    /// Remove a member. If the leader leaves with others remaining,
    /// leadership transfers to the first remaining member in join order.
    /// The last member leaving disbands the team.
    pub fn remove_member(&mut self, user_id: &str) -> Result<LeaveOutcome> {
        if !self.is_member(user_id) {
            return Err(MatchmakingError::NotMember {
                user_id: user_id.to_string(),
                team_id: self.id.to_string(),
            }
            .into());
        }

        self.members.retain(|m| m.user_id != user_id);
        self.update_activity();

        if self.members.is_empty() {
            self.status = TeamStatus::Disbanded;
            return Ok(LeaveOutcome::Disbanded { team: self.clone() });
        }

        let mut new_leader = None;
        if self.leader == user_id {
            // Join order is the deterministic tie-break for succession.
            let successor = self.members[0].user_id.clone();
            self.leader = successor.clone();
            new_leader = Some(successor);
        }

        self.update_status();
        Ok(LeaveOutcome::Remaining {
            team: self.clone(),
            new_leader,
        })
    }

    /// Change the capacity. Rejects values below the current size;
    /// recomputes status in both directions.
    pub fn update_capacity(&mut self, new_max: usize) -> Result<()> {
        if new_max < self.members.len() {
            return Err(MatchmakingError::CapacityBelowCurrentSize {
                requested: new_max,
                current: self.members.len(),
            }
            .into());
        }

        self.max_members = new_max;
        self.update_activity();
        self.update_status();
        Ok(())
    }

    /// Move the team into a terminal status
    pub fn close(&mut self, status: TeamStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.update_activity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_team(leader: &str, max_members: usize) -> TeamInstance {
        TeamInstance::new(
            leader.to_string(),
            "event-1".to_string(),
            max_members,
            TeamDetails {
                name: "Test Team".to_string(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_team_creation() {
        let team = test_team("leader", 4);

        assert_eq!(team.status(), TeamStatus::Forming);
        assert_eq!(team.size(), 1);
        assert!(team.is_member("leader"));
        assert!(team.is_leader("leader"));
        assert!(!team.is_full());
    }

    #[test]
    fn test_add_member_until_full() {
        let mut team = test_team("leader", 3);

        team.add_member("u2".to_string(), MemberRole::default())
            .unwrap();
        assert_eq!(team.status(), TeamStatus::Open);

        team.add_member("u3".to_string(), MemberRole::Backend)
            .unwrap();
        assert_eq!(team.status(), TeamStatus::Full);
        assert!(team.is_full());

        let err = team
            .add_member("u4".to_string(), MemberRole::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MatchmakingError>(),
            Some(MatchmakingError::TeamFull { .. })
        ));
    }

    #[test]
    fn test_full_at_exact_capacity_boundary() {
        let mut team = test_team("leader", 2);
        team.add_member("u2".to_string(), MemberRole::default())
            .unwrap();

        assert_eq!(team.size(), team.max_members());
        assert_eq!(team.status(), TeamStatus::Full);
    }

    #[test]
    fn test_duplicate_member_rejected() {
        let mut team = test_team("leader", 4);
        team.add_member("u2".to_string(), MemberRole::default())
            .unwrap();

        let err = team
            .add_member("u2".to_string(), MemberRole::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MatchmakingError>(),
            Some(MatchmakingError::AlreadyMember { .. })
        ));
    }

    #[test]
    fn test_leader_succession_follows_join_order() {
        let mut team = test_team("leader", 4);
        team.add_member("u2".to_string(), MemberRole::default())
            .unwrap();
        team.add_member("u3".to_string(), MemberRole::default())
            .unwrap();

        let outcome = team.remove_member("leader").unwrap();
        match outcome {
            LeaveOutcome::Remaining { team, new_leader } => {
                assert_eq!(new_leader.as_deref(), Some("u2"));
                assert_eq!(team.leader(), "u2");
                assert_eq!(team.size(), 2);
            }
            LeaveOutcome::Disbanded { .. } => panic!("team should survive"),
        }
    }

    #[test]
    fn test_non_leader_departure_keeps_leader() {
        let mut team = test_team("leader", 4);
        team.add_member("u2".to_string(), MemberRole::default())
            .unwrap();

        let outcome = team.remove_member("u2").unwrap();
        match outcome {
            LeaveOutcome::Remaining { team, new_leader } => {
                assert!(new_leader.is_none());
                assert_eq!(team.leader(), "leader");
            }
            LeaveOutcome::Disbanded { .. } => panic!("team should survive"),
        }
    }

    #[test]
    fn test_last_member_disbands() {
        let mut team = test_team("leader", 4);

        let outcome = team.remove_member("leader").unwrap();
        assert!(matches!(outcome, LeaveOutcome::Disbanded { .. }));
        assert_eq!(team.status(), TeamStatus::Disbanded);
    }

    #[test]
    fn test_remove_unknown_member() {
        let mut team = test_team("leader", 4);
        let err = team.remove_member("ghost").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MatchmakingError>(),
            Some(MatchmakingError::NotMember { .. })
        ));
    }

    #[test]
    fn test_full_reopens_when_member_leaves() {
        let mut team = test_team("leader", 2);
        team.add_member("u2".to_string(), MemberRole::default())
            .unwrap();
        assert_eq!(team.status(), TeamStatus::Full);

        team.remove_member("u2").unwrap();
        assert_eq!(team.status(), TeamStatus::Open);
    }

    #[test]
    fn test_capacity_update() {
        let mut team = test_team("leader", 2);
        team.add_member("u2".to_string(), MemberRole::default())
            .unwrap();

        let err = team.update_capacity(1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MatchmakingError>(),
            Some(MatchmakingError::CapacityBelowCurrentSize { .. })
        ));

        // Raising capacity reopens a full team.
        team.update_capacity(4).unwrap();
        assert_eq!(team.status(), TeamStatus::Open);

        // Shrinking back to the current size makes it full again.
        team.update_capacity(2).unwrap();
        assert_eq!(team.status(), TeamStatus::Full);
    }

    #[test]
    fn test_terminal_status_is_sticky() {
        let mut team = test_team("leader", 4);
        team.close(TeamStatus::Completed);

        let err = team
            .add_member("u2".to_string(), MemberRole::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MatchmakingError>(),
            Some(MatchmakingError::TeamNotOpen { .. })
        ));
        assert_eq!(team.status(), TeamStatus::Completed);
    }
}
