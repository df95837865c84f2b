//! Common types used throughout the team formation engine

use crate::error::MatchmakingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for participants
pub type UserId = String;

/// Unique identifier for events (owned by the external event catalog)
pub type EventId = String;

/// Unique identifier for teams
pub type TeamId = Uuid;

/// Unique identifier for match requests
pub type RequestId = Uuid;

/// Ordinal experience tier of a participant
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ExperienceTier {
    Student,
    Junior,
    Mid,
    Senior,
    Lead,
}

impl std::fmt::Display for ExperienceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExperienceTier::Student => write!(f, "Student"),
            ExperienceTier::Junior => write!(f, "Junior"),
            ExperienceTier::Mid => write!(f, "Mid"),
            ExperienceTier::Senior => write!(f, "Senior"),
            ExperienceTier::Lead => write!(f, "Lead"),
        }
    }
}

/// Personality-trait vector, each scalar in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitVector {
    pub leadership: f64,
    pub collaboration: f64,
    pub innovation: f64,
    pub technical: f64,
    pub communication: f64,
}

impl TraitVector {
    /// Uniform vector, useful as a neutral default
    pub fn uniform(value: f64) -> Self {
        let v = value.clamp(0.0, 1.0);
        Self {
            leadership: v,
            collaboration: v,
            innovation: v,
            technical: v,
            communication: v,
        }
    }

    /// The five traits in declaration order
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.leadership,
            self.collaboration,
            self.innovation,
            self.technical,
            self.communication,
        ]
    }
}

/// Matching preferences owned by the participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingPreferences {
    /// Whether this participant shows up in candidate rankings
    pub allow_matching: bool,
    /// Preferred team roles, free-form tags
    pub preferred_roles: Vec<String>,
    /// Preferred team size, if the participant expressed one
    pub preferred_team_size: Option<usize>,
}

impl Default for MatchingPreferences {
    fn default() -> Self {
        Self {
            allow_matching: true,
            preferred_roles: Vec::new(),
            preferred_team_size: None,
        }
    }
}

/// Participant profile as consumed by the engine (read-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    /// Skill tags as entered; normalization happens at scoring time
    pub skills: Vec<String>,
    pub tier: Option<ExperienceTier>,
    pub traits: Option<TraitVector>,
    #[serde(default)]
    pub preferences: MatchingPreferences,
}

/// Event as consumed by the engine (read-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub title: String,
    pub min_team_size: usize,
    pub max_team_size: usize,
    pub registration_closes_at: Option<DateTime<Utc>>,
    pub formation_closes_at: Option<DateTime<Utc>>,
}

/// Lifecycle status of a match request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    /// Whether the request can still change state
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }
}

/// Kind of match request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Plain teammate interest, no team attached
    DirectMatch,
    /// Invitation into a specific team
    TeamInvite,
}

/// Recipient decision on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Accept,
    Reject,
}

impl std::str::FromStr for Decision {
    type Err = MatchmakingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accept" => Ok(Decision::Accept),
            "reject" => Ok(Decision::Reject),
            other => Err(MatchmakingError::InvalidDecision {
                value: other.to_string(),
            }),
        }
    }
}

/// Achieved points against the applicable maximum for one scoring term
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScore {
    pub points: f64,
    pub max: f64,
}

/// Compatibility score with its full per-term explanation
///
/// Terms that could not be evaluated (missing tier or trait vector on
/// either side) are `None` and excluded from both numerator and
/// denominator; `total` is always normalized back to [0, 100].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityScore {
    pub total: f64,
    pub skills: SubScore,
    pub tier: Option<SubScore>,
    pub traits: Option<SubScore>,
    /// Normalized skills both profiles share
    pub shared_skills: Vec<String>,
    /// Event the score was computed against, if any
    pub event_id: Option<EventId>,
}

impl CompatibilityScore {
    /// Sum of applicable maxima (the denominator of the normalization)
    pub fn applicable_max(&self) -> f64 {
        self.skills.max
            + self.tier.map_or(0.0, |s| s.max)
            + self.traits.map_or(0.0, |s| s.max)
    }

    /// Sum of achieved points across applicable terms
    pub fn achieved_points(&self) -> f64 {
        self.skills.points
            + self.tier.map_or(0.0, |s| s.points)
            + self.traits.map_or(0.0, |s| s.points)
    }
}

/// A directed, event-scoped match request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    pub id: RequestId,
    pub requester: UserId,
    pub recipient: UserId,
    pub event_id: EventId,
    pub team_id: Option<TeamId>,
    pub kind: RequestKind,
    pub message: Option<String>,
    /// Compatibility at creation time; immutable afterwards
    pub score: CompatibilityScore,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

/// A pair of mutually accepted requests for one event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutualMatch {
    pub user_id: UserId,
    pub event_id: EventId,
    pub matched_at: DateTime<Utc>,
}

/// Role a member fills on a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberRole {
    Frontend,
    Backend,
    Designer,
    DataScientist,
    ProductManager,
    Generalist,
}

impl Default for MemberRole {
    fn default() -> Self {
        MemberRole::Generalist
    }
}

/// A team member, in join order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: UserId,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

/// Lifecycle status of a team, derived from membership vs capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamStatus {
    /// Just created, only the leader on board
    Forming,
    /// Accepting members
    Open,
    /// At capacity
    Full,
    /// Finished its event (terminal)
    Completed,
    /// Abandoned or emptied out (terminal)
    Disbanded,
}

impl TeamStatus {
    /// Terminal teams no longer count against per-event membership
    pub fn is_terminal(&self) -> bool {
        matches!(self, TeamStatus::Completed | TeamStatus::Disbanded)
    }

    /// Whether new members may join in this status
    pub fn accepts_members(&self) -> bool {
        matches!(self, TeamStatus::Forming | TeamStatus::Open)
    }
}

impl std::fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamStatus::Forming => write!(f, "Forming"),
            TeamStatus::Open => write!(f, "Open"),
            TeamStatus::Full => write!(f, "Full"),
            TeamStatus::Completed => write!(f, "Completed"),
            TeamStatus::Disbanded => write!(f, "Disbanded"),
        }
    }
}

/// Caller-supplied team metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamDetails {
    pub name: String,
    pub description: Option<String>,
    pub tech_stack: Vec<String>,
}

/// Outbound event: a match request was created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestCreated {
    pub request_id: RequestId,
    pub requester: UserId,
    pub recipient: UserId,
    pub event_id: EventId,
    pub kind: RequestKind,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

/// Outbound event: a match request reached a terminal status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestResolved {
    pub request_id: RequestId,
    pub requester: UserId,
    pub recipient: UserId,
    pub event_id: EventId,
    pub status: RequestStatus,
    pub timestamp: DateTime<Utc>,
}

/// Outbound event: a user joined a team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberJoined {
    pub team_id: TeamId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub team_size: usize,
    pub team_status: TeamStatus,
    pub timestamp: DateTime<Utc>,
}

/// Outbound event: a user left a team (voluntarily or removed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberLeft {
    pub team_id: TeamId,
    pub event_id: EventId,
    pub user_id: UserId,
    /// Set when leadership transferred as part of the departure
    pub new_leader: Option<UserId>,
    pub remaining_members: usize,
    pub timestamp: DateTime<Utc>,
}

/// Outbound event: a team reached a terminal status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamClosed {
    pub team_id: TeamId,
    pub event_id: EventId,
    pub status: TeamStatus,
    pub timestamp: DateTime<Utc>,
}

/// Union type for all outbound AMQP messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    RequestCreated(RequestCreated),
    RequestResolved(RequestResolved),
    MemberJoined(MemberJoined),
    MemberLeft(MemberLeft),
    TeamClosed(TeamClosed),
}
