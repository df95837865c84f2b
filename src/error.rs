//! Error types for the team formation engine
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Coarse error classification, stable across releases.
///
/// The API layer maps kinds to user-visible responses; the engine itself
/// only guarantees that every error carries exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected synchronously and never retried
    Validation,
    /// A named conflict with current state; the caller decides what to do
    Conflict,
    /// The acting user is not allowed to perform this operation
    Authorization,
    /// Referenced entity does not exist
    NotFound,
    /// Infrastructure or invariant failure inside the engine
    Internal,
}

/// Custom error types for specific matchmaking and team scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Cannot send a match request to yourself: {user_id}")]
    SelfRequest { user_id: String },

    #[error("Invalid decision: {value} (expected 'accept' or 'reject')")]
    InvalidDecision { value: String },

    #[error("Invalid team capacity: {reason}")]
    InvalidCapacity { reason: String },

    #[error("Capacity {requested} is below current team size {current}")]
    CapacityBelowCurrentSize { requested: usize, current: usize },

    #[error(
        "A pending request from {requester} to {recipient} already exists for event {event_id}"
    )]
    DuplicateActiveRequest {
        requester: String,
        recipient: String,
        event_id: String,
    },

    #[error("Match request already resolved: {request_id}")]
    AlreadyResolved { request_id: String },

    #[error("User {user_id} already belongs to a team for event {event_id}")]
    AlreadyOnTeam { user_id: String, event_id: String },

    #[error("User {user_id} is already a member of team {team_id}")]
    AlreadyMember { user_id: String, team_id: String },

    #[error("User {user_id} is not a member of team {team_id}")]
    NotMember { user_id: String, team_id: String },

    #[error("Team is full: {team_id}")]
    TeamFull { team_id: String },

    #[error("Team is not accepting members: {team_id}")]
    TeamNotOpen { team_id: String },

    #[error("Cannot remove the team leader from team {team_id}")]
    CannotRemoveLeader { team_id: String },

    #[error("User {user_id} has matching disabled")]
    MatchingDisabled { user_id: String },

    #[error("Only the recipient may respond to request {request_id}")]
    NotRecipient { request_id: String },

    #[error("Only the requester may cancel request {request_id}")]
    NotRequester { request_id: String },

    #[error("Only the team leader may perform this on team {team_id}")]
    NotLeader { team_id: String },

    #[error("Match request not found: {request_id}")]
    RequestNotFound { request_id: String },

    #[error("Team not found: {team_id}")]
    TeamNotFound { team_id: String },

    #[error("Profile not found: {user_id}")]
    ProfileNotFound { user_id: String },

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: String },

    #[error("AMQP connection failed: {message}")]
    AmqpConnectionFailed { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MatchmakingError {
    /// The stable classification of this error (see [`ErrorKind`]).
    pub fn kind(&self) -> ErrorKind {
        use MatchmakingError::*;
        match self {
            SelfRequest { .. }
            | InvalidDecision { .. }
            | InvalidCapacity { .. }
            | CapacityBelowCurrentSize { .. } => ErrorKind::Validation,

            DuplicateActiveRequest { .. }
            | AlreadyResolved { .. }
            | AlreadyOnTeam { .. }
            | AlreadyMember { .. }
            | NotMember { .. }
            | TeamFull { .. }
            | TeamNotOpen { .. }
            | CannotRemoveLeader { .. }
            | MatchingDisabled { .. } => ErrorKind::Conflict,

            NotRecipient { .. } | NotRequester { .. } | NotLeader { .. } => {
                ErrorKind::Authorization
            }

            RequestNotFound { .. }
            | TeamNotFound { .. }
            | ProfileNotFound { .. }
            | EventNotFound { .. } => ErrorKind::NotFound,

            AmqpConnectionFailed { .. } | ConfigurationError { .. } | InternalError { .. } => {
                ErrorKind::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            MatchmakingError::SelfRequest {
                user_id: "u1".to_string()
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            MatchmakingError::TeamFull {
                team_id: "t1".to_string()
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            MatchmakingError::NotLeader {
                team_id: "t1".to_string()
            }
            .kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            MatchmakingError::EventNotFound {
                event_id: "e1".to_string()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            MatchmakingError::InternalError {
                message: "boom".to_string()
            }
            .kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = MatchmakingError::RequestNotFound {
            request_id: "r1".to_string(),
        }
        .into();

        let matchmaking = err.downcast_ref::<MatchmakingError>().unwrap();
        assert_eq!(matchmaking.kind(), ErrorKind::NotFound);
    }
}
