//! AMQP message definitions and serialization

use crate::error::{MatchmakingError, Result};
use crate::types::EngineEvent;

/// AMQP exchange names
pub const MATCH_EVENTS_EXCHANGE: &str = "teamforge.match_events";
pub const TEAM_EVENTS_EXCHANGE: &str = "teamforge.team_events";

/// Routing keys for events
pub const REQUEST_CREATED_ROUTING_KEY: &str = "request.created";
pub const REQUEST_RESOLVED_ROUTING_KEY: &str = "request.resolved";
pub const MEMBER_JOINED_ROUTING_KEY: &str = "team.member_joined";
pub const MEMBER_LEFT_ROUTING_KEY: &str = "team.member_left";
pub const TEAM_CLOSED_ROUTING_KEY: &str = "team.closed";

/// Message envelope with metadata
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageEnvelope<T> {
    pub payload: T,
    pub correlation_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub routing_key: String,
}

impl<T> MessageEnvelope<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Create a new message envelope
    pub fn new(payload: T, routing_key: String) -> Self {
        Self {
            payload,
            correlation_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            routing_key,
        }
    }

    /// Serialize the envelope to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            MatchmakingError::InternalError {
                message: format!("Failed to serialize message: {}", e),
            }
            .into()
        })
    }

    /// Deserialize an envelope from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            MatchmakingError::InternalError {
                message: format!("Failed to deserialize message: {}", e),
            }
            .into()
        })
    }
}

/// Routing key for an outbound engine event
pub fn routing_key_for(event: &EngineEvent) -> &'static str {
    match event {
        EngineEvent::RequestCreated(_) => REQUEST_CREATED_ROUTING_KEY,
        EngineEvent::RequestResolved(_) => REQUEST_RESOLVED_ROUTING_KEY,
        EngineEvent::MemberJoined(_) => MEMBER_JOINED_ROUTING_KEY,
        EngineEvent::MemberLeft(_) => MEMBER_LEFT_ROUTING_KEY,
        EngineEvent::TeamClosed(_) => TEAM_CLOSED_ROUTING_KEY,
    }
}

/// Exchange an outbound engine event belongs on
pub fn exchange_for(event: &EngineEvent) -> &'static str {
    match event {
        EngineEvent::RequestCreated(_) | EngineEvent::RequestResolved(_) => MATCH_EVENTS_EXCHANGE,
        EngineEvent::MemberJoined(_) | EngineEvent::MemberLeft(_) | EngineEvent::TeamClosed(_) => {
            TEAM_EVENTS_EXCHANGE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RequestResolved, RequestStatus, TeamClosed, TeamStatus};
    use crate::utils::current_timestamp;

    fn resolved_event() -> EngineEvent {
        EngineEvent::RequestResolved(RequestResolved {
            request_id: uuid::Uuid::new_v4(),
            requester: "a".to_string(),
            recipient: "b".to_string(),
            event_id: "e1".to_string(),
            status: RequestStatus::Accepted,
            timestamp: current_timestamp(),
        })
    }

    #[test]
    fn test_message_envelope_creation() {
        let envelope = MessageEnvelope::new(resolved_event(), "request.resolved".to_string());
        assert_eq!(envelope.routing_key, "request.resolved");
        assert!(!envelope.correlation_id.is_empty());
    }

    #[test]
    fn test_envelope_serialization_roundtrip() {
        let envelope = MessageEnvelope::new(resolved_event(), "request.resolved".to_string());
        let bytes = envelope.to_bytes().unwrap();
        let decoded: MessageEnvelope<EngineEvent> = MessageEnvelope::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.correlation_id, envelope.correlation_id);
        match decoded.payload {
            EngineEvent::RequestResolved(r) => assert_eq!(r.status, RequestStatus::Accepted),
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_routing_and_exchange_mapping() {
        let event = resolved_event();
        assert_eq!(routing_key_for(&event), REQUEST_RESOLVED_ROUTING_KEY);
        assert_eq!(exchange_for(&event), MATCH_EVENTS_EXCHANGE);

        let closed = EngineEvent::TeamClosed(TeamClosed {
            team_id: uuid::Uuid::new_v4(),
            event_id: "e1".to_string(),
            status: TeamStatus::Disbanded,
            timestamp: current_timestamp(),
        });
        assert_eq!(routing_key_for(&closed), TEAM_CLOSED_ROUTING_KEY);
        assert_eq!(exchange_for(&closed), TEAM_EVENTS_EXCHANGE);
    }
}
