//! Store traits for profiles and events, plus the in-memory implementation
//!
//! Production deployments back these traits with the platform's profile
//! and event services. The in-memory directory keeps the same contract
//! and is what tests and the match-tester binary wire up.

use crate::error::{MatchmakingError, Result};
use crate::types::{Event, EventId, Profile};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Read access to participant profiles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a single profile by user id.
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    /// All profiles eligible for matching: participants who have not
    /// disabled matching. The caller is responsible for excluding itself.
    async fn eligible_profiles(&self, event_id: &str) -> Result<Vec<Profile>>;
}

/// Read access to the event catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Fetch a single event by id.
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>>;
}

/// In-memory profile/event directory.
///
/// Backs both store traits with RwLock-protected maps. Writes are only
/// used by test setup and the tester binary; the engine itself never
/// mutates directory state.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    profiles: RwLock<HashMap<String, Profile>>,
    events: RwLock<HashMap<EventId, Event>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile.
    pub fn upsert_profile(&self, profile: Profile) -> Result<()> {
        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire profiles lock".to_string(),
            })?;
        profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    /// Insert or replace an event.
    pub fn upsert_event(&self, event: Event) -> Result<()> {
        let mut events = self
            .events
            .write()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire events lock".to_string(),
            })?;
        events.insert(event.event_id.clone(), event);
        Ok(())
    }

    /// Number of stored profiles (for diagnostics)
    pub fn profile_count(&self) -> usize {
        self.profiles.read().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ProfileStore for InMemoryDirectory {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire profiles lock".to_string(),
            })?;
        Ok(profiles.get(user_id).cloned())
    }

    async fn eligible_profiles(&self, _event_id: &str) -> Result<Vec<Profile>> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire profiles lock".to_string(),
            })?;

        Ok(profiles
            .values()
            .filter(|p| p.preferences.allow_matching)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EventStore for InMemoryDirectory {
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>> {
        let events = self
            .events
            .read()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire events lock".to_string(),
            })?;
        Ok(events.get(event_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchingPreferences, Profile};

    fn test_profile(id: &str, allow_matching: bool) -> Profile {
        Profile {
            user_id: id.to_string(),
            display_name: id.to_string(),
            skills: vec!["Rust".to_string()],
            tier: None,
            traits: None,
            preferences: MatchingPreferences {
                allow_matching,
                ..Default::default()
            },
        }
    }

    fn test_event(id: &str) -> Event {
        Event {
            event_id: id.to_string(),
            title: format!("Event {}", id),
            min_team_size: 2,
            max_team_size: 5,
            registration_closes_at: None,
            formation_closes_at: None,
        }
    }

    #[tokio::test]
    async fn test_profile_roundtrip() {
        let directory = InMemoryDirectory::new();
        directory.upsert_profile(test_profile("u1", true)).unwrap();

        let fetched = directory.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(fetched.user_id, "u1");

        assert!(directory.get_profile("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eligible_profiles_excludes_matching_disabled() {
        let directory = InMemoryDirectory::new();
        directory.upsert_profile(test_profile("u1", true)).unwrap();
        directory.upsert_profile(test_profile("u2", false)).unwrap();
        directory.upsert_profile(test_profile("u3", true)).unwrap();

        let eligible = directory.eligible_profiles("e1").await.unwrap();
        assert_eq!(eligible.len(), 2);
        assert!(eligible.iter().all(|p| p.user_id != "u2"));
    }

    #[tokio::test]
    async fn test_event_roundtrip() {
        let directory = InMemoryDirectory::new();
        directory.upsert_event(test_event("hack-1")).unwrap();

        let fetched = directory.get_event("hack-1").await.unwrap().unwrap();
        assert_eq!(fetched.max_team_size, 5);
        assert!(directory.get_event("nope").await.unwrap().is_none());
    }
}
