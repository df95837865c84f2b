//! AMQP event publisher for outbound engine events

use crate::amqp::messages::{exchange_for, routing_key_for, MessageEnvelope};
use crate::error::{MatchmakingError, Result};
use crate::types::EngineEvent;
use amqprs::{
    channel::{BasicPublishArguments, Channel, ExchangeDeclareArguments},
    BasicProperties,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Trait for publishing engine events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one engine event to its exchange
    async fn publish(&self, event: EngineEvent) -> Result<()>;
}

/// Configuration for event publishing
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub enable_deduplication: bool,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 500,
            enable_deduplication: true,
        }
    }
}

/// AMQP-based event publisher implementation
pub struct AmqpEventPublisher {
    channel: Channel,
    config: PublisherConfig,
    // Correlation ids already published, for dedup on retry paths
    published_messages: std::sync::Mutex<std::collections::HashSet<String>>,
}

impl AmqpEventPublisher {
    /// Create a new event publisher and declare its exchanges
    pub async fn new(channel: Channel, config: PublisherConfig) -> Result<Self> {
        let publisher = Self {
            channel,
            config,
            published_messages: std::sync::Mutex::new(std::collections::HashSet::new()),
        };

        publisher.setup_exchanges().await?;
        Ok(publisher)
    }

    async fn setup_exchanges(&self) -> Result<()> {
        for exchange in [
            crate::amqp::messages::MATCH_EVENTS_EXCHANGE,
            crate::amqp::messages::TEAM_EVENTS_EXCHANGE,
        ] {
            let args = ExchangeDeclareArguments::new(exchange, "topic");
            self.channel.exchange_declare(args).await.map_err(|e| {
                MatchmakingError::AmqpConnectionFailed {
                    message: format!("Failed to declare exchange {}: {}", exchange, e),
                }
            })?;
        }

        info!("Successfully set up AMQP exchanges");
        Ok(())
    }

    /// Publish to an exchange with retry and optional dedup
    async fn publish_to_exchange(
        &self,
        exchange: &str,
        envelope: &MessageEnvelope<EngineEvent>,
    ) -> Result<()> {
        if self.config.enable_deduplication {
            let published_messages =
                self.published_messages
                    .lock()
                    .map_err(|_| MatchmakingError::InternalError {
                        message: "Failed to acquire published messages lock".to_string(),
                    })?;
            if published_messages.contains(&envelope.correlation_id) {
                debug!(
                    "Message {} already published, skipping",
                    envelope.correlation_id
                );
                return Ok(());
            }
        }

        let mut retry_count = 0;
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);

        loop {
            match self.try_publish(exchange, envelope).await {
                Ok(_) => {
                    if self.config.enable_deduplication {
                        let mut published_messages =
                            self.published_messages.lock().map_err(|_| {
                                MatchmakingError::InternalError {
                                    message: "Failed to acquire published messages lock"
                                        .to_string(),
                                }
                            })?;
                        published_messages.insert(envelope.correlation_id.clone());
                    }

                    debug!(
                        "Published message {} to exchange {}",
                        envelope.correlation_id, exchange
                    );
                    return Ok(());
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count > self.config.max_retries {
                        error!(
                            "Failed to publish message {} after {} retries: {}",
                            envelope.correlation_id, self.config.max_retries, e
                        );
                        return Err(e);
                    }

                    warn!(
                        "Publish attempt {} failed for message {}: {}. Retrying in {:?}",
                        retry_count, envelope.correlation_id, e, delay
                    );

                    sleep(delay).await;
                    delay = Duration::from_millis((delay.as_millis() as u64 * 2).min(5000));
                }
            }
        }
    }

    async fn try_publish(
        &self,
        exchange: &str,
        envelope: &MessageEnvelope<EngineEvent>,
    ) -> Result<()> {
        let payload = envelope.to_bytes()?;

        let args = BasicPublishArguments::new(exchange, &envelope.routing_key);
        let mut properties = BasicProperties::default();
        properties
            .with_message_id(&envelope.correlation_id)
            .with_timestamp(envelope.timestamp.timestamp() as u64)
            .with_content_type("application/json");

        self.channel
            .basic_publish(properties, payload, args)
            .await
            .map_err(|e| MatchmakingError::AmqpConnectionFailed {
                message: format!("Failed to publish message: {}", e),
            })?;

        Ok(())
    }
}

#[async_trait]
impl EventPublisher for AmqpEventPublisher {
    async fn publish(&self, event: EngineEvent) -> Result<()> {
        let routing_key = routing_key_for(&event).to_string();
        let exchange = exchange_for(&event);
        let envelope = MessageEnvelope::new(event, routing_key);
        self.publish_to_exchange(exchange, &envelope).await
    }
}

/// Mock event publisher for testing
#[derive(Debug, Default)]
pub struct MockEventPublisher {
    published_events: std::sync::Mutex<Vec<EngineEvent>>,
}

impl MockEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far (for assertions)
    pub fn published_events(&self) -> Vec<EngineEvent> {
        self.published_events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Routing keys of all published events, in order
    pub fn published_routing_keys(&self) -> Vec<&'static str> {
        self.published_events()
            .iter()
            .map(routing_key_for)
            .collect()
    }

    /// Clear published events
    pub fn clear_events(&self) {
        if let Ok(mut events) = self.published_events.lock() {
            events.clear();
        }
    }
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish(&self, event: EngineEvent) -> Result<()> {
        if let Ok(mut events) = self.published_events.lock() {
            events.push(event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemberJoined, TeamStatus};
    use crate::utils::current_timestamp;

    #[tokio::test]
    async fn test_mock_publisher_records_events() {
        let publisher = MockEventPublisher::new();

        publisher
            .publish(EngineEvent::MemberJoined(MemberJoined {
                team_id: uuid::Uuid::new_v4(),
                event_id: "e1".to_string(),
                user_id: "u1".to_string(),
                team_size: 2,
                team_status: TeamStatus::Open,
                timestamp: current_timestamp(),
            }))
            .await
            .unwrap();

        assert_eq!(publisher.published_events().len(), 1);
        assert_eq!(
            publisher.published_routing_keys(),
            vec!["team.member_joined"]
        );

        publisher.clear_events();
        assert!(publisher.published_events().is_empty());
    }
}
