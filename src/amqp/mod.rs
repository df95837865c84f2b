//! AMQP integration for the team formation engine
//!
//! The engine publishes domain events (request and team mutations) to AMQP
//! exchanges; notification delivery is the consumers' concern. There is no
//! inbound AMQP path - operations arrive through the library API.

pub mod connection;
pub mod messages;
pub mod publisher;

// Re-export commonly used types
pub use connection::AmqpConnection;
pub use messages::*;
pub use publisher::{EventPublisher, MockEventPublisher};
