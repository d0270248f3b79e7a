//! Test collaborators for exercising broker connections without a real
//! Kafka cluster.
//!
//! - `mock_broker.rs` - localhost server replaying queued responses

mod mock_broker;

pub use mock_broker::{MockBroker, MockResponse};
