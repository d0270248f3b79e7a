//! Brokerlink: a single-broker Kafka wire protocol connection.
//!
//! Frames requests, assigns correlation ids, matches each response to its
//! request and honours fire-and-forget produces (`RequiredAcks::NoResponse`).

pub mod broker;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod testing;

pub use broker::{Broker, BrokerConfig, UNASSIGNED_ID};
pub use error::{BrokerError, Result};
pub use protocol::{
    FetchRequest, FetchResponse, KafkaCode, Message, MessageSet, MetadataRequest,
    MetadataResponse, OffsetCommitRequest, OffsetCommitResponse, OffsetFetchRequest,
    OffsetFetchResponse, OffsetRequest, OffsetResponse, ProduceRequest, ProduceResponse,
    RequiredAcks,
};
