//! Kafka wire protocol (v0): framing, request header and message payloads.
//!
//! Frame: length (4 bytes BE) | request header or correlation id | payload.
//! See frame.rs for framing and the message modules for payload layouts.

mod codec;
mod fetch;
mod frame;
mod kafka;
mod message;
mod metadata;
mod offset;
mod offset_commit;
mod offset_fetch;
mod produce;

pub use codec::{
    decode_from_bytes, encode_to_bytes, Decodable, Encodable, PacketDecoder, PacketEncoder,
};
pub use fetch::{
    FetchRequest, FetchRequestBlock, FetchResponse, FetchResponseBlock, FetchResponseTopic,
    CONSUMER_REPLICA_ID,
};
pub use frame::{
    encode_request_frame, frame_response, read_frame, take_correlation_id, write_frame,
    CORRELATION_ID_BYTES, DEFAULT_MAX_FRAME_LEN, LENGTH_PREFIX_BYTES,
};
pub use kafka::{ApiKey, KafkaCode, ProtocolBody, RequestHeader, RequiredAcks};
pub use message::{Message, MessageBlock, MessageSet};
pub use metadata::{
    BrokerMetadata, MetadataRequest, MetadataResponse, PartitionMetadata, TopicMetadata,
};
pub use offset::{
    OffsetRequest, OffsetRequestBlock, OffsetResponse, OffsetResponseBlock, OffsetResponseTopic,
    EARLIEST_TIME, LATEST_TIME,
};
pub use offset_commit::{
    OffsetCommitRequest, OffsetCommitRequestBlock, OffsetCommitResponse,
    OffsetCommitResponseBlock, OffsetCommitResponseTopic,
};
pub use offset_fetch::{
    OffsetFetchRequest, OffsetFetchResponse, OffsetFetchResponseBlock, OffsetFetchResponseTopic,
};
pub use produce::{ProduceRequest, ProduceResponse, ProduceResponseBlock, ProduceResponseTopic};
