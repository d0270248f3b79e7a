//! Kafka protocol constants: API keys, acknowledgment modes, error codes and
//! the request header.
//!
//! Request header (v0): api_key (int16), api_version (int16),
//! correlation_id (int32), client_id (string).

use crate::error::{BrokerError, Result};
use crate::protocol::codec::{Decodable, Encodable, PacketDecoder, PacketEncoder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every request kind this client can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ApiKey {
    Produce = 0,
    Fetch = 1,
    Offsets = 2,
    Metadata = 3,
    OffsetCommit = 8,
    OffsetFetch = 9,
}

impl ApiKey {
    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn name(self) -> &'static str {
        match self {
            ApiKey::Produce => "Produce",
            ApiKey::Fetch => "Fetch",
            ApiKey::Offsets => "Offsets",
            ApiKey::Metadata => "Metadata",
            ApiKey::OffsetCommit => "OffsetCommit",
            ApiKey::OffsetFetch => "OffsetFetch",
        }
    }
}

impl TryFrom<i16> for ApiKey {
    type Error = BrokerError;

    fn try_from(v: i16) -> Result<Self> {
        Ok(match v {
            0 => ApiKey::Produce,
            1 => ApiKey::Fetch,
            2 => ApiKey::Offsets,
            3 => ApiKey::Metadata,
            8 => ApiKey::OffsetCommit,
            9 => ApiKey::OffsetFetch,
            _ => return Err(BrokerError::Decode(format!("unknown api_key {}", v))),
        })
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A request body paired at compile time with the response it produces.
pub trait ProtocolBody: Encodable {
    const API_KEY: ApiKey;
    const API_VERSION: i16 = 0;
    type Response: Decodable;
}

/// How many acknowledgements the broker must collect before answering a
/// produce request. `NoResponse` means the broker never answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequiredAcks {
    NoResponse,
    #[default]
    WaitForLocal,
    WaitForAll,
    /// Wait for an explicit number of in-sync replicas.
    Other(i16),
}

impl RequiredAcks {
    pub fn as_i16(self) -> i16 {
        match self {
            RequiredAcks::NoResponse => 0,
            RequiredAcks::WaitForLocal => 1,
            RequiredAcks::WaitForAll => -1,
            RequiredAcks::Other(n) => n,
        }
    }

    /// Whether the broker sends a response for this acknowledgment mode.
    pub fn expects_response(self) -> bool {
        self != RequiredAcks::NoResponse
    }
}

impl From<i16> for RequiredAcks {
    fn from(v: i16) -> Self {
        match v {
            0 => RequiredAcks::NoResponse,
            1 => RequiredAcks::WaitForLocal,
            -1 => RequiredAcks::WaitForAll,
            n => RequiredAcks::Other(n),
        }
    }
}

/// Error codes carried inside responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KafkaCode {
    #[default]
    NoError,
    Unknown,
    OffsetOutOfRange,
    InvalidMessage,
    UnknownTopicOrPartition,
    InvalidMessageSize,
    LeaderNotAvailable,
    NotLeaderForPartition,
    RequestTimedOut,
    BrokerNotAvailable,
    ReplicaNotAvailable,
    MessageSizeTooLarge,
    StaleControllerEpoch,
    OffsetMetadataTooLarge,
    Other(i16),
}

impl KafkaCode {
    pub fn is_ok(self) -> bool {
        self == KafkaCode::NoError
    }

    pub fn as_i16(self) -> i16 {
        match self {
            KafkaCode::NoError => 0,
            KafkaCode::Unknown => -1,
            KafkaCode::OffsetOutOfRange => 1,
            KafkaCode::InvalidMessage => 2,
            KafkaCode::UnknownTopicOrPartition => 3,
            KafkaCode::InvalidMessageSize => 4,
            KafkaCode::LeaderNotAvailable => 5,
            KafkaCode::NotLeaderForPartition => 6,
            KafkaCode::RequestTimedOut => 7,
            KafkaCode::BrokerNotAvailable => 8,
            KafkaCode::ReplicaNotAvailable => 9,
            KafkaCode::MessageSizeTooLarge => 10,
            KafkaCode::StaleControllerEpoch => 11,
            KafkaCode::OffsetMetadataTooLarge => 12,
            KafkaCode::Other(n) => n,
        }
    }
}

impl From<i16> for KafkaCode {
    fn from(v: i16) -> Self {
        match v {
            0 => KafkaCode::NoError,
            -1 => KafkaCode::Unknown,
            1 => KafkaCode::OffsetOutOfRange,
            2 => KafkaCode::InvalidMessage,
            3 => KafkaCode::UnknownTopicOrPartition,
            4 => KafkaCode::InvalidMessageSize,
            5 => KafkaCode::LeaderNotAvailable,
            6 => KafkaCode::NotLeaderForPartition,
            7 => KafkaCode::RequestTimedOut,
            8 => KafkaCode::BrokerNotAvailable,
            9 => KafkaCode::ReplicaNotAvailable,
            10 => KafkaCode::MessageSizeTooLarge,
            11 => KafkaCode::StaleControllerEpoch,
            12 => KafkaCode::OffsetMetadataTooLarge,
            n => KafkaCode::Other(n),
        }
    }
}

impl fmt::Display for KafkaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KafkaCode::Other(n) => write!(f, "kafka error code {}", n),
            other => write!(f, "{:?}", other),
        }
    }
}

impl Encodable for KafkaCode {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_i16(self.as_i16());
        Ok(())
    }
}

impl Decodable for KafkaCode {
    fn decode(dec: &mut PacketDecoder<'_>) -> Result<Self> {
        Ok(KafkaCode::from(dec.get_i16()?))
    }
}

/// Header in front of every request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub api_key: i16,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: Option<String>,
}

impl Encodable for RequestHeader {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_i16(self.api_key);
        enc.put_i16(self.api_version);
        enc.put_i32(self.correlation_id);
        enc.put_nullable_string(self.client_id.as_deref())
    }
}

impl Decodable for RequestHeader {
    fn decode(dec: &mut PacketDecoder<'_>) -> Result<Self> {
        let api_key = dec.get_i16()?;
        let api_version = dec.get_i16()?;
        let correlation_id = dec.get_i32()?;
        let client_id = dec.get_nullable_string()?;
        Ok(Self {
            api_key,
            api_version,
            correlation_id,
            client_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_acks_wire_values() {
        assert_eq!(RequiredAcks::NoResponse.as_i16(), 0);
        assert_eq!(RequiredAcks::WaitForLocal.as_i16(), 1);
        assert_eq!(RequiredAcks::WaitForAll.as_i16(), -1);
        assert_eq!(RequiredAcks::from(3), RequiredAcks::Other(3));
        assert!(!RequiredAcks::NoResponse.expects_response());
        assert!(RequiredAcks::Other(2).expects_response());
    }

    #[test]
    fn kafka_codes_map_both_ways() {
        for raw in -1i16..=12 {
            assert_eq!(KafkaCode::from(raw).as_i16(), raw);
        }
        assert_eq!(KafkaCode::from(99), KafkaCode::Other(99));
        assert!(KafkaCode::from(0).is_ok());
    }

    #[test]
    fn api_key_rejects_unknown() {
        assert_eq!(ApiKey::try_from(9).unwrap(), ApiKey::OffsetFetch);
        assert!(ApiKey::try_from(18).is_err());
    }
}
