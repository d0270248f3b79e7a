//! Metadata request/response (api_key 3).

use crate::error::Result;
use crate::protocol::codec::{Decodable, Encodable, PacketDecoder, PacketEncoder};
use crate::protocol::kafka::{ApiKey, KafkaCode, ProtocolBody};
use serde::Serialize;

/// Ask for metadata on `topics`; an empty list asks for every topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRequest {
    pub topics: Vec<String>,
}

impl MetadataRequest {
    pub fn new(topics: Vec<String>) -> Self {
        Self { topics }
    }
}

impl Encodable for MetadataRequest {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_array(&self.topics, |enc, t| enc.put_string(t))
    }
}

impl ProtocolBody for MetadataRequest {
    const API_KEY: ApiKey = ApiKey::Metadata;
    type Response = MetadataResponse;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokerMetadata {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

impl BrokerMetadata {
    /// host:port, suitable for `Broker::new`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionMetadata {
    pub error: KafkaCode,
    pub partition_id: i32,
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicMetadata {
    pub error: KafkaCode,
    pub name: String,
    pub partitions: Vec<PartitionMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataResponse {
    pub brokers: Vec<BrokerMetadata>,
    pub topics: Vec<TopicMetadata>,
}

impl MetadataResponse {
    pub fn topic(&self, name: &str) -> Option<&TopicMetadata> {
        self.topics.iter().find(|t| t.name == name)
    }

    pub fn broker(&self, node_id: i32) -> Option<&BrokerMetadata> {
        self.brokers.iter().find(|b| b.node_id == node_id)
    }
}

impl Encodable for MetadataResponse {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_array(&self.brokers, |enc, b| {
            enc.put_i32(b.node_id);
            enc.put_string(&b.host)?;
            enc.put_i32(b.port);
            Ok(())
        })?;
        enc.put_array(&self.topics, |enc, t| {
            t.error.encode(enc)?;
            enc.put_string(&t.name)?;
            enc.put_array(&t.partitions, |enc, p| {
                p.error.encode(enc)?;
                enc.put_i32(p.partition_id);
                enc.put_i32(p.leader);
                enc.put_i32_array(&p.replicas)?;
                enc.put_i32_array(&p.isr)
            })
        })
    }
}

impl Decodable for MetadataResponse {
    fn decode(dec: &mut PacketDecoder<'_>) -> Result<Self> {
        let brokers = dec.get_array(|dec| {
            Ok(BrokerMetadata {
                node_id: dec.get_i32()?,
                host: dec.get_string()?,
                port: dec.get_i32()?,
            })
        })?;
        let topics = dec.get_array(|dec| {
            let error = KafkaCode::decode(dec)?;
            let name = dec.get_string()?;
            let partitions = dec.get_array(|dec| {
                Ok(PartitionMetadata {
                    error: KafkaCode::decode(dec)?,
                    partition_id: dec.get_i32()?,
                    leader: dec.get_i32()?,
                    replicas: dec.get_i32_array()?,
                    isr: dec.get_i32_array()?,
                })
            })?;
            Ok(TopicMetadata {
                error,
                name,
                partitions,
            })
        })?;
        Ok(Self { brokers, topics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::{decode_from_bytes, encode_to_bytes};

    #[test]
    fn empty_response_is_two_empty_arrays() {
        let resp: MetadataResponse = decode_from_bytes(&[0u8; 8]).unwrap();
        assert!(resp.brokers.is_empty());
        assert!(resp.topics.is_empty());
    }

    #[test]
    fn decodes_brokers_and_topics() {
        let resp = MetadataResponse {
            brokers: vec![BrokerMetadata {
                node_id: 1,
                host: "kafka-1".into(),
                port: 9092,
            }],
            topics: vec![TopicMetadata {
                error: KafkaCode::NoError,
                name: "events".into(),
                partitions: vec![PartitionMetadata {
                    error: KafkaCode::LeaderNotAvailable,
                    partition_id: 0,
                    leader: 1,
                    replicas: vec![1, 2],
                    isr: vec![1],
                }],
            }],
        };
        let raw = encode_to_bytes(&resp).unwrap();
        let decoded: MetadataResponse = decode_from_bytes(&raw).unwrap();
        assert_eq!(decoded.broker(1).unwrap().addr(), "kafka-1:9092");
        let events = decoded.topic("events").unwrap();
        assert_eq!(events.partitions[0].error, KafkaCode::LeaderNotAvailable);
        assert_eq!(events.partitions[0].replicas, vec![1, 2]);
    }
}
