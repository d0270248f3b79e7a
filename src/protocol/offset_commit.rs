//! OffsetCommit request/response (api_key 8, version 0).

use crate::error::Result;
use crate::protocol::codec::{Decodable, Encodable, PacketDecoder, PacketEncoder};
use crate::protocol::kafka::{ApiKey, KafkaCode, ProtocolBody};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCommitRequestBlock {
    pub offset: i64,
    pub metadata: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetCommitRequest {
    pub consumer_group: String,
    pub blocks: BTreeMap<String, BTreeMap<i32, OffsetCommitRequestBlock>>,
}

impl OffsetCommitRequest {
    pub fn new(consumer_group: impl Into<String>) -> Self {
        Self {
            consumer_group: consumer_group.into(),
            blocks: BTreeMap::new(),
        }
    }

    pub fn add_block(&mut self, topic: &str, partition: i32, offset: i64, metadata: &str) {
        self.blocks.entry(topic.to_string()).or_default().insert(
            partition,
            OffsetCommitRequestBlock {
                offset,
                metadata: metadata.to_string(),
            },
        );
    }
}

impl Encodable for OffsetCommitRequest {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_string(&self.consumer_group)?;
        enc.put_array_len(self.blocks.len())?;
        for (topic, partitions) in &self.blocks {
            enc.put_string(topic)?;
            enc.put_array_len(partitions.len())?;
            for (partition, block) in partitions {
                enc.put_i32(*partition);
                enc.put_i64(block.offset);
                enc.put_string(&block.metadata)?;
            }
        }
        Ok(())
    }
}

impl ProtocolBody for OffsetCommitRequest {
    const API_KEY: ApiKey = ApiKey::OffsetCommit;
    type Response = OffsetCommitResponse;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffsetCommitResponseBlock {
    pub partition: i32,
    pub error: KafkaCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffsetCommitResponseTopic {
    pub name: String,
    pub partitions: Vec<OffsetCommitResponseBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OffsetCommitResponse {
    pub client_id: String,
    pub topics: Vec<OffsetCommitResponseTopic>,
}

impl OffsetCommitResponse {
    pub fn error(&self, topic: &str, partition: i32) -> Option<KafkaCode> {
        self.topics
            .iter()
            .find(|t| t.name == topic)?
            .partitions
            .iter()
            .find(|p| p.partition == partition)
            .map(|p| p.error)
    }
}

impl Encodable for OffsetCommitResponse {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_string(&self.client_id)?;
        enc.put_array(&self.topics, |enc, t| {
            enc.put_string(&t.name)?;
            enc.put_array(&t.partitions, |enc, p| {
                enc.put_i32(p.partition);
                p.error.encode(enc)
            })
        })
    }
}

impl Decodable for OffsetCommitResponse {
    fn decode(dec: &mut PacketDecoder<'_>) -> Result<Self> {
        let client_id = dec.get_string()?;
        let topics = dec.get_array(|dec| {
            let name = dec.get_string()?;
            let partitions = dec.get_array(|dec| {
                Ok(OffsetCommitResponseBlock {
                    partition: dec.get_i32()?,
                    error: KafkaCode::decode(dec)?,
                })
            })?;
            Ok(OffsetCommitResponseTopic { name, partitions })
        })?;
        Ok(Self { client_id, topics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::{decode_from_bytes, encode_to_bytes};

    #[test]
    fn request_layout() {
        let mut req = OffsetCommitRequest::new("g");
        req.add_block("t", 0, 5, "m");
        let raw = encode_to_bytes(&req).unwrap();
        let expected: &[u8] = &[
            0, 1, b'g', // group
            0, 0, 0, 1, 0, 1, b't', // topic
            0, 0, 0, 1, 0, 0, 0, 0, // partition 0
            0, 0, 0, 0, 0, 0, 0, 5, // offset
            0, 1, b'm', // metadata
        ];
        assert_eq!(raw.as_ref(), expected);
    }

    #[test]
    fn decodes_partition_errors() {
        let body: &[u8] = &[
            0, 2, b'c', b'1', // client id
            0, 0, 0, 1, 0, 1, b't', // topic
            0, 0, 0, 1, 0, 0, 0, 4, 0, 12, // partition 4: OffsetMetadataTooLarge
        ];
        let resp: OffsetCommitResponse = decode_from_bytes(body).unwrap();
        assert_eq!(resp.client_id, "c1");
        assert_eq!(resp.error("t", 4), Some(KafkaCode::OffsetMetadataTooLarge));
        assert_eq!(resp.error("t", 5), None);
    }
}
