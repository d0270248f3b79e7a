//! Offset request/response (api_key 2): available offsets before a time.

use crate::error::Result;
use crate::protocol::codec::{Decodable, Encodable, PacketDecoder, PacketEncoder};
use crate::protocol::fetch::CONSUMER_REPLICA_ID;
use crate::protocol::kafka::{ApiKey, KafkaCode, ProtocolBody};
use serde::Serialize;
use std::collections::BTreeMap;

/// Special `time` values understood by the broker.
pub const LATEST_TIME: i64 = -1;
pub const EARLIEST_TIME: i64 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetRequestBlock {
    pub time: i64,
    pub max_offsets: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetRequest {
    pub blocks: BTreeMap<String, BTreeMap<i32, OffsetRequestBlock>>,
}

impl OffsetRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self, topic: &str, partition: i32, time: i64, max_offsets: i32) {
        self.blocks
            .entry(topic.to_string())
            .or_default()
            .insert(partition, OffsetRequestBlock { time, max_offsets });
    }
}

impl Encodable for OffsetRequest {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_i32(CONSUMER_REPLICA_ID);
        enc.put_array_len(self.blocks.len())?;
        for (topic, partitions) in &self.blocks {
            enc.put_string(topic)?;
            enc.put_array_len(partitions.len())?;
            for (partition, block) in partitions {
                enc.put_i32(*partition);
                enc.put_i64(block.time);
                enc.put_i32(block.max_offsets);
            }
        }
        Ok(())
    }
}

impl ProtocolBody for OffsetRequest {
    const API_KEY: ApiKey = ApiKey::Offsets;
    type Response = OffsetResponse;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffsetResponseBlock {
    pub partition: i32,
    pub error: KafkaCode,
    pub offsets: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffsetResponseTopic {
    pub name: String,
    pub partitions: Vec<OffsetResponseBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OffsetResponse {
    pub topics: Vec<OffsetResponseTopic>,
}

impl OffsetResponse {
    pub fn block(&self, topic: &str, partition: i32) -> Option<&OffsetResponseBlock> {
        self.topics
            .iter()
            .find(|t| t.name == topic)?
            .partitions
            .iter()
            .find(|p| p.partition == partition)
    }
}

impl Encodable for OffsetResponse {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_array(&self.topics, |enc, t| {
            enc.put_string(&t.name)?;
            enc.put_array(&t.partitions, |enc, p| {
                enc.put_i32(p.partition);
                p.error.encode(enc)?;
                enc.put_i64_array(&p.offsets)
            })
        })
    }
}

impl Decodable for OffsetResponse {
    fn decode(dec: &mut PacketDecoder<'_>) -> Result<Self> {
        let topics = dec.get_array(|dec| {
            let name = dec.get_string()?;
            let partitions = dec.get_array(|dec| {
                Ok(OffsetResponseBlock {
                    partition: dec.get_i32()?,
                    error: KafkaCode::decode(dec)?,
                    offsets: dec.get_i64_array()?,
                })
            })?;
            Ok(OffsetResponseTopic { name, partitions })
        })?;
        Ok(Self { topics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::{decode_from_bytes, encode_to_bytes};

    #[test]
    fn request_layout() {
        let mut req = OffsetRequest::new();
        req.add_block("t", 1, EARLIEST_TIME, 1);
        let raw = encode_to_bytes(&req).unwrap();
        let expected: &[u8] = &[
            0xff, 0xff, 0xff, 0xff, // replica_id
            0, 0, 0, 1, 0, 1, b't', // topic
            0, 0, 0, 1, 0, 0, 0, 1, // one partition, id 1
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, // time
            0, 0, 0, 1, // max_offsets
        ];
        assert_eq!(raw.as_ref(), expected);
    }

    #[test]
    fn decodes_offsets_list() {
        let body: &[u8] = &[
            0, 0, 0, 1, 0, 1, b't', // topic
            0, 0, 0, 1, 0, 0, 0, 0, // partition 0
            0, 0, // no error
            0, 0, 0, 2, // two offsets
            0, 0, 0, 0, 0, 0, 0, 9, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        let resp: OffsetResponse = decode_from_bytes(body).unwrap();
        assert_eq!(resp.block("t", 0).unwrap().offsets, vec![9, 0]);
    }
}
