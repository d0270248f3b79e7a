//! Fetch request/response (api_key 1).

use crate::error::Result;
use crate::protocol::codec::{Decodable, Encodable, PacketDecoder, PacketEncoder};
use crate::protocol::kafka::{ApiKey, KafkaCode, ProtocolBody};
use crate::protocol::message::MessageSet;
use serde::Serialize;
use std::collections::BTreeMap;

/// Replica id used by ordinary clients.
pub const CONSUMER_REPLICA_ID: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequestBlock {
    pub fetch_offset: i64,
    pub max_bytes: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    pub max_wait_ms: i32,
    pub min_bytes: i32,
    pub blocks: BTreeMap<String, BTreeMap<i32, FetchRequestBlock>>,
}

impl FetchRequest {
    pub fn new(max_wait_ms: i32, min_bytes: i32) -> Self {
        Self {
            max_wait_ms,
            min_bytes,
            blocks: BTreeMap::new(),
        }
    }

    pub fn add_block(&mut self, topic: &str, partition: i32, fetch_offset: i64, max_bytes: i32) {
        self.blocks.entry(topic.to_string()).or_default().insert(
            partition,
            FetchRequestBlock {
                fetch_offset,
                max_bytes,
            },
        );
    }
}

impl Encodable for FetchRequest {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_i32(CONSUMER_REPLICA_ID);
        enc.put_i32(self.max_wait_ms);
        enc.put_i32(self.min_bytes);
        enc.put_array_len(self.blocks.len())?;
        for (topic, partitions) in &self.blocks {
            enc.put_string(topic)?;
            enc.put_array_len(partitions.len())?;
            for (partition, block) in partitions {
                enc.put_i32(*partition);
                enc.put_i64(block.fetch_offset);
                enc.put_i32(block.max_bytes);
            }
        }
        Ok(())
    }
}

impl ProtocolBody for FetchRequest {
    const API_KEY: ApiKey = ApiKey::Fetch;
    type Response = FetchResponse;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchResponseBlock {
    pub partition: i32,
    pub error: KafkaCode,
    pub high_water_mark: i64,
    pub msg_set: MessageSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchResponseTopic {
    pub name: String,
    pub partitions: Vec<FetchResponseBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchResponse {
    pub topics: Vec<FetchResponseTopic>,
}

impl FetchResponse {
    pub fn block(&self, topic: &str, partition: i32) -> Option<&FetchResponseBlock> {
        self.topics
            .iter()
            .find(|t| t.name == topic)?
            .partitions
            .iter()
            .find(|p| p.partition == partition)
    }
}

impl Encodable for FetchResponse {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_array(&self.topics, |enc, t| {
            enc.put_string(&t.name)?;
            enc.put_array(&t.partitions, |enc, p| {
                enc.put_i32(p.partition);
                p.error.encode(enc)?;
                enc.put_i64(p.high_water_mark);
                p.msg_set.encode_sized(enc)
            })
        })
    }
}

impl Decodable for FetchResponse {
    fn decode(dec: &mut PacketDecoder<'_>) -> Result<Self> {
        let topics = dec.get_array(|dec| {
            let name = dec.get_string()?;
            let partitions = dec.get_array(|dec| {
                Ok(FetchResponseBlock {
                    partition: dec.get_i32()?,
                    error: KafkaCode::decode(dec)?,
                    high_water_mark: dec.get_i64()?,
                    msg_set: MessageSet::decode_sized(dec)?,
                })
            })?;
            Ok(FetchResponseTopic { name, partitions })
        })?;
        Ok(Self { topics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::{decode_from_bytes, encode_to_bytes};
    use crate::protocol::message::Message;
    use bytes::Bytes;

    #[test]
    fn request_uses_consumer_replica_id() {
        let mut req = FetchRequest::new(250, 1);
        req.add_block("t", 0, 42, 1024);
        let raw = encode_to_bytes(&req).unwrap();
        assert_eq!(&raw[..4], &[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(&raw[4..8], &250i32.to_be_bytes());
    }

    #[test]
    fn response_carries_messages() {
        let mut set = MessageSet::new();
        set.add_message(Message::new(Bytes::from_static(b"payload")));
        let resp = FetchResponse {
            topics: vec![FetchResponseTopic {
                name: "t".into(),
                partitions: vec![FetchResponseBlock {
                    partition: 3,
                    error: KafkaCode::NoError,
                    high_water_mark: 10,
                    msg_set: set,
                }],
            }],
        };
        let raw = encode_to_bytes(&resp).unwrap();
        let decoded: FetchResponse = decode_from_bytes(&raw).unwrap();
        let block = decoded.block("t", 3).unwrap();
        assert_eq!(block.high_water_mark, 10);
        assert_eq!(
            block.msg_set.messages[0].message.value.as_deref(),
            Some(&b"payload"[..])
        );
        assert!(decoded.block("t", 4).is_none());
    }
}
