//! OffsetFetch request/response (api_key 9, version 0).

use crate::error::Result;
use crate::protocol::codec::{Decodable, Encodable, PacketDecoder, PacketEncoder};
use crate::protocol::kafka::{ApiKey, KafkaCode, ProtocolBody};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetFetchRequest {
    pub consumer_group: String,
    pub partitions: BTreeMap<String, BTreeSet<i32>>,
}

impl OffsetFetchRequest {
    pub fn new(consumer_group: impl Into<String>) -> Self {
        Self {
            consumer_group: consumer_group.into(),
            partitions: BTreeMap::new(),
        }
    }

    pub fn add_partition(&mut self, topic: &str, partition: i32) {
        self.partitions
            .entry(topic.to_string())
            .or_default()
            .insert(partition);
    }
}

impl Encodable for OffsetFetchRequest {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_string(&self.consumer_group)?;
        enc.put_array_len(self.partitions.len())?;
        for (topic, partitions) in &self.partitions {
            enc.put_string(topic)?;
            enc.put_array_len(partitions.len())?;
            for partition in partitions {
                enc.put_i32(*partition);
            }
        }
        Ok(())
    }
}

impl ProtocolBody for OffsetFetchRequest {
    const API_KEY: ApiKey = ApiKey::OffsetFetch;
    type Response = OffsetFetchResponse;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffsetFetchResponseBlock {
    pub partition: i32,
    pub offset: i64,
    pub metadata: String,
    pub error: KafkaCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffsetFetchResponseTopic {
    pub name: String,
    pub partitions: Vec<OffsetFetchResponseBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OffsetFetchResponse {
    pub client_id: String,
    pub topics: Vec<OffsetFetchResponseTopic>,
}

impl OffsetFetchResponse {
    pub fn block(&self, topic: &str, partition: i32) -> Option<&OffsetFetchResponseBlock> {
        self.topics
            .iter()
            .find(|t| t.name == topic)?
            .partitions
            .iter()
            .find(|p| p.partition == partition)
    }
}

impl Encodable for OffsetFetchResponse {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_string(&self.client_id)?;
        enc.put_array(&self.topics, |enc, t| {
            enc.put_string(&t.name)?;
            enc.put_array(&t.partitions, |enc, p| {
                enc.put_i32(p.partition);
                enc.put_i64(p.offset);
                enc.put_string(&p.metadata)?;
                p.error.encode(enc)
            })
        })
    }
}

impl Decodable for OffsetFetchResponse {
    fn decode(dec: &mut PacketDecoder<'_>) -> Result<Self> {
        let client_id = dec.get_string()?;
        let topics = dec.get_array(|dec| {
            let name = dec.get_string()?;
            let partitions = dec.get_array(|dec| {
                Ok(OffsetFetchResponseBlock {
                    partition: dec.get_i32()?,
                    offset: dec.get_i64()?,
                    metadata: dec.get_string()?,
                    error: KafkaCode::decode(dec)?,
                })
            })?;
            Ok(OffsetFetchResponseTopic { name, partitions })
        })?;
        Ok(Self { client_id, topics })
    }
}
