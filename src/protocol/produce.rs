//! Produce request/response (api_key 0).

use crate::error::Result;
use crate::protocol::codec::{Decodable, Encodable, PacketDecoder, PacketEncoder};
use crate::protocol::kafka::{ApiKey, KafkaCode, ProtocolBody, RequiredAcks};
use crate::protocol::message::{Message, MessageSet};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProduceRequest {
    pub required_acks: RequiredAcks,
    /// How long the broker may wait for `required_acks`.
    pub timeout_ms: i32,
    pub msg_sets: BTreeMap<String, BTreeMap<i32, MessageSet>>,
}

impl ProduceRequest {
    pub fn new(required_acks: RequiredAcks, timeout_ms: i32) -> Self {
        Self {
            required_acks,
            timeout_ms,
            msg_sets: BTreeMap::new(),
        }
    }

    pub fn add_message(&mut self, topic: &str, partition: i32, message: Message) {
        self.msg_sets
            .entry(topic.to_string())
            .or_default()
            .entry(partition)
            .or_default()
            .add_message(message);
    }

    pub fn add_set(&mut self, topic: &str, partition: i32, set: MessageSet) {
        self.msg_sets
            .entry(topic.to_string())
            .or_default()
            .insert(partition, set);
    }

    /// Whether the broker will answer this request at all.
    pub fn expects_response(&self) -> bool {
        self.required_acks.expects_response()
    }

    pub fn message_count(&self) -> usize {
        self.msg_sets
            .values()
            .flat_map(|parts| parts.values())
            .map(MessageSet::len)
            .sum()
    }
}

impl Encodable for ProduceRequest {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_i16(self.required_acks.as_i16());
        enc.put_i32(self.timeout_ms);
        enc.put_array_len(self.msg_sets.len())?;
        for (topic, partitions) in &self.msg_sets {
            enc.put_string(topic)?;
            enc.put_array_len(partitions.len())?;
            for (partition, set) in partitions {
                enc.put_i32(*partition);
                set.encode_sized(enc)?;
            }
        }
        Ok(())
    }
}

impl ProtocolBody for ProduceRequest {
    const API_KEY: ApiKey = ApiKey::Produce;
    type Response = ProduceResponse;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProduceResponseBlock {
    pub partition: i32,
    pub error: KafkaCode,
    /// Offset assigned to the first message of the set.
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProduceResponseTopic {
    pub name: String,
    pub partitions: Vec<ProduceResponseBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProduceResponse {
    pub topics: Vec<ProduceResponseTopic>,
}

impl ProduceResponse {
    pub fn block(&self, topic: &str, partition: i32) -> Option<&ProduceResponseBlock> {
        self.topics
            .iter()
            .find(|t| t.name == topic)?
            .partitions
            .iter()
            .find(|p| p.partition == partition)
    }
}

impl Encodable for ProduceResponse {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        enc.put_array(&self.topics, |enc, t| {
            enc.put_string(&t.name)?;
            enc.put_array(&t.partitions, |enc, p| {
                enc.put_i32(p.partition);
                p.error.encode(enc)?;
                enc.put_i64(p.offset);
                Ok(())
            })
        })
    }
}

impl Decodable for ProduceResponse {
    fn decode(dec: &mut PacketDecoder<'_>) -> Result<Self> {
        let topics = dec.get_array(|dec| {
            let name = dec.get_string()?;
            let partitions = dec.get_array(|dec| {
                Ok(ProduceResponseBlock {
                    partition: dec.get_i32()?,
                    error: KafkaCode::decode(dec)?,
                    offset: dec.get_i64()?,
                })
            })?;
            Ok(ProduceResponseTopic { name, partitions })
        })?;
        Ok(Self { topics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::encode_to_bytes;
    use bytes::Bytes;

    #[test]
    fn request_body_layout() {
        let mut req = ProduceRequest::new(RequiredAcks::WaitForAll, 1500);
        req.add_message("t", 2, Message::new(Bytes::from_static(b"v")));
        let raw = encode_to_bytes(&req).unwrap();
        assert_eq!(&raw[..6], &[0xff, 0xff, 0, 0, 0x05, 0xdc]);
        // one topic, name "t", one partition, partition id 2
        assert_eq!(&raw[6..19], &[0, 0, 0, 1, 0, 1, b't', 0, 0, 0, 1, 0, 0]);
        assert_eq!(&raw[19..21], &[0, 2]);
        let set_size = i32::from_be_bytes([raw[21], raw[22], raw[23], raw[24]]) as usize;
        assert_eq!(raw.len(), 25 + set_size);
        assert_eq!(req.message_count(), 1);
    }

    #[test]
    fn no_response_acks_expect_nothing() {
        assert!(!ProduceRequest::new(RequiredAcks::NoResponse, 0).expects_response());
        assert!(ProduceRequest::default().expects_response());
    }
}
