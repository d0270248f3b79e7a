//! Kafka v0 messages and message sets.
//!
//! Message set entry: offset (int64), message_size (int32), message.
//! Message: crc (uint32), magic (int8), attributes (int8), key (bytes),
//! value (bytes). The CRC-32 covers everything after the crc field.

use crate::error::{BrokerError, Result};
use crate::protocol::codec::{Decodable, Encodable, PacketDecoder, PacketEncoder};
use bytes::Bytes;
use serde::Serialize;

const MESSAGE_MAGIC: i8 = 0;
const MESSAGE_SET_ENTRY_OVERHEAD: usize = 8 + 4;

/// A single key/value message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Message {
    pub attributes: i8,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

impl Message {
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self {
            attributes: 0,
            key: None,
            value: Some(value.into()),
        }
    }

    pub fn with_key(mut self, key: impl Into<Bytes>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl Encodable for Message {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        let crc_at = enc.reserve_i32();
        let body_start = crc_at + 4;
        enc.put_i8(MESSAGE_MAGIC);
        enc.put_i8(self.attributes);
        enc.put_bytes(self.key.as_deref())?;
        enc.put_bytes(self.value.as_deref())?;
        let crc = crc32fast::hash(enc.written_since(body_start));
        enc.patch_i32(crc_at, crc as i32);
        Ok(())
    }
}

impl Decodable for Message {
    fn decode(dec: &mut PacketDecoder<'_>) -> Result<Self> {
        let crc = dec.get_u32()?;
        let body = dec.get_raw(dec.remaining())?;
        let computed = crc32fast::hash(body);
        if computed != crc {
            return Err(BrokerError::Decode(format!(
                "message crc mismatch: header {:#010x}, computed {:#010x}",
                crc, computed
            )));
        }
        let mut body = PacketDecoder::new(body);
        let magic = body.get_i8()?;
        if magic != MESSAGE_MAGIC {
            return Err(BrokerError::Decode(format!(
                "unsupported message magic {}",
                magic
            )));
        }
        let attributes = body.get_i8()?;
        let key = body.get_bytes()?;
        let value = body.get_bytes()?;
        body.finish()?;
        Ok(Self {
            attributes,
            key,
            value,
        })
    }
}

/// A message with its log offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageBlock {
    pub offset: i64,
    pub message: Message,
}

/// Sequence of messages as carried in produce and fetch payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageSet {
    pub messages: Vec<MessageBlock>,
    /// Set when the broker cut the last message short (fetch max_bytes).
    pub partial_trailing_message: bool,
}

impl MessageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message; produce requests leave the offset to the broker.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(MessageBlock { offset: 0, message });
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Encode the set preceded by its int32 byte size.
    pub fn encode_sized(&self, enc: &mut PacketEncoder) -> Result<()> {
        let size_at = enc.reserve_i32();
        self.encode(enc)?;
        let size = enc.written_since(size_at + 4).len();
        let size = i32::try_from(size)
            .map_err(|_| BrokerError::Encode(format!("message set of {} bytes too large", size)))?;
        enc.patch_i32(size_at, size);
        Ok(())
    }

    /// Decode an int32 byte size followed by that many bytes of set.
    pub fn decode_sized(dec: &mut PacketDecoder<'_>) -> Result<Self> {
        let size = dec.get_i32()?;
        if size < 0 {
            return Err(BrokerError::Decode(format!("invalid message set size {}", size)));
        }
        let mut set_dec = dec.sub_decoder(size as usize)?;
        Self::decode(&mut set_dec)
    }
}

impl Encodable for MessageSet {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()> {
        for block in &self.messages {
            enc.put_i64(block.offset);
            let size_at = enc.reserve_i32();
            block.message.encode(enc)?;
            let size = enc.written_since(size_at + 4).len() as i32;
            enc.patch_i32(size_at, size);
        }
        Ok(())
    }
}

impl Decodable for MessageSet {
    /// Consumes the whole decoder; a trailing fragment is dropped and flagged.
    fn decode(dec: &mut PacketDecoder<'_>) -> Result<Self> {
        let mut set = MessageSet::new();
        while dec.remaining() > 0 {
            if dec.remaining() < MESSAGE_SET_ENTRY_OVERHEAD {
                set.partial_trailing_message = true;
                dec.get_raw(dec.remaining())?;
                break;
            }
            let offset = dec.get_i64()?;
            let size = dec.get_i32()?;
            if size < 0 {
                return Err(BrokerError::Decode(format!("invalid message size {}", size)));
            }
            let size = size as usize;
            if size > dec.remaining() {
                set.partial_trailing_message = true;
                dec.get_raw(dec.remaining())?;
                break;
            }
            let mut msg_dec = dec.sub_decoder(size)?;
            let message = Message::decode(&mut msg_dec)?;
            set.messages.push(MessageBlock { offset, message });
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::{decode_from_bytes, encode_to_bytes};

    #[test]
    fn message_crc_is_checked() {
        let msg = Message::new(Bytes::from_static(b"hello")).with_key(Bytes::from_static(b"k"));
        let mut raw = encode_to_bytes(&msg).unwrap().to_vec();
        let decoded: Message = decode_from_bytes(&raw).unwrap();
        assert_eq!(decoded, msg);

        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        let err = decode_from_bytes::<Message>(&raw).unwrap_err();
        assert!(err.to_string().contains("crc"), "{err}");
    }

    #[test]
    fn truncated_trailing_message_is_flagged() {
        let mut set = MessageSet::new();
        set.add_message(Message::new(Bytes::from_static(b"one")));
        set.add_message(Message::new(Bytes::from_static(b"two")));
        let raw = encode_to_bytes(&set).unwrap();

        let cut = &raw[..raw.len() - 3];
        let decoded: MessageSet = decode_from_bytes(cut).unwrap();
        assert_eq!(decoded.len(), 1);
        assert!(decoded.partial_trailing_message);
        assert_eq!(decoded.messages[0].message.value.as_deref(), Some(&b"one"[..]));
    }

    #[test]
    fn null_key_and_value() {
        let msg = Message::default();
        let raw = encode_to_bytes(&msg).unwrap();
        // crc + magic + attributes + two null lengths
        assert_eq!(raw.len(), 4 + 1 + 1 + 4 + 4);
        let decoded: Message = decode_from_bytes(&raw).unwrap();
        assert_eq!(decoded.key, None);
        assert_eq!(decoded.value, None);
    }
}
