//! Primitive Kafka encoders/decoders and the per-message codec capability.
//!
//! All integers are big-endian. `string` is an int16 length followed by UTF-8
//! bytes (-1 = null), `bytes` is an int32 length followed by raw bytes
//! (-1 = null) and arrays are an int32 element count followed by the elements.

use crate::error::{BrokerError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Something that can write itself as a Kafka payload.
pub trait Encodable {
    fn encode(&self, enc: &mut PacketEncoder) -> Result<()>;
}

/// Something that can read itself back from a Kafka payload.
pub trait Decodable: Sized {
    fn decode(dec: &mut PacketDecoder<'_>) -> Result<Self>;
}

/// Encode a value into a fresh buffer.
pub fn encode_to_bytes<T: Encodable + ?Sized>(value: &T) -> Result<Bytes> {
    let mut enc = PacketEncoder::new();
    value.encode(&mut enc)?;
    Ok(enc.freeze())
}

/// Decode a value that must occupy the whole of `buf`.
pub fn decode_from_bytes<T: Decodable>(buf: &[u8]) -> Result<T> {
    let mut dec = PacketDecoder::new(buf);
    let value = T::decode(&mut dec)?;
    dec.finish()?;
    Ok(value)
}

/// Growable big-endian writer.
#[derive(Debug, Default)]
pub struct PacketEncoder {
    buf: BytesMut,
}

impl PacketEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    pub fn put_i16(&mut self, v: i16) {
        self.buf.put_i16(v);
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.put_i32(v);
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.put_i64(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    pub fn put_raw(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    pub fn put_array_len(&mut self, len: usize) -> Result<()> {
        let n = i32::try_from(len)
            .map_err(|_| BrokerError::Encode(format!("array of {} elements too long", len)))?;
        self.buf.put_i32(n);
        Ok(())
    }

    pub fn put_string(&mut self, s: &str) -> Result<()> {
        let b = s.as_bytes();
        let n = i16::try_from(b.len())
            .map_err(|_| BrokerError::Encode(format!("string of {} bytes too long", b.len())))?;
        self.buf.put_i16(n);
        self.buf.extend_from_slice(b);
        Ok(())
    }

    pub fn put_nullable_string(&mut self, s: Option<&str>) -> Result<()> {
        match s {
            Some(s) => self.put_string(s),
            None => {
                self.buf.put_i16(-1);
                Ok(())
            }
        }
    }

    pub fn put_bytes(&mut self, b: Option<&[u8]>) -> Result<()> {
        match b {
            Some(b) => {
                let n = i32::try_from(b.len()).map_err(|_| {
                    BrokerError::Encode(format!("byte field of {} bytes too long", b.len()))
                })?;
                self.buf.put_i32(n);
                self.buf.extend_from_slice(b);
            }
            None => self.buf.put_i32(-1),
        }
        Ok(())
    }

    /// Write an array: element count, then each element through `f`.
    pub fn put_array<T, F>(&mut self, items: &[T], mut f: F) -> Result<()>
    where
        F: FnMut(&mut Self, &T) -> Result<()>,
    {
        self.put_array_len(items.len())?;
        for item in items {
            f(self, item)?;
        }
        Ok(())
    }

    pub fn put_i32_array(&mut self, items: &[i32]) -> Result<()> {
        self.put_array(items, |enc, v| {
            enc.put_i32(*v);
            Ok(())
        })
    }

    pub fn put_i64_array(&mut self, items: &[i64]) -> Result<()> {
        self.put_array(items, |enc, v| {
            enc.put_i64(*v);
            Ok(())
        })
    }

    /// Reserve an int32 slot to be filled in later by [`patch_i32`](Self::patch_i32).
    pub fn reserve_i32(&mut self) -> usize {
        let at = self.buf.len();
        self.buf.put_i32(0);
        at
    }

    pub fn patch_i32(&mut self, at: usize, v: i32) {
        self.buf[at..at + 4].copy_from_slice(&v.to_be_bytes());
    }

    /// Bytes written after offset `from`.
    pub fn written_since(&self, from: usize) -> &[u8] {
        &self.buf[from..]
    }

    pub fn into_inner(self) -> BytesMut {
        self.buf
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Bounds-checked big-endian reader over a borrowed payload.
#[derive(Debug)]
pub struct PacketDecoder<'a> {
    buf: &'a [u8],
}

impl<'a> PacketDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn ensure(&self, n: usize, what: &str) -> Result<()> {
        if self.buf.len() < n {
            return Err(BrokerError::Decode(format!(
                "short {}: need {} bytes, have {}",
                what,
                n,
                self.buf.len()
            )));
        }
        Ok(())
    }

    pub fn get_i8(&mut self) -> Result<i8> {
        self.ensure(1, "int8")?;
        Ok(self.buf.get_i8())
    }

    pub fn get_i16(&mut self) -> Result<i16> {
        self.ensure(2, "int16")?;
        Ok(self.buf.get_i16())
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        self.ensure(4, "int32")?;
        Ok(self.buf.get_i32())
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        self.ensure(8, "int64")?;
        Ok(self.buf.get_i64())
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        self.ensure(4, "uint32")?;
        Ok(self.buf.get_u32())
    }

    pub fn get_raw(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n, "raw bytes")?;
        let buf: &'a [u8] = self.buf;
        let (head, tail) = buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// Split off the next `n` bytes as an independent decoder.
    pub fn sub_decoder(&mut self, n: usize) -> Result<PacketDecoder<'a>> {
        Ok(PacketDecoder::new(self.get_raw(n)?))
    }

    /// Array length; -1 (null) reads as empty.
    pub fn get_array_len(&mut self) -> Result<usize> {
        let n = self.get_i32()?;
        if n == -1 {
            return Ok(0);
        }
        if n < 0 {
            return Err(BrokerError::Decode(format!("invalid array length {}", n)));
        }
        let n = n as usize;
        // every element occupies at least one byte
        if n > self.buf.len() {
            return Err(BrokerError::Decode(format!(
                "array length {} exceeds remaining {} bytes",
                n,
                self.buf.len()
            )));
        }
        Ok(n)
    }

    pub fn get_array<T, F>(&mut self, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let n = self.get_array_len()?;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(f(self)?);
        }
        Ok(out)
    }

    pub fn get_i32_array(&mut self) -> Result<Vec<i32>> {
        self.get_array(|dec| dec.get_i32())
    }

    pub fn get_i64_array(&mut self) -> Result<Vec<i64>> {
        self.get_array(|dec| dec.get_i64())
    }

    pub fn get_nullable_string(&mut self) -> Result<Option<String>> {
        let len = self.get_i16()?;
        if len == -1 {
            return Ok(None);
        }
        if len < -1 {
            return Err(BrokerError::Decode(format!("invalid string length {}", len)));
        }
        let raw = self.get_raw(len as usize)?;
        String::from_utf8(raw.to_vec())
            .map(Some)
            .map_err(|e| BrokerError::Decode(format!("invalid utf-8 string: {}", e)))
    }

    /// Non-null string; a null string decodes as empty.
    pub fn get_string(&mut self) -> Result<String> {
        Ok(self.get_nullable_string()?.unwrap_or_default())
    }

    pub fn get_bytes(&mut self) -> Result<Option<Bytes>> {
        let len = self.get_i32()?;
        if len == -1 {
            return Ok(None);
        }
        if len < -1 {
            return Err(BrokerError::Decode(format!("invalid bytes length {}", len)));
        }
        let raw = self.get_raw(len as usize)?;
        Ok(Some(Bytes::copy_from_slice(raw)))
    }

    /// Fail if anything is left unread.
    pub fn finish(self) -> Result<()> {
        if !self.buf.is_empty() {
            return Err(BrokerError::Decode(format!(
                "{} trailing bytes after payload",
                self.buf.len()
            )));
        }
        Ok(())
    }
}
