//! Length-prefixed framing and correlation.
//!
//! Request frame:  int32 length | request header | body.
//! Response frame: int32 length | int32 correlation_id | body.
//! The length excludes itself.

use crate::error::{BrokerError, Result};
use crate::protocol::codec::{Encodable, PacketEncoder};
use crate::protocol::kafka::{ProtocolBody, RequestHeader};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const LENGTH_PREFIX_BYTES: usize = 4;
pub const CORRELATION_ID_BYTES: usize = 4;
pub const DEFAULT_MAX_FRAME_LEN: usize = 100 * 1024 * 1024;

/// Encode header and body of `req` into one length-prefixed frame.
pub fn encode_request_frame<R: ProtocolBody>(
    client_id: &str,
    correlation_id: i32,
    req: &R,
) -> Result<BytesMut> {
    let header = RequestHeader {
        api_key: R::API_KEY.as_i16(),
        api_version: R::API_VERSION,
        correlation_id,
        client_id: Some(client_id.to_string()),
    };
    let mut enc = PacketEncoder::with_capacity(64);
    let len_at = enc.reserve_i32();
    header.encode(&mut enc)?;
    req.encode(&mut enc)?;
    let len = frame_length(enc.written_since(len_at + LENGTH_PREFIX_BYTES).len())?;
    enc.patch_i32(len_at, len);
    Ok(enc.into_inner())
}

/// Prepend the 4-byte length and the correlation ID to a response body.
pub fn frame_response(correlation_id: i32, body: &[u8]) -> Result<BytesMut> {
    let len = frame_length(CORRELATION_ID_BYTES + body.len())?;
    let mut out = BytesMut::with_capacity(LENGTH_PREFIX_BYTES + CORRELATION_ID_BYTES + body.len());
    out.put_i32(len);
    out.put_i32(correlation_id);
    out.extend_from_slice(body);
    Ok(out)
}

/// Length prefix for a frame of `len` bytes; the prefix is a signed int32.
fn frame_length(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| BrokerError::Encode(format!("frame of {} bytes too large", len)))
}

/// Write a complete frame; partial writes are retried until done.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame and return what follows the prefix.
///
/// A stream that ends before the prefix or the declared length is complete
/// is a decode failure.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, max_len: usize) -> Result<Bytes> {
    let mut len_buf = [0u8; LENGTH_PREFIX_BYTES];
    reader.read_exact(&mut len_buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            BrokerError::Decode("stream closed while reading frame length".into())
        } else {
            BrokerError::Io(e)
        }
    })?;
    let len = i32::from_be_bytes(len_buf);
    if len < 0 || len as usize > max_len {
        return Err(BrokerError::Decode(format!("invalid frame length {}", len)));
    }
    let len = len as usize;
    let mut body = BytesMut::zeroed(len);
    let mut filled = 0;
    while filled < len {
        let n = reader.read(&mut body[filled..]).await?;
        if n == 0 {
            return Err(BrokerError::Decode(format!(
                "stream closed after {} of {} frame bytes",
                filled, len
            )));
        }
        filled += n;
    }
    Ok(body.freeze())
}

/// Split the leading correlation ID off a response frame and check it.
pub fn take_correlation_id(mut frame: Bytes, expected: i32) -> Result<Bytes> {
    if frame.len() < CORRELATION_ID_BYTES {
        return Err(BrokerError::Decode(format!(
            "response of {} bytes has no correlation id",
            frame.len()
        )));
    }
    let actual = frame.get_i32();
    if actual != expected {
        return Err(BrokerError::CorrelationMismatch { expected, actual });
    }
    Ok(frame)
}
