//! Relay Wire Framing
//!
//! Frames exchanged between an upstream producer and a relay, and between a
//! relay and its downstream collector.
//!
//! ```text
//! [4 bytes: payload length (big-endian)][4 bytes: crc32 of payload (big-endian)][bincode payload]
//! ```
//!
//! Uses Sans-IO pattern: encoding/decoding is separated from I/O for testability.

use crate::domain::entities::LogEntry;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Header size: length + checksum.
pub const HEADER_LEN: usize = 8;

/// Upper bound on a single frame payload (64 MiB).
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Collector verdict for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultCode {
    /// Batch accepted
    Ok,
    /// Batch (or its tail) refused; resend later
    TryLater,
}

/// A relay protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// Ordered batch of entries to forward
    Log(Vec<LogEntry>),
    /// Reply to a `Log` frame
    Ack {
        acknowledged: u32,
        code: ResultCode,
    },
}

/// Frame encoding/decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("serialization error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame of {0} bytes exceeds limit")]
    FrameTooLarge(u32),
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

// ==================== Sans-IO Functions ====================

/// Encode a frame with its header.
pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>, WireError> {
    let payload = bincode::serialize(frame)?;
    let len = frame_len(payload.len())?;
    let crc = crc32fast::hash(&payload);

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&crc.to_be_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Header length field for a payload of `len` bytes.
///
/// Oversized payloads report their size, saturated to `u32::MAX`.
fn frame_len(len: usize) -> Result<u32, WireError> {
    let len = u32::try_from(len).unwrap_or(u32::MAX);
    if len > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge(len));
    }
    Ok(len)
}

/// Split a header into `(payload length, checksum)`.
pub fn decode_header(buf: &[u8; HEADER_LEN]) -> Result<(u32, u32), WireError> {
    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let crc = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
    if len > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge(len));
    }
    Ok((len, crc))
}

/// Verify and decode a payload.
pub fn decode_payload(payload: &[u8], expected_crc: u32) -> Result<Frame, WireError> {
    let actual = crc32fast::hash(payload);
    if actual != expected_crc {
        return Err(WireError::ChecksumMismatch {
            expected: expected_crc,
            actual,
        });
    }
    Ok(bincode::deserialize(payload)?)
}

// ==================== Async I/O Helpers ====================

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode_frame(frame)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. Returns `None` if the peer closed the stream before a header.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let (len, crc) = decode_header(&header)?;
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    decode_payload(&payload, crc).map(Some)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn sample_batch() -> Frame {
        Frame::Log(vec![
            LogEntry::new("TestReconnection", "This is message 0"),
            LogEntry::new("TestReconnection", "This is message 1"),
        ])
    }

    #[test]
    fn test_encode_header_layout() {
        let bytes = encode_frame(&sample_batch()).unwrap();
        let header: [u8; HEADER_LEN] = bytes[..HEADER_LEN].try_into().unwrap();
        let (len, crc) = decode_header(&header).unwrap();

        assert_eq!(len as usize, bytes.len() - HEADER_LEN);
        assert_eq!(crc, crc32fast::hash(&bytes[HEADER_LEN..]));
    }

    #[test]
    fn test_decode_payload_preserves_order() {
        let bytes = encode_frame(&sample_batch()).unwrap();
        let header: [u8; HEADER_LEN] = bytes[..HEADER_LEN].try_into().unwrap();
        let (_, crc) = decode_header(&header).unwrap();

        match decode_payload(&bytes[HEADER_LEN..], crc).unwrap() {
            Frame::Log(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(&entries[0].message[..], b"This is message 0");
                assert_eq!(&entries[1].message[..], b"This is message 1");
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_corrupted_payload_rejected() {
        let mut bytes = encode_frame(&sample_batch()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let header: [u8; HEADER_LEN] = bytes[..HEADER_LEN].try_into().unwrap();
        let (_, crc) = decode_header(&header).unwrap();

        let err = decode_payload(&bytes[HEADER_LEN..], crc).unwrap_err();
        assert!(matches!(err, WireError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_oversized_header_rejected() {
        let mut header = [0u8; HEADER_LEN];
        header[..4].copy_from_slice(&(MAX_FRAME_LEN + 1).to_be_bytes());
        let err = decode_header(&header).unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge(_)));
    }

    #[test]
    fn test_frame_len_limit() {
        assert_eq!(frame_len(0).unwrap(), 0);
        assert_eq!(frame_len(MAX_FRAME_LEN as usize).unwrap(), MAX_FRAME_LEN);

        let err = frame_len(MAX_FRAME_LEN as usize + 1).unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge(n) if n == MAX_FRAME_LEN + 1));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_frame_len_saturates() {
        let err = frame_len(u32::MAX as usize + 10).unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge(u32::MAX)));
    }

    #[tokio::test]
    async fn test_read_write_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        let ack = Frame::Ack {
            acknowledged: 3,
            code: ResultCode::Ok,
        };
        write_frame(&mut client, &sample_batch()).await.unwrap();
        write_frame(&mut client, &ack).await.unwrap();
        drop(client);

        assert_eq!(read_frame(&mut server).await.unwrap(), Some(sample_batch()));
        assert_eq!(read_frame(&mut server).await.unwrap(), Some(ack));
        assert_eq!(read_frame(&mut server).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_truncated_payload_is_io_error() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let bytes = encode_frame(&sample_batch()).unwrap();
        client.write_all(&bytes[..bytes.len() - 2]).await.unwrap();
        drop(client);

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, WireError::Io(_)));
    }
}
