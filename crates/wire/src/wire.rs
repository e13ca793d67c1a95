// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format: 4-byte big-endian length prefix + JSON payload, exactly as
//! the daemon⟷CLI transport this crate is modeled on.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames larger than this are rejected before the length-prefixed read
/// allocates a buffer for them; a malformed or hostile peer cannot make us
/// allocate an unbounded amount of memory from a 4-byte prefix alone.
pub const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("frame of {0} bytes exceeds the {MAX_FRAME_BYTES} byte limit")]
    FrameTooLarge(u32),
    #[error("connection closed mid-frame")]
    Truncated(#[source] std::io::Error),
    #[error("io error: {0}")]
    Io(#[source] std::io::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Serialize `value` to JSON. Returns raw JSON bytes with no length prefix.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    serde_json::to_vec(value).map_err(WireError::Encode)
}

/// Deserialize JSON bytes (as produced by [`encode`]) back into `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    serde_json::from_slice(bytes).map_err(WireError::Decode)
}

/// Write `data` to `writer` prefixed with its length as 4 big-endian bytes.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> Result<(), WireError> {
    let len: u32 = data.len().try_into().map_err(|_| WireError::FrameTooLarge(u32::MAX))?;
    if len > MAX_FRAME_BYTES {
        return Err(WireError::FrameTooLarge(len));
    }
    writer.write_all(&len.to_be_bytes()).await.map_err(WireError::Io)?;
    writer.write_all(data).await.map_err(WireError::Io)?;
    writer.flush().await.map_err(WireError::Io)?;
    Ok(())
}

/// Read one length-prefixed frame from `reader` and return its raw bytes.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, WireError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(WireError::Truncated)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(WireError::FrameTooLarge(len));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await.map_err(WireError::Truncated)?;
    Ok(buf)
}

/// Encode `value` and write it as one length-prefixed frame.
pub async fn write_frame<W: AsyncWrite + Unpin, T: Serialize>(writer: &mut W, value: &T) -> Result<(), WireError> {
    let bytes = encode(value)?;
    write_message(writer, &bytes).await
}

/// Read one length-prefixed frame and decode it as `T`.
pub async fn read_frame<R: AsyncRead + Unpin, T: DeserializeOwned>(reader: &mut R) -> Result<T, WireError> {
    let bytes = read_message(reader).await?;
    decode(&bytes)
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
