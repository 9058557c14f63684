//! Binary wire form of a [`Notification`].
//!
//! The same bytes are used as the delay-queue payload and as the cached value.
//! Layout, all integers little-endian:
//!
//! ```text
//! i64 id | i64 chat_id
//! u32 len | message | u32 len | email | u32 len | status
//! u32 len | timestamp block
//! ```
//!
//! The timestamp block is `u8 version | i64 unix seconds | u32 nanoseconds`.
//! Decoding never panics: every short read is reported as a [`CodecError`].

use bytes::{Buf, BufMut, BytesMut};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{Notification, NotificationStatus};

/// Current version of the timestamp block.
const TIMESTAMP_VERSION: u8 = 1;

/// Encoded size of the timestamp block (version + seconds + nanos).
const TIMESTAMP_LEN: usize = 1 + 8 + 4;

/// A payload that cannot be turned back into a notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("payload truncated in {field}: need {needed} bytes, have {available}")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    #[error("unknown status '{0}'")]
    UnknownStatus(String),

    #[error("unsupported timestamp version {0}")]
    UnsupportedTimestampVersion(u8),

    #[error("timestamp block has length {0}, expected 13")]
    TimestampLength(usize),

    #[error("timestamp out of range")]
    TimestampOutOfRange,

    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    #[error("{field} is too long to encode ({len} bytes)")]
    FieldTooLong { field: &'static str, len: usize },
}

/// Encode a notification into its wire form.
pub fn encode(n: &Notification) -> Result<Vec<u8>, CodecError> {
    let mut buf = BytesMut::with_capacity(
        8 + 8 + 4 * 4 + n.message.len() + n.email.len() + 8 + TIMESTAMP_LEN,
    );

    buf.put_i64_le(n.id);
    buf.put_i64_le(n.chat_id);
    put_str(&mut buf, "message", &n.message)?;
    put_str(&mut buf, "email", &n.email)?;
    put_str(&mut buf, "status", n.status.as_str())?;

    buf.put_u32_le(TIMESTAMP_LEN as u32);
    buf.put_u8(TIMESTAMP_VERSION);
    buf.put_i64_le(n.scheduled_at.timestamp());
    buf.put_u32_le(n.scheduled_at.timestamp_subsec_nanos());

    Ok(buf.to_vec())
}

/// Decode a notification from its wire form.
///
/// An empty payload decodes to `Notification::default()`.
pub fn decode(data: &[u8]) -> Result<Notification, CodecError> {
    if data.is_empty() {
        return Ok(Notification::default());
    }

    let mut buf = data;

    let id = get_i64(&mut buf, "id")?;
    let chat_id = get_i64(&mut buf, "chat_id")?;
    let message = get_str(&mut buf, "message")?;
    let email = get_str(&mut buf, "email")?;
    let status = get_str(&mut buf, "status")?;
    let status = status
        .parse::<NotificationStatus>()
        .map_err(|e| CodecError::UnknownStatus(e.0))?;
    let scheduled_at = get_timestamp(&mut buf)?;

    if buf.has_remaining() {
        return Err(CodecError::TrailingBytes(buf.remaining()));
    }

    Ok(Notification {
        id,
        chat_id,
        message,
        email,
        status,
        scheduled_at,
    })
}

fn put_str(buf: &mut BytesMut, field: &'static str, value: &str) -> Result<(), CodecError> {
    let len = u32::try_from(value.len()).map_err(|_| CodecError::FieldTooLong {
        field,
        len: value.len(),
    })?;
    buf.put_u32_le(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

fn ensure(buf: &[u8], field: &'static str, needed: usize) -> Result<(), CodecError> {
    if buf.remaining() < needed {
        return Err(CodecError::Truncated {
            field,
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

fn get_i64(buf: &mut &[u8], field: &'static str) -> Result<i64, CodecError> {
    ensure(*buf, field, 8)?;
    Ok(buf.get_i64_le())
}

fn get_len(buf: &mut &[u8], field: &'static str) -> Result<usize, CodecError> {
    ensure(*buf, field, 4)?;
    Ok(buf.get_u32_le() as usize)
}

fn get_str(buf: &mut &[u8], field: &'static str) -> Result<String, CodecError> {
    let len = get_len(buf, field)?;
    ensure(*buf, field, len)?;
    let raw = buf[..len].to_vec();
    buf.advance(len);
    String::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8 { field })
}

fn get_timestamp(buf: &mut &[u8]) -> Result<DateTime<Utc>, CodecError> {
    let len = get_len(buf, "scheduled_at")?;
    if len != TIMESTAMP_LEN {
        return Err(CodecError::TimestampLength(len));
    }
    ensure(*buf, "scheduled_at", len)?;

    let version = buf.get_u8();
    if version != TIMESTAMP_VERSION {
        return Err(CodecError::UnsupportedTimestampVersion(version));
    }
    let secs = buf.get_i64_le();
    let nanos = buf.get_u32_le();

    DateTime::from_timestamp(secs, nanos).ok_or(CodecError::TimestampOutOfRange)
}
