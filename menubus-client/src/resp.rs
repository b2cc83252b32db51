//! # RESP2 Reply Decoding
//!
//! Purpose: Decode server replies from raw framed bytes, and tell the
//! framer where one reply ends when several share a read.
//!
//! ## Design Principles
//! 1. **Slice-Based Parsing**: Replies are parsed top-down from a borrowed
//!    buffer; nothing is consumed until a whole reply is present.
//! 2. **Incomplete Is Not An Error**: A truncated reply yields `Ok(None)` so
//!    the caller can wait for more bytes.
//! 3. **Check Before Parse**: `FrameScanner` only measures a reply. It keeps
//!    its cursor across reads and never copies element data, so a large
//!    array is walked once no matter how many reads deliver it.
//! 4. **Bounded Input**: Nesting depth and bulk lengths are capped; anything
//!    beyond the caps is a framing error, not a stack overflow or an
//!    endless wait.
//!
//! ## Scanner State
//!
//! ```text
//! buf:   *2\r\n $5\r\nhello\r\n $3\r\nab|
//!                               ^ cursor      (read ended here)
//! stack: [1]  one element of the outer array still missing
//! ```

use crate::error::{SessionError, SessionResult};

/// Deepest array nesting accepted in a reply.
pub const MAX_DEPTH: usize = 128;

/// Largest bulk string accepted in a reply (the Redis proto limit).
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// RESP response value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// +OK or +PONG style responses.
    Simple(Vec<u8>),
    /// -ERR ... responses.
    Error(Vec<u8>),
    /// :123 responses.
    Integer(i64),
    /// $... bulk strings, with None for null.
    Bulk(Option<Vec<u8>>),
    /// *... arrays, e.g. pub/sub pushes and LRANGE replies.
    Array(Vec<RespValue>),
}

/// Decodes one reply from the start of `buf`.
///
/// Returns the value and the number of bytes it occupied, or `None` when
/// `buf` holds only part of a reply.
pub fn decode(buf: &[u8]) -> SessionResult<Option<(RespValue, usize)>> {
    parse_at(buf, 0, 0)
}

/// Length in bytes of the first complete reply in `buf`, if any.
pub fn frame_len(buf: &[u8]) -> SessionResult<Option<usize>> {
    FrameScanner::new().scan(buf)
}

/// Number of complete replies at the start of `buf`.
///
/// Counting stops at the first partial or malformed reply.
pub fn count_replies(buf: &[u8]) -> usize {
    let mut count = 0;
    let mut rest = buf;
    while let Ok(Some(len)) = frame_len(rest) {
        count += 1;
        rest = &rest[len..];
    }
    count
}

// ============================================================================
// Length-Only Scanning
// ============================================================================

/// Resumable measurement of the reply at the start of a growing buffer.
///
/// Feed it the same buffer (with bytes appended) until it returns a length,
/// then drop that many bytes from the front; the scanner resets itself.
#[derive(Debug, Default)]
pub struct FrameScanner {
    /// Offset just past the last complete element.
    cursor: usize,
    /// Offset up to which no CRLF follows `cursor`.
    searched: usize,
    /// Elements still missing from each open array, innermost last.
    open: Vec<i64>,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the length of the first reply once `buf` holds all of it.
    pub fn scan(&mut self, buf: &[u8]) -> SessionResult<Option<usize>> {
        loop {
            let start = self.searched.max(self.cursor);
            let line_end = match find_crlf(buf, start) {
                Some(idx) => idx,
                None => {
                    self.searched = buf.len().saturating_sub(1).max(self.cursor);
                    return Ok(None);
                }
            };
            let line = &buf[self.cursor..line_end];
            let next = line_end + 2;
            if line.is_empty() {
                return Err(framing("empty reply line"));
            }

            match line[0] {
                b'+' | b'-' => self.advance(next),
                b':' => {
                    parse_i64(&line[1..])?;
                    self.advance(next);
                }
                b'$' => {
                    let len = bulk_len(&line[1..])?;
                    if len < 0 {
                        self.advance(next);
                    } else {
                        let end = next + len as usize + 2;
                        if buf.len() < end {
                            return Ok(None);
                        }
                        if &buf[end - 2..end] != b"\r\n" {
                            return Err(framing("bulk string is not terminated by CRLF"));
                        }
                        self.advance(end);
                    }
                }
                b'*' => {
                    let len = parse_i64(&line[1..])?;
                    if len <= 0 {
                        self.advance(next);
                    } else {
                        if self.open.len() >= MAX_DEPTH {
                            return Err(framing("reply nested too deeply"));
                        }
                        self.open.push(len);
                        self.cursor = next;
                        self.searched = next;
                        continue;
                    }
                }
                other => return Err(framing(format!("unexpected reply type byte 0x{:02x}", other))),
            }

            if self.open.is_empty() {
                let len = self.cursor;
                self.reset();
                return Ok(Some(len));
            }
        }
    }

    /// Forgets any partial progress.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.searched = 0;
        self.open.clear();
    }

    /// Records one finished element ending at `next` and closes every array
    /// it completes.
    fn advance(&mut self, next: usize) {
        self.cursor = next;
        self.searched = next;
        while let Some(remaining) = self.open.last_mut() {
            *remaining -= 1;
            if *remaining > 0 {
                break;
            }
            self.open.pop();
        }
    }
}

// ============================================================================
// Value Decoding
// ============================================================================

fn parse_at(buf: &[u8], pos: usize, depth: usize) -> SessionResult<Option<(RespValue, usize)>> {
    let (line, next) = match read_line(buf, pos) {
        Some(found) => found,
        None => return Ok(None),
    };
    if line.is_empty() {
        return Err(framing("empty reply line"));
    }

    match line[0] {
        b'+' => Ok(Some((RespValue::Simple(line[1..].to_vec()), next))),
        b'-' => Ok(Some((RespValue::Error(line[1..].to_vec()), next))),
        b':' => Ok(Some((RespValue::Integer(parse_i64(&line[1..])?), next))),
        b'$' => {
            let len = bulk_len(&line[1..])?;
            parse_bulk(buf, next, len)
        }
        b'*' => {
            let len = parse_i64(&line[1..])?;
            parse_array(buf, next, len, depth)
        }
        other => Err(framing(format!("unexpected reply type byte 0x{:02x}", other))),
    }
}

fn parse_bulk(buf: &[u8], start: usize, len: i64) -> SessionResult<Option<(RespValue, usize)>> {
    if len < 0 {
        return Ok(Some((RespValue::Bulk(None), start)));
    }
    let end = start + len as usize;
    if buf.len() < end + 2 {
        return Ok(None);
    }
    if &buf[end..end + 2] != b"\r\n" {
        return Err(framing("bulk string is not terminated by CRLF"));
    }
    Ok(Some((RespValue::Bulk(Some(buf[start..end].to_vec())), end + 2)))
}

fn parse_array(
    buf: &[u8],
    start: usize,
    len: i64,
    depth: usize,
) -> SessionResult<Option<(RespValue, usize)>> {
    if len <= 0 {
        return Ok(Some((RespValue::Array(Vec::new()), start)));
    }
    if depth >= MAX_DEPTH {
        return Err(framing("reply nested too deeply"));
    }

    let mut items = Vec::with_capacity((len as usize).min(64));
    let mut cursor = start;
    for _ in 0..len {
        match parse_at(buf, cursor, depth + 1)? {
            Some((item, next)) => {
                items.push(item);
                cursor = next;
            }
            None => return Ok(None),
        }
    }
    Ok(Some((RespValue::Array(items), cursor)))
}

// ============================================================================
// Lexing Helpers
// ============================================================================

fn read_line(buf: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let end = find_crlf(buf, pos)?;
    Some((&buf[pos..end], end + 2))
}

/// Index of the first `\r\n` at or after `from`.
fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    let rest = buf.get(from..)?;
    rest.windows(2)
        .position(|pair| pair == b"\r\n")
        .map(|idx| from + idx)
}

/// Bulk length in `-1..=MAX_BULK_LEN`.
fn bulk_len(data: &[u8]) -> SessionResult<i64> {
    let len = parse_i64(data)?;
    if len > MAX_BULK_LEN {
        return Err(framing(format!("bulk length {} exceeds {}", len, MAX_BULK_LEN)));
    }
    Ok(len)
}

fn parse_i64(data: &[u8]) -> SessionResult<i64> {
    if data.is_empty() {
        return Err(framing("missing integer"));
    }
    let mut negative = false;
    let mut idx = 0;
    if data[0] == b'-' {
        negative = true;
        idx = 1;
    }
    if idx == data.len() {
        return Err(framing("missing integer digits"));
    }

    let mut value: i64 = 0;
    while idx < data.len() {
        let b = data[idx];
        if !b.is_ascii_digit() {
            return Err(framing("invalid integer"));
        }
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
        idx += 1;
    }

    if negative {
        Ok(-value)
    } else {
        Ok(value)
    }
}

fn framing(message: impl Into<String>) -> SessionError {
    SessionError::Framing(message.into())
}
