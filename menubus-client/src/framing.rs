//! # Inbound Framing
//!
//! Purpose: Turn the byte chunks returned by socket reads into whole
//! inbound messages for the session handler.
//!
//! ## Design Principles
//! 1. **Strategy Pattern**: `Framer` dispatches to one of two framers chosen
//!    by `FramingMode`; the session only sees `read_size` and `push`.
//! 2. **Accumulate, Then Split**: Bytes collect in one `BytesMut`; completed
//!    messages are split off without copying.
//! 3. **Explicit Trade-Off**: Short-read framing is protocol-blind and kept
//!    for wire compatibility; RESP framing is exact and reports bad input.
//! 4. **Linear Reassembly**: The RESP framer resumes its scan where the last
//!    read stopped instead of re-measuring the whole buffer.
//!
//! ## Short-Read Misframing
//!
//! ```text
//! chunk_size = 3, peer sends "+OK\r\n" (5 bytes)
//!   read 3 "+OK"   full  -> keep accumulating
//!   read 2 "\r\n"  short -> emit "+OK\r\n"
//!
//! peer sends ":10\r\n" + ":2\r\n" in one segment (9 bytes)
//!   read 3, 3, 3   all full -> nothing emitted until the next short read
//! ```

use bytes::{Bytes, BytesMut};

use crate::config::FramingMode;
use crate::error::SessionResult;
use crate::resp::{self, FrameScanner};

/// Read size used with RESP framing.
pub const RESP_READ_SIZE: usize = 4 * 1024;

/// Framer selected by `FramingMode`.
#[derive(Debug)]
pub enum Framer {
    ShortRead(ShortReadFramer),
    Resp(RespFramer),
}

impl Framer {
    pub fn new(mode: FramingMode) -> Self {
        match mode {
            FramingMode::ShortRead { chunk_size } => Framer::ShortRead(ShortReadFramer::new(chunk_size)),
            FramingMode::Resp => Framer::Resp(RespFramer::new()),
        }
    }

    /// Number of bytes to request per read.
    pub fn read_size(&self) -> usize {
        match self {
            Framer::ShortRead(framer) => framer.chunk_size,
            Framer::Resp(_) => RESP_READ_SIZE,
        }
    }

    /// Feeds the bytes of one read; returns every message it completed.
    pub fn push(&mut self, chunk: &[u8]) -> SessionResult<Vec<Bytes>> {
        match self {
            Framer::ShortRead(framer) => Ok(framer.push(chunk).into_iter().collect()),
            Framer::Resp(framer) => framer.push(chunk),
        }
    }

    /// How many replies `frame` stands for. A short-read message can hold
    /// several merged replies; a RESP frame is always exactly one.
    pub fn replies_in(&self, frame: &[u8]) -> usize {
        match self {
            Framer::ShortRead(_) => resp::count_replies(frame).max(1),
            Framer::Resp(_) => 1,
        }
    }

    /// Bytes received but not yet part of a completed message.
    pub fn buffered(&self) -> usize {
        match self {
            Framer::ShortRead(framer) => framer.buffer.len(),
            Framer::Resp(framer) => framer.buffer.len(),
        }
    }
}

/// Emits the accumulated bytes whenever a read returns less than a chunk.
#[derive(Debug)]
pub struct ShortReadFramer {
    chunk_size: usize,
    buffer: BytesMut,
}

impl ShortReadFramer {
    pub fn new(chunk_size: usize) -> Self {
        ShortReadFramer {
            chunk_size,
            buffer: BytesMut::with_capacity(chunk_size * 8),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Option<Bytes> {
        self.buffer.extend_from_slice(chunk);
        if chunk.len() < self.chunk_size {
            Some(self.buffer.split().freeze())
        } else {
            None
        }
    }
}

/// Emits one message per complete RESP2 reply.
#[derive(Debug, Default)]
pub struct RespFramer {
    buffer: BytesMut,
    scanner: FrameScanner,
}

impl RespFramer {
    pub fn new() -> Self {
        RespFramer {
            buffer: BytesMut::with_capacity(RESP_READ_SIZE),
            scanner: FrameScanner::new(),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> SessionResult<Vec<Bytes>> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(len) = self.scanner.scan(&self.buffer)? {
            frames.push(self.buffer.split_to(len).freeze());
        }
        Ok(frames)
    }
}
