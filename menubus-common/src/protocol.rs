//! # Request Encoding
//!
//! Purpose: Turn a catalog command plus its arguments into the exact RESP2
//! request bytes written to the wire.
//!
//! ## Design Principles
//!
//! 1. **Pure Function**: Encoding has no state, no I/O and no failure mode.
//! 2. **Binary-Safe**: Lengths are byte counts and argument bytes are copied
//!    raw; `\r` and `\n` inside an argument need no escaping because bulk
//!    strings are delimited by their declared length.
//! 3. **Single Allocation**: The output size is computed up front so the
//!    buffer never reallocates.
//!
//! ## Wire Layout Example
//!
//! ```text
//! encode(Get, ["foo"]):
//! +--------+----------+---------+----------+---------+
//! | *2\r\n | $3\r\n   | GET\r\n | $3\r\n   | foo\r\n |
//! +--------+----------+---------+----------+---------+
//! | header | verb len | verb    | arg len  | arg     |
//! +--------+----------+---------+----------+---------+
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::command::CommandKind;

const CRLF: &[u8] = b"\r\n";

/// Encodes a command with string arguments as a RESP array of bulk strings.
///
/// The element count includes the verb. Lengths are UTF-8 byte lengths, so
/// `"é"` is declared as `$2`.
pub fn encode(kind: CommandKind, args: &[&str]) -> Bytes {
    let args: Vec<&[u8]> = args.iter().map(|arg| arg.as_bytes()).collect();
    encode_binary(kind, &args)
}

/// Encodes a command with raw byte arguments.
pub fn encode_binary(kind: CommandKind, args: &[&[u8]]) -> Bytes {
    let verb = kind.verb().as_bytes();
    let mut out = BytesMut::with_capacity(encoded_len(verb, args));

    out.put_u8(b'*');
    push_usize(&mut out, args.len() + 1);
    out.put_slice(CRLF);
    push_bulk(&mut out, verb);
    for arg in args {
        push_bulk(&mut out, arg);
    }
    out.freeze()
}

fn push_bulk(out: &mut BytesMut, data: &[u8]) {
    out.put_u8(b'$');
    push_usize(out, data.len());
    out.put_slice(CRLF);
    out.put_slice(data);
    out.put_slice(CRLF);
}

fn encoded_len(verb: &[u8], args: &[&[u8]]) -> usize {
    let header = 1 + digit_count(args.len() + 1) + CRLF.len();
    let bulk = |len: usize| 1 + digit_count(len) + CRLF.len() + len + CRLF.len();
    header + bulk(verb.len()) + args.iter().map(|arg| bulk(arg.len())).sum::<usize>()
}

fn digit_count(mut value: usize) -> usize {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}

fn push_usize(out: &mut BytesMut, mut value: usize) {
    // Write digits into a small stack buffer to avoid heap allocations.
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        len = 1;
    } else {
        while value > 0 {
            buf[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
        }
    }
    for idx in (0..len).rev() {
        out.put_u8(buf[idx]);
    }
}
