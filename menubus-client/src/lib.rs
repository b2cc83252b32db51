//! # MenuBus Async Client
//!
//! Purpose: Provide asynchronous RESP sessions with ordered write queuing,
//! and a facade that maps menu and messaging operations onto dedicated
//! publisher and subscriber sessions.
//!
//! ## Design Principles
//! 1. **Actor Pattern**: Each `Session` is a Tokio task fed through a mailbox.
//! 2. **Facade Pattern**: `MenuBusClient` hides sessions, keys and encoding.
//! 3. **Raw Delivery**: Handlers receive framed bytes; `resp::decode` is
//!    there for callers that want typed replies.
//! 4. **Fail Fast**: Errors end the affected session; rebuilding is up to
//!    the caller.

mod client;
mod config;
mod error;
mod framing;
pub mod resp;
mod session;

pub use client::{MenuBusClient, MENU_SESSION, NOTIFICATION_SESSION, PUBLISHER_SESSION};
pub use config::{
    ClientConfig, ClientConfigBuilder, FramingMode, SessionConfig, DEFAULT_CHUNK_SIZE,
    DEFAULT_HOST, DEFAULT_PORT,
};
pub use error::{SessionError, SessionResult};
pub use framing::{Framer, RespFramer, ShortReadFramer, RESP_READ_SIZE};
pub use session::{MessageHandler, Session, SessionPhase};
