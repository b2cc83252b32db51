// menubus-common - Shared command catalog and request encoding for MenuBus
//
// This crate defines what goes on the wire; menubus-client decides when.

pub mod command;
pub mod error;
pub mod namespaces;
pub mod protocol;
pub mod request;

// Re-export for convenience
pub use command::*;
pub use error::*;
pub use namespaces::*;
pub use protocol::*;
pub use request::*;
