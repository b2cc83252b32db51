// command.rs - command catalog for the MenuBus client
//
// This module defines the closed set of RESP commands the client is able to
// issue and the protocol verb each one is sent as.
//
// ============================================================================
// WHY A CLOSED CATALOG?
// ============================================================================
//
// The client only ever talks to a Redis-compatible peer with a handful of
// commands: menu reads/writes, per-user message queues and pub/sub. Keeping
// them in a closed enum means:
//
// 1. **No string typos**: every verb on the wire comes from one table.
// 2. **Exhaustive matches**: adding a command forces every dispatch site to
//    be revisited at compile time.
// 3. **Zero-cost lookup**: the verb table is a `&'static str` per variant,
//    resolved by a `match` the compiler turns into a jump table.
//
// ============================================================================
// COMMAND GROUPS
// ============================================================================
//
// - Strings:  GET, SET, INCRBY
// - Lists:    LPOP, LRANGE, RPUSH
// - Control:  PING
// - Pub/Sub:  PUBLISH, SUBSCRIBE, UNSUBSCRIBE
//
// Verbs are uppercase ASCII. Peers accept them case-insensitively, but the
// client always emits the canonical uppercase form.

/// Verb for reading a string value.
pub const VERB_GET: &str = "GET";

/// Verb for writing a string value.
pub const VERB_SET: &str = "SET";

/// Verb for incrementing an integer value by a delta.
pub const VERB_INCRBY: &str = "INCRBY";

/// Verb for popping the head of a list.
pub const VERB_LPOP: &str = "LPOP";

/// Verb for reading a range of a list.
pub const VERB_LRANGE: &str = "LRANGE";

/// Verb for appending to the tail of a list.
pub const VERB_RPUSH: &str = "RPUSH";

/// Verb for a liveness probe.
pub const VERB_PING: &str = "PING";

/// Verb for broadcasting a payload on a channel.
pub const VERB_PUBLISH: &str = "PUBLISH";

/// Verb for joining one or more channels.
pub const VERB_SUBSCRIBE: &str = "SUBSCRIBE";

/// Verb for leaving one or more channels.
pub const VERB_UNSUBSCRIBE: &str = "UNSUBSCRIBE";

// ============================================================================
// COMMAND ENUMERATION
// ============================================================================

/// All commands the client can encode.
///
/// Each variant corresponds to one of the `VERB_*` constants above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Read a string value
    Get,

    /// Write a string value
    Set,

    /// Increment an integer value
    IncrBy,

    /// Pop the head of a list
    LPop,

    /// Read a list range
    LRange,

    /// Append to a list
    RPush,

    /// Liveness probe
    Ping,

    /// Broadcast on a channel
    Publish,

    /// Join a channel
    Subscribe,

    /// Leave a channel
    Unsubscribe,
}

impl CommandKind {
    /// Every command in catalog order.
    pub const ALL: [CommandKind; 10] = [
        CommandKind::Get,
        CommandKind::Set,
        CommandKind::IncrBy,
        CommandKind::LPop,
        CommandKind::LRange,
        CommandKind::RPush,
        CommandKind::Ping,
        CommandKind::Publish,
        CommandKind::Subscribe,
        CommandKind::Unsubscribe,
    ];

    /// Protocol verb sent on the wire.
    pub const fn verb(self) -> &'static str {
        match self {
            CommandKind::Get => VERB_GET,
            CommandKind::Set => VERB_SET,
            CommandKind::IncrBy => VERB_INCRBY,
            CommandKind::LPop => VERB_LPOP,
            CommandKind::LRange => VERB_LRANGE,
            CommandKind::RPush => VERB_RPUSH,
            CommandKind::Ping => VERB_PING,
            CommandKind::Publish => VERB_PUBLISH,
            CommandKind::Subscribe => VERB_SUBSCRIBE,
            CommandKind::Unsubscribe => VERB_UNSUBSCRIBE,
        }
    }

    /// Try to resolve a command from its verb (ASCII case-insensitive).
    pub fn from_verb(verb: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.verb().eq_ignore_ascii_case(verb))
    }

    /// Returns true for commands that put a connection into pub/sub mode
    /// or take it back out.
    pub const fn is_pubsub(self) -> bool {
        matches!(self, CommandKind::Subscribe | CommandKind::Unsubscribe)
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verb())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbs_are_uppercase_ascii() {
        for kind in CommandKind::ALL {
            let verb = kind.verb();
            assert!(!verb.is_empty());
            assert!(verb.bytes().all(|b| b.is_ascii_uppercase()), "{verb}");
        }
    }

    #[test]
    fn test_catalog_table() {
        assert_eq!(CommandKind::Get.verb(), "GET");
        assert_eq!(CommandKind::Set.verb(), "SET");
        assert_eq!(CommandKind::IncrBy.verb(), "INCRBY");
        assert_eq!(CommandKind::LPop.verb(), "LPOP");
        assert_eq!(CommandKind::LRange.verb(), "LRANGE");
        assert_eq!(CommandKind::RPush.verb(), "RPUSH");
        assert_eq!(CommandKind::Ping.verb(), "PING");
        assert_eq!(CommandKind::Publish.verb(), "PUBLISH");
        assert_eq!(CommandKind::Subscribe.verb(), "SUBSCRIBE");
        assert_eq!(CommandKind::Unsubscribe.verb(), "UNSUBSCRIBE");
    }

    #[test]
    fn test_from_verb() {
        assert_eq!(CommandKind::from_verb("lpop"), Some(CommandKind::LPop));
        assert_eq!(CommandKind::from_verb("SUBSCRIBE"), Some(CommandKind::Subscribe));
        assert_eq!(CommandKind::from_verb("DEL"), None);
    }

    #[test]
    fn test_is_pubsub() {
        assert!(CommandKind::Subscribe.is_pubsub());
        assert!(CommandKind::Unsubscribe.is_pubsub());
        assert!(!CommandKind::Publish.is_pubsub());
        assert!(!CommandKind::Get.is_pubsub());
    }
}
