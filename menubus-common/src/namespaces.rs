//! # Namespaces
//!
//! Purpose: Hold the key and channel names the facade derives its requests
//! from, so no operation hard-codes a storage layout.
//!
//! ## Design Principles
//!
//! 1. **Immutable After Load**: Values are fixed for the process lifetime.
//! 2. **Prefix Derivation**: Per-entity names are `<prefix><id>`, with no
//!    separator added; put any separator in the prefix itself.
//! 3. **Serde Defaults**: Missing fields in a config file fall back to the
//!    defaults below.
//!
//! ## Layout Example
//!
//! ```text
//! menu_channel         "menu:updates"        <- PUBLISH / SUBSCRIBE
//! menu_key             "menu:current"        <- GET / SET
//! message_prefix + id  "messages:42"         <- RPUSH / LPOP / LRANGE
//! notification_prefix  "notifications:42"    <- SUBSCRIBE / UNSUBSCRIBE
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default broadcast channel for menu updates.
pub const DEFAULT_MENU_CHANNEL: &str = "menu:updates";

/// Default storage key of the current menu.
pub const DEFAULT_MENU_KEY: &str = "menu:current";

/// Default prefix of per-entity message queues.
pub const DEFAULT_MESSAGE_PREFIX: &str = "messages:";

/// Default prefix of per-entity notification channels.
pub const DEFAULT_NOTIFICATION_PREFIX: &str = "notifications:";

/// Key and channel names used by the facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Namespaces {
    /// Broadcast channel carrying menu updates.
    pub menu_channel: String,
    /// Key holding the current menu value.
    pub menu_key: String,
    /// Prefix of the per-entity message queue key.
    pub message_prefix: String,
    /// Prefix of the per-entity notification channel.
    pub notification_prefix: String,
}

impl Default for Namespaces {
    fn default() -> Self {
        Namespaces {
            menu_channel: DEFAULT_MENU_CHANNEL.to_string(),
            menu_key: DEFAULT_MENU_KEY.to_string(),
            message_prefix: DEFAULT_MESSAGE_PREFIX.to_string(),
            notification_prefix: DEFAULT_NOTIFICATION_PREFIX.to_string(),
        }
    }
}

impl Namespaces {
    /// Message queue key for an entity.
    pub fn message_key(&self, id: &str) -> String {
        format!("{}{}", self.message_prefix, id)
    }

    /// Notification channel for an entity.
    pub fn notification_channel(&self, id: &str) -> String {
        format!("{}{}", self.notification_prefix, id)
    }

    /// Rejects empty fixed names. Prefixes may be empty.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.menu_channel.is_empty() {
            return Err(ConfigError::Invalid("menu_channel must not be empty".into()));
        }
        if self.menu_key.is_empty() {
            return Err(ConfigError::Invalid("menu_key must not be empty".into()));
        }
        Ok(())
    }
}
