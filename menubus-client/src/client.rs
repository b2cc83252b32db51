//! # MenuBus Facade
//!
//! Purpose: Expose named menu and messaging operations, each routed to the
//! session whose role matches it.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `MenuBusClient` hides sessions, encoding and key
//!    derivation behind one method per domain operation.
//! 2. **Role Isolation**: A connection in pub/sub mode can only run pub/sub
//!    commands, so subscriptions get their own sessions and every other
//!    command goes through the publisher.
//! 3. **Fire and Observe**: Methods return once the request is queued;
//!    replies arrive through the `MessageHandler`.
//!
//! ## Routing
//!
//! ```text
//! fetch_menu / update_menu / publish_menu    ─┐
//! retrieve_message / store_message           ─┼─> publisher
//! list_messages / notify / ping / execute    ─┘
//! subscribe_menu                             ───> menu subscriber
//! subscribe / unsubscribe                    ───> notifications
//! ```

use std::sync::Arc;

use menubus_common::{encode, encode_binary, CommandKind, Namespaces, Request, RequestKind};

use crate::config::ClientConfig;
use crate::error::SessionResult;
use crate::session::{MessageHandler, Session};

/// Label of the publisher/command session.
pub const PUBLISHER_SESSION: &str = "publisher";

/// Label of the menu broadcast subscriber session.
pub const MENU_SESSION: &str = "menu-subscriber";

/// Label of the per-entity notification subscriber session.
pub const NOTIFICATION_SESSION: &str = "notifications";

/// Facade over the three MenuBus sessions.
pub struct MenuBusClient {
    namespaces: Namespaces,
    publisher: Session,
    menu: Session,
    notifications: Session,
}

impl MenuBusClient {
    /// Validates `config` and starts connecting all three sessions.
    ///
    /// Must be called from within a Tokio runtime. Every session reports to
    /// the same `handler`, identified by its label.
    pub fn connect(config: ClientConfig, handler: Arc<dyn MessageHandler>) -> SessionResult<Self> {
        config.validate()?;
        let publisher = Session::connect(config.session(PUBLISHER_SESSION), handler.clone())?;
        let menu = Session::connect(config.session(MENU_SESSION), handler.clone())?;
        let notifications = Session::connect(config.session(NOTIFICATION_SESSION), handler)?;
        Ok(MenuBusClient {
            namespaces: config.namespaces,
            publisher,
            menu,
            notifications,
        })
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    pub fn publisher(&self) -> &Session {
        &self.publisher
    }

    pub fn menu_subscriber(&self) -> &Session {
        &self.menu
    }

    pub fn notifications(&self) -> &Session {
        &self.notifications
    }

    /// Waits until every session is connected.
    ///
    /// Fails with `SessionError::NotConnected` naming the first session, in
    /// disconnect order, that stopped before connecting.
    pub async fn connected(&self) -> SessionResult<()> {
        for session in [&self.publisher, &self.menu, &self.notifications] {
            if let Err(err) = session.connected().await {
                tracing::warn!(session = session.label(), error = %err, "session did not connect");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Fetches the current menu value.
    pub fn fetch_menu(&self) -> SessionResult<()> {
        self.publisher.send(self.requests().fetch_menu())
    }

    /// Replaces the stored menu value.
    pub fn update_menu(&self, menu: &str) -> SessionResult<()> {
        self.publisher.send(self.requests().update_menu(menu))
    }

    /// Pops the next pending message for an entity.
    pub fn retrieve_message(&self, id: &str) -> SessionResult<()> {
        self.publisher.send(self.requests().retrieve_message(id))
    }

    /// Lists every pending message for an entity without removing them.
    pub fn list_messages(&self, id: &str) -> SessionResult<()> {
        self.publisher.send(self.requests().list_messages(id))
    }

    /// Appends a message to an entity's queue.
    pub fn store_message(&self, id: &str, message: &str) -> SessionResult<()> {
        self.publisher.send(self.requests().store_message(id, message))
    }

    /// Broadcasts a menu update.
    pub fn publish_menu(&self, payload: &[u8]) -> SessionResult<()> {
        self.publisher.send(self.requests().publish_menu(payload))
    }

    /// Publishes on an entity's notification channel.
    pub fn notify(&self, id: &str, payload: &[u8]) -> SessionResult<()> {
        self.publisher.send(self.requests().notify(id, payload))
    }

    /// Subscribes to the menu broadcast channel.
    pub fn subscribe_menu(&self) -> SessionResult<()> {
        self.menu.send(self.requests().subscribe_menu())
    }

    /// Subscribes to an entity's notification channel.
    pub fn subscribe(&self, id: &str) -> SessionResult<()> {
        self.notifications.send(self.requests().subscribe(id))
    }

    /// Unsubscribes from an entity's notification channel.
    pub fn unsubscribe(&self, id: &str) -> SessionResult<()> {
        self.notifications.send(self.requests().unsubscribe(id))
    }

    pub fn ping(&self) -> SessionResult<()> {
        self.publisher.send(self.requests().ping())
    }

    /// Sends any catalog command on the publisher session.
    pub fn execute(&self, kind: CommandKind, args: &[&str]) -> SessionResult<()> {
        self.publisher
            .send(Request::new(RequestKind::Generic, encode(kind, args)))
    }

    /// Closes the publisher, menu subscriber and notification sessions, in
    /// that order. Safe to call more than once.
    pub async fn disconnect(&self) {
        tracing::info!(session = PUBLISHER_SESSION, "disconnecting");
        self.publisher.close().await;
        tracing::info!(session = MENU_SESSION, "disconnecting");
        self.menu.close().await;
        tracing::info!(session = NOTIFICATION_SESSION, "disconnecting");
        self.notifications.close().await;
    }

    fn requests(&self) -> Requests<'_> {
        Requests {
            ns: &self.namespaces,
        }
    }
}

/// Builds the encoded request for each facade operation.
struct Requests<'a> {
    ns: &'a Namespaces,
}

impl Requests<'_> {
    fn fetch_menu(&self) -> Request {
        Request::new(RequestKind::FetchMenu, encode(CommandKind::Get, &[self.ns.menu_key.as_str()]))
    }

    fn update_menu(&self, menu: &str) -> Request {
        Request::new(
            RequestKind::UpdateMenu,
            encode(CommandKind::Set, &[self.ns.menu_key.as_str(), menu]),
        )
    }

    fn retrieve_message(&self, id: &str) -> Request {
        let key = self.ns.message_key(id);
        Request::new(RequestKind::RetrieveMessage, encode(CommandKind::LPop, &[key.as_str()]))
            .with_correlation(id)
    }

    fn list_messages(&self, id: &str) -> Request {
        let key = self.ns.message_key(id);
        Request::new(
            RequestKind::RetrieveMessage,
            encode(CommandKind::LRange, &[key.as_str(), "0", "-1"]),
        )
        .with_correlation(id)
    }

    fn store_message(&self, id: &str, message: &str) -> Request {
        let key = self.ns.message_key(id);
        Request::new(
            RequestKind::StoreMessage,
            encode(CommandKind::RPush, &[key.as_str(), message]),
        )
        .with_correlation(id)
    }

    fn publish_menu(&self, payload: &[u8]) -> Request {
        Request::new(
            RequestKind::Publish,
            encode_binary(CommandKind::Publish, &[self.ns.menu_channel.as_bytes(), payload]),
        )
    }

    fn notify(&self, id: &str, payload: &[u8]) -> Request {
        let channel = self.ns.notification_channel(id);
        Request::new(
            RequestKind::Publish,
            encode_binary(CommandKind::Publish, &[channel.as_bytes(), payload]),
        )
        .with_correlation(id)
    }

    fn subscribe_menu(&self) -> Request {
        Request::new(
            RequestKind::Subscribe,
            encode(CommandKind::Subscribe, &[self.ns.menu_channel.as_str()]),
        )
    }

    fn subscribe(&self, id: &str) -> Request {
        let channel = self.ns.notification_channel(id);
        Request::new(RequestKind::Subscribe, encode(CommandKind::Subscribe, &[channel.as_str()]))
            .with_correlation(id)
    }

    fn unsubscribe(&self, id: &str) -> Request {
        let channel = self.ns.notification_channel(id);
        Request::new(
            RequestKind::Unsubscribe,
            encode(CommandKind::Unsubscribe, &[channel.as_str()]),
        )
        .with_correlation(id)
    }

    fn ping(&self) -> Request {
        Request::new(RequestKind::Generic, encode(CommandKind::Ping, &[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resp::{decode, RespValue};

    fn args_of(request: &Request) -> Vec<Vec<u8>> {
        match decode(&request.payload).unwrap() {
            Some((RespValue::Array(items), len)) if len == request.payload.len() => items
                .into_iter()
                .map(|item| match item {
                    RespValue::Bulk(Some(data)) => data,
                    other => panic!("expected bulk string, got {:?}", other),
                })
                .collect(),
            other => panic!("expected a complete array, got {:?}", other),
        }
    }

    fn ns() -> Namespaces {
        Namespaces::default()
    }

    #[test]
    fn subscribe_then_unsubscribe_share_channel() {
        let ns = ns();
        let requests = Requests { ns: &ns };
        let sub = args_of(&requests.subscribe("42"));
        let unsub = args_of(&requests.unsubscribe("42"));
        assert_eq!(sub[0], b"SUBSCRIBE");
        assert_eq!(unsub[0], b"UNSUBSCRIBE");
        assert_eq!(sub[1], unsub[1]);
        assert_eq!(sub[1], b"notifications:42");
    }

    #[test]
    fn menu_requests_use_configured_names() {
        let ns = Namespaces {
            menu_channel: "shop:updates".into(),
            menu_key: "shop:menu".into(),
            ..Namespaces::default()
        };
        let requests = Requests { ns: &ns };
        assert_eq!(args_of(&requests.fetch_menu()), vec![b"GET".to_vec(), b"shop:menu".to_vec()]);
        assert_eq!(
            args_of(&requests.subscribe_menu()),
            vec![b"SUBSCRIBE".to_vec(), b"shop:updates".to_vec()]
        );
        assert_eq!(
            args_of(&requests.publish_menu(b"v2")),
            vec![b"PUBLISH".to_vec(), b"shop:updates".to_vec(), b"v2".to_vec()]
        );
        assert_eq!(
            args_of(&requests.update_menu("v3")),
            vec![b"SET".to_vec(), b"shop:menu".to_vec(), b"v3".to_vec()]
        );
    }

    #[test]
    fn message_requests_use_prefixed_key() {
        let ns = ns();
        let requests = Requests { ns: &ns };

        let pop = requests.retrieve_message("7");
        assert_eq!(pop.kind, RequestKind::RetrieveMessage);
        assert_eq!(pop.correlation.as_deref(), Some("7"));
        assert_eq!(args_of(&pop), vec![b"LPOP".to_vec(), b"messages:7".to_vec()]);

        let push = requests.store_message("7", "hello");
        assert_eq!(push.kind, RequestKind::StoreMessage);
        assert_eq!(
            args_of(&push),
            vec![b"RPUSH".to_vec(), b"messages:7".to_vec(), b"hello".to_vec()]
        );

        let range = requests.list_messages("7");
        assert_eq!(
            args_of(&range),
            vec![b"LRANGE".to_vec(), b"messages:7".to_vec(), b"0".to_vec(), b"-1".to_vec()]
        );
    }

    #[test]
    fn notify_publishes_on_entity_channel() {
        let ns = ns();
        let requests = Requests { ns: &ns };
        assert_eq!(
            args_of(&requests.notify("9", b"ready")),
            vec![b"PUBLISH".to_vec(), b"notifications:9".to_vec(), b"ready".to_vec()]
        );
        assert_eq!(args_of(&requests.ping()), vec![b"PING".to_vec()]);
    }
}
