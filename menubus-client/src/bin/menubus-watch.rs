//! # MenuBus Watcher
//!
//! Purpose: Connect the facade, follow the menu channel (and optionally one
//! user's notifications), and log every inbound message until Ctrl-C.
//!
//! ## Environment
//! - `MENUBUS_CONFIG`: optional path to a JSON `ClientConfig`.
//! - `MENUBUS_USER`: optional entity id whose notifications are followed.
//! - `RUST_LOG`: log filter, `info` by default.

use std::env;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use menubus_client::resp::{self, RespValue};
use menubus_client::{ClientConfig, MenuBusClient, MessageHandler, SessionResult};
use menubus_common::RequestOrigin;
use tracing_subscriber::EnvFilter;

struct LogHandler;

impl MessageHandler for LogHandler {
    fn on_message(&self, session: &str, message: SessionResult<Bytes>, origin: Option<&RequestOrigin>) {
        let origin = origin.map(|o| o.kind);
        match message {
            Ok(raw) => match resp::decode(&raw) {
                Ok(Some((value, _))) => {
                    tracing::info!(session, ?origin, reply = %describe(&value), "message")
                }
                _ => tracing::info!(session, ?origin, raw = %String::from_utf8_lossy(&raw), "message"),
            },
            Err(err) => tracing::error!(session, ?origin, error = %err, "session failed"),
        }
    }
}

fn describe(value: &RespValue) -> String {
    match value {
        RespValue::Simple(text) => String::from_utf8_lossy(text).into_owned(),
        RespValue::Error(text) => format!("ERR {}", String::from_utf8_lossy(text)),
        RespValue::Integer(n) => n.to_string(),
        RespValue::Bulk(Some(data)) => String::from_utf8_lossy(data).into_owned(),
        RespValue::Bulk(None) => "(nil)".to_string(),
        RespValue::Array(items) => {
            let parts: Vec<String> = items.iter().map(describe).collect();
            format!("[{}]", parts.join(", "))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match env::var("MENUBUS_CONFIG") {
        Ok(path) => ClientConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        Err(_) => ClientConfig::default(),
    };
    tracing::info!(host = %config.host, port = config.port, "starting watcher");

    let client = MenuBusClient::connect(config, Arc::new(LogHandler))?;
    client.subscribe_menu()?;
    client.fetch_menu()?;
    if let Ok(user) = env::var("MENUBUS_USER") {
        client.subscribe(&user)?;
        client.retrieve_message(&user)?;
    }

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    client.disconnect().await;
    Ok(())
}
