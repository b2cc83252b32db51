use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use menubus_client::resp::{decode, RespValue};
use menubus_client::{
    ClientConfig, FramingMode, MenuBusClient, MessageHandler, SessionError, SessionPhase,
    SessionResult, PUBLISHER_SESSION,
};
use menubus_common::{CommandKind, RequestOrigin};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

struct Discard;

impl MessageHandler for Discard {
    fn on_message(&self, _: &str, _: SessionResult<Bytes>, _: Option<&RequestOrigin>) {}
}

/// Accepts `connections` clients and forwards every decoded command as
/// `(connection index, args)`.
async fn spawn_peer(connections: usize) -> (u16, mpsc::UnboundedReceiver<(usize, Vec<Vec<u8>>)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for idx in 0..connections {
            let (stream, _) = listener.accept().await.expect("accept");
            tokio::spawn(read_commands(idx, stream, tx.clone()));
        }
    });

    (port, rx)
}

async fn read_commands(idx: usize, mut stream: TcpStream, tx: mpsc::UnboundedSender<(usize, Vec<Vec<u8>>)>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        while let Some((value, len)) = decode(&buf).expect("valid request") {
            buf.drain(..len);
            let args = match value {
                RespValue::Array(items) => items
                    .into_iter()
                    .map(|item| match item {
                        RespValue::Bulk(Some(data)) => data,
                        other => panic!("unexpected element {:?}", other),
                    })
                    .collect(),
                other => panic!("unexpected request {:?}", other),
            };
            let _ = tx.send((idx, args));
        }
    }
}

async fn collect(
    rx: &mut mpsc::UnboundedReceiver<(usize, Vec<Vec<u8>>)>,
    count: usize,
) -> HashMap<usize, Vec<Vec<String>>> {
    let mut by_conn: HashMap<usize, Vec<Vec<String>>> = HashMap::new();
    for _ in 0..count {
        let (idx, args) = timeout(WAIT, rx.recv()).await.expect("command timeout").expect("peer gone");
        let args = args
            .into_iter()
            .map(|arg| String::from_utf8(arg).expect("utf8"))
            .collect();
        by_conn.entry(idx).or_default().push(args);
    }
    by_conn
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}

#[tokio::test]
async fn operations_are_routed_by_role() {
    let (port, mut commands) = spawn_peer(3).await;
    let config = ClientConfig::builder().host("127.0.0.1").port(port).build();
    let client = MenuBusClient::connect(config, Arc::new(Discard)).unwrap();
    client.connected().await.unwrap();

    client.fetch_menu().unwrap();
    client.subscribe_menu().unwrap();
    client.subscribe("42").unwrap();
    client.store_message("42", "hello").unwrap();
    client.unsubscribe("42").unwrap();
    client.publish_menu(b"v2").unwrap();

    let by_conn = collect(&mut commands, 6).await;
    assert_eq!(by_conn.len(), 3);

    let sessions: Vec<&Vec<Vec<String>>> = by_conn.values().collect();
    let notifications = sessions
        .iter()
        .find(|cmds| cmds[0][0] == "SUBSCRIBE" && cmds[0][1] == "notifications:42")
        .expect("notification session");
    assert_eq!(
        **notifications,
        vec![
            strings(&["SUBSCRIBE", "notifications:42"]),
            strings(&["UNSUBSCRIBE", "notifications:42"]),
        ]
    );

    let menu = sessions
        .iter()
        .find(|cmds| cmds[0][1] == "menu:updates" && cmds[0][0] == "SUBSCRIBE")
        .expect("menu session");
    assert_eq!(**menu, vec![strings(&["SUBSCRIBE", "menu:updates"])]);

    let publisher = sessions
        .iter()
        .find(|cmds| cmds[0][0] == "GET")
        .expect("publisher session");
    assert_eq!(
        **publisher,
        vec![
            strings(&["GET", "menu:current"]),
            strings(&["RPUSH", "messages:42", "hello"]),
            strings(&["PUBLISH", "menu:updates", "v2"]),
        ]
    );

    client.disconnect().await;
}

#[tokio::test]
async fn disconnect_closes_every_session_and_can_repeat() {
    let (port, _commands) = spawn_peer(3).await;
    let config = ClientConfig::builder()
        .port(port)
        .framing(FramingMode::Resp)
        .build();
    let client = MenuBusClient::connect(config, Arc::new(Discard)).unwrap();
    client.connected().await.unwrap();

    client.disconnect().await;
    for session in [client.publisher(), client.menu_subscriber(), client.notifications()] {
        assert_eq!(session.phase(), SessionPhase::Closed);
    }
    client.disconnect().await;

    assert!(matches!(client.fetch_menu(), Err(SessionError::Closed)));
    assert!(matches!(client.subscribe("1"), Err(SessionError::Closed)));
    assert!(matches!(client.subscribe_menu(), Err(SessionError::Closed)));
}

#[tokio::test]
async fn execute_goes_through_the_publisher() {
    let (port, mut commands) = spawn_peer(3).await;
    let config = ClientConfig::builder().port(port).build();
    let client = MenuBusClient::connect(config, Arc::new(Discard)).unwrap();
    client.connected().await.unwrap();

    client
        .execute(CommandKind::IncrBy, &["visits", "5"])
        .unwrap();
    client.fetch_menu().unwrap();

    let by_conn = collect(&mut commands, 2).await;
    assert_eq!(by_conn.len(), 1, "both commands share the publisher session");
    let publisher = by_conn.values().next().unwrap();
    assert_eq!(
        *publisher,
        vec![
            strings(&["INCRBY", "visits", "5"]),
            strings(&["GET", "menu:current"]),
        ]
    );

    client.disconnect().await;
}

#[tokio::test]
async fn connected_names_the_session_that_failed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let config = ClientConfig::builder().port(port).build();
    let client = MenuBusClient::connect(config, Arc::new(Discard)).unwrap();
    match client.connected().await {
        Err(SessionError::NotConnected { session }) => assert_eq!(session, PUBLISHER_SESSION),
        other => panic!("expected NotConnected, got {:?}", other),
    }
    client.disconnect().await;
}

#[tokio::test]
async fn invalid_namespaces_are_rejected() {
    let mut config = ClientConfig::default();
    config.namespaces.menu_channel.clear();
    let err = MenuBusClient::connect(config, Arc::new(Discard)).err().expect("rejected");
    assert!(matches!(err, SessionError::Config(_)));
}
