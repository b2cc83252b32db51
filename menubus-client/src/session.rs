//! # Asynchronous Session
//!
//! Purpose: Own one TCP connection to a RESP peer, write requests strictly
//! in the order they were sent, and hand every framed inbound message to a
//! user-supplied handler.
//!
//! ## Design Principles
//! 1. **Actor Pattern**: One Tokio task owns the socket halves, the outbound
//!    queue and the framer. `Session` handles only talk to it through a
//!    mailbox, so no two operations on that state ever interleave, however
//!    many worker threads drive the runtime.
//! 2. **Single-Flight Writes**: At most one write is outstanding; its
//!    completion pops the queue and starts the next one.
//! 3. **Shared Ownership**: Handles are cheap clones. The task keeps running
//!    while any handle is alive, and flushes what is queued once the last
//!    handle is dropped.
//! 4. **Fail Once**: Any connect, read, write or framing error is delivered
//!    to the handler and ends the session. There is no reconnect.
//!
//! ## Task Layout
//!
//! ```text
//! Session (handle) --ops--> SessionTask
//!                             ├── queue: OutboundQueue  (front = in flight)
//!                             ├── in_flight: Option<WriteFuture>
//!                             ├── reader: OwnedReadHalf --read--> Framer
//!                             └── awaiting: VecDeque<RequestOrigin>
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use menubus_common::{Request, RequestOrigin};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::framing::Framer;

/// Receives every inbound message (or the terminal error) of a session.
///
/// Called from the session task; implementations should return quickly and
/// hand heavy work to another task.
pub trait MessageHandler: Send + Sync + 'static {
    /// `message` is the raw framed bytes, not a decoded reply.
    ///
    /// `origin` is a best-effort guess at the request being answered: the
    /// oldest written request still waiting for a reply, else the most
    /// recently written one. Pub/sub pushes therefore carry the latest
    /// request on the session, not the subscription of their channel;
    /// decode the push to learn the channel. A merged short-read message is
    /// attributed to its first reply and retires one waiting request per
    /// reply it contains.
    fn on_message(
        &self,
        session: &str,
        message: SessionResult<Bytes>,
        origin: Option<&RequestOrigin>,
    );
}

/// Connection lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Closed,
}

enum SessionOp {
    Send(Request),
    Close(oneshot::Sender<()>),
}

/// Handle to a session task.
#[derive(Clone)]
pub struct Session {
    label: Arc<str>,
    ops: mpsc::UnboundedSender<SessionOp>,
    phase: watch::Receiver<SessionPhase>,
}

impl Session {
    /// Spawns the session task on the current Tokio runtime and starts
    /// connecting.
    ///
    /// Connection failures are reported to `handler`, not returned here.
    pub fn connect(config: SessionConfig, handler: Arc<dyn MessageHandler>) -> SessionResult<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(SessionPhase::Disconnected);
        let label: Arc<str> = Arc::from(config.label.as_str());

        let task = SessionTask {
            label: label.clone(),
            framer: Framer::new(config.framing),
            config,
            handler,
            ops: ops_rx,
            ops_open: true,
            phase: phase_tx,
            queue: OutboundQueue::default(),
            awaiting: VecDeque::new(),
            last_sent: None,
        };
        runtime.spawn(task.run());

        Ok(Session {
            label,
            ops: ops_tx,
            phase: phase_rx,
        })
    }

    /// Queues a request for writing. Safe to call from any thread, inside or
    /// outside the runtime.
    ///
    /// Returns `SessionError::Closed` once the session has stopped.
    pub fn send(&self, request: Request) -> SessionResult<()> {
        self.ops
            .send(SessionOp::Send(request))
            .map_err(|_| SessionError::Closed)
    }

    /// Stops the session and waits until the task has released the socket.
    ///
    /// Pending writes are discarded. Closing a closed session does nothing.
    pub async fn close(&self) {
        let (ack, done) = oneshot::channel();
        if self.ops.send(SessionOp::Close(ack)).is_err() {
            return;
        }
        let _ = done.await;
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Waits until the connection is established.
    ///
    /// Returns `SessionError::NotConnected` naming this session if it
    /// stopped first.
    pub async fn connected(&self) -> SessionResult<()> {
        let mut phase = self.phase.clone();
        let reached = phase
            .wait_for(|p| !matches!(p, SessionPhase::Disconnected | SessionPhase::Connecting))
            .await
            .map(|p| *p);
        match reached {
            Ok(SessionPhase::Connected) => Ok(()),
            _ => Err(SessionError::NotConnected {
                session: self.label.to_string(),
            }),
        }
    }

    /// Waits until the session has stopped.
    pub async fn closed(&self) {
        let mut phase = self.phase.clone();
        let _ = phase.wait_for(|p| *p == SessionPhase::Closed).await;
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("label", &self.label)
            .field("phase", &self.phase())
            .finish()
    }
}

/// FIFO of accepted requests; the front entry is the one being written.
#[derive(Debug, Default)]
struct OutboundQueue {
    pending: VecDeque<Request>,
    in_flight: bool,
}

impl OutboundQueue {
    fn enqueue(&mut self, request: Request) {
        self.pending.push_back(request);
    }

    /// Payload to write now, or `None` if a write is already in flight or
    /// nothing is queued.
    fn start(&mut self) -> Option<Bytes> {
        if self.in_flight {
            return None;
        }
        let payload = self.pending.front()?.payload.clone();
        self.in_flight = true;
        Some(payload)
    }

    /// Marks the in-flight write as done and returns its request.
    fn complete(&mut self) -> Option<Request> {
        if !self.in_flight {
            return None;
        }
        self.in_flight = false;
        self.pending.pop_front()
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

type WriteFuture = Pin<Box<dyn Future<Output = (OwnedWriteHalf, io::Result<()>)> + Send>>;

fn begin_write(writer: &mut Option<OwnedWriteHalf>, payload: Bytes) -> Option<WriteFuture> {
    let mut half = writer.take()?;
    Some(Box::pin(async move {
        let result = half.write_all(&payload).await;
        (half, result)
    }))
}

async fn drive_write(in_flight: &mut Option<WriteFuture>) -> (OwnedWriteHalf, io::Result<()>) {
    match in_flight.as_mut() {
        Some(write) => write.await,
        None => std::future::pending().await,
    }
}

struct SessionTask {
    label: Arc<str>,
    config: SessionConfig,
    handler: Arc<dyn MessageHandler>,
    ops: mpsc::UnboundedReceiver<SessionOp>,
    ops_open: bool,
    phase: watch::Sender<SessionPhase>,
    queue: OutboundQueue,
    framer: Framer,
    awaiting: VecDeque<RequestOrigin>,
    last_sent: Option<RequestOrigin>,
}

impl SessionTask {
    async fn run(mut self) {
        let addr = self.config.addr();
        self.phase.send_replace(SessionPhase::Connecting);
        tracing::debug!(session = %self.label, %addr, "connecting");

        let stream = match self.establish(&addr).await {
            Ok(Some(stream)) => stream,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(session = %self.label, %addr, error = %err, "connect failed");
                self.handler.on_message(&self.label, Err(err), None);
                self.finish(None);
                return;
            }
        };

        self.phase.send_replace(SessionPhase::Connected);
        tracing::info!(session = %self.label, %addr, "connected");

        let ack = self.serve(stream).await;
        self.finish(ack);
    }

    /// Connects while still accepting mailbox traffic. `Ok(None)` means the
    /// session was closed (or abandoned with nothing queued) before the
    /// connection came up.
    async fn establish(&mut self, addr: &str) -> SessionResult<Option<TcpStream>> {
        let host = self.config.host.clone();
        let connect = TcpStream::connect((host.as_str(), self.config.port));
        tokio::pin!(connect);

        let stream = loop {
            tokio::select! {
                result = &mut connect => {
                    break result.map_err(|err| SessionError::connection(addr, err))?;
                }
                op = self.ops.recv(), if self.ops_open => match op {
                    Some(SessionOp::Send(request)) => self.queue.enqueue(request),
                    Some(SessionOp::Close(ack)) => {
                        self.finish(Some(ack));
                        return Ok(None);
                    }
                    None => {
                        self.ops_open = false;
                        if self.queue.is_empty() {
                            self.finish(None);
                            return Ok(None);
                        }
                    }
                },
            }
        };

        // Small requests must not wait for Nagle coalescing.
        stream
            .set_nodelay(true)
            .map_err(|err| SessionError::connection(addr, err))?;
        Ok(Some(stream))
    }

    /// Runs the read and write loops until close, error, or abandonment.
    /// Returns the close acknowledgement, if a close was requested.
    async fn serve(&mut self, stream: TcpStream) -> Option<oneshot::Sender<()>> {
        let (mut reader, write_half) = stream.into_split();
        let mut writer = Some(write_half);
        let mut in_flight: Option<WriteFuture> = None;
        let mut chunk = vec![0u8; self.framer.read_size()];

        if let Some(payload) = self.queue.start() {
            in_flight = begin_write(&mut writer, payload);
        }

        loop {
            if !self.ops_open && self.queue.is_empty() {
                tracing::debug!(session = %self.label, "all handles dropped, queue drained");
                return None;
            }

            tokio::select! {
                op = self.ops.recv(), if self.ops_open => match op {
                    Some(SessionOp::Send(request)) => {
                        self.queue.enqueue(request);
                        if let Some(payload) = self.queue.start() {
                            in_flight = begin_write(&mut writer, payload);
                        }
                        tracing::trace!(session = %self.label, queued = self.queue.len(), "request accepted");
                    }
                    Some(SessionOp::Close(ack)) => return Some(ack),
                    None => self.ops_open = false,
                },
                (half, result) = drive_write(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    writer = Some(half);
                    if let Err(err) = result {
                        let origin = self.queue.complete().map(|request| request.origin());
                        self.fail(SessionError::Transport(err), origin.as_ref());
                        return None;
                    }
                    if let Some(done) = self.queue.complete() {
                        let origin = done.origin();
                        self.awaiting.push_back(origin.clone());
                        self.last_sent = Some(origin);
                    }
                    if let Some(payload) = self.queue.start() {
                        in_flight = begin_write(&mut writer, payload);
                    }
                }
                read = reader.read(&mut chunk) => match read {
                    Ok(0) => {
                        self.fail(SessionError::peer_closed(), None);
                        return None;
                    }
                    Ok(n) => {
                        if let Err(err) = self.dispatch(&chunk[..n]) {
                            self.fail(err, None);
                            return None;
                        }
                    }
                    Err(err) => {
                        self.fail(SessionError::Transport(err), None);
                        return None;
                    }
                },
            }
        }
    }

    fn dispatch(&mut self, bytes: &[u8]) -> SessionResult<()> {
        for frame in self.framer.push(bytes)? {
            let replies = self.framer.replies_in(&frame);
            let origin = self.awaiting.pop_front().or_else(|| self.last_sent.clone());
            // A merged message answers several requests at once.
            let merged = (replies - 1).min(self.awaiting.len());
            self.awaiting.drain(..merged);
            tracing::debug!(session = %self.label, len = frame.len(), replies, "message framed");
            self.handler.on_message(&self.label, Ok(frame), origin.as_ref());
        }
        Ok(())
    }

    fn fail(&self, err: SessionError, origin: Option<&RequestOrigin>) {
        tracing::warn!(session = %self.label, error = %err, "session failed");
        self.handler.on_message(&self.label, Err(err), origin);
    }

    fn finish(&mut self, ack: Option<oneshot::Sender<()>>) {
        self.phase.send_replace(SessionPhase::Closing);
        if !self.queue.is_empty() {
            tracing::debug!(session = %self.label, dropped = self.queue.len(), "discarding queued requests");
        }
        if self.framer.buffered() > 0 {
            tracing::debug!(session = %self.label, dropped = self.framer.buffered(), "discarding partial message");
        }
        // Refuse new sends before announcing Closed.
        self.ops.close();
        self.phase.send_replace(SessionPhase::Closed);
        tracing::info!(session = %self.label, "closed");
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }
}
