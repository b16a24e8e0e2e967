//! Client socket session: one physical connection plus its lifecycle.
//!
//! [`SocketSession`] is an explicit session object (not a module-level
//! singleton): the application context owns it, connects it after login,
//! and disconnects it on logout. Internally a spawned task drives the
//! connect → process → reconnect loop; consumers observe the session
//! through a [`watch`] channel of [`ConnectionState`] and a
//! [`broadcast`] channel of inbound [`ServerFrame`]s.
//!
//! Room membership is tracked on the client: the server forgets joins
//! when a connection drops, so after every reconnect the session
//! re-issues `join:course` for each desired room before it forwards any
//! new event.

use std::collections::HashSet;
use std::sync::Arc;

use coursehub_core::types::CourseId;
use coursehub_events::wire::{
    parse_server_frame, ClientFrame, CourseRef, ProgressReport, ServerFrame,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::{HubClient, HubConnection};
use crate::reconnect::{reconnect_loop, ReconnectConfig, ReconnectOutcome};

/// Buffer capacity for the inbound event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Connection lifecycle states observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no activity. Initial state, and the result of
    /// an explicit `disconnect()` or a failed initial handshake.
    Disconnected,
    /// An initial `connect()` is in flight.
    Connecting,
    /// Live connection; room membership established.
    Connected,
    /// Transport was lost; a bounded reconnection run is in progress.
    Reconnecting { attempt: u32 },
    /// All reconnect attempts failed. Terminal until an explicit
    /// `connect()`.
    Exhausted,
}

/// Commands from the session handle to the connection task.
enum Command {
    Send(ClientFrame),
}

/// A client socket session owning one physical WebSocket connection.
pub struct SocketSession {
    client: HubClient,
    reconnect: ReconnectConfig,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    events_tx: broadcast::Sender<ServerFrame>,
    last_message: Arc<Mutex<Option<ServerFrame>>>,
    last_error: Arc<Mutex<Option<String>>>,
    desired_rooms: Arc<Mutex<HashSet<CourseId>>>,
    command_tx: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl SocketSession {
    /// Create a session in the `Disconnected` state.
    pub fn new(client: HubClient, reconnect: ReconnectConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client,
            reconnect,
            state_tx: Arc::new(state_tx),
            events_tx,
            last_message: Arc::new(Mutex::new(None)),
            last_error: Arc::new(Mutex::new(None)),
            desired_rooms: Arc::new(Mutex::new(HashSet::new())),
            command_tx: Mutex::new(None),
            cancel: Mutex::new(None),
        }
    }

    /// Start (or restart) the connection task with the given token.
    ///
    /// Valid from `Disconnected` and `Exhausted`; a no-op while a
    /// connection task is already running. The state moves to
    /// `Connecting` before this returns.
    pub async fn connect(&self, token: impl Into<String>) {
        let mut cancel_slot = self.cancel.lock().await;

        match &*self.state_tx.borrow() {
            ConnectionState::Disconnected | ConnectionState::Exhausted => {}
            state => {
                tracing::debug!(?state, "connect() ignored, session already active");
                return;
            }
        }

        let cancel = CancellationToken::new();
        *cancel_slot = Some(cancel.clone());

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        *self.command_tx.lock().await = Some(command_tx);

        self.state_tx.send_replace(ConnectionState::Connecting);

        let ctx = RunContext {
            client: self.client.clone(),
            token: token.into(),
            reconnect: self.reconnect.clone(),
            state_tx: Arc::clone(&self.state_tx),
            events_tx: self.events_tx.clone(),
            last_message: Arc::clone(&self.last_message),
            last_error: Arc::clone(&self.last_error),
            desired_rooms: Arc::clone(&self.desired_rooms),
        };
        tokio::spawn(run_loop(ctx, command_rx, cancel));
    }

    /// Tear the session down (user logout / component unmount).
    ///
    /// Cancels any in-flight reconnect timer; the resulting
    /// `Disconnected` state is intentional and does not trigger
    /// reconnection.
    pub async fn disconnect(&self) {
        if let Some(cancel) = self.cancel.lock().await.take() {
            cancel.cancel();
        }
        *self.command_tx.lock().await = None;
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }

    /// Add a course to the desired room set and join it if connected.
    ///
    /// Desired membership survives reconnects: the session re-issues the
    /// join after every successful (re)connection.
    pub async fn join_course(&self, course_id: CourseId) {
        self.desired_rooms.lock().await.insert(course_id);
        self.send_command(ClientFrame::JoinCourse(CourseRef { course_id }))
            .await;
    }

    /// Remove a course from the desired room set and leave its room.
    pub async fn leave_course(&self, course_id: CourseId) {
        self.desired_rooms.lock().await.remove(&course_id);
        self.send_command(ClientFrame::LeaveCourse(CourseRef { course_id }))
            .await;
    }

    /// Report a progress change to the server.
    pub async fn update_progress(&self, course_id: CourseId, percent: f32) {
        self.send_command(ClientFrame::ProgressUpdate(ProgressReport {
            course_id,
            percent,
        }))
        .await;
    }

    /// Send a typing:start indicator for the course discussion.
    pub async fn typing_start(&self, course_id: CourseId) {
        self.send_command(ClientFrame::TypingStart(CourseRef { course_id }))
            .await;
    }

    /// Send a typing:stop indicator.
    pub async fn typing_stop(&self, course_id: CourseId) {
        self.send_command(ClientFrame::TypingStop(CourseRef { course_id }))
            .await;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to lifecycle state changes (the connection-status
    /// callback surface).
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Whether the session currently holds a live connection.
    pub fn is_connected(&self) -> bool {
        *self.state_tx.borrow() == ConnectionState::Connected
    }

    /// Subscribe to inbound server frames.
    pub fn events(&self) -> broadcast::Receiver<ServerFrame> {
        self.events_tx.subscribe()
    }

    /// The most recently received server frame, if any.
    pub async fn last_message(&self) -> Option<ServerFrame> {
        self.last_message.lock().await.clone()
    }

    /// The most recent connection error, if any. Cleared on a
    /// successful connect.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    /// Forward a frame to the connection task, if one is running.
    ///
    /// Frames queued while the transport is down are flushed after the
    /// next reconnect, behind the room re-joins.
    async fn send_command(&self, frame: ClientFrame) {
        if let Some(tx) = self.command_tx.lock().await.as_ref() {
            let _ = tx.send(Command::Send(frame));
        }
    }
}

/// Everything the connection task needs, bundled so the spawn stays
/// readable.
struct RunContext {
    client: HubClient,
    token: String,
    reconnect: ReconnectConfig,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    events_tx: broadcast::Sender<ServerFrame>,
    last_message: Arc<Mutex<Option<ServerFrame>>>,
    last_error: Arc<Mutex<Option<String>>>,
    desired_rooms: Arc<Mutex<HashSet<CourseId>>>,
}

/// Why the frame-processing loop stopped.
enum Exit {
    /// Explicit cancellation (disconnect or session drop).
    Cancelled,
    /// The transport dropped out from under us.
    TransportLost,
}

/// Core connection loop: connect -> re-join rooms -> process -> reconnect.
async fn run_loop(
    ctx: RunContext,
    mut commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
) {
    // Initial connection. Any failure here -- handshake rejection or an
    // unreachable server -- surfaces as an error without starting a
    // retry loop; that is reserved for transport loss after `Connected`.
    let mut conn = tokio::select! {
        _ = cancel.cancelled() => {
            ctx.state_tx.send_replace(ConnectionState::Disconnected);
            return;
        }
        result = ctx.client.connect(&ctx.token) => match result {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "Connection failed");
                *ctx.last_error.lock().await = Some(e.to_string());
                ctx.state_tx.send_replace(ConnectionState::Disconnected);
                return;
            }
        }
    };
    *ctx.last_error.lock().await = None;

    loop {
        // Re-establish room membership before forwarding any event; the
        // server does not remember joins across a dropped connection.
        if rejoin_rooms(&mut conn, &ctx.desired_rooms).await.is_ok() {
            ctx.state_tx.send_replace(ConnectionState::Connected);

            match process(&mut conn, &ctx, &mut commands, &cancel).await {
                Exit::Cancelled => {
                    ctx.state_tx.send_replace(ConnectionState::Disconnected);
                    return;
                }
                Exit::TransportLost => {}
            }
        }

        if cancel.is_cancelled() {
            ctx.state_tx.send_replace(ConnectionState::Disconnected);
            return;
        }

        tracing::info!("Connection lost, entering reconnect loop");
        let state_tx = Arc::clone(&ctx.state_tx);
        let outcome = reconnect_loop(&ctx.client, &ctx.token, &ctx.reconnect, &cancel, |attempt| {
            state_tx.send_replace(ConnectionState::Reconnecting { attempt });
        })
        .await;

        match outcome {
            ReconnectOutcome::Reconnected(new_conn) => {
                *ctx.last_error.lock().await = None;
                conn = new_conn;
            }
            ReconnectOutcome::Cancelled => {
                ctx.state_tx.send_replace(ConnectionState::Disconnected);
                return;
            }
            ReconnectOutcome::Exhausted => {
                tracing::error!("Reconnect attempts exhausted");
                *ctx.last_error.lock().await = Some("reconnect attempts exhausted".into());
                ctx.state_tx.send_replace(ConnectionState::Exhausted);
                return;
            }
            ReconnectOutcome::Rejected(e) => {
                tracing::error!(error = %e, "Reconnect rejected by server");
                *ctx.last_error.lock().await = Some(e.to_string());
                ctx.state_tx.send_replace(ConnectionState::Exhausted);
                return;
            }
        }
    }
}

/// Send `join:course` for every desired room, in course-id order.
async fn rejoin_rooms(
    conn: &mut HubConnection,
    desired_rooms: &Mutex<HashSet<CourseId>>,
) -> Result<(), ()> {
    let mut rooms: Vec<CourseId> = desired_rooms.lock().await.iter().copied().collect();
    rooms.sort_unstable();

    for course_id in rooms {
        let frame = ClientFrame::JoinCourse(CourseRef { course_id });
        if send_frame(conn, &frame).await.is_err() {
            tracing::warn!(course_id, "Failed to re-join course room");
            return Err(());
        }
        tracing::debug!(course_id, "Re-joined course room");
    }
    Ok(())
}

/// Encode and send a client frame over the live connection.
async fn send_frame(conn: &mut HubConnection, frame: &ClientFrame) -> Result<(), ()> {
    match serde_json::to_string(frame) {
        Ok(text) => conn
            .ws_stream
            .send(Message::Text(text))
            .await
            .map_err(|_| ()),
        Err(e) => {
            tracing::error!(error = %e, channel = frame.channel(), "Failed to encode client frame");
            Ok(()) // an unencodable frame is dropped, not a transport loss
        }
    }
}

/// Forward inbound frames and outbound commands until the connection
/// drops or the session is cancelled.
async fn process(
    conn: &mut HubConnection,
    ctx: &RunContext,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    cancel: &CancellationToken,
) -> Exit {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                // Best-effort close so the server can clean up promptly.
                let _ = conn.ws_stream.send(Message::Close(None)).await;
                return Exit::Cancelled;
            }

            command = commands.recv() => match command {
                Some(Command::Send(frame)) => {
                    if send_frame(conn, &frame).await.is_err() {
                        return Exit::TransportLost;
                    }
                }
                // The session handle was dropped; stop driving the
                // connection.
                None => return Exit::Cancelled,
            },

            message = conn.ws_stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    match parse_server_frame(&text) {
                        Ok(frame) => {
                            *ctx.last_message.lock().await = Some(frame.clone());
                            // Ignore the SendError -- no subscribers is fine.
                            let _ = ctx.events_tx.send(frame);
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                raw_message = %text,
                                "Failed to parse server frame",
                            );
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Server closed the connection");
                    return Exit::TransportLost;
                }
                Some(Ok(_)) => {
                    // Ping/Pong are handled by the protocol layer.
                }
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "WebSocket receive error");
                    return Exit::TransportLost;
                }
                None => return Exit::TransportLost,
            }
        }
    }
}
