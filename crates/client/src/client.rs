//! WebSocket client for connecting to the coursehub real-time server.
//!
//! [`HubClient`] holds the connection configuration. Call
//! [`HubClient::connect`] to establish a live [`HubConnection`] over
//! WebSocket; the bearer token travels as a query parameter and is
//! validated by the server before the upgrade completes.

use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Configuration handle for the real-time server endpoint.
///
/// Stores the WebSocket URL of the server's upgrade route, e.g.
/// `ws://host:3000/api/v1/ws`.
#[derive(Debug, Clone)]
pub struct HubClient {
    ws_url: String,
}

/// A live WebSocket connection to the real-time server.
#[derive(Debug)]
pub struct HubConnection {
    /// The raw WebSocket stream for reading/writing frames.
    pub ws_stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl HubClient {
    /// Create a new client targeting the server's WebSocket endpoint.
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }

    /// WebSocket endpoint URL.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Connect and authenticate.
    ///
    /// A rejected handshake (the server refused the upgrade, typically a
    /// bad or expired token) is reported as
    /// [`ClientError::HandshakeRejected`] so callers can distinguish it
    /// from transport-level failures -- the session never starts a retry
    /// loop for a rejection.
    pub async fn connect(&self, token: &str) -> Result<HubConnection, ClientError> {
        let url = format!("{}?token={}", self.ws_url, token);

        match connect_async(&url).await {
            Ok((ws_stream, _response)) => {
                tracing::info!(url = %self.ws_url, "Connected to realtime server");
                Ok(HubConnection { ws_stream })
            }
            Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
                Err(ClientError::HandshakeRejected {
                    status: response.status(),
                })
            }
            Err(e) => Err(ClientError::Connection(format!(
                "Failed to connect to {}: {e}",
                self.ws_url
            ))),
        }
    }
}

/// Errors that can occur when working with the WebSocket client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server refused the upgrade (bad or expired token).
    #[error("Handshake rejected with HTTP status {status}")]
    HandshakeRejected { status: StatusCode },

    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),
}
