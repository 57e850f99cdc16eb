use crate::core::errors::ExchangeError;
use crate::core::kernel::retry::RetryPolicy;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::{self, protocol::Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Stream connection and pump tuning
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Keepalive ping interval in milliseconds
    pub heartbeat_interval_ms: u64,
    /// Consecutive failures a pump tolerates; one more terminates it
    pub max_consecutive_failures: u32,
    /// First backoff delay after a failed pump iteration, in milliseconds
    pub retry_backoff_ms: u64,
    /// Upper bound for the backoff delay, in milliseconds
    pub max_retry_backoff_ms: u64,
    /// Suggested capacity for the consumer's quote channel
    pub message_buffer_size: usize,
    /// How long `close` waits for the close handshake, in milliseconds
    pub close_timeout_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,   // 10 seconds
            heartbeat_interval_ms: 5_000, // 5 seconds
            max_consecutive_failures: 5,
            retry_backoff_ms: 50,
            max_retry_backoff_ms: 1_000,
            message_buffer_size: 1024,
            close_timeout_ms: 1_000,
        }
    }
}

impl WsConfig {
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_consecutive_failures,
            Duration::from_millis(self.retry_backoff_ms),
            Duration::from_millis(self.max_retry_backoff_ms),
        )
    }
}

/// WebSocket session trait - pure transport layer.
///
/// Methods take `&self` so one reader task and one writer task can share a
/// session. Implementations must keep the two directions independent: a
/// pending `next_raw` must never block `send_raw` or `close`.
///
/// An error that breaks the connection latches the session closed for both
/// directions, so the other pump fails fast with `NotConnected`. Recoverable
/// errors (an oversized or non-UTF-8 frame, a full write buffer) do not.
#[async_trait]
pub trait WsSession: Send + Sync {
    /// Send a raw message
    async fn send_raw(&self, msg: Message) -> Result<(), ExchangeError>;

    /// Receive the next raw message
    async fn next_raw(&self) -> Result<Message, ExchangeError>;

    /// Close the connection
    async fn close(&self) -> Result<(), ExchangeError>;

    /// Check if the connection is alive
    fn is_connected(&self) -> bool;

    /// Send a protocol-level ping frame
    async fn send_ping(&self, payload: Vec<u8>) -> Result<(), ExchangeError> {
        self.send_raw(Message::Ping(payload)).await
    }
}

/// Tungstenite-based WebSocket session with independently locked read and write halves
pub struct TungsteniteWs {
    url: String,
    exchange_name: String,
    write: Mutex<SplitSink<WsStream, Message>>,
    read: Mutex<SplitStream<WsStream>>,
    closed: CancellationToken,
    close_sent: AtomicBool,
    close_timeout: Duration,
}

impl fmt::Debug for TungsteniteWs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TungsteniteWs")
            .field("url", &self.url)
            .field("exchange_name", &self.exchange_name)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl TungsteniteWs {
    /// Perform the WebSocket upgrade with the given extra request headers
    ///
    /// # Arguments
    /// * `url` - The WebSocket URL to connect to
    /// * `headers` - Additional upgrade request headers (authentication)
    /// * `config` - Timeouts used for connect and close
    /// * `exchange_name` - Name of the exchange for logging/tracing
    #[instrument(skip(headers, config), fields(exchange = %exchange_name))]
    pub async fn connect(
        url: &str,
        headers: &[(&'static str, String)],
        config: &WsConfig,
        exchange_name: &str,
    ) -> Result<Self, ExchangeError> {
        let mut request = url.into_client_request().map_err(|e| {
            ExchangeError::ConnectionError(format!("Invalid stream URL {}: {}", url, e))
        })?;

        for (name, value) in headers {
            let value = HeaderValue::from_str(value).map_err(|e| {
                ExchangeError::AuthError(format!("Invalid value for header {}: {}", name, e))
            })?;
            request.headers_mut().insert(*name, value);
        }

        let (ws_stream, response) = tokio::time::timeout(config.connect_timeout(), connect_async(request))
            .await
            .map_err(|_| {
                ExchangeError::ConnectionTimeout(format!(
                    "no upgrade response from {} within {:?}",
                    url,
                    config.connect_timeout()
                ))
            })?
            .map_err(map_upgrade_error)?;

        debug!(status = %response.status(), "WebSocket upgrade complete");

        let (write, read) = ws_stream.split();
        Ok(Self {
            url: url.to_string(),
            exchange_name: exchange_name.to_string(),
            write: Mutex::new(write),
            read: Mutex::new(read),
            closed: CancellationToken::new(),
            close_sent: AtomicBool::new(false),
            close_timeout: Duration::from_millis(config.close_timeout_ms),
        })
    }

    /// Latch the session closed if `err` leaves the connection unusable
    fn latch_if_fatal(&self, err: &tungstenite::Error) {
        if is_fatal(err) {
            self.closed.cancel();
        }
    }
}

/// Whether the connection can still carry frames after `err`
fn is_fatal(err: &tungstenite::Error) -> bool {
    !matches!(
        err,
        tungstenite::Error::Capacity(_)
            | tungstenite::Error::WriteBufferFull(_)
            | tungstenite::Error::Utf8
    )
}

fn map_upgrade_error(err: tungstenite::Error) -> ExchangeError {
    match err {
        tungstenite::Error::Http(response)
            if response.status() == StatusCode::UNAUTHORIZED
                || response.status() == StatusCode::FORBIDDEN =>
        {
            ExchangeError::AuthError(format!("upgrade rejected with {}", response.status()))
        }
        tungstenite::Error::Http(response) => {
            ExchangeError::ConnectionError(format!("upgrade rejected with {}", response.status()))
        }
        other => ExchangeError::ConnectionError(other.to_string()),
    }
}

#[async_trait]
impl WsSession for TungsteniteWs {
    #[instrument(skip(self, msg), fields(exchange = %self.exchange_name))]
    async fn send_raw(&self, msg: Message) -> Result<(), ExchangeError> {
        if self.closed.is_cancelled() {
            return Err(ExchangeError::NotConnected);
        }

        let result = tokio::select! {
            () = self.closed.cancelled() => return Err(ExchangeError::NotConnected),
            result = async { self.write.lock().await.send(msg).await } => result,
        };

        result.map_err(|e| {
            self.latch_if_fatal(&e);
            ExchangeError::WriteError(e.to_string())
        })
    }

    async fn next_raw(&self) -> Result<Message, ExchangeError> {
        if self.closed.is_cancelled() {
            return Err(ExchangeError::NotConnected);
        }

        let frame = tokio::select! {
            () = self.closed.cancelled() => return Err(ExchangeError::NotConnected),
            frame = async { self.read.lock().await.next().await } => frame,
        };

        match frame {
            Some(Ok(Message::Close(frame))) => {
                self.closed.cancel();
                Err(ExchangeError::ReadError(format!(
                    "connection closed by peer: {:?}",
                    frame
                )))
            }
            Some(Ok(message)) => Ok(message),
            Some(Err(e)) => {
                self.latch_if_fatal(&e);
                Err(ExchangeError::ReadError(e.to_string()))
            }
            None => {
                self.closed.cancel();
                Err(ExchangeError::ReadError("stream ended".to_string()))
            }
        }
    }

    #[instrument(skip(self), fields(exchange = %self.exchange_name))]
    async fn close(&self) -> Result<(), ExchangeError> {
        // Wake any in-flight read or write before touching the write half.
        self.closed.cancel();

        if self.close_sent.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let handshake = tokio::time::timeout(self.close_timeout, async {
            self.write.lock().await.close().await
        })
        .await;

        match handshake {
            Ok(Ok(())) => debug!("close frame sent"),
            Ok(Err(e)) => debug!("close handshake failed: {}", e),
            Err(_) => warn!("close handshake timed out after {:?}", self.close_timeout),
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.closed.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WsConfig::default();
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(5));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_policy().max_consecutive_failures(), 5);
    }

    #[test]
    fn test_upgrade_error_mapping() {
        let response = tungstenite::http::Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .body(None)
            .unwrap();
        let err = map_upgrade_error(tungstenite::Error::Http(response));
        assert!(matches!(err, ExchangeError::AuthError(_)));

        let err = map_upgrade_error(tungstenite::Error::ConnectionClosed);
        assert!(matches!(err, ExchangeError::ConnectionError(_)));
    }

    #[test]
    fn test_only_connection_errors_are_fatal() {
        assert!(is_fatal(&tungstenite::Error::ConnectionClosed));
        assert!(is_fatal(&tungstenite::Error::AlreadyClosed));
        assert!(is_fatal(&tungstenite::Error::Io(std::io::Error::from(
            std::io::ErrorKind::BrokenPipe
        ))));

        assert!(!is_fatal(&tungstenite::Error::Utf8));
        assert!(!is_fatal(&tungstenite::Error::Capacity(
            tungstenite::error::CapacityError::MessageTooLong { size: 2, max_size: 1 }
        )));
        assert!(!is_fatal(&tungstenite::Error::WriteBufferFull(Message::Ping(
            Vec::new()
        ))));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let config = WsConfig {
            connect_timeout_ms: 2_000,
            ..WsConfig::default()
        };
        // Port 9 (discard) is not listening on loopback in test environments.
        let result = TungsteniteWs::connect("ws://127.0.0.1:9/stream", &[], &config, "test").await;
        assert!(matches!(
            result,
            Err(ExchangeError::ConnectionError(_) | ExchangeError::ConnectionTimeout(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_invalid_url() {
        let result =
            TungsteniteWs::connect("not a url", &[], &WsConfig::default(), "test").await;
        assert!(matches!(result, Err(ExchangeError::ConnectionError(_))));
    }
}
