use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{run_inbound, run_keepalive, TungsteniteWs, WsCodec, WsConfig, WsSession};
use crate::core::traits::VenueClient;
use crate::core::types::{ClientState, Quote};
use crate::exchanges::ascendex::codec::AscendexCodec;
use crate::exchanges::ascendex::signer;
use crate::exchanges::ascendex::symbols::SymbolMapper;
use crate::exchanges::ascendex::types::bbo_channel;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

pub const EXCHANGE_NAME: &str = "ascendex";
pub const DEFAULT_STREAM_URL: &str = "wss://ascendex.com/api/pro/v1/stream";

#[derive(Debug)]
struct ClientInner {
    session: Option<Arc<TungsteniteWs>>,
    state: ClientState,
}

/// AscendEX BBO stream client.
///
/// `Idle -> Connected -> Subscribed -> Pumping -> Closed`. The pumps are spawned
/// by the caller; share the client through an `Arc`.
pub struct AscendexClient {
    config: ExchangeConfig,
    ws_config: WsConfig,
    codec: AscendexCodec,
    symbols: SymbolMapper,
    shutdown: CancellationToken,
    inner: RwLock<ClientInner>,
}

impl AscendexClient {
    /// Create a client with default stream settings.
    ///
    /// `shutdown` is owned by the caller; cancelling it stops the keepalive pump.
    pub fn new(config: ExchangeConfig, shutdown: CancellationToken) -> Self {
        Self::from_parts(config, WsConfig::default(), SymbolMapper::new(), shutdown)
    }

    pub(crate) fn from_parts(
        config: ExchangeConfig,
        ws_config: WsConfig,
        symbols: SymbolMapper,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            ws_config,
            codec: AscendexCodec,
            symbols,
            shutdown,
            inner: RwLock::new(ClientInner {
                session: None,
                state: ClientState::Idle,
            }),
        }
    }

    pub fn stream_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(DEFAULT_STREAM_URL)
    }

    pub fn ws_config(&self) -> &WsConfig {
        &self.ws_config
    }

    pub fn symbols(&self) -> &SymbolMapper {
        &self.symbols
    }

    pub async fn state(&self) -> ClientState {
        self.inner.read().await.state
    }

    async fn current_session(&self) -> Option<Arc<TungsteniteWs>> {
        self.inner.read().await.session.clone()
    }

    /// Move to `to` only if the client is currently in `from`
    async fn advance(&self, from: ClientState, to: ClientState) {
        let mut inner = self.inner.write().await;
        if inner.state == from {
            inner.state = to;
        }
    }

    async fn mark_pumping(&self) {
        let mut inner = self.inner.write().await;
        if matches!(inner.state, ClientState::Connected | ClientState::Subscribed) {
            inner.state = ClientState::Pumping;
        }
    }
}

#[async_trait]
impl VenueClient for AscendexClient {
    #[instrument(skip(self), fields(exchange = EXCHANGE_NAME))]
    async fn connection(&self) -> Result<(), ExchangeError> {
        if !self.config.has_credentials() {
            debug!("Connecting without credentials");
        }

        let headers = signer::auth_headers(self.config.api_key(), self.config.secret_key());
        let session =
            TungsteniteWs::connect(self.stream_url(), &headers, &self.ws_config, EXCHANGE_NAME)
                .await?;

        let previous = {
            let mut inner = self.inner.write().await;
            inner.state = ClientState::Connected;
            inner.session.replace(Arc::new(session))
        };

        if let Some(previous) = previous {
            warn!("Replacing an open session; closing the previous connection");
            if let Err(e) = previous.close().await {
                warn!("Failed to close previous session: {}", e);
            }
        }

        info!(url = %self.stream_url(), "AscendEX stream connected");
        Ok(())
    }

    async fn disconnect(&self) {
        let session = {
            let mut inner = self.inner.write().await;
            let session = inner.session.take();
            if session.is_some() {
                inner.state = ClientState::Closed;
            }
            session
        };

        match session {
            Some(session) => {
                info!(exchange = EXCHANGE_NAME, "AscendEX API disconnecting...");
                if let Err(e) = session.close().await {
                    warn!(exchange = EXCHANGE_NAME, "Failed to close session: {}", e);
                }
            }
            None => debug!(exchange = EXCHANGE_NAME, "Disconnect called without an open session"),
        }
    }

    #[instrument(skip(self), fields(exchange = EXCHANGE_NAME))]
    async fn subscribe_to_channel(&self, symbol: &str) -> Result<(), ExchangeError> {
        let venue_symbol = self.symbols.to_venue(symbol)?;
        let session = self
            .current_session()
            .await
            .ok_or(ExchangeError::NotConnected)?;

        let message = self
            .codec
            .encode_subscription(&[bbo_channel(&venue_symbol)])?;

        if let Err(e) = session.send_raw(message).await {
            error!("Failed to write subscription for {}: {}", venue_symbol, e);
            return Err(e);
        }

        self.advance(ClientState::Connected, ClientState::Subscribed)
            .await;
        info!(venue_symbol = %venue_symbol, "Subscribed to BBO channel");
        Ok(())
    }

    async fn read_messages_from_channel(&self, tx: mpsc::Sender<Quote>) {
        let Some(session) = self.current_session().await else {
            warn!(exchange = EXCHANGE_NAME, "Inbound pump started without a session");
            return;
        };

        self.mark_pumping().await;
        let exit = run_inbound(
            session.as_ref(),
            &self.codec,
            tx,
            self.ws_config.retry_policy(),
            EXCHANGE_NAME,
        )
        .await;
        info!(exchange = EXCHANGE_NAME, ?exit, "Inbound pump stopped");
    }

    async fn write_messages_to_channel(&self) {
        let Some(session) = self.current_session().await else {
            warn!(exchange = EXCHANGE_NAME, "Keepalive pump started without a session");
            return;
        };

        self.mark_pumping().await;
        let exit = run_keepalive(
            session.as_ref(),
            self.ws_config.heartbeat_interval(),
            self.ws_config.retry_policy(),
            &self.shutdown,
            EXCHANGE_NAME,
        )
        .await;
        info!(exchange = EXCHANGE_NAME, ?exit, "Keepalive pump stopped");
    }
}
