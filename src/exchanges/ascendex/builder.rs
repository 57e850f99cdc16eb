use crate::core::config::{ConfigError, ExchangeConfig};
use crate::core::errors::ExchangeError;
use crate::core::kernel::WsConfig;
use crate::exchanges::ascendex::client::AscendexClient;
use crate::exchanges::ascendex::symbols::SymbolMapper;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Builder for creating AscendEX stream clients
///
/// Provides a fluent interface over credentials, endpoint, pump tuning and
/// symbol overrides.
#[derive(Default)]
pub struct AscendexBuilder {
    config: ExchangeConfig,
    ws_config: WsConfig,
    symbols: SymbolMapper,
    shutdown: Option<CancellationToken>,
}

impl AscendexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the exchange configuration
    pub fn with_config(mut self, config: ExchangeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set API credentials, keeping any endpoint override
    pub fn with_credentials(mut self, api_key: String, secret_key: String) -> Self {
        let base_url = self.config.base_url.take();
        self.config = ExchangeConfig::new(api_key, secret_key);
        self.config.base_url = base_url;
        self
    }

    /// Set the streaming endpoint (`ws://` or `wss://`)
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.config.base_url = Some(base_url);
        self
    }

    /// Replace all stream settings at once
    pub fn with_ws_config(mut self, ws_config: WsConfig) -> Self {
        self.ws_config = ws_config;
        self
    }

    /// Set keepalive ping interval
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.ws_config.heartbeat_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set how many consecutive failures each pump tolerates
    pub fn with_max_consecutive_failures(mut self, failures: u32) -> Self {
        self.ws_config.max_consecutive_failures = failures;
        self
    }

    /// Set the backoff applied between failed inbound reads
    pub fn with_retry_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.ws_config.retry_backoff_ms = initial.as_millis() as u64;
        self.ws_config.max_retry_backoff_ms = max.as_millis() as u64;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.ws_config.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Pin a public `TOKEN_ASSET` symbol to a venue symbol
    pub fn with_symbol_override(mut self, public: &str, venue: &str) -> Self {
        self.symbols = self.symbols.with_override(public, venue);
        self
    }

    /// Use a caller-owned cancellation token for the keepalive pump
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn build(self) -> Result<AscendexClient, ExchangeError> {
        if let Some(url) = self.config.base_url.as_deref() {
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "stream URL must use ws:// or wss://, got {}",
                    url
                ))
                .into());
            }
        }

        if self.ws_config.heartbeat_interval_ms == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "heartbeat interval must be greater than zero".to_string(),
            )
            .into());
        }

        if self.ws_config.retry_backoff_ms > self.ws_config.max_retry_backoff_ms {
            return Err(ConfigError::InvalidConfiguration(
                "initial retry backoff exceeds the maximum".to_string(),
            )
            .into());
        }

        Ok(AscendexClient::from_parts(
            self.config,
            self.ws_config,
            self.symbols,
            self.shutdown.unwrap_or_else(CancellationToken::new),
        ))
    }
}
