//! Kernel - exchange-agnostic streaming transport
//!
//! The kernel contains only transport logic and generic interfaces; everything
//! venue-specific (signing, symbols, message formats) lives under `exchanges`.
//!
//! # Components
//!
//! - `WsSession` / `TungsteniteWs`: a duplex WebSocket session whose read and
//!   write halves can be driven from two tasks at once
//! - `WsCodec`: venue-specific encoding of subscriptions and decoding of frames
//! - `RetryPolicy` / `RetryBudget`: consecutive-failure ceiling with backoff
//! - `run_inbound` / `run_keepalive`: the two pump loops
//!
//! # Example
//!
//! ```rust,no_run
//! use bbo_stream::core::kernel::*;
//! use bbo_stream::exchanges::ascendex::AscendexCodec;
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WsConfig::default();
//! let session = TungsteniteWs::connect(
//!     "wss://ascendex.com/api/pro/v1/stream",
//!     &[],
//!     &config,
//!     "ascendex",
//! )
//! .await?;
//!
//! session
//!     .send_raw(AscendexCodec::default().encode_subscription(&["bbo:BTC/USDT"])?)
//!     .await?;
//!
//! let (tx, mut rx) = mpsc::channel(config.message_buffer_size);
//! tokio::spawn(async move {
//!     run_inbound(&session, &AscendexCodec::default(), tx, config.retry_policy(), "ascendex").await
//! });
//!
//! while let Some(quote) = rx.recv().await {
//!     println!("{}", quote);
//! }
//! # Ok(())
//! # }
//! ```
pub mod codec;
pub mod pump;
pub mod retry;
pub mod ws;

// Re-export key types for convenience
pub use codec::WsCodec;
pub use pump::{run_inbound, run_keepalive, PumpExit};
pub use retry::{RetryBudget, RetryPolicy};
pub use ws::{TungsteniteWs, WsConfig, WsSession};
