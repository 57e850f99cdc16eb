use crate::core::{errors::ExchangeError, types::Quote};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Streaming BBO capability set of a single venue.
///
/// `read_messages_from_channel` and `write_messages_to_channel` are long-running
/// pumps meant to be spawned by the caller as independent tasks; the client
/// never spawns them itself.
#[async_trait]
pub trait VenueClient: Send + Sync {
    /// Open the authenticated stream connection
    async fn connection(&self) -> Result<(), ExchangeError>;

    /// Close the stream connection. Running pumps observe the close as a transport failure.
    async fn disconnect(&self);

    /// Subscribe to BBO updates for a `TOKEN_ASSET` symbol, e.g. `USDT_BTC`
    async fn subscribe_to_channel(&self, symbol: &str) -> Result<(), ExchangeError>;

    /// Forward decoded quotes into `tx` until the retry budget is exhausted.
    ///
    /// The sender is dropped on return, which closes the channel for the consumer.
    async fn read_messages_from_channel(&self, tx: mpsc::Sender<Quote>);

    /// Send keepalive pings until cancelled or the retry budget is exhausted
    async fn write_messages_to_channel(&self);
}
