use bbo_stream::core::config::ExchangeConfig;
use bbo_stream::{AscendexBuilder, VenueClient};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn load_config() -> ExchangeConfig {
    #[cfg(feature = "env-file")]
    let config = ExchangeConfig::from_env_auto("ASCENDEX");
    #[cfg(not(feature = "env-file"))]
    let config = ExchangeConfig::from_env("ASCENDEX");

    config.unwrap_or_else(|e| {
        warn!("{}; streaming without credentials", e);
        ExchangeConfig::read_only()
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Usage: bbo-stream [TOKEN_ASSET], e.g. bbo-stream USDT_BTC
    let symbol = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "BTC_USDT".to_string());

    let shutdown = CancellationToken::new();
    let client = Arc::new(
        AscendexBuilder::new()
            .with_config(load_config())
            .with_shutdown(shutdown.clone())
            .build()?,
    );

    client.connection().await?;
    client.subscribe_to_channel(&symbol).await?;

    let (tx, mut rx) = mpsc::channel(client.ws_config().message_buffer_size);
    let reader = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.read_messages_from_channel(tx).await }
    });
    let writer = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.write_messages_to_channel().await }
    });

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            quote = rx.recv() => match quote {
                Some(quote) => println!("{} {} | spread {}", symbol, quote, quote.spread()),
                None => {
                    warn!("Quote stream ended");
                    break;
                }
            },
            _ = &mut ctrl_c => {
                info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    shutdown.cancel();
    client.disconnect().await;

    // Dropping the receiver lets a reader blocked on a full channel exit too.
    drop(rx);
    let (reader, writer) = tokio::join!(reader, writer);
    if let Err(e) = reader.and(writer) {
        warn!("Pump task failed: {}", e);
    }

    Ok(())
}
