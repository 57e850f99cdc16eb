use crate::core::errors::ExchangeError;
use crate::core::types::{Quote, Side};
use serde::{Deserialize, Serialize};

/// Channel prefix for best bid/offer updates
pub const BBO_CHANNEL_PREFIX: &str = "bbo:";

pub fn bbo_channel(venue_symbol: &str) -> String {
    format!("{}{}", BBO_CHANNEL_PREFIX, venue_symbol)
}

/// `{"op":"sub","ch":["bbo:BTC/USDT"]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AscendexWsRequest {
    pub op: String,
    pub ch: Vec<String>,
}

/// Any inbound text frame the stream may carry
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AscendexFrame {
    /// Flat `{"ask":{..},"bid":{..}}` quote
    Quote(Quote),
    /// Native `{"m":"bbo","symbol":..,"data":{..}}` envelope
    Bbo(AscendexBboEnvelope),
    /// Anything else carrying an `m` discriminator (connected, ping, sub ack, error)
    Event(AscendexEvent),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AscendexBboEnvelope {
    pub m: String,
    pub symbol: Option<String>,
    pub data: AscendexBboData,
}

/// Price and size arrive as string pairs: `"bid": ["41950.0", "2.0"]`
#[derive(Debug, Clone, Deserialize)]
pub struct AscendexBboData {
    pub ts: Option<i64>,
    pub bid: (String, String),
    pub ask: (String, String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AscendexEvent {
    pub m: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
}

impl TryFrom<AscendexBboData> for Quote {
    type Error = ExchangeError;

    fn try_from(data: AscendexBboData) -> Result<Self, Self::Error> {
        Ok(Self {
            ask: parse_level(&data.ask)?,
            bid: parse_level(&data.bid)?,
        })
    }
}

fn parse_level((price, amount): &(String, String)) -> Result<Side, ExchangeError> {
    let parse = |field: &str, value: &str| {
        value.parse::<f64>().map_err(|e| {
            ExchangeError::DecodeError(format!("invalid {} {:?}: {}", field, value, e))
        })
    };

    Ok(Side {
        amount: parse("amount", amount)?,
        price: parse("price", price)?,
    })
}
