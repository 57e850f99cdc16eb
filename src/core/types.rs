use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of the top of book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Side {
    pub amount: f64,
    pub price: f64,
}

/// Best bid/offer snapshot delivered to the consumer.
///
/// The venue guarantees `ask.price` is above `bid.price`; the client does not check it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ask: Side,
    pub bid: Side,
}

impl Quote {
    pub fn spread(&self) -> f64 {
        self.ask.price - self.bid.price
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bid {} @ {} | ask {} @ {}",
            self.bid.amount, self.bid.price, self.ask.amount, self.ask.price
        )
    }
}

/// Lifecycle of a venue client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientState {
    Idle,
    Connected,
    Subscribed,
    Pumping,
    Closed,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connected => "connected",
            Self::Subscribed => "subscribed",
            Self::Pumping => "pumping",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_deserialize() {
        let quote: Quote = serde_json::from_str(
            r#"{"ask":{"amount":1.5,"price":42000.0},"bid":{"amount":2.0,"price":41950.0}}"#,
        )
        .unwrap();

        assert_eq!(quote.ask.price, 42000.0);
        assert_eq!(quote.bid.amount, 2.0);
        assert_eq!(quote.spread(), 50.0);
    }

    #[test]
    fn test_quote_missing_side_rejected() {
        let result: Result<Quote, _> =
            serde_json::from_str(r#"{"ask":{"amount":1.5,"price":42000.0}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_client_state_display() {
        assert_eq!(ClientState::Pumping.to_string(), "pumping");
        assert_eq!(ClientState::Idle.to_string(), "idle");
    }
}
