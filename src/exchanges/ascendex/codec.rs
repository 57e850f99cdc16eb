use crate::core::errors::ExchangeError;
use crate::core::kernel::codec::WsCodec;
use crate::core::types::Quote;
use crate::exchanges::ascendex::types::{AscendexFrame, AscendexWsRequest};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// AscendEX stream codec: subscribe requests out, BBO quotes in
#[derive(Debug, Clone, Copy, Default)]
pub struct AscendexCodec;

impl AscendexCodec {
    fn decode_text(text: &str) -> Result<Option<Quote>, ExchangeError> {
        let frame: AscendexFrame = serde_json::from_str(text)
            .map_err(|e| ExchangeError::DecodeError(format!("{}: {}", e, text)))?;

        match frame {
            AscendexFrame::Quote(quote) => Ok(Some(quote)),
            AscendexFrame::Bbo(envelope) if envelope.m == "bbo" => {
                Quote::try_from(envelope.data).map(Some)
            }
            AscendexFrame::Bbo(envelope) => {
                debug!("Ignoring {} frame", envelope.m);
                Ok(None)
            }
            AscendexFrame::Event(event) => match event.m.as_str() {
                "bbo" => Err(ExchangeError::DecodeError(format!(
                    "bbo frame without usable data: {}",
                    text
                ))),
                "error" => {
                    warn!(
                        code = event.code,
                        reason = event.reason.as_deref().unwrap_or(""),
                        info = event.info.as_deref().unwrap_or(""),
                        "AscendEX reported an error"
                    );
                    Ok(None)
                }
                other => {
                    debug!("Ignoring {} event", other);
                    Ok(None)
                }
            },
        }
    }
}

impl WsCodec for AscendexCodec {
    type Message = Quote;

    fn encode_subscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Message, ExchangeError> {
        let request = AscendexWsRequest {
            op: "sub".to_string(),
            ch: streams.iter().map(|s| s.as_ref().to_string()).collect(),
        };

        Ok(Message::Text(serde_json::to_string(&request)?))
    }

    fn decode_message(&self, message: Message) -> Result<Option<Quote>, ExchangeError> {
        match message {
            Message::Text(text) => Self::decode_text(&text),
            Message::Binary(data) => {
                let text = String::from_utf8(data).map_err(|e| {
                    ExchangeError::DecodeError(format!("Invalid UTF-8 in binary message: {}", e))
                })?;
                Self::decode_text(&text)
            }
            // Ping/pong/close are transport concerns
            _ => Ok(None),
        }
    }
}
