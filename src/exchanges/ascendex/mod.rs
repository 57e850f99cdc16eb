pub mod codec;
pub mod signer;
pub mod symbols;
pub mod types;

pub mod builder;
pub mod client;

// Re-export main components
pub use builder::AscendexBuilder;
pub use client::{AscendexClient, DEFAULT_STREAM_URL, EXCHANGE_NAME};
pub use codec::AscendexCodec;
pub use signer::{generate_signature, sign_with_timestamp};
pub use symbols::SymbolMapper;
pub use types::{AscendexBboData, AscendexBboEnvelope, AscendexEvent, AscendexFrame, AscendexWsRequest};
