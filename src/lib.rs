pub mod core;
pub mod exchanges;

pub use crate::core::{errors::ExchangeError, traits::VenueClient, types::*};
pub use exchanges::ascendex::{AscendexBuilder, AscendexClient};
