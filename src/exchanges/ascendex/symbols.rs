use crate::core::errors::ExchangeError;
use std::collections::HashMap;

/// Assets AscendEX lists as quote currencies, highest priority first.
/// When both halves of a pair are quote assets, the higher-priority one is the quote.
const QUOTE_PRIORITY: [&str; 5] = ["USDT", "USDC", "USD", "BTC", "ETH"];

const PUBLIC_SEPARATOR: char = '_';
const VENUE_SEPARATOR: char = '/';

/// Converts public `TOKEN_ASSET` symbols to AscendEX `BASE/QUOTE` notation and back.
///
/// Explicit overrides take precedence over the default rule in both directions.
#[derive(Debug, Clone, Default)]
pub struct SymbolMapper {
    to_venue: HashMap<String, String>,
    to_public: HashMap<String, String>,
}

impl SymbolMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a public symbol to a venue symbol, e.g. `("XBT_USDT", "BTC/USDT")`
    #[must_use]
    pub fn with_override(mut self, public: &str, venue: &str) -> Self {
        let public = public.trim().to_uppercase();
        let venue = venue.trim().to_uppercase();
        self.to_public.insert(venue.clone(), public.clone());
        self.to_venue.insert(public, venue);
        self
    }

    pub fn to_venue(&self, symbol: &str) -> Result<String, ExchangeError> {
        let symbol = symbol.trim().to_uppercase();
        if let Some(venue) = self.to_venue.get(&symbol) {
            return Ok(venue.clone());
        }

        let (first, second) = split_pair(&symbol, PUBLIC_SEPARATOR)?;
        let first_is_quote = match (quote_rank(first), quote_rank(second)) {
            (Some(first_rank), Some(second_rank)) => first_rank < second_rank,
            (Some(_), None) => true,
            _ => false,
        };

        let (base, quote) = if first_is_quote {
            (second, first)
        } else {
            (first, second)
        };
        Ok(format!("{}{}{}", base, VENUE_SEPARATOR, quote))
    }

    pub fn to_public(&self, venue_symbol: &str) -> Result<String, ExchangeError> {
        let venue_symbol = venue_symbol.trim().to_uppercase();
        if let Some(public) = self.to_public.get(&venue_symbol) {
            return Ok(public.clone());
        }

        let (base, quote) = split_pair(&venue_symbol, VENUE_SEPARATOR)?;
        Ok(format!("{}{}{}", base, PUBLIC_SEPARATOR, quote))
    }
}

fn quote_rank(asset: &str) -> Option<usize> {
    QUOTE_PRIORITY.iter().position(|quote| *quote == asset)
}

fn split_pair(symbol: &str, separator: char) -> Result<(&str, &str), ExchangeError> {
    let (first, second) = symbol.split_once(separator).ok_or_else(|| {
        ExchangeError::InvalidParameters(format!(
            "symbol {:?} must look like TOKEN{}ASSET",
            symbol, separator
        ))
    })?;

    let valid = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid(first) || !valid(second) {
        return Err(ExchangeError::InvalidParameters(format!(
            "symbol {:?} has an empty or non-alphanumeric asset",
            symbol
        )));
    }

    Ok((first, second))
}
