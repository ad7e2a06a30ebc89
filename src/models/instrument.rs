use serde::{Deserialize, Serialize};

/// `ticker` must match `^[A-Z]{2,10}$`. Checked by hand rather than pulling in
/// a regex crate for a single fixed-length character-class pattern.
pub fn is_valid_ticker(ticker: &str) -> bool {
    let len = ticker.len();
    (2..=10).contains(&len) && ticker.bytes().all(|b| b.is_ascii_uppercase())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub ticker: String,
    pub name: String,
}

pub const QUOTE_CURRENCY: &str = "RUB";
