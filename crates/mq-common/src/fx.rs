use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FxError {
    #[error("exchange rate source unavailable: {0}")]
    Unavailable(String),
}

/// Exchange-rate lookup consumed by the financial scorer. Implementations
/// backed by a live source may fail; the scorer degrades the dimension to
/// "not computable" instead of aborting the pair.
pub trait ExchangeRates: Send + Sync {
    fn to_usd(&self, amount: f64, currency: &str) -> Result<f64, FxError>;
}

/// Static lookup table of units-per-USD. Unknown codes convert 1:1, matching
/// how upstream systems treat unrecognized currencies.
#[derive(Debug, Clone, Default)]
pub struct StaticRateTable {
    rates: HashMap<String, f64>,
}

impl StaticRateTable {
    pub fn new(rates: HashMap<String, f64>) -> Self {
        let rates = rates
            .into_iter()
            .filter(|(_, per_usd)| *per_usd > 0.0)
            .map(|(code, per_usd)| (code.trim().to_ascii_uppercase(), per_usd))
            .collect();
        Self { rates }
    }

    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates.get(currency.trim().to_ascii_uppercase().as_str()).copied()
    }
}

impl ExchangeRates for StaticRateTable {
    fn to_usd(&self, amount: f64, currency: &str) -> Result<f64, FxError> {
        match self.rate(currency) {
            Some(per_usd) => Ok(amount / per_usd),
            None => Ok(amount),
        }
    }
}

/// Indicative rates for the markets the deal desk actually works in.
/// Production deployments load fresh rates from the rate service instead.
pub fn default_rate_table() -> StaticRateTable {
    let rates = [
        ("EUR", 0.92),
        ("GBP", 0.79),
        ("JPY", 148.0),
        ("CNY", 7.2),
        ("SGD", 1.34),
        ("THB", 35.5),
        ("VND", 24_500.0),
        ("IDR", 15_800.0),
        ("MYR", 4.7),
        ("PHP", 56.0),
        ("INR", 83.0),
        ("AED", 3.67),
        ("SAR", 3.75),
        ("AUD", 1.52),
    ]
    .into_iter()
    .map(|(code, per_usd)| (code.to_string(), per_usd))
    .collect();

    StaticRateTable::new(rates)
}
