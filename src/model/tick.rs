use crate::error::AppError;

/// One observed trade price for a symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    pub symbol: String,
    pub price: f64,
    /// Local receive time, seconds since the UTC epoch.
    pub timestamp: f64,
}

impl PriceTick {
    /// Build a tick, rejecting non-finite or non-positive prices.
    pub fn new(symbol: &str, price: f64, timestamp: f64) -> Result<Self, AppError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(AppError::InvalidTick {
                symbol,
                reason: "empty symbol".to_string(),
            });
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(AppError::InvalidTick {
                symbol,
                reason: format!("price must be positive, got {}", price),
            });
        }
        if !timestamp.is_finite() {
            return Err(AppError::InvalidTick {
                symbol,
                reason: "timestamp is not finite".to_string(),
            });
        }
        Ok(Self {
            symbol,
            price,
            timestamp,
        })
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Current wall-clock time in fractional seconds.
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
