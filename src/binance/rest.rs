use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::error::AppError;
use crate::model::tick::normalize_symbol;

use super::types::{BinanceApiErrorResponse, TickerPrice};

pub struct BinanceRestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl BinanceRestClient {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Binance HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self.http.get(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => req.header("X-MBX-APIKEY", key),
            None => req,
        }
    }

    async fn parse_error(resp: reqwest::Response, what: &str) -> anyhow::Error {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if let Ok(err) = serde_json::from_str::<BinanceApiErrorResponse>(&body) {
            return AppError::BinanceApi {
                code: err.code,
                msg: err.msg,
            }
            .into();
        }
        anyhow::anyhow!("{} failed with HTTP {}: {}", what, status, body)
    }

    pub async fn ping(&self) -> Result<()> {
        self.get("/api/v3/ping")
            .send()
            .await
            .context("ping failed")?
            .error_for_status()
            .context("ping returned error status")?;
        Ok(())
    }

    /// Last traded price for one symbol.
    pub async fn ticker_price(&self, symbol: &str) -> Result<f64> {
        let symbol = normalize_symbol(symbol);
        let resp = self
            .get("/api/v3/ticker/price")
            .query(&[("symbol", symbol.as_str())])
            .send()
            .await
            .with_context(|| format!("ticker_price({}) HTTP failed", symbol))?;
        if !resp.status().is_success() {
            return Err(Self::parse_error(resp, "ticker_price").await);
        }

        let ticker: TickerPrice = resp.json().await.context("ticker_price parse failed")?;
        if !ticker.price.is_finite() || ticker.price <= 0.0 {
            return Err(AppError::InvalidTick {
                symbol,
                reason: format!("snapshot price {}", ticker.price),
            }
            .into());
        }
        Ok(ticker.price)
    }

    /// Last traded price of every listed symbol, keyed by symbol.
    pub async fn ticker_prices(&self) -> Result<HashMap<String, f64>> {
        let resp = self
            .get("/api/v3/ticker/price")
            .send()
            .await
            .context("ticker_prices HTTP failed")?;
        if !resp.status().is_success() {
            return Err(Self::parse_error(resp, "ticker_prices").await);
        }

        let tickers: Vec<TickerPrice> = resp.json().await.context("ticker_prices parse failed")?;
        Ok(tickers
            .into_iter()
            .filter(|t| t.price.is_finite() && t.price > 0.0)
            .map(|t| (t.symbol, t.price))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client =
            BinanceRestClient::new("https://api.binance.com/", None, Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.base_url, "https://api.binance.com");
        assert!(client.api_key.is_none());
    }
}
