use super::util::with_retry;
use crate::core::currency::{RateMap, RateProvider};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, error, instrument};

/// Rate-fetch client for the Open Exchange Rates HTTP API.
pub struct OpenExchangeRatesProvider {
    base_url: String,
    app_id: String,
    base_currency: String,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    base: Option<String>,
    rates: RateMap,
}

impl OpenExchangeRatesProvider {
    pub fn new(base_url: &str, app_id: &str, base_currency: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            base_currency: base_currency.to_string(),
        }
    }

    async fn fetch(&self, endpoint: &str) -> Result<RateMap> {
        let url = format!("{}/api/{}", self.base_url, endpoint);
        debug!("Requesting rates from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("fxbudget/1.0")
            .build()?;
        let request_url = format!("{}?app_id={}&base={}", url, self.app_id, self.base_currency);
        let response = with_retry(|| async { client.get(&request_url).send().await }, 3, 500)
            .await
            .with_context(|| format!("Failed to send rate request to {url}"))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .with_context(|| format!("Failed to get response text from {url}"))?;
        if !status.is_success() {
            return Err(anyhow!(
                "Rate request to {} failed with {}: {}",
                url,
                status,
                response_text
            ));
        }

        let parsed: RatesResponse = match serde_json::from_str(&response_text) {
            Ok(data) => data,
            Err(e) => {
                error!(
                    error = ?e,
                    response = %response_text,
                    "Failed to parse rates response"
                );
                return Err(e).context("Failed to parse rates response");
            }
        };

        if let Some(base) = parsed.base.as_deref() {
            if base != self.base_currency {
                return Err(anyhow!(
                    "Rates returned for base {} but {} was requested",
                    base,
                    self.base_currency
                ));
            }
        }
        debug!("Received {} rates from {}", parsed.rates.len(), endpoint);
        Ok(parsed.rates)
    }
}

#[async_trait]
impl RateProvider for OpenExchangeRatesProvider {
    #[instrument(name = "HistoricalRatesFetch", skip(self))]
    async fn fetch_historical_rates(&self, date: NaiveDate) -> Result<RateMap> {
        self.fetch(&format!("historical/{}.json", date.format("%Y-%m-%d")))
            .await
    }

    #[instrument(name = "LatestRatesFetch", skip(self))]
    async fn fetch_latest_rates(&self) -> Result<RateMap> {
        self.fetch("latest.json").await
    }
}
