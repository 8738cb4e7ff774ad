//! Upstream quote API client
//!
//! Fetches a `GLOBAL_QUOTE` payload from an Alpha Vantage-compatible API and
//! classifies the raw reply into a [`FetchOutcome`]. Classification order
//! matters and is strict: an explicit error payload wins over a throttle
//! note, which wins over structural validation, because upstream replies may
//! carry several advisory fields at once.
//!
//! Nothing here retries, and nothing here returns `Err`: every transport
//! problem is itself a classification (`UpstreamError`), so the service
//! layer deals in outcomes only.

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::Quote;

/// Base URL of the upstream quote API
const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Bound on any single upstream request; a slower reply is an upstream error
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Classified result of one upstream fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Well-formed quote: non-empty symbol and a parseable numeric price
    Success(Quote),
    /// Upstream replied with a throttle/advisory note instead of quote data
    RateLimited(String),
    /// Explicit error payload, non-success status, or transport failure
    UpstreamError(String),
    /// 2xx reply whose payload lacked the expected quote structure
    Malformed(String),
}

/// Client for the upstream quote API
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl UpstreamClient {
    /// Creates a client with the production base URL and a bounded timeout
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Overrides the base URL (tests point this at a local stub)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetches and classifies a quote for `symbol`
    ///
    /// Transport failures (connect, timeout) and non-2xx statuses come back
    /// as [`FetchOutcome::UpstreamError`]; reqwest errors are stripped of
    /// their URL first so the credential query parameter cannot surface in
    /// diagnostics.
    pub async fn fetch_quote(&self, symbol: &str) -> FetchOutcome {
        let url = format!(
            "{}?function=GLOBAL_QUOTE&symbol={}&apikey={}",
            self.base_url, symbol, self.api_key
        );

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::UpstreamError(transport_error(e)),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchOutcome::UpstreamError(format!("upstream replied with HTTP {}", status));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return FetchOutcome::UpstreamError(transport_error(e)),
        };

        let outcome = classify(&body);
        debug!(symbol, outcome = outcome_label(&outcome), "classified upstream reply");
        outcome
    }
}

/// Builds the shared HTTP client with the upstream timeout applied
fn http_client() -> Client {
    Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Renders a reqwest error without its URL (the URL carries the credential)
fn transport_error(e: reqwest::Error) -> String {
    let stripped = e.without_url();
    if stripped.is_timeout() {
        "upstream request timed out".to_string()
    } else if stripped.is_connect() {
        format!("upstream connection failed: {}", stripped)
    } else {
        format!("upstream transport error: {}", stripped)
    }
}

/// Short label for log lines
fn outcome_label(outcome: &FetchOutcome) -> &'static str {
    match outcome {
        FetchOutcome::Success(_) => "success",
        FetchOutcome::RateLimited(_) => "rate_limited",
        FetchOutcome::UpstreamError(_) => "upstream_error",
        FetchOutcome::Malformed(_) => "malformed",
    }
}

/// Classifies a 2xx reply body
///
/// Precedence: explicit `Error Message` → throttle note (`Note` or
/// `Information`) → quote structure. Field absence is a normal case, never
/// an exception; only the mandatory pair (symbol, price) can make an
/// otherwise well-shaped payload malformed.
fn classify(body: &str) -> FetchOutcome {
    let envelope: RawEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => return FetchOutcome::Malformed(format!("unparseable reply: {}", e)),
    };

    if let Some(message) = envelope.error_message {
        return FetchOutcome::UpstreamError(message);
    }

    if let Some(note) = envelope.note.or(envelope.information) {
        return FetchOutcome::RateLimited(note);
    }

    match envelope.global_quote {
        Some(raw) => normalize(raw),
        None => FetchOutcome::Malformed("reply carried no quote payload".to_string()),
    }
}

/// Validates mandatory fields and builds the normalized [`Quote`]
fn normalize(raw: RawGlobalQuote) -> FetchOutcome {
    if raw.symbol.is_empty() {
        return FetchOutcome::Malformed("quote payload has an empty symbol".to_string());
    }

    let price = match format_two_decimals(&raw.price) {
        Some(price) => price,
        None => {
            return FetchOutcome::Malformed(format!("quote price {:?} is not numeric", raw.price))
        }
    };

    let now = Utc::now();
    FetchOutcome::Success(Quote {
        symbol: raw.symbol,
        price,
        change: format_optional(raw.change),
        change_percent: raw.change_percent,
        last_trading_day: raw.latest_trading_day,
        timestamp: now,
        last_refreshed: now,
    })
}

/// Formats a numeric string to exactly two decimal places
///
/// Returns `None` for anything that does not parse as a finite number.
fn format_two_decimals(raw: &str) -> Option<String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| format!("{:.2}", value))
}

/// Two-decimal formatting for advisory fields: empty stays empty and an
/// unparseable value passes through verbatim rather than failing the quote
fn format_optional(raw: String) -> String {
    if raw.is_empty() {
        return raw;
    }
    format_two_decimals(&raw).unwrap_or(raw)
}

/// Upstream reply envelope; every field is optional because the upstream
/// mixes quote payloads and advisory fields in one flat object
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "Global Quote")]
    global_quote: Option<RawGlobalQuote>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

/// The raw quote object with the upstream's numbered field names
#[derive(Debug, Default, Deserialize)]
struct RawGlobalQuote {
    #[serde(rename = "01. symbol", default)]
    symbol: String,
    #[serde(rename = "05. price", default)]
    price: String,
    #[serde(rename = "09. change", default)]
    change: String,
    #[serde(rename = "10. change percent", default)]
    change_percent: String,
    #[serde(rename = "07. latest trading day", default)]
    latest_trading_day: String,
}
