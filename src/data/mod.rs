//! Core data model for quotegate
//!
//! This module contains the normalized quote payload served to clients and
//! the JSON envelope wrapping every reply from the quote endpoint, plus the
//! upstream client that produces quotes.

pub mod upstream;

pub use upstream::{FetchOutcome, UpstreamClient};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized stock quote
///
/// `price` and `change` are fixed two-decimal-place strings; `change_percent`
/// and `last_trading_day` are passed through exactly as the upstream reports
/// them (`change_percent` arrives already percent-formatted). The two
/// timestamps are stamped once, when the quote is built from an upstream
/// reply, and are cached verbatim with the rest of the payload, so a cached
/// reply is byte-identical to the reply that populated the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Ticker symbol as reported by the upstream
    pub symbol: String,
    /// Last price, formatted to two decimal places
    pub price: String,
    /// Absolute change since previous close, formatted to two decimal places
    pub change: String,
    /// Percent change as reported upstream (e.g. "1.01%")
    pub change_percent: String,
    /// Most recent trading day, `YYYY-MM-DD`
    pub last_trading_day: String,
    /// When this payload was constructed
    pub timestamp: DateTime<Utc>,
    /// When the underlying upstream data was last fetched
    pub last_refreshed: DateTime<Utc>,
}

/// Wire envelope for the quote endpoint
///
/// Every reply is one of these two shapes, discriminated by `status`:
///
/// ```json
/// { "status": "success", "symbol": "...", "price": "123.45", ... }
/// { "status": "error", "message": "..." }
/// ```
///
/// The error `message` is a fixed, non-leaking string; `detail` optionally
/// carries sanitized upstream diagnostics and is omitted when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QuoteResponse {
    /// A quote, served fresh from upstream, from cache, or stale
    Success(Quote),
    /// A degraded reply with a stable user-facing message
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}
