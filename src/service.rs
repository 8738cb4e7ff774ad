//! Quote resolution service
//!
//! Ties the store, the rate limiter, and the upstream client into one
//! request flow:
//!
//! 1. reject immediately when no credential is configured
//! 2. inside an active rate limit window, serve stale or fail without
//!    touching the upstream
//! 3. serve a fresh cache hit without touching the upstream
//! 4. otherwise fetch, and on success cache the quote; on a throttle
//!    signal open the back-off window; on any failure fall back to the
//!    last cached quote, however old
//!
//! Every degraded reply carries the same fixed user-facing message; the
//! underlying cause only surfaces as an optional detail string with the
//! credential redacted.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::QuoteStore;
use crate::cli::ServiceConfig;
use crate::data::{FetchOutcome, Quote, UpstreamClient};
use crate::limiter::RateLimiter;

/// Why a request could not be served from cache or upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The rate limit window was active, or upstream signaled throttling
    RateLimited,
    /// Upstream returned an error payload, a non-2xx status, or the
    /// transport failed
    Upstream,
    /// Upstream replied 2xx but the payload was not a usable quote
    Malformed,
}

/// Error types for quote resolution
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No usable quote: upstream failed and nothing is cached
    #[error("Quote temporarily unavailable. Please try again shortly.")]
    Unavailable {
        reason: UnavailableReason,
        detail: Option<String>,
    },
    /// The service was started without an upstream credential
    #[error("Service is not configured with an upstream API credential.")]
    MissingCredential,
}

/// Read-through quote service for a single configured symbol
pub struct QuoteService {
    config: ServiceConfig,
    store: QuoteStore,
    limiter: RateLimiter,
    upstream: UpstreamClient,
}

impl QuoteService {
    pub fn new(
        config: ServiceConfig,
        store: QuoteStore,
        limiter: RateLimiter,
        upstream: UpstreamClient,
    ) -> Self {
        Self {
            config,
            store,
            limiter,
            upstream,
        }
    }

    /// Symbol this instance serves
    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    /// Deadline of the active rate limit window, if one is open
    pub fn blocked_until(&self) -> Option<DateTime<Utc>> {
        self.limiter.blocked_until()
    }

    /// Clears the rate limit window, returning the deadline it had
    pub fn reset_rate_limit(&self) -> Option<DateTime<Utc>> {
        let cleared = self.limiter.reset();
        match cleared {
            Some(deadline) => info!(%deadline, "rate limit window cleared by admin reset"),
            None => debug!("admin reset with no active rate limit window"),
        }
        cleared
    }

    /// Resolves the configured symbol to a quote
    pub async fn quote(&self) -> Result<Quote, ServiceError> {
        if self.config.credential.is_empty() {
            return Err(ServiceError::MissingCredential);
        }

        let key = self.cache_key();

        if self.limiter.is_limited() {
            debug!(
                deadline = ?self.limiter.blocked_until(),
                "rate limit window active, skipping upstream"
            );
            return match self.store.get_stale(&key) {
                Some(stale) => {
                    info!(symbol = %stale.symbol, "serving stale quote inside rate limit window");
                    Ok(stale)
                }
                None => Err(ServiceError::Unavailable {
                    reason: UnavailableReason::RateLimited,
                    detail: None,
                }),
            };
        }

        if let Some(fresh) = self.store.get(&key) {
            debug!(symbol = %fresh.symbol, "serving fresh cached quote");
            return Ok(fresh);
        }

        let outcome = self.upstream.fetch_quote(&self.config.symbol).await;
        self.apply_outcome(&key, outcome)
    }

    /// Folds a classified upstream reply into the cache and limiter state
    fn apply_outcome(&self, key: &str, outcome: FetchOutcome) -> Result<Quote, ServiceError> {
        match outcome {
            FetchOutcome::Success(quote) => {
                self.store.set(key, quote.clone(), self.config.cache_ttl);
                info!(symbol = %quote.symbol, price = %quote.price, "refreshed quote from upstream");
                Ok(quote)
            }
            FetchOutcome::RateLimited(reason) => {
                let deadline = self.limiter.mark_limited(self.config.limit_cooldown);
                warn!(%deadline, "upstream signaled throttling, backing off");
                self.stale_or_error(key, UnavailableReason::RateLimited, reason)
            }
            FetchOutcome::UpstreamError(reason) => {
                warn!(reason = %self.redact(&reason), "upstream fetch failed");
                self.stale_or_error(key, UnavailableReason::Upstream, reason)
            }
            FetchOutcome::Malformed(reason) => {
                warn!(reason = %self.redact(&reason), "upstream reply was malformed");
                self.stale_or_error(key, UnavailableReason::Malformed, reason)
            }
        }
    }

    /// Last-resort read: any cached quote beats an error reply
    fn stale_or_error(
        &self,
        key: &str,
        reason: UnavailableReason,
        detail: String,
    ) -> Result<Quote, ServiceError> {
        if let Some(stale) = self.store.get_stale(key) {
            info!(symbol = %stale.symbol, "falling back to stale cached quote");
            return Ok(stale);
        }
        Err(ServiceError::Unavailable {
            reason,
            detail: self.sanitize(detail),
        })
    }

    /// Cache key for the configured symbol; doubles as the on-disk file stem
    fn cache_key(&self) -> String {
        format!("quote_{}", self.config.symbol)
    }

    fn sanitize(&self, detail: String) -> Option<String> {
        if detail.is_empty() {
            return None;
        }
        Some(self.redact(&detail))
    }

    /// Strips the credential from diagnostic text
    fn redact(&self, text: &str) -> String {
        if self.config.credential.is_empty() {
            return text.to_string();
        }
        text.replace(&self.config.credential, "[redacted]")
    }
}
