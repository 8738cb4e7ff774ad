//! Cache module: the quote store and its persistent tier
//!
//! This module provides the key/value store the service reads through: an
//! in-process mirror answering fresh and stale reads, layered over an
//! optional on-disk JSON tier with per-entry expiry. Expired entries remain
//! readable as stale data so the service can degrade gracefully when the
//! upstream is unavailable or throttled.

mod disk;
mod store;

pub use disk::{DiskCache, DiskRead};
pub use store::QuoteStore;
