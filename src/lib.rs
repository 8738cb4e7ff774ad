//! quotegate library
//!
//! This module exposes the cache, limiter, data, service, and server
//! modules for use in integration tests.

pub mod cache;
pub mod cli;
pub mod data;
pub mod limiter;
pub mod server;
pub mod service;
