// src/config.rs
//! Engine configuration — validated and ready to drive every component.

use crate::constants::{
    CATALOG_PAGE_SIZE, CATALOG_WIDE_PAGE_SIZE, MAX_BOUNDARY_FILE_BYTES, READ_RETRY_ATTEMPTS,
    READ_RETRY_INITIAL_DELAY_MS, READ_RETRY_MAX_DELAY_MS,
};
use std::time::Duration;

/// Resolved engine configuration.
///
/// Construction is plain struct syntax over `Default`; the host application
/// owns whatever CLI/env surface produces these values.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the farm backend, without a trailing slash.
    pub base_url: String,
    /// Bearer token attached to every request, when the backend needs one.
    pub api_token: Option<String>,
    /// Page size for the primary catalog strategy.
    pub page_size: u32,
    /// Page size for the wide fallback probe.
    pub wide_page_size: u32,
    /// Upload size cap in bytes.
    pub max_upload_bytes: usize,
    /// Attempts for idempotent reads.
    pub read_retry_attempts: u32,
    /// Initial backoff delay for read retries.
    pub read_retry_initial_delay: Duration,
    /// Backoff delay cap for read retries.
    pub read_retry_max_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            api_token: None,
            page_size: CATALOG_PAGE_SIZE,
            wide_page_size: CATALOG_WIDE_PAGE_SIZE,
            max_upload_bytes: MAX_BOUNDARY_FILE_BYTES,
            read_retry_attempts: READ_RETRY_ATTEMPTS,
            read_retry_initial_delay: Duration::from_millis(READ_RETRY_INITIAL_DELAY_MS),
            read_retry_max_delay: Duration::from_millis(READ_RETRY_MAX_DELAY_MS),
        }
    }
}
