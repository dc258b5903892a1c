// src/api/catalog.rs
//! The catalog retrieval ladder.
//!
//! The backend's pagination has been observed mis-counting, switching
//! between 0- and 1-based page numbering, and hiding item lists under
//! shifting envelope keys. `CatalogFetcher` applies a strict sequence of
//! fallback strategies, stopping at the first that yields records. The
//! ladder is deliberately sequential: each probe fires only after the prior
//! one is confirmed empty, so a backend already misbehaving is not hit with
//! a burst of speculative requests.

use super::envelope;
use super::parser;
use super::types::FetchStrategy;
use super::FarmBackend;
use crate::config::EngineConfig;
use crate::constants::CATALOG_MAX_PAGES;
use crate::error::AppError;
use crate::error_recovery::retry_with_backoff;
use crate::model::Field;
use serde_json::Value;
use std::sync::Arc;

/// Result of a catalog fetch: the de-duplicated field list plus which rung
/// of the ladder produced it.
#[derive(Debug)]
pub struct CatalogFetchOutcome {
    pub fields: Vec<Field>,
    pub strategy: FetchStrategy,
}

/// Fetches the full farm catalog through the fallback ladder.
pub struct CatalogFetcher {
    backend: Arc<dyn FarmBackend>,
    config: EngineConfig,
}

impl CatalogFetcher {
    pub fn new(backend: Arc<dyn FarmBackend>, config: EngineConfig) -> Self {
        Self { backend, config }
    }

    /// Retrieves the full catalog, trying each strategy in ladder order and
    /// stopping at the first non-empty result.
    ///
    /// Failure mode: when every strategy comes back empty while the backend
    /// reported a positive total, this is a data inconsistency, not an empty
    /// catalog — reported as [`AppError::PartialBackendFailure`] so the
    /// caller can surface it instead of silently showing zero records.
    pub async fn fetch_all(&self) -> Result<CatalogFetchOutcome, AppError> {
        let mut claimed_total: Option<u64> = None;
        let mut last_body: Option<Value> = None;
        let mut last_error: Option<AppError> = None;
        let mut strategies_tried = 0usize;

        for strategy in FetchStrategy::LADDER {
            // The zero-based retry only makes sense when the backend itself
            // claims records exist past the empty first page.
            if strategy == FetchStrategy::ZeroBasedPagination
                && !claimed_total.map(|t| t > 0).unwrap_or(false)
            {
                log::debug!("skipping {}: no positive total reported", strategy);
                continue;
            }

            strategies_tried += 1;
            log::info!("catalog fetch: trying {}", strategy);

            let probe = self.run_strategy(strategy, last_body.as_ref()).await;
            match probe {
                Ok(StrategyProbe { records, body }) => {
                    if let Some(body) = body {
                        if let Some(total) = envelope::reported_total(&body) {
                            claimed_total = Some(claimed_total.unwrap_or(0).max(total));
                        }
                        last_body = Some(body);
                    }
                    if records.is_empty() {
                        log::info!("catalog fetch: {} returned no records", strategy);
                        continue;
                    }
                    let fields = dedupe(parser::parse_field_records(&records));
                    if fields.is_empty() {
                        // Records arrived but none were parseable; keep
                        // walking the ladder rather than reporting success.
                        log::warn!(
                            "catalog fetch: {} returned {} records, none parseable",
                            strategy,
                            records.len()
                        );
                        continue;
                    }
                    log::info!(
                        "catalog fetch: {} yielded {} fields",
                        strategy,
                        fields.len()
                    );
                    return Ok(CatalogFetchOutcome { fields, strategy });
                }
                Err(e) => {
                    log::warn!("catalog fetch: {} failed: {}", strategy, e);
                    last_error = Some(e);
                }
            }
        }

        match claimed_total {
            Some(total) if total > 0 => Err(AppError::PartialBackendFailure {
                total_reported: total,
                strategies_tried,
            }),
            _ => match last_error {
                // Nothing claimed, nothing delivered, but at least one probe
                // failed outright — propagate that rather than inventing an
                // empty catalog.
                Some(e) if last_body.is_none() => Err(e),
                _ => {
                    log::info!("catalog fetch: backend reports an empty catalog");
                    Ok(CatalogFetchOutcome {
                        fields: vec![],
                        strategy: FetchStrategy::PrimaryPagination,
                    })
                }
            },
        }
    }

    /// Runs one rung of the ladder, returning raw records plus the last
    /// response body seen (for total/alternate-key bookkeeping).
    async fn run_strategy(
        &self,
        strategy: FetchStrategy,
        last_body: Option<&Value>,
    ) -> Result<StrategyProbe, AppError> {
        match strategy {
            FetchStrategy::PrimaryPagination => {
                self.walk_pages(1, self.config.page_size).await
            }
            FetchStrategy::ZeroBasedPagination => {
                self.walk_pages(0, self.config.page_size).await
            }
            FetchStrategy::WidePage => self.walk_pages(0, self.config.wide_page_size).await,
            FetchStrategy::Unpaginated => {
                let body = self.fetch_with_retry_all().await?;
                let records = envelope::unwrap_item_list(&body).unwrap_or_default();
                Ok(StrategyProbe {
                    records,
                    body: Some(body),
                })
            }
            FetchStrategy::AlternateEnvelopeKeys => {
                let Some(body) = last_body else {
                    return Ok(StrategyProbe::empty());
                };
                match envelope::probe_alternate_keys(body) {
                    Some((key, records)) => {
                        log::info!(
                            "catalog fetch: found {} records under alternate key '{}'",
                            records.len(),
                            key
                        );
                        Ok(StrategyProbe {
                            records,
                            body: None,
                        })
                    }
                    None => Ok(StrategyProbe::empty()),
                }
            }
        }
    }

    /// Walks pages starting at `first_page`, collecting records until the
    /// reported page count (or an empty page) says stop.
    ///
    /// A non-empty first page followed by more pages is the healthy path;
    /// the walk belongs to the strategy so a rung either delivers the whole
    /// catalog or delivers nothing.
    async fn walk_pages(&self, first_page: u32, page_size: u32) -> Result<StrategyProbe, AppError> {
        let mut records: Vec<Value> = Vec::new();
        let mut page = first_page;
        let mut first_body: Option<Value> = None;
        let mut pages_walked = 0u32;

        loop {
            let body = self.fetch_page_with_retry(page, page_size).await?;
            let page_records = envelope::unwrap_item_list(&body).unwrap_or_default();
            let total_pages = envelope::reported_total_pages(&body);
            if first_body.is_none() {
                first_body = Some(body);
            }

            if page_records.is_empty() {
                break;
            }
            records.extend(page_records);
            pages_walked += 1;

            let next = page + 1;
            let past_reported_end = total_pages
                .map(|total| u64::from(next - first_page) >= total)
                .unwrap_or(false);
            if past_reported_end || pages_walked >= CATALOG_MAX_PAGES {
                if pages_walked >= CATALOG_MAX_PAGES {
                    log::warn!(
                        "catalog fetch: stopping page walk at the {}-page ceiling",
                        CATALOG_MAX_PAGES
                    );
                }
                break;
            }
            page = next;
        }

        Ok(StrategyProbe {
            records,
            body: first_body,
        })
    }

    async fn fetch_page_with_retry(&self, page: u32, page_size: u32) -> Result<Value, AppError> {
        let backend = Arc::clone(&self.backend);
        retry_with_backoff(
            || {
                let backend = Arc::clone(&backend);
                async move { backend.fetch_farm_page(page, page_size).await }
            },
            self.config.read_retry_attempts,
            self.config.read_retry_initial_delay,
            self.config.read_retry_max_delay,
        )
        .await
    }

    async fn fetch_with_retry_all(&self) -> Result<Value, AppError> {
        let backend = Arc::clone(&self.backend);
        retry_with_backoff(
            || {
                let backend = Arc::clone(&backend);
                async move { backend.fetch_all_farms().await }
            },
            self.config.read_retry_attempts,
            self.config.read_retry_initial_delay,
            self.config.read_retry_max_delay,
        )
        .await
    }
}

/// Raw result of one strategy probe.
struct StrategyProbe {
    records: Vec<Value>,
    body: Option<Value>,
}

impl StrategyProbe {
    fn empty() -> Self {
        Self {
            records: vec![],
            body: None,
        }
    }
}

/// De-duplicates parsed fields by exact id, first occurrence winning.
fn dedupe(fields: Vec<Field>) -> Vec<Field> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        if seen.insert(field.id.clone()) {
            out.push(field);
        } else {
            log::debug!("dropping duplicate catalog record for field {}", field.id);
        }
    }
    out
}
