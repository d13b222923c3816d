//! Sequential batch runner.
//!
//! Lists the Shenwan indices of one level, then fetches and ranks each one
//! in turn. Every upstream call goes through the rate-limited client, so a
//! failing index is logged and skipped rather than aborting the batch.

use std::sync::Arc;
use tracing::{info, warn};

use sw_common::{Error, Result};

use crate::data::{
    classify, DateRange, IndustryIndex, IndustryLevel, RateLimitedClient, ValuationSource,
    SW_MARKET,
};
use crate::report::format_opt;
use crate::valuation::{sort_by_pe_percentile, IndexValuation, ValuationAnalyzer};

/// Outcome of one level's run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Level analyzed
    pub level: IndustryLevel,
    /// Date range requested
    pub range: DateRange,
    /// Indices found for the level
    pub index_count: usize,
    /// Results sorted by PE percentile, missing last
    pub results: Vec<IndexValuation>,
    /// Codes of indices that returned no data
    pub skipped: Vec<String>,
    /// Successful API calls made during this run
    pub total_requests: u64,
    /// Failed API attempts during this run
    pub failed_attempts: u64,
}

/// Batch runner over a valuation source.
pub struct ValuationRunner {
    source: Arc<dyn ValuationSource>,
    client: RateLimitedClient,
    analyzer: ValuationAnalyzer,
}

impl ValuationRunner {
    /// Create a runner that uses every trading day.
    pub fn new(source: Arc<dyn ValuationSource>, client: RateLimitedClient) -> Self {
        Self {
            source,
            client,
            analyzer: ValuationAnalyzer::new(),
        }
    }

    /// Replace the analyzer (e.g., to sample every N days).
    pub fn with_analyzer(mut self, analyzer: ValuationAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Successful API calls since the runner was created.
    pub fn total_requests(&self) -> u64 {
        self.client.total_requests()
    }

    /// Fetch and classify the industry indices of one level.
    pub async fn industry_list(&mut self, level: IndustryLevel) -> Result<Vec<IndustryIndex>> {
        let source = Arc::clone(&self.source);
        let listing = self
            .client
            .call("index_basic", || source.list_indices(SW_MARKET))
            .await
            .filter(|l| !l.is_empty())
            .ok_or_else(|| {
                Error::NotFound(format!("no {} index listing from {}", SW_MARKET, source.name()))
            })?;

        let indices = classify(&listing, level);
        if indices.is_empty() {
            return Err(Error::NotFound(format!(
                "no {} ({}) indices in listing of {}",
                level,
                level.display_name(),
                listing.len()
            )));
        }

        info!(
            level = %level,
            listed = listing.len(),
            selected = indices.len(),
            "Industry list ready"
        );
        for index in &indices {
            info!(level = %level, "  - {}: {}", index.ts_code, index.name);
        }

        Ok(indices)
    }

    /// Analyze every index of `level` over `range`.
    pub async fn run(&mut self, level: IndustryLevel, range: DateRange) -> Result<RunSummary> {
        let requests_before = self.client.total_requests();
        let failures_before = self.client.failed_attempts();

        let indices = self.industry_list(level).await?;
        let (results, skipped) = self.analyze_indices(&indices, range).await;

        Ok(RunSummary {
            level,
            range,
            index_count: indices.len(),
            results,
            skipped,
            total_requests: self.client.total_requests() - requests_before,
            failed_attempts: self.client.failed_attempts() - failures_before,
        })
    }

    /// Analyze an explicit set of indices, in order.
    ///
    /// Returns the sorted results and the codes that yielded no data.
    pub async fn analyze_indices(
        &mut self,
        indices: &[IndustryIndex],
        range: DateRange,
    ) -> (Vec<IndexValuation>, Vec<String>) {
        let mut results = Vec::with_capacity(indices.len());
        let mut skipped = Vec::new();

        for (i, index) in indices.iter().enumerate() {
            info!(
                position = i + 1,
                total = indices.len(),
                "Processing {} ({})",
                index.name,
                index.ts_code
            );

            let source = Arc::clone(&self.source);
            let history = self
                .client
                .call("sw_daily", || source.sw_daily(&index.ts_code, range.start, range.end))
                .await
                .unwrap_or_default();

            match self.analyzer.analyze(index, history) {
                Some(result) => {
                    info!(
                        code = %result.index_code,
                        "PE={} ({}), PB={} ({})",
                        format_opt(result.pe, 2),
                        format_opt(result.pe_percentile, 2),
                        format_opt(result.pb, 2),
                        format_opt(result.pb_percentile, 2)
                    );
                    results.push(result);
                }
                None => {
                    warn!(code = %index.ts_code, "No data for {}", index.name);
                    skipped.push(index.ts_code.clone());
                }
            }
        }

        sort_by_pe_percentile(&mut results);
        (results, skipped)
    }
}
