//! Tushare Pro API adapter for Shenwan index valuation data.
//!
//! # API Documentation
//! https://tushare.pro/document/2
//!
//! # Endpoints Used
//! - `index_basic` (market = "SW"): index listing
//! - `sw_daily`: daily quotes with PE/PB (5000 points required)
//!
//! # Wire Format
//! Every call is a `POST` of `{api_name, token, params, fields}`. Responses
//! are tables: `data.fields` names the columns and `data.items` holds
//! positional rows.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use sw_common::config::Config;
use sw_common::util::truncate_with_ellipsis;

use super::provider::{is_rate_limit_message, ProviderError, ValuationSource};
use super::{DailyValuation, IndexBasic};

const INDEX_BASIC_FIELDS: &[&str] = &["ts_code", "name", "market", "category"];
const SW_DAILY_FIELDS: &[&str] = &["ts_code", "trade_date", "pe", "pb"];

/// Tushare API adapter
pub struct TushareAdapter {
    /// API token
    token: String,
    /// HTTP client
    client: reqwest::Client,
    /// API base URL
    base_url: String,
}

impl TushareAdapter {
    /// Create a new Tushare adapter against the public endpoint.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_options(token, "http://api.tushare.pro", Duration::from_secs(30))
    }

    /// Create an adapter with an explicit endpoint and timeout.
    pub fn with_options(
        token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            token: token.into(),
            client,
            base_url: base_url.into(),
        }
    }

    /// Create from config.
    ///
    /// Fails when no token is configured; there is no built-in default.
    pub fn from_config(config: &Config) -> sw_common::Result<Self> {
        let token = config.require_token()?;
        Ok(Self::with_options(
            token,
            config.tushare.base_url.clone(),
            config.tushare.timeout(),
        ))
    }

    /// Call the Tushare API and return the result table.
    async fn call_api(
        &self,
        api_name: &str,
        params: &HashMap<&str, String>,
        fields: &[&str],
    ) -> Result<TushareTable, ProviderError> {
        let request = TushareRequest {
            api_name: api_name.to_string(),
            token: self.token.clone(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            fields: fields.join(","),
        };

        debug!(api = api_name, params = ?params, "Calling Tushare");

        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ProviderError::Network(format!("Failed to send request to Tushare: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = truncate_with_ellipsis(&body, 200);
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(ProviderError::RateLimited { message: body });
            }
            return Err(ProviderError::Network(format!("HTTP {}: {}", status, body)));
        }

        let result: TushareResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse Tushare response: {}", e)))?;

        if result.code != 0 {
            let message = result.msg.unwrap_or_default();
            return Err(classify_api_error(result.code, message));
        }

        Ok(result.data.unwrap_or_default())
    }

    // ========================================================================
    // Parsing Helpers
    // ========================================================================

    fn parse_index_basic(table: &TushareTable) -> Result<Vec<IndexBasic>, ProviderError> {
        // Empty tables may come back without a field list
        if table.items.is_empty() {
            return Ok(Vec::new());
        }

        let code_col = table.require_column("ts_code")?;
        let name_col = table.require_column("name")?;
        let market_col = table.column("market");
        let category_col = table.column("category");

        let mut out = Vec::with_capacity(table.items.len());
        for row in &table.items {
            let (Some(ts_code), Some(name)) = (cell_str(row, code_col), cell_str(row, name_col))
            else {
                continue;
            };

            out.push(IndexBasic {
                ts_code,
                name,
                market: market_col.and_then(|c| cell_str(row, c)),
                category: category_col.and_then(|c| cell_str(row, c)),
            });
        }

        Ok(out)
    }

    fn parse_sw_daily(
        ts_code: &str,
        table: &TushareTable,
    ) -> Result<Vec<DailyValuation>, ProviderError> {
        if table.items.is_empty() {
            return Ok(Vec::new());
        }

        let date_col = table.require_column("trade_date")?;
        let code_col = table.column("ts_code");
        let pe_col = table.column("pe");
        let pb_col = table.column("pb");

        let mut out = Vec::with_capacity(table.items.len());
        for row in &table.items {
            let Some(trade_date) = cell_str(row, date_col)
                .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y%m%d").ok())
            else {
                warn!(ts_code, row = ?row, "Skipping sw_daily row without a valid trade_date");
                continue;
            };

            out.push(DailyValuation {
                ts_code: code_col
                    .and_then(|c| cell_str(row, c))
                    .unwrap_or_else(|| ts_code.to_string()),
                trade_date,
                pe: pe_col.and_then(|c| cell_f64(row, c)),
                pb: pb_col.and_then(|c| cell_f64(row, c)),
            });
        }

        Ok(out)
    }
}

#[async_trait]
impl ValuationSource for TushareAdapter {
    fn name(&self) -> &'static str {
        "tushare"
    }

    async fn list_indices(&self, market: &str) -> Result<Vec<IndexBasic>, ProviderError> {
        let mut params = HashMap::new();
        params.insert("market", market.to_string());

        let table = self.call_api("index_basic", &params, INDEX_BASIC_FIELDS).await?;
        Self::parse_index_basic(&table)
    }

    async fn sw_daily(
        &self,
        ts_code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyValuation>, ProviderError> {
        let mut params = HashMap::new();
        params.insert("ts_code", ts_code.to_string());
        params.insert("start_date", start_date.format("%Y%m%d").to_string());
        params.insert("end_date", end_date.format("%Y%m%d").to_string());

        let table = self.call_api("sw_daily", &params, SW_DAILY_FIELDS).await?;
        Self::parse_sw_daily(ts_code, &table)
    }
}

/// Map a non-zero response code to a typed error.
fn classify_api_error(code: i64, message: String) -> ProviderError {
    if is_rate_limit_message(&message) {
        return ProviderError::RateLimited { message };
    }

    let lower = message.to_lowercase();
    if lower.contains("token") || message.contains("权限") || message.contains("积分") {
        return ProviderError::Auth(message);
    }

    ProviderError::Api { code, message }
}

fn cell_str(row: &[Value], idx: usize) -> Option<String> {
    match row.get(idx)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn cell_f64(row: &[Value], idx: usize) -> Option<f64> {
    let value = match row.get(idx)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct TushareRequest {
    api_name: String,
    token: String,
    params: HashMap<String, String>,
    fields: String,
}

#[derive(Debug, Deserialize)]
struct TushareResponse {
    code: i64,
    msg: Option<String>,
    data: Option<TushareTable>,
}

#[derive(Debug, Default, Deserialize)]
struct TushareTable {
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    items: Vec<Vec<Value>>,
}

impl TushareTable {
    fn column(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    fn require_column(&self, name: &str) -> Result<usize, ProviderError> {
        self.column(name)
            .ok_or_else(|| ProviderError::Parse(format!("Response has no '{}' column", name)))
    }
}

// ============================================================================
// Tests
// ============================================================================
