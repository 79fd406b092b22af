use crate::models::RawProduct;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Columns pulled for every product, with the dispensary embedded
const PRODUCT_SELECT: &str = "*,dispensary:dispensaries(id,name,chain,address,zone)";

/// Errors that can occur when talking to the Supabase REST API
#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Table names in the hosted database
#[derive(Debug, Clone)]
pub struct SupabaseTables {
    pub products: String,
    pub dispensaries: String,
}

impl Default for SupabaseTables {
    fn default() -> Self {
        Self {
            products: "products".to_string(),
            dispensaries: "dispensaries".to_string(),
        }
    }
}

/// Supabase (PostgREST) client for the deal catalog
///
/// The catalog tables are written by the scraper; this client only reads.
pub struct SupabaseClient {
    base_url: String,
    api_key: String,
    client: Client,
    tables: SupabaseTables,
}

impl SupabaseClient {
    /// Create a new Supabase client
    pub fn new(
        base_url: String,
        api_key: String,
        tables: SupabaseTables,
        timeout_secs: u64,
    ) -> Result<Self, SupabaseError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
            tables,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }

    async fn get_rows(&self, url: &str) -> Result<Vec<Value>, SupabaseError> {
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SupabaseError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Supabase request failed: {} - {}", status, body);
            return Err(SupabaseError::ApiError(format!("Request failed: {}", status)));
        }

        let json: Value = response.json().await?;
        match json {
            Value::Array(rows) => Ok(rows),
            _ => Err(SupabaseError::InvalidResponse("Expected an array of rows".into())),
        }
    }

    /// Rows that fail to deserialize are skipped rather than failing the batch
    fn parse_products(rows: Vec<Value>) -> Vec<RawProduct> {
        let total = rows.len();
        let products: Vec<RawProduct> = rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect();

        if products.len() < total {
            tracing::debug!("Skipped {} undecodable product rows", total - products.len());
        }

        products
    }

    /// Fetch today's active, discounted products ordered by deal score
    pub async fn fetch_active_products(&self, limit: usize) -> Result<Vec<RawProduct>, SupabaseError> {
        let url = format!(
            "{}?select={}&is_active=eq.true&sale_price=gt.0&order=deal_score.desc.nullslast&limit={}",
            self.table_url(&self.tables.products),
            urlencoding::encode(PRODUCT_SELECT),
            limit
        );

        tracing::debug!("Fetching active products (limit {})", limit);

        let rows = self.get_rows(&url).await?;
        let products = Self::parse_products(rows);

        tracing::debug!("Fetched {} active products", products.len());

        Ok(products)
    }

    /// Fetch specific products, active or not
    pub async fn fetch_products_by_ids(&self, ids: &[String]) -> Result<Vec<RawProduct>, SupabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        // PostgREST list syntax; ids are quoted so commas inside them survive
        let list = ids
            .iter()
            .map(|id| format!("\"{}\"", id.replace('"', "")))
            .collect::<Vec<_>>()
            .join(",");
        let filter = format!("in.({})", list);

        let url = format!(
            "{}?select={}&id={}",
            self.table_url(&self.tables.products),
            urlencoding::encode(PRODUCT_SELECT),
            urlencoding::encode(&filter)
        );

        let rows = self.get_rows(&url).await?;
        Ok(Self::parse_products(rows))
    }

    /// Cheap reachability check against the dispensaries table
    pub async fn health_check(&self) -> bool {
        let url = format!("{}?select=id&limit=1", self.table_url(&self.tables.dispensaries));
        self.get_rows(&url).await.is_ok()
    }
}
