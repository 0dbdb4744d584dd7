//! Supabase (PostgREST + pgvector) vector store.
//!
//! Expects the table and search function the Supabase vector guide sets up:
//!
//! ```sql
//! create table documents (
//!   id bigserial primary key,
//!   content text,
//!   metadata jsonb,
//!   embedding vector(1536)
//! );
//!
//! create function match_documents (
//!   query_embedding vector(1536),
//!   match_count int default null,
//!   filter jsonb default '{}'
//! ) returns table (id bigint, content text, metadata jsonb, similarity float)
//! ...
//! ```
//!
//! Similarity is `1 - (embedding <=> query_embedding)`, i.e. cosine.

use super::vectorstore::{validate_batch, VectorStore};
use crate::types::{AppError, Metadata, NewRecord, Result, ScoredChunk};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TABLE: &str = "documents";
pub const DEFAULT_QUERY_NAME: &str = "match_documents";

pub struct SupabaseVectorStore {
    http: reqwest::Client,
    rest_url: String,
    table: String,
    query_name: String,
}

impl SupabaseVectorStore {
    pub fn new(url: &str, api_key: &str, table: &str, query_name: &str) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(AppError::Configuration("Missing Supabase URL".into()));
        }
        if api_key.trim().is_empty() {
            return Err(AppError::Configuration("Missing Supabase API key".into()));
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key.trim())
            .map_err(|_| AppError::Configuration("Invalid Supabase API key".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| AppError::Configuration("Invalid Supabase API key".into()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| {
                AppError::Configuration(format!("Failed to build Supabase HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", url.trim().trim_end_matches('/')),
            table: table.to_string(),
            query_name: query_name.to_string(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/{}", self.rest_url, self.table)
    }

    fn rpc_url(&self) -> String {
        format!("{}/rpc/{}", self.rest_url, self.query_name)
    }
}

/// Reads the body of a failed response into an error message.
async fn failure_body(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    format!("Supabase returned {}: {}", status, body)
}

/// Total from a `Content-Range` header such as `0-0/42` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl VectorStore for SupabaseVectorStore {
    fn provider_name(&self) -> &'static str {
        "supabase"
    }

    async fn upsert_batch(&self, records: &[NewRecord]) -> Result<usize> {
        if validate_batch(records)?.is_none() {
            return Ok(0);
        }
        let rows: Vec<InsertRow<'_>> = records
            .iter()
            .map(|r| InsertRow {
                content: &r.text,
                metadata: &r.metadata,
                embedding: &r.embedding,
            })
            .collect();

        // One bulk insert is one statement, so PostgREST commits all rows or none.
        let response = self
            .http
            .post(self.table_url())
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await
            .map_err(|e| AppError::StoreWrite(format!("Supabase request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::StoreWrite(failure_body(response).await));
        }

        tracing::debug!(table = %self.table, rows = records.len(), "Inserted records");
        Ok(records.len())
    }

    async fn similarity_search(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let request = MatchRequest {
            query_embedding: embedding,
            match_count: k,
            filter: Metadata::new(),
        };

        let response = self
            .http
            .post(self.rpc_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::StoreQuery(format!("Supabase request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::StoreQuery(failure_body(response).await));
        }

        let rows: Vec<MatchRow> = response
            .json()
            .await
            .map_err(|e| AppError::StoreQuery(format!("Failed to parse match results: {}", e)))?;

        let mut results: Vec<ScoredChunk> = rows
            .into_iter()
            .map(|row| ScoredChunk {
                text: row.content.unwrap_or_default(),
                metadata: row.metadata.unwrap_or_default(),
                score: row.similarity,
            })
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);

        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .http
            .get(self.table_url())
            .query(&[("select", "id"), ("limit", "1")])
            .header("Prefer", "count=exact")
            .send()
            .await
            .map_err(|e| AppError::StoreQuery(format!("Supabase request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::StoreQuery(failure_body(response).await));
        }

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| AppError::StoreQuery("Missing Content-Range in count response".into()))
    }

    async fn clear(&self) -> Result<()> {
        // PostgREST refuses an unfiltered DELETE.
        let response = self
            .http
            .delete(self.table_url())
            .query(&[("id", "not.is.null")])
            .header("Prefer", "return=minimal")
            .send()
            .await
            .map_err(|e| AppError::StoreWrite(format!("Supabase request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::StoreWrite(failure_body(response).await));
        }
        tracing::info!(table = %self.table, "Cleared vector table");
        Ok(())
    }
}

#[derive(Serialize)]
struct InsertRow<'a> {
    content: &'a str,
    metadata: &'a Metadata,
    embedding: &'a [f32],
}

#[derive(Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_count: usize,
    filter: Metadata,
}

#[derive(Debug, Deserialize)]
struct MatchRow {
    content: Option<String>,
    metadata: Option<Metadata>,
    similarity: f32,
}
