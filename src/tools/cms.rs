//! Concrete CMS tools.
//!
//! Results follow the MCP tool-call shape: a `content` list of text
//! blocks plus a `structuredContent` object for machine consumption.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::store::{CacheStore, RowStore};

use super::{Tool, ToolDefinition, ToolError, ToolRegistry};

/// `get-site-info` — metadata of a single site.
pub struct SiteInfo {
    rows: Arc<dyn RowStore>,
}

impl SiteInfo {
    /// Creates the tool over a row store.
    #[must_use]
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl Tool for SiteInfo {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get-site-info".to_string(),
            description: "Returns the configuration of a single site".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "site": { "type": "string" }
                },
                "required": ["site"]
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let site = arguments
            .get("site")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let rows = self.rows.fetch("sites", &[json!(site)]).await?;
        let Some(row) = rows.first() else {
            return Err(ToolError::ExecutionFailed(format!(
                "unknown site: {site}"
            )));
        };
        Ok(json!({
            "content": [{ "type": "text", "text": format!("Site '{site}' found.") }],
            "structuredContent": row,
        }))
    }
}

/// `search-content` — full-text search over page content.
pub struct SearchContent {
    rows: Arc<dyn RowStore>,
}

impl SearchContent {
    /// Creates the tool over a row store.
    #[must_use]
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl Tool for SearchContent {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search-content".to_string(),
            description: "Searches page content for a query string".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "limit": { "type": "integer" }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        let limit = arguments
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(20)
            .min(100);
        let limit = usize::try_from(limit).unwrap_or(20);

        let pages = self.rows.fetch("pages", &[]).await?;
        let hits: Vec<&crate::store::Row> = pages
            .iter()
            .filter(|row| {
                row.values().any(|v| {
                    v.as_str()
                        .is_some_and(|s| s.to_lowercase().contains(&query))
                })
            })
            .take(limit)
            .collect();

        Ok(json!({
            "content": [{
                "type": "text",
                "text": format!("{} page(s) matched.", hits.len()),
            }],
            "structuredContent": { "matches": hits },
        }))
    }
}

/// `clear-cache` — invalidates the render cache under a prefix.
pub struct ClearCache {
    cache: Arc<dyn CacheStore>,
}

impl ClearCache {
    /// Creates the tool over a cache store.
    #[must_use]
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Tool for ClearCache {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "clear-cache".to_string(),
            description: "Invalidates cached page renders under a key prefix".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "prefix": { "type": "string" }
                }
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let prefix = arguments
            .get("prefix")
            .and_then(Value::as_str)
            .unwrap_or("cache/");
        let removed = self.cache.purge(prefix).await?;
        Ok(json!({
            "content": [{
                "type": "text",
                "text": format!("Removed {removed} cached entr(y/ies)."),
            }],
            "structuredContent": { "removed": removed },
        }))
    }
}

/// Builds the default tool registry over one store implementing the
/// collaborator traits.
pub fn default_registry<S>(store: &Arc<S>) -> ToolRegistry
where
    S: RowStore + CacheStore + 'static,
{
    let rows: Arc<dyn RowStore> = store.clone();
    let cache: Arc<dyn CacheStore> = store.clone();

    ToolRegistry::new(vec![
        Box::new(SiteInfo::new(rows.clone())),
        Box::new(SearchContent::new(rows)),
        Box::new(ClearCache::new(cache)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.insert_table(
            "sites",
            vec![[
                ("slug".to_string(), json!("main")),
                ("name".to_string(), json!("Main Site")),
            ]
            .into_iter()
            .collect()],
        );
        store.insert_table(
            "pages",
            vec![
                [
                    ("slug".to_string(), json!("welcome")),
                    ("body".to_string(), json!("Welcome to the CMS")),
                ]
                .into_iter()
                .collect(),
                [
                    ("slug".to_string(), json!("about")),
                    ("body".to_string(), json!("About this place")),
                ]
                .into_iter()
                .collect(),
            ],
        );
        store.insert_file("cache/page-welcome", "render");
        Arc::new(store)
    }

    #[tokio::test]
    async fn site_info_returns_row() {
        let registry = default_registry(&store());
        let result = registry
            .call("get-site-info", &json!({ "site": "main" }))
            .await
            .unwrap();
        assert_eq!(result["structuredContent"]["name"], json!("Main Site"));
    }

    #[tokio::test]
    async fn site_info_unknown_site_fails() {
        let registry = default_registry(&store());
        let err = registry
            .call("get-site-info", &json!({ "site": "ghost" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn search_content_matches_case_insensitively() {
        let registry = default_registry(&store());
        let result = registry
            .call("search-content", &json!({ "query": "WELCOME" }))
            .await
            .unwrap();
        let matches = result["structuredContent"]["matches"].as_array().unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn search_content_respects_limit() {
        let registry = default_registry(&store());
        let result = registry
            .call("search-content", &json!({ "query": "", "limit": 1 }))
            .await
            .unwrap();
        let matches = result["structuredContent"]["matches"].as_array().unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn clear_cache_reports_removed_count() {
        let registry = default_registry(&store());
        let result = registry.call("clear-cache", &json!({})).await.unwrap();
        assert_eq!(result["structuredContent"]["removed"], json!(1));
    }

    #[tokio::test]
    async fn schema_mismatch_fails_before_execution() {
        let registry = default_registry(&store());
        let err = registry
            .call("get-site-info", &json!({ "site": 42 }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
