//! Concrete CMS resource providers.
//!
//! One provider per logical data source. All of them consume the
//! collaborator stores; none touch CMS storage directly. The default
//! registration order lives in [`default_registry`], which places exact
//! sentinel templates ahead of the generic capture templates they would
//! otherwise be shadowed by.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::store::{EnvStore, FileStore, RowStore};

use super::{Captures, ContentBlock, Resource, ResourceDefinition, ResourceError, ResourceRegistry, UriTemplate};

/// Maximum number of trailing log lines a log read returns.
const LOG_TAIL_LINES: usize = 200;

fn parse_template(template: &str) -> UriTemplate {
    // Registration templates are compile-time constants; a bad one is a
    // programming error caught by the unit tests below.
    UriTemplate::parse(template).unwrap_or_else(|| panic!("invalid uri template: {template}"))
}

fn rows_to_json(rows: &[crate::store::Row]) -> Value {
    Value::Array(rows.iter().map(|row| json!(row)).collect())
}

/// `cms://sites/list` — inventory of configured sites.
pub struct SiteList {
    template: UriTemplate,
    rows: Arc<dyn RowStore>,
}

impl SiteList {
    /// Creates the provider over a row store.
    #[must_use]
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self {
            template: parse_template("cms://sites/list"),
            rows,
        }
    }
}

#[async_trait]
impl Resource for SiteList {
    fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri_template: self.template.as_str().to_string(),
            name: "sites".to_string(),
            description: Some("All sites configured in the CMS".to_string()),
            mime_type: "application/json".to_string(),
        }
    }

    fn matches(&self, uri: &str) -> Option<Captures> {
        self.template.matches(uri)
    }

    async fn read(&self, uri: &str, _captures: &Captures) -> Result<Vec<ContentBlock>, ResourceError> {
        let rows = self.rows.fetch("sites", &[]).await?;
        Ok(vec![ContentBlock::text(
            uri,
            "application/json",
            rows_to_json(&rows).to_string(),
        )])
    }
}

/// `cms://sites/{site}/pages/{slug}/versions` — version history of a page.
pub struct PageVersions {
    template: UriTemplate,
    rows: Arc<dyn RowStore>,
}

impl PageVersions {
    /// Creates the provider over a row store.
    #[must_use]
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self {
            template: parse_template("cms://sites/{site}/pages/{slug}/versions"),
            rows,
        }
    }
}

#[async_trait]
impl Resource for PageVersions {
    fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri_template: self.template.as_str().to_string(),
            name: "page-versions".to_string(),
            description: Some("Version history of a single page".to_string()),
            mime_type: "application/json".to_string(),
        }
    }

    fn matches(&self, uri: &str) -> Option<Captures> {
        self.template.matches(uri)
    }

    async fn read(&self, uri: &str, captures: &Captures) -> Result<Vec<ContentBlock>, ResourceError> {
        let site = captures.get("site").cloned().unwrap_or_default();
        let slug = captures.get("slug").cloned().unwrap_or_default();
        let rows = self
            .rows
            .fetch("page_versions", &[json!(site), json!(slug)])
            .await?;
        if rows.is_empty() {
            return Err(ResourceError::NotFound(format!(
                "no versions recorded for page '{slug}' on site '{site}'"
            )));
        }
        Ok(vec![ContentBlock::text(
            uri,
            "application/json",
            rows_to_json(&rows).to_string(),
        )])
    }
}

/// `cms://templates/list` — inventory of page templates.
pub struct TemplateList {
    template: UriTemplate,
    files: Arc<dyn FileStore>,
}

impl TemplateList {
    /// Creates the provider over a file store.
    #[must_use]
    pub fn new(files: Arc<dyn FileStore>) -> Self {
        Self {
            template: parse_template("cms://templates/list"),
            files,
        }
    }
}

#[async_trait]
impl Resource for TemplateList {
    fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri_template: self.template.as_str().to_string(),
            name: "templates".to_string(),
            description: Some("All page templates".to_string()),
            mime_type: "application/json".to_string(),
        }
    }

    fn matches(&self, uri: &str) -> Option<Captures> {
        self.template.matches(uri)
    }

    async fn read(&self, uri: &str, _captures: &Captures) -> Result<Vec<ContentBlock>, ResourceError> {
        let mut paths = self.files.glob("templates/*").await?;
        paths.sort();
        Ok(vec![ContentBlock::text(
            uri,
            "application/json",
            json!(paths).to_string(),
        )])
    }
}

/// `cms://components/list` — inventory of page components.
///
/// Exact sentinel: must be registered ahead of [`ComponentSource`], whose
/// generic `{name}` capture would otherwise swallow the `list` segment.
pub struct ComponentList {
    template: UriTemplate,
    files: Arc<dyn FileStore>,
}

impl ComponentList {
    /// Creates the provider over a file store.
    #[must_use]
    pub fn new(files: Arc<dyn FileStore>) -> Self {
        Self {
            template: parse_template("cms://components/list"),
            files,
        }
    }
}

#[async_trait]
impl Resource for ComponentList {
    fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri_template: self.template.as_str().to_string(),
            name: "components".to_string(),
            description: Some("All page components".to_string()),
            mime_type: "application/json".to_string(),
        }
    }

    fn matches(&self, uri: &str) -> Option<Captures> {
        self.template.matches(uri)
    }

    async fn read(&self, uri: &str, _captures: &Captures) -> Result<Vec<ContentBlock>, ResourceError> {
        let mut paths = self.files.glob("components/*").await?;
        paths.sort();
        Ok(vec![ContentBlock::text(
            uri,
            "application/json",
            json!(paths).to_string(),
        )])
    }
}

/// `cms://components/{name}` — source of a single component.
pub struct ComponentSource {
    template: UriTemplate,
    files: Arc<dyn FileStore>,
}

impl ComponentSource {
    /// Creates the provider over a file store.
    #[must_use]
    pub fn new(files: Arc<dyn FileStore>) -> Self {
        Self {
            template: parse_template("cms://components/{name}"),
            files,
        }
    }
}

#[async_trait]
impl Resource for ComponentSource {
    fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri_template: self.template.as_str().to_string(),
            name: "component-source".to_string(),
            description: Some("Source of a single page component".to_string()),
            mime_type: "text/html".to_string(),
        }
    }

    fn matches(&self, uri: &str) -> Option<Captures> {
        self.template.matches(uri)
    }

    async fn read(&self, uri: &str, captures: &Captures) -> Result<Vec<ContentBlock>, ResourceError> {
        let name = captures.get("name").cloned().unwrap_or_default();
        let path = format!("components/{name}");
        if !self.files.exists(&path).await {
            return Err(ResourceError::NotFound(format!(
                "component not found: {name}"
            )));
        }
        let source = self.files.read(&path).await?;
        Ok(vec![ContentBlock::text(uri, "text/html", source)])
    }
}

/// `cms://db/tables/{table}` — rows of a database table.
pub struct TableRows {
    template: UriTemplate,
    rows: Arc<dyn RowStore>,
}

impl TableRows {
    /// Creates the provider over a row store.
    #[must_use]
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self {
            template: parse_template("cms://db/tables/{table}"),
            rows,
        }
    }
}

#[async_trait]
impl Resource for TableRows {
    fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri_template: self.template.as_str().to_string(),
            name: "table-rows".to_string(),
            description: Some("Rows of a single database table".to_string()),
            mime_type: "application/json".to_string(),
        }
    }

    fn matches(&self, uri: &str) -> Option<Captures> {
        self.template.matches(uri)
    }

    async fn read(&self, uri: &str, captures: &Captures) -> Result<Vec<ContentBlock>, ResourceError> {
        let table = captures.get("table").cloned().unwrap_or_default();
        let rows = self.rows.fetch(&table, &[]).await?;
        Ok(vec![ContentBlock::text(
            uri,
            "application/json",
            rows_to_json(&rows).to_string(),
        )])
    }
}

/// `cms://logs/{name}` — tail of an application log file.
pub struct LogFile {
    template: UriTemplate,
    files: Arc<dyn FileStore>,
}

impl LogFile {
    /// Creates the provider over a file store.
    #[must_use]
    pub fn new(files: Arc<dyn FileStore>) -> Self {
        Self {
            template: parse_template("cms://logs/{name}"),
            files,
        }
    }
}

#[async_trait]
impl Resource for LogFile {
    fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri_template: self.template.as_str().to_string(),
            name: "logs".to_string(),
            description: Some(format!("Last {LOG_TAIL_LINES} lines of an application log")),
            mime_type: "text/plain".to_string(),
        }
    }

    fn matches(&self, uri: &str) -> Option<Captures> {
        self.template.matches(uri)
    }

    async fn read(&self, uri: &str, captures: &Captures) -> Result<Vec<ContentBlock>, ResourceError> {
        let name = captures.get("name").cloned().unwrap_or_default();
        let path = format!("logs/{name}");
        let contents = match self.files.read(&path).await {
            Ok(contents) => contents,
            Err(StoreError::FileNotFound { .. }) => {
                return Err(ResourceError::NotFound(format!("log not found: {name}")));
            }
            // Genuine store failures keep their original message.
            Err(err) => return Err(err.into()),
        };

        let lines: Vec<&str> = contents.lines().collect();
        let tail_start = lines.len().saturating_sub(LOG_TAIL_LINES);
        Ok(vec![ContentBlock::text(
            uri,
            "text/plain",
            lines[tail_start..].join("\n"),
        )])
    }
}

/// `cms://packages/list` — installed extension packages.
pub struct PackageList {
    template: UriTemplate,
    files: Arc<dyn FileStore>,
    env: Arc<dyn EnvStore>,
}

impl PackageList {
    /// Creates the provider over a file store and environment accessor.
    #[must_use]
    pub fn new(files: Arc<dyn FileStore>, env: Arc<dyn EnvStore>) -> Self {
        Self {
            template: parse_template("cms://packages/list"),
            files,
            env,
        }
    }
}

#[async_trait]
impl Resource for PackageList {
    fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri_template: self.template.as_str().to_string(),
            name: "packages".to_string(),
            description: Some("Installed extension packages".to_string()),
            mime_type: "application/json".to_string(),
        }
    }

    fn matches(&self, uri: &str) -> Option<Captures> {
        self.template.matches(uri)
    }

    async fn read(&self, uri: &str, _captures: &Captures) -> Result<Vec<ContentBlock>, ResourceError> {
        let manifest_path = self
            .env
            .get("cms.packages_manifest")
            .unwrap_or_else(|| "packages.json".to_string());
        let manifest = self.files.read(&manifest_path).await?;
        Ok(vec![ContentBlock::text(uri, "application/json", manifest)])
    }
}

/// Builds the default registry over one store implementing all three
/// collaborator traits.
///
/// Sentinels precede generics: `components/list` is registered ahead of
/// `components/{name}`.
pub fn default_registry<S>(store: &Arc<S>) -> ResourceRegistry
where
    S: RowStore + FileStore + EnvStore + 'static,
{
    let rows: Arc<dyn RowStore> = store.clone();
    let files: Arc<dyn FileStore> = store.clone();
    let env: Arc<dyn EnvStore> = store.clone();

    ResourceRegistry::new(vec![
        Box::new(SiteList::new(rows.clone())),
        Box::new(PageVersions::new(rows.clone())),
        Box::new(TemplateList::new(files.clone())),
        Box::new(ComponentList::new(files.clone())),
        Box::new(ComponentSource::new(files.clone())),
        Box::new(TableRows::new(rows)),
        Box::new(LogFile::new(files.clone())),
        Box::new(PackageList::new(files, env)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.insert_table(
            "sites",
            vec![[("slug".to_string(), json!("main"))].into_iter().collect()],
        );
        store.insert_file("components/button", "<button/>");
        store.insert_file("components/card", "<div/>");
        Arc::new(store)
    }

    #[tokio::test]
    async fn site_list_serialises_rows() {
        let resource = SiteList::new(store());
        let caps = resource.matches("cms://sites/list").unwrap();
        let blocks = resource.read("cms://sites/list", &caps).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].text.as_deref().unwrap().contains("main"));
    }

    #[tokio::test]
    async fn component_source_reads_file() {
        let resource = ComponentSource::new(store());
        let caps = resource.matches("cms://components/button").unwrap();
        let blocks = resource
            .read("cms://components/button", &caps)
            .await
            .unwrap();
        assert_eq!(blocks[0].text.as_deref(), Some("<button/>"));
    }

    #[tokio::test]
    async fn missing_component_is_not_found() {
        let resource = ComponentSource::new(store());
        let caps = resource.matches("cms://components/missing").unwrap();
        let err = resource
            .read("cms://components/missing", &caps)
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn log_tail_is_bounded() {
        let store = store();
        let long: String = (0..500).map(|i| format!("line {i}\n")).collect();
        store.insert_file("logs/app.log", long);

        let resource = LogFile::new(store);
        let caps = resource.matches("cms://logs/app.log").unwrap();
        let blocks = resource.read("cms://logs/app.log", &caps).await.unwrap();
        let text = blocks[0].text.as_deref().unwrap();
        assert_eq!(text.lines().count(), LOG_TAIL_LINES);
        assert!(text.ends_with("line 499"));
    }

    struct BrokenFiles;

    #[async_trait]
    impl crate::store::FileStore for BrokenFiles {
        async fn exists(&self, _path: &str) -> bool {
            true
        }

        async fn read(&self, path: &str) -> Result<String, StoreError> {
            Err(StoreError::FileRead {
                path: path.to_string(),
                source: std::io::Error::other("disk detached"),
            })
        }

        async fn glob(&self, _pattern: &str) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn missing_log_is_not_found() {
        let resource = LogFile::new(store());
        let caps = resource.matches("cms://logs/ghost.log").unwrap();
        let err = resource
            .read("cms://logs/ghost.log", &caps)
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn log_store_failure_is_not_conflated_with_missing_log() {
        let resource = LogFile::new(Arc::new(BrokenFiles));
        let caps = resource.matches("cms://logs/app.log").unwrap();
        let err = resource
            .read("cms://logs/app.log", &caps)
            .await
            .unwrap_err();
        let ResourceError::ReadFailed(message) = err else {
            panic!("store failure must not surface as not-found");
        };
        assert!(message.contains("app.log"));
    }

    #[tokio::test]
    async fn default_registry_resolves_sentinel_before_generic() {
        let registry = default_registry(&store());
        let blocks = registry.read("cms://components/list").await.unwrap();
        // The sentinel answers with a JSON listing, not component source.
        assert_eq!(blocks[0].mime_type, "application/json");
        assert!(blocks[0].text.as_deref().unwrap().contains("button"));
    }

    #[test]
    fn default_registry_count() {
        let registry = default_registry(&store());
        assert_eq!(registry.len(), 8);
    }
}
