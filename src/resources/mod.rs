//! Read-only, URI-addressed data providers.
//!
//! A [`Resource`] pairs a URI template with an async `read` producing
//! [`ContentBlock`]s. The [`ResourceRegistry`] holds every registered
//! provider in registration order; lookup walks that order and the first
//! provider whose template matches wins, which makes registration order
//! the collision-resolution rule. Exact sentinel templates (such as
//! `cms://components/list`) must therefore be registered ahead of generic
//! capture templates (`cms://components/{name}`) that would shadow them.

mod cms;
mod template;

pub use cms::{
    default_registry, ComponentList, ComponentSource, LogFile, PackageList, PageVersions,
    SiteList, TableRows, TemplateList,
};
pub use template::{Captures, UriTemplate};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Static description of a resource, returned by `resources/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    /// URI template this resource answers to.
    pub uri_template: String,
    /// Short unique name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the produced content.
    pub mime_type: String,
}

/// One unit of content returned by a resource read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    /// The URI this block answers.
    pub uri: String,
    /// MIME type of the payload.
    pub mime_type: String,
    /// Text payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Binary payload, base64-encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl ContentBlock {
    /// Creates a text content block.
    #[must_use]
    pub fn text(uri: impl Into<String>, mime_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: mime_type.into(),
            text: Some(text.into()),
            blob: None,
        }
    }

    /// Creates a binary content block from raw bytes.
    #[must_use]
    pub fn blob(uri: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine as _;

        Self {
            uri: uri.into(),
            mime_type: mime_type.into(),
            text: None,
            blob: Some(STANDARD.encode(bytes)),
        }
    }
}

/// Failure modes of a resource read.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The URI matched but the addressed entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The read failed against the backing store.
    #[error("{0}")]
    ReadFailed(String),
}

impl From<crate::error::StoreError> for ResourceError {
    fn from(err: crate::error::StoreError) -> Self {
        Self::ReadFailed(err.to_string())
    }
}

/// A read-only, URI-addressed data provider.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Returns the static definition of this resource.
    fn definition(&self) -> ResourceDefinition;

    /// Matches a URI against this resource's template.
    fn matches(&self, uri: &str) -> Option<Captures>;

    /// Reads the content for a previously matched URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the addressed entity does not exist or the
    /// backing store fails.
    async fn read(&self, uri: &str, captures: &Captures) -> Result<Vec<ContentBlock>, ResourceError>;
}

/// Outcome of a registry lookup.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No registered resource template matched the URI.
    #[error("no resource matches uri: {uri}")]
    NoMatch {
        /// The probed URI.
        uri: String,
    },

    /// A matched resource failed to read.
    #[error(transparent)]
    Read(#[from] ResourceError),
}

/// Ordered collection of resource providers.
///
/// Constructed once at startup from an explicit registration list; never
/// mutated afterwards, so it is safe to share behind an `Arc` across all
/// connections.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: Vec<Box<dyn Resource>>,
}

impl ResourceRegistry {
    /// Creates a registry from an explicit list of providers.
    ///
    /// Order matters: earlier entries shadow later ones on URI collisions.
    #[must_use]
    pub fn new(resources: Vec<Box<dyn Resource>>) -> Self {
        Self { resources }
    }

    /// Returns every definition, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ResourceDefinition> {
        self.resources.iter().map(|r| r.definition()).collect()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Reads the content for a URI.
    ///
    /// The first registered provider whose template matches handles the
    /// read; its failure propagates unchanged (no suppression, no retry).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoMatch`] if no template matches, or the
    /// provider's own error if the read fails.
    pub async fn read(&self, uri: &str) -> Result<Vec<ContentBlock>, RegistryError> {
        for resource in &self.resources {
            if let Some(captures) = resource.matches(uri) {
                return Ok(resource.read(uri, &captures).await?);
            }
        }
        Err(RegistryError::NoMatch {
            uri: uri.to_string(),
        })
    }
}
