//! External model sources for the acquisition chain.
//!
//! A source answers "do you know a model for this specification?" and may
//! fail; any individual failure is non-fatal to acquisition. Methods return
//! boxed futures for dyn-compatibility.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Deserialize;
use streaming::endpoint::BoxFuture;

use crate::model::{AssetKind, AssetSpec};

/// Error type for source lookups.
#[derive(Debug)]
pub struct SourceError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// A model reference returned by a source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExternalModel {
    pub uri: String,
    pub name: Option<String>,
    pub license: Option<String>,
    pub attribution: Option<String>,
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,
}

fn default_accuracy() -> f64 {
    0.9
}

/// Trait for external model/knowledge sources.
///
/// `Ok(None)` means "nothing for this spec" and the chain moves on;
/// `Err` is logged and swallowed by the chain the same way.
pub trait ExternalSource: Send + Sync {
    fn name(&self) -> &str;

    fn lookup(&self, spec: &AssetSpec) -> BoxFuture<'_, Result<Option<ExternalModel>, SourceError>>;
}

/// Search term a source can match a spec against: the kind-specific label
/// if the spec carries one, else the kind name.
pub fn search_term(spec: &AssetSpec) -> String {
    match spec {
        AssetSpec::Building { style: Some(s), .. } => s.clone(),
        AssetSpec::Vehicle { body: Some(b), .. } => b.clone(),
        AssetSpec::Aircraft { model: Some(m), .. } => m.clone(),
        other => other.kind().as_str().to_string(),
    }
}

/// HTTP source: `GET {base}/search?kind={kind}&q={term}` returning
/// `{ "results": [ { "uri", "name", "license", "attribution" } ] }`.
pub struct HttpModelSource {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ExternalModel>,
}

impl HttpModelSource {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl ExternalSource for HttpModelSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, spec: &AssetSpec) -> BoxFuture<'_, Result<Option<ExternalModel>, SourceError>> {
        let kind = spec.kind();
        let term = search_term(spec);
        Box::pin(async move {
            let url = format!("{}/search", self.base_url.trim_end_matches('/'));
            let resp = self
                .client
                .get(&url)
                .query(&[("kind", kind.as_str()), ("q", term.as_str())])
                .send()
                .await
                .map_err(|e| SourceError::with_source("HTTP request failed", e))?;

            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !resp.status().is_success() {
                return Err(SourceError::new(format!("HTTP error: {}", resp.status())));
            }

            let body: SearchResponse = resp
                .json()
                .await
                .map_err(|e| SourceError::with_source("Invalid search response", e))?;

            Ok(body.results.into_iter().next())
        })
    }
}

/// In-memory source for tests: serves canned models per kind, can be told
/// to fail, and counts lookups.
pub struct MemoryModelSource {
    name: String,
    entries: Mutex<HashMap<AssetKind, ExternalModel>>,
    failing: Mutex<Option<String>>,
    lookup_count: Mutex<u32>,
}

impl MemoryModelSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Mutex::new(HashMap::new()),
            failing: Mutex::new(None),
            lookup_count: Mutex::new(0),
        }
    }

    pub fn set_model(&self, kind: AssetKind, model: ExternalModel) {
        self.entries.lock().insert(kind, model);
    }

    /// Makes every lookup fail with `message`.
    pub fn set_failure(&self, message: impl Into<String>) {
        *self.failing.lock() = Some(message.into());
    }

    pub fn lookup_count(&self) -> u32 {
        *self.lookup_count.lock()
    }
}

impl ExternalSource for MemoryModelSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, spec: &AssetSpec) -> BoxFuture<'_, Result<Option<ExternalModel>, SourceError>> {
        let kind = spec.kind();
        Box::pin(async move {
            *self.lookup_count.lock() += 1;
            if let Some(message) = self.failing.lock().clone() {
                return Err(SourceError::new(message));
            }
            Ok(self.entries.lock().get(&kind).cloned())
        })
    }
}
