//! In-memory engine backed by a JSON document manifest
//!
//! A manifest describes a document the way the viewer sees it: page boxes,
//! page object references, link annotations and named destinations. It is
//! what the command-line harness opens, and what tests use when they need a
//! real engine rather than a scripted one.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{
    Annotation, DestinationItem, DocumentSession, EngineError, PageHandle, PageRef,
    PageViewport, RenderingEngine, SharedSurface,
};

const DEFAULT_VIEW: [f64; 4] = [0.0, 0.0, 595.0, 841.0];
const PAPER_WHITE: [u8; 4] = [255, 255, 255, 255];

fn default_view() -> [f64; 4] {
    DEFAULT_VIEW
}

/// One page of a manifest
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageManifest {
    /// Page object reference; defaults to `{index + 1} 0 R`
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<PageRef>,
    /// View box in document space
    #[serde(default = "default_view")]
    pub view: [f64; 4],
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Default for PageManifest {
    fn default() -> Self {
        Self {
            reference: None,
            view: DEFAULT_VIEW,
            annotations: Vec::new(),
        }
    }
}

/// A whole document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentManifest {
    pub pages: Vec<PageManifest>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub destinations: HashMap<String, Vec<DestinationItem>>,
}

impl DocumentManifest {
    /// `count` blank pages sharing one view box
    #[must_use]
    pub fn uniform(count: usize, view: [f64; 4]) -> Self {
        Self {
            pages: (0..count)
                .map(|_| PageManifest {
                    view,
                    ..PageManifest::default()
                })
                .collect(),
            destinations: HashMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::generic(format!("invalid manifest: {e}")))
    }

    fn page_ref(&self, index: usize) -> PageRef {
        self.pages
            .get(index)
            .and_then(|p| p.reference)
            .unwrap_or(PageRef::new(index as u32 + 1, 0))
    }
}

/// Engine serving manifests registered under source locators
#[derive(Clone, Debug, Default)]
pub struct ManifestEngine {
    documents: HashMap<String, Arc<DocumentManifest>>,
}

impl ManifestEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `manifest` under `source`
    #[must_use]
    pub fn with_document(mut self, source: impl Into<String>, manifest: DocumentManifest) -> Self {
        self.documents.insert(source.into(), Arc::new(manifest));
        self
    }

    /// Read a manifest file and register it under its own path
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let location = path.display().to_string();
        let json = fs::read_to_string(path).map_err(|e| EngineError::Open {
            location: location.clone(),
            detail: e.to_string(),
        })?;
        let manifest = DocumentManifest::from_json(&json)?;
        Ok(Self::new().with_document(location, manifest))
    }
}

#[async_trait]
impl RenderingEngine for ManifestEngine {
    async fn open(&self, source: &str) -> Result<Arc<dyn DocumentSession>, EngineError> {
        let manifest = self
            .documents
            .get(source)
            .cloned()
            .ok_or_else(|| EngineError::Open {
                location: source.to_string(),
                detail: "no such document".to_string(),
            })?;
        debug!("Opened manifest {source} ({} pages)", manifest.pages.len());
        Ok(Arc::new(ManifestSession { manifest }))
    }
}

struct ManifestSession {
    manifest: Arc<DocumentManifest>,
}

#[async_trait]
impl DocumentSession for ManifestSession {
    fn num_pages(&self) -> u32 {
        self.manifest.pages.len() as u32
    }

    async fn page(&self, number: u32) -> Result<Arc<dyn PageHandle>, EngineError> {
        let index = number
            .checked_sub(1)
            .ok_or(EngineError::PageOutOfRange(number))?;
        let page = self
            .manifest
            .pages
            .get(index as usize)
            .ok_or(EngineError::PageOutOfRange(number))?;
        Ok(Arc::new(ManifestPage {
            view: page.view,
            annotations: page.annotations.clone(),
        }))
    }

    async fn page_index(&self, reference: PageRef) -> Result<u32, EngineError> {
        (0..self.manifest.pages.len())
            .find(|&i| self.manifest.page_ref(i) == reference)
            .map(|i| i as u32)
            .ok_or(EngineError::InvalidReference(reference))
    }

    async fn destination(&self, name: &str) -> Result<Option<Vec<DestinationItem>>, EngineError> {
        Ok(self.manifest.destinations.get(name).cloned())
    }
}

struct ManifestPage {
    view: [f64; 4],
    annotations: Vec<Annotation>,
}

#[async_trait]
impl PageHandle for ManifestPage {
    fn view(&self) -> [f64; 4] {
        self.view
    }

    async fn render(
        &self,
        surface: &SharedSurface,
        viewport: &PageViewport,
    ) -> Result<(), EngineError> {
        let mut surface = surface
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if (surface.width(), surface.height()) != viewport.pixel_size() {
            return Err(EngineError::generic(format!(
                "surface is {}x{}, viewport needs {:?}",
                surface.width(),
                surface.height(),
                viewport.pixel_size()
            )));
        }
        surface.fill(PAPER_WHITE);
        Ok(())
    }

    async fn annotations(&self) -> Result<Vec<Annotation>, EngineError> {
        Ok(self.annotations.clone())
    }
}
