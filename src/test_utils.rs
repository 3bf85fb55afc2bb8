//! Instrumented engine for tests
//!
//! `CountingEngine` wraps the manifest engine, counts every collaborator
//! call and can be told to reject specific calls.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::manifest::{DocumentManifest, ManifestEngine};
use crate::engine::{
    Annotation, Destination, DestinationItem, DocumentSession, EngineError, PageHandle, PageRef,
    RenderingEngine, SharedSurface,
};

const DEFAULT_VIEW: [f64; 4] = [0.0, 0.0, 595.0, 841.0];

/// Call counts, shared between the engine and everything it handed out
#[derive(Debug, Default)]
pub struct EngineCounters {
    opens: AtomicUsize,
    page_fetches: AtomicUsize,
    paints: AtomicUsize,
    annotation_calls: AtomicUsize,
    page_index_calls: AtomicUsize,
    destination_calls: AtomicUsize,
}

impl EngineCounters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn page_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }

    /// Raster paints started
    pub fn paints(&self) -> usize {
        self.paints.load(Ordering::SeqCst)
    }

    pub fn annotation_calls(&self) -> usize {
        self.annotation_calls.load(Ordering::SeqCst)
    }

    pub fn page_index_calls(&self) -> usize {
        self.page_index_calls.load(Ordering::SeqCst)
    }

    pub fn destination_calls(&self) -> usize {
        self.destination_calls.load(Ordering::SeqCst)
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct Script {
    fail_open: bool,
    fail_page_index: bool,
    failing_pages: HashSet<u32>,
    failing_paints: HashSet<u32>,
    failing_annotations: HashSet<u32>,
    paint_delay: Option<Duration>,
}

/// Manifest engine with call counting and failure injection
#[derive(Clone, Debug)]
pub struct CountingEngine {
    manifest: DocumentManifest,
    counters: Arc<EngineCounters>,
    script: Arc<Mutex<Script>>,
}

impl CountingEngine {
    /// Source locator the document is registered under
    pub const SOURCE: &'static str = "test.pdf";

    /// `count` A4 pages with default references
    pub fn with_pages(count: usize) -> Self {
        Self::with_manifest(DocumentManifest::uniform(count, DEFAULT_VIEW))
    }

    pub fn with_manifest(manifest: DocumentManifest) -> Self {
        Self {
            manifest,
            counters: Arc::new(EngineCounters::default()),
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    /// Register a named destination pointing at `reference`
    pub fn with_destination(mut self, name: &str, reference: PageRef) -> Self {
        self.manifest.destinations.insert(
            name.to_string(),
            vec![
                DestinationItem::Ref(reference),
                DestinationItem::Name {
                    name: "Fit".to_string(),
                },
            ],
        );
        self
    }

    /// Add an internal link to `page` (1-based)
    pub fn with_link(self, page: u32, rect: [f64; 4], destination: Destination) -> Self {
        self.with_annotation(
            page,
            Annotation {
                subtype: "Link".to_string(),
                rect,
                url: None,
                dest: Some(destination),
            },
        )
    }

    /// Add an external link to `page` (1-based)
    pub fn with_url(self, page: u32, rect: [f64; 4], url: &str) -> Self {
        self.with_annotation(
            page,
            Annotation {
                subtype: "Link".to_string(),
                rect,
                url: Some(url.to_string()),
                dest: None,
            },
        )
    }

    fn with_annotation(mut self, page: u32, annotation: Annotation) -> Self {
        let index = (page as usize).checked_sub(1);
        if let Some(entry) = index.and_then(|i| self.manifest.pages.get_mut(i)) {
            entry.annotations.push(annotation);
        }
        self
    }

    pub fn counters(&self) -> Arc<EngineCounters> {
        self.counters.clone()
    }

    pub fn fail_open(&self) {
        self.script().fail_open = true;
    }

    pub fn fail_page_index(&self) {
        self.script().fail_page_index = true;
    }

    /// Reject fetching `page`
    pub fn fail_page(&self, page: u32) {
        self.script().failing_pages.insert(page);
    }

    /// Reject painting `page`
    pub fn fail_paint(&self, page: u32) {
        self.script().failing_paints.insert(page);
    }

    pub fn fail_annotations(&self, page: u32) {
        self.script().failing_annotations.insert(page);
    }

    /// Make every paint take `delay`
    pub fn set_paint_delay(&self, delay: Duration) {
        self.script().paint_delay = Some(delay);
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        lock(&self.script)
    }
}

fn lock(script: &Mutex<Script>) -> MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl RenderingEngine for CountingEngine {
    async fn open(&self, source: &str) -> Result<Arc<dyn DocumentSession>, EngineError> {
        EngineCounters::bump(&self.counters.opens);
        if self.script().fail_open {
            return Err(EngineError::Open {
                location: source.to_string(),
                detail: "scripted failure".to_string(),
            });
        }
        let inner = ManifestEngine::new()
            .with_document(Self::SOURCE, self.manifest.clone())
            .open(source)
            .await?;
        Ok(Arc::new(CountingSession {
            inner,
            counters: self.counters.clone(),
            script: self.script.clone(),
        }))
    }
}

struct CountingSession {
    inner: Arc<dyn DocumentSession>,
    counters: Arc<EngineCounters>,
    script: Arc<Mutex<Script>>,
}

#[async_trait]
impl DocumentSession for CountingSession {
    fn num_pages(&self) -> u32 {
        self.inner.num_pages()
    }

    async fn page(&self, number: u32) -> Result<Arc<dyn PageHandle>, EngineError> {
        EngineCounters::bump(&self.counters.page_fetches);
        if lock(&self.script).failing_pages.contains(&number) {
            return Err(EngineError::generic(format!("page {number} is unreadable")));
        }
        let inner = self.inner.page(number).await?;
        Ok(Arc::new(CountingPage {
            inner,
            number,
            counters: self.counters.clone(),
            script: self.script.clone(),
        }))
    }

    async fn page_index(&self, reference: PageRef) -> Result<u32, EngineError> {
        EngineCounters::bump(&self.counters.page_index_calls);
        if lock(&self.script).fail_page_index {
            return Err(EngineError::generic("page index unavailable"));
        }
        self.inner.page_index(reference).await
    }

    async fn destination(&self, name: &str) -> Result<Option<Vec<DestinationItem>>, EngineError> {
        EngineCounters::bump(&self.counters.destination_calls);
        self.inner.destination(name).await
    }
}

struct CountingPage {
    inner: Arc<dyn PageHandle>,
    number: u32,
    counters: Arc<EngineCounters>,
    script: Arc<Mutex<Script>>,
}

#[async_trait]
impl PageHandle for CountingPage {
    fn view(&self) -> [f64; 4] {
        self.inner.view()
    }

    async fn render(
        &self,
        surface: &SharedSurface,
        viewport: &crate::engine::PageViewport,
    ) -> Result<(), EngineError> {
        EngineCounters::bump(&self.counters.paints);
        let (delay, fail) = {
            let script = lock(&self.script);
            (
                script.paint_delay,
                script.failing_paints.contains(&self.number),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(EngineError::generic(format!(
                "paint of page {} failed",
                self.number
            )));
        }
        self.inner.render(surface, viewport).await
    }

    async fn annotations(&self) -> Result<Vec<Annotation>, EngineError> {
        EngineCounters::bump(&self.counters.annotation_calls);
        if lock(&self.script).failing_annotations.contains(&self.number) {
            return Err(EngineError::generic("annotations unavailable"));
        }
        self.inner.annotations().await
    }
}
