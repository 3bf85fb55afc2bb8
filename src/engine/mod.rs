//! Rendering engine contract
//!
//! The viewer never parses or rasterizes documents itself. Everything it
//! needs from the document format goes through the traits in this module:
//! opening a document, fetching page geometry, painting a page into the
//! raster surface, listing link annotations and resolving destinations.

pub mod manifest;

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Indirect reference to a page object (object number + generation)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    pub num: u32,
    #[serde(rename = "gen", default)]
    pub generation: u32,
}

impl PageRef {
    #[must_use]
    pub const fn new(num: u32, generation: u32) -> Self {
        Self { num, generation }
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.num, self.generation)
    }
}

/// One element of an explicit destination array.
///
/// Only the first element matters to the viewer and it must be a page
/// reference; the remaining elements describe the view (`/XYZ left top
/// zoom`, `/Fit`, ...) and are carried through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DestinationItem {
    Ref(PageRef),
    Name { name: String },
    Number(f64),
    Null,
}

/// Target of an internal link
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Destination {
    /// Explicit destination array, first item is the page reference
    Explicit(Vec<DestinationItem>),
    /// Named destination, looked up through the document's name tree
    Named(String),
}

/// Annotation record as reported by the engine for one page
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Annotation subtype (`Link`, `Text`, `Widget`, ...)
    pub subtype: String,
    /// Rectangle in document space `[x0, y0, x1, y1]` (Y axis pointing up)
    pub rect: [f64; 4],
    /// External URL for URI actions
    #[serde(default)]
    pub url: Option<String>,
    /// Internal destination for GoTo actions
    #[serde(default)]
    pub dest: Option<Destination>,
}

impl Annotation {
    #[must_use]
    pub fn is_link(&self) -> bool {
        self.subtype == "Link"
    }
}

/// Geometry of one page rendered at a given scale
#[derive(Clone, Debug, PartialEq)]
pub struct PageViewport {
    /// Width in raster pixels
    pub width: f64,
    /// Height in raster pixels
    pub height: f64,
    /// Scale factor the viewport was created with
    pub scale: f64,
    /// Page view box in document space `[x0, y0, x1, y1]`
    pub view_box: [f64; 4],
    /// Affine transform from document space to raster space (Y flipped)
    pub transform: [f64; 6],
}

impl PageViewport {
    /// Create an unrotated viewport for `view_box` at `scale`
    #[must_use]
    pub fn new(view_box: [f64; 4], scale: f64) -> Self {
        let [x0, y0, x1, y1] = view_box;
        Self {
            width: (x1 - x0) * scale,
            height: (y1 - y0) * scale,
            scale,
            view_box,
            transform: [scale, 0.0, 0.0, -scale, -x0 * scale, y1 * scale],
        }
    }

    /// Same mapping without the vertical flip.
    ///
    /// Used for overlay elements whose rectangles were already flipped
    /// into screen orientation.
    #[must_use]
    pub fn unflipped_transform(&self) -> [f64; 6] {
        let [x0, y0, _, _] = self.view_box;
        [
            self.scale,
            0.0,
            0.0,
            self.scale,
            -x0 * self.scale,
            -y0 * self.scale,
        ]
    }

    /// Pixel dimensions of a raster surface holding this viewport.
    ///
    /// Fractional sizes are truncated, matching how a canvas treats them.
    #[must_use]
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width.max(0.0) as u32, self.height.max(0.0) as u32)
    }
}

/// The single raster surface pages are painted into (RGBA, row major)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterSurface {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Resize and clear the surface
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels
            .resize(width as usize * height as usize * 4, 0);
    }

    /// Fill every pixel with one RGBA colour
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }
}

/// Raster surface shared between the viewer and an in-flight paint
pub type SharedSurface = Arc<Mutex<RasterSurface>>;

/// Errors reported by the rendering engine
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("cannot open {location}: {detail}")]
    Open { location: String, detail: String },

    #[error("page {0} is out of range")]
    PageOutOfRange(u32),

    #[error("reference {0} does not point to a page")]
    InvalidReference(PageRef),

    #[error("{detail}")]
    Generic { detail: String },
}

impl EngineError {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Entry point of the rendering engine
#[async_trait]
pub trait RenderingEngine: Send + Sync {
    /// Open the document at `source`
    async fn open(&self, source: &str) -> Result<Arc<dyn DocumentSession>, EngineError>;
}

/// An opened document. Immutable once opened.
#[async_trait]
pub trait DocumentSession: Send + Sync {
    /// Number of pages in the document
    fn num_pages(&self) -> u32;

    /// Fetch a page by 1-based number
    async fn page(&self, number: u32) -> Result<Arc<dyn PageHandle>, EngineError>;

    /// 0-based index of the page `reference` points to
    async fn page_index(&self, reference: PageRef) -> Result<u32, EngineError>;

    /// Look up a named destination. `None` when the name is unknown or does
    /// not resolve to an explicit destination array.
    async fn destination(&self, name: &str) -> Result<Option<Vec<DestinationItem>>, EngineError>;
}

/// A single page of an opened document
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Page view box in document space
    fn view(&self) -> [f64; 4];

    /// Geometry of this page at `scale`
    fn viewport(&self, scale: f64) -> PageViewport {
        PageViewport::new(self.view(), scale)
    }

    /// Paint the page into `surface`, already sized for `viewport`
    async fn render(
        &self,
        surface: &SharedSurface,
        viewport: &PageViewport,
    ) -> Result<(), EngineError>;

    /// All annotations of the page
    async fn annotations(&self) -> Result<Vec<Annotation>, EngineError>;
}
