//! Request identifiers, engine responses and fault types

use std::fmt;
use std::sync::Arc;

use crate::engine::{Annotation, DocumentSession, EngineError, PageViewport};

/// Identifies one render pass
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Message sent back by a pipeline task
pub enum EngineResponse {
    /// Document opened
    Opened(Arc<dyn DocumentSession>),

    /// Document could not be opened
    OpenFailed(EngineError),

    /// Page geometry is known and the raster surface has been resized
    Geometry {
        id: RequestId,
        page: u32,
        viewport: PageViewport,
    },

    /// Link annotations of a rendered page
    Annotations {
        id: RequestId,
        page: u32,
        view: [f64; 4],
        viewport: PageViewport,
        annotations: Vec<Annotation>,
    },

    /// Annotation fetch was rejected
    AnnotationsFailed {
        id: RequestId,
        page: u32,
        error: EngineError,
    },

    /// Raster paint completed
    Painted { id: RequestId, page: u32 },

    /// Page fetch or raster paint was rejected
    RenderFailed {
        id: RequestId,
        page: u32,
        error: EngineError,
    },

    /// Link destination resolved; `None` means the destination was unusable
    LinkResolved { page: Option<u32> },

    /// Link destination lookup was rejected
    LinkFailed(EngineError),

    /// Gesture settle timer fired
    Settled,

    /// Resize debounce timer fired
    ResizeElapsed,
}

impl fmt::Debug for EngineResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened(session) => f
                .debug_struct("Opened")
                .field("num_pages", &session.num_pages())
                .finish(),
            Self::OpenFailed(error) => f.debug_tuple("OpenFailed").field(error).finish(),
            Self::Geometry { id, page, .. } => f
                .debug_struct("Geometry")
                .field("id", id)
                .field("page", page)
                .finish_non_exhaustive(),
            Self::Annotations {
                id,
                page,
                annotations,
                ..
            } => f
                .debug_struct("Annotations")
                .field("id", id)
                .field("page", page)
                .field("count", &annotations.len())
                .finish_non_exhaustive(),
            Self::AnnotationsFailed { id, page, error } => f
                .debug_struct("AnnotationsFailed")
                .field("id", id)
                .field("page", page)
                .field("error", error)
                .finish(),
            Self::Painted { id, page } => f
                .debug_struct("Painted")
                .field("id", id)
                .field("page", page)
                .finish(),
            Self::RenderFailed { id, page, error } => f
                .debug_struct("RenderFailed")
                .field("id", id)
                .field("page", page)
                .field("error", error)
                .finish(),
            Self::LinkResolved { page } => {
                f.debug_struct("LinkResolved").field("page", page).finish()
            }
            Self::LinkFailed(error) => f.debug_tuple("LinkFailed").field(error).finish(),
            Self::Settled => f.write_str("Settled"),
            Self::ResizeElapsed => f.write_str("ResizeElapsed"),
        }
    }
}

/// Asynchronous failures reported through the `failed` callback
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ViewerFault {
    #[error("no document source configured")]
    MissingSource,

    #[error("cannot open document: {0}")]
    Open(EngineError),

    #[error("document has no pages")]
    EmptyDocument,

    #[error("page {page} failed to render: {error}")]
    Render { page: u32, error: EngineError },

    #[error("annotations of page {page} unavailable: {error}")]
    Annotations { page: u32, error: EngineError },

    #[error("link destination lookup failed: {0}")]
    Link(EngineError),
}

/// Errors returned synchronously by the viewer facade
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ViewerError {
    #[error("method {0} does not exist")]
    UnknownMethod(String),

    #[error("invalid argument for {method}: {detail}")]
    InvalidArgument { method: String, detail: String },
}

impl ViewerError {
    pub fn invalid_argument(method: &str, detail: impl Into<String>) -> Self {
        Self::InvalidArgument {
            method: method.to_string(),
            detail: detail.into(),
        }
    }
}
