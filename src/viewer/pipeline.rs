//! Engine tasks
//!
//! Each function here runs as its own task and reports back over the
//! response channel. None of them touch viewer state; the service applies
//! their responses in arrival order.

use std::sync::Arc;
use std::time::Duration;

use flume::Sender;
use log::debug;

use super::request::{EngineResponse, RequestId};
use super::resolver::DestinationResolver;
use crate::engine::{Destination, DocumentSession, RenderingEngine, SharedSurface};

/// One render pass
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderJob {
    pub id: RequestId,
    pub page: u32,
    /// Raster scale (base scale times quality)
    pub scale: f64,
    /// Fetch link annotations alongside the paint
    pub annotations: bool,
}

pub async fn open_document(
    engine: Arc<dyn RenderingEngine>,
    source: String,
    tx: Sender<EngineResponse>,
) {
    let response = match engine.open(&source).await {
        Ok(session) => EngineResponse::Opened(session),
        Err(error) => EngineResponse::OpenFailed(error),
    };
    let _ = tx.send(response);
}

/// Fetch the page, size the surface, then paint and fetch annotations
/// concurrently.
///
/// `Geometry` is always sent before `Painted` or `Annotations`.
pub async fn render_page(
    session: Arc<dyn DocumentSession>,
    surface: SharedSurface,
    job: RenderJob,
    tx: Sender<EngineResponse>,
) {
    let RenderJob {
        id,
        page,
        scale,
        annotations,
    } = job;

    let handle = match session.page(page).await {
        Ok(handle) => handle,
        Err(error) => {
            let _ = tx.send(EngineResponse::RenderFailed { id, page, error });
            return;
        }
    };

    let viewport = handle.viewport(scale);
    let (width, height) = viewport.pixel_size();
    surface
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .resize(width, height);
    debug!("Page {page}: surface {width}x{height}");

    let _ = tx.send(EngineResponse::Geometry {
        id,
        page,
        viewport: viewport.clone(),
    });

    let paint = async {
        let response = match handle.render(&surface, &viewport).await {
            Ok(()) => EngineResponse::Painted { id, page },
            Err(error) => EngineResponse::RenderFailed { id, page, error },
        };
        let _ = tx.send(response);
    };

    let links = async {
        if !annotations {
            return;
        }
        let response = match handle.annotations().await {
            Ok(annotations) => EngineResponse::Annotations {
                id,
                page,
                view: handle.view(),
                viewport: viewport.clone(),
                annotations,
            },
            Err(error) => EngineResponse::AnnotationsFailed { id, page, error },
        };
        let _ = tx.send(response);
    };

    tokio::join!(paint, links);
}

pub async fn resolve_link(
    resolver: Arc<DestinationResolver>,
    destination: Destination,
    tx: Sender<EngineResponse>,
) {
    let response = match resolver.resolve_destination(&destination).await {
        Ok(page) => EngineResponse::LinkResolved { page },
        Err(error) => EngineResponse::LinkFailed(error),
    };
    let _ = tx.send(response);
}

/// Send `response` after `delay`
pub async fn timer(delay: Duration, response: EngineResponse, tx: Sender<EngineResponse>) {
    tokio::time::sleep(delay).await;
    let _ = tx.send(response);
}
