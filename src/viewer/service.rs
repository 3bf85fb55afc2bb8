//! Viewer facade - runs effects as tasks and applies their responses
//!
//! The facade owns the state machine, the document session and the raster
//! surface. Effects become tokio tasks tracked in a `JoinSet`; tasks answer
//! over a flume channel and responses are applied here, one at a time, so
//! state is only ever touched from the caller's task.
//!
//! Nothing happens in the background on its own: call [`Viewer::settle`] to
//! drive in-flight work to completion, or [`Viewer::poll_responses`] to
//! apply whatever has already arrived.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use flume::{Receiver, Sender};
use log::{debug, info, warn};
use tokio::task::{AbortHandle, JoinSet};
use tokio::time::Instant;

use super::debounce::ResizeDebouncer;
use super::pipeline::{self, RenderJob};
use super::request::{EngineResponse, ViewerError, ViewerFault};
use super::resolver::DestinationResolver;
use super::state::{Command, Effect, Phase, ViewerState};
use crate::engine::{DocumentSession, RasterSurface, RenderingEngine, SharedSurface};
use crate::settings::{SettingsError, ViewerSettings};

/// Delay before links are re-enabled after a gesture
pub const GESTURE_SETTLE: Duration = Duration::from_millis(1);

type LoadedHook = Box<dyn FnMut()>;
type ChangedHook = Box<dyn FnMut(u32)>;
type FailedHook = Box<dyn FnMut(&ViewerFault)>;
type ExternalLinkHook = Box<dyn FnMut(&str)>;

#[derive(Default)]
struct Hooks {
    loaded: Option<LoadedHook>,
    changed: Option<ChangedHook>,
    failed: Option<FailedHook>,
    external_link: Option<ExternalLinkHook>,
}

/// Configures and starts a [`Viewer`]
pub struct ViewerBuilder {
    engine: Arc<dyn RenderingEngine>,
    settings: ViewerSettings,
    container: Option<(f64, f64)>,
    hooks: Hooks,
}

impl ViewerBuilder {
    #[must_use]
    pub fn new(engine: Arc<dyn RenderingEngine>, settings: ViewerSettings) -> Self {
        Self {
            engine,
            settings,
            container: None,
            hooks: Hooks::default(),
        }
    }

    /// Initial container size; defaults to the placeholder size
    #[must_use]
    pub fn container(mut self, width: f64, height: f64) -> Self {
        self.container = Some((width, height));
        self
    }

    /// Called once, when the first page's geometry is known
    #[must_use]
    pub fn on_loaded(mut self, hook: impl FnMut() + 'static) -> Self {
        self.hooks.loaded = Some(Box::new(hook));
        self
    }

    /// Called with the page number after every accepted navigation
    #[must_use]
    pub fn on_changed(mut self, hook: impl FnMut(u32) + 'static) -> Self {
        self.hooks.changed = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_failed(mut self, hook: impl FnMut(&ViewerFault) + 'static) -> Self {
        self.hooks.failed = Some(Box::new(hook));
        self
    }

    /// Called with the URL when an external link is activated
    #[must_use]
    pub fn on_external_link(mut self, hook: impl FnMut(&str) + 'static) -> Self {
        self.hooks.external_link = Some(Box::new(hook));
        self
    }

    /// Build the viewer and start opening the document.
    ///
    /// Fails if the settings do not validate. Must be called from within a
    /// tokio runtime.
    pub fn build(self) -> Result<Viewer, SettingsError> {
        self.settings.validate()?;
        let (response_tx, response_rx) = flume::unbounded();
        let mut viewer = Viewer {
            state: ViewerState::new(self.settings),
            engine: self.engine,
            session: None,
            resolver: None,
            surface: Arc::new(Mutex::new(RasterSurface::default())),
            response_tx,
            response_rx,
            tasks: JoinSet::new(),
            resize: ResizeDebouncer::default(),
            resize_timer: None,
            hooks: self.hooks,
        };

        if let Some((width, height)) = self.container {
            viewer.apply_command(Command::Resize { width, height });
        }
        viewer.apply_command(Command::Init);
        viewer.apply_command(Command::Open);
        Ok(viewer)
    }
}

/// A single-page document viewer
pub struct Viewer {
    state: ViewerState,
    engine: Arc<dyn RenderingEngine>,
    session: Option<Arc<dyn DocumentSession>>,
    resolver: Option<Arc<DestinationResolver>>,
    surface: SharedSurface,
    response_tx: Sender<EngineResponse>,
    response_rx: Receiver<EngineResponse>,
    tasks: JoinSet<()>,
    resize: ResizeDebouncer,
    /// Only the timer for the latest resize is kept alive
    resize_timer: Option<AbortHandle>,
    hooks: Hooks,
}

impl Viewer {
    #[must_use]
    pub fn builder(engine: Arc<dyn RenderingEngine>, settings: ViewerSettings) -> ViewerBuilder {
        ViewerBuilder::new(engine, settings)
    }

    /// Go to `page`, clamped into the document
    pub fn navigate_to(&mut self, page: i64) -> &mut Self {
        self.apply_command(Command::GoTo(page));
        self
    }

    pub fn previous(&mut self) -> &mut Self {
        self.apply_command(Command::Previous);
        self
    }

    pub fn next(&mut self) -> &mut Self {
        self.apply_command(Command::Next);
        self
    }

    /// Recompute the layout for the current container
    pub fn redraw(&mut self) -> &mut Self {
        self.apply_command(Command::Redraw);
        self
    }

    pub fn zoom_in(&mut self) -> &mut Self {
        self.apply_command(Command::ZoomIn);
        self
    }

    pub fn zoom_out(&mut self) -> &mut Self {
        self.apply_command(Command::ZoomOut);
        self
    }

    /// Feed a user input (tab, link, key, swipe, wheel, pinch) to the viewer
    pub fn dispatch(&mut self, cmd: Command) -> &mut Self {
        self.apply_command(cmd);
        self
    }

    /// Container was resized. With `redraw_on_window_resize` the redraw is
    /// debounced; otherwise the new size only takes effect on the next redraw.
    pub fn resize(&mut self, width: f64, height: f64) -> &mut Self {
        if self.state.settings().redraw_on_window_resize {
            self.resize.queue(width, height, Instant::now());
            if let Some(previous) = self.resize_timer.take() {
                previous.abort();
            }
            self.resize_timer =
                Some(self.spawn_timer(self.resize.delay(), EngineResponse::ResizeElapsed));
        } else {
            self.apply_command(Command::Resize { width, height });
        }
        self
    }

    /// Call a facade method by name
    ///
    /// Getters return `Some(value)`; everything else returns `None`.
    pub fn invoke(&mut self, method: &str, args: &[&str]) -> Result<Option<u32>, ViewerError> {
        match method {
            "goto" | "navigateTo" => {
                let arg = args
                    .first()
                    .ok_or_else(|| ViewerError::invalid_argument(method, "missing page number"))?;
                let page = arg.parse::<i64>().map_err(|e| {
                    ViewerError::invalid_argument(method, format!("{arg:?}: {e}"))
                })?;
                self.navigate_to(page);
                Ok(None)
            }
            "previous" => {
                self.previous();
                Ok(None)
            }
            "next" => {
                self.next();
                Ok(None)
            }
            "redraw" => {
                self.redraw();
                Ok(None)
            }
            "zoomIn" => {
                self.zoom_in();
                Ok(None)
            }
            "zoomOut" => {
                self.zoom_out();
                Ok(None)
            }
            "getPageNumber" | "getCurrentPage" => Ok(Some(self.current_page())),
            "getTotalPages" => Ok(Some(self.total_pages())),
            _ => Err(ViewerError::UnknownMethod(method.to_string())),
        }
    }

    /// Requested page, 0 before the document is loaded
    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.state.current_page()
    }

    /// Page count, 0 before the document is loaded
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        self.state.total_pages()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    #[must_use]
    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// The raster surface pages are painted into
    #[must_use]
    pub fn surface(&self) -> SharedSurface {
        self.surface.clone()
    }

    /// Engine calls and timers still running
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// No engine work or timer is in flight
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty() && self.response_rx.is_empty()
    }

    /// Apply every response that has already arrived
    pub fn poll_responses(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(response) = self.response_rx.try_recv() {
            self.handle_response(response);
            applied += 1;
        }
        while let Some(result) = self.tasks.try_join_next() {
            Self::log_join(result);
        }
        applied
    }

    /// Drive all in-flight work, including work it starts, to completion
    pub async fn settle(&mut self) {
        loop {
            self.poll_responses();
            if self.tasks.is_empty() {
                break;
            }
            if let Some(result) = self.tasks.join_next().await {
                Self::log_join(result);
            }
        }
    }

    /// Tear the viewer down, aborting in-flight engine work
    pub fn destroy(mut self) {
        let in_flight = self.tasks.len();
        self.tasks.abort_all();
        info!("Viewer destroyed, {in_flight} task(s) aborted");
    }

    fn apply_command(&mut self, cmd: Command) {
        let effects = self.state.apply(cmd);
        self.execute_effects(effects);
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::OpenDocument { source } => {
                    info!("Opening {source}");
                    let engine = self.engine.clone();
                    let tx = self.response_tx.clone();
                    self.tasks
                        .spawn(pipeline::open_document(engine, source, tx));
                }

                Effect::RenderPage {
                    id,
                    page,
                    scale,
                    annotations,
                } => {
                    let Some(session) = self.session.clone() else {
                        warn!("Render of page {page} requested without a document");
                        continue;
                    };
                    let job = RenderJob {
                        id,
                        page,
                        scale,
                        annotations,
                    };
                    let tx = self.response_tx.clone();
                    self.tasks
                        .spawn(pipeline::render_page(session, self.surface.clone(), job, tx));
                }

                Effect::ResolveLink(destination) => {
                    let Some(resolver) = self.resolver.clone() else {
                        continue;
                    };
                    let tx = self.response_tx.clone();
                    self.tasks
                        .spawn(pipeline::resolve_link(resolver, destination, tx));
                }

                Effect::OpenExternal(url) => match self.hooks.external_link.as_mut() {
                    Some(hook) => hook(&url),
                    None => info!("External link {url}"),
                },

                Effect::ScheduleSettle => {
                    self.spawn_timer(GESTURE_SETTLE, EngineResponse::Settled);
                }

                Effect::NotifyLoaded => {
                    if let Some(hook) = self.hooks.loaded.as_mut() {
                        hook();
                    }
                }

                Effect::NotifyChanged(page) => {
                    if let Some(hook) = self.hooks.changed.as_mut() {
                        hook(page);
                    }
                }

                Effect::ReportFailure(fault) => {
                    warn!("{fault}");
                    if let Some(hook) = self.hooks.failed.as_mut() {
                        hook(&fault);
                    }
                }
            }
        }
    }

    fn handle_response(&mut self, response: EngineResponse) {
        debug!("Response: {response:?}");
        let cmd = match response {
            EngineResponse::Opened(session) => {
                let total_pages = session.num_pages();
                self.resolver = Some(Arc::new(DestinationResolver::new(session.clone())));
                self.session = Some(session);
                Command::DocumentOpened { total_pages }
            }
            EngineResponse::OpenFailed(error) => Command::OpenFailed(error),
            EngineResponse::Geometry { id, page, viewport } => {
                Command::GeometryReady { id, page, viewport }
            }
            EngineResponse::Annotations {
                id,
                page,
                view,
                viewport,
                annotations,
            } => Command::AnnotationsReady {
                id,
                page,
                view,
                viewport,
                annotations,
            },
            EngineResponse::AnnotationsFailed { id, page, error } => {
                Command::AnnotationsFailed { id, page, error }
            }
            EngineResponse::Painted { id, page } => Command::PaintFinished { id, page },
            EngineResponse::RenderFailed { id, page, error } => {
                Command::RenderFailed { id, page, error }
            }
            EngineResponse::LinkResolved { page } => Command::LinkResolved(page),
            EngineResponse::LinkFailed(error) => Command::LinkFailed(error),
            EngineResponse::Settled => Command::GestureSettled,
            EngineResponse::ResizeElapsed => {
                let Some((width, height)) = self.resize.take_ready(Instant::now()) else {
                    return;
                };
                self.apply_command(Command::Resize { width, height });
                Command::Redraw
            }
        };
        self.apply_command(cmd);
    }

    fn spawn_timer(&mut self, delay: Duration, response: EngineResponse) -> AbortHandle {
        let tx = self.response_tx.clone();
        self.tasks.spawn(pipeline::timer(delay, response, tx))
    }

    fn log_join(result: Result<(), tokio::task::JoinError>) {
        if let Err(e) = result {
            if !e.is_cancelled() {
                warn!("Viewer task failed: {e}");
            }
        }
    }
}
