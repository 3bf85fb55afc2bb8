//! Interaction state machine
//!
//! `ViewerState` owns the phase, the navigation counters and everything
//! derived from them. It never talks to the engine: every input is a
//! [`Command`], and whatever has to happen outside the state comes back as a
//! list of [`Effect`]s for the service to carry out.
//!
//! Only one render pass is ever in flight. Navigation while a pass is
//! running just moves `current_page`; when the pass finishes it compares
//! the page it rendered against `current_page` and starts another pass if
//! they differ, so intermediate targets are never finalized.

use std::fmt;

use log::{debug, info, warn};

use super::layout::ViewportGeometry;
use super::overlay::{LinkOverlay, LinkTarget, build_overlay};
use super::request::{RequestId, ViewerFault};
use super::zoom::Zoom;
use crate::engine::{Annotation, Destination, EngineError, PageViewport};
use crate::settings::ViewerSettings;
use crate::tabs::{TabRail, TabRank};

/// Interaction phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Empty,
    Init,
    Loading,
    Loaded,
    ZoomedIn,
    Rendering,
    /// Document could not be opened or has no pages
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Empty => "empty",
            Phase::Init => "init",
            Phase::Loading => "loading",
            Phase::Loaded => "loaded",
            Phase::ZoomedIn => "zoomedIn",
            Phase::Rendering => "rendering",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Plus,
    Minus,
}

/// What the toolbar shows
#[derive(Clone, Debug, PartialEq)]
pub struct Toolbar {
    pub title: String,
    /// `"current / total"`, empty before load
    pub label: String,
    pub zoom_buttons: bool,
}

/// Inputs to the state machine
#[derive(Clone, Debug)]
pub enum Command {
    /// Chrome is built
    Init,
    /// Issue the document open
    Open,
    DocumentOpened { total_pages: u32 },
    OpenFailed(EngineError),

    /// Navigate to a page; clamped into the document
    GoTo(i64),
    Previous,
    Next,
    TitleClicked,
    TabClicked(usize),
    Key(Key),
    Swipe(SwipeDirection),

    /// Mouse wheel; negative zooms out
    Wheel { delta: f64 },
    ZoomIn,
    ZoomOut,
    PinchChanged { scale: f64 },
    PinchEnded,
    /// Settle timer after a gesture
    GestureSettled,

    /// Container size changed (no redraw on its own)
    Resize { width: f64, height: f64 },
    Redraw,

    GeometryReady {
        id: RequestId,
        page: u32,
        viewport: PageViewport,
    },
    AnnotationsReady {
        id: RequestId,
        page: u32,
        view: [f64; 4],
        viewport: PageViewport,
        annotations: Vec<Annotation>,
    },
    AnnotationsFailed {
        id: RequestId,
        page: u32,
        error: EngineError,
    },
    PaintFinished { id: RequestId, page: u32 },
    RenderFailed {
        id: RequestId,
        page: u32,
        error: EngineError,
    },

    /// Overlay link at this index was activated
    LinkActivated(usize),
    /// Link destination resolved; `None` for unusable destinations
    LinkResolved(Option<u32>),
    LinkFailed(EngineError),
}

/// Work the state asks the service to carry out
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    OpenDocument { source: String },
    /// Start a render pass
    RenderPage {
        id: RequestId,
        page: u32,
        scale: f64,
        annotations: bool,
    },
    ResolveLink(Destination),
    OpenExternal(String),
    /// Fire `GestureSettled` after the settle delay
    ScheduleSettle,
    NotifyLoaded,
    NotifyChanged(u32),
    ReportFailure(ViewerFault),
}

/// State of one viewer
#[derive(Clone, Debug)]
pub struct ViewerState {
    settings: ViewerSettings,
    tabs: TabRail,
    phase: Phase,

    total_pages: u32,
    /// Requested page
    current_page: u32,
    /// Page of the pass in flight or last completed; 0 for none
    rendering_page: u32,
    /// Last page whose render pass was finalized
    displayed_page: u32,
    completed_renders: u64,

    links_disabled: bool,
    zoom: Zoom,

    container: (f64, f64),
    surface_size: Option<(u32, u32)>,
    layout: ViewportGeometry,
    revealed: bool,
    overlay: Vec<LinkOverlay>,

    current_request: Option<RequestId>,
    next_request_id: u64,
    loaded_notified: bool,
}

impl ViewerState {
    #[must_use]
    pub fn new(settings: ViewerSettings) -> Self {
        let tabs = TabRail::layout(&settings.tabs, &settings.tabs_color);
        let container = (settings.loading_width, settings.loading_height);
        Self {
            settings,
            tabs,
            phase: Phase::Empty,
            total_pages: 0,
            current_page: 0,
            rendering_page: 0,
            displayed_page: 0,
            completed_renders: 0,
            links_disabled: false,
            zoom: Zoom::new(),
            container,
            surface_size: None,
            layout: ViewportGeometry::default(),
            revealed: false,
            overlay: Vec::new(),
            current_request: None,
            next_request_id: 1,
            loaded_notified: false,
        }
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Init => {
                if self.phase == Phase::Empty {
                    self.phase = Phase::Init;
                    self.redraw();
                }
                vec![]
            }

            Command::Open => self.open(),

            Command::DocumentOpened { total_pages } => {
                if self.phase != Phase::Loading {
                    return vec![];
                }
                if total_pages < 1 {
                    warn!("Document has no pages");
                    self.phase = Phase::Failed;
                    return vec![Effect::ReportFailure(ViewerFault::EmptyDocument)];
                }
                info!("Document loaded, {total_pages} pages");
                self.total_pages = total_pages;
                self.phase = Phase::Loaded;
                self.go_to(1)
            }

            Command::OpenFailed(error) => {
                if self.phase != Phase::Loading {
                    return vec![];
                }
                warn!("Open failed: {error}");
                self.phase = Phase::Failed;
                vec![Effect::ReportFailure(ViewerFault::Open(error))]
            }

            Command::GoTo(page) => self.go_to(page),
            Command::Previous => self.go_to(i64::from(self.current_page) - 1),
            Command::Next => self.go_to(i64::from(self.current_page) + 1),
            Command::TitleClicked => self.go_to(1),

            Command::TabClicked(index) => {
                let Some(page) = self.tabs.get(index).map(|tab| tab.page) else {
                    return vec![];
                };
                if page == self.rendering_page {
                    self.go_to(i64::from(page) - 1)
                } else {
                    self.go_to(i64::from(page))
                }
            }

            Command::Key(key) => {
                if self.settings.disable_keys {
                    return vec![];
                }
                match key {
                    Key::Left => self.apply(Command::Previous),
                    Key::Right => self.apply(Command::Next),
                    Key::Plus => self.zoom_in(),
                    Key::Minus => self.zoom_out(),
                }
            }

            Command::Swipe(direction) => {
                if self.settings.disable_swipe || self.phase != Phase::Loaded {
                    return vec![];
                }
                self.links_disabled = true;
                let mut effects = vec![Effect::ScheduleSettle];
                let target = match direction {
                    SwipeDirection::Right => i64::from(self.current_page) - 1,
                    SwipeDirection::Left => i64::from(self.current_page) + 1,
                };
                effects.extend(self.go_to(target));
                effects
            }

            Command::Wheel { delta } => {
                if delta < 0.0 {
                    self.zoom_out()
                } else {
                    self.zoom_in()
                }
            }
            Command::ZoomIn => self.zoom_in(),
            Command::ZoomOut => self.zoom_out(),

            Command::PinchChanged { scale } => {
                if self.settings.disable_zoom || !self.is_interactive() {
                    return vec![];
                }
                self.zoom.set_factor(scale);
                self.zoom.pan_enabled = true;
                self.links_disabled = true;
                self.phase = Phase::ZoomedIn;
                vec![]
            }

            Command::PinchEnded => {
                if self.settings.disable_zoom {
                    return vec![];
                }
                vec![Effect::ScheduleSettle]
            }

            Command::GestureSettled => {
                self.links_disabled = false;
                if self.phase == Phase::ZoomedIn && self.zoom.is_unity() {
                    self.reset_zoom();
                }
                vec![]
            }

            Command::Resize { width, height } => {
                self.container = (width, height);
                vec![]
            }

            Command::Redraw => {
                self.redraw();
                vec![]
            }

            Command::GeometryReady { id, page, viewport } => {
                if !self.is_current(id) {
                    return vec![];
                }
                self.surface_size = Some(viewport.pixel_size());
                self.overlay.clear();
                self.redraw();
                self.revealed = true;

                let mut effects = vec![];
                if !self.loaded_notified {
                    self.loaded_notified = true;
                    effects.push(Effect::NotifyLoaded);
                }
                if page == self.current_page {
                    effects.push(Effect::NotifyChanged(page));
                } else {
                    debug!("Page {page} superseded by {}", self.current_page);
                }
                effects
            }

            Command::AnnotationsReady {
                id,
                page,
                view,
                viewport,
                annotations,
            } => {
                if self.is_current(id) {
                    self.overlay = build_overlay(&annotations, view, &viewport);
                    debug!("Page {page}: {} link(s)", self.overlay.len());
                }
                vec![]
            }

            Command::AnnotationsFailed { id, page, error } => {
                if !self.is_current(id) {
                    return vec![];
                }
                vec![Effect::ReportFailure(ViewerFault::Annotations { page, error })]
            }

            Command::PaintFinished { id, page } => {
                if !self.is_current(id) {
                    return vec![];
                }
                if self.phase == Phase::Rendering {
                    self.phase = Phase::Loaded;
                }
                if self.current_page != self.rendering_page {
                    debug!(
                        "Discarding render of page {page}, page {} requested meanwhile",
                        self.current_page
                    );
                    return self.render_page();
                }
                self.displayed_page = page;
                self.completed_renders += 1;
                vec![]
            }

            Command::RenderFailed { id, page, error } => {
                if !self.is_current(id) {
                    return vec![];
                }
                warn!("Render of page {page} failed: {error}");
                if self.phase == Phase::Rendering {
                    self.phase = Phase::Loaded;
                }
                self.rendering_page = 0;
                // the surface no longer shows the page these links belong to
                self.current_request = None;
                self.overlay.clear();
                let mut effects = vec![Effect::ReportFailure(ViewerFault::Render { page, error })];
                if self.current_page != page {
                    effects.extend(self.render_page());
                }
                effects
            }

            Command::LinkActivated(index) => {
                if !self.links_enabled() {
                    return vec![];
                }
                match self.overlay.get(index).map(|link| &link.target) {
                    Some(LinkTarget::External { url }) => vec![Effect::OpenExternal(url.clone())],
                    Some(LinkTarget::Internal { destination }) => {
                        vec![Effect::ResolveLink(destination.clone())]
                    }
                    None => vec![],
                }
            }

            Command::LinkResolved(page) => match page {
                Some(page) if self.links_enabled() => self.go_to(i64::from(page)),
                Some(page) => {
                    debug!("Ignoring link to page {page}, viewer is {}", self.phase);
                    vec![]
                }
                None => vec![],
            },

            Command::LinkFailed(error) => {
                vec![Effect::ReportFailure(ViewerFault::Link(error))]
            }
        }
    }

    fn open(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Init {
            return vec![];
        }
        match self.settings.source.clone().filter(|s| !s.is_empty()) {
            Some(source) => {
                self.phase = Phase::Loading;
                vec![Effect::OpenDocument { source }]
            }
            None => {
                warn!("No document source configured");
                self.phase = Phase::Failed;
                vec![Effect::ReportFailure(ViewerFault::MissingSource)]
            }
        }
    }

    fn go_to(&mut self, page: i64) -> Vec<Effect> {
        if !matches!(
            self.phase,
            Phase::Loaded | Phase::ZoomedIn | Phase::Rendering
        ) {
            return vec![];
        }
        self.current_page = page.clamp(1, i64::from(self.total_pages)) as u32;
        self.render_page()
    }

    fn render_page(&mut self) -> Vec<Effect> {
        if !self.is_interactive() || self.current_page == self.rendering_page {
            return vec![];
        }
        if self.phase == Phase::ZoomedIn {
            self.reset_zoom();
        }
        self.phase = Phase::Rendering;
        self.rendering_page = self.current_page;

        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        self.current_request = Some(id);
        debug!("Rendering page {} ({id:?})", self.rendering_page);

        vec![Effect::RenderPage {
            id,
            page: self.rendering_page,
            scale: self.settings.render_scale(),
            annotations: !self.settings.disable_links,
        }]
    }

    fn zoom_in(&mut self) -> Vec<Effect> {
        if self.settings.disable_zoom || !self.is_interactive() {
            return vec![];
        }
        self.zoom.step_in();
        self.zoom.pan_enabled = true;
        self.phase = Phase::ZoomedIn;
        self.links_disabled = false;
        vec![]
    }

    fn zoom_out(&mut self) -> Vec<Effect> {
        if self.settings.disable_zoom || self.phase != Phase::ZoomedIn {
            return vec![];
        }
        self.zoom.step_out();
        self.links_disabled = false;
        if self.zoom.is_unity() {
            self.reset_zoom();
        }
        vec![]
    }

    fn reset_zoom(&mut self) {
        if self.settings.disable_zoom {
            return;
        }
        self.zoom.reset();
        self.links_disabled = false;
        if self.phase == Phase::ZoomedIn {
            self.phase = Phase::Loaded;
        }
    }

    fn redraw(&mut self) {
        let content = match self.surface_size {
            Some((width, height)) if !matches!(self.phase, Phase::Empty | Phase::Init) => (
                f64::from(width) / self.settings.quality,
                f64::from(height) / self.settings.quality,
            ),
            _ => (self.settings.loading_width, self.settings.loading_height),
        };
        self.layout = ViewportGeometry::compute(self.container, content, self.tabs.width());
    }

    fn is_interactive(&self) -> bool {
        matches!(self.phase, Phase::Loaded | Phase::ZoomedIn)
    }

    fn links_enabled(&self) -> bool {
        !self.settings.disable_links && self.is_interactive() && !self.links_disabled
    }

    fn is_current(&self, id: RequestId) -> bool {
        let current = self.current_request == Some(id);
        if !current {
            debug!("Dropping response for superseded {id:?}");
        }
        current
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    /// Requested page, 0 before load
    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    #[must_use]
    pub fn rendering_page(&self) -> u32 {
        self.rendering_page
    }

    /// Last page whose render pass was finalized, 0 for none
    #[must_use]
    pub fn displayed_page(&self) -> u32 {
        self.displayed_page
    }

    /// Number of render passes that were finalized as displayed
    #[must_use]
    pub fn completed_renders(&self) -> u64 {
        self.completed_renders
    }

    #[must_use]
    pub fn links_disabled(&self) -> bool {
        self.links_disabled
    }

    #[must_use]
    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    #[must_use]
    pub fn container(&self) -> (f64, f64) {
        self.container
    }

    #[must_use]
    pub fn layout(&self) -> &ViewportGeometry {
        &self.layout
    }

    /// Raster and tabs are visible once the first page geometry is known
    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Scale the raster surface is displayed at
    #[must_use]
    pub fn raster_scale(&self) -> f64 {
        1.0 / self.settings.quality
    }

    #[must_use]
    pub fn overlay(&self) -> &[LinkOverlay] {
        &self.overlay
    }

    #[must_use]
    pub fn tabs(&self) -> &TabRail {
        &self.tabs
    }

    #[must_use]
    pub fn tab_ranks(&self) -> Vec<TabRank> {
        self.tabs.rank(self.current_page)
    }

    /// `None` when the toolbar is hidden
    #[must_use]
    pub fn toolbar(&self) -> Option<Toolbar> {
        self.settings.show_toolbar.then(|| Toolbar {
            title: self.settings.title.clone(),
            label: self.page_label(),
            zoom_buttons: !self.settings.disable_zoom,
        })
    }

    /// Placeholder text until the first page is shown
    #[must_use]
    pub fn loading_message(&self) -> Option<&str> {
        (!self.revealed).then_some(self.settings.loading_html.as_str())
    }

    /// Page-count readout, empty before the document is loaded
    #[must_use]
    pub fn page_label(&self) -> String {
        if self.total_pages == 0 {
            String::new()
        } else {
            format!("{} / {}", self.current_page, self.total_pages)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DestinationItem, PageRef};
    use crate::tabs::TabDescriptor;

    const VIEW: [f64; 4] = [0.0, 0.0, 595.0, 841.0];

    fn settings() -> ViewerSettings {
        ViewerSettings::for_source("doc")
    }

    fn render_effect(effects: &[Effect]) -> Option<(RequestId, u32)> {
        effects.iter().find_map(|e| match e {
            Effect::RenderPage { id, page, .. } => Some((*id, *page)),
            _ => None,
        })
    }

    fn geometry(state: &mut ViewerState, id: RequestId, page: u32) -> Vec<Effect> {
        state.apply(Command::GeometryReady {
            id,
            page,
            viewport: PageViewport::new(VIEW, 2.0),
        })
    }

    fn complete(state: &mut ViewerState, effects: &[Effect]) -> Vec<Effect> {
        let (id, page) = render_effect(effects).expect("render effect");
        let mut out = geometry(state, id, page);
        out.extend(state.apply(Command::PaintFinished { id, page }));
        out
    }

    fn loaded_with(settings: ViewerSettings, total_pages: u32) -> ViewerState {
        let mut state = ViewerState::new(settings);
        let _ = state.apply(Command::Init);
        let _ = state.apply(Command::Open);
        let effects = state.apply(Command::DocumentOpened { total_pages });
        let _ = complete(&mut state, &effects);
        state
    }

    fn loaded(total_pages: u32) -> ViewerState {
        loaded_with(settings(), total_pages)
    }

    #[test]
    fn open_then_first_page() {
        let mut state = ViewerState::new(settings());
        assert_eq!(state.phase(), Phase::Empty);

        assert!(state.apply(Command::Init).is_empty());
        assert_eq!(state.phase(), Phase::Init);
        assert!(state.apply(Command::Init).is_empty());
        assert_eq!(state.phase(), Phase::Init);

        let effects = state.apply(Command::Open);
        assert_eq!(
            effects,
            vec![Effect::OpenDocument {
                source: "doc".to_string()
            }]
        );
        assert_eq!(state.phase(), Phase::Loading);

        let effects = state.apply(Command::DocumentOpened { total_pages: 3 });
        assert_eq!(state.phase(), Phase::Rendering);
        assert!(matches!(
            effects.as_slice(),
            [Effect::RenderPage { page: 1, scale, annotations: true, .. }] if *scale == 2.0
        ));

        let effects = complete(&mut state, &effects);
        assert_eq!(effects, vec![Effect::NotifyLoaded, Effect::NotifyChanged(1)]);
        assert_eq!(state.phase(), Phase::Loaded);
        assert_eq!(state.displayed_page(), 1);
        assert_eq!(state.page_label(), "1 / 3");
        assert!(state.is_revealed());
    }

    #[test]
    fn toolbar_follows_settings() {
        let mut state = ViewerState::new(settings());
        assert_eq!(state.loading_message(), Some("Loading PDF"));

        let toolbar = state.toolbar().unwrap();
        assert_eq!(toolbar.title, "TouchPDF");
        assert_eq!(toolbar.label, "");
        assert!(toolbar.zoom_buttons);

        state = loaded(4);
        assert_eq!(state.loading_message(), None);
        assert_eq!(state.toolbar().unwrap().label, "1 / 4");

        let mut hidden = settings();
        hidden.show_toolbar = false;
        hidden.disable_zoom = true;
        assert_eq!(ViewerState::new(hidden.clone()).toolbar(), None);
        hidden.show_toolbar = true;
        assert!(!ViewerState::new(hidden).toolbar().unwrap().zoom_buttons);
    }

    #[test]
    fn zero_pages_is_a_reported_failure() {
        let mut state = ViewerState::new(settings());
        let _ = state.apply(Command::Init);
        let _ = state.apply(Command::Open);
        let effects = state.apply(Command::DocumentOpened { total_pages: 0 });

        assert_eq!(state.phase(), Phase::Failed);
        assert_eq!(effects, vec![Effect::ReportFailure(ViewerFault::EmptyDocument)]);
        assert!(state.apply(Command::GoTo(1)).is_empty());
    }

    #[test]
    fn missing_source_fails_without_opening() {
        let mut state = ViewerState::new(ViewerSettings::default());
        let _ = state.apply(Command::Init);
        let effects = state.apply(Command::Open);

        assert_eq!(state.phase(), Phase::Failed);
        assert_eq!(effects, vec![Effect::ReportFailure(ViewerFault::MissingSource)]);
    }

    #[test]
    fn navigation_is_ignored_before_load() {
        let mut state = ViewerState::new(settings());
        let _ = state.apply(Command::Init);
        let _ = state.apply(Command::Open);
        assert!(state.apply(Command::GoTo(3)).is_empty());
        assert_eq!(state.current_page(), 0);
        assert_eq!(state.page_label(), "");
    }

    #[test]
    fn navigation_targets_are_clamped() {
        let mut state = loaded(5);

        let effects = state.apply(Command::GoTo(99));
        assert_eq!(state.current_page(), 5);
        let _ = complete(&mut state, &effects);

        let effects = state.apply(Command::GoTo(-3));
        assert_eq!(state.current_page(), 1);
        let _ = complete(&mut state, &effects);

        assert!(state.apply(Command::Previous).is_empty());
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn same_page_does_not_render() {
        let mut state = loaded(5);
        assert!(state.apply(Command::GoTo(1)).is_empty());
        assert!(state.apply(Command::TitleClicked).is_empty());
        assert_eq!(state.phase(), Phase::Loaded);
    }

    #[test]
    fn rapid_navigation_finalizes_only_the_last_page() {
        let mut state = loaded(10);
        let before = state.completed_renders();

        let first = state.apply(Command::GoTo(2));
        assert_eq!(render_effect(&first).map(|(_, p)| p), Some(2));
        assert!(state.apply(Command::GoTo(3)).is_empty());
        assert!(state.apply(Command::GoTo(4)).is_empty());
        assert_eq!(state.phase(), Phase::Rendering);

        let effects = complete(&mut state, &first);
        assert!(!effects.iter().any(|e| matches!(e, Effect::NotifyChanged(_))));
        assert_eq!(render_effect(&effects).map(|(_, p)| p), Some(4));
        assert_eq!(state.completed_renders(), before);
        assert_eq!(state.displayed_page(), 1);

        let effects = complete(&mut state, &effects);
        assert_eq!(effects, vec![Effect::NotifyChanged(4)]);
        assert_eq!(state.completed_renders(), before + 1);
        assert_eq!(state.displayed_page(), 4);
        assert_eq!(state.phase(), Phase::Loaded);
    }

    #[test]
    fn navigating_back_during_render_settles_without_rerender() {
        let mut state = loaded(10);
        let first = state.apply(Command::GoTo(2));
        let _ = state.apply(Command::GoTo(7));
        let _ = state.apply(Command::GoTo(2));

        let effects = complete(&mut state, &first);
        assert_eq!(effects, vec![Effect::NotifyChanged(2)]);
        assert_eq!(state.displayed_page(), 2);
    }

    #[test]
    fn responses_for_superseded_requests_are_dropped() {
        let mut state = loaded(5);
        let first = state.apply(Command::GoTo(2));
        let (old_id, _) = render_effect(&first).unwrap();
        let _ = complete(&mut state, &first);
        let second = state.apply(Command::GoTo(3));

        assert!(state.apply(Command::PaintFinished { id: old_id, page: 2 }).is_empty());
        assert_eq!(state.phase(), Phase::Rendering);
        let _ = complete(&mut state, &second);
        assert_eq!(state.displayed_page(), 3);
    }

    #[test]
    fn zoom_in_and_back_out_resets() {
        let mut state = loaded(3);
        let _ = state.apply(Command::ZoomIn);
        assert_eq!(state.phase(), Phase::ZoomedIn);
        assert!(state.zoom().pan_enabled);
        assert_eq!(state.zoom().factor, 1.25);

        let _ = state.apply(Command::ZoomOut);
        assert_eq!(state.phase(), Phase::Loaded);
        assert!(!state.zoom().pan_enabled);
        assert!(state.zoom().is_unity());
    }

    #[test]
    fn zoom_out_only_applies_when_zoomed() {
        let mut state = loaded(3);
        let _ = state.apply(Command::ZoomOut);
        assert_eq!(state.phase(), Phase::Loaded);

        let _ = state.apply(Command::Wheel { delta: 120.0 });
        let _ = state.apply(Command::Wheel { delta: 120.0 });
        assert_eq!(state.zoom().factor, 1.5);
        let _ = state.apply(Command::Wheel { delta: -120.0 });
        assert_eq!(state.zoom().factor, 1.25);
        assert_eq!(state.phase(), Phase::ZoomedIn);
    }

    #[test]
    fn zoom_is_inert_when_disabled() {
        let mut settings = settings();
        settings.disable_zoom = true;
        let mut state = loaded_with(settings, 3);

        let _ = state.apply(Command::ZoomIn);
        let _ = state.apply(Command::PinchChanged { scale: 1.8 });
        assert_eq!(state.phase(), Phase::Loaded);
        assert!(state.zoom().is_unity());
    }

    #[test]
    fn navigation_while_zoomed_resets_zoom_first() {
        let mut state = loaded(3);
        let _ = state.apply(Command::ZoomIn);
        let effects = state.apply(Command::Next);

        assert_eq!(render_effect(&effects).map(|(_, p)| p), Some(2));
        assert!(state.zoom().is_unity());
        assert!(!state.zoom().pan_enabled);
        let _ = complete(&mut state, &effects);
        assert_eq!(state.phase(), Phase::Loaded);
    }

    #[test]
    fn swipe_navigates_only_when_loaded() {
        let mut state = loaded(3);
        let effects = state.apply(Command::Swipe(SwipeDirection::Left));
        assert_eq!(effects[0], Effect::ScheduleSettle);
        assert_eq!(render_effect(&effects).map(|(_, p)| p), Some(2));
        assert!(state.links_disabled());

        assert!(state.apply(Command::Swipe(SwipeDirection::Left)).is_empty());
        let _ = complete(&mut state, &effects);
        let _ = state.apply(Command::GestureSettled);
        assert!(!state.links_disabled());

        let _ = state.apply(Command::ZoomIn);
        assert!(state.apply(Command::Swipe(SwipeDirection::Right)).is_empty());
        assert_eq!(state.current_page(), 2);
    }

    #[test]
    fn pinch_disables_links_until_settled() {
        let mut state = loaded(3);
        let _ = state.apply(Command::PinchChanged { scale: 1.6 });
        assert_eq!(state.phase(), Phase::ZoomedIn);
        assert!(state.links_disabled());
        assert!(state.zoom().pan_enabled);

        assert_eq!(state.apply(Command::PinchEnded), vec![Effect::ScheduleSettle]);
        let _ = state.apply(Command::GestureSettled);
        assert!(!state.links_disabled());
        assert_eq!(state.phase(), Phase::ZoomedIn);

        let _ = state.apply(Command::PinchChanged { scale: 1.0 });
        let _ = state.apply(Command::PinchEnded);
        let _ = state.apply(Command::GestureSettled);
        assert_eq!(state.phase(), Phase::Loaded);
        assert!(!state.zoom().pan_enabled);
    }

    #[test]
    fn keys_map_to_navigation_and_zoom() {
        let mut state = loaded(3);
        let effects = state.apply(Command::Key(Key::Right));
        assert_eq!(state.current_page(), 2);
        let _ = complete(&mut state, &effects);

        let _ = state.apply(Command::Key(Key::Plus));
        assert_eq!(state.phase(), Phase::ZoomedIn);
        let _ = state.apply(Command::Key(Key::Minus));
        assert_eq!(state.phase(), Phase::Loaded);

        let effects = state.apply(Command::Key(Key::Left));
        assert_eq!(render_effect(&effects).map(|(_, p)| p), Some(1));
    }

    #[test]
    fn keys_are_ignored_when_disabled() {
        let mut settings = settings();
        settings.disable_keys = true;
        let mut state = loaded_with(settings, 3);
        assert!(state.apply(Command::Key(Key::Right)).is_empty());
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn clicking_the_current_tab_steps_back() {
        let mut settings = settings();
        settings.tabs = vec![TabDescriptor::new(3, "A"), TabDescriptor::new(6, "B")];
        let mut state = loaded_with(settings, 8);

        let effects = state.apply(Command::TabClicked(0));
        assert_eq!(state.current_page(), 3);
        let _ = complete(&mut state, &effects);
        assert!(!state.tab_ranks()[0].right);
        assert!(state.tab_ranks()[1].right);

        let effects = state.apply(Command::TabClicked(0));
        assert_eq!(render_effect(&effects).map(|(_, p)| p), Some(2));
        assert!(state.apply(Command::TabClicked(9)).is_empty());
    }

    fn with_link(state: &mut ViewerState, target_ref: u32) -> RequestId {
        let effects = state.apply(Command::GoTo(2));
        let (id, page) = render_effect(&effects).unwrap();
        let _ = geometry(state, id, page);
        let _ = state.apply(Command::AnnotationsReady {
            id,
            page,
            view: VIEW,
            viewport: PageViewport::new(VIEW, 2.0),
            annotations: vec![Annotation {
                subtype: "Link".to_string(),
                rect: [10.0, 10.0, 50.0, 30.0],
                url: None,
                dest: Some(Destination::Explicit(vec![DestinationItem::Ref(
                    PageRef::new(target_ref, 0),
                )])),
            }],
        });
        let _ = state.apply(Command::PaintFinished { id, page });
        id
    }

    #[test]
    fn internal_link_resolves_then_navigates() {
        let mut state = loaded(5);
        let _ = with_link(&mut state, 4);
        assert_eq!(state.overlay().len(), 1);

        let effects = state.apply(Command::LinkActivated(0));
        assert!(matches!(effects.as_slice(), [Effect::ResolveLink(_)]));

        let effects = state.apply(Command::LinkResolved(Some(4)));
        assert_eq!(render_effect(&effects).map(|(_, p)| p), Some(4));
    }

    #[test]
    fn link_resolution_rechecks_state() {
        let mut state = loaded(5);
        let _ = with_link(&mut state, 4);
        let _ = state.apply(Command::LinkActivated(0));

        let _ = state.apply(Command::Next);
        assert_eq!(state.phase(), Phase::Rendering);
        assert!(state.apply(Command::LinkResolved(Some(4))).is_empty());
        assert_eq!(state.current_page(), 3);
    }

    #[test]
    fn links_are_suppressed_during_gestures() {
        let mut state = loaded(5);
        let _ = with_link(&mut state, 4);
        let _ = state.apply(Command::PinchChanged { scale: 1.5 });
        assert!(state.apply(Command::LinkActivated(0)).is_empty());

        let _ = state.apply(Command::GestureSettled);
        assert_eq!(state.apply(Command::LinkActivated(0)).len(), 1);
    }

    #[test]
    fn gesture_started_while_resolving_blocks_navigation() {
        let mut state = loaded(5);
        let _ = with_link(&mut state, 4);
        let effects = state.apply(Command::LinkActivated(0));
        assert!(matches!(effects.as_slice(), [Effect::ResolveLink(_)]));

        let _ = state.apply(Command::PinchChanged { scale: 1.5 });
        assert_eq!(state.phase(), Phase::ZoomedIn);
        assert!(state.apply(Command::LinkResolved(Some(4))).is_empty());
        assert_eq!(state.current_page(), 2);
        assert_eq!(state.rendering_page(), 2);
    }

    #[test]
    fn failed_paint_drops_the_pages_links() {
        let mut state = loaded(5);
        let effects = state.apply(Command::GoTo(2));
        let (id, page) = render_effect(&effects).unwrap();
        let _ = geometry(&mut state, id, page);
        let annotations = || Command::AnnotationsReady {
            id,
            page,
            view: VIEW,
            viewport: PageViewport::new(VIEW, 2.0),
            annotations: vec![Annotation {
                subtype: "Link".to_string(),
                rect: [10.0, 10.0, 50.0, 30.0],
                url: None,
                dest: Some(Destination::Explicit(vec![DestinationItem::Ref(
                    PageRef::new(5, 0),
                )])),
            }],
        };
        let _ = state.apply(annotations());
        assert_eq!(state.overlay().len(), 1);

        let _ = state.apply(Command::RenderFailed {
            id,
            page,
            error: EngineError::generic("paint failed"),
        });
        assert!(state.overlay().is_empty());
        assert_eq!(state.displayed_page(), 1);

        // annotations that land after the failure are dropped too
        let _ = state.apply(annotations());
        assert!(state.overlay().is_empty());
        assert!(state.apply(Command::LinkActivated(0)).is_empty());
    }

    #[test]
    fn tabless_layout_reserves_the_base_rail() {
        let mut state = ViewerState::new(settings());
        let _ = state.apply(Command::Resize {
            width: 600.0,
            height: 2000.0,
        });
        let _ = state.apply(Command::Init);

        assert_eq!(state.layout().rail_width, 41.0);
        assert!((state.layout().scale - 600.0 / 679.0).abs() < 1e-12);
    }

    #[test]
    fn unusable_destination_leaves_page_alone() {
        let mut state = loaded(5);
        let _ = with_link(&mut state, 4);
        assert!(state.apply(Command::LinkResolved(None)).is_empty());
        assert_eq!(state.current_page(), 2);
    }

    #[test]
    fn render_failure_is_reported_and_retryable() {
        let mut state = loaded(5);
        let effects = state.apply(Command::GoTo(3));
        let (id, _) = render_effect(&effects).unwrap();

        let effects = state.apply(Command::RenderFailed {
            id,
            page: 3,
            error: EngineError::generic("corrupt page"),
        });
        assert!(matches!(
            effects.as_slice(),
            [Effect::ReportFailure(ViewerFault::Render { page: 3, .. })]
        ));
        assert_eq!(state.phase(), Phase::Loaded);

        let retry = state.apply(Command::GoTo(3));
        assert_eq!(render_effect(&retry).map(|(_, p)| p), Some(3));
    }

    #[test]
    fn placeholder_size_is_used_until_a_page_is_known() {
        let mut settings = settings();
        settings.loading_width = 400.0;
        settings.loading_height = 500.0;
        let mut state = ViewerState::new(settings);
        let _ = state.apply(Command::Resize {
            width: 1000.0,
            height: 1000.0,
        });
        let _ = state.apply(Command::Init);
        assert_eq!(state.layout().content_width, 400.0);

        let _ = state.apply(Command::Open);
        let effects = state.apply(Command::DocumentOpened { total_pages: 1 });
        let (id, page) = render_effect(&effects).unwrap();
        let _ = state.apply(Command::GeometryReady {
            id,
            page,
            viewport: PageViewport::new([0.0, 0.0, 612.0, 792.0], 2.0),
        });
        assert_eq!(state.layout().content_width, 612.0);
        assert_eq!(state.layout().content_height, 792.0);
    }

    #[test]
    fn resize_waits_for_redraw() {
        let mut state = loaded(2);
        let before = *state.layout();
        let _ = state.apply(Command::Resize {
            width: 300.0,
            height: 400.0,
        });
        assert_eq!(*state.layout(), before);

        let _ = state.apply(Command::Redraw);
        assert!(state.layout().scale < before.scale);
    }
}
