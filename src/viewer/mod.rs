//! Viewer core: state machine, render pipeline and facade

pub mod debounce;
pub mod layout;
pub mod overlay;
pub mod pipeline;
pub mod request;
pub mod resolver;
pub mod service;
pub mod state;
pub mod zoom;

pub use layout::ViewportGeometry;
pub use overlay::{LinkOverlay, LinkTarget};
pub use request::{EngineResponse, RequestId, ViewerError, ViewerFault};
pub use resolver::DestinationResolver;
pub use service::{Viewer, ViewerBuilder};
pub use state::{Command, Effect, Key, Phase, SwipeDirection, Toolbar, ViewerState};
pub use zoom::Zoom;
