// Export modules for use in tests
pub mod engine;
pub mod input;
pub mod panic_handler;
pub mod settings;
pub mod tabs;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use engine::manifest::{DocumentManifest, ManifestEngine};
pub use engine::{EngineError, RenderingEngine};
pub use settings::{SettingsError, ViewerSettings};
pub use tabs::TabDescriptor;
pub use viewer::{Command, Phase, Viewer, ViewerBuilder, ViewerError, ViewerFault};
