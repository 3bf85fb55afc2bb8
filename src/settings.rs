use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::tabs::TabDescriptor;

const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "binderview";

/// Errors loading or validating settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid setting {field}: {detail}")]
    Invalid { field: &'static str, detail: String },
}

/// Viewer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerSettings {
    /// Document locator handed to the rendering engine
    #[serde(default)]
    pub source: Option<String>,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tabs: Vec<TabDescriptor>,

    #[serde(default = "default_tabs_color", alias = "tabsColor")]
    pub tabs_color: String,

    #[serde(default, alias = "disableZoom")]
    pub disable_zoom: bool,

    #[serde(default, alias = "disableSwipe")]
    pub disable_swipe: bool,

    #[serde(default, alias = "disableLinks")]
    pub disable_links: bool,

    #[serde(default, alias = "disableKeys")]
    pub disable_keys: bool,

    #[serde(default = "default_true", alias = "redrawOnWindowResize")]
    pub redraw_on_window_resize: bool,

    /// Ratio between document units and display pixels
    #[serde(default = "default_pdf_scale", alias = "pdfScale")]
    pub pdf_scale: f64,

    /// Raster oversampling; 2 keeps pages sharp up to 200% zoom
    #[serde(default = "default_quality")]
    pub quality: f64,

    #[serde(default = "default_true", alias = "showToolbar")]
    pub show_toolbar: bool,

    #[serde(default = "default_loading_html", alias = "loadingHTML", alias = "loadingHtml")]
    pub loading_html: String,

    #[serde(default = "default_loading_height", alias = "loadingHeight")]
    pub loading_height: f64,

    #[serde(default = "default_loading_width", alias = "loadingWidth")]
    pub loading_width: f64,
}

fn default_true() -> bool {
    true
}

fn default_title() -> String {
    "TouchPDF".to_string()
}

fn default_tabs_color() -> String {
    "beige".to_string()
}

fn default_pdf_scale() -> f64 {
    1.0
}

fn default_quality() -> f64 {
    2.0
}

fn default_loading_html() -> String {
    "Loading PDF".to_string()
}

fn default_loading_height() -> f64 {
    841.0
}

fn default_loading_width() -> f64 {
    595.0
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            source: None,
            title: default_title(),
            tabs: Vec::new(),
            tabs_color: default_tabs_color(),
            disable_zoom: false,
            disable_swipe: false,
            disable_links: false,
            disable_keys: false,
            redraw_on_window_resize: true,
            pdf_scale: default_pdf_scale(),
            quality: default_quality(),
            show_toolbar: true,
            loading_html: default_loading_html(),
            loading_height: default_loading_height(),
            loading_width: default_loading_width(),
        }
    }
}

impl ViewerSettings {
    /// Settings for `source` with everything else at defaults
    #[must_use]
    pub fn for_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    /// Read settings from a YAML file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self =
            serde_yaml::from_str(&content).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Reject values the viewer cannot lay out with
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (field, value) in [
            ("quality", self.quality),
            ("pdf_scale", self.pdf_scale),
            ("loading_height", self.loading_height),
            ("loading_width", self.loading_width),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SettingsError::Invalid {
                    field,
                    detail: format!("must be a positive number, got {value}"),
                });
            }
        }
        Ok(())
    }

    /// Scale pages are rasterized at
    #[must_use]
    pub fn render_scale(&self) -> f64 {
        self.pdf_scale * self.quality
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Default location of the settings file
#[must_use]
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}
