//! Viewport scaler
//!
//! Fits the page, the toolbar and both tab rails into the container with a
//! single uniform scale that never exceeds 1, then centres the result
//! horizontally.

/// Height of the toolbar strip above the page
pub const TOOLBAR_HEIGHT: f64 = 30.0;
/// Border around the page
pub const BORDER_WIDTH: f64 = 1.0;
/// Minimum swipe distance at scale 1
pub const SWIPE_THRESHOLD: f64 = 75.0;

/// Derived layout of the viewer for one container size and page size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewportGeometry {
    /// Uniform scale applied to the outer container
    pub scale: f64,
    /// Page content size in layout pixels (raster size / quality)
    pub content_width: f64,
    pub content_height: f64,
    /// Unscaled outer container size (page + borders + toolbar)
    pub outer_width: f64,
    pub outer_height: f64,
    /// Horizontal offset that centres the scaled container
    pub left: f64,
    /// Width of one tab rail
    pub rail_width: f64,
    /// Swipe distance required at this scale
    pub swipe_threshold: f64,
}

impl ViewportGeometry {
    /// Lay out `content` (width, height) inside `container` (width, height)
    #[must_use]
    pub fn compute(container: (f64, f64), content: (f64, f64), rail_width: f64) -> Self {
        let (win_width, win_height) = container;
        let (pdf_width, pdf_height) = content;

        let span_height = pdf_height + TOOLBAR_HEIGHT + BORDER_WIDTH * 2.0;
        let span_width = pdf_width + rail_width * 2.0 + BORDER_WIDTH * 2.0;

        let mut scale = (win_height / span_height).min(win_width / span_width);
        if !scale.is_finite() || scale > 1.0 {
            scale = 1.0;
        }

        Self {
            scale,
            content_width: pdf_width,
            content_height: pdf_height,
            outer_width: pdf_width + BORDER_WIDTH * 2.0,
            outer_height: span_height,
            left: (win_width - scale * span_width) / 2.0,
            rail_width,
            swipe_threshold: SWIPE_THRESHOLD * scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_bound_container() {
        let geometry = ViewportGeometry::compute((600.0, 800.0), (595.0, 841.0), 0.0);
        assert!((geometry.scale - 800.0 / 872.0).abs() < 1e-12);
        assert!((geometry.swipe_threshold - 75.0 * 800.0 / 872.0).abs() < 1e-9);
    }

    #[test]
    fn never_upscales() {
        let geometry = ViewportGeometry::compute((4000.0, 4000.0), (595.0, 841.0), 41.0);
        assert_eq!(geometry.scale, 1.0);
        assert_eq!(geometry.left, (4000.0 - (595.0 + 82.0 + 2.0)) / 2.0);
    }

    #[test]
    fn tab_rails_count_towards_width() {
        let geometry = ViewportGeometry::compute((650.0, 2000.0), (595.0, 841.0), 51.0);
        let span = 595.0 + 102.0 + 2.0;
        assert!((geometry.scale - 650.0 / span).abs() < 1e-12);
        assert!(geometry.left.abs() < 1e-9);
    }

    #[test]
    fn empty_container_does_not_produce_nan() {
        let geometry = ViewportGeometry::compute((0.0, 0.0), (0.0, 0.0), 0.0);
        assert!(geometry.scale.is_finite());
    }
}
