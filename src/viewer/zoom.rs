//! Pan/zoom mirror
//!
//! Tracks what the gesture layer is doing to the page: the current zoom
//! magnitude and whether panning is enabled. Zoom steps are additive.

/// Zoom state of the page layer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zoom {
    pub factor: f64,
    pub pan_enabled: bool,
}

impl Zoom {
    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 2.0;
    pub const STEP: f64 = 0.25;

    #[must_use]
    pub fn new() -> Self {
        Self {
            factor: Self::MIN,
            pan_enabled: false,
        }
    }

    /// Zoom in by one step. Returns true if the magnitude changed.
    pub fn step_in(&mut self) -> bool {
        self.set_factor(self.factor + Self::STEP)
    }

    /// Zoom out by one step. Returns true if the magnitude changed.
    pub fn step_out(&mut self) -> bool {
        self.set_factor(self.factor - Self::STEP)
    }

    /// Set the magnitude, clamped to `[MIN, MAX]`
    pub fn set_factor(&mut self, factor: f64) -> bool {
        let clamped = if factor.is_finite() {
            factor.clamp(Self::MIN, Self::MAX)
        } else {
            Self::MIN
        };
        let changed = (self.factor - clamped).abs() > f64::EPSILON;
        self.factor = clamped;
        changed
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn is_unity(&self) -> bool {
        (self.factor - Self::MIN).abs() < f64::EPSILON
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self::new()
    }
}
