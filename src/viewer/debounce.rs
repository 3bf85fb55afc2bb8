use std::time::Duration;

use tokio::time::Instant;

/// Delay before a container resize triggers a redraw
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Coalesces container resizes; only the last size within the window is kept
#[derive(Debug)]
pub struct ResizeDebouncer {
    delay: Duration,
    pending: Option<(f64, f64, Instant)>,
}

impl ResizeDebouncer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Queue a size, restarting the window
    pub fn queue(&mut self, width: f64, height: f64, now: Instant) {
        self.pending = Some((width, height, now));
    }

    /// The queued size, if its window has elapsed
    pub fn take_ready(&mut self, now: Instant) -> Option<(f64, f64)> {
        let (width, height, queued_at) = self.pending?;
        if now.saturating_duration_since(queued_at) >= self.delay {
            self.pending = None;
            Some((width, height))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for ResizeDebouncer {
    fn default() -> Self {
        Self::new(RESIZE_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_for_the_window() {
        let start = Instant::now();
        let mut debouncer = ResizeDebouncer::default();
        debouncer.queue(800.0, 600.0, start);

        assert_eq!(debouncer.take_ready(start + Duration::from_millis(50)), None);
        assert!(debouncer.is_pending());
        assert_eq!(
            debouncer.take_ready(start + Duration::from_millis(100)),
            Some((800.0, 600.0))
        );
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn later_resize_restarts_the_window() {
        let start = Instant::now();
        let mut debouncer = ResizeDebouncer::default();
        debouncer.queue(800.0, 600.0, start);
        debouncer.queue(1024.0, 768.0, start + Duration::from_millis(80));

        assert_eq!(debouncer.take_ready(start + Duration::from_millis(120)), None);
        assert_eq!(
            debouncer.take_ready(start + Duration::from_millis(180)),
            Some((1024.0, 768.0))
        );
    }
}
