//! Link overlay
//!
//! Link annotations are turned into positioned hit areas that sit on top of
//! the raster. Each area is placed in page space (Y pointing down) and
//! carries the page transform, so it scales and pans together with the
//! raster underneath.

use crate::engine::{Annotation, Destination, PageViewport};

/// What activating a link does
#[derive(Clone, Debug, PartialEq)]
pub enum LinkTarget {
    /// Outbound URL, handed to the host
    External { url: String },
    /// Destination inside the document
    Internal { destination: Destination },
}

/// Hit area of one link
#[derive(Clone, Debug, PartialEq)]
pub struct LinkOverlay {
    /// `[left, top, right, bottom]` in page space
    pub rect: [f64; 4],
    /// Page-to-raster transform applied to the element
    pub transform: [f64; 6],
    /// Transform origin relative to the element, pinning it to the page origin
    pub transform_origin: (f64, f64),
    pub target: LinkTarget,
}

impl LinkOverlay {
    #[must_use]
    pub fn left(&self) -> f64 {
        self.rect[0]
    }

    #[must_use]
    pub fn top(&self) -> f64 {
        self.rect[1]
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.rect[2] - self.rect[0]
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.rect[3] - self.rect[1]
    }

    /// The hit area in raster pixels, after the transform is applied
    #[must_use]
    pub fn screen_rect(&self) -> [f64; 4] {
        let [a, b, c, d, e, f] = self.transform;
        let map = |x: f64, y: f64| (a * x + c * y + e, b * x + d * y + f);
        let (x0, y0) = map(self.rect[0], self.rect[1]);
        let (x1, y1) = map(self.rect[2], self.rect[3]);
        normalize([x0, y0, x1, y1])
    }
}

/// Build the hit areas for every usable link on a page
#[must_use]
pub fn build_overlay(
    annotations: &[Annotation],
    view: [f64; 4],
    viewport: &PageViewport,
) -> Vec<LinkOverlay> {
    let transform = viewport.unflipped_transform();

    annotations
        .iter()
        .filter(|a| a.is_link())
        .filter_map(|annotation| {
            let target = if let Some(url) = &annotation.url {
                LinkTarget::External { url: url.clone() }
            } else {
                LinkTarget::Internal {
                    destination: annotation.dest.clone()?,
                }
            };

            let r = annotation.rect;
            let rect = normalize([
                r[0],
                view[3] - r[1] + view[1],
                r[2],
                view[3] - r[3] + view[1],
            ]);

            Some(LinkOverlay {
                rect,
                transform,
                transform_origin: (-rect[0], -rect[1]),
                target,
            })
        })
        .collect()
}

fn normalize(r: [f64; 4]) -> [f64; 4] {
    [r[0].min(r[2]), r[1].min(r[3]), r[0].max(r[2]), r[1].max(r[3])]
}
