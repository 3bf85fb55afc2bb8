//! Side tab bookmarks
//!
//! Tabs are laid out once when the document loads and never change after
//! that. The only thing that moves is their stacking order: tabs at or
//! before the current page stack forward on the left, tabs after it peek
//! out from the right in reverse order, like the tabs of a ring binder.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::viewer::layout::TOOLBAR_HEIGHT;

/// Base width of the tab rail
pub const TAB_WIDTH: f64 = 41.0;
/// Extra rail width per offset column
pub const TAB_OFFSET_WIDTH: f64 = 10.0;
/// Vertical gap between stacked tabs (negative: tabs overlap slightly)
pub const TAB_SPACING: f64 = -2.0;
/// Height of a tab that does not set one
pub const DEFAULT_TAB_HEIGHT: f64 = 60.0;

const TAB_TOP_MARGIN: f64 = 5.0;
const Z_BASE: i32 = 1000;

/// A user supplied tab
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TabDescriptor {
    /// Page the tab jumps to (1-based)
    pub page: u32,
    pub title: String,
    /// Colour class; falls back to the viewer-wide tab colour
    #[serde(default)]
    pub color: Option<String>,
    /// Offset column, 0 is the innermost
    #[serde(default)]
    pub offset: u32,
    /// Distance from the top of the page area
    #[serde(default)]
    pub top: Option<f64>,
    /// Distance from the bottom of the viewer; wins over `top`
    #[serde(default)]
    pub bottom: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

impl TabDescriptor {
    #[must_use]
    pub fn new(page: u32, title: impl Into<String>) -> Self {
        Self {
            page,
            title: title.into(),
            color: None,
            offset: 0,
            top: None,
            bottom: None,
            height: None,
        }
    }
}

/// Vertical anchor of a placed tab
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TabAnchor {
    Top(f64),
    Bottom(f64),
}

/// A tab after layout
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedTab {
    pub page: u32,
    pub title: String,
    pub color: String,
    /// Titles longer than two characters get the wide style
    pub large: bool,
    pub margin_left: f64,
    pub margin_right: f64,
    pub anchor: TabAnchor,
    pub height: Option<f64>,
}

/// Stacking position of one tab for the current page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TabRank {
    pub index: usize,
    pub page: u32,
    pub z_index: i32,
    /// Tab belongs to a page after the current one
    pub right: bool,
}

/// All tabs of a viewer, laid out
#[derive(Clone, Debug, PartialEq)]
pub struct TabRail {
    tabs: Vec<PlacedTab>,
    width: f64,
}

impl TabRail {
    /// Lay out `tabs` in order
    #[must_use]
    pub fn layout(tabs: &[TabDescriptor], default_color: &str) -> Self {
        let max_offset = tabs.iter().map(|t| t.offset).max().unwrap_or(0);
        let mut column_tops: HashMap<u32, f64> = HashMap::new();

        let placed = tabs
            .iter()
            .map(|tab| {
                let anchor = if let Some(bottom) = tab.bottom {
                    TabAnchor::Bottom(bottom)
                } else {
                    let top = column_tops
                        .entry(tab.offset)
                        .or_insert(TAB_TOP_MARGIN + TOOLBAR_HEIGHT);
                    if let Some(explicit) = tab.top {
                        *top = explicit + TOOLBAR_HEIGHT;
                    }
                    let anchor = TabAnchor::Top(*top);
                    *top += tab.height.unwrap_or(DEFAULT_TAB_HEIGHT) + TAB_SPACING;
                    anchor
                };

                PlacedTab {
                    page: tab.page,
                    title: tab.title.clone(),
                    color: tab
                        .color
                        .clone()
                        .unwrap_or_else(|| default_color.to_string()),
                    large: tab.title.chars().count() > 2,
                    margin_left: f64::from(tab.offset) * TAB_OFFSET_WIDTH,
                    margin_right: f64::from(max_offset - tab.offset) * TAB_OFFSET_WIDTH,
                    anchor,
                    height: tab.height,
                }
            })
            .collect();

        Self {
            tabs: placed,
            width: TAB_WIDTH + TAB_OFFSET_WIDTH * f64::from(max_offset),
        }
    }

    /// Width of one side of the rail; the base tab width even without tabs
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn tabs(&self) -> &[PlacedTab] {
        &self.tabs
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PlacedTab> {
        self.tabs.get(index)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Stacking order for `current_page`
    #[must_use]
    pub fn rank(&self, current_page: u32) -> Vec<TabRank> {
        let mut z = 1;
        self.tabs
            .iter()
            .enumerate()
            .map(|(index, tab)| {
                let right = tab.page > current_page;
                let z_index = if right { Z_BASE - z } else { Z_BASE + z };
                z += 1;
                TabRank {
                    index,
                    page: tab.page,
                    z_index,
                    right,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tab(page: u32, title: &str) -> TabDescriptor {
        TabDescriptor::new(page, title)
    }

    #[test]
    fn tabs_before_and_at_current_page_stack_forward() {
        let rail = TabRail::layout(&[tab(2, "A"), tab(5, "B"), tab(9, "C")], "beige");
        let ranks = rail.rank(5);

        assert!(!ranks[0].right);
        assert!(!ranks[1].right);
        assert!(ranks[0].z_index < ranks[1].z_index);
        assert_eq!(ranks[1].z_index, 1002);

        assert!(ranks[2].right);
        assert_eq!(ranks[2].z_index, 997);
        assert!(ranks[2].z_index < ranks[0].z_index);
    }

    #[test]
    fn tabs_after_current_page_stack_in_reverse() {
        let rail = TabRail::layout(&[tab(3, "A"), tab(6, "B"), tab(9, "C")], "beige");
        let ranks = rail.rank(1);

        assert!(ranks.iter().all(|r| r.right));
        assert!(ranks[0].z_index > ranks[1].z_index);
        assert!(ranks[1].z_index > ranks[2].z_index);
    }

    #[test]
    fn rail_keeps_base_width_without_tabs() {
        let rail = TabRail::layout(&[], "beige");
        assert!(rail.is_empty());
        assert_eq!(rail.width(), 41.0);
        assert!(rail.rank(1).is_empty());
    }

    #[test]
    fn rail_widens_with_offset_columns() {
        let mut outer = tab(4, "Index");
        outer.offset = 2;
        let rail = TabRail::layout(&[tab(1, "1"), outer], "beige");

        assert_eq!(rail.width(), 61.0);
        assert_eq!(rail.tabs()[0].margin_left, 0.0);
        assert_eq!(rail.tabs()[0].margin_right, 20.0);
        assert_eq!(rail.tabs()[1].margin_left, 20.0);
        assert_eq!(rail.tabs()[1].margin_right, 0.0);
    }

    #[test]
    fn tabs_stack_down_each_column() {
        let mut tall = tab(1, "I");
        tall.height = Some(80.0);
        let mut pinned = tab(7, "Z");
        pinned.bottom = Some(10.0);
        let mut moved = tab(9, "X");
        moved.top = Some(300.0);

        let rail = TabRail::layout(&[tall, tab(3, "II"), pinned, moved, tab(12, "Y")], "beige");
        let anchors: Vec<_> = rail.tabs().iter().map(|t| t.anchor).collect();

        assert_eq!(anchors[0], TabAnchor::Top(35.0));
        assert_eq!(anchors[1], TabAnchor::Top(113.0));
        assert_eq!(anchors[2], TabAnchor::Bottom(10.0));
        assert_eq!(anchors[3], TabAnchor::Top(330.0));
        assert_eq!(anchors[4], TabAnchor::Top(388.0));
    }

    #[test]
    fn colour_and_size_classes() {
        let mut green = tab(1, "Intro");
        green.color = Some("green".to_string());
        let rail = TabRail::layout(&[green, tab(2, "A2")], "beige");

        assert_eq!(rail.tabs()[0].color, "green");
        assert!(rail.tabs()[0].large);
        assert_eq!(rail.tabs()[1].color, "beige");
        assert!(!rail.tabs()[1].large);
    }
}
