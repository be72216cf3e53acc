//! Header collapse and the lazy-load trigger, both derived from the list's
//! scroll offset.

use crate::document::LIST_TOP;

/// Scroll distance over which the header shrinks.
pub const HEADER_COLLAPSE: f32 = 70.0;
pub const TITLE_SCALE_DIVISOR: f32 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderState {
    pub height: f32,
    pub title_scale: f32,
}

impl Default for HeaderState {
    fn default() -> Self {
        Self::at_offset(0.0)
    }
}

impl HeaderState {
    pub fn at_offset(scroll_top: f32) -> Self {
        let capped = scroll_top.clamp(0.0, HEADER_COLLAPSE);
        Self {
            height: LIST_TOP - capped,
            title_scale: 1.0 - capped / TITLE_SCALE_DIVISOR,
        }
    }
}

/// What the frontend knows about the list viewport after a scroll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f32,
    /// Height of everything inside the scroll area.
    pub scroll_height: f32,
    /// Height of the visible part.
    pub offset_height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollOutcome {
    pub header: HeaderState,
    pub raised: bool,
    pub load_more: bool,
}

pub fn on_scroll(metrics: ScrollMetrics, lazy_load_threshold: f32) -> ScrollOutcome {
    let load_threshold = metrics.scroll_height - metrics.offset_height - lazy_load_threshold;
    ScrollOutcome {
        header: HeaderState::at_offset(metrics.scroll_top),
        raised: metrics.scroll_top > HEADER_COLLAPSE,
        load_more: metrics.scroll_top > load_threshold,
    }
}
