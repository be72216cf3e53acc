//! Per-frame visual effects: the detail panel slide and the score badge
//! colorize pass.

use crate::document::{Document, BADGE_SIZE};

/// Fraction of the remaining distance covered each frame.
pub const DECAY: f32 = 0.1;
/// Distance at which the slide snaps onto its target.
pub const SNAP: f32 = 0.5;
/// How far past the right edge a hidden panel sits.
pub const OFFSCREEN_MARGIN: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Idle,
    Moving,
    Converged,
}

/// Exponential ease-out towards a target, advanced one frame at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideAnimator {
    pub position: f32,
    pub target: f32,
    pub active: bool,
}

impl SlideAnimator {
    pub fn at(position: f32) -> Self {
        Self {
            position,
            target: position,
            active: false,
        }
    }

    pub fn start(&mut self, target: f32) {
        self.target = target;
        self.active = true;
    }

    /// The hide target follows the viewport width, so it can move while the
    /// slide is running.
    pub fn retarget(&mut self, target: f32) {
        self.target = target;
    }

    pub fn step(&mut self) -> Step {
        if !self.active {
            return Step::Idle;
        }

        self.position += (self.target - self.position) * DECAY;
        if (self.position - self.target).abs() <= SNAP {
            self.position = self.target;
            self.active = false;
            Step::Converged
        } else {
            Step::Moving
        }
    }
}

pub fn hidden_left(viewport_width: f32) -> f32 {
    viewport_width + OFFSCREEN_MARGIN
}

/// Page position the badge scaling is measured from.
const COLORIZE_ORIGIN: f32 = 170.0;

/// Scales and tints every card that has not been processed yet. Cards are
/// only ever processed once, whichever way the list scrolls afterwards.
#[derive(Debug, Clone, Default)]
pub struct Colorizer {
    rendered: usize,
}

impl Colorizer {
    pub fn rendered(&self) -> usize {
        self.rendered
    }

    /// `scroll_top` is the list's current offset, `height` the visible list
    /// height.
    pub fn run(&mut self, document: &mut Document, scroll_top: f32, height: f32) {
        let count = document.story_count();
        if self.rendered >= count {
            return;
        }
        let height = height.max(1.0);

        for index in self.rendered..count {
            let location = Document::score_top(index) - scroll_top;
            let distance = (location - COLORIZE_ORIGIN) / height;
            let scale = (1.0 - 0.05 * distance).clamp(0.0, 1.0);
            let opacity = (1.0 - 0.5 * distance).clamp(0.0, 1.0);

            let size = scale * BADGE_SIZE;
            let saturation = (100.0 * ((size - 38.0) / 2.0)).clamp(0.0, 100.0);

            if let Some(story) = document.story_at_mut(index) {
                story.badge.size = size;
                story.badge.saturation = saturation;
                story.badge.title_opacity = opacity;
            }
        }
        self.rendered = count;
    }
}
