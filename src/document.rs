//! The element model the frontend paints.
//!
//! Every element is owned here and looked up by the id it was created for;
//! nothing else holds on to them.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::models::{CommentId, StoryDetail, StoryId};
use crate::scroll::HeaderState;

/// Height of the expanded header. The list starts right below it.
pub const LIST_TOP: f32 = 156.0;
pub const CARD_HEIGHT: f32 = 72.0;
pub const CARD_SPACING: f32 = 8.0;
/// Top of the score badge inside a card.
pub const SCORE_OFFSET: f32 = 16.0;
pub const BADGE_SIZE: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKey {
    Story(StoryId),
    StoryDetails(StoryId),
    Comment(CommentId),
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKey::Story(id) => write!(f, "s-{id}"),
            ElementKey::StoryDetails(id) => write!(f, "sd-{id}"),
            ElementKey::Comment(id) => write!(f, "sdc-{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    key: ElementKey,
    classes: BTreeSet<&'static str>,
    markup: String,
}

impl Element {
    pub fn new(key: ElementKey, markup: String) -> Self {
        Self {
            key,
            classes: BTreeSet::new(),
            markup,
        }
    }

    pub fn key(&self) -> ElementKey {
        self.key
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn set_markup(&mut self, markup: String) {
        self.markup = markup;
    }

    pub fn add_class(&mut self, class: &'static str) {
        self.classes.insert(class);
    }

    pub fn remove_class(&mut self, class: &'static str) {
        self.classes.remove(class);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }
}

/// Inline style the colorize pass writes onto a card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BadgeStyle {
    /// Width, height and line height of the score badge.
    pub size: f32,
    /// Saturation of `hsl(42, s%, 50%)`, 0 to 100.
    pub saturation: f32,
    pub title_opacity: f32,
}

impl Default for BadgeStyle {
    fn default() -> Self {
        Self {
            size: BADGE_SIZE,
            saturation: 100.0,
            title_opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoryElement {
    pub element: Element,
    /// What a click opens. Captured when the story hydrates.
    pub detail: Option<StoryDetail>,
    pub badge: BadgeStyle,
}

impl StoryElement {
    pub fn is_placeholder(&self) -> bool {
        self.detail.is_none()
    }
}

/// The single panel every story's details are shown in.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailPanel {
    pub element: Element,
    pub left: f32,
    pub opacity: f32,
    pub content_padding_top: f32,
    comment_order: Vec<CommentId>,
    comments: HashMap<CommentId, Element>,
}

impl DetailPanel {
    pub fn new(element: Element, left: f32) -> Self {
        Self {
            element,
            left,
            opacity: 0.0,
            content_padding_top: 0.0,
            comment_order: Vec::new(),
            comments: HashMap::new(),
        }
    }

    /// Re-keys the panel for another story and replaces its content.
    pub fn repopulate(&mut self, story: StoryId, markup: String) {
        self.element.key = ElementKey::StoryDetails(story);
        self.element.set_markup(markup);
        self.comment_order.clear();
        self.comments.clear();
    }

    pub fn append_comment(&mut self, id: CommentId, markup: String) {
        let element = Element::new(ElementKey::Comment(id), markup);
        if self.comments.insert(id, element).is_none() {
            self.comment_order.push(id);
        }
    }

    #[cfg(test)]
    pub fn comment(&self, id: CommentId) -> Option<&Element> {
        self.comments.get(&id)
    }

    pub fn comment_mut(&mut self, id: CommentId) -> Option<&mut Element> {
        self.comments.get_mut(&id)
    }

    pub fn comments(&self) -> impl Iterator<Item = &Element> + '_ {
        self.comment_order
            .iter()
            .filter_map(|id| self.comments.get(id))
    }

    pub fn comment_count(&self) -> usize {
        self.comment_order.len()
    }
}

#[derive(Debug, Default)]
pub struct Document {
    story_order: Vec<StoryId>,
    stories: HashMap<StoryId, StoryElement>,
    panel: Option<DetailPanel>,
    pub header: HeaderState,
    /// Header casts a shadow once the list has scrolled under it.
    pub raised: bool,
    /// Set until the top story list has arrived.
    pub loading: bool,
}

impl Document {
    pub fn new() -> Self {
        Self {
            loading: true,
            ..Default::default()
        }
    }

    /// Appends a story card to the end of the list. Returns `false` (and
    /// leaves the existing card alone) if the story already has one.
    pub fn append_story(&mut self, id: StoryId, markup: String) -> bool {
        if self.stories.contains_key(&id) {
            return false;
        }
        let mut element = Element::new(ElementKey::Story(id), markup);
        element.add_class("story");
        self.stories.insert(
            id,
            StoryElement {
                element,
                detail: None,
                badge: BadgeStyle::default(),
            },
        );
        self.story_order.push(id);
        true
    }

    pub fn story(&self, id: StoryId) -> Option<&StoryElement> {
        self.stories.get(&id)
    }

    pub fn story_mut(&mut self, id: StoryId) -> Option<&mut StoryElement> {
        self.stories.get_mut(&id)
    }

    pub fn story_at(&self, index: usize) -> Option<&StoryElement> {
        self.story_order
            .get(index)
            .and_then(|id| self.stories.get(id))
    }

    pub fn story_at_mut(&mut self, index: usize) -> Option<&mut StoryElement> {
        let id = *self.story_order.get(index)?;
        self.stories.get_mut(&id)
    }

    pub fn story_count(&self) -> usize {
        self.story_order.len()
    }

    pub fn story_ids(&self) -> &[StoryId] {
        &self.story_order
    }

    pub fn panel(&self) -> Option<&DetailPanel> {
        self.panel.as_ref()
    }

    pub fn panel_mut(&mut self) -> Option<&mut DetailPanel> {
        self.panel.as_mut()
    }

    /// The panel, created by `make` the first time it is asked for.
    pub fn panel_or_create(&mut self, make: impl FnOnce() -> DetailPanel) -> &mut DetailPanel {
        self.panel.get_or_insert_with(make)
    }

    /// Reserves room under the panel header once the frontend knows how tall
    /// it is.
    pub fn measure_detail_header(&mut self, height: f32) {
        if let Some(panel) = self.panel.as_mut() {
            panel.content_padding_top = height;
        }
    }

    /// Top of the card at `index`, in page coordinates.
    pub fn story_top(index: usize) -> f32 {
        LIST_TOP + index as f32 * (CARD_HEIGHT + CARD_SPACING)
    }

    pub fn score_top(index: usize) -> f32 {
        Self::story_top(index) + SCORE_OFFSET
    }

    /// Full scrollable height of the list.
    pub fn scroll_height(&self) -> f32 {
        Self::story_top(self.story_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_format_like_element_ids() {
        assert_eq!(ElementKey::Story(StoryId(42)).to_string(), "s-42");
        assert_eq!(ElementKey::StoryDetails(StoryId(7)).to_string(), "sd-7");
        assert_eq!(ElementKey::Comment(CommentId(100)).to_string(), "sdc-100");
    }

    #[test]
    fn one_card_per_story() {
        let mut doc = Document::new();
        assert!(doc.append_story(StoryId(1), "a".into()));
        assert!(!doc.append_story(StoryId(1), "b".into()));

        assert_eq!(doc.story_count(), 1);
        assert_eq!(doc.story(StoryId(1)).unwrap().element.markup(), "a");
        assert!(doc.story(StoryId(1)).unwrap().element.has_class("story"));
    }

    #[test]
    fn panel_is_created_once() {
        let mut doc = Document::new();
        let make = || DetailPanel::new(Element::new(ElementKey::StoryDetails(StoryId(1)), String::new()), 900.0);

        doc.panel_or_create(make).left = 10.0;
        let panel = doc.panel_or_create(|| panic!("panel created twice"));
        assert_eq!(panel.left, 10.0);
    }

    #[test]
    fn repopulate_rekeys_and_clears_comments() {
        let mut panel = DetailPanel::new(
            Element::new(ElementKey::StoryDetails(StoryId(1)), "one".into()),
            0.0,
        );
        panel.append_comment(CommentId(5), "c".into());
        panel.append_comment(CommentId(5), "again".into());
        assert_eq!(panel.comment_count(), 1);

        panel.repopulate(StoryId(2), "two".into());
        assert_eq!(panel.element.key(), ElementKey::StoryDetails(StoryId(2)));
        assert_eq!(panel.element.markup(), "two");
        assert_eq!(panel.comment_count(), 0);
        assert!(panel.comment(CommentId(5)).is_none());
    }

    #[test]
    fn geometry_is_a_fixed_stride() {
        assert_eq!(Document::story_top(0), LIST_TOP);
        assert_eq!(Document::story_top(2), LIST_TOP + 2.0 * 80.0);
        assert_eq!(Document::score_top(1), LIST_TOP + 80.0 + SCORE_OFFSET);
    }
}
