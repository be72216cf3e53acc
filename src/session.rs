//! One page session: the story id list, the batch cursor, every card, the
//! detail panel and the animations that move it.

use serde_json::{json, Value};
use std::sync::mpsc::Receiver;

use crate::animator::{hidden_left, Colorizer, SlideAnimator, Step};
use crate::config::ReaderConfig;
use crate::document::{DetailPanel, Document, Element, ElementKey};
use crate::error::ReaderError;
use crate::frames::{FrameQueue, FrameTask};
use crate::gateway::{CancelToken, DataGateway, GatewayEvent};
use crate::models::{Comment, CommentId, StoryDetail, StoryId, UrlParts};
use crate::scroll::{self, ScrollMetrics};
use crate::templates::Templates;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Hidden,
    Shown,
}

/// Size of the window area the list and the panel live in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f32,
    pub list_height: f32,
    pub scroll_top: f32,
}

pub struct Session<G: DataGateway> {
    config: ReaderConfig,
    templates: Templates,
    gateway: G,
    events: Receiver<GatewayEvent>,
    document: Document,
    frames: FrameQueue,
    viewport: Viewport,

    stories: Option<Vec<StoryId>>,
    cursor: usize,
    batch_in_flight: bool,
    colorizer: Colorizer,
    last_error: Option<String>,

    panel_state: PanelState,
    hiding: bool,
    slide: SlideAnimator,
    comment_token: CancelToken,

    placeholder_story: String,
    placeholder_comment: String,
}

impl<G: DataGateway> Session<G> {
    pub fn new(
        config: ReaderConfig,
        gateway: G,
        events: Receiver<GatewayEvent>,
    ) -> Result<Self, ReaderError> {
        let templates = Templates::new(config.relative_time)?;
        Self::with_templates(config, templates, gateway, events)
    }

    pub fn with_templates(
        config: ReaderConfig,
        templates: Templates,
        gateway: G,
        events: Receiver<GatewayEvent>,
    ) -> Result<Self, ReaderError> {
        config.validate()?;

        let placeholder_story = templates.story(&json!({
            "title": "...",
            "score": "-",
            "by": "...",
            "time": 0,
        }))?;
        let placeholder_comment = templates.comment(&json!({
            "by": "",
            "text": "Loading comment...",
        }))?;

        Ok(Self {
            config,
            templates,
            gateway,
            events,
            document: Document::new(),
            frames: FrameQueue::default(),
            viewport: Viewport::default(),
            stories: None,
            cursor: 0,
            batch_in_flight: false,
            colorizer: Colorizer::default(),
            last_error: None,
            panel_state: PanelState::Hidden,
            hiding: false,
            slide: SlideAnimator::at(0.0),
            comment_token: CancelToken::new(),
            placeholder_story,
            placeholder_comment,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn panel_state(&self) -> PanelState {
        self.panel_state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Index of the next story a batch would start at, never past the end of
    /// the list.
    pub fn cursor(&self) -> usize {
        let total = self.stories.as_ref().map_or(0, Vec::len);
        self.cursor.min(total)
    }

    pub fn has_more(&self) -> bool {
        self.stories
            .as_ref()
            .is_some_and(|stories| self.cursor < stories.len())
    }

    /// Kicks off the top story fetch. Also used to retry after it failed.
    pub fn start(&mut self) {
        tracing::info!("requesting top stories");
        self.document.loading = true;
        self.last_error = None;
        self.gateway.top_stories();
    }

    pub fn set_viewport(&mut self, width: f32, list_height: f32) {
        self.viewport.width = width;
        self.viewport.list_height = list_height;
    }

    /// Applies every gateway result that has arrived so far.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn handle_event(&mut self, event: GatewayEvent) {
        match event {
            GatewayEvent::TopStories(Ok(ids)) => {
                tracing::info!(count = ids.len(), "received top stories");
                self.stories = Some(ids);
                self.cursor = 0;
                self.load_next_batch();
                self.document.loading = false;
            }
            GatewayEvent::TopStories(Err(e)) => {
                tracing::warn!(error = %e, "could not load top stories");
                self.last_error = Some(e.to_string());
                self.document.loading = false;
            }
            GatewayEvent::Story { id, result: Ok(detail) } => {
                // Written on the next frame, together with whatever else landed
                self.frames.schedule(FrameTask::HydrateStory { id, detail });
            }
            GatewayEvent::Story { id, result: Err(e) } => {
                tracing::warn!(%id, error = %e, "story stays a placeholder");
                if let Some(story) = self.document.story_mut(id) {
                    if story.is_placeholder() {
                        story.element.add_class("failed");
                    }
                }
            }
            GatewayEvent::Comment { id, cancel, result } => {
                if cancel.is_cancelled() {
                    tracing::debug!(%id, "ignoring comment for a previous panel");
                    return;
                }
                match result {
                    Ok(comment) => self.update_comment(id, &comment),
                    Err(e) => tracing::warn!(%id, error = %e, "comment stays a placeholder"),
                }
            }
        }
    }

    /// Appends the next batch of placeholder cards and requests each story.
    /// Returns how many cards were created.
    pub fn load_next_batch(&mut self) -> usize {
        if self.batch_in_flight {
            return 0;
        }
        let Some(stories) = self.stories.as_ref() else {
            return 0;
        };
        if self.cursor >= stories.len() {
            return 0;
        }

        self.batch_in_flight = true;

        let batch: Vec<StoryId> = stories
            .iter()
            .skip(self.cursor)
            .take(self.config.batch_size)
            .copied()
            .collect();

        let mut created = 0;
        for id in batch {
            if self.document.append_story(id, self.placeholder_story.clone()) {
                self.gateway.story_by_id(id);
                created += 1;
            }
        }

        self.batch_in_flight = false;
        self.cursor += self.config.batch_size;
        tracing::debug!(created, cursor = self.cursor(), "loaded story batch");

        self.colorize();
        created
    }

    /// Asks again for a story whose fetch failed.
    pub fn retry_story(&mut self, id: StoryId) -> bool {
        match self.document.story_mut(id) {
            Some(story) if story.element.has_class("failed") => {
                story.element.remove_class("failed");
                self.gateway.story_by_id(id);
                true
            }
            _ => false,
        }
    }

    pub fn colorize(&mut self) {
        self.colorizer.run(
            &mut self.document,
            self.viewport.scroll_top,
            self.viewport.list_height,
        );
    }

    pub fn on_scroll(&mut self, metrics: ScrollMetrics) {
        self.viewport.scroll_top = metrics.scroll_top;
        self.viewport.list_height = metrics.offset_height;

        let outcome = scroll::on_scroll(metrics, self.config.lazy_load_threshold);
        self.document.header = outcome.header;
        self.document.raised = outcome.raised;

        if outcome.load_more {
            self.load_next_batch();
            self.colorize();
        }
    }

    /// Runs everything scheduled for this frame and advances the panel slide.
    pub fn frame(&mut self) {
        for task in self.frames.take() {
            match task {
                FrameTask::HydrateStory { id, detail } => self.update_story(id, detail),
                FrameTask::AddComment { id, cancel } => self.add_comment(id, cancel),
            }
        }

        if self.hiding {
            self.slide.retarget(hidden_left(self.viewport.width));
        }
        if self.slide.step() == Step::Converged && self.hiding {
            self.hiding = false;
            self.panel_state = PanelState::Hidden;
            tracing::debug!("detail panel hidden");
        }
        if self.panel_state == PanelState::Hidden && !self.slide.active {
            // The resting place moves with the window edge
            self.slide = SlideAnimator::at(hidden_left(self.viewport.width));
        }
        if let Some(panel) = self.document.panel_mut() {
            panel.left = self.slide.position;
        }
    }

    /// Whether the frontend should schedule another frame right away.
    pub fn needs_frame(&self) -> bool {
        !self.frames.is_empty() || self.slide.active
    }

    fn update_story(&mut self, id: StoryId, detail: StoryDetail) {
        let markup = match self.templates.story(&story_data(&detail)) {
            Ok(markup) => markup,
            Err(e) => {
                tracing::warn!(%id, error = %e, "could not render story");
                return;
            }
        };

        let Some(story) = self.document.story_mut(id) else {
            tracing::debug!(%id, "no card for story");
            return;
        };
        story.element.set_markup(markup);
        story.element.remove_class("failed");
        story.element.add_class("clickable");
        story.detail = Some(detail);
    }

    /// Click on a card. Placeholders are not clickable.
    pub fn open_story(&mut self, id: StoryId) -> bool {
        let Some(detail) = self.document.story(id).and_then(|s| s.detail.clone()) else {
            return false;
        };
        self.open(detail)
    }

    pub fn open(&mut self, detail: StoryDetail) -> bool {
        if self.panel_state == PanelState::Shown {
            return false;
        }

        let urlobj = match detail.url_parts() {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!(id = %detail.id, error = %e, "showing story without its link");
                None
            }
        };
        let markup = match self.templates.story_details(&details_data(&detail, urlobj)) {
            Ok(markup) => markup,
            Err(e) => {
                tracing::warn!(id = %detail.id, error = %e, "could not render story details");
                return false;
            }
        };

        if self.document.panel().is_none() {
            let left = hidden_left(self.viewport.width);
            self.slide = SlideAnimator::at(left);
            tracing::debug!("creating detail panel");
        }
        let left = self.slide.position;
        let panel = self.document.panel_or_create(|| {
            DetailPanel::new(
                Element::new(ElementKey::StoryDetails(detail.id), String::new()),
                left,
            )
        });
        panel.repopulate(detail.id, markup);

        // Comments still on their way belong to the previous story
        self.comment_token.cancel();
        self.comment_token = CancelToken::new();
        for &id in detail.comment_ids() {
            self.frames.schedule(FrameTask::AddComment {
                id,
                cancel: self.comment_token.clone(),
            });
        }

        self.show();
        true
    }

    fn show(&mut self) {
        if self.panel_state == PanelState::Shown {
            return;
        }
        self.panel_state = PanelState::Shown;
        self.hiding = false;
        if let Some(panel) = self.document.panel_mut() {
            panel.opacity = 1.0;
        }
        self.slide.start(0.0);
        tracing::debug!("showing detail panel");
    }

    pub fn hide(&mut self) -> bool {
        if self.panel_state == PanelState::Hidden || self.hiding {
            return false;
        }
        self.hiding = true;
        self.comment_token.cancel();
        if let Some(panel) = self.document.panel_mut() {
            panel.opacity = 0.0;
        }
        self.slide.start(hidden_left(self.viewport.width));
        true
    }

    fn add_comment(&mut self, id: CommentId, cancel: CancelToken) {
        if cancel.is_cancelled() {
            return;
        }
        let Some(panel) = self.document.panel_mut() else {
            return;
        };
        tracing::debug!(%id, "adding comment");
        panel.append_comment(id, self.placeholder_comment.clone());
        self.gateway.story_comment(id, cancel);
    }

    fn update_comment(&mut self, id: CommentId, comment: &Comment) {
        let data = json!({
            "id": comment.id,
            "by": comment.author(),
            "text": comment.text,
            "time": comment.time_ms(),
        });
        let markup = match self.templates.comment(&data) {
            Ok(markup) => markup,
            Err(e) => {
                tracing::warn!(%id, error = %e, "could not render comment");
                return;
            }
        };

        if let Some(element) = self.document.panel_mut().and_then(|p| p.comment_mut(id)) {
            element.set_markup(markup);
        }
    }
}

fn story_data(detail: &StoryDetail) -> Value {
    let summary = detail.summary();
    json!({
        "id": summary.id,
        "title": summary.title,
        "score": summary.score,
        "by": summary.by,
        "time": detail.time_ms(),
        "url": summary.url,
    })
}

fn details_data(detail: &StoryDetail, urlobj: Option<UrlParts>) -> Value {
    json!({
        "id": detail.id,
        "title": detail.title,
        "score": detail.score,
        "by": detail.by,
        "time": detail.time_ms(),
        "url": detail.url,
        "kids": detail.kids,
        "descendants": detail.descendants,
        "urlobj": urlobj,
    })
}
