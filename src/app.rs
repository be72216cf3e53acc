use eframe::egui;
use egui::text::{LayoutJob, TextWrapping};
use egui::{
    pos2, vec2, Align2, Color32, CornerRadius, FontId, Frame, Galley, Id, LayerId, Margin, Order, Rect,
    RichText, ScrollArea, Sense, Stroke, TextFormat, Ui, UiBuilder,
};
use std::collections::HashSet;
use std::sync::Arc;

use crate::document::{Document, ElementKey, CARD_HEIGHT, CARD_SPACING, LIST_TOP, SCORE_OFFSET};
use crate::gateway::DataGateway;
use crate::markup::{CardView, CommentView, DetailView, MarkupCache};
use crate::models::StoryId;
use crate::scroll::ScrollMetrics;
use crate::session::{PanelState, Session};
use crate::theme::AppTheme;

const CARD_MARGIN: f32 = 8.0;
const HEADER_TITLE_SIZE: f32 = 32.0;
const FOOTER_HEIGHT: f32 = 48.0;

pub struct ReaderApp<G: DataGateway> {
    session: Session<G>,
    theme: AppTheme,
    cards: MarkupCache<CardView>,
    details: MarkupCache<DetailView>,
    comments: MarkupCache<CommentView>,
    last_scroll: Option<ScrollMetrics>,
    started: bool,
}

impl<G: DataGateway> ReaderApp<G> {
    pub fn new(session: Session<G>, dark_mode: bool) -> Self {
        Self {
            session,
            theme: if dark_mode {
                AppTheme::dark()
            } else {
                AppTheme::light()
            },
            cards: MarkupCache::default(),
            details: MarkupCache::default(),
            comments: MarkupCache::default(),
            last_scroll: None,
            started: false,
        }
    }

    fn open_link(&self, url: &str) {
        if let Err(e) = open::that(url) {
            tracing::warn!(%url, error = %e, "could not open link");
        }
    }

    fn render_header(&self, ctx: &egui::Context) {
        let document = self.session.document();
        let header = document.header;
        let width = ctx.screen_rect().width();
        let painter = ctx.layer_painter(LayerId::new(Order::Middle, Id::new("header")));

        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(width, header.height));
        painter.rect_filled(rect, 0.0, self.theme.header_background);

        if document.raised {
            let shadow = Rect::from_min_size(rect.left_bottom(), vec2(width, 4.0));
            painter.rect_filled(shadow, 0.0, self.theme.shadow);
        }

        painter.text(
            rect.left_bottom() + vec2(16.0, -16.0),
            Align2::LEFT_BOTTOM,
            "Top Stories",
            FontId::proportional(HEADER_TITLE_SIZE * header.title_scale),
            self.theme.header_text,
        );
    }

    fn render_list(&mut self, ctx: &egui::Context) {
        let mut clicked: Option<StoryId> = None;
        let mut retry_top_stories = false;

        let document = self.session.document();
        let header_height = document.header.height;
        let last_error = self.session.last_error().map(str::to_string);
        let has_more = self.session.has_more();
        let theme = &self.theme;
        let cards = &mut self.cards;

        let output = egui::CentralPanel::default()
            .frame(Frame::new().fill(theme.background))
            .show(ctx, |ui| {
                if document.loading || last_error.is_some() {
                    ui.add_space(LIST_TOP + 24.0);
                    ui.vertical_centered(|ui| {
                        if let Some(error) = &last_error {
                            ui.label(RichText::new(error).color(theme.failed).size(16.0));
                            ui.add_space(8.0);
                            retry_top_stories = ui.button("Retry").clicked();
                        } else {
                            ui.spinner();
                        }
                    });
                    return None;
                }

                let output = ScrollArea::vertical()
                    .id_salt("stories")
                    .auto_shrink([false, false])
                    .show_viewport(ui, |ui, viewport| {
                        ui.set_min_height(document.scroll_height() + FOOTER_HEIGHT);
                        ui.set_min_width(ui.available_width());
                        let origin = ui.min_rect().min;
                        let width = ui.available_width();

                        let stride = CARD_HEIGHT + CARD_SPACING;
                        let count = document.story_count();
                        let first = ((viewport.min.y - LIST_TOP) / stride).floor().max(0.0) as usize;
                        let last = (((viewport.max.y - LIST_TOP) / stride).ceil().max(0.0) as usize + 1)
                            .min(count);

                        for index in first..last {
                            let top = Document::story_top(index);
                            let rect = Rect::from_min_size(
                                origin + vec2(CARD_MARGIN, top),
                                vec2(width - 2.0 * CARD_MARGIN, CARD_HEIGHT),
                            );
                            if let Some(id) = render_card(ui, theme, cards, document, index, rect) {
                                clicked = Some(id);
                            }
                        }

                        let footer = origin + vec2(width / 2.0, document.scroll_height() + FOOTER_HEIGHT / 2.0);
                        let text = if has_more { "Loading more..." } else { "No more stories" };
                        ui.painter().text(
                            footer,
                            Align2::CENTER_CENTER,
                            text,
                            FontId::proportional(13.0),
                            theme.secondary_text,
                        );
                    });
                Some(output)
            })
            .inner;

        if retry_top_stories {
            self.session.start();
        }

        if let Some(output) = output {
            let metrics = ScrollMetrics {
                scroll_top: output.state.offset.y,
                scroll_height: output.content_size.y,
                offset_height: output.inner_rect.height(),
            };
            if self.last_scroll != Some(metrics) {
                self.last_scroll = Some(metrics);
                self.session.on_scroll(metrics);
            }
        }

        // Cards slide under the header; clicks there belong to the header
        let pointer_y = ctx.input(|i| i.pointer.interact_pos()).map(|p| p.y);
        if let Some(id) = clicked {
            if pointer_y.is_some_and(|y| y > header_height) && !self.session.retry_story(id) {
                self.session.open_story(id);
            }
        }
    }

    fn render_detail_panel(&mut self, ctx: &egui::Context) {
        let screen = ctx.screen_rect();
        let panel_state = self.session.panel_state();
        let Some(panel) = self.session.document().panel() else {
            return;
        };

        let opacity = ctx.animate_value_with_time(Id::new("story-details-opacity"), panel.opacity, 0.3);
        // Views of a previous story or its comments are never shown again
        let panel_key = panel.element.key();
        let live: HashSet<ElementKey> = panel.comments().map(|c| c.key()).collect();
        self.details.retain(|key| *key == panel_key);
        self.comments.retain(|key| live.contains(key));

        if panel_state == PanelState::Hidden && !self.session.needs_frame() {
            return;
        }

        let theme = &self.theme;
        let details = self.details.get(panel.element.key(), panel.element.markup(), DetailView::parse);
        let comments: Vec<CommentView> = panel
            .comments()
            .map(|c| self.comments.get(c.key(), c.markup(), CommentView::parse))
            .collect();
        let padding_top = panel.content_padding_top;

        let mut close = false;
        let mut open_link: Option<String> = None;
        let mut header_height = None;

        egui::Area::new(Id::new("story-details"))
            .order(Order::Foreground)
            .fixed_pos(pos2(panel.left, 0.0))
            .constrain(false)
            .movable(false)
            .show(ctx, |ui| {
                ui.multiply_opacity(opacity);
                let panel_rect = Rect::from_min_size(ui.min_rect().min, screen.size());
                ui.painter().rect_filled(panel_rect, 0.0, theme.background);

                ui.scope_builder(UiBuilder::new().max_rect(panel_rect), |ui| {
                    ScrollArea::vertical()
                        .id_salt("story-details-content")
                        .auto_shrink([false, false])
                        .show(ui, |ui| {
                            ui.add_space(padding_top + 12.0);
                            if comments.is_empty() {
                                ui.label(RichText::new("No comments").color(theme.secondary_text));
                            }
                            for comment in &comments {
                                render_comment(ui, theme, comment);
                            }
                            ui.add_space(24.0);
                        });
                });

                let header = ui
                    .scope_builder(UiBuilder::new().max_rect(panel_rect), |ui| {
                        Frame::new()
                            .fill(theme.header_background)
                            .inner_margin(Margin::same(16))
                            .show(ui, |ui| {
                                ui.set_width(panel_rect.width() - 32.0);
                                ui.horizontal(|ui| {
                                    close = ui
                                        .button(RichText::new("Close").color(theme.button_foreground))
                                        .clicked();
                                });
                                ui.add_space(8.0);
                                ui.label(
                                    RichText::new(&details.title)
                                        .color(theme.header_text)
                                        .size(22.0)
                                        .strong(),
                                );
                                if let Some((href, host)) = &details.link {
                                    let link = ui.add(
                                        egui::Label::new(
                                            RichText::new(host).color(theme.header_text).underline(),
                                        )
                                        .sense(Sense::click()),
                                    );
                                    if link.clicked() {
                                        open_link = Some(href.clone());
                                    }
                                    if link.hovered() {
                                        ui.output_mut(|o| o.cursor_icon = egui::CursorIcon::PointingHand);
                                    }
                                }
                                ui.label(RichText::new(&details.byline).color(theme.header_text));
                            })
                            .response
                    })
                    .inner;
                header_height = Some(header.rect.height());
            });

        if let Some(height) = header_height {
            if height != padding_top {
                self.session.document_mut().measure_detail_header(height);
            }
        }
        if let Some(url) = open_link {
            self.open_link(&url);
        }
        if close {
            self.session.hide();
        }
    }
}

impl<G: DataGateway> eframe::App for ReaderApp<G> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.theme.apply_to_ctx(ctx);

        if !self.started {
            self.session.start();
            self.started = true;
        }

        let screen = ctx.screen_rect();
        let list_height = self.last_scroll.map_or(screen.height(), |m| m.offset_height);
        self.session.set_viewport(screen.width(), list_height);
        self.session.pump_events();
        self.session.frame();

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.session.hide();
        }

        self.render_list(ctx);
        self.render_header(ctx);
        self.render_detail_panel(ctx);

        if self.session.needs_frame() {
            ctx.request_repaint();
        }
    }
}

fn single_line(ui: &Ui, text: &str, font: FontId, color: Color32, width: f32) -> Arc<Galley> {
    let mut job = LayoutJob::single_section(text.to_string(), TextFormat::simple(font, color));
    job.wrap = TextWrapping {
        max_width: width.max(1.0),
        max_rows: 1,
        break_anywhere: false,
        overflow_character: Some('…'),
    };
    ui.fonts(|f| f.layout_job(job))
}

/// Paints one card and returns its id if it was clicked.
fn render_card(
    ui: &mut Ui,
    theme: &AppTheme,
    cards: &mut MarkupCache<CardView>,
    document: &Document,
    index: usize,
    rect: Rect,
) -> Option<StoryId> {
    let story = document.story_at(index)?;
    let key = story.element.key();
    let view = cards.get(key, story.element.markup(), CardView::parse);
    let failed = story.element.has_class("failed");
    let clickable = story.element.has_class("clickable") || failed;

    let sense = if clickable { Sense::click() } else { Sense::hover() };
    let response = ui.interact(rect, Id::new(("story", index)), sense);
    if clickable && response.hovered() {
        ui.output_mut(|o| o.cursor_icon = egui::CursorIcon::PointingHand);
    }

    let painter = ui.painter_at(rect.expand(1.0));
    let fill = if clickable && response.hovered() {
        theme.button_hover_background
    } else {
        theme.card_background
    };
    painter.rect(
        rect,
        CornerRadius::same(8),
        fill,
        Stroke::new(1.0, theme.separator),
        egui::StrokeKind::Inside,
    );

    // Score badge, sized and tinted by the colorize pass
    let badge = story.badge;
    let badge_center = pos2(rect.left() + 12.0 + 20.0, rect.top() + SCORE_OFFSET + 20.0);
    let badge_rect = Rect::from_center_size(badge_center, vec2(badge.size, badge.size));
    painter.rect_filled(
        badge_rect,
        CornerRadius::same((badge.size / 2.0).round() as u8),
        theme.badge_color(badge.saturation),
    );
    painter.text(
        badge_center,
        Align2::CENTER_CENTER,
        &view.score,
        FontId::proportional(14.0 * badge.size / 40.0),
        Color32::WHITE,
    );

    let text_left = rect.left() + 64.0;
    let text_width = rect.right() - text_left - 12.0;
    let title = single_line(
        ui,
        &view.title,
        FontId::proportional(16.0),
        theme.text.gamma_multiply(badge.title_opacity),
        text_width,
    );
    painter.galley(pos2(text_left, rect.top() + 14.0), title, theme.text);

    let (byline, color) = if failed {
        ("Failed to load, click to retry".to_string(), theme.failed)
    } else {
        (view.byline.clone(), theme.secondary_text)
    };
    let byline = single_line(ui, &byline, FontId::proportional(13.0), color, text_width);
    painter.galley(pos2(text_left, rect.top() + 42.0), byline, color);

    if response.clicked() {
        document.story_ids().get(index).copied()
    } else {
        None
    }
}

fn render_comment(ui: &mut Ui, theme: &AppTheme, comment: &CommentView) {
    Frame::new()
        .fill(theme.card_background)
        .corner_radius(CornerRadius::same(6))
        .stroke(Stroke::new(1.0, theme.separator))
        .inner_margin(Margin::same(10))
        .outer_margin(Margin::symmetric(12, 4))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            if !comment.byline.is_empty() {
                ui.label(RichText::new(&comment.byline).color(theme.secondary_text).size(13.0));
                ui.add_space(4.0);
            }
            for paragraph in &comment.paragraphs {
                ui.label(RichText::new(paragraph).color(theme.text));
                ui.add_space(4.0);
            }
        });
}
