//! Reads rendered template markup back into the pieces egui paints.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

use crate::document::ElementKey;

lazy_static! {
    static ref STORY_SCORE: Selector = selector(".story__score");
    static ref STORY_TITLE: Selector = selector(".story__title");
    static ref STORY_BY: Selector = selector(".story__by");
    static ref DETAILS_TITLE: Selector = selector(".story-details__title");
    static ref DETAILS_LINK: Selector = selector(".story-details__link");
    static ref DETAILS_BY: Selector = selector(".story-details__by");
    static ref COMMENT_BY: Selector = selector(".story-details__comment-by");
    static ref COMMENT_TEXT: Selector = selector(".story-details__comment-text");
    static ref TAG: Regex = Regex::new(r"<[^>]+>").expect("Invalid regex pattern");
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Invalid selector")
}

fn text_of(fragment: &Html, selector: &Selector) -> String {
    fragment
        .select(selector)
        .next()
        .map(|e| collapse_whitespace(&e.text().collect::<String>()))
        .unwrap_or_default()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CardView {
    pub score: String,
    pub title: String,
    pub byline: String,
}

impl CardView {
    pub fn parse(markup: &str) -> Self {
        let fragment = Html::parse_fragment(markup);
        Self {
            score: text_of(&fragment, &STORY_SCORE),
            title: text_of(&fragment, &STORY_TITLE),
            byline: text_of(&fragment, &STORY_BY),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetailView {
    pub title: String,
    /// `(href, hostname)` when the story links somewhere.
    pub link: Option<(String, String)>,
    pub byline: String,
}

impl DetailView {
    pub fn parse(markup: &str) -> Self {
        let fragment = Html::parse_fragment(markup);
        let link = fragment.select(&DETAILS_LINK).next().and_then(|a| {
            let href = a.value().attr("href")?.to_string();
            let host = collapse_whitespace(&a.text().collect::<String>());
            Some((href, host))
        });

        Self {
            title: text_of(&fragment, &DETAILS_TITLE),
            link,
            byline: text_of(&fragment, &DETAILS_BY),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommentView {
    pub byline: String,
    pub paragraphs: Vec<String>,
}

impl CommentView {
    pub fn parse(markup: &str) -> Self {
        let fragment = Html::parse_fragment(markup);
        let paragraphs = fragment
            .select(&COMMENT_TEXT)
            .next()
            .map(paragraphs_of)
            .unwrap_or_default();

        Self {
            byline: text_of(&fragment, &COMMENT_BY),
            paragraphs,
        }
    }
}

// HN separates paragraphs with a bare <p>, never closing them
fn paragraphs_of(body: ElementRef<'_>) -> Vec<String> {
    let html = body.inner_html().replace("<br>", "\n");
    html.split("<p>")
        .map(|chunk| {
            let stripped = TAG.replace_all(chunk, "");
            html_escape::decode_html_entities(stripped.trim()).to_string()
        })
        .filter(|p| !p.is_empty())
        .collect()
}

/// Parsed views, reparsed only when an element's markup changes.
#[derive(Default)]
pub struct MarkupCache<V> {
    entries: HashMap<ElementKey, (String, V)>,
}

impl<V: Clone> MarkupCache<V> {
    pub fn get(&mut self, key: ElementKey, markup: &str, parse: impl FnOnce(&str) -> V) -> V {
        match self.entries.get(&key) {
            Some((seen, view)) if seen == markup => view.clone(),
            _ => {
                let view = parse(markup);
                self.entries.insert(key, (markup.to_string(), view.clone()));
                view
            }
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&ElementKey) -> bool) {
        self.entries.retain(|key, _| keep(key));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommentId, StoryId};
    use crate::templates::Templates;
    use serde_json::json;

    #[test]
    fn reads_story_card_regions() {
        let templates = Templates::new(false).unwrap();
        let markup = templates
            .story(&json!({"title": "Rust & friends", "score": 321, "by": "steve", "time": 0}))
            .unwrap();

        let card = CardView::parse(&markup);
        assert_eq!(card.score, "321");
        assert_eq!(card.title, "Rust & friends");
        assert_eq!(card.byline, "steve");
    }

    #[test]
    fn reads_detail_link() {
        let templates = Templates::new(false).unwrap();
        let markup = templates
            .story_details(&json!({
                "title": "A post",
                "score": 9,
                "by": "pg",
                "time": 0,
                "urlobj": {"href": "https://example.com/a/b", "hostname": "example.com"},
            }))
            .unwrap();

        let view = DetailView::parse(&markup);
        assert_eq!(view.title, "A post");
        assert_eq!(
            view.link,
            Some(("https://example.com/a/b".to_string(), "example.com".to_string()))
        );
        assert_eq!(view.byline, "9 points by pg");
    }

    #[test]
    fn detail_without_url_has_no_link() {
        let templates = Templates::new(false).unwrap();
        let markup = templates
            .story_details(&json!({"title": "Ask HN", "score": 1, "by": "a", "time": 0}))
            .unwrap();
        assert_eq!(DetailView::parse(&markup).link, None);
    }

    #[test]
    fn splits_comment_paragraphs() {
        let templates = Templates::new(false).unwrap();
        let markup = templates
            .comment(&json!({
                "by": "dang",
                "text": "First &amp; foremost<p>Second <i>point</i>",
                "time": 0,
            }))
            .unwrap();

        let view = CommentView::parse(&markup);
        assert_eq!(view.byline, "dang");
        assert_eq!(view.paragraphs, vec!["First & foremost", "Second point"]);
    }

    #[test]
    fn cache_reparses_only_on_change() {
        let mut cache = MarkupCache::default();
        let key = ElementKey::Story(StoryId(1));
        let mut parses = 0;

        let mut get = |cache: &mut MarkupCache<String>, markup: &str| {
            cache.get(key, markup, |m| {
                parses += 1;
                m.to_uppercase()
            })
        };

        assert_eq!(get(&mut cache, "a"), "A");
        assert_eq!(get(&mut cache, "a"), "A");
        assert_eq!(get(&mut cache, "b"), "B");
        drop(get);
        assert_eq!(parses, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn retain_forgets_comments_of_a_closed_story() {
        let mut cache = MarkupCache::default();
        for id in [10, 11, 20] {
            let key = ElementKey::Comment(CommentId(id));
            cache.get(key, "<p>x</p>", CommentView::parse);
        }

        let live = [ElementKey::Comment(CommentId(20))];
        cache.retain(|key| live.contains(key));

        assert_eq!(cache.len(), 1);
        let mut reparsed = false;
        cache.get(ElementKey::Comment(CommentId(10)), "<p>x</p>", |m| {
            reparsed = true;
            CommentView::parse(m)
        });
        assert!(reparsed);
    }
}
