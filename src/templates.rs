//! The three card templates, rendered with handlebars.
//!
//! `{{ x }}` is html-escaped and `{{{ x }}}` is raw (comment bodies arrive as
//! html). `formatRelative` turns a millisecond timestamp into "3 hours ago".

use chrono::{DateTime, TimeZone, Utc};
use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, RenderError,
    RenderErrorReason,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;

pub const STORY_TEMPLATE: &str = r#"<div class="story__score">{{ score }}</div>
<div class="story__details">
  <h1 class="story__title">{{ title }}</h1>
  <div class="story__by">{{ by }}, {{ formatRelative time }}</div>
</div>"#;

pub const STORY_DETAILS_TEMPLATE: &str = r#"<header class="story-details__header js-header">
  <button class="story-details__close js-close">Close</button>
  <h1 class="story-details__title">{{ title }}</h1>
  {{#if urlobj}}<a class="story-details__link" href="{{ urlobj.href }}">{{ urlobj.hostname }}</a>{{/if}}
  <div class="story-details__by">{{ score }} points by {{ by }}, {{ formatRelative time }}</div>
</header>
<section class="story-details__content js-content">
  <div class="story-details__comments js-comments"></div>
</section>"#;

pub const COMMENT_TEMPLATE: &str = r#"<header class="story-details__comment-by">{{ by }}, {{ formatRelative time }}</header>
<div class="story-details__comment-text">{{{ text }}}</div>"#;

lazy_static! {
    // Without relative time formatting the templates lose their ", <time>" tail.
    static ref INTL_RELATIVE: Regex =
        Regex::new(r",\s*\{\{\s*formatRelative time\s*\}\}").expect("Invalid regex pattern");
}

const STORY: &str = "story";
const STORY_DETAILS: &str = "story-details";
const COMMENT: &str = "comment";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template {name:?} does not compile: {source}")]
    Compile {
        name: &'static str,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    #[error("render failed: {0}")]
    Render(#[from] RenderError),
}

/// `{{ formatRelative time }}` for a millisecond timestamp. A missing or null
/// value renders nothing.
struct FormatRelative;

impl HelperDef for FormatRelative {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let Some(value) = h.param(0).map(|p| p.value()) else {
            return Ok(());
        };
        let millis = match value {
            Value::Null => return Ok(()),
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            _ => None,
        };
        let Some(millis) = millis else {
            return Err(RenderErrorReason::Other(format!("{value} is not a timestamp")).into());
        };

        out.write(&format_relative(millis, Utc::now()))?;
        Ok(())
    }
}

/// Relative time for a millisecond timestamp.
pub fn format_relative(millis: i64, now: DateTime<Utc>) -> String {
    let then = match Utc.timestamp_millis_opt(millis).single() {
        Some(then) => then,
        None => return String::new(),
    };
    let diff = (now - then).num_seconds();

    let (amount, unit) = if diff < 0 {
        return "just now".to_string();
    } else if diff < 60 {
        (diff, "second")
    } else if diff < 3600 {
        (diff / 60, "minute")
    } else if diff < 86400 {
        (diff / 3600, "hour")
    } else if diff < 86400 * 30 {
        (diff / 86400, "day")
    } else if diff < 86400 * 365 {
        (diff / (86400 * 30), "month")
    } else {
        (diff / (86400 * 365), "year")
    };

    if amount == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{amount} {unit}s ago")
    }
}

/// Story card, story detail panel and comment templates.
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new(relative_time: bool) -> Result<Self, TemplateError> {
        Self::from_sources(
            STORY_TEMPLATE,
            STORY_DETAILS_TEMPLATE,
            COMMENT_TEMPLATE,
            relative_time,
        )
    }

    pub fn from_sources(
        story: &str,
        story_details: &str,
        comment: &str,
        relative_time: bool,
    ) -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_helper("formatRelative", Box::new(FormatRelative));

        for (name, source) in [(STORY, story), (STORY_DETAILS, story_details), (COMMENT, comment)] {
            let source = if relative_time {
                Cow::Borrowed(source)
            } else {
                INTL_RELATIVE.replace_all(source, "")
            };
            registry
                .register_template_string(name, source)
                .map_err(|e| TemplateError::Compile {
                    name,
                    source: Box::new(e),
                })?;
        }

        Ok(Self { registry })
    }

    pub fn story(&self, data: &Value) -> Result<String, TemplateError> {
        Ok(self.registry.render(STORY, data)?)
    }

    pub fn story_details(&self, data: &Value) -> Result<String, TemplateError> {
        Ok(self.registry.render(STORY_DETAILS, data)?)
    }

    pub fn comment(&self, data: &Value) -> Result<String, TemplateError> {
        Ok(self.registry.render(COMMENT, data)?)
    }
}
