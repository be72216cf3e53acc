use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ReaderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub u64);

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The minimum needed to paint a list card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorySummary {
    pub id: StoryId,
    pub title: String,
    pub score: i64,
    pub by: String,
    pub time: i64,
    pub url: Option<String>,
}

/// A story item as the API returns it. Job posts and deleted stories come
/// back without some of the fields, hence the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryDetail {
    pub id: StoryId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub by: String,
    #[serde(default)]
    pub time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kids: Option<Vec<CommentId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descendants: Option<i64>,
}

impl StoryDetail {
    pub fn summary(&self) -> StorySummary {
        StorySummary {
            id: self.id,
            title: self.title.clone(),
            score: self.score,
            by: self.by.clone(),
            time: self.time,
            url: self.url.clone(),
        }
    }

    /// Timestamp in milliseconds, which is what the templates expect.
    pub fn time_ms(&self) -> i64 {
        self.time.saturating_mul(1000)
    }

    /// Parses `url` into the parts the detail template shows. `Ok(None)` when
    /// the story has no link (Ask HN and friends).
    pub fn url_parts(&self) -> Result<Option<UrlParts>, ReaderError> {
        match self.url.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => UrlParts::parse(raw).map(Some),
        }
    }

    pub fn comment_ids(&self) -> &[CommentId] {
        self.kids.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(default)]
    pub by: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub deleted: bool,
}

impl Comment {
    pub fn time_ms(&self) -> i64 {
        self.time.saturating_mul(1000)
    }

    pub fn author(&self) -> &str {
        if self.deleted || self.by.is_empty() {
            "[deleted]"
        } else {
            &self.by
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlParts {
    pub href: String,
    pub hostname: String,
}

impl UrlParts {
    pub fn parse(raw: &str) -> Result<Self, ReaderError> {
        let parsed = url::Url::parse(raw).map_err(|source| ReaderError::MalformedUrl {
            url: raw.to_string(),
            source,
        })?;

        // A url like "mailto:x" parses fine but has nothing to show
        let hostname = parsed
            .host_str()
            .map(|h| h.trim_start_matches("www.").to_string())
            .ok_or_else(|| ReaderError::MalformedUrl {
                url: raw.to_string(),
                source: url::ParseError::EmptyHost,
            })?;

        Ok(Self {
            href: parsed.to_string(),
            hostname,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_item_deserializes_with_missing_fields() {
        let json = r#"{"id": 8863, "type": "job", "time": 1175714200}"#;
        let detail: StoryDetail = serde_json::from_str(json).unwrap();

        assert_eq!(detail.id, StoryId(8863));
        assert!(detail.title.is_empty());
        assert_eq!(detail.score, 0);
        assert!(detail.comment_ids().is_empty());
        assert_eq!(detail.time_ms(), 1_175_714_200_000);
    }

    #[test]
    fn story_item_keeps_kids_order() {
        let json = r#"{"id": 1, "title": "t", "by": "pg", "score": 3, "time": 10, "kids": [9, 4, 7]}"#;
        let detail: StoryDetail = serde_json::from_str(json).unwrap();

        assert_eq!(
            detail.comment_ids(),
            &[CommentId(9), CommentId(4), CommentId(7)]
        );
    }

    #[test]
    fn url_parts_strips_www() {
        let parts = UrlParts::parse("https://www.example.com/a?b=c").unwrap();
        assert_eq!(parts.hostname, "example.com");
        assert_eq!(parts.href, "https://www.example.com/a?b=c");
    }

    #[test]
    fn malformed_url_is_an_error() {
        let detail = StoryDetail {
            id: StoryId(1),
            title: "x".into(),
            score: 1,
            by: "a".into(),
            time: 0,
            url: Some("not a url".into()),
            kids: None,
            descendants: None,
        };

        assert!(matches!(
            detail.url_parts(),
            Err(ReaderError::MalformedUrl { .. })
        ));
    }

    #[test]
    fn missing_url_is_not_an_error() {
        let detail = StoryDetail {
            id: StoryId(1),
            title: "Ask HN".into(),
            score: 1,
            by: "a".into(),
            time: 0,
            url: None,
            kids: None,
            descendants: None,
        };

        assert_eq!(detail.url_parts().unwrap(), None);
    }

    #[test]
    fn deleted_comment_has_placeholder_author() {
        let json = r#"{"id": 5, "deleted": true, "time": 2}"#;
        let comment: Comment = serde_json::from_str(json).unwrap();
        assert_eq!(comment.author(), "[deleted]");
        assert_eq!(comment.time_ms(), 2000);
    }
}
