//! Reader error types.

use thiserror::Error;

use crate::templates::TemplateError;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("fetch failed for {what}: {reason}")]
    FetchFailure { what: String, reason: String },

    #[error("malformed url {url:?}: {source}")]
    MalformedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("invalid config: {0}")]
    Config(String),
}

impl ReaderError {
    pub fn fetch(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::FetchFailure {
            what: what.into(),
            reason: reason.to_string(),
        }
    }
}
