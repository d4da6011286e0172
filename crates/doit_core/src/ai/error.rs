use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::model::task::DueDateParseError;

/// Failure of one assistant round-trip. Logged, then replaced by a fallback.
#[derive(Debug)]
pub(crate) enum AiError {
    Http(reqwest::Error),
    Status(u16),
    EmptyReply,
    Malformed(serde_json::Error),
    BlankContent,
    DueDate(DueDateParseError),
}

impl AiError {
    /// Short tag for log lines.
    pub(crate) fn reason(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Status(_) => "status",
            Self::EmptyReply => "empty_reply",
            Self::Malformed(_) => "malformed",
            Self::BlankContent => "blank_content",
            Self::DueDate(_) => "due_date",
        }
    }
}

impl Display for AiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "request failed: {err}"),
            Self::Status(status) => write!(f, "service answered HTTP {status}"),
            Self::EmptyReply => write!(f, "reply carried no text"),
            Self::Malformed(err) => write!(f, "reply is not the requested shape: {err}"),
            Self::BlankContent => write!(f, "reply content is blank"),
            Self::DueDate(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::Malformed(err) => Some(err),
            Self::DueDate(err) => Some(err),
            Self::Status(_) | Self::EmptyReply | Self::BlankContent => None,
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

impl From<serde_json::Error> for AiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value)
    }
}

impl From<DueDateParseError> for AiError {
    fn from(value: DueDateParseError) -> Self {
        Self::DueDate(value)
    }
}
