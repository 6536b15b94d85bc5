use crate::span::Span;
use miette::SourceSpan;
use thiserror::Error;

/// Structural failure while reading a tree declaration. Fatal: no tree can be produced.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct MalformedSource {
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
}

impl MalformedSource {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn to_source_span(&self) -> SourceSpan {
        self.span.into()
    }
}
