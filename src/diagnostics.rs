use crate::{
    errors::MalformedSource,
    tree::{BuildError, DiagnosticBatch, IssueKind, TreeIssue, CODE_MALFORMED_SOURCE},
};
use miette::{Diagnostic, LabeledSpan, NamedSource, Report, SourceSpan};
use std::{io, path::Path};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(topic_tree::malformed_source))]
pub struct SourceDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
}

impl SourceDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &MalformedSource) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message.clone(),
        }
    }
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{code}: {message}")]
pub struct IssueDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label(collection)]
    labels: Vec<LabeledSpan>,
    #[help]
    help: Option<String>,
    code: &'static str,
    message: String,
}

impl IssueDiagnostic {
    pub fn from_issue(src: NamedSource<String>, issue: &TreeIssue) -> Self {
        let labels = issue
            .span
            .map(|span| LabeledSpan::new_with_span(Some(issue.kind.label().to_string()), span))
            .into_iter()
            .collect();
        Self {
            src,
            labels,
            help: issue_help(&issue.kind),
            code: issue.code(),
            message: format!("{} (at {})", issue.message(), issue.path),
        }
    }
}

fn issue_help(kind: &IssueKind) -> Option<String> {
    match kind {
        IssueKind::DuplicateIdentifier { .. } => {
            Some("give one of the entries a distinct `id` attribute".into())
        }
        IssueKind::DuplicateReference { .. } => {
            Some("a topic may appear only once; remove one of the entries".into())
        }
        IssueKind::UnresolvedReference { .. } => {
            Some("check the path against the content directory".into())
        }
        IssueKind::UnresolvedFragment { .. } => {
            Some("anchors come from headings, `{#anchor}` markers or `id` attributes".into())
        }
        IssueKind::UnresolvedStartEntry { .. } => {
            Some("point `start-page` at a tree entry or an existing topic".into())
        }
        IssueKind::CyclicStructure { .. } => None,
    }
}

/// One line per problem: `Kind: ancestor path: message`.
pub fn build_error_lines(error: &BuildError) -> Vec<String> {
    match error {
        BuildError::Malformed(err) => vec![malformed_line(err)],
        BuildError::Rejected(batch) => batch_lines(batch),
    }
}

pub fn batch_lines(batch: &DiagnosticBatch) -> Vec<String> {
    batch.issues().iter().map(ToString::to_string).collect()
}

pub fn malformed_line(err: &MalformedSource) -> String {
    format!(
        "{CODE_MALFORMED_SOURCE}: byte {}: {}",
        err.span.start, err.message
    )
}

/// Renders every problem with source context on stderr.
pub fn emit_build_error(path: &Path, source: &str, error: &BuildError) {
    let named = NamedSource::new(path.display().to_string(), source.to_string());
    match error {
        BuildError::Malformed(err) => {
            let diagnostic = SourceDiagnostic::from_error(named, err);
            eprintln!("{:?}", Report::new(diagnostic));
        }
        BuildError::Rejected(batch) => {
            for issue in batch.issues() {
                let diagnostic = IssueDiagnostic::from_issue(named.clone(), issue);
                eprintln!("{:?}", Report::new(diagnostic));
            }
        }
    }
}

pub fn report_io_error(path: &Path, error: &io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}
