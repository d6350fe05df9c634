//! Human-readable reports for code that failed to compile or run.
//!
//! Nothing here changes control flow: callers report and then propagate.

use ariadne::{Config as ReportConfig, Label, Report, ReportKind, Source};
use chumsky::error::Rich;
use std::fmt;
use std::io::Cursor;
use std::ops::Range;

use crate::document::{Document, NodeId};
use crate::error::Error;
use crate::expression::Span;

const FILENAME: &str = "template";

#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub span: Range<usize>,
    pub message: String,
    pub reason: String,
}

impl SyntaxError {
    pub fn from_rich<T: fmt::Display>(error: Rich<'_, T, Span>) -> Self {
        Self {
            span: error.span().into_range(),
            message: error.to_string(),
            reason: error.reason().to_string(),
        }
    }
}

/// One ariadne report per error, concatenated, without colors.
pub fn render_report(source_code: &str, errors: &[SyntaxError]) -> String {
    let mut report_bytes = Cursor::new(Vec::new());
    for error in errors {
        let written = Report::build(ReportKind::Error, (FILENAME, error.span.clone()))
            .with_config(ReportConfig::default().with_color(false))
            .with_message(&error.message)
            .with_label(Label::new((FILENAME, error.span.clone())).with_message(&error.reason))
            .finish()
            .write((FILENAME, Source::from(source_code)), &mut report_bytes);
        if written.is_err() {
            // The report is a nicety, the message alone still says what failed
            return errors
                .iter()
                .map(|error| error.message.as_str())
                .collect::<Vec<_>>()
                .join("\n");
        }
    }
    let report = String::from_utf8_lossy(report_bytes.get_ref()).into_owned();
    if report.is_empty() {
        "unexpected end of input".to_owned()
    } else {
        report
    }
}

/// Short description of an element for log lines, e.g. `<li class="item">`.
pub fn describe(document: &dyn Document, node: NodeId) -> String {
    match document.tag_name(node) {
        Some(tag) => {
            let attributes = document
                .attributes(node)
                .into_iter()
                .take(3)
                .map(|(name, value)| format!(" {name}=\"{value}\""))
                .collect::<String>();
            format!("<{tag}{attributes}>")
        }
        None => format!("text node {node}"),
    }
}

/// Log a failure tied to an element and optionally one of its attributes.
pub(crate) fn problematic(
    document: &dyn Document,
    node: NodeId,
    attribute: Option<(&str, &str)>,
    error: &Error,
) {
    let element = describe(document, node);
    match attribute {
        Some((name, value)) => {
            tracing::warn!(%element, attribute = name, value, %error, "problematic attribute")
        }
        None => tracing::warn!(%element, %error, "problematic element"),
    }
}
