//! HTML-like markup, tokenized with chumsky and assembled with an explicit
//! stack of open elements.

use chumsky::prelude::*;

use crate::diagnostics::{self, SyntaxError};
use crate::error::{Error, Result};
use crate::expression::{ParseError, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
enum MarkupToken<'code> {
    Open {
        tag: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    Close(String),
    /// Element whose content is never parsed as markup.
    Raw {
        tag: String,
        attributes: Vec<(String, String)>,
        content: &'code str,
    },
    Text(&'code str),
    Comment,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn tokenizer<'code>()
-> impl Parser<'code, &'code str, Vec<(MarkupToken<'code>, Span)>, extra::Err<ParseError<'code, char>>> {
    let tag_name = any()
        .filter(|character: &char| character.is_ascii_alphabetic())
        .then(
            any()
                .filter(|character: &char| character.is_ascii_alphanumeric() || *character == '-')
                .repeated(),
        )
        .to_slice()
        .map(|tag: &str| tag.to_ascii_lowercase());

    let attribute_name = any()
        .filter(|character: &char| {
            !character.is_whitespace() && !matches!(character, '=' | '>' | '/' | '"' | '\'' | '<')
        })
        .repeated()
        .at_least(1)
        .to_slice()
        .map(str::to_owned);

    let quoted = |quote: char| {
        just(quote)
            .ignore_then(none_of(quote).repeated().to_slice())
            .then_ignore(just(quote))
    };
    let unquoted = any()
        .filter(|character: &char| !character.is_whitespace() && !matches!(character, '>' | '"' | '\''))
        .repeated()
        .at_least(1)
        .to_slice();
    let attribute_value = just('=')
        .padded()
        .ignore_then(choice((quoted('"'), quoted('\''), unquoted)))
        .map(decode_entities);

    let attribute = attribute_name
        .then(attribute_value.or_not())
        .map(|(name, value)| (name, value.unwrap_or_default()));

    let attributes = attribute
        .padded()
        .repeated()
        .collect::<Vec<_>>();

    let raw = just('<')
        .ignore_then(choice((just("script"), just("style"))).map(str::to_owned))
        .then(attributes.clone())
        .then_ignore(just('>'))
        .then(
            any()
                .and_is(just("</script>").not())
                .and_is(just("</style>").not())
                .repeated()
                .to_slice(),
        )
        .then_ignore(choice((just("</script>"), just("</style>"))))
        .map(|((tag, attributes), content)| MarkupToken::Raw {
            tag,
            attributes,
            content,
        });

    let open = just('<')
        .ignore_then(tag_name.clone())
        .then(attributes)
        .then(just('/').or_not())
        .then_ignore(just('>'))
        .map(|((tag, attributes), slash)| MarkupToken::Open {
            tag,
            attributes,
            self_closing: slash.is_some(),
        });

    let close = just("</")
        .ignore_then(tag_name.padded())
        .then_ignore(just('>'))
        .map(MarkupToken::Close);

    let comment = just("<!--")
        .then(any().and_is(just("-->").not()).repeated())
        .then(just("-->"))
        .to(MarkupToken::Comment);

    let doctype = just("<!")
        .then(none_of('>').repeated())
        .then(just('>'))
        .to(MarkupToken::Comment);

    let text = none_of('<').repeated().at_least(1).to_slice().map(MarkupToken::Text);

    choice((comment, doctype, raw, close, open, text))
        .map_with(|token, extra| (token, extra.span()))
        .repeated()
        .collect()
}

struct OpenElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<MarkupNode>,
}

/// Parse markup into a forest of nodes. Comments are dropped.
pub fn parse(markup: &str) -> Result<Vec<MarkupNode>> {
    let tokens = tokenizer().parse(markup).into_result().map_err(|errors| {
        let errors = errors
            .into_iter()
            .map(SyntaxError::from_rich)
            .collect::<Vec<_>>();
        Error::structural(diagnostics::render_report(markup, &errors))
    })?;

    let mut top_level = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();

    fn push(stack: &mut [OpenElement], top_level: &mut Vec<MarkupNode>, node: MarkupNode) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => top_level.push(node),
        }
    }

    for (token, span) in tokens {
        match token {
            MarkupToken::Comment => {}
            MarkupToken::Text(text) => {
                push(&mut stack, &mut top_level, MarkupNode::Text(decode_entities(text)));
            }
            MarkupToken::Raw {
                tag,
                attributes,
                content,
            } => {
                let children = if content.is_empty() {
                    Vec::new()
                } else {
                    vec![MarkupNode::Text(content.to_owned())]
                };
                push(
                    &mut stack,
                    &mut top_level,
                    MarkupNode::Element {
                        tag,
                        attributes,
                        children,
                    },
                );
            }
            MarkupToken::Open {
                tag,
                attributes,
                self_closing,
            } => {
                if self_closing || is_void(&tag) {
                    push(
                        &mut stack,
                        &mut top_level,
                        MarkupNode::Element {
                            tag,
                            attributes,
                            children: Vec::new(),
                        },
                    );
                } else {
                    stack.push(OpenElement {
                        tag,
                        attributes,
                        children: Vec::new(),
                    });
                }
            }
            MarkupToken::Close(tag) => {
                if is_void(&tag) {
                    continue;
                }
                let Some(open) = stack.pop() else {
                    return Err(Error::structural(format!(
                        "unexpected closing tag `</{tag}>` at {}",
                        span.start
                    )));
                };
                if open.tag != tag {
                    return Err(Error::structural(format!(
                        "closing tag `</{tag}>` at {} does not match `<{}>`",
                        span.start, open.tag
                    )));
                }
                push(
                    &mut stack,
                    &mut top_level,
                    MarkupNode::Element {
                        tag: open.tag,
                        attributes: open.attributes,
                        children: open.children,
                    },
                );
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::structural(format!("unclosed element `<{}>`", open.tag)));
    }
    Ok(top_level)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
