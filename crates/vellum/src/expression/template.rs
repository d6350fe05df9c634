//! `${...}` interpolation in text nodes and attribute values.

use chumsky::prelude::*;
use std::rc::Rc;

use super::{Code, Env, ParseError};
use crate::diagnostics;
use crate::error::{Error, Result};

/// Text with embedded expressions, parsed once and rendered on every pass.
#[derive(Debug, Clone)]
pub struct Template {
    source: Rc<str>,
    parts: Rc<[TemplatePart]>,
}

#[derive(Debug, Clone)]
pub enum TemplatePart {
    Literal(String),
    Substitution(Code),
}

enum RawPart<'code> {
    Literal(String),
    Substitution(&'code str),
}

fn template_parser<'code>()
-> impl Parser<'code, &'code str, Vec<RawPart<'code>>, extra::Err<ParseError<'code, char>>> {
    let balanced_braces = recursive(|balanced_braces| {
        choice((
            just('{')
                .then(balanced_braces)
                .then(just('}'))
                .to_slice(),
            none_of("{}").to_slice(),
        ))
        .repeated()
        .to_slice()
    });

    let substitution = just("${")
        .ignore_then(balanced_braces)
        .then_ignore(just('}'))
        .map(RawPart::Substitution);

    let escaped = just('\\').ignore_then(any()).map(|character| match character {
        'n' => '\n',
        't' => '\t',
        other => other,
    });

    // `$` alone is plain text, only `${` opens a substitution
    let plain = any()
        .and_is(just("${").not())
        .and_is(just('\\').not());

    let literal = choice((escaped, plain))
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(RawPart::Literal);

    choice((substitution, literal)).repeated().collect()
}

impl Template {
    pub fn parse(source: &str) -> Result<Self> {
        let raw_parts = template_parser()
            .parse(source)
            .into_result()
            .map_err(|errors| {
                let errors = errors
                    .into_iter()
                    .map(diagnostics::SyntaxError::from_rich)
                    .collect::<Vec<_>>();
                Error::evaluation(source, diagnostics::render_report(source, &errors))
            })?;
        let parts = raw_parts
            .into_iter()
            .map(|part| match part {
                RawPart::Literal(text) => Ok(TemplatePart::Literal(text)),
                RawPart::Substitution(code) => Code::compile(code).map(TemplatePart::Substitution),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            source: source.into(),
            parts: parts.into(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    /// Whether at least one `${...}` has to be evaluated. Static text is
    /// never registered for re-rendering.
    pub fn is_dynamic(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, TemplatePart::Substitution(_)))
    }

    pub fn render(&self, env: &Rc<Env>) -> Result<String> {
        let mut rendered = String::new();
        for part in self.parts.iter() {
            match part {
                TemplatePart::Literal(text) => rendered.push_str(text),
                TemplatePart::Substitution(code) => {
                    let value = code
                        .evaluate(env)
                        .map_err(|error| error.with_source(&self.source))?;
                    rendered.push_str(&value.to_string());
                }
            }
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literals(template: &Template) -> Vec<&str> {
        template
            .parts()
            .iter()
            .filter_map(|part| match part {
                TemplatePart::Literal(text) => Some(text.as_str()),
                TemplatePart::Substitution(_) => None,
            })
            .collect()
    }

    #[test]
    fn static_text_is_not_dynamic() {
        let template = Template::parse("Total: 5 $ items").unwrap();
        assert!(!template.is_dynamic());
        assert_eq!(literals(&template), ["Total: 5 $ items"]);
    }

    #[test]
    fn substitutions_split_literals() {
        let template = Template::parse("a ${_.x} b ${ {k: 1}.k } c").unwrap();
        assert!(template.is_dynamic());
        assert_eq!(template.parts().len(), 5);
        assert_eq!(literals(&template), ["a ", " b ", " c"]);
    }

    #[test]
    fn escaped_substitution_stays_literal() {
        let template = Template::parse(r"cost \${price}").unwrap();
        assert!(!template.is_dynamic());
        assert_eq!(literals(&template), ["cost ${price}"]);
    }

    #[test]
    fn malformed_substitution_is_an_evaluation_error() {
        assert!(matches!(
            Template::parse("${_.x +}"),
            Err(Error::TemplateEvaluation { .. })
        ));
        assert!(matches!(
            Template::parse("${_.x"),
            Err(Error::TemplateEvaluation { .. })
        ));
    }
}
