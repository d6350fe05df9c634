use super::{ParseError, Spanned};
use chumsky::prelude::*;
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'code> {
    BracketRoundOpen,
    BracketRoundClose,
    BracketCurlyOpen,
    BracketCurlyClose,
    BracketSquareOpen,
    BracketSquareClose,
    Number(f64),
    // Raw content between quotes, escapes not yet processed
    Text(&'code str),
    // Raw content between backticks, may contain `${...}`
    Template(&'code str),
    Identifier(&'code str),
    True,
    False,
    Null,
    Undefined,
    Typeof,
    Return,
    Arrow,
    QuestionDot,
    Nullish,
    Question,
    Colon,
    Comma,
    Dot,
    Semicolon,
    StrictEqual,
    StrictNotEqual,
    Equal,
    NotEqual,
    LessOrEqual,
    GreaterOrEqual,
    Less,
    Greater,
    And,
    Or,
    Not,
    Increment,
    Decrement,
    PlusAssign,
    MinusAssign,
    AsteriskAssign,
    SlashAssign,
    Assign,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
}

impl<'code> Token<'code> {
    pub fn into_cow_str(self) -> Cow<'code, str> {
        match self {
            Self::BracketRoundOpen => "(".into(),
            Self::BracketRoundClose => ")".into(),
            Self::BracketCurlyOpen => "{".into(),
            Self::BracketCurlyClose => "}".into(),
            Self::BracketSquareOpen => "[".into(),
            Self::BracketSquareClose => "]".into(),
            Self::Number(number) => number.to_string().into(),
            Self::Text(text) => format!("'{text}'").into(),
            Self::Template(template) => format!("`{template}`").into(),
            Self::Identifier(identifier) => identifier.into(),
            Self::True => "true".into(),
            Self::False => "false".into(),
            Self::Null => "null".into(),
            Self::Undefined => "undefined".into(),
            Self::Typeof => "typeof".into(),
            Self::Return => "return".into(),
            Self::Arrow => "=>".into(),
            Self::QuestionDot => "?.".into(),
            Self::Nullish => "??".into(),
            Self::Question => "?".into(),
            Self::Colon => ":".into(),
            Self::Comma => ",".into(),
            Self::Dot => ".".into(),
            Self::Semicolon => ";".into(),
            Self::StrictEqual => "===".into(),
            Self::StrictNotEqual => "!==".into(),
            Self::Equal => "==".into(),
            Self::NotEqual => "!=".into(),
            Self::LessOrEqual => "<=".into(),
            Self::GreaterOrEqual => ">=".into(),
            Self::Less => "<".into(),
            Self::Greater => ">".into(),
            Self::And => "&&".into(),
            Self::Or => "||".into(),
            Self::Not => "!".into(),
            Self::Increment => "++".into(),
            Self::Decrement => "--".into(),
            Self::PlusAssign => "+=".into(),
            Self::MinusAssign => "-=".into(),
            Self::AsteriskAssign => "*=".into(),
            Self::SlashAssign => "/=".into(),
            Self::Assign => "=".into(),
            Self::Plus => "+".into(),
            Self::Minus => "-".into(),
            Self::Asterisk => "*".into(),
            Self::Slash => "/".into(),
            Self::Percent => "%".into(),
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.into_cow_str())
    }
}

pub fn lexer<'code>()
-> impl Parser<'code, &'code str, Vec<Spanned<Token<'code>>>, extra::Err<ParseError<'code, char>>> {
    let bracket = choice((
        just('(').to(Token::BracketRoundOpen),
        just(')').to(Token::BracketRoundClose),
        just('{').to(Token::BracketCurlyOpen),
        just('}').to(Token::BracketCurlyClose),
        just('[').to(Token::BracketSquareOpen),
        just(']').to(Token::BracketSquareClose),
    ));

    // Longest operators first, `===` must win over `==` and `=>` over `=`
    let comparator = choice((
        just("===").to(Token::StrictEqual),
        just("!==").to(Token::StrictNotEqual),
        just("==").to(Token::Equal),
        just("!=").to(Token::NotEqual),
        just("=>").to(Token::Arrow),
        just("<=").to(Token::LessOrEqual),
        just(">=").to(Token::GreaterOrEqual),
        just('<').to(Token::Less),
        just('>').to(Token::Greater),
    ));

    let logical = choice((
        just("&&").to(Token::And),
        just("||").to(Token::Or),
        just("??").to(Token::Nullish),
        just("?.").to(Token::QuestionDot),
        just('?').to(Token::Question),
        just('!').to(Token::Not),
    ));

    let arithmetic_or_assignment = choice((
        just("++").to(Token::Increment),
        just("--").to(Token::Decrement),
        just("+=").to(Token::PlusAssign),
        just("-=").to(Token::MinusAssign),
        just("*=").to(Token::AsteriskAssign),
        just("/=").to(Token::SlashAssign),
        just('=').to(Token::Assign),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Asterisk),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
    ));

    // Negative numbers are a unary minus applied by the parser
    let number = text::int(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .from_str()
        .unwrapped()
        .map(Token::Number);

    let escaped = just('\\').then(any()).ignored();

    let quoted = |quote: char| {
        just(quote)
            .ignore_then(
                escaped
                    .or(none_of([quote, '\\']).ignored())
                    .repeated()
                    .to_slice(),
            )
            .then_ignore(just(quote))
            .map(Token::Text)
    };

    // `${...}` inside a backtick literal may contain braces of object
    // literals, so match them balanced
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

    let template = just('`')
        .ignore_then(
            choice((
                escaped,
                just("${")
                    .then(balanced_braces)
                    .then(just('}'))
                    .ignored(),
                none_of("`\\").ignored(),
            ))
            .repeated()
            .to_slice(),
        )
        .then_ignore(just('`'))
        .map(Token::Template);

    let identifier = any()
        .filter(|character: &char| {
            *character == '_' || *character == '$' || character.is_ascii_alphabetic()
        })
        .then(
            any()
                .filter(|character: &char| {
                    *character == '_' || *character == '$' || character.is_ascii_alphanumeric()
                })
                .repeated(),
        )
        .to_slice()
        .map(|identifier: &str| match identifier {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            "undefined" => Token::Undefined,
            "typeof" => Token::Typeof,
            "return" => Token::Return,
            _ => Token::Identifier(identifier),
        });

    let token = choice((
        bracket,
        number,
        quoted('\''),
        quoted('"'),
        template,
        identifier,
        comparator,
        logical,
        arithmetic_or_assignment,
        just(':').to(Token::Colon),
        just(',').to(Token::Comma),
        just('.').to(Token::Dot),
        just(';').to(Token::Semicolon),
    ));

    token
        .map_with(|token, extra| Spanned {
            node: token,
            span: extra.span(),
        })
        .padded()
        .recover_with(skip_then_retry_until(any().ignored(), end()))
        .repeated()
        .collect()
}

/// Resolve backslash escapes of a quoted or template literal.
pub(crate) fn unescape(raw: &str) -> String {
    let mut unescaped = String::with_capacity(raw.len());
    let mut characters = raw.chars();
    while let Some(character) = characters.next() {
        if character != '\\' {
            unescaped.push(character);
            continue;
        }
        match characters.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some('r') => unescaped.push('\r'),
            Some('0') => unescaped.push('\0'),
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chumsky::prelude::Parser;

    fn tokens(code: &str) -> Vec<Token<'_>> {
        lexer()
            .parse(code)
            .into_result()
            .unwrap()
            .into_iter()
            .map(|token| token.node)
            .collect()
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            tokens("a === b !== c => d"),
            vec![
                Token::Identifier("a"),
                Token::StrictEqual,
                Token::Identifier("b"),
                Token::StrictNotEqual,
                Token::Identifier("c"),
                Token::Arrow,
                Token::Identifier("d"),
            ]
        );
    }

    #[test]
    fn test_member_update() {
        assert_eq!(
            tokens("_.count++"),
            vec![
                Token::Identifier("_"),
                Token::Dot,
                Token::Identifier("count"),
                Token::Increment,
            ]
        );
    }

    #[test]
    fn test_strings_and_templates() {
        assert_eq!(
            tokens(r#"'it\'s' "a" `x ${ {a: 1}.a } y`"#),
            vec![
                Token::Text(r"it\'s"),
                Token::Text("a"),
                Token::Template("x ${ {a: 1}.a } y"),
            ]
        );
    }

    #[test]
    fn test_dollar_identifiers_and_keywords() {
        assert_eq!(
            tokens("$index typeof null"),
            vec![Token::Identifier("$index"), Token::Typeof, Token::Null]
        );
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb\'c\\"), "a\nb'c\\");
    }
}
