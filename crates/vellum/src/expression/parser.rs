use super::lexer::unescape;
use super::{ParseError, Span, Spanned, Template, Token};
use crate::value::format_number;
use chumsky::{input::ValueInput, pratt::*, prelude::*};
use std::rc::Rc;

pub fn parser<'code, I>()
-> impl Parser<'code, I, Vec<Spanned<Statement>>, extra::Err<ParseError<'code, Token<'code>>>>
where
    I: ValueInput<'code, Token = Token<'code>, Span = Span>,
{
    let expression = recursive(|expression| {
        let comma = just(Token::Comma);
        let bracket_round_open = just(Token::BracketRoundOpen);
        let bracket_round_close = just(Token::BracketRoundClose);
        let bracket_curly_open = just(Token::BracketCurlyOpen);
        let bracket_curly_close = just(Token::BracketCurlyClose);
        let bracket_square_open = just(Token::BracketSquareOpen);
        let bracket_square_close = just(Token::BracketSquareClose);

        let identifier = select! { Token::Identifier(identifier) => identifier.to_owned() };

        let literal = select! {
            Token::Number(number) => Literal::Number(number),
            Token::Text(text) => Literal::Text(unescape(text).into()),
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Null => Literal::Null,
            Token::Undefined => Literal::Undefined,
        }
        .map(Expr::Literal);

        let template = select! { Token::Template(raw) => raw }.try_map(|raw: &str, span| {
            Template::parse(raw)
                .map(Expr::Template)
                .map_err(|error| Rich::custom(span, error.to_string()))
        });

        let variable = identifier.clone().map(Expr::Identifier);

        let parameters = choice((
            identifier.clone().map(|parameter| vec![parameter]),
            identifier
                .clone()
                .separated_by(comma.clone())
                .allow_trailing()
                .collect::<Vec<_>>()
                .delimited_by(bracket_round_open.clone(), bracket_round_close.clone()),
        ));

        let arrow = parameters
            .then_ignore(just(Token::Arrow))
            .then(expression.clone())
            .map(|(parameters, body)| Expr::Arrow {
                parameters,
                body: Rc::new(body),
            });

        let list = expression
            .clone()
            .separated_by(comma.clone())
            .allow_trailing()
            .collect()
            .delimited_by(bracket_square_open.clone(), bracket_square_close.clone())
            .map(Expr::List);

        let key = choice((
            identifier.clone(),
            select! {
                Token::Text(text) => unescape(text),
                Token::Number(number) => format_number(number),
            },
        ));

        let shorthand_entry = identifier.clone().map_with(|name, extra| {
            let value = Spanned {
                span: extra.span(),
                node: Expr::Identifier(name.clone()),
            };
            (name, value)
        });

        let entry = choice((
            key.then_ignore(just(Token::Colon)).then(expression.clone()),
            shorthand_entry,
        ));

        let object = entry
            .separated_by(comma.clone())
            .allow_trailing()
            .collect()
            .delimited_by(bracket_curly_open, bracket_curly_close)
            .map(Expr::Object);

        let nested = expression
            .clone()
            .delimited_by(bracket_round_open.clone(), bracket_round_close.clone());

        let primary = choice((arrow, literal, template, variable, list, object))
            .map_with(|expression, extra| Spanned {
                span: extra.span(),
                node: expression,
            })
            .or(nested);

        let property = identifier.clone().or(select! {
            Token::True => "true".to_owned(),
            Token::False => "false".to_owned(),
            Token::Null => "null".to_owned(),
            Token::Return => "return".to_owned(),
        });

        let suffix = choice((
            just(Token::Dot)
                .ignore_then(property.clone())
                .map(|property| Suffix::Member {
                    property,
                    optional: false,
                }),
            just(Token::QuestionDot)
                .ignore_then(property)
                .map(|property| Suffix::Member {
                    property,
                    optional: true,
                }),
            expression
                .clone()
                .delimited_by(bracket_square_open, bracket_square_close)
                .map(Suffix::Index),
            expression
                .clone()
                .separated_by(comma)
                .allow_trailing()
                .collect()
                .delimited_by(bracket_round_open, bracket_round_close)
                .map(Suffix::Call),
        ));

        let chain = primary.foldl_with(suffix.repeated(), |object, suffix, extra| {
            let object = Box::new(object);
            let node = match suffix {
                Suffix::Member { property, optional } => Expr::Member {
                    object,
                    property,
                    optional,
                },
                Suffix::Index(index) => Expr::Index {
                    object,
                    index: Box::new(index),
                },
                Suffix::Call(arguments) => Expr::Call {
                    callee: object,
                    arguments,
                },
            };
            Spanned {
                span: extra.span(),
                node,
            }
        });

        let operand = chain.pratt((
            postfix(
                9,
                select! {
                    Token::Increment => UpdateOperator::Increment,
                    Token::Decrement => UpdateOperator::Decrement,
                },
                |target, operator, extra| Spanned {
                    span: extra.span(),
                    node: Expr::Update {
                        operator,
                        prefix: false,
                        target: Box::new(target),
                    },
                },
            ),
            prefix(
                8,
                select! {
                    Token::Increment => UpdateOperator::Increment,
                    Token::Decrement => UpdateOperator::Decrement,
                },
                |operator, target, extra| Spanned {
                    span: extra.span(),
                    node: Expr::Update {
                        operator,
                        prefix: true,
                        target: Box::new(target),
                    },
                },
            ),
            prefix(
                8,
                select! {
                    Token::Not => UnaryOperator::Not,
                    Token::Minus => UnaryOperator::Negate,
                    Token::Plus => UnaryOperator::Plus,
                    Token::Typeof => UnaryOperator::Typeof,
                },
                |operator, operand, extra| Spanned {
                    span: extra.span(),
                    node: Expr::Unary {
                        operator,
                        operand: Box::new(operand),
                    },
                },
            ),
            infix(
                left(7),
                select! {
                    Token::Asterisk => BinaryOperator::Multiply,
                    Token::Slash => BinaryOperator::Divide,
                    Token::Percent => BinaryOperator::Remainder,
                },
                |l, operator, r, extra| binary(l, operator, r, extra.span()),
            ),
            infix(
                left(6),
                select! {
                    Token::Plus => BinaryOperator::Add,
                    Token::Minus => BinaryOperator::Subtract,
                },
                |l, operator, r, extra| binary(l, operator, r, extra.span()),
            ),
            infix(
                left(5),
                select! {
                    Token::Less => BinaryOperator::Less,
                    Token::LessOrEqual => BinaryOperator::LessOrEqual,
                    Token::Greater => BinaryOperator::Greater,
                    Token::GreaterOrEqual => BinaryOperator::GreaterOrEqual,
                },
                |l, operator, r, extra| binary(l, operator, r, extra.span()),
            ),
            infix(
                left(4),
                select! {
                    Token::StrictEqual => BinaryOperator::StrictEqual,
                    Token::StrictNotEqual => BinaryOperator::StrictNotEqual,
                    Token::Equal => BinaryOperator::Equal,
                    Token::NotEqual => BinaryOperator::NotEqual,
                },
                |l, operator, r, extra| binary(l, operator, r, extra.span()),
            ),
            infix(left(3), just(Token::And).to(LogicalOperator::And), |l, operator, r, extra| {
                logical(l, operator, r, extra.span())
            }),
            infix(left(2), just(Token::Or).to(LogicalOperator::Or), |l, operator, r, extra| {
                logical(l, operator, r, extra.span())
            }),
            infix(
                left(1),
                just(Token::Nullish).to(LogicalOperator::Nullish),
                |l, operator, r, extra| logical(l, operator, r, extra.span()),
            ),
        ));

        let conditional = operand
            .then(
                just(Token::Question)
                    .ignore_then(expression.clone())
                    .then_ignore(just(Token::Colon))
                    .then(expression.clone())
                    .or_not(),
            )
            .map_with(|(test, branches), extra| match branches {
                None => test,
                Some((consequent, alternate)) => Spanned {
                    span: extra.span(),
                    node: Expr::Conditional {
                        test: Box::new(test),
                        consequent: Box::new(consequent),
                        alternate: Box::new(alternate),
                    },
                },
            });

        let assign_operator = select! {
            Token::Assign => AssignOperator::Assign,
            Token::PlusAssign => AssignOperator::Add,
            Token::MinusAssign => AssignOperator::Subtract,
            Token::AsteriskAssign => AssignOperator::Multiply,
            Token::SlashAssign => AssignOperator::Divide,
        };

        conditional
            .then(assign_operator.then(expression).or_not())
            .try_map(|(target, assignment), span| match assignment {
                None => Ok(target),
                Some((operator, value)) => {
                    if !target.node.is_assignable() {
                        return Err(Rich::custom(target.span, "invalid assignment target"));
                    }
                    Ok(Spanned {
                        span,
                        node: Expr::Assign {
                            operator,
                            target: Box::new(target),
                            value: Box::new(value),
                        },
                    })
                }
            })
    });

    // Statements may be separated by `;` or just follow each other, which
    // covers one statement per line.
    let statement = just(Token::Return)
        .or_not()
        .then(expression)
        .map_with(|(keyword, expression), extra| Spanned {
            span: extra.span(),
            node: match keyword {
                Some(_) => Statement::Return(expression),
                None => Statement::Expression(expression),
            },
        });

    let semicolons = just(Token::Semicolon).repeated();

    semicolons
        .clone()
        .ignore_then(
            statement
                .separated_by(semicolons.clone())
                .allow_trailing()
                .collect(),
        )
        .then_ignore(semicolons)
}

fn binary(
    operand_a: Spanned<Expr>,
    operator: BinaryOperator,
    operand_b: Spanned<Expr>,
    span: Span,
) -> Spanned<Expr> {
    Spanned {
        span,
        node: Expr::Binary {
            operator,
            operand_a: Box::new(operand_a),
            operand_b: Box::new(operand_b),
        },
    }
}

fn logical(
    operand_a: Spanned<Expr>,
    operator: LogicalOperator,
    operand_b: Spanned<Expr>,
    span: Span,
) -> Spanned<Expr> {
    Spanned {
        span,
        node: Expr::Logical {
            operator,
            operand_a: Box::new(operand_a),
            operand_b: Box::new(operand_b),
        },
    }
}

enum Suffix {
    Member { property: String, optional: bool },
    Index(Spanned<Expr>),
    Call(Vec<Spanned<Expr>>),
}

#[derive(Debug, Clone)]
pub enum Statement {
    Expression(Spanned<Expr>),
    Return(Spanned<Expr>),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Template(Template),
    Identifier(String),
    List(Vec<Spanned<Expr>>),
    Object(Vec<(String, Spanned<Expr>)>),
    Member {
        object: Box<Spanned<Expr>>,
        property: String,
        optional: bool,
    },
    Index {
        object: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
    Call {
        callee: Box<Spanned<Expr>>,
        arguments: Vec<Spanned<Expr>>,
    },
    Arrow {
        parameters: Vec<String>,
        body: Rc<Spanned<Expr>>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Spanned<Expr>>,
    },
    Binary {
        operator: BinaryOperator,
        operand_a: Box<Spanned<Expr>>,
        operand_b: Box<Spanned<Expr>>,
    },
    Logical {
        operator: LogicalOperator,
        operand_a: Box<Spanned<Expr>>,
        operand_b: Box<Spanned<Expr>>,
    },
    Conditional {
        test: Box<Spanned<Expr>>,
        consequent: Box<Spanned<Expr>>,
        alternate: Box<Spanned<Expr>>,
    },
    Assign {
        operator: AssignOperator,
        target: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },
    Update {
        operator: UpdateOperator,
        prefix: bool,
        target: Box<Spanned<Expr>>,
    },
}

impl Expr {
    fn is_assignable(&self) -> bool {
        matches!(
            self,
            Self::Identifier(_) | Self::Member { optional: false, .. } | Self::Index { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(Rc<str>),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
    Plus,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    StrictEqual,
    StrictNotEqual,
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOperator {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    Increment,
    Decrement,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::lexer;
    use chumsky::prelude::{Input, Parser};

    fn parse(code: &str) -> Vec<Statement> {
        let tokens = lexer().parse(code).unwrap();
        let input = tokens.map(Span::from(code.len()..code.len()), |Spanned { node, span }| (node, span));
        parser()
            .parse(input)
            .unwrap()
            .into_iter()
            .map(|statement| statement.node)
            .collect()
    }

    fn single(code: &str) -> Expr {
        match parse(code).into_iter().next() {
            Some(Statement::Expression(expression) | Statement::Return(expression)) => {
                expression.node
            }
            None => panic!("no statement in {code:?}"),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let Expr::Binary {
            operator: BinaryOperator::Add,
            operand_b,
            ..
        } = single("1 + 2 * 3")
        else {
            panic!("expected addition at the top");
        };
        assert!(matches!(
            operand_b.node,
            Expr::Binary {
                operator: BinaryOperator::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_member_chain_and_call() {
        let Expr::Call { callee, arguments } = single("_.items.push(1, 2)") else {
            panic!("expected a call");
        };
        assert_eq!(arguments.len(), 2);
        assert!(matches!(
            callee.node,
            Expr::Member { ref property, optional: false, .. } if property == "push"
        ));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let Expr::Assign { value, .. } = single("_.a = _.b = 1") else {
            panic!("expected an assignment");
        };
        assert!(matches!(value.node, Expr::Assign { .. }));
    }

    #[test]
    fn test_conditional() {
        assert!(matches!(
            single("_.x > 0 ? 'pos' : 'neg'"),
            Expr::Conditional { .. }
        ));
    }

    #[test]
    fn test_arrow_function() {
        let Expr::Call { arguments, .. } = single("_.items.filter(item => !item.done)") else {
            panic!("expected a call");
        };
        assert!(matches!(
            &arguments[0].node,
            Expr::Arrow { parameters, .. } if parameters == &["item".to_owned()]
        ));
        assert!(matches!(single("(a, b) => a + b"), Expr::Arrow { .. }));
        assert!(matches!(single("(a)"), Expr::Identifier(_)));
    }

    #[test]
    fn test_statements_without_semicolons() {
        let statements = parse("_.a = 1\n_.b = 2;; return _.a + _.b");
        assert_eq!(statements.len(), 3);
        assert!(matches!(statements[2], Statement::Return(_)));
    }

    #[test]
    fn test_object_literal_with_shorthand() {
        let Expr::Object(entries) = single("({ color: 'red', 'font_size': 2, size })") else {
            panic!("expected an object");
        };
        let keys: Vec<_> = entries.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, ["color", "font_size", "size"]);
    }

    #[test]
    fn test_update_prefix_and_postfix() {
        assert!(matches!(
            single("++_.n"),
            Expr::Update { prefix: true, .. }
        ));
        assert!(matches!(
            single("_.n--"),
            Expr::Update {
                prefix: false,
                operator: UpdateOperator::Decrement,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let code = "1 = 2";
        let tokens = lexer().parse(code).unwrap();
        let input = tokens.map(Span::from(code.len()..code.len()), |Spanned { node, span }| (node, span));
        assert!(parser().parse(input).has_errors());
    }
}
