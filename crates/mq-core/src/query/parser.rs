//! Parser for member queries.
//!
//! Precedence, loosest first (Python's expression grammar, which the query
//! language borrows):
//!
//! ```text
//! or  <  and  <  not  <  |  <  ^  <  &  <  + -  <  unary ~ -
//! ```
//!
//! All binary operators are left-associative. Anything outside this grammar is
//! a syntax error.

use chumsky::{prelude::*, Stream};

use crate::{errors::Error, Result};

use super::ast::{BinaryOp, Expr, Operand};
use super::lexer::{tokenize, Token};
use super::syntax_error;

/// Parse a query that must consist of exactly one expression statement.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    let end = input.chars().count();

    let mut statements = body()
        .parse(Stream::from_iter(end..end + 1, tokens.into_iter()))
        .map_err(|errs| {
            let assignment = errs
                .first()
                .is_some_and(|e| e.found() == Some(&Token::Assign));
            if assignment {
                return Error::Syntax("expected expression, assignment found".to_string());
            }
            syntax_error(errs, |t: &Token| format!("'{t}'"))
        })?;

    match statements.len() {
        0 => Err(Error::Syntax("empty body".to_string())),
        1 => Ok(statements.remove(0)),
        _ => Err(Error::Syntax(
            "more than one statement in the body".to_string(),
        )),
    }
}

/// Statements separated by `;` or newlines. Blank statements are skipped.
fn body() -> impl Parser<Token, Vec<Expr>, Error = Simple<Token>> {
    let separators = just(Token::Separator).repeated();

    separators
        .clone()
        .ignore_then(
            expr()
                .separated_by(separators.clone().at_least(1))
                .allow_trailing(),
        )
        .then_ignore(separators)
        .then_ignore(end())
}

/// One left-associative precedence level: `operand (operator operand)*`.
fn binary_level<P, O>(
    operand: P,
    operator: O,
) -> impl Parser<Token, Expr, Error = Simple<Token>> + Clone
where
    P: Parser<Token, Expr, Error = Simple<Token>> + Clone,
    O: Parser<Token, BinaryOp, Error = Simple<Token>> + Clone,
{
    operand
        .clone()
        .then(operator.then(operand).repeated())
        .foldl(|left, (op, right)| Expr::binary(op, left, right))
}

fn expr() -> impl Parser<Token, Expr, Error = Simple<Token>> + Clone {
    recursive(|or_expr| {
        let literal = select! {
            Token::Int(n) => Operand::Int(n),
            Token::Str(s) => Operand::Str(s),
        };

        // A literal in any number of balanced parentheses.
        let wrapped_literal = recursive(|wrapped| {
            literal
                .clone()
                .or(wrapped.delimited_by(just(Token::LParen), just(Token::RParen)))
        });

        let operand = select! { Token::Ident(name) => Operand::Name(name) }
            .or(literal)
            .map(Expr::leaf);

        let atom = operand.or(or_expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen)));

        let unary = recursive(|unary| {
            // Minus straight on a literal is a negative chat id, not negation.
            let negative_literal = just(Token::Minus)
                .ignore_then(wrapped_literal)
                .validate(|literal, span, emit| match literal {
                    Operand::Int(n) => Expr::leaf(Operand::Int(-n)),
                    other => {
                        let shown = Expr::leaf(other);
                        emit(Simple::custom(
                            span,
                            format!("invalid constant value: -{shown}"),
                        ));
                        shown
                    }
                });

            let negation = just(Token::Tilde)
                .or(just(Token::Minus))
                .ignore_then(unary)
                .map(Expr::not);

            choice((negative_literal, negation, atom))
        })
        .boxed();

        let additive = binary_level(
            unary,
            choice((
                just(Token::Plus).to(BinaryOp::Or),
                just(Token::Minus).to(BinaryOp::Sub),
            )),
        );
        let amp = binary_level(additive, just(Token::Amp).to(BinaryOp::And));
        let caret = binary_level(amp, just(Token::Caret).to(BinaryOp::Xor));
        let pipe = binary_level(caret, just(Token::Pipe).to(BinaryOp::Or)).boxed();

        let not_expr = recursive(|not_expr| {
            just(Token::Not)
                .ignore_then(not_expr)
                .map(Expr::not)
                .or(pipe)
        });

        let and_expr = binary_level(not_expr, just(Token::And).to(BinaryOp::And));
        binary_level(and_expr, just(Token::Or).to(BinaryOp::Or))
    })
}
