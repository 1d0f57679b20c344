//! Lexer for member queries.
//!
//! `&&`/`||` are accepted as `&`/`|`, and an `@` in front of a name or id is
//! dropped so Telegram mentions can be pasted as-is.

use std::{fmt, ops::Range};

use chumsky::prelude::*;

use crate::Result;

use super::syntax_error;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    // Operands
    Ident(String),
    Int(i64),
    Str(String),

    // Keywords
    And,
    Or,
    Not,

    // Operators
    Amp,   // & &&
    Pipe,  // | ||
    Caret, // ^
    Tilde, // ~
    Plus,  // +
    Minus, // -

    // Punctuation
    LParen,    // (
    RParen,    // )
    Assign,    // =
    Newline,   // only inside parentheses, dropped by `tokenize`
    Separator, // ; or a newline outside parentheses
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{s}"),
            Token::Int(n) => write!(f, "{n}"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Caret => write!(f, "^"),
            Token::Tilde => write!(f, "~"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Assign => write!(f, "="),
            Token::Newline => write!(f, "newline"),
            Token::Separator => write!(f, ";"),
        }
    }
}

/// Char offsets into the query text.
pub type Span = Range<usize>;

/// Raw token stream; newlines are not yet classified.
pub fn lexer() -> impl Parser<char, Vec<(Token, Span)>, Error = Simple<char>> {
    let word = just('@')
        .or_not()
        .ignore_then(
            filter(|c: &char| is_ident_char(*c))
                .repeated()
                .at_least(1)
                .collect::<String>(),
        )
        .validate(|word, span: Span, emit| {
            if !word.starts_with(|c: char| c.is_ascii_digit()) {
                return match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(word),
                };
            }
            if !word.chars().all(|c| c.is_ascii_digit()) {
                emit(Simple::custom(
                    span.clone(),
                    format!("invalid integer literal {word} at position {}", span.start),
                ));
                return Token::Int(0);
            }
            match word.parse::<i64>() {
                Ok(n) => Token::Int(n),
                Err(_) => {
                    emit(Simple::custom(
                        span,
                        format!("integer literal {word} is out of range"),
                    ));
                    Token::Int(0)
                }
            }
        });

    let string = |quote: char| {
        let escape = just('\\').ignore_then(any());
        just(quote)
            .ignore_then(
                filter(move |c: &char| *c != quote && *c != '\\' && *c != '\n')
                    .or(escape)
                    .repeated()
                    .collect::<String>(),
            )
            .then_ignore(just(quote))
            .map(Token::Str)
    };

    let punctuation = choice((
        just("&&").or(just("&")).to(Token::Amp),
        just("||").or(just("|")).to(Token::Pipe),
        just('^').to(Token::Caret),
        just('~').to(Token::Tilde),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just('=').to(Token::Assign),
        just(';').to(Token::Separator),
        just('\n').to(Token::Newline),
    ));

    // `#` comments run to the end of the line; the newline itself is a token.
    let comment = just('#').then(none_of('\n').repeated()).ignored();

    let token_or_skip = comment
        .to(None)
        .or(choice((word, string('\''), string('"'), punctuation)).map(Some));

    let inline_ws = filter(|c: &char| c.is_whitespace() && *c != '\n')
        .repeated()
        .ignored();

    inline_ws
        .clone()
        .ignore_then(
            token_or_skip
                .map_with_span(|opt_tok, span| opt_tok.map(|tok| (tok, span)))
                .then_ignore(inline_ws)
                .repeated(),
        )
        .then_ignore(end())
        .map(|items| items.into_iter().flatten().collect())
}

/// Lex a query. A newline separates statements unless it is inside
/// parentheses.
pub fn tokenize(input: &str) -> Result<Vec<(Token, Span)>> {
    let raw = lexer()
        .parse(input)
        .map_err(|errs| syntax_error(errs, |c: &char| format!("character {c:?}")))?;

    let mut depth = 0usize;
    let tokens = raw
        .into_iter()
        .filter_map(|(token, span)| {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => depth = depth.saturating_sub(1),
                Token::Newline if depth > 0 => return None,
                Token::Newline => return Some((Token::Separator, span)),
                _ => {}
            }
            Some((token, span))
        })
        .collect();
    Ok(tokens)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
