//! Member queries: parse a set-algebra expression and evaluate it against sets
//! fetched through a [`SetFetcher`].

pub mod ast;
pub mod lexer;
pub mod parser;

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use chumsky::error::{Simple, SimpleReason};

use crate::{domain::ChatKey, domain::UserId, errors::Error, set::NegatableSet, Result};

pub use ast::{BinaryOp, Expr, Operand};
pub use parser::parse;

pub type MemberSet = NegatableSet<UserId>;

/// Resolves a leaf of a query into a set of members.
///
/// Implementations fail with [`Error::InvalidChat`] when the key does not name a
/// chat whose members can be listed. The evaluator may ask for the same key
/// more than once per query.
#[async_trait]
pub trait SetFetcher: Send {
    async fn fetch_set(&mut self, key: &ChatKey) -> Result<MemberSet>;
}

/// Parse and evaluate a single-expression query.
pub async fn evaluate<F>(fetcher: &mut F, query: &str) -> Result<MemberSet>
where
    F: SetFetcher + ?Sized,
{
    let expr = parse(query)?;
    tracing::debug!(query, leaves = expr.leaves().len(), "evaluating query");
    evaluate_expr(fetcher, &expr).await
}

/// Intersection of all operands, left to right (same as `a & b & c ...`).
pub async fn evaluate_conjunction<F, S>(fetcher: &mut F, operands: &[S]) -> Result<MemberSet>
where
    F: SetFetcher + ?Sized,
    S: AsRef<str> + Sync,
{
    let Some((first, rest)) = operands.split_first() else {
        return Err(Error::Syntax("specify at least one group".to_string()));
    };

    let mut acc = fetcher.fetch_set(&ChatKey::parse(first.as_ref())).await?;
    for operand in rest {
        let next = fetcher.fetch_set(&ChatKey::parse(operand.as_ref())).await?;
        acc = acc.intersect(&next);
    }
    Ok(acc)
}

/// Evaluate a parsed tree. Leaves are fetched depth-first, left to right; both
/// sides of every operator are always evaluated.
pub fn evaluate_expr<'a, F>(
    fetcher: &'a mut F,
    expr: &'a Expr,
) -> Pin<Box<dyn Future<Output = Result<MemberSet>> + Send + 'a>>
where
    F: SetFetcher + ?Sized,
{
    Box::pin(async move {
        match expr {
            Expr::Leaf(operand) => fetcher.fetch_set(&operand.key()).await,
            Expr::Not(child) => Ok(evaluate_expr(fetcher, child).await?.negate()),
            Expr::Binary { op, left, right } => {
                let left = evaluate_expr(&mut *fetcher, left).await?;
                let right = evaluate_expr(&mut *fetcher, right).await?;
                Ok(match op {
                    BinaryOp::And => left.intersect(&right),
                    BinaryOp::Or => left.union(&right),
                    BinaryOp::Sub => left.difference(&right),
                    BinaryOp::Xor => left.symmetric_difference(&right),
                })
            }
        }
    })
}

/// Collapse lexer or parser errors into one [`Error::Syntax`], reporting the
/// first error.
pub(crate) fn syntax_error<T, D>(errors: Vec<Simple<T>>, describe: D) -> Error
where
    T: std::hash::Hash + Eq,
    D: Fn(&T) -> String,
{
    let Some(error) = errors.into_iter().next() else {
        return Error::Syntax("invalid syntax".to_string());
    };
    if let SimpleReason::Custom(msg) = error.reason() {
        return Error::Syntax(msg.clone());
    }
    match error.found() {
        Some(found) => Error::Syntax(format!(
            "unexpected {} at position {}",
            describe(found),
            error.span().start
        )),
        None => Error::Syntax("unexpected end of query".to_string()),
    }
}
