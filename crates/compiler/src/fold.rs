// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Constant folding of generated index bounds. The input is already-rendered Python text; if it
//! is nothing but literal arithmetic, it is evaluated with MOO numeric semantics.

use once_cell::sync::Lazy;
use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use thiserror::Error;
use tracing::trace;
use transmoo_var::{ErrorCode, Var, Variant, v_float, v_int};

pub mod grammar {
    #[derive(Parser)]
    #[grammar = "src/fold.pest"]
    pub struct FoldParser;
}

use grammar::{FoldParser, Rule};

#[derive(Debug, Error, PartialEq)]
enum FoldError {
    #[error("not constant arithmetic: {0}")]
    NotConstant(String),
    #[error("evaluation failed with {0}")]
    Evaluation(ErrorCode),
    #[error("result is not an integer: {0:?}")]
    NotInteger(Var),
}

impl From<ErrorCode> for FoldError {
    fn from(e: ErrorCode) -> Self {
        FoldError::Evaluation(e)
    }
}

// Python precedence, lowest to highest. Unary minus sits between `*` and `**`.
static PRATT: Lazy<PrattParser<Rule>> = Lazy::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left))
        .op(Op::prefix(Rule::neg))
        .op(Op::infix(Rule::pow, Assoc::Right))
});

fn inner_exprs(pair: Pair<Rule>) -> Result<(Var, Var), FoldError> {
    let mut inner = pair.into_inner();
    let (Some(l), Some(r)) = (inner.next(), inner.next()) else {
        return Err(FoldError::NotConstant("missing operand".to_string()));
    };
    Ok((eval(l.into_inner())?, eval(r.into_inner())?))
}

fn eval_primary(primary: Pair<Rule>) -> Result<Var, FoldError> {
    match primary.as_rule() {
        Rule::int_ctor | Rule::float_ctor => {
            let text = primary
                .into_inner()
                .next()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            if let Ok(i) = text.parse::<i64>() {
                return Ok(v_int(i));
            }
            text.parse::<f64>()
                .map(v_float)
                .map_err(|_| FoldError::NotConstant(text))
        }
        Rule::integer => primary
            .as_str()
            .parse::<i64>()
            .map(v_int)
            .map_err(|_| FoldError::NotConstant(primary.as_str().to_string())),
        Rule::div_call => {
            let (l, r) = inner_exprs(primary)?;
            Ok(l.div(&r)?)
        }
        Rule::mod_call => {
            let (l, r) = inner_exprs(primary)?;
            Ok(l.modulus(&r)?)
        }
        Rule::expr => eval(primary.into_inner()),
        _ => Err(FoldError::NotConstant(primary.as_str().to_string())),
    }
}

fn eval(pairs: Pairs<Rule>) -> Result<Var, FoldError> {
    PRATT
        .map_primary(eval_primary)
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::neg => Ok(rhs?.negative()?),
            _ => Err(FoldError::NotConstant(op.as_str().to_string())),
        })
        .map_infix(|lhs, op, rhs| {
            let (lhs, rhs) = (lhs?, rhs?);
            let result = match op.as_rule() {
                Rule::add => lhs.add(&rhs),
                Rule::sub => lhs.sub(&rhs),
                Rule::mul => lhs.mul(&rhs),
                Rule::pow => lhs.pow(&rhs),
                _ => return Err(FoldError::NotConstant(op.as_str().to_string())),
            };
            Ok(result?)
        })
        .parse(pairs)
}

fn fold(text: &str) -> Result<i64, FoldError> {
    let mut program = FoldParser::parse(Rule::program, text)
        .map_err(|_| FoldError::NotConstant(text.to_string()))?;
    let Some(expr) = program.next() else {
        return Err(FoldError::NotConstant(text.to_string()));
    };
    let value = eval(expr.into_inner())?;
    match value.variant() {
        Variant::Int(i) => Ok(*i),
        _ => Err(FoldError::NotInteger(value)),
    }
}

/// Evaluate `text` to an integer constant if it is one. Anything else, including arithmetic
/// that would fail at runtime, is left for the runtime.
pub fn fold_int(text: &str) -> Option<i64> {
    match fold(text) {
        Ok(i) => Some(i),
        Err(e) => {
            trace!(text, error = %e, "index bound not folded");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("0", Some(0); "length marker")]
    #[test_case("moo.Int(17)", Some(17); "literal")]
    #[test_case("moo.Int(-3)", Some(-3); "negative literal")]
    #[test_case("0 + moo.Int(-1)", Some(-1); "length plus negative")]
    #[test_case("0 - moo.Int(1)", Some(-1); "length minus one")]
    #[test_case("moo.Int(2) + moo.Int(3) * moo.Int(4)", Some(14); "precedence")]
    #[test_case("(moo.Int(2) + moo.Int(3)) * moo.Int(4)", Some(20); "parens")]
    #[test_case("-moo.Int(2) ** moo.Int(2)", Some(-4); "unary minus below power")]
    #[test_case("moo.Int(2) ** moo.Int(3) ** moo.Int(2)", Some(512); "power is right assoc")]
    #[test_case("moo.div(moo.Int(7), moo.Int(2))", Some(3); "truncating division")]
    #[test_case("moo.mod(moo.Int(-5), moo.Int(2))", Some(-1); "remainder")]
    #[test_case("moo.div(moo.Int(1), moo.Int(0))", None; "division by zero")]
    #[test_case("moo.Float(1.5)", None; "float")]
    #[test_case("moo.Float(2.0) * moo.Int(2)", None; "float product")]
    #[test_case("x - 1", None; "variable")]
    #[test_case("moo.length(x)", None; "call")]
    fn test_fold(text: &str, expected: Option<i64>) {
        assert_eq!(fold_int(text), expected);
    }

    #[test]
    fn test_non_integer_reason() {
        assert!(matches!(
            fold("moo.Float(1.5)"),
            Err(FoldError::NotInteger(_))
        ));
        assert_eq!(
            fold("moo.mod(moo.Int(1), moo.Int(0))"),
            Err(FoldError::Evaluation(ErrorCode::E_DIV))
        );
    }
}
