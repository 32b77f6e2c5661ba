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

/// Operator precedence on both sides of the translation: MOO's, for parsing, and Python's, for
/// deciding where generated code needs parentheses.
/// Higher numbers = higher precedence (more tightly binding)
use crate::ast::BinaryOp;
use crate::lexer::{Keyword, Punct, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Precedence {
    Assign = 1,         // =
    Cond = 2,           // ? |
    Logical = 3,        // || && (one level in LambdaMOO)
    Relational = 4,     // == != < <= > >= in
    Additive = 5,       // + -
    Multiplicative = 6, // * / %
    Exponential = 7,    // ^
    Unary = 8,          // ! - (prefix operators)
    Postfix = 9,        // . : [ ]
}

impl Precedence {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct OperatorInfo {
    pub precedence: u8,
    pub associativity: Associativity,
}

/// What an infix token does once the precedence climber has decided to consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Assign,
    Cond,
    And,
    Or,
    Binary(BinaryOp),
}

/// Binding strength of an infix operator token, or `None` if the token does not continue an
/// expression.
pub fn infix_operator(token: &Token) -> Option<(InfixOp, OperatorInfo)> {
    let (op, precedence, associativity) = match token.kind {
        TokenKind::Punct(Punct::Assign) => (InfixOp::Assign, Precedence::Assign, Associativity::Right),
        TokenKind::Punct(Punct::Question) => (InfixOp::Cond, Precedence::Cond, Associativity::Right),
        TokenKind::Punct(Punct::AndAnd) => (InfixOp::And, Precedence::Logical, Associativity::Left),
        TokenKind::Punct(Punct::OrOr) => (InfixOp::Or, Precedence::Logical, Associativity::Left),
        TokenKind::Punct(p) => {
            let (op, precedence) = match p {
                Punct::EqEq => (BinaryOp::Eq, Precedence::Relational),
                Punct::NotEq => (BinaryOp::NEq, Precedence::Relational),
                Punct::Lt => (BinaryOp::Lt, Precedence::Relational),
                Punct::LtEq => (BinaryOp::LtE, Precedence::Relational),
                Punct::Gt => (BinaryOp::Gt, Precedence::Relational),
                Punct::GtEq => (BinaryOp::GtE, Precedence::Relational),
                Punct::Plus => (BinaryOp::Add, Precedence::Additive),
                Punct::Minus => (BinaryOp::Sub, Precedence::Additive),
                Punct::Star => (BinaryOp::Mul, Precedence::Multiplicative),
                Punct::Slash => (BinaryOp::Div, Precedence::Multiplicative),
                Punct::Percent => (BinaryOp::Mod, Precedence::Multiplicative),
                Punct::Caret => {
                    return Some((
                        InfixOp::Binary(BinaryOp::Exp),
                        OperatorInfo {
                            precedence: Precedence::Exponential.as_u8(),
                            associativity: Associativity::Right,
                        },
                    ));
                }
                _ => return None,
            };
            (InfixOp::Binary(op), precedence, Associativity::Left)
        }
        TokenKind::Keyword(Keyword::In) => (
            InfixOp::Binary(BinaryOp::In),
            Precedence::Relational,
            Associativity::Left,
        ),
        _ => return None,
    };
    Some((
        op,
        OperatorInfo {
            precedence: precedence.as_u8(),
            associativity,
        },
    ))
}

/// Python's operator precedence, restricted to the forms the generator emits. Runtime calls,
/// conditional expressions and hoisted names all render as `Atom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum HostPrecedence {
    Or = 2,
    And = 3,
    Not = 4,
    Comparison = 5,
    Additive = 6,
    Multiplicative = 7,
    Unary = 8,
    Power = 9,
    Atom = 10,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn punct(p: Punct) -> Token {
        Token {
            kind: TokenKind::Punct(p),
            text: p.to_string(),
            line: 1,
            column: 1,
        }
    }

    #[test]
    fn test_logical_operators_share_a_level() {
        let (_, and) = infix_operator(&punct(Punct::AndAnd)).unwrap();
        let (_, or) = infix_operator(&punct(Punct::OrOr)).unwrap();
        assert_eq!(and.precedence, or.precedence);
        assert_eq!(and.associativity, Associativity::Left);
    }

    #[test]
    fn test_right_associative_operators() {
        for p in [Punct::Assign, Punct::Question, Punct::Caret] {
            let (_, info) = infix_operator(&punct(p)).unwrap();
            assert_eq!(info.associativity, Associativity::Right, "{p}");
        }
        assert!(infix_operator(&punct(Punct::Semi)).is_none());
    }

    #[test]
    fn test_host_ordering() {
        assert!(HostPrecedence::Or < HostPrecedence::And);
        assert!(HostPrecedence::Unary < HostPrecedence::Power);
        assert!(HostPrecedence::Comparison < HostPrecedence::Additive);
    }
}
