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

//! Builds the AST from the token stream: recursive descent for statements, precedence climbing
//! for expressions.

use serde::{Deserialize, Serialize};

use crate::ast::{
    Arg, CatchCodes, CondArm, ExceptArm, Expr, Param, Selector, Stmt, StmtNode, UnaryOp,
};
use crate::errors::CompileError;
use crate::lexer::{Keyword, Lexer, Punct, Token, TokenKind};
use crate::precedence::{Associativity, InfixOp, Precedence, infix_operator};

/// Knobs for the compiler.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Whether an unrecognized character in the source aborts compilation. When off, the
    /// character is logged and skipped.
    pub strict_lexing: bool,
    /// Whether an `E_` name with no known exception category aborts compilation. When off, it
    /// is logged and caught as `Exception`.
    pub strict_error_codes: bool,
    /// Whether scatter assignments check the length of their source list at runtime.
    pub scatter_arity_checks: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            strict_lexing: true,
            strict_error_codes: true,
            scatter_arity_checks: true,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Parse {
    pub stmts: Vec<Stmt>,
}

/// Keywords that close (or continue) an enclosing block. A statement list ends at any of them.
const BLOCK_ENDINGS: &[Keyword] = &[
    Keyword::ElseIf,
    Keyword::Else,
    Keyword::EndIf,
    Keyword::EndFor,
    Keyword::EndWhile,
    Keyword::EndFork,
    Keyword::Except,
    Keyword::Finally,
    Keyword::EndTry,
    Keyword::EndVerb,
];

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    /// How many index/range subscripts we are inside. `$` is only meaningful when positive.
    dollars_ok: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            dollars_ok: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    fn peek_is_punct(&self, p: Punct) -> bool {
        self.peek().is_some_and(|t| t.is_punct(p))
    }

    fn peek_is_keyword(&self, k: Keyword) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(k))
    }

    fn advance(&mut self) -> Result<Token, CompileError> {
        let Some(token) = self.tokens.get(self.position).cloned() else {
            return Err(self.error("unexpected end of program"));
        };
        self.position += 1;
        Ok(token)
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        match self.peek() {
            Some(token) => CompileError::ParseError {
                line: token.line,
                column: token.column,
                context: token.text.clone(),
                message: message.into(),
            },
            None => {
                let (line, column) = self
                    .tokens
                    .last()
                    .map(|t| (t.line, t.column + t.text.chars().count()))
                    .unwrap_or((1, 1));
                CompileError::ParseError {
                    line,
                    column,
                    context: "end of program".to_string(),
                    message: message.into(),
                }
            }
        }
    }

    fn expect_punct(&mut self, p: Punct) -> Result<Token, CompileError> {
        if self.peek_is_punct(p) {
            return self.advance();
        }
        Err(self.error(format!("expected `{p}`")))
    }

    fn expect_keyword(&mut self, k: Keyword) -> Result<Token, CompileError> {
        if self.peek_is_keyword(k) {
            return self.advance();
        }
        Err(self.error(format!("expected `{k}`")))
    }

    fn expect_identifier(&mut self) -> Result<String, CompileError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Identifier => Ok(self.advance()?.text),
            _ => Err(self.error("expected identifier")),
        }
    }

    fn optional_identifier(&mut self) -> Result<Option<String>, CompileError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Identifier => Ok(Some(self.advance()?.text)),
            _ => Ok(None),
        }
    }

    pub fn parse_program(&mut self) -> Result<Vec<Stmt>, CompileError> {
        let stmts = self.parse_statements()?;
        if self.peek().is_some() {
            return Err(self.error("unexpected token"));
        }
        Ok(stmts)
    }

    fn parse_statements(&mut self) -> Result<Vec<Stmt>, CompileError> {
        let mut stmts = vec![];
        while let Some(token) = self.peek() {
            if let TokenKind::Keyword(k) = token.kind {
                if BLOCK_ENDINGS.contains(&k) {
                    break;
                }
            }
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<Stmt, CompileError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error("expected statement"));
        };
        let line = token.line;
        let node = match token.kind {
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::While) => {
                self.advance()?;
                let label = self.parse_label_before_paren()?;
                let condition = self.parse_paren_expr()?;
                let body = self.parse_statements()?;
                self.expect_keyword(Keyword::EndWhile)?;
                StmtNode::While {
                    label,
                    condition,
                    body,
                }
            }
            TokenKind::Keyword(Keyword::Fork) => {
                self.advance()?;
                let label = self.parse_label_before_paren()?;
                let delay = self.parse_paren_expr()?;
                let body = self.parse_statements()?;
                self.expect_keyword(Keyword::EndFork)?;
                StmtNode::Fork { label, delay, body }
            }
            TokenKind::Keyword(Keyword::Try) => self.parse_try()?,
            TokenKind::Keyword(Keyword::Break) => {
                self.advance()?;
                let label = self.optional_identifier()?;
                self.expect_punct(Punct::Semi)?;
                StmtNode::Break { label }
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance()?;
                let label = self.optional_identifier()?;
                self.expect_punct(Punct::Semi)?;
                StmtNode::Continue { label }
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance()?;
                if self.peek_is_punct(Punct::Semi) {
                    self.advance()?;
                    StmtNode::Return(None)
                } else {
                    let expr = self.parse_expr(Precedence::Assign.as_u8())?;
                    self.expect_punct(Punct::Semi)?;
                    StmtNode::Return(Some(expr))
                }
            }
            TokenKind::Keyword(Keyword::Verb) => self.parse_verb_def()?,
            TokenKind::Punct(Punct::Semi) => {
                self.advance()?;
                StmtNode::Noop
            }
            TokenKind::Str if self.peek_nth(1).is_some_and(|t| t.is_punct(Punct::Semi)) => {
                self.advance()?;
                self.advance()?;
                StmtNode::Comment(unquote_str(&token.text)?)
            }
            _ => {
                let expr = self.parse_expr(Precedence::Assign.as_u8())?;
                self.expect_punct(Punct::Semi)?;
                StmtNode::Expr(expr)
            }
        };
        Ok(Stmt::new(node, line))
    }

    /// `while name (...)` and `fork name (...)` carry an optional label ahead of the parenthesis.
    fn parse_label_before_paren(&mut self) -> Result<Option<String>, CompileError> {
        let labeled = self.peek().is_some_and(|t| t.kind == TokenKind::Identifier)
            && self.peek_nth(1).is_some_and(|t| t.is_punct(Punct::LParen));
        if labeled {
            return Ok(Some(self.advance()?.text));
        }
        Ok(None)
    }

    fn parse_paren_expr(&mut self) -> Result<Expr, CompileError> {
        self.expect_punct(Punct::LParen)?;
        let expr = self.parse_expr(Precedence::Assign.as_u8())?;
        self.expect_punct(Punct::RParen)?;
        Ok(expr)
    }

    fn parse_if(&mut self) -> Result<StmtNode, CompileError> {
        self.expect_keyword(Keyword::If)?;
        let mut arms = vec![];
        let condition = self.parse_paren_expr()?;
        let statements = self.parse_statements()?;
        arms.push(CondArm {
            condition,
            statements,
        });
        while self.peek_is_keyword(Keyword::ElseIf) {
            self.advance()?;
            let condition = self.parse_paren_expr()?;
            let statements = self.parse_statements()?;
            arms.push(CondArm {
                condition,
                statements,
            });
        }
        let otherwise = if self.peek_is_keyword(Keyword::Else) {
            self.advance()?;
            Some(self.parse_statements()?)
        } else {
            None
        };
        self.expect_keyword(Keyword::EndIf)?;
        Ok(StmtNode::Cond { arms, otherwise })
    }

    fn parse_for(&mut self) -> Result<StmtNode, CompileError> {
        self.expect_keyword(Keyword::For)?;
        let id = self.expect_identifier()?;
        self.expect_keyword(Keyword::In)?;
        let node = if self.peek_is_punct(Punct::LBracket) {
            self.advance()?;
            let from = self.parse_expr(Precedence::Assign.as_u8())?;
            self.expect_punct(Punct::DotDot)?;
            let to = self.parse_expr(Precedence::Assign.as_u8())?;
            self.expect_punct(Punct::RBracket)?;
            let body = self.parse_statements()?;
            StmtNode::ForRange { id, from, to, body }
        } else {
            let expr = self.parse_paren_expr()?;
            let body = self.parse_statements()?;
            StmtNode::ForList { id, expr, body }
        };
        self.expect_keyword(Keyword::EndFor)?;
        Ok(node)
    }

    fn parse_try(&mut self) -> Result<StmtNode, CompileError> {
        self.expect_keyword(Keyword::Try)?;
        let body = self.parse_statements()?;
        if self.peek_is_keyword(Keyword::Finally) {
            self.advance()?;
            let handler = self.parse_statements()?;
            self.expect_keyword(Keyword::EndTry)?;
            return Ok(StmtNode::TryFinally { body, handler });
        }
        let mut excepts = vec![];
        while self.peek_is_keyword(Keyword::Except) {
            self.advance()?;
            let id = self.optional_identifier()?;
            self.expect_punct(Punct::LParen)?;
            let codes = self.parse_catch_codes(Punct::RParen)?;
            self.expect_punct(Punct::RParen)?;
            let statements = self.parse_statements()?;
            excepts.push(ExceptArm {
                id,
                codes,
                statements,
            });
        }
        if excepts.is_empty() {
            return Err(self.error("expected `except` or `finally`"));
        }
        self.expect_keyword(Keyword::EndTry)?;
        Ok(StmtNode::TryExcept { body, excepts })
    }

    fn parse_verb_def(&mut self) -> Result<StmtNode, CompileError> {
        self.expect_keyword(Keyword::Verb)?;
        let name = self.expect_identifier()?;
        self.expect_punct(Punct::LParen)?;
        let mut params = vec![];
        if !self.peek_is_punct(Punct::RParen) {
            loop {
                if self.peek_is_punct(Punct::At) {
                    self.advance()?;
                    params.push(Param::Splice(self.expect_identifier()?));
                } else {
                    params.push(Param::Normal(self.expect_identifier()?));
                }
                if !self.peek_is_punct(Punct::Comma) {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect_punct(Punct::RParen)?;
        let body = self.parse_statements()?;
        self.expect_keyword(Keyword::EndVerb)?;
        Ok(StmtNode::Verb { name, params, body })
    }

    /// `ANY`, or a comma separated list of (possibly spliced) expressions, up to `close`.
    fn parse_catch_codes(&mut self, close: Punct) -> Result<CatchCodes, CompileError> {
        if self.peek_is_keyword(Keyword::Any) {
            self.advance()?;
            return Ok(CatchCodes::Any);
        }
        let codes = self.parse_args(&[close, Punct::Arrow], false)?;
        if codes.is_empty() {
            return Err(self.error("expected error codes or `any`"));
        }
        Ok(CatchCodes::Codes(codes))
    }

    /// Comma separated arguments, stopping (without consuming) at any of `closers`. Optional
    /// `?id` entries are accepted only when `optionals_ok`.
    fn parse_args(
        &mut self,
        closers: &[Punct],
        optionals_ok: bool,
    ) -> Result<Vec<Arg>, CompileError> {
        let mut args = vec![];
        if closers.iter().any(|p| self.peek_is_punct(*p)) {
            return Ok(args);
        }
        loop {
            if self.peek_is_punct(Punct::At) {
                self.advance()?;
                args.push(Arg::Splice(self.parse_expr(Precedence::Assign.as_u8())?));
            } else if optionals_ok && self.peek_is_punct(Punct::Question) {
                self.advance()?;
                let id = self.expect_identifier()?;
                let default = if self.peek_is_punct(Punct::Assign) {
                    self.advance()?;
                    Some(self.parse_expr(Precedence::Cond.as_u8())?)
                } else {
                    None
                };
                args.push(Arg::Optional { id, default });
            } else {
                args.push(Arg::Normal(self.parse_expr(Precedence::Assign.as_u8())?));
            }
            if !self.peek_is_punct(Punct::Comma) {
                break;
            }
            self.advance()?;
        }
        Ok(args)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Arg>, CompileError> {
        self.expect_punct(Punct::LParen)?;
        let args = self.parse_args(&[Punct::RParen], false)?;
        self.expect_punct(Punct::RParen)?;
        Ok(args)
    }

    /// Precedence climbing over the infix operators.
    pub fn parse_expr(&mut self, min_precedence: u8) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary()?;
        loop {
            let Some(token) = self.peek() else {
                break;
            };
            let Some((op, info)) = infix_operator(token) else {
                break;
            };
            if info.precedence < min_precedence {
                break;
            }
            let operator = self.advance()?;
            let next_min = match info.associativity {
                Associativity::Left => info.precedence + 1,
                Associativity::Right => info.precedence,
            };
            left = match op {
                InfixOp::Assign => {
                    check_assignment_target(&left, &operator)?;
                    let right = self.parse_expr(next_min)?;
                    Expr::Assign {
                        left: Box::new(left),
                        right: Box::new(right),
                    }
                }
                InfixOp::Cond => {
                    let consequence = self.parse_expr(Precedence::Assign.as_u8())?;
                    self.expect_punct(Punct::Pipe)?;
                    let alternative = self.parse_expr(next_min)?;
                    Expr::Cond {
                        condition: Box::new(left),
                        consequence: Box::new(consequence),
                        alternative: Box::new(alternative),
                    }
                }
                InfixOp::And => Expr::And(Box::new(left), Box::new(self.parse_expr(next_min)?)),
                InfixOp::Or => Expr::Or(Box::new(left), Box::new(self.parse_expr(next_min)?)),
                InfixOp::Binary(op) => {
                    Expr::Binary(op, Box::new(left), Box::new(self.parse_expr(next_min)?))
                }
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        let Some(kind) = self.peek().map(|t| t.kind) else {
            return Err(self.error("expected expression"));
        };
        match kind {
            TokenKind::Punct(Punct::Bang) => {
                self.advance()?;
                let operand = self.parse_expr(Precedence::Unary.as_u8())?;
                Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)))
            }
            TokenKind::Punct(Punct::Minus) => {
                self.advance()?;
                let operand = self.parse_expr(Precedence::Unary.as_u8())?;
                Ok(match operand {
                    Expr::Int(i) => Expr::Int(-i),
                    Expr::Float(f) => Expr::Float(-f),
                    operand => Expr::Unary(UnaryOp::Neg, Box::new(operand)),
                })
            }
            TokenKind::Punct(Punct::Backtick) => {
                self.advance()?;
                let trye = self.parse_expr(Precedence::Assign.as_u8())?;
                self.expect_punct(Punct::Bang)?;
                let codes = self.parse_catch_codes(Punct::Quote)?;
                let except = if self.peek_is_punct(Punct::Arrow) {
                    self.advance()?;
                    Some(Box::new(self.parse_expr(Precedence::Assign.as_u8())?))
                } else {
                    None
                };
                self.expect_punct(Punct::Quote)?;
                let catch = Expr::Catch {
                    trye: Box::new(trye),
                    codes,
                    except,
                };
                self.parse_postfix(catch)
            }
            _ => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Integer => token.text.parse::<i64>().map(Expr::Int).map_err(|_| {
                self.error_at(&token, format!("integer literal out of range: {}", token.text))
            }),
            TokenKind::Float => token
                .text
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Expr::Float)
                .ok_or_else(|| self.error_at(&token, "invalid float literal")),
            TokenKind::Str => Ok(Expr::Str(unquote_str(&token.text)?)),
            TokenKind::Object => token.text[1..]
                .parse::<i32>()
                .map(Expr::Object)
                .map_err(|_| self.error_at(&token, "invalid object reference")),
            TokenKind::ErrorCode => Ok(Expr::Error(token.text)),
            TokenKind::Identifier => {
                if self.peek_is_punct(Punct::LParen) {
                    let args = self.parse_call_args()?;
                    return Ok(Expr::Call {
                        function: token.text,
                        args,
                    });
                }
                Ok(Expr::Id(token.text))
            }
            TokenKind::Punct(Punct::LParen) => {
                let expr = self.parse_expr(Precedence::Assign.as_u8())?;
                self.expect_punct(Punct::RParen)?;
                Ok(Expr::Paren(Box::new(expr)))
            }
            TokenKind::Punct(Punct::LBrace) => {
                let args = self.parse_args(&[Punct::RBrace], true)?;
                self.expect_punct(Punct::RBrace)?;
                let has_optional = args.iter().any(|a| matches!(a, Arg::Optional { .. }));
                if has_optional && !self.peek_is_punct(Punct::Assign) {
                    return Err(self.error_at(
                        &token,
                        "optional `?` entries are only allowed in a scattering assignment",
                    ));
                }
                Ok(Expr::List(args))
            }
            TokenKind::Punct(Punct::Dollar) => {
                if self.peek().is_some_and(|t| t.kind == TokenKind::Identifier) {
                    let name = self.advance()?.text;
                    let location = Box::new(Expr::Object(0));
                    if self.peek_is_punct(Punct::LParen) {
                        let args = self.parse_call_args()?;
                        return Ok(Expr::Verb {
                            location,
                            verb: Selector::Static(name),
                            args,
                        });
                    }
                    return Ok(Expr::Prop {
                        location,
                        property: Selector::Static(name),
                    });
                }
                if self.dollars_ok == 0 {
                    return Err(CompileError::LengthOutsideIndex {
                        line: token.line,
                        column: token.column,
                    });
                }
                Ok(Expr::Length)
            }
            _ => Err(self.error_at(&token, "expected expression")),
        }
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> CompileError {
        CompileError::ParseError {
            line: token.line,
            column: token.column,
            context: token.text.clone(),
            message: message.into(),
        }
    }

    /// A property or verb name following `.` or `:`. Keywords are valid names here.
    fn parse_selector(&mut self) -> Result<Selector, CompileError> {
        if self.peek_is_punct(Punct::LParen) {
            return Ok(Selector::Dynamic(Box::new(self.parse_paren_expr()?)));
        }
        match self.peek() {
            Some(t)
                if matches!(
                    t.kind,
                    TokenKind::Identifier | TokenKind::Keyword(_) | TokenKind::ErrorCode
                ) =>
            {
                Ok(Selector::Static(self.advance()?.text))
            }
            _ => Err(self.error("expected property or verb name")),
        }
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, CompileError> {
        loop {
            let Some(kind) = self.peek().map(|t| t.kind) else {
                return Ok(expr);
            };
            expr = match kind {
                TokenKind::Punct(Punct::Dot) => {
                    self.advance()?;
                    let property = self.parse_selector()?;
                    Expr::Prop {
                        location: Box::new(expr),
                        property,
                    }
                }
                TokenKind::Punct(Punct::Colon) => {
                    self.advance()?;
                    let verb = self.parse_selector()?;
                    let args = self.parse_call_args()?;
                    Expr::Verb {
                        location: Box::new(expr),
                        verb,
                        args,
                    }
                }
                TokenKind::Punct(Punct::LBracket) => {
                    self.advance()?;
                    self.dollars_ok += 1;
                    let from = self.parse_expr(Precedence::Assign.as_u8())?;
                    let subscript = if self.peek_is_punct(Punct::DotDot) {
                        self.advance()?;
                        let to = self.parse_expr(Precedence::Assign.as_u8())?;
                        Expr::Range {
                            base: Box::new(expr),
                            from: Box::new(from),
                            to: Box::new(to),
                        }
                    } else {
                        Expr::Index(Box::new(expr), Box::new(from))
                    };
                    self.expect_punct(Punct::RBracket)?;
                    self.dollars_ok -= 1;
                    subscript
                }
                _ => return Ok(expr),
            };
        }
    }
}

/// Reject left-hand sides that cannot be assigned to, and malformed scatter target lists.
fn check_assignment_target(target: &Expr, operator: &Token) -> Result<(), CompileError> {
    if !target.is_lvalue() {
        return Err(CompileError::InvalidAssignment {
            line: operator.line,
            column: operator.column,
        });
    }
    let Expr::List(items) = target else {
        return Ok(());
    };
    let scatter_error = |message: &str| CompileError::ParseError {
        line: operator.line,
        column: operator.column,
        context: operator.text.clone(),
        message: message.to_string(),
    };
    if items.is_empty() {
        return Err(scatter_error("empty list in scattering assignment"));
    }
    let mut splices = 0;
    for item in items {
        match item {
            Arg::Normal(Expr::Id(_)) | Arg::Optional { .. } => {}
            Arg::Splice(Expr::Id(_)) => splices += 1,
            _ => return Err(scatter_error("scattering assignment targets must be identifiers")),
        }
    }
    if splices > 1 {
        return Err(scatter_error(
            "more than one `@` target in scattering assignment",
        ));
    }
    Ok(())
}

/// MOO string unquoting: the surrounding quotes are removed and a backslash takes the following
/// character literally. There are no other escape sequences.
pub fn unquote_str(s: &str) -> Result<String, CompileError> {
    let Some(body) = s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return Err(CompileError::StringLexError(format!(
            "string literal must be quoted: {s}"
        )));
    };
    let mut output = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            output.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped) => output.push(escaped),
            None => {
                return Err(CompileError::StringLexError(format!(
                    "dangling escape in string literal: {s}"
                )));
            }
        }
    }
    Ok(output)
}

pub fn parse_program(program_text: &str, options: CompileOptions) -> Result<Parse, CompileError> {
    let tokens = Lexer::new(program_text, &options)?.collect::<Result<Vec<_>, _>>()?;
    let stmts = Parser::new(tokens).parse_program()?;
    Ok(Parse { stmts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use crate::ast::Expr::{Id, Int};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn stripped_stmts(statements: &[Stmt]) -> Vec<StmtNode> {
        statements.iter().map(|s| s.node.clone()).collect()
    }

    fn parse_expr_stmt(program: &str) -> Expr {
        let parse = parse_program(program, CompileOptions::default()).unwrap();
        match stripped_stmts(&parse.stmts).remove(0) {
            StmtNode::Expr(e) => e,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    fn b(e: Expr) -> Box<Expr> {
        Box::new(e)
    }

    #[test]
    fn test_string_unquote() {
        assert_eq!(unquote_str(r#""foo""#).unwrap(), "foo");
        assert_eq!(unquote_str(r#""foo\"bar""#).unwrap(), r#"foo"bar"#);
        assert_eq!(unquote_str(r#""foo\\bar""#).unwrap(), r"foo\bar");
        assert_eq!(unquote_str(r#""foo\tbar""#).unwrap(), "footbar");
        assert!(unquote_str("foo").is_err());
    }

    #[test]
    fn test_parse_simple_var_assignment_precedence() {
        assert_eq!(
            parse_expr_stmt("a = 1 + 2;"),
            Expr::Assign {
                left: b(Id("a".into())),
                right: b(Expr::Binary(BinaryOp::Add, b(Int(1)), b(Int(2)))),
            }
        );
    }

    #[test]
    fn test_multiplicative_binds_tighter() {
        assert_eq!(
            parse_expr_stmt("1 + 2 * 3;"),
            Expr::Binary(
                BinaryOp::Add,
                b(Int(1)),
                b(Expr::Binary(BinaryOp::Mul, b(Int(2)), b(Int(3))))
            )
        );
    }

    #[test]
    fn test_exponent_is_right_associative() {
        assert_eq!(
            parse_expr_stmt("2 ^ 3 ^ 2;"),
            Expr::Binary(
                BinaryOp::Exp,
                b(Int(2)),
                b(Expr::Binary(BinaryOp::Exp, b(Int(3)), b(Int(2))))
            )
        );
    }

    #[test]
    fn test_logical_operators_are_left_associative_on_one_level() {
        assert_eq!(
            parse_expr_stmt("a || b && c;"),
            Expr::And(
                b(Expr::Or(b(Id("a".into())), b(Id("b".into())))),
                b(Id("c".into()))
            )
        );
    }

    #[test]
    fn test_negative_literal_folding() {
        assert_eq!(parse_expr_stmt("-5;"), Int(-5));
        assert_eq!(parse_expr_stmt("-2.5;"), Expr::Float(-2.5));
        assert_eq!(
            parse_expr_stmt("-x;"),
            Expr::Unary(UnaryOp::Neg, b(Id("x".into())))
        );
    }

    #[test]
    fn test_conditional() {
        assert_eq!(
            parse_expr_stmt("x = a ? b | c;"),
            Expr::Assign {
                left: b(Id("x".into())),
                right: b(Expr::Cond {
                    condition: b(Id("a".into())),
                    consequence: b(Id("b".into())),
                    alternative: b(Id("c".into())),
                }),
            }
        );
    }

    #[test]
    fn test_call_verb() {
        assert_eq!(
            parse_expr_stmt(r#"#0:test_verb(1, "test");"#),
            Expr::Verb {
                location: b(Expr::Object(0)),
                verb: Selector::Static("test_verb".into()),
                args: vec![Arg::Normal(Int(1)), Arg::Normal(Expr::Str("test".into()))],
            }
        );
    }

    #[test]
    fn test_sysobj_references() {
        assert_eq!(
            parse_expr_stmt("$string_utils:trim(s);"),
            Expr::Verb {
                location: b(Expr::Prop {
                    location: b(Expr::Object(0)),
                    property: Selector::Static("string_utils".into()),
                }),
                verb: Selector::Static("trim".into()),
                args: vec![Arg::Normal(Id("s".into()))],
            }
        );
        assert_eq!(
            parse_expr_stmt("$login(1);"),
            Expr::Verb {
                location: b(Expr::Object(0)),
                verb: Selector::Static("login".into()),
                args: vec![Arg::Normal(Int(1))],
            }
        );
    }

    #[test]
    fn test_computed_property_and_verb() {
        assert_eq!(
            parse_expr_stmt("o.(p):(v)();"),
            Expr::Verb {
                location: b(Expr::Prop {
                    location: b(Id("o".into())),
                    property: Selector::Dynamic(b(Id("p".into()))),
                }),
                verb: Selector::Dynamic(b(Id("v".into()))),
                args: vec![],
            }
        );
    }

    #[test]
    fn test_index_and_range_with_length() {
        assert_eq!(
            parse_expr_stmt("s[$ - 1..$];"),
            Expr::Range {
                base: b(Id("s".into())),
                from: b(Expr::Binary(BinaryOp::Sub, b(Expr::Length), b(Int(1)))),
                to: b(Expr::Length),
            }
        );
    }

    #[test]
    fn test_length_outside_index() {
        assert_eq!(
            parse_program("return $;", CompileOptions::default()),
            Err(CompileError::LengthOutsideIndex { line: 1, column: 8 })
        );
    }

    #[test]
    fn test_catch_expression() {
        assert_eq!(
            parse_expr_stmt("`x.y ! E_PROPNF, E_PERM => 17';"),
            Expr::Catch {
                trye: b(Expr::Prop {
                    location: b(Id("x".into())),
                    property: Selector::Static("y".into()),
                }),
                codes: CatchCodes::Codes(vec![
                    Arg::Normal(Expr::Error("E_PROPNF".into())),
                    Arg::Normal(Expr::Error("E_PERM".into())),
                ]),
                except: Some(b(Int(17))),
            }
        );
        assert_eq!(
            parse_expr_stmt("`1/0 ! ANY';"),
            Expr::Catch {
                trye: b(Expr::Binary(BinaryOp::Div, b(Int(1)), b(Int(0)))),
                codes: CatchCodes::Any,
                except: None,
            }
        );
    }

    #[test]
    fn test_scatter_target() {
        assert_eq!(
            parse_expr_stmt("{a, ?b = 5, @c} = args;"),
            Expr::Assign {
                left: b(Expr::List(vec![
                    Arg::Normal(Id("a".into())),
                    Arg::Optional {
                        id: "b".into(),
                        default: Some(Int(5)),
                    },
                    Arg::Splice(Id("c".into())),
                ])),
                right: b(Id("args".into())),
            }
        );
    }

    #[test_case("{?a};"; "optional outside assignment")]
    #[test_case("{@a, @b} = x;"; "two splices")]
    #[test_case("{a, 1} = x;"; "non identifier target")]
    #[test_case("if (x) return;"; "missing endif")]
    #[test_case("x = 1"; "missing semicolon")]
    fn test_syntax_errors(program: &str) {
        assert!(matches!(
            parse_program(program, CompileOptions::default()),
            Err(CompileError::ParseError { .. })
        ));
    }

    #[test]
    fn test_missing_end_names_keyword() {
        let Err(CompileError::ParseError { message, .. }) =
            parse_program("while (1) x = 1;", CompileOptions::default())
        else {
            panic!("expected parse error");
        };
        assert_eq!(message, "expected `endwhile`");
    }

    #[test]
    fn test_invalid_assignment() {
        assert_eq!(
            parse_program("1 + 2 = 3;", CompileOptions::default()),
            Err(CompileError::InvalidAssignment { line: 1, column: 7 })
        );
    }

    #[test]
    fn test_parse_if_stmt() {
        let program = "if (1 == 2) return 5; elseif (2 == 3) return 3; else return 6; endif";
        let parse = parse_program(program, CompileOptions::default()).unwrap();
        let eq = |l, r| Expr::Binary(BinaryOp::Eq, b(Int(l)), b(Int(r)));
        assert_eq!(
            stripped_stmts(&parse.stmts),
            vec![StmtNode::Cond {
                arms: vec![
                    CondArm {
                        condition: eq(1, 2),
                        statements: vec![Stmt::new(StmtNode::Return(Some(Int(5))), 1)],
                    },
                    CondArm {
                        condition: eq(2, 3),
                        statements: vec![Stmt::new(StmtNode::Return(Some(Int(3))), 1)],
                    },
                ],
                otherwise: Some(vec![Stmt::new(StmtNode::Return(Some(Int(6))), 1)]),
            }]
        );
    }

    #[test]
    fn test_loops_and_labels() {
        let program = r#"
            while outer (1)
                for x in [1..5]
                    break outer;
                endfor
                for y in ({1, 2})
                    continue;
                endfor
            endwhile
        "#;
        let parse = parse_program(program, CompileOptions::default()).unwrap();
        let StmtNode::While { label, body, .. } = &parse.stmts[0].node else {
            panic!("expected while");
        };
        assert_eq!(label.as_deref(), Some("outer"));
        assert_eq!(parse.stmts[0].line, 2);
        assert!(matches!(&body[0].node, StmtNode::ForRange { id, .. } if id == "x"));
        assert!(matches!(&body[1].node, StmtNode::ForList { id, .. } if id == "y"));
        assert_eq!(body[1].line, 6);
    }

    #[test]
    fn test_try_except_finally() {
        let program = r#"
            try
                x = 1;
            except e (E_TYPE, @codes)
                "handled";
            except (ANY)
            endtry
            try return; finally cleanup(); endtry
        "#;
        let parse = parse_program(program, CompileOptions::default()).unwrap();
        let StmtNode::TryExcept { excepts, .. } = &parse.stmts[0].node else {
            panic!("expected try/except");
        };
        assert_eq!(excepts.len(), 2);
        assert_eq!(excepts[0].id.as_deref(), Some("e"));
        assert_eq!(
            excepts[0].codes,
            CatchCodes::Codes(vec![
                Arg::Normal(Expr::Error("E_TYPE".into())),
                Arg::Splice(Id("codes".into())),
            ])
        );
        assert_eq!(
            stripped_stmts(&excepts[0].statements),
            vec![StmtNode::Comment("handled".into())]
        );
        assert_eq!(excepts[1].codes, CatchCodes::Any);
        assert!(matches!(parse.stmts[1].node, StmtNode::TryFinally { .. }));
    }

    #[test]
    fn test_fork_and_verb_definition() {
        let program = r#"
            fork task (5)
                player:tell("hi");
            endfork
            __VERB__ helper(a, @rest)
                return a;
            endverb
        "#;
        let parse = parse_program(program, CompileOptions::default()).unwrap();
        assert!(matches!(
            &parse.stmts[0].node,
            StmtNode::Fork { label: Some(l), delay: Int(5), .. } if l == "task"
        ));
        assert_eq!(
            parse.stmts[1].node,
            StmtNode::Verb {
                name: "helper".into(),
                params: vec![Param::Normal("a".into()), Param::Splice("rest".into())],
                body: vec![Stmt::new(StmtNode::Return(Some(Id("a".into()))), 6)],
            }
        );
    }
}
