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

//! The variables a block refers to. A forked task gets its own copy of each of them, taken when
//! the fork statement runs.

use crate::ast::{Arg, CatchCodes, CondArm, Expr, Selector, Stmt, StmtNode};

#[derive(Default)]
struct Captures {
    names: Vec<String>,
}

impl Captures {
    fn add(&mut self, name: &str) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }

    fn args(&mut self, args: &[Arg]) {
        for arg in args {
            match arg {
                Arg::Normal(e) | Arg::Splice(e) => self.expr(e),
                Arg::Optional { id, default } => {
                    self.add(id);
                    if let Some(default) = default {
                        self.expr(default);
                    }
                }
            }
        }
    }

    fn selector(&mut self, selector: &Selector) {
        if let Selector::Dynamic(e) = selector {
            self.expr(e);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::Str(_)
            | Expr::Object(_)
            | Expr::Error(_)
            | Expr::Length => {}
            Expr::Id(id) => self.add(id),
            Expr::Prop { location, property } => {
                self.expr(location);
                self.selector(property);
            }
            Expr::Verb {
                location,
                verb,
                args,
            } => {
                self.expr(location);
                self.selector(verb);
                self.args(args);
            }
            Expr::Call { args, .. } | Expr::List(args) => self.args(args),
            Expr::Paren(e) | Expr::Unary(_, e) => self.expr(e),
            Expr::Index(base, index) => {
                self.expr(base);
                self.expr(index);
            }
            Expr::Range { base, from, to } => {
                self.expr(base);
                self.expr(from);
                self.expr(to);
            }
            Expr::Binary(_, l, r)
            | Expr::And(l, r)
            | Expr::Or(l, r)
            | Expr::Assign { left: l, right: r } => {
                self.expr(l);
                self.expr(r);
            }
            Expr::Cond {
                condition,
                consequence,
                alternative,
            } => {
                self.expr(condition);
                self.expr(consequence);
                self.expr(alternative);
            }
            Expr::Catch {
                trye,
                codes,
                except,
            } => {
                self.expr(trye);
                if let CatchCodes::Codes(codes) = codes {
                    self.args(codes);
                }
                if let Some(except) = except {
                    self.expr(except);
                }
            }
        }
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(&stmt.node);
        }
    }

    fn stmt(&mut self, node: &StmtNode) {
        match node {
            StmtNode::Cond { arms, otherwise } => {
                for CondArm {
                    condition,
                    statements,
                } in arms
                {
                    self.expr(condition);
                    self.stmts(statements);
                }
                if let Some(otherwise) = otherwise {
                    self.stmts(otherwise);
                }
            }
            StmtNode::ForList { id, expr, body } => {
                self.add(id);
                self.expr(expr);
                self.stmts(body);
            }
            StmtNode::ForRange { id, from, to, body } => {
                self.add(id);
                self.expr(from);
                self.expr(to);
                self.stmts(body);
            }
            StmtNode::While {
                condition, body, ..
            } => {
                self.expr(condition);
                self.stmts(body);
            }
            // A nested fork copies from this task's variables, so they have to be here too.
            StmtNode::Fork { label, delay, body } => {
                if let Some(label) = label {
                    self.add(label);
                }
                self.expr(delay);
                self.stmts(body);
            }
            StmtNode::TryExcept { body, excepts } => {
                self.stmts(body);
                for arm in excepts {
                    if let Some(id) = &arm.id {
                        self.add(id);
                    }
                    if let CatchCodes::Codes(codes) = &arm.codes {
                        self.args(codes);
                    }
                    self.stmts(&arm.statements);
                }
            }
            StmtNode::TryFinally { body, handler } => {
                self.stmts(body);
                self.stmts(handler);
            }
            StmtNode::Return(Some(e)) | StmtNode::Expr(e) => self.expr(e),
            // Parameters and locals of a nested verb belong to it.
            StmtNode::Verb { name, .. } => self.add(name),
            StmtNode::Break { .. }
            | StmtNode::Continue { .. }
            | StmtNode::Return(None)
            | StmtNode::Comment(_)
            | StmtNode::Noop => {}
        }
    }
}

/// Every variable the statements read or bind, in order of first appearance.
pub fn captured_variables(stmts: &[Stmt]) -> Vec<String> {
    let mut captures = Captures::default();
    captures.stmts(stmts);
    captures.names
}
