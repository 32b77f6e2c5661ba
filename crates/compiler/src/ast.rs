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

//! The abstract syntax tree produced by the parser and lowered by codegen into Python source.

#[derive(Debug, PartialEq, Clone)]
pub enum Arg {
    Normal(Expr),
    Splice(Expr),
    /// `?id` or `?id = default`; only legal inside a scatter target.
    Optional { id: String, default: Option<Expr> },
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum BinaryOp {
    Add,
    Div,
    Eq,
    Exp,
    Gt,
    GtE,
    In,
    Lt,
    LtE,
    Mod,
    Mul,
    NEq,
    Sub,
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, PartialEq, Clone)]
pub enum CatchCodes {
    Codes(Vec<Arg>),
    Any,
}

/// A property or verb name: written literally, or computed at runtime via `.(expr)` / `:(expr)`.
#[derive(Debug, PartialEq, Clone)]
pub enum Selector {
    Static(String),
    Dynamic(Box<Expr>),
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Object(i32),
    Error(String),
    Id(String),
    Prop {
        location: Box<Expr>,
        property: Selector,
    },
    Verb {
        location: Box<Expr>,
        verb: Selector,
        args: Vec<Arg>,
    },
    Call {
        function: String,
        args: Vec<Arg>,
    },
    Paren(Box<Expr>),
    List(Vec<Arg>),
    Index(Box<Expr>, Box<Expr>),
    Range {
        base: Box<Expr>,
        from: Box<Expr>,
        to: Box<Expr>,
    },
    Length,
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cond {
        condition: Box<Expr>,
        consequence: Box<Expr>,
        alternative: Box<Expr>,
    },
    Catch {
        trye: Box<Expr>,
        codes: CatchCodes,
        except: Option<Box<Expr>>,
    },
    Assign {
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Whether this expression may appear on the left of `=`.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self,
            Expr::Id(_) | Expr::Prop { .. } | Expr::Index(..) | Expr::Range { .. } | Expr::List(_)
        )
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct CondArm {
    pub condition: Expr,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ExceptArm {
    pub id: Option<String>,
    pub codes: CatchCodes,
    pub statements: Vec<Stmt>,
}

/// Parameter of a `__VERB__` definition.
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum Param {
    Normal(String),
    Splice(String),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Stmt {
    pub node: StmtNode,
    /// The source line this statement starts on.
    pub line: usize,
}

impl Stmt {
    pub fn new(node: StmtNode, line: usize) -> Self {
        Stmt { node, line }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum StmtNode {
    Cond {
        arms: Vec<CondArm>,
        otherwise: Option<Vec<Stmt>>,
    },
    ForList {
        id: String,
        expr: Expr,
        body: Vec<Stmt>,
    },
    ForRange {
        id: String,
        from: Expr,
        to: Expr,
        body: Vec<Stmt>,
    },
    While {
        label: Option<String>,
        condition: Expr,
        body: Vec<Stmt>,
    },
    Fork {
        label: Option<String>,
        delay: Expr,
        body: Vec<Stmt>,
    },
    TryExcept {
        body: Vec<Stmt>,
        excepts: Vec<ExceptArm>,
    },
    TryFinally {
        body: Vec<Stmt>,
        handler: Vec<Stmt>,
    },
    Break {
        label: Option<String>,
    },
    Continue {
        label: Option<String>,
    },
    Return(Option<Expr>),
    Verb {
        name: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
    },
    Comment(String),
    Noop,
    Expr(Expr),
}

impl StmtNode {
    /// Whether the statement produces any host code that executes. Comments and no-ops do not.
    pub fn is_executable(&self) -> bool {
        !matches!(self, StmtNode::Comment(_) | StmtNode::Noop)
    }
}
