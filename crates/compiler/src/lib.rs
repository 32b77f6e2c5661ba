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

#[macro_use]
extern crate pest_derive;

mod ast;
mod builtins;
mod captures;
mod codegen;
mod codes;
mod errors;
mod fold;
mod ir;
mod lexer;
mod names;
mod parse;
mod precedence;
mod scatter;

pub use crate::ast::{Arg, BinaryOp, CatchCodes, Expr, Stmt, StmtNode, UnaryOp};
pub use crate::builtins::{BUILTIN_DESCRIPTORS, Builtin, find_builtin};
pub use crate::codegen::{CodegenState, compile, compile_tree, quote_str};
pub use crate::codes::{category, category_for_name};
pub use crate::errors::CompileError;
pub use crate::ir::Fragment;
pub use crate::lexer::{Lexer, Token, TokenKind};
pub use crate::names::{mangle, mangle_attr};
pub use crate::parse::{CompileOptions, Parse, parse_program, unquote_str};
