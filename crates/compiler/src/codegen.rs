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

//! Takes the AST and turns it into a fragment tree of Python source.

use itertools::Itertools;
use tracing::warn;

use crate::ast::{
    Arg, BinaryOp, CatchCodes, CondArm, ExceptArm, Expr, Param, Selector, Stmt, StmtNode, UnaryOp,
};
use crate::builtins::find_builtin;
use crate::captures::captured_variables;
use crate::codes::{ANY_CATEGORY, canonical_name, category_for_name};
use crate::errors::CompileError;
use crate::fold::fold_int;
use crate::ir::Fragment;
use crate::names::{mangle, mangle_attr};
use crate::parse::{CompileOptions, Parse, parse_program};
use crate::precedence::HostPrecedence;
use crate::scatter::{Binding, ScatterPlan, ScatterStep};

/// A compiled expression and the precedence of its outermost host operator.
type Compiled = (Fragment, HostPrecedence);

pub struct Loop {
    label: Option<String>,
    /// Set when a nested loop leaves this one by name, and so needs a handler for the signal.
    signalled_break: bool,
    signalled_continue: bool,
}

/// Entries on the loop stack. A barrier hides the loops outside a fork or verb definition.
pub enum LoopScope {
    Loop(Loop),
    Barrier,
}

impl Loop {
    fn new(label: Option<&str>) -> Self {
        Self {
            label: label.map(str::to_string),
            signalled_break: false,
            signalled_continue: false,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    Break,
    Continue,
}

impl LoopExit {
    fn keyword(self) -> &'static str {
        match self {
            LoopExit::Break => "break",
            LoopExit::Continue => "continue",
        }
    }

    fn signal(self) -> &'static str {
        match self {
            LoopExit::Break => "moo.Break",
            LoopExit::Continue => "moo.Continue",
        }
    }
}

// Compiler code generation state.
pub struct CodegenState {
    /// Numbers the temporaries of one program.
    pub(crate) counter: usize,
    pub(crate) loops: Vec<LoopScope>,
    /// Source line of the statement being compiled, for diagnostics.
    pub(crate) line: usize,
    pub(crate) compile_options: CompileOptions,
}

fn seq(fragments: Vec<Fragment>) -> Fragment {
    Fragment::seq(fragments)
}

fn text(s: impl Into<String>) -> Fragment {
    Fragment::text(s)
}

fn line(s: impl Into<String>) -> Fragment {
    Fragment::line(s)
}

fn brace_if(condition: bool, fragment: Fragment) -> Fragment {
    if condition {
        seq(vec![text("("), fragment, text(")")])
    } else {
        fragment
    }
}

fn join(fragments: Vec<Fragment>, separator: &str) -> Fragment {
    let mut joined = Vec::with_capacity(fragments.len() * 2);
    for (i, f) in fragments.into_iter().enumerate() {
        if i > 0 {
            joined.push(text(separator));
        }
        joined.push(f);
    }
    seq(joined)
}

/// `name = <value>` as a complete line.
fn bind(name: &str, value: Fragment) -> Fragment {
    seq(vec![text(format!("{name} = ")), value, line("")])
}

/// A Python string literal for `s`.
pub fn quote_str(s: &str) -> String {
    let mut output = String::with_capacity(s.len() + 2);
    output.push('"');
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c.is_control() => output.push_str(&format!("\\u{:04x}", c as u32)),
            c => output.push(c),
        }
    }
    output.push('"');
    output
}

/// Python would chain `a < b < c`, so comparison operands are always parenthesized.
fn comparison(
    l: Fragment,
    lp: HostPrecedence,
    symbol: &str,
    r: Fragment,
    rp: HostPrecedence,
) -> Compiled {
    let l = brace_if(lp <= HostPrecedence::Comparison, l);
    let r = brace_if(rp <= HostPrecedence::Comparison, r);
    (
        seq(vec![l, text(format!(" {symbol} ")), r]),
        HostPrecedence::Comparison,
    )
}

fn arithmetic(
    l: Fragment,
    lp: HostPrecedence,
    symbol: &str,
    r: Fragment,
    rp: HostPrecedence,
    precedence: HostPrecedence,
) -> Compiled {
    let l = brace_if(lp < precedence, l);
    let r = brace_if(rp <= precedence, r);
    (seq(vec![l, text(format!(" {symbol} ")), r]), precedence)
}

fn runtime_call(name: &str, l: Fragment, r: Fragment) -> Compiled {
    (
        seq(vec![text(format!("{name}(")), l, text(", "), r, text(")")]),
        HostPrecedence::Atom,
    )
}

impl CodegenState {
    pub fn new(compile_options: CompileOptions) -> Self {
        Self {
            counter: 0,
            loops: vec![],
            line: 0,
            compile_options,
        }
    }

    /// A fresh temporary name, `__<prefix><n>`.
    fn fresh(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("__{prefix}{}", self.counter)
    }

    fn invalid_assignment(&self) -> CompileError {
        CompileError::InvalidAssignment {
            line: self.line,
            column: 0,
        }
    }

    fn misplaced_optional(&self) -> CompileError {
        CompileError::ParseError {
            line: self.line,
            column: 0,
            context: "?".to_string(),
            message: "optional `?` entries are only allowed in a scattering assignment"
                .to_string(),
        }
    }

    /// Compile an expression that will have something applied to it: attribute access, a call,
    /// or a subscript.
    fn compile_operand(&mut self, expr: &Expr) -> Result<Fragment, CompileError> {
        let (fragment, precedence) = self.compile_expr(expr)?;
        Ok(brace_if(precedence < HostPrecedence::Atom, fragment))
    }

    fn compile_args(&mut self, args: &[Arg]) -> Result<Fragment, CompileError> {
        let mut compiled = vec![];
        for arg in args {
            compiled.push(match arg {
                Arg::Normal(e) => self.compile_expr(e)?.0,
                Arg::Splice(e) => {
                    let (f, p) = self.compile_expr(e)?;
                    seq(vec![text("*"), brace_if(p < HostPrecedence::Atom, f)])
                }
                Arg::Optional { .. } => return Err(self.misplaced_optional()),
            });
        }
        Ok(join(compiled, ", "))
    }

    fn compile_call(&mut self, callee: Fragment, args: &[Arg]) -> Result<Compiled, CompileError> {
        let args = self.compile_args(args)?;
        Ok((
            seq(vec![callee, text("("), args, text(")")]),
            HostPrecedence::Atom,
        ))
    }

    /// List literals. Splices become concatenation of the runs between them.
    fn compile_list(&mut self, args: &[Arg]) -> Result<Compiled, CompileError> {
        if !args.iter().any(|a| matches!(a, Arg::Splice(_))) {
            let items = self.compile_args(args)?;
            return Ok((seq(vec![text("["), items, text("]")]), HostPrecedence::Atom));
        }
        if let [Arg::Splice(e)] = args {
            let (f, _) = self.compile_expr(e)?;
            return Ok((
                seq(vec![text("list("), f, text(")")]),
                HostPrecedence::Atom,
            ));
        }
        let mut parts = vec![];
        for (is_splice, run) in &args.iter().chunk_by(|a| matches!(a, Arg::Splice(_))) {
            if is_splice {
                for arg in run {
                    if let Arg::Splice(e) = arg {
                        let (f, p) = self.compile_expr(e)?;
                        parts.push(brace_if(p <= HostPrecedence::Additive, f));
                    }
                }
            } else {
                let run: Vec<Arg> = run.cloned().collect();
                let items = self.compile_args(&run)?;
                parts.push(seq(vec![text("["), items, text("]")]));
            }
        }
        Ok((join(parts, " + "), HostPrecedence::Additive))
    }

    /// The 0-based start of a subscript.
    fn compile_subscript_start(&mut self, index: &Expr) -> Result<Fragment, CompileError> {
        let (start, precedence) = self.compile_expr(index)?;
        if !start.has_proxy()
            && let Some(folded) = fold_int(&start.render_inline()).and_then(|i| i.checked_sub(1))
        {
            return Ok(text(folded.to_string()));
        }
        Ok(seq(vec![
            brace_if(precedence < HostPrecedence::Additive, start),
            text(" - 1"),
        ]))
    }

    /// The exclusive end of a slice, which is the same number as the inclusive 1-based end.
    /// `None` for an open slice.
    fn compile_subscript_end(&mut self, index: &Expr) -> Result<Option<Fragment>, CompileError> {
        let (end, _) = self.compile_expr(index)?;
        if !end.has_proxy()
            && let Some(folded) = fold_int(&end.render_inline())
        {
            if folded == 0 && matches!(index, Expr::Length) {
                return Ok(None);
            }
            return Ok(Some(text(folded.to_string())));
        }
        Ok(Some(end))
    }

    fn compile_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Compiled, CompileError> {
        let (l, lp) = self.compile_expr(left)?;
        let (r, rp) = self.compile_expr(right)?;
        let compiled = match op {
            BinaryOp::Eq => comparison(l, lp, "==", r, rp),
            BinaryOp::NEq => comparison(l, lp, "!=", r, rp),
            BinaryOp::Lt => comparison(l, lp, "<", r, rp),
            BinaryOp::LtE => comparison(l, lp, "<=", r, rp),
            BinaryOp::Gt => comparison(l, lp, ">", r, rp),
            BinaryOp::GtE => comparison(l, lp, ">=", r, rp),
            BinaryOp::Add => arithmetic(l, lp, "+", r, rp, HostPrecedence::Additive),
            BinaryOp::Sub => arithmetic(l, lp, "-", r, rp, HostPrecedence::Additive),
            BinaryOp::Mul => arithmetic(l, lp, "*", r, rp, HostPrecedence::Multiplicative),
            BinaryOp::Exp => {
                // `**` binds tighter than unary minus on its left, looser on its right.
                let l = brace_if(lp <= HostPrecedence::Power, l);
                let r = brace_if(rp < HostPrecedence::Unary, r);
                (seq(vec![l, text(" ** "), r]), HostPrecedence::Power)
            }
            BinaryOp::Div => runtime_call("moo.div", l, r),
            BinaryOp::Mod => runtime_call("moo.mod", l, r),
            BinaryOp::In => runtime_call("moo.position", l, r),
        };
        Ok(compiled)
    }

    /// `&&` and `||`. A right operand with hoisted statements must only run them when it is
    /// itself evaluated, so the operator becomes an explicit `if`.
    fn compile_logical(
        &mut self,
        is_and: bool,
        left: &Expr,
        right: &Expr,
    ) -> Result<Compiled, CompileError> {
        let (l, lp) = self.compile_expr(left)?;
        let (r, rp) = self.compile_expr(right)?;
        let (keyword, precedence) = if is_and {
            ("and", HostPrecedence::And)
        } else {
            ("or", HostPrecedence::Or)
        };
        if !r.has_proxy() {
            let l = brace_if(lp < precedence, l);
            let r = brace_if(rp <= precedence, r);
            return Ok((
                seq(vec![l, text(format!(" {keyword} ")), r]),
                precedence,
            ));
        }
        let name = self.fresh(keyword);
        let test = if is_and {
            format!("if {name}:")
        } else {
            format!("if not {name}:")
        };
        let body = vec![
            bind(&name, l),
            line(test),
            Fragment::Scope(vec![bind(&name, r)]),
        ];
        Ok((Fragment::Proxy { name, body }, HostPrecedence::Atom))
    }

    fn compile_cond(
        &mut self,
        condition: &Expr,
        consequence: &Expr,
        alternative: &Expr,
    ) -> Result<Compiled, CompileError> {
        let (c, _) = self.compile_expr(condition)?;
        let (t, _) = self.compile_expr(consequence)?;
        let (e, _) = self.compile_expr(alternative)?;
        if !t.has_proxy() && !e.has_proxy() {
            return Ok((
                seq(vec![
                    text("("),
                    t,
                    text(" if "),
                    c,
                    text(" else "),
                    e,
                    text(")"),
                ]),
                HostPrecedence::Atom,
            ));
        }
        let name = self.fresh("cond");
        let body = vec![
            seq(vec![text("if "), c, line(":")]),
            Fragment::Scope(vec![bind(&name, t)]),
            line("else:"),
            Fragment::Scope(vec![bind(&name, e)]),
        ];
        Ok((Fragment::Proxy { name, body }, HostPrecedence::Atom))
    }

    fn error_category(&self, name: &str) -> Result<String, CompileError> {
        match category_for_name(name) {
            Some(category) => Ok(category),
            None if self.compile_options.strict_error_codes => {
                Err(CompileError::UnmappedErrorCode(name.to_string()))
            }
            None => {
                warn!(code = name, line = self.line, "Unmapped error code, catching Exception");
                Ok(ANY_CATEGORY.to_string())
            }
        }
    }

    /// The expression naming what an `except` clause catches.
    fn compile_categories(&mut self, codes: &CatchCodes) -> Result<Fragment, CompileError> {
        let args = match codes {
            CatchCodes::Any => return Ok(text(ANY_CATEGORY)),
            CatchCodes::Codes(args) => args,
        };
        let mut listed: Vec<String> = vec![];
        let mut entries = vec![];
        let mut spliced = false;
        for arg in args {
            let entry = match arg {
                Arg::Normal(Expr::Error(name)) => {
                    let category = self.error_category(name)?;
                    if listed.contains(&category) {
                        continue;
                    }
                    listed.push(category.clone());
                    text(category)
                }
                Arg::Normal(e) => {
                    let (f, _) = self.compile_expr(e)?;
                    seq(vec![text("moo.error_category("), f, text(")")])
                }
                Arg::Splice(e) => {
                    spliced = true;
                    let (f, _) = self.compile_expr(e)?;
                    seq(vec![text("*moo.error_categories("), f, text(")")])
                }
                Arg::Optional { .. } => return Err(self.misplaced_optional()),
            };
            entries.push(entry);
        }
        if entries.len() == 1
            && !spliced
            && let Some(entry) = entries.pop()
        {
            return Ok(entry);
        }
        let trailing = if entries.len() == 1 { "," } else { "" };
        Ok(seq(vec![
            text("("),
            join(entries, ", "),
            text(format!("{trailing})")),
        ]))
    }

    /// Categories that need statements to compute are evaluated into a temporary ahead of the
    /// `try`, since nothing can be placed between a block and its handlers.
    fn compile_handler_categories(
        &mut self,
        codes: &CatchCodes,
        prelude: &mut Vec<Fragment>,
    ) -> Result<Fragment, CompileError> {
        let categories = self.compile_categories(codes)?;
        if !categories.has_proxy() {
            return Ok(categories);
        }
        let name = self.fresh("codes");
        prelude.push(bind(&name, categories));
        Ok(text(name))
    }

    fn compile_catch(
        &mut self,
        trye: &Expr,
        codes: &CatchCodes,
        except: Option<&Expr>,
    ) -> Result<Compiled, CompileError> {
        let name = self.fresh("catch");
        let mut body = vec![];
        let categories = self.compile_handler_categories(codes, &mut body)?;
        let (value, _) = self.compile_expr(trye)?;
        let fallback = match except {
            Some(e) => self.compile_expr(e)?.0,
            None => text("None"),
        };
        body.extend([
            line("try:"),
            Fragment::Scope(vec![bind(&name, value)]),
            seq(vec![text("except "), categories, line(":")]),
            Fragment::Scope(vec![bind(&name, fallback)]),
        ]);
        Ok((Fragment::Proxy { name, body }, HostPrecedence::Atom))
    }

    /// A left-hand side other than a scatter list or a computed property.
    fn compile_target(&mut self, target: &Expr) -> Result<Fragment, CompileError> {
        match target {
            Expr::Id(id) => Ok(text(mangle(id))),
            Expr::Prop {
                location,
                property: Selector::Static(name),
            } => {
                let location = self.compile_operand(location)?;
                Ok(seq(vec![location, text(format!(".{}", mangle_attr(name)))]))
            }
            Expr::Index(..) | Expr::Range { .. } => Ok(self.compile_expr(target)?.0),
            _ => Err(self.invalid_assignment()),
        }
    }

    /// `target = value` at statement level.
    fn compile_assign_stmt(&mut self, left: &Expr, right: &Expr) -> Result<Fragment, CompileError> {
        match left {
            Expr::List(items) => {
                let (value, _) = self.compile_expr(right)?;
                self.compile_scatter(items, value, None)
            }
            Expr::Prop {
                location,
                property: Selector::Dynamic(name),
            } => {
                let (location, _) = self.compile_expr(location)?;
                let (name, _) = self.compile_expr(name)?;
                let (value, _) = self.compile_expr(right)?;
                Ok(seq(vec![
                    text("setattr("),
                    location,
                    text(", "),
                    name,
                    text(", "),
                    value,
                    line(")"),
                ]))
            }
            _ => {
                let target = self.compile_target(left)?;
                let (value, _) = self.compile_expr(right)?;
                Ok(seq(vec![target, text(" = "), value, line("")]))
            }
        }
    }

    /// An assignment whose value is used. Its statements are hoisted and it leaves behind a
    /// name holding the assigned value.
    fn compile_assign_expr(&mut self, left: &Expr, right: &Expr) -> Result<Compiled, CompileError> {
        let proxy = match left {
            Expr::Id(id) => {
                let name = mangle(id);
                let (value, _) = self.compile_expr(right)?;
                Fragment::Proxy {
                    body: vec![bind(&name, value)],
                    name,
                }
            }
            Expr::List(items) => {
                let name = self.fresh("rhs");
                let (value, _) = self.compile_expr(right)?;
                let scatter = self.compile_scatter(items, value, Some(&name))?;
                Fragment::Proxy {
                    name,
                    body: vec![scatter],
                }
            }
            _ => {
                let name = self.fresh("assign");
                let (value, _) = self.compile_expr(right)?;
                let statement = self.compile_assign_stmt(left, &Expr::Id(name.clone()))?;
                Fragment::Proxy {
                    body: vec![bind(&name, value), statement],
                    name,
                }
            }
        };
        Ok((proxy, HostPrecedence::Atom))
    }

    /// Lower a scattering assignment into pops from a working copy of the value. In expression
    /// position the value is also kept under `retained`, which is what the assignment yields.
    fn compile_scatter(
        &mut self,
        items: &[Arg],
        value: Fragment,
        retained: Option<&str>,
    ) -> Result<Fragment, CompileError> {
        let mut lines = vec![];
        let source = match retained {
            Some(name) => {
                lines.push(bind(name, value));
                text(name)
            }
            None => value,
        };
        let working = self.fresh("scatter");
        let mut bindings = vec![];
        for item in items {
            bindings.push(match item {
                Arg::Normal(Expr::Id(id)) => Binding::Required(mangle(id)),
                Arg::Splice(Expr::Id(id)) => Binding::Rest(mangle(id)),
                Arg::Optional { id, default } => Binding::Optional {
                    id: mangle(id),
                    default: match default {
                        Some(d) => Some(self.compile_expr(d)?.0),
                        None => None,
                    },
                },
                _ => return Err(self.invalid_assignment()),
            });
        }
        let plan = ScatterPlan::new(bindings);

        lines.push(seq(vec![
            text(format!("{working} = list(")),
            source,
            line(")"),
        ]));
        if self.compile_options.scatter_arity_checks {
            let maximum = match plan.maximum() {
                Some(m) => m.to_string(),
                None => "None".to_string(),
            };
            lines.push(line(format!(
                "moo.check_arity(len({working}), {}, {maximum})",
                plan.required()
            )));
        }
        let pop_or = |id: &str, pop: &str, default: Option<&Fragment>| {
            let mut out = vec![
                line(format!("if {working}:")),
                Fragment::Scope(vec![line(format!("{id} = {working}.{pop}"))]),
            ];
            if let Some(default) = default {
                out.push(line("else:"));
                out.push(Fragment::Scope(vec![bind(id, default.clone())]));
            }
            seq(out)
        };
        for step in plan.steps() {
            lines.push(match step {
                ScatterStep::PopFront(id) => line(format!("{id} = {working}.pop(0)")),
                ScatterStep::PopBack(id) => line(format!("{id} = {working}.pop()")),
                ScatterStep::PopFrontOr(id, default) => pop_or(id, "pop(0)", default),
                ScatterStep::PopBackOr(id, default) => pop_or(id, "pop()", default),
                ScatterStep::Rest(id) => line(format!("{id} = {working}")),
            });
        }
        Ok(seq(lines))
    }

    pub fn compile_expr(&mut self, expr: &Expr) -> Result<Compiled, CompileError> {
        let compiled = match expr {
            Expr::Int(i) => (text(format!("moo.Int({i})")), HostPrecedence::Atom),
            Expr::Float(f) => (text(format!("moo.Float({f:?})")), HostPrecedence::Atom),
            Expr::Str(s) => (
                text(format!("moo.String({})", quote_str(s))),
                HostPrecedence::Atom,
            ),
            Expr::Object(o) => (text(format!("moo.Object({o})")), HostPrecedence::Atom),
            Expr::Error(e) => (
                text(format!("moo.Error(\"{}\")", canonical_name(e))),
                HostPrecedence::Atom,
            ),
            Expr::Id(id) => (text(mangle(id)), HostPrecedence::Atom),
            Expr::Prop { location, property } => match property {
                Selector::Static(name) => {
                    let location = self.compile_operand(location)?;
                    (
                        seq(vec![location, text(format!(".{}", mangle_attr(name)))]),
                        HostPrecedence::Atom,
                    )
                }
                Selector::Dynamic(name) => {
                    let (location, _) = self.compile_expr(location)?;
                    let (name, _) = self.compile_expr(name)?;
                    (
                        seq(vec![text("getattr("), location, text(", "), name, text(")")]),
                        HostPrecedence::Atom,
                    )
                }
            },
            Expr::Verb {
                location,
                verb,
                args,
            } => {
                let callee = match verb {
                    Selector::Static(name) => {
                        let location = self.compile_operand(location)?;
                        seq(vec![location, text(format!(".{}", mangle_attr(name)))])
                    }
                    Selector::Dynamic(name) => {
                        let (location, _) = self.compile_expr(location)?;
                        let (name, _) = self.compile_expr(name)?;
                        seq(vec![text("getattr("), location, text(", "), name, text(")")])
                    }
                };
                self.compile_call(callee, args)?
            }
            Expr::Call { function, args } => {
                let callee = match find_builtin(function) {
                    Some(builtin) => format!("moo.{}", builtin.target),
                    None => mangle(function),
                };
                self.compile_call(text(callee), args)?
            }
            Expr::Paren(e) => {
                let (f, _) = self.compile_expr(e)?;
                (brace_if(true, f), HostPrecedence::Atom)
            }
            Expr::List(args) => self.compile_list(args)?,
            Expr::Index(base, index) => {
                let base = self.compile_operand(base)?;
                let start = self.compile_subscript_start(index)?;
                (
                    seq(vec![base, text("["), start, text("]")]),
                    HostPrecedence::Atom,
                )
            }
            Expr::Range { base, from, to } => {
                let base = self.compile_operand(base)?;
                let start = self.compile_subscript_start(from)?;
                let mut slice = vec![base, text("["), start, text(":")];
                if let Some(end) = self.compile_subscript_end(to)? {
                    slice.push(end);
                }
                slice.push(text("]"));
                (seq(slice), HostPrecedence::Atom)
            }
            Expr::Length => (text("0"), HostPrecedence::Atom),
            Expr::Unary(op, operand) => {
                let (f, p) = self.compile_expr(operand)?;
                match op {
                    UnaryOp::Not => (
                        seq(vec![text("not "), brace_if(p < HostPrecedence::Not, f)]),
                        HostPrecedence::Not,
                    ),
                    UnaryOp::Neg => (
                        seq(vec![text("-"), brace_if(p < HostPrecedence::Unary, f)]),
                        HostPrecedence::Unary,
                    ),
                }
            }
            Expr::Binary(op, left, right) => self.compile_binary(*op, left, right)?,
            Expr::And(left, right) => self.compile_logical(true, left, right)?,
            Expr::Or(left, right) => self.compile_logical(false, left, right)?,
            Expr::Cond {
                condition,
                consequence,
                alternative,
            } => self.compile_cond(condition, consequence, alternative)?,
            Expr::Catch {
                trye,
                codes,
                except,
            } => self.compile_catch(trye, codes, except.as_deref())?,
            Expr::Assign { left, right } => self.compile_assign_expr(left, right)?,
        };
        Ok(compiled)
    }

    pub fn compile_stmts(&mut self, stmts: &[Stmt]) -> Result<Vec<Fragment>, CompileError> {
        let mut out = vec![];
        for stmt in stmts {
            out.push(self.compile_stmt(stmt)?);
        }
        Ok(out)
    }

    /// The contents of a block. Python has no empty blocks, so one with nothing to run gets
    /// `pass`.
    fn compile_body(&mut self, stmts: &[Stmt]) -> Result<Vec<Fragment>, CompileError> {
        let mut body = self.compile_stmts(stmts)?;
        if !stmts.iter().any(|s| s.node.is_executable()) {
            body.push(line("pass"));
        }
        Ok(body)
    }

    fn compile_block(&mut self, stmts: &[Stmt]) -> Result<Fragment, CompileError> {
        Ok(Fragment::Scope(self.compile_body(stmts)?))
    }

    fn compile_if(
        &mut self,
        arms: &[CondArm],
        otherwise: Option<&[Stmt]>,
    ) -> Result<Fragment, CompileError> {
        let Some((first, rest)) = arms.split_first() else {
            return Ok(seq(self.compile_stmts(otherwise.unwrap_or_default())?));
        };
        let (condition, _) = self.compile_expr(&first.condition)?;
        let mut out = vec![
            seq(vec![text("if "), condition, line(":")]),
            self.compile_block(&first.statements)?,
        ];
        self.compile_else(rest, otherwise, &mut out)?;
        Ok(seq(out))
    }

    fn compile_else(
        &mut self,
        arms: &[CondArm],
        otherwise: Option<&[Stmt]>,
        out: &mut Vec<Fragment>,
    ) -> Result<(), CompileError> {
        let Some((arm, rest)) = arms.split_first() else {
            if let Some(otherwise) = otherwise {
                out.push(line("else:"));
                out.push(self.compile_block(otherwise)?);
            }
            return Ok(());
        };
        let (condition, _) = self.compile_expr(&arm.condition)?;
        if condition.has_proxy() {
            // The hoisted statements need somewhere to go between the arms.
            let mut nested = vec![
                seq(vec![text("if "), condition, line(":")]),
                self.compile_block(&arm.statements)?,
            ];
            self.compile_else(rest, otherwise, &mut nested)?;
            out.push(line("else:"));
            out.push(Fragment::Scope(nested));
            return Ok(());
        }
        out.push(seq(vec![text("elif "), condition, line(":")]));
        out.push(self.compile_block(&arm.statements)?);
        self.compile_else(rest, otherwise, out)
    }

    /// The body of a loop, with the loop on the stack while it compiles.
    fn compile_loop_body(
        &mut self,
        label: Option<&str>,
        prologue: Vec<Fragment>,
        body: &[Stmt],
    ) -> Result<(Vec<Fragment>, Loop), CompileError> {
        self.loops.push(LoopScope::Loop(Loop::new(label)));
        let compiled = self.compile_body(body);
        let frame = match self.loops.pop() {
            Some(LoopScope::Loop(frame)) => frame,
            _ => Loop::new(label),
        };
        let mut inner = compiled?;
        if frame.signalled_continue {
            inner = self.signal_handler(LoopExit::Continue, &frame, inner);
        }
        let mut lines = prologue;
        lines.extend(inner);
        Ok((lines, frame))
    }

    /// Wrap `guarded` so that a signal addressed to `frame` is absorbed and any other propagates.
    fn signal_handler(
        &mut self,
        exit: LoopExit,
        frame: &Loop,
        guarded: Vec<Fragment>,
    ) -> Vec<Fragment> {
        let signal = self.fresh("signal");
        let label = quote_str(frame.label.as_deref().unwrap_or_default());
        vec![
            line("try:"),
            Fragment::Scope(guarded),
            line(format!("except {} as {signal}:", exit.signal())),
            Fragment::Scope(vec![
                line(format!("if {signal}.label != {label}:")),
                Fragment::Scope(vec![line("raise")]),
            ]),
        ]
    }

    fn finish_loop(&mut self, header: Fragment, body: Vec<Fragment>, frame: &Loop) -> Fragment {
        let looped = vec![header, Fragment::Scope(body)];
        if frame.signalled_break {
            return seq(self.signal_handler(LoopExit::Break, frame, looped));
        }
        seq(looped)
    }

    fn compile_loop_exit(
        &mut self,
        exit: LoopExit,
        label: Option<&str>,
    ) -> Result<Fragment, CompileError> {
        let visible: Vec<&mut Loop> = self
            .loops
            .iter_mut()
            .rev()
            .map_while(|scope| match scope {
                LoopScope::Loop(l) => Some(l),
                LoopScope::Barrier => None,
            })
            .collect();
        if visible.is_empty() {
            return Err(CompileError::LoopControlOutsideLoop(
                exit.keyword().to_string(),
            ));
        }
        let Some(label) = label else {
            return Ok(line(exit.keyword()));
        };
        let Some((depth, target)) = visible.into_iter().enumerate().find(|(_, l)| {
            l.label
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(label))
        }) else {
            return Err(CompileError::UnknownLoopLabel(label.to_string()));
        };
        if depth == 0 {
            return Ok(line(exit.keyword()));
        }
        match exit {
            LoopExit::Break => target.signalled_break = true,
            LoopExit::Continue => target.signalled_continue = true,
        }
        let name = quote_str(target.label.as_deref().unwrap_or_default());
        Ok(line(format!("raise {}({name})", exit.signal())))
    }

    fn compile_try_except(
        &mut self,
        body: &[Stmt],
        excepts: &[ExceptArm],
    ) -> Result<Fragment, CompileError> {
        let mut prelude = vec![];
        let body = self.compile_block(body)?;
        let mut handlers = vec![];
        for arm in excepts {
            let categories = self.compile_handler_categories(&arm.codes, &mut prelude)?;
            let exception = self.fresh("exc");
            handlers.push(seq(vec![
                text("except "),
                categories,
                line(format!(" as {exception}:")),
            ]));
            let mut block = vec![];
            if let Some(id) = &arm.id {
                block.push(line(format!(
                    "{} = moo.error_info({exception})",
                    mangle(id)
                )));
            }
            block.extend(self.compile_stmts(&arm.statements)?);
            if arm.id.is_none() && !arm.statements.iter().any(|s| s.node.is_executable()) {
                block.push(line("pass"));
            }
            handlers.push(Fragment::Scope(block));
        }
        let mut out = prelude;
        out.push(line("try:"));
        out.push(body);
        out.extend(handlers);
        Ok(seq(out))
    }

    fn compile_verb_def(
        &mut self,
        name: &str,
        params: &[Param],
        body: &[Stmt],
    ) -> Result<Fragment, CompileError> {
        let mut declared: Vec<String> = params
            .iter()
            .map(|p| match p {
                Param::Normal(n) => mangle(n),
                Param::Splice(n) => format!("*{}", mangle(n)),
            })
            .collect();
        if !params.iter().any(|p| matches!(p, Param::Splice(_))) {
            let taken = params
                .iter()
                .any(|p| matches!(p, Param::Normal(n) if n == "args"));
            declared.push(if taken { "*__args" } else { "*args" }.to_string());
        }
        self.loops.push(LoopScope::Barrier);
        let body = self.compile_block(body);
        self.loops.pop();
        Ok(seq(vec![
            line(format!("def {}({}):", mangle(name), declared.iter().join(", "))),
            body?,
        ]))
    }

    pub fn compile_stmt(&mut self, stmt: &Stmt) -> Result<Fragment, CompileError> {
        self.line = stmt.line;
        let fragment = match &stmt.node {
            StmtNode::Cond { arms, otherwise } => self.compile_if(arms, otherwise.as_deref())?,
            StmtNode::ForList { id, expr, body } => {
                let (sequence, _) = self.compile_expr(expr)?;
                let header = seq(vec![
                    text(format!("for {} in ", mangle(id))),
                    sequence,
                    line(":"),
                ]);
                let (body, frame) = self.compile_loop_body(Some(id), vec![], body)?;
                self.finish_loop(header, body, &frame)
            }
            StmtNode::ForRange { id, from, to, body } => {
                let (from, _) = self.compile_expr(from)?;
                let (to, _) = self.compile_expr(to)?;
                let header = seq(vec![
                    text(format!("for {} in moo.range(", mangle(id))),
                    from,
                    text(", "),
                    to,
                    line("):"),
                ]);
                let (body, frame) = self.compile_loop_body(Some(id), vec![], body)?;
                self.finish_loop(header, body, &frame)
            }
            StmtNode::While {
                label,
                condition,
                body,
            } => {
                let (condition, _) = self.compile_expr(condition)?;
                let (header, prologue) = if condition.has_proxy() {
                    // The condition's statements have to run on every iteration.
                    let check = vec![
                        seq(vec![text("if not ("), condition, line("):")]),
                        Fragment::Scope(vec![line("break")]),
                    ];
                    (line("while True:"), check)
                } else {
                    (seq(vec![text("while "), condition, line(":")]), vec![])
                };
                let (body, frame) = self.compile_loop_body(label.as_deref(), prologue, body)?;
                self.finish_loop(header, body, &frame)
            }
            StmtNode::Fork { label, delay, body } => {
                let (delay, _) = self.compile_expr(delay)?;
                let name = self.fresh("fork");
                self.loops.push(LoopScope::Barrier);
                let block = self.compile_block(body);
                self.loops.pop();
                let call = match label {
                    Some(label) => seq(vec![
                        text(format!("{} = moo.fork(", mangle(label))),
                        delay,
                        line(format!(", {name}, {})", quote_str(label))),
                    ]),
                    None => seq(vec![
                        text("moo.fork("),
                        delay,
                        line(format!(", {name})")),
                    ]),
                };
                // Defaults are evaluated here, which copies the variables at fork time.
                let params = captured_variables(body)
                    .iter()
                    .map(|v| {
                        let v = mangle(v);
                        format!("{v}=locals().get({})", quote_str(&v))
                    })
                    .join(", ");
                seq(vec![line(format!("def {name}({params}):")), block?, call])
            }
            StmtNode::TryExcept { body, excepts } => self.compile_try_except(body, excepts)?,
            StmtNode::TryFinally { body, handler } => seq(vec![
                line("try:"),
                self.compile_block(body)?,
                line("finally:"),
                self.compile_block(handler)?,
            ]),
            StmtNode::Break { label } => self.compile_loop_exit(LoopExit::Break, label.as_deref())?,
            StmtNode::Continue { label } => {
                self.compile_loop_exit(LoopExit::Continue, label.as_deref())?
            }
            StmtNode::Return(None) => line("return"),
            StmtNode::Return(Some(e)) => {
                let (value, _) = self.compile_expr(e)?;
                seq(vec![text("return "), value, line("")])
            }
            StmtNode::Verb { name, params, body } => self.compile_verb_def(name, params, body)?,
            StmtNode::Comment(comment) => line(format!("# {}", comment.replace('\n', " "))),
            StmtNode::Noop => seq(vec![]),
            StmtNode::Expr(Expr::Assign { left, right }) => self.compile_assign_stmt(left, right)?,
            StmtNode::Expr(e) => {
                let (f, _) = self.compile_expr(e)?;
                seq(vec![f, line("")])
            }
        };
        Ok(fragment)
    }
}

fn do_compile(parse: Parse, compile_options: CompileOptions) -> Result<Fragment, CompileError> {
    let mut cg_state = CodegenState::new(compile_options);
    let stmts = cg_state.compile_stmts(&parse.stmts)?;
    Ok(seq(stmts))
}

/// Compile already-parsed statements into their fragment tree.
pub fn compile_tree(parse: Parse, options: CompileOptions) -> Result<Fragment, CompileError> {
    do_compile(parse, options)
}

/// Compile a verb body to Python source. Blank lines are dropped from the result.
pub fn compile(program: &str, options: CompileOptions) -> Result<String, CompileError> {
    let parse = parse_program(program, options.clone())?;
    let fragment = do_compile(parse, options)?;
    Ok(fragment
        .render()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .join("\n"))
}
