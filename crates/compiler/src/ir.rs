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

//! The intermediate form produced by codegen and the renderer that turns it into source text.
//!
//! A `Proxy` stands for a value that can only be computed by statements (a scatter, a catch
//! expression, an assignment used as a value). Wherever it appears inside an expression, the
//! renderer moves its body to just before the line being built and leaves its name behind.
//! A `Scope` is a block one indentation level deeper than its container.

pub const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    /// Grouping only; dissolved by `flatten`.
    Seq(Vec<Fragment>),
    Scope(Vec<Fragment>),
    Proxy { name: String, body: Vec<Fragment> },
}

impl Fragment {
    pub fn text(s: impl Into<String>) -> Self {
        Fragment::Text(s.into())
    }

    /// A run of text terminated by a newline.
    pub fn line(s: impl Into<String>) -> Self {
        let mut s = s.into();
        s.push('\n');
        Fragment::Text(s)
    }

    pub fn seq(fragments: Vec<Fragment>) -> Self {
        Fragment::Seq(fragments)
    }

    pub fn has_proxy(&self) -> bool {
        match self {
            Fragment::Text(_) => false,
            Fragment::Proxy { .. } => true,
            Fragment::Seq(children) | Fragment::Scope(children) => {
                children.iter().any(Fragment::has_proxy)
            }
        }
    }

    /// Render as a single string of text, without any layout. Only meaningful for fragments
    /// made of text alone, such as those checked with `has_proxy`.
    pub fn render_inline(&self) -> String {
        let mut out = String::new();
        self.push_inline(&mut out);
        out
    }

    fn push_inline(&self, out: &mut String) {
        match self {
            Fragment::Text(t) => out.push_str(t),
            Fragment::Seq(children) | Fragment::Scope(children) => {
                for c in children {
                    c.push_inline(out);
                }
            }
            Fragment::Proxy { name, .. } => out.push_str(name),
        }
    }

    /// Full two-pass rendering: flatten, then lay out lines.
    pub fn render(&self) -> String {
        let mut lines = generate(&flatten(std::slice::from_ref(self)));
        drop_trailing_blank(&mut lines);
        lines.join("\n")
    }
}

/// A fragment tree with the groupings removed and adjacent text merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flat {
    Text(String),
    Scope(Vec<Flat>),
    Proxy { name: String, body: Vec<Flat> },
}

pub fn flatten(fragments: &[Fragment]) -> Vec<Flat> {
    let mut out = vec![];
    for f in fragments {
        flatten_into(f, &mut out);
    }
    out
}

fn flatten_into(fragment: &Fragment, out: &mut Vec<Flat>) {
    match fragment {
        Fragment::Text(t) => {
            if t.is_empty() {
                return;
            }
            if let Some(Flat::Text(last)) = out.last_mut() {
                last.push_str(t);
            } else {
                out.push(Flat::Text(t.clone()));
            }
        }
        Fragment::Seq(children) => {
            for c in children {
                flatten_into(c, out);
            }
        }
        Fragment::Scope(children) => out.push(Flat::Scope(flatten(children))),
        Fragment::Proxy { name, body } => out.push(Flat::Proxy {
            name: name.clone(),
            body: flatten(body),
        }),
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn drop_trailing_blank(lines: &mut Vec<String>) {
    if lines.last().is_some_and(|l| is_blank(l)) {
        lines.pop();
    }
}

/// Lay out a flat sequence as lines. The final entry is always the line under construction.
pub fn generate(flat: &[Flat]) -> Vec<String> {
    let mut lines = vec![String::new()];
    for item in flat {
        match item {
            Flat::Text(t) => {
                let mut segments = t.split('\n');
                if let (Some(first), Some(partial)) = (segments.next(), lines.last_mut()) {
                    partial.push_str(first);
                }
                lines.extend(segments.map(str::to_string));
            }
            Flat::Scope(children) => {
                let mut block = generate(children);
                drop_trailing_blank(&mut block);
                drop_trailing_blank(&mut lines);
                lines.extend(block.into_iter().map(|l| {
                    if is_blank(&l) {
                        String::new()
                    } else {
                        format!("{INDENT}{l}")
                    }
                }));
                lines.push(String::new());
            }
            Flat::Proxy { name, body } => {
                let mut hoisted = generate(body);
                drop_trailing_blank(&mut hoisted);
                let mut partial = lines.pop().unwrap_or_default();
                lines.extend(hoisted);
                partial.push_str(name);
                lines.push(partial);
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use unindent::unindent;

    fn proxy(name: &str, body: Vec<Fragment>) -> Fragment {
        Fragment::Proxy {
            name: name.to_string(),
            body,
        }
    }

    #[test]
    fn test_flatten_merges_text_and_dissolves_seq() {
        let f = Fragment::seq(vec![
            Fragment::text("a"),
            Fragment::seq(vec![Fragment::text("b"), Fragment::text("")]),
            Fragment::Scope(vec![Fragment::text("c"), Fragment::text("d")]),
            Fragment::text("e"),
        ]);
        assert_eq!(
            flatten(&[f]),
            vec![
                Flat::Text("ab".into()),
                Flat::Scope(vec![Flat::Text("cd".into())]),
                Flat::Text("e".into()),
            ]
        );
    }

    #[test]
    fn test_scope_indents() {
        let f = Fragment::seq(vec![
            Fragment::text("if x:"),
            Fragment::Scope(vec![Fragment::line("y = 1"), Fragment::line("z = 2")]),
            Fragment::line("w = 3"),
        ]);
        let expected = unindent(
            "
            if x:
                y = 1
                z = 2
            w = 3",
        );
        assert_eq!(f.render(), expected);
    }

    #[test]
    fn test_proxy_hoists_before_current_line() {
        let f = Fragment::seq(vec![
            Fragment::text("x = f("),
            proxy("__a1", vec![Fragment::line("__a1 = 5")]),
            Fragment::line(")"),
        ]);
        assert_eq!(f.render(), "__a1 = 5\nx = f(__a1)");
    }

    #[test]
    fn test_nested_proxy_in_scope_in_proxy() {
        let inner = proxy("__b2", vec![Fragment::line("__b2 = g()")]);
        let outer = proxy(
            "__a1",
            vec![
                Fragment::text("try:"),
                Fragment::Scope(vec![
                    Fragment::text("__a1 = "),
                    inner,
                    Fragment::line(""),
                ]),
                Fragment::text("except Exception:"),
                Fragment::Scope(vec![Fragment::line("__a1 = None")]),
            ],
        );
        let f = Fragment::seq(vec![Fragment::text("return "), outer, Fragment::line("")]);
        let expected = unindent(
            "
                try:
                    __b2 = g()
                    __a1 = __b2
                except Exception:
                    __a1 = None
                return __a1",
        );
        assert_eq!(f.render(), expected);
    }

    #[test]
    fn test_render_is_repeatable() {
        let f = Fragment::seq(vec![
            Fragment::text("y = "),
            proxy("x", vec![Fragment::line("x = 1")]),
            Fragment::line(""),
        ]);
        assert_eq!(f.render(), f.render());
        assert!(f.has_proxy());
        assert_eq!(f.render_inline(), "y = x\n");
    }
}
