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

use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    /// Python's reserved words, plus the soft keywords that can't safely be rebound.
    static ref HOST_KEYWORDS: HashSet<&'static str> = [
        "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
        "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
        "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
        "try", "while", "with", "yield",
    ]
    .into_iter()
    .collect();

    /// Names that generated code refers to unqualified. A MOO variable must not shadow them.
    static ref HOST_GLOBALS: HashSet<&'static str> = [
        "moo", "list", "len", "getattr", "setattr", "locals", "Exception", "ArithmeticError",
        "AttributeError", "IndexError", "NameError", "RecursionError", "TypeError", "ValueError",
        "ZeroDivisionError", "__args",
    ]
    .into_iter()
    .collect();
}

/// Prefixes of the numbered temporaries codegen introduces, as in `__scatter3`.
const TEMPORARY_PREFIXES: &[&str] = &[
    "and", "assign", "catch", "codes", "cond", "exc", "fork", "or", "rhs", "scatter", "signal",
];

pub fn is_host_keyword(name: &str) -> bool {
    HOST_KEYWORDS.contains(name)
}

fn is_temporary(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("__") else {
        return false;
    };
    let prefix = rest.trim_end_matches(|c: char| c.is_ascii_digit());
    prefix.len() < rest.len() && TEMPORARY_PREFIXES.contains(&prefix)
}

/// A MOO variable or function name that is usable as a Python identifier. Names that collide
/// with a Python keyword, a global the generated code calls, or a codegen temporary get a
/// trailing underscore.
pub fn mangle(name: &str) -> String {
    if is_host_keyword(name) || HOST_GLOBALS.contains(name) || is_temporary(name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// A property or verb name, used after `.`. Only keywords are a problem there.
pub fn mangle_attr(name: &str) -> String {
    if is_host_keyword(name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mangle() {
        assert_eq!(mangle("from"), "from_");
        assert_eq!(mangle("None"), "None_");
        assert_eq!(mangle("pass"), "pass_");
        assert_eq!(mangle("player"), "player");
        // Keywords are case-sensitive in the host language.
        assert_eq!(mangle("From"), "From");
    }

    #[test]
    fn test_mangle_host_globals() {
        for name in ["moo", "list", "len", "getattr", "setattr", "locals", "TypeError"] {
            assert_eq!(mangle(name), format!("{name}_"));
            assert_eq!(mangle_attr(name), name);
        }
        assert_eq!(mangle("List"), "List");
    }

    #[test]
    fn test_mangle_temporaries() {
        assert_eq!(mangle("__scatter1"), "__scatter1_");
        assert_eq!(mangle("__catch12"), "__catch12_");
        assert_eq!(mangle("__args"), "__args_");
        assert_eq!(mangle("__scatter"), "__scatter");
        assert_eq!(mangle("__foo1"), "__foo1");
        assert_eq!(mangle_attr("from"), "from_");
    }
}
