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

use transmoo_var::ErrorCode;

/// What `except` catches for the `ANY` wildcard.
pub const ANY_CATEGORY: &str = "Exception";

/// The Python exception category raised by the runtime for a MOO error. Errors with a close
/// builtin equivalent use it; the rest have their own classes in the runtime module.
pub fn category(code: ErrorCode) -> String {
    let builtin = match code {
        ErrorCode::E_TYPE => "TypeError",
        ErrorCode::E_RANGE => "IndexError",
        ErrorCode::E_DIV => "ZeroDivisionError",
        ErrorCode::E_PROPNF | ErrorCode::E_VERBNF => "AttributeError",
        ErrorCode::E_VARNF => "NameError",
        ErrorCode::E_INVARG => "ValueError",
        ErrorCode::E_FLOAT => "ArithmeticError",
        ErrorCode::E_MAXREC => "RecursionError",
        _ => return format!("moo.{code}"),
    };
    builtin.to_string()
}

/// Look up the category for an `E_` name as written in source. `None` for names outside the
/// LambdaMOO error set.
pub fn category_for_name(name: &str) -> Option<String> {
    ErrorCode::parse_str(name).map(category)
}

/// The canonical spelling of an error name, for use as a value.
pub fn canonical_name(name: &str) -> String {
    match ErrorCode::parse_str(name) {
        Some(code) => code.to_string(),
        None => name.to_string(),
    }
}
