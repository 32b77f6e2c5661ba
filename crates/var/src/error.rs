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

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, FromRepr};

/// The LambdaMOO error set. The discriminants are the integer codes used in textdumps.
#[repr(u8)]
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Display,
    EnumString,
    EnumIter,
    FromRepr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[allow(non_camel_case_types)]
pub enum ErrorCode {
    E_NONE = 0,
    E_TYPE = 1,
    E_DIV = 2,
    E_PERM = 3,
    E_PROPNF = 4,
    E_VERBNF = 5,
    E_VARNF = 6,
    E_INVIND = 7,
    E_RECMOVE = 8,
    E_MAXREC = 9,
    E_RANGE = 10,
    E_ARGS = 11,
    E_NACC = 12,
    E_INVARG = 13,
    E_QUOTA = 14,
    E_FLOAT = 15,
}

impl ErrorCode {
    /// Look up an error by its `E_` name. Unlike LambdaMOO identifiers in general, there is no
    /// custom-error fallback: anything outside the builtin set is `None`.
    pub fn parse_str(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::E_NONE => "No error",
            ErrorCode::E_TYPE => "Type mismatch",
            ErrorCode::E_DIV => "Division by zero",
            ErrorCode::E_PERM => "Permission denied",
            ErrorCode::E_PROPNF => "Property not found",
            ErrorCode::E_VERBNF => "Verb not found",
            ErrorCode::E_VARNF => "Variable not found",
            ErrorCode::E_INVIND => "Invalid indirection",
            ErrorCode::E_RECMOVE => "Recursive move",
            ErrorCode::E_MAXREC => "Too many verb calls",
            ErrorCode::E_RANGE => "Range error",
            ErrorCode::E_ARGS => "Incorrect number of arguments",
            ErrorCode::E_NACC => "Move refused by destination",
            ErrorCode::E_INVARG => "Invalid argument",
            ErrorCode::E_QUOTA => "Resource limit exceeded",
            ErrorCode::E_FLOAT => "Floating-point arithmetic error",
        }
    }
}

impl std::error::Error for ErrorCode {}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use super::ErrorCode::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_str() {
        assert_eq!(ErrorCode::parse_str("E_TYPE"), Some(E_TYPE));
        assert_eq!(ErrorCode::parse_str("e_range"), Some(E_RANGE));
        assert_eq!(ErrorCode::parse_str("E_FILE"), None);
    }

    #[test]
    fn test_repr_matches_textdump_codes() {
        assert_eq!(ErrorCode::from_repr(2), Some(E_DIV));
        assert_eq!(ErrorCode::from_repr(15), Some(E_FLOAT));
        assert_eq!(ErrorCode::from_repr(16), None);
        assert_eq!(ErrorCode::iter().count(), 16);
    }

    #[test]
    fn test_display_is_name() {
        assert_eq!(E_PROPNF.to_string(), "E_PROPNF");
        assert_eq!(E_DIV.message(), "Division by zero");
    }
}
