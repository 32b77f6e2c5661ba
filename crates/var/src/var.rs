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

use crate::variant::Variant;
use crate::{ErrorCode, Obj, VarType};
use std::fmt::{Debug, Display, Formatter};
use unicase::UniCase;

#[derive(Clone, PartialEq)]
pub struct Var(Variant);

impl Debug for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Var {
    pub fn from_variant(variant: Variant) -> Self {
        Var(variant)
    }

    pub fn variant(&self) -> &Variant {
        &self.0
    }

    pub fn type_code(&self) -> VarType {
        match self.variant() {
            Variant::Int(_) => VarType::TYPE_INT,
            Variant::Obj(_) => VarType::TYPE_OBJ,
            Variant::Str(_) => VarType::TYPE_STR,
            Variant::Err(_) => VarType::TYPE_ERR,
            Variant::List(_) => VarType::TYPE_LIST,
            Variant::None => VarType::TYPE_NONE,
            Variant::Float(_) => VarType::TYPE_FLOAT,
        }
    }

    /// MOO truthiness: non-zero numbers and non-empty strings and lists are true. Everything
    /// else, objects and errors included, is false.
    pub fn is_true(&self) -> bool {
        match self.variant() {
            Variant::Int(i) => *i != 0,
            Variant::Float(f) => *f != 0.0,
            Variant::Str(s) => !s.is_empty(),
            Variant::List(l) => !l.is_empty(),
            Variant::None | Variant::Obj(_) | Variant::Err(_) => false,
        }
    }

    pub fn len(&self) -> Result<usize, ErrorCode> {
        match self.variant() {
            Variant::Str(s) => Ok(s.chars().count()),
            Variant::List(l) => Ok(l.len()),
            _ => Err(ErrorCode::E_TYPE),
        }
    }

    pub fn is_empty(&self) -> Result<bool, ErrorCode> {
        Ok(self.len()? == 0)
    }

    /// Offset of `value` within this sequence. For lists this is the first element equal to
    /// `value`; for strings it is the first occurrence of `value` as a substring, in characters.
    pub fn index_in(&self, value: &Var, case_sensitive: bool) -> Result<Option<usize>, ErrorCode> {
        match (self.variant(), value.variant()) {
            (Variant::List(l), _) => Ok(l.iter().position(|v| {
                if case_sensitive {
                    v.variant().eq_case_sensitive(value.variant())
                } else {
                    v == value
                }
            })),
            (Variant::Str(haystack), Variant::Str(needle)) => {
                let found = if case_sensitive {
                    haystack.find(needle.as_str())
                } else {
                    haystack.to_lowercase().find(&needle.to_lowercase())
                };
                Ok(found.map(|byte_offset| haystack[..byte_offset].chars().count()))
            }
            (Variant::Str(_), _) => Err(ErrorCode::E_TYPE),
            _ => Err(ErrorCode::E_TYPE),
        }
    }

    /// The 1-based position that `x in y` yields: the first match under MOO equality, or 0.
    pub fn position_of(&self, value: &Var) -> Result<Var, ErrorCode> {
        let position = self.index_in(value, false)?;
        Ok(v_int(position.map(|p| p as i64 + 1).unwrap_or(0)))
    }

    /// 1-based element access, as MOO indexing sees it.
    pub fn index(&self, index: i64) -> Result<Var, ErrorCode> {
        let offset = usize::try_from(index - 1).map_err(|_| ErrorCode::E_RANGE)?;
        match self.variant() {
            Variant::List(l) => l.get(offset).cloned().ok_or(ErrorCode::E_RANGE),
            Variant::Str(s) => s
                .chars()
                .nth(offset)
                .map(|c| v_string(c.to_string()))
                .ok_or(ErrorCode::E_RANGE),
            _ => Err(ErrorCode::E_TYPE),
        }
    }
}

impl Display for Var {
    /// The value as a MOO literal.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.variant() {
            Variant::None => write!(f, "None"),
            Variant::Int(i) => write!(f, "{i}"),
            Variant::Float(fl) => write!(f, "{fl:?}"),
            Variant::Obj(o) => write!(f, "{o}"),
            Variant::Err(e) => write!(f, "{e}"),
            Variant::Str(s) => {
                let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\"")
            }
            Variant::List(l) => {
                write!(f, "{{")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

pub fn v_int(i: i64) -> Var {
    Var(Variant::Int(i))
}

pub fn v_float(f: f64) -> Var {
    Var(Variant::Float(f))
}

pub fn v_str(s: &str) -> Var {
    Var(Variant::Str(s.to_string()))
}

pub fn v_string(s: String) -> Var {
    Var(Variant::Str(s))
}

pub fn v_obj(o: Obj) -> Var {
    Var(Variant::Obj(o))
}

pub fn v_objid(id: i32) -> Var {
    v_obj(Obj::mk_id(id))
}

pub fn v_err(e: ErrorCode) -> Var {
    Var(Variant::Err(e))
}

pub fn v_list(values: &[Var]) -> Var {
    Var(Variant::List(values.to_vec()))
}

pub fn v_list_iter<IT: IntoIterator<Item = Var>>(values: IT) -> Var {
    Var(Variant::List(values.into_iter().collect()))
}

pub fn v_empty_list() -> Var {
    Var(Variant::List(vec![]))
}

pub fn v_none() -> Var {
    Var(Variant::None)
}

/// Case-insensitive string comparison as MOO does it, exposed for callers that only have `&str`.
pub fn moo_str_eq(l: &str, r: &str) -> bool {
    UniCase::new(l) == UniCase::new(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode::{E_RANGE, E_TYPE};
    use test_case::test_case;

    #[test_case(v_int(0), false; "zero")]
    #[test_case(v_int(-3), true; "negative int")]
    #[test_case(v_float(0.0), false; "zero float")]
    #[test_case(v_str(""), false; "empty string")]
    #[test_case(v_str("x"), true; "string")]
    #[test_case(v_empty_list(), false; "empty list")]
    #[test_case(v_list(&[v_int(0)]), true; "list")]
    #[test_case(v_objid(5), false; "object")]
    #[test_case(v_err(E_TYPE), false; "error")]
    fn test_truthiness(v: Var, expected: bool) {
        assert_eq!(v.is_true(), expected);
    }

    #[test]
    fn test_case_insensitive_equality() {
        assert_eq!(v_str("Bar"), v_str("bar"));
        assert_ne!(v_int(1), v_float(1.0));
        assert_eq!(
            v_list(&[v_str("A"), v_int(1)]),
            v_list(&[v_str("a"), v_int(1)])
        );
        assert!(!v_str("A").variant().eq_case_sensitive(v_str("a").variant()));
        assert!(moo_str_eq("FOO", "foo"));
    }

    #[test]
    fn test_position_in_list() {
        let haystack = v_list(&[v_str("Foo"), v_str("Bar"), v_str("Baz")]);
        assert_eq!(haystack.position_of(&v_str("bar")), Ok(v_int(2)));
        assert_eq!(haystack.position_of(&v_str("quux")), Ok(v_int(0)));
        assert_eq!(
            haystack.index_in(&v_str("bar"), true),
            Ok(None),
            "case sensitive lookup should miss"
        );
    }

    #[test]
    fn test_position_in_string() {
        assert_eq!(v_str("foobar").position_of(&v_str("BAR")), Ok(v_int(4)));
        assert_eq!(v_str("foobar").position_of(&v_str("x")), Ok(v_int(0)));
        assert_eq!(v_str("foobar").position_of(&v_int(1)), Err(E_TYPE));
        assert_eq!(v_int(5).position_of(&v_int(1)), Err(E_TYPE));
    }

    #[test]
    fn test_one_based_index() {
        let l = v_list(&[v_int(1), v_int(2), v_int(3)]);
        assert_eq!(l.index(1), Ok(v_int(1)));
        assert_eq!(l.index(3), Ok(v_int(3)));
        assert_eq!(l.index(0), Err(E_RANGE));
        assert_eq!(l.index(4), Err(E_RANGE));
        assert_eq!(v_str("fob").index(2), Ok(v_str("o")));
        assert_eq!(l.len(), Ok(3));
    }

    #[test]
    fn test_literal_display() {
        let v = v_list(&[v_int(1), v_str("a \"q\""), v_objid(-1), v_err(E_TYPE)]);
        assert_eq!(v.to_string(), r#"{1, "a \"q\"", #-1, E_TYPE}"#);
        assert_eq!(v_float(2.0).to_string(), "2.0");
    }
}
