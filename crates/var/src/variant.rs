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

use crate::var::Var;
use crate::{ErrorCode, Obj};
use std::fmt::{Debug, Formatter};
use unicase::UniCase;

/// Our series of types
#[derive(Clone)]
pub enum Variant {
    None,
    Obj(Obj),
    Int(i64),
    Float(f64),
    List(Vec<Var>),
    Str(String),
    Err(ErrorCode),
}

impl Debug for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::None => write!(f, "None"),
            Variant::Obj(o) => write!(f, "Object({o})"),
            Variant::Int(i) => write!(f, "Integer({i})"),
            Variant::Float(fl) => write!(f, "Float({fl})"),
            Variant::List(l) => write!(f, "List([size = {}, items = {:?}])", l.len(), l),
            Variant::Str(s) => write!(f, "String({s:?})"),
            Variant::Err(e) => write!(f, "Error({e})"),
        }
    }
}

impl PartialEq<Self> for Variant {
    fn eq(&self, other: &Self) -> bool {
        // If the types are different, they're not equal. Strings compare without case.
        match (self, other) {
            (Variant::Str(s), Variant::Str(o)) => UniCase::new(s) == UniCase::new(o),
            (Variant::Int(s), Variant::Int(o)) => s == o,
            (Variant::Float(s), Variant::Float(o)) => s == o,
            (Variant::Obj(s), Variant::Obj(o)) => s == o,
            (Variant::List(s), Variant::List(o)) => s == o,
            (Variant::Err(s), Variant::Err(o)) => s == o,
            (Variant::None, Variant::None) => true,
            _ => false,
        }
    }
}

impl Variant {
    /// Equality that does not fold string case. Nested lists are compared the same way.
    pub fn eq_case_sensitive(&self, other: &Self) -> bool {
        match (self, other) {
            (Variant::Str(s), Variant::Str(o)) => s == o,
            (Variant::List(s), Variant::List(o)) => {
                s.len() == o.len()
                    && s
                        .iter()
                        .zip(o.iter())
                        .all(|(l, r)| l.variant().eq_case_sensitive(r.variant()))
            }
            _ => self == other,
        }
    }
}
