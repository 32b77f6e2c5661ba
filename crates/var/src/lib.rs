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

mod error;
mod obj;
mod scalar;
#[allow(clippy::module_inception)]
mod var;
mod variant;

pub use error::{ErrorCode, ErrorCode::*};
pub use obj::{NOTHING, Obj, SYSTEM_OBJECT};
use strum::FromRepr;
pub use var::{
    Var, moo_str_eq, v_empty_list, v_err, v_float, v_int, v_list, v_list_iter, v_none, v_obj,
    v_objid, v_str, v_string,
};
pub use variant::Variant;

/// Integer encoding of values as represented in a `LambdaMOO` textdump, and by `bf_typeof`
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, FromRepr)]
#[allow(non_camel_case_types)]
pub enum VarType {
    TYPE_INT = 0,
    TYPE_OBJ = 1,
    TYPE_STR = 2,
    TYPE_ERR = 3,
    TYPE_LIST = 4,
    TYPE_CLEAR = 5, // property values only; "inherit from parent"
    TYPE_NONE = 6,  // in uninitialized MOO variables
    TYPE_CATCH = 7, // never appears in stored values
    TYPE_FINALLY = 8,
    TYPE_FLOAT = 9,
}

impl VarType {
    pub fn to_literal(&self) -> &str {
        match self {
            VarType::TYPE_INT => "INT",
            VarType::TYPE_OBJ => "OBJ",
            VarType::TYPE_FLOAT => "FLOAT",
            VarType::TYPE_STR => "STR",
            VarType::TYPE_ERR => "ERR",
            VarType::TYPE_LIST => "LIST",
            _ => "INVALID-TYPE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        assert_eq!(VarType::from_repr(5), Some(VarType::TYPE_CLEAR));
        assert_eq!(VarType::from_repr(9), Some(VarType::TYPE_FLOAT));
        assert_eq!(VarType::from_repr(10), None);
        assert_eq!(v_objid(3).type_code(), VarType::TYPE_OBJ);
        assert_eq!(v_list(&[]).type_code().to_literal(), "LIST");
    }
}
