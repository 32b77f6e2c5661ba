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

//! MOO arithmetic. Integer division and remainder truncate toward zero, mixed int/float operands
//! promote to float, and anything non-numeric is `E_TYPE`.

use crate::ErrorCode;
use crate::ErrorCode::{E_DIV, E_FLOAT, E_INVARG, E_TYPE};
use crate::var::{Var, v_float, v_int, v_string};
use crate::variant::Variant;
use paste::paste;
use std::ops::{Mul, Neg, Sub};

fn finite(f: f64) -> Result<Var, ErrorCode> {
    if f.is_finite() {
        Ok(v_float(f))
    } else {
        Err(E_FLOAT)
    }
}

macro_rules! binary_numeric_coercion_op {
    ($op:tt ) => {
        pub fn $op(&self, v: &Var) -> Result<Var, ErrorCode> {
            match (self.variant(), v.variant()) {
                (Variant::Float(l), Variant::Float(r)) => finite(l.$op(*r)),
                (Variant::Int(l), Variant::Int(r)) => {
                    paste! { l.[<checked_ $op>](*r).map(v_int).ok_or(E_INVARG) }
                }
                (Variant::Float(l), Variant::Int(r)) => finite(l.$op(*r as f64)),
                (Variant::Int(l), Variant::Float(r)) => finite((*l as f64).$op(*r)),
                (_, _) => Err(E_TYPE),
            }
        }
    };
}

macro_rules! binary_division_op {
    ($name:ident, $checked:ident, $float_op:tt) => {
        pub fn $name(&self, v: &Var) -> Result<Var, ErrorCode> {
            match (self.variant(), v.variant()) {
                (Variant::Int(_), Variant::Int(0)) => Err(E_DIV),
                (Variant::Int(l), Variant::Int(r)) => l.$checked(*r).map(v_int).ok_or(E_INVARG),
                (Variant::Float(_) | Variant::Int(_), Variant::Float(r)) if *r == 0.0 => Err(E_DIV),
                (Variant::Float(_), Variant::Int(0)) => Err(E_DIV),
                (Variant::Float(l), Variant::Float(r)) => finite(*l $float_op *r),
                (Variant::Float(l), Variant::Int(r)) => finite(*l $float_op (*r as f64)),
                (Variant::Int(l), Variant::Float(r)) => finite((*l as f64) $float_op *r),
                (_, _) => Err(E_TYPE),
            }
        }
    };
}

impl Var {
    binary_numeric_coercion_op!(mul);
    binary_numeric_coercion_op!(sub);
    binary_division_op!(div, checked_div, /);
    binary_division_op!(modulus, checked_rem, %);

    pub fn add(&self, v: &Self) -> Result<Self, ErrorCode> {
        match (self.variant(), v.variant()) {
            (Variant::Float(l), Variant::Float(r)) => finite(l + r),
            (Variant::Int(l), Variant::Int(r)) => l.checked_add(*r).map(v_int).ok_or(E_INVARG),
            (Variant::Float(l), Variant::Int(r)) => finite(l + (*r as f64)),
            (Variant::Int(l), Variant::Float(r)) => finite(*l as f64 + r),
            (Variant::Str(s), Variant::Str(r)) => Ok(v_string(format!("{s}{r}"))),
            (_, _) => Err(E_TYPE),
        }
    }

    pub fn negative(&self) -> Result<Self, ErrorCode> {
        match self.variant() {
            Variant::Int(l) => l.checked_neg().map(v_int).ok_or(E_INVARG),
            Variant::Float(f) => Ok(v_float(f.neg())),
            _ => Err(E_TYPE),
        }
    }

    /// Integer powers with a negative exponent follow LambdaMOO: `1` and `-1` stay integral,
    /// zero is a division error, anything else truncates to zero.
    pub fn pow(&self, v: &Self) -> Result<Self, ErrorCode> {
        match (self.variant(), v.variant()) {
            (Variant::Float(l), Variant::Float(r)) => finite(l.powf(*r)),
            (Variant::Int(l), Variant::Int(r)) if *r < 0 => match *l {
                0 => Err(E_DIV),
                1 => Ok(v_int(1)),
                -1 => Ok(v_int(if r % 2 == 0 { 1 } else { -1 })),
                _ => Ok(v_int(0)),
            },
            (Variant::Int(l), Variant::Int(r)) => {
                let r = u32::try_from(*r).map_err(|_| E_INVARG)?;
                l.checked_pow(r).map(v_int).ok_or(E_INVARG)
            }
            (Variant::Float(l), Variant::Int(r)) => {
                let r = i32::try_from(*r).map_err(|_| E_FLOAT)?;
                finite(l.powi(r))
            }
            (Variant::Int(l), Variant::Float(r)) => finite((*l as f64).powf(*r)),
            (_, _) => Err(E_TYPE),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ErrorCode;
    use crate::ErrorCode::{E_DIV, E_INVARG, E_TYPE};
    use crate::var::{v_float, v_int, v_objid, v_str};
    use test_case::test_case;

    #[test]
    fn test_add() {
        assert_eq!(v_int(1).add(&v_int(2)), Ok(v_int(3)));
        assert_eq!(v_int(1).add(&v_float(2.0)), Ok(v_float(3.0)));
        assert_eq!(v_float(1.).add(&v_int(2)), Ok(v_float(3.)));
        assert_eq!(v_str("a").add(&v_str("b")), Ok(v_str("ab")));
        assert_eq!(v_str("a").add(&v_int(1)), Err(E_TYPE));
        assert_eq!(v_int(i64::MAX).add(&v_int(1)), Err(E_INVARG));
    }

    #[test]
    fn test_sub_mul() -> Result<(), ErrorCode> {
        assert_eq!(v_int(1).sub(&v_int(2))?, v_int(-1));
        assert_eq!(v_float(1.).sub(&v_int(2))?, v_float(-1.));
        assert_eq!(v_int(3).mul(&v_float(2.))?, v_float(6.));
        assert_eq!(v_objid(1).mul(&v_int(2)), Err(E_TYPE));
        Ok(())
    }

    #[test_case(5, 2, 2; "positive")]
    #[test_case(-5, 2, -2; "truncates toward zero")]
    #[test_case(5, -2, -2; "negative divisor")]
    fn test_int_div(l: i64, r: i64, expected: i64) {
        assert_eq!(v_int(l).div(&v_int(r)), Ok(v_int(expected)));
    }

    #[test_case(5, 2, 1; "positive")]
    #[test_case(5, -2, 1; "sign follows dividend")]
    #[test_case(-5, 2, -1; "negative dividend")]
    fn test_int_mod(l: i64, r: i64, expected: i64) {
        assert_eq!(v_int(l).modulus(&v_int(r)), Ok(v_int(expected)));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(v_int(1).div(&v_int(0)), Err(E_DIV));
        assert_eq!(v_int(1).modulus(&v_int(0)), Err(E_DIV));
        assert_eq!(v_float(1.).div(&v_float(0.)), Err(E_DIV));
        assert_eq!(v_int(1).div(&v_float(0.)), Err(E_DIV));
        assert_eq!(v_float(1.).modulus(&v_int(0)), Err(E_DIV));
    }

    #[test]
    fn test_float_div_mod() {
        assert_eq!(v_int(1).div(&v_float(2.)), Ok(v_float(0.5)));
        assert_eq!(v_float(5.5).modulus(&v_int(2)), Ok(v_float(1.5)));
        assert_eq!(v_float(-5.5).modulus(&v_float(2.)), Ok(v_float(-1.5)));
    }

    #[test]
    fn test_pow() {
        assert_eq!(v_int(2).pow(&v_int(10)), Ok(v_int(1024)));
        assert_eq!(v_int(2).pow(&v_float(2.)), Ok(v_float(4.)));
        assert_eq!(v_float(2.).pow(&v_int(-1)), Ok(v_float(0.5)));
        assert_eq!(v_int(2).pow(&v_int(-1)), Ok(v_int(0)));
        assert_eq!(v_int(-1).pow(&v_int(-3)), Ok(v_int(-1)));
        assert_eq!(v_int(0).pow(&v_int(-1)), Err(E_DIV));
    }

    #[test]
    fn test_negative() {
        assert_eq!(v_int(1).negative(), Ok(v_int(-1)));
        assert_eq!(v_float(1.).negative(), Ok(v_float(-1.0)));
        assert_eq!(v_str("x").negative(), Err(E_TYPE));
    }
}
