//! Integer constant folding for loop bounds.
//!
//! The backend only needs to know whether a loop minimum or extent is a
//! compile-time constant, so this folds integer arithmetic over literals
//! and nothing else. Overflow or division by zero yields `None`.

use std::collections::HashMap;

use super::{BinOp, Expr, Type};

/// Fold `e` to an integer constant, if it is one.
pub fn const_int(e: &Expr) -> Option<i64> {
    fold(e, &mut HashMap::new())
}

/// True when `e` folds to the integer zero.
pub fn is_const_zero(e: &Expr) -> bool {
    const_int(e) == Some(0)
}

fn fold(e: &Expr, env: &mut HashMap<String, i64>) -> Option<i64> {
    match e {
        Expr::IntImm { value, .. } => Some(*value),
        Expr::UIntImm { ty, value } if !ty.is_bool() => i64::try_from(*value).ok(),
        Expr::Variable { name, .. } => env.get(name).copied(),
        Expr::Cast { ty, value } if !ty.is_float() && !ty.is_bool() => {
            let v = fold(value, env)?;
            fits(*ty, v).then_some(v)
        }
        Expr::Binary { op, a, b } => {
            let a = fold(a, env)?;
            let b = fold(b, env)?;
            match op {
                BinOp::Add => a.checked_add(b),
                BinOp::Sub => a.checked_sub(b),
                BinOp::Mul => a.checked_mul(b),
                // Integer division rounds toward negative infinity.
                BinOp::Div if b != 0 => a.checked_div_euclid(b),
                BinOp::Mod if b != 0 => a.checked_rem_euclid(b),
                BinOp::Min => Some(a.min(b)),
                BinOp::Max => Some(a.max(b)),
                _ => None,
            }
        }
        Expr::Let { name, value, body } => {
            let v = fold(value, env)?;
            let shadowed = env.insert(name.clone(), v);
            let result = fold(body, env);
            match shadowed {
                Some(old) => env.insert(name.clone(), old),
                None => env.remove(name),
            };
            result
        }
        _ => None,
    }
}

/// Whether `v` is representable in the integer type `ty`.
fn fits(ty: Type, v: i64) -> bool {
    if ty.bits >= 64 {
        return ty.is_int() || v >= 0;
    }
    let bits = ty.bits as u32;
    if ty.is_int() {
        let half = 1i64 << (bits - 1);
        (-half..half).contains(&v)
    } else {
        (0..(1i64 << bits)).contains(&v)
    }
}
