//! The primitive operator table
use crate::expr::{BaseType, PrimOp};

use super::{
    value::{Value, ValueKind},
    Consumer, MachineError,
};

/// Applies `op` to fully evaluated operands, checking their kinds.
///
/// The operand count was checked when the primitive was entered.
pub fn apply(op: PrimOp, args: &[Value]) -> Result<Value, MachineError> {
    let (kinds, _) = op.signature();
    for (arg, kind) in args.iter().zip(kinds) {
        let matches = match kind {
            BaseType::Int => arg.as_int().is_some(),
            BaseType::Bool => arg.as_bool().is_some(),
        };
        if !matches {
            return Err(MachineError::TypeMismatch {
                context: Consumer::Primitive(op),
                expected: ValueKind::from(*kind),
                found: arg.kind(),
            });
        }
    }

    match (op, args) {
        (PrimOp::Neg, [Value::Bool(b)]) => Ok(Value::Bool(!b)),
        (_, [Value::Int(a), Value::Int(b)]) => binary(op, *a, *b),
        _ => Err(MachineError::Unreachable(
            "primitive applied to the wrong number of operands",
        )),
    }
}

fn binary(op: PrimOp, a: i64, b: i64) -> Result<Value, MachineError> {
    let overflow = || MachineError::Overflow(op);
    Ok(match op {
        PrimOp::Add => Value::Int(a.checked_add(b).ok_or_else(overflow)?),
        PrimOp::Sub => Value::Int(a.checked_sub(b).ok_or_else(overflow)?),
        PrimOp::Mul => Value::Int(a.checked_mul(b).ok_or_else(overflow)?),
        PrimOp::Div | PrimOp::Mod if b == 0 => return Err(MachineError::DivisionByZero(op)),
        PrimOp::Div => Value::Int(floor_div(a, b).ok_or_else(overflow)?),
        PrimOp::Mod => Value::Int(floor_mod(a, b)),
        PrimOp::Eq => Value::Bool(a == b),
        PrimOp::Ne => Value::Bool(a != b),
        PrimOp::Lt => Value::Bool(a < b),
        PrimOp::Le => Value::Bool(a <= b),
        PrimOp::Gt => Value::Bool(a > b),
        PrimOp::Ge => Value::Bool(a >= b),
        PrimOp::Neg => {
            return Err(MachineError::Unreachable(
                "unary primitive reached the binary table",
            ))
        }
    })
}

// `b` is nonzero
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

// `b` is nonzero; the result has the sign of `b`
fn floor_mod(a: i64, b: i64) -> i64 {
    // i64::MIN % -1 overflows in `%` but is mathematically 0
    let remainder = a.checked_rem(b).unwrap_or(0);
    if remainder != 0 && ((remainder < 0) != (b < 0)) {
        remainder + b
    } else {
        remainder
    }
}
