//! Converters: functions that return a value and are usually nested inside
//! an editor call. Inputs that cannot be converted yield `Absent`, so
//! `set(x, Int(y))` leaves `x` untouched.

use crate::model::Value;
use crate::transform::arguments::{ArgKind, BoundArguments, Parameter};
use crate::transform::contexts::TransformContext;
use crate::transform::error::BuildError;
use crate::transform::registry::{expr_func, ExprFunc, FunctionFactory};

const VALUE_PARAMS: &[Parameter] = &[Parameter::required("value", ArgKind::Getter)];

// --- Int ---
pub fn int<C: TransformContext>() -> FunctionFactory<C> {
    FunctionFactory::new("Int", VALUE_PARAMS, build_int)
}

fn build_int<C: TransformContext>(mut args: BoundArguments<C>) -> Result<ExprFunc<C>, BuildError> {
    let value = args.getter("value")?;
    Ok(expr_func(move |ctx: &mut C| Ok(to_int(value.get(ctx)?))))
}

pub(crate) fn to_int(value: Value) -> Value {
    match value {
        Value::Int(i) => Value::Int(i),
        Value::Double(d) => {
            // i64::MAX is not representable as f64; it rounds up to 2^63.
            const MAX_SAFE_FLOAT: f64 = 9_223_372_036_854_774_784.0;
            const MIN_SAFE_FLOAT: f64 = i64::MIN as f64;
            if d.is_finite() && (MIN_SAFE_FLOAT..=MAX_SAFE_FLOAT).contains(&d) {
                Value::Int(d as i64)
            } else {
                Value::Absent
            }
        }
        Value::Bool(b) => Value::Int(i64::from(b)),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or(Value::Absent),
        _ => Value::Absent,
    }
}

// --- Double ---
pub fn double<C: TransformContext>() -> FunctionFactory<C> {
    FunctionFactory::new("Double", VALUE_PARAMS, build_double)
}

fn build_double<C: TransformContext>(
    mut args: BoundArguments<C>,
) -> Result<ExprFunc<C>, BuildError> {
    let value = args.getter("value")?;
    Ok(expr_func(move |ctx: &mut C| Ok(to_double(value.get(ctx)?))))
}

pub(crate) fn to_double(value: Value) -> Value {
    match value {
        Value::Int(i) => Value::Double(i as f64),
        Value::Double(d) => Value::Double(d),
        Value::Bool(b) => Value::Double(if b { 1.0 } else { 0.0 }),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Double)
            .unwrap_or(Value::Absent),
        _ => Value::Absent,
    }
}
