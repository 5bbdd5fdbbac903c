//! Conversion chain: the function shapes shared by all rules and the fold
//! that turns an ordered rule list into one callable.

use std::sync::Arc;

use crate::error::Error;
use crate::value::{TypeDesc, TypedValue, Value};

/// Decode-side conversion: `(source value, target type) -> converted value`.
pub type DecodeFn = Arc<dyn Fn(Value, &TypeDesc) -> Result<Value, Error> + Send + Sync>;

/// Encode-side conversion: `(typed field value) -> map value`.
pub type EncodeFn = Arc<dyn Fn(TypedValue) -> Result<Value, Error> + Send + Sync>;

/// A decode rule wraps its continuation and returns the wrapped function.
pub type DecodeRule = Arc<dyn Fn(DecodeFn) -> DecodeFn + Send + Sync>;

/// An encode rule wraps its continuation and returns the wrapped function.
pub type EncodeRule = Arc<dyn Fn(EncodeFn) -> EncodeFn + Send + Sync>;

pub fn decode_rule<R>(rule: R) -> DecodeRule
where
    R: Fn(DecodeFn) -> DecodeFn + Send + Sync + 'static,
{
    Arc::new(rule)
}

pub fn encode_rule<R>(rule: R) -> EncodeRule
where
    R: Fn(EncodeFn) -> EncodeFn + Send + Sync + 'static,
{
    Arc::new(rule)
}

fn identity_decode_fn(value: Value, _to: &TypeDesc) -> Result<Value, Error> {
    Ok(value)
}

fn identity_encode_fn(source: TypedValue) -> Result<Value, Error> {
    Ok(source.value)
}

/// Innermost decode function: returns the input unchanged.
pub fn identity_decode() -> DecodeFn {
    Arc::new(identity_decode_fn)
}

/// Innermost encode function: returns the field's native value unchanged.
pub fn identity_encode() -> EncodeFn {
    Arc::new(identity_encode_fn)
}

/// Fold `[r1, r2, ..., rN]` over `terminal` into `r1(r2(...rN(terminal)))`.
///
/// Calling the result evaluates `r1` first; each rule either handles the
/// value or hands it to the function it wraps.
pub fn compose<F>(rules: &[Arc<dyn Fn(F) -> F + Send + Sync>], terminal: F) -> F {
    rules.iter().rev().fold(terminal, |next, rule| rule(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Kind;

    fn tagging(label: &'static str) -> DecodeRule {
        decode_rule(move |next: DecodeFn| -> DecodeFn {
            Arc::new(move |from: Value, to: &TypeDesc| -> Result<Value, Error> {
                match from {
                    Value::String(s) if s.starts_with("claim") => {
                        Ok(Value::String(format!("{s}:{label}")))
                    }
                    other => next(other, to),
                }
            })
        })
    }

    fn appending(label: &'static str) -> DecodeRule {
        decode_rule(move |next: DecodeFn| -> DecodeFn {
            Arc::new(move |from: Value, to: &TypeDesc| -> Result<Value, Error> {
                let out = next(from, to)?;
                match out {
                    Value::String(s) => Ok(Value::String(format!("{s}{label}"))),
                    other => Ok(other),
                }
            })
        })
    }

    const STRING: TypeDesc = TypeDesc::new(Kind::String);

    #[test]
    fn first_registered_rule_wins() {
        let f = compose(&[tagging("r1"), tagging("r2")], identity_decode());
        let out = f(Value::from("claim"), &STRING).unwrap();
        assert_eq!(out, Value::from("claim:r1"));
    }

    #[test]
    fn unclaimed_value_reaches_identity() {
        let f = compose(&[tagging("r1"), tagging("r2")], identity_decode());
        assert_eq!(f(Value::from("other"), &STRING).unwrap(), Value::from("other"));
        assert_eq!(f(Value::I32(7), &STRING).unwrap(), Value::I32(7));
    }

    #[test]
    fn nesting_is_right_to_left() {
        // r1 wraps r2 wraps identity: r2's suffix is applied first.
        let f = compose(&[appending("1"), appending("2")], identity_decode());
        assert_eq!(f(Value::from("x"), &STRING).unwrap(), Value::from("x21"));
    }

    #[test]
    fn empty_chain_is_identity() {
        let f = compose::<DecodeFn>(&[], identity_decode());
        assert_eq!(f(Value::Bool(true), &STRING).unwrap(), Value::Bool(true));

        let g = compose::<EncodeFn>(&[], identity_encode());
        let typed = TypedValue::new(TypeDesc::new(Kind::I8), Value::I8(3));
        assert_eq!(g(typed).unwrap(), Value::I8(3));
    }
}
