use std::sync::Arc;

use crate::chain::{DecodeFn, EncodeFn};
use crate::error::Error;
use crate::value::{ErrorMessage, TypeDesc, TypedValue, Value};

/// Text into an error-typed field. Empty text means "no error".
pub fn decode_string_to_error(next: DecodeFn) -> DecodeFn {
    Arc::new(move |from: Value, to: &TypeDesc| -> Result<Value, Error> {
        if !to.is_error() {
            return next(from, to);
        }
        match from {
            Value::String(text) if text.is_empty() => Ok(Value::Null),
            Value::String(text) => Ok(Value::Error(Arc::new(ErrorMessage(text)))),
            other => next(other, to),
        }
    })
}

/// Error value into its message; an absent error becomes `""`.
pub fn encode_error_to_string(next: EncodeFn) -> EncodeFn {
    Arc::new(move |source: TypedValue| -> Result<Value, Error> {
        if !source.ty.is_error() {
            return next(source);
        }
        match &source.value {
            Value::Error(e) => Ok(Value::String(e.to_string())),
            Value::Null => Ok(Value::String(String::new())),
            _ => next(source),
        }
    })
}
