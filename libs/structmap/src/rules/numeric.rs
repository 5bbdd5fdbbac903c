use std::str::FromStr;
use std::sync::Arc;

use crate::chain::{DecodeFn, EncodeFn};
use crate::error::Error;
use crate::value::{Kind, TypeDesc, TypedValue, Value};

/// Parse text into the target's integer or float width.
///
/// Out-of-range text fails instead of truncating.
pub fn decode_string_to_number(next: DecodeFn) -> DecodeFn {
    Arc::new(move |from: Value, to: &TypeDesc| -> Result<Value, Error> {
        let text = match &from {
            Value::String(text) => text,
            _ => return next(from, to),
        };

        match to.kind {
            Kind::I8 => parse(text, to.kind).map(Value::I8),
            Kind::I16 => parse(text, to.kind).map(Value::I16),
            Kind::I32 => parse(text, to.kind).map(Value::I32),
            Kind::I64 => parse(text, to.kind).map(Value::I64),
            Kind::Isize => parse(text, to.kind).map(Value::Isize),
            Kind::U8 => parse(text, to.kind).map(Value::U8),
            Kind::U16 => parse(text, to.kind).map(Value::U16),
            Kind::U32 => parse(text, to.kind).map(Value::U32),
            Kind::U64 => parse(text, to.kind).map(Value::U64),
            Kind::Usize => parse(text, to.kind).map(Value::Usize),
            Kind::F32 => parse_float(text, to.kind, f32::is_finite).map(Value::F32),
            Kind::F64 => parse_float(text, to.kind, f64::is_finite).map(Value::F64),
            _ => next(from, to),
        }
    })
}

/// Format any integer or float as base-10 text. Floats use the shortest
/// representation that parses back to the same value.
pub fn encode_number_to_string(next: EncodeFn) -> EncodeFn {
    Arc::new(move |source: TypedValue| -> Result<Value, Error> {
        let text = match &source.value {
            Value::I8(v) => v.to_string(),
            Value::I16(v) => v.to_string(),
            Value::I32(v) => v.to_string(),
            Value::I64(v) => v.to_string(),
            Value::Isize(v) => v.to_string(),
            Value::U8(v) => v.to_string(),
            Value::U16(v) => v.to_string(),
            Value::U32(v) => v.to_string(),
            Value::U64(v) => v.to_string(),
            Value::Usize(v) => v.to_string(),
            Value::F32(v) => v.to_string(),
            Value::F64(v) => v.to_string(),
            _ => return next(source),
        };
        Ok(Value::String(text))
    })
}

fn parse<T>(text: &str, kind: Kind) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.parse::<T>().map_err(|e| Error::Parse {
        text: text.to_string(),
        kind,
        source: Box::new(e),
    })
}

/// Like [`parse`], but text out of the float's range fails instead of
/// becoming infinity. Literal `inf`/`infinity`/`nan` still parse.
fn parse_float<T>(text: &str, kind: Kind, is_finite: fn(T) -> bool) -> Result<T, Error>
where
    T: FromStr + Copy,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = parse::<T>(text, kind)?;
    if is_finite(value) || is_non_finite_literal(text) {
        return Ok(value);
    }
    Err(Error::Parse {
        text: text.to_string(),
        kind,
        source: "value out of range".into(),
    })
}

fn is_non_finite_literal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    ["inf", "infinity", "nan"]
        .iter()
        .any(|word| unsigned.eq_ignore_ascii_case(word))
}
