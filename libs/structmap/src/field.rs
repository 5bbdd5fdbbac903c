//! Types that can sit in a record field, and their default coercions.
//!
//! `decode_field` receives a value that already went through the decode
//! chain. It never parses text: a string reaching a numeric field without a
//! rule is a mismatch.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};

use crate::error::Error;
use crate::value::{DynError, Kind, TypeDesc, Value};
use crate::walk::{Decoder, Encoder};

#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as a record field",
    note = "error fields must be declared as `Option<DynError>`"
)]
pub trait Field: Sized {
    fn type_desc() -> TypeDesc;

    /// Native value of `self`. Records return their nested map.
    fn encode_field(&self, enc: &Encoder<'_>) -> Result<Value, Error>;

    /// Build `Self` from a converted value. `Null` means the zero value.
    fn decode_field(value: Value, dec: &Decoder<'_>) -> Result<Self, Error>;
}

fn mismatch(expected: Kind, found: &Value) -> Error {
    Error::Mismatch {
        expected,
        found: found.kind_name(),
    }
}

fn coerce_int<T: TryFrom<i128>>(value: Value, kind: Kind) -> Result<T, Error> {
    let n: i128 = match value {
        Value::Null => 0,
        Value::I8(v) => v.into(),
        Value::I16(v) => v.into(),
        Value::I32(v) => v.into(),
        Value::I64(v) => v.into(),
        Value::Isize(v) => v as i128,
        Value::U8(v) => v.into(),
        Value::U16(v) => v.into(),
        Value::U32(v) => v.into(),
        Value::U64(v) => v.into(),
        Value::Usize(v) => v as i128,
        Value::F32(v) if v.fract() == 0.0 && v.is_finite() => v as i128,
        Value::F64(v) if v.fract() == 0.0 && v.is_finite() => v as i128,
        other => return Err(mismatch(kind, &other)),
    };
    T::try_from(n).map_err(|_| Error::Overflow {
        kind,
        value: n.to_string(),
    })
}

fn coerce_float(value: Value, kind: Kind) -> Result<f64, Error> {
    match value {
        Value::Null => Ok(0.0),
        Value::F32(v) => Ok(v.into()),
        Value::F64(v) => Ok(v),
        Value::I8(v) => Ok(v.into()),
        Value::I16(v) => Ok(v.into()),
        Value::I32(v) => Ok(v.into()),
        Value::I64(v) => Ok(v as f64),
        Value::Isize(v) => Ok(v as f64),
        Value::U8(v) => Ok(v.into()),
        Value::U16(v) => Ok(v.into()),
        Value::U32(v) => Ok(v.into()),
        Value::U64(v) => Ok(v as f64),
        Value::Usize(v) => Ok(v as f64),
        other => Err(mismatch(kind, &other)),
    }
}

macro_rules! int_field {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Field for $ty {
            fn type_desc() -> TypeDesc {
                TypeDesc::new(Kind::$kind)
            }

            fn encode_field(&self, _enc: &Encoder<'_>) -> Result<Value, Error> {
                Ok(Value::$kind(*self))
            }

            fn decode_field(value: Value, _dec: &Decoder<'_>) -> Result<Self, Error> {
                coerce_int(value, Kind::$kind)
            }
        }
    )*};
}

int_field! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
}

impl Field for f32 {
    fn type_desc() -> TypeDesc {
        TypeDesc::new(Kind::F32)
    }

    fn encode_field(&self, _enc: &Encoder<'_>) -> Result<Value, Error> {
        Ok(Value::F32(*self))
    }

    fn decode_field(value: Value, _dec: &Decoder<'_>) -> Result<Self, Error> {
        match value {
            Value::F32(v) => Ok(v),
            other => {
                let wide = coerce_float(other, Kind::F32)?;
                let narrow = wide as f32;
                if wide.is_finite() && !narrow.is_finite() {
                    return Err(Error::Overflow {
                        kind: Kind::F32,
                        value: wide.to_string(),
                    });
                }
                Ok(narrow)
            }
        }
    }
}

impl Field for f64 {
    fn type_desc() -> TypeDesc {
        TypeDesc::new(Kind::F64)
    }

    fn encode_field(&self, _enc: &Encoder<'_>) -> Result<Value, Error> {
        Ok(Value::F64(*self))
    }

    fn decode_field(value: Value, _dec: &Decoder<'_>) -> Result<Self, Error> {
        coerce_float(value, Kind::F64)
    }
}

impl Field for bool {
    fn type_desc() -> TypeDesc {
        TypeDesc::new(Kind::Bool)
    }

    fn encode_field(&self, _enc: &Encoder<'_>) -> Result<Value, Error> {
        Ok(Value::Bool(*self))
    }

    fn decode_field(value: Value, _dec: &Decoder<'_>) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            other => Err(mismatch(Kind::Bool, &other)),
        }
    }
}

impl Field for String {
    fn type_desc() -> TypeDesc {
        TypeDesc::new(Kind::String)
    }

    fn encode_field(&self, _enc: &Encoder<'_>) -> Result<Value, Error> {
        Ok(Value::String(self.clone()))
    }

    fn decode_field(value: Value, _dec: &Decoder<'_>) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s),
            other => Err(mismatch(Kind::String, &other)),
        }
    }
}

impl Field for DateTime<FixedOffset> {
    fn type_desc() -> TypeDesc {
        TypeDesc::new(Kind::Timestamp)
    }

    fn encode_field(&self, _enc: &Encoder<'_>) -> Result<Value, Error> {
        Ok(Value::Timestamp(*self))
    }

    fn decode_field(value: Value, _dec: &Decoder<'_>) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(DateTime::<Utc>::default().fixed_offset()),
            Value::Timestamp(ts) => Ok(ts),
            other => Err(mismatch(Kind::Timestamp, &other)),
        }
    }
}

impl Field for DateTime<Utc> {
    fn type_desc() -> TypeDesc {
        TypeDesc::new(Kind::Timestamp)
    }

    fn encode_field(&self, _enc: &Encoder<'_>) -> Result<Value, Error> {
        Ok(Value::Timestamp(self.fixed_offset()))
    }

    fn decode_field(value: Value, _dec: &Decoder<'_>) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(DateTime::<Utc>::default()),
            Value::Timestamp(ts) => Ok(ts.with_timezone(&Utc)),
            other => Err(mismatch(Kind::Timestamp, &other)),
        }
    }
}

impl Field for TimeDelta {
    fn type_desc() -> TypeDesc {
        TypeDesc::new(Kind::Duration)
    }

    fn encode_field(&self, _enc: &Encoder<'_>) -> Result<Value, Error> {
        Ok(Value::Duration(*self))
    }

    /// Integers are read as nanoseconds.
    fn decode_field(value: Value, _dec: &Decoder<'_>) -> Result<Self, Error> {
        match value {
            Value::Duration(d) => Ok(d),
            other => coerce_int::<i64>(other, Kind::Duration).map(TimeDelta::nanoseconds),
        }
    }
}

impl Field for IpAddr {
    fn type_desc() -> TypeDesc {
        TypeDesc::new(Kind::Ip)
    }

    fn encode_field(&self, _enc: &Encoder<'_>) -> Result<Value, Error> {
        Ok(Value::Ip(*self))
    }

    /// The zero address is `0.0.0.0`.
    fn decode_field(value: Value, _dec: &Decoder<'_>) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            Value::Ip(ip) => Ok(ip),
            other => Err(mismatch(Kind::Ip, &other)),
        }
    }
}

/// Error fields are always optional: `None` is "no error", which is what
/// empty text and a missing key decode to. There is no plain `DynError`
/// field.
impl Field for Option<DynError> {
    fn type_desc() -> TypeDesc {
        TypeDesc::new(Kind::Error).optional()
    }

    fn encode_field(&self, _enc: &Encoder<'_>) -> Result<Value, Error> {
        Ok(self.clone().map_or(Value::Null, Value::Error))
    }

    fn decode_field(value: Value, _dec: &Decoder<'_>) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(None),
            Value::Error(e) => Ok(Some(e)),
            other => Err(mismatch(Kind::Error, &other)),
        }
    }
}

impl Field for Value {
    fn type_desc() -> TypeDesc {
        TypeDesc::new(Kind::Any)
    }

    fn encode_field(&self, _enc: &Encoder<'_>) -> Result<Value, Error> {
        Ok(self.clone())
    }

    fn decode_field(value: Value, _dec: &Decoder<'_>) -> Result<Self, Error> {
        Ok(value)
    }
}

impl<T: Field> Field for Option<T> {
    fn type_desc() -> TypeDesc {
        T::type_desc().optional()
    }

    fn encode_field(&self, enc: &Encoder<'_>) -> Result<Value, Error> {
        match self {
            Some(inner) => inner.encode_field(enc),
            None => Ok(Value::Null),
        }
    }

    fn decode_field(value: Value, dec: &Decoder<'_>) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(None),
            other => T::decode_field(other, dec).map(Some),
        }
    }
}

impl<T: Field> Field for Vec<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::new(Kind::List)
    }

    fn encode_field(&self, enc: &Encoder<'_>) -> Result<Value, Error> {
        self.iter()
            .enumerate()
            .map(|(i, item)| enc.value(item).map_err(|e| e.at(&format!("[{i}]"))))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }

    fn decode_field(value: Value, dec: &Decoder<'_>) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| dec.value(item).map_err(|e| e.at(&format!("[{i}]"))))
                .collect(),
            other => Err(mismatch(Kind::List, &other)),
        }
    }
}

impl<T: Field> Field for BTreeMap<String, T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::new(Kind::Map)
    }

    fn encode_field(&self, enc: &Encoder<'_>) -> Result<Value, Error> {
        self.iter()
            .map(|(k, v)| -> Result<(String, Value), Error> {
                Ok((k.clone(), enc.value(v).map_err(|e| e.at(k))?))
            })
            .collect::<Result<crate::value::Map, Error>>()
            .map(Value::Map)
    }

    fn decode_field(value: Value, dec: &Decoder<'_>) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(BTreeMap::new()),
            Value::Map(map) => map
                .into_iter()
                .map(|(k, v)| -> Result<(String, T), Error> {
                    let decoded = dec.value(v).map_err(|e| e.at(&k))?;
                    Ok((k, decoded))
                })
                .collect(),
            other => Err(mismatch(Kind::Map, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{identity_decode, identity_encode};

    fn decode<T: Field>(value: Value) -> Result<T, Error> {
        let convert = identity_decode();
        Decoder::new("structmap", &convert).value(value)
    }

    fn encode<T: Field>(value: &T) -> Value {
        let convert = identity_encode();
        Encoder::new("structmap", &convert).value(value).unwrap()
    }

    #[test]
    fn integer_widths_are_range_checked() {
        assert_eq!(decode::<i8>(Value::I64(-128)).unwrap(), -128);
        assert_eq!(decode::<u16>(Value::F64(42.0)).unwrap(), 42);
        let err = decode::<u8>(Value::I64(256)).unwrap_err();
        assert!(matches!(err, Error::Overflow { kind: Kind::U8, .. }));
        assert!(decode::<u32>(Value::I64(-1)).is_err());
        assert!(decode::<i32>(Value::F64(1.5)).is_err());
    }

    #[test]
    fn float_narrowing_is_range_checked() {
        assert_eq!(decode::<f32>(Value::F64(1.5)).unwrap(), 1.5);
        let err = decode::<f32>(Value::F64(1e300)).unwrap_err();
        assert!(matches!(err, Error::Overflow { kind: Kind::F32, .. }));
        assert_eq!(decode::<f32>(Value::F64(f64::INFINITY)).unwrap(), f32::INFINITY);
    }

    #[test]
    fn error_field_is_optional() {
        assert!(decode::<Option<DynError>>(Value::Null).unwrap().is_none());
        let err: DynError = std::sync::Arc::new(crate::value::ErrorMessage("oops".into()));
        let decoded = decode::<Option<DynError>>(Value::Error(err.clone())).unwrap();
        assert_eq!(decoded.map(|e| e.to_string()).as_deref(), Some("oops"));
        assert_eq!(encode(&None::<DynError>), Value::Null);
        assert!(matches!(encode(&Some(err)), Value::Error(e) if e.to_string() == "oops"));
    }

    #[test]
    fn text_is_not_coerced_without_a_rule() {
        let err = decode::<i32>(Value::from("42")).unwrap_err();
        assert!(matches!(
            err,
            Error::Mismatch {
                expected: Kind::I32,
                found: "string"
            }
        ));
    }

    #[test]
    fn null_is_the_zero_value() {
        assert_eq!(decode::<i64>(Value::Null).unwrap(), 0);
        assert_eq!(decode::<String>(Value::Null).unwrap(), "");
        assert_eq!(decode::<Option<u8>>(Value::Null).unwrap(), None);
        assert_eq!(
            decode::<IpAddr>(Value::Null).unwrap(),
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        );
        assert_eq!(decode::<TimeDelta>(Value::Null).unwrap(), TimeDelta::zero());
        assert!(decode::<Vec<bool>>(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn duration_accepts_nanoseconds() {
        let d = decode::<TimeDelta>(Value::I64(2_000_000_000)).unwrap();
        assert_eq!(d, TimeDelta::seconds(2));
    }

    #[test]
    fn list_errors_carry_index() {
        let input = Value::List(vec![Value::I64(1), Value::from("x")]);
        let err = decode::<Vec<i64>>(input).unwrap_err();
        assert_eq!(err.path(), Some("[1]"));
    }

    #[test]
    fn containers_encode_elementwise() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), vec![Some(1u8), None]);
        let encoded = encode(&map);

        let mut expected = crate::value::Map::new();
        expected.insert("a".into(), Value::List(vec![Value::U8(1), Value::Null]));
        assert_eq!(encoded, Value::Map(expected));
    }

    #[test]
    fn optional_desc_wraps_inner_kind() {
        assert_eq!(
            <Option<DateTime<Utc>>>::type_desc(),
            TypeDesc::new(Kind::Timestamp).optional()
        );
        assert!(<Option<DynError>>::type_desc().is_error());
    }
}
