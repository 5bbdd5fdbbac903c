use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, SecondsFormat, TimeDelta};
use serde::ser::{Serialize, Serializer};

use crate::rules::duration::format_duration;

/// Runtime kind of a field or a value.
///
/// Closed set: every built-in rule matches on a fixed menu of these kinds
/// and delegates everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    String,
    Timestamp,
    Duration,
    Ip,
    /// Anything that behaves as an error value.
    Error,
    List,
    Map,
    /// A derived record, encoded as a nested map.
    Record,
    /// Dynamic [`Value`], passed through as-is.
    Any,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::I8 => "i8",
            Kind::I16 => "i16",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::Isize => "isize",
            Kind::U8 => "u8",
            Kind::U16 => "u16",
            Kind::U32 => "u32",
            Kind::U64 => "u64",
            Kind::Usize => "usize",
            Kind::F32 => "f32",
            Kind::F64 => "f64",
            Kind::String => "string",
            Kind::Timestamp => "timestamp",
            Kind::Duration => "duration",
            Kind::Ip => "ip",
            Kind::Error => "error",
            Kind::List => "list",
            Kind::Map => "map",
            Kind::Record => "record",
            Kind::Any => "any",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared type of a conversion target (decode) or source (encode).
///
/// `optional` marks the single-level nullable form (`Option<T>`) of `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDesc {
    pub kind: Kind,
    pub optional: bool,
}

impl TypeDesc {
    pub const fn new(kind: Kind) -> Self {
        Self {
            kind,
            optional: false,
        }
    }

    /// The `Option<_>` form of this type.
    pub const fn optional(self) -> Self {
        Self {
            kind: self.kind,
            optional: true,
        }
    }

    /// Shared error-capability check used by both directions of the error rule.
    pub fn is_error(&self) -> bool {
        self.kind == Kind::Error
    }

    /// Leaves are offered to the conversion chain; containers are walked.
    pub fn is_leaf(&self) -> bool {
        !matches!(self.kind, Kind::List | Kind::Map | Kind::Record)
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "Option<{}>", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// Shared, clonable error value stored in records.
pub type DynError = Arc<dyn std::error::Error + Send + Sync>;

/// Generic error carrying only a message. Built when text decodes into an
/// error-typed field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ErrorMessage(pub String);

pub type Map = BTreeMap<String, Value>;

/// Dynamic value exchanged between records and maps.
///
/// Scalar variants mirror [`Kind`] so that rules can dispatch on the
/// concrete runtime type of an encoded field.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F32(f32),
    F64(f64),
    String(String),
    Timestamp(DateTime<FixedOffset>),
    Duration(TimeDelta),
    Ip(IpAddr),
    Error(DynError),
    List(Vec<Value>),
    Map(Map),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Short name of the variant, used in mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => Kind::Bool.name(),
            Value::I8(_) => Kind::I8.name(),
            Value::I16(_) => Kind::I16.name(),
            Value::I32(_) => Kind::I32.name(),
            Value::I64(_) => Kind::I64.name(),
            Value::Isize(_) => Kind::Isize.name(),
            Value::U8(_) => Kind::U8.name(),
            Value::U16(_) => Kind::U16.name(),
            Value::U32(_) => Kind::U32.name(),
            Value::U64(_) => Kind::U64.name(),
            Value::Usize(_) => Kind::Usize.name(),
            Value::F32(_) => Kind::F32.name(),
            Value::F64(_) => Kind::F64.name(),
            Value::String(_) => Kind::String.name(),
            Value::Timestamp(_) => Kind::Timestamp.name(),
            Value::Duration(_) => Kind::Duration.name(),
            Value::Ip(_) => Kind::Ip.name(),
            Value::Error(_) => Kind::Error.name(),
            Value::List(_) => Kind::List.name(),
            Value::Map(_) => Kind::Map.name(),
        }
    }

    /// Zero check for the `omitempty` tag option.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::I8(v) => *v == 0,
            Value::I16(v) => *v == 0,
            Value::I32(v) => *v == 0,
            Value::I64(v) => *v == 0,
            Value::Isize(v) => *v == 0,
            Value::U8(v) => *v == 0,
            Value::U16(v) => *v == 0,
            Value::U32(v) => *v == 0,
            Value::U64(v) => *v == 0,
            Value::Usize(v) => *v == 0,
            Value::F32(v) => *v == 0.0,
            Value::F64(v) => *v == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Duration(d) => d.is_zero(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            Value::Timestamp(_) | Value::Ip(_) | Value::Error(_) => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::Isize(a), Value::Isize(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::Usize(a), Value::Usize(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Ip(a), Value::Ip(b)) => a == b,
            // Errors compare by message.
            (Value::Error(a), Value::Error(b)) => a.to_string() == b.to_string(),
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    )*};
}

value_from! {
    bool => Bool,
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
    f32 => F32,
    f64 => F64,
    String => String,
    DateTime<FixedOffset> => Timestamp,
    TimeDelta => Duration,
    IpAddr => Ip,
    Map => Map,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::I64(i)
                } else if let Some(u) = n.as_u64() {
                    Value::U64(u)
                } else {
                    Value::F64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::I8(v) => serializer.serialize_i8(*v),
            Value::I16(v) => serializer.serialize_i16(*v),
            Value::I32(v) => serializer.serialize_i32(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::Isize(v) => serializer.serialize_i64(*v as i64),
            Value::U8(v) => serializer.serialize_u8(*v),
            Value::U16(v) => serializer.serialize_u16(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::Usize(v) => serializer.serialize_u64(*v as u64),
            Value::F32(v) => serializer.serialize_f32(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::String(s) => serializer.serialize_str(s),
            Value::Timestamp(ts) => {
                serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Duration(d) => serializer.serialize_str(&format_duration(*d)),
            Value::Ip(ip) => serializer.collect_str(ip),
            Value::Error(e) => serializer.collect_str(e),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map),
        }
    }
}

/// Encode-side source value: the field's native value plus its declared type.
///
/// The type survives even when the value is absent, so a rule can tell an
/// empty `Option<DateTime<_>>` apart from any other null.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    pub ty: TypeDesc,
    pub value: Value,
}

impl TypedValue {
    pub fn new(ty: TypeDesc, value: Value) -> Self {
        Self { ty, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_numbers_keep_integer_kinds() {
        let v = Value::from(serde_json::json!({"a": 1, "b": -2, "c": 1.5, "d": u64::MAX}));
        let map = v.as_map().cloned().unwrap_or_default();
        assert_eq!(map["a"], Value::I64(1));
        assert_eq!(map["b"], Value::I64(-2));
        assert_eq!(map["c"], Value::F64(1.5));
        assert_eq!(map["d"], Value::U64(u64::MAX));
    }

    #[test]
    fn serializes_rich_scalars_as_text() {
        let mut map = Map::new();
        map.insert("d".into(), Value::Duration(TimeDelta::seconds(90)));
        map.insert("ip".into(), Value::Ip("10.0.0.1".parse().unwrap()));
        map.insert(
            "ts".into(),
            Value::Timestamp(DateTime::parse_from_rfc3339("2021-09-29T00:00:00Z").unwrap()),
        );
        map.insert("err".into(), Value::Error(Arc::new(ErrorMessage("oops".into()))));

        let json = serde_json::to_value(Value::Map(map)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "d": "1m30s",
                "ip": "10.0.0.1",
                "ts": "2021-09-29T00:00:00Z",
                "err": "oops",
            })
        );
    }

    #[test]
    fn errors_compare_by_message() {
        let a = Value::Error(Arc::new(ErrorMessage("x".into())));
        let b = Value::Error(Arc::new(std::io::Error::other("x")));
        assert_eq!(a, b);
    }

    #[test]
    fn zero_values() {
        assert!(Value::Null.is_zero());
        assert!(Value::from("").is_zero());
        assert!(Value::I32(0).is_zero());
        assert!(!Value::Bool(true).is_zero());
        assert!(!Value::from("x").is_zero());
    }

    #[test]
    fn optional_desc_keeps_kind() {
        let desc = TypeDesc::new(Kind::Timestamp).optional();
        assert_eq!(desc.kind, Kind::Timestamp);
        assert!(desc.optional);
        assert_eq!(desc.to_string(), "Option<timestamp>");
        assert!(TypeDesc::new(Kind::Error).is_error());
        assert!(!TypeDesc::new(Kind::Record).is_leaf());
    }
}
