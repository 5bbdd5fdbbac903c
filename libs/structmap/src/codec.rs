use std::fmt;

use crate::chain::{
    DecodeFn, DecodeRule, EncodeFn, EncodeRule, compose, decode_rule, encode_rule,
    identity_decode, identity_encode,
};
use crate::error::Error;
use crate::field::Field;
use crate::record::FieldDef;
use crate::value::{Kind, Value};
use crate::walk::{Decoder, Encoder, MapEncoder};

/// Single-field record used to encode a bare (non-record) value.
const WRAP_FIELD: FieldDef = FieldDef::new("In");

/// Reusable record/map codec.
///
/// Built once with a tag name and ordered decode/encode rules, then shared
/// across any number of `decode`/`encode` calls. Holds no per-call state.
///
/// ```ignore
/// let codec = Codec::new()
///     .decode_hook(rules::decode_string_to_error)
///     .decode_hook(rules::decode_string_to_time(TimeLayout::Rfc3339))
///     .encode_hook(rules::encode_error_to_string);
/// let user: User = codec.decode(input)?;
/// ```
#[derive(Clone)]
pub struct Codec {
    tag_name: String,
    decode_rules: Vec<DecodeRule>,
    encode_rules: Vec<EncodeRule>,
    decode_fn: DecodeFn,
    encode_fn: EncodeFn,
}

impl Codec {
    pub const DEFAULT_TAG_NAME: &'static str = "structmap";

    pub fn new() -> Self {
        Self {
            tag_name: Self::DEFAULT_TAG_NAME.to_string(),
            decode_rules: Vec::new(),
            encode_rules: Vec::new(),
            decode_fn: identity_decode(),
            encode_fn: identity_encode(),
        }
    }

    /// Tag name used to resolve field keys (`#[tag(<name> = "...")]`).
    pub fn tag_name(mut self, name: impl Into<String>) -> Self {
        self.tag_name = name.into();
        self
    }

    /// Append one decode rule after the ones already registered.
    pub fn decode_hook<R>(self, rule: R) -> Self
    where
        R: Fn(DecodeFn) -> DecodeFn + Send + Sync + 'static,
    {
        self.decode_hooks([decode_rule(rule)])
    }

    /// Append decode rules in order and rebuild the whole decode chain.
    pub fn decode_hooks<I>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = DecodeRule>,
    {
        let before = self.decode_rules.len();
        self.decode_rules.extend(rules);
        if self.decode_rules.len() > before {
            self.decode_fn = compose(&self.decode_rules, identity_decode());
            tracing::debug!(rules = self.decode_rules.len(), "decode chain rebuilt");
        }
        self
    }

    /// Append one encode rule after the ones already registered.
    pub fn encode_hook<R>(self, rule: R) -> Self
    where
        R: Fn(EncodeFn) -> EncodeFn + Send + Sync + 'static,
    {
        self.encode_hooks([encode_rule(rule)])
    }

    /// Append encode rules in order and rebuild the whole encode chain.
    pub fn encode_hooks<I>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = EncodeRule>,
    {
        let before = self.encode_rules.len();
        self.encode_rules.extend(rules);
        if self.encode_rules.len() > before {
            self.encode_fn = compose(&self.encode_rules, identity_encode());
            tracing::debug!(rules = self.encode_rules.len(), "encode chain rebuilt");
        }
        self
    }

    /// The composed decode function handed to the field walker.
    pub fn decode_fn(&self) -> &DecodeFn {
        &self.decode_fn
    }

    /// The composed encode function handed to the field walker.
    pub fn encode_fn(&self) -> &EncodeFn {
        &self.encode_fn
    }

    fn check(&self) -> Result<(), Error> {
        if self.tag_name.trim().is_empty() {
            return Err(Error::config("tag name must not be empty"));
        }
        Ok(())
    }

    /// Decode `input` into a `T`.
    ///
    /// Records need a map; any other target decodes the bare value
    /// (`"2s"` into a `TimeDelta`).
    pub fn decode<T: Field>(&self, input: Value) -> Result<T, Error> {
        self.check()?;
        let ty = T::type_desc();
        if ty.kind == Kind::Record && !matches!(input, Value::Map(_) | Value::Null) {
            return Err(Error::config(format!(
                "cannot decode {} into a record, expected a map",
                input.kind_name()
            )));
        }
        tracing::trace!(tag = %self.tag_name, ty = %ty, "decode");

        Decoder::new(&self.tag_name, &self.decode_fn).value(input)
    }

    /// Decode into an existing value. Null input leaves `out` untouched.
    pub fn decode_into<T: Field>(&self, input: Value, out: &mut T) -> Result<(), Error> {
        if input.is_null() {
            return self.check();
        }
        *out = self.decode(input)?;
        Ok(())
    }

    /// Encode `input` into a map, or into a bare value when `input` is not a
    /// record.
    pub fn encode<T: Field>(&self, input: &T) -> Result<Value, Error> {
        self.check()?;
        let ty = T::type_desc();
        tracing::trace!(tag = %self.tag_name, ty = %ty, "encode");

        let encoder = Encoder::new(&self.tag_name, &self.encode_fn);
        if ty.kind == Kind::Record {
            return encoder.value(input);
        }

        // Wrap the bare value in a one-field record and unwrap the single entry.
        let mut wrapped = MapEncoder::new(&encoder);
        wrapped
            .field(&WRAP_FIELD, input)
            .map_err(|e| e.strip_root(WRAP_FIELD.name))?;
        Ok(wrapped.finish().into_values().next().unwrap_or(Value::Null))
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("tag_name", &self.tag_name)
            .field("decode_rules", &self.decode_rules.len())
            .field("encode_rules", &self.encode_rules.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;

    use super::*;
    use crate::rules::{
        decode_string_to_duration, decode_string_to_number, encode_duration_to_string,
        encode_number_to_string,
    };
    use crate::value::{TypeDesc, TypedValue};

    fn constant(text: &'static str) -> DecodeRule {
        decode_rule(move |next: DecodeFn| -> DecodeFn {
            Arc::new(move |from: Value, to: &TypeDesc| -> Result<Value, Error> {
                match from {
                    Value::String(_) if to.kind == Kind::String => Ok(Value::from(text)),
                    other => next(other, to),
                }
            })
        })
    }

    #[test]
    fn first_rule_wins_across_calls() {
        let codec = Codec::new()
            .decode_hooks([constant("r1")])
            .decode_hooks([constant("r2")]);
        assert_eq!(codec.decode::<String>(Value::from("x")).unwrap(), "r1");
    }

    #[test]
    fn cumulative_registration_matches_single_call() {
        let split = Codec::new()
            .decode_hooks([constant("r1")])
            .decode_hooks([constant("r2")]);
        let joined = Codec::new().decode_hooks([constant("r1"), constant("r2")]);

        let ty = TypeDesc::new(Kind::String);
        for input in [Value::from("x"), Value::I32(3), Value::Null] {
            assert_eq!(
                split.decode_fn()(input.clone(), &ty).unwrap(),
                joined.decode_fn()(input, &ty).unwrap()
            );
        }
    }

    #[test]
    fn empty_append_keeps_chain() {
        let codec = Codec::new()
            .decode_hooks([constant("r1")])
            .decode_hooks(std::iter::empty());
        assert_eq!(codec.decode::<String>(Value::from("x")).unwrap(), "r1");
    }

    #[test]
    fn identity_without_rules() {
        let codec = Codec::new();
        assert_eq!(codec.decode::<String>(Value::from("x")).unwrap(), "x");
        let typed = TypedValue::new(TypeDesc::new(Kind::I8), Value::I8(1));
        assert_eq!(codec.encode_fn()(typed).unwrap(), Value::I8(1));
    }

    #[test]
    fn bare_duration_is_symmetric() {
        let codec = Codec::new()
            .decode_hook(decode_string_to_duration)
            .encode_hook(encode_duration_to_string);

        assert_eq!(
            codec.encode(&TimeDelta::seconds(2)).unwrap(),
            Value::from("2s")
        );
        let d: TimeDelta = codec.decode(Value::from("2s")).unwrap();
        assert_eq!(d.num_nanoseconds(), Some(2_000_000_000));
    }

    #[test]
    fn bare_value_errors_are_not_wrapped() {
        let codec = Codec::new().decode_hook(decode_string_to_number);
        let err = codec.decode::<u8>(Value::from("999")).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));

        let fail = encode_rule(|_next: EncodeFn| -> EncodeFn {
            Arc::new(|_: TypedValue| -> Result<Value, Error> { Err(Error::custom("nope")) })
        });
        let codec = Codec::new().encode_hooks([fail]);
        assert!(matches!(codec.encode(&1u8).unwrap_err(), Error::Custom(_)));
    }

    #[test]
    fn bare_list_is_encoded_elementwise() {
        let codec = Codec::new().encode_hook(encode_number_to_string);
        let out = codec.encode(&vec![1u16, 2]).unwrap();
        assert_eq!(out, Value::List(vec![Value::from("1"), Value::from("2")]));
    }

    #[test]
    fn empty_tag_name_is_a_config_error() {
        let codec = Codec::new().tag_name("");
        assert!(matches!(
            codec.decode::<String>(Value::from("x")).unwrap_err(),
            Error::Config(_)
        ));
        assert!(matches!(codec.encode(&1u8).unwrap_err(), Error::Config(_)));
    }

    #[test]
    fn decode_into_ignores_null() {
        let codec = Codec::new();
        let mut out = 7u32;
        codec.decode_into(Value::Null, &mut out).unwrap();
        assert_eq!(out, 7);
        codec.decode_into(Value::U32(9), &mut out).unwrap();
        assert_eq!(out, 9);
    }

    #[test]
    fn shared_across_threads() {
        let codec = Codec::new()
            .decode_hook(decode_string_to_number)
            .encode_hook(encode_number_to_string);

        std::thread::scope(|s| {
            for i in 0..4i64 {
                let codec = &codec;
                s.spawn(move || {
                    for j in 0..100 {
                        let n = i * 1000 + j;
                        let text = codec.encode(&n).unwrap();
                        assert_eq!(codec.decode::<i64>(text).unwrap(), n);
                    }
                });
            }
        });
    }
}
