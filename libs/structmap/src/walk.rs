//! Field walker: descends records, resolves keys from tags, and offers every
//! leaf value to the composed conversion function.

use crate::chain::{DecodeFn, EncodeFn};
use crate::error::Error;
use crate::field::Field;
use crate::record::{FieldDef, Record};
use crate::value::{Kind, Map, TypedValue, Value};

/// Encode-side walker. Borrowed from a [`Codec`](crate::Codec) for one call.
pub struct Encoder<'a> {
    tag_name: &'a str,
    convert: &'a EncodeFn,
}

impl<'a> Encoder<'a> {
    pub fn new(tag_name: &'a str, convert: &'a EncodeFn) -> Self {
        Self { tag_name, convert }
    }

    /// Encode one value. Leaves go through the conversion chain, containers
    /// are walked element by element.
    pub fn value<T: Field>(&self, value: &T) -> Result<Value, Error> {
        let ty = T::type_desc();
        let native = value.encode_field(self)?;
        if ty.is_leaf() {
            (self.convert)(TypedValue::new(ty, native))
        } else {
            Ok(native)
        }
    }

    /// Encode a record into a nested map.
    pub fn record<R: Record>(&self, record: &R) -> Result<Value, Error> {
        let mut out = MapEncoder::new(self);
        record.encode_record(&mut out)?;
        Ok(Value::Map(out.finish()))
    }
}

/// Collects the entries of one record while it is encoded.
pub struct MapEncoder<'a> {
    encoder: &'a Encoder<'a>,
    out: Map,
}

impl<'a> MapEncoder<'a> {
    pub fn new(encoder: &'a Encoder<'a>) -> Self {
        Self {
            encoder,
            out: Map::new(),
        }
    }

    pub fn field<T: Field>(&mut self, def: &FieldDef, value: &T) -> Result<(), Error> {
        let Some(tag) = def.tag(self.encoder.tag_name) else {
            return Ok(());
        };
        let encoded = self.encoder.value(value).map_err(|e| e.at(tag.key))?;
        if tag.omitempty && encoded.is_zero() {
            return Ok(());
        }
        self.out.insert(tag.key.to_string(), encoded);
        Ok(())
    }

    /// Flatten an embedded record into this map.
    pub fn squash<R: Record>(&mut self, record: &R) -> Result<(), Error> {
        tracing::trace!("squash embedded record");
        record.encode_record(self)
    }

    pub fn finish(self) -> Map {
        self.out
    }
}

/// Decode-side walker. Borrowed from a [`Codec`](crate::Codec) for one call.
pub struct Decoder<'a> {
    tag_name: &'a str,
    convert: &'a DecodeFn,
}

impl<'a> Decoder<'a> {
    pub fn new(tag_name: &'a str, convert: &'a DecodeFn) -> Self {
        Self { tag_name, convert }
    }

    /// Decode one value into `T`.
    ///
    /// Null input yields the zero value without consulting the chain. Leaves
    /// are converted first and the default coercion applies to the result.
    pub fn value<T: Field>(&self, value: Value) -> Result<T, Error> {
        if value.is_null() {
            return T::decode_field(Value::Null, self);
        }
        let ty = T::type_desc();
        let value = if ty.is_leaf() {
            (self.convert)(value, &ty)?
        } else {
            value
        };
        T::decode_field(value, self)
    }

    /// Decode a record from a map. Null decodes from an empty map.
    pub fn record<R: Record>(&self, value: Value) -> Result<R, Error> {
        let input = match value {
            Value::Map(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(Error::Mismatch {
                    expected: Kind::Record,
                    found: other.kind_name(),
                });
            }
        };
        let mut input = MapDecoder::new(self, input);
        R::decode_record(&mut input)
    }
}

/// Source map of one record while it is decoded.
///
/// Unknown keys are ignored; missing keys decode as null.
pub struct MapDecoder<'a> {
    decoder: &'a Decoder<'a>,
    input: Map,
}

impl<'a> MapDecoder<'a> {
    pub fn new(decoder: &'a Decoder<'a>, input: Map) -> Self {
        Self { decoder, input }
    }

    pub fn field<T: Field>(&mut self, def: &FieldDef) -> Result<T, Error> {
        let Some(tag) = def.tag(self.decoder.tag_name) else {
            return self.decoder.value(Value::Null);
        };
        let raw = self.input.get(tag.key).cloned().unwrap_or(Value::Null);
        self.decoder.value(raw).map_err(|e| e.at(tag.key))
    }

    /// Decode an embedded record from this record's own namespace.
    pub fn squash<R: Record>(&mut self) -> Result<R, Error> {
        tracing::trace!("squash embedded record");
        R::decode_record(self)
    }
}
