use std::net::IpAddr;
use std::sync::Arc;

use crate::chain::{DecodeFn, EncodeFn};
use crate::error::Error;
use crate::value::{Kind, TypeDesc, TypedValue, Value};

/// Text into an address field.
///
/// Never fails: text that is not an IP literal decodes to an absent address,
/// so blank or garbled legacy fields still load.
pub fn decode_string_to_ip(next: DecodeFn) -> DecodeFn {
    Arc::new(move |from: Value, to: &TypeDesc| -> Result<Value, Error> {
        if to.kind != Kind::Ip {
            return next(from, to);
        }
        match &from {
            Value::String(text) => Ok(text.parse::<IpAddr>().map_or(Value::Null, Value::Ip)),
            _ => next(from, to),
        }
    })
}

/// Address into its canonical text; an absent address becomes `""`.
pub fn encode_ip_to_string(next: EncodeFn) -> EncodeFn {
    Arc::new(move |source: TypedValue| -> Result<Value, Error> {
        match (&source.value, source.ty.kind) {
            (Value::Ip(ip), _) => Ok(Value::String(ip.to_string())),
            (Value::Null, Kind::Ip) => Ok(Value::String(String::new())),
            _ => next(source),
        }
    })
}
