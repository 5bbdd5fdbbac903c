// Lets `#[derive(Record)]` output (`::structmap::...`) resolve inside this crate.
extern crate self as structmap;

pub mod chain;
pub mod codec;
pub mod config;
pub mod error;
pub mod field;
pub mod record;
pub mod rules;
pub mod value;
pub mod walk;

pub use chain::{DecodeFn, DecodeRule, EncodeFn, EncodeRule, decode_rule, encode_rule};
pub use codec::Codec;
pub use config::{CodecConfig, RuleName};
pub use error::Error;
pub use field::Field;
pub use record::{FieldDef, Record};
pub use rules::TimeLayout;
pub use structmap_derive::Record;
pub use value::{DynError, ErrorMessage, Kind, Map, TypeDesc, TypedValue, Value};
