use crate::error::Error;
use crate::field::Field;
use crate::walk::{MapDecoder, MapEncoder};

/// A struct whose fields map to keys of a [`Map`](crate::value::Map).
///
/// Implemented by `#[derive(Record)]`; the derive also implements [`Field`]
/// so records nest inside other records, lists and options.
pub trait Record: Field {
    fn encode_record(&self, out: &mut MapEncoder<'_>) -> Result<(), Error>;
    fn decode_record(input: &mut MapDecoder<'_>) -> Result<Self, Error>;
}

/// Static description of one record field.
///
/// `tags` holds `(tag name, tag value)` pairs, e.g. `("json", "id,omitempty")`.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub tags: &'static [(&'static str, &'static str)],
}

/// Resolved tag for one field under the codec's tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    pub key: &'a str,
    pub omitempty: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str) -> Self {
        Self { name, tags: &[] }
    }

    /// Resolve the map key for `tag_name`.
    ///
    /// Returns `None` for fields tagged `-`. A missing tag or an empty key
    /// falls back to the field name.
    pub fn tag(&self, tag_name: &str) -> Option<Tag<'static>> {
        let raw = self
            .tags
            .iter()
            .find(|(name, _)| *name == tag_name)
            .map(|(_, value)| *value)
            .unwrap_or("");

        let mut parts = raw.split(',');
        let key = parts.next().unwrap_or("").trim();
        if key == "-" {
            return None;
        }
        Some(Tag {
            key: if key.is_empty() { self.name } else { key },
            omitempty: parts.any(|opt| opt.trim() == "omitempty"),
        })
    }
}
