use std::fmt::Write as _;
use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};
use serde::Deserialize;

use crate::chain::{DecodeFn, EncodeFn};
use crate::error::Error;
use crate::value::{Kind, TypeDesc, TypedValue, Value};

/// Layout used to read and write timestamps as text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum TimeLayout {
    /// `2021-09-29T00:00:00Z`; UTC is written as `Z`, fractional seconds
    /// are kept in groups of three digits.
    #[default]
    Rfc3339,
    /// `Wed, 29 Sep 2021 00:00:00 +0000`.
    Rfc2822,
    /// A strftime pattern. Without an offset the text is read as UTC.
    Custom(String),
}

impl TimeLayout {
    pub fn custom(pattern: impl Into<String>) -> Self {
        TimeLayout::Custom(pattern.into())
    }

    /// Reject strftime patterns chrono cannot format.
    pub fn validate(&self) -> Result<(), Error> {
        if let TimeLayout::Custom(pattern) = self {
            if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                return Err(Error::config(format!("invalid time layout {pattern:?}")));
            }
        }
        Ok(())
    }

    pub fn parse(&self, text: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
        match self {
            TimeLayout::Rfc3339 => DateTime::parse_from_rfc3339(text),
            TimeLayout::Rfc2822 => DateTime::parse_from_rfc2822(text),
            TimeLayout::Custom(pattern) => {
                DateTime::parse_from_str(text, pattern).or_else(|err| {
                    if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
                        return Ok(naive.and_utc().fixed_offset());
                    }
                    NaiveDate::parse_from_str(text, pattern)
                        .map(|date| date.and_time(NaiveTime::MIN).and_utc().fixed_offset())
                        .map_err(|_| err)
                })
            }
        }
    }

    pub fn format(&self, ts: &DateTime<FixedOffset>) -> Result<String, Error> {
        match self {
            TimeLayout::Rfc3339 => Ok(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            TimeLayout::Rfc2822 => Ok(ts.to_rfc2822()),
            TimeLayout::Custom(pattern) => {
                let mut out = String::new();
                write!(out, "{}", ts.format(pattern))
                    .map_err(|_| Error::config(format!("invalid time layout {pattern:?}")))?;
                Ok(out)
            }
        }
    }
}

impl From<&str> for TimeLayout {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "rfc3339" => TimeLayout::Rfc3339,
            "rfc2822" => TimeLayout::Rfc2822,
            _ => TimeLayout::Custom(s.to_string()),
        }
    }
}

impl From<String> for TimeLayout {
    fn from(s: String) -> Self {
        TimeLayout::from(s.as_str())
    }
}

/// Text into a timestamp field, plain or optional, read with `layout`.
pub fn decode_string_to_time(
    layout: TimeLayout,
) -> impl Fn(DecodeFn) -> DecodeFn + Send + Sync + 'static {
    move |next: DecodeFn| -> DecodeFn {
        let layout = layout.clone();
        Arc::new(move |from: Value, to: &TypeDesc| -> Result<Value, Error> {
            if to.kind != Kind::Timestamp {
                return next(from, to);
            }
            match &from {
                Value::String(text) => layout
                    .parse(text)
                    .map(Value::Timestamp)
                    .map_err(|source| Error::Timestamp {
                        text: text.clone(),
                        source,
                    }),
                _ => next(from, to),
            }
        })
    }
}

/// Timestamp into text written with `layout`. An absent optional timestamp
/// becomes `""`.
pub fn encode_time_to_string(
    layout: TimeLayout,
) -> impl Fn(EncodeFn) -> EncodeFn + Send + Sync + 'static {
    move |next: EncodeFn| -> EncodeFn {
        let layout = layout.clone();
        Arc::new(move |source: TypedValue| -> Result<Value, Error> {
            match (&source.value, source.ty.kind) {
                (Value::Timestamp(ts), _) => layout.format(ts).map(Value::String),
                (Value::Null, Kind::Timestamp) => Ok(Value::String(String::new())),
                _ => next(source),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{identity_decode, identity_encode};

    const TS: TypeDesc = TypeDesc::new(Kind::Timestamp);

    #[test]
    fn rfc3339_round_trip() {
        let f = decode_string_to_time(TimeLayout::Rfc3339)(identity_decode());
        let g = encode_time_to_string(TimeLayout::Rfc3339)(identity_encode());

        let decoded = f(Value::from("2021-09-29T00:00:00Z"), &TS).unwrap();
        let encoded = g(TypedValue::new(TS, decoded)).unwrap();
        assert_eq!(encoded, Value::from("2021-09-29T00:00:00Z"));
    }

    #[test]
    fn keeps_offset() {
        let f = decode_string_to_time(TimeLayout::Rfc3339)(identity_decode());
        let g = encode_time_to_string(TimeLayout::Rfc3339)(identity_encode());

        let decoded = f(Value::from("2021-09-29T10:30:00+02:00"), &TS.optional()).unwrap();
        let encoded = g(TypedValue::new(TS.optional(), decoded)).unwrap();
        assert_eq!(encoded, Value::from("2021-09-29T10:30:00+02:00"));
    }

    #[test]
    fn rfc3339_keeps_fractional_seconds() {
        let g = encode_time_to_string(TimeLayout::Rfc3339)(identity_encode());
        let ts = DateTime::parse_from_rfc3339("2021-09-29T00:00:00.25Z").unwrap();
        let encoded = g(TypedValue::new(TS, Value::Timestamp(ts))).unwrap();
        assert_eq!(encoded, Value::from("2021-09-29T00:00:00.250Z"));
    }

    #[test]
    fn custom_layout_without_offset_is_utc() {
        let layout = TimeLayout::custom("%Y-%m-%d %H:%M");
        let ts = layout.parse("2021-09-29 08:15").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 0);
        assert_eq!(layout.format(&ts).unwrap(), "2021-09-29 08:15");

        let date_only = TimeLayout::custom("%Y-%m-%d").parse("2021-09-29").unwrap();
        assert_eq!(
            date_only.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            "2021-09-29T00:00:00Z"
        );
    }

    #[test]
    fn parse_failure_surfaces_parser_error() {
        let f = decode_string_to_time(TimeLayout::Rfc3339)(identity_decode());
        let err = f(Value::from("yesterday"), &TS).unwrap_err();
        assert!(matches!(err, Error::Timestamp { ref text, .. } if text == "yesterday"));
    }

    #[test]
    fn absent_optional_encodes_empty() {
        let g = encode_time_to_string(TimeLayout::Rfc3339)(identity_encode());
        assert_eq!(g(TypedValue::new(TS.optional(), Value::Null)).unwrap(), Value::from(""));
    }

    #[test]
    fn layout_names() {
        assert_eq!(TimeLayout::from("RFC3339"), TimeLayout::Rfc3339);
        assert_eq!(TimeLayout::from("rfc2822"), TimeLayout::Rfc2822);
        assert_eq!(TimeLayout::from("%d/%m/%Y"), TimeLayout::custom("%d/%m/%Y"));
        assert!(TimeLayout::custom("%Q").validate().is_err());
        assert!(TimeLayout::custom("%Y").validate().is_ok());
    }

    #[test]
    fn non_text_input_is_delegated() {
        let f = decode_string_to_time(TimeLayout::Rfc3339)(identity_decode());
        assert_eq!(f(Value::I64(5), &TS).unwrap(), Value::I64(5));
    }
}
