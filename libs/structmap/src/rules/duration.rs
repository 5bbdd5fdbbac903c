use std::sync::Arc;

use chrono::TimeDelta;

use crate::chain::{DecodeFn, EncodeFn};
use crate::error::Error;
use crate::value::{Kind, TypeDesc, TypedValue, Value};

const NANOSECOND: u64 = 1;
const MICROSECOND: u64 = 1_000 * NANOSECOND;
const MILLISECOND: u64 = 1_000 * MICROSECOND;
const SECOND: u64 = 1_000 * MILLISECOND;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;

/// Text such as `"2s"`, `"1h30m"` or `"-1.5ms"` into a duration field.
pub fn decode_string_to_duration(next: DecodeFn) -> DecodeFn {
    Arc::new(move |from: Value, to: &TypeDesc| -> Result<Value, Error> {
        if to.kind != Kind::Duration {
            return next(from, to);
        }
        match &from {
            Value::String(text) => parse_duration(text).map(Value::Duration),
            _ => next(from, to),
        }
    })
}

/// Duration into its short form (`"2s"`, `"1h30m0s"`). An absent optional
/// duration becomes `""`.
pub fn encode_duration_to_string(next: EncodeFn) -> EncodeFn {
    Arc::new(move |source: TypedValue| -> Result<Value, Error> {
        match (&source.value, source.ty.kind) {
            (Value::Duration(d), _) => Ok(Value::String(format_duration(*d))),
            (Value::Null, Kind::Duration) => Ok(Value::String(String::new())),
            _ => next(source),
        }
    })
}

fn unit_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(NANOSECOND),
        // Micro sign and Greek mu are both accepted.
        "us" | "\u{00b5}s" | "\u{03bc}s" => Some(MICROSECOND),
        "ms" => Some(MILLISECOND),
        "s" => Some(SECOND),
        "m" => Some(MINUTE),
        "h" => Some(HOUR),
        _ => None,
    }
}

/// Parse a signed sequence of decimal numbers, each with optional fraction
/// and a unit suffix. Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`.
pub fn parse_duration(text: &str) -> Result<TimeDelta, Error> {
    let invalid = |reason: &'static str| Error::Duration {
        text: text.to_string(),
        reason,
    };

    let mut s = text;
    let mut negative = false;
    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    if s == "0" {
        return Ok(TimeDelta::zero());
    }
    if s.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total: u64 = 0;
    while !s.is_empty() {
        if !s.starts_with(|c: char| c == '.' || c.is_ascii_digit()) {
            return Err(invalid("expected a number"));
        }

        let int_len = s.bytes().take_while(u8::is_ascii_digit).count();
        let mut value: u64 = 0;
        for b in s[..int_len].bytes() {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(b - b'0')))
                .filter(|v| *v <= 1 << 63)
                .ok_or_else(|| invalid("overflow"))?;
        }
        s = &s[int_len..];

        let mut fraction: u64 = 0;
        let mut scale: f64 = 1.0;
        let mut has_fraction = false;
        if let Some(rest) = s.strip_prefix('.') {
            let frac_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            let mut overflowed = false;
            for b in rest[..frac_len].bytes() {
                if overflowed {
                    continue;
                }
                match fraction
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(u64::from(b - b'0')))
                    .filter(|v| *v <= 1 << 63)
                {
                    Some(v) => {
                        fraction = v;
                        scale *= 10.0;
                    }
                    // Digits past the representable precision are dropped.
                    None => overflowed = true,
                }
            }
            has_fraction = frac_len > 0;
            s = &rest[frac_len..];
        }
        if int_len == 0 && !has_fraction {
            return Err(invalid("expected a number"));
        }

        let unit_len = s
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(s.len());
        if unit_len == 0 {
            return Err(invalid("missing unit"));
        }
        let unit = unit_nanos(&s[..unit_len]).ok_or_else(|| invalid("unknown unit"))?;
        s = &s[unit_len..];

        let mut nanos = value
            .checked_mul(unit)
            .filter(|v| *v <= 1 << 63)
            .ok_or_else(|| invalid("overflow"))?;
        if fraction > 0 {
            nanos = nanos
                .checked_add((fraction as f64 * (unit as f64 / scale)) as u64)
                .filter(|v| *v <= 1 << 63)
                .ok_or_else(|| invalid("overflow"))?;
        }
        total = total
            .checked_add(nanos)
            .filter(|v| *v <= 1 << 63)
            .ok_or_else(|| invalid("overflow"))?;
    }

    let nanos = if negative {
        if total == 1 << 63 {
            i64::MIN
        } else {
            -(total as i64)
        }
    } else {
        i64::try_from(total).map_err(|_| invalid("overflow"))?
    };
    Ok(TimeDelta::nanoseconds(nanos))
}

/// Short textual form: `"72h3m0.5s"`, `"1.5µs"`, `"0s"`.
///
/// Durations beyond the `i64` nanosecond range saturate.
pub fn format_duration(d: TimeDelta) -> String {
    let nanos = d.num_nanoseconds().unwrap_or(if d < TimeDelta::zero() {
        i64::MIN
    } else {
        i64::MAX
    });
    let negative = nanos < 0;
    let u = nanos.unsigned_abs();

    let mut out = String::new();
    if negative {
        out.push('-');
    }

    if u < SECOND {
        let (prec, unit) = match u {
            0 => return "0s".to_string(),
            u if u < MICROSECOND => (0, "ns"),
            u if u < MILLISECOND => (3, "\u{00b5}s"),
            _ => (6, "ms"),
        };
        let (int, frac) = split_fraction(u, prec);
        out.push_str(&format!("{int}{frac}{unit}"));
        return out;
    }

    let (secs, frac) = split_fraction(u, 9);
    let hours = secs / 3600;
    let minutes = secs / 60 % 60;
    let seconds = secs % 60;
    if hours > 0 {
        out.push_str(&format!("{hours}h{minutes}m"));
    } else if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&format!("{seconds}{frac}s"));
    out
}

/// Split `v` into `v / 10^prec` and the fractional digits without trailing
/// zeros (empty when the fraction is zero).
fn split_fraction(v: u64, prec: u32) -> (u64, String) {
    let scale = 10u64.pow(prec);
    let frac = v % scale;
    if frac == 0 {
        return (v / scale, String::new());
    }
    let digits = format!("{frac:0width$}", width = prec as usize);
    (v / scale, format!(".{}", digits.trim_end_matches('0')))
}
