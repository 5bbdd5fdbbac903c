//! Built-in conversion rules.
//!
//! Every rule comes as a decode/encode pair. A decode rule only acts when the
//! input is text and the target kind is one it supports; an encode rule only
//! acts on the source kinds it supports. Everything else goes to the wrapped
//! continuation untouched.

pub mod duration;
pub mod errors;
pub mod ip;
pub mod numeric;
pub mod time;

pub use duration::{decode_string_to_duration, encode_duration_to_string};
pub use errors::{decode_string_to_error, encode_error_to_string};
pub use ip::{decode_string_to_ip, encode_ip_to_string};
pub use numeric::{decode_string_to_number, encode_number_to_string};
pub use time::{TimeLayout, decode_string_to_time, encode_time_to_string};
