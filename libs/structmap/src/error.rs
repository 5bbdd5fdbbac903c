use std::fmt;

use crate::value::Kind;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by every decode and encode call.
///
/// The first error aborts the call; there is no partial result.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The codec or its configuration is unusable. Nothing was decoded.
    #[error("config error: {0}")]
    Config(String),

    #[error("cannot parse {text:?} as {kind}: {source}")]
    Parse {
        text: String,
        kind: Kind,
        #[source]
        source: BoxError,
    },

    #[error("cannot parse timestamp {text:?}: {source}")]
    Timestamp {
        text: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid duration {text:?}: {reason}")]
    Duration { text: String, reason: &'static str },

    #[error("expected {expected}, found {found}")]
    Mismatch { expected: Kind, found: &'static str },

    #[error("value {value} out of range for {kind}")]
    Overflow { kind: Kind, value: String },

    /// An error raised while converting the field at `path`.
    #[error("field '{path}': {source}")]
    Field {
        path: String,
        #[source]
        source: Box<Error>,
    },

    /// Raised by user-supplied rules.
    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn custom(msg: impl fmt::Display) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Prepend `segment` to the field path of this error.
    ///
    /// Produces `"outer.inner"` for named segments and `"list[2]"` for
    /// index segments.
    pub fn at(self, segment: &str) -> Self {
        match self {
            Error::Field { path, source } => {
                let path = if path.starts_with('[') {
                    format!("{segment}{path}")
                } else {
                    format!("{segment}.{path}")
                };
                Error::Field { path, source }
            }
            other => Error::Field {
                path: segment.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Remove a leading `segment` from the field path, unwrapping the error
    /// entirely when nothing else remains.
    pub(crate) fn strip_root(self, segment: &str) -> Self {
        match self {
            Error::Field { path, source } if path == segment => *source,
            Error::Field { path, source } => match path.strip_prefix(segment) {
                Some(rest) if rest.starts_with('[') => Error::Field {
                    path: rest.to_string(),
                    source,
                },
                Some(rest) if rest.starts_with('.') => Error::Field {
                    path: rest[1..].to_string(),
                    source,
                },
                _ => Error::Field { path, source },
            },
            other => other,
        }
    }

    /// The innermost error, below any field wrapping.
    pub fn root(&self) -> &Error {
        match self {
            Error::Field { source, .. } => source.root(),
            other => other,
        }
    }

    /// Dotted path of the failing field, if the error is field-scoped.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::Field { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_paths_join() {
        let err = Error::custom("boom").at("[2]").at("items").at("outer");
        assert_eq!(err.path(), Some("outer.items[2]"));
        assert!(matches!(err.root(), Error::Custom(msg) if msg == "boom"));
        assert_eq!(err.to_string(), "field 'outer.items[2]': boom");
    }

    #[test]
    fn strip_root_unwraps_synthetic_field() {
        let err = Error::custom("boom").at("In");
        assert!(matches!(err.strip_root("In"), Error::Custom(_)));

        let err = Error::custom("boom").at("[0]").at("In");
        assert_eq!(err.strip_root("In").path(), Some("[0]"));

        let err = Error::custom("boom").at("x").at("In");
        assert_eq!(err.strip_root("In").path(), Some("x"));
    }
}
