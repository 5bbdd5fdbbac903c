use std::path::Path;

use serde::Deserialize;

use crate::chain::{DecodeRule, EncodeRule, decode_rule, encode_rule};
use crate::codec::Codec;
use crate::error::Error;
use crate::rules::{self, TimeLayout};

/// Built-in rule selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleName {
    Number,
    Error,
    Time,
    Duration,
    Ip,
}

impl RuleName {
    pub fn decode_rule(self, layout: &TimeLayout) -> DecodeRule {
        match self {
            RuleName::Number => decode_rule(rules::decode_string_to_number),
            RuleName::Error => decode_rule(rules::decode_string_to_error),
            RuleName::Time => decode_rule(rules::decode_string_to_time(layout.clone())),
            RuleName::Duration => decode_rule(rules::decode_string_to_duration),
            RuleName::Ip => decode_rule(rules::decode_string_to_ip),
        }
    }

    pub fn encode_rule(self, layout: &TimeLayout) -> EncodeRule {
        match self {
            RuleName::Number => encode_rule(rules::encode_number_to_string),
            RuleName::Error => encode_rule(rules::encode_error_to_string),
            RuleName::Time => encode_rule(rules::encode_time_to_string(layout.clone())),
            RuleName::Duration => encode_rule(rules::encode_duration_to_string),
            RuleName::Ip => encode_rule(rules::encode_ip_to_string),
        }
    }
}

/// Codec configuration, parsed from TOML.
///
/// ```toml
/// tag_name = "json"
/// time_layout = "rfc3339"
/// decode = ["error", "time", "duration", "ip", "number"]
/// encode = ["error", "time", "duration", "ip"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodecConfig {
    #[serde(default = "default_tag_name")]
    pub tag_name: String,

    /// Layout shared by the `time` rules in both directions.
    #[serde(default)]
    pub time_layout: TimeLayout,

    /// Decode rules, highest priority first.
    #[serde(default)]
    pub decode: Vec<RuleName>,

    /// Encode rules, highest priority first.
    #[serde(default)]
    pub encode: Vec<RuleName>,
}

fn default_tag_name() -> String {
    Codec::DEFAULT_TAG_NAME.to_string()
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            tag_name: default_tag_name(),
            time_layout: TimeLayout::default(),
            decode: Vec::new(),
            encode: Vec::new(),
        }
    }
}

impl CodecConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, Error> {
        toml::from_str(toml_str).map_err(|e| Error::config(e.to_string()))
    }
}

/// Every built-in rule, in the order `Codec::standard` registers them.
pub const STANDARD_RULES: [RuleName; 5] = [
    RuleName::Error,
    RuleName::Time,
    RuleName::Duration,
    RuleName::Ip,
    RuleName::Number,
];

impl Codec {
    /// Build a codec from configuration. Fails on an empty tag name or an
    /// invalid time layout.
    pub fn from_config(config: &CodecConfig) -> Result<Self, Error> {
        if config.tag_name.trim().is_empty() {
            return Err(Error::config("tag name must not be empty"));
        }
        config.time_layout.validate()?;

        let layout = &config.time_layout;
        let codec = Codec::new()
            .tag_name(config.tag_name.clone())
            .decode_hooks(config.decode.iter().map(|rule| rule.decode_rule(layout)))
            .encode_hooks(config.encode.iter().map(|rule| rule.encode_rule(layout)));
        tracing::debug!(?codec, "codec built from config");
        Ok(codec)
    }

    /// Codec with every built-in rule pair registered.
    pub fn standard(layout: TimeLayout) -> Self {
        Codec::new()
            .decode_hooks(STANDARD_RULES.iter().map(|rule| rule.decode_rule(&layout)))
            .encode_hooks(STANDARD_RULES.iter().map(|rule| rule.encode_rule(&layout)))
    }
}
