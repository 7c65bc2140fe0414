// Trace Configuration
//
// Immutable settings supplied once by the caller at startup. Settings
// arrive as a flat key/value map (properties style) and are validated
// here, before any output file is touched.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::encoding::ValueEncoding;

pub const KEY_FILE: &str = "tbtrace.file";
pub const KEY_PREFIX: &str = "tbtrace.keyprefix";
pub const KEY_VALUE_BYTES: &str = "tbtrace.value.bytes";
pub const KEY_VALUE_ENCODING: &str = "tbtrace.value.encoding";
pub const KEY_VALUE_SEED: &str = "tbtrace.value.seed";
pub const KEY_OPCASE: &str = "tbtrace.opcase";
pub const KEY_FLUSH_EVERY: &str = "tbtrace.flush.every";
pub const KEY_REQUIRE_SINGLE: &str = "tbtrace.threads.require1";
pub const KEY_DELETE: &str = "tbtrace.delete";

pub const DEFAULT_KEY_PREFIX: &str = "user";
pub const DEFAULT_VALUE_BYTES: usize = 4096;
pub const DEFAULT_SEED: i64 = 1337;
pub const DEFAULT_FLUSH_EVERY: u64 = 10_000;

/// Letter case applied to every verb in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbCase {
    #[default]
    Upper,
    Lower,
}

impl VerbCase {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "upper" => Some(Self::Upper),
            "lower" => Some(Self::Lower),
            _ => None,
        }
    }
}

/// How delete requests are represented in the trace.
///
/// The downstream grammar has no delete verb.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Emit `SET <key> TOMBSTONE`.
    #[default]
    Tombstone,

    /// Refuse the request with a not-implemented status; nothing is written.
    Reject,
}

impl DeletePolicy {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tombstone" => Some(Self::Tombstone),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("setting `{key}` must be {expected}, got `{value}`")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("properties line {line}: expected `key=value`, got `{text}`")]
    Malformed { line: usize, text: String },
}

/// Validated trace configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceConfig {
    pub output_path: PathBuf,
    pub key_prefix: String,
    pub value_bytes: usize,
    pub value_encoding: ValueEncoding,
    pub seed: i64,
    pub verb_case: VerbCase,
    /// Flush after every N lines; 0 disables periodic flushing.
    pub flush_every: u64,
    /// Advisory: the caller must drive the emitter from one thread.
    pub require_single_writer: bool,
    pub delete_policy: DeletePolicy,
}

impl TraceConfig {
    /// Configuration with every optional setting at its default.
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            key_prefix: DEFAULT_KEY_PREFIX.into(),
            value_bytes: DEFAULT_VALUE_BYTES,
            value_encoding: ValueEncoding::Hex,
            seed: DEFAULT_SEED,
            verb_case: VerbCase::Upper,
            flush_every: DEFAULT_FLUSH_EVERY,
            require_single_writer: true,
            delete_policy: DeletePolicy::Tombstone,
        }
    }

    /// Build a configuration from `tbtrace.*` settings.
    ///
    /// Unknown keys are ignored so the same map can carry settings
    /// meant for the workload driver.
    pub fn from_settings(settings: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| settings.get(key).map(|v| v.trim());

        let output_path = match get(KEY_FILE) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => return Err(ConfigError::Missing(KEY_FILE)),
        };

        let mut config = Self::new(output_path);

        if let Some(prefix) = get(KEY_PREFIX) {
            config.key_prefix = prefix.to_string();
        }

        if let Some(raw) = get(KEY_VALUE_BYTES) {
            config.value_bytes = match raw.parse::<i64>() {
                Ok(n) if n > 0 => usize::try_from(n)
                    .map_err(|_| invalid(KEY_VALUE_BYTES, "a positive integer", raw))?,
                _ => return Err(invalid(KEY_VALUE_BYTES, "a positive integer", raw)),
            };
        }

        if let Some(raw) = get(KEY_VALUE_ENCODING) {
            config.value_encoding = ValueEncoding::parse(raw)
                .ok_or_else(|| invalid(KEY_VALUE_ENCODING, "`hex` or `base64`", raw))?;
        }

        if let Some(raw) = get(KEY_VALUE_SEED) {
            config.seed = raw
                .parse()
                .map_err(|_| invalid(KEY_VALUE_SEED, "a 64-bit integer", raw))?;
        }

        if let Some(raw) = get(KEY_OPCASE) {
            config.verb_case =
                VerbCase::parse(raw).ok_or_else(|| invalid(KEY_OPCASE, "`upper` or `lower`", raw))?;
        }

        if let Some(raw) = get(KEY_FLUSH_EVERY) {
            config.flush_every = raw
                .parse()
                .map_err(|_| invalid(KEY_FLUSH_EVERY, "a non-negative integer", raw))?;
        }

        if let Some(raw) = get(KEY_REQUIRE_SINGLE) {
            config.require_single_writer = match raw.to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => return Err(invalid(KEY_REQUIRE_SINGLE, "`true` or `false`", raw)),
            };
        }

        if let Some(raw) = get(KEY_DELETE) {
            config.delete_policy = DeletePolicy::parse(raw)
                .ok_or_else(|| invalid(KEY_DELETE, "`tombstone` or `reject`", raw))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the constraints the trace grammar depends on.
    ///
    /// Fields are public, so configurations assembled by hand are
    /// re-checked by the emitter before it writes anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.value_bytes == 0 {
            return Err(invalid(KEY_VALUE_BYTES, "a positive integer", "0"));
        }
        if self.key_prefix.contains(char::is_whitespace) {
            return Err(invalid(KEY_PREFIX, "free of whitespace", &self.key_prefix));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        expected,
        value: value.to_string(),
    }
}

/// Parse properties-file text into a settings map.
///
/// Accepts `key=value` and `key: value`; `#` and `!` start comment lines.
/// Later duplicates win.
pub fn parse_properties(text: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut settings = BTreeMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let Some(split) = line.find(['=', ':']) else {
            return Err(ConfigError::Malformed {
                line: idx + 1,
                text: line.to_string(),
            });
        };

        let key = line[..split].trim();
        if key.is_empty() {
            return Err(ConfigError::Malformed {
                line: idx + 1,
                text: line.to_string(),
            });
        }
        let value = line[split + 1..].trim();
        settings.insert(key.to_string(), value.to_string());
    }

    Ok(settings)
}
