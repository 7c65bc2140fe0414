// Token Encoding
//
// Turns synthesized value bytes into a single whitespace-free token
// that fits the trace line grammar.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Textual encoding applied to synthesized values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueEncoding {
    /// Lowercase hex, two characters per byte.
    #[default]
    Hex,

    /// Standard base64 alphabet with padding stripped.
    Base64,
}

impl ValueEncoding {
    /// Parse a configured encoding name (`hex` or `base64`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "hex" => Some(Self::Hex),
            "base64" => Some(Self::Base64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hex => "hex",
            Self::Base64 => "base64",
        }
    }

    /// Encode `bytes` as one token.
    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Hex => hex::encode(bytes),
            Self::Base64 => STANDARD_NO_PAD.encode(bytes),
        }
    }
}
