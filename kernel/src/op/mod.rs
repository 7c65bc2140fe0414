// Operations and Trace Lines
//
// Operations are what the workload driver asks for; trace lines are what
// the downstream simulator understands. The trace grammar is:
//
//   line  := verb SP key (SP token)?
//   verb  := GET | SET        (one case throughout a file)
//   token := hex | base64-nopad | TOMBSTONE

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::VerbCase;

/// Sentinel token written for deletes.
pub const TOMBSTONE: &str = "TOMBSTONE";

/// A single request from the workload driver.
///
/// Field values carried by the original request are discarded; only the
/// key matters to the trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    Read { key: String },
    Insert { key: String },
    Update { key: String },
    Delete { key: String },
    Scan {
        table: Option<String>,
        start_key: String,
        record_count: u64,
    },
}

impl Operation {
    /// Lowercase operation name, also used as the synthesizer domain.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Scan { .. } => "scan",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LineError {
    #[error("empty line")]
    Empty,

    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    #[error("unknown verb `{0}`")]
    UnknownVerb(String),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid record count `{0}`")]
    RecordCount(String),

    #[error("unexpected trailing field `{0}`")]
    Trailing(String),

    #[error("SET without a value token")]
    SetWithoutToken,

    #[error("GET with a value token")]
    GetWithToken,
}

/// Parses one workload line: `<op> [<table>] <key> [<name>=<value>...]`.
///
/// Value fields (anything containing `=`) end the positional part and are
/// discarded. With a single positional field the table is omitted. Scan
/// takes `scan [<table>] <start-key> <count>`.
impl FromStr for Operation {
    type Err = LineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        let (op, rest) = fields.split_first().ok_or(LineError::Empty)?;
        let op = op.to_ascii_lowercase();
        let positional = rest.iter().position(|f| f.contains('=')).unwrap_or(rest.len());
        let rest = &rest[..positional];

        if op == "scan" {
            let (table, start_key, count) = match rest {
                [start, count] => (None, *start, *count),
                [table, start, count, ..] => (Some(table.to_string()), *start, *count),
                [_] => return Err(LineError::Missing("record count")),
                [] => return Err(LineError::Missing("key")),
            };
            let record_count = count
                .parse()
                .map_err(|_| LineError::RecordCount(count.to_string()))?;
            return Ok(Self::Scan {
                table,
                start_key: start_key.to_string(),
                record_count,
            });
        }

        let key = match rest {
            [key] => key,
            [_table, key, ..] => key,
            [] => return Err(LineError::Missing("key")),
        }
        .to_string();

        match op.as_str() {
            "read" => Ok(Self::Read { key }),
            "insert" => Ok(Self::Insert { key }),
            "update" => Ok(Self::Update { key }),
            "delete" => Ok(Self::Delete { key }),
            _ => Err(LineError::UnknownOperation(op)),
        }
    }
}

/// Verbs of the trace grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verb {
    Get,
    Set,
}

impl Verb {
    pub fn as_str(&self, case: VerbCase) -> &'static str {
        match (self, case) {
            (Self::Get, VerbCase::Upper) => "GET",
            (Self::Get, VerbCase::Lower) => "get",
            (Self::Set, VerbCase::Upper) => "SET",
            (Self::Set, VerbCase::Lower) => "set",
        }
    }

    fn parse(s: &str) -> Result<(Self, VerbCase), LineError> {
        match s {
            "GET" => Ok((Self::Get, VerbCase::Upper)),
            "get" => Ok((Self::Get, VerbCase::Lower)),
            "SET" => Ok((Self::Set, VerbCase::Upper)),
            "set" => Ok((Self::Set, VerbCase::Lower)),
            other => Err(LineError::UnknownVerb(other.to_string())),
        }
    }
}

/// Value position of a SET line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Value(String),
    Tombstone,
}

impl Token {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Value(v) => v,
            Self::Tombstone => TOMBSTONE,
        }
    }
}

/// One line of the trace, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    pub verb: Verb,
    pub key: String,
    pub token: Option<Token>,
    pub case: VerbCase,
}

impl TraceLine {
    pub fn get(key: impl Into<String>, case: VerbCase) -> Self {
        Self {
            verb: Verb::Get,
            key: key.into(),
            token: None,
            case,
        }
    }

    pub fn set(key: impl Into<String>, token: Token, case: VerbCase) -> Self {
        Self {
            verb: Verb::Set,
            key: key.into(),
            token: Some(token),
            case,
        }
    }

    /// Parse one trace line (without the trailing newline).
    ///
    /// A SET whose token is empty (zero-length value) renders with a
    /// trailing space and parses back as an empty value.
    pub fn parse(line: &str) -> Result<Self, LineError> {
        let mut parts = line.splitn(3, ' ');
        let verb = parts.next().filter(|v| !v.is_empty()).ok_or(LineError::Empty)?;
        let (verb, case) = Verb::parse(verb)?;

        let key = parts
            .next()
            .filter(|k| !k.is_empty())
            .ok_or(LineError::Missing("key"))?;

        let token = match parts.next() {
            None => None,
            Some(t) if t.contains(char::is_whitespace) => {
                return Err(LineError::Trailing(t.to_string()))
            }
            Some(TOMBSTONE) => Some(Token::Tombstone),
            Some(t) => Some(Token::Value(t.to_string())),
        };

        match (verb, &token) {
            (Verb::Get, Some(_)) => return Err(LineError::GetWithToken),
            (Verb::Set, None) => return Err(LineError::SetWithoutToken),
            _ => {}
        }

        Ok(Self {
            verb,
            key: key.to_string(),
            token,
            case,
        })
    }
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb.as_str(self.case), self.key)?;
        if let Some(token) = &self.token {
            write!(f, " {}", token.as_str())?;
        }
        Ok(())
    }
}
