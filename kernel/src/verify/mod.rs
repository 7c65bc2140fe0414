// Trace Verification
//
// Checks that an existing trace obeys the line grammar and the
// whole-file rules the emitter guarantees:
// - one verb case throughout the file
// - every synthesized value token has the same length

use std::io::BufRead;

use serde::Serialize;

use crate::config::VerbCase;
use crate::op::{LineError, Token, TraceLine, Verb};

/// Counts gathered while verifying a trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraceSummary {
    pub lines: u64,
    pub gets: u64,
    pub sets: u64,
    pub tombstones: u64,
    pub verb_case: Option<VerbCase>,
    pub value_token_len: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("line {line}: {source}")]
    Grammar {
        line: u64,
        #[source]
        source: LineError,
    },

    #[error("line {line}: verb case {found:?} differs from {expected:?}")]
    MixedCase {
        line: u64,
        expected: VerbCase,
        found: VerbCase,
    },

    #[error("line {line}: value token length {found} differs from {expected}")]
    TokenLength {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),
}

/// Verify every line of `reader`, stopping at the first violation.
pub fn verify_trace<R: BufRead>(reader: R) -> Result<TraceSummary, VerifyError> {
    let mut summary = TraceSummary::default();

    for (idx, text) in reader.lines().enumerate() {
        let text = text?;
        let line = idx as u64 + 1;
        let parsed =
            TraceLine::parse(&text).map_err(|source| VerifyError::Grammar { line, source })?;

        match summary.verb_case {
            None => summary.verb_case = Some(parsed.case),
            Some(expected) if expected != parsed.case => {
                return Err(VerifyError::MixedCase {
                    line,
                    expected,
                    found: parsed.case,
                })
            }
            Some(_) => {}
        }

        match (parsed.verb, &parsed.token) {
            (Verb::Get, _) => summary.gets += 1,
            (Verb::Set, Some(Token::Tombstone)) => {
                summary.sets += 1;
                summary.tombstones += 1;
            }
            (Verb::Set, Some(Token::Value(value))) => {
                summary.sets += 1;
                match summary.value_token_len {
                    None => summary.value_token_len = Some(value.len()),
                    Some(expected) if expected != value.len() => {
                        return Err(VerifyError::TokenLength {
                            line,
                            expected,
                            found: value.len(),
                        })
                    }
                    Some(_) => {}
                }
            }
            (Verb::Set, None) => summary.sets += 1,
        }

        summary.lines = line;
    }

    Ok(summary)
}
