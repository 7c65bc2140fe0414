// Trace Emitter
//
// Turns workload operations into trace lines and owns the output sink
// for its whole lifetime: Open -> (appends) -> Closed.
//
// Single writer: every entry point takes `&mut self`, so one emitter is
// driven by one caller at a time. Sharing it across threads requires the
// caller's own synchronization.

use std::io;

use tracing::{debug, info, warn};

use crate::config::{ConfigError, DeletePolicy, TraceConfig};
use crate::key::normalize_key;
use crate::op::{Operation, Token, TraceLine};
use crate::sink::{FileSink, TraceSink};
use crate::synth::synthesize;

/// Lifecycle state of an emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    /// Accepting operations.
    Open,

    /// Flushed and released. Terminal.
    Closed,
}

/// Outcome of a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// One line was appended.
    Ok,

    /// The operation has no representation in the trace grammar.
    /// Nothing was written.
    NotImplemented,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("trace emitter is closed")]
    Closed,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("key `{0}` cannot be written to the trace: empty or contains whitespace")]
    InvalidKey(String),

    #[error("failed to {action} trace output: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: io::Error,
    },
}

impl EmitError {
    fn io(action: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io { action, source }
    }
}

/// Writes one trace line per supported operation.
#[derive(Debug)]
pub struct TraceEmitter<S: TraceSink = FileSink> {
    config: TraceConfig,
    sink: S,
    state: EmitterState,
    lines: u64,
}

impl TraceEmitter<FileSink> {
    /// Truncate or create the configured output file and start emitting.
    ///
    /// The configuration is validated before the file is touched.
    pub fn open(config: TraceConfig) -> Result<Self, EmitError> {
        config.validate()?;
        let sink = FileSink::create(&config.output_path).map_err(EmitError::io("open"))?;
        info!(
            path = %config.output_path.display(),
            encoding = config.value_encoding.as_str(),
            value_bytes = config.value_bytes,
            flush_every = config.flush_every,
            "trace opened"
        );
        Self::with_sink(config, sink)
    }
}

impl<S: TraceSink> TraceEmitter<S> {
    /// Emit into an already opened sink.
    pub fn with_sink(config: TraceConfig, sink: S) -> Result<Self, EmitError> {
        config.validate()?;
        if config.require_single_writer {
            debug!("single-writer mode: operations must be dispatched from one thread");
        }
        Ok(Self {
            config,
            sink,
            state: EmitterState::Open,
            lines: 0,
        })
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn state(&self) -> EmitterState {
        self.state
    }

    /// Lines appended since this emitter was opened.
    pub fn lines_emitted(&self) -> u64 {
        self.lines
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// `GET <key>`
    pub fn on_read(&mut self, key: &str) -> Result<Status, EmitError> {
        self.ensure_open()?;
        let line = TraceLine::get(self.normalize(key)?, self.config.verb_case);
        self.append(&line)
    }

    /// `SET <key> <value>` with a value synthesized under the `insert` domain.
    pub fn on_insert(&mut self, key: &str) -> Result<Status, EmitError> {
        self.write_value("insert", key)
    }

    /// `SET <key> <value>` with a value synthesized under the `update` domain.
    pub fn on_update(&mut self, key: &str) -> Result<Status, EmitError> {
        self.write_value("update", key)
    }

    /// `SET <key> TOMBSTONE`, or not-implemented under [`DeletePolicy::Reject`].
    pub fn on_delete(&mut self, key: &str) -> Result<Status, EmitError> {
        self.ensure_open()?;
        match self.config.delete_policy {
            DeletePolicy::Tombstone => {
                let key = self.normalize(key)?;
                self.append(&TraceLine::set(key, Token::Tombstone, self.config.verb_case))
            }
            DeletePolicy::Reject => {
                warn!(key, "delete rejected by policy");
                Ok(Status::NotImplemented)
            }
        }
    }

    /// Scans have no trace representation and are always refused.
    pub fn on_scan(
        &mut self,
        table: Option<&str>,
        start_key: &str,
        record_count: u64,
    ) -> Result<Status, EmitError> {
        self.ensure_open()?;
        warn!(table, start_key, record_count, "scan not supported by trace grammar");
        Ok(Status::NotImplemented)
    }

    /// Route an operation to its handler.
    pub fn dispatch(&mut self, op: &Operation) -> Result<Status, EmitError> {
        match op {
            Operation::Read { key } => self.on_read(key),
            Operation::Insert { key } => self.on_insert(key),
            Operation::Update { key } => self.on_update(key),
            Operation::Delete { key } => self.on_delete(key),
            Operation::Scan {
                table,
                start_key,
                record_count,
            } => self.on_scan(table.as_deref(), start_key, *record_count),
        }
    }

    /// Flush and release the sink. Must be called once at end of run.
    pub fn shutdown(&mut self) -> Result<(), EmitError> {
        self.ensure_open()?;
        // Closed even if the final flush fails; the sink is unusable either way.
        self.state = EmitterState::Closed;
        self.sink.close().map_err(EmitError::io("close"))?;
        info!(lines = self.lines, "trace closed");
        Ok(())
    }

    fn write_value(&mut self, kind: &str, key: &str) -> Result<Status, EmitError> {
        self.ensure_open()?;
        let trace_key = self.normalize(key)?;
        let bytes = synthesize(self.config.seed, kind, key, self.config.value_bytes);
        let token = Token::Value(self.config.value_encoding.encode(&bytes));
        let line = TraceLine::set(trace_key, token, self.config.verb_case);
        self.append(&line)
    }

    /// Normalized trace key; refused if it would break the line grammar.
    fn normalize(&self, key: &str) -> Result<String, EmitError> {
        let key = normalize_key(key, &self.config.key_prefix);
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(EmitError::InvalidKey(key.into_owned()));
        }
        Ok(key.into_owned())
    }

    fn ensure_open(&self) -> Result<(), EmitError> {
        match self.state {
            EmitterState::Open => Ok(()),
            EmitterState::Closed => Err(EmitError::Closed),
        }
    }

    fn append(&mut self, line: &TraceLine) -> Result<Status, EmitError> {
        self.sink
            .write_line(&line.to_string())
            .map_err(EmitError::io("append to"))?;
        self.lines += 1;

        let every = self.config.flush_every;
        if every > 0 && self.lines % every == 0 {
            self.sink.flush().map_err(EmitError::io("flush"))?;
            debug!(lines = self.lines, "trace flushed");
        }

        Ok(Status::Ok)
    }
}

impl<S: TraceSink> Drop for TraceEmitter<S> {
    fn drop(&mut self) {
        if self.state == EmitterState::Open {
            self.state = EmitterState::Closed;
            if let Err(err) = self.sink.close() {
                warn!(error = %err, lines = self.lines, "failed to close trace on drop");
            }
        }
    }
}
