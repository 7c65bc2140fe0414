// Treebeard Trace Kernel
//
// Deterministic transcoding of key-value workload operations into the
// GET/SET trace grammar consumed by the Treebeard simulator.

pub mod config;
pub mod emitter;
pub mod encoding;
pub mod key;
pub mod op;
pub mod sink;
pub mod synth;
pub mod verify;

pub use config::{ConfigError, DeletePolicy, TraceConfig, VerbCase};
pub use emitter::{EmitError, EmitterState, Status, TraceEmitter};
pub use encoding::ValueEncoding;
pub use op::{Operation, TraceLine};
