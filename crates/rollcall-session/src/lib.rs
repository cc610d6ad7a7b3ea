//! rollcall-session — One capture-to-output attendance session.
//!
//! Wires the pieces from `rollcall-core` and `rollcall-hw` into the
//! sequential per-session pipeline: pull frame → downscale → detect/match
//! on cadence → track transitions (synchronously persisted) → annotate →
//! JPEG-encode → multipart chunk. The HTTP/UI layer that consumes the
//! chunk stream and drives start/stop/revert lives outside this workspace.

pub mod annotate;
pub mod config;
pub mod ledger;
pub mod pipeline;
pub mod session;
pub mod stream;

pub use annotate::LabeledDetection;
pub use config::Config;
pub use ledger::{AttendanceLog, AttendanceRecord};
pub use pipeline::{FramePipeline, FrameSummary, PipelineError};
pub use session::{SessionController, SessionError, SessionOptions};
pub use stream::{SessionStream, StreamError};
