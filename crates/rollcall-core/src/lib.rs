//! rollcall-core — Face-matching attendance engine.
//!
//! Matches detected face embeddings against a session-immutable gallery of
//! known identities and tracks the one-time Absent→Present transition per
//! identity. Embedding extraction itself is behind the
//! [`EmbeddingProvider`] trait and supplied by the deployment.

pub mod cadence;
pub mod embedder;
pub mod gallery;
pub mod matcher;
pub mod tracker;
pub mod types;

pub use cadence::DetectionCadence;
pub use embedder::{EmbedderError, EmbeddingProvider};
pub use gallery::{Gallery, GalleryEntry};
pub use matcher::{EuclideanMatcher, MatchOutcome, Matcher};
pub use tracker::{AttendanceSink, AttendanceState, Presence};
pub use types::{BoundingBox, DetectedFace, Embedding, Identity};
