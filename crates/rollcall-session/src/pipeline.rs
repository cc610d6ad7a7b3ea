//! The per-frame processing step of a session.
//!
//! Each captured frame either runs detection (on cadence) or reuses the
//! previous detections; either way the full-resolution frame is annotated
//! before encoding. Detections are carried between frames as an explicit
//! value, not loop-crossing mutable flags.

use crate::annotate::{annotate_frame, LabeledDetection};
use image::imageops::FilterType;
use image::RgbImage;
use rollcall_core::{
    AttendanceSink, AttendanceState, DetectionCadence, EmbeddingProvider, EuclideanMatcher,
    Gallery, MatchOutcome, Matcher,
};
use rollcall_hw::RgbFrame;
use std::sync::Arc;
use thiserror::Error;

/// Label shown for faces that resolve to no gallery identity.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The attendance log append failed. The transition was rolled back;
    /// continuing would silently drop records, so this ends the session.
    #[error("attendance log write failed: {0}")]
    Ledger(#[from] std::io::Error),
}

/// What one frame cycle did, for callers that surface progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSummary {
    pub ran_detection: bool,
    pub faces: usize,
    pub transitions: usize,
}

/// Sequential detect → match → track → annotate pipeline for one session.
pub struct FramePipeline<E, S> {
    gallery: Arc<Gallery>,
    embedder: E,
    ledger: S,
    matcher: EuclideanMatcher,
    tolerance: f32,
    downscale: u32,
    cadence: DetectionCadence,
    attendance: AttendanceState,
    /// Detections from the last processed frame, reused verbatim on
    /// skipped frames (coordinates stay in detection space).
    carried: Vec<LabeledDetection>,
}

impl<E: EmbeddingProvider, S: AttendanceSink> FramePipeline<E, S> {
    pub fn new(
        gallery: Arc<Gallery>,
        embedder: E,
        ledger: S,
        tolerance: f32,
        downscale: u32,
        detect_interval: u32,
    ) -> Self {
        let attendance = AttendanceState::for_gallery(&gallery);
        Self {
            gallery,
            embedder,
            ledger,
            matcher: EuclideanMatcher,
            tolerance,
            downscale: downscale.max(1),
            cadence: DetectionCadence::every(detect_interval),
            attendance,
            carried: Vec::new(),
        }
    }

    /// Process one captured frame in place: detect/match on cadence, apply
    /// attendance transitions, annotate at full resolution.
    pub fn process(&mut self, frame: &mut RgbFrame) -> Result<FrameSummary, PipelineError> {
        let ran_detection = self.cadence.advance();
        let mut transitions = 0usize;

        if ran_detection {
            let small = downscale(&frame.image, self.downscale);
            let faces = match self.embedder.embed_faces(&small) {
                Ok(faces) => faces,
                Err(err) => {
                    // One bad frame never aborts the session.
                    tracing::warn!(
                        sequence = frame.sequence,
                        error = %err,
                        "embedding provider failed, skipping frame detections"
                    );
                    Vec::new()
                }
            };

            let mut labeled = Vec::with_capacity(faces.len());
            for face in &faces {
                let label = match self.matcher.find(&face.embedding, &self.gallery, self.tolerance)
                {
                    MatchOutcome::Known { index, distance } => match self.gallery.get(index) {
                        Some(entry) => {
                            tracing::debug!(
                                name = %entry.identity.name,
                                distance,
                                "face matched"
                            );
                            if self
                                .attendance
                                .observe_match(&entry.identity, &mut self.ledger)?
                            {
                                transitions += 1;
                            }
                            entry.identity.name.clone()
                        }
                        None => UNKNOWN_LABEL.to_string(),
                    },
                    MatchOutcome::Unknown => UNKNOWN_LABEL.to_string(),
                };
                labeled.push(LabeledDetection {
                    location: face.location,
                    label,
                });
            }
            self.carried = labeled;
        }

        annotate_frame(&mut frame.image, &self.carried, self.downscale);

        Ok(FrameSummary {
            ran_detection,
            faces: self.carried.len(),
            transitions,
        })
    }

    pub fn attendance(&self) -> &AttendanceState {
        &self.attendance
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }
}

fn downscale(image: &RgbImage, divisor: u32) -> RgbImage {
    if divisor <= 1 {
        return image.clone();
    }
    let width = (image.width() / divisor).max(1);
    let height = (image.height() / divisor).max(1);
    image::imageops::resize(image, width, height, FilterType::Triangle)
}
