//! The face→embedding boundary.
//!
//! Embedding extraction is an external capability: the deployment links a
//! backend (ONNX runtime, remote service, ...) and exposes it through
//! [`EmbeddingProvider`]. The engine never looks inside.

use crate::types::DetectedFace;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedding backend failure: {0}")]
    Backend(String),
}

/// Locates faces in an image and extracts one embedding per face.
///
/// A face the backend located but could not embed is simply not returned;
/// callers treat the output as the complete set of usable detections for
/// this image. `Err` means the backend itself failed for the whole image.
pub trait EmbeddingProvider {
    fn embed_faces(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, EmbedderError>;
}
