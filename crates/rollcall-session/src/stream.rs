//! The outgoing frame stream.
//!
//! A session produces a lazy, effectively infinite sequence of multipart
//! chunks, one JPEG-encoded annotated frame per chunk, suitable for
//! `multipart/x-mixed-replace` consumers. The stream is pull-based: the
//! consumer drives pacing, and dropping the stream (or exhausting the
//! capture source) releases the capture device and the session slot.

use crate::pipeline::{FramePipeline, PipelineError};
use crate::session::SessionGuard;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use rollcall_core::{AttendanceSink, EmbeddingProvider};
use rollcall_hw::FrameSource;
use thiserror::Error;

/// Boundary marker between frames in the multipart stream.
pub const FRAME_BOUNDARY: &str = "frame";

#[derive(Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("jpeg encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Encode one frame as JPEG at the given quality.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(image)?;
    Ok(buf)
}

/// Wrap one JPEG payload in its multipart framing:
/// `--frame\r\nContent-Type: image/jpeg\r\n\r\n<payload>\r\n`.
pub fn multipart_chunk(jpeg: &[u8]) -> Vec<u8> {
    let header = format!("--{FRAME_BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n");
    let mut chunk = Vec::with_capacity(header.len() + jpeg.len() + 2);
    chunk.extend_from_slice(header.as_bytes());
    chunk.extend_from_slice(jpeg);
    chunk.extend_from_slice(b"\r\n");
    chunk
}

/// Pull-based iterator over a session's multipart chunks.
///
/// Not restartable: once the capture source reports end-of-stream (or a
/// fatal pipeline error is yielded), the source and the session slot are
/// released immediately and the iterator stays exhausted. Dropping the
/// iterator mid-stream has the same effect.
pub struct SessionStream<F, E, S> {
    source: Option<F>,
    pipeline: FramePipeline<E, S>,
    jpeg_quality: u8,
    guard: Option<SessionGuard>,
    frames: u64,
}

impl<F, E, S> SessionStream<F, E, S>
where
    F: FrameSource,
    E: EmbeddingProvider,
    S: AttendanceSink,
{
    pub(crate) fn new(
        source: F,
        pipeline: FramePipeline<E, S>,
        jpeg_quality: u8,
        guard: SessionGuard,
    ) -> Self {
        Self {
            source: Some(source),
            pipeline,
            jpeg_quality,
            guard: Some(guard),
            frames: 0,
        }
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames
    }

    /// Identities marked present so far in this session.
    pub fn present_count(&self) -> usize {
        self.pipeline.attendance().present_count()
    }

    /// Release the capture source and the session slot now. Idempotent;
    /// also runs implicitly on source exhaustion, fatal error, and drop.
    fn release(&mut self) {
        if let Some(guard) = self.guard.take() {
            tracing::info!(
                session = %guard.id(),
                frames = self.frames,
                present = self.present_count(),
                "session stream closed"
            );
        }
        self.source = None;
    }
}

impl<F, E, S> Iterator for SessionStream<F, E, S>
where
    F: FrameSource,
    E: EmbeddingProvider,
    S: AttendanceSink,
{
    type Item = Result<Vec<u8>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        let source = self.source.as_mut()?;

        let Some(mut frame) = source.next_frame() else {
            self.release();
            return None;
        };

        if let Err(err) = self.pipeline.process(&mut frame) {
            self.release();
            return Some(Err(err.into()));
        }

        match encode_jpeg(&frame.image, self.jpeg_quality) {
            Ok(jpeg) => {
                self.frames += 1;
                Some(Ok(multipart_chunk(&jpeg)))
            }
            Err(err) => {
                self.release();
                Some(Err(err.into()))
            }
        }
    }
}
