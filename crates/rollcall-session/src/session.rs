//! Session lifecycle: the start/stop/revert control surface.
//!
//! One capture/matching session may run at a time. The caller (the UI
//! layer outside this workspace) opens the capture device, supplies the
//! embedding backend, and consumes the returned chunk stream; dropping the
//! stream is "stop". Reverting the attendance log is only valid between
//! sessions.

use crate::config::{
    DEFAULT_DETECT_INTERVAL, DEFAULT_DOWNSCALE_DIVISOR, DEFAULT_JPEG_QUALITY,
    DEFAULT_MATCH_TOLERANCE,
};
use crate::ledger::AttendanceLog;
use crate::pipeline::FramePipeline;
use crate::stream::SessionStream;
use rollcall_core::{EmbeddingProvider, Gallery};
use rollcall_hw::FrameSource;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("a session is already running")]
    AlreadyRunning,
    #[error("cannot revert the attendance log while a session is running")]
    RevertWhileRunning,
    #[error("attendance log: {0}")]
    Ledger(#[from] std::io::Error),
}

/// Per-session tuning knobs. Defaults mirror the service configuration.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub match_tolerance: f32,
    pub downscale_divisor: u32,
    pub detect_interval: u32,
    pub jpeg_quality: u8,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            match_tolerance: DEFAULT_MATCH_TOLERANCE,
            downscale_divisor: DEFAULT_DOWNSCALE_DIVISOR,
            detect_interval: DEFAULT_DETECT_INTERVAL,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Claims the single active-session slot for as long as it lives.
pub struct SessionGuard {
    active: Arc<AtomicBool>,
    id: Uuid,
}

impl SessionGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        tracing::info!(session = %self.id, "session slot released");
    }
}

/// Owns the single-session policy and the attendance log location.
pub struct SessionController {
    active: Arc<AtomicBool>,
    log_path: PathBuf,
}

impl SessionController {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            log_path: log_path.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start a session over an already-open capture source.
    ///
    /// Opening the capture device is the caller's step, so a device that
    /// cannot be opened fails before any session state exists. A second
    /// concurrent start is rejected; the slot frees again when the
    /// returned stream ends or is dropped. The attendance state starts
    /// all-Absent; the log keeps rows from earlier sessions (revert is a
    /// separate, explicit operation).
    pub fn start<F, E>(
        &self,
        gallery: Arc<Gallery>,
        source: F,
        embedder: E,
        options: SessionOptions,
    ) -> Result<SessionStream<F, E, AttendanceLog>, SessionError>
    where
        F: FrameSource,
        E: EmbeddingProvider,
    {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SessionError::AlreadyRunning);
        }

        // The slot is claimed; every failure below must give it back.
        let ledger = match AttendanceLog::open_or_create(&self.log_path) {
            Ok(ledger) => ledger,
            Err(err) => {
                self.active.store(false, Ordering::SeqCst);
                return Err(err.into());
            }
        };

        let id = Uuid::new_v4();
        tracing::info!(
            session = %id,
            roster = gallery.roster().len(),
            entries = gallery.len(),
            tolerance = options.match_tolerance,
            "session started"
        );

        let pipeline = FramePipeline::new(
            gallery,
            embedder,
            ledger,
            options.match_tolerance,
            options.downscale_divisor,
            options.detect_interval,
        );
        let guard = SessionGuard {
            active: Arc::clone(&self.active),
            id,
        };

        Ok(SessionStream::new(
            source,
            pipeline,
            options.jpeg_quality,
            guard,
        ))
    }

    /// Truncate the attendance log back to its header. Rejected while a
    /// session is writing.
    pub fn revert(&self) -> Result<(), SessionError> {
        if self.is_active() {
            return Err(SessionError::RevertWhileRunning);
        }
        AttendanceLog::open_or_create(&self.log_path)?.reset()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LOG_HEADER;
    use image::RgbImage;
    use rollcall_core::{
        BoundingBox, DetectedFace, EmbedderError, Embedding, GalleryEntry, Identity,
    };
    use rollcall_hw::RgbFrame;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    struct ScriptedSource {
        frames: VecDeque<RgbFrame>,
    }

    impl ScriptedSource {
        fn of(count: usize) -> Self {
            let frames = (0..count)
                .map(|i| RgbFrame {
                    image: RgbImage::new(64, 48),
                    sequence: i as u32,
                    timestamp: std::time::Instant::now(),
                })
                .collect();
            Self { frames }
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Option<RgbFrame> {
            self.frames.pop_front()
        }
    }

    /// Always sees one face at a fixed embedding.
    struct ConstantEmbedder {
        value: f32,
    }

    impl EmbeddingProvider for ConstantEmbedder {
        fn embed_faces(&mut self, _image: &RgbImage) -> Result<Vec<DetectedFace>, EmbedderError> {
            Ok(vec![DetectedFace {
                location: BoundingBox { top: 2, right: 12, bottom: 12, left: 2 },
                embedding: Embedding::new(vec![self.value]),
            }])
        }
    }

    fn gallery() -> Arc<Gallery> {
        Arc::new(Gallery::from_entries(vec![GalleryEntry {
            identity: Identity::from_folder_name("Alice_1XX22CS001"),
            embedding: Embedding::new(vec![0.0]),
        }]))
    }

    fn scratch_log(label: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "rollcall-session-{label}-{}.csv",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn session_emits_chunks_then_ends_and_frees_the_slot() {
        let path = scratch_log("emit");
        let controller = SessionController::new(&path);

        let mut stream = controller
            .start(
                gallery(),
                ScriptedSource::of(4),
                ConstantEmbedder { value: 0.1 },
                SessionOptions::default(),
            )
            .unwrap();
        assert!(controller.is_active());

        let chunks: Vec<_> = stream.by_ref().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(chunks.len(), 4);
        assert!(chunks[0].starts_with(b"--frame\r\n"));

        // Exhaustion released the slot before the stream value is dropped.
        assert!(!controller.is_active());
        assert_eq!(stream.present_count(), 1);

        // Exactly one Present row for Alice across four matching frames.
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("Alice,1XX22CS001,Present,"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn concurrent_start_is_rejected_until_the_stream_is_dropped() {
        let path = scratch_log("concurrent");
        let controller = SessionController::new(&path);

        let stream = controller
            .start(
                gallery(),
                ScriptedSource::of(100),
                ConstantEmbedder { value: 0.1 },
                SessionOptions::default(),
            )
            .unwrap();

        assert!(matches!(
            controller.start(
                gallery(),
                ScriptedSource::of(1),
                ConstantEmbedder { value: 0.1 },
                SessionOptions::default(),
            ),
            Err(SessionError::AlreadyRunning)
        ));

        // Dropping the stream mid-session is "stop": slot frees, next
        // session gets fresh all-Absent state.
        drop(stream);
        assert!(!controller.is_active());
        assert!(controller
            .start(
                gallery(),
                ScriptedSource::of(1),
                ConstantEmbedder { value: 0.1 },
                SessionOptions::default(),
            )
            .is_ok());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unknown_faces_leave_the_log_header_only() {
        let path = scratch_log("unknown");
        let controller = SessionController::new(&path);

        let stream = controller
            .start(
                gallery(),
                ScriptedSource::of(3),
                // Distance 0.41 from Alice: outside tolerance.
                ConstantEmbedder { value: 0.41 },
                SessionOptions::default(),
            )
            .unwrap();
        let chunks: Vec<_> = stream.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(chunks.len(), 3);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, format!("{LOG_HEADER}\n"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn revert_is_rejected_while_running_and_truncates_after() {
        let path = scratch_log("revert");
        let controller = SessionController::new(&path);

        let mut stream = controller
            .start(
                gallery(),
                ScriptedSource::of(2),
                ConstantEmbedder { value: 0.1 },
                SessionOptions::default(),
            )
            .unwrap();
        let _ = stream.next();

        assert!(matches!(
            controller.revert(),
            Err(SessionError::RevertWhileRunning)
        ));

        // Drain the session; the Alice row is on disk.
        for chunk in stream.by_ref() {
            chunk.unwrap();
        }
        assert_eq!(
            std::fs::read_to_string(&path).unwrap().lines().count(),
            2
        );

        controller.revert().unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("{LOG_HEADER}\n")
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn sessions_append_to_the_same_log_until_revert() {
        let path = scratch_log("two-sessions");
        let controller = SessionController::new(&path);

        for _ in 0..2 {
            let stream = controller
                .start(
                    gallery(),
                    ScriptedSource::of(2),
                    ConstantEmbedder { value: 0.1 },
                    SessionOptions::default(),
                )
                .unwrap();
            stream.collect::<Result<Vec<_>, _>>().unwrap();
        }

        // Each session re-arms the in-memory state, so Alice appears once
        // per session in the durable log.
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        std::fs::remove_file(&path).unwrap();
    }
}
