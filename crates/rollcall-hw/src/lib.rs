//! rollcall-hw — Hardware abstraction for camera capture.
//!
//! Provides V4L2-based camera access producing RGB frames, and the
//! [`FrameSource`] pull boundary the session pipeline consumes.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, CameraStream, PixelFormat};
pub use frame::{FrameSource, RgbFrame};
