use crate::session::SessionOptions;
use std::path::PathBuf;

pub const DEFAULT_MATCH_TOLERANCE: f32 = 0.4;
pub const DEFAULT_DOWNSCALE_DIVISOR: u32 = 4;
pub const DEFAULT_DETECT_INTERVAL: u32 = 2;
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Service configuration, loaded from environment variables.
pub struct Config {
    /// Dataset root with one folder per identity.
    pub dataset_dir: PathBuf,
    /// Attendance CSV path.
    pub attendance_path: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Maximum embedding distance for a candidate match.
    pub match_tolerance: f32,
    /// Spatial downscale divisor applied before detection (4 = 0.25x).
    pub downscale_divisor: u32,
    /// Detection runs on every Nth captured frame.
    pub detect_interval: u32,
    /// JPEG quality for the outgoing frame stream.
    pub jpeg_quality: u8,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with
    /// defaults. Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self {
            dataset_dir: std::env::var("ROLLCALL_DATASET_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("dataset")),
            attendance_path: std::env::var("ROLLCALL_ATTENDANCE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("attendance.csv")),
            camera_device: std::env::var("ROLLCALL_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            match_tolerance: env_f32("ROLLCALL_MATCH_TOLERANCE", DEFAULT_MATCH_TOLERANCE),
            downscale_divisor: env_u32("ROLLCALL_DOWNSCALE_DIVISOR", DEFAULT_DOWNSCALE_DIVISOR),
            detect_interval: env_u32("ROLLCALL_DETECT_INTERVAL", DEFAULT_DETECT_INTERVAL),
            jpeg_quality: env_u8("ROLLCALL_JPEG_QUALITY", DEFAULT_JPEG_QUALITY),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            match_tolerance: self.match_tolerance,
            downscale_divisor: self.downscale_divisor,
            detect_interval: self.detect_interval,
            jpeg_quality: self.jpeg_quality,
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u8(key: &str, default: u8) -> u8 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_falls_back_to_default() {
        assert_eq!(env_f32("ROLLCALL_TEST_UNSET_F32", 0.4), 0.4);
        assert_eq!(env_u32("ROLLCALL_TEST_UNSET_U32", 4), 4);
    }

    #[test]
    fn unparseable_value_falls_back_to_default() {
        std::env::set_var("ROLLCALL_TEST_BAD_F32", "not-a-number");
        assert_eq!(env_f32("ROLLCALL_TEST_BAD_F32", 0.4), 0.4);
    }

    #[test]
    fn set_value_is_parsed() {
        std::env::set_var("ROLLCALL_TEST_GOOD_U32", "8");
        assert_eq!(env_u32("ROLLCALL_TEST_GOOD_U32", 4), 8);
    }
}
