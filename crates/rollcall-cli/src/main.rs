use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::gallery::is_enrollment_image;
use rollcall_core::Identity;
use rollcall_hw::Camera;
use rollcall_session::{AttendanceLog, Config};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance system CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the identities in the enrollment dataset
    Roster {
        /// Dataset root (default: ROLLCALL_DATASET_DIR or ./dataset)
        #[arg(short, long)]
        dataset: Option<PathBuf>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Reinitialize the attendance log (drops all recorded rows)
    Revert {
        /// Attendance file (default: ROLLCALL_ATTENDANCE_FILE or ./attendance.csv)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// List available capture devices
    Devices {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Run camera diagnostics: open the device and grab one frame
    Test {
        /// V4L2 device path (default: ROLLCALL_CAMERA_DEVICE or /dev/video0)
        #[arg(short, long)]
        device: Option<String>,
    },
}

#[derive(Serialize)]
struct RosterRow {
    name: String,
    external_id: String,
    images: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Roster { dataset, json } => {
            let root = dataset.unwrap_or(config.dataset_dir);
            let rows = roster(&root)
                .with_context(|| format!("failed to read dataset at {}", root.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No identities found under {}", root.display());
            } else {
                for row in &rows {
                    println!("{}  ({})  {} image(s)", row.name, row.external_id, row.images);
                }
                println!("{} identities", rows.len());
            }
        }
        Commands::Revert { file } => {
            let path = file.unwrap_or(config.attendance_path);
            AttendanceLog::initialize(&path)
                .with_context(|| format!("failed to reinitialize {}", path.display()))?;
            println!("Attendance log reinitialized: {}", path.display());
        }
        Commands::Devices { json } => {
            let devices = Camera::list_devices();
            if json {
                println!("{}", serde_json::to_string_pretty(&devices)?);
            } else if devices.is_empty() {
                println!("No capture devices found");
            } else {
                for d in &devices {
                    println!("{}  {}  [{}]", d.path, d.name, d.driver);
                }
            }
        }
        Commands::Test { device } => {
            let device = device.unwrap_or(config.camera_device);
            println!("Opening {device}...");
            let camera = Camera::open(&device)
                .with_context(|| format!("failed to open camera at {device}"))?;
            println!(
                "Negotiated {}x{} ({:?})",
                camera.width,
                camera.height,
                camera.pixel_format()
            );

            let frame = camera.capture_frame().context("failed to capture a frame")?;
            println!(
                "Captured frame #{}: {}x{}, avg brightness {:.1}",
                frame.sequence,
                frame.width(),
                frame.height(),
                frame.avg_brightness()
            );
        }
    }

    Ok(())
}

/// Scan the dataset root the same way the gallery loader does, without
/// running the embedding backend: one row per identity folder.
fn roster(root: &Path) -> Result<Vec<RosterRow>> {
    let mut folders: Vec<PathBuf> = std::fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    folders.sort();

    let mut rows = Vec::new();
    for folder in folders {
        let Some(folder_name) = folder.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let identity = Identity::from_folder_name(folder_name);
        let images = std::fs::read_dir(&folder)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_enrollment_image(p))
            .count();
        rows.push(RosterRow {
            name: identity.name,
            external_id: identity.external_id,
            images,
        });
    }
    Ok(rows)
}
