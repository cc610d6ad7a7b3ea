//! The known-identity gallery and its dataset loader.
//!
//! Layout on disk: `datasetRoot/<Name>[_<ExternalID>]/*.{jpg,png}`, one
//! folder per identity, one or more enrollment images per folder. The
//! loader runs once before a session starts; the gallery never changes
//! afterwards.

use crate::embedder::EmbeddingProvider;
use crate::types::{Embedding, Identity};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("dataset root not found: {0}")]
    RootNotFound(PathBuf),
    #[error("failed to read dataset directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One reference embedding and the identity it belongs to.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub identity: Identity,
    pub embedding: Embedding,
}

/// Ordered set of (identity, reference embedding) pairs. The index position
/// is the matching key; entries are never removed or reordered once loaded.
#[derive(Debug, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn from_entries(entries: Vec<GalleryEntry>) -> Self {
        Self { entries }
    }

    /// Build the gallery by walking the dataset root.
    ///
    /// Folders and files are visited in sorted order so gallery indices are
    /// deterministic across runs. Per-image failures (undecodable file, no
    /// face found, backend error) are logged and skipped; only the first
    /// face returned for an image is enrolled. An empty dataset yields an
    /// empty, usable gallery.
    pub fn load(
        root: &Path,
        provider: &mut dyn EmbeddingProvider,
    ) -> Result<Gallery, GalleryError> {
        if !root.is_dir() {
            return Err(GalleryError::RootNotFound(root.to_path_buf()));
        }

        tracing::info!(root = %root.display(), "loading identity gallery");

        let mut folders: Vec<PathBuf> = std::fs::read_dir(root)
            .map_err(|source| GalleryError::ReadDir {
                path: root.to_path_buf(),
                source,
            })?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        folders.sort();

        let mut entries = Vec::new();

        for folder in &folders {
            let Some(folder_name) = folder.file_name().and_then(|n| n.to_str()) else {
                tracing::warn!(path = %folder.display(), "skipping non-UTF-8 folder name");
                continue;
            };
            let identity = Identity::from_folder_name(folder_name);

            let mut images = match enrollment_images(folder) {
                Ok(images) => images,
                Err(err) => {
                    tracing::warn!(
                        path = %folder.display(),
                        error = %err,
                        "skipping unreadable identity folder"
                    );
                    continue;
                }
            };
            images.sort();

            for image_path in &images {
                let image = match image::open(image_path) {
                    Ok(img) => img.to_rgb8(),
                    Err(err) => {
                        tracing::warn!(
                            path = %image_path.display(),
                            error = %err,
                            "skipping undecodable enrollment image"
                        );
                        continue;
                    }
                };

                let faces = match provider.embed_faces(&image) {
                    Ok(faces) => faces,
                    Err(err) => {
                        tracing::warn!(
                            path = %image_path.display(),
                            error = %err,
                            "skipping enrollment image: embedding failed"
                        );
                        continue;
                    }
                };

                // First face wins when an enrollment image contains several.
                match faces.into_iter().next() {
                    Some(face) => {
                        tracing::info!(
                            name = %identity.name,
                            external_id = %identity.external_id,
                            file = %image_path.display(),
                            "enrolled reference embedding"
                        );
                        entries.push(GalleryEntry {
                            identity: identity.clone(),
                            embedding: face.embedding,
                        });
                    }
                    None => {
                        tracing::warn!(
                            path = %image_path.display(),
                            "no face found in enrollment image, skipping"
                        );
                    }
                }
            }
        }

        let gallery = Gallery { entries };
        if gallery.is_empty() {
            tracing::warn!("gallery is empty: every probe will resolve to Unknown");
        } else {
            tracing::info!(
                entries = gallery.len(),
                identities = gallery.roster().len(),
                "gallery loaded"
            );
        }
        Ok(gallery)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&GalleryEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    /// Distinct identities in first-loaded order. Several entries may map
    /// to one identity (one entry per enrollment image).
    pub fn roster(&self) -> Vec<&Identity> {
        let mut seen = Vec::new();
        let mut roster: Vec<&Identity> = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.identity.name.as_str()) {
                seen.push(entry.identity.name.as_str());
                roster.push(&entry.identity);
            }
        }
        roster
    }
}

fn enrollment_images(folder: &Path) -> io::Result<Vec<PathBuf>> {
    Ok(std::fs::read_dir(folder)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_enrollment_image(p))
        .collect())
}

/// True for the image formats accepted as enrollment input (.jpg / .png,
/// case-insensitive).
pub fn is_enrollment_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            e == "jpg" || e == "png"
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::EmbedderError;
    use crate::types::{BoundingBox, DetectedFace};
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    /// Embeds each image as its mean RGB; all-black images "contain no face".
    struct ColorProvider;

    impl EmbeddingProvider for ColorProvider {
        fn embed_faces(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, EmbedderError> {
            let n = (image.width() * image.height()) as f32;
            let mut sums = [0.0f32; 3];
            for p in image.pixels() {
                for c in 0..3 {
                    sums[c] += p.0[c] as f32;
                }
            }
            let mean = [sums[0] / n, sums[1] / n, sums[2] / n];
            if mean.iter().all(|&c| c < 1.0) {
                return Ok(vec![]);
            }
            Ok(vec![DetectedFace {
                location: BoundingBox { top: 0, right: 2, bottom: 2, left: 0 },
                embedding: Embedding::new(mean.to_vec()),
            }])
        }
    }

    fn scratch_dataset(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "rollcall-gallery-{label}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_image(path: &Path, color: [u8; 3]) {
        let img = RgbImage::from_pixel(4, 4, Rgb(color));
        img.save(path).unwrap();
    }

    #[test]
    fn loads_identities_from_folder_layout() {
        let root = scratch_dataset("layout");
        let alice = root.join("Alice_1XX22CS001");
        let bob = root.join("Bob");
        std::fs::create_dir(&alice).unwrap();
        std::fs::create_dir(&bob).unwrap();
        write_image(&alice.join("a.png"), [200, 0, 0]);
        write_image(&alice.join("b.png"), [180, 0, 0]);
        write_image(&bob.join("face.jpg"), [0, 200, 0]);

        let gallery = Gallery::load(&root, &mut ColorProvider).unwrap();

        // Two Alice entries (one per image), one Bob entry.
        assert_eq!(gallery.len(), 3);
        let roster = gallery.roster();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].name, "Alice");
        assert_eq!(roster[0].external_id, "1XX22CS001");
        assert_eq!(roster[1].name, "Bob");
        assert_eq!(roster[1].external_id, crate::types::UNKNOWN_EXTERNAL_ID);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn image_with_no_face_is_skipped_not_stored() {
        let root = scratch_dataset("noface");
        let folder = root.join("Ghost_000");
        std::fs::create_dir(&folder).unwrap();
        write_image(&folder.join("dark.png"), [0, 0, 0]);

        let gallery = Gallery::load(&root, &mut ColorProvider).unwrap();
        assert!(gallery.is_empty());

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn non_image_and_corrupt_files_do_not_abort_the_load() {
        let root = scratch_dataset("corrupt");
        let folder = root.join("Alice_1");
        std::fs::create_dir(&folder).unwrap();
        write_image(&folder.join("ok.png"), [100, 100, 100]);
        std::fs::write(folder.join("notes.txt"), b"not an image").unwrap();
        std::fs::write(folder.join("broken.jpg"), b"truncated").unwrap();

        let gallery = Gallery::load(&root, &mut ColorProvider).unwrap();
        assert_eq!(gallery.len(), 1);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn missing_root_is_an_error() {
        let root = std::env::temp_dir().join("rollcall-gallery-definitely-missing");
        assert!(matches!(
            Gallery::load(&root, &mut ColorProvider),
            Err(GalleryError::RootNotFound(_))
        ));
    }

    #[test]
    fn folders_load_in_sorted_order() {
        let root = scratch_dataset("order");
        for (folder, color) in [("Zoe_9", [10, 0, 0]), ("Amy_1", [0, 10, 0])] {
            let dir = root.join(folder);
            std::fs::create_dir(&dir).unwrap();
            write_image(&dir.join("f.png"), color);
        }

        let gallery = Gallery::load(&root, &mut ColorProvider).unwrap();
        assert_eq!(gallery.get(0).unwrap().identity.name, "Amy");
        assert_eq!(gallery.get(1).unwrap().identity.name, "Zoe");

        std::fs::remove_dir_all(&root).unwrap();
    }
}
