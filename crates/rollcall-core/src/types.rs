use serde::{Deserialize, Serialize};

/// External id used when an enrollment folder name carries no `_` separator.
pub const UNKNOWN_EXTERNAL_ID: &str = "Unknown ID";

/// A known person, parsed from an enrollment folder name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    /// Roll number / badge id from the `"<Name>_<ExternalID>"` convention.
    pub external_id: String,
}

impl Identity {
    /// Parse an identity from a dataset folder name.
    ///
    /// `"Alice_1XX22CS001"` → name `Alice`, external id `1XX22CS001`.
    /// A name with no underscore keeps the whole string as the name and
    /// gets the `"Unknown ID"` sentinel. Splitting happens at the first
    /// underscore only, so ids may themselves contain underscores.
    pub fn from_folder_name(folder: &str) -> Self {
        match folder.split_once('_') {
            Some((name, id)) => Self {
                name: name.to_string(),
                external_id: id.to_string(),
            },
            None => Self {
                name: folder.to_string(),
                external_id: UNKNOWN_EXTERNAL_ID.to_string(),
            },
        }
    }
}

/// Face embedding vector, as produced by the deployment's embedding backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean distance to another embedding. Lower = more similar.
    pub fn distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// Face location in css order (top, right, bottom, left), in pixels of the
/// frame the detection ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Scale every coordinate by `factor`. Used to map detection-space boxes
    /// back to full-resolution frame coordinates.
    pub fn scaled(&self, factor: u32) -> BoundingBox {
        BoundingBox {
            top: self.top * factor,
            right: self.right * factor,
            bottom: self.bottom * factor,
            left: self.left * factor,
        }
    }

    /// Clamp the box to a `width` × `height` frame.
    pub fn clamped(&self, width: u32, height: u32) -> BoundingBox {
        let right = self.right.min(width);
        let bottom = self.bottom.min(height);
        BoundingBox {
            top: self.top.min(bottom),
            right,
            bottom,
            left: self.left.min(right),
        }
    }
}

/// One face found in a processed frame. Lives for a single frame cycle.
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub location: BoundingBox,
    pub embedding: Embedding,
}
