//! Nearest-neighbor identity matching with a distance tolerance.

use crate::gallery::Gallery;
use crate::types::Embedding;

/// Result of matching one probe embedding against the gallery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutcome {
    /// Closest gallery entry within tolerance.
    Known { index: usize, distance: f32 },
    /// No gallery entry within tolerance (or the gallery is empty).
    Unknown,
}

impl MatchOutcome {
    pub fn is_known(&self) -> bool {
        matches!(self, MatchOutcome::Known { .. })
    }
}

/// Strategy for resolving a probe embedding to a gallery identity.
pub trait Matcher {
    fn find(&self, probe: &Embedding, gallery: &Gallery, tolerance: f32) -> MatchOutcome;
}

/// Euclidean-distance matcher: full linear scan, minimum distance wins.
///
/// An entry is a candidate iff its distance is <= `tolerance` (the boundary
/// is inclusive). Ties resolve to the lowest gallery index, i.e. the
/// first-loaded entry. O(|gallery|) per probe; gallery sizes in the target
/// deployment are small enough that no index structure is warranted — this
/// trait is the seam where one would go.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn find(&self, probe: &Embedding, gallery: &Gallery, tolerance: f32) -> MatchOutcome {
        let mut best_idx: Option<usize> = None;
        let mut best_dist = f32::INFINITY;

        for (i, entry) in gallery.entries().iter().enumerate() {
            let dist = probe.distance(&entry.embedding);
            // Strict `<` keeps the earliest entry on exact ties.
            if dist < best_dist {
                best_dist = dist;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(index) if best_dist <= tolerance => MatchOutcome::Known {
                index,
                distance: best_dist,
            },
            _ => MatchOutcome::Unknown,
        }
    }
}
