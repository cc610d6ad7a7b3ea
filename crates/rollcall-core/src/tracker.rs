//! Per-session attendance tracking.
//!
//! One state slot per known identity, Absent until the first qualifying
//! match, Present afterwards for the rest of the session. The Present
//! record is persisted through [`AttendanceSink`] before the in-memory
//! flip, so a failed write never leaves a phantom Present state.

use crate::gallery::Gallery;
use crate::types::Identity;
use std::collections::BTreeMap;
use std::io;

/// Presence of one identity within the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Absent,
    Present,
}

/// Durable destination for Present transitions. Appends must be synchronous:
/// when `record_present` returns Ok, the record is on disk.
pub trait AttendanceSink {
    fn record_present(&mut self, identity: &Identity) -> io::Result<()>;
}

/// Session-scoped attendance state. Built all-Absent from the gallery
/// roster; identities are keyed by name, so several gallery entries for one
/// person share a single slot. Never re-armed mid-session.
#[derive(Debug)]
pub struct AttendanceState {
    slots: BTreeMap<String, Presence>,
}

impl AttendanceState {
    pub fn for_gallery(gallery: &Gallery) -> Self {
        let slots = gallery
            .roster()
            .into_iter()
            .map(|id| (id.name.clone(), Presence::Absent))
            .collect();
        Self { slots }
    }

    /// Handle a qualifying match for `identity`.
    ///
    /// On the first match the record is persisted, then the slot flips to
    /// Present; returns Ok(true). Later matches are no-ops returning
    /// Ok(false). A sink failure propagates with the slot still Absent.
    pub fn observe_match(
        &mut self,
        identity: &Identity,
        sink: &mut dyn AttendanceSink,
    ) -> io::Result<bool> {
        match self.slots.get(identity.name.as_str()) {
            Some(Presence::Absent) => {
                sink.record_present(identity)?;
                self.slots
                    .insert(identity.name.clone(), Presence::Present);
                tracing::info!(
                    name = %identity.name,
                    external_id = %identity.external_id,
                    "marked present"
                );
                Ok(true)
            }
            Some(Presence::Present) => Ok(false),
            None => {
                // A matched identity always comes from the gallery this
                // state was built from; an unknown name means the caller
                // mixed sessions.
                tracing::warn!(name = %identity.name, "match for identity outside the roster");
                Ok(false)
            }
        }
    }

    pub fn presence(&self, name: &str) -> Option<Presence> {
        self.slots.get(name).copied()
    }

    pub fn present_count(&self) -> usize {
        self.slots
            .values()
            .filter(|&&p| p == Presence::Present)
            .count()
    }

    pub fn roster_size(&self) -> usize {
        self.slots.len()
    }
}
