//! Member presence snapshot (`members_loc.json`).
//!
//! Decoding is tolerant per record: one malformed member never fails the
//! whole snapshot. Records that cannot be decoded at all are skipped and
//! counted; records without a location decode with `location: None` and are
//! left for consumers to exclude.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use foundation::LatLng;
use serde::{Deserialize, Serialize};

use crate::document::{DocumentError, read_document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemberStatus {
    Present,
    Away,
    Moving,
    Left,
    /// Any label outside the known set.
    Unknown,
}

impl MemberStatus {
    pub fn label(&self) -> &'static str {
        match self {
            MemberStatus::Present => "present",
            MemberStatus::Away => "away",
            MemberStatus::Moving => "moving",
            MemberStatus::Left => "left",
            MemberStatus::Unknown => "unknown",
        }
    }
}

impl From<String> for MemberStatus {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "在席" | "present" | "Present" => MemberStatus::Present,
            "離席" | "away" | "Away" => MemberStatus::Away,
            "移動中" | "moving" | "Moving" => MemberStatus::Moving,
            "退室済" | "left" | "Left" => MemberStatus::Left,
            _ => MemberStatus::Unknown,
        }
    }
}

impl From<MemberStatus> for String {
    fn from(status: MemberStatus) -> Self {
        status.label().to_string()
    }
}

/// Screen-space nudge applied to individual pins so co-located members
/// stay distinguishable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayOffset {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberLocation {
    pub coordinates: LatLng,
    pub building_id: String,
    pub floor_label: String,
    pub room_id: String,
    #[serde(default)]
    pub display_offset: DisplayOffset,
    pub timestamp: DateTime<Utc>,
}

impl MemberLocation {
    /// Pin position after applying the display offset.
    pub fn display_position(&self) -> LatLng {
        self.coordinates
            .displaced(self.display_offset.x, self.display_offset.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberPresence {
    pub id: String,
    pub username: String,
    #[serde(rename = "iconUrl", alias = "icon_url", default)]
    pub icon_url: Option<String>,
    pub status: MemberStatus,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub location: Option<MemberLocation>,
}

impl MemberPresence {
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemberSnapshot {
    pub members: Vec<MemberPresence>,
}

/// Result of decoding a snapshot document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotLoad {
    pub snapshot: MemberSnapshot,
    /// Records dropped because they could not be decoded.
    pub skipped: usize,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    members: Vec<serde_json::Value>,
}

impl MemberSnapshot {
    pub fn from_json_str(payload: &str) -> Result<SnapshotLoad, DocumentError> {
        let raw: RawSnapshot = serde_json::from_str(payload).map_err(DocumentError::Parse)?;

        let mut members = Vec::with_capacity(raw.members.len());
        let mut skipped = 0usize;
        for (index, value) in raw.members.into_iter().enumerate() {
            match serde_json::from_value::<MemberPresence>(value) {
                Ok(member) => members.push(member),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(index, "skipping malformed member record: {e}");
                }
            }
        }

        Ok(SnapshotLoad {
            snapshot: MemberSnapshot { members },
            skipped,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<SnapshotLoad, DocumentError> {
        let payload = read_document(path)?;
        let load = Self::from_json_str(&payload)?;
        tracing::debug!(
            members = load.snapshot.members.len(),
            skipped = load.skipped,
            "loaded member snapshot"
        );
        Ok(load)
    }

    /// Distinct group names across the snapshot, sorted.
    pub fn groups(&self) -> BTreeSet<&str> {
        self.members
            .iter()
            .flat_map(|m| m.groups.iter().map(String::as_str))
            .collect()
    }
}
