//! Per-member presentation hints handed to the renderer alongside groups.

use chrono::{DateTime, TimeDelta, Utc};
use formats::{MemberPresence, MemberStatus};

pub const OPACITY_FRESH: f32 = 1.0;
pub const OPACITY_STALE: f32 = 0.6;
pub const OPACITY_EXPIRED: f32 = 0.3;

/// `#RRGGBB` colour for a member status.
pub fn status_color(status: MemberStatus) -> &'static str {
    match status {
        MemberStatus::Present => "#00FF00",
        MemberStatus::Away => "#FFFF00",
        MemberStatus::Moving => "#FFA500",
        MemberStatus::Left => "#808080",
        MemberStatus::Unknown => "#FF0000",
    }
}

/// Opacity decay by report age: up to 1 h full, up to 24 h 0.6, then 0.3.
///
/// Reports from the future count as fresh.
pub fn staleness_opacity(reported_at: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let age = now.signed_duration_since(reported_at);
    if age > TimeDelta::hours(24) {
        OPACITY_EXPIRED
    } else if age > TimeDelta::hours(1) {
        OPACITY_STALE
    } else {
        OPACITY_FRESH
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinHint {
    pub color: &'static str,
    pub opacity: f32,
}

impl PinHint {
    pub fn for_member(member: &MemberPresence, now: DateTime<Utc>) -> Self {
        let opacity = member
            .location
            .as_ref()
            .map_or(OPACITY_FRESH, |loc| staleness_opacity(loc.timestamp, now));
        Self {
            color: status_color(member.status),
            opacity,
        }
    }
}
