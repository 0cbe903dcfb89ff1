//! Zoom-adaptive aggregation of member presence into pins and clusters.
//!
//! Granularity by zoom:
//! - `zoom >= individual_min_zoom` (16): every member is its own group.
//! - `zoom < building_max_zoom` (12): members sharing a building cluster.
//! - otherwise: members sharing building, floor and room cluster.
//!
//! A cluster of one is always rewritten into the individual form, so a lone
//! member renders the same way at every zoom level.

use std::collections::HashMap;
use std::fmt;

use foundation::LatLng;
use formats::{MemberLocation, MemberPresence};

pub const DEFAULT_INDIVIDUAL_MIN_ZOOM: f64 = 16.0;
pub const DEFAULT_BUILDING_MAX_ZOOM: f64 = 12.0;

/// Filter value that keeps every member.
pub const ALL_GROUPS: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum GroupFilter {
    #[default]
    All,
    Group(String),
}

impl GroupFilter {
    /// `"all"` keeps everyone; any other value names a group.
    pub fn parse(raw: &str) -> Self {
        if raw == ALL_GROUPS {
            GroupFilter::All
        } else {
            GroupFilter::Group(raw.to_string())
        }
    }

    pub fn matches(&self, member: &MemberPresence) -> bool {
        match self {
            GroupFilter::All => true,
            GroupFilter::Group(g) => member.in_group(g),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GroupFilter::All => ALL_GROUPS,
            GroupFilter::Group(g) => g,
        }
    }
}

impl fmt::Display for GroupFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Building,
    Room,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClusterKey {
    /// One member shown as an individual pin.
    Member(String),
    Building(String),
    Room {
        building_id: String,
        floor_label: String,
        room_id: String,
    },
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterKey::Member(id) => write!(f, "member:{id}"),
            ClusterKey::Building(b) => write!(f, "building:{b}"),
            ClusterKey::Room {
                building_id,
                floor_label,
                room_id,
            } => write!(f, "room:{building_id}/{floor_label}/{room_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterGroup {
    pub key: ClusterKey,
    /// Members in snapshot order.
    pub members: Vec<MemberPresence>,
    /// Location of the first member encountered for the key (not a centroid).
    pub coordinates: LatLng,
    pub building_id: String,
    pub floor_label: Option<String>,
    pub room_id: Option<String>,
    pub granularity: Granularity,
}

impl ClusterGroup {
    fn individual(member: MemberPresence, location: &MemberLocation) -> Self {
        Self {
            key: ClusterKey::Member(member.id.clone()),
            coordinates: location.coordinates,
            building_id: location.building_id.clone(),
            floor_label: Some(location.floor_label.clone()),
            room_id: Some(location.room_id.clone()),
            granularity: Granularity::Room,
            members: vec![member],
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The member behind an individual pin, `None` for real clusters.
    pub fn single_member(&self) -> Option<&MemberPresence> {
        match self.members.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterMode {
    Individual,
    Clustered(Granularity),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterConfig {
    pub individual_min_zoom: f64,
    pub building_max_zoom: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            individual_min_zoom: DEFAULT_INDIVIDUAL_MIN_ZOOM,
            building_max_zoom: DEFAULT_BUILDING_MAX_ZOOM,
        }
    }
}

impl ClusterConfig {
    pub fn mode(&self, zoom: f64) -> ClusterMode {
        if zoom >= self.individual_min_zoom {
            ClusterMode::Individual
        } else if zoom < self.building_max_zoom {
            ClusterMode::Clustered(Granularity::Building)
        } else {
            ClusterMode::Clustered(Granularity::Room)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterReport {
    pub groups: Vec<ClusterGroup>,
    /// Members that passed the filter.
    pub matched: usize,
    /// Matching members excluded because they carry no location.
    pub skipped: usize,
}

/// Pure, deterministic clustering over a presence snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PresenceClusterer {
    pub config: ClusterConfig,
}

impl PresenceClusterer {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn cluster(
        &self,
        members: &[MemberPresence],
        zoom: f64,
        filter: &GroupFilter,
    ) -> Vec<ClusterGroup> {
        self.cluster_with_report(members, zoom, filter).groups
    }

    pub fn cluster_with_report(
        &self,
        members: &[MemberPresence],
        zoom: f64,
        filter: &GroupFilter,
    ) -> ClusterReport {
        let mut report = ClusterReport::default();
        let mode = self.config.mode(zoom);

        let mut pending: Vec<Pending> = Vec::new();
        let mut index_by_key: HashMap<ClusterKey, usize> = HashMap::new();

        for member in members.iter().filter(|m| filter.matches(m)) {
            report.matched += 1;
            let Some(location) = member.location.as_ref() else {
                report.skipped += 1;
                continue;
            };

            let granularity = match mode {
                ClusterMode::Individual => {
                    pending.push(Pending {
                        group: ClusterGroup::individual(member.clone(), location),
                        first_location: location.clone(),
                    });
                    continue;
                }
                ClusterMode::Clustered(g) => g,
            };

            let key = cluster_key(granularity, location);
            if let Some(&i) = index_by_key.get(&key) {
                pending[i].group.members.push(member.clone());
                continue;
            }

            index_by_key.insert(key.clone(), pending.len());
            let (floor_label, room_id) = match granularity {
                Granularity::Building => (None, None),
                Granularity::Room => (
                    Some(location.floor_label.clone()),
                    Some(location.room_id.clone()),
                ),
            };
            pending.push(Pending {
                group: ClusterGroup {
                    key,
                    members: vec![member.clone()],
                    coordinates: location.coordinates,
                    building_id: location.building_id.clone(),
                    floor_label,
                    room_id,
                    granularity,
                },
                first_location: location.clone(),
            });
        }

        report.groups = pending.into_iter().map(Pending::finish).collect();

        if report.skipped > 0 {
            tracing::warn!(skipped = report.skipped, "members without location excluded");
        }
        tracing::debug!(
            zoom,
            filter = %filter,
            matched = report.matched,
            groups = report.groups.len(),
            "clustered presence"
        );
        report
    }
}

/// Convenience over [`PresenceClusterer::cluster`] with default thresholds.
pub fn cluster_members(
    members: &[MemberPresence],
    zoom: f64,
    filter: &GroupFilter,
) -> Vec<ClusterGroup> {
    PresenceClusterer::default().cluster(members, zoom, filter)
}

fn cluster_key(granularity: Granularity, location: &MemberLocation) -> ClusterKey {
    match granularity {
        Granularity::Building => ClusterKey::Building(location.building_id.clone()),
        Granularity::Room => ClusterKey::Room {
            building_id: location.building_id.clone(),
            floor_label: location.floor_label.clone(),
            room_id: location.room_id.clone(),
        },
    }
}

struct Pending {
    group: ClusterGroup,
    first_location: MemberLocation,
}

impl Pending {
    /// Rewrites a cluster of one into the individual-pin form.
    fn finish(self) -> ClusterGroup {
        let Pending {
            mut group,
            first_location,
        } = self;
        if group.members.len() == 1 && !matches!(group.key, ClusterKey::Member(_)) {
            if let Some(member) = group.members.pop() {
                return ClusterGroup::individual(member, &first_location);
            }
        }
        group
    }
}
