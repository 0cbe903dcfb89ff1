//! Detail views shown when a member or cluster marker is clicked.

use chrono::{DateTime, Utc};
use compute::{ClusterGroup, ClusterKey, Granularity};
use formats::{MemberLocation, MemberPresence, Topology};

const UNKNOWN: &str = "unknown";
const NO_NOTE: &str = "none";

#[derive(Debug, Clone, PartialEq)]
pub struct MemberDetail {
    pub member_id: String,
    pub username: String,
    pub status: String,
    /// `"{building} {floor} {room}"`, `unknown` for each unresolved part.
    pub location: String,
    pub note: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MemberDetail {
    pub fn new(member: &MemberPresence, topology: &Topology) -> Self {
        let location = match &member.location {
            Some(loc) => place_text(loc, topology, true),
            None => [UNKNOWN; 3].join(" "),
        };
        Self {
            member_id: member.id.clone(),
            username: member.username.clone(),
            status: member.status.label().to_string(),
            location,
            note: member
                .note
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(NO_NOTE)
                .to_string(),
            updated_at: member.location.as_ref().map(|l| l.timestamp),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRow {
    pub member_id: String,
    pub username: String,
    pub status: String,
    /// Floor and room, only for building clusters.
    pub place: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterDetail {
    pub key: ClusterKey,
    pub title: String,
    pub summary: String,
    pub rows: Vec<ClusterRow>,
}

impl ClusterDetail {
    pub fn new(group: &ClusterGroup, topology: &Topology) -> Self {
        let building = topology.building(&group.building_id);
        let building_name = building.map_or(UNKNOWN, |b| b.display_name.as_str());

        let (title, summary) = match group.granularity {
            Granularity::Building => (
                building_name.to_string(),
                format!("{} members in building", group.len()),
            ),
            Granularity::Room => {
                let floor = group.floor_label.as_deref().unwrap_or(UNKNOWN);
                let room = building
                    .zip(group.floor_label.as_deref())
                    .and_then(|(b, f)| b.floor(f))
                    .zip(group.room_id.as_deref())
                    .and_then(|(f, r)| f.room(r))
                    .map_or(UNKNOWN, |r| r.display_name.as_str());
                (
                    format!("{building_name} {floor} {room}"),
                    format!("{} members in room", group.len()),
                )
            }
        };

        let rows = group
            .members
            .iter()
            .map(|m| ClusterRow {
                member_id: m.id.clone(),
                username: m.username.clone(),
                status: m.status.label().to_string(),
                place: match (group.granularity, &m.location) {
                    (Granularity::Building, Some(loc)) => Some(place_text(loc, topology, false)),
                    _ => None,
                },
            })
            .collect();

        Self {
            key: group.key.clone(),
            title,
            summary,
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailView {
    Member(MemberDetail),
    Cluster(ClusterDetail),
}

fn place_text(loc: &MemberLocation, topology: &Topology, with_building: bool) -> String {
    let building = topology.building(&loc.building_id);
    let floor = building.and_then(|b| b.floor(&loc.floor_label));
    let room = floor.and_then(|f| f.room(&loc.room_id));

    let floor_text = floor.map_or(UNKNOWN, |f| f.label.as_str());
    let room_text = room.map_or(UNKNOWN, |r| r.display_name.as_str());
    if with_building {
        let building_text = building.map_or(UNKNOWN, |b| b.display_name.as_str());
        format!("{building_text} {floor_text} {room_text}")
    } else {
        format!("{floor_text} {room_text}")
    }
}

#[cfg(test)]
mod tests {
    use super::{ClusterDetail, MemberDetail};
    use chrono::{DateTime, Utc};
    use compute::{GroupFilter, PresenceClusterer};
    use foundation::LatLng;
    use formats::{
        Building, DisplayOffset, Floor, MemberLocation, MemberPresence, MemberStatus, Room, Topology,
    };
    use pretty_assertions::assert_eq;

    fn topology() -> Topology {
        let room = |id: &str, name: &str| Room {
            id: id.to_string(),
            display_name: name.to_string(),
            usage_label: String::new(),
            polygon: vec![LatLng::new(0.0, 0.0), LatLng::new(0.0, 1.0), LatLng::new(1.0, 1.0)],
        };
        Topology {
            buildings: vec![Building {
                id: "B1".to_string(),
                display_name: "North Hall".to_string(),
                polygon: Vec::new(),
                floors: vec![Floor {
                    label: "1F".to_string(),
                    rooms: vec![room("R1", "Lobby"), room("R2", "Lab")],
                }],
            }],
        }
    }

    fn member(id: &str, room: &str, note: Option<&str>) -> MemberPresence {
        MemberPresence {
            id: id.to_string(),
            username: id.to_uppercase(),
            icon_url: None,
            status: MemberStatus::Away,
            groups: Default::default(),
            note: note.map(str::to_string),
            location: Some(MemberLocation {
                coordinates: LatLng::new(0.5, 0.5),
                building_id: "B1".to_string(),
                floor_label: "1F".to_string(),
                room_id: room.to_string(),
                display_offset: DisplayOffset::default(),
                timestamp: DateTime::<Utc>::UNIX_EPOCH,
            }),
        }
    }

    #[test]
    fn member_detail_resolves_names() {
        let d = MemberDetail::new(&member("a", "R2", Some("at lunch")), &topology());
        assert_eq!(d.location, "North Hall 1F Lab");
        assert_eq!(d.status, "away");
        assert_eq!(d.note, "at lunch");
    }

    #[test]
    fn member_detail_marks_unknown_parts() {
        let d = MemberDetail::new(&member("a", "R9", None), &topology());
        assert_eq!(d.location, "North Hall 1F unknown");
        assert_eq!(d.note, "none");
    }

    #[test]
    fn cluster_details_by_granularity() {
        let t = topology();
        let members = vec![member("a", "R1", None), member("b", "R2", None), member("c", "R2", None)];
        let clusterer = PresenceClusterer::default();

        let building = clusterer.cluster(&members, 10.0, &GroupFilter::All);
        let d = ClusterDetail::new(&building[0], &t);
        assert_eq!(d.title, "North Hall");
        assert_eq!(d.summary, "3 members in building");
        assert_eq!(d.rows[0].place.as_deref(), Some("1F Lobby"));

        let rooms = clusterer.cluster(&members, 14.0, &GroupFilter::All);
        let d = ClusterDetail::new(&rooms[1], &t);
        assert_eq!(d.title, "North Hall 1F Lab");
        assert_eq!(d.summary, "2 members in room");
        assert_eq!(d.rows.len(), 2);
        assert_eq!(d.rows[1].place, None);
    }
}
