//! Static building topology (`building_info.json`).
//!
//! Loaded once at startup and never mutated afterwards.

use std::path::Path;

use foundation::LatLng;
use serde::{Deserialize, Serialize};

use crate::document::{DocumentError, read_document};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    #[serde(rename = "name_ja")]
    pub display_name: String,
    #[serde(rename = "usage", default)]
    pub usage_label: String,
    pub polygon: Vec<LatLng>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub label: String,
    #[serde(default)]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    #[serde(rename = "name_ja")]
    pub display_name: String,
    pub polygon: Vec<LatLng>,
    #[serde(default)]
    pub floors: Vec<Floor>,
}

impl Building {
    pub fn floor(&self, label: &str) -> Option<&Floor> {
        self.floors.iter().find(|f| f.label == label)
    }
}

impl Floor {
    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }
}

/// A room resolved back through the topology together with its parents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomRef<'a> {
    pub building: &'a Building,
    pub floor: &'a Floor,
    pub room: &'a Room,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub buildings: Vec<Building>,
}

impl Topology {
    pub fn from_json_str(payload: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(payload).map_err(DocumentError::Parse)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let payload = read_document(path)?;
        let topology = Self::from_json_str(&payload)?;
        tracing::debug!(
            buildings = topology.buildings.len(),
            fingerprint = %topology.fingerprint(),
            "loaded building topology"
        );
        Ok(topology)
    }

    pub fn building(&self, id: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Resolves persisted ids back to live topology entries.
    ///
    /// Any dangling id yields `None`.
    pub fn resolve(&self, building_id: &str, floor_label: &str, room_id: &str) -> Option<RoomRef<'_>> {
        let building = self.building(building_id)?;
        let floor = building.floor(floor_label)?;
        let room = floor.room(room_id)?;
        Some(RoomRef {
            building,
            floor,
            room,
        })
    }

    /// Content digest of the canonical JSON form (blake3, hex).
    pub fn fingerprint(&self) -> String {
        // Serializing plain data structs cannot fail.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::Topology;
    use foundation::LatLng;

    const DOC: &str = r#"{
        "buildings": [
            {
                "id": "B1",
                "name_ja": "North Hall",
                "polygon": [
                    {"lat": 0.0, "lng": 0.0},
                    {"lat": 0.0, "lng": 1.0},
                    {"lat": 1.0, "lng": 1.0},
                    {"lat": 1.0, "lng": 0.0}
                ],
                "floors": [
                    {
                        "label": "1F",
                        "rooms": [
                            {
                                "id": "R101",
                                "name_ja": "Lobby",
                                "usage": "common",
                                "polygon": [
                                    {"lat": 0.1, "lng": 0.1},
                                    {"lat": 0.1, "lng": 0.2},
                                    {"lat": 0.2, "lng": 0.2}
                                ]
                            }
                        ]
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn parses_document_field_names() {
        let t = Topology::from_json_str(DOC).expect("parse topology");
        let b = &t.buildings[0];
        assert_eq!(b.display_name, "North Hall");
        assert_eq!(b.polygon[2], LatLng::new(1.0, 1.0));
        let room = &b.floors[0].rooms[0];
        assert_eq!(room.display_name, "Lobby");
        assert_eq!(room.usage_label, "common");
    }

    #[test]
    fn resolve_finds_room_and_rejects_dangling_ids() {
        let t = Topology::from_json_str(DOC).unwrap();
        let r = t.resolve("B1", "1F", "R101").expect("resolves");
        assert_eq!(r.building.id, "B1");
        assert_eq!(r.floor.label, "1F");
        assert_eq!(r.room.id, "R101");

        assert!(t.resolve("B9", "1F", "R101").is_none());
        assert!(t.resolve("B1", "2F", "R101").is_none());
        assert!(t.resolve("B1", "1F", "R999").is_none());
    }

    #[test]
    fn fingerprint_tracks_content() {
        let t = Topology::from_json_str(DOC).unwrap();
        assert_eq!(t.fingerprint(), t.clone().fingerprint());

        let mut changed = t.clone();
        changed.buildings[0].display_name = "South Hall".to_string();
        assert_ne!(t.fingerprint(), changed.fingerprint());
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = Topology::from_json_str(r#"{"buildings": [{"id": 1}]}"#).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }
}
