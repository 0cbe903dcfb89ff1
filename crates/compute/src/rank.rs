use foundation::LatLng;
use foundation::math::{centroid, haversine_m, cmp_distance_m};
use formats::{Floor, Room};

/// Default search radius around the fix (meters).
pub const DEFAULT_ROOM_RADIUS_M: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedRoom<'a> {
    pub room: &'a Room,
    /// Distance from the fix to the room's vertex centroid.
    pub distance_m: f64,
}

/// Orders the rooms of one floor by proximity to a fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomRanker {
    pub radius_m: f64,
}

impl Default for RoomRanker {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_ROOM_RADIUS_M,
        }
    }
}

impl RoomRanker {
    pub fn new(radius_m: f64) -> Self {
        Self { radius_m }
    }

    /// Rooms within `radius_m` of `point`, nearest first.
    ///
    /// Equal distances keep floor order. Rooms with an empty polygon are
    /// unusable and left out. An empty result is valid.
    pub fn rank<'a>(&self, point: LatLng, floor: &'a Floor) -> Vec<RankedRoom<'a>> {
        let mut ranked: Vec<RankedRoom<'a>> = floor
            .rooms
            .iter()
            .filter_map(|room| match centroid(&room.polygon) {
                Ok(center) => Some(RankedRoom {
                    room,
                    distance_m: haversine_m(point, center),
                }),
                Err(e) => {
                    tracing::warn!(room = %room.id, floor = %floor.label, "unusable room: {e}");
                    None
                }
            })
            .filter(|r| r.distance_m <= self.radius_m)
            .collect();

        // `sort_by` is stable.
        ranked.sort_by(|a, b| cmp_distance_m(a.distance_m, b.distance_m));
        ranked
    }
}

pub fn rank_rooms(point: LatLng, floor: &Floor, radius_m: f64) -> Vec<RankedRoom<'_>> {
    RoomRanker::new(radius_m).rank(point, floor)
}
