use foundation::bounds::Aabb2;
use foundation::math::{nearest_vertex_m, point_in_polygon, cmp_distance_m, validate_ring};
use foundation::LatLng;
use formats::{Building, Topology};

/// Outcome of resolving a fix against the building topology.
///
/// `NotFound` is an expected result: callers route it to manual entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Location<'a> {
    Inside(&'a Building),
    NotFound,
}

impl<'a> Location<'a> {
    pub fn building(&self) -> Option<&'a Building> {
        match *self {
            Location::Inside(b) => Some(b),
            Location::NotFound => None,
        }
    }
}

/// Closest building to a fix that lies outside every footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestBuilding<'a> {
    pub building: &'a Building,
    /// Distance to the building's closest polygon vertex.
    pub distance_m: f64,
}

/// Point-in-footprint resolution over a static topology.
///
/// Buildings whose footprint fails validation are treated as unusable and
/// never match; the rest of the pass is unaffected.
#[derive(Debug, Clone)]
pub struct BuildingLocator<'a> {
    topology: &'a Topology,
    // Parallel to `topology.buildings`; `None` marks an unusable footprint.
    bounds: Vec<Option<Aabb2>>,
}

impl<'a> BuildingLocator<'a> {
    pub fn new(topology: &'a Topology) -> Self {
        let bounds = topology
            .buildings
            .iter()
            .map(|b| match validate_ring(&b.polygon) {
                Ok(()) => Aabb2::from_points(&b.polygon),
                Err(e) => {
                    tracing::warn!(building = %b.id, "unusable building footprint: {e}");
                    None
                }
            })
            .collect();
        Self { topology, bounds }
    }

    /// Finds the building whose footprint contains `point`.
    ///
    /// Every building is scanned in topology order. When footprints overlap
    /// the last matching building wins.
    pub fn locate(&self, point: LatLng) -> Location<'a> {
        let mut found = None;
        for (building, bounds) in self.usable() {
            if bounds.contains(point) && point_in_polygon(point, &building.polygon) {
                found = Some(building);
            }
        }
        match found {
            Some(b) => Location::Inside(b),
            None => Location::NotFound,
        }
    }

    /// Building with the closest footprint vertex, for manual-entry hints.
    ///
    /// Ties keep the earlier building.
    pub fn nearest(&self, point: LatLng) -> Option<NearestBuilding<'a>> {
        let mut best: Option<NearestBuilding<'a>> = None;
        for (building, _) in self.usable() {
            let Some(d) = nearest_vertex_m(point, &building.polygon) else {
                continue;
            };
            let closer = best
                .as_ref()
                .is_none_or(|b| cmp_distance_m(d, b.distance_m).is_lt());
            if closer {
                best = Some(NearestBuilding {
                    building,
                    distance_m: d,
                });
            }
        }
        best
    }

    /// Buildings excluded from matching because their footprint is invalid.
    pub fn unusable(&self) -> impl Iterator<Item = &'a Building> + '_ {
        self.topology
            .buildings
            .iter()
            .zip(&self.bounds)
            .filter(|(_, b)| b.is_none())
            .map(|(building, _)| building)
    }

    fn usable(&self) -> impl Iterator<Item = (&'a Building, Aabb2)> + '_ {
        self.topology
            .buildings
            .iter()
            .zip(&self.bounds)
            .filter_map(|(building, b)| (*b).map(|b| (building, b)))
    }
}

/// One-shot convenience over [`BuildingLocator::locate`].
pub fn locate_building(point: LatLng, topology: &Topology) -> Location<'_> {
    BuildingLocator::new(topology).locate(point)
}
