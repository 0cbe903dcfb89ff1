//! Building footprint overlay: outline rings plus triangulated fill.

use earcutr::earcut;
use foundation::LatLng;
use foundation::math::validate_ring;
use formats::Topology;

use crate::layer::{LayerId, LayerStyle};
use crate::symbology::{building_color, layer_style};

#[derive(Debug, Clone, PartialEq)]
pub struct BuildingShape {
    pub building_id: String,
    pub color: &'static str,
    /// Closed ring (first vertex repeated at the end).
    pub outline: Vec<LatLng>,
    /// Triangle list, three vertices per triangle.
    pub fill: Vec<LatLng>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingOverlay {
    pub shapes: Vec<BuildingShape>,
}

impl BuildingOverlay {
    /// Colour follows topology order, so skipped buildings still consume
    /// their palette slot.
    pub fn from_topology(topology: &Topology) -> Self {
        let mut shapes = Vec::with_capacity(topology.buildings.len());
        for (index, building) in topology.buildings.iter().enumerate() {
            if let Err(e) = validate_ring(&building.polygon) {
                tracing::warn!(building = %building.id, "skipping footprint in overlay: {e}");
                continue;
            }
            let mut ring = building.polygon.clone();
            drop_closing_duplicate(&mut ring);

            let fill = triangulate(&ring);
            if fill.is_empty() {
                tracing::warn!(building = %building.id, "footprint did not triangulate");
            }

            let mut outline = ring;
            if let Some(first) = outline.first().copied() {
                outline.push(first);
            }

            shapes.push(BuildingShape {
                building_id: building.id.clone(),
                color: building_color(index),
                outline,
                fill,
            });
        }
        tracing::debug!(shapes = shapes.len(), "built building overlay");
        Self { shapes }
    }

    pub fn style(&self, layer: LayerId) -> LayerStyle {
        layer_style(layer)
    }

    pub fn triangle_count(&self) -> usize {
        self.shapes.iter().map(|s| s.fill.len() / 3).sum()
    }
}

fn triangulate(ring: &[LatLng]) -> Vec<LatLng> {
    if ring.len() < 3 {
        return Vec::new();
    }
    let coords: Vec<f64> = ring.iter().flat_map(|p| [p.lng, p.lat]).collect();
    let indices = match earcut(&coords, &[], 2) {
        Ok(ix) => ix,
        Err(_) => return Vec::new(),
    };
    indices.into_iter().filter_map(|i| ring.get(i).copied()).collect()
}

fn drop_closing_duplicate(points: &mut Vec<LatLng>) {
    let closed = match points.as_slice() {
        [first, .., last] => {
            (first.lat - last.lat).abs() < 1e-12 && (first.lng - last.lng).abs() < 1e-12
        }
        _ => false,
    };
    if closed {
        points.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::BuildingOverlay;
    use foundation::LatLng;
    use formats::{Building, Topology};

    fn building(id: &str, polygon: Vec<LatLng>) -> Building {
        Building {
            id: id.to_string(),
            display_name: id.to_string(),
            polygon,
            floors: Vec::new(),
        }
    }

    fn square() -> Vec<LatLng> {
        vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 1.0),
            LatLng::new(1.0, 1.0),
            LatLng::new(1.0, 0.0),
        ]
    }

    #[test]
    fn square_becomes_two_triangles_and_closed_outline() {
        let t = Topology {
            buildings: vec![building("A", square())],
        };
        let overlay = BuildingOverlay::from_topology(&t);
        let shape = &overlay.shapes[0];
        assert_eq!(shape.color, "#FF6B6B");
        assert_eq!(shape.fill.len(), 6);
        assert_eq!(shape.outline.len(), 5);
        assert_eq!(shape.outline.first(), shape.outline.last());
        assert_eq!(overlay.triangle_count(), 2);
    }

    #[test]
    fn closed_input_ring_is_not_doubled() {
        let mut ring = square();
        ring.push(LatLng::new(0.0, 0.0));
        let t = Topology {
            buildings: vec![building("A", ring)],
        };
        let overlay = BuildingOverlay::from_topology(&t);
        assert_eq!(overlay.shapes[0].outline.len(), 5);
    }

    #[test]
    fn invalid_footprint_keeps_palette_slot() {
        let t = Topology {
            buildings: vec![
                building("broken", vec![LatLng::new(0.0, 0.0)]),
                building("B", square()),
            ],
        };
        let overlay = BuildingOverlay::from_topology(&t);
        assert_eq!(overlay.shapes.len(), 1);
        assert_eq!(overlay.shapes[0].building_id, "B");
        assert_eq!(overlay.shapes[0].color, "#4ECDC4");
    }
}
