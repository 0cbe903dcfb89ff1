use std::collections::BTreeMap;
use std::fmt;

use foundation::{Arena, Handle, LatLng};

use crate::layer::LayerId;
use crate::pins::MarkerElement;

/// The map surface the core draws onto.
///
/// Zoom changes are not subscribed to here; the host forwards them as
/// events and the controller reads [`Viewport::zoom`] when it refreshes.
pub trait Viewport {
    type Handle: Copy + Eq + fmt::Debug;

    fn add_marker(&mut self, element: MarkerElement, at: LatLng) -> Self::Handle;
    /// Removing an unknown or already removed handle is a no-op.
    fn remove_marker(&mut self, handle: Self::Handle);
    fn zoom(&self) -> f64;
    fn set_layer_visibility(&mut self, layer: LayerId, visible: bool);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewportKind {
    Preview,
    FullScreen,
}

impl ViewportKind {
    pub const ALL: [ViewportKind; 2] = [ViewportKind::Preview, ViewportKind::FullScreen];

    pub fn index(self) -> usize {
        match self {
            ViewportKind::Preview => 0,
            ViewportKind::FullScreen => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewportKind::Preview => "preview",
            ViewportKind::FullScreen => "full-screen",
        }
    }
}

impl fmt::Display for ViewportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedMarker {
    pub element: MarkerElement,
    pub at: LatLng,
}

/// Headless viewport backed by a generational arena.
#[derive(Debug, Default)]
pub struct MemoryViewport {
    zoom: f64,
    markers: Arena<PlacedMarker>,
    layers: BTreeMap<LayerId, bool>,
}

impl MemoryViewport {
    pub fn new(zoom: f64) -> Self {
        Self {
            zoom,
            ..Self::default()
        }
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    pub fn marker(&self, handle: Handle) -> Option<&PlacedMarker> {
        self.markers.get(handle)
    }

    pub fn markers(&self) -> impl Iterator<Item = (Handle, &PlacedMarker)> + '_ {
        self.markers.iter()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn count_where(&self, pred: impl Fn(&MarkerElement) -> bool) -> usize {
        self.markers.iter().filter(|(_, m)| pred(&m.element)).count()
    }

    /// Layers start hidden.
    pub fn layer_visible(&self, layer: LayerId) -> bool {
        self.layers.get(&layer).copied().unwrap_or(false)
    }
}

impl Viewport for MemoryViewport {
    type Handle = Handle;

    fn add_marker(&mut self, element: MarkerElement, at: LatLng) -> Handle {
        self.markers.alloc(PlacedMarker { element, at })
    }

    fn remove_marker(&mut self, handle: Handle) {
        if self.markers.remove(handle).is_none() {
            tracing::trace!(%handle, "marker already gone");
        }
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn set_layer_visibility(&mut self, layer: LayerId, visible: bool) {
        self.layers.insert(layer, visible);
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryViewport, Viewport};
    use crate::layer::LayerId;
    use crate::pins::{MarkerElement, PersonalPin};
    use foundation::LatLng;

    #[test]
    fn add_remove_and_stale_handles() {
        let mut vp = MemoryViewport::new(15.0);
        let h = vp.add_marker(MarkerElement::PersonalGps(PersonalPin::gps(None)), LatLng::new(1.0, 2.0));
        assert_eq!(vp.marker_count(), 1);
        assert_eq!(vp.marker(h).map(|m| m.at), Some(LatLng::new(1.0, 2.0)));
        vp.remove_marker(h);
        vp.remove_marker(h);
        assert_eq!(vp.marker_count(), 0);

        let h2 = vp.add_marker(MarkerElement::PersonalGps(PersonalPin::gps(None)), LatLng::default());
        vp.remove_marker(h);
        assert!(vp.marker(h2).is_some());
    }

    #[test]
    fn layers_hidden_until_shown() {
        let mut vp = MemoryViewport::new(15.0);
        assert!(!vp.layer_visible(LayerId::BuildingsFill));
        vp.set_layer_visibility(LayerId::BuildingsFill, true);
        assert!(vp.layer_visible(LayerId::BuildingsFill));
        assert!(!vp.layer_visible(LayerId::BuildingsLine));
    }
}
