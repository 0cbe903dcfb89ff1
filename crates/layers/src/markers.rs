//! Reconciles desired marker state against what each viewport shows.
//!
//! Every viewport owns at most one personal GPS pin, at most one registered
//! pin and one marker per cluster group. Personal pins are replaced with
//! remove-then-create; the member layer is rebuilt in full on every refresh.

use std::fmt;

use catalog::PresenceRecord;
use chrono::{DateTime, Utc};
use compute::ClusterGroup;
use foundation::LatLng;
use foundation::math::centroid;
use formats::{MemberPresence, Topology};

use crate::pins::{Identity, MarkerElement, PersonalPin, pin_for_group};
use crate::popup::{ClusterDetail, DetailView, MemberDetail};
use crate::viewport::{Viewport, ViewportKind};

/// What a member-layer marker stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerBinding {
    Member(MemberPresence),
    Cluster(ClusterGroup),
}

#[derive(Debug)]
struct ViewportMarkers<H> {
    gps: Option<H>,
    registered: Option<H>,
    members: Vec<(H, MarkerBinding)>,
}

impl<H> Default for ViewportMarkers<H> {
    fn default() -> Self {
        Self {
            gps: None,
            registered: None,
            members: Vec::new(),
        }
    }
}

/// Which personal pins a restore put back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Restored {
    pub gps: bool,
    pub registered: bool,
}

#[derive(Debug)]
pub struct MarkerLifecycleManager<H> {
    viewports: [ViewportMarkers<H>; 2],
}

impl<H> Default for MarkerLifecycleManager<H> {
    fn default() -> Self {
        Self {
            viewports: [ViewportMarkers::default(), ViewportMarkers::default()],
        }
    }
}

impl<H: Copy + Eq + fmt::Debug> MarkerLifecycleManager<H> {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: ViewportKind) -> &ViewportMarkers<H> {
        &self.viewports[kind.index()]
    }

    fn slot_mut(&mut self, kind: ViewportKind) -> &mut ViewportMarkers<H> {
        &mut self.viewports[kind.index()]
    }

    pub fn show_personal_gps<V: Viewport<Handle = H>>(
        &mut self,
        kind: ViewportKind,
        viewport: &mut V,
        at: LatLng,
        identity: Option<Identity<'_>>,
    ) -> H {
        let slot = self.slot_mut(kind);
        if let Some(old) = slot.gps.take() {
            viewport.remove_marker(old);
        }
        let handle = viewport.add_marker(MarkerElement::PersonalGps(PersonalPin::gps(identity)), at);
        slot.gps = Some(handle);
        handle
    }

    pub fn show_personal_registered<V: Viewport<Handle = H>>(
        &mut self,
        kind: ViewportKind,
        viewport: &mut V,
        at: LatLng,
        identity: Option<Identity<'_>>,
    ) -> H {
        let slot = self.slot_mut(kind);
        if let Some(old) = slot.registered.take() {
            viewport.remove_marker(old);
        }
        let element = MarkerElement::PersonalRegistered(PersonalPin::registered(identity));
        let handle = viewport.add_marker(element, at);
        slot.registered = Some(handle);
        handle
    }

    /// Removes the registered pin; returns whether there was one.
    pub fn clear_registered<V: Viewport<Handle = H>>(&mut self, kind: ViewportKind, viewport: &mut V) -> bool {
        match self.slot_mut(kind).registered.take() {
            Some(handle) => {
                viewport.remove_marker(handle);
                true
            }
            None => false,
        }
    }

    pub fn clear_personal<V: Viewport<Handle = H>>(&mut self, kind: ViewportKind, viewport: &mut V) {
        let slot = self.slot_mut(kind);
        for handle in [slot.gps.take(), slot.registered.take()].into_iter().flatten() {
            viewport.remove_marker(handle);
        }
    }

    /// Removes every member/cluster marker on the viewport, then draws one
    /// marker per group. Cost is proportional to the group count.
    pub fn refresh_member_layer<V: Viewport<Handle = H>>(
        &mut self,
        kind: ViewportKind,
        viewport: &mut V,
        groups: &[ClusterGroup],
        now: DateTime<Utc>,
    ) -> usize {
        self.clear_member_layer(kind, viewport);
        let slot = self.slot_mut(kind);
        for group in groups {
            let (element, at) = pin_for_group(group, now);
            let binding = match group.single_member() {
                Some(member) => MarkerBinding::Member(member.clone()),
                None => MarkerBinding::Cluster(group.clone()),
            };
            slot.members.push((viewport.add_marker(element, at), binding));
        }
        tracing::debug!(viewport = %kind, markers = slot.members.len(), "member layer rebuilt");
        slot.members.len()
    }

    pub fn clear_member_layer<V: Viewport<Handle = H>>(&mut self, kind: ViewportKind, viewport: &mut V) {
        for (handle, _) in self.slot_mut(kind).members.drain(..) {
            viewport.remove_marker(handle);
        }
    }

    /// Removes everything this manager placed on the viewport.
    pub fn detach<V: Viewport<Handle = H>>(&mut self, kind: ViewportKind, viewport: &mut V) {
        self.clear_personal(kind, viewport);
        self.clear_member_layer(kind, viewport);
    }

    /// Drops bookkeeping for a viewport that no longer exists.
    pub fn forget(&mut self, kind: ViewportKind) {
        *self.slot_mut(kind) = ViewportMarkers::default();
    }

    /// Rebuilds personal pins from a persisted record, without a new fix.
    ///
    /// The GPS pin comes back for non-manual records with coordinates. The
    /// registered pin comes back at the room centroid when the record's ids
    /// still resolve; dangling ids are skipped silently.
    pub fn restore<V: Viewport<Handle = H>>(
        &mut self,
        kind: ViewportKind,
        viewport: &mut V,
        record: &PresenceRecord,
        topology: &Topology,
        identity: Option<Identity<'_>>,
    ) -> Restored {
        self.clear_personal(kind, viewport);
        let mut restored = Restored::default();

        if let Some(at) = record.coordinates.filter(|_| !record.is_manual) {
            self.show_personal_gps(kind, viewport, at, identity);
            restored.gps = true;
        }
        if let Some(at) = registered_position(record, topology) {
            self.show_personal_registered(kind, viewport, at, identity);
            restored.registered = true;
        }
        restored
    }

    pub fn gps_marker(&self, kind: ViewportKind) -> Option<H> {
        self.slot(kind).gps
    }

    pub fn registered_marker(&self, kind: ViewportKind) -> Option<H> {
        self.slot(kind).registered
    }

    pub fn member_markers(&self, kind: ViewportKind) -> impl Iterator<Item = (H, &MarkerBinding)> + '_ {
        self.slot(kind).members.iter().map(|(h, b)| (*h, b))
    }

    pub fn binding(&self, kind: ViewportKind, handle: H) -> Option<&MarkerBinding> {
        self.slot(kind)
            .members
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, b)| b)
    }

    /// Detail view for a clicked member-layer marker.
    pub fn click(&self, kind: ViewportKind, handle: H, topology: &Topology) -> Option<DetailView> {
        Some(match self.binding(kind, handle)? {
            MarkerBinding::Member(m) => DetailView::Member(MemberDetail::new(m, topology)),
            MarkerBinding::Cluster(g) => DetailView::Cluster(ClusterDetail::new(g, topology)),
        })
    }

    /// Member detail for a row picked inside a cluster popup.
    pub fn select_cluster_member(
        &self,
        kind: ViewportKind,
        handle: H,
        member_id: &str,
        topology: &Topology,
    ) -> Option<MemberDetail> {
        match self.binding(kind, handle)? {
            MarkerBinding::Cluster(g) => g
                .members
                .iter()
                .find(|m| m.id == member_id)
                .map(|m| MemberDetail::new(m, topology)),
            MarkerBinding::Member(_) => None,
        }
    }
}

/// Room centroid for a non-manual record whose ids resolve.
pub fn registered_position(record: &PresenceRecord, topology: &Topology) -> Option<LatLng> {
    if record.is_manual {
        return None;
    }
    let (building, floor, room) = record.room_ids()?;
    let Some(found) = topology.resolve(building, floor, room) else {
        tracing::debug!(building, floor, room, "registered room no longer in topology");
        return None;
    };
    centroid(&found.room.polygon).ok()
}

#[cfg(test)]
mod tests {
    use super::{MarkerBinding, MarkerLifecycleManager, Restored};
    use crate::pins::{Identity, MarkerElement};
    use crate::popup::DetailView;
    use crate::viewport::{MemoryViewport, ViewportKind};
    use catalog::PresenceRecord;
    use chrono::{DateTime, Utc};
    use compute::{GroupFilter, PresenceClusterer};
    use foundation::{Handle, LatLng};
    use formats::{
        Building, DisplayOffset, Floor, MemberLocation, MemberPresence, MemberStatus, Room, Topology,
    };

    const NOW: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

    fn topology() -> Topology {
        Topology {
            buildings: vec![Building {
                id: "B1".to_string(),
                display_name: "North Hall".to_string(),
                polygon: vec![
                    LatLng::new(0.0, 0.0),
                    LatLng::new(0.0, 1.0),
                    LatLng::new(1.0, 1.0),
                    LatLng::new(1.0, 0.0),
                ],
                floors: vec![Floor {
                    label: "1F".to_string(),
                    rooms: vec![Room {
                        id: "R1".to_string(),
                        display_name: "Lobby".to_string(),
                        usage_label: String::new(),
                        polygon: vec![
                            LatLng::new(0.0, 0.0),
                            LatLng::new(0.0, 0.2),
                            LatLng::new(0.2, 0.2),
                            LatLng::new(0.2, 0.0),
                        ],
                    }],
                }],
            }],
        }
    }

    fn member(id: &str, room: &str) -> MemberPresence {
        MemberPresence {
            id: id.to_string(),
            username: id.to_string(),
            icon_url: None,
            status: MemberStatus::Present,
            groups: Default::default(),
            note: None,
            location: Some(MemberLocation {
                coordinates: LatLng::new(0.1, 0.1),
                building_id: "B1".to_string(),
                floor_label: "1F".to_string(),
                room_id: room.to_string(),
                display_offset: DisplayOffset::default(),
                timestamp: NOW,
            }),
        }
    }

    fn record(building: &str) -> PresenceRecord {
        PresenceRecord {
            user_id: "me".to_string(),
            username: "me".to_string(),
            building_id: Some(building.to_string()),
            building_name: Some("North Hall".to_string()),
            floor_label: Some("1F".to_string()),
            room_id: Some("R1".to_string()),
            room_name: Some("Lobby".to_string()),
            coordinates: Some(LatLng::new(0.05, 0.05)),
            timestamp: NOW,
            is_manual: false,
            manual_location_name: None,
        }
    }

    fn gps_count(vp: &MemoryViewport) -> usize {
        vp.count_where(|e| matches!(e, MarkerElement::PersonalGps(_)))
    }

    #[test]
    fn personal_gps_is_replaced_not_duplicated() {
        let mut vp = MemoryViewport::new(15.0);
        let mut mgr = MarkerLifecycleManager::<Handle>::new();
        let me = Some(Identity {
            username: "me",
            icon_url: None,
        });
        mgr.show_personal_gps(ViewportKind::Preview, &mut vp, LatLng::new(0.1, 0.1), me);
        let h = mgr.show_personal_gps(ViewportKind::Preview, &mut vp, LatLng::new(0.2, 0.2), me);
        assert_eq!(gps_count(&vp), 1);
        assert_eq!(vp.marker(h).map(|m| m.at), Some(LatLng::new(0.2, 0.2)));

        mgr.show_personal_registered(ViewportKind::Preview, &mut vp, LatLng::new(0.3, 0.3), me);
        mgr.show_personal_registered(ViewportKind::Preview, &mut vp, LatLng::new(0.3, 0.3), me);
        assert_eq!(vp.marker_count(), 2);
    }

    #[test]
    fn clear_registered_keeps_gps_pin() {
        let mut vp = MemoryViewport::new(15.0);
        let mut mgr = MarkerLifecycleManager::<Handle>::new();
        mgr.show_personal_gps(ViewportKind::Preview, &mut vp, LatLng::new(0.1, 0.1), None);
        mgr.show_personal_registered(ViewportKind::Preview, &mut vp, LatLng::new(0.3, 0.3), None);

        assert!(mgr.clear_registered(ViewportKind::Preview, &mut vp));
        assert!(!mgr.clear_registered(ViewportKind::Preview, &mut vp));
        assert_eq!(mgr.registered_marker(ViewportKind::Preview), None);
        assert_eq!(gps_count(&vp), 1);
        assert_eq!(vp.marker_count(), 1);
    }

    #[test]
    fn member_layer_refresh_never_accumulates() {
        let members = vec![member("a", "R1"), member("b", "R1"), member("c", "R2")];
        let groups = PresenceClusterer::default().cluster(&members, 14.0, &GroupFilter::All);
        assert_eq!(groups.len(), 2);

        let mut vp = MemoryViewport::new(14.0);
        let mut mgr = MarkerLifecycleManager::new();
        mgr.show_personal_gps(ViewportKind::FullScreen, &mut vp, LatLng::new(0.0, 0.0), None);
        mgr.refresh_member_layer(ViewportKind::FullScreen, &mut vp, &groups, NOW);
        mgr.refresh_member_layer(ViewportKind::FullScreen, &mut vp, &groups, NOW);
        assert_eq!(vp.count_where(MarkerElement::is_member_layer), groups.len());
        assert_eq!(gps_count(&vp), 1);

        mgr.clear_member_layer(ViewportKind::FullScreen, &mut vp);
        assert_eq!(vp.marker_count(), 1);
    }

    #[test]
    fn viewports_are_independent() {
        let mut preview = MemoryViewport::new(14.0);
        let mut full = MemoryViewport::new(14.0);
        let mut mgr = MarkerLifecycleManager::new();
        mgr.show_personal_gps(ViewportKind::Preview, &mut preview, LatLng::new(0.0, 0.0), None);
        mgr.show_personal_gps(ViewportKind::FullScreen, &mut full, LatLng::new(0.0, 0.0), None);
        mgr.detach(ViewportKind::FullScreen, &mut full);
        assert_eq!(full.marker_count(), 0);
        assert_eq!(gps_count(&preview), 1);
        assert!(mgr.gps_marker(ViewportKind::Preview).is_some());
        assert!(mgr.gps_marker(ViewportKind::FullScreen).is_none());
    }

    #[test]
    fn clicks_expose_bound_member_or_cluster() {
        let t = topology();
        let members = vec![member("a", "R1"), member("b", "R1"), member("c", "R2")];
        let groups = PresenceClusterer::default().cluster(&members, 14.0, &GroupFilter::All);
        let mut vp = MemoryViewport::new(14.0);
        let mut mgr = MarkerLifecycleManager::new();
        mgr.refresh_member_layer(ViewportKind::Preview, &mut vp, &groups, NOW);

        let handles: Vec<Handle> = mgr.member_markers(ViewportKind::Preview).map(|(h, _)| h).collect();
        match mgr.click(ViewportKind::Preview, handles[0], &t) {
            Some(DetailView::Cluster(d)) => assert_eq!(d.summary, "2 members in room"),
            other => panic!("expected cluster detail, got {other:?}"),
        }
        match mgr.binding(ViewportKind::Preview, handles[1]) {
            Some(MarkerBinding::Member(m)) => assert_eq!(m.id, "c"),
            other => panic!("expected member binding, got {other:?}"),
        }
        let picked = mgr
            .select_cluster_member(ViewportKind::Preview, handles[0], "b", &t)
            .expect("member detail");
        assert_eq!(picked.location, "North Hall 1F Lobby");
        assert!(mgr.click(ViewportKind::FullScreen, handles[0], &t).is_none());
    }

    #[test]
    fn restore_rebuilds_personal_pins_from_record() {
        let t = topology();
        let mut vp = MemoryViewport::new(15.0);
        let mut mgr = MarkerLifecycleManager::new();
        let restored = mgr.restore(ViewportKind::Preview, &mut vp, &record("B1"), &t, None);
        assert_eq!(
            restored,
            Restored {
                gps: true,
                registered: true
            }
        );
        let h = mgr.registered_marker(ViewportKind::Preview).expect("registered");
        let at = vp.marker(h).expect("placed").at;
        assert!((at.lat - 0.1).abs() < 1e-12 && (at.lng - 0.1).abs() < 1e-12);

        mgr.restore(ViewportKind::Preview, &mut vp, &record("B1"), &t, None);
        assert_eq!(vp.marker_count(), 2);
    }

    #[test]
    fn restore_skips_dangling_ids_and_manual_records() {
        let t = topology();
        let mut vp = MemoryViewport::new(15.0);
        let mut mgr = MarkerLifecycleManager::new();
        let restored = mgr.restore(ViewportKind::Preview, &mut vp, &record("GONE"), &t, None);
        assert!(restored.gps && !restored.registered);

        let manual = PresenceRecord {
            is_manual: true,
            manual_location_name: Some("cafe".to_string()),
            coordinates: None,
            ..record("B1")
        };
        let restored = mgr.restore(ViewportKind::Preview, &mut vp, &manual, &t, None);
        assert_eq!(restored, Restored::default());
        assert_eq!(vp.marker_count(), 0);
    }
}
