//! Application controller: wires topology, member snapshot, persisted state
//! and the two viewports together over an explicit [`Session`].

use std::fmt;

use catalog::{CatalogError, PresenceCatalog, PresenceRecord, StateStore, UserProfile};
use chrono::{DateTime, Utc};
use compute::{BuildingLocator, GroupFilter, Location, PresenceClusterer, RankedRoom, RoomRanker};
use foundation::LatLng;
use foundation::math::{GeoError, centroid};
use formats::{DocumentError, MemberSnapshot, Topology};
use layers::{
    BuildingOverlay, DetailView, Identity, LayerId, MarkerLifecycleManager, MemberDetail, Restored,
    Viewport, ViewportKind,
};
use runtime::{EventBus, Geolocator, LocationError, LocationProvider};

use crate::config::AppConfig;
use crate::session::Session;

#[derive(Debug)]
pub enum AppError {
    Document(DocumentError),
    Catalog(CatalogError),
    Location(LocationError),
    Geo(GeoError),
    MissingUser,
    IncompleteSelection,
    EmptyManualLocation,
    NoFix,
    UnknownBuilding(String),
    UnknownFloor(String),
    UnknownRoom(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Document(e) => write!(f, "{e}"),
            AppError::Catalog(e) => write!(f, "{e}"),
            AppError::Location(e) => write!(f, "{e}"),
            AppError::Geo(e) => write!(f, "{e}"),
            AppError::MissingUser => write!(f, "no user profile; run `profile` first"),
            AppError::IncompleteSelection => write!(f, "select a building, floor and room first"),
            AppError::EmptyManualLocation => write!(f, "manual location name is empty"),
            AppError::NoFix => write!(f, "no location fix yet"),
            AppError::UnknownBuilding(id) => write!(f, "unknown building {id:?}"),
            AppError::UnknownFloor(label) => write!(f, "unknown floor {label:?}"),
            AppError::UnknownRoom(id) => write!(f, "unknown room {id:?}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Document(e) => Some(e),
            AppError::Catalog(e) => Some(e),
            AppError::Location(e) => Some(e),
            AppError::Geo(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DocumentError> for AppError {
    fn from(e: DocumentError) -> Self {
        AppError::Document(e)
    }
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        AppError::Catalog(e)
    }
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        AppError::Location(e)
    }
}

impl From<GeoError> for AppError {
    fn from(e: GeoError) -> Self {
        AppError::Geo(e)
    }
}

/// Host events that trigger a member-layer refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    /// The host changed this viewport's zoom; the new level is read back
    /// from the viewport itself.
    ZoomChanged(ViewportKind),
    GroupFilterChanged(GroupFilter),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocateOutcome {
    pub position: LatLng,
    /// Containing building, already selected in the session.
    pub building_id: Option<String>,
    /// Closest building `(id, meters)` when the fix is outside every footprint.
    pub nearest: Option<(String, f64)>,
}

pub struct PresenceApp<S, V: Viewport> {
    topology: Topology,
    members: MemberSnapshot,
    catalog: PresenceCatalog<S>,
    session: Session,
    ranker: RoomRanker,
    clusterer: PresenceClusterer,
    markers: MarkerLifecycleManager<V::Handle>,
    viewports: [Option<V>; 2],
    events: EventBus<DisplayEvent>,
}

impl<S: StateStore, V: Viewport> PresenceApp<S, V> {
    pub fn new(
        topology: Topology,
        members: MemberSnapshot,
        catalog: PresenceCatalog<S>,
        config: &AppConfig,
    ) -> Self {
        let user = catalog.load_user().unwrap_or_else(|e| {
            tracing::warn!("ignoring stored profile: {e}");
            None
        });
        tracing::info!(
            buildings = topology.buildings.len(),
            members = members.members.len(),
            user = user.as_ref().map_or("-", |u| u.username.as_str()),
            "presence app ready"
        );
        Self {
            topology,
            members,
            catalog,
            session: Session::new(user),
            ranker: RoomRanker::new(config.room_radius_m),
            clusterer: PresenceClusterer::new(config.cluster),
            markers: MarkerLifecycleManager::new(),
            viewports: [None, None],
            events: EventBus::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn catalog(&self) -> &PresenceCatalog<S> {
        &self.catalog
    }

    pub fn markers(&self) -> &MarkerLifecycleManager<V::Handle> {
        &self.markers
    }

    pub fn viewport(&self, kind: ViewportKind) -> Option<&V> {
        self.viewports[kind.index()].as_ref()
    }

    pub fn viewport_mut(&mut self, kind: ViewportKind) -> Option<&mut V> {
        self.viewports[kind.index()].as_mut()
    }

    pub fn building_overlay(&self) -> BuildingOverlay {
        BuildingOverlay::from_topology(&self.topology)
    }

    pub fn set_user(&mut self, user: UserProfile) -> Result<(), AppError> {
        self.catalog.save_user(&user)?;
        self.session.user = Some(user);
        Ok(())
    }

    /// Stored presence record; corrupt state is logged and treated as absent.
    pub fn stored_presence(&self) -> Option<PresenceRecord> {
        self.catalog.load_presence().unwrap_or_else(|e| {
            tracing::warn!("ignoring stored presence: {e}");
            None
        })
    }

    /// Attaches a viewport and brings it in line with the session.
    ///
    /// Personal pins are rebuilt from the stored record without a new fix.
    pub fn attach(&mut self, kind: ViewportKind, mut viewport: V, now: DateTime<Utc>) -> Restored {
        if let Some(mut old) = self.viewports[kind.index()].take() {
            self.markers.detach(kind, &mut old);
        }

        for layer in LayerId::BUILDINGS {
            viewport.set_layer_visibility(layer, self.session.show_buildings);
        }

        let restored = match self.stored_presence() {
            Some(record) => {
                self.adopt_record(&record);
                let identity = self.session.user.as_ref().map(Identity::from);
                let mut restored =
                    self.markers
                        .restore(kind, &mut viewport, &record, &self.topology, identity);
                // Manual records pin the current fix, as registration does live.
                if let (true, Some(fix)) = (record.is_manual, self.session.fix) {
                    self.markers
                        .show_personal_registered(kind, &mut viewport, fix, identity);
                    restored.registered = true;
                }
                restored
            }
            None => Restored::default(),
        };
        tracing::debug!(viewport = %kind, ?restored, "viewport attached");

        self.viewports[kind.index()] = Some(viewport);
        if self.session.show_members {
            self.refresh_viewport(kind, now);
        }
        restored
    }

    /// Seeds an empty session from the stored record: the fix of a room
    /// registration, and the selection when its ids still resolve.
    fn adopt_record(&mut self, record: &PresenceRecord) {
        if self.session.fix.is_none() && !record.is_manual {
            self.session.fix = record.coordinates;
        }
        if self.session.selection.building_id.is_some() {
            return;
        }
        if let Some((building_id, floor_label, room_id)) = record.room_ids() {
            if self.topology.resolve(building_id, floor_label, room_id).is_some() {
                let selection = &mut self.session.selection;
                selection.select_building(building_id);
                selection.select_floor(floor_label);
                selection.select_room(room_id);
            }
        }
    }

    pub fn detach(&mut self, kind: ViewportKind) -> Option<V> {
        let mut viewport = self.viewports[kind.index()].take()?;
        self.markers.detach(kind, &mut viewport);
        Some(viewport)
    }

    /// Acquires a fix, pins it on every viewport and resolves the building.
    ///
    /// A failed or timed-out read leaves the session and markers untouched.
    pub async fn locate<P: LocationProvider>(
        &mut self,
        geolocator: &Geolocator<P>,
    ) -> Result<LocateOutcome, AppError> {
        let position = geolocator.acquire().await?;
        self.session.fix = Some(position);

        let identity = self.session.user.as_ref().map(Identity::from);
        for kind in ViewportKind::ALL {
            if let Some(viewport) = self.viewports[kind.index()].as_mut() {
                self.markers.show_personal_gps(kind, viewport, position, identity);
            }
        }

        let locator = BuildingLocator::new(&self.topology);
        let outcome = match locator.locate(position) {
            Location::Inside(building) => LocateOutcome {
                position,
                building_id: Some(building.id.clone()),
                nearest: None,
            },
            Location::NotFound => LocateOutcome {
                position,
                building_id: None,
                nearest: locator
                    .nearest(position)
                    .map(|n| (n.building.id.clone(), n.distance_m)),
            },
        };

        match &outcome.building_id {
            Some(id) => self.session.selection.select_building(id.clone()),
            None => self.session.selection.clear(),
        }
        tracing::info!(%position, building = ?outcome.building_id, "located");
        Ok(outcome)
    }

    pub fn select_building(&mut self, id: &str) -> Result<(), AppError> {
        if self.topology.building(id).is_none() {
            return Err(AppError::UnknownBuilding(id.to_string()));
        }
        self.session.selection.select_building(id);
        Ok(())
    }

    /// Selects a floor and returns its rooms ranked around the current fix.
    pub fn select_floor(&mut self, label: &str) -> Result<Vec<RankedRoom<'_>>, AppError> {
        let building_id = self
            .session
            .selection
            .building_id
            .as_deref()
            .ok_or(AppError::IncompleteSelection)?;
        let building = self
            .topology
            .building(building_id)
            .ok_or_else(|| AppError::UnknownBuilding(building_id.to_string()))?;
        let floor = building
            .floor(label)
            .ok_or_else(|| AppError::UnknownFloor(label.to_string()))?;
        let fix = self.session.fix.ok_or(AppError::NoFix)?;

        self.session.selection.select_floor(label);
        Ok(self.ranker.rank(fix, floor))
    }

    pub fn select_room(&mut self, id: &str) -> Result<(), AppError> {
        let selection = &self.session.selection;
        let (Some(building_id), Some(floor_label)) =
            (selection.building_id.as_deref(), selection.floor_label.as_deref())
        else {
            return Err(AppError::IncompleteSelection);
        };
        if self.topology.resolve(building_id, floor_label, id).is_none() {
            return Err(AppError::UnknownRoom(id.to_string()));
        }
        self.session.selection.select_room(id);
        Ok(())
    }

    /// Persists the selected room and pins its centroid on every viewport.
    pub fn register_location(&mut self, now: DateTime<Utc>) -> Result<PresenceRecord, AppError> {
        let user = self.session.user.as_ref().ok_or(AppError::MissingUser)?;
        let (building_id, floor_label, room_id) = self
            .session
            .selection
            .complete()
            .ok_or(AppError::IncompleteSelection)?;
        let fix = self.session.fix.ok_or(AppError::NoFix)?;
        let found = self
            .topology
            .resolve(building_id, floor_label, room_id)
            .ok_or_else(|| AppError::UnknownRoom(room_id.to_string()))?;
        let at = centroid(&found.room.polygon)?;

        let record = PresenceRecord {
            user_id: user.id.clone(),
            username: user.username.clone(),
            building_id: Some(building_id.to_string()),
            building_name: Some(found.building.display_name.clone()),
            floor_label: Some(floor_label.to_string()),
            room_id: Some(room_id.to_string()),
            room_name: Some(found.room.display_name.clone()),
            coordinates: Some(fix),
            timestamp: now,
            is_manual: false,
            manual_location_name: None,
        };
        self.catalog.save_presence(&record)?;
        tracing::info!(building_id, floor_label, room_id, "registered location");
        self.show_registered(Some(at));
        Ok(record)
    }

    /// Persists a free-text location; pins the current fix when there is one.
    pub fn register_manual(&mut self, name: &str, now: DateTime<Utc>) -> Result<PresenceRecord, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::EmptyManualLocation);
        }
        let user = self.session.user.as_ref().ok_or(AppError::MissingUser)?;

        let record = PresenceRecord {
            user_id: user.id.clone(),
            username: user.username.clone(),
            building_id: None,
            building_name: None,
            floor_label: None,
            room_id: None,
            room_name: Some(name.to_string()),
            coordinates: None,
            timestamp: now,
            is_manual: true,
            manual_location_name: Some(name.to_string()),
        };
        self.catalog.save_presence(&record)?;
        tracing::info!(name, "registered manual location");
        self.show_registered(self.session.fix);
        Ok(record)
    }

    /// Replaces the registered pin on every viewport; `None` only clears it.
    fn show_registered(&mut self, at: Option<LatLng>) {
        let identity = self.session.user.as_ref().map(Identity::from);
        for kind in ViewportKind::ALL {
            let Some(viewport) = self.viewports[kind.index()].as_mut() else {
                continue;
            };
            match at {
                Some(at) => {
                    self.markers.show_personal_registered(kind, viewport, at, identity);
                }
                None => {
                    self.markers.clear_registered(kind, viewport);
                }
            }
        }
    }

    /// Flips building-footprint visibility on every viewport.
    pub fn toggle_buildings(&mut self) -> bool {
        self.session.show_buildings = !self.session.show_buildings;
        let visible = self.session.show_buildings;
        for viewport in self.viewports.iter_mut().flatten() {
            for layer in LayerId::BUILDINGS {
                viewport.set_layer_visibility(layer, visible);
            }
        }
        visible
    }

    pub fn toggle_members(&mut self, now: DateTime<Utc>) -> bool {
        self.session.show_members = !self.session.show_members;
        if self.session.show_members {
            self.refresh_members(now);
        } else {
            for kind in ViewportKind::ALL {
                if let Some(viewport) = self.viewports[kind.index()].as_mut() {
                    self.markers.clear_member_layer(kind, viewport);
                }
            }
        }
        self.session.show_members
    }

    pub fn set_group_filter(&mut self, filter: GroupFilter, now: DateTime<Utc>) {
        self.session.group_filter = filter;
        if self.session.show_members {
            self.refresh_members(now);
        }
    }

    pub fn refresh_members(&mut self, now: DateTime<Utc>) {
        for kind in ViewportKind::ALL {
            self.refresh_viewport(kind, now);
        }
    }

    /// Full rebuild of one viewport's member layer at its current zoom.
    pub fn refresh_viewport(&mut self, kind: ViewportKind, now: DateTime<Utc>) -> usize {
        let Some(viewport) = self.viewports[kind.index()].as_mut() else {
            return 0;
        };
        let groups = self.clusterer.cluster(
            &self.members.members,
            viewport.zoom(),
            &self.session.group_filter,
        );
        self.markers.refresh_member_layer(kind, viewport, &groups, now)
    }

    pub fn emit(&mut self, event: DisplayEvent) -> u64 {
        self.events.emit(event)
    }

    /// Handles queued events in order. Each zoom event is a full rebuild.
    pub fn process_events(&mut self, now: DateTime<Utc>) -> usize {
        let pending = self.events.drain();
        let handled = pending.len();
        for envelope in pending {
            match envelope.event {
                DisplayEvent::ZoomChanged(viewport) => {
                    let zoom = self.viewport(viewport).map(Viewport::zoom);
                    tracing::debug!(seq = envelope.seq, %viewport, ?zoom, "zoom changed");
                    if self.session.show_members {
                        self.refresh_viewport(viewport, now);
                    }
                }
                DisplayEvent::GroupFilterChanged(filter) => {
                    tracing::debug!(seq = envelope.seq, %filter, "group filter changed");
                    self.set_group_filter(filter, now);
                }
            }
        }
        handled
    }

    pub fn click(&self, kind: ViewportKind, handle: V::Handle) -> Option<DetailView> {
        self.markers.click(kind, handle, &self.topology)
    }

    pub fn select_cluster_member(
        &self,
        kind: ViewportKind,
        handle: V::Handle,
        member_id: &str,
    ) -> Option<MemberDetail> {
        self.markers
            .select_cluster_member(kind, handle, member_id, &self.topology)
    }
}
