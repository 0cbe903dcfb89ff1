//! Marker elements handed to a [`crate::Viewport`].

use catalog::UserProfile;
use chrono::{DateTime, Utc};
use compute::{ClusterGroup, ClusterKey, Granularity, PinHint};
use foundation::LatLng;
use formats::{MemberPresence, MemberStatus};

use crate::symbology::{CLUSTER_PIN, ClusterBadge, GPS_PIN, Glyph, PinStyle, REGISTERED_PIN};

/// Who a personal pin belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity<'a> {
    pub username: &'a str,
    pub icon_url: Option<&'a str>,
}

impl<'a> From<&'a UserProfile> for Identity<'a> {
    fn from(user: &'a UserProfile) -> Self {
        Self {
            username: &user.username,
            icon_url: user.icon_url.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalPin {
    pub glyph: Glyph,
    pub style: PinStyle,
}

impl PersonalPin {
    pub fn gps(identity: Option<Identity<'_>>) -> Self {
        Self::with_style(identity, GPS_PIN)
    }

    pub fn registered(identity: Option<Identity<'_>>) -> Self {
        Self::with_style(identity, REGISTERED_PIN)
    }

    fn with_style(identity: Option<Identity<'_>>, style: PinStyle) -> Self {
        let glyph = Glyph::resolve(
            identity.and_then(|i| i.icon_url),
            identity.map(|i| i.username),
        );
        Self { glyph, style }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberPin {
    pub member_id: String,
    pub glyph: Glyph,
    pub status: MemberStatus,
    pub color: &'static str,
    pub opacity: f32,
}

impl MemberPin {
    pub fn new(member: &MemberPresence, now: DateTime<Utc>) -> Self {
        let hint = PinHint::for_member(member, now);
        Self {
            member_id: member.id.clone(),
            glyph: Glyph::resolve(member.icon_url.as_deref(), Some(&member.username)),
            status: member.status,
            color: hint.color,
            opacity: hint.opacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterPin {
    pub key: ClusterKey,
    pub granularity: Granularity,
    pub badge: ClusterBadge,
    pub style: PinStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerElement {
    PersonalGps(PersonalPin),
    PersonalRegistered(PersonalPin),
    Member(MemberPin),
    Cluster(ClusterPin),
}

impl MarkerElement {
    /// Member and cluster markers, as opposed to the user's own pins.
    pub fn is_member_layer(&self) -> bool {
        matches!(self, MarkerElement::Member(_) | MarkerElement::Cluster(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MarkerElement::PersonalGps(_) => "gps",
            MarkerElement::PersonalRegistered(_) => "registered",
            MarkerElement::Member(_) => "member",
            MarkerElement::Cluster(_) => "cluster",
        }
    }
}

/// Marker and position for one cluster group.
///
/// A group of one is drawn as an individual pin at the member's displaced
/// position, whatever granularity produced it.
pub fn pin_for_group(group: &ClusterGroup, now: DateTime<Utc>) -> (MarkerElement, LatLng) {
    match group.single_member() {
        Some(member) => {
            let at = member
                .location
                .as_ref()
                .map_or(group.coordinates, |loc| loc.display_position());
            (MarkerElement::Member(MemberPin::new(member, now)), at)
        }
        None => (
            MarkerElement::Cluster(ClusterPin {
                key: group.key.clone(),
                granularity: group.granularity,
                badge: ClusterBadge::for_count(group.len()),
                style: CLUSTER_PIN,
            }),
            group.coordinates,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{Identity, MarkerElement, PersonalPin, pin_for_group};
    use crate::symbology::Glyph;
    use chrono::{DateTime, Utc};
    use compute::{GroupFilter, PresenceClusterer};
    use foundation::LatLng;
    use formats::{DisplayOffset, MemberLocation, MemberPresence, MemberStatus};

    fn member(id: &str, room: &str, offset: DisplayOffset) -> MemberPresence {
        MemberPresence {
            id: id.to_string(),
            username: id.to_uppercase(),
            icon_url: None,
            status: MemberStatus::Present,
            groups: Default::default(),
            note: None,
            location: Some(MemberLocation {
                coordinates: LatLng::new(35.0, 136.0),
                building_id: "B1".to_string(),
                floor_label: "1F".to_string(),
                room_id: room.to_string(),
                display_offset: offset,
                timestamp: DateTime::<Utc>::UNIX_EPOCH,
            }),
        }
    }

    #[test]
    fn personal_pin_falls_back_to_initial() {
        let pin = PersonalPin::gps(Some(Identity {
            username: "mio",
            icon_url: None,
        }));
        assert_eq!(pin.glyph, Glyph::Initial('m'));
        assert_eq!(pin.style.fill, "#FF0000");
        assert_eq!(PersonalPin::registered(None).glyph, Glyph::Initial('?'));
        assert_eq!(PersonalPin::registered(None).style.fill, "#0066FF");
    }

    #[test]
    fn singleton_renders_identically_at_every_zoom() {
        let members = vec![
            member("a", "R1", DisplayOffset { x: 3.0, y: 1.0 }),
            member("b", "R2", DisplayOffset::default()),
            member("c", "R2", DisplayOffset::default()),
        ];
        let now = DateTime::<Utc>::UNIX_EPOCH;
        let clusterer = PresenceClusterer::default();
        let pin_of_a = |zoom: f64| {
            clusterer
                .cluster(&members, zoom, &GroupFilter::All)
                .iter()
                .map(|g| pin_for_group(g, now))
                .find(|(el, _)| matches!(el, MarkerElement::Member(p) if p.member_id == "a"))
        };

        let individual = pin_of_a(18.0).expect("individual pin");
        assert_eq!(pin_of_a(14.0), Some(individual.clone()));
        assert!((individual.1.lng - 136.000_03).abs() < 1e-12);
        assert!((individual.1.lat - 35.000_01).abs() < 1e-12);

        let groups = clusterer.cluster(&members, 14.0, &GroupFilter::All);
        let (cluster, at) = pin_for_group(&groups[1], now);
        match cluster {
            MarkerElement::Cluster(pin) => assert_eq!(pin.badge.text, "2"),
            other => panic!("expected cluster, got {other:?}"),
        }
        assert_eq!(at, LatLng::new(35.0, 136.0));
    }
}
