//! Explicit per-user state the controller threads through every action.

use catalog::UserProfile;
use compute::GroupFilter;
use foundation::LatLng;

/// Building, floor and room picked in the registration form.
///
/// Picking a parent clears its children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub building_id: Option<String>,
    pub floor_label: Option<String>,
    pub room_id: Option<String>,
}

impl Selection {
    pub fn select_building(&mut self, id: impl Into<String>) {
        self.building_id = Some(id.into());
        self.floor_label = None;
        self.room_id = None;
    }

    pub fn select_floor(&mut self, label: impl Into<String>) {
        self.floor_label = Some(label.into());
        self.room_id = None;
    }

    pub fn select_room(&mut self, id: impl Into<String>) {
        self.room_id = Some(id.into());
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn complete(&self) -> Option<(&str, &str, &str)> {
        Some((
            self.building_id.as_deref()?,
            self.floor_label.as_deref()?,
            self.room_id.as_deref()?,
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<UserProfile>,
    /// Last device fix acquired in this session.
    pub fix: Option<LatLng>,
    pub selection: Selection,
    pub show_buildings: bool,
    pub show_members: bool,
    pub group_filter: GroupFilter,
}

impl Session {
    pub fn new(user: Option<UserProfile>) -> Self {
        Self {
            user,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Selection;

    #[test]
    fn parent_selection_clears_children() {
        let mut s = Selection::default();
        s.select_building("B1");
        s.select_floor("2F");
        s.select_room("R201");
        assert_eq!(s.complete(), Some(("B1", "2F", "R201")));

        s.select_floor("3F");
        assert_eq!(s.room_id, None);
        assert_eq!(s.complete(), None);

        s.select_building("B2");
        assert_eq!(s.floor_label, None);
    }
}
