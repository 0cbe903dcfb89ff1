//! Typed user profile and presence record over a [`StateStore`].

use chrono::{DateTime, Utc};
use foundation::LatLng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{CatalogError, StateStore};

pub const USER_KEY: &str = "watakoko_user";
pub const LOCATION_KEY: &str = "watakoko_location";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub icon_type: Option<String>,
    #[serde(default)]
    pub icon_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        group: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            group: group.into(),
            icon_url: None,
            icon_type: None,
            icon_data: None,
            created_at,
        }
    }
}

/// The local user's self-reported location.
///
/// Room registrations carry building/floor/room ids and the fix they were
/// made from; manual registrations carry only `manual_location_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub building_id: Option<String>,
    #[serde(default)]
    pub building_name: Option<String>,
    #[serde(default)]
    pub floor_label: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub coordinates: Option<LatLng>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default)]
    pub manual_location_name: Option<String>,
}

impl PresenceRecord {
    /// `(building_id, floor_label, room_id)` when all three are set.
    pub fn room_ids(&self) -> Option<(&str, &str, &str)> {
        Some((
            self.building_id.as_deref()?,
            self.floor_label.as_deref()?,
            self.room_id.as_deref()?,
        ))
    }
}

/// Profile and presence persistence under the two fixed keys.
#[derive(Debug, Default)]
pub struct PresenceCatalog<S> {
    store: S,
}

impl<S: StateStore> PresenceCatalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn load_user(&self) -> Result<Option<UserProfile>, CatalogError> {
        self.load_json(USER_KEY)
    }

    pub fn save_user(&mut self, user: &UserProfile) -> Result<(), CatalogError> {
        self.save_json(USER_KEY, user)
    }

    pub fn load_presence(&self) -> Result<Option<PresenceRecord>, CatalogError> {
        self.load_json(LOCATION_KEY)
    }

    pub fn save_presence(&mut self, record: &PresenceRecord) -> Result<(), CatalogError> {
        self.save_json(LOCATION_KEY, record)
    }

    pub fn clear_presence(&mut self) -> Result<bool, CatalogError> {
        self.store.remove(LOCATION_KEY)
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CatalogError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CatalogError::Corrupt(format!("{key}: {e}")))
    }

    fn save_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), CatalogError> {
        let raw = serde_json::to_string(value).map_err(|e| CatalogError::Io(e.to_string()))?;
        self.store.set(key, &raw)?;
        tracing::debug!(key, bytes = raw.len(), "saved state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LOCATION_KEY, PresenceCatalog, PresenceRecord, USER_KEY, UserProfile};
    use crate::{CatalogError, InMemoryStateStore, StateStore};
    use chrono::{DateTime, Utc};
    use foundation::LatLng;
    use pretty_assertions::assert_eq;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn room_record() -> PresenceRecord {
        PresenceRecord {
            user_id: "u1".to_string(),
            username: "Aoi".to_string(),
            building_id: Some("B1".to_string()),
            building_name: Some("North Hall".to_string()),
            floor_label: Some("2F".to_string()),
            room_id: Some("R201".to_string()),
            room_name: Some("Lab".to_string()),
            coordinates: Some(LatLng::new(35.1, 136.9)),
            timestamp: at("2024-05-01T09:00:00Z"),
            is_manual: false,
            manual_location_name: None,
        }
    }

    #[test]
    fn presence_round_trips_with_camel_case_keys() {
        let mut catalog = PresenceCatalog::new(InMemoryStateStore::new());
        catalog.save_presence(&room_record()).unwrap();

        let raw = catalog.store().get(LOCATION_KEY).unwrap().unwrap();
        assert!(raw.contains("\"buildingId\":\"B1\""));
        assert!(raw.contains("\"isManual\":false"));

        let back = catalog.load_presence().unwrap().unwrap();
        assert_eq!(back, room_record());
        assert_eq!(back.room_ids(), Some(("B1", "2F", "R201")));
    }

    #[test]
    fn user_profile_round_trips() {
        let mut catalog = PresenceCatalog::new(InMemoryStateStore::new());
        assert_eq!(catalog.load_user().unwrap(), None);
        let user = UserProfile::new("u1", "Aoi", "lab", at("2024-04-01T00:00:00Z"));
        catalog.save_user(&user).unwrap();
        assert_eq!(catalog.load_user().unwrap(), Some(user));
    }

    #[test]
    fn manual_record_has_no_room_ids() {
        let record = PresenceRecord {
            building_id: None,
            building_name: None,
            floor_label: None,
            room_id: None,
            room_name: None,
            coordinates: None,
            is_manual: true,
            manual_location_name: Some("Library cafe".to_string()),
            ..room_record()
        };
        assert_eq!(record.room_ids(), None);
    }

    #[test]
    fn corrupt_value_is_reported() {
        let mut store = InMemoryStateStore::new();
        store.set(USER_KEY, "{not json").unwrap();
        let catalog = PresenceCatalog::new(store);
        assert!(matches!(catalog.load_user(), Err(CatalogError::Corrupt(_))));
    }

    #[test]
    fn reads_profile_written_by_browser_client() {
        let mut store = InMemoryStateStore::new();
        store
            .set(
                USER_KEY,
                r#"{"id":"user_1","username":"Ren","group":"dev","iconUrl":"icons/default.png",
                    "iconType":"default","iconData":null,"createdAt":"2024-04-01T10:00:00.000Z"}"#,
            )
            .unwrap();
        let user = PresenceCatalog::new(store).load_user().unwrap().unwrap();
        assert_eq!(user.username, "Ren");
        assert_eq!(user.icon_url.as_deref(), Some("icons/default.png"));
        assert_eq!(user.icon_data, None);
    }
}
