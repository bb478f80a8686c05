//! Read access to causes and volunteer profiles.
//!
//! The account and cause CRUD layers own this data; the engine only reads it.

use crate::error::CatalogError;
use async_trait::async_trait;
use impact_types::{Cause, CauseId, VolunteerId, VolunteerProfile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

/// Collaborator contract for cause and volunteer lookups.
#[async_trait]
pub trait CauseCatalog: Send + Sync {
    /// Every published cause, in stable corpus order.
    async fn list_causes(&self) -> Result<Vec<Cause>, CatalogError>;

    async fn get_volunteer(
        &self,
        volunteer_id: &VolunteerId,
    ) -> Result<Option<VolunteerProfile>, CatalogError>;

    async fn get_cause(&self, cause_id: &CauseId) -> Result<Option<Cause>, CatalogError> {
        Ok(self
            .list_causes()
            .await?
            .into_iter()
            .find(|c| &c.cause_id == cause_id))
    }
}

/// Seed file layout for [`InMemoryCatalog`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub causes: Vec<Cause>,
    #[serde(default)]
    pub volunteers: Vec<VolunteerProfile>,
}

/// In-memory catalog. Causes keep insertion order; re-publishing a cause
/// replaces it in place.
#[derive(Default)]
pub struct InMemoryCatalog {
    causes: RwLock<Vec<Cause>>,
    volunteers: RwLock<HashMap<VolunteerId, VolunteerProfile>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Result<Self, CatalogError> {
        let catalog = Self::new();
        for cause in seed.causes {
            catalog.upsert_cause(cause)?;
        }
        for volunteer in seed.volunteers {
            catalog.upsert_volunteer(volunteer)?;
        }
        Ok(catalog)
    }

    /// Load a JSON seed file (`{"causes": [...], "volunteers": [...]}`).
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Seed(format!("{}: {}", path.display(), e)))?;
        let seed: CatalogSeed = serde_json::from_str(&raw)
            .map_err(|e| CatalogError::Seed(format!("{}: {}", path.display(), e)))?;
        Self::from_seed(seed)
    }

    pub fn upsert_cause(&self, cause: Cause) -> Result<(), CatalogError> {
        let mut guard = self
            .causes
            .write()
            .map_err(|_| CatalogError::Backend("causes lock poisoned".to_string()))?;
        match guard.iter_mut().find(|c| c.cause_id == cause.cause_id) {
            Some(existing) => *existing = cause,
            None => guard.push(cause),
        }
        Ok(())
    }

    pub fn upsert_volunteer(&self, volunteer: VolunteerProfile) -> Result<(), CatalogError> {
        let mut guard = self
            .volunteers
            .write()
            .map_err(|_| CatalogError::Backend("volunteers lock poisoned".to_string()))?;
        guard.insert(volunteer.volunteer_id.clone(), volunteer);
        Ok(())
    }
}

#[async_trait]
impl CauseCatalog for InMemoryCatalog {
    async fn list_causes(&self) -> Result<Vec<Cause>, CatalogError> {
        let guard = self
            .causes
            .read()
            .map_err(|_| CatalogError::Backend("causes lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    async fn get_volunteer(
        &self,
        volunteer_id: &VolunteerId,
    ) -> Result<Option<VolunteerProfile>, CatalogError> {
        let guard = self
            .volunteers
            .read()
            .map_err(|_| CatalogError::Backend("volunteers lock poisoned".to_string()))?;
        Ok(guard.get(volunteer_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_replaces_in_place_and_keeps_order() {
        let catalog = InMemoryCatalog::new();
        catalog
            .upsert_cause(Cause::new("c-1", "one", "first", "x", "Pune", "o"))
            .unwrap();
        catalog
            .upsert_cause(Cause::new("c-2", "two", "second", "x", "Pune", "o"))
            .unwrap();
        catalog
            .upsert_cause(Cause::new("c-1", "one", "edited", "x", "Pune", "o"))
            .unwrap();

        let causes = catalog.list_causes().await.unwrap();
        assert_eq!(causes.len(), 2);
        assert_eq!(causes[0].description, "edited");
        assert_eq!(causes[1].cause_id, CauseId::new("c-2"));

        let found = catalog.get_cause(&CauseId::new("c-2")).await.unwrap();
        assert_eq!(found.map(|c| c.name), Some("two".to_string()));
    }

    #[tokio::test]
    async fn seed_round_trip_through_json() {
        let json = r#"{
            "causes": [{
                "cause_id": "c-1", "name": "Tree Plantation", "description": "Plant trees",
                "category": "Environment", "city": "Bangalore", "org_id": "o-1"
            }],
            "volunteers": [{"volunteer_id": "v-1", "interests": "trees", "city": "Bangalore"}]
        }"#;
        let seed: CatalogSeed = serde_json::from_str(json).unwrap();
        let catalog = InMemoryCatalog::from_seed(seed).unwrap();

        assert_eq!(catalog.list_causes().await.unwrap().len(), 1);
        let volunteer = catalog
            .get_volunteer(&VolunteerId::new("v-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(volunteer.city, "Bangalore");
        assert!(catalog
            .get_volunteer(&VolunteerId::new("nobody"))
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn load_json_reports_missing_file() {
        let err = InMemoryCatalog::load_json("/definitely/not/here.json").err();
        assert!(matches!(err, Some(CatalogError::Seed(_))));
    }
}
