use std::collections::HashMap;

use rocket::tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::{
    common::incident::IncidentKind,
    db::incident::{Incident, NewIncident},
    mongodb::Id,
};

use super::IncidentStore;

/// An in-process incident store, for tests and local development.
///
/// The revision check and the replace happen under one write lock, which
/// gives the same guarantees as MongoDB's single-document conditional replace.
#[derive(Default)]
pub struct MemoryStore {
    incidents: RwLock<HashMap<Id, Incident>>,
}

/// Newest first.
fn sorted(mut incidents: Vec<Incident>) -> Vec<Incident> {
    incidents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    incidents
}

#[rocket::async_trait]
impl IncidentStore for MemoryStore {
    async fn find_incident_by_id(&self, id: Id) -> Result<Option<Incident>> {
        Ok(self.incidents.read().await.get(&id).cloned())
    }

    async fn find_incidents(&self, kind: Option<IncidentKind>) -> Result<Vec<Incident>> {
        let incidents = self
            .incidents
            .read()
            .await
            .values()
            .filter(|incident| kind.map_or(true, |kind| incident.kind() == kind))
            .cloned()
            .collect();
        Ok(sorted(incidents))
    }

    async fn find_incidents_by_user(&self, user: Id) -> Result<Vec<Incident>> {
        let incidents = self
            .incidents
            .read()
            .await
            .values()
            .filter(|incident| incident.user == user)
            .cloned()
            .collect();
        Ok(sorted(incidents))
    }

    async fn insert_incident(&self, incident: NewIncident) -> Result<Incident> {
        let incident = Incident {
            id: Id::new(),
            incident,
        };
        self.incidents
            .write()
            .await
            .insert(incident.id, incident.clone());
        Ok(incident)
    }

    async fn save_incident(&self, mut incident: Incident) -> Result<Incident> {
        let mut incidents = self.incidents.write().await;
        let stored = incidents
            .get_mut(&incident.id)
            .ok_or_else(|| Error::not_found(format!("Incident {}", incident.id)))?;
        if stored.revision != incident.revision {
            return Err(Error::StorageConflict(incident.id));
        }
        incident.revision += 1;
        *stored = incident.clone();
        Ok(incident)
    }

    async fn delete_incident(&self, id: Id) -> Result<bool> {
        Ok(self.incidents.write().await.remove(&id).is_some())
    }
}
