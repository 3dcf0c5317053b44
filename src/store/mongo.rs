use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
    Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    common::incident::IncidentKind,
    db::incident::{Incident, NewIncident},
    mongodb::{Coll, Id},
};

use super::IncidentStore;

/// Incidents stored in a MongoDB collection, one document each.
#[derive(Clone)]
pub struct MongoStore {
    incidents: Coll<Incident>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            incidents: Coll::from_db(db),
        }
    }

    async fn find_newest_first(&self, filter: Document) -> Result<Vec<Incident>> {
        let incidents = self
            .incidents
            .find(
                filter,
                FindOptions::builder().sort(doc! {"createdAt": -1}).build(),
            )
            .await?
            .try_collect::<Vec<_>>()
            .await?;
        Ok(incidents)
    }
}

/// Match the incident only while it is still at the given revision.
///
/// Documents written before revisions existed have no `revision` field,
/// which counts as revision zero.
fn revision_filter(id: Id, revision: i64) -> Document {
    if revision == 0 {
        doc! {
            "_id": id,
            "$or": [{"revision": 0_i64}, {"revision": {"$exists": false}}],
        }
    } else {
        doc! {"_id": id, "revision": revision}
    }
}

#[rocket::async_trait]
impl IncidentStore for MongoStore {
    async fn find_incident_by_id(&self, id: Id) -> Result<Option<Incident>> {
        Ok(self.incidents.find_one(id.as_doc(), None).await?)
    }

    async fn find_incidents(&self, kind: Option<IncidentKind>) -> Result<Vec<Incident>> {
        let filter = match kind {
            Some(kind) => doc! {"type": kind},
            None => doc! {},
        };
        self.find_newest_first(filter).await
    }

    async fn find_incidents_by_user(&self, user: Id) -> Result<Vec<Incident>> {
        self.find_newest_first(doc! {"user": user}).await
    }

    async fn insert_incident(&self, incident: NewIncident) -> Result<Incident> {
        let incident = Incident {
            id: Id::new(),
            incident,
        };
        self.incidents.insert_one(&incident, None).await?;
        Ok(incident)
    }

    async fn save_incident(&self, mut incident: Incident) -> Result<Incident> {
        let filter = revision_filter(incident.id, incident.revision);
        incident.revision += 1;
        let result = self.incidents.replace_one(filter, &incident, None).await?;
        if result.matched_count == 1 {
            return Ok(incident);
        }

        // Nothing matched: either someone else wrote first, or it's gone.
        match self.incidents.find_one(incident.id.as_doc(), None).await? {
            Some(_) => Err(Error::StorageConflict(incident.id)),
            None => Err(Error::not_found(format!("Incident {}", incident.id))),
        }
    }

    async fn delete_incident(&self, id: Id) -> Result<bool> {
        let result = self.incidents.delete_one(id.as_doc(), None).await?;
        Ok(result.deleted_count == 1)
    }
}
