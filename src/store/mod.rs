//! The incident persistence port.
//!
//! Every write is a conditional replace keyed on the incident's `revision`;
//! [`Incidents::modify`] turns that into a bounded read-apply-write loop.

use std::ops::Deref;
use std::sync::Arc;

use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
    State,
};

use crate::error::{Error, Result};
use crate::model::{
    common::incident::IncidentKind,
    db::incident::{Incident, NewIncident},
    mongodb::Id,
};

mod memory;
mod mongo;

pub use self::memory::MemoryStore;
pub use self::mongo::MongoStore;

/// How many times a conflicting write is re-applied before giving up.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 5;

/// Document storage for incidents.
#[rocket::async_trait]
pub trait IncidentStore: Send + Sync {
    /// Fetch a single incident.
    async fn find_incident_by_id(&self, id: Id) -> Result<Option<Incident>>;

    /// Fetch all incidents, newest first, optionally of one kind only.
    async fn find_incidents(&self, kind: Option<IncidentKind>) -> Result<Vec<Incident>>;

    /// Fetch the incidents posted by a user, newest first.
    async fn find_incidents_by_user(&self, user: Id) -> Result<Vec<Incident>>;

    /// Insert a new incident, returning it with its assigned ID.
    async fn insert_incident(&self, incident: NewIncident) -> Result<Incident>;

    /// Replace the stored incident iff its revision still equals
    /// `incident.revision`, returning the written incident with the revision
    /// incremented.
    ///
    /// Fails with [`Error::StorageConflict`] if another write got there first,
    /// or [`Error::NotFound`] if the incident no longer exists.
    async fn save_incident(&self, incident: Incident) -> Result<Incident>;

    /// Delete an incident and everything embedded in it. Returns false if it
    /// did not exist.
    async fn delete_incident(&self, id: Id) -> Result<bool>;
}

/// Shared handle on the configured incident store.
#[derive(Clone)]
pub struct Incidents {
    store: Arc<dyn IncidentStore>,
    conflict_retries: u32,
}

impl Incidents {
    pub fn new(store: impl IncidentStore + 'static, conflict_retries: u32) -> Self {
        Self {
            store: Arc::new(store),
            conflict_retries,
        }
    }

    /// A handle on a fresh, empty in-process store.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::default(), DEFAULT_CONFLICT_RETRIES)
    }

    /// Fetch an incident, failing if it doesn't exist.
    pub async fn get(&self, id: Id) -> Result<Incident> {
        self.store
            .find_incident_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Incident {id}")))
    }

    /// Atomically apply `apply` to the incident with the given ID.
    ///
    /// The incident is re-read and `apply` re-run whenever the write loses a
    /// race, up to the configured number of retries. If `apply` fails, nothing
    /// is written. Returns the incident as written plus `apply`'s output.
    pub async fn modify<T, F>(&self, id: Id, mut apply: F) -> Result<(Incident, T)>
    where
        F: FnMut(&mut Incident) -> Result<T> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            let mut incident = self.get(id).await?;
            let output = apply(&mut incident)?;
            match self.store.save_incident(incident).await {
                Ok(saved) => return Ok((saved, output)),
                Err(Error::StorageConflict(_)) if attempt < self.conflict_retries => {
                    attempt += 1;
                    debug!("Write conflict on incident {id}, retrying ({attempt})");
                }
                Err(err) => {
                    if let Error::StorageConflict(_) = err {
                        warn!("Giving up on incident {id} after {attempt} conflicting writes");
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl Deref for Incidents {
    type Target = dyn IncidentStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Incidents {
    type Error = ();

    /// Get the store handle from managed state.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.guard::<&State<Incidents>>().await {
            request::Outcome::Success(incidents) => request::Outcome::Success(incidents.inner().clone()),
            _ => {
                error!("Incident store is not managed");
                request::Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}
