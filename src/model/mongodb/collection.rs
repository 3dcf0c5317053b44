use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::incident::Incident;

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MongoCollection for Incident {
    const NAME: &'static str = "incidents";
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let incidents = Coll::<Incident>::from_db(db);

    // Listing by owner.
    let owner_index = IndexModel::builder()
        .keys(doc! {"user": 1, "createdAt": -1})
        .options(IndexOptions::builder().name("owner_recent".to_string()).build())
        .build();
    incidents.create_index(owner_index, None).await?;

    // Listing by recency, optionally by type.
    let recent_index = IndexModel::builder()
        .keys(doc! {"type": 1, "createdAt": -1})
        .options(IndexOptions::builder().name("type_recent".to_string()).build())
        .build();
    incidents.create_index(recent_index, None).await?;

    Ok(())
}
