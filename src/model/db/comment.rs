use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A comment embedded in an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: Id,
    pub text: String,
    /// Author.
    pub user: Id,
    #[serde(default)]
    pub replies: Vec<Reply>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(text: String, user: Id, now: DateTime<Utc>) -> Self {
        Self {
            id: Id::new(),
            text,
            user,
            replies: Vec::new(),
            created_at: now,
        }
    }
}

/// A reply to a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(rename = "_id")]
    pub id: Id,
    pub text: String,
    pub user: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Reply {
    pub fn new(text: String, user: Id, now: DateTime<Utc>) -> Self {
        Self {
            id: Id::new(),
            text,
            user,
            created_at: now,
        }
    }
}
