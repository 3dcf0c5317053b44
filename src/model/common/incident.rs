use std::fmt::{Display, Formatter};

use mongodb::bson::Bson;
use rocket::FromFormField;
use serde::{Deserialize, Serialize};

/// The kinds of incident that can be posted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "lowercase")]
pub enum IncidentKind {
    /// A service problem report.
    #[field(value = "issue")]
    Issue,
    /// A question for the community.
    #[field(value = "question")]
    Question,
    /// A single-choice poll with an expiry.
    #[field(value = "poll")]
    Poll,
    /// A news item.
    #[field(value = "news")]
    News,
}

impl Display for IncidentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Issue => "issue",
            Self::Question => "question",
            Self::Poll => "poll",
            Self::News => "news",
        };
        write!(f, "{name}")
    }
}

impl From<IncidentKind> for Bson {
    fn from(kind: IncidentKind) -> Self {
        Bson::String(kind.to_string())
    }
}

/// How urgent an issue is.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}
