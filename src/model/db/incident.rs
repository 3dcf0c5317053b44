use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Duration, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::incident::{IncidentKind, Urgency},
    db::comment::Comment,
    ledger::{LedgerError, PollLedger, PollOption, UpvoteLedger},
    mongodb::Id,
};

/// Core incident data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentCore {
    /// Headline.
    pub title: String,
    /// Free-form body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The user who posted the incident.
    pub user: Id,
    /// The service provider the incident concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Comments, with their replies embedded.
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    /// Incremented by every successful write; guards conditional replaces.
    #[serde(default)]
    pub revision: i64,
    /// Type-specific data.
    #[serde(flatten)]
    pub body: IncidentBody,
}

impl IncidentCore {
    /// Create a new incident posted by `user` at `now`.
    pub fn new(title: String, user: Id, body: IncidentBody, now: DateTime<Utc>) -> Self {
        Self {
            title,
            description: None,
            user,
            provider: None,
            tags: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
            body,
        }
    }

    pub fn kind(&self) -> IncidentKind {
        self.body.kind()
    }

    pub fn poll(&self) -> Option<&Poll> {
        match &self.body {
            IncidentBody::Poll(poll) => Some(poll),
            _ => None,
        }
    }

    pub fn poll_mut(&mut self) -> Option<&mut Poll> {
        match &mut self.body {
            IncidentBody::Poll(poll) => Some(poll),
            _ => None,
        }
    }

    /// The upvote ledger, for every kind except polls.
    pub fn upvotes(&self) -> Option<&UpvoteLedger> {
        match &self.body {
            IncidentBody::Issue(issue) => Some(&issue.upvotes),
            IncidentBody::Question(question) => Some(&question.upvotes),
            IncidentBody::News(news) => Some(&news.upvotes),
            IncidentBody::Poll(_) => None,
        }
    }

    pub fn upvotes_mut(&mut self) -> Option<&mut UpvoteLedger> {
        match &mut self.body {
            IncidentBody::Issue(issue) => Some(&mut issue.upvotes),
            IncidentBody::Question(question) => Some(&mut question.upvotes),
            IncidentBody::News(news) => Some(&mut news.upvotes),
            IncidentBody::Poll(_) => None,
        }
    }

    /// Has the user voted, by whichever scheme this kind of incident uses?
    pub fn has_voted(&self, user: Id) -> bool {
        match &self.body {
            IncidentBody::Poll(poll) => {
                poll.voters.has_voted(user) || poll.voters.has_legacy_vote(user)
            }
            _ => self
                .upvotes()
                .map_or(false, |upvotes| upvotes.has_voted(user)),
        }
    }

    pub fn comment_mut(&mut self, comment_id: Id) -> Option<&mut Comment> {
        self.comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
    }
}

/// An incident without an ID.
pub type NewIncident = IncidentCore;

/// An incident from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub incident: IncidentCore,
}

impl Deref for Incident {
    type Target = IncidentCore;

    fn deref(&self) -> &Self::Target {
        &self.incident
    }
}

impl DerefMut for Incident {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.incident
    }
}

/// Type-specific incident data, tagged by the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IncidentBody {
    Issue(Issue),
    Question(Question),
    Poll(Poll),
    News(News),
}

impl IncidentBody {
    pub fn kind(&self) -> IncidentKind {
        match self {
            Self::Issue(_) => IncidentKind::Issue,
            Self::Question(_) => IncidentKind::Question,
            Self::Poll(_) => IncidentKind::Poll,
            Self::News(_) => IncidentKind::News,
        }
    }
}

/// A service problem report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// When the problem was observed.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    /// The affected service.
    pub service: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(flatten)]
    pub upvotes: UpvoteLedger,
}

/// A question for the community.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(flatten)]
    pub upvotes: UpvoteLedger,
}

/// A news item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct News {
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub news_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(flatten)]
    pub upvotes: UpvoteLedger,
}

/// A single-choice poll. Options are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub question: String,
    pub options: Vec<PollOption>,
    /// Length of the poll in days.
    pub duration: u32,
    /// Votes are closed after this instant.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub voters: PollLedger,
}

impl Poll {
    /// Create a poll opening at `created_at` and running for `duration` days.
    pub fn new(
        question: String,
        options: impl IntoIterator<Item = String>,
        duration: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            question,
            options: options.into_iter().map(PollOption::new).collect(),
            duration,
            end_date: created_at + Duration::days(duration.into()),
            voters: PollLedger::default(),
        }
    }

    pub fn is_ended(&self, now: DateTime<Utc>) -> bool {
        now > self.end_date
    }

    pub fn cast_or_change(&mut self, user: Id, option_index: u32) -> Result<(), LedgerError> {
        self.voters
            .cast_or_change(&mut self.options, user, option_index)
    }

    pub fn remove_vote(&mut self, user: Id) -> Result<u32, LedgerError> {
        self.voters.remove(&mut self.options, user)
    }
}
