use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::incident::{IncidentKind, Urgency},
    db::incident::{Issue, IncidentBody, IncidentCore, NewIncident, News, Poll, Question},
    ledger::UpvoteLedger,
    mongodb::Id,
};

/// How long a poll runs if no duration is given, in days.
pub const DEFAULT_POLL_DURATION_DAYS: u32 = 7;
/// The longest a poll may run, in days.
pub const MAX_POLL_DURATION_DAYS: u32 = 365;

/// A request to post a new incident.
///
/// The body is flat; which of the optional fields are used depends on `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentSpec {
    #[serde(rename = "type")]
    pub kind: IncidentKind,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,

    // Issues.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub region: Option<String>,

    // Polls.
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    /// Days.
    #[serde(default)]
    pub duration: Option<u32>,

    // News.
    #[serde(default)]
    pub news_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
}

/// Trim a string, treating blank as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl IncidentSpec {
    /// Validate this spec and turn it into an incident posted by `owner` at `now`.
    pub fn into_incident(self, owner: Id, now: DateTime<Utc>) -> Result<NewIncident> {
        let title = non_blank(Some(self.title)).ok_or_else(|| Error::validation("Title is required"))?;
        let description = non_blank(self.description);

        let body = match self.kind {
            IncidentKind::Issue => {
                let service = non_blank(self.service)
                    .ok_or_else(|| Error::validation("Issues must name the affected service"))?;
                IncidentBody::Issue(Issue {
                    timestamp: self.timestamp.unwrap_or(now),
                    service,
                    urgency: self.urgency.unwrap_or_default(),
                    components: self.components,
                    category: non_blank(self.category),
                    region: non_blank(self.region),
                    upvotes: UpvoteLedger::default(),
                })
            }
            IncidentKind::Question => {
                if description.is_none() {
                    return Err(Error::validation("Questions need a description"));
                }
                IncidentBody::Question(Question::default())
            }
            IncidentKind::Poll => {
                let options = self
                    .options
                    .into_iter()
                    .map(|option| non_blank(Some(option)))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| Error::validation("Poll options cannot be blank"))?;
                if options.len() < 2 {
                    return Err(Error::validation("Polls need at least two options"));
                }
                let duration = self.duration.unwrap_or(DEFAULT_POLL_DURATION_DAYS);
                if !(1..=MAX_POLL_DURATION_DAYS).contains(&duration) {
                    return Err(Error::validation(format!(
                        "Poll duration must be between 1 and {MAX_POLL_DURATION_DAYS} days"
                    )));
                }
                let question = non_blank(self.question).unwrap_or_else(|| title.clone());
                IncidentBody::Poll(Poll::new(question, options, duration, now))
            }
            IncidentKind::News => IncidentBody::News(News {
                news_date: self.news_date.unwrap_or(now),
                source_url: non_blank(self.source_url),
                excerpt: non_blank(self.excerpt),
                upvotes: UpvoteLedger::default(),
            }),
        };

        let mut incident = IncidentCore::new(title, owner, body, now);
        incident.description = description;
        incident.provider = non_blank(self.provider);
        incident.tags = self.tags;
        Ok(incident)
    }
}

/// Edits to an incident's common fields. Absent fields are left alone.
///
/// Type-specific data, including poll options and every vote, is fixed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl IncidentUpdate {
    /// Apply the edits, stamping `updatedAt` with `now`.
    pub fn apply(&self, incident: &mut IncidentCore, now: DateTime<Utc>) -> Result<()> {
        if let Some(title) = &self.title {
            incident.title = non_blank(Some(title.clone()))
                .ok_or_else(|| Error::validation("Title cannot be blank"))?;
        }
        if let Some(description) = &self.description {
            let description = non_blank(Some(description.clone()));
            if description.is_none() && incident.kind() == IncidentKind::Question {
                return Err(Error::validation("Questions need a description"));
            }
            incident.description = description;
        }
        if let Some(provider) = &self.provider {
            incident.provider = non_blank(Some(provider.clone()));
        }
        if let Some(tags) = &self.tags {
            incident.tags = tags.clone();
        }
        incident.updated_at = now;
        Ok(())
    }
}

/// The body of a new comment or reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentSpec {
    pub text: String,
}

impl CommentSpec {
    /// The trimmed text, which must not be blank.
    pub fn into_text(self) -> Result<String> {
        non_blank(Some(self.text)).ok_or_else(|| Error::validation("Comment text is required"))
    }
}
