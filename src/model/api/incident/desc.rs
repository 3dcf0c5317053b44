use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::incident::Urgency,
    db::{
        comment::{Comment, Reply},
        incident::{Incident, IncidentBody},
    },
    ledger::PollOption,
    mongodb::Id,
};

/// An incident as shown to a particular viewer.
///
/// Voter identities are never exposed; the viewer only learns their own
/// vote through `hasVoted` and `userVotedOption`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentView {
    pub id: ApiId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The user who posted the incident.
    pub user: ApiId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub tags: Vec<String>,
    pub comment_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: IncidentDetails,
    /// Only present when the viewer is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_voted: Option<bool>,
    /// Only present for polls the viewer has voted on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_voted_option: Option<u32>,
    /// Only present for polls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_ended: Option<bool>,
}

/// The type-specific part of an [`IncidentView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IncidentDetails {
    Issue {
        timestamp: DateTime<Utc>,
        service: String,
        urgency: Urgency,
        components: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region: Option<String>,
        votes: u32,
    },
    Question {
        votes: u32,
    },
    Poll {
        question: String,
        options: Vec<PollOptionDesc>,
        duration: u32,
        #[serde(rename = "endDate")]
        end_date: DateTime<Utc>,
        #[serde(rename = "totalVotes")]
        total_votes: u32,
    },
    News {
        #[serde(rename = "newsDate")]
        news_date: DateTime<Utc>,
        #[serde(rename = "sourceUrl", default, skip_serializing_if = "Option::is_none")]
        source_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        excerpt: Option<String>,
        votes: u32,
    },
}

impl From<&IncidentBody> for IncidentDetails {
    fn from(body: &IncidentBody) -> Self {
        match body {
            IncidentBody::Issue(issue) => Self::Issue {
                timestamp: issue.timestamp,
                service: issue.service.clone(),
                urgency: issue.urgency,
                components: issue.components.clone(),
                category: issue.category.clone(),
                region: issue.region.clone(),
                votes: issue.upvotes.votes(),
            },
            IncidentBody::Question(question) => Self::Question {
                votes: question.upvotes.votes(),
            },
            IncidentBody::Poll(poll) => Self::Poll {
                question: poll.question.clone(),
                options: poll.options.iter().map(Into::into).collect(),
                duration: poll.duration,
                end_date: poll.end_date,
                total_votes: poll.options.iter().map(|option| option.vote_count).sum(),
            },
            IncidentBody::News(news) => Self::News {
                news_date: news.news_date,
                source_url: news.source_url.clone(),
                excerpt: news.excerpt.clone(),
                votes: news.upvotes.votes(),
            },
        }
    }
}

impl IncidentView {
    /// Decorate an incident for `viewer` (`None` if anonymous) at time `now`.
    pub fn annotate(incident: &Incident, viewer: Option<Id>, now: DateTime<Utc>) -> Self {
        let poll = incident.poll();
        Self {
            id: incident.id.into(),
            title: incident.title.clone(),
            description: incident.description.clone(),
            user: incident.user.into(),
            provider: incident.provider.clone(),
            tags: incident.tags.clone(),
            comment_count: incident.comments.len(),
            created_at: incident.created_at,
            updated_at: incident.updated_at,
            details: (&incident.body).into(),
            has_voted: viewer.map(|viewer| incident.has_voted(viewer)),
            user_voted_option: poll
                .zip(viewer)
                .and_then(|(poll, viewer)| poll.voters.voted_option(viewer)),
            is_ended: poll.map(|poll| poll.is_ended(now)),
        }
    }
}

/// A poll option with its tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionDesc {
    pub text: String,
    pub vote_count: u32,
}

impl From<&PollOption> for PollOptionDesc {
    fn from(option: &PollOption) -> Self {
        Self {
            text: option.text.clone(),
            vote_count: option.vote_count,
        }
    }
}

/// A comment and its replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDesc {
    pub id: ApiId,
    pub text: String,
    pub user: ApiId,
    pub replies: Vec<ReplyDesc>,
    pub created_at: DateTime<Utc>,
}

impl From<&Comment> for CommentDesc {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id.into(),
            text: comment.text.clone(),
            user: comment.user.into(),
            replies: comment.replies.iter().map(Into::into).collect(),
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyDesc {
    pub id: ApiId,
    pub text: String,
    pub user: ApiId,
    pub created_at: DateTime<Utc>,
}

impl From<&Reply> for ReplyDesc {
    fn from(reply: &Reply) -> Self {
        Self {
            id: reply.id.into(),
            text: reply.text.clone(),
            user: reply.user.into(),
            created_at: reply.created_at,
        }
    }
}
