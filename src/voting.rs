//! Vote-affecting operations on a single incident.
//!
//! Every operation runs through [`Incidents::modify`], so the ledger and the
//! cached counters it backs are written together or not at all, and a lost
//! race is re-applied against the fresh document.

use chrono::Utc;
use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};

use crate::error::{Error, Result};
use crate::model::{
    api::incident::{PollOptionDesc, PollVoteResult, UpvoteResult},
    common::incident::IncidentKind,
    db::incident::{Incident, Poll},
    ledger::{LedgerError, UpvoteLedger},
    mongodb::Id,
};
use crate::store::Incidents;

/// Poll voting and upvoting.
#[derive(Clone)]
pub struct VotingEngine {
    incidents: Incidents,
}

/// The poll inside an incident, or why there isn't one open for voting.
fn open_poll(incident: &mut Incident) -> Result<&mut Poll> {
    let id = incident.id;
    let actual = incident.kind();
    let poll = incident.poll_mut().ok_or(Error::WrongType {
        id,
        expected: "a poll",
        actual,
    })?;
    if poll.is_ended(Utc::now()) {
        return Err(Error::PollEnded);
    }
    Ok(poll)
}

fn upvote_ledger(incident: &mut Incident) -> Result<&mut UpvoteLedger> {
    let id = incident.id;
    incident.upvotes_mut().ok_or(Error::WrongType {
        id,
        expected: "an upvotable incident",
        actual: IncidentKind::Poll,
    })
}

impl VotingEngine {
    pub fn new(incidents: Incidents) -> Self {
        Self { incidents }
    }

    /// Vote for an option, replacing any previous vote by the same user.
    ///
    /// The index is checked after the poll's state, so an ended poll reports
    /// [`Error::PollEnded`] whatever index was given.
    pub async fn cast(&self, id: Id, user: Id, option_index: i64) -> Result<PollVoteResult> {
        let (incident, option_index) = self
            .incidents
            .modify(id, |incident| {
                let poll = open_poll(incident)?;
                let index = u32::try_from(option_index)
                    .map_err(|_| LedgerError::InvalidOption(option_index))?;
                poll.cast_or_change(user, index)?;
                Ok(index)
            })
            .await?;

        info!("User {user} voted for option {option_index} on poll {id}");
        Ok(PollVoteResult {
            options: poll_options(&incident),
            has_voted: true,
            user_voted_option: Some(option_index),
        })
    }

    /// Retract the user's vote.
    pub async fn remove(&self, id: Id, user: Id) -> Result<PollVoteResult> {
        let (incident, _) = self
            .incidents
            .modify(id, |incident| Ok(open_poll(incident)?.remove_vote(user)?))
            .await?;

        info!("User {user} removed their vote on poll {id}");
        Ok(PollVoteResult {
            options: poll_options(&incident),
            has_voted: false,
            user_voted_option: None,
        })
    }

    /// Upvote a non-poll incident. Each user may upvote once.
    pub async fn upvote(&self, id: Id, user: Id) -> Result<UpvoteResult> {
        let (_, votes) = self
            .incidents
            .modify(id, |incident| Ok(upvote_ledger(incident)?.add(user)?))
            .await?;

        info!("User {user} upvoted incident {id}");
        Ok(UpvoteResult {
            votes,
            has_voted: true,
        })
    }
}

fn poll_options(incident: &Incident) -> Vec<PollOptionDesc> {
    incident
        .poll()
        .map(|poll| poll.options.iter().map(Into::into).collect())
        .unwrap_or_default()
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VotingEngine {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.guard::<Incidents>().await {
            request::Outcome::Success(incidents) => request::Outcome::Success(Self::new(incidents)),
            _ => request::Outcome::Error((Status::InternalServerError, ())),
        }
    }
}
