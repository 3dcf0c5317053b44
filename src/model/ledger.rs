//! Voter ledgers: the per-user records that back every vote count.
//!
//! Polls and upvotable incidents keep statically distinct ledgers. Everything
//! here is pure; on error the ledger and the options are left untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::mongodb::Id;

/// Rule violations detected by a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Invalid option index {0}")]
    InvalidOption(i64),
    #[error("You have not voted on this poll")]
    NoExistingVote,
    #[error("You have already voted on this incident")]
    AlreadyVoted,
}

/// A single poll answer with its cached tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    /// Answer text.
    pub text: String,
    /// Number of ledger entries pointing at this option.
    #[serde(rename = "votes", default)]
    pub vote_count: u32,
}

impl PollOption {
    /// A fresh option with no votes.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            vote_count: 0,
        }
    }
}

/// One user's choice on a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollVote {
    pub user: Id,
    pub option_index: u32,
}

/// A stored element of a poll's `voters` array.
///
/// Polls created before votes recorded their option hold bare user IDs; those
/// are split off into [`PollLedger::legacy`] when the document is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredVoter {
    Vote(PollVote),
    Legacy(Id),
}

/// The poll voter ledger: at most one [`PollVote`] per user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<StoredVoter>", into = "Vec<StoredVoter>")]
pub struct PollLedger {
    votes: Vec<PollVote>,
    legacy: Vec<Id>,
}

impl From<Vec<StoredVoter>> for PollLedger {
    fn from(stored: Vec<StoredVoter>) -> Self {
        let mut ledger = Self::default();
        for voter in stored {
            match voter {
                StoredVoter::Vote(vote) => ledger.votes.push(vote),
                StoredVoter::Legacy(user) => ledger.legacy.push(user),
            }
        }
        ledger
    }
}

impl From<PollLedger> for Vec<StoredVoter> {
    fn from(ledger: PollLedger) -> Self {
        ledger
            .votes
            .into_iter()
            .map(StoredVoter::Vote)
            .chain(ledger.legacy.into_iter().map(StoredVoter::Legacy))
            .collect()
    }
}

impl PollLedger {
    /// All recorded votes.
    pub fn votes(&self) -> &[PollVote] {
        &self.votes
    }

    /// Users known to have voted before options were recorded.
    pub fn legacy(&self) -> &[Id] {
        &self.legacy
    }

    /// Number of recorded votes.
    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Does the user have a recorded vote?
    pub fn has_voted(&self, user: Id) -> bool {
        self.votes.iter().any(|vote| vote.user == user)
    }

    /// Is the user only known through a legacy entry?
    pub fn has_legacy_vote(&self, user: Id) -> bool {
        self.legacy.contains(&user)
    }

    /// The option the user voted for, if any.
    pub fn voted_option(&self, user: Id) -> Option<u32> {
        self.votes
            .iter()
            .find(|vote| vote.user == user)
            .map(|vote| vote.option_index)
    }

    /// Record a vote, replacing the user's previous choice if they had one.
    ///
    /// Casting the same option twice leaves the counts unchanged.
    pub fn cast_or_change(
        &mut self,
        options: &mut [PollOption],
        user: Id,
        option_index: u32,
    ) -> Result<(), LedgerError> {
        let target = usize::try_from(option_index)
            .ok()
            .filter(|index| *index < options.len())
            .ok_or(LedgerError::InvalidOption(option_index.into()))?;

        match self.votes.iter_mut().find(|vote| vote.user == user) {
            Some(vote) => {
                if let Some(previous) = options.get_mut(vote.option_index as usize) {
                    previous.vote_count = previous.vote_count.saturating_sub(1);
                }
                vote.option_index = option_index;
            }
            None => {
                self.legacy.retain(|legacy| *legacy != user);
                self.votes.push(PollVote { user, option_index });
            }
        }
        options[target].vote_count = options[target].vote_count.saturating_add(1);

        Ok(())
    }

    /// Retract the user's vote, returning the option it was for.
    pub fn remove(&mut self, options: &mut [PollOption], user: Id) -> Result<u32, LedgerError> {
        let position = self
            .votes
            .iter()
            .position(|vote| vote.user == user)
            .ok_or(LedgerError::NoExistingVote)?;

        let vote = self.votes.remove(position);
        if let Some(option) = options.get_mut(vote.option_index as usize) {
            option.vote_count = option.vote_count.saturating_sub(1);
        }

        Ok(vote.option_index)
    }

    /// Do the option tallies agree with the ledger?
    pub fn is_consistent_with(&self, options: &[PollOption]) -> bool {
        let tally: u64 = options.iter().map(|option| u64::from(option.vote_count)).sum();
        let in_range = self
            .votes
            .iter()
            .all(|vote| (vote.option_index as usize) < options.len());
        in_range && tally == self.votes.len() as u64
    }
}

/// The upvote ledger for non-poll incidents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpvoteLedger {
    #[serde(default)]
    votes: u32,
    #[serde(default)]
    voters: Vec<Id>,
}

impl UpvoteLedger {
    /// The number of upvotes.
    pub fn votes(&self) -> u32 {
        self.votes
    }

    pub fn voters(&self) -> &[Id] {
        &self.voters
    }

    pub fn has_voted(&self, user: Id) -> bool {
        self.voters.contains(&user)
    }

    /// Add the user's upvote, returning the new total.
    pub fn add(&mut self, user: Id) -> Result<u32, LedgerError> {
        if self.has_voted(user) {
            return Err(LedgerError::AlreadyVoted);
        }
        self.voters.push(user);
        self.votes = self.votes.saturating_add(1);
        Ok(self.votes)
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{self, doc};

    use super::*;

    fn options(texts: &[&str]) -> Vec<PollOption> {
        texts.iter().map(|text| PollOption::new(*text)).collect()
    }

    fn counts(options: &[PollOption]) -> Vec<u32> {
        options.iter().map(|option| option.vote_count).collect()
    }

    #[test]
    fn first_cast_records_vote() {
        let mut ledger = PollLedger::default();
        let mut options = options(&["A", "B", "C"]);
        let user = Id::new();

        ledger.cast_or_change(&mut options, user, 2).unwrap();

        assert!(ledger.has_voted(user));
        assert_eq!(ledger.voted_option(user), Some(2));
        assert_eq!(counts(&options), vec![0, 0, 1]);
        assert!(ledger.is_consistent_with(&options));
    }

    #[test]
    fn switching_vote_never_double_counts() {
        let mut ledger = PollLedger::default();
        let mut options = options(&["A", "B"]);
        let user = Id::new();

        ledger.cast_or_change(&mut options, user, 0).unwrap();
        ledger.cast_or_change(&mut options, user, 1).unwrap();

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.voted_option(user), Some(1));
        assert_eq!(counts(&options), vec![0, 1]);

        // Same option again is a no-op on the counts.
        ledger.cast_or_change(&mut options, user, 1).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(counts(&options), vec![0, 1]);
    }

    #[test]
    fn out_of_range_option_is_rejected_without_mutation() {
        let mut ledger = PollLedger::default();
        let mut options = options(&["A", "B"]);
        let user = Id::new();
        ledger.cast_or_change(&mut options, user, 0).unwrap();
        let (before_ledger, before_options) = (ledger.clone(), options.clone());

        let result = ledger.cast_or_change(&mut options, user, 2);

        assert_eq!(result, Err(LedgerError::InvalidOption(2)));
        assert_eq!(ledger, before_ledger);
        assert_eq!(options, before_options);
    }

    #[test]
    fn remove_restores_previous_state() {
        let mut ledger = PollLedger::default();
        let mut options = options(&["A", "B"]);
        let other = Id::new();
        ledger.cast_or_change(&mut options, other, 1).unwrap();
        let (before_ledger, before_options) = (ledger.clone(), options.clone());

        let user = Id::new();
        ledger.cast_or_change(&mut options, user, 0).unwrap();
        let removed = ledger.remove(&mut options, user).unwrap();

        assert_eq!(removed, 0);
        assert_eq!(ledger, before_ledger);
        assert_eq!(options, before_options);
    }

    #[test]
    fn remove_without_vote_fails_and_changes_nothing() {
        let mut ledger = PollLedger::default();
        let mut options = options(&["A", "B"]);
        ledger.cast_or_change(&mut options, Id::new(), 0).unwrap();
        let (before_ledger, before_options) = (ledger.clone(), options.clone());

        let result = ledger.remove(&mut options, Id::new());

        assert_eq!(result, Err(LedgerError::NoExistingVote));
        assert_eq!(ledger, before_ledger);
        assert_eq!(options, before_options);
    }

    #[test]
    fn corrupted_counts_are_floored_at_zero() {
        let user = Id::new();
        let mut ledger = PollLedger::from(vec![StoredVoter::Vote(PollVote {
            user,
            option_index: 0,
        })]);
        let mut options = options(&["A", "B"]);

        ledger.cast_or_change(&mut options, user, 1).unwrap();

        assert_eq!(counts(&options), vec![0, 1]);
    }

    #[test]
    fn legacy_entries_are_split_on_read() {
        let legacy = Id::new();
        let voter = Id::new();
        let stored = doc! {
            "voters": [
                *legacy,
                { "user": *voter, "optionIndex": 1 },
            ]
        };

        #[derive(Deserialize)]
        struct Holder {
            voters: PollLedger,
        }
        let holder: Holder = bson::from_document(stored).unwrap();

        assert!(holder.voters.has_legacy_vote(legacy));
        assert!(!holder.voters.has_voted(legacy));
        assert_eq!(holder.voters.voted_option(voter), Some(1));
        assert_eq!(holder.voters.len(), 1);
    }

    #[test]
    fn legacy_voter_casting_gets_a_proper_entry() {
        let user = Id::new();
        let mut ledger = PollLedger::from(vec![StoredVoter::Legacy(user)]);
        let mut options = options(&["A", "B"]);

        ledger.cast_or_change(&mut options, user, 0).unwrap();

        assert!(!ledger.has_legacy_vote(user));
        assert_eq!(ledger.voted_option(user), Some(0));
        assert!(ledger.is_consistent_with(&options));
    }

    #[test]
    fn upvote_once_only() {
        let mut ledger = UpvoteLedger::default();
        let user = Id::new();

        assert_eq!(ledger.add(user), Ok(1));
        assert_eq!(ledger.add(user), Err(LedgerError::AlreadyVoted));
        assert_eq!(ledger.votes(), 1);
        assert_eq!(ledger.voters(), &[user]);
    }
}
