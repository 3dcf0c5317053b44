use serde::{Deserialize, Serialize};

use super::PollOptionDesc;

/// The body of a poll vote.
///
/// The index is signed and optional so that a negative or missing index is
/// reported as a vote error rather than a generic parse failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(default)]
    pub option_index: Option<i64>,
}

/// The state of a poll after a vote changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollVoteResult {
    pub options: Vec<PollOptionDesc>,
    pub has_voted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_voted_option: Option<u32>,
}

/// The upvote total after an upvote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteResult {
    pub votes: u32,
    pub has_voted: bool,
}
