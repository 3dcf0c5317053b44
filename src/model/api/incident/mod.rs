mod desc;
mod spec;
mod vote;

pub use desc::{CommentDesc, IncidentDetails, IncidentView, PollOptionDesc, ReplyDesc};
pub use spec::{
    CommentSpec, IncidentSpec, IncidentUpdate, DEFAULT_POLL_DURATION_DAYS,
    MAX_POLL_DURATION_DAYS,
};
pub use vote::{PollVoteResult, UpvoteResult, VoteRequest};
