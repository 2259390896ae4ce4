use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ObjectId hex strings in both backends
pub type Id = String;

/// Number of replies shown per thread in board listings.
pub const REPLY_PREVIEW_LEN: usize = 3;

/// Text a reply is redacted to when its author deletes it.
pub const REDACTED_TEXT: &str = "deleted";

#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub id: Id,
    pub board: String,
    pub title: String,
    pub text: String,
    pub created_on: DateTime<Utc>,
    pub bumped_on: DateTime<Utc>,
    pub last_edited_on: Option<DateTime<Utc>>,
    pub deleted_on: Option<DateTime<Utc>>, // soft delete marker
    pub reported: bool,
    pub password: String,
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub id: Id,
    pub text: String,
    pub created_on: DateTime<Utc>,
    pub last_edited_on: Option<DateTime<Utc>>,
    pub reported: bool,
    pub password: String,
}

/// Public projection of a thread: no password, report flag or deletion marker.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ThreadView {
    #[serde(rename = "_id")]
    pub id: Id,
    pub board: String,
    pub title: String,
    pub text: String,
    pub created_on: DateTime<Utc>,
    pub bumped_on: DateTime<Utc>,
    pub last_edited_on: Option<DateTime<Utc>>,
    pub replies: Vec<ReplyView>,
    pub reply_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ReplyView {
    #[serde(rename = "_id")]
    pub id: Id,
    pub text: String,
    pub created_on: DateTime<Utc>,
    pub last_edited_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ThreadPage {
    pub threads: Vec<ThreadView>,
    #[serde(rename = "totalNumThreads")]
    pub total_num_threads: u64,
}

/// Per-board aggregate over visible threads, used by the home page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub board: String,
    pub min_created: DateTime<Utc>,
    pub max_created: DateTime<Utc>,
    pub min_bumped: DateTime<Utc>,
    pub max_bumped: DateTime<Utc>,
    pub num_threads: u64,
    pub num_replies: u64,
}

impl From<&Reply> for ReplyView {
    fn from(r: &Reply) -> Self {
        ReplyView {
            id: r.id.clone(),
            text: r.text.clone(),
            created_on: r.created_on,
            last_edited_on: r.last_edited_on,
        }
    }
}

impl Thread {
    /// Project to the public view. With `reply_limit` only the most recent
    /// replies are kept, still oldest first.
    pub fn to_view(&self, reply_limit: Option<usize>) -> ThreadView {
        let skip = reply_limit
            .map(|n| self.replies.len().saturating_sub(n))
            .unwrap_or(0);
        ThreadView {
            id: self.id.clone(),
            board: self.board.clone(),
            title: self.title.clone(),
            text: self.text.clone(),
            created_on: self.created_on,
            bumped_on: self.bumped_on,
            last_edited_on: self.last_edited_on,
            replies: self.replies[skip..].iter().map(ReplyView::from).collect(),
            reply_count: self.replies.len(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.deleted_on.is_none()
    }
}

/// Result of a password-gated or moderation mutation. Displays as the literal
/// body the API sends back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Success,
    IncorrectPassword,
}

impl MutationOutcome {
    pub fn from_matched(matched: bool) -> Self {
        if matched { Self::Success } else { Self::IncorrectPassword }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::IncorrectPassword => "incorrect password",
        }
    }
}

impl std::fmt::Display for MutationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
