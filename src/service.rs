use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::Utc;
use tracing::{debug, instrument};

use crate::models::*;
use crate::repo::{RepoError, ThreadRepo};
use crate::sanitize::{is_bad_input, normalize_board, scrub_text};

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("{0}")] Validation(String),
    #[error(transparent)] Repo(#[from] RepoError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Upper bound for `threadsPerPage`.
pub const MAX_THREADS_PER_PAGE: u64 = 100;

fn new_id() -> Id {
    ObjectId::new().to_hex()
}

/// Data access for threads and replies: validation, sanitization and the
/// soft-delete/report/password rules, on top of an atomic [`ThreadRepo`].
#[derive(Clone)]
pub struct ThreadService {
    repo: Arc<dyn ThreadRepo>,
}

impl ThreadService {
    pub fn new(repo: Arc<dyn ThreadRepo>) -> Self {
        Self { repo }
    }

    pub async fn shutdown(&self) {
        self.repo.shutdown().await;
    }

    #[instrument(skip_all, fields(board = %board))]
    pub async fn insert_thread(&self, board: &str, title: &str, text: &str, password: &str) -> ServiceResult<Thread> {
        if is_bad_input(board) || is_bad_input(password) {
            return Err(ServiceError::Validation("Board and password cannot contain tags or be empty.".into()));
        }
        if title.is_empty() || text.is_empty() {
            return Err(ServiceError::Validation("Title and text cannot be empty.".into()));
        }
        let now = Utc::now();
        let thread = Thread {
            id: new_id(),
            board: normalize_board(board),
            title: scrub_text(title),
            text: scrub_text(text),
            created_on: now,
            bumped_on: now,
            last_edited_on: None,
            deleted_on: None,
            reported: false,
            password: password.trim().to_string(),
            replies: Vec::new(),
        };
        let thread = self.repo.insert_thread(thread).await?;
        debug!(thread_id = %thread.id, "thread created");
        Ok(thread)
    }

    #[instrument(skip_all, fields(board = %board, thread_id = %thread_id))]
    pub async fn insert_reply(&self, board: &str, thread_id: &str, text: &str, password: &str) -> ServiceResult<Option<ThreadView>> {
        if is_bad_input(password) {
            return Err(ServiceError::Validation("Password cannot contain tags or be empty.".into()));
        }
        let reply = Reply {
            id: new_id(),
            text: scrub_text(text),
            created_on: Utc::now(),
            last_edited_on: None,
            reported: false,
            password: password.trim().to_string(),
        };
        Ok(self.repo.push_reply(&normalize_board(board), thread_id, reply).await?)
    }

    pub async fn get_boards(&self) -> ServiceResult<Vec<BoardSummary>> {
        Ok(self.repo.board_summaries().await?)
    }

    /// `page` is 1-based; anything lower is treated as the first page.
    pub async fn get_threads(&self, board: &str, page: i64, threads_per_page: u64) -> ServiceResult<ThreadPage> {
        let per_page = threads_per_page.clamp(1, MAX_THREADS_PER_PAGE);
        let skip = u64::try_from(page.saturating_sub(1)).unwrap_or(0).saturating_mul(per_page);
        Ok(self.repo.list_threads(&normalize_board(board), skip, per_page).await?)
    }

    pub async fn get_thread(&self, board: &str, thread_id: &str) -> ServiceResult<Option<ThreadView>> {
        Ok(self.repo.get_thread(&normalize_board(board), thread_id).await?)
    }

    #[instrument(skip_all, fields(board = %board, thread_id = %thread_id))]
    pub async fn update_thread(&self, board: &str, thread_id: &str, title: &str, text: &str, password: &str) -> ServiceResult<MutationOutcome> {
        let matched = self
            .repo
            .update_thread(&normalize_board(board), thread_id, password.trim(), &scrub_text(title), &scrub_text(text), Utc::now())
            .await?;
        Ok(MutationOutcome::from_matched(matched))
    }

    #[instrument(skip_all, fields(board = %board, thread_id = %thread_id, reply_id = %reply_id))]
    pub async fn update_reply(&self, board: &str, thread_id: &str, reply_id: &str, text: &str, password: &str) -> ServiceResult<MutationOutcome> {
        let modified = self
            .repo
            .update_reply(&normalize_board(board), thread_id, reply_id, password.trim(), &scrub_text(text), Utc::now())
            .await?;
        Ok(MutationOutcome::from_matched(modified))
    }

    /// Open to anyone and always reports success, matched or not.
    pub async fn report_thread(&self, board: &str, thread_id: &str) -> ServiceResult<MutationOutcome> {
        let matched = self.repo.report_thread(&normalize_board(board), thread_id).await?;
        if !matched {
            debug!(board, thread_id, "report matched no visible thread");
        }
        Ok(MutationOutcome::Success)
    }

    pub async fn report_reply(&self, board: &str, thread_id: &str, reply_id: &str) -> ServiceResult<MutationOutcome> {
        let matched = self.repo.report_reply(&normalize_board(board), thread_id, reply_id).await?;
        if !matched {
            debug!(board, thread_id, reply_id, "report matched no visible reply");
        }
        Ok(MutationOutcome::Success)
    }

    #[instrument(skip_all, fields(board = %board, thread_id = %thread_id))]
    pub async fn delete_thread(&self, board: &str, thread_id: &str, password: &str) -> ServiceResult<MutationOutcome> {
        let matched = self
            .repo
            .delete_thread(&normalize_board(board), thread_id, password.trim(), Utc::now())
            .await?;
        Ok(MutationOutcome::from_matched(matched))
    }

    #[instrument(skip_all, fields(board = %board, thread_id = %thread_id, reply_id = %reply_id))]
    pub async fn delete_reply(&self, board: &str, thread_id: &str, reply_id: &str, password: &str) -> ServiceResult<MutationOutcome> {
        let modified = self
            .repo
            .redact_reply(&normalize_board(board), thread_id, reply_id, password.trim())
            .await?;
        Ok(MutationOutcome::from_matched(modified))
    }
}
