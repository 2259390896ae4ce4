use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("storage error: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

/// Storage operations on the thread collection.
///
/// Every method touches exactly one thread document and performs its match
/// and mutation atomically. Inputs are expected to be normalized and
/// sanitized already. Gated mutations report whether the filter (including
/// the password) matched.
#[async_trait]
pub trait ThreadRepo: Send + Sync {
    async fn insert_thread(&self, thread: Thread) -> RepoResult<Thread>;
    /// Append `reply` to a visible thread and bump it. `None` when nothing matched.
    async fn push_reply(&self, board: &str, thread_id: &str, reply: Reply) -> RepoResult<Option<ThreadView>>;
    async fn board_summaries(&self) -> RepoResult<Vec<BoardSummary>>;
    async fn list_threads(&self, board: &str, skip: u64, limit: u64) -> RepoResult<ThreadPage>;
    async fn get_thread(&self, board: &str, thread_id: &str) -> RepoResult<Option<ThreadView>>;
    async fn update_thread(&self, board: &str, thread_id: &str, password: &str, title: &str, text: &str, now: DateTime<Utc>) -> RepoResult<bool>;
    async fn update_reply(&self, board: &str, thread_id: &str, reply_id: &str, password: &str, text: &str, now: DateTime<Utc>) -> RepoResult<bool>;
    async fn report_thread(&self, board: &str, thread_id: &str) -> RepoResult<bool>;
    async fn report_reply(&self, board: &str, thread_id: &str, reply_id: &str) -> RepoResult<bool>;
    async fn delete_thread(&self, board: &str, thread_id: &str, password: &str, now: DateTime<Utc>) -> RepoResult<bool>;
    /// Replace a reply's text with [`REDACTED_TEXT`]. True only if the text changed.
    async fn redact_reply(&self, board: &str, thread_id: &str, reply_id: &str, password: &str) -> RepoResult<bool>;
    /// Release backend resources. Called once after the HTTP server stops.
    async fn shutdown(&self) {}
}

pub mod inmem {
    use super::*;

    #[derive(Default)]
    struct State {
        threads: Vec<Thread>, // insertion order
    }

    /// Process-local backend. Each operation holds the write lock for its whole
    /// check-and-mutate, which gives the same per-document atomicity as MongoDB.
    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            Self::default()
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }
    }

    impl State {
        fn visible_mut(&mut self, board: &str, thread_id: &str) -> Option<&mut Thread> {
            self.threads
                .iter_mut()
                .find(|t| t.id == thread_id && t.board == board && t.is_visible())
        }

        fn visible(&self, board: &str, thread_id: &str) -> Option<&Thread> {
            self.threads
                .iter()
                .find(|t| t.id == thread_id && t.board == board && t.is_visible())
        }
    }

    fn bump(thread: &mut Thread, now: DateTime<Utc>) {
        thread.bumped_on = thread.bumped_on.max(now);
    }

    #[async_trait]
    impl ThreadRepo for InMemRepo {
        async fn insert_thread(&self, thread: Thread) -> RepoResult<Thread> {
            let mut s = self.write()?;
            s.threads.push(thread.clone());
            Ok(thread)
        }

        async fn push_reply(&self, board: &str, thread_id: &str, reply: Reply) -> RepoResult<Option<ThreadView>> {
            let mut s = self.write()?;
            let Some(thread) = s.visible_mut(board, thread_id) else { return Ok(None) };
            bump(thread, reply.created_on);
            thread.replies.push(reply);
            Ok(Some(thread.to_view(None)))
        }

        async fn board_summaries(&self) -> RepoResult<Vec<BoardSummary>> {
            let s = self.read()?;
            let mut out: Vec<BoardSummary> = Vec::new();
            for t in s.threads.iter().filter(|t| t.is_visible()) {
                match out.iter_mut().find(|b| b.board == t.board) {
                    Some(b) => {
                        b.min_created = b.min_created.min(t.created_on);
                        b.max_created = b.max_created.max(t.created_on);
                        b.min_bumped = b.min_bumped.min(t.bumped_on);
                        b.max_bumped = b.max_bumped.max(t.bumped_on);
                        b.num_threads += 1;
                        b.num_replies += t.replies.len() as u64;
                    }
                    None => out.push(BoardSummary {
                        board: t.board.clone(),
                        min_created: t.created_on,
                        max_created: t.created_on,
                        min_bumped: t.bumped_on,
                        max_bumped: t.bumped_on,
                        num_threads: 1,
                        num_replies: t.replies.len() as u64,
                    }),
                }
            }
            out.sort_by(|a, b| {
                b.max_bumped
                    .cmp(&a.max_bumped)
                    .then_with(|| b.num_threads.cmp(&a.num_threads))
            });
            Ok(out)
        }

        async fn list_threads(&self, board: &str, skip: u64, limit: u64) -> RepoResult<ThreadPage> {
            let s = self.read()?;
            let mut v: Vec<&Thread> = s.threads
                .iter()
                .filter(|t| t.board == board && t.is_visible())
                .collect();
            // latest bump first; ObjectId hex sorts by creation within a tie
            v.sort_by(|a, b| b.bumped_on.cmp(&a.bumped_on).then_with(|| b.id.cmp(&a.id)));
            let total_num_threads = v.len() as u64;
            let threads = v
                .into_iter()
                .skip(usize::try_from(skip).unwrap_or(usize::MAX))
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .map(|t| t.to_view(Some(REPLY_PREVIEW_LEN)))
                .collect();
            Ok(ThreadPage { threads, total_num_threads })
        }

        async fn get_thread(&self, board: &str, thread_id: &str) -> RepoResult<Option<ThreadView>> {
            let s = self.read()?;
            Ok(s.visible(board, thread_id).map(|t| t.to_view(None)))
        }

        async fn update_thread(&self, board: &str, thread_id: &str, password: &str, title: &str, text: &str, now: DateTime<Utc>) -> RepoResult<bool> {
            let mut s = self.write()?;
            let Some(thread) = s.visible_mut(board, thread_id).filter(|t| t.password == password) else {
                return Ok(false);
            };
            thread.title = title.to_string();
            thread.text = text.to_string();
            thread.last_edited_on = Some(now);
            bump(thread, now);
            Ok(true)
        }

        async fn update_reply(&self, board: &str, thread_id: &str, reply_id: &str, password: &str, text: &str, now: DateTime<Utc>) -> RepoResult<bool> {
            let mut s = self.write()?;
            let Some(thread) = s.visible_mut(board, thread_id) else { return Ok(false) };
            let Some(reply) = thread.replies.iter_mut().find(|r| r.id == reply_id && r.password == password) else {
                return Ok(false);
            };
            reply.text = text.to_string();
            reply.last_edited_on = Some(now);
            bump(thread, now);
            Ok(true)
        }

        async fn report_thread(&self, board: &str, thread_id: &str) -> RepoResult<bool> {
            let mut s = self.write()?;
            Ok(s.visible_mut(board, thread_id).map(|t| t.reported = true).is_some())
        }

        async fn report_reply(&self, board: &str, thread_id: &str, reply_id: &str) -> RepoResult<bool> {
            let mut s = self.write()?;
            let reply = s
                .visible_mut(board, thread_id)
                .and_then(|t| t.replies.iter_mut().find(|r| r.id == reply_id));
            Ok(reply.map(|r| r.reported = true).is_some())
        }

        async fn delete_thread(&self, board: &str, thread_id: &str, password: &str, now: DateTime<Utc>) -> RepoResult<bool> {
            let mut s = self.write()?;
            match s.visible_mut(board, thread_id).filter(|t| t.password == password) {
                Some(thread) => {
                    thread.deleted_on = Some(now);
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn redact_reply(&self, board: &str, thread_id: &str, reply_id: &str, password: &str) -> RepoResult<bool> {
            let mut s = self.write()?;
            let reply = s
                .visible_mut(board, thread_id)
                .and_then(|t| t.replies.iter_mut().find(|r| r.id == reply_id && r.password == password));
            match reply {
                Some(r) if r.text != REDACTED_TEXT => {
                    r.text = REDACTED_TEXT.to_string();
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

}

// MongoDB implementation; the production backend.
pub mod mongo {
    use super::*;
    use bson::{doc, oid::ObjectId, Bson, Document};
    use futures_util::TryStreamExt as _;
    use log::{debug, info};
    use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
    use mongodb::{Client, Collection};
    use serde::Deserialize;

    const COLLECTION: &str = "threads";

    impl From<mongodb::error::Error> for RepoError {
        fn from(e: mongodb::error::Error) -> Self { RepoError::Internal(e.to_string()) }
    }

    impl From<bson::de::Error> for RepoError {
        fn from(e: bson::de::Error) -> Self { RepoError::Internal(format!("malformed document: {e}")) }
    }

    #[derive(Clone)]
    pub struct MongoRepo {
        client: Client,
        threads: Collection<Document>,
    }

    impl MongoRepo {
        /// Connect and ping; failing here is fatal at startup.
        pub async fn connect(uri: &str, db_name: &str) -> RepoResult<Self> {
            let client = Client::with_uri_str(uri).await?;
            let db = client.database(db_name);
            db.run_command(doc! { "ping": 1 }, None).await?;
            info!("connected to MongoDB database '{db_name}'");
            Ok(Self { threads: db.collection::<Document>(COLLECTION), client })
        }
    }

    // Ids that are not ObjectIds can never match a stored document.
    fn oid(id: &str) -> Option<ObjectId> {
        ObjectId::parse_str(id).ok()
    }

    fn date(dt: DateTime<Utc>) -> bson::DateTime {
        bson::DateTime::from_chrono(dt)
    }

    fn optional_date(dt: Option<DateTime<Utc>>) -> Bson {
        dt.map(|d| Bson::DateTime(date(d))).unwrap_or(Bson::Null)
    }

    fn reply_doc(r: &Reply) -> RepoResult<Document> {
        let id = oid(&r.id).ok_or_else(|| RepoError::Internal(format!("invalid reply id {}", r.id)))?;
        Ok(doc! {
            "_id": id,
            "text": r.text.as_str(),
            "created_on": date(r.created_on),
            "last_edited_on": optional_date(r.last_edited_on),
            "reported": r.reported,
            "password": r.password.as_str(),
        })
    }

    fn hidden_fields() -> Document {
        doc! { "password": 0, "reported": 0, "replies.password": 0, "replies.reported": 0 }
    }

    fn public_fields() -> Document {
        doc! {
            "board": 1,
            "title": 1,
            "text": 1,
            "created_on": 1,
            "bumped_on": 1,
            "last_edited_on": 1,
            "replies._id": 1,
            "replies.text": 1,
            "replies.created_on": 1,
            "replies.last_edited_on": 1,
            "reply_count": { "$size": "$replies" },
        }
    }

    #[derive(Deserialize)]
    struct ReplyRow {
        #[serde(rename = "_id")]
        id: ObjectId,
        text: String,
        created_on: bson::DateTime,
        last_edited_on: Option<bson::DateTime>,
    }

    #[derive(Deserialize)]
    struct ThreadRow {
        #[serde(rename = "_id")]
        id: ObjectId,
        board: String,
        title: String,
        text: String,
        created_on: bson::DateTime,
        bumped_on: bson::DateTime,
        last_edited_on: Option<bson::DateTime>,
        #[serde(default)]
        replies: Vec<ReplyRow>,
        reply_count: Option<i64>,
    }

    impl ThreadRow {
        fn from_document(d: Document) -> RepoResult<ThreadView> {
            let row: ThreadRow = bson::from_document(d)?;
            let reply_count = row
                .reply_count
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(row.replies.len());
            Ok(ThreadView {
                id: row.id.to_hex(),
                board: row.board,
                title: row.title,
                text: row.text,
                created_on: row.created_on.to_chrono(),
                bumped_on: row.bumped_on.to_chrono(),
                last_edited_on: row.last_edited_on.map(|d| d.to_chrono()),
                replies: row
                    .replies
                    .into_iter()
                    .map(|r| ReplyView {
                        id: r.id.to_hex(),
                        text: r.text,
                        created_on: r.created_on.to_chrono(),
                        last_edited_on: r.last_edited_on.map(|d| d.to_chrono()),
                    })
                    .collect(),
                reply_count,
            })
        }
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct BoardRow {
        #[serde(rename = "_id")]
        board: String,
        min_created: bson::DateTime,
        max_created: bson::DateTime,
        min_bumped: bson::DateTime,
        max_bumped: bson::DateTime,
        num_threads: i64,
        num_replies: i64,
    }

    impl From<BoardRow> for BoardSummary {
        fn from(r: BoardRow) -> Self {
            BoardSummary {
                board: r.board,
                min_created: r.min_created.to_chrono(),
                max_created: r.max_created.to_chrono(),
                min_bumped: r.min_bumped.to_chrono(),
                max_bumped: r.max_bumped.to_chrono(),
                num_threads: u64::try_from(r.num_threads).unwrap_or(0),
                num_replies: u64::try_from(r.num_replies).unwrap_or(0),
            }
        }
    }

    #[async_trait]
    impl ThreadRepo for MongoRepo {
        async fn insert_thread(&self, thread: Thread) -> RepoResult<Thread> {
            let id = oid(&thread.id).ok_or_else(|| RepoError::Internal(format!("invalid thread id {}", thread.id)))?;
            let replies = thread.replies.iter().map(reply_doc).collect::<RepoResult<Vec<_>>>()?;
            let d = doc! {
                "_id": id,
                "board": thread.board.as_str(),
                "title": thread.title.as_str(),
                "text": thread.text.as_str(),
                "created_on": date(thread.created_on),
                "bumped_on": date(thread.bumped_on),
                "last_edited_on": optional_date(thread.last_edited_on),
                "deleted_on": optional_date(thread.deleted_on),
                "reported": thread.reported,
                "password": thread.password.as_str(),
                "replies": replies,
            };
            self.threads.insert_one(d, None).await?;
            Ok(thread)
        }

        async fn push_reply(&self, board: &str, thread_id: &str, reply: Reply) -> RepoResult<Option<ThreadView>> {
            let Some(id) = oid(thread_id) else { return Ok(None) };
            let filter = doc! { "_id": id, "board": board, "deleted_on": Bson::Null };
            let update = doc! {
                "$push": { "replies": reply_doc(&reply)? },
                "$max": { "bumped_on": date(reply.created_on) },
            };
            let options = FindOneAndUpdateOptions::builder()
                .projection(hidden_fields())
                .return_document(ReturnDocument::After)
                .build();
            match self.threads.find_one_and_update(filter, update, options).await? {
                Some(d) => ThreadRow::from_document(d).map(Some),
                None => Ok(None),
            }
        }

        async fn board_summaries(&self) -> RepoResult<Vec<BoardSummary>> {
            let pipeline = vec![
                doc! { "$match": { "deleted_on": Bson::Null } },
                doc! { "$group": {
                    "_id": "$board",
                    "minCreated": { "$min": "$created_on" },
                    "maxCreated": { "$max": "$created_on" },
                    "minBumped": { "$min": "$bumped_on" },
                    "maxBumped": { "$max": "$bumped_on" },
                    "numThreads": { "$sum": 1 },
                    "numReplies": { "$sum": { "$size": "$replies" } },
                } },
                doc! { "$sort": { "maxBumped": -1, "numThreads": -1 } },
            ];
            let docs: Vec<Document> = self.threads.aggregate(pipeline, None).await?.try_collect().await?;
            docs.into_iter()
                .map(|d| bson::from_document::<BoardRow>(d).map(BoardSummary::from).map_err(RepoError::from))
                .collect()
        }

        async fn list_threads(&self, board: &str, skip: u64, limit: u64) -> RepoResult<ThreadPage> {
            let filter = doc! { "board": board, "deleted_on": Bson::Null };
            let as_i64 = |n: u64| i64::try_from(n).unwrap_or(i64::MAX);
            let preview = -(REPLY_PREVIEW_LEN as i64);
            let pipeline = vec![
                doc! { "$match": filter.clone() },
                doc! { "$sort": { "bumped_on": -1, "_id": -1 } },
                doc! { "$skip": as_i64(skip) },
                doc! { "$limit": as_i64(limit) },
                doc! { "$project": public_fields() },
                doc! { "$addFields": { "replies": { "$slice": ["$replies", preview] } } },
            ];
            let docs: Vec<Document> = self.threads.aggregate(pipeline, None).await?.try_collect().await?;
            let threads = docs
                .into_iter()
                .map(ThreadRow::from_document)
                .collect::<RepoResult<Vec<_>>>()?;
            let total_num_threads = self.threads.count_documents(filter, None).await?;
            Ok(ThreadPage { threads, total_num_threads })
        }

        async fn get_thread(&self, board: &str, thread_id: &str) -> RepoResult<Option<ThreadView>> {
            let Some(id) = oid(thread_id) else { return Ok(None) };
            let pipeline = vec![
                doc! { "$match": { "_id": id, "board": board, "deleted_on": Bson::Null } },
                doc! { "$project": public_fields() },
            ];
            let mut cursor = self.threads.aggregate(pipeline, None).await?;
            match cursor.try_next().await? {
                Some(d) => ThreadRow::from_document(d).map(Some),
                None => Ok(None),
            }
        }

        async fn update_thread(&self, board: &str, thread_id: &str, password: &str, title: &str, text: &str, now: DateTime<Utc>) -> RepoResult<bool> {
            let Some(id) = oid(thread_id) else { return Ok(false) };
            let filter = doc! { "_id": id, "board": board, "password": password, "deleted_on": Bson::Null };
            let update = doc! {
                "$set": { "title": title, "text": text, "last_edited_on": date(now) },
                "$max": { "bumped_on": date(now) },
            };
            let res = self.threads.update_one(filter, update, None).await?;
            Ok(res.matched_count == 1)
        }

        async fn update_reply(&self, board: &str, thread_id: &str, reply_id: &str, password: &str, text: &str, now: DateTime<Utc>) -> RepoResult<bool> {
            let (Some(id), Some(rid)) = (oid(thread_id), oid(reply_id)) else { return Ok(false) };
            let filter = doc! {
                "_id": id,
                "board": board,
                "deleted_on": Bson::Null,
                "replies": { "$elemMatch": { "_id": rid, "password": password } },
            };
            let update = doc! {
                "$set": { "replies.$.text": text, "replies.$.last_edited_on": date(now) },
                "$max": { "bumped_on": date(now) },
            };
            let res = self.threads.update_one(filter, update, None).await?;
            Ok(res.modified_count == 1)
        }

        async fn report_thread(&self, board: &str, thread_id: &str) -> RepoResult<bool> {
            let Some(id) = oid(thread_id) else { return Ok(false) };
            let filter = doc! { "_id": id, "board": board, "deleted_on": Bson::Null };
            let res = self.threads.update_one(filter, doc! { "$set": { "reported": true } }, None).await?;
            if res.matched_count == 0 {
                debug!("report_thread matched nothing board={board} thread={thread_id}");
            }
            Ok(res.matched_count == 1)
        }

        async fn report_reply(&self, board: &str, thread_id: &str, reply_id: &str) -> RepoResult<bool> {
            let (Some(id), Some(rid)) = (oid(thread_id), oid(reply_id)) else { return Ok(false) };
            let filter = doc! { "_id": id, "board": board, "deleted_on": Bson::Null, "replies._id": rid };
            let update = doc! { "$set": { "replies.$.reported": true } };
            let res = self.threads.update_one(filter, update, None).await?;
            Ok(res.matched_count == 1)
        }

        async fn delete_thread(&self, board: &str, thread_id: &str, password: &str, now: DateTime<Utc>) -> RepoResult<bool> {
            let Some(id) = oid(thread_id) else { return Ok(false) };
            let filter = doc! { "_id": id, "board": board, "password": password, "deleted_on": Bson::Null };
            let res = self.threads.update_one(filter, doc! { "$set": { "deleted_on": date(now) } }, None).await?;
            Ok(res.matched_count == 1)
        }

        async fn redact_reply(&self, board: &str, thread_id: &str, reply_id: &str, password: &str) -> RepoResult<bool> {
            let (Some(id), Some(rid)) = (oid(thread_id), oid(reply_id)) else { return Ok(false) };
            let filter = doc! {
                "_id": id,
                "board": board,
                "deleted_on": Bson::Null,
                "replies": { "$elemMatch": { "_id": rid, "password": password } },
            };
            let update = doc! { "$set": { "replies.$.text": REDACTED_TEXT } };
            let res = self.threads.update_one(filter, update, None).await?;
            Ok(res.modified_count == 1)
        }

        async fn shutdown(&self) {
            info!("closing MongoDB client");
            self.client.clone().shutdown().await;
        }
    }
}
