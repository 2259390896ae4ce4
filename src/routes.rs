use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::models::*;
use crate::sanitize::normalize_board;
use crate::service::ThreadService;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/threads/{board}")
            .route(web::post().to(create_thread))
            .route(web::get().to(list_threads))
            .route(web::patch().to(update_thread))
            .route(web::put().to(report_thread))
            .route(web::delete().to(delete_thread)),
    )
    .service(
        web::resource("/api/replies/{board}")
            .route(web::post().to(create_reply))
            .route(web::get().to(get_thread))
            .route(web::patch().to(update_reply))
            .route(web::put().to(report_reply))
            .route(web::delete().to(delete_reply)),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub threads: ThreadService,
    pub site_title: String,
}

impl AppState {
    pub fn new(threads: ThreadService) -> Self {
        Self { threads, site_title: crate::config::DEFAULT_SITE_TITLE.to_string() }
    }

    pub fn with_site_title(mut self, title: impl Into<String>) -> Self {
        self.site_title = title.into();
        self
    }
}

/// JSON or urlencoded form body; browsers and API clients both post here.
pub type Body<T> = web::Either<web::Json<T>, web::Form<T>>;

/// A missing or unparseable body counts as every field absent, so the
/// handler still answers with its required-fields message.
fn fields<T: Default>(payload: Option<Body<T>>) -> T {
    payload.map(|p| p.into_inner()).unwrap_or_default()
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NewThreadRequest {
    pub title: Option<String>,
    pub text: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NewReplyRequest {
    pub thread_id: Option<String>,
    pub text: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateThreadRequest {
    pub thread_id: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateReplyRequest {
    pub thread_id: Option<String>,
    pub reply_id: Option<String>,
    pub text: Option<String>,
    pub password: Option<String>,
}

/// Shared by report and delete: which fields are required depends on the route.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TargetRequest {
    pub thread_id: Option<String>,
    pub reply_id: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ThreadsQuery {
    /// 1-based page number (default 1)
    pub page: Option<i64>,
    /// Page size (default 10, max 100)
    #[serde(rename = "threadsPerPage")]
    pub threads_per_page: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ThreadQuery {
    pub thread_id: Option<String>,
}

pub const DEFAULT_THREADS_PER_PAGE: u64 = 10;

fn board_name(path: &web::Path<String>) -> Option<String> {
    Some(normalize_board(path.as_str())).filter(|b| !b.is_empty())
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

fn missing(msg: &str) -> ApiError {
    ApiError::BadRequest(msg.to_string())
}

fn outcome_response(outcome: MutationOutcome) -> HttpResponse {
    let mut resp = match outcome {
        MutationOutcome::Success => HttpResponse::Ok(),
        MutationOutcome::IncorrectPassword => HttpResponse::BadRequest(),
    };
    resp.content_type("text/plain; charset=utf-8").body(outcome.as_str())
}

#[utoipa::path(
    post,
    path = "/api/threads/{board}",
    params(("board" = String, Path, description = "Board name")),
    request_body = NewThreadRequest,
    responses(
        (status = 200, description = "Thread created", body = ThreadView),
        (status = 400, description = "Missing or invalid fields")
    ),
    tag = "threads"
)]
pub async fn create_thread(data: web::Data<AppState>, path: web::Path<String>, payload: Option<Body<NewThreadRequest>>) -> Result<HttpResponse, ApiError> {
    let body = fields(payload);
    let (Some(board), Some(title), Some(text), Some(password)) =
        (board_name(&path), present(&body.title), present(&body.text), present(&body.password))
    else {
        return Err(missing("Board, title, text, and password are required"));
    };
    let thread = data.threads.insert_thread(&board, title, text, password).await?;
    Ok(HttpResponse::Ok().json(thread.to_view(None)))
}

#[utoipa::path(
    get,
    path = "/api/threads/{board}",
    params(("board" = String, Path, description = "Board name"), ThreadsQuery),
    responses(
        (status = 200, description = "Most recently bumped threads with their latest replies", body = ThreadPage)
    ),
    tag = "threads"
)]
pub async fn list_threads(data: web::Data<AppState>, path: web::Path<String>, query: web::Query<ThreadsQuery>) -> Result<HttpResponse, ApiError> {
    let board = board_name(&path).ok_or_else(|| missing("Board is required"))?;
    let page = query.page.unwrap_or(1);
    let per_page = query.threads_per_page.unwrap_or(DEFAULT_THREADS_PER_PAGE);
    let results = data.threads.get_threads(&board, page, per_page).await?;
    Ok(HttpResponse::Ok().json(results))
}

#[utoipa::path(
    patch,
    path = "/api/threads/{board}",
    params(("board" = String, Path, description = "Board name")),
    request_body = UpdateThreadRequest,
    responses(
        (status = 200, description = "success"),
        (status = 400, description = "incorrect password, or missing fields")
    ),
    tag = "threads"
)]
pub async fn update_thread(data: web::Data<AppState>, path: web::Path<String>, payload: Option<Body<UpdateThreadRequest>>) -> Result<HttpResponse, ApiError> {
    let body = fields(payload);
    let (Some(board), Some(thread_id), Some(title), Some(text), Some(password)) = (
        board_name(&path),
        present(&body.thread_id),
        present(&body.title),
        present(&body.text),
        present(&body.password),
    ) else {
        return Err(missing("Board, thread_id, title, text, and password are required"));
    };
    let outcome = data.threads.update_thread(&board, thread_id, title, text, password).await?;
    Ok(outcome_response(outcome))
}

#[utoipa::path(
    put,
    path = "/api/threads/{board}",
    params(("board" = String, Path, description = "Board name")),
    request_body = TargetRequest,
    responses((status = 200, description = "success")),
    tag = "threads"
)]
pub async fn report_thread(data: web::Data<AppState>, path: web::Path<String>, payload: Option<Body<TargetRequest>>) -> Result<HttpResponse, ApiError> {
    let body = fields(payload);
    let (Some(board), Some(thread_id)) = (board_name(&path), present(&body.thread_id)) else {
        return Err(missing("Board and thread_id are required"));
    };
    let outcome = data.threads.report_thread(&board, thread_id).await?;
    Ok(outcome_response(outcome))
}

#[utoipa::path(
    delete,
    path = "/api/threads/{board}",
    params(("board" = String, Path, description = "Board name")),
    request_body = TargetRequest,
    responses(
        (status = 200, description = "success"),
        (status = 400, description = "incorrect password, or missing fields")
    ),
    tag = "threads"
)]
pub async fn delete_thread(data: web::Data<AppState>, path: web::Path<String>, payload: Option<Body<TargetRequest>>) -> Result<HttpResponse, ApiError> {
    let body = fields(payload);
    let (Some(board), Some(thread_id), Some(password)) =
        (board_name(&path), present(&body.thread_id), present(&body.password))
    else {
        return Err(missing("Board, thread_id, and password are required"));
    };
    let outcome = data.threads.delete_thread(&board, thread_id, password).await?;
    Ok(outcome_response(outcome))
}

#[utoipa::path(
    post,
    path = "/api/replies/{board}",
    params(("board" = String, Path, description = "Board name")),
    request_body = NewReplyRequest,
    responses(
        (status = 200, description = "Reply added; the updated thread", body = ThreadView),
        (status = 400, description = "Missing or invalid fields"),
        (status = 404, description = "Thread not found")
    ),
    tag = "replies"
)]
pub async fn create_reply(data: web::Data<AppState>, path: web::Path<String>, payload: Option<Body<NewReplyRequest>>) -> Result<HttpResponse, ApiError> {
    let body = fields(payload);
    let (Some(board), Some(thread_id), Some(text), Some(password)) =
        (board_name(&path), present(&body.thread_id), present(&body.text), present(&body.password))
    else {
        return Err(missing("Board, thread_id, text, and password are required"));
    };
    let thread = data
        .threads
        .insert_reply(&board, thread_id, text, password)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(thread))
}

#[utoipa::path(
    get,
    path = "/api/replies/{board}",
    params(("board" = String, Path, description = "Board name"), ThreadQuery),
    responses(
        (status = 200, description = "Thread with all replies", body = ThreadView),
        (status = 404, description = "Thread not found")
    ),
    tag = "replies"
)]
pub async fn get_thread(data: web::Data<AppState>, path: web::Path<String>, query: web::Query<ThreadQuery>) -> Result<HttpResponse, ApiError> {
    let (Some(board), Some(thread_id)) = (board_name(&path), present(&query.thread_id)) else {
        return Err(missing("Board and thread_id are required"));
    };
    let thread = data.threads.get_thread(&board, thread_id).await?.ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(thread))
}

#[utoipa::path(
    patch,
    path = "/api/replies/{board}",
    params(("board" = String, Path, description = "Board name")),
    request_body = UpdateReplyRequest,
    responses(
        (status = 200, description = "success"),
        (status = 400, description = "incorrect password, or missing fields")
    ),
    tag = "replies"
)]
pub async fn update_reply(data: web::Data<AppState>, path: web::Path<String>, payload: Option<Body<UpdateReplyRequest>>) -> Result<HttpResponse, ApiError> {
    let body = fields(payload);
    let (Some(board), Some(thread_id), Some(reply_id), Some(text), Some(password)) = (
        board_name(&path),
        present(&body.thread_id),
        present(&body.reply_id),
        present(&body.text),
        present(&body.password),
    ) else {
        return Err(missing("Board, thread_id, reply_id, text, and password are required"));
    };
    let outcome = data.threads.update_reply(&board, thread_id, reply_id, text, password).await?;
    Ok(outcome_response(outcome))
}

#[utoipa::path(
    put,
    path = "/api/replies/{board}",
    params(("board" = String, Path, description = "Board name")),
    request_body = TargetRequest,
    responses((status = 200, description = "success")),
    tag = "replies"
)]
pub async fn report_reply(data: web::Data<AppState>, path: web::Path<String>, payload: Option<Body<TargetRequest>>) -> Result<HttpResponse, ApiError> {
    let body = fields(payload);
    let (Some(board), Some(thread_id), Some(reply_id)) =
        (board_name(&path), present(&body.thread_id), present(&body.reply_id))
    else {
        return Err(missing("Board, thread_id, and reply_id are required"));
    };
    let outcome = data.threads.report_reply(&board, thread_id, reply_id).await?;
    Ok(outcome_response(outcome))
}

#[utoipa::path(
    delete,
    path = "/api/replies/{board}",
    params(("board" = String, Path, description = "Board name")),
    request_body = TargetRequest,
    responses(
        (status = 200, description = "success"),
        (status = 400, description = "incorrect password, or missing fields")
    ),
    tag = "replies"
)]
pub async fn delete_reply(data: web::Data<AppState>, path: web::Path<String>, payload: Option<Body<TargetRequest>>) -> Result<HttpResponse, ApiError> {
    let body = fields(payload);
    let (Some(board), Some(thread_id), Some(reply_id), Some(password)) =
        (board_name(&path), present(&body.thread_id), present(&body.reply_id), present(&body.password))
    else {
        return Err(missing("Board, thread_id, reply_id, and password are required"));
    };
    let outcome = data.threads.delete_reply(&board, thread_id, reply_id, password).await?;
    Ok(outcome_response(outcome))
}
