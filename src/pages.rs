//! HTML page handlers. Browser forms post here; the JSON API lives in
//! [`crate::routes`].

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use maud::Markup;

use crate::error::ApiError;
use crate::routes::{AppState, NewReplyRequest, NewThreadRequest, ThreadsQuery, DEFAULT_THREADS_PER_PAGE};
use crate::sanitize::normalize_board;
use crate::service::MAX_THREADS_PER_PAGE;
use crate::render;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(home))
        .route("/about", web::get().to(about))
        .route("/api-tests", web::get().to(api_tests))
        .service(
            web::resource("/b/{board}")
                .route(web::get().to(board))
                .route(web::post().to(post_thread)),
        )
        .service(
            web::resource("/b/{board}/{thread_id}")
                .route(web::get().to(thread))
                .route(web::post().to(post_reply)),
        );
}

/// Pagination state for a board page. Links are empty when there is no
/// previous/next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageControl {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
    pub first_item_on_page: u64,
    pub last_item_on_page: u64,
    pub first_page: String,
    pub last_page: String,
    pub next_page: String,
    pub prev_page: String,
}

impl PageControl {
    pub fn new(board: &str, current_page: u64, per_page: u64, total: u64) -> Self {
        let current = current_page.max(1);
        let per_page = per_page.max(1);
        let total_pages = total.div_ceil(per_page).max(1);
        let link = |n: u64| format!("/b/{board}?page={n}&threadsPerPage={per_page}");
        Self {
            current_page: current,
            total_pages,
            total_items: total,
            items_per_page: per_page,
            first_item_on_page: (current - 1).saturating_mul(per_page).saturating_add(1).min(total),
            last_item_on_page: current.saturating_mul(per_page).min(total),
            first_page: link(1),
            last_page: link(total_pages),
            next_page: if current < total_pages { link(current + 1) } else { String::new() },
            prev_page: if current > 1 { link(current - 1) } else { String::new() },
        }
    }
}

fn html(markup: Markup) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(markup.into_string())
}

fn see_other(location: String) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

async fn home(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let boards = data.threads.get_boards().await?;
    Ok(html(render::home_page(&data.site_title, &boards)))
}

async fn about(data: web::Data<AppState>) -> HttpResponse {
    html(render::about_page(&data.site_title))
}

async fn api_tests(data: web::Data<AppState>) -> HttpResponse {
    html(render::api_tests_page(&data.site_title))
}

async fn board(data: web::Data<AppState>, path: web::Path<String>, query: web::Query<ThreadsQuery>) -> Result<HttpResponse, ApiError> {
    let board = normalize_board(&path);
    if board.is_empty() {
        return Err(ApiError::NotFound);
    }
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .threads_per_page
        .unwrap_or(DEFAULT_THREADS_PER_PAGE)
        .clamp(1, MAX_THREADS_PER_PAGE);
    let results = data.threads.get_threads(&board, page, per_page).await?;
    let control = PageControl::new(&board, page.unsigned_abs(), per_page, results.total_num_threads);
    Ok(html(render::board_page(&data.site_title, &board, &results, &control)))
}

async fn thread(data: web::Data<AppState>, path: web::Path<(String, String)>) -> Result<HttpResponse, ApiError> {
    let (board, thread_id) = path.into_inner();
    let board = normalize_board(&board);
    let thread = data
        .threads
        .get_thread(&board, &thread_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(html(render::thread_page(&data.site_title, &thread)))
}

async fn post_thread(data: web::Data<AppState>, path: web::Path<String>, form: web::Form<NewThreadRequest>) -> Result<HttpResponse, ApiError> {
    let board = normalize_board(&path);
    let (false, Some(title), Some(text), Some(password)) =
        (board.is_empty(), present(&form.title), present(&form.text), present(&form.password))
    else {
        return Err(ApiError::BadRequest("Board, title, text, and password are required".into()));
    };
    let created = data.threads.insert_thread(&board, title, text, password).await?;
    Ok(see_other(format!("/b/{}/{}", created.board, created.id)))
}

async fn post_reply(data: web::Data<AppState>, path: web::Path<(String, String)>, form: web::Form<NewReplyRequest>) -> Result<HttpResponse, ApiError> {
    let (board, thread_id) = path.into_inner();
    let board = normalize_board(&board);
    let (false, Some(text), Some(password)) = (board.is_empty(), present(&form.text), present(&form.password)) else {
        return Err(ApiError::BadRequest("Board, thread_id, text, and password are required".into()));
    };
    let updated = data
        .threads
        .insert_reply(&board, &thread_id, text, password)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(see_other(format!("/b/{}/{}", updated.board, updated.id)))
}
