use crate::models::{ReplyView, ThreadPage, ThreadView};
use crate::routes::{NewReplyRequest, NewThreadRequest, TargetRequest, UpdateReplyRequest, UpdateThreadRequest};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "Anonymous Message Board API"),
    paths(
        crate::routes::create_thread,
        crate::routes::list_threads,
        crate::routes::update_thread,
        crate::routes::report_thread,
        crate::routes::delete_thread,
        crate::routes::create_reply,
        crate::routes::get_thread,
        crate::routes::update_reply,
        crate::routes::report_reply,
        crate::routes::delete_reply,
    ),
    components(schemas(
        ThreadView, ReplyView, ThreadPage,
        NewThreadRequest, NewReplyRequest, UpdateThreadRequest, UpdateReplyRequest, TargetRequest
    )),
    tags(
        (name = "threads", description = "Thread operations"),
        (name = "replies", description = "Reply operations"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_both_resources() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
        assert!(paths.contains(&"/api/threads/{board}".to_string()));
        assert!(paths.contains(&"/api/replies/{board}".to_string()));
    }
}
