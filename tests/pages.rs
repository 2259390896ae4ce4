use std::sync::Arc;

use actix_web::{http::header, test, web, App};
use anonboard::repo::inmem::InMemRepo;
use anonboard::{pages, AppState, ThreadService};

fn state() -> web::Data<AppState> {
    let service = ThreadService::new(Arc::new(InMemRepo::new()));
    web::Data::new(AppState::new(service).with_site_title("Test Board"))
}

async fn text(resp: actix_web::dev::ServiceResponse) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

#[actix_web::test]
async fn static_pages_render() {
    let app = test::init_service(App::new().app_data(state()).configure(pages::config)).await;
    for uri in ["/", "/about", "/api-tests"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), 200, "{uri}");
        assert!(resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap().starts_with("text/html"));
        assert!(text(resp).await.contains("Test Board"), "{uri}");
    }
}

#[actix_web::test]
async fn posting_forms_redirects_to_the_thread() {
    let data = state();
    let app = test::init_service(App::new().app_data(data.clone()).configure(pages::config)).await;

    let req = test::TestRequest::post()
        .uri("/b/Tech")
        .set_form([("title", "*Rust* 2024"), ("text", "&gt; quoted"), ("password", "pw")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 303);
    let location = resp.headers().get(header::LOCATION).unwrap().to_str().unwrap().to_string();
    assert!(location.starts_with("/b/tech/"));
    let thread_id = location.trim_start_matches("/b/tech/").to_string();

    let req = test::TestRequest::post()
        .uri(&location)
        .set_form([("text", "a reply"), ("password", "pw")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), location.as_str());

    let resp = test::call_service(&app, test::TestRequest::get().uri(&location).to_request()).await;
    assert_eq!(resp.status(), 200);
    let page = text(resp).await;
    assert!(page.contains("<em>Rust</em> 2024"));
    assert!(page.contains("<blockquote>"));
    assert!(page.contains("a reply"));
    assert!(page.contains(&format!(r#"action="/b/tech/{thread_id}""#)));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/b/tech").to_request()).await;
    assert_eq!(resp.status(), 200);
    let page = text(resp).await;
    assert!(page.contains(&format!(r#"href="/b/tech/{thread_id}""#)));
    assert!(page.contains("Page 1 of 1"));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert!(text(resp).await.contains(r#"href="/b/tech""#));
}

#[actix_web::test]
async fn board_page_paginates() {
    let data = state();
    for i in 0..5 {
        data.threads.insert_thread("busy", &format!("thread {i}"), "body", "pw").await.unwrap();
    }
    let app = test::init_service(App::new().app_data(data.clone()).configure(pages::config)).await;
    let req = test::TestRequest::get().uri("/b/busy?page=2&threadsPerPage=2").to_request();
    let page = text(test::call_service(&app, req).await).await;
    assert!(page.contains("Page 2 of 3"));
    assert!(page.contains("/b/busy?page=3&amp;threadsPerPage=2"));
    assert!(page.contains("/b/busy?page=1&amp;threadsPerPage=2"));
}

#[actix_web::test]
async fn missing_thread_and_bad_forms() {
    let app = test::init_service(App::new().app_data(state()).configure(pages::config)).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/b/tech/000000000000000000000000").to_request()).await;
    assert_eq!(resp.status(), 404);
    assert_eq!(text(resp).await, "Not found");

    let req = test::TestRequest::post()
        .uri("/b/tech/000000000000000000000000")
        .set_form([("text", "hi"), ("password", "pw")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::post().uri("/b/tech").set_form([("title", "t")]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(text(resp).await, "Board, title, text, and password are required");
}

#[actix_web::test]
async fn huge_page_number_renders_empty_page() {
    let data = state();
    data.threads.insert_thread("busy", "only thread", "body", "pw").await.unwrap();
    let app = test::init_service(App::new().app_data(data.clone()).configure(pages::config)).await;
    let req = test::TestRequest::get().uri("/b/busy?page=9223372036854775807&threadsPerPage=10").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let page = text(resp).await;
    assert!(page.contains("No threads on this page."));
    assert!(page.contains("of 1"));
}

#[actix_web::test]
async fn thread_page_accepts_mixed_case_board() {
    let data = state();
    let t = data.threads.insert_thread("tech", "hello", "body", "pw").await.unwrap();
    let app = test::init_service(App::new().app_data(data.clone()).configure(pages::config)).await;
    let req = test::TestRequest::get().uri(&format!("/b/TECH/{}", t.id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert!(text(resp).await.contains(&format!(r#"action="/b/tech/{}""#, t.id)));
}
