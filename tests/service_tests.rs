use std::sync::Arc;

use anonboard::models::{MutationOutcome, REDACTED_TEXT};
use anonboard::repo::inmem::InMemRepo;
use anonboard::sanitize::SCRUBBED_PLACEHOLDER;
use anonboard::service::{ServiceError, ThreadService};

/// Fresh service over an empty in-memory store for every test.
fn service() -> ThreadService {
    ThreadService::new(Arc::new(InMemRepo::new()))
}

fn validation_message(err: ServiceError) -> String {
    match err {
        ServiceError::Validation(msg) => msg,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn round_trip_hides_secrets() {
    let svc = service();
    let t = svc.insert_thread("x", "T", "B", "p").await.unwrap();

    let view = svc.get_thread("x", &t.id).await.unwrap().expect("thread exists");
    assert_eq!(view.board, "x");
    assert_eq!(view.title, "T");
    assert_eq!(view.text, "B");
    assert!(view.replies.is_empty());
    assert_eq!(view.created_on, view.bumped_on);

    let json = serde_json::to_value(&view).unwrap();
    assert!(json.get("password").is_none());
    assert!(json.get("reported").is_none());
    assert_eq!(json["_id"], t.id.as_str());
}

#[tokio::test]
async fn board_names_are_case_insensitive() {
    let svc = service();
    let t = svc.insert_thread("General", "T", "B", "p").await.unwrap();
    assert_eq!(t.board, "general");
    assert!(svc.get_thread("GENERAL", &t.id).await.unwrap().is_some());
}

#[tokio::test]
async fn first_page_of_fifteen_threads() {
    let svc = service();
    let mut ids = Vec::new();
    for i in 0..15 {
        let t = svc.insert_thread("paging", &format!("thread {i}"), "body", "pw").await.unwrap();
        ids.push(t.id);
    }
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    // five replies on the oldest thread bump it to the top
    for i in 0..5 {
        svc.insert_reply("paging", &ids[0], &format!("reply {i}"), "pw").await.unwrap().unwrap();
    }

    let page = svc.get_threads("paging", 1, 10).await.unwrap();
    assert_eq!(page.total_num_threads, 15);
    assert_eq!(page.threads.len(), 10);
    assert_eq!(page.threads[0].id, ids[0]);
    assert!(page.threads.windows(2).all(|w| w[0].bumped_on >= w[1].bumped_on));

    let top = &page.threads[0];
    assert_eq!(top.reply_count, 5);
    let texts: Vec<_> = top.replies.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, ["reply 2", "reply 3", "reply 4"]);

    let second = svc.get_threads("paging", 2, 10).await.unwrap();
    assert_eq!(second.threads.len(), 5);
    assert_eq!(second.total_num_threads, 15);
}

#[tokio::test]
async fn page_arguments_are_clamped() {
    let svc = service();
    for _ in 0..3 {
        svc.insert_thread("clamp", "t", "b", "pw").await.unwrap();
    }
    let page = svc.get_threads("clamp", 0, 0).await.unwrap();
    assert_eq!(page.threads.len(), 1);
    let page = svc.get_threads("clamp", -4, 1_000).await.unwrap();
    assert_eq!(page.threads.len(), 3);
}

#[tokio::test]
async fn soft_deleted_threads_disappear_everywhere() {
    let svc = service();
    let keep = svc.insert_thread("del", "keep", "b", "pw").await.unwrap();
    let gone = svc.insert_thread("del", "gone", "b", "pw").await.unwrap();
    svc.insert_thread("other", "t", "b", "pw").await.unwrap();

    let outcome = svc.delete_thread("del", &gone.id, "pw").await.unwrap();
    assert_eq!(outcome, MutationOutcome::Success);

    assert!(svc.get_thread("del", &gone.id).await.unwrap().is_none());
    let page = svc.get_threads("del", 1, 10).await.unwrap();
    assert_eq!(page.total_num_threads, 1);
    assert_eq!(page.threads[0].id, keep.id);

    let boards = svc.get_boards().await.unwrap();
    let del = boards.iter().find(|b| b.board == "del").unwrap();
    assert_eq!(del.num_threads, 1);

    // a second delete finds nothing to match
    let again = svc.delete_thread("del", &gone.id, "pw").await.unwrap();
    assert_eq!(again, MutationOutcome::IncorrectPassword);
}

#[tokio::test]
async fn board_without_visible_threads_is_not_listed() {
    let svc = service();
    let t = svc.insert_thread("lonely", "t", "b", "pw").await.unwrap();
    svc.delete_thread("lonely", &t.id, "pw").await.unwrap();
    assert!(svc.get_boards().await.unwrap().is_empty());
}

#[tokio::test]
async fn replies_need_a_live_thread() {
    let svc = service();
    assert!(svc.insert_reply("b", "000000000000000000000000", "hi", "pw").await.unwrap().is_none());
    assert!(svc.insert_reply("b", "not-an-id", "hi", "pw").await.unwrap().is_none());

    let t = svc.insert_thread("b", "t", "b", "pw").await.unwrap();
    assert!(svc.insert_reply("other", &t.id, "hi", "pw").await.unwrap().is_none());

    svc.delete_thread("b", &t.id, "pw").await.unwrap();
    assert!(svc.insert_reply("b", &t.id, "hi", "pw").await.unwrap().is_none());
}

#[tokio::test]
async fn reply_bumps_thread() {
    let svc = service();
    let t = svc.insert_thread("bump", "t", "b", "pw").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let view = svc.insert_reply("bump", &t.id, "hi", "pw").await.unwrap().unwrap();
    assert_eq!(view.replies.len(), 1);
    assert!(view.bumped_on > view.created_on);
    assert_eq!(view.bumped_on, view.replies[0].created_on);
}

#[tokio::test]
async fn thread_updates_are_password_gated() {
    let svc = service();
    let t = svc.insert_thread("edit", "old title", "old text", "pw").await.unwrap();

    let denied = svc.update_thread("edit", &t.id, "hacked", "hacked", "nope").await.unwrap();
    assert_eq!(denied, MutationOutcome::IncorrectPassword);
    let view = svc.get_thread("edit", &t.id).await.unwrap().unwrap();
    assert_eq!(view.title, "old title");
    assert!(view.last_edited_on.is_none());

    let ok = svc.update_thread("edit", &t.id, "new title", "new text", "pw").await.unwrap();
    assert_eq!(ok, MutationOutcome::Success);
    let view = svc.get_thread("edit", &t.id).await.unwrap().unwrap();
    assert_eq!((view.title.as_str(), view.text.as_str()), ("new title", "new text"));
    assert!(view.last_edited_on.is_some());
}

#[tokio::test]
async fn reply_updates_are_password_gated() {
    let svc = service();
    let t = svc.insert_thread("edit", "t", "b", "pw").await.unwrap();
    let view = svc.insert_reply("edit", &t.id, "original", "rpw").await.unwrap().unwrap();
    let reply_id = view.replies[0].id.clone();

    let denied = svc.update_reply("edit", &t.id, &reply_id, "changed", "pw").await.unwrap();
    assert_eq!(denied, MutationOutcome::IncorrectPassword);

    let ok = svc.update_reply("edit", &t.id, &reply_id, "changed", "rpw").await.unwrap();
    assert_eq!(ok, MutationOutcome::Success);
    let view = svc.get_thread("edit", &t.id).await.unwrap().unwrap();
    assert_eq!(view.replies[0].text, "changed");
    assert!(view.replies[0].last_edited_on.is_some());
}

#[tokio::test]
async fn reports_always_succeed() {
    let svc = service();
    let t = svc.insert_thread("rep", "t", "b", "pw").await.unwrap();
    let view = svc.insert_reply("rep", &t.id, "r", "pw").await.unwrap().unwrap();
    let reply_id = &view.replies[0].id;

    for _ in 0..2 {
        assert_eq!(svc.report_thread("rep", &t.id).await.unwrap(), MutationOutcome::Success);
        assert_eq!(svc.report_reply("rep", &t.id, reply_id).await.unwrap(), MutationOutcome::Success);
    }
    assert_eq!(svc.report_thread("rep", "missing").await.unwrap(), MutationOutcome::Success);

    // reporting hides nothing
    assert_eq!(svc.get_thread("rep", &t.id).await.unwrap().unwrap().replies.len(), 1);
}

#[tokio::test]
async fn delete_reply_redacts_only_the_target() {
    let svc = service();
    let t = svc.insert_thread("red", "t", "thread body", "pw").await.unwrap();
    svc.insert_reply("red", &t.id, "first", "a").await.unwrap();
    let view = svc.insert_reply("red", &t.id, "second", "b").await.unwrap().unwrap();
    let (first, second) = (view.replies[0].id.clone(), view.replies[1].id.clone());

    assert_eq!(svc.delete_reply("red", &t.id, &second, "a").await.unwrap(), MutationOutcome::IncorrectPassword);
    assert_eq!(svc.delete_reply("red", &t.id, &second, "b").await.unwrap(), MutationOutcome::Success);

    let view = svc.get_thread("red", &t.id).await.unwrap().unwrap();
    assert_eq!(view.text, "thread body");
    assert_eq!(view.replies.len(), 2);
    assert_eq!(view.replies[0].id, first);
    assert_eq!(view.replies[0].text, "first");
    assert_eq!(view.replies[1].text, REDACTED_TEXT);

    // already redacted: nothing left to modify
    assert_eq!(svc.delete_reply("red", &t.id, &second, "b").await.unwrap(), MutationOutcome::IncorrectPassword);
}

#[tokio::test]
async fn markup_is_scrubbed_before_storage() {
    let svc = service();
    let t = svc.insert_thread("xss", "Hi <script>alert(1)</script>", "<b>ok</b>", "pw").await.unwrap();
    assert!(!t.title.contains("<script"));
    assert!(t.title.starts_with("Hi"));
    assert_eq!(t.text, "<b>ok</b>");

    let t = svc.insert_thread("xss", "<script>x</script>", "body", "pw").await.unwrap();
    assert_eq!(t.title, SCRUBBED_PLACEHOLDER);

    let view = svc.insert_reply("xss", &t.id, "<img src=x onerror=alert(1)>", "pw").await.unwrap().unwrap();
    assert!(!view.replies[0].text.contains("onerror"));
}

#[tokio::test]
async fn identifiers_with_markup_are_rejected() {
    let svc = service();
    let err = svc.insert_thread("<b>x</b>", "T", "B", "pw").await.unwrap_err();
    assert_eq!(validation_message(err), "Board and password cannot contain tags or be empty.");

    let err = svc.insert_thread("x", "T", "B", "<i>pw</i>").await.unwrap_err();
    assert_eq!(validation_message(err), "Board and password cannot contain tags or be empty.");

    let err = svc.insert_thread("x", "", "B", "pw").await.unwrap_err();
    assert_eq!(validation_message(err), "Title and text cannot be empty.");

    let t = svc.insert_thread("x", "T", "B", "pw").await.unwrap();
    let err = svc.insert_reply("x", &t.id, "hi", "<b>pw</b>").await.unwrap_err();
    assert_eq!(validation_message(err), "Password cannot contain tags or be empty.");

    // nothing was written by the rejected calls
    assert_eq!(svc.get_threads("x", 1, 10).await.unwrap().total_num_threads, 1);
}

#[tokio::test]
async fn wrong_password_delete_keeps_the_thread() {
    let svc = service();
    let t = svc.insert_thread("keep", "title", "body", "pw").await.unwrap();

    let denied = svc.delete_thread("keep", &t.id, "nope").await.unwrap();
    assert_eq!(denied, MutationOutcome::IncorrectPassword);
    let view = svc.get_thread("keep", &t.id).await.unwrap().unwrap();
    assert_eq!(view.title, "title");
    assert_eq!(svc.get_threads("keep", 1, 10).await.unwrap().total_num_threads, 1);
}

#[tokio::test]
async fn denied_reply_mutations_leave_text_alone() {
    let svc = service();
    let t = svc.insert_thread("keep", "t", "b", "pw").await.unwrap();
    let view = svc.insert_reply("keep", &t.id, "original", "rpw").await.unwrap().unwrap();
    let reply_id = view.replies[0].id.clone();

    let denied = svc.update_reply("keep", &t.id, &reply_id, "changed", "pw").await.unwrap();
    assert_eq!(denied, MutationOutcome::IncorrectPassword);
    let denied = svc.delete_reply("keep", &t.id, &reply_id, "pw").await.unwrap();
    assert_eq!(denied, MutationOutcome::IncorrectPassword);

    let view = svc.get_thread("keep", &t.id).await.unwrap().unwrap();
    assert_eq!(view.replies[0].text, "original");
    assert!(view.replies[0].last_edited_on.is_none());
}

#[tokio::test]
async fn thread_edit_bumps_the_thread() {
    let svc = service();
    let older = svc.insert_thread("bump", "older", "b", "pw").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newer = svc.insert_thread("bump", "newer", "b", "pw").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let ok = svc.update_thread("bump", &older.id, "edited", "b", "pw").await.unwrap();
    assert_eq!(ok, MutationOutcome::Success);
    let view = svc.get_thread("bump", &older.id).await.unwrap().unwrap();
    assert!(view.bumped_on > view.created_on);
    assert_eq!(Some(view.bumped_on), view.last_edited_on);

    let page = svc.get_threads("bump", 1, 10).await.unwrap();
    assert_eq!(page.threads[0].id, older.id);
    assert_eq!(page.threads[1].id, newer.id);
}

#[tokio::test]
async fn passwords_are_trimmed_on_both_sides() {
    let svc = service();
    let t = svc.insert_thread("trim", "t", "b", "  pw ").await.unwrap();
    let view = svc.insert_reply("trim", &t.id, "r", "rpw").await.unwrap().unwrap();
    let reply_id = view.replies[0].id.clone();

    assert_eq!(svc.update_reply("trim", &t.id, &reply_id, "edited", " rpw\t").await.unwrap(), MutationOutcome::Success);
    assert_eq!(svc.delete_thread("trim", &t.id, "pw").await.unwrap(), MutationOutcome::Success);
    assert!(svc.get_thread("trim", &t.id).await.unwrap().is_none());
}
