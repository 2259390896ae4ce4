//! Server-rendered HTML views.
//!
//! Every page is a maud `Markup` wrapped in [`page_shell`]. Stored titles and
//! texts are already scrubbed, so the Markdown output is emitted unescaped.

use chrono::{DateTime, Utc};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use pulldown_cmark::{html as md_html, Event, Options, Parser, Tag, TagEnd};

use crate::models::{BoardSummary, ReplyView, ThreadPage, ThreadView};
use crate::pages::PageControl;

const PAGE_CSS: &str = r#"
*{box-sizing:border-box}
body{font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;line-height:1.5;color:#1d1d1f;background:#f4f4f6;margin:0}
header{background:#2d2a4a;color:#fff;padding:.75rem 1.25rem;display:flex;gap:1.25rem;align-items:baseline;flex-wrap:wrap}
header a{color:#fff}
header .site{font-weight:700;font-size:1.15rem}
header .board{font-family:ui-monospace,Menlo,monospace;color:#c9c3ff}
main{max-width:820px;margin:1.25rem auto;padding:0 1rem}
a{color:#4b3fbf}
.thread,.reply,.panel{background:#fff;border-radius:8px;padding:1rem 1.25rem;margin:.75rem 0}
.reply{margin-left:1.5rem;background:#fafaff;border-left:3px solid #d9d5ff}
.title{font-size:1.2rem;font-weight:600;margin:0 0 .25rem}
.meta{font-size:.8rem;color:#777}
.body blockquote{border-left:3px solid #ccc;margin:.5rem 0;padding-left:.75rem;color:#555}
.body pre{background:#f0f0f4;padding:.5rem .75rem;overflow-x:auto}
.more{font-size:.85rem;margin-left:1.5rem}
form label{display:block;margin:.5rem 0 .2rem;font-size:.9rem}
form input,form textarea{width:100%;padding:.4rem;font:inherit}
form textarea{min-height:6rem}
form button{margin-top:.6rem;padding:.4rem 1rem}
.pager{display:flex;gap:1rem;align-items:center;font-size:.9rem}
table{border-collapse:collapse;width:100%}
th,td{text-align:left;padding:.35rem .5rem;border-bottom:1px solid #e3e3ea}
pre.curl{background:#1d1d1f;color:#eee;padding:.75rem;overflow-x:auto;font-size:.85rem}
"#;

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

/// Scrubbing escapes `>`, which would turn every Markdown block quote into
/// literal text. Only `&gt;` is restored; `&lt;` stays escaped.
pub fn fix_block_quote(text: &str) -> String {
    text.replace("&gt;", ">")
}

/// Render stored text as block Markdown.
pub fn render_text(text: &str) -> String {
    let fixed = fix_block_quote(text);
    let parser = Parser::new_ext(&fixed, markdown_options());
    let mut out = String::with_capacity(fixed.len() * 2);
    md_html::push_html(&mut out, parser);
    out
}

fn inline_start(tag: &Tag) -> bool {
    matches!(tag, Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. })
}

fn inline_end(tag: &TagEnd) -> bool {
    matches!(tag, TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link)
}

/// Render a title as inline Markdown: emphasis, code spans and links survive,
/// block structure (paragraphs, headings, lists) is flattened away.
pub fn render_title(title: &str) -> String {
    let events = Parser::new_ext(title, markdown_options()).filter(|ev| match ev {
        Event::Start(tag) => inline_start(tag),
        Event::End(tag) => inline_end(tag),
        Event::Text(_) | Event::Code(_) | Event::InlineHtml(_) | Event::SoftBreak | Event::HardBreak => true,
        _ => false,
    });
    let mut out = String::with_capacity(title.len() + 16);
    md_html::push_html(&mut out, events);
    // a title made only of block markup flattens to nothing; show it as text
    if out.trim().is_empty() && !title.trim().is_empty() {
        return html! { (title) }.into_string();
    }
    out
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn board_href(board: &str) -> String {
    format!("/b/{board}")
}

fn thread_href(board: &str, thread_id: &str) -> String {
    format!("/b/{board}/{thread_id}")
}

/// Full HTML document with the shared header. `board` is empty outside boards.
pub fn page_shell(site_title: &str, board: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title {
                    (site_title)
                    @if !board.is_empty() { " /" (board) "/" }
                }
                style { (PreEscaped(PAGE_CSS)) }
            }
            body {
                header {
                    a class="site" href="/" { (site_title) }
                    @if !board.is_empty() {
                        a class="board" href=(board_href(board)) { "/" (board) "/" }
                    }
                    a href="/about" { "About" }
                    a href="/api-tests" { "API" }
                    a href="/docs/" { "OpenAPI" }
                }
                main { (body) }
            }
        }
    }
}

fn edited(last_edited_on: &Option<DateTime<Utc>>) -> Markup {
    html! {
        @if let Some(ts) = last_edited_on {
            " · edited " (timestamp(ts))
        }
    }
}

fn reply_block(reply: &ReplyView) -> Markup {
    html! {
        div class="reply" id=(reply.id) {
            div class="meta" {
                "Reply " code { (reply.id) } " · " (timestamp(&reply.created_on)) (edited(&reply.last_edited_on))
            }
            div class="body" { (PreEscaped(render_text(&reply.text))) }
        }
    }
}

fn thread_block(thread: &ThreadView, link_title: bool) -> Markup {
    let title = PreEscaped(render_title(&thread.title));
    html! {
        div class="thread" id=(thread.id) {
            p class="title" {
                @if link_title {
                    a href=(thread_href(&thread.board, &thread.id)) { (title) }
                } @else {
                    (title)
                }
            }
            div class="meta" {
                "Thread " code { (thread.id) } " · " (timestamp(&thread.created_on))
                " · bumped " (timestamp(&thread.bumped_on)) (edited(&thread.last_edited_on))
            }
            div class="body" { (PreEscaped(render_text(&thread.text))) }
        }
    }
}

fn new_thread_form(board: &str) -> Markup {
    html! {
        form class="panel" method="post" action=(board_href(board)) {
            strong { "Start a new thread" }
            label for="title" { "Title" }
            input id="title" name="title" required;
            label for="text" { "Text (Markdown)" }
            textarea id="text" name="text" required {}
            label for="password" { "Password (to edit or delete later)" }
            input id="password" name="password" type="password" required;
            button type="submit" { "Post thread" }
        }
    }
}

fn reply_form(board: &str, thread_id: &str) -> Markup {
    html! {
        form class="panel" method="post" action=(thread_href(board, thread_id)) {
            strong { "Reply" }
            label for="text" { "Text (Markdown)" }
            textarea id="text" name="text" required {}
            label for="password" { "Password (to edit or delete later)" }
            input id="password" name="password" type="password" required;
            button type="submit" { "Post reply" }
        }
    }
}

fn pager(control: &PageControl) -> Markup {
    html! {
        nav class="pager" {
            a href=(control.first_page) { "« first" }
            @if !control.prev_page.is_empty() { a href=(control.prev_page) { "‹ prev" } }
            span {
                "Page " (control.current_page) " of " (control.total_pages)
                " · threads " (control.first_item_on_page) "–" (control.last_item_on_page)
                " of " (control.total_items)
            }
            @if !control.next_page.is_empty() { a href=(control.next_page) { "next ›" } }
            a href=(control.last_page) { "last »" }
        }
    }
}

pub fn home_page(site_title: &str, boards: &[BoardSummary]) -> Markup {
    page_shell(
        site_title,
        "",
        html! {
            div class="panel" {
                h1 { "Boards" }
                @if boards.is_empty() {
                    p { "No boards yet. Start one by visiting " code { "/b/<name>" } " and posting a thread." }
                } @else {
                    table {
                        thead { tr { th { "Board" } th { "Threads" } th { "Replies" } th { "Last bumped" } } }
                        tbody {
                            @for b in boards {
                                tr {
                                    td { a href=(board_href(&b.board)) { "/" (b.board) "/" } }
                                    td { (b.num_threads) }
                                    td { (b.num_replies) }
                                    td { (timestamp(&b.max_bumped)) }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn board_page(site_title: &str, board: &str, page: &ThreadPage, control: &PageControl) -> Markup {
    page_shell(
        site_title,
        board,
        html! {
            (new_thread_form(board))
            (pager(control))
            @if page.threads.is_empty() {
                p class="panel" { "No threads on this page." }
            }
            @for thread in &page.threads {
                (thread_block(thread, true))
                @let hidden = thread.reply_count.saturating_sub(thread.replies.len());
                @if hidden > 0 {
                    p class="more" {
                        a href=(thread_href(board, &thread.id)) { (hidden) " earlier replies hidden, view thread" }
                    }
                }
                @for reply in &thread.replies {
                    (reply_block(reply))
                }
            }
            (pager(control))
        },
    )
}

pub fn thread_page(site_title: &str, thread: &ThreadView) -> Markup {
    page_shell(
        site_title,
        &thread.board,
        html! {
            (thread_block(thread, false))
            @for reply in &thread.replies {
                (reply_block(reply))
            }
            (reply_form(&thread.board, &thread.id))
        },
    )
}

pub fn about_page(site_title: &str) -> Markup {
    page_shell(
        site_title,
        "",
        html! {
            div class="panel" {
                h1 { "About" }
                p {
                    "An anonymous message board. Anyone can open a board by posting to it, "
                    "start threads and reply to them. No accounts: each post carries a password "
                    "chosen by its author, which is the only way to edit or delete it later."
                }
                p {
                    "Boards list threads by most recent activity. Replying bumps a thread to the top. "
                    "Anyone may report a thread or reply for moderation."
                }
                p {
                    "Titles and texts accept Markdown and a small set of HTML tags; "
                    "everything else is scrubbed before it is stored."
                }
            }
        },
    )
}

const API_EXAMPLES: &[(&str, &str)] = &[
    ("Create a thread", r#"curl -X POST localhost:3000/api/threads/test -H 'Content-Type: application/json' -d '{"title":"Hello","text":"First post","password":"pw"}'"#),
    ("List threads", "curl 'localhost:3000/api/threads/test?page=1&threadsPerPage=10'"),
    ("Edit a thread", r#"curl -X PATCH localhost:3000/api/threads/test -H 'Content-Type: application/json' -d '{"thread_id":"<id>","title":"Hi","text":"Edited","password":"pw"}'"#),
    ("Report a thread", "curl -X PUT localhost:3000/api/threads/test -d 'thread_id=<id>'"),
    ("Delete a thread", "curl -X DELETE localhost:3000/api/threads/test -d 'thread_id=<id>&password=pw'"),
    ("Reply to a thread", "curl -X POST localhost:3000/api/replies/test -d 'thread_id=<id>&text=Nice&password=pw'"),
    ("Read a thread", "curl 'localhost:3000/api/replies/test?thread_id=<id>'"),
    ("Edit a reply", "curl -X PATCH localhost:3000/api/replies/test -d 'thread_id=<id>&reply_id=<rid>&text=Fixed&password=pw'"),
    ("Report a reply", "curl -X PUT localhost:3000/api/replies/test -d 'thread_id=<id>&reply_id=<rid>'"),
    ("Delete a reply", "curl -X DELETE localhost:3000/api/replies/test -d 'thread_id=<id>&reply_id=<rid>&password=pw'"),
];

pub fn api_tests_page(site_title: &str) -> Markup {
    page_shell(
        site_title,
        "",
        html! {
            div class="panel" {
                h1 { "API" }
                p {
                    "Bodies may be JSON or form encoded. Mutations answer with plain text: "
                    code { "success" } " (200) or " code { "incorrect password" } " (400). "
                    "Missing fields are a 400 naming the required fields. "
                    "The full schema is browsable at " a href="/docs/" { "/docs/" } "."
                }
                @for (label, cmd) in API_EXAMPLES {
                    h3 { (label) }
                    pre class="curl" { (cmd) }
                }
            }
        },
    )
}
