//! Passage pages and mock mounting helpers

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A captured KJV Genesis 1 passage page
pub const GENESIS_1_KJV: &str = include_str!("../fixtures/genesis_1_kjv.html");

/// A synthetic passage page with `verses` verses
pub fn chapter_page(book: &str, chapter: u32, verses: u32) -> String {
    let abbr: String = book.chars().filter(|c| c.is_ascii_alphanumeric()).take(4).collect();
    let mut page = String::from(r#"<html><body><div class="passage-text"><p>"#);
    for verse in 1..=verses {
        page.push_str(&format!(
            r#"<span class="text {abbr}-{chapter}-{verse}"><sup class="versenum">{verse} </sup>{book} {chapter}:{verse}</span> "#,
        ));
    }
    page.push_str("</p></div></body></html>");
    page
}

/// Serve `body` for `book chapter` in `version`
pub async fn mount_chapter(server: &MockServer, version: &str, book: &str, chapter: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/passage/"))
        .and(query_param("search", format!("{book} {chapter}")))
        .and(query_param("version", version))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Respond to `book chapter` in `version` with `status`
pub async fn mount_status(server: &MockServer, version: &str, book: &str, chapter: u32, status: u16) {
    Mock::given(method("GET"))
        .and(path("/passage/"))
        .and(query_param("search", format!("{book} {chapter}")))
        .and(query_param("version", version))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
