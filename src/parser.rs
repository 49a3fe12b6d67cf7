//! Passage page parsing
//!
//! [`ChapterParser`] turns a fetched page into a [`ChapterRecord`]. Parsing is
//! pure CPU work and runs after the concurrency permit is released.
//!
//! [`BibleGatewayParser`] understands passage pages where each verse is one or
//! more `span.text` elements tagged with a reference class such as `Gen-1-3`.
//! A verse split across several spans (poetry lines) is joined back together;
//! verse numbers, chapter numbers, footnote and cross-reference markers and
//! section headings are dropped.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::FetchError;
use crate::types::{ChapterRecord, WorkItem};

/// Pure transform from raw page content to a chapter record.
pub trait ChapterParser: Send + Sync {
    /// Parse `raw` as chapter `item` of `translation`.
    ///
    /// A page with no recognisable passage is a [`Parse`](crate::error::FetchErrorKind::Parse)
    /// failure, which the orchestrator retries: it is often an interstitial page.
    fn parse(
        &self,
        raw: &str,
        translation: &str,
        item: &WorkItem,
    ) -> Result<ChapterRecord, FetchError>;
}

/// Parser for BibleGateway passage pages
#[derive(Clone, Copy, Debug, Default)]
pub struct BibleGatewayParser;

impl BibleGatewayParser {
    /// Create a parser
    pub fn new() -> Self {
        Self
    }
}

// Static selectors and patterns; the literals are known-valid
#[allow(clippy::expect_used)]
fn passage_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        Selector::parse("div.passage-text").expect("static passage CSS selector is valid")
    })
}

#[allow(clippy::expect_used)]
fn verse_span_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        Selector::parse("span.text").expect("static verse CSS selector is valid")
    })
}

#[allow(clippy::expect_used)]
fn verse_class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9A-Za-z]+-(\d+)-(\d+)$").expect("static verse class pattern is valid")
    })
}

impl ChapterParser for BibleGatewayParser {
    fn parse(
        &self,
        raw: &str,
        translation: &str,
        item: &WorkItem,
    ) -> Result<ChapterRecord, FetchError> {
        let document = Html::parse_document(raw);

        let passage = document.select(passage_selector()).next().ok_or_else(|| {
            FetchError::parse(format!("no passage container in page for {item}"))
        })?;

        // Verse number -> index into `verses`, preserving first-appearance order
        let mut positions: HashMap<u32, usize> = HashMap::new();
        let mut verses: Vec<String> = Vec::new();

        for span in passage.select(verse_span_selector()) {
            if inside_heading(span, passage) {
                continue;
            }
            let Some((chapter, verse)) = verse_reference(span) else {
                continue;
            };
            if chapter != item.chapter {
                continue;
            }

            let text = verse_text(span);
            if text.is_empty() {
                continue;
            }

            match positions.get(&verse) {
                Some(&idx) => {
                    let existing = &mut verses[idx];
                    existing.push(' ');
                    existing.push_str(&text);
                }
                None => {
                    positions.insert(verse, verses.len());
                    verses.push(text);
                }
            }
        }

        tracing::trace!(
            book = %item.book,
            chapter = item.chapter,
            verses = verses.len(),
            "Parsed chapter"
        );

        Ok(ChapterRecord {
            translation: translation.to_string(),
            book: item.book.clone(),
            chapter: item.chapter,
            verses,
        })
    }
}

/// (chapter, verse) from a class like `Gen-1-3`
fn verse_reference(span: ElementRef<'_>) -> Option<(u32, u32)> {
    span.value().classes().find_map(|class| {
        let caps = verse_class_pattern().captures(class)?;
        let chapter = caps.get(1)?.as_str().parse().ok()?;
        let verse = caps.get(2)?.as_str().parse().ok()?;
        Some((chapter, verse))
    })
}

/// Section headings reuse the verse class of the verse they introduce
fn inside_heading(span: ElementRef<'_>, passage: ElementRef<'_>) -> bool {
    span.ancestors()
        .take_while(|node| node.id() != passage.id())
        .filter_map(|node| node.value().as_element())
        .any(|el| matches!(el.name(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
}

/// Visible verse text with markers removed and whitespace collapsed
fn verse_text(span: ElementRef<'_>) -> String {
    let mut buf = String::new();

    for node in span.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let is_marker = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != span.id())
            .filter_map(|ancestor| ancestor.value().as_element())
            .any(|el| el.name() == "sup" || el.classes().any(|c| c == "chapternum"));
        if !is_marker {
            buf.push_str(text);
            buf.push(' ');
        }
    }

    buf.split_whitespace().collect::<Vec<_>>().join(" ")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;

    const GENESIS_1: &str = include_str!("../tests/fixtures/genesis_1_kjv.html");

    fn genesis_1() -> WorkItem {
        WorkItem::new("Genesis", 1, 0)
    }

    #[test]
    fn test_genesis_1_has_31_verses() {
        let record = BibleGatewayParser::new()
            .parse(GENESIS_1, "KJV", &genesis_1())
            .unwrap();

        assert_eq!(record.translation, "KJV");
        assert_eq!(record.book, "Genesis");
        assert_eq!(record.chapter, 1);
        assert_eq!(record.verses.len(), 31);
    }

    #[test]
    fn test_markers_and_headings_are_stripped() {
        let record = BibleGatewayParser::new()
            .parse(GENESIS_1, "KJV", &genesis_1())
            .unwrap();

        assert_eq!(
            record.verses[0],
            "In the beginning God created the heaven and the earth."
        );
        assert!(record.verses[1].ends_with("upon the face of the waters."));
        assert!(!record.verses[1].contains("[a]"));
        assert!(record.verses.iter().all(|v| !v.contains("The Creation")));
    }

    #[test]
    fn test_split_verse_is_joined_in_order() {
        let record = BibleGatewayParser::new()
            .parse(GENESIS_1, "KJV", &genesis_1())
            .unwrap();

        assert_eq!(
            record.verses[26],
            "So God created man in his own image, in the image of God created he him; \
             male and female created he them."
        );
        assert!(record.verses[30].starts_with("And God saw every thing"));
    }

    #[test]
    fn test_missing_container_is_parse_error() {
        let page = "<html><body><p>Please verify you are human</p></body></html>";
        let err = BibleGatewayParser::new()
            .parse(page, "KJV", &genesis_1())
            .unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::Parse);
    }

    #[test]
    fn test_empty_passage_is_valid() {
        let page = r#"<html><body><div class="passage-text"></div></body></html>"#;
        let record = BibleGatewayParser::new()
            .parse(page, "KJV", &genesis_1())
            .unwrap();

        assert!(record.verses.is_empty());
    }

    #[test]
    fn test_spans_from_other_chapters_ignored() {
        let page = r#"<div class="passage-text">
            <span class="text Gen-1-31"><sup class="versenum">31 </sup>End of one.</span>
            <span class="text Gen-2-1"><span class="chapternum">2 </span>Start of two.</span>
            <span class="text Gen-2-2"><sup class="versenum">2 </sup>Second.</span>
        </div>"#;
        let record = BibleGatewayParser::new()
            .parse(page, "KJV", &WorkItem::new("Genesis", 2, 0))
            .unwrap();

        assert_eq!(record.verses, vec!["Start of two.", "Second."]);
    }
}
