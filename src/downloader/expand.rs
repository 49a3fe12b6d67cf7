//! Job expansion: turn a book list into ordered work-items.

use crate::books::{self, BOOKS};
use crate::error::{Error, Result};
use crate::types::WorkItem;

/// One work-item per chapter of each requested book, in request order.
///
/// An empty list means every book in canonical order. Names resolve through
/// [`books::find`]; work-items carry the canonical name. A book named twice is
/// expanded once, at its first position.
pub(crate) fn expand_books(requested: &[String]) -> Result<Vec<WorkItem>> {
    let resolved: Vec<&'static books::Book> = if requested.is_empty() {
        BOOKS.iter().collect()
    } else {
        let mut resolved: Vec<&'static books::Book> = Vec::with_capacity(requested.len());
        for name in requested {
            let book = books::find(name).ok_or_else(|| Error::UnknownBook(name.clone()))?;
            if resolved.iter().any(|seen| seen.name == book.name) {
                tracing::debug!(book = book.name, "Duplicate book in request collapsed");
                continue;
            }
            resolved.push(book);
        }
        resolved
    };

    let items = resolved
        .iter()
        .enumerate()
        .flat_map(|(position, book)| {
            (1..=book.chapters).map(move |chapter| WorkItem::new(book.name, chapter, position))
        })
        .collect();
    Ok(items)
}

/// Validate caller-supplied work-items: known books, chapters in range, no repeats.
///
/// A chapter listed twice is kept once, at its first position. Keys are rebuilt
/// from the item's position and chapter. Returns the items sorted by sequence key.
pub(crate) fn normalize_items(items: &[WorkItem]) -> Result<Vec<WorkItem>> {
    let mut normalized: Vec<WorkItem> = Vec::with_capacity(items.len());
    for item in items {
        let book = books::find(&item.book).ok_or_else(|| Error::UnknownBook(item.book.clone()))?;
        if item.chapter == 0 || item.chapter > book.chapters {
            return Err(Error::config(
                "chapter",
                format!(
                    "{} has {} chapters, {} requested",
                    book.name, book.chapters, item.chapter
                ),
            ));
        }
        if normalized
            .iter()
            .any(|seen| seen.book == book.name && seen.chapter == item.chapter)
        {
            tracing::debug!(book = book.name, chapter = item.chapter, "Duplicate work-item collapsed");
            continue;
        }
        normalized.push(WorkItem::new(
            book.name,
            item.chapter,
            item.sequence.book_position,
        ));
    }
    normalized.sort();
    Ok(normalized)
}
