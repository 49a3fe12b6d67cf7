//! Static table of contents: the 66 books in canonical order with chapter counts.

use serde::Serialize;

/// Which half of the canon a book belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Testament {
    /// Genesis through Malachi
    Old,
    /// Matthew through Revelation
    New,
}

/// One entry of the reference table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Book {
    /// Name as the passage site expects it in a search query
    pub name: &'static str,
    /// Number of chapters
    pub chapters: u32,
    /// Old or New Testament
    pub testament: Testament,
}

const fn ot(name: &'static str, chapters: u32) -> Book {
    Book {
        name,
        chapters,
        testament: Testament::Old,
    }
}

const fn nt(name: &'static str, chapters: u32) -> Book {
    Book {
        name,
        chapters,
        testament: Testament::New,
    }
}

/// All books in canonical order
pub const BOOKS: [Book; 66] = [
    ot("Genesis", 50),
    ot("Exodus", 40),
    ot("Leviticus", 27),
    ot("Numbers", 36),
    ot("Deuteronomy", 34),
    ot("Joshua", 24),
    ot("Judges", 21),
    ot("Ruth", 4),
    ot("1 Samuel", 31),
    ot("2 Samuel", 24),
    ot("1 Kings", 22),
    ot("2 Kings", 25),
    ot("1 Chronicles", 29),
    ot("2 Chronicles", 36),
    ot("Ezra", 10),
    ot("Nehemiah", 13),
    ot("Esther", 10),
    ot("Job", 42),
    ot("Psalms", 150),
    ot("Proverbs", 31),
    ot("Ecclesiastes", 12),
    ot("Song of Songs", 8),
    ot("Isaiah", 66),
    ot("Jeremiah", 52),
    ot("Lamentations", 5),
    ot("Ezekiel", 48),
    ot("Daniel", 12),
    ot("Hosea", 14),
    ot("Joel", 3),
    ot("Amos", 9),
    ot("Obadiah", 1),
    ot("Jonah", 4),
    ot("Micah", 7),
    ot("Nahum", 3),
    ot("Habakkuk", 3),
    ot("Zephaniah", 3),
    ot("Haggai", 2),
    ot("Zechariah", 14),
    ot("Malachi", 4),
    nt("Matthew", 28),
    nt("Mark", 16),
    nt("Luke", 24),
    nt("John", 21),
    nt("Acts", 28),
    nt("Romans", 16),
    nt("1 Corinthians", 16),
    nt("2 Corinthians", 13),
    nt("Galatians", 6),
    nt("Ephesians", 6),
    nt("Philippians", 4),
    nt("Colossians", 4),
    nt("1 Thessalonians", 5),
    nt("2 Thessalonians", 3),
    nt("1 Timothy", 6),
    nt("2 Timothy", 4),
    nt("Titus", 3),
    nt("Philemon", 1),
    nt("Hebrews", 13),
    nt("James", 5),
    nt("1 Peter", 5),
    nt("2 Peter", 3),
    nt("1 John", 5),
    nt("2 John", 1),
    nt("3 John", 1),
    nt("Jude", 1),
    nt("Revelation", 22),
];

/// Alternate names some translations use
const ALIASES: &[(&str, &str)] = &[
    ("song of solomon", "Song of Songs"),
    ("psalm", "Psalms"),
    ("revelations", "Revelation"),
];

/// Look up a book by name.
///
/// Matching ignores case, surrounding whitespace and repeated inner spaces.
pub fn find(name: &str) -> Option<&'static Book> {
    let wanted = normalize(name);
    if wanted.is_empty() {
        return None;
    }

    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == wanted)
        .map(|(_, target)| normalize(target))
        .unwrap_or(wanted);

    BOOKS.iter().find(|b| normalize(b.name) == canonical)
}

/// Chapter count for a book, if known
pub fn chapter_count(name: &str) -> Option<u32> {
    find(name).map(|b| b.chapters)
}

/// Total chapters across the whole canon
pub fn total_chapters() -> u32 {
    BOOKS.iter().map(|b| b.chapters).sum()
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canon_totals() {
        assert_eq!(BOOKS.len(), 66);
        assert_eq!(total_chapters(), 1189);

        let old: u32 = BOOKS
            .iter()
            .filter(|b| b.testament == Testament::Old)
            .map(|b| b.chapters)
            .sum();
        assert_eq!(old, 929);
    }

    #[test]
    fn test_canonical_order_boundaries() {
        assert_eq!(BOOKS[0].name, "Genesis");
        assert_eq!(BOOKS[38].name, "Malachi");
        assert_eq!(BOOKS[39].name, "Matthew");
        assert_eq!(BOOKS[65].name, "Revelation");
    }

    #[test]
    fn test_find_is_case_and_space_insensitive() {
        assert_eq!(find("genesis").map(|b| b.name), Some("Genesis"));
        assert_eq!(find("  1   JOHN ").map(|b| b.name), Some("1 John"));
        assert_eq!(find("Song of Solomon").map(|b| b.name), Some("Song of Songs"));
    }

    #[test]
    fn test_find_unknown() {
        assert!(find("Hezekiah").is_none());
        assert!(find("").is_none());
        assert!(find("   ").is_none());
    }

    #[test]
    fn test_single_chapter_books() {
        for name in ["Obadiah", "Philemon", "2 John", "3 John", "Jude"] {
            assert_eq!(chapter_count(name), Some(1), "{name}");
        }
    }
}
