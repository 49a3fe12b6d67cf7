//! Assertions over job results

use scripture_dl::JobResult;

/// Every expected chapter is either completed or failed, never both
pub fn assert_count_invariant(result: &JobResult, expected: usize) {
    assert_eq!(
        result.completed.len() + result.failed.len(),
        expected,
        "completed + failed must equal the chapters dispatched"
    );
    for failed in &result.failed {
        assert!(
            !result
                .completed
                .iter()
                .any(|c| c.book == failed.item.book && c.chapter == failed.item.chapter),
            "{} is both completed and failed",
            failed.item
        );
    }
}

/// `(book, chapter)` labels of the completed chapters, in result order
pub fn completed_labels(result: &JobResult) -> Vec<String> {
    result
        .completed
        .iter()
        .map(|c| format!("{} {}", c.book, c.chapter))
        .collect()
}
