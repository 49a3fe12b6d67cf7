//! Result aggregation: reassemble chapter outcomes into canonical order.
//!
//! Outcomes arrive in completion order, which depends on the network. The
//! aggregator accepts them in any order and produces a [`JobResult`] sorted by
//! sequence key, with every expected work-item accounted for exactly once.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::{FetchError, FetchErrorKind};
use crate::types::{ChapterRecord, FailedItem, JobResult, SequenceKey, WorkItem};

/// Final outcome of one work-item after retries
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChapterOutcome {
    /// The chapter this outcome belongs to
    pub item: WorkItem,
    /// Parsed chapter, or the terminal error
    pub result: Result<ChapterRecord, FetchError>,
    /// Attempts consumed
    pub attempts: u32,
}

/// Collects chapter outcomes for one job
#[derive(Debug)]
pub struct ResultAggregator {
    translation: String,
    expected: Vec<WorkItem>,
    expected_set: HashSet<WorkItem>,
    resolved: HashSet<WorkItem>,
    completed: Vec<(SequenceKey, ChapterRecord)>,
    failed: Vec<FailedItem>,
    started_at: DateTime<Utc>,
}

impl ResultAggregator {
    /// Start collecting for `items` of `translation`
    pub fn new(translation: impl Into<String>, items: &[WorkItem]) -> Self {
        Self {
            translation: translation.into(),
            expected: items.to_vec(),
            expected_set: items.iter().cloned().collect(),
            resolved: HashSet::with_capacity(items.len()),
            completed: Vec::with_capacity(items.len()),
            failed: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Aggregate a whole batch of outcomes at once
    pub fn collect<I>(translation: impl Into<String>, items: &[WorkItem], outcomes: I) -> JobResult
    where
        I: IntoIterator<Item = ChapterOutcome>,
    {
        let mut aggregator = Self::new(translation, items);
        for outcome in outcomes {
            aggregator.record(outcome);
        }
        aggregator.finish()
    }

    /// Record one outcome. Returns `false` if it was ignored.
    ///
    /// Outcomes for items outside the job, or a second outcome for the same
    /// item, are ignored so no chapter is ever counted twice.
    pub fn record(&mut self, outcome: ChapterOutcome) -> bool {
        let ChapterOutcome {
            item,
            result,
            attempts,
        } = outcome;

        if !self.expected_set.contains(&item) {
            tracing::warn!(book = %item.book, chapter = item.chapter, "Outcome for unknown work-item ignored");
            return false;
        }
        if !self.resolved.insert(item.clone()) {
            tracing::warn!(book = %item.book, chapter = item.chapter, "Duplicate outcome ignored");
            return false;
        }

        match result {
            Ok(record) => self.completed.push((item.sequence, record)),
            Err(error) => self.failed.push(FailedItem {
                item,
                error,
                attempts,
            }),
        }
        true
    }

    /// Outcomes recorded so far
    pub fn resolved(&self) -> usize {
        self.resolved.len()
    }

    /// Work-items still waiting for an outcome
    pub fn pending(&self) -> usize {
        self.expected_set.len() - self.resolved.len()
    }

    /// Sort and seal the result.
    ///
    /// Items that never reported are listed as internal failures.
    pub fn finish(mut self) -> JobResult {
        let missing: Vec<WorkItem> = self
            .expected
            .iter()
            .filter(|item| !self.resolved.contains(*item))
            .cloned()
            .collect();
        for item in missing {
            tracing::error!(book = %item.book, chapter = item.chapter, "Work-item never reported an outcome");
            self.failed.push(FailedItem {
                item,
                error: FetchError::new(FetchErrorKind::Internal, "no outcome recorded"),
                attempts: 0,
            });
        }

        self.completed.sort_by_key(|(key, _)| *key);
        self.failed.sort_by(|a, b| a.item.cmp(&b.item));

        JobResult {
            translation: self.translation,
            completed: self.completed.into_iter().map(|(_, record)| record).collect(),
            failed: self.failed,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}
