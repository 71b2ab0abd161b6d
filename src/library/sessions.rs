//! Interval-based reading telemetry: an append-only session log with
//! range-filtered queries and on-demand aggregation.

use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::library::BookId;

/// One recorded reading session. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct ReadingSession {
    pub book_id: BookId,
    /// Seconds since the Unix epoch.
    pub start: i64,
    /// Seconds since the Unix epoch; `end >= start`.
    pub end: i64,
    pub pages: Option<u32>,
}

/// Filter for session queries. All bounds are optional; an empty filter
/// matches every session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionFilter {
    pub book_id: Option<BookId>,
    pub since: Option<i64>,
    pub until: Option<i64>,
}

impl SessionFilter {
    fn matches(&self, session: &ReadingSession) -> bool {
        if let Some(book_id) = self.book_id
            && session.book_id != book_id
        {
            return false;
        }
        // Closed-interval overlap: a session touching the boundary counts.
        if let Some(since) = self.since
            && session.end < since
        {
            return false;
        }
        if let Some(until) = self.until
            && session.start > until
        {
            return false;
        }
        true
    }
}

/// Append-only session log.
///
/// Appends are independent of any in-flight import and may proceed
/// concurrently with one.
#[derive(Default)]
pub struct SessionLog {
    sessions: Mutex<Vec<ReadingSession>>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a session. Fails with [`Error::InvalidInterval`] when the end
    /// precedes the start; the caller must correct the input.
    pub fn record(&self, session: ReadingSession) -> Result<()> {
        if session.end < session.start {
            return Err(Error::InvalidInterval {
                start: session.start,
                end: session.end,
            });
        }
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.push(session);
        Ok(())
    }

    /// All sessions overlapping the filter bounds, ordered by start time
    /// ascending.
    pub fn query(&self, filter: &SessionFilter) -> Vec<ReadingSession> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<ReadingSession> = sessions
            .iter()
            .filter(|s| filter.matches(s))
            .copied()
            .collect();
        matched.sort_by_key(|s| s.start);
        matched
    }

    /// Total reading time over the filtered sessions, in seconds.
    ///
    /// A pure fold, recomputed on demand; per-user session volume is small
    /// enough that no incremental aggregate is kept.
    pub fn total_seconds(&self, filter: &SessionFilter) -> i64 {
        self.query(filter).iter().map(|s| s.end - s.start).sum()
    }

    /// Total pages read over the filtered sessions.
    pub fn total_pages(&self, filter: &SessionFilter) -> u32 {
        self.query(filter).iter().filter_map(|s| s.pages).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(book: i64, start: i64, end: i64, pages: Option<u32>) -> ReadingSession {
        ReadingSession {
            book_id: BookId(book),
            start,
            end,
            pages,
        }
    }

    #[test]
    fn test_rejects_inverted_interval() {
        let log = SessionLog::new();
        let result = log.record(session(1, 100, 50, None));
        assert!(matches!(
            result,
            Err(Error::InvalidInterval { start: 100, end: 50 })
        ));
        assert!(log.query(&SessionFilter::default()).is_empty());
    }

    #[test]
    fn test_zero_length_interval_is_valid() {
        let log = SessionLog::new();
        log.record(session(1, 100, 100, None)).unwrap();
        assert_eq!(log.query(&SessionFilter::default()).len(), 1);
    }

    #[test]
    fn test_query_orders_by_start_ascending() {
        let log = SessionLog::new();
        log.record(session(1, 300, 400, None)).unwrap();
        log.record(session(2, 100, 200, None)).unwrap();
        log.record(session(1, 200, 250, None)).unwrap();

        let all = log.query(&SessionFilter::default());
        let starts: Vec<i64> = all.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![100, 200, 300]);
    }

    #[test]
    fn test_query_filters_by_book_and_range() {
        let log = SessionLog::new();
        log.record(session(1, 100, 200, None)).unwrap();
        log.record(session(1, 500, 600, None)).unwrap();
        log.record(session(2, 150, 250, None)).unwrap();

        let filter = SessionFilter {
            book_id: Some(BookId(1)),
            since: Some(150),
            until: Some(550),
        };
        let matched = log.query(&filter);
        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|s| s.book_id == BookId(1)));
    }

    #[test]
    fn test_boundary_overlap_counts() {
        let log = SessionLog::new();
        log.record(session(1, 100, 200, None)).unwrap();

        // Session end touches `since`; session start touches `until`.
        let touching_since = SessionFilter {
            since: Some(200),
            ..Default::default()
        };
        let touching_until = SessionFilter {
            until: Some(100),
            ..Default::default()
        };
        assert_eq!(log.query(&touching_since).len(), 1);
        assert_eq!(log.query(&touching_until).len(), 1);

        let disjoint = SessionFilter {
            since: Some(201),
            ..Default::default()
        };
        assert!(log.query(&disjoint).is_empty());
    }

    #[test]
    fn test_aggregation_folds() {
        let log = SessionLog::new();
        log.record(session(1, 0, 60, Some(3))).unwrap();
        log.record(session(1, 100, 160, Some(5))).unwrap();
        log.record(session(2, 0, 1000, Some(40))).unwrap();

        let book1 = SessionFilter {
            book_id: Some(BookId(1)),
            ..Default::default()
        };
        assert_eq!(log.total_seconds(&book1), 120);
        assert_eq!(log.total_pages(&book1), 8);
        assert_eq!(log.total_seconds(&SessionFilter::default()), 1120);
    }
}
