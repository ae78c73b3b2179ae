use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by [`EventCounter`](crate::EventCounter).
///
/// Both are non-fatal: the counter is left untouched and the caller decides
/// what to do with the event or the query.
#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The event is older than the trailing 24h window.
    #[error("insert at {timestamp} precedes the window floor {floor}")]
    InsertBeforeWindow { timestamp: i64, floor: i64 },
    /// The query would read behind the most recent insert.
    #[error("query at {timestamp} precedes the last insert at {last_insert}")]
    QueryBeforeLastInsert { timestamp: i64, last_insert: i64 },
}
