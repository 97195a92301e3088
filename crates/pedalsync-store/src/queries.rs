//! Query builder for sessions.
//!
//! # Example
//!
//! ```
//! use pedalsync_store::{SessionQuery, Store};
//! use time::{Duration, OffsetDateTime};
//!
//! let store = Store::open_in_memory()?;
//! let last_week = OffsetDateTime::now_utc() - Duration::days(7);
//!
//! let query = SessionQuery::new()
//!     .user("rider")
//!     .since(last_week)
//!     .with_distance()
//!     .limit(20);
//!
//! let sessions = store.query_sessions(&query)?;
//! assert!(sessions.is_empty());
//! # Ok::<(), pedalsync_store::Error>(())
//! ```

use time::OffsetDateTime;

/// Fluent query builder for sessions.
///
/// By default, queries return finalized sessions of every user ordered by
/// `started_at` descending (newest first).
#[derive(Debug, Clone)]
pub struct SessionQuery {
    /// Filter by user ID.
    pub user_id: Option<String>,
    /// Sessions started at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Sessions started at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Only finalized sessions.
    pub finalized_only: bool,
    /// Only sessions with `distance > 0`.
    pub with_distance: bool,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by started_at descending.
    pub newest_first: bool,
}

impl Default for SessionQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionQuery {
    /// Create a new query with default settings.
    pub fn new() -> Self {
        Self {
            user_id: None,
            since: None,
            until: None,
            finalized_only: true,
            with_distance: false,
            limit: None,
            offset: None,
            newest_first: true,
        }
    }

    /// Filter by user ID.
    pub fn user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    /// Filter to sessions started at or after this time.
    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Filter to sessions started at or before this time.
    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    /// Include sessions that are still in progress.
    pub fn include_active(mut self) -> Self {
        self.finalized_only = false;
        self
    }

    /// Skip sessions that never covered any distance.
    pub fn with_distance(mut self) -> Self {
        self.with_distance = true;
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results by oldest first.
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref user_id) = self.user_id {
            conditions.push("user_id = ?");
            params.push(Box::new(user_id.clone()));
        }

        if let Some(since) = self.since {
            conditions.push("started_at >= ?");
            params.push(Box::new(since.unix_timestamp()));
        }

        if let Some(until) = self.until {
            conditions.push("started_at <= ?");
            params.push(Box::new(until.unix_timestamp()));
        }

        if self.finalized_only {
            conditions.push("finalized = 1");
        }

        if self.with_distance {
            conditions.push("distance > 0");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT {} FROM sessions {} ORDER BY started_at {}",
            crate::store::SESSION_COLUMNS,
            where_clause,
            order
        );

        // SQLite needs a LIMIT before an OFFSET.
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        sql
    }
}
