//! Keyset pagination primitives shared by voucher backend endpoints.
//!
//! Endpoints page through rows ordered by a stable composite key and hand
//! the identifier of the last row back to the client as the next cursor.
//! This crate owns the pieces that are independent of the row type:
//!
//! - [`PageLimit`] validates the requested page size against bounds.
//! - [`Page`] is the serialised envelope (`items` plus `nextCursor`).
//! - [`Page::from_overfetch`] implements the "fetch one extra row" trick to
//!   decide whether another page exists without a count query.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of rows returned when the client omits `limit`.
pub const DEFAULT_PAGE_LIMIT: u16 = 20;

/// Largest page size accepted from clients.
pub const MAX_PAGE_LIMIT: u16 = 50;

/// Validation failures for page limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageLimitError {
    /// Limit fell below one.
    #[error("limit must be at least 1")]
    TooSmall,
    /// Limit exceeded the configured ceiling.
    #[error("limit must be at most {max}")]
    TooLarge {
        /// Ceiling that was exceeded.
        max: u16,
    },
}

/// Validated page size.
///
/// # Examples
/// ```
/// use pagination::{PageLimit, DEFAULT_PAGE_LIMIT};
///
/// assert_eq!(PageLimit::from_query(None).unwrap().get(), DEFAULT_PAGE_LIMIT);
/// assert!(PageLimit::from_query(Some(0)).is_err());
/// assert!(PageLimit::from_query(Some(51)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PageLimit(u16);

impl PageLimit {
    /// Validate `value` against `1..=max`.
    ///
    /// # Errors
    /// Returns [`PageLimitError`] when the value is outside the range.
    pub const fn bounded(value: u32, max: u16) -> Result<Self, PageLimitError> {
        if value == 0 {
            return Err(PageLimitError::TooSmall);
        }
        if value > max as u32 {
            return Err(PageLimitError::TooLarge { max });
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "value is bounded by a u16 maximum above"
        )]
        let narrowed = value as u16;
        Ok(Self(narrowed))
    }

    /// Resolve an optional query value using the default and maximum limits.
    ///
    /// # Errors
    /// Returns [`PageLimitError`] when a supplied value is out of range.
    pub const fn from_query(value: Option<u32>) -> Result<Self, PageLimitError> {
        match value {
            Some(value) => Self::bounded(value, MAX_PAGE_LIMIT),
            None => Ok(Self(DEFAULT_PAGE_LIMIT)),
        }
    }

    /// Page size as an integer.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Number of rows to request from storage to detect a following page.
    #[must_use]
    pub const fn overfetch(self) -> i64 {
        self.0 as i64 + 1
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        Self(DEFAULT_PAGE_LIMIT)
    }
}

/// One page of results plus the cursor for the next page, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T, C> {
    /// Rows on this page, in presentation order.
    pub items: Vec<T>,
    /// Cursor to pass back for the next page; absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<C>,
}

impl<T, C> Page<T, C> {
    /// A page with no rows and no continuation.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    /// Build a page from rows fetched with [`PageLimit::overfetch`].
    ///
    /// When more rows than `limit` were returned the surplus is dropped and
    /// the cursor of the last kept row becomes `next_cursor`.
    pub fn from_overfetch(
        mut rows: Vec<T>,
        limit: PageLimit,
        cursor_of: impl Fn(&T) -> C,
    ) -> Self {
        let limit = usize::from(limit.get());
        if rows.len() <= limit {
            return Self {
                items: rows,
                next_cursor: None,
            };
        }
        rows.truncate(limit);
        let next_cursor = rows.last().map(cursor_of);
        Self {
            items: rows,
            next_cursor,
        }
    }

    /// Transform every item while keeping the cursor.
    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> Page<U, C> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}
