//! Pagination primitives shared by both collaborators.

/// Request for one page of results.
///
/// The cursor is adapter-defined (an offset for the tracker, a page number
/// for the code host); `None` asks for the first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum number of items to return.
    pub size: u32,
    /// Cursor returned by the previous page.
    pub cursor: Option<u32>,
}

impl PageRequest {
    /// Requests the first page.
    #[must_use]
    pub const fn first(size: u32) -> Self {
        Self { size, cursor: None }
    }

    /// Requests the page at `cursor`.
    #[must_use]
    pub const fn at(size: u32, cursor: u32) -> Self {
        Self {
            size,
            cursor: Some(cursor),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Cursor of the following page, `None` when this is the last one.
    pub next: Option<u32>,
}

impl<T> Page<T> {
    /// Creates a page.
    #[must_use]
    pub const fn new(items: Vec<T>, next: Option<u32>) -> Self {
        Self { items, next }
    }

    /// Creates a final page.
    #[must_use]
    pub const fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}
