//! Fixed-size pagination of ranked lists
//!
//! Pages are 1-based. A page past the end (or page 0) is an empty slice,
//! never an error.

use std::num::NonZeroUsize;

/// Slice `items` to page `page` of size `size`
///
/// Returns `items[(page - 1) * size .. min(page * size, len)]`, or an empty
/// slice when the page is out of range.
pub fn paginate<T>(items: &[T], page: usize, size: NonZeroUsize) -> &[T] {
    let size = size.get();
    let Some(start) = page.checked_sub(1).and_then(|p| p.checked_mul(size)) else {
        return &[];
    };
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(size).min(items.len());
    &items[start..end]
}

/// Pages of a fixed size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: NonZeroUsize,
}

impl Paginator {
    /// Create a paginator
    pub fn new(page_size: NonZeroUsize) -> Self {
        Paginator { page_size }
    }

    /// Results per page
    pub fn page_size(&self) -> usize {
        self.page_size.get()
    }

    /// One page of `items`
    pub fn page<'a, T>(&self, items: &'a [T], page: usize) -> &'a [T] {
        paginate(items, page, self.page_size)
    }

    /// Number of pages needed for `len` items
    pub fn page_count(&self, len: usize) -> usize {
        let size = self.page_size.get();
        len / size + usize::from(len % size != 0)
    }
}
