//! Fixed-size page slicing for listings.

use std::num::IntErrorKind;

use serde::Serialize;

/// Number of posts on every listing page.
pub const POSTS_PER_PAGE: u64 = 10;

/// One page of a listing plus navigation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served.
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }
}

/// Resolves raw page requests against a collection size.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(POSTS_PER_PAGE)
    }
}

impl Paginator {
    pub fn new(per_page: u64) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Number of pages for `total` items. An empty collection still has one page.
    pub fn num_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.per_page).max(1)
    }

    /// Turn the raw `page` query value into a valid page number.
    ///
    /// Missing or non-numeric values select the first page; out-of-range
    /// numbers clamp to the first or last page, however large they are.
    pub fn resolve(&self, raw: Option<&str>, total: u64) -> u64 {
        let last = self.num_pages(total);
        let Some(raw) = raw else {
            return 1;
        };
        match raw.trim().parse::<i64>() {
            Ok(n) if n < 1 => 1,
            Ok(n) => (n as u64).min(last),
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => last,
            Err(_) => 1,
        }
    }

    /// Offset of the first item on page `number`.
    pub fn offset(&self, number: u64) -> u64 {
        (number - 1) * self.per_page
    }

    pub fn page<T>(&self, items: Vec<T>, number: u64, total: u64) -> Page<T> {
        Page {
            items,
            number,
            num_pages: self.num_pages(total),
            total,
        }
    }
}
