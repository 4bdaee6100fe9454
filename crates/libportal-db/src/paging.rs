use itertools::Itertools;

/// Upper bound on requested page numbers; keeps offsets and pager links in range.
pub const MAX_PAGE: i64 = i32::MAX as i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub per_page: i64,
}

impl Page {
    /// Missing or non-positive page numbers select the first page.
    pub fn new(requested: Option<i64>, per_page: i64) -> Self {
        Self {
            number: requested.filter(|n| *n > 0).unwrap_or(1).min(MAX_PAGE),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1).saturating_mul(self.per_page)
    }
}

pub fn total_pages(total_items: i64, per_page: i64) -> i64 {
    if total_items <= 0 {
        return 0;
    }
    let per_page = per_page.max(1);
    (total_items + per_page - 1) / per_page
}

#[derive(Clone, Debug)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: Page,
    pub total_items: i64,
}

impl<T> Paged<T> {
    pub fn total_pages(&self) -> i64 {
        total_pages(self.total_items, self.page.per_page)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            total_items: self.total_items,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.page.number < self.total_pages()
    }

    /// Page numbers around the current one, at most `radius` on each side.
    pub fn window(&self, radius: i64) -> Vec<i64> {
        let last = self.total_pages();
        let first = (self.page.number - radius).max(1);
        let end = (self.page.number + radius).min(last);
        (first..=end).collect_vec()
    }
}
