//! Splits the published posts into index pages.

/// One page of a sequence of items. Pages are numbered from 1.
#[derive(Debug)]
pub struct Pagination<'a, T> {
    items: &'a [T],
    pub page: usize,
    pub per_page: usize,
}

impl<'a, T> Pagination<'a, T> {
    /// Creates page `page` of `items`. `per_page` must be at least 1.
    pub fn new(items: &'a [T], page: usize, per_page: usize) -> Pagination<'a, T> {
        Pagination {
            items,
            page,
            per_page,
        }
    }

    /// The number of pages. An empty sequence still has one (empty) page so
    /// the index always renders.
    pub fn total_pages(&self) -> usize {
        let total = match self.items.len() % self.per_page {
            0 => self.items.len() / self.per_page,
            _ => self.items.len() / self.per_page + 1,
        };
        total.max(1)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Whether `page` is one of the pages. Out-of-range pages are 404s.
    pub fn exists(&self) -> bool {
        self.page >= 1 && self.page <= self.total_pages()
    }

    /// The items on this page; empty for out-of-range pages.
    pub fn items(&self) -> &'a [T] {
        let start = self.page.saturating_sub(1).saturating_mul(self.per_page);
        if start >= self.items.len() {
            return &[];
        }
        let end = (start + self.per_page).min(self.items.len());
        &self.items[start..end]
    }
}
