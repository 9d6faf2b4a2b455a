pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Pagination request, pages are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    page: u32,
    page_size: u32,
    count: bool,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            count: true,
        }
    }
}

impl Page {
    /// Page number values lower than 1 are treated as the first page.
    pub fn of(page: i64, page_size: u32, count: bool) -> Self {
        Self {
            page: page.clamp(1, u32::MAX as i64) as u32,
            page_size,
            count,
        }
    }

    /// Page `page` of [`DEFAULT_PAGE_SIZE`] rows, counting the total.
    pub fn create(page: i64) -> Self {
        Self::of(page, DEFAULT_PAGE_SIZE, true)
    }

    /// The first `rows` rows, without counting.
    pub fn limit(rows: u32) -> Self {
        Self::of(1, rows, false)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn count(&self) -> bool {
        self.count
    }

    pub fn with_count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    pub fn is_paginated(&self) -> bool {
        self.page > 0 && self.page_size > 0
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> u64 {
        (self.page.max(1) as u64 - 1) * self.page_size as u64
    }
}

/// Rows of one query together with the paging information.
///
/// `record_count` is 0 when the total was not counted.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultSet<T> {
    pub rows: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub page_count: u64,
    pub record_count: u64,
}

impl<T> Default for ResultSet<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            page_number: 0,
            page_size: 0,
            page_count: 0,
            record_count: 0,
        }
    }
}

impl<T> ResultSet<T> {
    /// Unpaginated result.
    pub fn of(rows: Vec<T>) -> Self {
        let record_count = rows.len() as u64;
        Self {
            rows,
            record_count,
            ..Default::default()
        }
    }

    pub fn paged(rows: Vec<T>, page: &Page, record_count: u64) -> Self {
        let page_count = if page.is_paginated() && record_count > 0 {
            record_count.div_ceil(page.page_size() as u64)
        } else {
            0
        };
        Self {
            rows,
            page_number: page.page(),
            page_size: page.page_size(),
            page_count,
            record_count,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ResultSet<U> {
        ResultSet {
            rows: self.rows.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            page_count: self.page_count,
            record_count: self.record_count,
        }
    }
}

impl<T> IntoIterator for ResultSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps() {
        assert_eq!(Page::of(0, 10, true).page(), 1);
        assert_eq!(Page::of(-4, 10, true).offset(), 0);
        assert_eq!(Page::of(3, 10, true).offset(), 20);
        let page = Page::default();
        assert_eq!((page.page(), page.page_size(), page.count()), (1, 20, true));
        let limit = Page::limit(5);
        assert!(!limit.count());
        assert!(limit.is_paginated());
        assert!(!Page::of(1, 0, true).is_paginated());
    }

    #[test]
    fn page_count() {
        let page = Page::of(2, 10, true);
        assert_eq!(ResultSet::paged(vec![(); 10], &page, 25).page_count, 3);
        assert_eq!(ResultSet::paged(vec![(); 10], &page, 20).page_count, 2);
        assert_eq!(ResultSet::<()>::paged(vec![], &page, 0).page_count, 0);
        let unpaged = Page::of(1, 0, true);
        assert_eq!(ResultSet::<()>::paged(vec![], &unpaged, 12).page_count, 0);
    }
}
