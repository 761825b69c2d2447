//! Page-number resolution and page objects for post listings

use serde::Serialize;

/// Resolves a requested page number against a result-set size.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    total: u64,
    per_page: u64,
}

/// The slice of the result set a resolved page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub total: u64,
    pub number: u64,
    pub num_pages: u64,
    pub offset: u64,
    pub limit: u64,
}

impl Paginator {
    pub fn new(total: u64, per_page: u32) -> Self {
        Self {
            total,
            per_page: u64::from(per_page.max(1)),
        }
    }

    /// An empty result set still has one (empty) page.
    pub fn num_pages(&self) -> u64 {
        if self.total == 0 {
            1
        } else {
            self.total.div_ceil(self.per_page)
        }
    }

    /// Missing or non-numeric input gives page 1; numbers out of range give
    /// the last page.
    pub fn window(&self, requested: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages();
        let number = match requested.map(str::trim).map(str::parse::<i64>) {
            None | Some(Err(_)) => 1,
            Some(Ok(n)) if n < 1 || n as u64 > num_pages => num_pages,
            Some(Ok(n)) => n as u64,
        };

        let offset = (number - 1) * self.per_page;
        let limit = self.per_page.min(self.total.saturating_sub(offset));

        PageWindow {
            total: self.total,
            number,
            num_pages,
            offset,
            limit,
        }
    }
}

/// A bounded slice of an ordered result set, ready for a template.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Size of the whole result set, not of this page.
    pub count: u64,
    pub number: u64,
    pub num_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<u64>,
    pub next_page_number: Option<u64>,
    pub page_range: Vec<PageLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageLink {
    pub number: u64,
    pub current: bool,
}

impl<T> Page<T> {
    pub fn new(window: PageWindow, items: Vec<T>) -> Self {
        let has_previous = window.number > 1;
        let has_next = window.number < window.num_pages;

        Self {
            items,
            count: window.total,
            number: window.number,
            num_pages: window.num_pages,
            has_previous,
            has_next,
            previous_page_number: has_previous.then(|| window.number - 1),
            next_page_number: has_next.then(|| window.number + 1),
            page_range: (1..=window.num_pages)
                .map(|number| PageLink {
                    number,
                    current: number == window.number,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_and_last_page_sizes() {
        let paginator = Paginator::new(13, 10);

        let first = paginator.window(None);
        assert_eq!(first.number, 1);
        assert_eq!(first.offset, 0);
        assert_eq!(first.limit, 10);

        let last = paginator.window(Some("2"));
        assert_eq!(last.number, 2);
        assert_eq!(last.offset, 10);
        assert_eq!(last.limit, 3);
        assert_eq!(last.num_pages, 2);
    }

    #[test]
    fn test_invalid_page_numbers() {
        let paginator = Paginator::new(25, 10);

        assert_eq!(paginator.window(Some("abc")).number, 1);
        assert_eq!(paginator.window(Some("")).number, 1);
        assert_eq!(paginator.window(Some("99")).number, 3);
        assert_eq!(paginator.window(Some("0")).number, 3);
        assert_eq!(paginator.window(Some("-4")).number, 3);
        assert_eq!(paginator.window(Some("99")).limit, 5);
    }

    #[test]
    fn test_empty_result_has_single_page() {
        let paginator = Paginator::new(0, 10);
        let window = paginator.window(Some("5"));

        assert_eq!(window.num_pages, 1);
        assert_eq!(window.number, 1);
        assert_eq!(window.limit, 0);

        let page: Page<i32> = Page::new(window, Vec::new());
        assert!(page.is_empty());
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn test_page_navigation_fields() {
        let paginator = Paginator::new(30, 10);
        let page = Page::new(paginator.window(Some("2")), vec![1, 2, 3]);

        assert_eq!(page.previous_page_number, Some(1));
        assert_eq!(page.next_page_number, Some(3));
        assert_eq!(page.page_range.len(), 3);
        assert!(page.page_range[1].current);
        assert_eq!(page.len(), 3);
        assert_eq!(page.count, 30);
    }
}
