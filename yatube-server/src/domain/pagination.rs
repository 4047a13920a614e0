use std::num::IntErrorKind;

/// Splits an ordered collection into fixed-size pages.
///
/// Page lookup is forgiving: a missing or malformed page number serves the
/// first page, and a number outside `1..=num_pages` serves the last one.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Paginator {
    per_page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pagination {
    pub(crate) page: u32,
    pub(crate) page_size: u32,
}

impl Pagination {
    pub(crate) fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub(crate) fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * self.limit()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Page<T> {
    pub(crate) items: Vec<T>,
    pub(crate) number: u32,
    pub(crate) num_pages: u32,
    pub(crate) per_page: u32,
    pub(crate) total: i64,
}

impl<T> Page<T> {
    pub(crate) fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub(crate) fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub(crate) fn next_page_number(&self) -> Option<u32> {
        self.has_next().then(|| self.number + 1)
    }

    pub(crate) fn previous_page_number(&self) -> Option<u32> {
        self.has_previous().then(|| self.number - 1)
    }
}

impl Paginator {
    pub(crate) fn new(per_page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    /// Always at least one page, so an empty collection still has a first page.
    pub(crate) fn num_pages(&self, total: i64) -> u32 {
        let total = u64::try_from(total).unwrap_or(0);
        let pages = total.div_ceil(u64::from(self.per_page)).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub(crate) fn locate(&self, requested: Option<&str>, total: i64) -> Pagination {
        let num_pages = self.num_pages(total);
        let page = match requested.map(|raw| raw.trim().parse::<i64>()) {
            None => 1,
            // Integers past i64 are still integers, just out of range.
            Some(Err(err))
                if matches!(
                    err.kind(),
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow
                ) =>
            {
                num_pages
            }
            Some(Err(_)) => 1,
            Some(Ok(number)) if number < 1 || number > i64::from(num_pages) => num_pages,
            Some(Ok(number)) => number as u32,
        };

        Pagination {
            page,
            page_size: self.per_page,
        }
    }

    pub(crate) fn page<T>(&self, items: Vec<T>, pagination: Pagination, total: i64) -> Page<T> {
        Page {
            items,
            number: pagination.page,
            num_pages: self.num_pages(total),
            per_page: self.per_page,
            total: total.max(0),
        }
    }
}
