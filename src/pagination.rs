//! Fixed-size pages over an ordered sequence.
//!
//! Page numbers are 1-based. A missing or unparsable page number selects the first page and
//! a number past the end selects the last one, so every request gets a page.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    /// Length of the whole sequence, not of this page.
    pub count: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            object_list: self.object_list.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
        }
    }
}

/// Parses the `page` query value. Anything that is not a positive integer is page 1.
pub fn parse_page_number(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|number| *number > 0)
        .unwrap_or(1)
}

/// The page `paginate` would actually serve for `page_number` over `count` items.
pub fn resolve_page_number(page_number: usize, count: usize, page_size: usize) -> usize {
    let num_pages = count.div_ceil(page_size.max(1)).max(1);
    page_number.clamp(1, num_pages)
}

/// Returns the slice `[(page_number - 1) * page_size, page_number * page_size)` of `items`,
/// with `page_number` clamped into `1..=num_pages`. An empty sequence has a single empty page.
pub fn paginate<T>(items: Vec<T>, page_number: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let count = items.len();
    let num_pages = count.div_ceil(page_size).max(1);
    let number = resolve_page_number(page_number, count, page_size);

    let object_list = items
        .into_iter()
        .skip((number - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        object_list,
        number,
        num_pages,
        count,
    }
}
