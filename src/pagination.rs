//! Offset-based pagination for the inline list views.
//!
//! Every browsable list (trips, stops, notes) is cut into fixed-size
//! pages; the prev/next offsets are baked into the pagination buttons
//! so a page re-render only needs the ordered collection and the
//! offset carried by the pressed button.

pub const PAGE_SIZE: usize = 5;

#[derive(Debug, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// Offset for the "previous page" button, if there is one.
    pub prev: Option<usize>,
    /// Offset for the "next page" button, if there is one.
    pub next: Option<usize>,
    /// 1-based page number for display.
    pub page: usize,
    /// Total page count; at least 1 even for an empty list.
    pub pages: usize,
}

pub fn paginate<T>(items: &[T], offset: usize) -> Page<'_, T> {
    let len = items.len();
    let start = offset.min(len);
    let end = (offset + PAGE_SIZE).min(len);
    let next = if offset + PAGE_SIZE < len {
        Some(offset + PAGE_SIZE)
    } else {
        None
    };
    Page {
        items: &items[start..end],
        prev: offset.checked_sub(PAGE_SIZE),
        next,
        page: offset / PAGE_SIZE + 1,
        pages: len.div_ceil(PAGE_SIZE).max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_is_one_empty_page() {
        let items: Vec<i32> = vec![];
        let page = paginate(&items, 0);
        assert!(page.items.is_empty());
        assert_eq!(page.prev, None);
        assert_eq!(page.next, None);
        assert_eq!(page.page, 1);
        assert_eq!(page.pages, 1);
    }

    #[test]
    fn exact_page_boundary_has_no_next() {
        let items: Vec<i32> = (0..10).collect();
        let page = paginate(&items, 5);
        assert_eq!(page.items, &[5, 6, 7, 8, 9]);
        assert_eq!(page.prev, Some(0));
        assert_eq!(page.next, None);
        assert_eq!(page.page, 2);
        assert_eq!(page.pages, 2);
    }

    #[test]
    fn partial_last_page() {
        let items: Vec<i32> = (0..7).collect();
        let page = paginate(&items, 5);
        assert_eq!(page.items, &[5, 6]);
        assert_eq!(page.prev, Some(0));
        assert_eq!(page.next, None);
        assert_eq!(page.pages, 2);
    }

    #[test]
    fn offset_past_end_yields_empty_slice() {
        let items: Vec<i32> = (0..3).collect();
        let page = paginate(&items, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.prev, Some(5));
        assert_eq!(page.next, None);
    }

    /// Walking "next" from offset 0 visits max(ceil(L/5), 1) pages and
    /// concatenating the visited slices reproduces the list exactly.
    #[test]
    fn traversal_reproduces_list() {
        for len in [0usize, 1, 4, 5, 6, 10, 11, 23] {
            let items: Vec<usize> = (0..len).collect();
            let mut seen = Vec::new();
            let mut offset = 0;
            let mut visited = 0;
            loop {
                let page = paginate(&items, offset);
                seen.extend_from_slice(page.items);
                visited += 1;
                match page.next {
                    Some(next) => offset = next,
                    None => break,
                }
            }
            assert_eq!(visited, len.div_ceil(PAGE_SIZE).max(1), "len={}", len);
            assert_eq!(seen, items, "len={}", len);
        }
    }
}
