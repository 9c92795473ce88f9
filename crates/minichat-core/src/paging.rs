use crate::types::{Cursor, Identified, Page};

/// How a fetched page is merged into a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Replace the list with page 1.
    Reset,
    /// Append the next page after the current items.
    Append,
}

/// Cursor-paginated list state: items plus the boundary needed for the next page.
#[derive(Debug, Clone)]
pub struct PagedList<T> {
    items: Vec<T>,
    cursor: Option<Cursor>,
    has_more: bool,
}

impl<T> Default for PagedList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: None,
            has_more: false,
        }
    }
}

impl<T: Identified> PagedList<T> {
    /// Items in wire order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn find(&self, id: i64) -> Option<&T> {
        self.items.iter().find(|item| item.identity() == id)
    }

    /// Drop items and boundary state.
    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = None;
        self.has_more = false;
    }

    /// Cursor to request for `mode`, or `None` when no request should be made.
    ///
    /// `Append` is only allowed while the last page reported `has_more` and carried a
    /// cursor; a stale cursor is never sent once `has_more` is false.
    pub fn request_cursor(&self, mode: LoadMode) -> Option<Option<Cursor>> {
        match mode {
            LoadMode::Reset => Some(None),
            LoadMode::Append if self.has_more => self.cursor.clone().map(Some),
            LoadMode::Append => None,
        }
    }

    /// Merge a fetched page and take over its boundary state.
    pub fn apply_page(&mut self, mode: LoadMode, page: Page<T>) {
        match mode {
            LoadMode::Reset => self.items = page.items,
            LoadMode::Append => self.items.extend(page.items),
        }
        self.cursor = page.next_cursor;
        self.has_more = page.has_more;
    }

    /// Clamp a requested page size against the server's safety cap.
    ///
    /// The result is always in `1..=100`.
    pub fn bounded_page_limit(requested: u16) -> u16 {
        requested.clamp(1, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, User};

    fn message(id: i64) -> Message {
        Message {
            id,
            conversation_id: 1,
            sender: User {
                id: 1,
                name: "Alice".into(),
            },
            body: format!("m{id}"),
            created_at: format!("2024-01-01T00:00:{id:02}Z"),
        }
    }

    fn cursor(id: i64) -> Cursor {
        Cursor {
            cursor_at: format!("2024-01-01T00:00:{id:02}Z"),
            cursor_id: id,
        }
    }

    fn page(ids: &[i64], has_more: bool) -> Page<Message> {
        Page {
            items: ids.iter().copied().map(message).collect(),
            next_cursor: ids.last().copied().map(cursor),
            has_more,
        }
    }

    #[test]
    fn reset_always_requests_the_first_page() {
        let mut list = PagedList::default();
        list.apply_page(LoadMode::Reset, page(&[9, 8], true));
        assert_eq!(list.request_cursor(LoadMode::Reset), Some(None));
    }

    #[test]
    fn append_uses_cursor_and_keeps_newest_first_order() {
        let mut list = PagedList::default();
        list.apply_page(LoadMode::Reset, page(&[9, 8, 7], true));
        assert_eq!(list.request_cursor(LoadMode::Append), Some(Some(cursor(7))));

        list.apply_page(LoadMode::Append, page(&[6, 5], false));
        let ids: Vec<i64> = list.items().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![9, 8, 7, 6, 5]);
        assert!(!list.has_more());
    }

    #[test]
    fn append_is_refused_once_has_more_is_false_even_with_cursor() {
        let mut list = PagedList::default();
        list.apply_page(LoadMode::Reset, page(&[3, 2], false));
        assert!(list.cursor().is_some());
        assert_eq!(list.request_cursor(LoadMode::Append), None);
    }

    #[test]
    fn reset_replaces_items_and_clear_drops_boundary() {
        let mut list = PagedList::default();
        list.apply_page(LoadMode::Reset, page(&[3, 2], true));
        list.apply_page(LoadMode::Append, page(&[1], false));
        list.apply_page(LoadMode::Reset, page(&[4, 3], true));
        assert_eq!(list.len(), 2);
        assert!(list.find(4).is_some());
        assert!(list.find(1).is_none());

        list.clear();
        assert!(list.is_empty());
        assert!(list.cursor().is_none());
        assert!(!list.has_more());
    }

    #[test]
    fn bounds_page_limit_for_safety() {
        assert_eq!(PagedList::<Message>::bounded_page_limit(0), 1);
        assert_eq!(PagedList::<Message>::bounded_page_limit(30), 30);
        assert_eq!(PagedList::<Message>::bounded_page_limit(150), 100);
    }
}
