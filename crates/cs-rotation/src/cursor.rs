//! History cursor: round-robin reruns over the full approved list.

use std::collections::HashSet;

use cs_core::ContentItem;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HistoryCursor {
    position: usize,
}

impl HistoryCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Picks the next rerun candidate.
    ///
    /// Scans forward from the cursor, wrapping, over at most `approved.len()`
    /// candidates and returns the first one not currently displayed. When the
    /// pool fits in the bank (`len <= capacity`) the first candidate is taken
    /// even if displayed, so a small pool keeps refreshing. The cursor moves
    /// past every candidate examined. `None` only for an empty list.
    pub fn next_rerun<'a>(
        &mut self,
        approved: &'a [ContentItem],
        displayed: &HashSet<&str>,
        capacity: usize,
    ) -> Option<&'a ContentItem> {
        let len = approved.len();
        if len == 0 {
            return None;
        }
        let accept_displayed = len <= capacity;
        // The list may have shrunk since the last call.
        let mut idx = self.position % len;

        for _ in 0..len {
            let candidate = &approved[idx];
            idx = (idx + 1) % len;
            if accept_displayed || !displayed.contains(candidate.id.as_str()) {
                self.position = idx;
                return Some(candidate);
            }
        }
        self.position = idx;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pool(ids: &[&str]) -> Vec<ContentItem> {
        let now = Utc::now();
        ids.iter().map(|id| ContentItem::image(*id, "u", now)).collect()
    }

    #[test]
    fn skips_displayed_when_pool_exceeds_capacity() {
        let items = pool(&["a", "b", "c", "d"]);
        let displayed: HashSet<&str> = ["a", "b"].into_iter().collect();
        let mut cursor = HistoryCursor::new();

        assert_eq!(cursor.next_rerun(&items, &displayed, 3).map(|i| i.id.as_str()), Some("c"));
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.next_rerun(&items, &displayed, 3).map(|i| i.id.as_str()), Some("d"));
        // wraps past a and b
        assert_eq!(cursor.next_rerun(&items, &displayed, 3).map(|i| i.id.as_str()), Some("c"));
    }

    #[test]
    fn small_pool_accepts_displayed_candidates() {
        let items = pool(&["a", "b"]);
        let displayed: HashSet<&str> = ["a", "b"].into_iter().collect();
        let mut cursor = HistoryCursor::new();

        assert_eq!(cursor.next_rerun(&items, &displayed, 3).map(|i| i.id.as_str()), Some("a"));
        assert_eq!(cursor.next_rerun(&items, &displayed, 3).map(|i| i.id.as_str()), Some("b"));
        assert_eq!(cursor.next_rerun(&items, &displayed, 3).map(|i| i.id.as_str()), Some("a"));
    }

    #[test]
    fn empty_pool_yields_nothing_and_shrunk_pool_is_clamped() {
        let mut cursor = HistoryCursor::new();
        assert!(cursor.next_rerun(&[], &HashSet::new(), 3).is_none());

        let items = pool(&["a", "b", "c", "d", "e"]);
        cursor.position = 4;
        let shrunk = &items[..2];
        assert_eq!(cursor.next_rerun(shrunk, &HashSet::new(), 1).map(|i| i.id.as_str()), Some("a"));
    }
}
