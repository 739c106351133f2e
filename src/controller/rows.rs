use crate::types::{Direction, RowId};

// ---------------------------------------------------------------------------
// RowIdSequence
// ---------------------------------------------------------------------------

/// Ordered ids of every row currently in the list.
///
/// Order defines prev/next adjacency. The controller rebuilds it from the
/// surface after the initial render, after each appended page and after each
/// deletion, and nowhere else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowIdSequence {
    ids: Vec<RowId>,
}

impl RowIdSequence {
    pub fn new(ids: Vec<RowId>) -> Self {
        Self { ids }
    }

    pub(crate) fn rebuild(&mut self, ids: Vec<RowId>) {
        self.ids = ids;
    }

    pub fn as_slice(&self) -> &[RowId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.ids.contains(&id)
    }

    pub fn position(&self, id: RowId) -> Option<usize> {
        self.ids.iter().position(|&x| x == id)
    }

    /// The row adjacent to `id` in `direction`. No wraparound: `None` at
    /// either end, and for an id that is not in the list.
    pub fn neighbor(&self, id: RowId, direction: Direction) -> Option<RowId> {
        let idx = self.position(id)?;
        let target = match direction {
            Direction::Prev => idx.checked_sub(1)?,
            Direction::Next => idx + 1,
        };
        self.ids.get(target).copied()
    }
}

// ---------------------------------------------------------------------------
// ScrollCursor
// ---------------------------------------------------------------------------

/// Infinite-scroll bookkeeping.
///
/// `page` is the last page loaded and only advances on success. `has_more`
/// only ever goes from true to false. `loading` is independent of the panel
/// loading flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollCursor {
    page: u32,
    has_more: bool,
    loading: bool,
}

impl Default for ScrollCursor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ScrollCursor {
    pub fn new(has_more: bool) -> Self {
        Self {
            page: 1,
            has_more,
            loading: false,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Claim the next page fetch. `None` while one is in flight or when the
    /// list is exhausted.
    pub(crate) fn begin(&mut self) -> Option<u32> {
        if self.loading || !self.has_more {
            return None;
        }
        self.loading = true;
        Some(self.page + 1)
    }

    pub(crate) fn complete(&mut self, page: u32, has_more: bool) {
        self.loading = false;
        self.page = page;
        self.has_more &= has_more;
    }

    /// Leave `page` and `has_more` alone so the next intersection retries.
    pub(crate) fn fail(&mut self) {
        self.loading = false;
    }
}
