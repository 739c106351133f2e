use serde::{Deserialize, Serialize};

use crate::types::{ModeKind, PanelMode, RowId};
use crate::url::canonical_url;

use super::state::Origin;

/// Payload stored with each history entry.
///
/// Kept split as `{focused_id, mode}` so a pop restores state in one read,
/// without re-parsing the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    pub focused_id: Option<RowId>,
    pub mode: ModeKind,
}

impl HistoryState {
    pub fn from_mode(mode: PanelMode) -> Self {
        Self {
            focused_id: mode.focused_id(),
            mode: mode.kind(),
        }
    }

    /// `None` for a payload that names no valid mode (detail without an id).
    pub fn to_mode(self) -> Option<PanelMode> {
        PanelMode::from_parts(self.mode, self.focused_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub url: String,
    pub state: HistoryState,
}

/// The host's session history stack.
pub trait History {
    fn push(&mut self, entry: HistoryEntry);
    fn replace(&mut self, entry: HistoryEntry);
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Maps panel modes to canonical URLs and records them in history.
#[derive(Debug, Clone)]
pub struct HistoryBridge {
    base: String,
    /// Mode of the entry the history stack currently points at.
    shown: Option<PanelMode>,
}

impl HistoryBridge {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            shown: None,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn shown(&self) -> Option<PanelMode> {
        self.shown
    }

    pub fn entry(&self, mode: PanelMode) -> HistoryEntry {
        HistoryEntry {
            url: canonical_url(&self.base, mode),
            state: HistoryState::from_mode(mode),
        }
    }

    /// The browser moved to `mode` on its own (back/forward). Whatever the
    /// panel ends up showing, the address bar now points at `mode`.
    pub fn follow(&mut self, mode: PanelMode) {
        self.shown = Some(mode);
    }

    /// Record a completed transition.
    ///
    /// User transitions push, first paint replaces the entry the page was
    /// loaded with, and replayed history leaves the stack alone so forward
    /// entries survive. A user transition back to the mode already on top of
    /// the stack (closing a panel whose load never completed) pushes nothing.
    pub fn record<H: History + ?Sized>(
        &mut self,
        history: &mut H,
        mode: PanelMode,
        origin: Origin,
    ) {
        match origin {
            Origin::User if self.shown == Some(mode) => {}
            Origin::User => history.push(self.entry(mode)),
            Origin::Initial => history.replace(self.entry(mode)),
            Origin::History => {}
        }
        self.shown = Some(mode);
    }
}

// ---------------------------------------------------------------------------
// In-memory history
// ---------------------------------------------------------------------------

/// Session history kept in memory, with browser-like back/forward.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Step back; returns the payload a `popstate` would carry.
    pub fn back(&mut self) -> Option<HistoryState> {
        if self.cursor == 0 || self.entries.is_empty() {
            return None;
        }
        self.cursor -= 1;
        self.current().map(|e| e.state)
    }

    pub fn forward(&mut self) -> Option<HistoryState> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.current().map(|e| e.state)
    }
}

impl History for MemoryHistory {
    fn push(&mut self, entry: HistoryEntry) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(entry);
        self.cursor = self.entries.len() - 1;
    }

    fn replace(&mut self, entry: HistoryEntry) {
        match self.entries.get_mut(self.cursor) {
            Some(current) => *current = entry,
            None => self.entries.push(entry),
        }
    }
}
