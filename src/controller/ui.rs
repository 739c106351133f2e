use chrono::{DateTime, TimeDelta, Utc};

use crate::surface::Surface;
use crate::types::RowId;

// ---------------------------------------------------------------------------
// Row highlight and menus
// ---------------------------------------------------------------------------

/// Mirrors the focused row and the open row menu onto the surface.
#[derive(Debug, Clone, Default)]
pub struct RowUiSync {
    active: Option<RowId>,
    open_menu: Option<RowId>,
}

impl RowUiSync {
    pub fn active(&self) -> Option<RowId> {
        self.active
    }

    pub fn open_menu(&self) -> Option<RowId> {
        self.open_menu
    }

    /// Make `focused` the only highlighted row.
    ///
    /// A newly focused row is scrolled into view only if it is not already
    /// fully visible.
    pub fn sync_active<S: Surface + ?Sized>(&mut self, surface: &mut S, focused: Option<RowId>) {
        if self.active == focused {
            return;
        }
        if let Some(prev) = self.active.take() {
            surface.set_row_active(prev, false);
        }
        if let Some(id) = focused {
            surface.set_row_active(id, true);
            if !surface.is_row_fully_visible(id) {
                surface.scroll_row_into_view(id);
            }
        }
        self.active = focused;
    }

    /// Re-apply the highlight, for a focused row that only just arrived in
    /// the list.
    pub fn refresh<S: Surface + ?Sized>(&self, surface: &mut S) {
        if let Some(id) = self.active {
            surface.set_row_active(id, true);
        }
    }

    /// Open the menu for `id`, closing any other; a second toggle closes it.
    pub fn toggle_menu<S: Surface + ?Sized>(&mut self, surface: &mut S, id: RowId) {
        let reopen = self.open_menu != Some(id);
        self.close_menus(surface);
        if reopen {
            surface.set_row_menu_open(id, true);
            self.open_menu = Some(id);
        }
    }

    pub fn close_menus<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        if let Some(id) = self.open_menu.take() {
            surface.set_row_menu_open(id, false);
        }
    }

    /// Drop any reference to a row that left the list.
    pub fn forget_row(&mut self, id: RowId) {
        if self.active == Some(id) {
            self.active = None;
        }
        if self.open_menu == Some(id) {
            self.open_menu = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Toasts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// Fire-and-forget notifications that dismiss themselves after a fixed time.
#[derive(Debug, Clone)]
pub struct Toasts {
    duration: TimeDelta,
    next_id: u64,
    live: Vec<Toast>,
}

impl Toasts {
    pub fn new(duration: TimeDelta) -> Self {
        Self {
            duration,
            next_id: 1,
            live: Vec::new(),
        }
    }

    pub fn live(&self) -> &[Toast] {
        &self.live
    }

    pub fn show<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        kind: ToastKind,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> u64 {
        let toast = Toast {
            id: self.next_id,
            kind,
            message: message.into(),
            expires_at: now + self.duration,
        };
        self.next_id += 1;
        surface.show_toast(&toast);
        let id = toast.id;
        self.live.push(toast);
        id
    }

    /// Dismiss every toast whose time is up. Returns how many went.
    pub fn tick<S: Surface + ?Sized>(&mut self, surface: &mut S, now: DateTime<Utc>) -> usize {
        let before = self.live.len();
        self.live.retain(|t| {
            if t.expires_at <= now {
                surface.dismiss_toast(t.id);
                false
            } else {
                true
            }
        });
        before - self.live.len()
    }
}
