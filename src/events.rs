use crate::controller::history::HistoryState;
use crate::error::Rejected;
use crate::types::{Direction, FormFields, PanelMode, RowId};

// ---------------------------------------------------------------------------
// Inbound interactions
// ---------------------------------------------------------------------------

/// A per-row action picked from the row's action menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Open,
    Edit,
    Delete,
    ToggleMenu,
}

/// Everything the host page can report to the controller.
///
/// The host translates its raw input (clicks, keys, `popstate`, the scroll
/// sentinel) into these and hands them to `PanelController::dispatch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    RowClicked(RowId),
    NavRequested(Direction),
    ActionInvoked { action: RowAction, id: RowId },
    CreateRequested,
    CloseRequested,
    FormSubmitted(FormFields),
    /// Canonical key string, e.g. `"esc"` or `"j"`.
    KeyPressed(String),
    SentinelVisible,
    OutsideClicked,
    HistoryPopped(HistoryState),
}

// ---------------------------------------------------------------------------
// Outbound notifications
// ---------------------------------------------------------------------------

/// What subscribers observe, in the order it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    /// An interaction as received, before it is handled.
    Interaction(Interaction),
    StateChanged { mode: PanelMode, loading: bool },
    RowsChanged { count: usize },
    Rejected(Rejected),
    /// A reply arrived for a panel state the user already left.
    StaleDropped(PanelMode),
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// Minimal synchronous event emitter. Listeners run in subscription order.
pub struct Emitter<E> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<E>)>,
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl<E> std::fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> Emitter<E> {
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
