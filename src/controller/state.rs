use crate::error::Rejected;
use crate::types::{PanelMode, RowId};

/// Where a transition request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Click, key, row menu, or a follow-up of one (submit success).
    User,
    /// Browser back/forward replay.
    History,
    /// First-paint rehydration from the page.
    Initial,
}

/// The single panel request currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOp {
    Open { target: PanelMode, origin: Origin },
    Submit { fingerprint: PanelMode },
    Delete { id: RowId },
}

/// Panel mode plus the panel loading flag.
///
/// Loading is mutual exclusion, not a queue: while a request is pending every
/// other panel operation is rejected with [`Rejected::Busy`]. `close` is the
/// one transition allowed mid-load; the pending reply is then recognised as
/// stale because its fingerprint no longer equals the mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    mode: PanelMode,
    pending: Option<PendingOp>,
    /// The last load of `mode` failed; reopening it fetches again.
    failed: bool,
}

impl PanelState {
    pub fn new(mode: PanelMode) -> Self {
        Self {
            mode,
            pending: None,
            failed: false,
        }
    }

    pub fn mode(&self) -> PanelMode {
        self.mode
    }

    pub fn focused_id(&self) -> Option<RowId> {
        self.mode.focused_id()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<PendingOp> {
        self.pending
    }

    /// Whether the panel shows an inline load error.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Whether a reply issued for `fingerprint` still applies.
    pub fn is_current(&self, fingerprint: PanelMode) -> bool {
        self.mode == fingerprint
    }

    /// Enter `target` and mark the panel loading.
    ///
    /// Returns `Ok(false)` when the panel already shows `target`; nothing
    /// changes and no request should be sent. A target whose last load failed
    /// is fetched again.
    pub(crate) fn begin_open(
        &mut self,
        target: PanelMode,
        origin: Origin,
    ) -> Result<bool, Rejected> {
        if self.pending.is_some() {
            return Err(Rejected::Busy);
        }
        if !target.is_open() {
            return Err(Rejected::NotOpen);
        }
        if self.mode == target && !self.failed {
            return Ok(false);
        }
        self.mode = target;
        self.failed = false;
        self.pending = Some(PendingOp::Open { target, origin });
        Ok(true)
    }

    /// Mark a submit of the open form in flight. Returns the form's row id.
    pub(crate) fn begin_submit(&mut self) -> Result<Option<RowId>, Rejected> {
        if self.pending.is_some() {
            return Err(Rejected::Busy);
        }
        let PanelMode::Form(id) = self.mode else {
            return Err(Rejected::NoForm);
        };
        self.pending = Some(PendingOp::Submit {
            fingerprint: self.mode,
        });
        Ok(id)
    }

    pub(crate) fn begin_delete(&mut self, id: RowId) -> Result<(), Rejected> {
        if self.pending.is_some() {
            return Err(Rejected::Busy);
        }
        self.pending = Some(PendingOp::Delete { id });
        Ok(())
    }

    /// Close the panel. Returns `false` if it was already closed.
    ///
    /// The pending request, if any, keeps the loading flag until it answers.
    pub(crate) fn close(&mut self) -> bool {
        if !self.mode.is_open() {
            return false;
        }
        self.mode = PanelMode::Closed;
        self.failed = false;
        true
    }

    /// The load of the current mode failed and its error is on screen.
    pub(crate) fn mark_failed(&mut self) {
        self.failed = true;
    }

    /// Release the loading flag, returning what was pending.
    pub(crate) fn finish(&mut self) -> Option<PendingOp> {
        self.pending.take()
    }
}
