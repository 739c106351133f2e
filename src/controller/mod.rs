// controller module — the list/detail panel state machine
//
// `PanelController` owns the panel state, the row set, the scroll cursor and
// the UI sync helpers. Every trigger (click, key, row menu, history pop,
// scroll sentinel) funnels into the same guarded transition methods; the
// engine's replies come back on a std channel and are applied by `pump`.

pub mod history;
pub mod rows;
pub mod state;
pub mod ui;

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};

pub use history::{History, HistoryBridge, HistoryEntry, HistoryState, MemoryHistory};
pub use rows::{RowIdSequence, ScrollCursor};
pub use state::{Origin, PanelState, PendingOp};
pub use ui::{RowUiSync, Toast, ToastKind, Toasts};

use crate::config::keybindings::{MergedBindings, PanelAction, PanelContext};
use crate::config::types::{AppConfig, PanelConfig};
use crate::engine::{EngineHandle, Event, Request};
use crate::error::{GatewayError, Rejected};
use crate::events::{Emitter, Interaction, PanelEvent, RowAction, SubscriptionId};
use crate::surface::Surface;
use crate::types::{Direction, Filters, FormFields, Page, PanelMode, RowId, SubmitOutcome};

/// What an accepted call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A request went to the engine; its reply completes the transition.
    Requested,
    /// The change was applied synchronously.
    Applied,
    /// Nothing to do (already there, end of list, key not bound).
    Noop,
}

/// The parts of [`AppConfig`] the controller reads.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub panel: PanelConfig,
    pub toast_duration: TimeDelta,
    pub bindings: MergedBindings,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ControllerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        // Clamped to a day so the conversion cannot overflow.
        let millis = config.toast.duration_ms.min(86_400_000);
        Self {
            panel: config.panel.clone(),
            toast_duration: TimeDelta::milliseconds(i64::try_from(millis).unwrap_or_default()),
            bindings: MergedBindings::from_config(&config.keybindings),
        }
    }
}

pub struct PanelController<S: Surface, H: History> {
    settings: ControllerSettings,
    engine: EngineHandle,
    surface: S,
    history: H,
    bridge: HistoryBridge,
    state: PanelState,
    rows: RowIdSequence,
    cursor: ScrollCursor,
    filters: Filters,
    ui: RowUiSync,
    toasts: Toasts,
    events: Emitter<PanelEvent>,
    reply_tx: Sender<Event>,
    reply_rx: Receiver<Event>,
}

impl<S: Surface, H: History> PanelController<S, H> {
    pub fn new(engine: EngineHandle, surface: S, history: H, settings: ControllerSettings) -> Self {
        let (reply_tx, reply_rx) = std::sync::mpsc::channel::<Event>();
        Self {
            bridge: HistoryBridge::new(settings.panel.base_path.clone()),
            toasts: Toasts::new(settings.toast_duration),
            settings,
            engine,
            surface,
            history,
            state: PanelState::default(),
            rows: RowIdSequence::default(),
            cursor: ScrollCursor::default(),
            filters: Filters::new(),
            ui: RowUiSync::default(),
            events: Emitter::default(),
            reply_tx,
            reply_rx,
        }
    }

    /// Rehydrate from the page the server rendered.
    ///
    /// The first history entry is replaced rather than pushed, and an open
    /// panel embedded in the page is loaded through the ordinary guarded path.
    pub fn init(&mut self) -> Result<Outcome, Rejected> {
        let initial = self.surface.initial_state();
        tracing::debug!(
            "controller: init mode={} has_more={} filters={}",
            initial.mode,
            initial.has_more,
            initial.filters.len()
        );
        self.filters = initial.filters;
        self.cursor = ScrollCursor::new(initial.has_more);
        self.rebuild_rows();

        if initial.mode.is_open() {
            self.open(initial.mode, Origin::Initial)
        } else {
            self.bridge
                .record(&mut self.history, PanelMode::Closed, Origin::Initial);
            self.emit_state();
            Ok(Outcome::Applied)
        }
    }

    /// Drop every subscriber and stop the engine. Replies still in flight are
    /// never applied.
    pub fn teardown(&mut self) {
        tracing::debug!("controller: teardown");
        self.ui.close_menus(&mut self.surface);
        self.events.clear();
        self.engine.shutdown();
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn mode(&self) -> PanelMode {
        self.state.mode()
    }

    pub fn focused_id(&self) -> Option<RowId> {
        self.state.focused_id()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn rows(&self) -> &RowIdSequence {
        &self.rows
    }

    pub fn cursor(&self) -> &ScrollCursor {
        &self.cursor
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn toasts(&self) -> &[Toast] {
        self.toasts.live()
    }

    pub fn bindings(&self) -> &MergedBindings {
        &self.settings.bindings
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&PanelEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // Panel transitions
    // -----------------------------------------------------------------------

    pub fn open_detail(&mut self, id: RowId) -> Result<Outcome, Rejected> {
        self.open(PanelMode::Detail(id), Origin::User)
    }

    /// `None` opens a blank create form.
    pub fn open_form(&mut self, id: Option<RowId>) -> Result<Outcome, Rejected> {
        self.open(PanelMode::Form(id), Origin::User)
    }

    /// Close the panel. Allowed while loading; the pending reply is dropped
    /// as stale when it lands.
    pub fn close(&mut self) -> Result<Outcome, Rejected> {
        Ok(self.close_with(Origin::User))
    }

    /// Move to the previous or next row in the same mode. No wraparound.
    pub fn navigate(&mut self, direction: Direction) -> Result<Outcome, Rejected> {
        if self.state.is_loading() {
            return Err(self.reject(Rejected::Busy));
        }
        let mode = self.state.mode();
        if !mode.is_open() {
            return Err(self.reject(Rejected::NotOpen));
        }
        let Some(target) = mode
            .focused_id()
            .and_then(|id| self.rows.neighbor(id, direction))
        else {
            tracing::debug!("controller: navigate {direction:?} from {mode}: no neighbour");
            return Ok(Outcome::Noop);
        };
        self.open(mode.with_id(target), Origin::User)
    }

    pub fn submit_form(&mut self, fields: FormFields) -> Result<Outcome, Rejected> {
        let id = self.state.begin_submit().map_err(|r| self.reject(r))?;
        let fingerprint = self.state.mode();
        tracing::debug!("controller: submit {fingerprint} ({} fields)", fields.len());
        self.surface.set_form_controls_enabled(false);
        self.engine.send(Request::SubmitForm {
            id,
            fields,
            fingerprint,
            reply_tx: self.reply_tx.clone(),
        });
        self.emit_state();
        Ok(Outcome::Requested)
    }

    /// Ask for confirmation, then delete `id`. The prompt is shown only once
    /// the request is known to be allowed.
    pub fn delete_row(&mut self, id: RowId) -> Result<Outcome, Rejected> {
        if self.state.is_loading() {
            return Err(self.reject(Rejected::Busy));
        }
        if !self.rows.contains(id) {
            return Err(self.reject(Rejected::UnknownRow(id)));
        }
        self.ui.close_menus(&mut self.surface);
        let message = self.settings.panel.confirm_message(id);
        if !self.surface.confirm(&message) {
            return Err(self.reject(Rejected::NotConfirmed(id)));
        }
        self.state.begin_delete(id).map_err(|r| self.reject(r))?;
        tracing::debug!("controller: delete {id}");
        self.engine.send(Request::DeleteRow {
            id,
            reply_tx: self.reply_tx.clone(),
        });
        self.emit_state();
        Ok(Outcome::Requested)
    }

    /// Replay a back/forward payload through the ordinary guarded path.
    pub fn on_history_pop(&mut self, payload: HistoryState) -> Result<Outcome, Rejected> {
        let Some(target) = payload.to_mode() else {
            tracing::warn!("controller: ignoring malformed history payload {payload:?}");
            return Ok(Outcome::Noop);
        };
        self.bridge.follow(target);
        if target == self.state.mode() && !self.state.has_failed() {
            return Ok(Outcome::Noop);
        }
        let result = match target {
            PanelMode::Closed => Ok(self.close_with(Origin::History)),
            _ => self.open(target, Origin::History),
        };
        if result == Err(Rejected::Busy) {
            tracing::info!("controller: history pop to {target} dropped, panel request in flight");
        }
        result
    }

    // -----------------------------------------------------------------------
    // List and row UI
    // -----------------------------------------------------------------------

    /// The scroll sentinel came into view. Fetches the next page unless one is
    /// already loading or the list is exhausted.
    pub fn on_sentinel_visible(&mut self) -> Outcome {
        let Some(page) = self.cursor.begin() else {
            return Outcome::Noop;
        };
        tracing::debug!("controller: fetch page {page}");
        self.engine.send(Request::FetchPage {
            page,
            filters: self.filters.clone(),
            reply_tx: self.reply_tx.clone(),
        });
        Outcome::Requested
    }

    pub fn toggle_menu(&mut self, id: RowId) -> Outcome {
        if !self.rows.contains(id) {
            return Outcome::Noop;
        }
        self.ui.toggle_menu(&mut self.surface, id);
        Outcome::Applied
    }

    pub fn close_menus(&mut self) -> Outcome {
        if self.ui.open_menu().is_none() {
            return Outcome::Noop;
        }
        self.ui.close_menus(&mut self.surface);
        Outcome::Applied
    }

    /// Dismiss expired toasts.
    pub fn tick(&mut self, now: DateTime<Utc>) -> usize {
        self.toasts.tick(&mut self.surface, now)
    }

    /// Map a key string to its bound action, honouring the focus guards.
    pub fn handle_key(&mut self, key: &str) -> Result<Outcome, Rejected> {
        let mode = self.state.mode();
        let context = PanelContext::of(mode);
        let Some(action) = self.settings.bindings.resolve(key, context) else {
            return Ok(Outcome::Noop);
        };
        let typing = self.surface.text_input_focused();
        match action {
            PanelAction::Close if mode.is_open() => self.close(),
            PanelAction::NavigatePrev if context == PanelContext::Detail && !typing => {
                self.navigate(Direction::Prev)
            }
            PanelAction::NavigateNext if context == PanelContext::Detail && !typing => {
                self.navigate(Direction::Next)
            }
            PanelAction::NewRecord if !typing => self.open_form(None),
            PanelAction::EditRecord if !typing => match mode {
                PanelMode::Detail(id) => self.open_form(Some(id)),
                _ => Ok(Outcome::Noop),
            },
            _ => Ok(Outcome::Noop),
        }
    }

    /// Single entry point for host interactions. Subscribers see the
    /// interaction before it is handled.
    pub fn dispatch(&mut self, interaction: Interaction) -> Result<Outcome, Rejected> {
        self.events
            .emit(&PanelEvent::Interaction(interaction.clone()));
        match interaction {
            Interaction::RowClicked(id) => self.open_detail(id),
            Interaction::NavRequested(direction) => self.navigate(direction),
            Interaction::ActionInvoked { action, id } => match action {
                RowAction::Open => self.open_detail(id),
                RowAction::Edit => self.open_form(Some(id)),
                RowAction::Delete => self.delete_row(id),
                RowAction::ToggleMenu => Ok(self.toggle_menu(id)),
            },
            Interaction::CreateRequested => self.open_form(None),
            Interaction::CloseRequested => self.close(),
            Interaction::FormSubmitted(fields) => self.submit_form(fields),
            Interaction::KeyPressed(key) => self.handle_key(&key),
            Interaction::SentinelVisible => Ok(self.on_sentinel_visible()),
            Interaction::OutsideClicked => Ok(self.close_menus()),
            Interaction::HistoryPopped(payload) => self.on_history_pop(payload),
        }
    }

    // -----------------------------------------------------------------------
    // Engine replies
    // -----------------------------------------------------------------------

    /// Apply every reply that has already arrived. Returns how many.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.reply_rx.try_recv() {
            self.apply_event(event);
            applied += 1;
        }
        applied
    }

    /// Block until neither the panel nor the list is loading, applying replies
    /// as they arrive. Returns `false` on timeout.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if !self.state.is_loading() && !self.cursor.is_loading() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.reply_rx.recv_timeout(remaining) {
                Ok(event) => self.apply_event(event),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    pub fn apply_event(&mut self, event: Event) {
        match event {
            Event::DetailFetched {
                fingerprint,
                result,
            }
            | Event::FormFetched {
                fingerprint,
                result,
            } => self.apply_panel_content(fingerprint, result),
            Event::FormSubmitted {
                fingerprint,
                result,
            } => self.apply_submit(fingerprint, result),
            Event::RowDeleted { id, result } => self.apply_delete(id, result),
            Event::PageFetched { page, result } => self.apply_page(page, result),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn open(&mut self, target: PanelMode, origin: Origin) -> Result<Outcome, Rejected> {
        match self.state.begin_open(target, origin) {
            Err(r) => return Err(self.reject(r)),
            Ok(false) => {
                tracing::debug!("controller: already showing {target}");
                return Ok(Outcome::Noop);
            }
            Ok(true) => {}
        }
        tracing::debug!("controller: open {target} ({origin:?})");

        self.ui.close_menus(&mut self.surface);
        self.ui.sync_active(&mut self.surface, target.focused_id());
        self.surface.show_panel_loading(target);

        let reply_tx = self.reply_tx.clone();
        let request = match target {
            PanelMode::Detail(id) => Request::FetchDetail {
                id,
                fingerprint: target,
                reply_tx,
            },
            PanelMode::Form(id) => Request::FetchForm {
                id,
                fingerprint: target,
                reply_tx,
            },
            PanelMode::Closed => return Ok(Outcome::Noop),
        };
        self.engine.send(request);
        self.emit_state();
        Ok(Outcome::Requested)
    }

    fn close_with(&mut self, origin: Origin) -> Outcome {
        if !self.state.close() {
            return Outcome::Noop;
        }
        tracing::debug!(
            "controller: closed ({origin:?}){}",
            if self.state.is_loading() {
                ", pending reply will be dropped"
            } else {
                ""
            }
        );
        self.ui.close_menus(&mut self.surface);
        self.ui.sync_active(&mut self.surface, None);
        self.surface.hide_panel();
        self.bridge
            .record(&mut self.history, PanelMode::Closed, origin);
        self.emit_state();
        Outcome::Applied
    }

    fn apply_panel_content(&mut self, fingerprint: PanelMode, result: Result<String, GatewayError>) {
        let origin = match self.state.finish() {
            Some(PendingOp::Open { target, origin }) if target == fingerprint => origin,
            other => {
                tracing::warn!("controller: reply for {fingerprint} while pending {other:?}");
                Origin::User
            }
        };

        if !self.state.is_current(fingerprint) {
            self.drop_stale(fingerprint);
            return;
        }
        match result {
            Ok(html) => {
                self.surface.render_panel(fingerprint, &html);
                self.bridge.record(&mut self.history, fingerprint, origin);
            }
            Err(err) => {
                tracing::debug!("controller: {fingerprint} failed: {err}");
                self.state.mark_failed();
                self.surface.render_panel_error(&err);
            }
        }
        self.emit_state();
    }

    fn apply_submit(&mut self, fingerprint: PanelMode, result: Result<SubmitOutcome, GatewayError>) {
        self.state.finish();
        let current = self.state.is_current(fingerprint);

        match result {
            Ok(SubmitOutcome::Saved(id)) => {
                self.toasts.show(
                    &mut self.surface,
                    ToastKind::Success,
                    format!("Row {id} saved."),
                    Utc::now(),
                );
                if !current {
                    self.drop_stale(fingerprint);
                    return;
                }
                self.surface.set_form_controls_enabled(true);
                if let Err(r) = self.open(PanelMode::Detail(id), Origin::User) {
                    tracing::debug!("controller: could not show saved row {id}: {r}");
                }
                // `open` already emitted the new state.
                return;
            }
            Ok(SubmitOutcome::Invalid(errors)) => {
                if !current {
                    self.drop_stale(fingerprint);
                    return;
                }
                tracing::debug!("controller: {} field errors", errors.len());
                self.surface.render_field_errors(&errors);
                self.surface.set_form_controls_enabled(true);
            }
            Err(err) => {
                tracing::debug!("controller: submit failed: {err}");
                self.toasts
                    .show(&mut self.surface, ToastKind::Error, err.to_string(), Utc::now());
                if current {
                    self.surface.set_form_controls_enabled(true);
                }
            }
        }
        self.emit_state();
    }

    fn apply_delete(&mut self, id: RowId, result: Result<(), GatewayError>) {
        self.state.finish();
        match result {
            Ok(()) => {
                self.surface.remove_row(id);
                self.ui.forget_row(id);
                self.rebuild_rows();
                self.toasts.show(
                    &mut self.surface,
                    ToastKind::Success,
                    format!("Row {id} deleted."),
                    Utc::now(),
                );
                if self.state.focused_id() == Some(id) {
                    self.close_with(Origin::User);
                    return;
                }
            }
            Err(err) => {
                tracing::debug!("controller: delete {id} failed: {err}");
                self.toasts
                    .show(&mut self.surface, ToastKind::Error, err.to_string(), Utc::now());
            }
        }
        self.emit_state();
    }

    fn apply_page(&mut self, page: u32, result: Result<Page, GatewayError>) {
        match result {
            Ok(Page { html, has_more }) => {
                tracing::debug!("controller: page {page} loaded, has_more={has_more}");
                self.surface.append_rows(&html);
                self.cursor.complete(page, has_more);
                self.rebuild_rows();
                self.ui.refresh(&mut self.surface);
            }
            Err(err) => {
                tracing::warn!("controller: page {page} failed, will retry: {err}");
                self.cursor.fail();
            }
        }
    }

    fn drop_stale(&mut self, fingerprint: PanelMode) {
        tracing::debug!(
            "controller: stale reply for {fingerprint} dropped (now {})",
            self.state.mode()
        );
        self.events.emit(&PanelEvent::StaleDropped(fingerprint));
        self.emit_state();
    }

    fn rebuild_rows(&mut self) {
        self.rows.rebuild(self.surface.row_ids());
        self.events.emit(&PanelEvent::RowsChanged {
            count: self.rows.len(),
        });
    }

    fn reject(&mut self, rejected: Rejected) -> Rejected {
        tracing::debug!("controller: rejected: {rejected}");
        self.events.emit(&PanelEvent::Rejected(rejected));
        rejected
    }

    fn emit_state(&mut self) {
        self.events.emit(&PanelEvent::StateChanged {
            mode: self.state.mode(),
            loading: self.state.is_loading(),
        });
    }
}
