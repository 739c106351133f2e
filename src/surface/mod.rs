// surface module — the page the controller paints onto
//
// The controller never touches markup directly. Everything it needs from the
// host page (row scanning, highlighting, scrolling, panel content, prompts,
// toasts) goes through the `Surface` trait, so the same state machine drives a
// browser DOM binding, the in-memory model used by tests and the replay CLI.

pub mod markup;
mod memory;

pub use memory::{MemorySurface, PanelView};

use crate::controller::ui::Toast;
use crate::error::GatewayError;
use crate::types::{FieldErrors, Filters, PanelMode, RowId};

/// State the server embedded into the page at render time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialState {
    pub mode: PanelMode,
    pub has_more: bool,
    pub filters: Filters,
}

pub trait Surface {
    /// First-paint state read from the page's data attributes.
    fn initial_state(&self) -> InitialState;

    // -----------------------------------------------------------------------
    // Row list
    // -----------------------------------------------------------------------

    /// Ids of every row currently in the list, in display order.
    fn row_ids(&self) -> Vec<RowId>;
    fn append_rows(&mut self, html: &str);
    fn remove_row(&mut self, id: RowId);
    fn set_row_active(&mut self, id: RowId, active: bool);
    fn is_row_fully_visible(&self, id: RowId) -> bool;
    fn scroll_row_into_view(&mut self, id: RowId);
    fn set_row_menu_open(&mut self, id: RowId, open: bool);

    // -----------------------------------------------------------------------
    // Panel
    // -----------------------------------------------------------------------

    fn show_panel_loading(&mut self, mode: PanelMode);
    fn render_panel(&mut self, mode: PanelMode, html: &str);
    /// Inline error inside the open panel; the panel stays open.
    fn render_panel_error(&mut self, error: &GatewayError);
    fn hide_panel(&mut self);
    /// Attach per-field messages without clearing entered values.
    fn render_field_errors(&mut self, errors: &FieldErrors);
    fn set_form_controls_enabled(&mut self, enabled: bool);
    /// Whether a text input currently holds keyboard focus.
    fn text_input_focused(&self) -> bool;

    // -----------------------------------------------------------------------
    // Prompts and notifications
    // -----------------------------------------------------------------------

    /// Blocking yes/no prompt.
    fn confirm(&mut self, message: &str) -> bool;
    fn show_toast(&mut self, toast: &Toast);
    fn dismiss_toast(&mut self, id: u64);
}
