use crate::controller::ui::Toast;
use crate::error::GatewayError;
use crate::types::{FieldErrors, Filters, PanelMode, RowId};

use super::markup::split_rows;
use super::{InitialState, Surface};

#[derive(Debug, Clone)]
struct MemoryRow {
    id: RowId,
    html: String,
    active: bool,
    menu_open: bool,
}

/// What the panel region currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelView {
    Hidden,
    Loading(PanelMode),
    Content { mode: PanelMode, html: String },
    Error(GatewayError),
}

/// An in-memory model of the list page.
///
/// Rows are parsed from markup the same way a browser binding would scan
/// `data-id` attributes. The viewport is a window of `viewport_rows` rows
/// starting at `viewport_top`, which is enough to decide whether a row is
/// fully visible and where scrolling it into view lands.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    rows: Vec<MemoryRow>,
    initial: InitialState,
    viewport_top: usize,
    viewport_rows: usize,
    panel: PanelView,
    field_errors: FieldErrors,
    form_enabled: bool,
    text_focus: bool,
    confirm_answer: bool,
    confirmations: Vec<String>,
    toasts: Vec<Toast>,
    scrolls: Vec<RowId>,
}

impl MemorySurface {
    /// A page whose list already contains the rows in `html`.
    pub fn new(html: &str) -> Self {
        let mut surface = Self {
            rows: Vec::new(),
            initial: InitialState::default(),
            viewport_top: 0,
            viewport_rows: 10,
            panel: PanelView::Hidden,
            field_errors: FieldErrors::new(),
            form_enabled: true,
            text_focus: false,
            confirm_answer: true,
            confirmations: Vec::new(),
            toasts: Vec::new(),
            scrolls: Vec::new(),
        };
        surface.append_rows(html);
        surface
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    pub fn with_initial_mode(mut self, mode: PanelMode) -> Self {
        self.initial.mode = mode;
        self
    }

    pub fn with_has_more(mut self, has_more: bool) -> Self {
        self.initial.has_more = has_more;
        self
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.initial.filters = filters;
        self
    }

    pub fn with_viewport_rows(mut self, rows: usize) -> Self {
        self.viewport_rows = rows.max(1);
        self
    }

    /// What [`Surface::confirm`] answers from now on.
    pub fn set_confirm_answer(&mut self, answer: bool) {
        self.confirm_answer = answer;
    }

    pub fn set_text_input_focused(&mut self, focused: bool) {
        self.text_focus = focused;
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn panel(&self) -> &PanelView {
        &self.panel
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_html(&self, id: RowId) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.html.as_str())
    }

    pub fn active_rows(&self) -> Vec<RowId> {
        self.rows.iter().filter(|r| r.active).map(|r| r.id).collect()
    }

    pub fn open_menus(&self) -> Vec<RowId> {
        self.rows
            .iter()
            .filter(|r| r.menu_open)
            .map(|r| r.id)
            .collect()
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn form_enabled(&self) -> bool {
        self.form_enabled
    }

    /// Every prompt shown through [`Surface::confirm`], oldest first.
    pub fn confirmations(&self) -> &[String] {
        &self.confirmations
    }

    /// Toasts currently on screen.
    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    /// Rows scrolled into view, oldest first.
    pub fn scroll_log(&self) -> &[RowId] {
        &self.scrolls
    }

    pub fn viewport_top(&self) -> usize {
        self.viewport_top
    }

    fn index_of(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.id == id)
    }

    fn row_mut(&mut self, id: RowId) -> Option<&mut MemoryRow> {
        self.rows.iter_mut().find(|r| r.id == id)
    }
}

impl Surface for MemorySurface {
    fn initial_state(&self) -> InitialState {
        self.initial.clone()
    }

    fn row_ids(&self) -> Vec<RowId> {
        self.rows.iter().map(|r| r.id).collect()
    }

    fn append_rows(&mut self, html: &str) {
        self.rows
            .extend(split_rows(html).into_iter().map(|(id, html)| MemoryRow {
                id,
                html,
                active: false,
                menu_open: false,
            }));
    }

    fn remove_row(&mut self, id: RowId) {
        self.rows.retain(|r| r.id != id);
        let max_top = self.rows.len().saturating_sub(self.viewport_rows);
        self.viewport_top = self.viewport_top.min(max_top);
    }

    fn set_row_active(&mut self, id: RowId, active: bool) {
        if let Some(row) = self.row_mut(id) {
            row.active = active;
        }
    }

    fn is_row_fully_visible(&self, id: RowId) -> bool {
        self.index_of(id).is_some_and(|idx| {
            idx >= self.viewport_top && idx < self.viewport_top + self.viewport_rows
        })
    }

    fn scroll_row_into_view(&mut self, id: RowId) {
        let Some(idx) = self.index_of(id) else {
            return;
        };
        if idx < self.viewport_top {
            self.viewport_top = idx;
        } else if idx >= self.viewport_top + self.viewport_rows {
            self.viewport_top = idx + 1 - self.viewport_rows;
        }
        self.scrolls.push(id);
    }

    fn set_row_menu_open(&mut self, id: RowId, open: bool) {
        if let Some(row) = self.row_mut(id) {
            row.menu_open = open;
        }
    }

    fn show_panel_loading(&mut self, mode: PanelMode) {
        self.field_errors.clear();
        self.form_enabled = true;
        self.panel = PanelView::Loading(mode);
    }

    fn render_panel(&mut self, mode: PanelMode, html: &str) {
        self.panel = PanelView::Content {
            mode,
            html: html.to_owned(),
        };
    }

    fn render_panel_error(&mut self, error: &GatewayError) {
        self.panel = PanelView::Error(error.clone());
    }

    fn hide_panel(&mut self) {
        self.field_errors.clear();
        self.panel = PanelView::Hidden;
    }

    fn render_field_errors(&mut self, errors: &FieldErrors) {
        self.field_errors = errors.clone();
    }

    fn set_form_controls_enabled(&mut self, enabled: bool) {
        self.form_enabled = enabled;
    }

    fn text_input_focused(&self) -> bool {
        self.text_focus
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.confirmations.push(message.to_owned());
        self.confirm_answer
    }

    fn show_toast(&mut self, toast: &Toast) {
        self.toasts.push(toast.clone());
    }

    fn dismiss_toast(&mut self, id: u64) {
        self.toasts.retain(|t| t.id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: u64) -> String {
        (1..=n)
            .map(|i| format!("<tr data-id=\"{i}\"><td>{i}</td></tr>"))
            .collect()
    }

    fn id(n: u64) -> RowId {
        RowId::new(n).unwrap()
    }

    #[test]
    fn rows_are_scanned_from_markup() {
        let surface = MemorySurface::new(&rows(3));
        assert_eq!(surface.row_ids(), vec![id(1), id(2), id(3)]);
        assert_eq!(
            surface.row_html(id(2)),
            Some("<tr data-id=\"2\"><td>2</td></tr>")
        );
    }

    #[test]
    fn scrolling_moves_the_viewport_minimally() {
        let mut surface = MemorySurface::new(&rows(10)).with_viewport_rows(3);
        assert!(surface.is_row_fully_visible(id(3)));
        assert!(!surface.is_row_fully_visible(id(4)));

        surface.scroll_row_into_view(id(6));
        assert_eq!(surface.viewport_top(), 3);
        assert!(surface.is_row_fully_visible(id(4)));

        surface.scroll_row_into_view(id(2));
        assert_eq!(surface.viewport_top(), 1);
    }

    #[test]
    fn removing_rows_clamps_the_viewport() {
        let mut surface = MemorySurface::new(&rows(4)).with_viewport_rows(2);
        surface.scroll_row_into_view(id(4));
        assert_eq!(surface.viewport_top(), 2);
        surface.remove_row(id(4));
        assert_eq!(surface.viewport_top(), 1);
    }
}
