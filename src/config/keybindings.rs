use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use serde::Deserialize;

use crate::types::{ModeKind, PanelMode};

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// A single key binding: maps a key chord to a built-in panel action.
#[derive(Debug, Clone, Deserialize)]
pub struct Keybinding {
    pub key: String,
    pub builtin: Option<String>,
    pub name: Option<String>,
}

/// All keybinding overrides from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeybindingsConfig {
    pub universal: Vec<Keybinding>,
    pub detail: Vec<Keybinding>,
    pub form: Vec<Keybinding>,
}

/// Panel action identifier used for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelAction {
    Close,
    NavigatePrev,
    NavigateNext,
    NewRecord,
    EditRecord,
}

impl PanelAction {
    /// Parse a builtin action name from the config string.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "close" => Self::Close,
            "prev" => Self::NavigatePrev,
            "next" => Self::NavigateNext,
            "new" => Self::NewRecord,
            "edit" => Self::EditRecord,
            _ => return None,
        })
    }

    /// Human-readable description of this action (for help listings).
    pub fn description(self) -> &'static str {
        match self {
            Self::Close => "Close panel",
            Self::NavigatePrev => "Previous row",
            Self::NavigateNext => "Next row",
            Self::NewRecord => "New row",
            Self::EditRecord => "Edit row",
        }
    }
}

/// Panel context for keybinding resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelContext {
    Closed,
    Detail,
    Form,
}

impl PanelContext {
    pub const ALL: [Self; 3] = [Self::Closed, Self::Detail, Self::Form];

    /// The binding set that applies while the panel shows `mode`.
    pub fn of(mode: PanelMode) -> Self {
        match mode.kind() {
            ModeKind::Closed => Self::Closed,
            ModeKind::Detail => Self::Detail,
            ModeKind::Form => Self::Form,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Closed => "list",
            Self::Detail => "detail panel",
            Self::Form => "form panel",
        }
    }
}

/// One line of a key help listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpLine<'a> {
    pub group: &'static str,
    pub key: &'a str,
    pub description: &'a str,
}

// ---------------------------------------------------------------------------
// Terminal keys
// ---------------------------------------------------------------------------

/// The `[keybindings]` name of a terminal key press: `"j"`, `"G"`,
/// `"ctrl+n"`, `"alt+up"`, `"shift+tab"`, `"space"`, `"f5"`.
///
/// Releases and keys with no binding name give `None`.
pub fn key_name(event: &KeyEvent) -> Option<String> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);

    let base = match event.code {
        KeyCode::Char(' ') => "space".to_owned(),
        // Terminals report ctrl chords with either case.
        KeyCode::Char(c) if ctrl => c.to_ascii_lowercase().to_string(),
        // Shift is already in the char ('G' vs 'g').
        KeyCode::Char(c) => c.to_string(),
        KeyCode::BackTab => "shift+tab".to_owned(),
        KeyCode::F(n) => format!("f{n}"),
        code => named_key(code)?.to_owned(),
    };

    let mut name = String::new();
    if ctrl {
        name.push_str("ctrl+");
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        name.push_str("alt+");
    }
    name.push_str(&base);
    Some(name)
}

fn named_key(code: KeyCode) -> Option<&'static str> {
    Some(match code {
        KeyCode::Esc => "esc",
        KeyCode::Enter => "enter",
        KeyCode::Tab => "tab",
        KeyCode::Backspace => "backspace",
        KeyCode::Delete => "delete",
        KeyCode::Up => "up",
        KeyCode::Down => "down",
        KeyCode::Left => "left",
        KeyCode::Right => "right",
        KeyCode::Home => "home",
        KeyCode::End => "end",
        KeyCode::PageUp => "pageup",
        KeyCode::PageDown => "pagedown",
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Default keybindings
// ---------------------------------------------------------------------------

fn kb(key: &str, builtin: &str, name: &str) -> Keybinding {
    Keybinding {
        key: key.to_owned(),
        builtin: Some(builtin.to_owned()),
        name: Some(name.to_owned()),
    }
}

/// Default keybindings active whatever the panel shows.
pub fn default_universal() -> Vec<Keybinding> {
    vec![
        kb("esc", "close", "Close panel"),
        kb("n", "new", "New row"),
    ]
}

/// Default keybindings while a detail panel is open.
pub fn default_detail() -> Vec<Keybinding> {
    vec![
        kb("up", "prev", "Previous row"),
        kb("k", "prev", "Previous row"),
        kb("down", "next", "Next row"),
        kb("j", "next", "Next row"),
        kb("e", "edit", "Edit row"),
    ]
}

// ---------------------------------------------------------------------------
// Merged keybinding set
// ---------------------------------------------------------------------------

/// A fully resolved keybinding map: defaults merged with user overrides.
///
/// User overrides replace defaults for the same key.
#[derive(Debug, Clone)]
pub struct MergedBindings {
    pub universal: Vec<Keybinding>,
    pub detail: Vec<Keybinding>,
    pub form: Vec<Keybinding>,
}

impl Default for MergedBindings {
    fn default() -> Self {
        Self::from_config(&KeybindingsConfig::default())
    }
}

impl MergedBindings {
    /// Merge user config overrides on top of defaults.
    pub fn from_config(config: &KeybindingsConfig) -> Self {
        Self {
            universal: merge_lists(&default_universal(), &config.universal),
            detail: merge_lists(&default_detail(), &config.detail),
            form: merge_lists(&[], &config.form),
        }
    }

    /// Look up a key string, checking context-specific bindings first, then
    /// universal.
    pub fn resolve(&self, key: &str, context: PanelContext) -> Option<PanelAction> {
        let context_bindings: &[Keybinding] = match context {
            PanelContext::Closed => &[],
            PanelContext::Detail => &self.detail,
            PanelContext::Form => &self.form,
        };

        find_binding(context_bindings, key).or_else(|| find_binding(&self.universal, key))
    }

    /// Return all bindings for a given context, grouped as
    /// `(context_label, bindings)` pairs. Universal bindings come first.
    pub fn all_for_context(&self, context: PanelContext) -> Vec<(&'static str, &[Keybinding])> {
        match context {
            PanelContext::Closed => vec![("Universal", self.universal.as_slice())],
            PanelContext::Detail => vec![
                ("Universal", self.universal.as_slice()),
                ("Detail", self.detail.as_slice()),
            ],
            PanelContext::Form => vec![
                ("Universal", self.universal.as_slice()),
                ("Form", self.form.as_slice()),
            ],
        }
    }

    /// Every binding that can fire in `context`, universal ones first, with
    /// its description. Universal keys shadowed by a context binding and
    /// bindings naming an unknown action are left out.
    pub fn help(&self, context: PanelContext) -> Vec<HelpLine<'_>> {
        let groups = self.all_for_context(context);
        let mut lines: Vec<HelpLine<'_>> = Vec::new();
        for (i, &(group, bindings)) in groups.iter().enumerate() {
            let later = &groups[i + 1..];
            for b in bindings {
                let Some(action) = b.builtin.as_deref().and_then(PanelAction::from_name) else {
                    continue;
                };
                let shadowed = later
                    .iter()
                    .any(|(_, more)| find_binding(more, &b.key).is_some());
                if shadowed || lines.iter().any(|l| l.group == group && l.key == b.key) {
                    continue;
                }
                lines.push(HelpLine {
                    group,
                    key: &b.key,
                    description: b.name.as_deref().unwrap_or(action.description()),
                });
            }
        }
        lines
    }
}

/// Merge user overrides on top of defaults. User bindings for the same key
/// replace the default; additional user bindings are appended.
fn merge_lists(defaults: &[Keybinding], overrides: &[Keybinding]) -> Vec<Keybinding> {
    let override_keys: std::collections::HashSet<&str> =
        overrides.iter().map(|b| b.key.as_str()).collect();

    let mut result: Vec<Keybinding> = defaults
        .iter()
        .filter(|b| !override_keys.contains(b.key.as_str()))
        .cloned()
        .collect();

    result.extend(overrides.iter().cloned());
    result
}

fn find_binding(bindings: &[Keybinding], key: &str) -> Option<PanelAction> {
    bindings
        .iter()
        .filter(|b| b.key == key)
        .find_map(|b| b.builtin.as_deref().and_then(PanelAction::from_name))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
