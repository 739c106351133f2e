use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Row identity
// ---------------------------------------------------------------------------

/// Opaque positive integer identifying one list record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(NonZeroU64);

impl RowId {
    /// Returns `None` for zero, which never names a row.
    pub const fn new(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RowId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<NonZeroU64>().map(Self)
    }
}

// ---------------------------------------------------------------------------
// Panel mode
// ---------------------------------------------------------------------------

/// What the side panel is currently showing.
///
/// The focused row id lives inside the variant, so a closed panel can never
/// carry one. `Form(None)` is a create form, `Form(Some(id))` an edit form.
///
/// The same value doubles as the fingerprint attached to every panel request:
/// a response is only applied if its fingerprint still equals the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "id", rename_all = "snake_case")]
pub enum PanelMode {
    #[default]
    Closed,
    Detail(RowId),
    Form(Option<RowId>),
}

impl PanelMode {
    pub fn focused_id(self) -> Option<RowId> {
        match self {
            Self::Closed | Self::Form(None) => None,
            Self::Detail(id) | Self::Form(Some(id)) => Some(id),
        }
    }

    pub fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }

    pub fn kind(self) -> ModeKind {
        match self {
            Self::Closed => ModeKind::Closed,
            Self::Detail(_) => ModeKind::Detail,
            Self::Form(_) => ModeKind::Form,
        }
    }

    /// Same mode, pointed at another row. `Closed` stays closed.
    pub fn with_id(self, id: RowId) -> Self {
        match self {
            Self::Closed => Self::Closed,
            Self::Detail(_) => Self::Detail(id),
            Self::Form(_) => Self::Form(Some(id)),
        }
    }

    /// Rebuild a mode from its split `(kind, focused id)` form.
    ///
    /// Returns `None` for `Detail` without an id; `Closed` ignores the id.
    pub fn from_parts(kind: ModeKind, focused_id: Option<RowId>) -> Option<Self> {
        match (kind, focused_id) {
            (ModeKind::Closed, _) => Some(Self::Closed),
            (ModeKind::Detail, Some(id)) => Some(Self::Detail(id)),
            (ModeKind::Detail, None) => None,
            (ModeKind::Form, id) => Some(Self::Form(id)),
        }
    }
}

impl fmt::Display for PanelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("closed"),
            Self::Detail(id) => write!(f, "detail({id})"),
            Self::Form(None) => f.write_str("create"),
            Self::Form(Some(id)) => write!(f, "edit({id})"),
        }
    }
}

/// Mode without its row id, as stored in history payloads and page attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    #[default]
    Closed,
    Detail,
    Form,
}

// ---------------------------------------------------------------------------
// Navigation and form payloads
// ---------------------------------------------------------------------------

/// Step through the row list relative to the focused row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Prev,
    Next,
}

/// Submitted form fields, in form order.
pub type FormFields = IndexMap<String, String>;

/// Per-field validation messages, in form order.
pub type FieldErrors = IndexMap<String, String>;

/// Active list filters forwarded with every page fetch.
pub type Filters = IndexMap<String, String>;
