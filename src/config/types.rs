use serde::Deserialize;

use crate::config::keybindings::KeybindingsConfig;
use crate::types::RowId;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub panel: PanelConfig,
    pub gateway: GatewayConfig,
    pub toast: ToastConfig,
    pub keybindings: KeybindingsConfig,
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Entity base path used to build canonical URLs.
    pub base_path: String,
    /// Delete confirmation prompt; `{id}` is replaced with the row id.
    pub confirm_delete: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            base_path: "/admin/rows".to_owned(),
            confirm_delete: "Delete row {id}? This cannot be undone.".to_owned(),
        }
    }
}

impl PanelConfig {
    pub fn confirm_message(&self, id: RowId) -> String {
        self.confirm_delete.replace("{id}", &id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Transport-level timeout. When unset, a hung request holds the panel
    /// loading flag until the connection itself fails.
    pub request_timeout_secs: Option<u64>,
    pub routes: GatewayRoutes,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/admin/rows".to_owned(),
            request_timeout_secs: None,
            routes: GatewayRoutes::default(),
        }
    }
}

/// Route templates relative to `gateway.base_url`. `{id}` is substituted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayRoutes {
    pub detail: String,
    pub form_create: String,
    pub form_edit: String,
    pub submit_create: String,
    pub submit_edit: String,
    pub delete: String,
    pub page: String,
}

impl Default for GatewayRoutes {
    fn default() -> Self {
        Self {
            detail: "{id}/".to_owned(),
            form_create: "create".to_owned(),
            form_edit: "{id}/edit".to_owned(),
            submit_create: "create".to_owned(),
            submit_edit: "{id}/edit".to_owned(),
            delete: "{id}/delete".to_owned(),
            page: String::new(),
        }
    }
}

impl GatewayRoutes {
    /// Join a route template onto `base_url`, substituting `{id}`.
    pub fn url(base_url: &str, template: &str, id: Option<RowId>) -> String {
        let path = match id {
            Some(id) => template.replace("{id}", &id.to_string()),
            None => template.to_owned(),
        };
        let base = base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            format!("{base}/")
        } else {
            format!("{base}/{path}")
        }
    }
}

// ---------------------------------------------------------------------------
// Toasts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToastConfig {
    pub duration_ms: u64,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self { duration_ms: 4000 }
    }
}
