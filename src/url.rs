use crate::types::{PanelMode, RowId};

/// Build the canonical address-bar URL for a panel mode.
///
/// - `Closed` → `<base>`
/// - `Detail(id)` → `<base>/<id>/`
/// - `Form(None)` → `<base>/create`
/// - `Form(id)` → `<base>/<id>/edit`
///
/// A trailing slash on `base` is ignored.
pub fn canonical_url(base: &str, mode: PanelMode) -> String {
    let base = base.trim_end_matches('/');
    match mode {
        PanelMode::Closed => {
            if base.is_empty() {
                "/".to_owned()
            } else {
                base.to_owned()
            }
        }
        PanelMode::Detail(id) => format!("{base}/{id}/"),
        PanelMode::Form(None) => format!("{base}/create"),
        PanelMode::Form(Some(id)) => format!("{base}/{id}/edit"),
    }
}

/// Parse an address-bar URL back into the panel mode it denotes.
///
/// Accepts absolute URLs (`https://host/admin/rows/4/`) as well as paths.
/// Query strings and fragments are stripped before matching, so a URL carrying
/// list filters (`?status=draft`) still resolves.
///
/// Returns `None` when the URL is outside `base` or names no known mode.
pub fn parse_panel_url(base: &str, url: &str) -> Option<PanelMode> {
    let path = match url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    {
        Some(after_scheme) => match after_scheme.split_once('/') {
            Some((_host, rest)) => &url[url.len() - rest.len() - 1..],
            None => "/",
        },
        None => url,
    };

    let path = path.split_once('?').map_or(path, |(p, _)| p);
    let path = path.split_once('#').map_or(path, |(p, _)| p);

    let base = base.trim_end_matches('/');
    let rest = path.strip_prefix(base)?;
    // `/admin/rows2` must not match base `/admin/rows`.
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }

    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] => Some(PanelMode::Closed),
        ["create"] => Some(PanelMode::Form(None)),
        [id] => id.parse::<RowId>().ok().map(PanelMode::Detail),
        [id, "edit"] => id.parse::<RowId>().ok().map(|id| PanelMode::Form(Some(id))),
        _ => None,
    }
}
