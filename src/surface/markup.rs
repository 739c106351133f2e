use crate::types::RowId;

/// Attribute carrying a row's id in list markup.
pub const ROW_ID_ATTR: &str = "data-id";

/// Split a fragment of list markup into `(id, row markup)` pairs.
///
/// A row starts at the tag carrying `data-id="<n>"` and runs until the next
/// such tag (or the end of the fragment). Tags with a missing or invalid id
/// are folded into the preceding row.
pub fn split_rows(html: &str) -> Vec<(RowId, String)> {
    let needle = format!("{ROW_ID_ATTR}=\"");
    let mut starts: Vec<(usize, RowId)> = Vec::new();
    let mut from = 0;

    while let Some(offset) = html[from..].find(&needle) {
        let attr_at = from + offset;
        let value_at = attr_at + needle.len();
        from = value_at;

        let Some(value_len) = html[value_at..].find('"') else {
            break;
        };
        let Ok(id) = html[value_at..value_at + value_len].parse::<RowId>() else {
            continue;
        };
        let tag_start = html[..attr_at].rfind('<').unwrap_or(attr_at);
        starts.push((tag_start, id));
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &(start, id))| {
            let end = starts.get(i + 1).map_or(html.len(), |&(next, _)| next);
            (id, html[start..end].trim().to_owned())
        })
        .collect()
}

/// Ids of all rows in a fragment, in document order.
pub fn scan_row_ids(html: &str) -> Vec<RowId> {
    split_rows(html).into_iter().map(|(id, _)| id).collect()
}

/// Escape text for inclusion in HTML content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
