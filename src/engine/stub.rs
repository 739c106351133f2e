use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::GatewayError;
use crate::surface::markup::escape_html;
use crate::types::{Filters, FieldErrors, FormFields, Page, RowId, SubmitOutcome};

use super::interface::{Engine, EngineHandle, Event, Request};

/// A fixture row served by [`StubEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRow {
    pub id: RowId,
    pub title: String,
}

fn default_page_size() -> usize {
    20
}

/// A stub engine that serves fixture rows without any network calls.
///
/// Useful for integration tests and the replay harness. It keeps its own copy
/// of the rows, so submits and deletes are visible to later requests.
///
/// Deleted rows stay in place as tombstones so page boundaries do not shift
/// under a client that has already loaded earlier pages.
#[derive(Debug, Clone, Deserialize)]
pub struct StubEngine {
    pub rows: Vec<FixtureRow>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(skip)]
    deleted: HashSet<RowId>,
}

impl Engine for StubEngine {
    fn start(self) -> EngineHandle {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Request>();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("stub tokio runtime");
            rt.block_on(self.run_loop(rx));
        });
        EngineHandle::new(tx)
    }
}

impl StubEngine {
    pub fn new(rows: Vec<FixtureRow>, page_size: usize) -> Self {
        Self {
            rows,
            page_size: page_size.max(1),
            deleted: HashSet::new(),
        }
    }

    /// Load a fixture from JSON: `{"page_size": 20, "rows": [{"id": 1, "title": "..."}]}`.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let stub: Self = serde_json::from_str(json)?;
        Ok(Self::new(stub.rows, stub.page_size))
    }

    async fn run_loop(mut self, mut rx: UnboundedReceiver<Request>) {
        while let Some(req) = rx.recv().await {
            tracing::debug!("stub: {}", req.label());
            match req {
                Request::FetchDetail {
                    id,
                    fingerprint,
                    reply_tx,
                } => {
                    let _ = reply_tx.send(Event::DetailFetched {
                        fingerprint,
                        result: self.render_detail(id),
                    });
                }
                Request::FetchForm {
                    id,
                    fingerprint,
                    reply_tx,
                } => {
                    let _ = reply_tx.send(Event::FormFetched {
                        fingerprint,
                        result: self.render_form(id),
                    });
                }
                Request::SubmitForm {
                    id,
                    fields,
                    fingerprint,
                    reply_tx,
                } => {
                    let result = self.submit(id, &fields);
                    let _ = reply_tx.send(Event::FormSubmitted {
                        fingerprint,
                        result,
                    });
                }
                Request::DeleteRow { id, reply_tx } => {
                    let result = self.delete(id);
                    let _ = reply_tx.send(Event::RowDeleted { id, result });
                }
                Request::FetchPage {
                    page,
                    filters,
                    reply_tx,
                } => {
                    let _ = reply_tx.send(Event::PageFetched {
                        page,
                        result: Ok(self.render_page(page, &filters)),
                    });
                }
                Request::Shutdown => break,
            }
        }
    }

    fn find(&self, id: RowId) -> Result<&FixtureRow, GatewayError> {
        self.rows
            .iter()
            .find(|r| r.id == id && !self.deleted.contains(&r.id))
            .ok_or_else(|| GatewayError::Server(format!("row {id} not found")))
    }

    /// Markup for a single list row.
    pub fn render_row(row: &FixtureRow) -> String {
        format!(
            "<tr data-id=\"{}\"><td>{}</td></tr>",
            row.id,
            escape_html(&row.title)
        )
    }

    /// One page of list rows (1-based). The `q` filter matches titles
    /// case-insensitively.
    pub fn render_page(&self, page: u32, filters: &Filters) -> Page {
        let query = filters.get("q").map(|q| q.to_lowercase());
        let matching: Vec<&FixtureRow> = self
            .rows
            .iter()
            .filter(|r| {
                query
                    .as_deref()
                    .is_none_or(|q| r.title.to_lowercase().contains(q))
            })
            .collect();

        let skip = (page.max(1) as usize - 1) * self.page_size;
        let html = matching
            .iter()
            .skip(skip)
            .take(self.page_size)
            .filter(|r| !self.deleted.contains(&r.id))
            .map(|r| Self::render_row(r))
            .collect::<Vec<_>>()
            .join("\n");
        Page {
            html,
            has_more: matching.len() > skip + self.page_size,
        }
    }

    fn render_detail(&self, id: RowId) -> Result<String, GatewayError> {
        let row = self.find(id)?;
        Ok(format!(
            "<article data-id=\"{}\"><h1>{}</h1></article>",
            row.id,
            escape_html(&row.title)
        ))
    }

    fn render_form(&self, id: Option<RowId>) -> Result<String, GatewayError> {
        let title = match id {
            Some(id) => self.find(id)?.title.clone(),
            None => String::new(),
        };
        Ok(format!(
            "<form><input name=\"title\" value=\"{}\"></form>",
            escape_html(&title)
        ))
    }

    fn submit(
        &mut self,
        id: Option<RowId>,
        fields: &FormFields,
    ) -> Result<SubmitOutcome, GatewayError> {
        let title = fields.get("title").map_or("", |t| t.trim());
        if title.is_empty() {
            let mut errors = FieldErrors::new();
            errors.insert("title".to_owned(), "This field is required.".to_owned());
            return Ok(SubmitOutcome::Invalid(errors));
        }

        match id {
            Some(id) => {
                self.find(id)?;
                let row = self
                    .rows
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or_else(|| GatewayError::Server(format!("row {id} not found")))?;
                title.clone_into(&mut row.title);
                Ok(SubmitOutcome::Saved(id))
            }
            None => {
                // Ids of deleted rows are never handed out again.
                let id = self
                    .rows
                    .iter()
                    .map(|r| r.id.get())
                    .max()
                    .unwrap_or(0)
                    .checked_add(1)
                    .and_then(RowId::new)
                    .ok_or_else(|| GatewayError::Server("row id space exhausted".to_owned()))?;
                self.rows.push(FixtureRow {
                    id,
                    title: title.to_owned(),
                });
                Ok(SubmitOutcome::Saved(id))
            }
        }
    }

    fn delete(&mut self, id: RowId) -> Result<(), GatewayError> {
        self.find(id)?;
        self.deleted.insert(id);
        Ok(())
    }
}
