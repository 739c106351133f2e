use serde::Deserialize;

use crate::error::GatewayError;
use crate::types::{FieldErrors, RowId};

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

/// The single loose payload shape every endpoint answers with.
///
/// It is never handed to the controller directly: each endpoint validates it
/// into its own result type (`into_html`, `into_submit`, ...) first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WireResponse {
    pub ok: bool,
    pub html: Option<String>,
    pub message: Option<String>,
    pub id: Option<RowId>,
    pub errors: Option<FieldErrors>,
    #[serde(alias = "hasMore")]
    pub has_more: Option<bool>,
}

/// Result of a form submission that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The row was created or updated under this id.
    Saved(RowId),
    /// The server refused the fields; nothing was saved.
    Invalid(FieldErrors),
}

/// One page of rows for the infinite-scroll list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub html: String,
    pub has_more: bool,
}

const FAILED: &str = "request failed";

impl WireResponse {
    fn failure(self) -> GatewayError {
        GatewayError::Server(self.message.unwrap_or_else(|| FAILED.to_owned()))
    }

    /// Validate a detail or form response.
    pub fn into_html(self) -> Result<String, GatewayError> {
        if !self.ok {
            return Err(self.failure());
        }
        self.html
            .ok_or_else(|| GatewayError::Server("response carried no content".to_owned()))
    }

    /// Validate a submit response.
    ///
    /// A non-empty `errors` map is a validation outcome, not a failure, even
    /// though the server reports `ok = false` for it.
    pub fn into_submit(self) -> Result<SubmitOutcome, GatewayError> {
        if self.ok {
            return self
                .id
                .map(SubmitOutcome::Saved)
                .ok_or_else(|| GatewayError::Server("saved row carried no id".to_owned()));
        }
        let message = self.message;
        match self.errors {
            Some(errors) if !errors.is_empty() => Ok(SubmitOutcome::Invalid(errors)),
            _ => Err(GatewayError::Server(
                message.unwrap_or_else(|| FAILED.to_owned()),
            )),
        }
    }

    /// Validate a delete response.
    pub fn into_deleted(self) -> Result<(), GatewayError> {
        if self.ok { Ok(()) } else { Err(self.failure()) }
    }

    /// Validate a page response. A missing `has_more` means the list is done.
    pub fn into_page(self) -> Result<Page, GatewayError> {
        if !self.ok {
            return Err(self.failure());
        }
        let has_more = self.has_more.unwrap_or(false);
        let html = self
            .html
            .ok_or_else(|| GatewayError::Server("page carried no rows".to_owned()))?;
        Ok(Page { html, has_more })
    }
}
