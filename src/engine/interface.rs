use std::sync::mpsc::Sender;

use crate::error::GatewayError;
use crate::types::{Filters, FormFields, Page, PanelMode, RowId, SubmitOutcome};

/// Handle to the gateway engine held by the controller.
///
/// Cheaply cloneable. When the last handle is dropped the sender channel
/// closes, signalling the engine to shut down.
#[derive(Clone, Debug)]
pub struct EngineHandle {
    tx: tokio::sync::mpsc::UnboundedSender<Request>,
}

impl EngineHandle {
    pub(super) fn new(tx: tokio::sync::mpsc::UnboundedSender<Request>) -> Self {
        Self { tx }
    }

    /// Send a request to the engine. Non-blocking — returns immediately.
    pub fn send(&self, req: Request) {
        // Ignore errors: if the receiver is gone the engine has already shut down.
        let _ = self.tx.send(req);
    }

    /// Ask the engine to stop. Requests already queued behind it are dropped.
    pub fn shutdown(&self) {
        self.send(Request::Shutdown);
    }
}

/// Trait implemented by `HttpEngine`, `StubEngine` and `ManualEngine`.
pub trait Engine: Send + 'static {
    fn start(self) -> EngineHandle;
}

/// All operations the controller can send to the engine.
///
/// Panel requests carry the fingerprint (the panel mode they were issued for)
/// so the controller can recognise a stale reply. The engine echoes it back
/// untouched.
#[derive(Debug)]
pub enum Request {
    // -----------------------------------------------------------------------
    // Panel operations (serialized by the controller's loading flag)
    // -----------------------------------------------------------------------
    FetchDetail {
        id: RowId,
        fingerprint: PanelMode,
        reply_tx: Sender<Event>,
    },
    /// `id = None` requests a blank create form.
    FetchForm {
        id: Option<RowId>,
        fingerprint: PanelMode,
        reply_tx: Sender<Event>,
    },
    SubmitForm {
        id: Option<RowId>,
        fields: FormFields,
        fingerprint: PanelMode,
        reply_tx: Sender<Event>,
    },
    DeleteRow {
        id: RowId,
        reply_tx: Sender<Event>,
    },

    // -----------------------------------------------------------------------
    // List growth (independent of the panel flag)
    // -----------------------------------------------------------------------
    FetchPage {
        page: u32,
        filters: Filters,
        reply_tx: Sender<Event>,
    },

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------
    Shutdown,
}

impl Request {
    /// Where the reply for this request goes. `None` for `Shutdown`.
    pub fn reply_tx(&self) -> Option<&Sender<Event>> {
        match self {
            Self::FetchDetail { reply_tx, .. }
            | Self::FetchForm { reply_tx, .. }
            | Self::SubmitForm { reply_tx, .. }
            | Self::DeleteRow { reply_tx, .. }
            | Self::FetchPage { reply_tx, .. } => Some(reply_tx),
            Self::Shutdown => None,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> String {
        match self {
            Self::FetchDetail { id, .. } => format!("FetchDetail[{id}]"),
            Self::FetchForm { id: Some(id), .. } => format!("FetchForm[{id}]"),
            Self::FetchForm { id: None, .. } => "FetchForm[create]".to_owned(),
            Self::SubmitForm { id: Some(id), .. } => format!("SubmitForm[{id}]"),
            Self::SubmitForm { id: None, .. } => "SubmitForm[create]".to_owned(),
            Self::DeleteRow { id, .. } => format!("DeleteRow[{id}]"),
            Self::FetchPage { page, .. } => format!("FetchPage[{page}]"),
            Self::Shutdown => "Shutdown".to_owned(),
        }
    }
}

/// All events the engine can push back to the controller.
///
/// Every request except `Shutdown` produces exactly one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    DetailFetched {
        fingerprint: PanelMode,
        result: Result<String, GatewayError>,
    },
    FormFetched {
        fingerprint: PanelMode,
        result: Result<String, GatewayError>,
    },
    FormSubmitted {
        fingerprint: PanelMode,
        result: Result<SubmitOutcome, GatewayError>,
    },
    RowDeleted {
        id: RowId,
        result: Result<(), GatewayError>,
    },
    PageFetched {
        page: u32,
        result: Result<Page, GatewayError>,
    },
}
