use std::sync::mpsc::Sender;
use std::time::Duration;

use anyhow::{Context, Result};
use http::StatusCode;
use http::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::types::{GatewayConfig, GatewayRoutes};
use crate::error::GatewayError;
use crate::types::{Filters, FormFields, Page, RowId, SubmitOutcome, WireResponse};

use super::interface::{Engine, EngineHandle, Event, Request};

/// The real gateway engine, speaking JSON over HTTP to the CMS host.
pub struct HttpEngine {
    config: GatewayConfig,
}

impl HttpEngine {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }
}

impl Engine for HttpEngine {
    fn start(self) -> EngineHandle {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Request>();
        let handle = EngineHandle::new(tx);
        let _ = std::thread::Builder::new()
            .name("panel-gateway".to_owned())
            .spawn(move || {
                let rt = tokio::runtime::Runtime::new().expect("tokio runtime init");
                rt.block_on(self.run_loop(rx));
            });
        handle
    }
}

impl HttpEngine {
    async fn run_loop(self, mut rx: UnboundedReceiver<Request>) {
        let gateway = match HttpGateway::new(&self.config) {
            Ok(gateway) => Some(gateway),
            Err(e) => {
                tracing::error!("gateway: {e:#}");
                None
            }
        };

        while let Some(req) = rx.recv().await {
            if matches!(req, Request::Shutdown) {
                tracing::debug!("gateway: shutting down");
                break;
            }
            match gateway.clone() {
                // Page fetches must not queue behind a slow panel request, so
                // every request runs as its own task.
                Some(gateway) => {
                    tokio::spawn(async move { handle_request(req, &gateway).await });
                }
                None => fail_request(
                    req,
                    GatewayError::Network("HTTP client unavailable".to_owned()),
                ),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Request dispatch
// ---------------------------------------------------------------------------

async fn handle_request(req: Request, gateway: &HttpGateway) {
    let label = req.label();
    tracing::debug!("gateway: received {label}");
    match req {
        Request::FetchDetail {
            id,
            fingerprint,
            reply_tx,
        } => {
            let result = gateway.detail(id).await;
            log_failure(&label, &result);
            let _ = reply_tx.send(Event::DetailFetched {
                fingerprint,
                result,
            });
        }
        Request::FetchForm {
            id,
            fingerprint,
            reply_tx,
        } => {
            let result = gateway.form(id).await;
            log_failure(&label, &result);
            let _ = reply_tx.send(Event::FormFetched {
                fingerprint,
                result,
            });
        }
        Request::SubmitForm {
            id,
            fields,
            fingerprint,
            reply_tx,
        } => {
            let result = gateway.submit(id, &fields).await;
            log_failure(&label, &result);
            let _ = reply_tx.send(Event::FormSubmitted {
                fingerprint,
                result,
            });
        }
        Request::DeleteRow { id, reply_tx } => {
            let result = gateway.delete(id).await;
            log_failure(&label, &result);
            let _ = reply_tx.send(Event::RowDeleted { id, result });
        }
        Request::FetchPage {
            page,
            filters,
            reply_tx,
        } => {
            let result = gateway.page(page, &filters).await;
            log_failure(&label, &result);
            let _ = reply_tx.send(Event::PageFetched { page, result });
        }
        Request::Shutdown => {}
    }
}

/// Answer a request with `err` without touching the network.
fn fail_request(req: Request, err: GatewayError) {
    let reply: Option<(Sender<Event>, Event)> = match req {
        Request::FetchDetail {
            fingerprint,
            reply_tx,
            ..
        } => Some((
            reply_tx,
            Event::DetailFetched {
                fingerprint,
                result: Err(err),
            },
        )),
        Request::FetchForm {
            fingerprint,
            reply_tx,
            ..
        } => Some((
            reply_tx,
            Event::FormFetched {
                fingerprint,
                result: Err(err),
            },
        )),
        Request::SubmitForm {
            fingerprint,
            reply_tx,
            ..
        } => Some((
            reply_tx,
            Event::FormSubmitted {
                fingerprint,
                result: Err(err),
            },
        )),
        Request::DeleteRow { id, reply_tx } => {
            Some((reply_tx, Event::RowDeleted { id, result: Err(err) }))
        }
        Request::FetchPage { page, reply_tx, .. } => {
            Some((reply_tx, Event::PageFetched { page, result: Err(err) }))
        }
        Request::Shutdown => None,
    };
    if let Some((tx, event)) = reply {
        let _ = tx.send(event);
    }
}

fn log_failure<T>(label: &str, result: &Result<T, GatewayError>) {
    if let Err(e) = result {
        tracing::debug!("gateway: {label} error: {e}");
    }
}

// ---------------------------------------------------------------------------
// HTTP calls
// ---------------------------------------------------------------------------

/// Thin typed wrapper over the five collaborator endpoints.
///
/// Cheap to clone: `reqwest::Client` is reference-counted internally.
#[derive(Clone)]
pub(crate) struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    routes: GatewayRoutes,
}

impl HttpGateway {
    pub(crate) fn new(config: &GatewayConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("building HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            routes: config.routes.clone(),
        })
    }

    fn url(&self, template: &str, id: Option<RowId>) -> String {
        GatewayRoutes::url(&self.base_url, template, id)
    }

    pub(crate) async fn detail(&self, id: RowId) -> Result<String, GatewayError> {
        let url = self.url(&self.routes.detail, Some(id));
        call(self.client.get(url)).await?.into_html()
    }

    pub(crate) async fn form(&self, id: Option<RowId>) -> Result<String, GatewayError> {
        let template = if id.is_some() {
            &self.routes.form_edit
        } else {
            &self.routes.form_create
        };
        let url = self.url(template, id);
        call(self.client.get(url)).await?.into_html()
    }

    pub(crate) async fn submit(
        &self,
        id: Option<RowId>,
        fields: &FormFields,
    ) -> Result<SubmitOutcome, GatewayError> {
        let template = if id.is_some() {
            &self.routes.submit_edit
        } else {
            &self.routes.submit_create
        };
        let url = self.url(template, id);
        call(self.client.post(url).form(fields)).await?.into_submit()
    }

    pub(crate) async fn delete(&self, id: RowId) -> Result<(), GatewayError> {
        let url = self.url(&self.routes.delete, Some(id));
        call(self.client.post(url)).await?.into_deleted()
    }

    pub(crate) async fn page(&self, page: u32, filters: &Filters) -> Result<Page, GatewayError> {
        let url = self.url(&self.routes.page, None);
        let request = self
            .client
            .get(url)
            .query(filters)
            .query(&[("page", page.to_string())]);
        call(request).await?.into_page()
    }
}

async fn call(request: reqwest::RequestBuilder) -> Result<WireResponse, GatewayError> {
    let response = request
        .send()
        .await
        .map_err(|e| GatewayError::Network(e.to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::Network(e.to_string()))?;
    classify(status, &body)
}

/// Turn a status + body into the loose wire payload.
///
/// A JSON body on a non-2xx status is kept (it may carry field errors) but
/// forced to `ok = false`. A non-JSON body is only an error; on a 2xx status
/// it means the collaborator broke the contract.
pub(crate) fn classify(status: StatusCode, body: &str) -> Result<WireResponse, GatewayError> {
    match serde_json::from_str::<WireResponse>(body) {
        Ok(wire) if status.is_success() => Ok(wire),
        Ok(mut wire) => {
            wire.ok = false;
            if wire.message.is_none() {
                wire.message = Some(status_message(status));
            }
            Ok(wire)
        }
        Err(e) if status.is_success() => {
            Err(GatewayError::Server(format!("malformed response: {e}")))
        }
        Err(_) => Err(GatewayError::Server(status_message(status))),
    }
}

fn status_message(status: StatusCode) -> String {
    format!("server returned {status}")
}
