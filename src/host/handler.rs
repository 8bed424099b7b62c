// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Host-side request handling loop

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::bridge::{encode, RequestDescriptor, RequestKind, WeakHostBridge, XhrResponse};
use crate::error::Result;

/// Status reported to XHR callers when the handler itself fails
pub const HANDLER_FAILURE_STATUS: u16 = 502;

/// Response produced by the host for one captured request
#[derive(Debug, Clone)]
pub struct HostResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl HostResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, body)
    }

    pub fn not_found() -> Self {
        Self::new(404, "Not Found")
    }

    /// Set a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Payload shape the page expects for a request of `kind`
    ///
    /// Fetch callers get the body as base64; XHR callers get
    /// `{code, body, headers}` with the body as (lossy) text.
    pub fn into_payload(self, kind: RequestKind) -> serde_json::Value {
        match kind {
            RequestKind::Fetch => serde_json::Value::String(encode(&self.body)),
            RequestKind::Xhr => XhrResponse {
                code: self.status,
                body: String::from_utf8_lossy(&self.body).into_owned(),
                headers: self.headers,
            }
            .into_payload(),
        }
    }
}

/// Host-side handler for captured requests
///
/// This is where a real shell would perform the network transaction; the
/// bridge only cares about the response that comes back.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Produce a response for a captured request
    async fn handle(&self, request: &RequestDescriptor) -> Result<HostResponse>;
}

/// Serve page requests until the page side drops its bridge
///
/// Takes a weak bridge: a strong one would keep `rx` open forever. Each
/// message is handled on its own task, so responses may be delivered out of
/// order, as a real host would.
pub async fn run_host<H>(
    bridge: WeakHostBridge,
    mut rx: mpsc::UnboundedReceiver<String>,
    handler: Arc<H>,
) where
    H: RequestHandler + ?Sized + 'static,
{
    while let Some(message) = rx.recv().await {
        let request = match RequestDescriptor::from_json(&message) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed page message");
                continue;
            }
        };

        let bridge = bridge.clone();
        let handler = handler.clone();
        tokio::spawn(async move {
            let Some(bridge) = bridge.upgrade() else {
                return;
            };
            let kind = request.kind();
            let payload = match handler.handle(&request).await {
                Ok(response) => {
                    tracing::info!(
                        method = %request.method,
                        url = %request.url,
                        status = response.status,
                        "Host answered"
                    );
                    response.into_payload(kind)
                }
                Err(e) => {
                    tracing::warn!(url = %request.url, error = %e, "Host handler failed");
                    match kind {
                        // Not a string, so the page-side fetch rejects
                        RequestKind::Fetch => serde_json::Value::Null,
                        RequestKind::Xhr => {
                            XhrResponse::new(HANDLER_FAILURE_STATUS, e.to_string()).into_payload()
                        }
                    }
                }
            };

            if let Err(e) = bridge.deliver(request.handle, payload) {
                tracing::warn!(url = %request.url, error = %e, "Delivery rejected by page");
            }
        });
    }

    tracing::debug!("Page channel closed, host loop exiting");
}
