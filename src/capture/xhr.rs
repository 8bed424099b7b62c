// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Event-style capture: an `XMLHttpRequest` work-alike whose sends go to the host
//!
//! The request moves through `Unsent -> Opened -> Sent -> Done/Failed`. The
//! transition to a terminal state happens first, under the lock; listeners
//! are called afterwards with the lock released.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::bridge::{
    CallbackHandle, HeaderMap, HeaderScope, HostBridge, RequestDescriptor, Settlement, XhrResponse,
};
use crate::error::{Error, Result};

/// `readyState` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ReadyState {
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

impl ReadyState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Events an XHR dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XhrEventKind {
    ReadyStateChange,
    Load,
    LoadEnd,
    Error,
    Timeout,
    Abort,
}

impl XhrEventKind {
    /// DOM event name
    pub fn as_str(&self) -> &'static str {
        match self {
            XhrEventKind::ReadyStateChange => "readystatechange",
            XhrEventKind::Load => "load",
            XhrEventKind::LoadEnd => "loadend",
            XhrEventKind::Error => "error",
            XhrEventKind::Timeout => "timeout",
            XhrEventKind::Abort => "abort",
        }
    }

    /// Parse a DOM event name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "readystatechange" => Some(XhrEventKind::ReadyStateChange),
            "load" => Some(XhrEventKind::Load),
            "loadend" => Some(XhrEventKind::LoadEnd),
            "error" => Some(XhrEventKind::Error),
            "timeout" => Some(XhrEventKind::Timeout),
            "abort" => Some(XhrEventKind::Abort),
            _ => None,
        }
    }
}

/// Event passed to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XhrEvent {
    pub kind: XhrEventKind,
    pub ready_state: ReadyState,
    pub status: u16,
}

/// Event listener
pub type Listener = Arc<dyn Fn(&XhrEvent) + Send + Sync>;

/// Target captured by `open`
#[derive(Debug, Clone)]
struct OpenRequest {
    method: String,
    url: String,
    // Captured for completeness; the host message does not carry them
    #[allow(dead_code)]
    async_flag: bool,
    #[allow(dead_code)]
    user: Option<String>,
    #[allow(dead_code)]
    password: Option<String>,
}

enum XhrState {
    Unsent,
    Opened(OpenRequest),
    Sent {
        request: OpenRequest,
        seq: u64,
        handle: CallbackHandle,
    },
    Done {
        request: OpenRequest,
        response: XhrResponse,
    },
    Failed {
        request: OpenRequest,
        error: String,
    },
}

impl XhrState {
    fn request(&self) -> Option<&OpenRequest> {
        match self {
            XhrState::Unsent => None,
            XhrState::Opened(request)
            | XhrState::Sent { request, .. }
            | XhrState::Done { request, .. }
            | XhrState::Failed { request, .. } => Some(request),
        }
    }
}

struct XhrShared {
    state: XhrState,
    /// Bumped on every send; a settlement for an older send is ignored
    seq: u64,
    listeners: Vec<(XhrEventKind, Listener)>,
}

/// Captured `XMLHttpRequest`
///
/// Cheap to clone; clones address the same request.
///
/// ```rust
/// use pagewire::{BridgeConfig, HostBridge, Interceptor, ReadyState};
/// use serde_json::json;
///
/// let (bridge, _to_host) = HostBridge::with_channel(BridgeConfig::default());
/// let interceptor = Interceptor::new(bridge.clone());
///
/// let xhr = interceptor.xml_http_request();
/// xhr.open("GET", "/a");
/// xhr.set_request_header("X", "1").unwrap();
/// xhr.send(None).unwrap();
///
/// let handle = xhr.callback_handle().unwrap();
/// bridge.deliver(handle, json!({"code": 200, "body": "hi"})).unwrap();
///
/// assert_eq!(xhr.ready_state(), ReadyState::Done);
/// assert_eq!(xhr.response_text(), "hi");
/// ```
#[derive(Clone)]
pub struct XmlHttpRequest {
    shared: Arc<Mutex<XhrShared>>,
    headers: Arc<Mutex<HeaderMap>>,
    scope: HeaderScope,
    bridge: HostBridge,
}

impl XmlHttpRequest {
    pub(crate) fn new(bridge: HostBridge, headers: Arc<Mutex<HeaderMap>>) -> Self {
        let scope = bridge.config().header_scope;
        Self {
            shared: Arc::new(Mutex::new(XhrShared {
                state: XhrState::Unsent,
                seq: 0,
                listeners: Vec::new(),
            })),
            headers,
            scope,
            bridge,
        }
    }

    /// Create a standalone XHR with its own header map
    pub fn with_bridge(bridge: HostBridge) -> Self {
        Self::new(bridge, Arc::default())
    }

    /// `open(method, url)`
    pub fn open(&self, method: impl Into<String>, url: impl Into<String>) {
        self.open_with(method, url, true, None, None);
    }

    /// `open(method, url, async, user, password)`
    ///
    /// Fires `readystatechange` unless the request was already opened.
    /// Re-opening a sent request drops it: its handle is freed and its
    /// eventual response is ignored.
    pub fn open_with(
        &self,
        method: impl Into<String>,
        url: impl Into<String>,
        async_flag: bool,
        user: Option<String>,
        password: Option<String>,
    ) {
        let request = OpenRequest {
            method: method.into(),
            url: url.into(),
            async_flag,
            user,
            password,
        };
        tracing::debug!(method = %request.method, url = %request.url, "XHR open");

        let (superseded, listeners) = {
            let mut shared = self.shared.lock();
            let previous = std::mem::replace(&mut shared.state, XhrState::Opened(request));
            match previous {
                XhrState::Sent { handle, .. } => (Some(handle), None),
                XhrState::Opened(_) => (None, None),
                _ => (None, Some(shared.listeners.clone())),
            }
        };

        if self.scope == HeaderScope::PerRequest {
            self.headers.lock().clear();
        }

        if let Some(handle) = superseded {
            let _ = self.bridge.fail(handle, Error::Aborted);
        }
        if let Some(listeners) = listeners {
            dispatch(&listeners, XhrEventKind::ReadyStateChange, ReadyState::Opened, 0);
        }
    }

    /// `setRequestHeader(name, value)`; a repeated name overwrites
    pub fn set_request_header(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        if !matches!(self.shared.lock().state, XhrState::Opened(_)) {
            return Err(Error::invalid_state(
                "setRequestHeader() requires an opened, unsent request",
            ));
        }
        self.headers.lock().insert(name.into(), value.into());
        Ok(())
    }

    /// `send(body)`: post the request to the host
    ///
    /// The request is in the `Sent` state before it is posted, and its
    /// deadline starts only after posting. A transport failure completes the
    /// request with an `error` event and is also returned.
    pub fn send(&self, body: Option<String>) -> Result<()> {
        let (request, seq) = {
            let mut shared = self.shared.lock();
            let request = match &shared.state {
                XhrState::Opened(request) => request.clone(),
                _ => {
                    return Err(Error::invalid_state(
                        "send() requires an opened, unsent request",
                    ))
                }
            };
            shared.seq += 1;
            (request, shared.seq)
        };

        let headers = self.headers.lock().clone();
        let xhr = self.clone();
        let handle = self
            .bridge
            .register(move |settlement| xhr.complete(seq, settlement));

        self.shared.lock().state = XhrState::Sent {
            request: request.clone(),
            seq,
            handle,
        };

        let descriptor = RequestDescriptor::xhr(request.method, request.url, body, headers, handle);
        if let Err(error) = self.bridge.send(&descriptor) {
            let _ = self
                .bridge
                .fail(handle, Error::transport(error.to_string()));
            return Err(error);
        }
        self.bridge.start_deadline(handle);
        Ok(())
    }

    /// `abort()`
    ///
    /// A sent request fires `readystatechange`, `abort` and `loadend` at
    /// ready state 4, then drops back to `Unsent`.
    pub fn abort(&self) {
        let pending = {
            let mut shared = self.shared.lock();
            match &shared.state {
                XhrState::Sent { handle, .. } => Some(*handle),
                _ => {
                    shared.state = XhrState::Unsent;
                    None
                }
            }
        };

        if let Some(handle) = pending {
            let _ = self.bridge.fail(handle, Error::Aborted);
        }
    }

    /// `addEventListener(type, listener)`
    pub fn add_event_listener<F>(&self, kind: XhrEventKind, listener: F)
    where
        F: Fn(&XhrEvent) + Send + Sync + 'static,
    {
        self.shared.lock().listeners.push((kind, Arc::new(listener)));
    }

    /// `onload = listener`
    pub fn on_load<F>(&self, listener: F)
    where
        F: Fn(&XhrEvent) + Send + Sync + 'static,
    {
        self.add_event_listener(XhrEventKind::Load, listener);
    }

    /// `readyState`
    pub fn ready_state(&self) -> ReadyState {
        match self.shared.lock().state {
            XhrState::Unsent => ReadyState::Unsent,
            XhrState::Opened(_) | XhrState::Sent { .. } => ReadyState::Opened,
            XhrState::Done { .. } | XhrState::Failed { .. } => ReadyState::Done,
        }
    }

    /// `status`: 0 until a response arrives, and after failures
    pub fn status(&self) -> u16 {
        match &self.shared.lock().state {
            XhrState::Done { response, .. } => response.code,
            _ => 0,
        }
    }

    /// `responseText`
    pub fn response_text(&self) -> String {
        match &self.shared.lock().state {
            XhrState::Done { response, .. } => response.body.clone(),
            _ => String::new(),
        }
    }

    /// `response` (text response type)
    pub fn response(&self) -> String {
        self.response_text()
    }

    /// `getResponseHeader(name)`, case-insensitive
    pub fn get_response_header(&self, name: &str) -> Option<String> {
        match &self.shared.lock().state {
            XhrState::Done { response, .. } => response
                .headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.clone()),
            _ => None,
        }
    }

    /// `getAllResponseHeaders()`
    pub fn get_all_response_headers(&self) -> String {
        match &self.shared.lock().state {
            XhrState::Done { response, .. } => {
                let mut lines: Vec<String> = response
                    .headers
                    .iter()
                    .map(|(k, v)| format!("{}: {}\r\n", k.to_ascii_lowercase(), v))
                    .collect();
                lines.sort();
                lines.concat()
            }
            _ => String::new(),
        }
    }

    /// URL passed to `open`
    pub fn url(&self) -> Option<String> {
        self.shared.lock().state.request().map(|r| r.url.clone())
    }

    /// Why the request failed, if it did
    pub fn error(&self) -> Option<String> {
        match &self.shared.lock().state {
            XhrState::Failed { error, .. } => Some(error.clone()),
            _ => None,
        }
    }

    /// Handle of the in-flight request, if one is awaiting the host
    pub fn callback_handle(&self) -> Option<CallbackHandle> {
        match self.shared.lock().state {
            XhrState::Sent { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Snapshot of the headers the next send will carry
    pub fn request_headers(&self) -> HeaderMap {
        self.headers.lock().clone()
    }

    fn complete(&self, seq: u64, settlement: Settlement) {
        let (terminal, status, listeners) = {
            let mut shared = self.shared.lock();
            let request = match std::mem::replace(&mut shared.state, XhrState::Unsent) {
                XhrState::Sent {
                    request,
                    seq: current,
                    ..
                } if current == seq => request,
                other => {
                    shared.state = other;
                    tracing::debug!(seq, "Ignoring settlement for superseded XHR send");
                    return;
                }
            };

            let outcome = settlement.and_then(XhrResponse::from_payload);
            let (state, terminal, status) = match outcome {
                Ok(response) => {
                    let status = response.code;
                    (XhrState::Done { request, response }, XhrEventKind::Load, status)
                }
                Err(error) => {
                    let terminal = match error {
                        Error::Timeout { .. } => XhrEventKind::Timeout,
                        Error::Aborted => XhrEventKind::Abort,
                        _ => XhrEventKind::Error,
                    };
                    tracing::debug!(url = %request.url, error = %error, "XHR failed");
                    let state = XhrState::Failed {
                        request,
                        error: error.to_string(),
                    };
                    (state, terminal, 0)
                }
            };

            shared.state = state;
            let listeners = shared.listeners.clone();
            (terminal, status, listeners)
        };

        for kind in [XhrEventKind::ReadyStateChange, terminal, XhrEventKind::LoadEnd] {
            dispatch(&listeners, kind, ReadyState::Done, status);
        }

        if terminal == XhrEventKind::Abort {
            let mut shared = self.shared.lock();
            // Listeners may have reopened the request
            if shared.seq == seq && matches!(shared.state, XhrState::Failed { .. }) {
                shared.state = XhrState::Unsent;
            }
        }
    }
}

fn dispatch(
    listeners: &[(XhrEventKind, Listener)],
    kind: XhrEventKind,
    ready_state: ReadyState,
    status: u16,
) {
    let event = XhrEvent {
        kind,
        ready_state,
        status,
    };
    for (_, listener) in listeners.iter().filter(|(k, _)| *k == kind) {
        listener(&event);
    }
}

impl std::fmt::Debug for XmlHttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlHttpRequest")
            .field("ready_state", &self.ready_state())
            .field("status", &self.status())
            .field("url", &self.url())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{recording_bridge as test_bridge, BridgeConfig};
    use serde_json::json;
    use std::time::Duration;

    fn count(xhr: &XmlHttpRequest, kind: XhrEventKind) -> Arc<Mutex<Vec<XhrEvent>>> {
        let seen: Arc<Mutex<Vec<XhrEvent>>> = Arc::default();
        let sink = seen.clone();
        xhr.add_event_listener(kind, move |event| sink.lock().push(event.clone()));
        seen
    }

    #[test]
    fn test_get_with_header_completes_with_load() {
        let (bridge, sent) = test_bridge(BridgeConfig::default());
        let xhr = XmlHttpRequest::with_bridge(bridge.clone());
        let loads = count(&xhr, XhrEventKind::Load);

        xhr.open("GET", "/a");
        xhr.set_request_header("X", "1").unwrap();
        xhr.send(None).unwrap();
        assert_eq!(xhr.ready_state(), ReadyState::Opened);

        let request = RequestDescriptor::from_json(&sent.lock()[0]).unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "/a");
        assert_eq!(request.headers().unwrap().get("X").map(String::as_str), Some("1"));

        bridge
            .deliver(request.handle, json!({"code": 200, "body": "hi"}))
            .unwrap();

        assert_eq!(xhr.ready_state(), ReadyState::Done);
        assert_eq!(xhr.status(), 200);
        assert_eq!(xhr.response_text(), "hi");
        assert_eq!(xhr.response(), "hi");

        let loads = loads.lock();
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].status, 200);
        assert_eq!(loads[0].ready_state, ReadyState::Done);
    }

    #[test]
    fn test_event_order() {
        let (bridge, _) = test_bridge(BridgeConfig::default());
        let xhr = XmlHttpRequest::with_bridge(bridge.clone());
        let order: Arc<Mutex<Vec<(&'static str, u8)>>> = Arc::default();
        for kind in [
            XhrEventKind::LoadEnd,
            XhrEventKind::Load,
            XhrEventKind::ReadyStateChange,
        ] {
            let sink = order.clone();
            xhr.add_event_listener(kind, move |event| {
                sink.lock().push((event.kind.as_str(), event.ready_state.as_u8()))
            });
        }

        xhr.open("GET", "/");
        xhr.send(None).unwrap();
        bridge
            .deliver(
                xhr.callback_handle().unwrap(),
                json!({"code": 204, "body": ""}),
            )
            .unwrap();

        assert_eq!(
            *order.lock(),
            vec![
                ("readystatechange", 1),
                ("readystatechange", 4),
                ("load", 4),
                ("loadend", 4)
            ]
        );
    }

    #[test]
    fn test_open_fires_readystatechange_once() {
        let (bridge, _) = test_bridge(BridgeConfig::default());
        let xhr = XmlHttpRequest::with_bridge(bridge);
        let changes = count(&xhr, XhrEventKind::ReadyStateChange);

        xhr.open("GET", "/a");
        xhr.open("GET", "/b");
        xhr.send(None).unwrap();
        xhr.open("GET", "/c");

        let changes = changes.lock();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].ready_state, ReadyState::Opened);
    }

    #[test]
    fn test_response_headers() {
        let (bridge, _) = test_bridge(BridgeConfig::default());
        let xhr = XmlHttpRequest::with_bridge(bridge.clone());
        xhr.open("GET", "/h");
        xhr.send(None).unwrap();

        let mut response = XhrResponse::new(200, "{}");
        response
            .headers
            .insert("Content-Type".into(), "application/json".into());
        bridge
            .deliver(xhr.callback_handle().unwrap(), response.into_payload())
            .unwrap();

        assert_eq!(
            xhr.get_response_header("content-type").as_deref(),
            Some("application/json")
        );
        assert_eq!(
            xhr.get_all_response_headers(),
            "content-type: application/json\r\n"
        );
    }

    #[test]
    fn test_malformed_payload_fires_error() {
        let (bridge, _) = test_bridge(BridgeConfig::default());
        let xhr = XmlHttpRequest::with_bridge(bridge.clone());
        let errors = count(&xhr, XhrEventKind::Error);
        let loads = count(&xhr, XhrEventKind::Load);

        xhr.open("GET", "/bad");
        xhr.send(None).unwrap();
        bridge
            .deliver(xhr.callback_handle().unwrap(), json!("not an object"))
            .unwrap();

        assert_eq!(errors.lock().len(), 1);
        assert!(loads.lock().is_empty());
        assert_eq!(xhr.status(), 0);
        assert_eq!(xhr.ready_state(), ReadyState::Done);
        assert!(xhr.error().is_some());
    }

    #[test]
    fn test_abort_frees_handle() {
        let (bridge, _) = test_bridge(BridgeConfig::default());
        let xhr = XmlHttpRequest::with_bridge(bridge.clone());
        let aborts = count(&xhr, XhrEventKind::Abort);
        let ends = count(&xhr, XhrEventKind::LoadEnd);

        xhr.open("POST", "/slow");
        xhr.send(Some("payload".into())).unwrap();
        let handle = xhr.callback_handle().unwrap();
        xhr.abort();

        assert_eq!(aborts.lock().len(), 1);
        assert_eq!(aborts.lock()[0].ready_state, ReadyState::Done);
        assert_eq!(ends.lock().len(), 1);
        assert_eq!(xhr.ready_state(), ReadyState::Unsent);
        assert_eq!(xhr.status(), 0);
        assert_eq!(bridge.pending(), 0);
        assert!(bridge
            .deliver(handle, json!({"code": 200, "body": ""}))
            .unwrap_err()
            .is_desync());
    }

    #[test]
    fn test_reopen_ignores_old_response() {
        let (bridge, _) = test_bridge(BridgeConfig::default());
        let xhr = XmlHttpRequest::with_bridge(bridge.clone());
        let loads = count(&xhr, XhrEventKind::Load);
        let aborts = count(&xhr, XhrEventKind::Abort);

        xhr.open("GET", "/first");
        xhr.send(None).unwrap();
        xhr.open("GET", "/second");

        assert!(aborts.lock().is_empty());
        assert_eq!(xhr.ready_state(), ReadyState::Opened);
        assert_eq!(bridge.pending(), 0);

        xhr.send(None).unwrap();
        bridge
            .deliver(xhr.callback_handle().unwrap(), json!({"code": 200, "body": "2"}))
            .unwrap();
        assert_eq!(loads.lock().len(), 1);
        assert_eq!(xhr.response_text(), "2");
    }

    #[test]
    fn test_state_errors() {
        let (bridge, _) = test_bridge(BridgeConfig::default());
        let xhr = XmlHttpRequest::with_bridge(bridge);

        assert!(xhr.set_request_header("X", "1").is_err());
        assert!(xhr.send(None).is_err());

        xhr.open("GET", "/");
        xhr.send(None).unwrap();
        assert!(xhr.send(None).is_err());
        assert!(xhr.set_request_header("X", "1").is_err());
    }

    #[test]
    fn test_transport_failure_fires_error() {
        let bridge = HostBridge::new(
            |_: String| -> Result<()> { Err(Error::transport("host gone")) },
            BridgeConfig::default(),
        );
        let xhr = XmlHttpRequest::with_bridge(bridge.clone());
        let errors = count(&xhr, XhrEventKind::Error);

        xhr.open("GET", "/");
        assert!(xhr.send(None).is_err());
        assert_eq!(errors.lock().len(), 1);
        assert_eq!(bridge.pending(), 0);
    }

    #[tokio::test]
    async fn test_timeout_fires_timeout_event() {
        let (bridge, _) = test_bridge(
            BridgeConfig::default().request_timeout(Duration::from_millis(10)),
        );
        let xhr = XmlHttpRequest::with_bridge(bridge.clone());
        let (tx, rx) = tokio::sync::oneshot::channel();
        let tx = Mutex::new(Some(tx));
        xhr.add_event_listener(XhrEventKind::Timeout, move |event| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(event.clone());
            }
        });

        xhr.open("GET", "/never");
        xhr.send(None).unwrap();

        let event = rx.await.unwrap();
        assert_eq!(event.status, 0);
        assert_eq!(xhr.ready_state(), ReadyState::Done);
        assert_eq!(bridge.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_zero_deadline_never_strands_a_send() {
        let (bridge, _) = test_bridge(BridgeConfig::default().request_timeout(Duration::ZERO));
        let (tx, mut ends) = tokio::sync::mpsc::unbounded_channel();

        let xhrs: Vec<_> = (0..2000)
            .map(|_| {
                let xhr = XmlHttpRequest::with_bridge(bridge.clone());
                let tx = tx.clone();
                xhr.add_event_listener(XhrEventKind::LoadEnd, move |event| {
                    let _ = tx.send(event.clone());
                });
                xhr.open("GET", "/a");
                xhr.send(None).unwrap();
                xhr
            })
            .collect();

        for _ in 0..xhrs.len() {
            let event = tokio::time::timeout(Duration::from_secs(5), ends.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(event.ready_state, ReadyState::Done);
        }

        assert_eq!(bridge.pending(), 0);
        let stranded = xhrs
            .iter()
            .filter(|xhr| xhr.ready_state() != ReadyState::Done)
            .count();
        assert_eq!(stranded, 0);
        assert!(xhrs.iter().all(|xhr| xhr.error().is_some()));
    }

    #[test]
    fn test_event_names() {
        for kind in [
            XhrEventKind::ReadyStateChange,
            XhrEventKind::Load,
            XhrEventKind::LoadEnd,
            XhrEventKind::Error,
            XhrEventKind::Timeout,
            XhrEventKind::Abort,
        ] {
            assert_eq!(XhrEventKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(XhrEventKind::from_name("progress"), None);
    }
}
