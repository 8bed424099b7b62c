// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Host bridge: posts requests to the native host and routes its answers
//! back to the continuation waiting for them.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use super::config::BridgeConfig;
use super::message::{HostDelivery, RequestDescriptor};
use super::registry::{CallbackHandle, CallbackRegistry};
use crate::error::{Error, Result};
use crate::network::{ExchangeOutcome, TrafficLog};

/// What a continuation receives: the host payload, or why there is none
pub type Settlement = Result<serde_json::Value>;

/// Outbound half of the host message channel
///
/// Implemented by whatever the embedding shell exposes, e.g. a webview
/// `postMessage` handler. Closures work too:
///
/// ```rust
/// use pagewire::{BridgeConfig, HostBridge};
///
/// let bridge = HostBridge::new(
///     |message: String| -> pagewire::Result<()> {
///         println!("to host: {}", message);
///         Ok(())
///     },
///     BridgeConfig::default(),
/// );
/// assert_eq!(bridge.pending(), 0);
/// ```
pub trait HostTransport: Send + Sync {
    /// Hand one encoded message to the host
    fn post_message(&self, message: String) -> Result<()>;
}

impl<F> HostTransport for F
where
    F: Fn(String) -> Result<()> + Send + Sync,
{
    fn post_message(&self, message: String) -> Result<()> {
        self(message)
    }
}

/// Transport backed by an unbounded tokio channel
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    /// Create a transport and the receiver the host reads from
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl HostTransport for ChannelTransport {
    fn post_message(&self, message: String) -> Result<()> {
        self.tx.send(message).map_err(|_| Error::BridgeClosed)
    }
}

struct BridgeInner {
    config: BridgeConfig,
    registry: Mutex<CallbackRegistry<Settlement>>,
    transport: Box<dyn HostTransport>,
    /// Armed request deadlines, aborted on settlement
    deadlines: Mutex<HashMap<CallbackHandle, AbortHandle>>,
    traffic: TrafficLog,
}

/// Page side of the host message channel
#[derive(Clone)]
pub struct HostBridge {
    inner: Arc<BridgeInner>,
}

impl HostBridge {
    /// Create a bridge over a transport
    pub fn new<T: HostTransport + 'static>(transport: T, config: BridgeConfig) -> Self {
        let traffic = TrafficLog::new(config.max_log_entries, config.capture_bodies);
        Self {
            inner: Arc::new(BridgeInner {
                config,
                registry: Mutex::new(CallbackRegistry::new()),
                transport: Box::new(transport),
                deadlines: Mutex::new(HashMap::new()),
                traffic,
            }),
        }
    }

    /// Create a bridge over a tokio channel
    pub fn with_channel(config: BridgeConfig) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (transport, rx) = ChannelTransport::new();
        (Self::new(transport, config), rx)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Traffic seen by this bridge
    pub fn traffic(&self) -> &TrafficLog {
        &self.inner.traffic
    }

    /// Register a continuation
    ///
    /// The deadline is not armed until [`HostBridge::start_deadline`], so the
    /// caller can record the handle and post the request first.
    pub fn register<F>(&self, continuation: F) -> CallbackHandle
    where
        F: FnOnce(Settlement) + Send + 'static,
    {
        let handle = self.inner.registry.lock().register(Box::new(continuation));
        tracing::trace!(
            callback_id = handle.callback_id,
            generation = handle.generation,
            "Registered continuation"
        );
        handle
    }

    /// Serialize a request and post it to the host
    pub fn send(&self, request: &RequestDescriptor) -> Result<()> {
        let message = request.to_json()?;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            callback_id = request.handle.callback_id,
            "Posting request to host"
        );
        self.inner.traffic.record_request(request);
        self.inner.transport.post_message(message)
    }

    /// Host entry point: answer the request registered under `handle`
    ///
    /// Deliveries that match no pending request (unknown id, reused slot,
    /// already settled) are rejected and logged. With
    /// [`BridgeConfig::trap_desync`] they panic.
    pub fn deliver(&self, handle: CallbackHandle, payload: serde_json::Value) -> Result<()> {
        self.settle(handle, Ok(payload))
            .map_err(|error| self.reject_desync(handle, error))
    }

    /// Host entry point taking an encoded [`HostDelivery`]
    pub fn deliver_message(&self, message: &str) -> Result<()> {
        let delivery: HostDelivery = serde_json::from_str(message)?;
        self.deliver(delivery.handle, delivery.payload)
    }

    /// Settle a pending request with an error and free its handle
    pub fn fail(&self, handle: CallbackHandle, error: Error) -> Result<()> {
        self.settle(handle, Err(error))
    }

    /// Handle that does not keep the bridge alive
    pub fn downgrade(&self) -> WeakHostBridge {
        WeakHostBridge {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of requests awaiting the host
    pub fn pending(&self) -> usize {
        self.inner.registry.lock().pending()
    }

    pub fn is_pending(&self, handle: CallbackHandle) -> bool {
        self.inner.registry.lock().is_pending(handle)
    }

    fn settle(&self, handle: CallbackHandle, settlement: Settlement) -> Result<()> {
        let continuation = self.inner.registry.lock().take(handle)?;

        if let Some(deadline) = self.inner.deadlines.lock().remove(&handle) {
            deadline.abort();
        }

        let outcome = match &settlement {
            Ok(_) => ExchangeOutcome::Delivered,
            Err(error) => ExchangeOutcome::Failed(error.to_string()),
        };
        self.inner.traffic.record_settlement(handle, outcome);

        // No lock held: continuations may issue new requests
        continuation(settlement);

        self.inner.registry.lock().release(handle)
    }

    fn reject_desync(&self, handle: CallbackHandle, error: Error) -> Error {
        tracing::error!(
            callback_id = handle.callback_id,
            generation = handle.generation,
            error = %error,
            "Host delivery does not match a pending request"
        );
        if self.inner.config.trap_desync {
            panic!("host bridge desynchronized: {}", error);
        }
        error
    }

    /// Fail `handle` with [`Error::Timeout`] if the host has not answered
    /// within [`BridgeConfig::request_timeout`]
    ///
    /// Call once the request has been posted. Does nothing without a
    /// configured timeout, without a current tokio runtime, or when the
    /// handle is already settled.
    pub fn start_deadline(&self, handle: CallbackHandle) {
        let Some(timeout) = self.inner.config.request_timeout else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::trace!(
                callback_id = handle.callback_id,
                "No tokio runtime, request deadline not armed"
            );
            return;
        };
        if !self.is_pending(handle) {
            return;
        }

        let bridge = self.downgrade();
        let task = runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            let Some(bridge) = bridge.upgrade() else {
                return;
            };
            let duration_ms = timeout.as_millis() as u64;
            tracing::warn!(
                callback_id = handle.callback_id,
                duration_ms,
                "Host never answered, failing request"
            );
            let _ = bridge.fail(handle, Error::timeout(handle.callback_id, duration_ms));
        });

        self.inner
            .deadlines
            .lock()
            .insert(handle, task.abort_handle());

        // Settled while the task was being armed
        if !self.is_pending(handle) {
            if let Some(deadline) = self.inner.deadlines.lock().remove(&handle) {
                deadline.abort();
            }
        }
    }
}

/// Non-owning [`HostBridge`] handle
#[derive(Clone)]
pub struct WeakHostBridge {
    inner: Weak<BridgeInner>,
}

impl WeakHostBridge {
    /// Get the bridge back if it is still alive
    pub fn upgrade(&self) -> Option<HostBridge> {
        self.inner.upgrade().map(|inner| HostBridge { inner })
    }
}

impl std::fmt::Debug for HostBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBridge")
            .field("config", &self.inner.config)
            .field("pending", &self.pending())
            .finish()
    }
}

/// Bridge whose transport records every posted message
#[cfg(test)]
pub(crate) fn recording_bridge(config: BridgeConfig) -> (HostBridge, Arc<Mutex<Vec<String>>>) {
    let sent: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = sent.clone();
    let bridge = HostBridge::new(
        move |message: String| -> Result<()> {
            sink.lock().push(message);
            Ok(())
        },
        config,
    );
    (bridge, sent)
}
