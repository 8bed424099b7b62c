// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Promise-style capture: `fetch(url)` answered by the host with a base64 body

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::bridge::{decode, fetch_payload_text, CallbackHandle, HostBridge, RequestDescriptor};
use crate::error::{Error, Result};

/// A fetch awaiting the host
///
/// The request is already posted when this value is created; awaiting it
/// only waits for the answer. Resolves with the decoded body, or rejects on
/// a malformed payload, timeout, or transport failure.
#[must_use = "the response is only observable by awaiting the fetch"]
pub struct PendingFetch {
    url: String,
    handle: CallbackHandle,
    rx: oneshot::Receiver<Result<Bytes>>,
}

impl PendingFetch {
    pub(crate) fn start(bridge: &HostBridge, url: String) -> Self {
        let (tx, rx) = oneshot::channel();
        let handle = bridge.register(move |settlement| {
            let result = settlement
                .and_then(fetch_payload_text)
                .and_then(|text| decode(&text));
            // Caller may have dropped the fetch
            let _ = tx.send(result);
        });

        let request = RequestDescriptor::fetch(url.clone(), handle);
        match bridge.send(&request) {
            Ok(()) => bridge.start_deadline(handle),
            Err(error) => {
                tracing::warn!(url = %url, error = %error, "Failed to post fetch to host");
                let _ = bridge.fail(handle, error);
            }
        }

        Self { url, handle, rx }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Handle the host must answer
    pub fn handle(&self) -> CallbackHandle {
        self.handle
    }
}

impl Future for PendingFetch {
    type Output = Result<Bytes>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::BridgeClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for PendingFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFetch")
            .field("url", &self.url)
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{encode, recording_bridge, BridgeConfig, RequestKind};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolves_with_decoded_bytes() {
        let (bridge, sent) = recording_bridge(BridgeConfig::default());
        let fetch = PendingFetch::start(&bridge, "/b".to_string());

        let request = RequestDescriptor::from_json(&sent.lock()[0]).unwrap();
        assert_eq!(request.kind(), RequestKind::Fetch);
        assert_eq!(request.url, "/b");
        assert!(request.body().is_none());

        bridge.deliver(fetch.handle(), json!("aGk=")).unwrap();
        let body = fetch.await.unwrap();

        assert_eq!(body.len(), 2);
        assert_eq!(&body[..], b"hi");
    }

    #[test]
    fn test_pending_until_host_answers() {
        let (bridge, _) = recording_bridge(BridgeConfig::default().no_timeout());
        let fetch = PendingFetch::start(&bridge, "/b".to_string());
        let handle = fetch.handle();
        let mut fetch = tokio_test::task::spawn(fetch);

        tokio_test::assert_pending!(fetch.poll());
        bridge.deliver(handle, json!("aGk=")).unwrap();

        assert!(fetch.is_woken());
        let body = tokio_test::assert_ready_ok!(fetch.poll());
        assert_eq!(&body[..], b"hi");
    }

    #[tokio::test]
    async fn test_binary_body() {
        let (bridge, _) = recording_bridge(BridgeConfig::default());
        let wasm = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, 0xff, 0x80];
        let fetch = PendingFetch::start(&bridge, "/app.wasm".to_string());

        bridge.deliver(fetch.handle(), json!(encode(wasm))).unwrap();
        assert_eq!(&fetch.await.unwrap()[..], &wasm[..]);
    }

    #[tokio::test]
    async fn test_malformed_base64_rejects() {
        let (bridge, _) = recording_bridge(BridgeConfig::default());
        let fetch = PendingFetch::start(&bridge, "/b".to_string());

        bridge.deliver(fetch.handle(), json!("a!!!")).unwrap();
        let err = fetch.await.unwrap_err();

        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(bridge.pending(), 0);
    }

    #[tokio::test]
    async fn test_non_string_payload_rejects() {
        let (bridge, _) = recording_bridge(BridgeConfig::default());
        let fetch = PendingFetch::start(&bridge, "/b".to_string());

        bridge
            .deliver(fetch.handle(), json!({"code": 200, "body": "hi"}))
            .unwrap();
        assert!(matches!(fetch.await.unwrap_err(), Error::Payload(_)));
    }

    #[tokio::test]
    async fn test_timeout_rejects() {
        let (bridge, _) =
            recording_bridge(BridgeConfig::default().request_timeout(Duration::from_millis(10)));
        let fetch = PendingFetch::start(&bridge, "/never".to_string());

        assert!(fetch.await.unwrap_err().is_timeout());
        assert_eq!(bridge.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_zero_deadline_settles_every_logged_exchange() {
        let (bridge, _) = recording_bridge(
            BridgeConfig::default()
                .request_timeout(Duration::ZERO)
                .max_log_entries(4096),
        );

        let fetches: Vec<_> = (0..500)
            .map(|i| PendingFetch::start(&bridge, format!("/r{}", i)))
            .collect();
        for fetch in fetches {
            assert!(fetch.await.unwrap_err().is_timeout());
        }

        assert_eq!(bridge.pending(), 0);
        assert_eq!(bridge.traffic().len(), 500);
        assert!(bridge.traffic().pending().is_empty());
    }

    #[tokio::test]
    async fn test_closed_transport_rejects() {
        let (bridge, rx) = HostBridge::with_channel(BridgeConfig::default());
        drop(rx);

        let fetch = PendingFetch::start(&bridge, "/b".to_string());
        assert!(matches!(fetch.await.unwrap_err(), Error::BridgeClosed));
        assert_eq!(bridge.pending(), 0);
    }

    #[tokio::test]
    async fn test_dropped_bridge_rejects() {
        let (bridge, _) = recording_bridge(BridgeConfig::default().no_timeout());
        let fetch = PendingFetch::start(&bridge, "/b".to_string());
        drop(bridge);

        assert!(matches!(fetch.await.unwrap_err(), Error::BridgeClosed));
    }
}
