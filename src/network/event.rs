// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Captured exchange types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bridge::{CallbackHandle, HeaderMap, RequestDescriptor, RequestKind};

/// One page request and how it ended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    /// Handle the request was registered under
    pub handle: CallbackHandle,
    /// Entry point that issued it
    pub kind: RequestKind,
    /// Request method ("fetch" for fetch calls)
    pub method: String,
    /// Request URL as given by page code
    pub url: String,
    /// Request headers (XHR only)
    pub headers: HeaderMap,
    /// Request body, if captured
    pub body: Option<String>,
    /// When the request was posted to the host
    pub sent_at: DateTime<Utc>,
    /// When it was settled
    pub settled_at: Option<DateTime<Utc>>,
    /// Settlement, None while pending
    pub outcome: Option<ExchangeOutcome>,
}

/// How an exchange was settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeOutcome {
    /// Host delivered a payload
    Delivered,
    /// Settled with an error (timeout, abort, transport failure)
    Failed(String),
}

impl Exchange {
    /// Record a request at send time
    pub fn from_request(request: &RequestDescriptor, capture_body: bool) -> Self {
        Self {
            handle: request.handle,
            kind: request.kind(),
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers().cloned().unwrap_or_default(),
            body: if capture_body {
                request.body().map(String::from)
            } else {
                None
            },
            sent_at: Utc::now(),
            settled_at: None,
            outcome: None,
        }
    }

    /// Mark settled
    pub fn settle(&mut self, outcome: ExchangeOutcome) {
        self.settled_at = Some(Utc::now());
        self.outcome = Some(outcome);
    }

    pub fn is_pending(&self) -> bool {
        self.outcome.is_none()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Some(ExchangeOutcome::Failed(_)))
    }

    /// Time between send and settlement
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.settled_at.map(|settled| settled - self.sent_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_capture_toggle() {
        let request = RequestDescriptor::xhr(
            "POST",
            "/form",
            Some("a=1".into()),
            HeaderMap::new(),
            CallbackHandle::new(0, 0),
        );

        assert_eq!(Exchange::from_request(&request, true).body.as_deref(), Some("a=1"));
        assert!(Exchange::from_request(&request, false).body.is_none());
    }

    #[test]
    fn test_settle() {
        let request = RequestDescriptor::fetch("/app.wasm", CallbackHandle::new(1, 0));
        let mut exchange = Exchange::from_request(&request, true);
        assert!(exchange.is_pending());
        assert_eq!(exchange.kind, RequestKind::Fetch);

        exchange.settle(ExchangeOutcome::Failed("timeout".into()));
        assert!(exchange.is_failed());
        assert!(exchange.duration().is_some());
    }
}
