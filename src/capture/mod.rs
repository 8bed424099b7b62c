// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request capture
//!
//! Work-alikes for the two page networking entry points, `XMLHttpRequest` and
//! `fetch`, that route every request through the [`HostBridge`].

mod fetch;
mod xhr;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::bridge::{HeaderMap, HeaderScope, HostBridge};

pub use fetch::PendingFetch;
pub use xhr::{Listener, ReadyState, XhrEvent, XhrEventKind, XmlHttpRequest};

/// Entry point page code goes through instead of the platform APIs
///
/// With [`HeaderScope::Shared`], every XHR made here shares one header map.
#[derive(Clone)]
pub struct Interceptor {
    bridge: HostBridge,
    shared_headers: Arc<Mutex<HeaderMap>>,
}

impl Interceptor {
    /// Create an interceptor over a bridge
    pub fn new(bridge: HostBridge) -> Self {
        Self {
            bridge,
            shared_headers: Arc::default(),
        }
    }

    pub fn bridge(&self) -> &HostBridge {
        &self.bridge
    }

    /// `new XMLHttpRequest()`
    pub fn xml_http_request(&self) -> XmlHttpRequest {
        let headers = match self.bridge.config().header_scope {
            HeaderScope::Shared => self.shared_headers.clone(),
            HeaderScope::PerRequest => Arc::default(),
        };
        XmlHttpRequest::new(self.bridge.clone(), headers)
    }

    /// `fetch(url)`
    pub fn fetch(&self, url: impl Into<String>) -> PendingFetch {
        PendingFetch::start(&self.bridge, url.into())
    }
}
