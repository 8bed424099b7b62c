// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Bridge configuration

use std::time::Duration;

/// How XHR request headers are scoped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderScope {
    /// Each XHR object keeps its own headers, cleared on `open`
    #[default]
    PerRequest,
    /// Every XHR created by one interceptor shares a single header map that
    /// is never cleared. Matches legacy page shims that kept headers in a
    /// closure-level object.
    Shared,
}

/// Host bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Deadline for the host to answer a request (None = wait forever)
    pub request_timeout: Option<Duration>,
    /// XHR header scoping
    pub header_scope: HeaderScope,
    /// Maximum exchanges kept in the traffic log
    pub max_log_entries: usize,
    /// Keep request bodies in the traffic log
    pub capture_bodies: bool,
    /// Panic on deliveries to unknown or settled handles
    pub trap_desync: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            header_scope: HeaderScope::default(),
            max_log_entries: 1000,
            capture_bodies: true,
            trap_desync: false,
        }
    }
}

impl BridgeConfig {
    /// Create a new bridge config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-request deadline
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Never time requests out
    pub fn no_timeout(mut self) -> Self {
        self.request_timeout = None;
        self
    }

    /// Set XHR header scoping
    pub fn header_scope(mut self, scope: HeaderScope) -> Self {
        self.header_scope = scope;
        self
    }

    /// Set max traffic log entries
    pub fn max_log_entries(mut self, max: usize) -> Self {
        self.max_log_entries = max;
        self
    }

    /// Keep or drop request bodies in the traffic log
    pub fn capture_bodies(mut self, capture: bool) -> Self {
        self.capture_bodies = capture;
        self
    }

    /// Panic instead of returning an error on desynchronized deliveries
    pub fn trap_desync(mut self, trap: bool) -> Self {
        self.trap_desync = trap;
        self
    }

    /// Config reproducing legacy page shim behavior: shared headers, no deadline
    pub fn legacy() -> Self {
        Self {
            request_timeout: None,
            header_scope: HeaderScope::Shared,
            ..Default::default()
        }
    }

    /// Config for development builds: desync panics
    pub fn strict() -> Self {
        Self {
            trap_desync: true,
            ..Default::default()
        }
    }
}
