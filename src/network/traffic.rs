// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Bounded log of page traffic seen by the bridge

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use super::event::{Exchange, ExchangeOutcome};
use crate::bridge::{CallbackHandle, RequestDescriptor, RequestKind};

/// Traffic log shared between the bridge and host-side observers
#[derive(Clone)]
pub struct TrafficLog {
    entries: Arc<RwLock<VecDeque<Exchange>>>,
    max_entries: usize,
    capture_bodies: bool,
}

impl TrafficLog {
    /// Create a new traffic log
    pub fn new(max_entries: usize, capture_bodies: bool) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            max_entries,
            capture_bodies,
        }
    }

    /// Record a request posted to the host
    pub fn record_request(&self, request: &RequestDescriptor) {
        if self.max_entries == 0 {
            return;
        }
        let mut entries = self.entries.write();
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(Exchange::from_request(request, self.capture_bodies));
    }

    /// Record how a request was settled
    pub fn record_settlement(&self, handle: CallbackHandle, outcome: ExchangeOutcome) {
        let mut entries = self.entries.write();
        // Handles are reused, so only the newest pending entry matches
        if let Some(exchange) = entries
            .iter_mut()
            .rev()
            .find(|e| e.handle == handle && e.is_pending())
        {
            exchange.settle(outcome);
        }
    }

    /// Get all exchanges, oldest first
    pub fn entries(&self) -> Vec<Exchange> {
        self.entries.read().iter().cloned().collect()
    }

    /// Get exchanges from one entry point
    pub fn by_kind(&self, kind: RequestKind) -> Vec<Exchange> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Get exchanges still awaiting the host
    pub fn pending(&self) -> Vec<Exchange> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.is_pending())
            .cloned()
            .collect()
    }

    /// Get exchanges that settled with an error
    pub fn failed(&self) -> Vec<Exchange> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.is_failed())
            .cloned()
            .collect()
    }

    /// Get unique requested URLs
    pub fn unique_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.entries.read().iter().map(|e| e.url.clone()).collect();
        urls.sort();
        urls.dedup();
        urls
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Export as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.entries())
    }
}
