// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # pagewire - Page Network Interception Bridge
//!
//! Routes every request a hosted web page makes through the native host that
//! embeds it. Page code keeps using `XMLHttpRequest`- and `fetch`-shaped APIs;
//! each request is serialized and posted to the host, and the host's answer is
//! replayed so the caller cannot tell it apart from a network response.
//!
//! ## Features
//!
//! - Correlation registry: reusable callback ids with generation checks
//! - XHR work-alike: `open`/`setRequestHeader`/`send`, `load` events, aborts
//! - fetch work-alike: a future resolving to the decoded response bytes
//! - Per-request deadlines: unanswered requests fail instead of hanging
//! - Traffic log: every exchange the page made and how it ended
//! - Static file host: serve bundled assets through the bridge
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pagewire::{run_host, BridgeConfig, HostBridge, Interceptor, StaticFileHost};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (bridge, to_host) = HostBridge::with_channel(BridgeConfig::default());
//!     let host = Arc::new(StaticFileHost::new("./dist")?);
//!     tokio::spawn(run_host(bridge.downgrade(), to_host, host));
//!
//!     let page = Interceptor::new(bridge);
//!     let wasm = page.fetch("/pkg/client_bg.wasm").await?;
//!     println!("{} bytes", wasm.len());
//!
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod capture;
pub mod error;
pub mod host;
pub mod network;

// Re-exports for convenience

// Bridge
pub use bridge::{
    BridgeConfig, CallbackHandle, CallbackRegistry, ChannelTransport, HeaderScope, HostBridge,
    HostDelivery, HostTransport, RequestDescriptor, RequestKind, Settlement, WeakHostBridge,
    XhrResponse,
};

// Capture
pub use capture::{Interceptor, PendingFetch, ReadyState, XhrEvent, XhrEventKind, XmlHttpRequest};

// Errors
pub use error::{Error, Result};

// Host
pub use host::{run_host, HostResponse, RequestHandler, StaticFileHost};

// Network
pub use network::{Exchange, ExchangeOutcome, TrafficLog};

/// pagewire version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
