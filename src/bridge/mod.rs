// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Page/host correlation protocol
//!
//! Every captured request is registered under a [`CallbackHandle`], posted to
//! the host as JSON, and settled exactly once when the host answers, the
//! deadline passes, or page code aborts it.

mod config;
mod decode;
mod host;
mod message;
mod registry;

pub use config::{BridgeConfig, HeaderScope};
pub use decode::{decode, encode};
pub use host::{ChannelTransport, HostBridge, HostTransport, Settlement, WeakHostBridge};
#[cfg(test)]
pub(crate) use host::recording_bridge;
pub use message::{
    fetch_payload_text, HeaderMap, HostDelivery, RequestDescriptor, RequestKind, XhrFields,
    XhrResponse, FETCH_METHOD,
};
pub use registry::{CallbackHandle, CallbackRegistry, Continuation};
