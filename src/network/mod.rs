// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Traffic observation
//!
//! Records every request the page posts to the host and how it settled.

mod event;
mod traffic;

pub use event::{Exchange, ExchangeOutcome};
pub use traffic::TrafficLog;
