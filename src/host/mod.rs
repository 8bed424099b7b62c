// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Host side of the bridge
//!
//! Reads requests the page posted, produces responses, and delivers them back.
//! [`StaticFileHost`] serves bundled assets the way an app shell would.

mod files;
mod handler;

pub use files::{content_type, StaticFileHost, DEFAULT_BASE_URL};
pub use handler::{run_host, HostResponse, RequestHandler, HANDLER_FAILURE_STATUS};
