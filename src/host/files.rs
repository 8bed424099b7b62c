// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Host that answers captured requests from a directory of bundled assets

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use url::Url;

use super::handler::{HostResponse, RequestHandler};
use crate::bridge::RequestDescriptor;
use crate::error::Result;

/// Base the page's relative URLs are resolved against
pub const DEFAULT_BASE_URL: &str = "app://localhost/";

/// Serves page requests from a static directory
#[derive(Debug, Clone)]
pub struct StaticFileHost {
    root: PathBuf,
    base: Url,
}

impl StaticFileHost {
    /// Serve files under `root`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_base(root, DEFAULT_BASE_URL)
    }

    /// Serve files under `root`, resolving page URLs against `base`
    pub fn with_base(root: impl Into<PathBuf>, base: &str) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            base: Url::parse(base)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a page URL to a file under the root
    ///
    /// `/` maps to `index.html`. Segments are percent-decoded; `None` means a
    /// decoded segment is not a plain file name (`..`, a separator, invalid
    /// UTF-8) and the request cannot be served.
    pub fn resolve(&self, url: &str) -> Result<Option<PathBuf>> {
        let url = self.base.join(url)?;
        let mut path = self.root.clone();
        for segment in url.path_segments().into_iter().flatten() {
            if segment.is_empty() {
                continue;
            }
            let Ok(decoded) = percent_decode_str(segment).decode_utf8() else {
                return Ok(None);
            };
            if !is_plain_name(&decoded) {
                return Ok(None);
            }
            path.push(&*decoded);
        }
        if url.path().ends_with('/') {
            path.push("index.html");
        }
        Ok(Some(path))
    }
}

#[async_trait]
impl RequestHandler for StaticFileHost {
    async fn handle(&self, request: &RequestDescriptor) -> Result<HostResponse> {
        let Some(path) = self.resolve(&request.url)? else {
            tracing::debug!(url = %request.url, "Rejected asset path");
            return Ok(HostResponse::not_found());
        };
        match tokio::fs::read(&path).await {
            Ok(content) => {
                Ok(HostResponse::ok(content).header("Content-Type", content_type(&path)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Asset not found");
                Ok(HostResponse::not_found())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn is_plain_name(segment: &str) -> bool {
    segment != "." && segment != ".." && !segment.contains(['/', '\\', '\0'])
}

/// Content type by file extension
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=UTF-8",
        Some("js") | Some("mjs") => "text/javascript; charset=UTF-8",
        Some("css") => "text/css; charset=UTF-8",
        Some("json") => "application/json",
        Some("wasm") => "application/wasm",
        Some("ico") => "image/x-icon",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("woff2") => "font/woff2",
        Some("txt") | Some("md") => "text/plain; charset=UTF-8",
        _ => "application/octet-stream",
    }
}
