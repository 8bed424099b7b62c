// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Wire messages exchanged with the native host

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::registry::CallbackHandle;
use crate::error::{Error, Result};

/// Method marker carried by fetch-style requests
pub const FETCH_METHOD: &str = "fetch";

/// Header name to value, last write wins
pub type HeaderMap = BTreeMap<String, String>;

/// Outbound request, serialized whole and posted to the host
///
/// XHR requests carry `body` (possibly `null`) and `headers`; fetch requests
/// carry neither and use [`FETCH_METHOD`] as their method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub method: String,
    pub url: String,
    #[serde(flatten)]
    pub handle: CallbackHandle,
    #[serde(flatten)]
    pub xhr: Option<XhrFields>,
}

/// Fields only XHR requests carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XhrFields {
    pub body: Option<String>,
    pub headers: HeaderMap,
}

/// Which page entry point produced a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Xhr,
    Fetch,
}

impl RequestDescriptor {
    /// Descriptor for an XHR send
    pub fn xhr(
        method: impl Into<String>,
        url: impl Into<String>,
        body: Option<String>,
        headers: HeaderMap,
        handle: CallbackHandle,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            handle,
            xhr: Some(XhrFields { body, headers }),
        }
    }

    /// Descriptor for a fetch call
    pub fn fetch(url: impl Into<String>, handle: CallbackHandle) -> Self {
        Self {
            method: FETCH_METHOD.to_string(),
            url: url.into(),
            handle,
            xhr: None,
        }
    }

    pub fn kind(&self) -> RequestKind {
        if self.xhr.is_none() && self.method == FETCH_METHOD {
            RequestKind::Fetch
        } else {
            RequestKind::Xhr
        }
    }

    pub fn body(&self) -> Option<&str> {
        self.xhr.as_ref().and_then(|x| x.body.as_deref())
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        self.xhr.as_ref().map(|x| &x.headers)
    }

    /// Encode for the host channel
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a message posted by the page
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Inbound message: the host answering one pending request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostDelivery {
    #[serde(flatten)]
    pub handle: CallbackHandle,
    pub payload: serde_json::Value,
}

impl HostDelivery {
    pub fn new(handle: CallbackHandle, payload: serde_json::Value) -> Self {
        Self { handle, payload }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Payload shape for the XHR path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XhrResponse {
    pub code: u16,
    pub body: String,
    #[serde(default)]
    pub headers: HeaderMap,
}

impl XhrResponse {
    pub fn new(code: u16, body: impl Into<String>) -> Self {
        Self {
            code,
            body: body.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn from_payload(payload: serde_json::Value) -> Result<Self> {
        serde_json::from_value(payload)
            .map_err(|e| Error::payload(format!("expected {{code, body}}: {}", e)))
    }

    pub fn into_payload(self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code,
            "body": self.body,
            "headers": self.headers,
        })
    }
}

/// Extract the base64 text a fetch response travels as
pub fn fetch_payload_text(payload: serde_json::Value) -> Result<String> {
    match payload {
        serde_json::Value::String(text) => Ok(text),
        other => Err(Error::payload(format!(
            "expected base64 string, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
