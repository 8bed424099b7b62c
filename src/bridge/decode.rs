// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Binary body decoding for the fetch path

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use crate::error::Result;

/// Decode a standard (padded) base64 body into a byte buffer
pub fn decode(encoded: &str) -> Result<Bytes> {
    Ok(Bytes::from(STANDARD.decode(encoded)?))
}

/// Encode a body the way the host is expected to
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}
