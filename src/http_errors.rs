// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP error code mapping to Kubernetes status condition reasons.
//!
//! This module maps HTTP status codes returned by the Cloudflare API to
//! standardized Kubernetes condition reasons, so failures surface consistently
//! in resource status regardless of which endpoint produced them.
//!
//! # Usage
//!
//! ```rust
//! use cloudflare_operator::http_errors::map_http_error_to_reason;
//!
//! let (reason, message) = map_http_error_to_reason(429);
//! assert_eq!(reason, "CloudflareRateLimited");
//!
//! let (reason, message) = map_http_error_to_reason(503);
//! assert_eq!(reason, "GatewayError");
//! ```

use crate::status_reasons::{
    REASON_CLOUDFLARE_AUTH_FAILED, REASON_CLOUDFLARE_BAD_REQUEST, REASON_CLOUDFLARE_CONFLICT,
    REASON_CLOUDFLARE_INTERNAL_ERROR, REASON_CLOUDFLARE_NOT_FOUND, REASON_CLOUDFLARE_RATE_LIMITED,
    REASON_CLOUDFLARE_UNREACHABLE, REASON_GATEWAY_ERROR,
};

/// Map an HTTP status code from the Cloudflare API to a condition reason and message.
///
/// # Arguments
///
/// * `status_code` - HTTP status code returned by Cloudflare
///
/// # Returns
///
/// A `(reason, message)` tuple. The reason is a `CamelCase` constant from
/// [`crate::status_reasons`]; the message always contains the numeric code.
#[must_use]
pub fn map_http_error_to_reason(status_code: u16) -> (&'static str, String) {
    match status_code {
        400 | 422 => (
            REASON_CLOUDFLARE_BAD_REQUEST,
            format!("Invalid request to Cloudflare API ({status_code})"),
        ),
        401 => (
            REASON_CLOUDFLARE_AUTH_FAILED,
            "Cloudflare authentication required (401)".into(),
        ),
        403 => (
            REASON_CLOUDFLARE_AUTH_FAILED,
            "Cloudflare API token lacks permission (403)".into(),
        ),
        404 => (
            REASON_CLOUDFLARE_NOT_FOUND,
            "Resource not found at Cloudflare (404)".into(),
        ),
        409 => (
            REASON_CLOUDFLARE_CONFLICT,
            "Conflicting resource at Cloudflare (409)".into(),
        ),
        429 => (
            REASON_CLOUDFLARE_RATE_LIMITED,
            "Cloudflare API rate limit exceeded (429)".into(),
        ),
        500 => (
            REASON_CLOUDFLARE_INTERNAL_ERROR,
            "Cloudflare API internal error (500)".into(),
        ),
        502 => (
            REASON_GATEWAY_ERROR,
            "Bad gateway reaching Cloudflare (502)".into(),
        ),
        503 => (
            REASON_GATEWAY_ERROR,
            "Cloudflare service unavailable (503)".into(),
        ),
        504 => (
            REASON_GATEWAY_ERROR,
            "Gateway timeout reaching Cloudflare (504)".into(),
        ),
        _ => (
            REASON_CLOUDFLARE_UNREACHABLE,
            format!("Unexpected HTTP error from Cloudflare ({status_code})"),
        ),
    }
}

#[cfg(test)]
#[path = "http_errors_tests.rs"]
mod http_errors_tests;
