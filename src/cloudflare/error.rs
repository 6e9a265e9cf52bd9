// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Errors returned by the Cloudflare API client.

use crate::http_errors::map_http_error_to_reason;
use crate::status_reasons::{
    REASON_CLOUDFLARE_CONFLICT, REASON_CLOUDFLARE_NOT_FOUND, REASON_CLOUDFLARE_RATE_LIMITED,
    REASON_CLOUDFLARE_TIMEOUT, REASON_CLOUDFLARE_UNREACHABLE, REASON_INVALID_RESPONSE,
};
use thiserror::Error;

/// Failure of a single Cloudflare API operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CloudflareError {
    /// The addressed object does not exist (HTTP 404).
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The object already exists and could not be read back.
    #[error("{resource} already exists")]
    AlreadyExists { resource: String },

    /// Request throttled (HTTP 429).
    #[error("rate limited by Cloudflare API")]
    RateLimited,

    /// Request exceeded the configured timeout.
    #[error("request to Cloudflare API timed out")]
    Timeout,

    /// Connection-level failure.
    #[error("network error talking to Cloudflare API: {0}")]
    Network(String),

    /// Cloudflare answered with an error envelope or non-success status.
    #[error("Cloudflare API error (HTTP {status}, code {code}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response from Cloudflare API: {0}")]
    InvalidResponse(String),
}

impl CloudflareError {
    /// Whether retrying the same request later can succeed.
    ///
    /// Network failures, timeouts, throttling and 5xx responses are transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited | Self::Timeout | Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::NotFound { .. } | Self::AlreadyExists { .. } | Self::InvalidResponse(_) => false,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Condition reason describing this failure.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => REASON_CLOUDFLARE_NOT_FOUND,
            Self::AlreadyExists { .. } => REASON_CLOUDFLARE_CONFLICT,
            Self::RateLimited => REASON_CLOUDFLARE_RATE_LIMITED,
            Self::Timeout => REASON_CLOUDFLARE_TIMEOUT,
            Self::Network(_) => REASON_CLOUDFLARE_UNREACHABLE,
            Self::Api { status, .. } => map_http_error_to_reason(*status).0,
            Self::InvalidResponse(_) => REASON_INVALID_RESPONSE,
        }
    }

    /// Short label used for the `outcome` metric label.
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyExists { .. } => "conflict",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::Network(_) => "network",
            Self::Api { status, .. } if *status >= 500 => "server_error",
            Self::Api { .. } => "client_error",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }
}

impl From<reqwest::Error> for CloudflareError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Result alias for Cloudflare API operations.
pub type Result<T, E = CloudflareError> = std::result::Result<T, E>;
