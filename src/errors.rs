// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconcile failure taxonomy.
//!
//! Every failure of a reconcile pass is a [`ReconcileError`]. Its [`ErrorClass`]
//! decides the resulting state and how soon the resource is retried:
//!
//! | Class           | State     | Requeue                                   |
//! |-----------------|-----------|-------------------------------------------|
//! | `Transient`     | `Error`   | exponential backoff from `failureCount`   |
//! | `Configuration` | `Pending` | pending interval (30s)                    |
//! | `Permanent`     | `Error`   | resync interval (5min)                    |

use crate::cloudflare::CloudflareError;
use crate::credentials::CredentialError;
use crate::resolver::ResolveError;
use crate::status_reasons::REASON_READBACK_MISMATCH;
use thiserror::Error;

/// How a failure is retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// May succeed on retry without any change.
    Transient,
    /// Needs a change to the cluster (missing Secret, binding, bucket, queue).
    Configuration,
    /// Cloudflare rejected the request; needs a spec change.
    Permanent,
}

impl ErrorClass {
    /// Label used for the `error_class` metric label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Configuration => "configuration",
            Self::Permanent => "permanent",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error(transparent)]
    Cloudflare(#[from] CloudflareError),

    #[error(transparent)]
    Zone(#[from] ResolveError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// A referenced resource is missing or not ready.
    #[error("{message}")]
    Dependency {
        reason: &'static str,
        message: String,
    },

    /// The remote side refuses the desired state for good.
    #[error("{message}")]
    Rejected {
        reason: &'static str,
        message: String,
    },

    /// Remote state read back after a write still differs from the desired state.
    #[error("{what} does not match the desired state after update")]
    Readback { what: String },
}

impl ReconcileError {
    pub fn dependency(reason: &'static str, message: impl Into<String>) -> Self {
        Self::Dependency {
            reason,
            message: message.into(),
        }
    }

    pub fn rejected(reason: &'static str, message: impl Into<String>) -> Self {
        Self::Rejected {
            reason,
            message: message.into(),
        }
    }

    pub fn readback(what: impl Into<String>) -> Self {
        Self::Readback { what: what.into() }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Cloudflare(err) => cloudflare_class(err),
            Self::Zone(_) | Self::Dependency { .. } => ErrorClass::Configuration,
            Self::Credential(err) if err.is_transient() => ErrorClass::Transient,
            Self::Credential(_) => ErrorClass::Configuration,
            Self::Rejected { .. } => ErrorClass::Permanent,
            Self::Readback { .. } => ErrorClass::Transient,
        }
    }

    /// Condition reason for the `Ready` condition.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Cloudflare(err) => err.reason(),
            Self::Zone(err) => err.reason(),
            Self::Credential(err) => err.reason(),
            Self::Dependency { reason, .. } | Self::Rejected { reason, .. } => reason,
            Self::Readback { .. } => REASON_READBACK_MISMATCH,
        }
    }
}

/// Client errors other than 404, 409 and 429 are permanent.
fn cloudflare_class(err: &CloudflareError) -> ErrorClass {
    match err {
        CloudflareError::Api { status, .. }
            if (400..500).contains(status) && !matches!(status, 404 | 409 | 429) =>
        {
            ErrorClass::Permanent
        }
        _ => ErrorClass::Transient,
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
