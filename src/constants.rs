// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Cloudflare operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all operator CRDs
pub const API_GROUP: &str = "cloudflare.firestoned.io";

/// API version for all operator CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "cloudflare.firestoned.io/v1alpha1";

/// Kind name for `CloudflareDomain` resource
pub const KIND_CLOUDFLARE_DOMAIN: &str = "CloudflareDomain";

/// Kind name for `R2Bucket` resource
pub const KIND_R2_BUCKET: &str = "R2Bucket";

/// Kind name for `R2BucketDomain` resource
pub const KIND_R2_BUCKET_DOMAIN: &str = "R2BucketDomain";

/// Kind name for `R2BucketNotification` resource
pub const KIND_R2_BUCKET_NOTIFICATION: &str = "R2BucketNotification";

/// Kind name for `DomainRegistration` resource
pub const KIND_DOMAIN_REGISTRATION: &str = "DomainRegistration";

/// Kind name for `IdentityProvider` resource
pub const KIND_IDENTITY_PROVIDER: &str = "IdentityProvider";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer for `CloudflareDomain` resources
pub const FINALIZER_CLOUDFLARE_DOMAIN: &str = "cloudflaredomain.cloudflare.firestoned.io/finalizer";

/// Finalizer for `R2Bucket` resources
pub const FINALIZER_R2_BUCKET: &str = "r2bucket.cloudflare.firestoned.io/finalizer";

/// Finalizer for `R2BucketDomain` resources
pub const FINALIZER_R2_BUCKET_DOMAIN: &str = "r2bucketdomain.cloudflare.firestoned.io/finalizer";

/// Finalizer for `R2BucketNotification` resources
pub const FINALIZER_R2_BUCKET_NOTIFICATION: &str =
    "r2bucketnotification.cloudflare.firestoned.io/finalizer";

/// Finalizer for `DomainRegistration` resources
pub const FINALIZER_DOMAIN_REGISTRATION: &str =
    "domainregistration.cloudflare.firestoned.io/finalizer";

/// Finalizer for `IdentityProvider` resources
pub const FINALIZER_IDENTITY_PROVIDER: &str = "identityprovider.cloudflare.firestoned.io/finalizer";

// ============================================================================
// Cloudflare API Constants
// ============================================================================

/// Base URL of the Cloudflare v4 REST API
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// User agent sent with every Cloudflare API request
pub const USER_AGENT: &str = concat!("cloudflare-operator/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout for Cloudflare API calls (30 seconds)
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Header used to change the default storage class of an R2 bucket
pub const R2_STORAGE_CLASS_HEADER: &str = "cf-r2-storage-class";

/// Seconds in one day, used to convert lifecycle ages to the API's `maxAge`
pub const SECONDS_PER_DAY: i64 = 86_400;

// ============================================================================
// Credential Secret Keys
// ============================================================================

/// Secret key holding the Cloudflare API token
pub const SECRET_KEY_API_TOKEN: &str = "apiToken";

/// Secret key holding the Cloudflare account ID
pub const SECRET_KEY_ACCOUNT_ID: &str = "accountId";

// ============================================================================
// Controller Constants
// ============================================================================

/// Requeue interval for settled resources (5 minutes)
///
/// Remote state can drift out-of-band, so even `Ready` resources are re-checked.
pub const DEFAULT_READY_REQUEUE_SECS: u64 = 300;

/// Requeue interval for resources that are still progressing or waiting on a
/// dependency (30 seconds)
pub const DEFAULT_PENDING_REQUEUE_SECS: u64 = 30;

/// Requeue interval after a permanent failure (5 minutes)
pub const DEFAULT_PERMANENT_REQUEUE_SECS: u64 = 300;

/// Requeue interval used by the controller error policy (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Consecutive failed deletion attempts before a terminal `DeletionFailed` condition
/// is reported. Deletion keeps retrying at resync cadence afterwards.
pub const DEFAULT_MAX_DELETION_ATTEMPTS: u32 = 10;

/// Default number of concurrent reconciliations per controller
pub const DEFAULT_CONCURRENCY: u16 = 4;

/// Number of Tokio worker threads
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Default bind address for the metrics and health endpoint
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";
