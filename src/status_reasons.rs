// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for Cloudflare resources.
//!
//! This module defines constants for condition reasons following Kubernetes conventions.
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status.
//!
//! # Condition Types
//!
//! Every resource carries a single encompassing `type: Ready` condition. Some kinds
//! report additional aspects:
//!
//! - `CloudflareDomain`: `DefaultZone` reports whether its default claim is unambiguous
//! - `R2BucketDomain`: `ZoneResolved` reports how the hostname's zone was found
//! - `R2Bucket`: `LocationHint` reports whether the bucket lives where it was asked to,
//!   `OrphanedBucket` names a bucket left behind by a change of `spec.name`
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   state: Initializing
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: DomainInitializing
//!       message: "Waiting for ownership (pending) and SSL (initializing)"
//!     - type: ZoneResolved
//!       status: "True"
//!       reason: ZoneResolved
//!       message: "Zone example.com (023e105f4ecef8ad9ca31a8372d0c353)"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Primary condition type indicating overall resource readiness.
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Reports whether a `CloudflareDomain` default flag is unambiguous.
pub const CONDITION_TYPE_DEFAULT_ZONE: &str = "DefaultZone";

/// Reports whether the zone of a hostname-bearing resource has been resolved.
pub const CONDITION_TYPE_ZONE_RESOLVED: &str = "ZoneResolved";

/// Reports whether an R2 bucket's location matches its requested hint.
pub const CONDITION_TYPE_LOCATION_HINT: &str = "LocationHint";

/// Reports an R2 bucket no longer managed after `spec.name` changed.
pub const CONDITION_TYPE_ORPHANED_BUCKET: &str = "OrphanedBucket";

pub const CONDITION_STATUS_TRUE: &str = "True";
pub const CONDITION_STATUS_FALSE: &str = "False";
pub const CONDITION_STATUS_UNKNOWN: &str = "Unknown";

// ============================================================================
// Common Reasons (All Resources)
// ============================================================================

/// Remote state matches the declared state.
pub const REASON_READY: &str = "Ready";

/// Remote state is being created or updated.
pub const REASON_PROGRESSING: &str = "Progressing";

/// The resource is being deleted and the finalizer is still present.
pub const REASON_DELETING: &str = "Deleting";

/// Remote deletion kept failing beyond the retry budget.
///
/// The finalizer stays in place and deletion continues at resync cadence.
pub const REASON_DELETION_FAILED: &str = "DeletionFailed";

/// A remote value did not match what was just written.
pub const REASON_READBACK_MISMATCH: &str = "ReadbackMismatch";

// ============================================================================
// Configuration Reasons
// ============================================================================

/// Credential Secret or one of its keys is missing.
pub const REASON_CREDENTIAL_NOT_FOUND: &str = "CredentialNotFound";

/// A Secret referenced by a key reference is missing.
pub const REASON_SECRET_NOT_FOUND: &str = "SecretNotFound";

/// No credential reference and no operator-wide default credential.
pub const REASON_NO_DEFAULT_CREDENTIAL: &str = "NoDefaultCredential";

/// Referenced `R2Bucket` does not exist.
pub const REASON_BUCKET_NOT_FOUND: &str = "BucketNotFound";

/// Referenced `R2Bucket` exists but is not `Ready` yet.
pub const REASON_BUCKET_NOT_READY: &str = "BucketNotReady";

/// Named queue does not exist in the account.
pub const REASON_QUEUE_NOT_FOUND: &str = "QueueNotFound";

// ============================================================================
// Zone Resolution Reasons
// ============================================================================

/// Zone was resolved through a `CloudflareDomain` binding.
pub const REASON_ZONE_RESOLVED: &str = "ZoneResolved";

/// Zone was taken from an explicit `zoneId` in the spec.
pub const REASON_ZONE_OVERRIDE: &str = "ZoneOverride";

/// No binding covers the hostname and there is no default binding.
pub const REASON_ZONE_NOT_FOUND: &str = "ZoneNotFound";

/// More than one binding claims to be the default.
pub const REASON_AMBIGUOUS_DEFAULT_ZONE: &str = "AmbiguousDefaultZone";

/// Several bindings with the same domain match and none is the default.
pub const REASON_AMBIGUOUS_ZONE_MATCH: &str = "AmbiguousZoneMatch";

/// The selected binding has not learned its zone ID yet.
pub const REASON_ZONE_PENDING: &str = "ZonePending";

/// This binding is the single default.
pub const REASON_DEFAULT_ZONE_UNIQUE: &str = "DefaultZoneUnique";

/// This binding does not claim to be the default.
pub const REASON_NOT_DEFAULT: &str = "NotDefault";

// ============================================================================
// Kind-Specific Reasons
// ============================================================================

/// Zone exists at Cloudflare but is not active yet (pending name server change).
pub const REASON_ZONE_VERIFYING: &str = "ZoneVerifying";

/// Bucket location matches the requested location hint.
pub const REASON_LOCATION_MATCHES: &str = "LocationMatches";

/// Bucket was created elsewhere than the requested location hint.
///
/// Location is immutable after creation; this is informational only.
pub const REASON_LOCATION_MISMATCH: &str = "LocationMismatch";

/// `spec.name` changed; the previous bucket was kept with its objects.
pub const REASON_BUCKET_RENAMED: &str = "BucketRenamed";

/// Custom domain exists but ownership or SSL validation is still in progress.
pub const REASON_DOMAIN_INITIALIZING: &str = "DomainInitializing";

/// The domain is not registered with Cloudflare Registrar.
pub const REASON_DOMAIN_NOT_REGISTERED: &str = "DomainNotRegistered";

/// Registrar settings were updated but are not yet reported back.
pub const REASON_SYNCING: &str = "Syncing";

/// An inbound transfer of the domain is still in progress.
pub const REASON_TRANSFER_PENDING: &str = "TransferPending";

/// The domain registration has expired.
pub const REASON_DOMAIN_EXPIRED: &str = "DomainExpired";

// ============================================================================
// Cloudflare API Reasons
// ============================================================================

/// Cloudflare rejected the request as malformed (400, 422).
pub const REASON_CLOUDFLARE_BAD_REQUEST: &str = "CloudflareBadRequest";

/// Cloudflare rejected the credentials (401, 403).
pub const REASON_CLOUDFLARE_AUTH_FAILED: &str = "CloudflareAuthFailed";

/// Cloudflare returned 404 for an object that was expected to exist.
pub const REASON_CLOUDFLARE_NOT_FOUND: &str = "CloudflareNotFound";

/// Cloudflare reported a conflicting object (409).
pub const REASON_CLOUDFLARE_CONFLICT: &str = "CloudflareConflict";

/// Cloudflare throttled the request (429).
pub const REASON_CLOUDFLARE_RATE_LIMITED: &str = "CloudflareRateLimited";

/// Cloudflare returned an internal error (500).
pub const REASON_CLOUDFLARE_INTERNAL_ERROR: &str = "CloudflareInternalError";

/// Bad gateway, service unavailable or gateway timeout (502, 503, 504).
pub const REASON_GATEWAY_ERROR: &str = "GatewayError";

/// Cloudflare could not be reached or returned an unexpected status.
pub const REASON_CLOUDFLARE_UNREACHABLE: &str = "CloudflareUnreachable";

/// The request timed out.
pub const REASON_CLOUDFLARE_TIMEOUT: &str = "CloudflareTimeout";

/// The response body could not be understood.
pub const REASON_INVALID_RESPONSE: &str = "InvalidResponse";

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
