// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers with reflector stores.
//!
//! Every reconcile pass receives an `Arc<Context>` holding:
//! - the Cloudflare API implementation
//! - the credential resolver
//! - reflector stores for the kinds other kinds depend on
//! - requeue and deletion settings
//!
//! The stores give lock-free, in-memory snapshots of `CloudflareDomain` and
//! `R2Bucket` objects, so zone resolution and bucket readiness checks never query
//! the API server.

use crate::cloudflare::CloudflareApi;
use crate::constants::{
    DEFAULT_MAX_DELETION_ATTEMPTS, DEFAULT_PENDING_REQUEUE_SECS, DEFAULT_PERMANENT_REQUEUE_SECS,
    DEFAULT_READY_REQUEUE_SECS,
};
use crate::credentials::CredentialResolver;
use crate::crd::{CloudflareDomain, R2Bucket};
use crate::resolver::ZoneSnapshot;
use kube::runtime::reflector::{ObjectRef, Store};
use std::sync::Arc;
use std::time::Duration;

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Cloudflare API client
    pub cloudflare: Arc<dyn CloudflareApi>,

    /// Resolves `credentialRef`s and Secret key references
    pub credentials: Arc<dyn CredentialResolver>,

    /// Reflector stores for cross-resource lookups
    pub stores: Stores,

    /// Requeue intervals and deletion budget
    pub settings: ReconcileSettings,
}

impl Context {
    /// Point-in-time view of all zone bindings.
    #[must_use]
    pub fn zone_snapshot(&self) -> ZoneSnapshot {
        ZoneSnapshot::from_store(&self.stores.domains)
    }
}

/// Reflector stores shared between controllers.
///
/// Each store is populated by a dedicated reflector task and provides
/// in-memory access to resources without API calls.
#[derive(Clone)]
pub struct Stores {
    pub domains: Store<CloudflareDomain>,
    pub buckets: Store<R2Bucket>,
}

impl Stores {
    /// Get an `R2Bucket` by name and namespace from the store.
    #[must_use]
    pub fn get_bucket(&self, name: &str, namespace: &str) -> Option<Arc<R2Bucket>> {
        self.buckets.get(&ObjectRef::new(name).within(namespace))
    }
}

/// Requeue cadence and deletion retry budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Resync interval once a resource has settled
    pub ready_requeue: Duration,

    /// Retry interval for configuration errors and in-progress provisioning
    pub pending_requeue: Duration,

    /// Retry interval for permanent errors
    pub permanent_requeue: Duration,

    /// Consecutive failed deletions before `DeletionFailed` is reported
    pub max_deletion_attempts: u32,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            ready_requeue: Duration::from_secs(DEFAULT_READY_REQUEUE_SECS),
            pending_requeue: Duration::from_secs(DEFAULT_PENDING_REQUEUE_SECS),
            permanent_requeue: Duration::from_secs(DEFAULT_PERMANENT_REQUEUE_SECS),
            max_deletion_attempts: DEFAULT_MAX_DELETION_ATTEMPTS,
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
