// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation logic for the Cloudflare custom resources.
//!
//! Every kind shares one reconcile flow, implemented in [`engine`]:
//!
//! 1. **Credential** - resolve the API token and account for the resource
//! 2. **Deletion** - honour the deletion policy, then release the finalizer
//! 3. **Sync** - converge Cloudflare to the spec through the kind's [`engine::KindReconciler`]
//! 4. **Status** - report the outcome, classify failures and pick the requeue interval
//!
//! The engine never talks to the Kubernetes API. Finalizer and status writes happen
//! in the controller around it, see [`crate::controller`].
//!
//! # Kinds
//!
//! - [`DomainReconciler`] - discovers the zone behind a `CloudflareDomain`
//! - [`R2BucketReconciler`] - buckets, storage class, CORS and lifecycle rules
//! - [`R2BucketDomainReconciler`] - custom domains attached to buckets
//! - [`R2BucketNotificationReconciler`] - event notification rules per queue
//! - [`DomainRegistrationReconciler`] - registrar settings
//! - [`IdentityProviderReconciler`] - Cloudflare Access identity providers

pub mod domain;
pub mod domainregistration;
pub mod engine;
pub mod finalizers;
pub mod identityprovider;
pub mod r2bucket;
pub mod r2bucketdomain;
pub mod r2bucketnotification;
pub mod retry;
pub mod status;

#[cfg(test)]
pub mod test_support;

pub use domain::DomainReconciler;
pub use domainregistration::DomainRegistrationReconciler;
pub use engine::{reconcile, KindReconciler, ManagedResource, ReconcileOutcome};
pub use identityprovider::IdentityProviderReconciler;
pub use r2bucket::R2BucketReconciler;
pub use r2bucketdomain::R2BucketDomainReconciler;
pub use r2bucketnotification::R2BucketNotificationReconciler;
