// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare v4 API access.
//!
//! [`CloudflareApi`] exposes one async operation per remote call the reconcilers
//! need. [`CloudflareClient`] implements it over HTTPS with `reqwest`; tests use the
//! in-memory `FakeCloudflare`.
//!
//! # Idempotency
//!
//! - `get_*` operations return `Ok(None)` (or an empty list for configuration
//!   documents) when the object does not exist.
//! - `create_*` operations treat "already exists" as success and return the existing
//!   object read back from Cloudflare.
//! - `delete_*` operations return [`CloudflareError::NotFound`] when the object is
//!   already gone; callers decide whether that counts as success.

pub mod client;
pub mod error;
#[cfg(test)]
pub mod fake;
pub mod types;

pub use client::CloudflareClient;
pub use error::{CloudflareError, Result};

use crate::credentials::Credential;
use async_trait::async_trait;
use types::{
    AccessIdentityProvider, Bucket, CorsRule, CreateBucketRequest, CreateCustomDomainRequest,
    CustomDomain, IdentityProviderRequest, LifecycleRule, NotificationRule, Queue,
    RegistrarDomain, RegistrarUpdate, UpdateCustomDomainRequest, Zone,
};

/// Remote operations against the Cloudflare API.
///
/// Every operation takes the credential to act with; account-scoped endpoints use
/// the credential's account ID.
#[async_trait]
pub trait CloudflareApi: Send + Sync {
    // Zones

    /// Find a zone by its exact name.
    async fn lookup_zone(&self, cred: &Credential, name: &str) -> Result<Option<Zone>>;

    async fn get_zone(&self, cred: &Credential, zone_id: &str) -> Result<Option<Zone>>;

    // R2 buckets

    async fn get_bucket(&self, cred: &Credential, name: &str) -> Result<Option<Bucket>>;

    async fn create_bucket(&self, cred: &Credential, request: &CreateBucketRequest)
        -> Result<Bucket>;

    /// Change the default storage class of a bucket.
    async fn update_bucket(&self, cred: &Credential, name: &str, storage_class: &str)
        -> Result<()>;

    async fn delete_bucket(&self, cred: &Credential, name: &str) -> Result<()>;

    async fn get_bucket_cors(&self, cred: &Credential, bucket: &str) -> Result<Vec<CorsRule>>;

    async fn put_bucket_cors(&self, cred: &Credential, bucket: &str, rules: &[CorsRule])
        -> Result<()>;

    async fn delete_bucket_cors(&self, cred: &Credential, bucket: &str) -> Result<()>;

    async fn get_bucket_lifecycle(&self, cred: &Credential, bucket: &str)
        -> Result<Vec<LifecycleRule>>;

    async fn put_bucket_lifecycle(
        &self,
        cred: &Credential,
        bucket: &str,
        rules: &[LifecycleRule],
    ) -> Result<()>;

    // R2 custom domains

    async fn get_custom_domain(
        &self,
        cred: &Credential,
        bucket: &str,
        domain: &str,
    ) -> Result<Option<CustomDomain>>;

    async fn create_custom_domain(
        &self,
        cred: &Credential,
        bucket: &str,
        request: &CreateCustomDomainRequest,
    ) -> Result<CustomDomain>;

    async fn update_custom_domain(
        &self,
        cred: &Credential,
        bucket: &str,
        domain: &str,
        request: &UpdateCustomDomainRequest,
    ) -> Result<()>;

    async fn delete_custom_domain(&self, cred: &Credential, bucket: &str, domain: &str)
        -> Result<()>;

    // Queues and event notifications

    /// Find a queue by name.
    async fn lookup_queue(&self, cred: &Credential, name: &str) -> Result<Option<Queue>>;

    /// Rules of `bucket` that deliver to `queue_id`, in order.
    async fn get_notification_rules(
        &self,
        cred: &Credential,
        bucket: &str,
        queue_id: &str,
    ) -> Result<Vec<NotificationRule>>;

    /// Replace the rules of `bucket` that deliver to `queue_id`.
    async fn put_notification_rules(
        &self,
        cred: &Credential,
        bucket: &str,
        queue_id: &str,
        rules: &[NotificationRule],
    ) -> Result<()>;

    async fn delete_notification_rules(
        &self,
        cred: &Credential,
        bucket: &str,
        queue_id: &str,
    ) -> Result<()>;

    // Registrar

    async fn get_registrar_domain(
        &self,
        cred: &Credential,
        domain: &str,
    ) -> Result<Option<RegistrarDomain>>;

    async fn update_registrar_domain(
        &self,
        cred: &Credential,
        domain: &str,
        update: &RegistrarUpdate,
    ) -> Result<()>;

    // Access identity providers

    async fn get_identity_provider(
        &self,
        cred: &Credential,
        id: &str,
    ) -> Result<Option<AccessIdentityProvider>>;

    /// Provider with this name and type, if one exists. Access allows duplicate names.
    async fn find_identity_provider(
        &self,
        cred: &Credential,
        name: &str,
        provider_type: &str,
    ) -> Result<Option<AccessIdentityProvider>>;

    async fn create_identity_provider(
        &self,
        cred: &Credential,
        request: &IdentityProviderRequest,
    ) -> Result<AccessIdentityProvider>;

    async fn update_identity_provider(
        &self,
        cred: &Credential,
        id: &str,
        request: &IdentityProviderRequest,
    ) -> Result<AccessIdentityProvider>;

    async fn delete_identity_provider(&self, cred: &Credential, id: &str) -> Result<()>;
}
