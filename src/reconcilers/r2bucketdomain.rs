// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `R2BucketDomain` reconciliation logic.
//!
//! Serving a bucket on a custom hostname depends on two other resources:
//!
//! - the referenced `R2Bucket`, which must be `Ready`
//! - the zone owning the hostname, found through `CloudflareDomain` bindings
//!   (or given explicitly with `spec.zoneId`)
//!
//! Either one missing keeps the resource `Pending` with a configuration condition.
//! Once attached, Cloudflare validates ownership and issues a certificate on its own;
//! the resource stays `Initializing` until both report `active`.

use crate::cloudflare::types::{
    CreateCustomDomainRequest, CustomDomain, UpdateCustomDomainRequest,
};
use crate::constants::FINALIZER_R2_BUCKET_DOMAIN;
use crate::context::Context;
use crate::credentials::Credential;
use crate::crd::{
    BucketDomainState, BucketState, CredentialRef, DeletionPolicy, R2BucketDomain,
    R2BucketDomainStatus,
};
use crate::errors::ReconcileError;
use crate::resolver::normalize_hostname;
use crate::status_reasons::{
    CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_ZONE_RESOLVED,
    REASON_BUCKET_NOT_FOUND, REASON_BUCKET_NOT_READY, REASON_DOMAIN_INITIALIZING,
    REASON_ZONE_OVERRIDE, REASON_ZONE_RESOLVED,
};
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info};

use super::engine::{absent_ok, KindReconciler, ManagedResource, SyncProgress};
use super::r2bucket::bucket_name;
use super::status::KindStatus;

impl ManagedResource for R2BucketDomain {
    const FINALIZER: &'static str = FINALIZER_R2_BUCKET_DOMAIN;

    fn deletion_policy(&self) -> DeletionPolicy {
        self.spec.deletion_policy
    }

    fn credential_ref(&self) -> Option<&CredentialRef> {
        self.spec.credential_ref.as_ref()
    }
}

/// Name at Cloudflare of the `Ready` bucket `bucket_ref` in `namespace`.
///
/// # Errors
///
/// Returns a configuration error when the bucket does not exist or is not `Ready`.
pub fn ready_bucket_name(
    ctx: &Context,
    namespace: &str,
    bucket_ref: &str,
) -> Result<String, ReconcileError> {
    let Some(bucket) = ctx.stores.get_bucket(bucket_ref, namespace) else {
        return Err(ReconcileError::dependency(
            REASON_BUCKET_NOT_FOUND,
            format!("R2Bucket {namespace}/{bucket_ref} does not exist"),
        ));
    };

    let status = bucket.status.as_ref();
    if status.map(|s| s.state) != Some(BucketState::Ready) {
        return Err(ReconcileError::dependency(
            REASON_BUCKET_NOT_READY,
            format!("R2Bucket {namespace}/{bucket_ref} is not ready"),
        ));
    }

    Ok(status
        .and_then(|s| s.bucket_name.clone())
        .unwrap_or_else(|| bucket_name(&bucket)))
}

/// Reconciles `R2BucketDomain` resources.
pub struct R2BucketDomainReconciler;

impl R2BucketDomainReconciler {
    /// Zone ID of the hostname, recording how it was found.
    fn resolve_zone(
        ctx: &Context,
        resource: &R2BucketDomain,
        hostname: &str,
        status: &mut R2BucketDomainStatus,
    ) -> Result<String, ReconcileError> {
        if let Some(zone_id) = resource.spec.zone_id.as_deref().filter(|id| !id.is_empty()) {
            status.zone_id = Some(zone_id.to_string());
            status.zone_name = None;
            status.set_condition(
                CONDITION_TYPE_ZONE_RESOLVED,
                CONDITION_STATUS_TRUE,
                REASON_ZONE_OVERRIDE,
                &format!("Using zone {zone_id} from spec.zoneId"),
            );
            return Ok(zone_id.to_string());
        }

        match ctx.zone_snapshot().resolve(hostname) {
            Ok(zone) => {
                let via = if zone.via_default { " (default)" } else { "" };
                status.set_condition(
                    CONDITION_TYPE_ZONE_RESOLVED,
                    CONDITION_STATUS_TRUE,
                    REASON_ZONE_RESOLVED,
                    &format!(
                        "Zone {} ({}) from CloudflareDomain {}{via}",
                        zone.zone_name, zone.zone_id, zone.binding
                    ),
                );
                status.zone_id = Some(zone.zone_id.clone());
                status.zone_name = Some(zone.zone_name);
                Ok(zone.zone_id)
            }
            Err(err) => {
                status.set_condition(
                    CONDITION_TYPE_ZONE_RESOLVED,
                    CONDITION_STATUS_FALSE,
                    err.reason(),
                    &err.to_string(),
                );
                Err(err.into())
            }
        }
    }

    async fn ensure_domain(
        ctx: &Context,
        credential: &Credential,
        resource: &R2BucketDomain,
        bucket: &str,
        hostname: &str,
        zone_id: &str,
    ) -> Result<CustomDomain, ReconcileError> {
        let min_tls = resource.spec.min_tls.map(|v| v.as_str().to_string());
        let enabled = resource.spec.enable_public_access;

        let Some(existing) = ctx
            .cloudflare
            .get_custom_domain(credential, bucket, hostname)
            .await?
        else {
            info!(%bucket, domain = %hostname, %zone_id, "Attaching custom domain");
            let request = CreateCustomDomainRequest {
                domain: hostname.to_string(),
                zone_id: zone_id.to_string(),
                enabled,
                min_tls,
            };
            return Ok(ctx
                .cloudflare
                .create_custom_domain(credential, bucket, &request)
                .await?);
        };

        let tls_drift = min_tls.is_some() && existing.min_tls != min_tls;
        if existing.enabled == enabled && !tls_drift {
            debug!(%bucket, domain = %hostname, "Custom domain up to date");
            return Ok(existing);
        }

        info!(%bucket, domain = %hostname, enabled, min_tls = ?min_tls, "Updating custom domain");
        let request = UpdateCustomDomainRequest {
            enabled,
            min_tls: min_tls.clone(),
        };
        ctx.cloudflare
            .update_custom_domain(credential, bucket, hostname, &request)
            .await?;

        let mut updated = existing;
        updated.enabled = enabled;
        if min_tls.is_some() {
            updated.min_tls = min_tls;
        }
        Ok(updated)
    }
}

#[async_trait]
impl KindReconciler for R2BucketDomainReconciler {
    type Resource = R2BucketDomain;

    async fn sync(
        &self,
        resource: &R2BucketDomain,
        ctx: &Context,
        credential: &Credential,
        status: &mut R2BucketDomainStatus,
    ) -> Result<SyncProgress, ReconcileError> {
        let namespace = resource.namespace().unwrap_or_default();
        let hostname = normalize_hostname(&resource.spec.domain);
        let bucket = ready_bucket_name(ctx, &namespace, &resource.spec.bucket_ref)?;
        let zone_id = Self::resolve_zone(ctx, resource, &hostname, status)?;

        // status keeps the attachment cleanup owns until the previous one is detached
        if let (Some(old_bucket), Some(old_domain)) =
            (status.bucket_name.clone(), status.domain.clone())
        {
            if old_bucket != bucket || old_domain != hostname {
                info!(bucket = %old_bucket, domain = %old_domain, "Detaching custom domain of previous spec");
                absent_ok(
                    ctx.cloudflare
                        .delete_custom_domain(credential, &old_bucket, &old_domain)
                        .await,
                )?;
            }
        }
        status.bucket_name = Some(bucket.clone());
        status.domain = Some(hostname.clone());

        let remote =
            Self::ensure_domain(ctx, credential, resource, &bucket, &hostname, &zone_id).await?;
        status.ownership_status = Some(remote.status.ownership.clone());
        status.ssl_status = Some(remote.status.ssl.clone());

        if remote.status.is_active() {
            status.state = BucketDomainState::Active;
            return Ok(SyncProgress::Ready(format!(
                "{hostname} serves bucket {bucket}"
            )));
        }

        status.state = BucketDomainState::Initializing;
        Ok(SyncProgress::Progressing {
            reason: REASON_DOMAIN_INITIALIZING,
            message: format!(
                "Waiting for ownership ({}) and SSL ({})",
                remote.status.ownership, remote.status.ssl
            ),
        })
    }

    async fn cleanup(
        &self,
        _resource: &R2BucketDomain,
        ctx: &Context,
        credential: &Credential,
        status: &R2BucketDomainStatus,
    ) -> Result<(), ReconcileError> {
        let (Some(bucket), Some(hostname)) =
            (status.bucket_name.as_deref(), status.domain.as_deref())
        else {
            debug!("Custom domain was never attached, nothing to delete");
            return Ok(());
        };

        info!(%bucket, domain = %hostname, "Detaching custom domain");
        absent_ok(
            ctx.cloudflare
                .delete_custom_domain(credential, bucket, hostname)
                .await,
        )
    }
}

#[cfg(test)]
#[path = "r2bucketdomain_tests.rs"]
mod r2bucketdomain_tests;
