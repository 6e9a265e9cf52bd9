// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `R2Bucket` reconciliation logic.
//!
//! A pass converges the bucket in four steps, each idempotent on its own so that a
//! pass failing halfway resumes where it stopped:
//!
//! 1. Create the bucket if it does not exist (also after out-of-band deletion).
//! 2. Update the default storage class if it drifted.
//! 3. Push the CORS policy if it differs (rules compared in order), then read it back.
//! 4. Push the lifecycle rules if they differ (compared as a set keyed by rule ID),
//!    then read them back.
//!
//! The location hint only applies at creation. A bucket living elsewhere is
//! reported through the `LocationHint` condition and otherwise left alone.

use crate::cloudflare::types::{
    AgeCondition, AgeTransition, Bucket, CorsAllowed, CorsRule, CreateBucketRequest,
    LifecycleConditions, LifecycleRule, StorageClassTransition,
};
use crate::constants::{FINALIZER_R2_BUCKET, SECONDS_PER_DAY};
use crate::context::Context;
use crate::credentials::Credential;
use crate::crd::{
    self, BucketState, CredentialRef, DeletionPolicy, R2Bucket, R2BucketStatus, StorageClass,
};
use crate::errors::ReconcileError;
use crate::status_reasons::{
    CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_LOCATION_HINT,
    CONDITION_TYPE_ORPHANED_BUCKET, REASON_BUCKET_RENAMED, REASON_LOCATION_MATCHES,
    REASON_LOCATION_MISMATCH,
};
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::engine::{absent_ok, KindReconciler, ManagedResource, SyncProgress};
use super::status::{remove_condition, KindStatus};

/// Storage class Cloudflare applies when none is requested.
const DEFAULT_STORAGE_CLASS: &str = "Standard";

impl ManagedResource for R2Bucket {
    const FINALIZER: &'static str = FINALIZER_R2_BUCKET;

    fn deletion_policy(&self) -> DeletionPolicy {
        self.spec.deletion_policy
    }

    fn credential_ref(&self) -> Option<&CredentialRef> {
        self.spec.credential_ref.as_ref()
    }
}

/// Bucket name at Cloudflare: `spec.name`, or the resource name.
#[must_use]
pub fn bucket_name(bucket: &R2Bucket) -> String {
    bucket
        .spec
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| bucket.name_any())
}

/// CORS rules in Cloudflare's wire shape.
#[must_use]
pub fn desired_cors(rules: &[crd::CorsRule]) -> Vec<CorsRule> {
    rules
        .iter()
        .map(|rule| CorsRule {
            id: rule.id.clone(),
            allowed: CorsAllowed {
                origins: rule.allowed_origins.clone(),
                methods: rule.allowed_methods.clone(),
                headers: rule.allowed_headers.clone(),
            },
            expose_headers: rule.expose_headers.clone(),
            max_age_seconds: rule.max_age_seconds,
        })
        .collect()
}

fn age(days: u32) -> AgeCondition {
    AgeCondition {
        condition_type: "Age".to_string(),
        max_age: i64::from(days) * SECONDS_PER_DAY,
    }
}

/// Lifecycle rules in Cloudflare's wire shape. Ages are converted from days to seconds.
#[must_use]
pub fn desired_lifecycle(rules: &[crd::LifecycleRule]) -> Vec<LifecycleRule> {
    rules
        .iter()
        .map(|rule| LifecycleRule {
            id: rule.id.clone(),
            enabled: rule.enabled,
            conditions: LifecycleConditions {
                prefix: rule.prefix.clone().unwrap_or_default(),
            },
            delete_objects_transition: rule
                .expiration_days
                .map(|d| AgeTransition { condition: age(d) }),
            abort_multipart_uploads_transition: rule
                .abort_multipart_upload_days
                .map(|d| AgeTransition { condition: age(d) }),
            storage_class_transitions: rule
                .transition_to_infrequent_access_days
                .map(|d| StorageClassTransition {
                    condition: age(d),
                    storage_class: StorageClass::InfrequentAccess.as_str().to_string(),
                })
                .into_iter()
                .collect(),
        })
        .collect()
}

/// Whether two lifecycle rule sets are equal regardless of order.
#[must_use]
pub fn lifecycle_matches(desired: &[LifecycleRule], remote: &[LifecycleRule]) -> bool {
    let by_id = |rules: &[LifecycleRule]| {
        rules
            .iter()
            .map(|r| (r.id.clone(), r.clone()))
            .collect::<BTreeMap<_, _>>()
    };
    desired.len() == remote.len() && by_id(desired) == by_id(remote)
}

/// Reconciles `R2Bucket` resources.
pub struct R2BucketReconciler;

impl R2BucketReconciler {
    async fn ensure_bucket(
        ctx: &Context,
        credential: &Credential,
        bucket: &R2Bucket,
        name: &str,
        status: &mut R2BucketStatus,
    ) -> Result<Bucket, ReconcileError> {
        if let Some(remote) = ctx.cloudflare.get_bucket(credential, name).await? {
            return Ok(remote);
        }

        if status.creation_date.is_some() {
            warn!(bucket = %name, "Bucket disappeared from Cloudflare, recreating");
        }
        status.state = BucketState::Creating;

        let request = CreateBucketRequest {
            name: name.to_string(),
            location_hint: bucket.spec.location_hint.map(|h| h.as_str().to_string()),
            storage_class: bucket.spec.storage_class.map(|c| c.as_str().to_string()),
        };
        let created = ctx.cloudflare.create_bucket(credential, &request).await?;
        info!(
            bucket = %name,
            location = created.location.as_deref().unwrap_or("unknown"),
            "Created R2 bucket"
        );
        Ok(created)
    }

    async fn sync_storage_class(
        ctx: &Context,
        credential: &Credential,
        bucket: &R2Bucket,
        remote: &Bucket,
        status: &mut R2BucketStatus,
    ) -> Result<(), ReconcileError> {
        let current = remote
            .storage_class
            .as_deref()
            .unwrap_or(DEFAULT_STORAGE_CLASS);
        status.storage_class = Some(current.to_string());

        let Some(desired) = bucket.spec.storage_class.map(StorageClass::as_str) else {
            return Ok(());
        };
        if desired == current {
            return Ok(());
        }

        info!(bucket = %remote.name, from = current, to = desired, "Updating default storage class");
        ctx.cloudflare
            .update_bucket(credential, &remote.name, desired)
            .await?;
        status.storage_class = Some(desired.to_string());
        Ok(())
    }

    async fn sync_cors(
        ctx: &Context,
        credential: &Credential,
        name: &str,
        desired: &[CorsRule],
    ) -> Result<(), ReconcileError> {
        let remote = ctx.cloudflare.get_bucket_cors(credential, name).await?;
        if remote == desired {
            debug!(bucket = %name, rules = desired.len(), "CORS policy up to date");
            return Ok(());
        }

        if desired.is_empty() {
            info!(bucket = %name, "Removing CORS policy");
            absent_ok(ctx.cloudflare.delete_bucket_cors(credential, name).await)?;
        } else {
            info!(bucket = %name, rules = desired.len(), "Updating CORS policy");
            ctx.cloudflare
                .put_bucket_cors(credential, name, desired)
                .await?;
        }

        let readback = ctx.cloudflare.get_bucket_cors(credential, name).await?;
        if readback != desired {
            return Err(ReconcileError::readback(format!("CORS policy of bucket {name}")));
        }
        Ok(())
    }

    async fn sync_lifecycle(
        ctx: &Context,
        credential: &Credential,
        name: &str,
        desired: &[LifecycleRule],
    ) -> Result<(), ReconcileError> {
        let remote = ctx.cloudflare.get_bucket_lifecycle(credential, name).await?;
        if lifecycle_matches(desired, &remote) {
            debug!(bucket = %name, rules = desired.len(), "Lifecycle rules up to date");
            return Ok(());
        }

        info!(bucket = %name, rules = desired.len(), "Updating lifecycle rules");
        ctx.cloudflare
            .put_bucket_lifecycle(credential, name, desired)
            .await?;

        let readback = ctx.cloudflare.get_bucket_lifecycle(credential, name).await?;
        if !lifecycle_matches(desired, &readback) {
            return Err(ReconcileError::readback(format!(
                "lifecycle rules of bucket {name}"
            )));
        }
        Ok(())
    }
}

/// Report whether the bucket lives where its location hint asked.
fn report_location(bucket: &R2Bucket, remote: &Bucket, status: &mut R2BucketStatus) {
    let Some(hint) = bucket.spec.location_hint else {
        remove_condition(&mut status.conditions, CONDITION_TYPE_LOCATION_HINT);
        return;
    };
    let actual = remote.location.as_deref().unwrap_or("unknown");

    if actual.eq_ignore_ascii_case(hint.as_str()) {
        status.set_condition(
            CONDITION_TYPE_LOCATION_HINT,
            CONDITION_STATUS_TRUE,
            REASON_LOCATION_MATCHES,
            &format!("Bucket is located in {actual}"),
        );
    } else {
        status.set_condition(
            CONDITION_TYPE_LOCATION_HINT,
            CONDITION_STATUS_FALSE,
            REASON_LOCATION_MISMATCH,
            &format!(
                "Bucket is located in {actual}, requested {}; location cannot change after creation",
                hint.as_str()
            ),
        );
    }
}

#[async_trait]
impl KindReconciler for R2BucketReconciler {
    type Resource = R2Bucket;

    async fn sync(
        &self,
        bucket: &R2Bucket,
        ctx: &Context,
        credential: &Credential,
        status: &mut R2BucketStatus,
    ) -> Result<SyncProgress, ReconcileError> {
        let name = bucket_name(bucket);
        if let Some(previous) = status.bucket_name.clone().filter(|p| *p != name) {
            // R2 names are immutable and the old bucket may still hold objects
            warn!(bucket = %name, %previous, "Bucket name changed, previous bucket is no longer managed");
            status.set_condition(
                CONDITION_TYPE_ORPHANED_BUCKET,
                CONDITION_STATUS_TRUE,
                REASON_BUCKET_RENAMED,
                &format!(
                    "Bucket {previous} is no longer managed after the rename to {name}; \
                     delete it manually if unused"
                ),
            );
        }
        status.bucket_name = Some(name.clone());

        let remote = Self::ensure_bucket(ctx, credential, bucket, &name, status).await?;
        status.location.clone_from(&remote.location);
        status.creation_date.clone_from(&remote.creation_date);
        report_location(bucket, &remote, status);

        Self::sync_storage_class(ctx, credential, bucket, &remote, status).await?;

        let cors = desired_cors(&bucket.spec.cors_rules);
        Self::sync_cors(ctx, credential, &name, &cors).await?;
        status.cors_rules_count = u32::try_from(cors.len()).unwrap_or(u32::MAX);

        let lifecycle = desired_lifecycle(&bucket.spec.lifecycle_rules);
        Self::sync_lifecycle(ctx, credential, &name, &lifecycle).await?;
        status.lifecycle_rules_count = u32::try_from(lifecycle.len()).unwrap_or(u32::MAX);

        status.state = BucketState::Ready;
        Ok(SyncProgress::Ready(format!("Bucket {name} is ready")))
    }

    async fn cleanup(
        &self,
        _bucket: &R2Bucket,
        ctx: &Context,
        credential: &Credential,
        status: &R2BucketStatus,
    ) -> Result<(), ReconcileError> {
        let Some(name) = status.bucket_name.as_deref() else {
            debug!("Bucket was never created, nothing to delete");
            return Ok(());
        };

        info!(bucket = %name, "Deleting R2 bucket");
        absent_ok(ctx.cloudflare.delete_bucket(credential, name).await)
    }

    fn mark_deleting(&self, status: &mut R2BucketStatus) {
        status.state = BucketState::Deleting;
    }
}

#[cfg(test)]
#[path = "r2bucket_tests.rs"]
mod r2bucket_tests;
