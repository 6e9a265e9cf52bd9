// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `R2BucketNotification` reconciliation logic.
//!
//! Event notification rules are grouped by destination queue at Cloudflare. Each
//! `R2BucketNotification` owns the complete rule list of one bucket for one queue and
//! replaces it whenever it differs from the desired rules.
//!
//! Rules are compared in order. Server-assigned fields (`ruleId`, `createdAt`) are
//! ignored, and actions are compared as sets.

use crate::cloudflare::types::NotificationRule;
use crate::constants::FINALIZER_R2_BUCKET_NOTIFICATION;
use crate::context::Context;
use crate::credentials::Credential;
use crate::crd::{
    self, CredentialRef, DeletionPolicy, NotificationEventType, NotificationState,
    R2BucketNotification, R2BucketNotificationStatus,
};
use crate::errors::ReconcileError;
use crate::status_reasons::REASON_QUEUE_NOT_FOUND;
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::BTreeSet;
use tracing::{debug, info};

use super::engine::{absent_ok, KindReconciler, ManagedResource, SyncProgress};
use super::r2bucketdomain::ready_bucket_name;

impl ManagedResource for R2BucketNotification {
    const FINALIZER: &'static str = FINALIZER_R2_BUCKET_NOTIFICATION;

    fn deletion_policy(&self) -> DeletionPolicy {
        self.spec.deletion_policy
    }

    fn credential_ref(&self) -> Option<&CredentialRef> {
        self.spec.credential_ref.as_ref()
    }
}

/// R2 actions covered by an event type.
#[must_use]
pub fn event_actions(event: NotificationEventType) -> &'static [&'static str] {
    match event {
        NotificationEventType::ObjectCreate => {
            &["PutObject", "CopyObject", "CompleteMultipartUpload"]
        }
        NotificationEventType::ObjectDelete => &["DeleteObject", "LifecycleDeletion"],
    }
}

/// Notification rules in Cloudflare's wire shape.
#[must_use]
pub fn desired_rules(rules: &[crd::NotificationRule]) -> Vec<NotificationRule> {
    rules
        .iter()
        .map(|rule| {
            let actions: BTreeSet<&str> = rule
                .event_types
                .iter()
                .flat_map(|e| event_actions(*e).iter().copied())
                .collect();
            NotificationRule {
                actions: actions.into_iter().map(str::to_string).collect(),
                prefix: rule.prefix.clone(),
                suffix: rule.suffix.clone(),
                description: rule.description.clone(),
                rule_id: None,
                created_at: None,
            }
        })
        .collect()
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

fn rule_matches(desired: &NotificationRule, remote: &NotificationRule) -> bool {
    let actions = |r: &NotificationRule| r.actions.iter().cloned().collect::<BTreeSet<_>>();
    actions(desired) == actions(remote)
        && non_empty(desired.prefix.as_ref()) == non_empty(remote.prefix.as_ref())
        && non_empty(desired.suffix.as_ref()) == non_empty(remote.suffix.as_ref())
        && non_empty(desired.description.as_ref()) == non_empty(remote.description.as_ref())
}

/// Whether `remote` holds the desired rules in the desired order.
#[must_use]
pub fn rules_match(desired: &[NotificationRule], remote: &[NotificationRule]) -> bool {
    desired.len() == remote.len()
        && desired
            .iter()
            .zip(remote)
            .all(|(d, r)| rule_matches(d, r))
}

/// Reconciles `R2BucketNotification` resources.
pub struct R2BucketNotificationReconciler;

#[async_trait]
impl KindReconciler for R2BucketNotificationReconciler {
    type Resource = R2BucketNotification;

    async fn sync(
        &self,
        resource: &R2BucketNotification,
        ctx: &Context,
        credential: &Credential,
        status: &mut R2BucketNotificationStatus,
    ) -> Result<SyncProgress, ReconcileError> {
        let namespace = resource.namespace().unwrap_or_default();
        let bucket = ready_bucket_name(ctx, &namespace, &resource.spec.bucket_ref)?;

        let queue = ctx
            .cloudflare
            .lookup_queue(credential, &resource.spec.queue)
            .await?
            .ok_or_else(|| {
                ReconcileError::dependency(
                    REASON_QUEUE_NOT_FOUND,
                    format!(
                        "queue {} does not exist in account {}",
                        resource.spec.queue,
                        credential.account_id()
                    ),
                )
            })?;

        // Rules delivered to a previous bucket or queue are no longer ours
        if let (Some(old_bucket), Some(old_queue)) =
            (status.bucket_name.clone(), status.queue_id.clone())
        {
            if old_bucket != bucket || old_queue != queue.queue_id {
                info!(bucket = %old_bucket, queue_id = %old_queue, "Removing notification rules of previous destination");
                absent_ok(
                    ctx.cloudflare
                        .delete_notification_rules(credential, &old_bucket, &old_queue)
                        .await,
                )?;
            }
        }
        status.bucket_name = Some(bucket.clone());
        status.queue_id = Some(queue.queue_id.clone());

        let desired = desired_rules(&resource.spec.rules);
        let remote = ctx
            .cloudflare
            .get_notification_rules(credential, &bucket, &queue.queue_id)
            .await?;

        if rules_match(&desired, &remote) {
            debug!(%bucket, queue = %queue.queue_name, rules = desired.len(), "Notification rules up to date");
        } else if desired.is_empty() {
            info!(%bucket, queue = %queue.queue_name, "Removing notification rules");
            absent_ok(
                ctx.cloudflare
                    .delete_notification_rules(credential, &bucket, &queue.queue_id)
                    .await,
            )?;
        } else {
            info!(%bucket, queue = %queue.queue_name, rules = desired.len(), "Updating notification rules");
            ctx.cloudflare
                .put_notification_rules(credential, &bucket, &queue.queue_id, &desired)
                .await?;
        }

        status.rule_count = u32::try_from(desired.len()).unwrap_or(u32::MAX);
        status.state = NotificationState::Active;
        Ok(SyncProgress::Ready(format!(
            "{} rule(s) deliver events of bucket {bucket} to queue {}",
            desired.len(),
            queue.queue_name
        )))
    }

    async fn cleanup(
        &self,
        _resource: &R2BucketNotification,
        ctx: &Context,
        credential: &Credential,
        status: &R2BucketNotificationStatus,
    ) -> Result<(), ReconcileError> {
        let (Some(bucket), Some(queue_id)) =
            (status.bucket_name.as_deref(), status.queue_id.as_deref())
        else {
            debug!("Notification rules were never created, nothing to delete");
            return Ok(());
        };

        info!(%bucket, %queue_id, "Deleting notification rules");
        absent_ok(
            ctx.cloudflare
                .delete_notification_rules(credential, bucket, queue_id)
                .await,
        )
    }
}

#[cfg(test)]
#[path = "r2bucketnotification_tests.rs"]
mod r2bucketnotification_tests;
