// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared reconcile engine.
//!
//! One engine drives every managed kind. Each kind supplies a [`KindReconciler`]
//! strategy; the engine owns what is common to all of them:
//!
//! - credential resolution
//! - `observedGeneration`, `failureCount` and the `Ready` condition
//! - mapping failures to state and requeue interval by [`ErrorClass`]
//! - the deletion branch with its retry budget
//!
//! The engine never talks to the Kubernetes API. It returns a [`ReconcileOutcome`]
//! that the controller turns into a status write, a finalizer removal and a requeue.

use crate::cloudflare::CloudflareError;
use crate::context::{Context, ReconcileSettings};
use crate::credentials::Credential;
use crate::crd::{CredentialRef, DeletionPolicy};
use crate::errors::{ErrorClass, ReconcileError};
use crate::metrics::{
    record_deletion_failure, record_reconciliation_error, record_reconciliation_requeue,
    record_reconciliation_success, record_resource_deleted, record_resource_orphaned,
};
use crate::status_reasons::{
    CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_READY, REASON_DELETING,
    REASON_DELETION_FAILED, REASON_READY,
};
use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::finalizers::has_finalizer;
use super::retry::requeue_backoff;
use super::status::{find_condition, KindStatus, StatusResource};

/// Status type of a managed kind.
pub type StatusOf<K> = <K as StatusResource>::Status;

/// A custom resource driven by the engine.
pub trait ManagedResource: StatusResource {
    const FINALIZER: &'static str;

    /// What happens to the remote object when the resource is deleted.
    fn deletion_policy(&self) -> DeletionPolicy;

    fn credential_ref(&self) -> Option<&CredentialRef>;
}

/// Result of a successful sync.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncProgress {
    /// Remote state matches the desired state.
    Ready(String),
    /// Remote state is converging on its own (DNS verification, SSL issuance).
    Progressing {
        reason: &'static str,
        message: String,
    },
    /// Remote state needs action outside the operator (expired registration).
    /// Re-checked at resync cadence.
    Blocked {
        reason: &'static str,
        message: String,
    },
}

/// Per-kind strategy.
#[async_trait]
pub trait KindReconciler: Send + Sync {
    type Resource: ManagedResource;

    /// Drive the remote state toward the desired state.
    ///
    /// Identifiers must be recorded in `status` as soon as the call producing them
    /// returns; `status` is persisted even when this returns an error.
    async fn sync(
        &self,
        resource: &Self::Resource,
        ctx: &Context,
        credential: &Credential,
        status: &mut StatusOf<Self::Resource>,
    ) -> Result<SyncProgress, ReconcileError>;

    /// Delete the remote object. An object that is already gone, or was never
    /// created, counts as deleted.
    async fn cleanup(
        &self,
        resource: &Self::Resource,
        ctx: &Context,
        credential: &Credential,
        status: &StatusOf<Self::Resource>,
    ) -> Result<(), ReconcileError>;

    /// Move `status` into the kind's deleting state, if it has one.
    fn mark_deleting(&self, _status: &mut StatusOf<Self::Resource>) {}
}

/// What the controller should do after a pass.
#[derive(Debug)]
pub struct ReconcileOutcome<S> {
    /// Status to persist; `None` when nothing is written.
    pub status: Option<S>,
    /// When to reconcile again; `None` waits for the next change.
    pub requeue: Option<Duration>,
    /// Remove the finalizer.
    pub finalize: bool,
    /// Failure of this pass, already reflected in `status`.
    pub error: Option<ReconcileError>,
}

/// Treat "already absent" as a successful deletion.
///
/// # Errors
///
/// Returns any error other than [`CloudflareError::NotFound`].
pub fn absent_ok(result: Result<(), CloudflareError>) -> Result<(), ReconcileError> {
    match result {
        Err(err) if err.is_not_found() => Ok(()),
        other => other.map_err(ReconcileError::from),
    }
}

/// Run one reconcile pass for `resource`.
pub async fn reconcile<R: KindReconciler>(
    reconciler: &R,
    resource: &R::Resource,
    ctx: &Context,
) -> ReconcileOutcome<StatusOf<R::Resource>> {
    let mut status = resource.status_ref().cloned().unwrap_or_default();
    status.set_observed_generation(resource.meta().generation);

    if resource.meta().deletion_timestamp.is_some() {
        return finalize(reconciler, resource, ctx, status).await;
    }

    let started = Instant::now();
    let kind = <R::Resource as Resource>::kind(&());
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    debug!(%kind, %namespace, %name, generation = ?resource.meta().generation, "Reconciling");

    let result = match ctx
        .credentials
        .resolve(&namespace, resource.credential_ref())
        .await
    {
        Ok(credential) => {
            reconciler
                .sync(resource, ctx, &credential, &mut status)
                .await
        }
        Err(err) => Err(err.into()),
    };

    match result {
        Ok(progress) => {
            status.set_failure_count(0);
            let requeue = match progress {
                SyncProgress::Ready(message) => {
                    status.set_condition(
                        CONDITION_TYPE_READY,
                        CONDITION_STATUS_TRUE,
                        REASON_READY,
                        &message,
                    );
                    info!(%kind, %namespace, %name, "{message}");
                    ctx.settings.ready_requeue
                }
                SyncProgress::Progressing { reason, message } => {
                    status.set_condition(
                        CONDITION_TYPE_READY,
                        CONDITION_STATUS_FALSE,
                        reason,
                        &message,
                    );
                    info!(%kind, %namespace, %name, reason, "{message}");
                    record_reconciliation_requeue(&kind, reason);
                    ctx.settings.pending_requeue
                }
                SyncProgress::Blocked { reason, message } => {
                    status.set_condition(
                        CONDITION_TYPE_READY,
                        CONDITION_STATUS_FALSE,
                        reason,
                        &message,
                    );
                    warn!(%kind, %namespace, %name, reason, "{message}");
                    record_reconciliation_requeue(&kind, reason);
                    ctx.settings.ready_requeue
                }
            };
            record_reconciliation_success(&kind, started.elapsed());

            ReconcileOutcome {
                status: Some(status),
                requeue: Some(requeue),
                finalize: false,
                error: None,
            }
        }
        Err(err) => {
            let class = err.class();
            let requeue = apply_failure(&mut status, &err, &ctx.settings);
            match class {
                ErrorClass::Configuration => {
                    warn!(%kind, %namespace, %name, reason = err.reason(), error = %err, "Waiting on configuration");
                }
                ErrorClass::Transient | ErrorClass::Permanent => {
                    error!(
                        %kind,
                        %namespace,
                        %name,
                        reason = err.reason(),
                        class = class.as_str(),
                        failures = status.failure_count(),
                        retry_in = ?requeue,
                        error = %err,
                        "Reconciliation failed"
                    );
                }
            }
            record_reconciliation_error(&kind, class.as_str(), started.elapsed());
            record_reconciliation_requeue(&kind, err.reason());

            ReconcileOutcome {
                status: Some(status),
                requeue: Some(requeue),
                finalize: false,
                error: Some(err),
            }
        }
    }
}

/// Record a failed pass in `status` and pick the retry interval.
pub fn apply_failure<S: KindStatus>(
    status: &mut S,
    err: &ReconcileError,
    settings: &ReconcileSettings,
) -> Duration {
    let failures = status.failure_count().saturating_add(1);
    status.set_failure_count(failures);

    let class = err.class();
    if class == ErrorClass::Configuration {
        status.mark_pending();
    } else {
        status.mark_error();
    }
    status.set_condition(
        CONDITION_TYPE_READY,
        CONDITION_STATUS_FALSE,
        err.reason(),
        &err.to_string(),
    );

    match class {
        ErrorClass::Transient => requeue_backoff(failures),
        ErrorClass::Configuration => settings.pending_requeue,
        ErrorClass::Permanent => settings.permanent_requeue,
    }
}

async fn finalize<R: KindReconciler>(
    reconciler: &R,
    resource: &R::Resource,
    ctx: &Context,
    mut status: StatusOf<R::Resource>,
) -> ReconcileOutcome<StatusOf<R::Resource>> {
    let kind = <R::Resource as Resource>::kind(&());
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    if !has_finalizer(resource, <R::Resource as ManagedResource>::FINALIZER) {
        return ReconcileOutcome {
            status: None,
            requeue: None,
            finalize: false,
            error: None,
        };
    }

    if resource.deletion_policy() == DeletionPolicy::Orphan {
        info!(%kind, %namespace, %name, "Deletion policy is Orphan, leaving remote object in place");
        record_resource_orphaned(&kind);
        return ReconcileOutcome {
            status: None,
            requeue: None,
            finalize: true,
            error: None,
        };
    }

    // The deletion budget does not inherit failures of the live phase
    let already_deleting = find_condition(status.conditions(), CONDITION_TYPE_READY)
        .and_then(|c| c.reason.as_deref())
        .is_some_and(|reason| reason == REASON_DELETING || reason == REASON_DELETION_FAILED);
    if !already_deleting {
        status.set_failure_count(0);
    }

    info!(%kind, %namespace, %name, "Deleting remote object");
    reconciler.mark_deleting(&mut status);

    let result = match ctx
        .credentials
        .resolve(&namespace, resource.credential_ref())
        .await
    {
        Ok(credential) => reconciler.cleanup(resource, ctx, &credential, &status).await,
        Err(err) => Err(err.into()),
    };

    match result {
        Ok(()) => {
            info!(%kind, %namespace, %name, "Remote object deleted");
            record_resource_deleted(&kind);
            ReconcileOutcome {
                status: None,
                requeue: None,
                finalize: true,
                error: None,
            }
        }
        Err(err) => {
            record_deletion_failure(&kind);
            let failures = status.failure_count().saturating_add(1);
            status.set_failure_count(failures);

            let requeue = if failures >= ctx.settings.max_deletion_attempts {
                status.mark_error();
                status.set_condition(
                    CONDITION_TYPE_READY,
                    CONDITION_STATUS_FALSE,
                    REASON_DELETION_FAILED,
                    &format!("Deletion failed after {failures} attempts: {err}"),
                );
                error!(%kind, %namespace, %name, failures, error = %err, "Deletion keeps failing, retrying at resync interval");
                ctx.settings.ready_requeue
            } else {
                status.set_condition(
                    CONDITION_TYPE_READY,
                    CONDITION_STATUS_FALSE,
                    REASON_DELETING,
                    &format!("Deletion attempt {failures} failed: {err}"),
                );
                let delay = requeue_backoff(failures);
                warn!(%kind, %namespace, %name, failures, retry_in = ?delay, error = %err, "Deletion failed, will retry");
                delay
            };
            record_reconciliation_requeue(&kind, REASON_DELETING);

            ReconcileOutcome {
                status: Some(status),
                requeue: Some(requeue),
                finalize: false,
                error: Some(err),
            }
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
