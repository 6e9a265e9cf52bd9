// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `engine.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::credentials::StaticCredentials;
    use crate::crd::{BucketState, CredentialRef, R2Bucket, R2BucketStatus};
    use crate::reconcilers::status::find_condition;
    use crate::reconcilers::test_support::{bucket, deleting, Harness};
    use crate::resolver::ResolveError;
    use crate::status_reasons::{
        REASON_BUCKET_NOT_READY, REASON_CLOUDFLARE_BAD_REQUEST, REASON_CREDENTIAL_NOT_FOUND,
        REASON_DOMAIN_EXPIRED, REASON_DOMAIN_INITIALIZING, REASON_NO_DEFAULT_CREDENTIAL, REASON_ZONE_NOT_FOUND,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Strategy returning canned results.
    struct Scripted {
        sync: Result<SyncProgress, ReconcileError>,
        cleanup: Result<(), ReconcileError>,
        syncs: AtomicUsize,
        cleanups: AtomicUsize,
    }

    impl Scripted {
        fn new(sync: Result<SyncProgress, ReconcileError>) -> Self {
            Self {
                sync,
                cleanup: Ok(()),
                syncs: AtomicUsize::new(0),
                cleanups: AtomicUsize::new(0),
            }
        }

        fn cleaning(cleanup: Result<(), ReconcileError>) -> Self {
            Self {
                cleanup,
                ..Self::new(Ok(SyncProgress::Ready("ok".into())))
            }
        }
    }

    #[async_trait]
    impl KindReconciler for Scripted {
        type Resource = R2Bucket;

        async fn sync(
            &self,
            _resource: &R2Bucket,
            _ctx: &Context,
            _credential: &Credential,
            status: &mut R2BucketStatus,
        ) -> Result<SyncProgress, ReconcileError> {
            self.syncs.fetch_add(1, Ordering::SeqCst);
            status.bucket_name = Some("assets".to_string());
            self.sync.clone()
        }

        async fn cleanup(
            &self,
            _resource: &R2Bucket,
            _ctx: &Context,
            _credential: &Credential,
            _status: &R2BucketStatus,
        ) -> Result<(), ReconcileError> {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            self.cleanup.clone()
        }

        fn mark_deleting(&self, status: &mut R2BucketStatus) {
            status.state = BucketState::Deleting;
        }
    }

    fn ready_reason(status: &R2BucketStatus) -> Option<&str> {
        find_condition(&status.conditions, CONDITION_TYPE_READY).and_then(|c| c.reason.as_deref())
    }

    fn failed(count: u32) -> R2Bucket {
        let mut obj = bucket("assets");
        obj.status = Some(R2BucketStatus {
            failure_count: count,
            ..Default::default()
        });
        obj
    }

    /// A bucket whose previous deletion attempts failed `count` times.
    fn failed_deletion(count: u32) -> R2Bucket {
        let mut obj = failed(count);
        if let Some(status) = obj.status.as_mut() {
            status.state = BucketState::Deleting;
            status.set_condition(
                CONDITION_TYPE_READY,
                CONDITION_STATUS_FALSE,
                REASON_DELETING,
                "Deletion attempt failed",
            );
        }
        deleting(obj)
    }

    #[tokio::test]
    async fn test_ready_resets_failures_and_requeues_at_resync() {
        let harness = Harness::new();
        let scripted = Scripted::new(Ok(SyncProgress::Ready("Bucket is ready".into())));

        let outcome = reconcile(&scripted, &failed(4), &harness.ctx).await;

        let status = outcome.status.expect("status");
        assert_eq!(status.failure_count, 0);
        assert_eq!(status.observed_generation, Some(1));
        assert_eq!(ready_reason(&status), Some(REASON_READY));
        assert_eq!(outcome.requeue, Some(harness.ctx.settings.ready_requeue));
        assert!(outcome.error.is_none());
        assert!(!outcome.finalize);
    }

    #[tokio::test]
    async fn test_progressing_requeues_at_pending_interval() {
        let harness = Harness::new();
        let scripted = Scripted::new(Ok(SyncProgress::Progressing {
            reason: REASON_DOMAIN_INITIALIZING,
            message: "waiting".into(),
        }));

        let outcome = reconcile(&scripted, &bucket("assets"), &harness.ctx).await;

        let status = outcome.status.expect("status");
        let ready = find_condition(&status.conditions, CONDITION_TYPE_READY).expect("Ready");
        assert_eq!(ready.status, CONDITION_STATUS_FALSE);
        assert_eq!(ready.reason.as_deref(), Some(REASON_DOMAIN_INITIALIZING));
        assert_eq!(outcome.requeue, Some(harness.ctx.settings.pending_requeue));
    }

    #[tokio::test]
    async fn test_blocked_requeues_at_resync() {
        let harness = Harness::new();
        let scripted = Scripted::new(Ok(SyncProgress::Blocked {
            reason: REASON_DOMAIN_EXPIRED,
            message: "expired".into(),
        }));

        let outcome = reconcile(&scripted, &failed(1), &harness.ctx).await;

        let status = outcome.status.expect("status");
        assert_eq!(status.failure_count, 0);
        assert_eq!(ready_reason(&status), Some(REASON_DOMAIN_EXPIRED));
        assert_eq!(outcome.requeue, Some(harness.ctx.settings.ready_requeue));
    }

    #[tokio::test]
    async fn test_transient_failure_backs_off_and_keeps_identifiers() {
        let harness = Harness::new();
        let scripted = Scripted::new(Err(CloudflareError::Timeout.into()));

        let outcome = reconcile(&scripted, &failed(2), &harness.ctx).await;

        let status = outcome.status.expect("status");
        assert_eq!(status.state, BucketState::Error);
        assert_eq!(status.failure_count, 3);
        assert_eq!(status.bucket_name.as_deref(), Some("assets"));

        // Third failure: 5s * 2^2 = 20s, +/-10% jitter
        let requeue = outcome.requeue.expect("requeue");
        assert!(requeue >= Duration::from_secs(18) && requeue <= Duration::from_secs(22));
        assert_eq!(outcome.error, Some(CloudflareError::Timeout.into()));
    }

    #[tokio::test]
    async fn test_configuration_failure_goes_pending() {
        let harness = Harness::new();
        let scripted = Scripted::new(Err(ReconcileError::dependency(
            REASON_BUCKET_NOT_READY,
            "bucket assets is not ready",
        )));

        let outcome = reconcile(&scripted, &bucket("assets"), &harness.ctx).await;

        let status = outcome.status.expect("status");
        assert_eq!(status.state, BucketState::Pending);
        assert_eq!(ready_reason(&status), Some(REASON_BUCKET_NOT_READY));
        assert_eq!(outcome.requeue, Some(harness.ctx.settings.pending_requeue));
    }

    #[tokio::test]
    async fn test_permanent_failure_waits_for_resync() {
        let harness = Harness::new();
        let scripted = Scripted::new(Err(CloudflareError::Api {
            status: 400,
            code: 10_004,
            message: "invalid bucket name".into(),
        }
        .into()));

        let outcome = reconcile(&scripted, &bucket("assets"), &harness.ctx).await;

        let status = outcome.status.expect("status");
        assert_eq!(status.state, BucketState::Error);
        assert_eq!(ready_reason(&status), Some(REASON_CLOUDFLARE_BAD_REQUEST));
        assert_eq!(outcome.requeue, Some(harness.ctx.settings.permanent_requeue));
    }

    #[tokio::test]
    async fn test_missing_credential_secret_skips_sync() {
        let harness = Harness::new();
        let scripted = Scripted::new(Ok(SyncProgress::Ready("ok".into())));
        let mut obj = bucket("assets");
        obj.spec.credential_ref = Some(CredentialRef {
            name: "cloudflare".into(),
            namespace: None,
        });

        let outcome = reconcile(&scripted, &obj, &harness.ctx).await;

        let status = outcome.status.expect("status");
        assert_eq!(status.state, BucketState::Pending);
        assert_eq!(ready_reason(&status), Some(REASON_CREDENTIAL_NOT_FOUND));
        assert_eq!(scripted.syncs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_credential_ref_reads_secret() {
        let mut credentials = StaticCredentials::default();
        credentials.insert_secret(
            "default",
            "cloudflare",
            &[("apiToken", "t"), ("accountId", "a")],
        );
        let harness = Harness::with_credentials(credentials);
        let scripted = Scripted::new(Ok(SyncProgress::Ready("ok".into())));
        let mut obj = bucket("assets");
        obj.spec.credential_ref = Some(CredentialRef {
            name: "cloudflare".into(),
            namespace: None,
        });

        let outcome = reconcile(&scripted, &obj, &harness.ctx).await;

        assert!(outcome.error.is_none());
        assert_eq!(scripted.syncs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_default_credential() {
        let harness = Harness::with_credentials(StaticCredentials::default());
        let scripted = Scripted::new(Ok(SyncProgress::Ready("ok".into())));

        let outcome = reconcile(&scripted, &bucket("assets"), &harness.ctx).await;

        let status = outcome.status.expect("status");
        assert_eq!(ready_reason(&status), Some(REASON_NO_DEFAULT_CREDENTIAL));
    }

    #[tokio::test]
    async fn test_deleting_without_finalizer_is_noop() {
        let harness = Harness::new();
        let scripted = Scripted::cleaning(Ok(()));
        let mut obj = deleting(bucket("assets"));
        obj.metadata.finalizers = None;

        let outcome = reconcile(&scripted, &obj, &harness.ctx).await;

        assert!(outcome.status.is_none());
        assert!(outcome.requeue.is_none());
        assert!(!outcome.finalize);
        assert_eq!(scripted.cleanups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_orphan_finalizes_without_cleanup() {
        let harness = Harness::new();
        let scripted = Scripted::cleaning(Ok(()));
        let mut obj = deleting(bucket("assets"));
        obj.spec.deletion_policy = DeletionPolicy::Orphan;

        let outcome = reconcile(&scripted, &obj, &harness.ctx).await;

        assert!(outcome.finalize);
        assert_eq!(scripted.cleanups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_cleanup_finalizes() {
        let harness = Harness::new();
        let scripted = Scripted::cleaning(Ok(()));

        let outcome = reconcile(&scripted, &deleting(bucket("assets")), &harness.ctx).await;

        assert!(outcome.finalize);
        assert!(outcome.status.is_none());
        assert_eq!(scripted.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_cleanup_keeps_finalizer() {
        let harness = Harness::new();
        let scripted = Scripted::cleaning(Err(CloudflareError::RateLimited.into()));

        let outcome = reconcile(&scripted, &deleting(bucket("assets")), &harness.ctx).await;

        assert!(!outcome.finalize);
        let status = outcome.status.expect("status");
        assert_eq!(status.state, BucketState::Deleting);
        assert_eq!(status.failure_count, 1);
        assert_eq!(ready_reason(&status), Some(REASON_DELETING));
        let requeue = outcome.requeue.expect("requeue");
        assert!(requeue <= Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_deletion_budget_reports_deletion_failed() {
        let harness = Harness::new();
        let scripted = Scripted::cleaning(Err(CloudflareError::Network("reset".into()).into()));
        let budget = harness.ctx.settings.max_deletion_attempts;

        let outcome = reconcile(&scripted, &failed_deletion(budget - 1), &harness.ctx).await;

        assert!(!outcome.finalize);
        let status = outcome.status.expect("status");
        assert_eq!(status.state, BucketState::Error);
        assert_eq!(status.failure_count, budget);
        assert_eq!(ready_reason(&status), Some(REASON_DELETION_FAILED));
        assert_eq!(outcome.requeue, Some(harness.ctx.settings.ready_requeue));
    }

    #[tokio::test]
    async fn test_deletion_budget_ignores_live_phase_failures() {
        let harness = Harness::new();
        let scripted = Scripted::cleaning(Err(CloudflareError::Network("reset".into()).into()));
        let budget = harness.ctx.settings.max_deletion_attempts;

        let outcome = reconcile(&scripted, &deleting(failed(budget - 1)), &harness.ctx).await;

        let status = outcome.status.expect("status");
        assert_eq!(status.failure_count, 1);
        assert_eq!(status.state, BucketState::Deleting);
        assert_eq!(ready_reason(&status), Some(REASON_DELETING));
    }

    #[tokio::test]
    async fn test_deletion_failed_keeps_counting() {
        let harness = Harness::new();
        let scripted = Scripted::cleaning(Err(CloudflareError::Network("reset".into()).into()));
        let budget = harness.ctx.settings.max_deletion_attempts;
        let mut obj = failed_deletion(budget);
        if let Some(status) = obj.status.as_mut() {
            status.set_condition(
                CONDITION_TYPE_READY,
                CONDITION_STATUS_FALSE,
                REASON_DELETION_FAILED,
                "Deletion failed",
            );
        }

        let outcome = reconcile(&scripted, &obj, &harness.ctx).await;

        let status = outcome.status.expect("status");
        assert_eq!(status.failure_count, budget + 1);
        assert_eq!(ready_reason(&status), Some(REASON_DELETION_FAILED));
    }

    #[tokio::test]
    async fn test_credential_failure_during_deletion_counts_as_failure() {
        let harness = Harness::with_credentials(StaticCredentials::default());
        let scripted = Scripted::cleaning(Ok(()));

        let outcome = reconcile(&scripted, &deleting(bucket("assets")), &harness.ctx).await;

        assert!(!outcome.finalize);
        assert_eq!(outcome.status.expect("status").failure_count, 1);
        assert_eq!(scripted.cleanups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_absent_ok() {
        assert_eq!(
            absent_ok(Err(CloudflareError::NotFound {
                resource: "bucket assets".into()
            })),
            Ok(())
        );
        assert_eq!(
            absent_ok(Err(CloudflareError::Timeout)),
            Err(CloudflareError::Timeout.into())
        );
        assert_eq!(absent_ok(Ok(())), Ok(()));
    }

    #[test]
    fn test_apply_failure_zone_error_is_configuration() {
        let settings = ReconcileSettings::default();
        let mut status = R2BucketStatus {
            state: BucketState::Ready,
            ..Default::default()
        };
        let err = ReconcileError::from(ResolveError::NotFound {
            hostname: "cdn.unrelated.org".into(),
        });

        let requeue = apply_failure(&mut status, &err, &settings);

        assert_eq!(requeue, settings.pending_requeue);
        assert_eq!(status.state, BucketState::Pending);
        assert_eq!(status.failure_count, 1);
        assert_eq!(ready_reason(&status), Some(REASON_ZONE_NOT_FOUND));
    }
}
