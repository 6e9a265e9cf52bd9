// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `r2bucket.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::cloudflare::CloudflareError;
    use crate::crd::{LocationHint, R2BucketStatus};
    use crate::reconcilers::engine::reconcile;
    use crate::reconcilers::status::find_condition;
    use crate::reconcilers::test_support::{bucket, deleting, Harness};
    use crate::status_reasons::{CONDITION_TYPE_READY, REASON_CLOUDFLARE_TIMEOUT, REASON_READY};

    fn cors_rule(origin: &str) -> crd::CorsRule {
        crd::CorsRule {
            allowed_origins: vec![origin.to_string()],
            allowed_methods: vec!["GET".to_string(), "HEAD".to_string()],
            max_age_seconds: Some(3600),
            ..Default::default()
        }
    }

    fn expire_logs() -> crd::LifecycleRule {
        crd::LifecycleRule {
            id: "expire-logs".to_string(),
            enabled: true,
            prefix: Some("logs/".to_string()),
            expiration_days: Some(30),
            abort_multipart_upload_days: None,
            transition_to_infrequent_access_days: Some(7),
        }
    }

    fn assets() -> R2Bucket {
        let mut obj = bucket("assets");
        obj.spec.location_hint = Some(LocationHint::Weur);
        obj.spec.cors_rules = vec![cors_rule("https://example.com")];
        obj.spec.lifecycle_rules = vec![expire_logs()];
        obj
    }

    fn ready_reason(status: &R2BucketStatus) -> Option<&str> {
        find_condition(&status.conditions, CONDITION_TYPE_READY).and_then(|c| c.reason.as_deref())
    }

    #[test]
    fn test_bucket_name_defaults_to_resource_name() {
        let mut obj = bucket("assets");
        assert_eq!(bucket_name(&obj), "assets");

        obj.spec.name = Some("prod-assets".to_string());
        assert_eq!(bucket_name(&obj), "prod-assets");
    }

    #[test]
    fn test_desired_lifecycle_converts_days_to_seconds() {
        let rules = desired_lifecycle(&[expire_logs()]);

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].conditions.prefix, "logs/");
        assert_eq!(
            rules[0]
                .delete_objects_transition
                .as_ref()
                .map(|t| t.condition.max_age),
            Some(30 * 86_400)
        );
        assert!(rules[0].abort_multipart_uploads_transition.is_none());
        assert_eq!(rules[0].storage_class_transitions.len(), 1);
        assert_eq!(
            rules[0].storage_class_transitions[0].storage_class,
            "InfrequentAccess"
        );
        assert_eq!(
            rules[0].storage_class_transitions[0].condition.max_age,
            7 * 86_400
        );
    }

    #[test]
    fn test_lifecycle_matches_ignores_order() {
        let mut second = expire_logs();
        second.id = "expire-tmp".to_string();
        second.prefix = Some("tmp/".to_string());

        let a = desired_lifecycle(&[expire_logs(), second.clone()]);
        let b = desired_lifecycle(&[second.clone(), expire_logs()]);
        assert!(lifecycle_matches(&a, &b));

        second.enabled = false;
        let c = desired_lifecycle(&[expire_logs(), second]);
        assert!(!lifecycle_matches(&a, &c));
        assert!(!lifecycle_matches(&a, &a[..1]));
    }

    #[tokio::test]
    async fn test_creates_bucket_with_cors_and_lifecycle() {
        let harness = Harness::new();

        let outcome = reconcile(&R2BucketReconciler, &assets(), &harness.ctx).await;

        let status = outcome.status.expect("status");
        assert_eq!(status.state, BucketState::Ready);
        assert_eq!(status.bucket_name.as_deref(), Some("assets"));
        assert_eq!(status.location.as_deref(), Some("WEUR"));
        assert_eq!(status.cors_rules_count, 1);
        assert_eq!(status.lifecycle_rules_count, 1);
        assert_eq!(ready_reason(&status), Some(REASON_READY));

        let hint = find_condition(&status.conditions, CONDITION_TYPE_LOCATION_HINT)
            .expect("LocationHint condition");
        assert_eq!(hint.status, CONDITION_STATUS_TRUE);

        assert!(harness.fake.bucket("assets").is_some());
        assert_eq!(harness.fake.cors("assets").len(), 1);
        assert_eq!(harness.fake.lifecycle("assets").len(), 1);
    }

    #[tokio::test]
    async fn test_second_pass_issues_no_mutations() {
        let harness = Harness::new();
        let mut obj = assets();
        obj.status = reconcile(&R2BucketReconciler, &obj, &harness.ctx)
            .await
            .status;
        harness.fake.clear_calls();

        let outcome = reconcile(&R2BucketReconciler, &obj, &harness.ctx).await;

        assert!(outcome.error.is_none());
        assert!(harness.fake.mutations().is_empty(), "{:?}", harness.fake.mutations());
    }

    #[tokio::test]
    async fn test_failed_cors_push_is_retried_without_recreating() {
        let harness = Harness::new();
        harness
            .fake
            .fail_once("put_bucket_cors", CloudflareError::Timeout);
        let mut obj = assets();

        let first = reconcile(&R2BucketReconciler, &obj, &harness.ctx).await;
        let status = first.status.expect("status");
        assert_eq!(status.state, BucketState::Error);
        assert_eq!(status.bucket_name.as_deref(), Some("assets"));
        assert_eq!(ready_reason(&status), Some(REASON_CLOUDFLARE_TIMEOUT));
        obj.status = Some(status);
        harness.fake.clear_calls();

        let second = reconcile(&R2BucketReconciler, &obj, &harness.ctx).await;

        assert!(second.error.is_none());
        assert_eq!(
            harness.fake.mutations(),
            vec![
                "put_bucket_cors assets".to_string(),
                "put_bucket_lifecycle assets".to_string()
            ]
        );
        assert_eq!(second.status.expect("status").failure_count, 0);
    }

    #[tokio::test]
    async fn test_empty_cors_list_removes_policy() {
        let harness = Harness::new();
        let mut obj = assets();
        obj.status = reconcile(&R2BucketReconciler, &obj, &harness.ctx)
            .await
            .status;
        obj.spec.cors_rules.clear();
        harness.fake.clear_calls();

        let outcome = reconcile(&R2BucketReconciler, &obj, &harness.ctx).await;

        assert!(outcome.error.is_none());
        assert_eq!(
            harness.fake.mutations(),
            vec!["delete_bucket_cors assets".to_string()]
        );
        assert!(harness.fake.cors("assets").is_empty());
        assert_eq!(outcome.status.expect("status").cors_rules_count, 0);
    }

    #[tokio::test]
    async fn test_storage_class_drift_is_updated() {
        let harness = Harness::new();
        harness.fake.add_bucket("assets", "ENAM");
        let mut obj = bucket("assets");
        obj.spec.storage_class = Some(StorageClass::InfrequentAccess);

        let outcome = reconcile(&R2BucketReconciler, &obj, &harness.ctx).await;

        assert!(outcome.error.is_none());
        assert_eq!(
            harness.fake.mutations(),
            vec!["update_bucket assets".to_string()]
        );
        assert_eq!(
            outcome.status.expect("status").storage_class.as_deref(),
            Some("InfrequentAccess")
        );
    }

    #[tokio::test]
    async fn test_location_mismatch_is_informational() {
        let harness = Harness::new();
        harness.fake.add_bucket("assets", "ENAM");

        let outcome = reconcile(&R2BucketReconciler, &assets(), &harness.ctx).await;

        let status = outcome.status.expect("status");
        assert_eq!(status.state, BucketState::Ready);
        let hint = find_condition(&status.conditions, CONDITION_TYPE_LOCATION_HINT)
            .expect("LocationHint condition");
        assert_eq!(hint.status, CONDITION_STATUS_FALSE);
        assert_eq!(hint.reason.as_deref(), Some(REASON_LOCATION_MISMATCH));
        assert!(!harness
            .fake
            .mutations()
            .iter()
            .any(|c| c.starts_with("create_bucket")));
    }

    #[tokio::test]
    async fn test_bucket_deleted_out_of_band_is_recreated() {
        let harness = Harness::new();
        let mut obj = assets();
        obj.status = reconcile(&R2BucketReconciler, &obj, &harness.ctx)
            .await
            .status;
        harness.fake.remove_bucket("assets");
        harness.fake.clear_calls();

        let outcome = reconcile(&R2BucketReconciler, &obj, &harness.ctx).await;

        assert!(outcome.error.is_none());
        assert!(harness
            .fake
            .mutations()
            .contains(&"create_bucket assets".to_string()));
        assert!(harness.fake.bucket("assets").is_some());
    }

    #[tokio::test]
    async fn test_rename_reports_previous_bucket() {
        let harness = Harness::new();
        let mut obj = assets();
        obj.status = reconcile(&R2BucketReconciler, &obj, &harness.ctx)
            .await
            .status;
        obj.spec.name = Some("assets-v2".to_string());
        harness.fake.clear_calls();

        let outcome = reconcile(&R2BucketReconciler, &obj, &harness.ctx).await;

        let status = outcome.status.expect("status");
        assert_eq!(status.bucket_name.as_deref(), Some("assets-v2"));
        let orphaned = find_condition(&status.conditions, CONDITION_TYPE_ORPHANED_BUCKET)
            .expect("OrphanedBucket condition");
        assert_eq!(orphaned.reason.as_deref(), Some(REASON_BUCKET_RENAMED));
        assert!(orphaned
            .message
            .as_deref()
            .is_some_and(|m| m.contains("assets ")));
        assert!(harness.fake.bucket("assets").is_some());
        assert!(harness.fake.bucket("assets-v2").is_some());
        assert!(!harness
            .fake
            .mutations()
            .iter()
            .any(|call| call.starts_with("delete_bucket")));

        let again = reconcile(
            &R2BucketReconciler,
            &R2Bucket {
                status: Some(status),
                ..obj
            },
            &harness.ctx,
        )
        .await;
        assert!(again
            .status
            .as_ref()
            .and_then(|s| find_condition(&s.conditions, CONDITION_TYPE_ORPHANED_BUCKET))
            .is_some());
    }

    #[tokio::test]
    async fn test_orphan_deletion_makes_no_delete_call() {
        let harness = Harness::new();
        let mut obj = assets();
        obj.status = reconcile(&R2BucketReconciler, &obj, &harness.ctx)
            .await
            .status;
        obj.spec.deletion_policy = DeletionPolicy::Orphan;
        harness.fake.clear_calls();

        let outcome = reconcile(&R2BucketReconciler, &deleting(obj), &harness.ctx).await;

        assert!(outcome.finalize);
        assert!(harness.fake.calls().is_empty());
        assert!(harness.fake.bucket("assets").is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_bucket() {
        let harness = Harness::new();
        let mut obj = assets();
        obj.status = reconcile(&R2BucketReconciler, &obj, &harness.ctx)
            .await
            .status;

        let outcome = reconcile(&R2BucketReconciler, &deleting(obj), &harness.ctx).await;

        assert!(outcome.finalize);
        assert!(harness.fake.bucket("assets").is_none());
    }

    #[tokio::test]
    async fn test_already_absent_bucket_finalizes() {
        let harness = Harness::new();
        let mut obj = assets();
        obj.status = Some(R2BucketStatus {
            state: BucketState::Ready,
            bucket_name: Some("assets".to_string()),
            ..Default::default()
        });

        let outcome = reconcile(&R2BucketReconciler, &deleting(obj), &harness.ctx).await;

        assert!(outcome.finalize);
        assert!(outcome.error.is_none());
        assert_eq!(
            harness.fake.calls(),
            vec!["delete_bucket assets".to_string()]
        );
    }

    #[tokio::test]
    async fn test_never_created_bucket_finalizes_without_calls() {
        let harness = Harness::new();

        let outcome = reconcile(&R2BucketReconciler, &deleting(assets()), &harness.ctx).await;

        assert!(outcome.finalize);
        assert!(harness.fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_marks_deleting() {
        let harness = Harness::new();
        harness.fake.add_bucket("assets", "WEUR");
        harness.fake.fail_once(
            "delete_bucket",
            CloudflareError::Api {
                status: 503,
                code: 10_001,
                message: "service unavailable".into(),
            },
        );
        let mut obj = assets();
        obj.status = Some(R2BucketStatus {
            state: BucketState::Ready,
            bucket_name: Some("assets".to_string()),
            ..Default::default()
        });

        let outcome = reconcile(&R2BucketReconciler, &deleting(obj), &harness.ctx).await;

        assert!(!outcome.finalize);
        assert_eq!(
            outcome.status.expect("status").state,
            BucketState::Deleting
        );
        assert!(harness.fake.bucket("assets").is_some());
    }
}
