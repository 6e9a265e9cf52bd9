// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Fixtures shared by reconciler tests.

use crate::cloudflare::fake::FakeCloudflare;
use crate::context::{Context, ReconcileSettings, Stores};
use crate::credentials::{Credential, StaticCredentials};
use crate::crd::{
    BucketState, CloudflareDomain, CloudflareDomainSpec, CloudflareDomainStatus, DeletionPolicy,
    R2Bucket, R2BucketSpec, R2BucketStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::runtime::reflector::{store, store::Writer};
use kube::runtime::watcher;
use kube::Resource;
use std::sync::Arc;

use super::engine::ManagedResource;

pub const TEST_NAMESPACE: &str = "default";
pub const TEST_ACCOUNT_ID: &str = "acc-test";

/// Context backed by [`FakeCloudflare`] and in-memory stores.
pub struct Harness {
    pub fake: Arc<FakeCloudflare>,
    pub ctx: Context,
    domains: Writer<CloudflareDomain>,
    buckets: Writer<R2Bucket>,
}

impl Harness {
    /// Harness whose default credential is valid.
    pub fn new() -> Self {
        Self::with_credentials(StaticCredentials::with_default(Credential::new(
            "test-token",
            TEST_ACCOUNT_ID,
        )))
    }

    pub fn with_credentials(credentials: StaticCredentials) -> Self {
        let fake = Arc::new(FakeCloudflare::new());
        let (domain_store, domains) = store::<CloudflareDomain>();
        let (bucket_store, buckets) = store::<R2Bucket>();
        let ctx = Context {
            cloudflare: fake.clone(),
            credentials: Arc::new(credentials),
            stores: Stores {
                domains: domain_store,
                buckets: bucket_store,
            },
            settings: ReconcileSettings::default(),
        };
        Self {
            fake,
            ctx,
            domains,
            buckets,
        }
    }

    /// Add or replace a `CloudflareDomain` in the reflector store.
    pub fn put_domain(&mut self, domain: CloudflareDomain) {
        self.domains
            .apply_watcher_event(&watcher::Event::Apply(domain));
    }

    /// Add a `CloudflareDomain` whose zone has already been discovered.
    pub fn put_zone_binding(&mut self, name: &str, domain: &str, is_default: bool, zone_id: &str) {
        let mut obj = managed(CloudflareDomain::new(
            name,
            CloudflareDomainSpec {
                domain: domain.to_string(),
                zone_id: None,
                is_default,
                credential_ref: None,
            },
        ));
        obj.status = Some(CloudflareDomainStatus {
            zone_id: Some(zone_id.to_string()),
            zone_name: Some(domain.to_string()),
            ..Default::default()
        });
        self.put_domain(obj);
    }

    /// Add or replace an `R2Bucket` in the reflector store.
    pub fn put_bucket(&mut self, bucket: R2Bucket) {
        self.buckets
            .apply_watcher_event(&watcher::Event::Apply(bucket));
    }

    pub fn remove_bucket(&mut self, bucket: R2Bucket) {
        self.buckets
            .apply_watcher_event(&watcher::Event::Delete(bucket));
    }
}

/// `R2Bucket` with an empty spec.
pub fn bucket(name: &str) -> R2Bucket {
    managed(R2Bucket::new(
        name,
        R2BucketSpec {
            name: None,
            location_hint: None,
            storage_class: None,
            cors_rules: vec![],
            lifecycle_rules: vec![],
            deletion_policy: DeletionPolicy::Delete,
            credential_ref: None,
        },
    ))
}

/// `R2Bucket` as the store sees it once its bucket exists.
pub fn ready_bucket(name: &str) -> R2Bucket {
    let mut obj = bucket(name);
    obj.status = Some(R2BucketStatus {
        state: BucketState::Ready,
        observed_generation: Some(1),
        bucket_name: Some(name.to_string()),
        ..Default::default()
    });
    obj
}

/// Give `obj` a namespace, a generation and its finalizer.
pub fn managed<K: ManagedResource>(mut obj: K) -> K {
    let meta = obj.meta_mut();
    meta.namespace = Some(TEST_NAMESPACE.to_string());
    meta.generation = Some(1);
    meta.finalizers = Some(vec![K::FINALIZER.to_string()]);
    obj
}

/// Mark `obj` as being deleted.
pub fn deleting<K: Resource>(mut obj: K) -> K {
    obj.meta_mut().deletion_timestamp = Some(
        serde_json::from_value::<Time>(serde_json::json!("2025-01-01T00:00:00Z"))
            .expect("valid timestamp"),
    );
    obj
}
